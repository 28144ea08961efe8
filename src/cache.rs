use std::ops::Range;

use tracing::debug;

use crate::error::{Error, Result};

/// On-disk serialization format of a metadata cache.
///
/// See [PMS 14](https://projects.gentoo.org/pms/9/pms.html#metadata-cache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFormat {
    /// `KEY=VALUE` lines under `metadata/md5-cache`. This is the format
    /// modern trees ship and the one probed first.
    ///
    /// See [PMS 14.2](https://projects.gentoo.org/pms/9/pms.html#mddict-cache-file-format).
    Md5,
    /// Sixteen newline-terminated fields in fixed order under
    /// `metadata/cache`, the original flat cache layout.
    Pms,
}

/// The recognized metadata fields of a cache entry.
///
/// The first sixteen variants, in declaration order, are exactly the field
/// order of a [`CacheFormat::Pms`] file; the remainder only ever appear in
/// [`CacheFormat::Md5`] files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Depend,
    Rdepend,
    Slot,
    SrcUri,
    Restrict,
    Homepage,
    License,
    Description,
    Keywords,
    Inherited,
    Iuse,
    Cdepend,
    Pdepend,
    Provide,
    Eapi,
    Properties,
    DefinedPhases,
    RequiredUse,
    Bdepend,
    Eclasses,
    Md5,
}

impl CacheKey {
    pub(crate) const COUNT: usize = 21;

    /// Field order of a flat `metadata/cache` file.
    pub(crate) const PMS_ORDER: [CacheKey; 16] = [
        CacheKey::Depend,
        CacheKey::Rdepend,
        CacheKey::Slot,
        CacheKey::SrcUri,
        CacheKey::Restrict,
        CacheKey::Homepage,
        CacheKey::License,
        CacheKey::Description,
        CacheKey::Keywords,
        CacheKey::Inherited,
        CacheKey::Iuse,
        CacheKey::Cdepend,
        CacheKey::Pdepend,
        CacheKey::Provide,
        CacheKey::Eapi,
        CacheKey::Properties,
    ];

    /// The on-disk key name.
    pub fn name(self) -> &'static str {
        match self {
            CacheKey::Depend => "DEPEND",
            CacheKey::Rdepend => "RDEPEND",
            CacheKey::Slot => "SLOT",
            CacheKey::SrcUri => "SRC_URI",
            CacheKey::Restrict => "RESTRICT",
            CacheKey::Homepage => "HOMEPAGE",
            CacheKey::License => "LICENSE",
            CacheKey::Description => "DESCRIPTION",
            CacheKey::Keywords => "KEYWORDS",
            CacheKey::Inherited => "INHERITED",
            CacheKey::Iuse => "IUSE",
            CacheKey::Cdepend => "CDEPEND",
            CacheKey::Pdepend => "PDEPEND",
            CacheKey::Provide => "PROVIDE",
            CacheKey::Eapi => "EAPI",
            CacheKey::Properties => "PROPERTIES",
            CacheKey::DefinedPhases => "DEFINED_PHASES",
            CacheKey::RequiredUse => "REQUIRED_USE",
            CacheKey::Bdepend => "BDEPEND",
            CacheKey::Eclasses => "_eclasses_",
            CacheKey::Md5 => "_md5_",
        }
    }

    /// Look up an on-disk key name; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<CacheKey> {
        Some(match name {
            "DEPEND" => CacheKey::Depend,
            "RDEPEND" => CacheKey::Rdepend,
            "SLOT" => CacheKey::Slot,
            "SRC_URI" => CacheKey::SrcUri,
            "RESTRICT" => CacheKey::Restrict,
            "HOMEPAGE" => CacheKey::Homepage,
            "LICENSE" => CacheKey::License,
            "DESCRIPTION" => CacheKey::Description,
            "KEYWORDS" => CacheKey::Keywords,
            "INHERITED" => CacheKey::Inherited,
            "IUSE" => CacheKey::Iuse,
            "CDEPEND" => CacheKey::Cdepend,
            "PDEPEND" => CacheKey::Pdepend,
            "PROVIDE" => CacheKey::Provide,
            "EAPI" => CacheKey::Eapi,
            "PROPERTIES" => CacheKey::Properties,
            "DEFINED_PHASES" => CacheKey::DefinedPhases,
            "REQUIRED_USE" => CacheKey::RequiredUse,
            "BDEPEND" => CacheKey::Bdepend,
            "_eclasses_" => CacheKey::Eclasses,
            "_md5_" => CacheKey::Md5,
            _ => return None,
        })
    }
}

/// A parsed metadata cache entry for one package version.
///
/// The entry owns the raw file contents; field accessors return views into
/// that buffer. A field absent from the file reads as `None`, not as an
/// empty string. Parsing either populates the whole record or fails.
///
/// # Examples
///
/// ```
/// use portage_keywords::{CacheEntry, CacheFormat, CacheKey};
///
/// let input = "EAPI=8\nSLOT=0\nKEYWORDS=amd64 ~x86\n";
/// let entry = CacheEntry::parse(CacheFormat::Md5, input.to_string()).unwrap();
/// assert_eq!(entry.keywords(), Some("amd64 ~x86"));
/// assert_eq!(entry.get(CacheKey::Eapi), Some("8"));
/// assert_eq!(entry.get(CacheKey::Depend), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    data: String,
    fields: [Option<Range<usize>>; CacheKey::COUNT],
}

impl CacheEntry {
    /// Parse the full contents of one cache file.
    pub fn parse(format: CacheFormat, data: String) -> Result<CacheEntry> {
        let fields = match format {
            CacheFormat::Md5 => parse_md5(&data)?,
            CacheFormat::Pms => parse_pms(&data)?,
        };
        Ok(CacheEntry { data, fields })
    }

    /// Field value, if the file carried it.
    pub fn get(&self, key: CacheKey) -> Option<&str> {
        self.fields[key as usize]
            .clone()
            .map(|span| &self.data[span])
    }

    pub fn keywords(&self) -> Option<&str> {
        self.get(CacheKey::Keywords)
    }

    pub fn slot(&self) -> Option<&str> {
        self.get(CacheKey::Slot)
    }

    pub fn eapi(&self) -> Option<&str> {
        self.get(CacheKey::Eapi)
    }

    pub fn description(&self) -> Option<&str> {
        self.get(CacheKey::Description)
    }
}

type FieldSpans = [Option<Range<usize>>; CacheKey::COUNT];

/// Flat format: sixteen newline-terminated fields in [`CacheKey::PMS_ORDER`].
/// Anything after the sixteenth newline is ignored.
fn parse_pms(data: &str) -> Result<FieldSpans> {
    let mut fields: FieldSpans = std::array::from_fn(|_| None);
    let mut pos = 0;
    for key in CacheKey::PMS_ORDER {
        let len = data[pos..].find('\n').ok_or_else(|| {
            Error::InvalidCacheEntry(format!("flat cache truncated at {}", key.name()))
        })?;
        fields[key as usize] = Some(pos..pos + len);
        pos += len + 1;
    }
    Ok(fields)
}

/// md5 format: `KEY=VALUE` lines in any order. A line without `=` or
/// without a terminating newline is fatal; an unrecognized key is skipped.
fn parse_md5(data: &str) -> Result<FieldSpans> {
    let mut fields: FieldSpans = std::array::from_fn(|_| None);
    let mut pos = 0;
    while pos < data.len() {
        let len = data[pos..]
            .find('\n')
            .ok_or_else(|| Error::InvalidCacheEntry("unterminated md5 cache line".to_string()))?;
        let line = &data[pos..pos + len];
        let eq = line.find('=').ok_or_else(|| {
            Error::InvalidCacheEntry(format!("md5 cache line without '=': {line:?}"))
        })?;
        match CacheKey::from_name(&line[..eq]) {
            Some(key) => fields[key as usize] = Some(pos + eq + 1..pos + len),
            None => debug!(key = &line[..eq], "unrecognized cache key"),
        }
        pos += len + 1;
    }
    Ok(fields)
}

use std::fmt;
use std::str::FromStr;

use crate::arches::ArchTable;
use crate::error::{Error, Result};

/// Per-architecture keyword status.
///
/// `None` is the resting state of a vector slot: the `KEYWORDS` value
/// named no token for that architecture.
///
/// See [PMS 7.3.3](https://projects.gentoo.org/pms/9/pms.html#keywords).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    /// No keyword present for this architecture.
    None,
    /// The package is testing/unstable on this architecture (e.g. `~amd64`).
    Testing,
    /// The package is stable on this architecture (e.g. `amd64`).
    Stable,
    /// The keyword is explicitly removed (e.g. `-amd64`, or `-*`).
    Minus,
}

impl Stability {
    /// Classify a keyword token by its lead character: `-` is removed,
    /// `~` is testing, anything else is stable.
    pub fn decode(lead: char) -> Stability {
        match lead {
            '-' => Stability::Minus,
            '~' => Stability::Testing,
            _ => Stability::Stable,
        }
    }
}

/// A single architecture keyword entry from the `KEYWORDS` variable.
///
/// Each keyword consists of an architecture name and a stability level.
///
/// See [PMS 7.3.3](https://projects.gentoo.org/pms/9/pms.html#keywords).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keyword {
    /// Architecture name (e.g. `amd64`, `arm64`, `x86`).
    pub arch: String,
    /// Stability classification.
    pub stability: Stability,
}

impl Keyword {
    /// Parse a space-separated `KEYWORDS` line into a list of keywords.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_keywords::{Keyword, Stability};
    ///
    /// let kws = Keyword::parse_line("amd64 ~arm64 -x86").unwrap();
    /// assert_eq!(kws.len(), 3);
    /// assert_eq!(kws[0].stability, Stability::Stable);
    /// assert_eq!(kws[1].stability, Stability::Testing);
    /// assert_eq!(kws[2].stability, Stability::Minus);
    /// ```
    pub fn parse_line(input: &str) -> Result<Vec<Keyword>> {
        input
            .split_whitespace()
            .map(|token| token.parse())
            .collect()
    }
}

impl FromStr for Keyword {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidKeyword("empty keyword".to_string()));
        }

        if let Some(arch) = s.strip_prefix('~') {
            if arch.is_empty() {
                return Err(Error::InvalidKeyword(s.to_string()));
            }
            Ok(Keyword {
                arch: arch.to_string(),
                stability: Stability::Testing,
            })
        } else if let Some(arch) = s.strip_prefix('-') {
            if arch.is_empty() {
                return Err(Error::InvalidKeyword(s.to_string()));
            }
            Ok(Keyword {
                arch: arch.to_string(),
                stability: Stability::Minus,
            })
        } else {
            Ok(Keyword {
                arch: s.to_string(),
                stability: Stability::Stable,
            })
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.stability {
            Stability::Stable | Stability::None => write!(f, "{}", self.arch),
            Stability::Testing => write!(f, "~{}", self.arch),
            Stability::Minus => write!(f, "-{}", self.arch),
        }
    }
}

/// An architecture-indexed keyword status vector.
///
/// Slots are addressed by [`ArchTable`] indices. The traversal driver owns
/// one vector, grows it to the table size and re-decodes it in place for
/// every visited package version; the decoder itself never resizes.
///
/// # Examples
///
/// ```
/// use portage_keywords::{ArchTable, KeywordVector, Stability};
///
/// let table: ArchTable = ["x86", "amd64"].into_iter().collect();
/// let mut vector = KeywordVector::new();
/// vector.grow(table.len());
/// vector.decode("~x86 amd64", &table);
/// assert_eq!(vector.get(0), Stability::Testing);
/// assert_eq!(vector.get(1), Stability::Stable);
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeywordVector {
    slots: Vec<Stability>,
}

impl KeywordVector {
    pub fn new() -> KeywordVector {
        KeywordVector::default()
    }

    /// Grow to at least `len` slots; never shrinks.
    pub fn grow(&mut self, len: usize) {
        if len > self.slots.len() {
            self.slots.resize(len, Stability::None);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Status at `index`; out of range reads as `None`.
    pub fn get(&self, index: usize) -> Stability {
        self.slots.get(index).copied().unwrap_or(Stability::None)
    }

    pub fn statuses(&self) -> &[Stability] {
        &self.slots
    }

    /// Decode a raw `KEYWORDS` value into this vector.
    ///
    /// All slots are reset to `None` first. A value starting with `-*`
    /// (after leading whitespace) sets every slot to `Minus` and ends the
    /// decode. Otherwise the value is split on whitespace and each token's
    /// architecture is resolved through the table; tokens naming an
    /// unknown architecture are ignored.
    pub fn decode(&mut self, raw: &str, table: &ArchTable) {
        self.slots.fill(Stability::None);

        if raw.trim_start().starts_with("-*") {
            self.slots.fill(Stability::Minus);
            return;
        }

        for token in raw.split_whitespace() {
            if let (Some(index), Some(first)) = (table.index_of(token), token.chars().next()) {
                if index < self.slots.len() {
                    self.slots[index] = Stability::decode(first);
                }
            }
        }
    }

    /// The non-`None` slots as keywords, in table order.
    pub fn snapshot(&self, table: &ArchTable) -> Vec<Keyword> {
        let mut keywords = Vec::new();
        for (index, name) in table.names().iter().enumerate() {
            let stability = self.get(index);
            if stability != Stability::None {
                keywords.push(Keyword {
                    arch: name.clone(),
                    stability,
                });
            }
        }
        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ArchTable {
        ["alpha", "amd64", "x86"].into_iter().collect()
    }

    #[test]
    fn decode_status_is_total() {
        assert_eq!(Stability::decode('-'), Stability::Minus);
        assert_eq!(Stability::decode('~'), Stability::Testing);
        assert_eq!(Stability::decode('a'), Stability::Stable);
        assert_eq!(Stability::decode('+'), Stability::Stable);
        assert_eq!(Stability::decode('1'), Stability::Stable);
    }

    #[test]
    fn decode_status_idempotent_on_representative() {
        for c in ['-', '~', 'a', '+', 'x'] {
            let status = Stability::decode(c);
            let representative = match status {
                Stability::Minus => '-',
                Stability::Testing => '~',
                Stability::Stable => '+',
                Stability::None => unreachable!(),
            };
            assert_eq!(Stability::decode(representative), status);
        }
    }

    #[test]
    fn parse_stable() {
        let kw: Keyword = "amd64".parse().unwrap();
        assert_eq!(kw.arch, "amd64");
        assert_eq!(kw.stability, Stability::Stable);
    }

    #[test]
    fn parse_testing() {
        let kw: Keyword = "~arm64".parse().unwrap();
        assert_eq!(kw.arch, "arm64");
        assert_eq!(kw.stability, Stability::Testing);
    }

    #[test]
    fn parse_minus() {
        let kw: Keyword = "-x86".parse().unwrap();
        assert_eq!(kw.arch, "x86");
        assert_eq!(kw.stability, Stability::Minus);
    }

    #[test]
    fn parse_minus_star() {
        let kw: Keyword = "-*".parse().unwrap();
        assert_eq!(kw.arch, "*");
        assert_eq!(kw.stability, Stability::Minus);
    }

    #[test]
    fn parse_line_mixed() {
        let kws = Keyword::parse_line("amd64 ~arm64 -x86").unwrap();
        assert_eq!(kws.len(), 3);
        assert_eq!(kws[0].arch, "amd64");
        assert_eq!(kws[1].arch, "arm64");
        assert_eq!(kws[2].arch, "x86");
    }

    #[test]
    fn parse_invalid() {
        assert!("".parse::<Keyword>().is_err());
        assert!("~".parse::<Keyword>().is_err());
        assert!("-".parse::<Keyword>().is_err());
    }

    #[test]
    fn display_round_trip() {
        for s in ["amd64", "~arm64", "-x86", "-*"] {
            let kw: Keyword = s.parse().unwrap();
            assert_eq!(kw.to_string(), s);
        }
    }

    #[test]
    fn vector_grows_only() {
        let mut vector = KeywordVector::new();
        vector.grow(4);
        assert_eq!(vector.len(), 4);
        vector.grow(2);
        assert_eq!(vector.len(), 4);
        assert_eq!(vector.get(3), Stability::None);
    }

    #[test]
    fn decode_mixed_tokens() {
        let table = table();
        let mut vector = KeywordVector::new();
        vector.grow(table.len());
        vector.decode("alpha ~amd64 -x86 mips", &table);
        assert_eq!(vector.get(0), Stability::Stable);
        assert_eq!(vector.get(1), Stability::Testing);
        assert_eq!(vector.get(2), Stability::Minus);
    }

    #[test]
    fn decode_resets_previous_state() {
        let table = table();
        let mut vector = KeywordVector::new();
        vector.grow(table.len());
        vector.decode("alpha amd64 x86", &table);
        vector.decode("~amd64", &table);
        assert_eq!(vector.get(0), Stability::None);
        assert_eq!(vector.get(1), Stability::Testing);
        assert_eq!(vector.get(2), Stability::None);
    }

    #[test]
    fn decode_blanket_minus() {
        let table = table();
        let mut vector = KeywordVector::new();
        vector.grow(table.len());
        vector.decode("  -*", &table);
        assert_eq!(vector.statuses(), [Stability::Minus; 3]);
    }

    #[test]
    fn decode_blanket_minus_ends_the_decode() {
        let table = table();
        let mut vector = KeywordVector::new();
        vector.grow(table.len());
        vector.decode("-* ~x86", &table);
        assert_eq!(vector.get(2), Stability::Minus);
    }

    #[test]
    fn decode_blanket_minus_empty_vector() {
        let mut vector = KeywordVector::new();
        vector.decode("-*", &ArchTable::new());
        assert!(vector.is_empty());
    }

    #[test]
    fn decode_never_resizes() {
        let table = table();
        let mut vector = KeywordVector::new();
        vector.grow(2);
        vector.decode("alpha ~amd64 -x86", &table);
        assert_eq!(vector.len(), 2);
        assert_eq!(vector.get(0), Stability::Stable);
        assert_eq!(vector.get(1), Stability::Testing);
        assert_eq!(vector.get(2), Stability::None);
    }

    #[test]
    fn snapshot_skips_unkeyworded() {
        let table = table();
        let mut vector = KeywordVector::new();
        vector.grow(table.len());
        vector.decode("~alpha x86", &table);
        let kws = vector.snapshot(&table);
        assert_eq!(kws.len(), 2);
        assert_eq!(kws[0].to_string(), "~alpha");
        assert_eq!(kws[1].to_string(), "x86");
    }
}

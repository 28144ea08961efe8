use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use winnow::combinator::{alt, opt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::error::Error;

/// An ebuild version: dotted numeric components, an optional single letter,
/// a chain of `_alpha`/`_beta`/`_pre`/`_rc`/`_p` suffixes and an optional
/// `-rN` revision.
///
/// Ordering follows the comparison algorithm of
/// [PMS 3.3](https://projects.gentoo.org/pms/9/pms.html#version-comparison):
/// components are compared positionally (missing components count as zero,
/// and among numerically equal components the one with more leading zeroes
/// is older), then the letter, then the suffix chain (a bare version sorts
/// after `_rc` and before `_p`), then the revision.
///
/// # Examples
///
/// ```
/// use portage_keywords::Version;
///
/// let old: Version = "1.0_rc3".parse().unwrap();
/// let new: Version = "1.0".parse().unwrap();
/// assert!(old < new);
///
/// let a: Version = "1.0".parse().unwrap();
/// let b: Version = "1.00".parse().unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<String>,
    letter: Option<char>,
    suffixes: Vec<Suffix>,
    revision: Option<u64>,
}

/// A version suffix such as `_alpha1` or `_p20240101`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffix {
    kind: SuffixKind,
    number: Option<u64>,
}

/// The recognized version suffixes, in ascending order of precedence
/// among themselves (see [`Version`] for where a bare version sorts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixKind {
    Alpha,
    Beta,
    Pre,
    Rc,
    P,
}

impl SuffixKind {
    fn as_str(self) -> &'static str {
        match self {
            SuffixKind::Alpha => "alpha",
            SuffixKind::Beta => "beta",
            SuffixKind::Pre => "pre",
            SuffixKind::Rc => "rc",
            SuffixKind::P => "p",
        }
    }
}

/// Rank of a suffix slot; the absent suffix sits between `_rc` and `_p`.
fn suffix_rank(suffix: Option<&Suffix>) -> u8 {
    match suffix {
        Some(s) => match s.kind {
            SuffixKind::Alpha => 0,
            SuffixKind::Beta => 1,
            SuffixKind::Pre => 2,
            SuffixKind::Rc => 3,
            SuffixKind::P => 5,
        },
        None => 4,
    }
}

fn strip_zeroes(digits: &[u8]) -> &[u8] {
    let n = digits.iter().take_while(|c| **c == b'0').count();
    &digits[n..]
}

/// Numeric comparison of two digit strings without overflow concerns.
fn cmp_digits(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_zeroes(a);
    let b = strip_zeroes(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_component(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        // a missing component counts as zero
        (None, Some(b)) => cmp_digits(b"", b.as_bytes()),
        (Some(a), None) => cmp_digits(a.as_bytes(), b""),
        (Some(a), Some(b)) => {
            let (mut a, mut b) = (a.as_bytes(), b.as_bytes());
            while let (Some(b'0'), Some(b'0')) = (a.first(), b.first()) {
                a = &a[1..];
                b = &b[1..];
            }
            // among equal numbers the side with more leading zeroes is older
            match (a.first(), b.first()) {
                (Some(b'0'), Some(_)) => Ordering::Less,
                (Some(_), Some(b'0')) => Ordering::Greater,
                _ => cmp_digits(a, b),
            }
        }
    }
}

fn cmp_suffixes(a: &[Suffix], b: &[Suffix]) -> Ordering {
    let mut i = 0;
    loop {
        let (sa, sb) = (a.get(i), b.get(i));
        if sa.is_none() && sb.is_none() {
            return Ordering::Equal;
        }
        let ord = suffix_rank(sa).cmp(&suffix_rank(sb));
        if ord != Ordering::Equal {
            return ord;
        }
        let na = sa.and_then(|s| s.number).unwrap_or(0);
        let nb = sb.and_then(|s| s.number).unwrap_or(0);
        let ord = na.cmp(&nb);
        if ord != Ordering::Equal {
            return ord;
        }
        i += 1;
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let count = self.components.len().max(other.components.len());
        for i in 0..count {
            let ord = cmp_component(
                self.components.get(i).map(String::as_str),
                other.components.get(i).map(String::as_str),
            );
            if ord != Ordering::Equal {
                return ord;
            }
        }
        // an absent letter sorts before any letter
        let ord = self.letter.cmp(&other.letter);
        if ord != Ordering::Equal {
            return ord;
        }
        let ord = cmp_suffixes(&self.suffixes, &other.suffixes);
        if ord != Ordering::Equal {
            return ord;
        }
        let ra = self.revision.unwrap_or(0);
        let rb = other.revision.unwrap_or(0);
        ra.cmp(&rb)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_version
            .parse(s)
            .map_err(|_| Error::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{component}")?;
        }
        if let Some(letter) = self.letter {
            write!(f, "{letter}")?;
        }
        for suffix in &self.suffixes {
            write!(f, "{suffix}")?;
        }
        if let Some(revision) = self.revision {
            write!(f, "-r{revision}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_{}", self.kind.as_str())?;
        if let Some(number) = self.number {
            write!(f, "{number}")?;
        }
        Ok(())
    }
}

// Winnow parsers

fn parse_component(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| c.is_ascii_digit())
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<u64> {
    take_while(1.., |c: char| c.is_ascii_digit())
        .try_map(str::parse::<u64>)
        .parse_next(input)
}

fn parse_suffix(input: &mut &str) -> ModalResult<Suffix> {
    '_'.parse_next(input)?;
    let kind = alt((
        "alpha".value(SuffixKind::Alpha),
        "beta".value(SuffixKind::Beta),
        "pre".value(SuffixKind::Pre),
        "rc".value(SuffixKind::Rc),
        "p".value(SuffixKind::P),
    ))
    .parse_next(input)?;
    let number = opt(parse_number).parse_next(input)?;
    Ok(Suffix { kind, number })
}

pub(crate) fn parse_version(input: &mut &str) -> ModalResult<Version> {
    let first = parse_component(input)?;
    let rest: Vec<String> = repeat(0.., preceded('.', parse_component)).parse_next(input)?;
    let letter = opt(one_of('a'..='z')).parse_next(input)?;
    let suffixes: Vec<Suffix> = repeat(0.., parse_suffix).parse_next(input)?;
    let revision = opt(preceded("-r", parse_number)).parse_next(input)?;

    let mut components = Vec::with_capacity(rest.len() + 1);
    components.push(first);
    components.extend(rest);
    Ok(Version {
        components,
        letter,
        suffixes,
        revision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn parse_simple() {
        let ver = v("1.0.18");
        assert_eq!(ver.components, vec!["1", "0", "18"]);
        assert_eq!(ver.letter, None);
        assert!(ver.suffixes.is_empty());
        assert_eq!(ver.revision, None);
    }

    #[test]
    fn parse_full() {
        let ver = v("2.0.12b_alpha4_p5-r3");
        assert_eq!(ver.components, vec!["2", "0", "12"]);
        assert_eq!(ver.letter, Some('b'));
        assert_eq!(ver.suffixes.len(), 2);
        assert_eq!(ver.suffixes[0].kind, SuffixKind::Alpha);
        assert_eq!(ver.suffixes[0].number, Some(4));
        assert_eq!(ver.suffixes[1].kind, SuffixKind::P);
        assert_eq!(ver.suffixes[1].number, Some(5));
        assert_eq!(ver.revision, Some(3));
    }

    #[test]
    fn parse_bare_suffix() {
        let ver = v("1.0_pre");
        assert_eq!(ver.suffixes[0].kind, SuffixKind::Pre);
        assert_eq!(ver.suffixes[0].number, None);
    }

    #[test]
    fn parse_invalid() {
        assert!("".parse::<Version>().is_err());
        assert!("1..2".parse::<Version>().is_err());
        assert!("a1".parse::<Version>().is_err());
        assert!("1.0_".parse::<Version>().is_err());
        assert!("1.0_x1".parse::<Version>().is_err());
        assert!("1.0-r".parse::<Version>().is_err());
        assert!("1.0 ".parse::<Version>().is_err());
    }

    #[test]
    fn display_round_trip() {
        for s in ["1.0", "1.0.18.1", "2.0.12b", "1.0_alpha4_p5", "0.96.1-r2", "1.0_rc"] {
            assert_eq!(v(s).to_string(), s);
        }
    }

    #[test]
    fn ordering_components() {
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.1") < v("1.10"));
        assert!(v("1.9") < v("2.0"));
        assert!(v("1.0") < v("1.0.1"));
        assert_eq!(v("1.0"), v("1.0.0"));
    }

    #[test]
    fn ordering_leading_zeroes() {
        assert!(v("1.01") < v("1.1"));
        assert!(v("1.010") < v("1.10"));
        assert_eq!(v("1.0"), v("1.00"));
        assert!(v("1.001") < v("1.01"));
    }

    #[test]
    fn ordering_letters() {
        assert!(v("1.0") < v("1.0a"));
        assert!(v("1.0a") < v("1.0z"));
    }

    #[test]
    fn ordering_suffix_ladder() {
        assert!(v("1.0_alpha1") < v("1.0_beta"));
        assert!(v("1.0_beta") < v("1.0_pre"));
        assert!(v("1.0_pre") < v("1.0_rc"));
        assert!(v("1.0_rc") < v("1.0"));
        assert!(v("1.0") < v("1.0_p1"));
    }

    #[test]
    fn ordering_suffix_numbers() {
        assert!(v("1.0_p1") < v("1.0_p2"));
        assert!(v("1.0_rc2") < v("1.0_rc10"));
        assert!(v("1.0_alpha") < v("1.0_alpha1"));
        assert!(v("1.0_alpha") < v("1.0_alpha_p1"));
    }

    #[test]
    fn ordering_revisions() {
        assert!(v("1.0") < v("1.0-r1"));
        assert!(v("1.0-r1") < v("1.0-r2"));
        assert!(v("1.0-r2") < v("1.0-r10"));
        assert_eq!(v("1.0"), v("1.0-r0"));
    }

    #[test]
    fn ordering_mixed() {
        assert!(v("1.0_rc3-r4") < v("1.0"));
        assert!(v("1.0-r9") < v("1.0a"));
        assert!(v("20240101") < v("20240102"));
    }
}

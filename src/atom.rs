use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::version::Version;

/// A package identifier: optional category, optional name, optional version.
///
/// Atoms come from two places: package entries in a metadata cache (always
/// `name-version`, with the category taken from the directory) and
/// caller-supplied filters, which may leave parts out. A filter without a
/// version matches every version of the package; a filter of the form
/// `category/` (empty name) matches every package in the category.
///
/// # Examples
///
/// ```
/// use portage_keywords::{Atom, AtomCmp};
///
/// let atom: Atom = "app-portage/portage-utils-0.96.1".parse().unwrap();
/// assert_eq!(atom.category.as_deref(), Some("app-portage"));
/// assert_eq!(atom.name.as_deref(), Some("portage-utils"));
///
/// let filter: Atom = "app-portage/portage-utils".parse().unwrap();
/// assert_eq!(atom.compare(&filter), AtomCmp::Equal);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// Category, e.g. `app-portage`.
    pub category: Option<String>,
    /// Package name, e.g. `portage-utils`.
    pub name: Option<String>,
    /// Version, when the input carried one.
    pub version: Option<Version>,
}

/// Outcome of [`Atom::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomCmp {
    /// Same package, left version is older.
    Older,
    /// Same package, left version is newer.
    Newer,
    /// Same package and version, or same package with a version missing
    /// on either side.
    Equal,
    /// Different packages.
    Incomparable,
}

impl Atom {
    /// The de-duplication identity: this atom with the version stripped.
    pub fn base(&self) -> Atom {
        Atom {
            category: self.category.clone(),
            name: self.name.clone(),
            version: None,
        }
    }

    /// Compare two atoms by package identity, then by version.
    ///
    /// Category or name mismatch yields [`AtomCmp::Incomparable`]. A side
    /// missing its name matches the whole category (when both categories
    /// are present); a side missing its version matches every version.
    pub fn compare(&self, other: &Atom) -> AtomCmp {
        if let (Some(a), Some(b)) = (&self.category, &other.category) {
            if a != b {
                return AtomCmp::Incomparable;
            }
        }

        match (&self.name, &other.name) {
            (Some(a), Some(b)) if a != b => return AtomCmp::Incomparable,
            (Some(_), Some(_)) => {}
            _ => {
                // a category-only atom matches anything in the category
                return if self.category.is_some() && other.category.is_some() {
                    AtomCmp::Equal
                } else {
                    AtomCmp::Incomparable
                };
            }
        }

        match (&self.version, &other.version) {
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => AtomCmp::Older,
                Ordering::Greater => AtomCmp::Newer,
                Ordering::Equal => AtomCmp::Equal,
            },
            _ => AtomCmp::Equal,
        }
    }
}

impl FromStr for Atom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::InvalidAtom(s.to_string()));
        }

        let (category, rest) = match s.rsplit_once('/') {
            Some((cat, rest)) => {
                // only the last path component counts as the category
                let cat = cat.rsplit('/').next().unwrap_or("");
                let category = if cat.is_empty() {
                    None
                } else {
                    Some(cat.to_string())
                };
                (category, rest)
            }
            None => (None, s),
        };

        if rest.is_empty() {
            return match category {
                Some(_) => Ok(Atom {
                    category,
                    name: None,
                    version: None,
                }),
                None => Err(Error::InvalidAtom(s.to_string())),
            };
        }

        // the version starts at the rightmost '-' followed by a digit whose
        // whole tail parses as a version
        let mut split = None;
        for (i, _) in rest.match_indices('-') {
            let tail = &rest[i + 1..];
            if tail.starts_with(|c: char| c.is_ascii_digit()) {
                if let Ok(version) = tail.parse::<Version>() {
                    split = Some((i, version));
                }
            }
        }

        let (name, version) = match split {
            Some((i, version)) if i > 0 => (&rest[..i], Some(version)),
            Some(_) => return Err(Error::InvalidAtom(s.to_string())),
            None => (rest, None),
        };

        Ok(Atom {
            category,
            name: Some(name.to_string()),
            version,
        })
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(category) = &self.category {
            write!(f, "{category}/")?;
        }
        if let Some(name) = &self.name {
            write!(f, "{name}")?;
        }
        if let Some(version) = &self.version {
            write!(f, "-{version}")?;
        }
        Ok(())
    }
}

/// Package-name comparator placing newer versions first.
///
/// Intended as the package comparator of the sorted traversal driver:
/// names of the same package sort by version descending, different
/// packages sort lexically, and names that do not explode into atoms fall
/// back to plain lexical order.
pub fn version_descending(a: &str, b: &str) -> Ordering {
    match (a.parse::<Atom>(), b.parse::<Atom>()) {
        (Ok(pa), Ok(pb)) => match pa.compare(&pb) {
            AtomCmp::Newer => Ordering::Less,
            AtomCmp::Older => Ordering::Greater,
            AtomCmp::Equal => a.cmp(b),
            AtomCmp::Incomparable => match (&pa.name, &pb.name) {
                (Some(na), Some(nb)) => na.cmp(nb).then_with(|| a.cmp(b)),
                _ => a.cmp(b),
            },
        },
        _ => a.cmp(b),
    }
}

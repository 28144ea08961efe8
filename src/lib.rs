//! Gentoo metadata cache traversal and architecture keyword analysis.
//!
//! This crate reads the metadata cache of one or more ebuild repositories,
//! in either on-disk layout described by [PMS], and streams each version's
//! decoded `KEYWORDS` vector through selectable analyses: stabilization
//! candidates, dropped keywords, testing-only packages, latest stable or
//! testing versions, and tree-wide statistics.
//!
//! [PMS]: https://projects.gentoo.org/pms/latest/pms.html
//!
//! # Overview
//!
//! Ebuild files are bash scripts that require a full shell interpreter to
//! evaluate. The **metadata cache** stores pre-computed metadata per
//! package version; repositories carry it either as `metadata/md5-cache/`
//! (`KEY=VALUE` lines) or as the older fixed-field `metadata/cache/`
//! layout. [`CacheDb`] probes for whichever layout is present and iterates
//! it category by category; [`Pipeline`] drives one or more repositories
//! in version-descending order, decodes keywords against the merged
//! [`ArchTable`], and applies an [`Analysis`] to every version.
//!
//! # Examples
//!
//! Decode a `KEYWORDS` value against an architecture table:
//!
//! ```
//! use portage_keywords::{ArchTable, KeywordVector, Stability};
//!
//! let table: ArchTable = ["amd64", "arm64", "x86"].into_iter().collect();
//! let mut vector = KeywordVector::new();
//! vector.grow(table.len());
//! vector.decode("~arm64 amd64", &table);
//!
//! assert_eq!(vector.get(0), Stability::Stable);
//! assert_eq!(vector.get(1), Stability::Testing);
//! assert_eq!(vector.get(2), Stability::None);
//! ```
//!
//! List stabilization candidates for an architecture:
//!
//! ```no_run
//! use portage_keywords::{Analysis, Pipeline};
//!
//! let mut pipeline = Pipeline::new("/", "arm64");
//! pipeline.repos.push("/var/db/repos/gentoo".into());
//! for report in pipeline.collect(Analysis::Imlate)? {
//!     println!("{report}");
//! }
//! # Ok::<(), portage_keywords::Error>(())
//! ```

mod analysis;
mod arches;
mod atom;
mod cache;
mod error;
mod keyword;
mod pipeline;
mod repo;
mod version;

// Re-export public types
pub use analysis::{Analysis, ArchCount, KeywordReport, TreeStats};
pub use arches::ArchTable;
pub use atom::{version_descending, Atom, AtomCmp};
pub use cache::{CacheEntry, CacheFormat, CacheKey};
pub use error::{Error, Result};
pub use keyword::{Keyword, KeywordVector, Stability};
pub use pipeline::Pipeline;
pub use repo::{CacheDb, Categories, Category, NameCmp, Package, Packages};
pub use version::Version;

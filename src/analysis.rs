use std::fmt;
use std::str::FromStr;

use crate::arches::ArchTable;
use crate::atom::{Atom, AtomCmp};
use crate::error::Error;
use crate::keyword::{Keyword, Stability};
use crate::pipeline::PipelineContext;

/// Selectable keyword analysis over a version-descending package stream.
///
/// Every analysis inspects the decoded keyword vector of each visited
/// version relative to a single target architecture; most of them report a
/// package at most once and rely on the newest version being visited first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Analysis {
    /// Versions testing for the target while stable on another
    /// architecture, the usual stabilization candidates.
    Imlate,
    /// Packages whose newest versions silently lost the target keyword
    /// while other architectures kept theirs.
    Dropped,
    /// Packages with testing versions for the target but no stable one.
    TestingOnly,
    /// Every newest version carrying the target keyword at all.
    All,
    /// Versions not keyworded for the target while keyworded elsewhere.
    NotKeyworded,
    /// The newest stable version of each package.
    LatestStable,
    /// The newest testing version of each package.
    LatestTesting,
}

impl Analysis {
    /// Canonical selector name.
    pub fn as_str(self) -> &'static str {
        match self {
            Analysis::Imlate => "imlate",
            Analysis::Dropped => "dropped",
            Analysis::TestingOnly => "needsstable",
            Analysis::All => "all",
            Analysis::NotKeyworded => "not",
            Analysis::LatestStable => "stable",
            Analysis::LatestTesting => "testing",
        }
    }

    pub(crate) fn check(self) -> Box<dyn Check> {
        match self {
            Analysis::Imlate => Box::new(Imlate),
            Analysis::Dropped => Box::new(Dropped::default()),
            Analysis::TestingOnly => Box::new(TestingOnly::default()),
            Analysis::All => Box::new(All),
            Analysis::NotKeyworded => Box::new(NotKeyworded),
            Analysis::LatestStable => Box::new(Latest {
                wanted: Stability::Stable,
            }),
            Analysis::LatestTesting => Box::new(Latest {
                wanted: Stability::Testing,
            }),
        }
    }
}

impl FromStr for Analysis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Analysis, Error> {
        match s {
            "imlate" => Ok(Analysis::Imlate),
            "dropped" => Ok(Analysis::Dropped),
            "needsstable" => Ok(Analysis::TestingOnly),
            "all" => Ok(Analysis::All),
            "not" => Ok(Analysis::NotKeyworded),
            "stable" => Ok(Analysis::LatestStable),
            "testing" => Ok(Analysis::LatestTesting),
            _ => Err(Error::UnknownAnalysis(s.to_string())),
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis hit: a package version and its keywords at that version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordReport {
    pub atom: Atom,
    pub keywords: Vec<Keyword>,
}

impl fmt::Display for KeywordReport {
    /// Prints the atom followed by its stable (`+`) and testing (`~`)
    /// keywords in architecture table order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.atom)?;
        for keyword in &self.keywords {
            match keyword.stability {
                Stability::Stable => write!(f, " +{}", keyword.arch)?,
                Stability::Testing => write!(f, " ~{}", keyword.arch)?,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Aggregate counters over a whole repository traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    /// Distinct categories visited.
    pub categories: usize,
    /// Distinct packages visited, counted by name.
    pub packages: usize,
    /// Total versions visited.
    pub ebuilds: usize,
    /// Per-architecture package counts, in table order.
    pub arches: Vec<ArchCount>,
}

/// Stable/testing package totals for one architecture.
///
/// A package counts once per architecture, with its best status across
/// all of its versions; stable wins over testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchCount {
    pub arch: String,
    pub stable: usize,
    pub testing: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "architectures: {}", self.arches.len())?;
        writeln!(f, "categories:    {}", self.categories)?;
        writeln!(f, "packages:      {}", self.packages)?;
        writeln!(f, "ebuilds:       {}", self.ebuilds)?;
        for count in &self.arches {
            writeln!(
                f,
                "{}: {} stable, {} testing",
                count.arch, count.stable, count.testing
            )?;
        }
        Ok(())
    }
}

/// Outcome of inspecting one version.
///
/// `suppress` asks the driver to skip the remaining (older) versions of
/// the same package.
pub(crate) struct Visit {
    pub(crate) report: Option<KeywordReport>,
    pub(crate) suppress: bool,
}

impl Visit {
    fn pass() -> Visit {
        Visit {
            report: None,
            suppress: false,
        }
    }

    fn emit(report: KeywordReport) -> Visit {
        Visit {
            report: Some(report),
            suppress: true,
        }
    }
}

/// Per-version hook of one analysis run.
pub(crate) trait Check {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit;

    /// End-of-stream flush for analyses that hold a candidate.
    fn finish(&mut self) -> Option<KeywordReport> {
        None
    }
}

fn report(atom: &Atom, ctx: &PipelineContext) -> KeywordReport {
    KeywordReport {
        atom: atom.clone(),
        keywords: ctx.vector.snapshot(&ctx.table),
    }
}

struct Imlate;

impl Check for Imlate {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit {
        if ctx.target_status() == Stability::Testing
            && ctx
                .vector
                .statuses()
                .iter()
                .any(|s| *s == Stability::Stable)
        {
            return Visit::emit(report(atom, ctx));
        }
        Visit::pass()
    }
}

struct NotKeyworded;

impl Check for NotKeyworded {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit {
        let present = matches!(
            ctx.target_status(),
            Stability::Testing | Stability::Stable
        );
        if !present
            && ctx
                .vector
                .statuses()
                .iter()
                .any(|s| matches!(s, Stability::Stable | Stability::Testing))
        {
            return Visit::emit(report(atom, ctx));
        }
        Visit::pass()
    }
}

struct All;

impl Check for All {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit {
        match ctx.target_status() {
            Stability::Stable | Stability::Testing => Visit::emit(report(atom, ctx)),
            _ => Visit::pass(),
        }
    }
}

struct Latest {
    wanted: Stability,
}

impl Check for Latest {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit {
        if ctx.target_status() == self.wanted {
            Visit::emit(report(atom, ctx))
        } else {
            Visit::pass()
        }
    }
}

/// Candidate report held across version visits within one package.
#[derive(Default)]
struct Candidate {
    last: Option<Atom>,
    held: Option<KeywordReport>,
}

impl Candidate {
    /// Returns the held report when `atom` starts a different package
    /// than the previous call's.
    fn cross(&mut self, atom: &Atom) -> Option<KeywordReport> {
        let changed = match &self.last {
            Some(last) => atom.compare(last) == AtomCmp::Incomparable,
            None => true,
        };
        if changed {
            self.last = Some(atom.base());
            self.held.take()
        } else {
            None
        }
    }

    /// Keeps `report` unless an earlier (newer) version is already held.
    fn hold(&mut self, report: KeywordReport) {
        if self.held.is_none() {
            self.held = Some(report);
        }
    }

    fn clear(&mut self) {
        self.held = None;
    }

    fn take(&mut self) -> Option<KeywordReport> {
        self.held.take()
    }
}

/// A keyword counts as dropped when the newest version lacks it, some
/// other architecture is still keyworded there, and the keyword was not
/// removed with an explicit `-arch`.
#[derive(Default)]
struct Dropped {
    candidate: Candidate,
}

impl Check for Dropped {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit {
        let flushed = self.candidate.cross(atom);
        match ctx.target_status() {
            // explicitly removed, not dropped
            Stability::Minus => {
                self.candidate.clear();
                Visit {
                    report: flushed,
                    suppress: true,
                }
            }
            // keyword still present here; report the newer version that
            // lost it, if one was held
            Stability::Stable | Stability::Testing => Visit {
                report: flushed.or_else(|| self.candidate.take()),
                suppress: true,
            },
            Stability::None => {
                if ctx
                    .vector
                    .statuses()
                    .iter()
                    .any(|s| matches!(s, Stability::Stable | Stability::Testing))
                {
                    self.candidate.hold(report(atom, ctx));
                }
                Visit {
                    report: flushed,
                    suppress: false,
                }
            }
        }
    }

    fn finish(&mut self) -> Option<KeywordReport> {
        self.candidate.take()
    }
}

/// Testing coverage without any stable version for the target.
#[derive(Default)]
struct TestingOnly {
    candidate: Candidate,
}

impl Check for TestingOnly {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit {
        let flushed = self.candidate.cross(atom);
        match ctx.target_status() {
            // a stable version disqualifies the whole package
            Stability::Stable => {
                self.candidate.clear();
                Visit {
                    report: flushed,
                    suppress: true,
                }
            }
            Stability::Testing => {
                self.candidate.hold(report(atom, ctx));
                Visit {
                    report: flushed,
                    suppress: false,
                }
            }
            Stability::Minus | Stability::None => Visit {
                report: flushed,
                suppress: false,
            },
        }
    }

    fn finish(&mut self) -> Option<KeywordReport> {
        self.candidate.take()
    }
}

/// Accumulator behind [`Pipeline::stats`](crate::Pipeline::stats).
#[derive(Debug, Default)]
pub(crate) struct StatsState {
    last_category: Option<String>,
    last_name: Option<String>,
    best: Vec<Stability>,
    stable: Vec<usize>,
    testing: Vec<usize>,
    categories: usize,
    packages: usize,
    ebuilds: usize,
}

impl StatsState {
    fn grow(&mut self, len: usize) {
        if len > self.best.len() {
            self.best.resize(len, Stability::None);
            self.stable.resize(len, 0);
            self.testing.resize(len, 0);
        }
    }

    /// Fold the current package's best statuses into the totals.
    fn fold(&mut self) {
        for (index, best) in self.best.iter_mut().enumerate() {
            match *best {
                Stability::Stable => self.stable[index] += 1,
                Stability::Testing => self.testing[index] += 1,
                _ => {}
            }
            *best = Stability::None;
        }
    }

    pub(crate) fn finalize(mut self, table: &ArchTable) -> TreeStats {
        self.fold();
        let arches = table
            .names()
            .iter()
            .enumerate()
            .map(|(index, arch)| ArchCount {
                arch: arch.clone(),
                stable: self.stable.get(index).copied().unwrap_or(0),
                testing: self.testing.get(index).copied().unwrap_or(0),
            })
            .collect();
        TreeStats {
            categories: self.categories,
            packages: self.packages,
            ebuilds: self.ebuilds,
            arches,
        }
    }
}

impl Check for StatsState {
    fn visit(&mut self, atom: &Atom, ctx: &PipelineContext) -> Visit {
        self.grow(ctx.table.len());

        if let Some(category) = atom.category.as_deref() {
            if self.last_category.as_deref() != Some(category) {
                self.categories += 1;
                self.last_category = Some(category.to_string());
            }
        }

        if self.last_name.as_deref() != atom.name.as_deref() {
            self.fold();
            self.last_name = atom.name.clone();
            self.packages += 1;
        }

        self.ebuilds += 1;

        for (best, status) in self.best.iter_mut().zip(ctx.vector.statuses()) {
            match (*best, *status) {
                (_, Stability::Stable) => *best = Stability::Stable,
                (Stability::None, Stability::Testing) => *best = Stability::Testing,
                _ => {}
            }
        }

        Visit::pass()
    }
}

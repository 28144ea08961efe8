use std::path::PathBuf;

use tracing::{debug, warn};

use crate::analysis::{Analysis, Check, KeywordReport, StatsState, TreeStats};
use crate::arches::ArchTable;
use crate::atom::{version_descending, Atom, AtomCmp};
use crate::error::{Error, Result};
use crate::keyword::{KeywordVector, Stability};
use crate::repo::CacheDb;

/// Shared state of one analysis run.
///
/// The architecture table is merged from every configured repository
/// before any traversal starts, so keyword indices stay stable for the
/// whole run. The vector is one reused buffer, redecoded per version.
pub(crate) struct PipelineContext {
    pub(crate) table: ArchTable,
    pub(crate) vector: KeywordVector,
    pub(crate) target: usize,
}

impl PipelineContext {
    pub(crate) fn target_status(&self) -> Stability {
        self.vector.get(self.target)
    }
}

/// A keyword analysis run over one or more repositories.
///
/// Repositories are visited in order with one shared architecture table
/// and one package-dedup window, so a package already reported from an
/// earlier repository is not reported again from a later overlay.
///
/// # Examples
///
/// ```no_run
/// use portage_keywords::{Analysis, Pipeline};
///
/// let mut pipeline = Pipeline::new("/", "x86");
/// pipeline.repos.push("/var/db/repos/gentoo".into());
/// for report in pipeline.collect(Analysis::Imlate)? {
///     println!("{report}");
/// }
/// # Ok::<(), portage_keywords::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// System root the repository paths are resolved under.
    pub root: PathBuf,
    /// Repository directories, visited in order.
    pub repos: Vec<PathBuf>,
    /// Target architecture name.
    pub arch: String,
    /// Only consider packages matching this atom.
    pub filter: Option<Atom>,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, arch: impl Into<String>) -> Pipeline {
        Pipeline {
            root: root.into(),
            repos: Vec::new(),
            arch: arch.into(),
            filter: None,
        }
    }

    /// Run `analysis`, passing every report to `sink`.
    ///
    /// Returns whether anything was reported. Fails when a repository has
    /// no metadata cache or the target architecture is unknown to every
    /// configured repository.
    pub fn run(&self, analysis: Analysis, mut sink: impl FnMut(KeywordReport)) -> Result<bool> {
        let mut check = analysis.check();
        let (dbs, mut ctx) = self.open_all()?;
        let mut matched = self.drive(&dbs, &mut ctx, check.as_mut(), &mut sink)?;
        if let Some(report) = check.finish() {
            sink(report);
            matched = true;
        }
        Ok(matched)
    }

    /// Run `analysis` and collect the reports.
    pub fn collect(&self, analysis: Analysis) -> Result<Vec<KeywordReport>> {
        let mut reports = Vec::new();
        self.run(analysis, |report| reports.push(report))?;
        Ok(reports)
    }

    /// Aggregate keyword statistics across all repositories.
    pub fn stats(&self) -> Result<TreeStats> {
        let mut state = StatsState::default();
        let (dbs, mut ctx) = self.open_all()?;
        self.drive(&dbs, &mut ctx, &mut state, &mut |_| {})?;
        Ok(state.finalize(&ctx.table))
    }

    /// Open every repository and preload the merged architecture table.
    fn open_all(&self) -> Result<(Vec<CacheDb>, PipelineContext)> {
        let mut dbs = Vec::with_capacity(self.repos.len());
        let mut table = ArchTable::new();
        for repo in &self.repos {
            let db = CacheDb::open(&self.root, repo)?;
            table.merge(&ArchTable::load(db.repo_root()));
            dbs.push(db);
        }
        let target = table
            .index_of(&self.arch)
            .ok_or_else(|| Error::UnknownArch(self.arch.clone()))?;
        let mut vector = KeywordVector::new();
        vector.grow(table.len());
        Ok((
            dbs,
            PipelineContext {
                table,
                vector,
                target,
            },
        ))
    }

    fn drive(
        &self,
        dbs: &[CacheDb],
        ctx: &mut PipelineContext,
        check: &mut dyn Check,
        sink: &mut dyn FnMut(KeywordReport),
    ) -> Result<bool> {
        let mut matched = false;
        let mut last_matched: Option<Atom> = None;
        for db in dbs {
            matched |= db.foreach_package_sorted(None, Some(version_descending), |pkg| {
                let spec = format!("{}/{}", pkg.category(), pkg.name());
                let atom: Atom = match spec.parse() {
                    Ok(atom) => atom,
                    Err(err) => {
                        warn!(entry = %spec, %err, "skipping unparseable package name");
                        return false;
                    }
                };

                if let Some(filter) = &self.filter {
                    if atom.compare(filter) != AtomCmp::Equal {
                        return false;
                    }
                }

                // older version of a package that already concluded
                if let Some(last) = &last_matched {
                    if atom.compare(last) != AtomCmp::Incomparable {
                        return false;
                    }
                }

                let entry = match pkg.read() {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(entry = %atom, %err, "skipping unreadable cache entry");
                        return false;
                    }
                };
                let raw = match entry.keywords() {
                    Some(raw) => raw,
                    None => {
                        debug!(entry = %atom, "cache entry has no keywords");
                        return false;
                    }
                };
                ctx.vector.decode(raw, &ctx.table);

                let visit = check.visit(&atom, ctx);
                if visit.suppress {
                    last_matched = Some(atom.base());
                }
                match visit.report {
                    Some(report) => {
                        sink(report);
                        true
                    }
                    None => false,
                }
            })?;
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_entry(root: &Path, category: &str, package: &str, keywords: &str) {
        let dir = root.join("metadata/md5-cache").join(category);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(package),
            format!("EAPI=8\nSLOT=0\nKEYWORDS={keywords}\n"),
        )
        .unwrap();
    }

    fn write_arches(root: &Path, list: &str) {
        fs::create_dir_all(root.join("profiles")).unwrap();
        fs::write(root.join("profiles/arch.list"), list).unwrap();
    }

    fn repo() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_arches(dir.path(), "amd64\nx86\n");
        dir
    }

    fn pipeline(dir: &TempDir, arch: &str) -> Pipeline {
        let mut pipeline = Pipeline::new(dir.path(), arch);
        pipeline.repos.push(PathBuf::from(""));
        pipeline
    }

    #[test]
    fn imlate_end_to_end() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-2.0", "~x86 amd64");
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86 amd64");
        write_entry(dir.path(), "dev-libs", "bar-1.0", "amd64");

        let reports = pipeline(&dir, "x86").collect(Analysis::Imlate).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].to_string(), "app-misc/foo-2.0 +amd64 ~x86");
    }

    #[test]
    fn newest_version_wins_the_dedup() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-10.0", "x86");
        write_entry(dir.path(), "app-misc", "foo-2.0", "x86");
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86");

        let reports = pipeline(&dir, "x86").collect(Analysis::All).unwrap();
        let atoms: Vec<String> = reports.iter().map(|r| r.atom.to_string()).collect();
        assert_eq!(atoms, ["app-misc/foo-10.0"]);
    }

    #[test]
    fn filter_restricts_the_run() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86");
        write_entry(dir.path(), "dev-libs", "bar-1.0", "x86");

        let mut pipeline = pipeline(&dir, "x86");
        pipeline.filter = Some("app-misc/foo".parse().unwrap());
        let reports = pipeline.collect(Analysis::All).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].atom.to_string(), "app-misc/foo-1.0");

        pipeline.filter = Some("app-misc/nope".parse().unwrap());
        let mut hits = Vec::new();
        let matched = pipeline
            .run(Analysis::All, |report| hits.push(report))
            .unwrap();
        assert!(!matched);
        assert!(hits.is_empty());
    }

    #[test]
    fn category_filter_via_atom() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86");
        write_entry(dir.path(), "dev-libs", "bar-1.0", "x86");

        let mut pipeline = pipeline(&dir, "x86");
        pipeline.filter = Some("dev-libs/".parse().unwrap());
        let reports = pipeline.collect(Analysis::All).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].atom.to_string(), "dev-libs/bar-1.0");
    }

    #[test]
    fn dropped_end_to_end() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-3.0", "amd64");
        write_entry(dir.path(), "app-misc", "foo-2.0", "amd64 x86");
        write_entry(dir.path(), "app-misc", "zed-1.0", "amd64");

        let reports = pipeline(&dir, "x86").collect(Analysis::Dropped).unwrap();
        let atoms: Vec<String> = reports.iter().map(|r| r.atom.to_string()).collect();
        assert_eq!(atoms, ["app-misc/foo-3.0", "app-misc/zed-1.0"]);
    }

    #[test]
    fn testing_only_end_to_end() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-2.0", "~x86 amd64");
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86 amd64");
        write_entry(dir.path(), "dev-libs", "bar-2.0", "~x86");
        write_entry(dir.path(), "dev-libs", "bar-1.0", "~x86");

        let reports = pipeline(&dir, "x86")
            .collect(Analysis::TestingOnly)
            .unwrap();
        let atoms: Vec<String> = reports.iter().map(|r| r.atom.to_string()).collect();
        assert_eq!(atoms, ["dev-libs/bar-2.0"]);
    }

    #[test]
    fn stats_end_to_end() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-2.0", "x86");
        write_entry(dir.path(), "app-misc", "foo-1.0", "~x86");
        write_entry(dir.path(), "dev-libs", "bar-1.0", "amd64 ~x86");

        let stats = pipeline(&dir, "x86").stats().unwrap();
        assert_eq!(stats.categories, 2);
        assert_eq!(stats.packages, 2);
        assert_eq!(stats.ebuilds, 3);
        assert_eq!(stats.arches[0].arch, "amd64");
        assert_eq!(stats.arches[0].stable, 1);
        assert_eq!(stats.arches[1].arch, "x86");
        assert_eq!(stats.arches[1].stable, 1);
        assert_eq!(stats.arches[1].testing, 1);
    }

    #[test]
    fn unknown_arch_fails_the_run() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86");

        let err = pipeline(&dir, "mips").collect(Analysis::All).unwrap_err();
        assert!(matches!(err, Error::UnknownArch(_)));
    }

    #[test]
    fn missing_arch_list_means_no_known_arches() {
        let dir = tempfile::tempdir().unwrap();
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86");

        let err = pipeline(&dir, "x86").collect(Analysis::All).unwrap_err();
        assert!(matches!(err, Error::UnknownArch(_)));
    }

    #[test]
    fn repo_without_cache_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_arches(dir.path(), "x86\n");

        let err = pipeline(&dir, "x86").collect(Analysis::All).unwrap_err();
        assert!(matches!(err, Error::NoCache(_)));
    }

    #[test]
    fn overlays_share_table_and_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("gentoo");
        let overlay = dir.path().join("overlay");
        write_arches(&main, "amd64\nx86\n");
        write_entry(&main, "app-misc", "foo-1.0", "~x86 ppc");
        write_arches(&overlay, "x86\nppc\n");
        write_entry(&overlay, "app-misc", "foo-9999", "~x86");

        let mut pipeline = Pipeline::new(dir.path(), "x86");
        pipeline.repos.push(PathBuf::from("gentoo"));
        pipeline.repos.push(PathBuf::from("overlay"));

        let reports = pipeline.collect(Analysis::All).unwrap();
        assert_eq!(reports.len(), 1);
        // ppc resolves through the overlay's table, merged before traversal
        assert_eq!(reports[0].to_string(), "app-misc/foo-1.0 ~x86 +ppc");
    }

    #[test]
    fn broken_entries_do_not_abort_the_run() {
        let dir = repo();
        write_entry(dir.path(), "app-misc", "foo-1.0", "x86");
        let cat = dir.path().join("metadata/md5-cache/app-misc");
        fs::write(cat.join("broken-1.0"), "NO SEPARATOR\n").unwrap();
        fs::write(cat.join("quiet-1.0"), "EAPI=8\nSLOT=0\n").unwrap();

        let reports = pipeline(&dir, "x86").collect(Analysis::All).unwrap();
        let atoms: Vec<String> = reports.iter().map(|r| r.atom.to_string()).collect();
        assert_eq!(atoms, ["app-misc/foo-1.0"]);
    }
}

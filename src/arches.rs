use std::path::Path;

use tracing::{debug, warn};

/// Location of the architecture list inside a repository.
const ARCH_LIST: &str = "profiles/arch.list";

/// The ordered set of architecture names known to one or more repositories.
///
/// Every name gets a stable index at insertion, in first-seen order; the
/// indices size and address all [`KeywordVector`](crate::KeywordVector)s of
/// a traversal. The table only ever grows.
///
/// # Examples
///
/// ```
/// use portage_keywords::ArchTable;
///
/// let table: ArchTable = ["x86", "amd64", "arm64"].into_iter().collect();
/// assert_eq!(table.index_of("amd64"), Some(1));
/// assert_eq!(table.index_of("~amd64"), Some(1));
/// assert_eq!(table.index_of("sparc"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchTable {
    names: Vec<String>,
}

impl ArchTable {
    pub fn new() -> ArchTable {
        ArchTable::default()
    }

    /// Read `profiles/arch.list` under a repository root.
    ///
    /// `#` starts a comment, blank lines are skipped, duplicates keep their
    /// first index. A missing or unreadable file yields an empty table;
    /// lookups against it then always miss.
    pub fn load(repo_root: &Path) -> ArchTable {
        let path = repo_root.join(ARCH_LIST);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no architecture list");
                return ArchTable::default();
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read architecture list");
                return ArchTable::default();
            }
        };

        let mut table = ArchTable::default();
        for line in data.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            };
            let name = line.trim();
            if !name.is_empty() {
                table.insert(name);
            }
        }
        table
    }

    /// Insert a name and return its index; a known name keeps its index.
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            return i;
        }
        self.names.push(name.to_string());
        self.names.len() - 1
    }

    /// Insert every name of `other`, preserving indices already assigned
    /// here. Used to extend one table across multiple repositories.
    pub fn merge(&mut self, other: &ArchTable) {
        for name in &other.names {
            self.insert(name);
        }
    }

    /// Look up an architecture token, ignoring one leading `+`, `-` or `~`.
    pub fn index_of(&self, token: &str) -> Option<usize> {
        let name = token.strip_prefix(['+', '-', '~']).unwrap_or(token);
        self.names.iter().position(|n| n == name)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ArchTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = ArchTable::default();
        for name in iter {
            table.insert(name.as_ref());
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn repo_with_arch_list(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("profiles")).unwrap();
        fs::write(dir.path().join(ARCH_LIST), content).unwrap();
        dir
    }

    #[test]
    fn load_skips_comments_and_blanks() {
        let repo = repo_with_arch_list("# main arches\nalpha\namd64\n\narm # 32bit\narm64\n");
        let table = ArchTable::load(repo.path());
        assert_eq!(table.names(), ["alpha", "amd64", "arm", "arm64"]);
    }

    #[test]
    fn load_dedupes_keeping_first_index() {
        let repo = repo_with_arch_list("x86\namd64\nx86\n");
        let table = ArchTable::load(repo.path());
        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of("x86"), Some(0));
        assert_eq!(table.index_of("amd64"), Some(1));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = ArchTable::load(dir.path());
        assert!(table.is_empty());
        assert_eq!(table.index_of("x86"), None);
    }

    #[test]
    fn index_assignment_is_stable() {
        let repo = repo_with_arch_list("x86\namd64\nppc64\n");
        let first = ArchTable::load(repo.path());
        let second = ArchTable::load(repo.path());
        assert_eq!(first, second);
    }

    #[test]
    fn index_of_strips_one_sign() {
        let table: ArchTable = ["x86"].into_iter().collect();
        assert_eq!(table.index_of("x86"), Some(0));
        assert_eq!(table.index_of("~x86"), Some(0));
        assert_eq!(table.index_of("-x86"), Some(0));
        assert_eq!(table.index_of("+x86"), Some(0));
        assert_eq!(table.index_of("--x86"), None);
        assert_eq!(table.index_of("*"), None);
    }

    #[test]
    fn merge_keeps_existing_indices() {
        let mut table: ArchTable = ["x86", "amd64"].into_iter().collect();
        let other: ArchTable = ["arm", "x86", "sparc"].into_iter().collect();
        table.merge(&other);
        assert_eq!(table.names(), ["x86", "amd64", "arm", "sparc"]);
        assert_eq!(table.index_of("x86"), Some(0));
        assert_eq!(table.index_of("sparc"), Some(3));
    }

    #[test]
    fn insert_returns_index() {
        let mut table = ArchTable::new();
        assert_eq!(table.insert("x86"), 0);
        assert_eq!(table.insert("amd64"), 1);
        assert_eq!(table.insert("x86"), 0);
        assert_eq!(table.len(), 2);
    }
}

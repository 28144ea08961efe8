use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheFormat};
use crate::error::{Error, Result};

/// Cache directory of the md5 format, probed first.
const MD5_CACHE_DIR: &str = "metadata/md5-cache";
/// Cache directory of the flat PMS format.
const PMS_CACHE_DIR: &str = "metadata/cache";
/// Repository self-identification file.
const REPO_NAME: &str = "profiles/repo_name";

/// Directory-entry name comparator for the sorted traversal drivers.
pub type NameCmp = fn(&str, &str) -> Ordering;

/// Join `path` under `root`; a leading `/` on `path` does not escape it.
fn under_root(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix("/") {
        Ok(relative) => root.join(relative),
        Err(_) => root.join(path),
    }
}

/// Category names start alphanumeric and stay within a restricted charset;
/// this also drops dotfiles and `-` prefixed (locked) entries.
fn valid_category_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-'))
}

/// Handle to one repository's metadata cache.
///
/// Opening probes the two cache layouts under the repository (md5 first)
/// and records which one is present; every cursor created from the handle
/// parses entries according to that format.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use portage_keywords::CacheDb;
///
/// let db = CacheDb::open(Path::new("/"), Path::new("/var/db/repos/gentoo"))?;
/// for category in db.categories()? {
///     for mut package in category.packages()? {
///         let entry = package.read()?;
///         println!("{}/{}: {:?}", package.category(), package.name(), entry.keywords());
///     }
/// }
/// # Ok::<(), portage_keywords::Error>(())
/// ```
#[derive(Debug)]
pub struct CacheDb {
    repo_root: PathBuf,
    cache_dir: PathBuf,
    format: CacheFormat,
    repo_name: Option<String>,
}

impl CacheDb {
    /// Open the metadata cache of `repo` located under `root`.
    ///
    /// Fails with [`Error::NoCache`] when neither cache directory exists.
    pub fn open(root: &Path, repo: &Path) -> Result<CacheDb> {
        let repo_root = under_root(root, repo);

        let md5 = repo_root.join(MD5_CACHE_DIR);
        let pms = repo_root.join(PMS_CACHE_DIR);
        let (cache_dir, format) = if md5.is_dir() {
            (md5, CacheFormat::Md5)
        } else if pms.is_dir() {
            (pms, CacheFormat::Pms)
        } else {
            return Err(Error::NoCache(repo_root));
        };

        let repo_name = match fs::read_to_string(repo_root.join(REPO_NAME)) {
            Ok(data) => data
                .lines()
                .next()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty()),
            Err(_) => None,
        };

        Ok(CacheDb {
            repo_root,
            cache_dir,
            format,
            repo_name,
        })
    }

    pub fn format(&self) -> CacheFormat {
        self.format
    }

    /// The root-joined repository directory.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// First line of `profiles/repo_name`, when present.
    pub fn repo_name(&self) -> Option<&str> {
        self.repo_name.as_deref()
    }

    /// Iterate category directories in listing order.
    pub fn categories(&self) -> Result<Categories> {
        let inner = fs::read_dir(&self.cache_dir).map_err(|e| Error::io(&self.cache_dir, e))?;
        Ok(Categories {
            inner,
            format: self.format,
        })
    }

    /// Category directories, materialized and sorted (lexical by default).
    pub fn categories_sorted(&self, cmp: Option<NameCmp>) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.categories()?.collect();
        match cmp {
            Some(cmp) => categories.sort_by(|a, b| cmp(&a.name, &b.name)),
            None => categories.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        Ok(categories)
    }

    /// Visit every package of every category in listing order.
    ///
    /// `filter` may exclude whole categories by name. The result is the OR
    /// of the callback returns, a "did anything match" signal.
    pub fn foreach_package<F>(
        &self,
        filter: Option<&dyn Fn(&str) -> bool>,
        mut f: F,
    ) -> Result<bool>
    where
        F: FnMut(&mut Package) -> bool,
    {
        let mut matched = false;
        for category in self.categories()? {
            if let Some(filter) = filter {
                if !filter(category.name()) {
                    continue;
                }
            }
            let packages = match category.packages() {
                Ok(packages) => packages,
                Err(err) => {
                    warn!(category = category.name(), %err, "skipping unreadable category");
                    continue;
                }
            };
            for mut package in packages {
                matched |= f(&mut package);
            }
        }
        Ok(matched)
    }

    /// Visit every package with sorted listings at both levels.
    ///
    /// `None` comparators mean lexical order. The keyword analyses pass
    /// [`version_descending`](crate::version_descending) for packages so
    /// the newest version of each package comes first.
    pub fn foreach_package_sorted<F>(
        &self,
        cat_cmp: Option<NameCmp>,
        pkg_cmp: Option<NameCmp>,
        mut f: F,
    ) -> Result<bool>
    where
        F: FnMut(&mut Package) -> bool,
    {
        let mut matched = false;
        for category in self.categories_sorted(cat_cmp)? {
            let packages = match category.packages_sorted(pkg_cmp) {
                Ok(packages) => packages,
                Err(err) => {
                    warn!(category = category.name(), %err, "skipping unreadable category");
                    continue;
                }
            };
            for mut package in packages {
                matched |= f(&mut package);
            }
        }
        Ok(matched)
    }
}

/// Iterator over a cache's category directories.
#[derive(Debug)]
pub struct Categories {
    inner: fs::ReadDir,
    format: CacheFormat,
}

impl Iterator for Categories {
    type Item = Category;

    fn next(&mut self) -> Option<Category> {
        for entry in self.inner.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(%err, "skipping unreadable directory entry");
                    continue;
                }
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !valid_category_name(&name) {
                continue;
            }
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            return Some(Category {
                name,
                path,
                format: self.format,
            });
        }
        None
    }
}

/// One category directory inside a metadata cache.
#[derive(Debug)]
pub struct Category {
    name: String,
    path: PathBuf,
    format: CacheFormat,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate the category's package entries in listing order.
    pub fn packages(&self) -> Result<Packages> {
        let inner = fs::read_dir(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(Packages {
            inner,
            category: self.name.clone(),
            format: self.format,
        })
    }

    /// Package entries, materialized and sorted (lexical by default).
    pub fn packages_sorted(&self, cmp: Option<NameCmp>) -> Result<Vec<Package>> {
        let mut packages: Vec<Package> = self.packages()?.collect();
        match cmp {
            Some(cmp) => packages.sort_by(|a, b| cmp(&a.name, &b.name)),
            None => packages.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        Ok(packages)
    }
}

/// Iterator over a category's package entries.
#[derive(Debug)]
pub struct Packages {
    inner: fs::ReadDir,
    category: String,
    format: CacheFormat,
}

impl Iterator for Packages {
    type Item = Package;

    fn next(&mut self) -> Option<Package> {
        for entry in self.inner.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(%err, "skipping unreadable directory entry");
                    continue;
                }
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            // dotfiles and locked/incomplete entries
            if name.starts_with('.') || name.starts_with('-') {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            return Some(Package {
                category: self.category.clone(),
                name,
                path,
                format: self.format,
                file: None,
            });
        }
        None
    }
}

/// Cursor for one package version's metadata file.
///
/// The file handle is opened lazily and held until [`read`](Package::read),
/// which consumes it whether or not parsing succeeds.
#[derive(Debug)]
pub struct Package {
    category: String,
    name: String,
    path: PathBuf,
    format: CacheFormat,
    file: Option<File>,
}

impl Package {
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The package file name, `name-version`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the metadata file without reading it yet.
    pub fn open(&mut self) -> Result<()> {
        if self.file.is_none() {
            let file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;
            self.file = Some(file);
        }
        Ok(())
    }

    /// Read and parse the metadata file.
    pub fn read(&mut self) -> Result<CacheEntry> {
        let mut file = match self.file.take() {
            Some(file) => file,
            None => File::open(&self.path).map_err(|e| Error::io(&self.path, e))?,
        };
        let mut data = String::new();
        file.read_to_string(&mut data)
            .map_err(|e| Error::io(&self.path, e))?;
        drop(file);
        CacheEntry::parse(self.format, data)
    }
}

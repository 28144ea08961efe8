use std::path::PathBuf;

/// Error type for portage-keywords operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure on a repository file or directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Neither metadata cache layout exists under the repository.
    #[error("no metadata cache found under {0}")]
    NoCache(PathBuf),

    /// The requested architecture is not in the architecture table.
    #[error("unknown architecture: {0}")]
    UnknownArch(String),

    /// The requested analysis name is not recognized.
    #[error("unknown analysis: {0}")]
    UnknownAnalysis(String),

    /// Error parsing a metadata cache entry.
    #[error("invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// Invalid package atom string.
    #[error("invalid atom: {0}")]
    InvalidAtom(String),

    /// Invalid keyword string.
    #[error("invalid keyword: {0}")]
    InvalidKeyword(String),

    /// Invalid package version string.
    #[error("invalid version: {0}")]
    InvalidVersion(String),
}

impl Error {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type for portage-keywords operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path() {
        let err = Error::io(
            "/var/db/repos/gentoo",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        let msg = err.to_string();
        assert!(msg.contains("/var/db/repos/gentoo"));

        let err = Error::NoCache(PathBuf::from("/srv/overlay"));
        assert_eq!(err.to_string(), "no metadata cache found under /srv/overlay");
    }

    #[test]
    fn display_names_the_arch() {
        let err = Error::UnknownArch("mips".to_string());
        assert_eq!(err.to_string(), "unknown architecture: mips");
    }
}

//! Cache key normalization
//!
//! Keys are built lexically: relative paths are anchored at the current
//! working directory, `.` and `..` are resolved without touching the
//! filesystem, and casing follows the configured [`CaseFolding`]. Symlinks
//! are not resolved, so two links to one file are two keys.

use filecache_config::CaseFolding;
use path_clean::PathClean;
use std::fmt;
use std::path::{Path, PathBuf};

/// Canonical, absolute path used to index both cache tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(PathBuf);

impl CacheKey {
    pub fn new(path: impl AsRef<Path>, folding: CaseFolding) -> Self {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "Working directory unavailable, keying relative path as-is"
                    );
                    path.to_path_buf()
                }
            }
        };

        let cleaned = absolute.clean();
        match folding {
            CaseFolding::Preserve => Self(cleaned),
            CaseFolding::Fold => Self(fold_case(&cleaned)),
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

fn fold_case(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(s.to_lowercase()),
        // Non-UTF-8 paths cannot be case-mapped reliably; keep them intact
        None => path.to_path_buf(),
    }
}

impl AsRef<Path> for CacheKey {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relative_and_absolute_spellings_match() {
        let cwd = std::env::current_dir().unwrap();
        let relative = CacheKey::new("data/accounts.json", CaseFolding::Preserve);
        let absolute = CacheKey::new(cwd.join("data/accounts.json"), CaseFolding::Preserve);
        assert_eq!(relative, absolute);
        assert!(relative.as_path().is_absolute());
    }

    #[test]
    fn test_dot_segments_are_resolved() {
        let a = CacheKey::new("/srv/app/./config/../data/accounts.json", CaseFolding::Preserve);
        let b = CacheKey::new("/srv/app/data/accounts.json", CaseFolding::Preserve);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/srv/app/data/accounts.json");
    }

    #[test]
    fn test_preserve_keeps_case() {
        let upper = CacheKey::new("/srv/Data/Accounts.json", CaseFolding::Preserve);
        let lower = CacheKey::new("/srv/data/accounts.json", CaseFolding::Preserve);
        assert_ne!(upper, lower);
        assert_eq!(upper.as_path(), Path::new("/srv/Data/Accounts.json"));
    }

    #[test]
    fn test_fold_ignores_case() {
        let upper = CacheKey::new("/srv/Data/Accounts.JSON", CaseFolding::Fold);
        let lower = CacheKey::new("/srv/data/accounts.json", CaseFolding::Fold);
        assert_eq!(upper, lower);
        assert_eq!(upper.into_path_buf(), PathBuf::from("/srv/data/accounts.json"));
    }
}

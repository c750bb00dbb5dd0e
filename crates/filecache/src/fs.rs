//! Filesystem seam used by the cache

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// The two filesystem capabilities the cache needs
///
/// Both calls must report a missing file as [`io::ErrorKind::NotFound`].
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem: Send + Sync {
    /// Current modification timestamp of `path`
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Entire content of `path` as UTF-8 text
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

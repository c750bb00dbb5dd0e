#![allow(dead_code)]

use filecache::{CaseFolding, ContentCache};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A temp directory plus a case-preserving cache over the real filesystem
pub struct TestContext {
    pub dir: TempDir,
    pub cache: ContentCache,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
            cache: ContentCache::with_case_folding(CaseFolding::Preserve),
        }
    }

    /// Like [`TestContext::new`] but with the temp dir created inside `parent`
    pub fn new_in(parent: &Path) -> Self {
        Self {
            dir: TempDir::new_in(parent).expect("create temp dir"),
            cache: ContentCache::with_case_folding(CaseFolding::Preserve),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `content` and pin the modification time to `secs` after the epoch
    pub fn write(&self, name: &str, content: &str, secs: u64) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("write file");
        set_modified(&path, secs);
        path
    }
}

pub fn set_modified(path: &Path, secs: u64) {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .expect("open file for touch");
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .expect("set modification time");
}

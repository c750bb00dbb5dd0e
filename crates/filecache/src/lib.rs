//! Staleness-aware content cache
//!
//! Maps file paths to strongly typed values produced by caller-supplied
//! converters. A value is reconverted exactly when the file's modification
//! time changes; the filesystem is only consulted on access.
//!
//! ```rust,no_run
//! use filecache::ContentCache;
//!
//! let cache = ContentCache::new();
//! cache.register("settings.txt", |text: &str| -> Result<Vec<String>, std::io::Error> {
//!     Ok(text.lines().map(str::to_owned).collect())
//! })?;
//!
//! let lines = cache.load::<Vec<String>>("settings.txt")?;
//! println!("{} lines", lines.len());
//! # Ok::<(), filecache::CacheError>(())
//! ```

pub mod cache;
pub mod error;
pub mod fs;
pub mod global;
pub mod key;
pub mod stats;

pub use cache::ContentCache;
pub use error::{BoxError, CacheError, CacheResult};
pub use filecache_config::{CacheConfig, CaseFolding};
pub use fs::{FileSystem, OsFileSystem};
pub use global::{global, install, reset};
pub use key::CacheKey;
pub use stats::CacheStats;

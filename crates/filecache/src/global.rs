//! Process-wide default cache
//!
//! The instance is built on first use and can be swapped out, e.g. to give
//! each test a clean cache. Callers holding an `Arc` from [`global`] keep
//! the instance they were handed.

use crate::cache::ContentCache;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

fn default_cache() -> &'static RwLock<Arc<ContentCache>> {
    static DEFAULT: OnceLock<RwLock<Arc<ContentCache>>> = OnceLock::new();
    DEFAULT.get_or_init(|| RwLock::new(Arc::new(ContentCache::new())))
}

/// The current process-wide cache
pub fn global() -> Arc<ContentCache> {
    let current = default_cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(&current)
}

/// Replace the process-wide cache, returning the previous instance
pub fn install(cache: impl Into<Arc<ContentCache>>) -> Arc<ContentCache> {
    let mut current = default_cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    tracing::debug!("Installing process-wide content cache");
    std::mem::replace(&mut *current, cache.into())
}

/// Replace the process-wide cache with a fresh default instance
pub fn reset() -> Arc<ContentCache> {
    install(ContentCache::new())
}

//! Staleness-aware file-to-object cache
//!
//! Two independent tables are kept per [`CacheKey`]: a registration table
//! (key to converter, used by [`ContentCache::load`]) and a value table
//! (key to the last converted value and the modification time it was read
//! at). Every lookup stats the file and reconverts when the modification
//! time differs from the recorded one in either direction.

use crate::error::{BoxError, CacheError, CacheResult};
use crate::fs::{FileSystem, OsFileSystem};
use crate::key::CacheKey;
use crate::stats::{CacheStats, Counters};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use filecache_config::{CacheConfig, CaseFolding};
use std::any::{type_name, Any};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::{debug, trace};

type ErasedValue = Arc<dyn Any + Send + Sync>;
type ErasedConverter = Arc<dyn Fn(&str) -> Result<StoredValue, BoxError> + Send + Sync>;

/// A converted value together with the name of its concrete type
#[derive(Clone)]
struct StoredValue {
    value: ErasedValue,
    type_name: &'static str,
}

impl StoredValue {
    fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    fn downcast<T: Any + Send + Sync>(self, key: &CacheKey) -> CacheResult<Arc<T>> {
        let actual = self.type_name;
        self.value
            .downcast::<T>()
            .map_err(|_| CacheError::TypeMismatch {
                key: key.clone(),
                expected: type_name::<T>(),
                actual,
            })
    }
}

struct Registration {
    convert: ErasedConverter,
    type_name: &'static str,
}

struct ValueEntry {
    /// Path the value was read from, before case folding
    source: PathBuf,
    modified: SystemTime,
    value: StoredValue,
}

/// One value slot per key; its mutex single-flights refreshes for that key.
#[derive(Default)]
struct SlotCell {
    /// Set once the slot holds a value; entries are only ever replaced whole
    populated: AtomicBool,
    entry: Mutex<Option<ValueEntry>>,
}

impl SlotCell {
    // Slot contents are only ever replaced whole, so a converter panic cannot
    // leave a half-written entry behind and the poison flag carries no meaning.
    fn lock(&self) -> MutexGuard<'_, Option<ValueEntry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_populated(&self) -> bool {
        self.populated.load(Ordering::Acquire)
    }
}

type Slot = Arc<SlotCell>;

/// Thread-safe cache mapping file paths to lazily converted, typed values
///
/// Refreshes for the same key are serialized, so concurrent callers on an
/// unchanged file observe a single conversion. Unrelated keys never wait on
/// each other during conversion.
///
/// A converter must not call back into the cache for its own key.
pub struct ContentCache {
    registrations: DashMap<CacheKey, Registration>,
    values: DashMap<CacheKey, Slot>,
    fs: Arc<dyn FileSystem>,
    case_folding: CaseFolding,
    counters: Counters,
}

impl ContentCache {
    /// Create a cache over the real filesystem with the platform's default case policy
    pub fn new() -> Self {
        Self::with_case_folding(CaseFolding::default())
    }

    pub fn with_case_folding(case_folding: CaseFolding) -> Self {
        Self::with_filesystem(Arc::new(OsFileSystem), case_folding)
    }

    /// Create a cache from loaded configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_case_folding(config.case_folding)
    }

    /// Create a cache over a custom filesystem implementation
    pub fn with_filesystem(fs: Arc<dyn FileSystem>, case_folding: CaseFolding) -> Self {
        debug!(case_folding = ?case_folding, "ContentCache initialized");
        Self {
            registrations: DashMap::new(),
            values: DashMap::new(),
            fs,
            case_folding,
            counters: Counters::default(),
        }
    }

    pub fn case_folding(&self) -> CaseFolding {
        self.case_folding
    }

    /// Normalize `path` the way this cache keys it
    pub fn key_for(&self, path: impl AsRef<Path>) -> CacheKey {
        CacheKey::new(path, self.case_folding)
    }

    /// Bind a converter to `path` for later [`load`](Self::load) calls
    ///
    /// Performs no I/O. Fails with [`CacheError::DuplicateRegistration`] when
    /// the key already has a converter; the existing one is kept.
    pub fn register<T, E, F>(&self, path: impl AsRef<Path>, converter: F) -> CacheResult<()>
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let key = self.key_for(path);
        match self.registrations.entry(key) {
            Entry::Occupied(entry) => Err(CacheError::DuplicateRegistration {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(key = %entry.key(), type_name = type_name::<T>(), "Registered converter");
                entry.insert(Registration {
                    convert: Arc::new(move |text: &str| -> Result<StoredValue, BoxError> {
                        converter(text).map(StoredValue::new).map_err(Into::into)
                    }),
                    type_name: type_name::<T>(),
                });
                Ok(())
            }
        }
    }

    /// Remove the converter bound to `path`, leaving any cached value in place
    pub fn unregister(&self, path: impl AsRef<Path>) -> bool {
        let key = self.key_for(path);
        match self.registrations.remove(&key) {
            Some((key, registration)) => {
                debug!(key = %key, type_name = registration.type_name, "Unregistered converter");
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, path: impl AsRef<Path>) -> bool {
        self.registrations.contains_key(&self.key_for(path))
    }

    /// Keys with a registered converter, sorted
    pub fn registered_keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .registrations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Fetch the value for `path` through its registered converter
    ///
    /// Fails with [`CacheError::KeyNotFound`] when nothing is registered and
    /// [`CacheError::TypeMismatch`] when the cached value is not a `T`.
    pub fn load<T>(&self, path: impl AsRef<Path>) -> CacheResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let path = path.as_ref();
        let key = self.key_for(path);
        let convert = match self.registrations.get(&key) {
            Some(registration) => Arc::clone(&registration.convert),
            None => return Err(CacheError::KeyNotFound { key }),
        };

        self.fetch(&key, path, |text| convert(text))?.downcast(&key)
    }

    /// Fetch the value for `path`, converting with `converter` if stale
    ///
    /// The converter is used for this call only and is not registered. The
    /// value slot is shared with [`load`](Self::load): a value cached by a
    /// different converter is returned as-is while the file is unchanged,
    /// and surfaces as [`CacheError::TypeMismatch`] if it is not a `T`.
    pub fn map<T, E, F>(&self, path: impl AsRef<Path>, converter: F) -> CacheResult<Arc<T>>
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: FnOnce(&str) -> Result<T, E>,
    {
        let path = path.as_ref();
        let key = self.key_for(path);
        self.fetch(&key, path, |text| {
            converter(text).map(StoredValue::new).map_err(Into::into)
        })?
        .downcast(&key)
    }

    /// Drop the cached value for `path`, leaving its registration in place
    pub fn unmap(&self, path: impl AsRef<Path>) -> bool {
        let key = self.key_for(path);
        match self.values.remove(&key) {
            Some((key, slot)) => {
                let removed = slot.is_populated();
                if removed {
                    debug!(key = %key, "Unmapped cached value");
                }
                removed
            }
            None => false,
        }
    }

    /// Whether a value is cached for `path`, without checking staleness
    pub fn is_mapped(&self, path: impl AsRef<Path>) -> bool {
        self.values
            .get(&self.key_for(path))
            .is_some_and(|slot| slot.is_populated())
    }

    /// Empty both the registration and the value tables
    pub fn clear(&self) {
        let registrations = self.registrations.len();
        let values = self.values.len();
        self.registrations.clear();
        self.values.clear();
        debug!(registrations, values, "Cleared content cache");
    }

    /// Number of cached values
    ///
    /// Never waits on an in-flight conversion.
    pub fn len(&self) -> usize {
        self.values
            .iter()
            .filter(|entry| entry.value().is_populated())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop cached values whose files no longer exist
    ///
    /// Registrations are untouched. Returns the number of values removed.
    pub fn prune_missing(&self) -> usize {
        let mut removed = 0;
        for (key, slot) in self.slots() {
            let missing = match slot.lock().as_ref() {
                Some(entry) => self
                    .fs
                    .modified(&entry.source)
                    .is_err_and(|e| e.kind() == std::io::ErrorKind::NotFound),
                None => false,
            };
            if missing && self.detach(&key, &slot) {
                trace!(key = %key, "Pruned cache entry");
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "Cache maintenance: removed missing entries");
        }
        removed
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.registrations.len(), self.len())
    }

    /// Zero the hit/miss counters
    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    fn slots(&self) -> Vec<(CacheKey, Slot)> {
        self.values
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Remove `slot` from the value table if it is still the one filed under `key`
    fn detach(&self, key: &CacheKey, slot: &Slot) -> bool {
        self.values
            .remove_if(key, |_, current| Arc::ptr_eq(current, slot))
            .is_some()
    }

    fn is_attached(&self, key: &CacheKey, slot: &Slot) -> bool {
        self.values
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current.value(), slot))
    }

    /// Shared refresh-and-fetch: stat, reconvert when the timestamp changed,
    /// return the cached value.
    fn fetch<F>(&self, key: &CacheKey, path: &Path, convert: F) -> CacheResult<StoredValue>
    where
        F: FnOnce(&str) -> Result<StoredValue, BoxError>,
    {
        // A slot can be detached (unmap, clear, failed first fill) while we
        // wait on its mutex; retry against whatever the table holds now.
        loop {
            let slot = Arc::clone(self.values.entry(key.clone()).or_default().value());
            let mut guard = slot.lock();
            if !self.is_attached(key, &slot) {
                continue;
            }

            let refreshed = self.refresh(key, path, &mut guard, convert);
            match &refreshed {
                Ok(_) => slot.populated.store(true, Ordering::Release),
                // Nothing was cached before this call; leave no trace of it
                Err(_) if guard.is_none() => {
                    self.detach(key, &slot);
                }
                Err(_) => {}
            }
            return refreshed;
        }
    }

    fn refresh<F>(
        &self,
        key: &CacheKey,
        path: &Path,
        slot: &mut Option<ValueEntry>,
        convert: F,
    ) -> CacheResult<StoredValue>
    where
        F: FnOnce(&str) -> Result<StoredValue, BoxError>,
    {
        let modified = self
            .fs
            .modified(path)
            .map_err(|e| CacheError::from_io(path, e))?;

        if let Some(entry) = slot.as_ref() {
            if entry.modified == modified {
                self.counters.hit();
                trace!(key = %key, "Cache hit");
                return Ok(entry.value.clone());
            }
        }

        let stale = slot.is_some();
        self.counters.miss(stale);
        debug!(key = %key, stale, "Cache miss, converting file");

        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| CacheError::from_io(path, e))?;

        let value = convert(&content).map_err(|e| {
            self.counters.conversion_failed();
            CacheError::Converter(e)
        })?;

        trace!(key = %key, type_name = value.type_name, "Stored converted value");
        *slot = Some(ValueEntry {
            source: path.to_path_buf(),
            modified,
            value: value.clone(),
        });
        Ok(value)
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentCache")
            .field("registrations", &self.registrations.len())
            .field("values", &self.values.len())
            .field("case_folding", &self.case_folding)
            .finish_non_exhaustive()
    }
}

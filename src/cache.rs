use core::cell::RefCell;
use parking_lot::{const_reentrant_mutex, ReentrantMutex, ReentrantMutexGuard};
use std::collections::BTreeMap;
use tracing::debug;

use crate::{signature::CacheKey, value::Value};

/// Cached values by key.
///
/// A value stored under a key is never replaced by instantiation, only [`Cache::clear`] removes it.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    map: BTreeMap<CacheKey, Value>,
}

impl Cache {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { map: BTreeMap::new() }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.map.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&Value> {
        self.map.get(key)
    }

    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.map.keys()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Stores the value unless the key is already taken and returns the stored one
    pub(crate) fn insert(&mut self, key: CacheKey, value: Value) -> Value {
        self.map.entry(key).or_insert(value).clone()
    }
}

static GLOBAL_CACHE: GlobalCache = GlobalCache::new();

/// Process-wide cache used with [`CacheMode::Global`].
///
/// The lock is reentrant: a thread that constructs a value holds it for the whole lookup, construction and store,
/// so nested nodes of the same construction can use the cache, while other threads wait for the stored value.
pub struct GlobalCache {
    inner: ReentrantMutex<RefCell<Cache>>,
}

impl GlobalCache {
    #[inline]
    #[must_use]
    const fn new() -> Self {
        Self {
            inner: const_reentrant_mutex(RefCell::new(Cache::new())),
        }
    }

    #[inline]
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_CACHE
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().borrow().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().borrow().is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().borrow().contains(key)
    }

    /// Removes all values.
    /// Waits for constructions in progress on other threads, they're dropped from the cache too.
    pub fn clear(&self) {
        self.inner.lock().borrow_mut().clear();
        debug!("Global cache cleared");
    }

    #[inline]
    #[must_use]
    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.inner.lock().borrow().get(key).cloned()
    }

    #[inline]
    fn insert(&self, key: CacheKey, value: Value) -> Value {
        self.inner.lock().borrow_mut().insert(key, value)
    }

    #[inline]
    fn lock(&self) -> ReentrantMutexGuard<'_, RefCell<Cache>> {
        self.inner.lock()
    }
}

/// Empties the global cache, see [`GlobalCache::clear`]
#[inline]
pub fn clear() {
    GlobalCache::global().clear();
}

/// Lifetime of the cache used by an instantiation
#[derive(Debug, Default)]
pub enum CacheMode<'a> {
    /// A new cache for one top-level call.
    /// Repeated references to one node within the call still share a value.
    #[default]
    Ephemeral,
    /// A cache owned by the caller, shared by every call it's passed to
    Local(&'a mut Cache),
    /// The process-wide [`GlobalCache`]
    Global,
}

impl<'a> From<&'a mut Cache> for CacheMode<'a> {
    #[inline]
    fn from(cache: &'a mut Cache) -> Self {
        CacheMode::Local(cache)
    }
}

impl From<bool> for CacheMode<'_> {
    #[inline]
    fn from(global: bool) -> Self {
        if global {
            CacheMode::Global
        } else {
            CacheMode::Ephemeral
        }
    }
}

impl CacheMode<'_> {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            CacheMode::Ephemeral => "ephemeral",
            CacheMode::Local(_) => "local",
            CacheMode::Global => "global",
        }
    }

    /// Runs `f` with the cache resolved from the mode
    pub(crate) fn with_store<R>(self, f: impl FnOnce(&mut Store<'_>) -> R) -> R {
        match self {
            CacheMode::Ephemeral => f(&mut Store::Local(&mut Cache::new())),
            CacheMode::Local(cache) => f(&mut Store::Local(cache)),
            CacheMode::Global => f(&mut Store::Global(GlobalCache::global())),
        }
    }
}

/// Cache used during one top-level call, threaded through the whole recursion
pub(crate) enum Store<'a> {
    Local(&'a mut Cache),
    Global(&'static GlobalCache),
}

/// Held while a value is looked up, constructed and stored
pub(crate) type FlightGuard = ReentrantMutexGuard<'static, RefCell<Cache>>;

impl Store<'_> {
    #[inline]
    #[must_use]
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Store::Local(_) => "local",
            Store::Global(_) => "global",
        }
    }

    /// Locks the global cache. Local caches are borrowed mutably, so they need no lock.
    #[inline]
    #[must_use]
    pub(crate) fn single_flight(&self) -> Option<FlightGuard> {
        match *self {
            Store::Local(_) => None,
            Store::Global(global) => Some(global.lock()),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &CacheKey) -> Option<Value> {
        match self {
            Store::Local(cache) => cache.get(key).cloned(),
            Store::Global(global) => global.get(key),
        }
    }

    #[inline]
    pub(crate) fn insert(&mut self, key: CacheKey, value: Value) -> Value {
        match self {
            Store::Local(cache) => cache.insert(key, value),
            Store::Global(global) => global.insert(key, value),
        }
    }
}

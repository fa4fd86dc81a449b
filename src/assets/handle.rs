//! Shared handles to cached resources
//!
//! A handle is what consumers hold on to. Erasing a resource from the cache only
//! drops the cache's own handle, so anything still drawing with it keeps working.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed)
}

/// A reference-counted handle to a decoded resource.
///
/// Two handles compare equal when they point at the same decoded asset, which is
/// how callers can tell a cached entry apart from a freshly decoded one.
pub struct AssetHandle<T> {
    id: u64,
    name: Arc<str>,
    inner: Arc<T>,
}

impl<T> AssetHandle<T> {
    /// Wrap a freshly decoded asset under `name`
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, value: T) -> Self {
        Self {
            id: next_id(),
            name: name.into(),
            inner: Arc::new(value),
        }
    }

    /// Unique id of the decoded asset
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Name the asset was registered under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Number of live handles, the cache's own included
    #[must_use]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T> PartialEq for AssetHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for AssetHandle<T> {}

impl<T> Hash for AssetHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> std::ops::Deref for AssetHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

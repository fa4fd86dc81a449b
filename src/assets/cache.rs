//! Name-keyed resource cache
//!
//! Resources are cached per `(type, name)`. Each resource type declares where it
//! lives on disk and how it is decoded; the cache resolves names against a list
//! of search roots, decodes on demand and hands out shared [`AssetHandle`]s.

use std::any::{Any, TypeId};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::handle::AssetHandle;
use crate::renderer::GpuContext;

/// Errors produced while resolving or decoding a resource
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{kind} '{name}' not found (searched {searched:?})")]
    NotFound {
        kind: &'static str,
        name: String,
        searched: Vec<PathBuf>,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {kind} '{name}': {reason}")]
    Decode {
        kind: &'static str,
        name: String,
        reason: String,
    },
    #[error("shader '{name}' failed to compile:\n{diagnostics}")]
    Compile { name: String, diagnostics: String },
    #[error("{kind} '{name}' needs a GPU device but none is available")]
    DeviceUnavailable { kind: &'static str, name: String },
}

/// What a decoder may use while turning a file into a resource.
#[derive(Clone, Copy, Default)]
pub struct LoadContext<'a> {
    pub gpu: Option<&'a GpuContext>,
}

impl<'a> LoadContext<'a> {
    #[must_use]
    pub const fn new(gpu: Option<&'a GpuContext>) -> Self {
        Self { gpu }
    }

    /// The device, or `DeviceUnavailable` for resources that must live on the GPU
    pub fn require_gpu(&self, kind: &'static str, name: &str) -> Result<&'a GpuContext, ResourceError> {
        self.gpu.ok_or_else(|| ResourceError::DeviceUnavailable {
            kind,
            name: name.to_owned(),
        })
    }
}

/// A type the cache knows how to locate and decode.
pub trait Resource: Sized + Send + Sync + 'static {
    /// Human readable kind used in diagnostics
    const KIND: &'static str;
    /// Sub-folder of every search root holding this kind of file
    const FOLDER: &'static str;
    /// Accepted file extensions, tried in order
    const EXTENSIONS: &'static [&'static str];

    /// Decode the file at `path` into a resource.
    fn decode(ctx: &LoadContext<'_>, name: &str, path: &Path) -> Result<Self, ResourceError>;
}

struct Store<T> {
    entries: FxHashMap<String, AssetHandle<T>>,
    default: Option<AssetHandle<T>>,
}

impl<T> Store<T> {
    fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            default: None,
        }
    }
}

trait ErasedStore: Send + Sync {
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Send + Sync + 'static> ErasedStore for Store<T> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Cache of decoded resources keyed by type and name.
pub struct ResourceCache {
    roots: Vec<PathBuf>,
    stores: FxHashMap<TypeId, Box<dyn ErasedStore>>,
}

impl ResourceCache {
    /// Create a cache searching the given roots in order
    #[must_use]
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            stores: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    fn store<T: Resource>(&self) -> Option<&Store<T>> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|store| store.as_any().downcast_ref::<Store<T>>())
    }

    fn store_mut<T: Resource>(&mut self) -> &mut Store<T> {
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Store::<T>::new()))
            .as_any_mut()
            .downcast_mut::<Store<T>>()
            .expect("resource store registered under the wrong TypeId")
    }

    /// Resolve `name` to the first matching file under the search roots.
    ///
    /// A name that already ends in one of the accepted extensions is looked up
    /// as is; otherwise every extension is tried in order for each root.
    pub fn resolve<T: Resource>(&self, name: &str) -> Result<PathBuf, ResourceError> {
        let has_extension = T::EXTENSIONS
            .iter()
            .any(|ext| name.to_ascii_lowercase().ends_with(ext));
        let mut searched = Vec::new();

        for root in &self.roots {
            let folder = root.join(T::FOLDER);
            if has_extension {
                let candidate = folder.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
                searched.push(candidate);
                continue;
            }
            for ext in T::EXTENSIONS {
                let candidate = folder.join(format!("{name}{ext}"));
                if candidate.is_file() {
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(ResourceError::NotFound {
            kind: T::KIND,
            name: name.to_owned(),
            searched,
        })
    }

    /// Load `name`, reusing the cached entry when there is one.
    ///
    /// A failure is logged and returned; the cache is left untouched.
    pub fn load<T: Resource>(
        &mut self,
        name: &str,
        ctx: &LoadContext<'_>,
    ) -> Result<AssetHandle<T>, ResourceError> {
        if let Some(handle) = self.store::<T>().and_then(|store| store.entries.get(name)) {
            log::debug!("{} '{}' already cached", T::KIND, name);
            return Ok(handle.clone());
        }
        self.reload(name, ctx)
    }

    /// Decode `name` again, replacing the cached entry only on success.
    pub fn reload<T: Resource>(
        &mut self,
        name: &str,
        ctx: &LoadContext<'_>,
    ) -> Result<AssetHandle<T>, ResourceError> {
        let asset = self
            .resolve::<T>(name)
            .and_then(|path| T::decode(ctx, name, &path))
            .inspect_err(|e| log::error!("{e}"))?;

        let handle = AssetHandle::new(name, asset);
        self.store_mut::<T>()
            .entries
            .insert(name.to_owned(), handle.clone());
        log::info!("Loaded {} '{}'", T::KIND, name);
        Ok(handle)
    }

    /// The cached entry for `name`, falling back to the type's default.
    #[must_use]
    pub fn get<T: Resource>(&self, name: &str) -> Option<AssetHandle<T>> {
        let store = self.store::<T>()?;
        store.entries.get(name).or(store.default.as_ref()).cloned()
    }

    /// The cached entry for `name` without the default fallback
    #[must_use]
    pub fn get_cached<T: Resource>(&self, name: &str) -> Option<AssetHandle<T>> {
        self.store::<T>()
            .and_then(|store| store.entries.get(name))
            .cloned()
    }

    #[must_use]
    pub fn is_exists<T: Resource>(&self, name: &str) -> bool {
        self.store::<T>()
            .is_some_and(|store| store.entries.contains_key(name))
    }

    /// Drop the cache's handle for `name`. Outstanding handles stay valid.
    pub fn erase<T: Resource>(&mut self, name: &str) -> bool {
        let removed = self.store_mut::<T>().entries.remove(name).is_some();
        if removed {
            log::debug!("Erased {} '{}'", T::KIND, name);
        }
        removed
    }

    /// Insert an asset built outside the cache, replacing any entry with that name.
    pub fn add<T: Resource>(&mut self, name: &str, asset: T) -> AssetHandle<T> {
        let handle = AssetHandle::new(name, asset);
        self.store_mut::<T>()
            .entries
            .insert(name.to_owned(), handle.clone());
        handle
    }

    /// Register the fallback returned by [`get`](Self::get) for unknown names.
    pub fn set_fallback<T: Resource>(&mut self, asset: T) -> AssetHandle<T> {
        let handle = AssetHandle::new(format!("<default {}>", T::KIND), asset);
        self.store_mut::<T>().default = Some(handle.clone());
        handle
    }

    #[must_use]
    pub fn fallback<T: Resource>(&self) -> Option<AssetHandle<T>> {
        self.store::<T>().and_then(|store| store.default.clone())
    }

    /// Number of named entries across every resource type
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.values().map(|store| store.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and default.
    pub fn clear_all(&mut self) {
        let count = self.len();
        self.stores.clear();
        log::info!("Resource cache cleared ({count} entries)");
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(["data"])
    }
}

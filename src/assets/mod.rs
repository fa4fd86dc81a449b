//! Asset and resource management
//!
//! Resources are decoded from files under the configured search roots and kept
//! in a [`ResourceCache`] keyed by type and name. Handles are cheap to clone and
//! keep the asset alive after it leaves the cache.

mod cache;
mod handle;
mod mesh;
mod shader;
mod texture;

pub use cache::{LoadContext, Resource, ResourceCache, ResourceError};
pub use handle::AssetHandle;
pub use mesh::{Geometry, Mesh, MeshData, Vertex, read_gltf};
pub use shader::{RasterOptions, Shader, builtin, supports_wireframe};
pub use texture::Texture;

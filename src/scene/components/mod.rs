//! Built-in components

mod camera;
mod light;
mod skybox;
mod sprite;
mod static_mesh;

pub use camera::{Camera, MAIN_CAMERA_NAME, Projection};
pub use light::{Light, LightKind, LightParams, light_direction, light_record};
pub use skybox::{DEFAULT_SKY_TEXTURE, Skybox};
pub use sprite::Sprite;
pub use static_mesh::StaticMesh;

use crate::assets::{AssetHandle, Texture};
use crate::scene::SceneContext;

/// Look a texture up for a drawable.
///
/// A cached texture is reused. Otherwise, with `auto_load`, the texture is
/// loaded and `None` is returned on failure; without it the cache default is
/// used.
fn find_texture(
    ctx: &mut SceneContext<'_>,
    name: &str,
    auto_load: bool,
) -> Option<AssetHandle<Texture>> {
    if let Some(texture) = ctx.resources.get_cached::<Texture>(name) {
        return Some(texture);
    }
    if auto_load {
        ctx.load::<Texture>(name).ok()
    } else {
        ctx.resources.fallback::<Texture>()
    }
}

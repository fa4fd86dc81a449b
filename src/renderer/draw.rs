//! The drawable capability and the data a single draw needs

use crate::assets::{AssetHandle, Geometry, Shader, Texture};
use crate::scene::Transform;

use super::gpu::GpuContext;
use super::uniforms::{FrameConstants, ObjectBinding};

/// Everything the renderer binds for one draw, in binding order
pub struct DrawCall<'a> {
    pub shader: &'a Shader,
    pub texture: &'a Texture,
    pub binding: &'a ObjectBinding,
    pub geometry: &'a Geometry,
}

/// Implemented by components that put something on screen.
pub trait Drawable {
    /// Write this frame's constants. Runs before the render pass is recorded.
    fn prepare(&mut self, gpu: &GpuContext, frame: &FrameConstants, transform: &Transform);

    /// Resources to bind, or `None` while something is still missing
    fn draw_call(&self) -> Option<DrawCall<'_>>;
}

/// GPU objects shared by the textured drawables
#[derive(Debug, Default)]
pub struct DrawResources {
    pub shader: Option<AssetHandle<Shader>>,
    pub texture: Option<AssetHandle<Texture>>,
    pub binding: Option<ObjectBinding>,
}

impl DrawResources {
    #[must_use]
    pub fn draw_call<'a>(&'a self, geometry: Option<&'a Geometry>) -> Option<DrawCall<'a>> {
        Some(DrawCall {
            shader: self.shader.as_deref()?,
            texture: self.texture.as_deref()?,
            binding: self.binding.as_ref()?,
            geometry: geometry?,
        })
    }
}

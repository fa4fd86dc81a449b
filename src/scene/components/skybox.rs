//! Environment cube that follows the camera

use glam::{Mat4, Quat, Vec3};

use crate::assets::{Geometry, MeshData, Shader, Texture, builtin};
use crate::renderer::{
    DrawCall, DrawResources, Drawable, FrameConstants, GpuContext, ObjectBinding, ObjectUniform,
};
use crate::scene::component::{Component, Owner, SceneContext};
use crate::scene::transform::Transform;

/// Texture a skybox shows unless told otherwise
pub const DEFAULT_SKY_TEXTURE: &str = "DefaultSky";

/// A large cube centred on the camera, drawn without depth testing.
///
/// Spawn it before the rest of the scene so everything else draws over it.
#[derive(Debug)]
pub struct Skybox {
    pub scale: f32,
    texture_name: String,
    geometry: Option<Geometry>,
    draw: DrawResources,
}

impl Skybox {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scale: 20.0,
            texture_name: DEFAULT_SKY_TEXTURE.to_owned(),
            geometry: None,
            draw: DrawResources::default(),
        }
    }

    #[must_use]
    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.texture_name = name.into();
        self
    }

    #[must_use]
    pub fn texture_name(&self) -> &str {
        &self.texture_name
    }

    /// World matrix for a camera at `eye`
    #[must_use]
    pub fn world_matrix(&self, eye: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), Quat::IDENTITY, eye)
    }
}

impl Default for Skybox {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Skybox {
    fn on_create(&mut self, owner: &Owner<'_>, ctx: &mut SceneContext<'_>) {
        self.draw.shader = ctx.resources.get::<Shader>(builtin::SKYBOX);
        self.draw.texture = ctx
            .resources
            .get_cached::<Texture>(&self.texture_name)
            .or_else(|| ctx.load::<Texture>(&self.texture_name).ok())
            .or_else(|| ctx.resources.fallback::<Texture>());

        if let Some(gpu) = ctx.gpu {
            self.geometry = Some(Geometry::upload(&gpu.device, &MeshData::sky_cube(), owner.name));
            self.draw.binding = Some(ObjectBinding::new(gpu, owner.name));
        }
    }

    fn as_drawable(&self) -> Option<&dyn Drawable> {
        Some(self)
    }

    fn as_drawable_mut(&mut self) -> Option<&mut dyn Drawable> {
        Some(self)
    }
}

impl Drawable for Skybox {
    fn prepare(&mut self, gpu: &GpuContext, frame: &FrameConstants, _transform: &Transform) {
        if let Some(binding) = &self.draw.binding {
            let uniform = ObjectUniform::new(self.world_matrix(frame.camera_position), frame);
            binding.write(&gpu.queue, &uniform);
        }
    }

    fn draw_call(&self) -> Option<DrawCall<'_>> {
        self.draw.draw_call(self.geometry.as_ref())
    }
}

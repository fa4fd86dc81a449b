//! Textured quad

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::find_texture;
use crate::assets::{Geometry, MeshData, Shader, Texture, builtin};
use crate::renderer::{
    DrawCall, DrawResources, Drawable, FrameConstants, GpuContext, ObjectBinding, ObjectUniform,
};
use crate::scene::component::{Component, Owner, SceneContext};
use crate::scene::transform::Transform;

/// Pixels to world units for sprite sizing
const PIXEL_SCALE: f32 = 0.01;

/// A quad showing a texture or one tile of a texture atlas
#[derive(Debug)]
pub struct Sprite {
    pub color: Vec4,
    tile_frame: Vec2,
    tile_size: Vec2,
    texture_name: Option<String>,
    unload_texture: bool,
    scale_factor: Vec3,
    draw: DrawResources,
    geometry: Option<Geometry>,
}

impl Sprite {
    #[must_use]
    pub fn new() -> Self {
        Self {
            color: Vec4::ONE,
            tile_frame: Vec2::ZERO,
            tile_size: Vec2::ZERO,
            texture_name: None,
            unload_texture: false,
            scale_factor: Vec3::ONE,
            draw: DrawResources::default(),
            geometry: None,
        }
    }

    /// Texture to load when the sprite is created
    #[must_use]
    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.texture_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Show one `size` pixel tile of an atlas
    #[must_use]
    pub fn with_tile_size(mut self, size: Vec2) -> Self {
        self.tile_size = size;
        self.update_scale_factor();
        self
    }

    pub fn set_tile_frame(&mut self, frame: Vec2) {
        self.tile_frame = frame;
    }

    #[must_use]
    pub const fn tile_frame(&self) -> Vec2 {
        self.tile_frame
    }

    /// Size multiplier applied on top of the transform's scale
    #[must_use]
    pub const fn scale_factor(&self) -> Vec3 {
        self.scale_factor
    }

    #[must_use]
    pub fn texture_name(&self) -> Option<&str> {
        self.texture_name.as_deref()
    }

    /// Switch to texture `name`.
    ///
    /// With `auto_load` a texture that is not cached yet is loaded, and a
    /// failed load returns `false` leaving the sprite as it was. With
    /// `unload_on_destroy` the texture is erased from the cache when the
    /// sprite goes away.
    pub fn load_texture(
        &mut self,
        ctx: &mut SceneContext<'_>,
        name: &str,
        unload_on_destroy: bool,
        auto_load: bool,
    ) -> bool {
        let Some(texture) = find_texture(ctx, name, auto_load) else {
            return false;
        };
        self.draw.texture = Some(texture);
        self.texture_name = Some(name.to_owned());
        self.unload_texture = unload_on_destroy;
        self.update_scale_factor();
        true
    }

    fn update_scale_factor(&mut self) {
        let pixels = if self.tile_size.cmpgt(Vec2::ZERO).all() {
            self.tile_size
        } else if let Some(texture) = &self.draw.texture {
            Vec2::new(texture.width() as f32, texture.height() as f32)
        } else {
            return;
        };
        self.scale_factor = (pixels * PIXEL_SCALE).extend(1.0);
    }

    fn texture_size(&self) -> Vec2 {
        self.draw.texture.as_ref().map_or(Vec2::ONE, |texture| {
            Vec2::new(texture.width() as f32, texture.height() as f32)
        })
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Sprite {
    fn on_create(&mut self, owner: &Owner<'_>, ctx: &mut SceneContext<'_>) {
        self.draw.shader = ctx.resources.get::<Shader>(builtin::SPRITE);

        let loaded = match self.texture_name.clone() {
            Some(name) => self.load_texture(ctx, &name, self.unload_texture, true),
            None => false,
        };
        if !loaded {
            self.draw.texture = ctx.resources.fallback::<Texture>();
            self.update_scale_factor();
        }

        if let Some(gpu) = ctx.gpu {
            self.geometry = Some(Geometry::upload(&gpu.device, &MeshData::quad(), owner.name));
            self.draw.binding = Some(ObjectBinding::new(gpu, owner.name));
        }
    }

    fn on_destroy(&mut self, _owner: &Owner<'_>, ctx: &mut SceneContext<'_>) {
        if self.unload_texture
            && let Some(name) = &self.texture_name
        {
            self.draw.texture = None;
            ctx.resources.erase::<Texture>(name);
        }
    }

    fn as_drawable(&self) -> Option<&dyn Drawable> {
        Some(self)
    }

    fn as_drawable_mut(&mut self) -> Option<&mut dyn Drawable> {
        Some(self)
    }
}

impl Drawable for Sprite {
    fn prepare(&mut self, gpu: &GpuContext, frame: &FrameConstants, transform: &Transform) {
        let Some(binding) = &self.draw.binding else {
            return;
        };
        let world = transform.world_matrix() * Mat4::from_scale(self.scale_factor);
        let uniform = ObjectUniform::new(world, frame)
            .with_color(self.color)
            .with_tile(self.tile_frame, self.tile_size)
            .with_texture_size(self.texture_size());
        binding.write(&gpu.queue, &uniform);
    }

    fn draw_call(&self) -> Option<DrawCall<'_>> {
        self.draw.draw_call(self.geometry.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::testing::Fixture;
    use crate::scene::{Entity, SceneGraph};

    #[test]
    fn test_tile_size_drives_scale() {
        let sprite = Sprite::new().with_tile_size(Vec2::new(32.0, 64.0));
        assert!((sprite.scale_factor() - Vec3::new(0.32, 0.64, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_create_without_device_has_nothing_to_draw() {
        let mut fx = Fixture::new();
        let mut scene = SceneGraph::new();
        scene
            .spawn(Entity::new("s").with_component(Sprite::new()), &mut fx.ctx())
            .unwrap();
        let entity = scene.get_object_by_name("s").unwrap();
        assert_eq!(entity.drawables().count(), 1);
        assert!(entity.drawables().all(|d| d.draw_call().is_none()));
    }

    #[test]
    fn test_failed_auto_load_keeps_previous_texture_name() {
        let mut fx = Fixture::new();
        let mut sprite = Sprite::new();
        assert!(!sprite.load_texture(&mut fx.ctx(), "missing", true, true));
        assert_eq!(sprite.texture_name(), None);
        // without auto load the cache default is used, which is absent here
        assert!(!sprite.load_texture(&mut fx.ctx(), "missing", false, false));
    }
}

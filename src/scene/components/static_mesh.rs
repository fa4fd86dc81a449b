//! Lit, textured meshes loaded from glTF

use glam::Vec4;

use super::find_texture;
use crate::assets::{AssetHandle, Mesh, Shader, Texture, builtin};
use crate::renderer::{
    DrawCall, DrawResources, Drawable, FrameConstants, GpuContext, ObjectBinding, ObjectUniform,
};
use crate::scene::component::{Component, Owner, SceneContext};
use crate::scene::transform::Transform;

#[derive(Debug)]
pub struct StaticMesh {
    pub color: Vec4,
    mesh_name: Option<String>,
    texture_name: Option<String>,
    mesh: Option<AssetHandle<Mesh>>,
    draw: DrawResources,
}

impl Default for StaticMesh {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            mesh_name: None,
            texture_name: None,
            mesh: None,
            draw: DrawResources::default(),
        }
    }
}

impl StaticMesh {
    #[must_use]
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh_name: Some(mesh.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.texture_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn mesh_name(&self) -> Option<&str> {
        self.mesh_name.as_deref()
    }

    #[must_use]
    pub fn mesh(&self) -> Option<&AssetHandle<Mesh>> {
        self.mesh.as_ref()
    }

    /// Switch to mesh `name`, loading it if it is not cached
    pub fn load_mesh(&mut self, ctx: &mut SceneContext<'_>, name: &str) -> bool {
        let mesh = match ctx.resources.get_cached::<Mesh>(name) {
            Some(mesh) => mesh,
            None => match ctx.load::<Mesh>(name) {
                Ok(mesh) => mesh,
                Err(_) => return false,
            },
        };
        self.mesh = Some(mesh);
        self.mesh_name = Some(name.to_owned());
        true
    }

    /// Switch to texture `name`, loading it if it is not cached
    pub fn load_texture(&mut self, ctx: &mut SceneContext<'_>, name: &str) -> bool {
        let Some(texture) = find_texture(ctx, name, true) else {
            return false;
        };
        self.draw.texture = Some(texture);
        self.texture_name = Some(name.to_owned());
        true
    }
}

impl Component for StaticMesh {
    fn on_create(&mut self, owner: &Owner<'_>, ctx: &mut SceneContext<'_>) {
        self.draw.shader = ctx.resources.get::<Shader>(builtin::MESH);

        if let Some(name) = self.mesh_name.clone()
            && !self.load_mesh(ctx, &name)
        {
            log::warn!("{}: mesh '{name}' is unavailable", owner.name);
        }

        let textured = match self.texture_name.clone() {
            Some(name) => self.load_texture(ctx, &name),
            None => false,
        };
        if !textured {
            self.draw.texture = ctx.resources.fallback::<Texture>();
        }

        if let Some(gpu) = ctx.gpu {
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

impl Drawable for StaticMesh {
    fn prepare(&mut self, gpu: &GpuContext, frame: &FrameConstants, transform: &Transform) {
        if let Some(binding) = &self.draw.binding {
            let uniform = ObjectUniform::new(transform.world_matrix(), frame).with_color(self.color);
            binding.write(&gpu.queue, &uniform);
        }
    }

    fn draw_call(&self) -> Option<DrawCall<'_>> {
        self.draw
            .draw_call(self.mesh.as_ref().map(|mesh| &mesh.get().geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::testing::Fixture;

    #[test]
    fn test_default_mesh_is_opaque_white() {
        assert_eq!(StaticMesh::default().color, Vec4::ONE);
        assert_eq!(StaticMesh::new("cube").color, Vec4::ONE);
    }

    #[test]
    fn test_missing_mesh_is_reported() {
        let mut fx = Fixture::new();
        let mut mesh = StaticMesh::new("cube");
        assert!(!mesh.load_mesh(&mut fx.ctx(), "no-such-mesh"));
        assert_eq!(mesh.mesh_name(), Some("cube"));
        assert!(mesh.mesh().is_none());
        assert!(mesh.draw_call().is_none());
    }
}

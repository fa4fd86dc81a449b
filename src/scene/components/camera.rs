//! Camera component
//!
//! Builds view and projection matrices from its entity's transform and the
//! viewport size every update. The renderer draws from the active camera.

use glam::{Mat4, UVec2, Vec3};
use winit::keyboard::KeyCode;

use crate::scene::component::{Component, Owner, SceneContext};
use crate::scene::transform::{Transform, euler_to_quat};

/// Name of the camera entity the engine creates at startup
pub const MAIN_CAMERA_NAME: &str = "_MainCamera";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub projection_mode: Projection,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// World units per pixel in orthographic mode
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
    /// Movement speed in units per second when controls are enabled
    pub speed: f32,
    /// Degrees per pixel of mouse movement
    pub sensitivity: f32,
    /// Drive the owner's transform from WASD / mouse input
    pub controls: bool,
    view: Mat4,
    projection: Mat4,
    ortho: Mat4,
}

impl Camera {
    #[must_use]
    pub fn new(projection_mode: Projection) -> Self {
        Self {
            projection_mode,
            fov: 60.0,
            zoom: 0.025,
            near: 0.001,
            far: 10_000.0,
            speed: 16.3,
            sensitivity: 0.15,
            controls: false,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            ortho: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn perspective() -> Self {
        Self::new(Projection::Perspective)
    }

    #[must_use]
    pub fn orthographic() -> Self {
        Self::new(Projection::Orthographic)
    }

    #[must_use]
    pub fn with_controls(mut self, controls: bool) -> Self {
        self.controls = controls;
        self
    }

    #[must_use]
    pub fn is_orthographic(&self) -> bool {
        self.projection_mode == Projection::Orthographic
    }

    #[must_use]
    pub const fn view(&self) -> Mat4 {
        self.view
    }

    #[must_use]
    pub const fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Pixel-space orthographic projection for screen overlays
    #[must_use]
    pub const fn ortho(&self) -> Mat4 {
        self.ortho
    }

    /// Recompute the matrices for `transform` seen through a `viewport`
    pub fn compute(&mut self, transform: &Transform, viewport: UVec2) {
        let size = viewport.max(UVec2::ONE).as_vec2();
        let position = transform.world_position();
        let rotation = transform.world_rotation();

        self.ortho = Mat4::orthographic_lh(0.0, size.x, size.y, 0.0, 0.0, 1.0);

        match self.projection_mode {
            Projection::Orthographic => {
                let (w, h) = (size.x * self.zoom * 0.5, size.y * self.zoom * 0.5);
                self.view = Mat4::from_rotation_z(-rotation.z.to_radians())
                    * Mat4::from_translation(-position);
                self.projection = Mat4::orthographic_lh(-w, w, -h, h, self.near, self.far);
            }
            Projection::Perspective => {
                let orientation = euler_to_quat(rotation);
                self.view = Mat4::look_to_lh(
                    position,
                    orientation * Vec3::Z,
                    orientation * Vec3::Y,
                );
                self.projection = Mat4::perspective_lh(
                    self.fov.to_radians(),
                    size.x / size.y,
                    self.near,
                    self.far,
                );
            }
        }
    }

    /// Move along the view direction
    pub fn walk(&self, transform: &mut Transform, amount: f32) {
        transform.translate(transform.forward() * amount * self.speed);
    }

    pub fn strafe(&self, transform: &mut Transform, amount: f32) {
        transform.translate(transform.right() * amount * self.speed);
    }

    /// Move along world up
    pub fn fly(&self, transform: &mut Transform, amount: f32) {
        transform.translate(Vec3::Y * amount * self.speed);
    }

    fn apply_controls(&self, transform: &mut Transform, ctx: &SceneContext<'_>, dt: f32) {
        let input = ctx.input;
        let forward = input.axis(KeyCode::KeyS, KeyCode::KeyW) * dt;
        let side = input.axis(KeyCode::KeyA, KeyCode::KeyD) * dt;
        let vertical = input.axis(KeyCode::ShiftLeft, KeyCode::Space) * dt;

        match self.projection_mode {
            Projection::Orthographic => {
                transform.translate(Vec3::new(side, forward, 0.0) * self.speed);
            }
            Projection::Perspective => {
                if forward != 0.0 {
                    self.walk(transform, forward);
                }
                if side != 0.0 {
                    self.strafe(transform, side);
                }
                if vertical != 0.0 {
                    self.fly(transform, vertical);
                }
                if input.is_mouse_pressed(winit::event::MouseButton::Right) {
                    let delta = input.cursor_delta() * self.sensitivity;
                    let mut rotation = transform.rotation() + Vec3::new(delta.y, delta.x, 0.0);
                    rotation.x = rotation.x.clamp(-89.0, 89.0);
                    transform.set_rotation(rotation);
                }
            }
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::orthographic()
    }
}

impl Component for Camera {
    fn on_create(&mut self, owner: &Owner<'_>, ctx: &mut SceneContext<'_>) {
        self.compute(&owner.transform.borrow(), ctx.viewport);
    }

    fn on_update(&mut self, owner: &Owner<'_>, ctx: &mut SceneContext<'_>, dt: f32) {
        if self.controls {
            self.apply_controls(&mut owner.transform.borrow_mut(), ctx, dt);
        }
        self.compute(&owner.transform.borrow(), ctx.viewport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthographic_maps_visible_area() {
        let mut camera = Camera::orthographic();
        let transform = Transform::from_position(Vec3::new(0.0, 0.0, -10.0));
        camera.compute(&transform, UVec2::new(800, 600));

        // half width is 800 * 0.025 / 2 = 10 units
        let clip = camera.projection() * camera.view() * Vec3::new(10.0, 0.0, 0.0).extend(1.0);
        assert!((clip.x / clip.w - 1.0).abs() < 1e-4);
        assert!(clip.z / clip.w > 0.0 && clip.z / clip.w < 1.0);
    }

    #[test]
    fn test_orthographic_follows_position() {
        let mut camera = Camera::orthographic();
        let transform = Transform::from_position(Vec3::new(5.0, 2.0, -1.0));
        camera.compute(&transform, UVec2::new(100, 100));
        let view_space = camera.view() * Vec3::new(5.0, 2.0, 0.0).extend(1.0);
        assert!(view_space.x.abs() < 1e-5);
        assert!(view_space.y.abs() < 1e-5);
    }

    #[test]
    fn test_perspective_looks_down_positive_z() {
        let mut camera = Camera::perspective();
        camera.compute(&Transform::new(), UVec2::new(1280, 720));
        let ahead = camera.projection() * camera.view() * Vec3::new(0.0, 0.0, 5.0).extend(1.0);
        let behind = camera.projection() * camera.view() * Vec3::new(0.0, 0.0, -5.0).extend(1.0);
        assert!(ahead.w > 0.0);
        assert!(behind.w < 0.0);
    }

    #[test]
    fn test_zero_viewport_does_not_produce_nan() {
        let mut camera = Camera::perspective();
        camera.compute(&Transform::new(), UVec2::ZERO);
        assert!(camera.projection().is_finite());
    }

    #[test]
    fn test_walk_uses_speed() {
        let camera = Camera::perspective();
        let mut transform = Transform::new();
        camera.walk(&mut transform, 1.0);
        assert!((transform.position().z - camera.speed).abs() < 1e-4);
    }
}

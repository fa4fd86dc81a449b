//! A small rendering engine core built on wgpu
//!
//! This crate provides:
//! - A type and name keyed resource cache for textures, meshes and shaders
//! - Entities with transforms, change notifications and components
//! - A merged light buffer kept in sync by light components
//! - A renderer that presents or captures the scene for an egui overlay

pub mod assets;
pub mod core;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod ui;

// Re-exports for convenience
pub use egui;
pub use glam;
pub use wgpu;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{AssetHandle, Mesh, ResourceCache, Shader, Texture};
    pub use crate::core::{
        Application, Engine, EngineConfig, EngineContext, EngineError, FrameStats, GameTime,
    };
    pub use crate::input::Input;
    pub use crate::renderer::{OutputMode, Renderer};
    pub use crate::scene::components::{
        Camera, Light, LightKind, MAIN_CAMERA_NAME, Projection, Skybox, Sprite, StaticMesh,
    };
    pub use crate::scene::{Component, Entity, EntityId, SceneGraph, Transform, TransformEvent};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}

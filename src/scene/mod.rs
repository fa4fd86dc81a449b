//! Scene graph
//!
//! Entities own a transform and an ordered list of components. The graph keeps
//! entities in spawn order, which is also update and draw order.

mod callback;
mod component;
pub mod components;
mod entity;
mod graph;
mod transform;

pub use callback::{CallbackId, CallbackList};
pub use component::{AsAny, Component, ComponentId, Owner, SceneContext};
pub use entity::{ComponentState, DEFAULT_ENTITY, ENGINE_ENTITY, Entity, EntityId};
pub use graph::{SceneError, SceneGraph};
pub use transform::{SharedTransform, Transform, TransformEvent, euler_to_quat};

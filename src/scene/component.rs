//! Components and the context their hooks run with

use std::any::Any;
use std::fmt;

use glam::UVec2;
use uuid::Uuid;

use super::transform::{SharedTransform, Transform};
use crate::assets::{AssetHandle, LoadContext, Resource, ResourceCache, ResourceError};
use crate::core::GameTime;
use crate::input::Input;
use crate::renderer::{DebugLines, Drawable, GpuContext, SharedLights};

/// Identity of a component, stable for its whole life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub Uuid);

impl ComponentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Engine services handed to component hooks.
pub struct SceneContext<'a> {
    pub resources: &'a mut ResourceCache,
    pub lights: &'a SharedLights,
    /// `None` when running without a device, e.g. in tests
    pub gpu: Option<&'a GpuContext>,
    pub input: &'a Input,
    pub time: &'a GameTime,
    /// Size of the scene viewport in pixels
    pub viewport: UVec2,
}

impl SceneContext<'_> {
    #[must_use]
    pub fn load_context(&self) -> LoadContext<'_> {
        LoadContext::new(self.gpu)
    }

    /// Load through the cache with this context's device
    pub fn load<T: Resource>(&mut self, name: &str) -> Result<AssetHandle<T>, ResourceError> {
        let ctx = LoadContext::new(self.gpu);
        self.resources.load(name, &ctx)
    }
}

/// The entity a hook runs for
#[derive(Clone, Copy)]
pub struct Owner<'a> {
    pub entity: super::EntityId,
    pub component: ComponentId,
    pub name: &'a str,
    /// Both the entity and the component are enabled
    pub enabled: bool,
    pub transform: &'a SharedTransform,
}

/// Type-erasure helpers every component gets for free
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Behaviour attached to an entity.
///
/// `on_create` runs once, before the first update. Updates only run while both
/// the entity and the component are enabled. `on_destroy` runs once when the
/// component or its entity goes away.
pub trait Component: AsAny {
    fn on_create(&mut self, _owner: &Owner<'_>, _ctx: &mut SceneContext<'_>) {}

    fn on_update(&mut self, _owner: &Owner<'_>, _ctx: &mut SceneContext<'_>, _dt: f32) {}

    fn on_destroy(&mut self, _owner: &Owner<'_>, _ctx: &mut SceneContext<'_>) {}

    /// Called after the effective enabled state changed; see `owner.enabled`
    fn on_enabled_changed(&mut self, _owner: &Owner<'_>, _ctx: &mut SceneContext<'_>) {}

    /// Editor shapes drawn while gizmos are on
    fn draw_gizmos(&self, _transform: &Transform, _lines: &mut DebugLines) {}

    fn as_drawable(&self) -> Option<&dyn Drawable> {
        None
    }

    fn as_drawable_mut(&mut self) -> Option<&mut dyn Drawable> {
        None
    }
}

impl dyn Component {
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

//! Entities: a name, a transform and an ordered list of components

use std::fmt;

use glam::Vec3;
use uuid::Uuid;

use super::component::{Component, ComponentId, Owner, SceneContext};
use super::transform::{SharedTransform, Transform};
use crate::renderer::{DebugLines, Drawable};

/// Identity of an entity, stable for its whole life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub Uuid);

impl EntityId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Tag for entities the engine creates for itself
pub const ENGINE_ENTITY: i32 = -1;
/// Tag entities get unless told otherwise
pub const DEFAULT_ENTITY: i32 = 0;

/// Where a component is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// Attached but `on_create` has not run yet
    Created,
    Active,
    Disabled,
}

struct ComponentSlot {
    id: ComponentId,
    enabled: bool,
    created: bool,
    component: Box<dyn Component>,
}

/// A named object in the scene
pub struct Entity {
    id: EntityId,
    name: String,
    tag: i32,
    enabled: bool,
    transform: SharedTransform,
    parent: Option<EntityId>,
    components: Vec<ComponentSlot>,
}

// hooks need the slot mutably and the rest of the entity shared
macro_rules! owner {
    ($id:expr, $name:expr, $enabled:expr, $transform:expr, $slot:expr) => {
        Owner {
            entity: $id,
            component: $slot.id,
            name: $name,
            enabled: $enabled && $slot.enabled,
            transform: $transform,
        }
    };
}

impl Entity {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            tag: DEFAULT_ENTITY,
            enabled: true,
            transform: Transform::new().into_shared(),
            parent: None,
            components: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }

    #[must_use]
    pub fn with_position(self, position: Vec3) -> Self {
        self.transform.borrow_mut().set_position(position);
        self
    }

    #[must_use]
    pub fn with_scale(self, scale: Vec3) -> Self {
        self.transform.borrow_mut().set_scale(scale);
        self
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Component) -> Self {
        self.add_component(component);
        self
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    #[must_use]
    pub const fn tag(&self) -> i32 {
        self.tag
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn transform(&self) -> &SharedTransform {
        &self.transform
    }

    #[must_use]
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub(crate) fn set_parent_id(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    /// Attach a component. Its `on_create` runs when the scene next sees it.
    pub fn add_component(&mut self, component: impl Component) -> ComponentId {
        let id = ComponentId::new();
        self.components.push(ComponentSlot {
            id,
            enabled: true,
            created: false,
            component: Box::new(component),
        });
        id
    }

    /// First component of type `T`
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|slot| slot.component.downcast_ref::<T>())
    }

    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|slot| slot.component.downcast_mut::<T>())
    }

    /// Id of the first component of type `T`
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|slot| slot.component.is::<T>())
            .map(|slot| slot.id)
    }

    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        self.slot(id).map(|slot| slot.component.as_ref())
    }

    /// Components in attachment order
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &dyn Component)> {
        self.components
            .iter()
            .map(|slot| (slot.id, slot.component.as_ref()))
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn component_state(&self, id: ComponentId) -> Option<ComponentState> {
        self.slot(id).map(|slot| {
            if !slot.created {
                ComponentState::Created
            } else if self.enabled && slot.enabled {
                ComponentState::Active
            } else {
                ComponentState::Disabled
            }
        })
    }

    fn slot(&self, id: ComponentId) -> Option<&ComponentSlot> {
        self.components.iter().find(|slot| slot.id == id)
    }

    /// Enabled drawables whose `on_create` has run
    pub fn drawables_mut(&mut self) -> impl Iterator<Item = &mut dyn Drawable> {
        let enabled = self.enabled;
        self.components
            .iter_mut()
            .filter(move |slot| enabled && slot.enabled && slot.created)
            .filter_map(|slot| slot.component.as_drawable_mut())
    }

    pub fn drawables(&self) -> impl Iterator<Item = &dyn Drawable> {
        let enabled = self.enabled;
        self.components
            .iter()
            .filter(move |slot| enabled && slot.enabled && slot.created)
            .filter_map(|slot| slot.component.as_drawable())
    }

    /// Queue the debug shapes of every active component
    pub fn draw_gizmos(&self, lines: &mut DebugLines) {
        if !self.enabled {
            return;
        }
        let transform = self.transform.borrow();
        for slot in self.components.iter().filter(|slot| slot.enabled && slot.created) {
            slot.component.draw_gizmos(&transform, lines);
        }
    }

    /// Run `on_create` for components that have not had it yet
    pub(crate) fn create_pending(&mut self, ctx: &mut SceneContext<'_>) {
        let Self {
            id,
            name,
            enabled,
            transform,
            components,
            ..
        } = self;
        for slot in components.iter_mut().filter(|slot| !slot.created) {
            slot.created = true;
            let owner = owner!(*id, name, *enabled, transform, slot);
            slot.component.on_create(&owner, ctx);
        }
    }

    pub(crate) fn update(&mut self, ctx: &mut SceneContext<'_>, dt: f32) {
        if !self.enabled {
            return;
        }
        self.create_pending(ctx);
        let Self {
            id,
            name,
            transform,
            components,
            ..
        } = self;
        for slot in components.iter_mut().filter(|slot| slot.enabled) {
            let owner = owner!(*id, name, true, transform, slot);
            slot.component.on_update(&owner, ctx, dt);
        }
    }

    /// Returns whether the state changed
    pub(crate) fn set_enabled(&mut self, enabled: bool, ctx: &mut SceneContext<'_>) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        let Self {
            id,
            name,
            transform,
            components,
            ..
        } = self;
        for slot in components
            .iter_mut()
            .filter(|slot| slot.created && slot.enabled)
        {
            let owner = owner!(*id, name, enabled, transform, slot);
            slot.component.on_enabled_changed(&owner, ctx);
        }
        true
    }

    pub(crate) fn set_component_enabled(
        &mut self,
        component: ComponentId,
        enabled: bool,
        ctx: &mut SceneContext<'_>,
    ) -> bool {
        let Self {
            id,
            name,
            enabled: entity_enabled,
            transform,
            components,
            ..
        } = self;
        let Some(slot) = components.iter_mut().find(|slot| slot.id == component) else {
            return false;
        };
        if slot.enabled == enabled {
            return false;
        }
        slot.enabled = enabled;
        if slot.created && *entity_enabled {
            let owner = owner!(*id, name, *entity_enabled, transform, slot);
            slot.component.on_enabled_changed(&owner, ctx);
        }
        true
    }

    /// Detach one component, running its `on_destroy`
    pub(crate) fn remove_component(
        &mut self,
        component: ComponentId,
        ctx: &mut SceneContext<'_>,
    ) -> bool {
        let Some(index) = self.components.iter().position(|slot| slot.id == component) else {
            return false;
        };
        let mut slot = self.components.remove(index);
        if slot.created {
            let owner = owner!(self.id, &self.name, self.enabled, &self.transform, slot);
            slot.component.on_destroy(&owner, ctx);
        }
        true
    }

    /// Run `on_destroy` for every created component, last attached first
    pub(crate) fn destroy(&mut self, ctx: &mut SceneContext<'_>) {
        while let Some(mut slot) = self.components.pop() {
            if slot.created {
                let owner = owner!(self.id, &self.name, self.enabled, &self.transform, slot);
                slot.component.on_destroy(&owner, ctx);
            }
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}

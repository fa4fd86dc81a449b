//! The set of live entities and the traversal the frame loop runs over them

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::component::{Component, ComponentId, SceneContext};
use super::components::{Camera, MAIN_CAMERA_NAME};
use super::entity::{Entity, EntityId};
use super::transform::{SharedTransform, Transform};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("an entity named '{0}' already exists")]
    DuplicateName(String),
    #[error("no entity with id {0}")]
    UnknownEntity(EntityId),
    #[error("parenting {child} under {parent} would create a cycle")]
    ParentCycle { child: EntityId, parent: EntityId },
}

/// Owns every entity. Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct SceneGraph {
    entities: Vec<Entity>,
    names: FxHashMap<String, EntityId>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity and run `on_create` for its components.
    pub fn spawn(
        &mut self,
        mut entity: Entity,
        ctx: &mut SceneContext<'_>,
    ) -> Result<EntityId, SceneError> {
        if self.names.contains_key(entity.name()) {
            log::warn!("entity name '{}' is already taken", entity.name());
            return Err(SceneError::DuplicateName(entity.name().to_owned()));
        }
        let id = entity.id();
        self.names.insert(entity.name().to_owned(), id);
        if entity.is_enabled() {
            entity.create_pending(ctx);
        }
        log::debug!("spawned entity '{}' ({id})", entity.name());
        self.entities.push(entity);
        Ok(id)
    }

    /// Attach a component to a live entity, running its `on_create` right away
    /// if the entity is enabled.
    pub fn add_component(
        &mut self,
        id: EntityId,
        component: impl Component,
        ctx: &mut SceneContext<'_>,
    ) -> Result<ComponentId, SceneError> {
        let entity = self.get_mut(id).ok_or(SceneError::UnknownEntity(id))?;
        let component_id = entity.add_component(component);
        if entity.is_enabled() {
            entity.create_pending(ctx);
        }
        Ok(component_id)
    }

    pub fn remove_component(
        &mut self,
        id: EntityId,
        component: ComponentId,
        ctx: &mut SceneContext<'_>,
    ) -> bool {
        self.get_mut(id)
            .is_some_and(|entity| entity.remove_component(component, ctx))
    }

    /// Remove an entity now, running `on_destroy` for its components.
    ///
    /// Children stay in the scene and lose their parent link.
    pub fn destroy(&mut self, id: EntityId, ctx: &mut SceneContext<'_>) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut entity = self.entities.remove(index);
        entity.destroy(ctx);
        self.names.remove(entity.name());

        for child in self.entities.iter_mut().filter(|e| e.parent() == Some(id)) {
            child.set_parent_id(None);
            Transform::set_parent(child.transform(), None);
        }
        log::debug!("destroyed entity '{}' ({id})", entity.name());
        true
    }

    /// Destroy every entity, in insertion order
    pub fn clear(&mut self, ctx: &mut SceneContext<'_>) {
        for mut entity in self.entities.drain(..) {
            entity.destroy(ctx);
        }
        self.names.clear();
    }

    pub fn set_enabled(&mut self, id: EntityId, enabled: bool, ctx: &mut SceneContext<'_>) -> bool {
        let Some(entity) = self.get_mut(id) else {
            return false;
        };
        if enabled && entity.set_enabled(true, ctx) {
            // components attached while disabled
            entity.create_pending(ctx);
            return true;
        }
        entity.set_enabled(enabled, ctx)
    }

    pub fn set_component_enabled(
        &mut self,
        id: EntityId,
        component: ComponentId,
        enabled: bool,
        ctx: &mut SceneContext<'_>,
    ) -> bool {
        self.get_mut(id)
            .is_some_and(|entity| entity.set_component_enabled(component, enabled, ctx))
    }

    /// Link `child` under `parent`, or detach it with `None`
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), SceneError> {
        let child_transform = self
            .get(child)
            .map(|e| e.transform().clone())
            .ok_or(SceneError::UnknownEntity(child))?;

        let parent_transform = match parent {
            Some(parent_id) => {
                let mut cursor = Some(parent_id);
                while let Some(current) = cursor {
                    if current == child {
                        return Err(SceneError::ParentCycle {
                            child,
                            parent: parent_id,
                        });
                    }
                    cursor = self
                        .get(current)
                        .ok_or(SceneError::UnknownEntity(current))?
                        .parent();
                }
                self.get(parent_id).map(|e| e.transform().clone())
            }
            None => None,
        };

        Transform::set_parent(&child_transform, parent_transform.as_ref());
        if let Some(entity) = self.get_mut(child) {
            entity.set_parent_id(parent);
        }
        Ok(())
    }

    pub fn rename(&mut self, id: EntityId, name: impl Into<String>) -> Result<(), SceneError> {
        let name = name.into();
        if let Some(&owner) = self.names.get(&name) {
            return if owner == id {
                Ok(())
            } else {
                Err(SceneError::DuplicateName(name))
            };
        }
        let entity = self.get_mut(id).ok_or(SceneError::UnknownEntity(id))?;
        let old = entity.name().to_owned();
        entity.set_name(name.clone());
        self.names.remove(&old);
        self.names.insert(name, id);
        Ok(())
    }

    /// Advance every enabled entity by `dt`
    pub fn update(&mut self, ctx: &mut SceneContext<'_>, dt: f32) {
        for entity in &mut self.entities {
            entity.update(ctx, dt);
        }
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id() == id)
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    #[must_use]
    pub fn get_object_by_name(&self, name: &str) -> Option<&Entity> {
        self.names.get(name).and_then(|&id| self.get(id))
    }

    pub fn get_object_by_name_mut(&mut self, name: &str) -> Option<&mut Entity> {
        let id = *self.names.get(name)?;
        self.get_mut(id)
    }

    /// First component of type `T` on the entity called `name`
    #[must_use]
    pub fn get_component_by_name<T: Component>(&self, name: &str) -> Option<&T> {
        self.get_object_by_name(name)?.get_component::<T>()
    }

    pub fn get_component_by_name_mut<T: Component>(&mut self, name: &str) -> Option<&mut T> {
        self.get_object_by_name_mut(name)?.get_component_mut::<T>()
    }

    /// Entities whose parent is `id`
    pub fn children_of(&self, id: EntityId) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.parent() == Some(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The camera views are rendered from: the enabled `_MainCamera` entity,
    /// otherwise the first enabled entity carrying a camera.
    #[must_use]
    pub fn active_camera(&self) -> Option<(&Camera, &SharedTransform)> {
        self.get_object_by_name(MAIN_CAMERA_NAME)
            .and_then(camera_of)
            .or_else(|| self.entities.iter().find_map(camera_of))
    }
}

fn camera_of(entity: &Entity) -> Option<(&Camera, &SharedTransform)> {
    if !entity.is_enabled() {
        return None;
    }
    entity
        .get_component::<Camera>()
        .map(|camera| (camera, entity.transform()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::component::Owner;
    use crate::scene::components::StaticMesh;
    use crate::scene::testing::Fixture;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every hook it receives
    struct Probe {
        log: Rc<RefCell<Vec<String>>>,
        tag: &'static str,
    }

    impl Probe {
        fn new(tag: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                log: Rc::clone(log),
                tag,
            }
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.tag));
        }
    }

    impl Component for Probe {
        fn on_create(&mut self, _owner: &Owner<'_>, _ctx: &mut SceneContext<'_>) {
            self.push("create");
        }

        fn on_update(&mut self, _owner: &Owner<'_>, _ctx: &mut SceneContext<'_>, _dt: f32) {
            self.push("update");
        }

        fn on_destroy(&mut self, _owner: &Owner<'_>, _ctx: &mut SceneContext<'_>) {
            self.push("destroy");
        }

        fn on_enabled_changed(&mut self, owner: &Owner<'_>, _ctx: &mut SceneContext<'_>) {
            self.push(if owner.enabled { "enabled" } else { "disabled" });
        }
    }

    fn log() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_spawn_runs_create_once_then_updates() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        scene
            .spawn(Entity::new("a").with_component(Probe::new("a", &log)), &mut fx.ctx())
            .unwrap();

        scene.update(&mut fx.ctx(), 0.016);
        scene.update(&mut fx.ctx(), 0.016);
        assert_eq!(*log.borrow(), vec!["a:create", "a:update", "a:update"]);
    }

    #[test]
    fn test_traversal_follows_insertion_order() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        for tag in ["first", "second", "third"] {
            scene
                .spawn(Entity::new(tag).with_component(Probe::new(tag, &log)), &mut fx.ctx())
                .unwrap();
        }
        log.borrow_mut().clear();
        scene.update(&mut fx.ctx(), 0.0);
        assert_eq!(
            *log.borrow(),
            vec!["first:update", "second:update", "third:update"]
        );
    }

    #[test]
    fn test_disable_skips_update_and_enable_does_not_recreate() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        let id = scene
            .spawn(Entity::new("a").with_component(Probe::new("a", &log)), &mut fx.ctx())
            .unwrap();

        assert!(scene.set_enabled(id, false, &mut fx.ctx()));
        assert!(!scene.set_enabled(id, false, &mut fx.ctx()));
        scene.update(&mut fx.ctx(), 0.016);
        assert!(scene.set_enabled(id, true, &mut fx.ctx()));
        scene.update(&mut fx.ctx(), 0.016);

        assert_eq!(
            *log.borrow(),
            vec!["a:create", "a:disabled", "a:enabled", "a:update"]
        );
    }

    #[test]
    fn test_disabled_entity_leaves_the_draw_pass() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        let id = scene
            .spawn(
                Entity::new("crate")
                    .with_component(StaticMesh::new("cube"))
                    .with_component(Probe::new("crate", &log)),
                &mut fx.ctx(),
            )
            .unwrap();
        assert_eq!(scene.get(id).unwrap().drawables().count(), 1);

        scene.set_enabled(id, false, &mut fx.ctx());
        assert_eq!(scene.get(id).unwrap().drawables().count(), 0);
        assert_eq!(scene.get_mut(id).unwrap().drawables_mut().count(), 0);

        scene.set_enabled(id, true, &mut fx.ctx());
        assert_eq!(scene.get(id).unwrap().drawables().count(), 1);
        let creates = log.borrow().iter().filter(|e| e.ends_with(":create")).count();
        assert_eq!(creates, 1);
    }

    #[test]
    fn test_component_disable_is_independent() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        let mut entity = Entity::new("e");
        let first = entity.add_component(Probe::new("x", &log));
        entity.add_component(Probe::new("y", &log));
        let id = scene.spawn(entity, &mut fx.ctx()).unwrap();
        log.borrow_mut().clear();

        assert!(scene.set_component_enabled(id, first, false, &mut fx.ctx()));
        scene.update(&mut fx.ctx(), 0.0);
        assert_eq!(*log.borrow(), vec!["x:disabled", "y:update"]);
    }

    #[test]
    fn test_destroy_removes_immediately() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        let id = scene
            .spawn(Entity::new("gone").with_component(Probe::new("g", &log)), &mut fx.ctx())
            .unwrap();

        assert!(scene.destroy(id, &mut fx.ctx()));
        assert!(scene.get(id).is_none());
        assert!(scene.get_object_by_name("gone").is_none());
        assert!(!scene.destroy(id, &mut fx.ctx()));
        scene.update(&mut fx.ctx(), 0.0);
        assert_eq!(*log.borrow(), vec!["g:create", "g:destroy"]);

        // the name is free again
        assert!(scene.spawn(Entity::new("gone"), &mut fx.ctx()).is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut fx = Fixture::new();
        let mut scene = SceneGraph::new();
        let a = scene.spawn(Entity::new("a"), &mut fx.ctx()).unwrap();
        let b = scene.spawn(Entity::new("b"), &mut fx.ctx()).unwrap();
        assert_eq!(
            scene.spawn(Entity::new("a"), &mut fx.ctx()),
            Err(SceneError::DuplicateName("a".into()))
        );
        assert_eq!(scene.len(), 2);

        assert!(scene.rename(b, "a").is_err());
        scene.rename(b, "c").unwrap();
        assert_eq!(scene.get_object_by_name("c").unwrap().id(), b);
        assert!(scene.get_object_by_name("b").is_none());
        assert_eq!(scene.get_object_by_name("a").unwrap().id(), a);
    }

    #[test]
    fn test_get_component_by_name() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        scene
            .spawn(Entity::new("probe").with_component(Probe::new("p", &log)), &mut fx.ctx())
            .unwrap();
        assert_eq!(scene.get_component_by_name::<Probe>("probe").unwrap().tag, "p");
        assert!(scene.get_component_by_name::<Camera>("probe").is_none());
        assert!(scene.get_component_by_name::<Probe>("missing").is_none());
    }

    #[test]
    fn test_parenting_and_orphaning() {
        let mut fx = Fixture::new();
        let mut scene = SceneGraph::new();
        let parent = scene
            .spawn(
                Entity::new("parent").with_position(glam::Vec3::new(5.0, 0.0, 0.0)),
                &mut fx.ctx(),
            )
            .unwrap();
        let child = scene.spawn(Entity::new("child"), &mut fx.ctx()).unwrap();

        scene.set_parent(child, Some(parent)).unwrap();
        assert_eq!(scene.children_of(parent).count(), 1);
        let world = scene.get(child).unwrap().transform().borrow().world_position();
        assert_eq!(world, glam::Vec3::new(5.0, 0.0, 0.0));

        assert_eq!(
            scene.set_parent(parent, Some(child)),
            Err(SceneError::ParentCycle { child: parent, parent: child })
        );

        scene.destroy(parent, &mut fx.ctx());
        let orphan = scene.get(child).unwrap();
        assert_eq!(orphan.parent(), None);
        assert!(orphan.transform().borrow().parent().is_none());
    }

    #[test]
    fn test_clear_destroys_everything() {
        let mut fx = Fixture::new();
        let log = log();
        let mut scene = SceneGraph::new();
        for tag in ["a", "b"] {
            scene
                .spawn(Entity::new(tag).with_component(Probe::new(tag, &log)), &mut fx.ctx())
                .unwrap();
        }
        scene.clear(&mut fx.ctx());
        assert!(scene.is_empty());
        assert_eq!(
            *log.borrow(),
            vec!["a:create", "b:create", "a:destroy", "b:destroy"]
        );
    }

    #[test]
    fn test_active_camera_prefers_main_camera() {
        let mut fx = Fixture::new();
        let mut scene = SceneGraph::new();
        assert!(scene.active_camera().is_none());

        scene
            .spawn(Entity::new("other").with_component(Camera::perspective()), &mut fx.ctx())
            .unwrap();
        scene
            .spawn(
                Entity::new(MAIN_CAMERA_NAME).with_component(Camera::orthographic()),
                &mut fx.ctx(),
            )
            .unwrap();

        let (camera, _) = scene.active_camera().unwrap();
        assert!(camera.is_orthographic());

        let main = scene.get_object_by_name(MAIN_CAMERA_NAME).unwrap().id();
        scene.set_enabled(main, false, &mut fx.ctx());
        let (camera, _) = scene.active_camera().unwrap();
        assert!(!camera.is_orthographic());
    }
}

//! Light components
//!
//! A light keeps one record in the shared [`LightGlobals`] up to date. It
//! listens to its entity's transform and to its own colour and strength, and
//! every change is pushed as a single begin/set/end round trip.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::{Vec3, Vec4};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::renderer::{DebugLines, LightRecord, LightType, SharedLights};
use crate::scene::callback::{CallbackId, CallbackList};
use crate::scene::component::{Component, Owner, SceneContext};
use crate::scene::transform::{Transform, TransformEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    /// Adds to the shared ambient term instead of owning a record
    Ambient,
}

impl LightKind {
    const fn light_type(self) -> LightType {
        match self {
            Self::Directional => LightType::Directional,
            Self::Point => LightType::Point,
            Self::Ambient => LightType::Ambient,
        }
    }
}

/// Everything about a light that is not its placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub color: Vec3,
    pub strength: f32,
    /// Constant, linear and quadratic falloff terms
    pub attenuation: Vec3,
    pub range: f32,
    pub pad: f32,
    pub enabled: bool,
}

impl LightParams {
    #[must_use]
    pub const fn for_kind(kind: LightKind) -> Self {
        let (attenuation, range) = match kind {
            LightKind::Directional => (Vec3::new(0.0, 0.1, 0.0), 25.0),
            LightKind::Point => (Vec3::new(3.0, 0.0, 1.0), 100.0),
            LightKind::Ambient => (Vec3::ZERO, 0.0),
        };
        Self {
            color: Vec3::ONE,
            strength: 1.0,
            attenuation,
            range,
            pad: 1.0,
            enabled: true,
        }
    }
}

/// Build the record for a light placed at `transform`
#[must_use]
pub fn light_record(kind: LightKind, params: &LightParams, transform: &Transform) -> LightRecord {
    LightRecord {
        position: transform.world_position().extend(1.0).to_array(),
        direction: transform.world_rotation().extend(1.0).to_array(),
        color: params.color.extend(1.0).to_array(),
        attenuation: params.attenuation.to_array(),
        strength: params.strength,
        range: params.range,
        pad: params.pad,
        light_type: kind.light_type() as i32,
        enabled: i32::from(params.enabled),
    }
}

/// Direction a light with Euler `rotation` (degrees) shines along, as the
/// lit shaders compute it
#[must_use]
pub fn light_direction(rotation: Vec3) -> Vec3 {
    let (pitch, yaw) = (rotation.x.to_radians(), rotation.y.to_radians());
    Vec3::new(pitch.cos() * yaw.sin(), -pitch.sin(), pitch.cos() * yaw.cos()).normalize()
}

/// Length of the arrow drawn for directional lights
const DIRECTION_GIZMO_LENGTH: f32 = 2.0;

fn push(kind: LightKind, id: Uuid, params: &LightParams, transform: &Transform, lights: &SharedLights) {
    let mut globals = lights.borrow_mut();
    let mut batch = globals.begin();
    match kind {
        LightKind::Ambient => {
            let strength = if params.enabled { params.strength } else { 0.0 };
            batch.set_ambient(id, params.color, strength);
        }
        _ => batch.set_new_light_structure(light_record(kind, params, transform), id),
    }
}

/// What a created light needs to reach its record
struct Link {
    id: Uuid,
    lights: SharedLights,
    transform: Weak<RefCell<Transform>>,
    subscriptions: SmallVec<[(TransformEvent, CallbackId); 3]>,
    own: SmallVec<[CallbackId; 2]>,
}

/// Directional, point or ambient light
pub struct Light {
    kind: LightKind,
    params: Rc<Cell<LightParams>>,
    on_color_changed: CallbackList<LightParams>,
    on_strength_changed: CallbackList<LightParams>,
    link: Option<Link>,
}

impl Light {
    #[must_use]
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            params: Rc::new(Cell::new(LightParams::for_kind(kind))),
            on_color_changed: CallbackList::new(),
            on_strength_changed: CallbackList::new(),
            link: None,
        }
    }

    #[must_use]
    pub fn directional() -> Self {
        Self::new(LightKind::Directional)
    }

    #[must_use]
    pub fn point() -> Self {
        Self::new(LightKind::Point)
    }

    #[must_use]
    pub fn ambient() -> Self {
        Self::new(LightKind::Ambient)
    }

    #[must_use]
    pub fn with_color(self, color: Vec3) -> Self {
        self.edit(|p| p.color = color);
        self
    }

    #[must_use]
    pub fn with_strength(self, strength: f32) -> Self {
        self.edit(|p| p.strength = strength);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> LightKind {
        self.kind
    }

    #[must_use]
    pub fn params(&self) -> LightParams {
        self.params.get()
    }

    /// Id of the record in the light registry, once created
    #[must_use]
    pub fn record_id(&self) -> Option<Uuid> {
        self.link.as_ref().map(|link| link.id)
    }

    fn edit(&self, f: impl FnOnce(&mut LightParams)) -> bool {
        let mut params = self.params.get();
        let before = params;
        f(&mut params);
        self.params.set(params);
        before != params
    }

    pub fn set_color(&mut self, color: Vec3) {
        if self.edit(|p| p.color = color) {
            self.on_color_changed.invoke(&self.params.get());
        }
    }

    pub fn set_strength(&mut self, strength: f32) {
        if self.edit(|p| p.strength = strength) {
            self.on_strength_changed.invoke(&self.params.get());
        }
    }

    pub fn set_attenuation(&mut self, attenuation: Vec3) {
        if self.edit(|p| p.attenuation = attenuation) {
            self.refresh();
        }
    }

    pub fn set_range(&mut self, range: f32) {
        if self.edit(|p| p.range = range) {
            self.refresh();
        }
    }

    pub fn subscribe_color(&mut self, callback: impl FnMut(&LightParams) + 'static) -> CallbackId {
        self.on_color_changed.add(callback)
    }

    pub fn subscribe_strength(&mut self, callback: impl FnMut(&LightParams) + 'static) -> CallbackId {
        self.on_strength_changed.add(callback)
    }

    /// Push the current state to the registry
    pub fn refresh(&self) {
        if let Some(link) = &self.link {
            push_linked(self.kind, link.id, &self.params.get(), &link.transform, &link.lights);
        }
    }
}

fn push_linked(
    kind: LightKind,
    id: Uuid,
    params: &LightParams,
    transform: &Weak<RefCell<Transform>>,
    lights: &SharedLights,
) {
    let Some(transform) = transform.upgrade() else {
        return;
    };
    match transform.try_borrow() {
        Ok(transform) => push(kind, id, params, &transform, lights),
        Err(_) => log::warn!("light {id} changed while its transform was being edited"),
    }
}

impl Component for Light {
    fn on_create(&mut self, owner: &Owner<'_>, ctx: &mut SceneContext<'_>) {
        let id = owner.component.0;
        let kind = self.kind;
        self.edit(|p| p.enabled = owner.enabled);

        let mut subscriptions = SmallVec::new();
        if kind != LightKind::Ambient {
            let mut transform = owner.transform.borrow_mut();
            for event in [
                TransformEvent::Position,
                TransformEvent::Rotation,
                TransformEvent::Scale,
            ] {
                let params = Rc::clone(&self.params);
                let lights = Rc::clone(ctx.lights);
                let callback = transform.subscribe(event, move |t| {
                    push(kind, id, &params.get(), t, &lights);
                });
                subscriptions.push((event, callback));
            }
        }

        let weak = Rc::downgrade(owner.transform);
        let mut own = SmallVec::new();
        for list in [&mut self.on_color_changed, &mut self.on_strength_changed] {
            let weak = weak.clone();
            let lights = Rc::clone(ctx.lights);
            own.push(list.add(move |params| push_linked(kind, id, params, &weak, &lights)));
        }

        self.link = Some(Link {
            id,
            lights: Rc::clone(ctx.lights),
            transform: weak,
            subscriptions,
            own,
        });
        self.refresh();
    }

    fn on_destroy(&mut self, owner: &Owner<'_>, ctx: &mut SceneContext<'_>) {
        let Some(link) = self.link.take() else {
            return;
        };
        {
            let mut transform = owner.transform.borrow_mut();
            for (event, callback) in link.subscriptions {
                transform.unsubscribe(event, callback);
            }
        }
        self.on_color_changed.remove(link.own[0]);
        self.on_strength_changed.remove(link.own[1]);

        ctx.lights.borrow_mut().begin().remove_light(link.id);
    }

    fn on_enabled_changed(&mut self, owner: &Owner<'_>, _ctx: &mut SceneContext<'_>) {
        if self.edit(|p| p.enabled = owner.enabled) {
            self.refresh();
        }
    }

    fn draw_gizmos(&self, transform: &Transform, lines: &mut DebugLines) {
        let params = self.params.get();
        let color = Vec4::from((params.color, 1.0));
        let position = transform.world_position();
        match self.kind {
            // the sphere marks where the light stops reaching
            LightKind::Point => lines.sphere(position, params.range, color),
            LightKind::Directional => lines.arrow(
                position,
                light_direction(transform.world_rotation()),
                DIRECTION_GIZMO_LENGTH,
                color,
            ),
            LightKind::Ambient => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::testing::Fixture;
    use crate::scene::{Entity, SceneGraph};

    fn spawn_two(fx: &mut Fixture) -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene
            .spawn(
                Entity::new("lamp")
                    .with_position(Vec3::new(1.0, 2.0, 3.0))
                    .with_component(Light::point()),
                &mut fx.ctx(),
            )
            .unwrap();
        scene
            .spawn(Entity::new("sun").with_component(Light::directional()), &mut fx.ctx())
            .unwrap();
        scene
    }

    fn record_of(fx: &Fixture, scene: &SceneGraph, name: &str) -> LightRecord {
        let id = scene
            .get_component_by_name::<Light>(name)
            .and_then(Light::record_id)
            .unwrap();
        *fx.lights.borrow().record(id).unwrap()
    }

    #[test]
    fn test_create_registers_defaults() {
        let mut fx = Fixture::new();
        let scene = spawn_two(&mut fx);
        assert_eq!(fx.lights.borrow().len(), 2);

        let lamp = record_of(&fx, &scene, "lamp");
        assert_eq!(lamp.light_type, LightType::Point as i32);
        assert_eq!(lamp.attenuation, [3.0, 0.0, 1.0]);
        assert_eq!(lamp.range, 100.0);
        assert_eq!(lamp.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(lamp.enabled, 1);

        let sun = record_of(&fx, &scene, "sun");
        assert_eq!(sun.light_type, LightType::Directional as i32);
        assert_eq!(sun.attenuation, [0.0, 0.1, 0.0]);
        assert_eq!(sun.range, 25.0);
    }

    #[test]
    fn test_color_change_updates_only_that_record() {
        let mut fx = Fixture::new();
        let mut scene = spawn_two(&mut fx);
        let sun_before = record_of(&fx, &scene, "sun");

        scene
            .get_component_by_name_mut::<Light>("lamp")
            .unwrap()
            .set_color(Vec3::new(1.0, 0.0, 0.0));

        assert_eq!(fx.lights.borrow().len(), 2);
        assert_eq!(record_of(&fx, &scene, "lamp").color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(record_of(&fx, &scene, "sun"), sun_before);
    }

    #[test]
    fn test_transform_change_pushes_record() {
        let mut fx = Fixture::new();
        let scene = spawn_two(&mut fx);
        let sun = scene.get_object_by_name("sun").unwrap();
        sun.transform()
            .borrow_mut()
            .set_rotation(Vec3::new(45.0, 10.0, 0.0));
        assert_eq!(record_of(&fx, &scene, "sun").direction, [45.0, 10.0, 0.0, 1.0]);
    }

    #[test]
    fn test_parent_offset_is_added() {
        let mut fx = Fixture::new();
        let mut scene = spawn_two(&mut fx);
        let parent = scene
            .spawn(
                Entity::new("rig").with_position(Vec3::new(10.0, 0.0, 0.0)),
                &mut fx.ctx(),
            )
            .unwrap();
        let lamp = scene.get_object_by_name("lamp").unwrap().id();
        scene.set_parent(lamp, Some(parent)).unwrap();

        // the parent link alone does not push; the next move does
        scene
            .get(lamp)
            .unwrap()
            .transform()
            .borrow_mut()
            .set_position_x(2.0);
        assert_eq!(record_of(&fx, &scene, "lamp").position, [12.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_disable_flags_record() {
        let mut fx = Fixture::new();
        let mut scene = spawn_two(&mut fx);
        let lamp = scene.get_object_by_name("lamp").unwrap().id();
        scene.set_enabled(lamp, false, &mut fx.ctx());
        assert_eq!(record_of(&fx, &scene, "lamp").enabled, 0);
        scene.set_enabled(lamp, true, &mut fx.ctx());
        assert_eq!(record_of(&fx, &scene, "lamp").enabled, 1);
    }

    #[test]
    fn test_point_light_gizmo_is_range_sphere() {
        let mut fx = Fixture::new();
        let mut scene = spawn_two(&mut fx);
        let lamp = scene.get_component_by_name_mut::<Light>("lamp").unwrap();
        lamp.set_range(4.0);
        lamp.set_color(Vec3::new(0.0, 1.0, 0.0));

        let mut lines = DebugLines::new();
        scene.get_object_by_name("lamp").unwrap().draw_gizmos(&mut lines);
        assert_eq!(lines.len(), 3 * crate::renderer::SPHERE_SEGMENTS);
        let first = lines.vertices()[0];
        assert_eq!(first.color, [0.0, 1.0, 0.0, 1.0]);
        let center = Vec3::new(1.0, 2.0, 3.0);
        assert!((Vec3::from(first.position).distance(center) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_disabled_light_draws_no_gizmo() {
        let mut fx = Fixture::new();
        let mut scene = spawn_two(&mut fx);
        let sun = scene.get_object_by_name("sun").unwrap().id();

        let mut lines = DebugLines::new();
        scene.get(sun).unwrap().draw_gizmos(&mut lines);
        assert_eq!(lines.len(), 3);

        scene.set_enabled(sun, false, &mut fx.ctx());
        lines.clear();
        scene.get(sun).unwrap().draw_gizmos(&mut lines);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_light_direction_matches_shader_convention() {
        assert!(light_direction(Vec3::ZERO).abs_diff_eq(Vec3::Z, 1e-6));
        assert!(light_direction(Vec3::new(90.0, 0.0, 0.0)).abs_diff_eq(-Vec3::Y, 1e-6));
    }

    #[test]
    fn test_destroy_removes_record_and_listeners() {
        let mut fx = Fixture::new();
        let mut scene = spawn_two(&mut fx);
        let lamp = scene.get_object_by_name("lamp").unwrap();
        let transform = Rc::clone(lamp.transform());
        let id = lamp.id();
        assert_eq!(transform.borrow().listener_count(TransformEvent::Position), 1);

        scene.destroy(id, &mut fx.ctx());
        assert_eq!(fx.lights.borrow().len(), 1);
        assert_eq!(transform.borrow().listener_count(TransformEvent::Position), 0);
        // moving the orphaned transform no longer touches the registry
        transform.borrow_mut().set_position(Vec3::ZERO);
        assert_eq!(fx.lights.borrow().len(), 1);
    }

    #[test]
    fn test_ambient_writes_shared_slot() {
        let mut fx = Fixture::new();
        let mut scene = SceneGraph::new();
        scene
            .spawn(
                Entity::new("ambient").with_component(
                    Light::ambient()
                        .with_color(Vec3::new(0.1, 0.2, 0.3))
                        .with_strength(0.5),
                ),
                &mut fx.ctx(),
            )
            .unwrap();
        assert!(fx.lights.borrow().is_empty());
        assert_eq!(fx.lights.borrow().storage().ambient_strength, 0.5);

        scene
            .get_component_by_name_mut::<Light>("ambient")
            .unwrap()
            .set_strength(0.8);
        assert_eq!(fx.lights.borrow().storage().ambient_strength, 0.8);
        assert_eq!(fx.lights.borrow().storage().ambient_color[..3], [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_destroying_one_ambient_keeps_the_other() {
        let mut fx = Fixture::new();
        let mut scene = SceneGraph::new();
        scene
            .spawn(
                Entity::new("a1").with_component(Light::ambient().with_strength(0.5)),
                &mut fx.ctx(),
            )
            .unwrap();
        let a2 = scene
            .spawn(
                Entity::new("a2").with_component(Light::ambient().with_strength(0.3)),
                &mut fx.ctx(),
            )
            .unwrap();
        assert_eq!(fx.lights.borrow().ambient_count(), 2);

        scene.destroy(a2, &mut fx.ctx());
        assert_eq!(fx.lights.borrow().ambient_count(), 1);
        assert_eq!(fx.lights.borrow().storage().ambient_strength, 0.5);
    }

    #[test]
    fn test_extra_color_listener_sees_params() {
        let mut fx = Fixture::new();
        let mut scene = spawn_two(&mut fx);
        let seen = Rc::new(Cell::new(Vec3::ZERO));
        let s = Rc::clone(&seen);
        let light = scene.get_component_by_name_mut::<Light>("sun").unwrap();
        light.subscribe_color(move |p| s.set(p.color));
        light.set_color(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(seen.get(), Vec3::new(0.0, 1.0, 0.0));
        // unchanged colour does not notify
        seen.set(Vec3::ZERO);
        light.set_color(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(seen.get(), Vec3::ZERO);
    }
}

//! Position, rotation and scale with change notification
//!
//! Every setter compares against the current value and only notifies when
//! something actually changed. Listeners run synchronously, in registration
//! order, before the setter returns.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::{EulerRot, Mat4, Quat, Vec3};

use super::callback::{CallbackId, CallbackList};

/// Transforms are shared between their entity and whatever listens to them
pub type SharedTransform = Rc<RefCell<Transform>>;

/// Which change list a callback is registered on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformEvent {
    Position,
    Rotation,
    Scale,
    Parent,
}

#[derive(Debug, Clone, Copy)]
struct CachedWorld {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    matrix: Mat4,
}

/// Local placement of an entity.
///
/// Rotation is stored as Euler angles in degrees. The world matrix adds the
/// parent's local position and rotation to this transform's own values
/// component-wise; it is not a full hierarchical composition.
#[derive(Debug)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    parent: Option<Weak<RefCell<Transform>>>,
    world: Cell<Option<CachedWorld>>,
    on_position_changed: CallbackList<Transform>,
    on_rotation_changed: CallbackList<Transform>,
    on_scale_changed: CallbackList<Transform>,
    on_parent_changed: CallbackList<Transform>,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            parent: None,
            world: Cell::new(None),
            on_position_changed: CallbackList::new(),
            on_rotation_changed: CallbackList::new(),
            on_scale_changed: CallbackList::new(),
            on_parent_changed: CallbackList::new(),
        }
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// Wrap into the shared form entities hold
    #[must_use]
    pub fn into_shared(self) -> SharedTransform {
        Rc::new(RefCell::new(self))
    }

    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Euler angles in degrees
    #[must_use]
    pub const fn rotation(&self) -> Vec3 {
        self.rotation
    }

    #[must_use]
    pub const fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        if self.position != position {
            self.position = position;
            self.notify(TransformEvent::Position);
        }
    }

    pub fn set_position_x(&mut self, x: f32) {
        self.set_position(Vec3::new(x, self.position.y, self.position.z));
    }

    pub fn set_position_y(&mut self, y: f32) {
        self.set_position(Vec3::new(self.position.x, y, self.position.z));
    }

    pub fn set_position_z(&mut self, z: f32) {
        self.set_position(Vec3::new(self.position.x, self.position.y, z));
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        if self.rotation != rotation {
            self.rotation = rotation;
            self.notify(TransformEvent::Rotation);
        }
    }

    pub fn set_rotation_x(&mut self, x: f32) {
        self.set_rotation(Vec3::new(x, self.rotation.y, self.rotation.z));
    }

    pub fn set_rotation_y(&mut self, y: f32) {
        self.set_rotation(Vec3::new(self.rotation.x, y, self.rotation.z));
    }

    pub fn set_rotation_z(&mut self, z: f32) {
        self.set_rotation(Vec3::new(self.rotation.x, self.rotation.y, z));
    }

    /// Add Euler degrees to the current rotation
    pub fn rotate(&mut self, degrees: Vec3) {
        self.set_rotation(self.rotation + degrees);
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        if self.scale != scale {
            self.scale = scale;
            self.notify(TransformEvent::Scale);
        }
    }

    pub fn set_scale_x(&mut self, x: f32) {
        self.set_scale(Vec3::new(x, self.scale.y, self.scale.z));
    }

    pub fn set_scale_y(&mut self, y: f32) {
        self.set_scale(Vec3::new(self.scale.x, y, self.scale.z));
    }

    pub fn set_scale_z(&mut self, z: f32) {
        self.set_scale(Vec3::new(self.scale.x, self.scale.y, z));
    }

    /// The parent transform if it is still alive
    #[must_use]
    pub fn parent(&self) -> Option<SharedTransform> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Link `this` under `parent`. Linking a transform to itself is refused.
    pub fn set_parent(this: &SharedTransform, parent: Option<&SharedTransform>) -> bool {
        if parent.is_some_and(|p| Rc::ptr_eq(p, this)) {
            log::warn!("refusing to parent a transform to itself");
            return false;
        }
        let mut transform = this.borrow_mut();
        let unchanged = match (&transform.parent, parent) {
            (None, None) => true,
            (Some(current), Some(new)) => Weak::ptr_eq(current, &Rc::downgrade(new)),
            _ => false,
        };
        if !unchanged {
            transform.parent = parent.map(Rc::downgrade);
            transform.notify(TransformEvent::Parent);
        }
        true
    }

    /// Parent's local position and rotation, zero when there is no parent
    #[must_use]
    pub fn parent_offset(&self) -> (Vec3, Vec3) {
        self.parent()
            .and_then(|parent| {
                parent
                    .try_borrow()
                    .ok()
                    .map(|p| (p.position, p.rotation))
            })
            .unwrap_or((Vec3::ZERO, Vec3::ZERO))
    }

    /// Position with the parent's position added
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.position + self.parent_offset().0
    }

    /// Rotation with the parent's rotation added
    #[must_use]
    pub fn world_rotation(&self) -> Vec3 {
        self.rotation + self.parent_offset().1
    }

    /// World matrix, recomputed only when an input changed
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        let (parent_position, parent_rotation) = self.parent_offset();
        let position = self.position + parent_position;
        let rotation = self.rotation + parent_rotation;

        if let Some(cached) = self.world.get()
            && cached.position == position
            && cached.rotation == rotation
            && cached.scale == self.scale
        {
            return cached.matrix;
        }

        let matrix =
            Mat4::from_scale_rotation_translation(self.scale, euler_to_quat(rotation), position);
        self.world.set(Some(CachedWorld {
            position,
            rotation,
            scale: self.scale,
            matrix,
        }));
        matrix
    }

    /// Unit vector the transform faces (+Z rotated)
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        euler_to_quat(self.rotation) * Vec3::Z
    }

    #[must_use]
    pub fn right(&self) -> Vec3 {
        euler_to_quat(self.rotation) * Vec3::X
    }

    #[must_use]
    pub fn up(&self) -> Vec3 {
        euler_to_quat(self.rotation) * Vec3::Y
    }

    /// Register a listener for one kind of change
    pub fn subscribe(
        &mut self,
        event: TransformEvent,
        callback: impl FnMut(&Transform) + 'static,
    ) -> CallbackId {
        self.list_mut(event).add(callback)
    }

    pub fn unsubscribe(&mut self, event: TransformEvent, id: CallbackId) -> bool {
        self.list_mut(event).remove(id)
    }

    #[must_use]
    pub fn listener_count(&self, event: TransformEvent) -> usize {
        match event {
            TransformEvent::Position => self.on_position_changed.len(),
            TransformEvent::Rotation => self.on_rotation_changed.len(),
            TransformEvent::Scale => self.on_scale_changed.len(),
            TransformEvent::Parent => self.on_parent_changed.len(),
        }
    }

    fn list_mut(&mut self, event: TransformEvent) -> &mut CallbackList<Transform> {
        match event {
            TransformEvent::Position => &mut self.on_position_changed,
            TransformEvent::Rotation => &mut self.on_rotation_changed,
            TransformEvent::Scale => &mut self.on_scale_changed,
            TransformEvent::Parent => &mut self.on_parent_changed,
        }
    }

    fn notify(&mut self, event: TransformEvent) {
        // listeners see `self`, so the list is moved out while they run
        let mut listeners = std::mem::take(self.list_mut(event));
        listeners.invoke(self);
        let added = std::mem::replace(self.list_mut(event), CallbackList::new());
        listeners.append(added);
        *self.list_mut(event) = listeners;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Euler degrees (pitch, yaw, roll) to a quaternion
#[must_use]
pub fn euler_to_quat(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(transform: &mut Transform, event: TransformEvent) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        transform.subscribe(event, move |_| h.set(h.get() + 1));
        hits
    }

    #[test]
    fn test_setter_notifies_once_per_change() {
        let mut t = Transform::new();
        let position = counter(&mut t, TransformEvent::Position);
        let rotation = counter(&mut t, TransformEvent::Rotation);

        t.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(position.get(), 1);
        assert_eq!(rotation.get(), 0);

        t.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(position.get(), 1);

        t.set_position_y(5.0);
        assert_eq!(position.get(), 2);
        assert_eq!(t.position(), Vec3::new(1.0, 5.0, 3.0));
    }

    #[test]
    fn test_listener_sees_new_value() {
        let mut t = Transform::new();
        let seen = Rc::new(Cell::new(Vec3::ZERO));
        let s = Rc::clone(&seen);
        t.subscribe(TransformEvent::Scale, move |t| s.set(t.scale()));
        t.set_scale(Vec3::splat(2.0));
        assert_eq!(seen.get(), Vec3::splat(2.0));
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut t = Transform::new();
        for i in 0..3 {
            let o = Rc::clone(&order);
            t.subscribe(TransformEvent::Rotation, move |_| o.borrow_mut().push(i));
        }
        t.rotate(Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(t.listener_count(TransformEvent::Rotation), 3);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut t = Transform::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let id = t.subscribe(TransformEvent::Position, move |_| h.set(h.get() + 1));
        assert!(t.unsubscribe(TransformEvent::Position, id));
        t.translate(Vec3::X);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_world_matrix_sums_parent_components() {
        let parent = Transform::from_position(Vec3::new(10.0, 0.0, 0.0)).into_shared();
        parent.borrow_mut().set_rotation(Vec3::new(0.0, 0.0, 90.0));
        let child = Transform::from_position(Vec3::new(1.0, 2.0, 0.0)).into_shared();
        assert!(Transform::set_parent(&child, Some(&parent)));

        let c = child.borrow();
        assert_eq!(c.world_position(), Vec3::new(11.0, 2.0, 0.0));
        assert_eq!(c.world_rotation(), Vec3::new(0.0, 0.0, 90.0));
        let translation = c.world_matrix().w_axis.truncate();
        assert_eq!(translation, Vec3::new(11.0, 2.0, 0.0));
    }

    #[test]
    fn test_world_matrix_follows_parent_moves() {
        let parent = Transform::new().into_shared();
        let child = Transform::from_position(Vec3::Y).into_shared();
        Transform::set_parent(&child, Some(&parent));

        let before = child.borrow().world_matrix();
        parent.borrow_mut().set_position(Vec3::X);
        let after = child.borrow().world_matrix();
        assert_ne!(before, after);
        assert_eq!(after.w_axis.truncate(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_parent_change_notifies_and_self_parent_refused() {
        let a = Transform::new().into_shared();
        let b = Transform::new().into_shared();
        let hits = counter(&mut a.borrow_mut(), TransformEvent::Parent);

        assert!(Transform::set_parent(&a, Some(&b)));
        assert!(Transform::set_parent(&a, Some(&b)));
        assert_eq!(hits.get(), 1);
        assert!(!Transform::set_parent(&a, Some(&a)));

        drop(b);
        assert!(a.borrow().parent().is_none());
        assert_eq!(a.borrow().world_position(), Vec3::ZERO);
    }

    #[test]
    fn test_forward_follows_yaw() {
        let mut t = Transform::new();
        t.set_rotation_y(90.0);
        assert!((t.forward() - Vec3::X).length() < 1e-5);
    }
}

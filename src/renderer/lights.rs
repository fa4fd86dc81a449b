//! Shared light registry
//!
//! Every light component owns exactly one record here, keyed by its id. Records
//! are edited inside a [`LightBatch`]; closing the batch merges them into the
//! CPU copy of the light buffer, which the renderer uploads before the next
//! geometry pass.

use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use uuid::Uuid;
use wgpu::util::DeviceExt;

use super::gpu::GpuContext;

/// Maximum number of lights the shaders read
pub const MAX_LIGHTS: usize = 16;

/// Light kind as seen by the shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum LightType {
    #[default]
    Default = 0,
    Directional = 1,
    Point = 2,
    Spot = 3,
    Ambient = 4,
}

/// GPU layout of a single light
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    pub position: [f32; 4],
    /// Euler rotation in degrees for directional lights
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub attenuation: [f32; 3],
    pub strength: f32,
    pub range: f32,
    pub pad: f32,
    pub light_type: i32,
    pub enabled: i32,
}

impl Default for LightRecord {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0, 1.0],
            direction: [0.0, 0.0, 0.0, 1.0],
            color: [1.0; 4],
            attenuation: [0.0; 3],
            strength: 1.0,
            range: 0.0,
            pad: 0.0,
            light_type: LightType::Default as i32,
            enabled: 1,
        }
    }
}

/// The whole light buffer bound at group 2
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightStorage {
    pub ambient_color: [f32; 4],
    pub ambient_strength: f32,
    pub light_count: u32,
    pub _padding: [u32; 2],
    pub lights: [LightRecord; MAX_LIGHTS],
}

impl Default for LightStorage {
    fn default() -> Self {
        Self {
            ambient_color: [0.0, 0.0, 0.0, 1.0],
            ambient_strength: 0.0,
            light_count: 0,
            _padding: [0; 2],
            lights: [LightRecord::zeroed(); MAX_LIGHTS],
        }
    }
}

/// Handle components keep to push their records
pub type SharedLights = Rc<RefCell<LightGlobals>>;

struct GpuLights {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Registry of light records plus the buffer they are mirrored into.
///
/// Ambient lights do not get a record; each contributes to the single
/// ambient term, which is the sum of the live contributions.
pub struct LightGlobals {
    records: Vec<(Uuid, LightRecord)>,
    ambients: Vec<(Uuid, Vec3, f32)>,
    storage: LightStorage,
    dirty: bool,
    gpu: Option<GpuLights>,
}

impl LightGlobals {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            ambients: Vec::new(),
            storage: LightStorage::default(),
            dirty: true,
            gpu: None,
        }
    }

    #[must_use]
    pub fn shared() -> SharedLights {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Open a batch of edits. Dropping the batch ends it.
    pub fn begin(&mut self) -> LightBatch<'_> {
        LightBatch { globals: self }
    }

    fn end(&mut self) {
        if self.records.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights registered, only the first {MAX_LIGHTS} are uploaded",
                self.records.len()
            );
        }
        let count = self.records.len().min(MAX_LIGHTS);
        self.storage.lights = [LightRecord::zeroed(); MAX_LIGHTS];
        for (slot, (_, record)) in self.storage.lights.iter_mut().zip(&self.records) {
            *slot = *record;
        }
        self.storage.light_count = count as u32;

        let (color, strength) = self.merged_ambient();
        self.storage.ambient_color = Vec4::from((color, 1.0)).to_array();
        self.storage.ambient_strength = strength;
        self.dirty = true;
    }

    /// Strength adds up; colour is the strength-weighted mean
    fn merged_ambient(&self) -> (Vec3, f32) {
        match self.ambients.as_slice() {
            [] => (Vec3::ZERO, 0.0),
            [(_, color, strength)] => (*color, *strength),
            many => {
                let strength: f32 = many.iter().map(|(_, _, s)| s).sum();
                let color = if strength > 0.0 {
                    many.iter().map(|(_, c, s)| *c * *s).sum::<Vec3>() / strength
                } else {
                    many[many.len() - 1].1
                };
                (color, strength)
            }
        }
    }

    #[must_use]
    pub fn record(&self, id: Uuid) -> Option<&LightRecord> {
        self.records
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, record)| record)
    }

    /// Records in registration order
    pub fn records(&self) -> impl Iterator<Item = (Uuid, &LightRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// CPU copy of the buffer as of the last closed batch
    #[must_use]
    pub const fn storage(&self) -> &LightStorage {
        &self.storage
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Allocate the uniform buffer and bind group
    pub fn create_gpu(&mut self, gpu: &GpuContext) {
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("light_buffer"),
                contents: bytemuck::bytes_of(&self.storage),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("light_bind_group"),
            layout: &gpu.layouts.lights,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.gpu = Some(GpuLights { buffer, bind_group });
        self.dirty = false;
    }

    pub fn release_gpu(&mut self) {
        self.gpu = None;
        self.dirty = true;
    }

    /// Write the buffer if a batch closed since the last upload.
    ///
    /// Returns whether anything was written.
    pub fn upload(&mut self, queue: &wgpu::Queue) -> bool {
        match &self.gpu {
            Some(gpu) if self.dirty => {
                queue.write_buffer(&gpu.buffer, 0, bytemuck::bytes_of(&self.storage));
                self.dirty = false;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.bind_group)
    }

    /// Number of live ambient contributions
    #[must_use]
    pub fn ambient_count(&self) -> usize {
        self.ambients.len()
    }

    /// Forget every record and the ambient term
    pub fn clear(&mut self) {
        self.records.clear();
        self.ambients.clear();
        self.end();
    }
}

impl Default for LightGlobals {
    fn default() -> Self {
        Self::new()
    }
}

/// An open set of edits to [`LightGlobals`].
pub struct LightBatch<'a> {
    globals: &'a mut LightGlobals,
}

impl LightBatch<'_> {
    /// Insert or replace the record owned by `id`
    pub fn set_new_light_structure(&mut self, record: LightRecord, id: Uuid) {
        match self.globals.records.iter_mut().find(|(key, _)| *key == id) {
            Some((_, existing)) => *existing = record,
            None => self.globals.records.push((id, record)),
        }
    }

    /// Drop the record or ambient contribution owned by `id`
    pub fn remove_light(&mut self, id: Uuid) -> bool {
        let before = self.globals.records.len() + self.globals.ambients.len();
        self.globals.records.retain(|(key, _)| *key != id);
        self.globals.ambients.retain(|(key, _, _)| *key != id);
        before != self.globals.records.len() + self.globals.ambients.len()
    }

    /// Insert or replace the ambient contribution owned by `id`
    pub fn set_ambient(&mut self, id: Uuid, color: Vec3, strength: f32) {
        let ambients = &mut self.globals.ambients;
        match ambients.iter_mut().find(|(key, _, _)| *key == id) {
            Some(entry) => *entry = (id, color, strength),
            None => ambients.push((id, color, strength)),
        }
    }
}

impl Drop for LightBatch<'_> {
    fn drop(&mut self) {
        self.globals.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(color: [f32; 4]) -> LightRecord {
        LightRecord {
            color,
            light_type: LightType::Point as i32,
            ..LightRecord::default()
        }
    }

    #[test]
    fn test_storage_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<LightRecord>(), 80);
        assert_eq!(std::mem::size_of::<LightStorage>(), 32 + 80 * MAX_LIGHTS);
    }

    #[test]
    fn test_batch_merges_on_drop() {
        let mut lights = LightGlobals::new();
        let id = Uuid::new_v4();
        {
            let mut batch = lights.begin();
            batch.set_new_light_structure(point([1.0, 0.0, 0.0, 1.0]), id);
        }
        assert_eq!(lights.len(), 1);
        assert_eq!(lights.storage().light_count, 1);
        assert_eq!(lights.storage().lights[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert!(lights.is_dirty());
    }

    #[test]
    fn test_updating_one_record_leaves_other_alone() {
        let mut lights = LightGlobals::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        {
            let mut batch = lights.begin();
            batch.set_new_light_structure(point([1.0, 1.0, 1.0, 1.0]), a);
            batch.set_new_light_structure(point([0.5, 0.5, 0.5, 1.0]), b);
        }
        lights
            .begin()
            .set_new_light_structure(point([0.0, 0.0, 1.0, 1.0]), a);

        assert_eq!(lights.len(), 2);
        assert_eq!(lights.record(a).unwrap().color, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(lights.record(b).unwrap().color, [0.5, 0.5, 0.5, 1.0]);
        // order of registration is kept in the buffer
        assert_eq!(lights.storage().lights[0].color, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_remove_compacts_buffer() {
        let mut lights = LightGlobals::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        {
            let mut batch = lights.begin();
            batch.set_new_light_structure(point([1.0, 0.0, 0.0, 1.0]), a);
            batch.set_new_light_structure(point([0.0, 1.0, 0.0, 1.0]), b);
        }
        assert!(lights.begin().remove_light(a));
        assert!(!lights.begin().remove_light(a));
        assert_eq!(lights.storage().light_count, 1);
        assert_eq!(lights.storage().lights[0].color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(lights.storage().lights[1], LightRecord::zeroed());
    }

    #[test]
    fn test_overflow_is_clamped() {
        let mut lights = LightGlobals::new();
        {
            let mut batch = lights.begin();
            for _ in 0..MAX_LIGHTS + 3 {
                batch.set_new_light_structure(LightRecord::default(), Uuid::new_v4());
            }
        }
        assert_eq!(lights.len(), MAX_LIGHTS + 3);
        assert_eq!(lights.storage().light_count as usize, MAX_LIGHTS);
    }

    #[test]
    fn test_ambient_and_clear() {
        let mut lights = LightGlobals::new();
        lights
            .begin()
            .set_ambient(Uuid::new_v4(), Vec3::new(0.2, 0.3, 0.4), 0.5);
        assert_eq!(lights.storage().ambient_color, [0.2, 0.3, 0.4, 1.0]);
        assert_eq!(lights.storage().ambient_strength, 0.5);

        lights
            .begin()
            .set_new_light_structure(LightRecord::default(), Uuid::new_v4());
        lights.clear();
        assert!(lights.is_empty());
        assert_eq!(lights.ambient_count(), 0);
        assert_eq!(lights.storage().ambient_strength, 0.0);
    }

    #[test]
    fn test_ambient_contributions_are_kept_per_light() {
        let mut lights = LightGlobals::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        {
            let mut batch = lights.begin();
            batch.set_ambient(a, Vec3::new(1.0, 0.0, 0.0), 0.5);
            batch.set_ambient(b, Vec3::new(0.0, 0.0, 1.0), 0.5);
        }
        assert_eq!(lights.storage().ambient_strength, 1.0);
        assert_eq!(lights.storage().ambient_color, [0.5, 0.0, 0.5, 1.0]);

        assert!(lights.begin().remove_light(b));
        assert_eq!(lights.ambient_count(), 1);
        assert_eq!(lights.storage().ambient_strength, 0.5);
        assert_eq!(lights.storage().ambient_color, [1.0, 0.0, 0.0, 1.0]);
    }
}

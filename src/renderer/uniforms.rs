//! Per-object shader constants

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use wgpu::util::DeviceExt;

use super::gpu::GpuContext;

/// Values that are the same for every draw within one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConstants {
    pub view: Mat4,
    pub projection: Mat4,
    /// Orthographic projection for screen-space drawables
    pub ortho: Mat4,
    pub camera_position: Vec3,
    pub camera_rotation: Vec3,
    pub resolution: Vec2,
    pub time: f32,
    pub delta_time: f32,
}

impl Default for FrameConstants {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            ortho: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            camera_rotation: Vec3::ZERO,
            resolution: Vec2::ONE,
            time: 0.0,
            delta_time: 0.0,
        }
    }
}

/// Uniform block bound at group 0 for every draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniform {
    pub world: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub color: [f32; 4],
    /// Atlas frame in `xy`, tile size in `zw` (pixels, zero for the whole texture)
    pub tile: [f32; 4],
    pub texture_size: [f32; 2],
    pub resolution: [f32; 2],
    pub time: f32,
    pub delta_time: f32,
    pub _padding: [f32; 2],
}

impl ObjectUniform {
    #[must_use]
    pub fn new(world: Mat4, frame: &FrameConstants) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            view: frame.view.to_cols_array_2d(),
            projection: frame.projection.to_cols_array_2d(),
            camera_position: frame.camera_position.extend(1.0).to_array(),
            color: Vec4::ONE.to_array(),
            tile: [0.0; 4],
            texture_size: [1.0, 1.0],
            resolution: frame.resolution.to_array(),
            time: frame.time,
            delta_time: frame.delta_time,
            _padding: [0.0; 2],
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color.to_array();
        self
    }

    #[must_use]
    pub fn with_tile(mut self, frame: Vec2, size: Vec2) -> Self {
        self.tile = [frame.x, frame.y, size.x, size.y];
        self
    }

    #[must_use]
    pub fn with_texture_size(mut self, size: Vec2) -> Self {
        self.texture_size = size.to_array();
        self
    }
}

/// A drawable's own uniform buffer and the bind group pointing at it.
#[derive(Debug)]
pub struct ObjectBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ObjectBinding {
    pub fn new(gpu: &GpuContext, label: &str) -> Self {
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&ObjectUniform::new(
                    Mat4::IDENTITY,
                    &FrameConstants::default(),
                )),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &gpu.layouts.object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &ObjectUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniform));
    }

    #[must_use]
    pub const fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<ObjectUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 272);
    }

    #[test]
    fn test_object_uniform_takes_frame_values() {
        let frame = FrameConstants {
            camera_position: Vec3::new(1.0, 2.0, 3.0),
            resolution: Vec2::new(800.0, 600.0),
            time: 4.0,
            delta_time: 0.5,
            ..FrameConstants::default()
        };
        let uniform = ObjectUniform::new(Mat4::from_translation(Vec3::X), &frame)
            .with_color(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(uniform.camera_position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniform.resolution, [800.0, 600.0]);
        assert_eq!(uniform.world[3], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(uniform.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(uniform.time, 4.0);
    }
}

//! Immediate-mode debug lines
//!
//! Lines are queued on the CPU during a frame, uploaded in one vertex buffer
//! and drawn at the end of the scene pass with the built-in line shader. The
//! queue empties after every frame.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use super::context::FillMode;
use super::gpu::GpuContext;
use super::uniforms::{FrameConstants, ObjectBinding, ObjectUniform};
use crate::assets::{AssetHandle, Shader};

/// Segments per circle of a wire sphere
pub const SPHERE_SEGMENTS: usize = 24;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl LineVertex {
    #[must_use]
    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Device side of the queue, rebuilt after the renderer is recreated
struct LineBuffers {
    vertices: wgpu::Buffer,
    capacity: usize,
    binding: ObjectBinding,
}

/// Line segments queued for the current frame
#[derive(Default)]
pub struct DebugLines {
    vertices: Vec<LineVertex>,
    shader: Option<AssetHandle<Shader>>,
    buffers: Option<LineBuffers>,
    /// Vertices uploaded for the pending draw
    uploaded: u32,
}

impl DebugLines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, from: Vec3, to: Vec3, color: Vec4) {
        self.vertices.push(LineVertex::new(from, color));
        self.vertices.push(LineVertex::new(to, color));
    }

    /// Circle of `radius` around `center` in the plane spanned by `u` and `v`
    pub fn circle(&mut self, center: Vec3, u: Vec3, v: Vec3, radius: f32, color: Vec4) {
        let point = |i: usize| {
            let angle = TAU * i as f32 / SPHERE_SEGMENTS as f32;
            center + (u * angle.cos() + v * angle.sin()) * radius
        };
        for i in 0..SPHERE_SEGMENTS {
            self.line(point(i), point(i + 1), color);
        }
    }

    /// Wire sphere drawn as three axis-aligned circles
    pub fn sphere(&mut self, center: Vec3, radius: f32, color: Vec4) {
        self.circle(center, Vec3::X, Vec3::Y, radius, color);
        self.circle(center, Vec3::X, Vec3::Z, radius, color);
        self.circle(center, Vec3::Y, Vec3::Z, radius, color);
    }

    /// Line from `origin` along `direction` with a small head at the tip
    pub fn arrow(&mut self, origin: Vec3, direction: Vec3, length: f32, color: Vec4) {
        let Some(direction) = direction.try_normalize() else {
            return;
        };
        let tip = origin + direction * length;
        self.line(origin, tip, color);
        let side = direction.any_orthonormal_vector() * length * 0.1;
        let back = tip - direction * length * 0.2;
        self.line(tip, back + side, color);
        self.line(tip, back - side, color);
    }

    #[must_use]
    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    /// Number of queued segments
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len() / 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.uploaded = 0;
    }

    pub fn set_shader(&mut self, shader: AssetHandle<Shader>) {
        self.shader = Some(shader);
    }

    #[must_use]
    pub fn has_shader(&self) -> bool {
        self.shader.is_some()
    }

    /// Forget the shader and every buffer that belongs to the current device
    pub fn release_gpu(&mut self) {
        self.shader = None;
        self.buffers = None;
        self.uploaded = 0;
    }

    /// Copy the queue to the device. Returns the number of segments to draw.
    pub fn upload(&mut self, gpu: &GpuContext, frame: &FrameConstants) -> u32 {
        self.uploaded = 0;
        if self.vertices.is_empty() || self.shader.is_none() {
            return 0;
        }
        let needed = self.vertices.len();
        if self.buffers.as_ref().is_none_or(|buffers| buffers.capacity < needed) {
            let capacity = needed.next_power_of_two().max(64);
            self.buffers = Some(LineBuffers {
                vertices: gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("debug_lines"),
                    size: (capacity * std::mem::size_of::<LineVertex>()) as wgpu::BufferAddress,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                capacity,
                binding: match self.buffers.take() {
                    Some(old) => old.binding,
                    None => ObjectBinding::new(gpu, "debug_lines"),
                },
            });
        }
        let Some(buffers) = &self.buffers else {
            return 0;
        };
        gpu.queue
            .write_buffer(&buffers.vertices, 0, bytemuck::cast_slice(&self.vertices));
        buffers
            .binding
            .write(&gpu.queue, &ObjectUniform::new(Mat4::IDENTITY, frame));
        self.uploaded = needed as u32;
        self.uploaded / 2
    }

    /// Draw what the last [`upload`](Self::upload) sent
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, depth: bool) {
        let (Some(shader), Some(buffers)) = (&self.shader, &self.buffers) else {
            return;
        };
        if self.uploaded == 0 {
            return;
        }
        pass.set_pipeline(shader.pipeline(depth, FillMode::Solid));
        pass.set_bind_group(0, buffers.binding.bind_group(), &[]);
        pass.set_vertex_buffer(0, buffers.vertices.slice(..));
        pass.draw(0..self.uploaded, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<LineVertex>(), 28);
        assert_eq!(LineVertex::layout().array_stride, 28);
    }

    #[test]
    fn test_sphere_is_three_closed_circles() {
        let mut lines = DebugLines::new();
        let center = Vec3::new(1.0, 2.0, 3.0);
        lines.sphere(center, 2.0, Vec4::ONE);
        assert_eq!(lines.len(), 3 * SPHERE_SEGMENTS);

        for circle in lines.vertices().chunks(2 * SPHERE_SEGMENTS) {
            let first = Vec3::from(circle.first().unwrap().position);
            let last = Vec3::from(circle.last().unwrap().position);
            assert!(first.distance(last) < 1e-4);
        }
        for vertex in lines.vertices() {
            let distance = Vec3::from(vertex.position).distance(center);
            assert!((distance - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_arrow_ignores_zero_direction() {
        let mut lines = DebugLines::new();
        lines.arrow(Vec3::ZERO, Vec3::ZERO, 1.0, Vec4::ONE);
        assert!(lines.is_empty());

        lines.arrow(Vec3::ZERO, Vec3::Z * 5.0, 2.0, Vec4::ONE);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.vertices()[1].position, [0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_clear_empties_the_queue() {
        let mut lines = DebugLines::new();
        lines.line(Vec3::ZERO, Vec3::ONE, Vec4::ONE);
        lines.clear();
        assert!(lines.is_empty());
        assert!(!lines.has_shader());
    }
}

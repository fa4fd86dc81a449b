//! Device handles shared by everything that allocates GPU memory

use std::num::NonZeroU64;

use super::lights::LightStorage;
use super::uniforms::ObjectUniform;

/// Bind group layouts every engine pipeline is built against.
///
/// Group 0 holds per-object constants, group 1 a texture and its sampler and
/// group 2 the shared light buffer.
#[derive(Debug)]
pub struct BindLayouts {
    pub object: wgpu::BindGroupLayout,
    pub texture: wgpu::BindGroupLayout,
    pub lights: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bind_group_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                std::mem::size_of::<ObjectUniform>(),
            )],
        });

        let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let lights = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lights_bind_group_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                std::mem::size_of::<LightStorage>(),
            )],
        });

        Self {
            object,
            texture,
            lights,
        }
    }
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

/// The device, its queue and the fixed state pipelines are created with.
#[derive(Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of the scene colour target
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    /// Blend state used by every engine pipeline
    pub blend: wgpu::BlendState,
    pub layouts: BindLayouts,
}

impl GpuContext {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let layouts = BindLayouts::new(&device);
        Self {
            device,
            queue,
            color_format,
            depth_format: wgpu::TextureFormat::Depth32Float,
            blend: wgpu::BlendState::ALPHA_BLENDING,
            layouts,
        }
    }
}

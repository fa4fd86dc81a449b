//! Texture resources
//!
//! Images are decoded with the `image` crate, uploaded as RGBA8 sRGB and paired
//! with a sampler and a ready-made bind group for group 1.

use std::path::Path;

use image::GenericImageView;
use wgpu::util::DeviceExt;

use super::cache::{LoadContext, Resource, ResourceError};
use crate::renderer::GpuContext;

/// A GPU texture with its view, sampler and bind group
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
    pub size: wgpu::Extent3d,
}

impl Texture {
    /// Decode encoded image bytes (PNG, JPEG, ...) and upload them
    pub fn from_bytes(gpu: &GpuContext, bytes: &[u8], label: &str) -> Result<Self, ResourceError> {
        let img = image::load_from_memory(bytes).map_err(|e| ResourceError::Decode {
            kind: Self::KIND,
            name: label.to_owned(),
            reason: e.to_string(),
        })?;
        let rgba = img.to_rgba8();
        Ok(Self::from_rgba(gpu, &rgba, img.dimensions(), label))
    }

    /// Upload raw RGBA8 pixels
    #[must_use]
    pub fn from_rgba(gpu: &GpuContext, rgba: &[u8], dimensions: (u32, u32), label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &gpu.layouts.texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            texture,
            view,
            sampler,
            bind_group,
            size,
        }
    }

    /// 1x1 texture of a single colour, used as the cache default
    #[must_use]
    pub fn solid_color(gpu: &GpuContext, color: [u8; 4], label: &str) -> Self {
        Self::from_rgba(gpu, &color, (1, 1), label)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.size.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.size.height
    }
}

impl Resource for Texture {
    const KIND: &'static str = "Texture";
    const FOLDER: &'static str = "textures";
    const EXTENSIONS: &'static [&'static str] =
        &[".png", ".jpg", ".jpeg", ".bmp", ".tga", ".gif", ".tiff"];

    fn decode(ctx: &LoadContext<'_>, name: &str, path: &Path) -> Result<Self, ResourceError> {
        let gpu = ctx.require_gpu(Self::KIND, name)?;
        let bytes = std::fs::read(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(gpu, &bytes, name)
    }
}

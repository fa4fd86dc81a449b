//! WGSL shader resources
//!
//! A shader file provides `vs_main` and `fs_main`. Loading compiles the module
//! and builds its render pipelines against the engine's bind group layouts, so a
//! shader that loads is a shader that can draw.

use std::path::Path;

use super::cache::{LoadContext, Resource, ResourceError};
use super::mesh::Vertex;
use crate::renderer::{FillMode, GpuContext, LineVertex};

/// Fixed-function state a shader's pipelines are built with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterOptions {
    pub cull_mode: Option<wgpu::Face>,
    /// Always draw without depth testing, whatever the renderer's z-buffer state
    pub ignore_depth: bool,
    /// Line list over [`LineVertex`] input, bound to the object group only
    pub lines: bool,
}

#[derive(Debug)]
struct PipelinePair {
    depth: wgpu::RenderPipeline,
    flat: wgpu::RenderPipeline,
}

impl PipelinePair {
    fn get(&self, depth: bool) -> &wgpu::RenderPipeline {
        if depth { &self.depth } else { &self.flat }
    }
}

/// A compiled shader with one pipeline per depth mode and fill mode
#[derive(Debug)]
pub struct Shader {
    pub module: wgpu::ShaderModule,
    solid: PipelinePair,
    /// Only built when the device supports line polygon mode
    wireframe: Option<PipelinePair>,
    options: RasterOptions,
}

impl Shader {
    /// Compile WGSL source and build its pipelines.
    ///
    /// Validation errors raised by the device are returned as compile
    /// diagnostics; warnings are only logged.
    pub fn from_wgsl(
        gpu: &GpuContext,
        name: &str,
        source: &str,
        options: RasterOptions,
    ) -> Result<Self, ResourceError> {
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let layout = if options.lines {
            vec![&gpu.layouts.object]
        } else {
            vec![&gpu.layouts.object, &gpu.layouts.texture, &gpu.layouts.lights]
        };
        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(name),
                bind_group_layouts: &layout,
                push_constant_ranges: &[],
            });

        let pair = |polygon_mode| PipelinePair {
            depth: build_pipeline(gpu, name, &module, &layout, options, polygon_mode, true),
            flat: build_pipeline(gpu, name, &module, &layout, options, polygon_mode, false),
        };
        let solid = pair(wgpu::PolygonMode::Fill);
        let wireframe = (supports_wireframe(&gpu.device) && !options.lines)
            .then(|| pair(wgpu::PolygonMode::Line));

        let info = pollster::block_on(module.get_compilation_info());
        for message in &info.messages {
            match message.message_type {
                wgpu::CompilationMessageType::Error => {}
                _ => log::warn!("shader '{name}': {}", message.message),
            }
        }

        if let Some(error) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(ResourceError::Compile {
                name: name.to_owned(),
                diagnostics: error.to_string(),
            });
        }

        Ok(Self {
            module,
            solid,
            wireframe,
            options,
        })
    }

    /// Pipeline to draw with given the renderer's z-buffer state and fill mode.
    ///
    /// Wireframe falls back to solid when the device cannot draw lines.
    #[must_use]
    pub fn pipeline(&self, depth_enabled: bool, fill: FillMode) -> &wgpu::RenderPipeline {
        let depth = depth_enabled && !self.options.ignore_depth;
        match (fill, &self.wireframe) {
            (FillMode::Wireframe, Some(wireframe)) => wireframe.get(depth),
            _ => self.solid.get(depth),
        }
    }

    #[must_use]
    pub const fn has_wireframe(&self) -> bool {
        self.wireframe.is_some()
    }

    #[must_use]
    pub const fn options(&self) -> RasterOptions {
        self.options
    }
}

/// Whether `device` was created with line polygon mode
#[must_use]
pub fn supports_wireframe(device: &wgpu::Device) -> bool {
    device.features().contains(wgpu::Features::POLYGON_MODE_LINE)
}

#[allow(clippy::too_many_arguments)]
fn build_pipeline(
    gpu: &GpuContext,
    name: &str,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    options: RasterOptions,
    polygon_mode: wgpu::PolygonMode,
    depth: bool,
) -> wgpu::RenderPipeline {
    let (topology, buffers) = if options.lines {
        (wgpu::PrimitiveTopology::LineList, [LineVertex::layout()])
    } else {
        (wgpu::PrimitiveTopology::TriangleList, [Vertex::layout()])
    };
    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(name),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.color_format,
                    blend: Some(gpu.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: options.cull_mode,
                polygon_mode,
                unclipped_depth: false,
                conservative: false,
            },
            // the scene pass always carries a depth attachment
            depth_stencil: Some(wgpu::DepthStencilState {
                format: gpu.depth_format,
                depth_write_enabled: depth,
                depth_compare: if depth {
                    wgpu::CompareFunction::LessEqual
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
}

/// Shaders compiled into the engine and registered at startup
pub mod builtin {
    use super::RasterOptions;

    pub const SPRITE: &str = "Sprite";
    pub const MESH: &str = "Mesh";
    pub const SKYBOX: &str = "Skybox";
    /// Debug lines and gizmos
    pub const LINE: &str = "Line";

    /// Name, source and raster state of every built-in shader
    pub const ALL: [(&str, &str, RasterOptions); 4] = [
        (
            SPRITE,
            include_str!("../renderer/shaders/sprite.wgsl"),
            RasterOptions {
                cull_mode: None,
                ignore_depth: false,
                lines: false,
            },
        ),
        (
            MESH,
            include_str!("../renderer/shaders/mesh.wgsl"),
            RasterOptions {
                cull_mode: None,
                ignore_depth: false,
                lines: false,
            },
        ),
        (
            SKYBOX,
            include_str!("../renderer/shaders/skybox.wgsl"),
            RasterOptions {
                cull_mode: None,
                ignore_depth: true,
                lines: false,
            },
        ),
        (
            LINE,
            include_str!("../renderer/shaders/line.wgsl"),
            RasterOptions {
                cull_mode: None,
                ignore_depth: false,
                lines: true,
            },
        ),
    ];
}

impl Resource for Shader {
    const KIND: &'static str = "Shader";
    const FOLDER: &'static str = "shaders";
    const EXTENSIONS: &'static [&'static str] = &[".wgsl"];

    fn decode(ctx: &LoadContext<'_>, name: &str, path: &Path) -> Result<Self, ResourceError> {
        let gpu = ctx.require_gpu(Self::KIND, name)?;
        let source = std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_wgsl(gpu, name, &source, RasterOptions::default()).inspect_err(|e| {
            if let ResourceError::Compile { diagnostics, .. } = e {
                log::error!("{}:\n{diagnostics}", path.display());
            }
        })
    }
}

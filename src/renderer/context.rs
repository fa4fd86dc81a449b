//! Frame orchestration
//!
//! The renderer owns the device, the swapchain and the scene targets. A frame
//! clears, draws every enabled drawable in scene order, runs the overlay pass,
//! then either presents or copies the scene into the framebuffer texture the
//! editor shows.

use std::rc::Rc;
use std::sync::Arc;

use glam::UVec2;
use thiserror::Error;
use winit::window::Window;

use super::debug_lines::DebugLines;
use super::draw::DrawCall;
use super::gpu::GpuContext;
use super::lights::SharedLights;
use super::uniforms::FrameConstants;
use super::viewport::{ResizeOutcome, Viewport};
use crate::assets::{AssetHandle, Shader, supports_wireframe};
use crate::core::GameTime;
use crate::scene::SceneGraph;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("renderer has not been created")]
    NotReady,
}

/// Where the scene ends up each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Draw straight into the swapchain
    #[default]
    Present,
    /// Draw offscreen and expose the result through [`Renderer::framebuffer_view`]
    Capture,
}

/// How triangles are rasterised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    Solid,
    /// Edges only. Needs `Features::POLYGON_MODE_LINE`, otherwise draws solid.
    Wireframe,
}

impl FillMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Solid => Self::Wireframe,
            Self::Wireframe => Self::Solid,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RendererOptions {
    pub vsync: bool,
    pub mode: OutputMode,
    pub clear_color: wgpu::Color,
    pub depth: bool,
    pub fill_mode: FillMode,
    /// Let components queue their debug shapes each frame
    pub gizmos: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            vsync: true,
            mode: OutputMode::Present,
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            depth: true,
            fill_mode: FillMode::Solid,
            gizmos: false,
        }
    }
}

/// What happened during one [`Renderer::render`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub draw_calls: u32,
    pub debug_lines: u32,
    /// False when the scene viewport is collapsed or the surface was lost
    pub geometry_pass: bool,
    pub presented: bool,
    pub captured: bool,
}

/// A pass drawn on top of the scene, such as the editor overlay.
pub trait OverlayPass {
    /// Upload textures and buffers. Returned command buffers are submitted
    /// ahead of the frame's own.
    fn prepare(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target_size: UVec2,
    ) -> Vec<wgpu::CommandBuffer>;

    fn paint(&self, pass: &mut wgpu::RenderPass<'static>);
}

struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// Size dependent targets. Views are declared first so they drop first.
struct SceneTargets {
    depth_view: wgpu::TextureView,
    color_view: wgpu::TextureView,
    framebuffer_view: wgpu::TextureView,
    depth: wgpu::Texture,
    color: wgpu::Texture,
    framebuffer: wgpu::Texture,
}

impl SceneTargets {
    fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let target = |label: &str, format, usage| {
            gpu.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };

        let depth = target(
            "depth_target",
            gpu.depth_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let color = target(
            "scene_color",
            gpu.color_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let framebuffer = target(
            "framebuffer",
            gpu.color_format,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );

        let view = |texture: &wgpu::Texture| texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            depth_view: view(&depth),
            color_view: view(&color),
            framebuffer_view: view(&framebuffer),
            depth,
            color,
            framebuffer,
        }
    }

    fn extent(&self) -> wgpu::Extent3d {
        self.color.size()
    }
}

/// Everything owned while the renderer is ready, in release order
struct DeviceResources {
    targets: SceneTargets,
    surface: Option<SurfaceTarget>,
    gpu: GpuContext,
}

/// Owns the graphics device and sequences each frame.
///
/// Starts uninitialised; [`create`](Self::create) makes it ready and
/// [`destroy`](Self::destroy) returns it to the uninitialised state.
pub struct Renderer {
    options: RendererOptions,
    resources: Option<DeviceResources>,
    window_viewport: Viewport,
    scene_viewport: Viewport,
    generation: u64,
    debug_lines: DebugLines,
}

impl Renderer {
    #[must_use]
    pub fn new(options: RendererOptions) -> Self {
        Self {
            options,
            resources: None,
            window_viewport: Viewport::default(),
            scene_viewport: Viewport::default(),
            generation: 0,
            debug_lines: DebugLines::new(),
        }
    }

    /// Allocate the device, the swapchain for `window` and the scene targets.
    ///
    /// Without a window the renderer runs headless and always captures.
    pub fn create(&mut self, window: Option<Arc<Window>>, size: UVec2) -> Result<(), RenderError> {
        if self.resources.is_some() {
            log::warn!("renderer created twice, releasing the previous device");
            self.destroy();
        }
        if window.is_none() && self.options.mode == OutputMode::Present {
            log::warn!("no window to present to, switching to capture mode");
            self.options.mode = OutputMode::Capture;
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = window.map(|window| instance.create_surface(window)).transpose()?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface.as_ref(),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("frameforge_device"),
                required_features: adapter.features() & wgpu::Features::POLYGON_MODE_LINE,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        self.window_viewport.resize(size.x, size.y);
        self.scene_viewport.resize(size.x, size.y);
        let (width, height) = (self.window_viewport.width(), self.window_viewport.height());

        let surface = surface.map(|surface| {
            let caps = surface.get_capabilities(&adapter);
            let format = caps
                .formats
                .iter()
                .find(|f| f.is_srgb())
                .copied()
                .unwrap_or(caps.formats[0]);
            let config = wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width,
                height,
                present_mode: if self.options.vsync {
                    wgpu::PresentMode::AutoVsync
                } else {
                    wgpu::PresentMode::AutoNoVsync
                },
                alpha_mode: caps.alpha_modes[0],
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            };
            surface.configure(&device, &config);
            SurfaceTarget { surface, config }
        });

        let color_format = surface
            .as_ref()
            .map_or(wgpu::TextureFormat::Rgba8UnormSrgb, |target| target.config.format);
        let gpu = GpuContext::new(device, queue, color_format);
        let targets = SceneTargets::new(
            &gpu,
            self.scene_viewport.width(),
            self.scene_viewport.height(),
        );

        self.resources = Some(DeviceResources {
            targets,
            surface,
            gpu,
        });
        self.generation += 1;
        log::info!("Renderer ready ({width}x{height}, {:?})", self.options.mode);
        Ok(())
    }

    /// Release every device object and return to the uninitialised state
    pub fn destroy(&mut self) {
        if let Some(resources) = self.resources.take() {
            let DeviceResources {
                targets,
                surface,
                gpu,
            } = resources;
            drop(targets);
            drop(surface);
            self.debug_lines.release_gpu();
            drop(gpu);
            log::info!("Renderer destroyed");
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    #[must_use]
    pub fn gpu(&self) -> Option<&GpuContext> {
        self.resources.as_ref().map(|resources| &resources.gpu)
    }

    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.options.mode
    }

    #[must_use]
    pub const fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.options.clear_color = color;
    }

    pub fn set_depth_enabled(&mut self, enabled: bool) {
        self.options.depth = enabled;
    }

    #[must_use]
    pub const fn fill_mode(&self) -> FillMode {
        self.options.fill_mode
    }

    /// Switch between solid and wireframe rasterisation.
    ///
    /// Without line polygon mode on the device the request is kept but
    /// shaders keep drawing solid.
    pub fn switch_fill_mode(&mut self, mode: FillMode) {
        if mode == FillMode::Wireframe && self.gpu().is_some() && !self.supports_wireframe() {
            log::warn!("wireframe is not supported by this device, drawing solid");
        }
        self.options.fill_mode = mode;
        log::debug!("Fill mode: {mode:?}");
    }

    /// Whether the device can rasterise lines. False before `create`.
    #[must_use]
    pub fn supports_wireframe(&self) -> bool {
        self.gpu().is_some_and(|gpu| supports_wireframe(&gpu.device))
    }

    #[must_use]
    pub const fn gizmos_enabled(&self) -> bool {
        self.options.gizmos
    }

    pub fn set_gizmos_enabled(&mut self, enabled: bool) {
        self.options.gizmos = enabled;
    }

    /// Shader the debug lines are drawn with. Released with the device.
    pub fn set_line_shader(&mut self, shader: AssetHandle<Shader>) {
        self.debug_lines.set_shader(shader);
    }

    /// Queue for lines drawn on top of the next frame
    pub fn debug_lines_mut(&mut self) -> &mut DebugLines {
        &mut self.debug_lines
    }

    #[must_use]
    pub const fn debug_lines(&self) -> &DebugLines {
        &self.debug_lines
    }

    #[must_use]
    pub const fn window_size(&self) -> UVec2 {
        self.window_viewport.size()
    }

    /// Size the scene is rendered at
    #[must_use]
    pub const fn scene_size(&self) -> UVec2 {
        self.scene_viewport.size()
    }

    #[must_use]
    pub const fn is_scene_collapsed(&self) -> bool {
        self.scene_viewport.is_collapsed()
    }

    /// Reconfigure the swapchain for a new window size.
    ///
    /// When presenting, the scene targets follow the window.
    pub fn resize(&mut self, width: u32, height: u32) -> ResizeOutcome {
        let outcome = self.window_viewport.resize(width, height);
        if let ResizeOutcome::Resized { width, height } = outcome
            && let Some(resources) = &mut self.resources
            && let Some(target) = &mut resources.surface
        {
            target.config.width = width;
            target.config.height = height;
            target.surface.configure(&resources.gpu.device, &target.config);
            log::debug!("Resized to {width}x{height}");
        }
        if self.options.mode == OutputMode::Present {
            self.reset(width, height);
        }
        outcome
    }

    /// Rebuild the size dependent scene targets while keeping the device.
    ///
    /// A zero sized request keeps the current targets and pauses the geometry
    /// pass until a usable size arrives.
    pub fn reset(&mut self, width: u32, height: u32) -> ResizeOutcome {
        let outcome = self.scene_viewport.resize(width, height);
        if let ResizeOutcome::Resized { width, height } = outcome
            && let Some(resources) = &mut self.resources
        {
            resources.targets = SceneTargets::new(&resources.gpu, width, height);
            self.generation += 1;
            log::debug!("Scene targets rebuilt at {width}x{height}");
        }
        outcome
    }

    /// The captured scene, for display inside the overlay
    #[must_use]
    pub fn framebuffer_view(&self) -> Option<&wgpu::TextureView> {
        self.resources
            .as_ref()
            .map(|resources| &resources.targets.framebuffer_view)
    }

    /// Bumped whenever the framebuffer texture is replaced
    #[must_use]
    pub const fn targets_generation(&self) -> u64 {
        self.generation
    }

    /// Render one frame of `scene`.
    pub fn render(
        &mut self,
        scene: &mut SceneGraph,
        lights: &SharedLights,
        time: &GameTime,
        overlay: Option<&mut dyn OverlayPass>,
    ) -> Result<FrameReport, RenderError> {
        let Some(resources) = self.resources.as_ref() else {
            self.debug_lines.clear();
            return Err(RenderError::NotReady);
        };
        let options = self.options;
        let gpu = &resources.gpu;
        let mut report = FrameReport::default();

        let output = match &resources.surface {
            Some(target) => match target.surface.get_current_texture() {
                Ok(output) => Some(output),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    target.surface.configure(&gpu.device, &target.config);
                    self.debug_lines.clear();
                    return Ok(report);
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("Timed out acquiring the next frame");
                    self.debug_lines.clear();
                    return Ok(report);
                }
                Err(e) => {
                    self.debug_lines.clear();
                    return Err(e.into());
                }
            },
            None => None,
        };
        let surface_view = output
            .as_ref()
            .map(|output| output.texture.create_view(&wgpu::TextureViewDescriptor::default()));

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut globals = lights.borrow_mut();
            if globals.bind_group().is_none() {
                globals.create_gpu(gpu);
            } else {
                globals.upload(&gpu.queue);
            }
        }

        let present_scene = options.mode == OutputMode::Present && surface_view.is_some();

        if !self.scene_viewport.is_collapsed() {
            let frame = frame_constants(scene, self.scene_viewport.size(), time);
            for entity in scene.iter_mut() {
                let shared = Rc::clone(entity.transform());
                let transform = shared.borrow();
                for drawable in entity.drawables_mut() {
                    drawable.prepare(gpu, &frame, &transform);
                }
            }
            if options.gizmos {
                for entity in scene.iter() {
                    entity.draw_gizmos(&mut self.debug_lines);
                }
            }
            report.debug_lines = self.debug_lines.upload(gpu, &frame);

            let target = match &surface_view {
                Some(view) if present_scene => view,
                _ => &resources.targets.color_view,
            };
            let globals = lights.borrow();
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("scene_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(options.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &resources.targets.depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                if let Some(bind_group) = globals.bind_group() {
                    pass.set_bind_group(2, bind_group, &[]);
                }
                for entity in scene.iter() {
                    for call in entity.drawables().filter_map(|drawable| drawable.draw_call()) {
                        record(&mut pass, &call, options);
                        report.draw_calls += 1;
                    }
                }
                self.debug_lines.draw(&mut pass, options.depth);
            }
            report.geometry_pass = true;

            if options.mode == OutputMode::Capture {
                encoder.copy_texture_to_texture(
                    resources.targets.color.as_image_copy(),
                    resources.targets.framebuffer.as_image_copy(),
                    resources.targets.extent(),
                );
                report.captured = true;
            }
        }

        let mut command_buffers = Vec::new();
        if let (Some(overlay), Some(view)) = (overlay, &surface_view) {
            command_buffers = overlay.prepare(gpu, &mut encoder, self.window_viewport.size());
            let load = if present_scene && report.geometry_pass {
                wgpu::LoadOp::Load
            } else {
                wgpu::LoadOp::Clear(options.clear_color)
            };
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("overlay_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            overlay.paint(&mut pass);
        }

        gpu.queue
            .submit(command_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        self.debug_lines.clear();

        if let Some(output) = output {
            output.present();
            report.presented = true;
        }
        Ok(report)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn record(pass: &mut wgpu::RenderPass<'_>, call: &DrawCall<'_>, options: RendererOptions) {
    pass.set_pipeline(call.shader.pipeline(options.depth, options.fill_mode));
    pass.set_bind_group(0, call.binding.bind_group(), &[]);
    pass.set_bind_group(1, &call.texture.bind_group, &[]);
    call.geometry.draw(pass);
}

/// Per-frame constants seen from the scene's active camera
#[must_use]
pub fn frame_constants(scene: &SceneGraph, viewport: UVec2, time: &GameTime) -> FrameConstants {
    let mut frame = FrameConstants {
        resolution: viewport.as_vec2(),
        time: time.elapsed_seconds(),
        delta_time: time.delta_seconds(),
        ..FrameConstants::default()
    };
    if let Some((camera, transform)) = scene.active_camera() {
        let transform = transform.borrow();
        frame.view = camera.view();
        frame.projection = camera.projection();
        frame.ortho = camera.ortho();
        frame.camera_position = transform.world_position();
        frame.camera_rotation = transform.world_rotation();
    }
    frame
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glam::{Vec2, Vec3};

    use super::*;
    use crate::scene::components::{Camera, MAIN_CAMERA_NAME};
    use crate::scene::testing::Fixture;
    use crate::scene::Entity;

    #[test]
    fn test_render_before_create_is_refused() {
        let fx = Fixture::new();
        let mut renderer = Renderer::new(RendererOptions::default());
        let mut scene = SceneGraph::new();
        assert!(!renderer.is_ready());
        assert!(matches!(
            renderer.render(&mut scene, &fx.lights, &fx.time, None),
            Err(RenderError::NotReady)
        ));
    }

    #[test]
    fn test_zero_size_resize_keeps_previous_state() {
        let mut renderer = Renderer::new(RendererOptions::default());
        renderer.resize(800, 600);
        assert_eq!(renderer.resize(0, 600), ResizeOutcome::Collapsed);
        assert_eq!(renderer.window_size(), UVec2::new(800, 600));
        assert!(renderer.is_scene_collapsed());

        assert_eq!(
            renderer.resize(1024, 768),
            ResizeOutcome::Resized {
                width: 1024,
                height: 768
            }
        );
        assert!(!renderer.is_scene_collapsed());
        assert_eq!(renderer.scene_size(), UVec2::new(1024, 768));
    }

    #[test]
    fn test_capture_scene_size_is_independent_of_window() {
        let mut renderer = Renderer::new(RendererOptions {
            mode: OutputMode::Capture,
            ..RendererOptions::default()
        });
        renderer.resize(1280, 720);
        renderer.reset(640, 360);
        assert_eq!(renderer.window_size(), UVec2::new(1280, 720));
        assert_eq!(renderer.scene_size(), UVec2::new(640, 360));
        assert!(renderer.framebuffer_view().is_none());
    }

    #[test]
    fn test_frame_constants_follow_main_camera() {
        let mut fx = Fixture::new();
        fx.time.advance(Duration::from_millis(20));
        let mut scene = SceneGraph::new();
        scene
            .spawn(
                Entity::new(MAIN_CAMERA_NAME)
                    .with_position(Vec3::new(1.0, 2.0, -5.0))
                    .with_component(Camera::perspective()),
                &mut fx.ctx(),
            )
            .unwrap();

        let frame = frame_constants(&scene, UVec2::new(320, 240), &fx.time);
        let camera = scene
            .get_component_by_name::<Camera>(MAIN_CAMERA_NAME)
            .unwrap();
        assert_eq!(frame.camera_position, Vec3::new(1.0, 2.0, -5.0));
        assert_eq!(frame.view, camera.view());
        assert_eq!(frame.resolution, Vec2::new(320.0, 240.0));
        assert!((frame.delta_time - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_render_before_create_drops_queued_lines() {
        let fx = Fixture::new();
        let mut renderer = Renderer::new(RendererOptions::default());
        renderer
            .debug_lines_mut()
            .line(Vec3::ZERO, Vec3::ONE, glam::Vec4::ONE);
        let mut scene = SceneGraph::new();
        assert!(renderer.render(&mut scene, &fx.lights, &fx.time, None).is_err());
        assert!(renderer.debug_lines().is_empty());
    }

    #[test]
    fn test_fill_mode_switch_is_kept_without_device() {
        let mut renderer = Renderer::new(RendererOptions::default());
        assert_eq!(renderer.fill_mode(), FillMode::Solid);
        assert!(!renderer.supports_wireframe());

        renderer.switch_fill_mode(renderer.fill_mode().toggled());
        assert_eq!(renderer.fill_mode(), FillMode::Wireframe);
        renderer.switch_fill_mode(FillMode::Solid);
        assert_eq!(renderer.options().fill_mode, FillMode::Solid);
    }

    #[test]
    fn test_frame_constants_without_camera_use_identity() {
        let fx = Fixture::new();
        let scene = SceneGraph::new();
        let frame = frame_constants(&scene, UVec2::new(10, 10), &fx.time);
        assert_eq!(frame.view, glam::Mat4::IDENTITY);
    }
}

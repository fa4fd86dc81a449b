//! Core Engine struct and main loop

use std::sync::Arc;

use glam::UVec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::KeyCode,
    window::{Fullscreen, Window, WindowId},
};

use super::config::EngineConfig;
use super::debug::FrameStats;
use super::error::EngineError;
use super::logging;
use super::time::GameTime;
use crate::assets::{AssetHandle, Resource, ResourceCache, ResourceError, Shader, Texture, builtin};
use crate::input::Input;
use crate::renderer::{LightGlobals, OverlayPass, RenderError, Renderer, SharedLights};
use crate::scene::components::{Camera, MAIN_CAMERA_NAME};
use crate::scene::{ENGINE_ENTITY, Entity, EntityId, SceneContext, SceneError, SceneGraph};
use crate::ui::{
    CONSOLE_WINDOW, ConsoleWindow, DEBUG_WINDOW, DebugInfoWindow, Overlay, RENDER_WINDOW,
    RenderWindow,
};

/// Hooks an application implements to run inside the engine.
pub trait Application: 'static {
    /// Load what the application needs before the first frame. An error
    /// aborts startup.
    fn load_resources(&mut self, _ctx: &mut EngineContext) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called once after resources are loaded
    fn on_start(&mut self, _ctx: &mut EngineContext) {}

    /// Called every frame after the scene has been updated
    fn on_update(&mut self, _ctx: &mut EngineContext, _dt: f32) {}

    /// Called when the window is resized
    fn on_resize(&mut self, _ctx: &mut EngineContext, _width: u32, _height: u32) {}

    /// Called before the engine tears down
    fn on_close(&mut self, _ctx: &mut EngineContext) {}
}

/// Engine services, passed explicitly to the application
pub struct EngineContext {
    pub time: GameTime,
    pub input: Input,
    pub scene: SceneGraph,
    pub resources: ResourceCache,
    pub lights: SharedLights,
    pub overlay: Overlay,
    pub stats: FrameStats,
    pub renderer: Renderer,
    editor: bool,
    should_quit: bool,
}

impl EngineContext {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            time: GameTime::new(),
            input: Input::new(),
            scene: SceneGraph::new(),
            resources: ResourceCache::new(config.resource_roots.iter().cloned()),
            lights: LightGlobals::shared(),
            overlay: Overlay::new(),
            stats: FrameStats::new(),
            renderer: Renderer::new(config.renderer_options()),
            editor: config.editor,
            should_quit: false,
        }
    }

    /// The scene together with the context its hooks run with
    pub fn scene_parts(&mut self) -> (&mut SceneGraph, SceneContext<'_>) {
        let ctx = SceneContext {
            resources: &mut self.resources,
            lights: &self.lights,
            gpu: self.renderer.gpu(),
            input: &self.input,
            time: &self.time,
            viewport: self.renderer.scene_size(),
        };
        (&mut self.scene, ctx)
    }

    /// Add an entity to the scene and create its components
    pub fn spawn(&mut self, entity: Entity) -> Result<EntityId, SceneError> {
        let (scene, mut ctx) = self.scene_parts();
        scene.spawn(entity, &mut ctx)
    }

    pub fn destroy(&mut self, id: EntityId) -> bool {
        let (scene, mut ctx) = self.scene_parts();
        scene.destroy(id, &mut ctx)
    }

    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> bool {
        let (scene, mut ctx) = self.scene_parts();
        scene.set_enabled(id, enabled, &mut ctx)
    }

    /// Load a resource with the renderer's device
    pub fn load<T: Resource>(&mut self, name: &str) -> Result<AssetHandle<T>, ResourceError> {
        let (_, mut ctx) = self.scene_parts();
        ctx.load(name)
    }

    /// Ask the engine to shut down after this frame
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub const fn is_editor(&self) -> bool {
        self.editor
    }

    /// Bring the renderer up and register the engine's own resources and
    /// entities. `None` renders headless.
    pub fn initialize(&mut self, window: Option<Arc<Window>>, size: UVec2) -> Result<(), EngineError> {
        // cached assets, light buffers and scene bindings belong to the old device
        if self.renderer.is_ready() || !self.resources.is_empty() || !self.scene.is_empty() {
            log::warn!("initializing a live context, releasing the previous device first");
            self.teardown();
        }
        let attach_to = window.clone();
        self.renderer.create(window, size)?;
        self.load_engine_resources()?;
        if let Some(gpu) = self.renderer.gpu() {
            self.lights.borrow_mut().create_gpu(gpu);
            if let Some(window) = &attach_to {
                self.overlay.attach(window, gpu);
            }
        }
        self.register_windows();
        self.spawn_main_camera()?;
        Ok(())
    }

    fn load_engine_resources(&mut self) -> Result<(), EngineError> {
        let gpu = self.renderer.gpu().ok_or(RenderError::NotReady)?;
        self.resources
            .set_fallback(Texture::solid_color(gpu, [255, 255, 255, 255], "default_texture"));
        let mut line_shader = None;
        for (name, source, options) in builtin::ALL {
            let shader = Shader::from_wgsl(gpu, name, source, options)?;
            let handle = self.resources.add(name, shader);
            if name == builtin::LINE {
                line_shader = Some(handle);
            }
        }
        if let Some(shader) = line_shader {
            self.renderer.set_line_shader(shader);
        }
        log::info!("Engine resources loaded");
        Ok(())
    }

    fn register_windows(&mut self) {
        self.overlay.add_window(DEBUG_WINDOW, DebugInfoWindow, false);
        self.overlay.add_window(CONSOLE_WINDOW, ConsoleWindow::new(), false);
        if self.editor {
            self.overlay.add_window(RENDER_WINDOW, RenderWindow::new(), true);
        }
    }

    /// The camera views are rendered from unless the application adds its own
    pub fn spawn_main_camera(&mut self) -> Result<EntityId, SceneError> {
        self.spawn(
            Entity::new(MAIN_CAMERA_NAME)
                .with_tag(ENGINE_ENTITY)
                .with_component(Camera::orthographic()),
        )
    }

    /// Feed a window event to input. Presses the overlay used are dropped;
    /// releases always get through so nothing stays held.
    pub fn route_input(&mut self, event: &WindowEvent, overlay_consumed: bool) -> bool {
        if overlay_consumed && !Input::is_release(event) {
            return false;
        }
        self.input.handle_window_event(event)
    }

    /// Apply the engine hotkeys. Returns whether fullscreen should toggle.
    pub fn apply_engine_keys(&mut self) -> bool {
        if self.input.is_key_just_pressed(KeyCode::Escape) {
            self.quit();
        }
        if self.input.is_key_just_pressed(KeyCode::Digit0) {
            self.overlay.toggle_window(DEBUG_WINDOW);
        }
        if self.input.is_key_just_pressed(KeyCode::Backquote) {
            self.overlay.toggle_window(CONSOLE_WINDOW);
        }
        if self.editor {
            if self.input.is_key_just_pressed(KeyCode::F1) {
                self.overlay.toggle_all();
            }
            if self.input.is_key_just_pressed(KeyCode::F2) {
                let mode = self.renderer.fill_mode().toggled();
                self.renderer.switch_fill_mode(mode);
            }
            if self.input.is_key_just_pressed(KeyCode::F3) {
                let gizmos = !self.renderer.gizmos_enabled();
                self.renderer.set_gizmos_enabled(gizmos);
            }
            if self.input.is_key_just_pressed(KeyCode::F9) {
                self.overlay.toggle_demo();
            }
        }
        self.input.is_key_just_pressed(KeyCode::F11)
    }

    /// Run component updates for one frame
    pub fn update_scene(&mut self, dt: f32) {
        let (scene, mut ctx) = self.scene_parts();
        scene.update(&mut ctx, dt);
    }

    /// Build the overlay and draw one frame
    pub fn render_frame(&mut self, window: Option<&Window>) -> Result<(), RenderError> {
        if let Some(window) = window
            && self.overlay.is_attached()
        {
            if let Some(gpu) = self.renderer.gpu() {
                self.overlay.sync_framebuffer(
                    gpu,
                    self.renderer.framebuffer_view(),
                    self.renderer.targets_generation(),
                );
            }
            let requests = self
                .overlay
                .build_frame(window, &self.stats, self.renderer.scene_size());
            if let Some(size) = requests.scene_size {
                self.renderer.reset(size.x, size.y);
            }
        }

        let overlay: Option<&mut dyn OverlayPass> = if self.overlay.is_attached() {
            Some(&mut self.overlay)
        } else {
            None
        };
        let report = self
            .renderer
            .render(&mut self.scene, &self.lights, &self.time, overlay)?;
        self.stats.record_scene(
            report.draw_calls,
            self.scene.len(),
            self.lights.borrow().len(),
        );
        Ok(())
    }

    /// Release everything in dependency order: scene, resources, lights,
    /// overlay, then the device.
    pub fn teardown(&mut self) {
        let (scene, mut ctx) = self.scene_parts();
        scene.clear(&mut ctx);
        self.resources.clear_all();
        {
            let mut lights = self.lights.borrow_mut();
            lights.clear();
            lights.release_gpu();
        }
        self.overlay.detach();
        self.renderer.destroy();
        log::info!("Engine torn down");
    }
}

/// Main engine struct
pub struct Engine<A: Application> {
    config: EngineConfig,
    app: A,
    context: EngineContext,
    window: Option<Arc<Window>>,
    started: bool,
    error: Option<EngineError>,
}

impl<A: Application> Engine<A> {
    /// Create a new engine running `app`
    pub fn new(config: EngineConfig, app: A) -> Self {
        let context = EngineContext::new(&config);
        Self {
            config,
            app,
            context,
            window: None,
            started: false,
            error: None,
        }
    }

    /// Run until the window closes or the application quits
    pub fn run(mut self) -> Result<(), EngineError> {
        logging::init(&self.config.log_level, self.config.log_file.as_deref());
        log::info!("Starting engine: {}", self.config.title);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), EngineError> {
        let attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();

        self.context
            .initialize(Some(Arc::clone(&window)), UVec2::new(size.width, size.height))?;
        self.window = Some(window);

        self.app.load_resources(&mut self.context)?;
        self.app.on_start(&mut self.context);
        self.started = true;
        self.context.time.reset_delta();
        log::info!("Engine initialized successfully");
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: EngineError) {
        log::error!("{error}");
        self.error = Some(error);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            self.app.on_close(&mut self.context);
            self.started = false;
        }
        self.context.teardown();
        self.window = None;
        event_loop.exit();
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let ctx = &mut self.context;
        ctx.time.tick();
        ctx.stats.record_frame(ctx.time.delta());

        if ctx.apply_engine_keys()
            && let Some(window) = &self.window
        {
            let fullscreen = match window.fullscreen() {
                Some(_) => None,
                None => Some(Fullscreen::Borderless(None)),
            };
            window.set_fullscreen(fullscreen);
        }
        if ctx.should_quit() {
            self.shutdown(event_loop);
            return;
        }

        let dt = ctx.time.delta_seconds();
        ctx.update_scene(dt);
        self.app.on_update(&mut self.context, dt);
        if self.context.should_quit() {
            self.shutdown(event_loop);
            return;
        }

        if let Err(error) = self.context.render_frame(self.window.as_deref()) {
            self.fail(event_loop, error.into());
            return;
        }
        self.context.input.end_frame();
    }
}

impl<A: Application> ApplicationHandler for Engine<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.started {
            return;
        }
        if let Err(error) = self.start(event_loop) {
            self.fail(event_loop, error);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if !self.started {
            return;
        }
        let consumed = self
            .window
            .as_ref()
            .is_some_and(|window| self.context.overlay.handle_window_event(window, &event));
        if consumed {
            self.context.route_input(&event, true);
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                self.context.renderer.resize(new_size.width, new_size.height);
                if new_size.width > 0 && new_size.height > 0 {
                    self.app
                        .on_resize(&mut self.context, new_size.width, new_size.height);
                }
            }

            WindowEvent::RedrawRequested => {
                self.tick(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            other => {
                self.context.route_input(&other, false);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

//! Overlay window registry and the egui pass drawing it
//!
//! Windows are kept by name in insertion order. Each frame the overlay feeds
//! winit input to egui, shows every visible window, tessellates the result and
//! hands it to the renderer as an [`OverlayPass`].

use glam::UVec2;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::core::FrameStats;
use crate::renderer::{GpuContext, OverlayPass};
use crate::scene::AsAny;

/// What windows see while they are shown
pub struct OverlayFrame<'a> {
    pub stats: &'a FrameStats,
    pub scene_size: UVec2,
    /// The captured scene, once the renderer has one
    pub framebuffer: Option<egui::TextureId>,
}

/// Changes windows ask the engine to make after the overlay is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayRequests {
    /// New size for the scene targets
    pub scene_size: Option<UVec2>,
}

/// A named panel drawn by the overlay
pub trait OverlayWindow: AsAny {
    fn show(&mut self, ui: &mut egui::Ui, frame: &OverlayFrame<'_>, requests: &mut OverlayRequests);

    fn default_size(&self) -> Option<egui::Vec2> {
        None
    }
}

impl dyn OverlayWindow {
    #[must_use]
    pub fn downcast_ref<T: OverlayWindow>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    #[must_use]
    pub fn downcast_mut<T: OverlayWindow>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

struct WindowEntry {
    name: String,
    visible: bool,
    window: Box<dyn OverlayWindow>,
}

/// egui state bound to a window and a device
struct Attached {
    state: egui_winit::State,
    painter: egui_wgpu::Renderer,
    /// Registered framebuffer texture and the targets generation it belongs to
    framebuffer: Option<(egui::TextureId, u64)>,
}

/// Output of the last built frame
struct Tessellated {
    primitives: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
    pixels_per_point: f32,
    size_in_pixels: [u32; 2],
}

pub struct Overlay {
    ctx: egui::Context,
    windows: Vec<WindowEntry>,
    show_demo: bool,
    attached: Option<Attached>,
    frame: Option<Tessellated>,
}

impl Overlay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctx: egui::Context::default(),
            windows: Vec::new(),
            show_demo: false,
            attached: None,
            frame: None,
        }
    }

    /// Register `window` under `name`, replacing any window with that name.
    ///
    /// Returns `false` when a window was replaced.
    pub fn add_window(
        &mut self,
        name: impl Into<String>,
        window: impl OverlayWindow,
        visible: bool,
    ) -> bool {
        let name = name.into();
        let entry = WindowEntry {
            name,
            visible,
            window: Box::new(window),
        };
        match self.windows.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => {
                log::warn!("overlay window '{}' replaced", entry.name);
                *existing = entry;
                false
            }
            None => {
                self.windows.push(entry);
                true
            }
        }
    }

    pub fn delete_window(&mut self, name: &str) -> bool {
        let before = self.windows.len();
        self.windows.retain(|entry| entry.name != name);
        self.windows.len() != before
    }

    #[must_use]
    pub fn get_window<T: OverlayWindow>(&self, name: &str) -> Option<&T> {
        self.entry(name)
            .and_then(|entry| entry.window.downcast_ref::<T>())
    }

    pub fn get_window_mut<T: OverlayWindow>(&mut self, name: &str) -> Option<&mut T> {
        self.windows
            .iter_mut()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.window.downcast_mut::<T>())
    }

    #[must_use]
    pub fn is_visible(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|entry| entry.visible)
    }

    pub fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.windows.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn toggle_window(&mut self, name: &str) -> bool {
        let visible = !self.is_visible(name);
        self.set_visible(name, visible)
    }

    /// Hide everything if any window is showing, otherwise show everything
    pub fn toggle_all(&mut self) {
        let show = !self.windows.iter().any(|entry| entry.visible);
        for entry in &mut self.windows {
            entry.visible = show;
        }
    }

    pub fn toggle_demo(&mut self) {
        self.show_demo = !self.show_demo;
    }

    #[must_use]
    pub const fn is_demo_visible(&self) -> bool {
        self.show_demo
    }

    pub fn window_names(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(|entry| entry.name.as_str())
    }

    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    fn entry(&self, name: &str) -> Option<&WindowEntry> {
        self.windows.iter().find(|entry| entry.name == name)
    }

    #[must_use]
    pub fn context(&self) -> &egui::Context {
        &self.ctx
    }

    /// Bind egui to `window` and the device
    pub fn attach(&mut self, window: &Window, gpu: &GpuContext) {
        let viewport = self.ctx.viewport_id();
        let state = egui_winit::State::new(
            self.ctx.clone(),
            viewport,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let painter = egui_wgpu::Renderer::new(&gpu.device, gpu.color_format, None, 1, false);
        self.attached = Some(Attached {
            state,
            painter,
            framebuffer: None,
        });
    }

    /// Release the egui device objects; the registry is kept
    pub fn detach(&mut self) {
        self.attached = None;
        self.frame = None;
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Feed a window event to egui. Returns whether egui consumed it.
    pub fn handle_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        match &mut self.attached {
            Some(attached) => attached.state.on_window_event(window, event).consumed,
            None => false,
        }
    }

    /// Keep the egui texture for the captured scene pointing at the current
    /// framebuffer.
    pub fn sync_framebuffer(
        &mut self,
        gpu: &GpuContext,
        view: Option<&wgpu::TextureView>,
        generation: u64,
    ) {
        let Some(attached) = &mut self.attached else {
            return;
        };
        match (view, attached.framebuffer) {
            (None, Some((id, _))) => {
                attached.painter.free_texture(&id);
                attached.framebuffer = None;
            }
            (Some(view), None) => {
                let id = attached.painter.register_native_texture(
                    &gpu.device,
                    view,
                    wgpu::FilterMode::Linear,
                );
                attached.framebuffer = Some((id, generation));
            }
            (Some(view), Some((id, seen))) if seen != generation => {
                attached.painter.update_egui_texture_from_wgpu_texture(
                    &gpu.device,
                    view,
                    wgpu::FilterMode::Linear,
                    id,
                );
                attached.framebuffer = Some((id, generation));
            }
            _ => {}
        }
    }

    /// Run egui for one frame and show every visible window
    pub fn build_frame(
        &mut self,
        window: &Window,
        stats: &FrameStats,
        scene_size: UVec2,
    ) -> OverlayRequests {
        let mut requests = OverlayRequests::default();
        let Some(attached) = &mut self.attached else {
            return requests;
        };

        let frame = OverlayFrame {
            stats,
            scene_size,
            framebuffer: attached.framebuffer.map(|(id, _)| id),
        };
        let raw_input = attached.state.take_egui_input(window);
        let windows = &mut self.windows;
        let show_demo = &mut self.show_demo;

        let output = self.ctx.run(raw_input, |ctx| {
            for entry in windows.iter_mut().filter(|entry| entry.visible) {
                let mut open = true;
                let mut panel = egui::Window::new(entry.name.as_str()).open(&mut open);
                if let Some(size) = entry.window.default_size() {
                    panel = panel.default_size(size);
                }
                panel.show(ctx, |ui| entry.window.show(ui, &frame, &mut requests));
                entry.visible = open;
            }
            egui::Window::new("egui")
                .open(show_demo)
                .show(ctx, |ui| {
                    ctx.settings_ui(ui);
                    ui.separator();
                    ctx.inspection_ui(ui);
                });
        });

        attached
            .state
            .handle_platform_output(window, output.platform_output);
        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        let textures = match self.frame.take() {
            // deltas from a frame that was never painted still need applying
            Some(mut pending) => {
                pending.textures.append(output.textures_delta);
                pending.textures
            }
            None => output.textures_delta,
        };
        self.frame = Some(Tessellated {
            primitives,
            textures,
            pixels_per_point: output.pixels_per_point,
            size_in_pixels: [0, 0],
        });
        requests
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayPass for Overlay {
    fn prepare(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target_size: UVec2,
    ) -> Vec<wgpu::CommandBuffer> {
        let (Some(attached), Some(frame)) = (&mut self.attached, &mut self.frame) else {
            return Vec::new();
        };
        for (id, delta) in &frame.textures.set {
            attached
                .painter
                .update_texture(&gpu.device, &gpu.queue, *id, delta);
        }
        frame.size_in_pixels = target_size.to_array();
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: frame.size_in_pixels,
            pixels_per_point: frame.pixels_per_point,
        };
        let buffers = attached.painter.update_buffers(
            &gpu.device,
            &gpu.queue,
            encoder,
            &frame.primitives,
            &screen,
        );
        for id in &frame.textures.free {
            attached.painter.free_texture(id);
        }
        frame.textures.clear();
        buffers
    }

    fn paint(&self, pass: &mut wgpu::RenderPass<'static>) {
        let (Some(attached), Some(frame)) = (&self.attached, &self.frame) else {
            return;
        };
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: frame.size_in_pixels,
            pixels_per_point: frame.pixels_per_point,
        };
        attached.painter.render(pass, &frame.primitives, &screen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{DebugInfoWindow, RenderWindow};

    #[test]
    fn test_add_get_delete() {
        let mut overlay = Overlay::new();
        assert!(overlay.add_window("debug", DebugInfoWindow, true));
        assert!(overlay.add_window("render", RenderWindow::new(), false));

        assert!(overlay.get_window::<DebugInfoWindow>("debug").is_some());
        assert!(overlay.get_window::<RenderWindow>("debug").is_none());
        assert!(overlay.is_visible("debug"));
        assert!(!overlay.is_visible("render"));

        assert!(overlay.delete_window("debug"));
        assert!(!overlay.delete_window("debug"));
        assert!(overlay.get_window::<DebugInfoWindow>("debug").is_none());
        assert_eq!(overlay.window_names().collect::<Vec<_>>(), ["render"]);
    }

    #[test]
    fn test_same_name_replaces() {
        let mut overlay = Overlay::new();
        overlay.add_window("panel", DebugInfoWindow, false);
        assert!(!overlay.add_window("panel", RenderWindow::new(), true));
        assert_eq!(overlay.window_count(), 1);
        assert!(overlay.get_window::<RenderWindow>("panel").is_some());
        assert!(overlay.is_visible("panel"));
    }

    #[test]
    fn test_toggle_all_hides_then_shows() {
        let mut overlay = Overlay::new();
        overlay.add_window("a", DebugInfoWindow, true);
        overlay.add_window("b", DebugInfoWindow, false);

        overlay.toggle_all();
        assert!(!overlay.is_visible("a"));
        assert!(!overlay.is_visible("b"));

        overlay.toggle_all();
        assert!(overlay.is_visible("a"));
        assert!(overlay.is_visible("b"));
    }

    #[test]
    fn test_toggle_single_window_and_demo() {
        let mut overlay = Overlay::new();
        overlay.add_window("a", DebugInfoWindow, false);
        assert!(overlay.toggle_window("a"));
        assert!(overlay.is_visible("a"));
        assert!(!overlay.toggle_window("missing"));

        assert!(!overlay.is_demo_visible());
        overlay.toggle_demo();
        assert!(overlay.is_demo_visible());
    }

    #[test]
    fn test_window_state_is_reachable_by_name() {
        let mut overlay = Overlay::new();
        overlay.add_window("render", RenderWindow::new(), true);
        let window = overlay.get_window_mut::<RenderWindow>("render").unwrap();
        assert_eq!(window.size(), UVec2::ZERO);
        assert!(!overlay.is_attached());
        assert!(!overlay.set_visible("missing", true));
    }
}

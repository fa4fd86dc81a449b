//! Built-in overlay windows

use glam::UVec2;
use log::Level;

use super::overlay::{OverlayFrame, OverlayRequests, OverlayWindow};
use crate::core::logging::{self, LogBuffer, LogLine};

/// Registry name of the [`DebugInfoWindow`]
pub const DEBUG_WINDOW: &str = "Debug Info";
/// Registry name of the [`RenderWindow`]
pub const RENDER_WINDOW: &str = "Render Window";
/// Registry name of the [`ConsoleWindow`]
pub const CONSOLE_WINDOW: &str = "Engine Console";

/// Frame timing and scene counters
#[derive(Debug, Default)]
pub struct DebugInfoWindow;

impl OverlayWindow for DebugInfoWindow {
    fn show(&mut self, ui: &mut egui::Ui, frame: &OverlayFrame<'_>, _requests: &mut OverlayRequests) {
        let stats = frame.stats;
        ui.label(format!("FPS: {:.1}", stats.fps()));
        ui.label(format!(
            "Frame: {:.2} ms (min {:.2}, max {:.2})",
            stats.avg_frame_ms(),
            stats.min_frame_ms(),
            stats.max_frame_ms()
        ));
        ui.label(format!("Frames: {}", stats.total_frames()));
        ui.separator();
        ui.label(format!("Draw calls: {}", stats.draw_calls()));
        ui.label(format!("Entities: {}", stats.entity_count()));
        ui.label(format!("Lights: {}", stats.light_count()));
        ui.label(format!("Scene: {}x{}", frame.scene_size.x, frame.scene_size.y));
    }
}

/// Shows the captured scene and sizes the scene targets to fit.
#[derive(Debug, Default)]
pub struct RenderWindow {
    size: UVec2,
}

impl RenderWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last content size in pixels
    #[must_use]
    pub const fn size(&self) -> UVec2 {
        self.size
    }
}

/// New scene size for a content region of `available` pixels.
///
/// `None` when the region has not changed or is collapsed to nothing.
#[must_use]
pub fn content_request(current: UVec2, available: egui::Vec2) -> Option<UVec2> {
    if available.x < 1.0 || available.y < 1.0 {
        return None;
    }
    let size = UVec2::new(available.x as u32, available.y as u32);
    (size != current).then_some(size)
}

impl OverlayWindow for RenderWindow {
    fn show(&mut self, ui: &mut egui::Ui, frame: &OverlayFrame<'_>, requests: &mut OverlayRequests) {
        let available = ui.available_size();
        if available.x < 1.0 || available.y < 1.0 {
            return;
        }
        if let Some(size) = content_request(self.size, available * ui.ctx().pixels_per_point()) {
            self.size = size;
            requests.scene_size = Some(size);
        }
        if let Some(texture) = frame.framebuffer {
            ui.image(egui::load::SizedTexture::new(texture, available));
        }
    }

    fn default_size(&self) -> Option<egui::Vec2> {
        Some(egui::vec2(640.0, 360.0))
    }
}

/// Recent log output, newest at the bottom
#[derive(Debug)]
pub struct ConsoleWindow {
    buffer: LogBuffer,
    /// Least severe level shown
    min_level: Level,
}

impl Default for ConsoleWindow {
    fn default() -> Self {
        Self::with_buffer(logging::console_buffer())
    }
}

impl ConsoleWindow {
    /// Console over the installed logger's buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_buffer(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            min_level: Level::Info,
        }
    }

    pub fn set_min_level(&mut self, level: Level) {
        self.min_level = level;
    }

    /// Lines at `min_level` or more severe
    #[must_use]
    pub fn visible_lines(&self) -> Vec<LogLine> {
        let mut lines = self.buffer.snapshot();
        lines.retain(|line| line.level <= self.min_level);
        lines
    }

    pub fn clear(&self) {
        self.buffer.clear();
    }
}

/// Text colour for a level; `None` keeps the theme's colour
#[must_use]
pub fn level_color(level: Level) -> Option<egui::Color32> {
    match level {
        Level::Error => Some(egui::Color32::from_rgb(230, 80, 80)),
        Level::Warn => Some(egui::Color32::from_rgb(230, 190, 60)),
        Level::Info => None,
        Level::Debug | Level::Trace => Some(egui::Color32::GRAY),
    }
}

impl OverlayWindow for ConsoleWindow {
    fn show(&mut self, ui: &mut egui::Ui, _frame: &OverlayFrame<'_>, _requests: &mut OverlayRequests) {
        ui.horizontal(|ui| {
            if ui.button("Clear").clicked() {
                self.clear();
            }
            ui.separator();
            for level in [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace] {
                ui.selectable_value(&mut self.min_level, level, level.as_str());
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in self.visible_lines() {
                    let text = egui::RichText::new(format!(
                        "[{}] {}: {}",
                        line.level, line.target, line.message
                    ))
                    .monospace();
                    match level_color(line.level) {
                        Some(color) => ui.label(text.color(color)),
                        None => ui.label(text),
                    };
                }
            });
    }

    fn default_size(&self) -> Option<egui::Vec2> {
        Some(egui::vec2(560.0, 240.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(level: Level, message: &str) -> LogLine {
        LogLine {
            level,
            target: String::from("frameforge"),
            message: message.to_owned(),
        }
    }

    #[test]
    fn test_console_filters_by_level() {
        let buffer = LogBuffer::default();
        buffer.push(line(Level::Debug, "uploading lights"));
        buffer.push(line(Level::Warn, "missing texture"));
        buffer.push(line(Level::Error, "shader failed"));

        let mut console = ConsoleWindow::with_buffer(buffer.clone());
        assert_eq!(console.visible_lines().len(), 2);
        console.set_min_level(Level::Error);
        assert_eq!(console.visible_lines()[0].message, "shader failed");
        console.set_min_level(Level::Trace);
        assert_eq!(console.visible_lines().len(), 3);

        console.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_errors_and_warnings_stand_out() {
        assert!(level_color(Level::Error).is_some());
        assert_ne!(level_color(Level::Error), level_color(Level::Warn));
        assert_eq!(level_color(Level::Info), None);
    }

    #[test]
    fn test_collapsed_region_requests_nothing() {
        assert_eq!(content_request(UVec2::new(10, 10), egui::vec2(0.0, 300.0)), None);
        assert_eq!(content_request(UVec2::new(10, 10), egui::vec2(300.0, 0.4)), None);
    }

    #[test]
    fn test_unchanged_region_requests_nothing() {
        assert_eq!(content_request(UVec2::new(320, 200), egui::vec2(320.7, 200.2)), None);
    }

    #[test]
    fn test_new_region_requests_resize() {
        assert_eq!(
            content_request(UVec2::ZERO, egui::vec2(640.0, 360.0)),
            Some(UVec2::new(640, 360))
        );
    }
}

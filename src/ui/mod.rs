//! Editor and debug overlay built on egui

mod overlay;
mod windows;

pub use overlay::{Overlay, OverlayFrame, OverlayRequests, OverlayWindow};
pub use windows::{
    CONSOLE_WINDOW, ConsoleWindow, DEBUG_WINDOW, DebugInfoWindow, RENDER_WINDOW, RenderWindow,
    content_request, level_color,
};

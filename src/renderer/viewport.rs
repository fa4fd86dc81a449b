//! Render target sizing

use glam::UVec2;

/// What a resize request amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Same size as before, nothing to rebuild
    Unchanged,
    /// Zero width or height; the previous size is kept and frames skip the
    /// geometry pass until a usable size arrives
    Collapsed,
    Resized { width: u32, height: u32 },
}

/// Pixel size of a render target that tolerates being collapsed to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
    collapsed: bool,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            collapsed: width == 0 || height == 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) -> ResizeOutcome {
        if width == 0 || height == 0 {
            self.collapsed = true;
            return ResizeOutcome::Collapsed;
        }
        self.collapsed = false;
        if (width, height) == (self.width, self.height) {
            return ResizeOutcome::Unchanged;
        }
        self.width = width;
        self.height = height;
        ResizeOutcome::Resized { width, height }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

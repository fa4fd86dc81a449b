//! Engine configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::renderer::{FillMode, OutputMode, RendererOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable VSync
    pub vsync: bool,
    /// Editor mode: overlay windows, the render window and editor hotkeys
    pub editor: bool,
    /// Render the scene offscreen; implied by `editor`
    pub capture: bool,
    /// Linear RGBA the scene is cleared to
    pub clear_color: [f32; 4],
    /// Folders searched for resources, in order
    pub resource_roots: Vec<PathBuf>,
    /// Default `env_logger` filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// File every log line is also written to, truncated at startup
    pub log_file: Option<PathBuf>,
    /// Start in wireframe where the device supports it
    pub wireframe: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("FrameForge"),
            width: 1280,
            height: 720,
            vsync: true,
            editor: false,
            capture: false,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            resource_roots: vec![PathBuf::from("data")],
            log_level: String::from("info"),
            log_file: Some(PathBuf::from("frameforge.log")),
            wireframe: false,
        }
    }
}

impl EngineConfig {
    /// Read a config from a RON file; missing fields keep their defaults
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create a new config with a title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set window dimensions
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable VSync
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    #[must_use]
    pub fn with_editor(mut self, editor: bool) -> Self {
        self.editor = editor;
        self
    }

    #[must_use]
    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    #[must_use]
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_roots.push(root.into());
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// `None` logs to stderr and the console only
    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    #[must_use]
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        if self.editor || self.capture {
            OutputMode::Capture
        } else {
            OutputMode::Present
        }
    }

    #[must_use]
    pub fn renderer_options(&self) -> RendererOptions {
        let [r, g, b, a] = self.clear_color.map(f64::from);
        RendererOptions {
            vsync: self.vsync,
            mode: self.output_mode(),
            clear_color: wgpu::Color { r, g, b, a },
            depth: true,
            fill_mode: if self.wireframe {
                FillMode::Wireframe
            } else {
                FillMode::Solid
            },
            gizmos: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_fields_keep_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(title: \"Demo\", width: 640, editor: true)").unwrap();

        let config = EngineConfig::load_ron(file.path()).unwrap();
        assert_eq!(config.title, "Demo");
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 720);
        assert!(config.editor);
        assert_eq!(config.output_mode(), OutputMode::Capture);
        assert_eq!(config.resource_roots, [PathBuf::from("data")]);
        assert_eq!(config.log_file, Some(PathBuf::from("frameforge.log")));
    }

    #[test]
    fn test_log_file_can_be_turned_off() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(log_file: None, wireframe: true)").unwrap();

        let config = EngineConfig::load_ron(file.path()).unwrap();
        assert_eq!(config.log_file, None);
        assert_eq!(config.renderer_options().fill_mode, FillMode::Wireframe);
    }

    #[test]
    fn test_unreadable_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EngineConfig::load_ron(dir.path().join("absent.ron")),
            Err(ConfigError::Io { .. })
        ));

        let path = dir.path().join("broken.ron");
        fs::write(&path, "(width: \"wide\")").unwrap();
        assert!(matches!(
            EngineConfig::load_ron(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_builder_and_renderer_options() {
        let config = EngineConfig::default()
            .with_size(320, 200)
            .with_vsync(false)
            .with_clear_color([0.0, 0.5, 1.0, 1.0])
            .with_resource_root("assets");
        let options = config.renderer_options();
        assert!(!options.vsync);
        assert_eq!(options.mode, OutputMode::Present);
        assert_eq!(options.clear_color.g, 0.5);
        assert_eq!(config.resource_roots.len(), 2);
    }
}

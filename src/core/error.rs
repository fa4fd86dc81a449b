//! Top-level engine error

use thiserror::Error;

use super::config::ConfigError;
use crate::assets::ResourceError;
use crate::renderer::RenderError;
use crate::scene::SceneError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_config(path: &std::path::Path) -> Result<(), EngineError> {
        crate::core::EngineConfig::load_ron(path)?;
        Ok(())
    }

    #[test]
    fn test_startup_failures_keep_their_source() {
        let error = load_config(std::path::Path::new("does/not/exist.ron")).unwrap_err();
        assert!(matches!(error, EngineError::Config(ConfigError::Io { .. })));

        let error = EngineError::from(RenderError::NoAdapter);
        assert_eq!(error.to_string(), "no suitable GPU adapter found");
    }
}

//! Core engine module
//!
//! Contains the main Engine struct, configuration, errors, logging and frame timing

mod config;
mod debug;
mod engine;
mod error;
pub mod logging;
mod time;

pub use config::{ConfigError, EngineConfig};
pub use debug::FrameStats;
pub use engine::{Application, Engine, EngineContext};
pub use error::EngineError;
pub use time::GameTime;

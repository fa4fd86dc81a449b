//! Input handling module
//!
//! Raw keyboard and mouse state fed from winit window events.

mod state;

pub use state::Input;

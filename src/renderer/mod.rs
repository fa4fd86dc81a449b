//! Rendering module
//!
//! wgpu device ownership, per-draw constants, the merged light buffer and the
//! frame loop that ties them together.

mod context;
mod debug_lines;
mod draw;
mod gpu;
mod lights;
mod uniforms;
mod viewport;

pub use context::{
    FillMode, FrameReport, OutputMode, OverlayPass, RenderError, Renderer, RendererOptions,
    frame_constants,
};
pub use debug_lines::{DebugLines, LineVertex, SPHERE_SEGMENTS};
pub use draw::{DrawCall, DrawResources, Drawable};
pub use gpu::{BindLayouts, GpuContext};
pub use lights::{
    LightBatch, LightGlobals, LightRecord, LightStorage, LightType, MAX_LIGHTS, SharedLights,
};
pub use uniforms::{FrameConstants, ObjectBinding, ObjectUniform};
pub use viewport::{ResizeOutcome, Viewport};

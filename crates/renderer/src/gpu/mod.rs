//! GPU side of the renderer.
//!
//! - `context` owns instance/adapter/device wiring, the swapchain, and MSAA selection.
//! - `pipeline` links generated fragment shaders against the shared vertex stage.
//! - `uniforms` mirrors the `PatternParams` block written before each frame.
//! - `state` keeps the live pipeline for the window and swaps it on reset.
//! - `offscreen` renders a single still into a readback buffer for PNG export.

mod context;
mod offscreen;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use offscreen::export_png;
pub(crate) use state::GpuState;

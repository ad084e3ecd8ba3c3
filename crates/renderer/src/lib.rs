//! Renderer crate for randshade.
//!
//! Turns generated [`Pattern`]s into fragment shaders and draws them, either in
//! an interactive window or into a PNG still. The overall flow is:
//!
//! ```text
//!   CLI / randshade
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ GpuState::render()
//!          │               │                                      │
//!          │               └─ reset ─▶ Generator ─▶ assemble ─▶ pipeline swap
//!          │
//!   Renderer::export ──▶ offscreen target ──▶ readback ──▶ PNG
//! ```
//!
//! A reset whose shader fails to compile or link is logged and the previous
//! pattern keeps running.

mod compile;
mod gpu;
mod runtime;
mod types;
mod window;

use anyhow::Result;
use exprgen::{Generator, Pattern};

pub use compile::{
    assemble_fragment, substitute_placeholders, validate_fragment, CompileError,
    FRAGMENT_TEMPLATE,
};
pub use runtime::{FixedTimeSource, SystemTimeSource, TimeSample, TimeSource};
pub use types::{
    Antialiasing, ExportRequest, PatternSource, RendererConfig, DEFAULT_SURFACE_EDGE,
};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and blocks until the user closes it.
    ///
    /// Fails if the window, device, or the very first pattern cannot be set up.
    pub fn run(&mut self) -> Result<()> {
        window::run_window(self.config.clone())
    }

    /// Renders one pattern headlessly and writes it as PNG; returns the pattern drawn.
    pub fn export(request: &ExportRequest) -> Result<Pattern> {
        let source = &request.source;
        let mut generator = Generator::with_seed(source.grammar.clone(), source.seed);
        let pattern = generator.pattern(source.depth);
        let [red, green, blue] = pattern.render();
        tracing::info!(
            output = %request.output.display(),
            %red,
            %green,
            %blue,
            "exporting still"
        );

        gpu::export_png(
            &pattern,
            &request.output,
            request.size.0,
            request.size.1,
            request.time,
            request.antialiasing,
        )?;
        Ok(pattern)
    }
}

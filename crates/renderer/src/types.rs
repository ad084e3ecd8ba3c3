use std::path::PathBuf;
use std::time::Duration;

use exprgen::{Grammar, DEFAULT_DEPTH};

/// Default window edge in physical pixels.
pub const DEFAULT_SURFACE_EDGE: u32 = 512;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the target.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Antialiasing {
    /// Resolves the policy against the sample counts a format supports.
    ///
    /// `supported` must be sorted ascending. Returns the chosen count and whether
    /// a fallback from an explicit request was needed.
    pub(crate) fn resolve(self, supported: &[u32]) -> (u32, bool) {
        match self {
            Antialiasing::Auto => (supported.last().copied().unwrap_or(1), false),
            Antialiasing::Off => (1, false),
            Antialiasing::Samples(requested) if supported.contains(&requested) => {
                (requested, false)
            }
            Antialiasing::Samples(requested) => {
                let fallback = supported
                    .iter()
                    .copied()
                    .filter(|&count| count <= requested)
                    .max()
                    .unwrap_or(1);
                (fallback, true)
            }
        }
    }
}

/// Pattern source handed to the renderer: what to draw and how deep.
#[derive(Debug, Clone)]
pub struct PatternSource {
    pub grammar: Grammar,
    pub depth: u32,
    /// Seed for the first pattern; later resets continue the same stream.
    pub seed: Option<u64>,
}

impl Default for PatternSource {
    fn default() -> Self {
        Self {
            grammar: Grammar::default(),
            depth: DEFAULT_DEPTH,
            seed: None,
        }
    }
}

/// Immutable configuration for the interactive window.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Optional FPS cap; None = redraw as fast as the compositor allows.
    pub target_fps: Option<f32>,
    pub antialiasing: Antialiasing,
    /// Regenerate the pattern on this interval in addition to user resets.
    pub auto_reset: Option<Duration>,
    pub source: PatternSource,
}

impl Default for RendererConfig {
    /// Provides the classic 512x512 window with no FPS cap or auto reset.
    fn default() -> Self {
        Self {
            surface_size: (DEFAULT_SURFACE_EDGE, DEFAULT_SURFACE_EDGE),
            target_fps: None,
            antialiasing: Antialiasing::default(),
            auto_reset: None,
            source: PatternSource::default(),
        }
    }
}

/// Headless still-frame request.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub output: PathBuf,
    pub size: (u32, u32),
    /// Elapsed seconds fed into the time uniform before the cosine.
    pub time: f32,
    pub antialiasing: Antialiasing,
    pub source: PatternSource,
}

use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

use crate::runtime::TimeSample;

/// CPU mirror of the `PatternParams` std140 block in [`crate::compile::FRAGMENT_TEMPLATE`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct PatternUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub _padding: f32,
}

impl PatternUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width.max(1) as f32, height.max(1) as f32],
            time: 1.0,
            _padding: 0.0,
        }
    }

    pub fn set_resolution(&mut self, size: PhysicalSize<u32>) {
        self.resolution = [size.width.max(1) as f32, size.height.max(1) as f32];
    }

    /// Patterns see time as `cos(seconds)`, so animation oscillates instead of drifting.
    pub fn set_time(&mut self, sample: TimeSample) {
        self.time = sample.seconds.cos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn uniforms_follow_std140_layout() {
        let uniforms = PatternUniforms::new(512, 256);
        let base = &uniforms as *const _ as usize;

        assert_eq!(size_of::<PatternUniforms>(), 16);
        assert_eq!((&uniforms.resolution as *const _ as usize) - base, 0);
        assert_eq!((&uniforms.time as *const _ as usize) - base, 8);
        assert_eq!(bytemuck::bytes_of(&uniforms).len(), 16);
    }

    #[test]
    fn time_is_cosine_of_elapsed_seconds() {
        let mut uniforms = PatternUniforms::new(1, 1);
        uniforms.set_time(TimeSample::new(0.0, 0));
        assert!((uniforms.time - 1.0).abs() < 1e-6);
        uniforms.set_time(TimeSample::new(std::f32::consts::PI, 10));
        assert!((uniforms.time + 1.0).abs() < 1e-6);
    }

    #[test]
    fn resolution_never_collapses_to_zero() {
        let mut uniforms = PatternUniforms::new(0, 0);
        assert_eq!(uniforms.resolution, [1.0, 1.0]);
        uniforms.set_resolution(PhysicalSize::new(1280, 0));
        assert_eq!(uniforms.resolution, [1280.0, 1.0]);
    }
}

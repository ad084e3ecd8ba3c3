use anyhow::Result;
use exprgen::Pattern;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::compile::{assemble_fragment, CompileError};
use crate::runtime::{SystemTimeSource, TimeSource};
use crate::types::Antialiasing;

use super::context::GpuContext;
use super::pipeline::{encode_pattern_pass, MultisampleTarget, PatternPipeline, PipelineLayouts};
use super::uniforms::PatternUniforms;

/// Window-side GPU state: one live pattern pipeline plus its uniforms.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: PatternUniforms,
    current: PatternPipeline,
    multisample_target: Option<MultisampleTarget>,
    clock: SystemTimeSource,
}

impl GpuState {
    /// Brings up the device and compiles `pattern`. There is no previous pipeline to
    /// fall back on here, so a compile failure is returned to the caller.
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        pattern: &Pattern,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing)?;
        let layouts = PipelineLayouts::new(&context.device);

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pattern uniform buffer"),
            size: std::mem::size_of::<PatternUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = layouts.uniform_bind_group(&context.device, &uniform_buffer);

        let source = assemble_fragment(pattern)?;
        let current = PatternPipeline::new(
            &context.device,
            &layouts,
            context.surface_format,
            context.sample_count,
            &source,
        )?;

        let uniforms = PatternUniforms::new(context.size.width, context.size.height);
        let multisample_target = MultisampleTarget::for_sample_count(
            &context.device,
            context.surface_format,
            context.size.width,
            context.size.height,
            context.sample_count,
        );

        Ok(Self {
            context,
            layouts,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            current,
            multisample_target,
            clock: SystemTimeSource::new(),
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.uniforms.set_resolution(new_size);
        self.multisample_target = MultisampleTarget::for_sample_count(
            &self.context.device,
            self.context.surface_format,
            new_size.width,
            new_size.height,
            self.context.sample_count,
        );
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Swaps in a pipeline for `pattern` and restarts the clock.
    ///
    /// On failure the running pipeline and clock are left untouched.
    pub(crate) fn reset(&mut self, pattern: &Pattern) -> Result<(), CompileError> {
        let source = assemble_fragment(pattern)?;
        match PatternPipeline::new(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            self.context.sample_count,
            &source,
        ) {
            Ok(pipeline) => {
                self.current = pipeline;
                self.clock.reset();
                debug!("pattern pipeline replaced; clock restarted");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "keeping previous pattern pipeline");
                Err(err)
            }
        }
    }

    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;

        let sample = self.clock.sample();
        self.uniforms.set_time(sample);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("pattern encoder"),
                });
        encode_pattern_pass(
            &mut encoder,
            &view,
            self.multisample_target.as_ref(),
            &self.current,
            &self.uniform_bind_group,
        );
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

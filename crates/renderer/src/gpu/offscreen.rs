use std::path::Path;
use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};
use exprgen::Pattern;
use winit::dpi::PhysicalSize;

use crate::compile::assemble_fragment;
use crate::runtime::{FixedTimeSource, TimeSource};
use crate::types::Antialiasing;

use super::context::{
    create_instance, request_device, sample_count_hint, select_sample_count, DeviceBundle,
};
use super::pipeline::{encode_pattern_pass, MultisampleTarget, PatternPipeline, PipelineLayouts};
use super::uniforms::PatternUniforms;

/// PNG export works on tightly packed 8-bit RGBA.
const EXPORT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BYTES_PER_PIXEL: u32 = 4;

/// Renders a single frame of `pattern` without a window and returns RGBA8 rows, top row first.
pub(crate) fn render_still(
    pattern: &Pattern,
    width: u32,
    height: u32,
    time: f32,
    antialiasing: Antialiasing,
) -> Result<Vec<u8>> {
    let instance = create_instance();
    let size = PhysicalSize::new(width.max(1), height.max(1));
    let DeviceBundle {
        adapter,
        device,
        queue,
    } = request_device(&instance, None, size, sample_count_hint(antialiasing))?;
    let sample_count = select_sample_count(&adapter, EXPORT_FORMAT, antialiasing);

    let layouts = PipelineLayouts::new(&device);
    let source = assemble_fragment(pattern)?;
    let pipeline = PatternPipeline::new(&device, &layouts, EXPORT_FORMAT, sample_count, &source)
        .context("failed to build pattern pipeline for export")?;

    let mut uniforms = PatternUniforms::new(size.width, size.height);
    uniforms.set_time(FixedTimeSource::new(time).sample());
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("export uniform buffer"),
        size: std::mem::size_of::<PatternUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    queue.write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    let uniform_bind_group = layouts.uniform_bind_group(&device, &uniform_buffer);

    let extent = wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    };
    let output_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("export target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: EXPORT_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let msaa = MultisampleTarget::for_sample_count(
        &device,
        EXPORT_FORMAT,
        size.width,
        size.height,
        sample_count,
    );

    let unpadded_bytes_per_row = size.width * BYTES_PER_PIXEL;
    let padded_bytes_per_row =
        align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("export readback buffer"),
        size: u64::from(padded_bytes_per_row) * u64::from(size.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("export encoder"),
    });
    encode_pattern_pass(
        &mut encoder,
        &output_view,
        msaa.as_ref(),
        &pipeline,
        &uniform_bind_group,
    );
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &output_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(size.height),
            },
        },
        extent,
    );
    queue.submit(Some(encoder.finish()));

    let buffer_slice = readback_buffer.slice(..);
    let (sender, receiver) = mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| anyhow!("failed waiting for GPU readback: {err}"))?;
    receiver
        .recv()
        .map_err(|_| anyhow!("failed receiving GPU map callback"))?
        .context("GPU buffer mapping failed")?;

    let mapped = buffer_slice.get_mapped_range();
    let pixels = unpad_rows(
        &mapped,
        padded_bytes_per_row as usize,
        unpadded_bytes_per_row as usize,
        size.height as usize,
    );
    drop(mapped);
    readback_buffer.unmap();

    tracing::debug!(
        width = size.width,
        height = size.height,
        sample_count,
        time,
        "rendered still frame"
    );
    Ok(pixels)
}

/// Renders `pattern` and writes it to `path` as PNG.
pub(crate) fn export_png(
    pattern: &Pattern,
    path: &Path,
    width: u32,
    height: u32,
    time: f32,
    antialiasing: Antialiasing,
) -> Result<()> {
    let pixels = render_still(pattern, width, height, time, antialiasing)?;
    let image = image::RgbaImage::from_raw(width.max(1), height.max(1), pixels)
        .ok_or_else(|| anyhow!("readback size does not match {width}x{height}"))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

fn unpad_rows(padded: &[u8], padded_row: usize, unpadded_row: usize, rows: usize) -> Vec<u8> {
    let mut frame = Vec::with_capacity(unpadded_row * rows);
    for chunk in padded.chunks(padded_row).take(rows) {
        frame.extend_from_slice(&chunk[..unpadded_row]);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(align_to(512 * 4, 256), 2048);
        assert_eq!(align_to(100 * 4, 256), 512);
        assert_eq!(align_to(1, 256), 256);
    }

    #[test]
    fn unpadding_drops_row_tails() {
        let padded = [1, 2, 0, 0, 3, 4, 0, 0];
        assert_eq!(unpad_rows(&padded, 4, 2, 2), vec![1, 2, 3, 4]);
    }
}

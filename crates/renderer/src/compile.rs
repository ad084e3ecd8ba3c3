use std::borrow::Cow;

use exprgen::{Pattern, PLACEHOLDER};
use wgpu::naga::{self, ShaderStage};

/// Errors raised while turning a generated pattern into a GPU program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("shader template has {expected} placeholders but {provided} expressions were supplied")]
    PlaceholderMismatch { expected: usize, provided: usize },
    #[error("fragment shader failed to parse: {0}")]
    Parse(String),
    #[error("fragment shader failed validation: {0}")]
    Validation(String),
    #[error("GPU rejected the shader module: {0}")]
    Device(String),
    #[error("GPU failed to link the render pipeline: {0}")]
    Link(String),
}

/// Replaces each `$` in `template` with the next entry of `values`, left to right.
pub fn substitute_placeholders<S: AsRef<str>>(
    template: &str,
    values: &[S],
) -> Result<String, CompileError> {
    let expected = template.matches(PLACEHOLDER).count();
    if expected != values.len() {
        return Err(CompileError::PlaceholderMismatch {
            expected,
            provided: values.len(),
        });
    }

    let extra: usize = values.iter().map(|value| value.as_ref().len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut values = values.iter();
    for (index, segment) in template.split(PLACEHOLDER).enumerate() {
        if index > 0 {
            if let Some(value) = values.next() {
                out.push_str(value.as_ref());
            }
        }
        out.push_str(segment);
    }
    Ok(out)
}

/// Builds the complete fragment shader for a pattern (red, green, blue slots in order).
pub fn assemble_fragment(pattern: &Pattern) -> Result<String, CompileError> {
    substitute_placeholders(FRAGMENT_TEMPLATE, &pattern.render())
}

/// Runs naga's GLSL frontend and validator over a fragment shader without touching a GPU.
pub fn validate_fragment(source: &str) -> Result<(), CompileError> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(ShaderStage::Fragment);
    let module = frontend
        .parse(&options, source)
        .map_err(|err| CompileError::Parse(err.to_string()))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| CompileError::Validation(err.to_string()))?;
    Ok(())
}

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Validates an assembled fragment shader, then hands it to the device.
///
/// The device call runs inside a validation error scope so a rejected module is
/// reported as an error instead of reaching the uncaptured-error handler.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> Result<wgpu::ShaderModule, CompileError> {
    validate_fragment(source)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("pattern fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(CompileError::Device(err.to_string()));
    }
    Ok(module)
}

/// Fragment shader with one `$` per output channel.
///
/// `x` and `y` span `[-1, 1]` with a bottom-left origin; `t` is the cosine of
/// the elapsed time supplied through the uniform block. The block layout must
/// match the `PatternUniforms` struct uploaded by the GPU layer.
pub const FRAGMENT_TEMPLATE: &str = r"#version 450
layout(location = 0) out vec4 fragColor;

layout(std140, set = 0, binding = 0) uniform PatternParams {
    vec2 resolution;
    float time;
} params;

void main() {
    float t = params.time;
    float x = 2.0 * gl_FragCoord.x / params.resolution.x - 1.0;
    float y = 2.0 * (params.resolution.y - gl_FragCoord.y) / params.resolution.y - 1.0;
    float red = $;
    float green = $;
    float blue = $;
    fragColor = vec4(red, green, blue, 1.0);
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    gl_Position = vec4(positions[vertex_index], 0.0, 1.0);
}
";

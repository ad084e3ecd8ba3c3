use std::fmt::Write as _;

use anyhow::{Context, Result};
use exprgen::Generator;
use patternconfig::{AntialiasSetting, PatternConfig};
use renderer::{
    assemble_fragment, validate_fragment, Antialiasing, ExportRequest, PatternSource, Renderer,
    RendererConfig,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{ExportArgs, GenerateArgs, PatternArgs, RunArgs};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the explicit `--config` file, or the default one when it exists.
pub fn load_config(args: &PatternArgs) -> Result<PatternConfig> {
    if let Some(path) = &args.config {
        tracing::debug!(path = %path.display(), "loading config");
        return PatternConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let paths = AppPaths::discover()?;
    let path = paths.config_file();
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        exists = path.exists(),
        "resolved default config"
    );
    PatternConfig::load_or_default(&path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

/// Merges CLI flags over config values into the generator inputs.
pub fn pattern_source(args: &PatternArgs, config: &PatternConfig) -> Result<PatternSource> {
    let grammar = config.grammar().context("invalid generator catalog")?;
    Ok(PatternSource {
        grammar,
        depth: args.depth.unwrap_or(config.generator.depth),
        seed: args.seed.or(config.generator.seed),
    })
}

pub fn antialiasing(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        AntialiasSetting::Samples2 => Antialiasing::Samples(2),
        AntialiasSetting::Samples4 => Antialiasing::Samples(4),
        AntialiasSetting::Samples8 => Antialiasing::Samples(8),
        AntialiasSetting::Samples16 => Antialiasing::Samples(16),
    }
}

fn resolve_antialias(
    flag: Option<AntialiasSetting>,
    config: Option<AntialiasSetting>,
) -> Antialiasing {
    flag.or(config).map(antialiasing).unwrap_or_default()
}

pub fn renderer_config(
    config: &PatternConfig,
    source: PatternSource,
    args: &RunArgs,
) -> RendererConfig {
    let render = &config.render;
    RendererConfig {
        surface_size: args.size.unwrap_or((render.width, render.height)),
        target_fps: args.fps.or(render.fps).filter(|fps| *fps > 0.0),
        antialiasing: resolve_antialias(args.antialias, render.antialias),
        auto_reset: args.auto_reset.or(render.auto_reset),
        source,
    }
}

pub fn run(pattern: &PatternArgs, args: RunArgs) -> Result<()> {
    let config = load_config(pattern)?;
    let source = pattern_source(pattern, &config)?;
    let renderer_config = renderer_config(&config, source, &args);
    tracing::info!(
        depth = renderer_config.source.depth,
        seed = ?renderer_config.source.seed,
        antialias = ?renderer_config.antialiasing,
        "starting randshade"
    );
    Renderer::new(renderer_config).run()
}

/// Produces the text printed by `generate`.
pub fn generate_output(source: PatternSource, args: &GenerateArgs) -> Result<String> {
    let mut generator = Generator::with_seed(source.grammar, source.seed);
    let pattern = generator.pattern(source.depth);
    let fragment = assemble_fragment(&pattern)?;

    if args.validate {
        validate_fragment(&fragment).context("generated shader failed validation")?;
        tracing::info!("generated shader passed validation");
    }

    if args.source {
        return Ok(fragment);
    }

    let [red, green, blue] = pattern.render();
    let mut out = String::new();
    writeln!(out, "red:   {red}")?;
    writeln!(out, "green: {green}")?;
    writeln!(out, "blue:  {blue}")?;
    Ok(out)
}

pub fn generate(pattern: &PatternArgs, args: &GenerateArgs) -> Result<()> {
    let config = load_config(pattern)?;
    let source = pattern_source(pattern, &config)?;
    print!("{}", generate_output(source, args)?);
    Ok(())
}

pub fn export(pattern: &PatternArgs, args: ExportArgs) -> Result<()> {
    let config = load_config(pattern)?;
    let source = pattern_source(pattern, &config)?;
    let render = &config.render;
    let request = ExportRequest {
        output: args.output,
        size: args.size.unwrap_or((render.width, render.height)),
        time: args.time,
        antialiasing: resolve_antialias(args.antialias, render.antialias),
        source,
    };
    Renderer::export(&request)?;
    tracing::info!(path = %request.output.display(), "still frame written");
    Ok(())
}

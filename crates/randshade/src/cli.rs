use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use patternconfig::{
    parse_antialias, validate_dimensions, validate_fps, AntialiasSetting, MAX_DEPTH,
};

#[derive(Parser, Debug)]
#[command(
    name = "randshade",
    author,
    version,
    about = "Random expression shaders: press R to roll a new pattern",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub pattern: PatternArgs,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct PatternArgs {
    /// Config file (defaults to `randshade.toml` in the config directory, if present).
    #[arg(long, global = true, value_name = "FILE", env = "RANDSHADE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Expression tree depth.
    #[arg(long, global = true, value_name = "N", value_parser = parse_depth)]
    pub depth: Option<u32>,

    /// Seed for reproducible patterns.
    #[arg(long, global = true, value_name = "N")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Window size (e.g. `512x512`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap (0=uncapped).
    #[arg(long, value_name = "FPS", value_parser = parse_fps)]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Regenerate automatically on this interval (e.g. `30s`, `2m`).
    #[arg(long, value_name = "DURATION", value_parser = parse_interval)]
    pub auto_reset: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the preview window (the default when no subcommand is given).
    Run(RunArgs),
    /// Print a generated pattern without opening a window.
    Generate(GenerateArgs),
    /// Render one pattern headlessly into a PNG.
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Print the complete fragment shader instead of the three channel expressions.
    #[arg(long)]
    pub source: bool,

    /// Check the assembled shader with the GLSL validator and fail on errors.
    #[arg(long)]
    pub validate: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Destination PNG path.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,

    /// Elapsed seconds to evaluate the pattern at.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,

    /// Image size (e.g. `1024x1024`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count.
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 512x512".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;

    validate_dimensions(width, height)?;
    Ok((width, height))
}

pub fn parse_depth(value: &str) -> Result<u32, String> {
    let depth: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid depth '{value}'; expected a non-negative integer"))?;
    if depth > MAX_DEPTH {
        return Err(format!("depth {depth} exceeds the maximum of {MAX_DEPTH}"));
    }
    Ok(depth)
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid fps '{value}'; expected a number"))?;
    validate_fps(fps)?;
    Ok(fps)
}

/// Accepts humantime strings (`30s`, `1m 30s`) or bare seconds.
pub fn parse_interval(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    let interval = match trimmed.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Duration::from_secs_f64(seconds),
        Ok(_) => return Err(format!("invalid interval '{trimmed}'")),
        Err(_) => humantime::parse_duration(trimmed)
            .map_err(|err| format!("invalid interval '{trimmed}': {err}"))?,
    };
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn size_accepts_common_separators() {
        assert_eq!(parse_size("512x512"), Ok((512, 512)));
        assert_eq!(parse_size(" 1280 X 720 "), Ok((1280, 720)));
        assert_eq!(parse_size("800×600"), Ok((800, 600)));
    }

    #[test]
    fn size_rejects_bad_values() {
        assert!(parse_size("512").is_err());
        assert!(parse_size("0x512").is_err());
        assert!(parse_size("axb").is_err());
        assert!(parse_size("100000x10").is_err());
    }

    #[test]
    fn depth_is_capped() {
        assert_eq!(parse_depth("0"), Ok(0));
        assert_eq!(parse_depth("10"), Ok(10));
        assert!(parse_depth("11").is_err());
        assert!(parse_depth("-1").is_err());
    }

    #[test]
    fn fps_rejects_values_outside_the_cap_range() {
        assert_eq!(parse_fps("30").unwrap(), 30.0);
        assert_eq!(parse_fps("0").unwrap(), 0.0);
        assert!(parse_fps("1e-30").is_err());
        assert!(parse_fps("inf").is_err());
        assert!(parse_fps("-5").is_err());
        assert!(parse_fps("fast").is_err());
        assert!(Cli::try_parse_from(["randshade", "--fps", "1e-30"]).is_err());
    }

    #[test]
    fn interval_accepts_seconds_and_humantime() {
        assert_eq!(parse_interval("30"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_interval("1.5"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_interval("2m"), Ok(Duration::from_secs(120)));
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn subcommands_parse_with_global_flags() {
        let cli = Cli::try_parse_from(["randshade", "generate", "--seed", "7", "--source"]).unwrap();
        assert_eq!(cli.pattern.seed, Some(7));
        match cli.command {
            Some(Command::Generate(args)) => assert!(args.source),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "randshade", "export", "--output", "out.png", "--time", "1.5", "--depth", "3",
        ])
        .unwrap();
        assert_eq!(cli.pattern.depth, Some(3));
        match cli.command {
            Some(Command::Export(args)) => {
                assert_eq!(args.output, PathBuf::from("out.png"));
                assert_eq!(args.time, 1.5);
                assert!(args.size.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_runs_the_window() {
        let cli =
            Cli::try_parse_from(["randshade", "--size", "640x480", "--antialias", "off"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.size, Some((640, 480)));
        assert_eq!(cli.run.antialias, Some(AntialiasSetting::Off));
    }
}

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use exprgen::{Grammar, ParameterSet, TemplateCatalog, DEFAULT_DEPTH};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Deepest recursion accepted from configuration. Six-slot templates make the
/// expression size grow as `6^depth`, so anything past this stalls the shader compiler.
pub const MAX_DEPTH: u32 = 10;

/// Largest surface edge accepted for windows and exports.
pub const MAX_DIMENSION: u32 = 16_384;

/// Highest frame-rate cap accepted. Zero means uncapped.
pub const MAX_FPS: f32 = 1_000.0;

/// Symbols the fragment template defines for generated expressions.
pub const SHADER_PARAMETERS: &[&str] = &["x", "y", "t"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PatternConfig {
    pub version: u32,
    pub generator: GeneratorSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub depth: u32,
    pub seed: Option<u64>,
    pub parameters: Option<Vec<String>>,
    pub templates: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f32>,
    #[serde(deserialize_with = "deserialize_antialias_opt")]
    pub antialias: Option<AntialiasSetting>,
    #[serde(
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub auto_reset: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            version: 1,
            generator: GeneratorSettings::default(),
            render: RenderSettings::default(),
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            seed: None,
            parameters: None,
            templates: None,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            fps: None,
            antialias: None,
            auto_reset: None,
        }
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

/// Parses `auto`, `off`, or an MSAA sample count.
pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" => Ok(AntialiasSetting::Off),
        other => other
            .trim_start_matches("samples")
            .parse::<u32>()
            .ok()
            .and_then(AntialiasSetting::from_samples)
            .ok_or_else(|| format!("invalid antialias setting '{other}'")),
    }
}

impl PatternConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PatternConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` when it exists, otherwise returns the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Builds the generator grammar, honouring catalog overrides.
    pub fn grammar(&self) -> Result<Grammar, ConfigError> {
        let parameters = match &self.generator.parameters {
            Some(names) => ParameterSet::new(names).map_err(invalid)?,
            None => ParameterSet::default(),
        };
        let templates = match &self.generator.templates {
            Some(patterns) => TemplateCatalog::from_patterns(patterns).map_err(invalid)?,
            None => TemplateCatalog::default(),
        };
        Ok(Grammar::new(parameters, templates))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.generator.depth > MAX_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "generator.depth {} exceeds the maximum of {MAX_DEPTH}",
                self.generator.depth
            )));
        }

        if let Some(parameters) = &self.generator.parameters {
            for name in parameters {
                if !is_shader_parameter(name) {
                    return Err(ConfigError::Invalid(format!(
                        "generator.parameters entry '{name}' must be one of x, y, t or a float literal such as 0.5"
                    )));
                }
            }
        }

        self.grammar()?;

        let render = &self.render;
        validate_dimensions(render.width, render.height)
            .map_err(|msg| ConfigError::Invalid(format!("render: {msg}")))?;

        if let Some(fps) = render.fps {
            validate_fps(fps).map_err(|msg| ConfigError::Invalid(format!("render.fps: {msg}")))?;
        }

        if let Some(interval) = render.auto_reset {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(
                    "render.auto_reset must be greater than zero".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Checks a surface size against the accepted range.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err("width and height must be greater than zero".into());
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(format!(
            "{width}x{height} exceeds the maximum edge of {MAX_DIMENSION}"
        ));
    }
    Ok(())
}

/// Accepts `0` (uncapped) or a finite cap between 1/60 FPS and [`MAX_FPS`].
pub fn validate_fps(fps: f32) -> Result<(), String> {
    if fps == 0.0 {
        return Ok(());
    }
    if !fps.is_finite() || !(1.0 / 60.0..=MAX_FPS).contains(&fps) {
        return Err(format!(
            "{fps} is outside the supported range; use 0 or a value up to {MAX_FPS}"
        ));
    }
    Ok(())
}

fn is_shader_parameter(name: &str) -> bool {
    SHADER_PARAMETERS.contains(&name) || (name.contains('.') && name.parse::<f32>().is_ok())
}

fn invalid(err: exprgen::CatalogError) -> ConfigError {
    ConfigError::Invalid(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[generator]
depth = 4
seed = 17
parameters = ["x", "y", "t", "0.5"]
templates = ["$ + $", "sin($)", "mix($, $, $)"]

[render]
width = 800
height = 600
fps = 30
antialias = 4
auto_reset = "45s"
"#;

    #[test]
    fn parses_sample_config() {
        let config = PatternConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.generator.depth, 4);
        assert_eq!(config.generator.seed, Some(17));
        assert_eq!(config.render.width, 800);
        assert_eq!(config.render.fps, Some(30.0));
        assert_eq!(config.render.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(config.render.auto_reset, Some(Duration::from_secs(45)));

        let grammar = config.grammar().unwrap();
        assert_eq!(grammar.parameters.len(), 4);
        assert_eq!(grammar.templates.len(), 3);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = PatternConfig::from_toml_str("").unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.generator.depth, DEFAULT_DEPTH);
        assert_eq!(config.generator.seed, None);
        assert_eq!((config.render.width, config.render.height), (512, 512));
        assert!(config.render.auto_reset.is_none());

        let grammar = config.grammar().unwrap();
        assert_eq!(grammar, Grammar::default());
    }

    #[test]
    fn auto_reset_accepts_plain_seconds() {
        let config = PatternConfig::from_toml_str("[render]\nauto_reset = 10\n").unwrap();
        assert_eq!(config.render.auto_reset, Some(Duration::from_secs(10)));
    }

    #[test]
    fn rejects_excessive_depth() {
        let err = PatternConfig::from_toml_str("[generator]\ndepth = 11\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_parameter() {
        let err =
            PatternConfig::from_toml_str("[generator]\nparameters = [\"x\", \"z\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("'z'")));

        let err =
            PatternConfig::from_toml_str("[generator]\nparameters = [\"x\", \"1\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_catalogs() {
        let err = PatternConfig::from_toml_str("[generator]\ntemplates = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PatternConfig::from_toml_str("[generator]\nparameters = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_render_settings() {
        for doc in [
            "[render]\nwidth = 0\n",
            "[render]\nheight = 20000\n",
            "[render]\nfps = -1\n",
            "[render]\nfps = 1e-30\n",
            "[render]\nfps = 5000\n",
            "[render]\nauto_reset = \"0s\"\n",
            "version = 2\n",
        ] {
            let err = PatternConfig::from_toml_str(doc).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "accepted {doc:?}");
        }
    }

    #[test]
    fn fps_range_is_enforced() {
        assert!(validate_fps(0.0).is_ok());
        assert!(validate_fps(0.5).is_ok());
        assert!(validate_fps(MAX_FPS).is_ok());
        assert!(validate_fps(1e-30).is_err());
        assert!(validate_fps(f32::INFINITY).is_err());
        assert!(validate_fps(f32::NAN).is_err());
        assert!(validate_fps(-1.0).is_err());
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            PatternConfig::from_toml_str("[render]\nantialias = \"3\"\n").unwrap_err(),
            ConfigError::Parse(_)
        ));
        assert!(matches!(
            PatternConfig::from_toml_str("[render]\nauto_reset = \"soon\"\n").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn parses_antialias_aliases() {
        assert_eq!(parse_antialias("MAX").unwrap(), AntialiasSetting::Auto);
        assert_eq!(parse_antialias("0").unwrap(), AntialiasSetting::Off);
        assert_eq!(parse_antialias("16").unwrap(), AntialiasSetting::Samples16);
        assert!(parse_antialias("5").is_err());
    }
}

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Marker character standing for one child expression inside a template.
pub const PLACEHOLDER: char = '$';

/// Parameter alphabet used when no override is configured.
pub const DEFAULT_PARAMETERS: &[&str] = &["x", "y", "t"];

/// Template catalog used when no override is configured.
///
/// Every entry evaluates to a single `float` once all of its slots are filled
/// with `float` expressions.
pub const DEFAULT_TEMPLATES: &[&str] = &[
    "$",
    "$ + $",
    "$ + $ + $",
    "$ - $",
    "$ - $ - $",
    "$ * $",
    "$ * $ * $",
    "abs($)",
    "round($)",
    "pow($, 2.0)",
    "exp($)",
    "sqrt(max($, 0.001))",
    "sin($)",
    "cos($)",
    "length(vec2($, $))",
    "length(vec3($, $, $))",
    "distance(vec2($, $), vec2($, $))",
    "distance(vec3($, $, $), vec3($, $, $))",
    "dot(vec2($, $), vec2($, $))",
    "dot(vec3($, $, $), vec3($, $, $))",
    "cross(vec3($, $, $), vec3($, $, $)).x",
    "normalize(vec2($, $)).x",
    "normalize(vec3($, $, $)).x",
    "clamp($, 0.0, 1.0)",
    "fract($)",
    "mix($, $, $)",
    "smoothstep(0.0, 1.0, clamp($, 0.0, 1.0))",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("parameter set must contain at least one parameter")]
    EmptyParameters,
    #[error("template catalog must contain at least one template")]
    EmptyCatalog,
    #[error("invalid parameter '{0}'; names must be non-empty, without whitespace or '$'")]
    InvalidParameter(String),
    #[error("parameter '{0}' is listed more than once")]
    DuplicateParameter(String),
    #[error("template pattern must not be empty")]
    EmptyTemplate,
}

/// Leaf symbol of a generated expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter(Arc<str>);

impl Parameter {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, non-empty parameter alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new<I, S>(names: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut parameters = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty()
                || name.contains(PLACEHOLDER)
                || name.chars().any(char::is_whitespace)
            {
                return Err(CatalogError::InvalidParameter(name.to_string()));
            }
            if !seen.insert(name.to_string()) {
                return Err(CatalogError::DuplicateParameter(name.to_string()));
            }
            parameters.push(Parameter(Arc::from(name)));
        }

        if parameters.is_empty() {
            return Err(CatalogError::EmptyParameters);
        }
        Ok(Self { parameters })
    }

    /// Number of parameters; construction guarantees at least one.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            parameters: DEFAULT_PARAMETERS
                .iter()
                .map(|name| Parameter(Arc::from(*name)))
                .collect(),
        }
    }
}

/// Expression fragment with `$` slots, pre-split into the literal text around them.
///
/// A pattern with `n` markers is stored as `n + 1` segments, so filling it is a
/// plain interleave of segments and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pattern: String,
    segments: Vec<String>,
}

impl Template {
    pub fn parse(pattern: &str) -> Result<Self, CatalogError> {
        if pattern.trim().is_empty() {
            return Err(CatalogError::EmptyTemplate);
        }
        let segments = pattern.split(PLACEHOLDER).map(str::to_string).collect();
        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of child expressions this template takes.
    pub fn slots(&self) -> usize {
        self.segments.len() - 1
    }

    pub(crate) fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Substitutes `children` into the slots, left to right.
    ///
    /// # Panics
    ///
    /// Panics if `children.len()` differs from [`Template::slots`].
    pub fn fill<S: AsRef<str>>(&self, children: &[S]) -> String {
        assert_eq!(
            children.len(),
            self.slots(),
            "template '{}' takes {} children",
            self.pattern,
            self.slots()
        );
        let mut out = String::with_capacity(self.pattern.len());
        for (index, segment) in self.segments.iter().enumerate() {
            out.push_str(segment);
            if let Some(child) = children.get(index) {
                out.push_str(child.as_ref());
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Ordered, non-empty list of templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCatalog {
    templates: Vec<Arc<Template>>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<Template>) -> Result<Self, CatalogError> {
        if templates.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        Ok(Self {
            templates: templates.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let templates = patterns
            .into_iter()
            .map(|pattern| Template::parse(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(templates)
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Template>> {
        self.templates.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter().map(|t| t.as_ref())
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES
                .iter()
                .map(|pattern| {
                    let segments = pattern.split(PLACEHOLDER).map(str::to_string).collect();
                    Arc::new(Template {
                        pattern: pattern.to_string(),
                        segments,
                    })
                })
                .collect(),
        }
    }
}

/// The two immutable catalogs a [`crate::Generator`] draws from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    pub parameters: ParameterSet,
    pub templates: TemplateCatalog,
}

impl Grammar {
    pub fn new(parameters: ParameterSet, templates: TemplateCatalog) -> Self {
        Self {
            parameters,
            templates,
        }
    }
}

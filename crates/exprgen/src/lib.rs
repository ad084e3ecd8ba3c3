//! Random expression generator for procedural fragment shaders.
//!
//! A [`Grammar`] pairs a parameter alphabet (`x`, `y`, `t` by default) with a
//! catalog of expression templates such as `sin($)` or `mix($, $, $)`. The
//! [`Generator`] walks that grammar top-down, picking uniformly at every step:
//!
//! ```text
//!   depth > 0 ─▶ pick template ─▶ fill each `$` with a depth-1 subtree
//!   depth = 0 ─▶ pick parameter
//! ```
//!
//! Generation produces an explicit [`Expr`] tree; turning it into GLSL text is a
//! separate, pure step ([`Expr::render`]). Three trees make up a [`Pattern`],
//! one per output color channel.

mod expr;
mod generator;
mod grammar;

pub use expr::{Expr, Leaves, Pattern};
pub use generator::{generate_expression, Chooser, Generator, RngChooser, DEFAULT_DEPTH};
pub use grammar::{
    CatalogError, Grammar, Parameter, ParameterSet, Template, TemplateCatalog, DEFAULT_PARAMETERS,
    DEFAULT_TEMPLATES, PLACEHOLDER,
};

use std::fmt;
use std::sync::Arc;

use crate::grammar::{Parameter, Template};

/// Generated expression tree.
///
/// A `Node` always carries exactly as many children as its template has slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Leaf(Parameter),
    Node(Arc<Template>, Vec<Expr>),
}

impl Expr {
    /// Number of nested template applications from this node down to its deepest leaf.
    pub fn depth(&self) -> u32 {
        match self {
            Expr::Leaf(_) => 0,
            Expr::Node(_, children) => 1 + children.iter().map(Expr::depth).max().unwrap_or(0),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Expr::Leaf(_) => 1,
            Expr::Node(_, children) => 1 + children.iter().map(Expr::node_count).sum::<usize>(),
        }
    }

    /// Leaf parameters in left-to-right order.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Serialises the tree into expression text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        match self {
            Expr::Leaf(parameter) => out.push_str(parameter.as_str()),
            Expr::Node(template, children) => {
                for (index, segment) in template.segments().iter().enumerate() {
                    out.push_str(segment);
                    if let Some(child) = children.get(index) {
                        child.write_into(out);
                    }
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Depth-first iterator over the leaves of an [`Expr`].
pub struct Leaves<'a> {
    stack: Vec<&'a Expr>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Parameter;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(expr) = self.stack.pop() {
            match expr {
                Expr::Leaf(parameter) => return Some(parameter),
                Expr::Node(_, children) => self.stack.extend(children.iter().rev()),
            }
        }
        None
    }
}

/// One expression per output color channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub red: Expr,
    pub green: Expr,
    pub blue: Expr,
}

impl Pattern {
    pub fn channels(&self) -> [&Expr; 3] {
        [&self.red, &self.green, &self.blue]
    }

    /// Channel expressions as text, in red, green, blue order.
    pub fn render(&self) -> [String; 3] {
        [self.red.render(), self.green.render(), self.blue.render()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ParameterSet;

    fn param(set: &ParameterSet, index: usize) -> Expr {
        Expr::Leaf(set.get(index).unwrap().clone())
    }

    fn template(pattern: &str) -> Arc<Template> {
        Arc::new(Template::parse(pattern).unwrap())
    }

    #[test]
    fn renders_nested_templates() {
        let params = ParameterSet::default();
        let inner = Expr::Node(template("sin($)"), vec![param(&params, 2)]);
        let root = Expr::Node(
            template("mix($, $, $)"),
            vec![param(&params, 0), inner, param(&params, 1)],
        );

        assert_eq!(root.render(), "mix(x, sin(t), y)");
        assert_eq!(root.to_string(), root.render());
        assert_eq!(root.depth(), 2);
        assert_eq!(root.node_count(), 5);
    }

    #[test]
    fn leaves_are_visited_left_to_right() {
        let params = ParameterSet::default();
        let root = Expr::Node(
            template("$ * $"),
            vec![
                Expr::Node(template("$ + $"), vec![param(&params, 2), param(&params, 1)]),
                param(&params, 0),
            ],
        );
        let names: Vec<_> = root.leaves().map(Parameter::as_str).collect();
        assert_eq!(names, ["t", "y", "x"]);
    }

    #[test]
    fn zero_slot_node_has_no_leaves() {
        let root = Expr::Node(template("0.5"), Vec::new());
        assert_eq!(root.render(), "0.5");
        assert_eq!(root.depth(), 1);
        assert_eq!(root.leaves().count(), 0);
    }
}

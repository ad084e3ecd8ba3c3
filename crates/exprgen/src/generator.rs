use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::expr::{Expr, Pattern};
use crate::grammar::Grammar;

/// Recursion depth used for every channel unless configured otherwise.
pub const DEFAULT_DEPTH: u32 = 6;

/// Source of uniform choices over `0..n`.
///
/// Callers only ask with `n >= 1`; implementations must return a value below `n`.
pub trait Chooser {
    fn choose(&mut self, n: usize) -> usize;
}

/// [`Chooser`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngChooser<R = StdRng> {
    rng: R,
}

impl<R: Rng> RngChooser<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngChooser<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Chooser for RngChooser<R> {
    fn choose(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }
}

/// Builds random expressions over a [`Grammar`].
#[derive(Debug, Clone)]
pub struct Generator<C = RngChooser> {
    grammar: Grammar,
    chooser: C,
}

impl Generator<RngChooser> {
    /// Seeds from `seed` when given, otherwise from OS entropy.
    pub fn with_seed(grammar: Grammar, seed: Option<u64>) -> Self {
        let chooser = match seed {
            Some(seed) => RngChooser::seeded(seed),
            None => RngChooser::from_entropy(),
        };
        Self::new(grammar, chooser)
    }
}

impl<C: Chooser> Generator<C> {
    pub fn new(grammar: Grammar, chooser: C) -> Self {
        Self { grammar, chooser }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Generates a tree whose every leaf sits exactly `max_depth` templates below the root.
    ///
    /// Templates are chosen at every level above zero and parameters only at
    /// level zero, so `max_depth = 0` yields a single parameter.
    pub fn tree(&mut self, max_depth: u32) -> Expr {
        if max_depth == 0 {
            let index = self.chooser.choose(self.grammar.parameters.len());
            let parameter = self
                .grammar
                .parameters
                .get(index)
                .cloned()
                .expect("chooser returned an index outside the parameter set");
            return Expr::Leaf(parameter);
        }

        let index = self.chooser.choose(self.grammar.templates.len());
        let template = self
            .grammar
            .templates
            .get(index)
            .cloned()
            .expect("chooser returned an index outside the template catalog");
        let children = (0..template.slots())
            .map(|_| self.tree(max_depth - 1))
            .collect();
        Expr::Node(template, children)
    }

    /// Generates and renders one expression.
    pub fn expression(&mut self, max_depth: u32) -> String {
        self.tree(max_depth).render()
    }

    /// Generates the red, green and blue channel trees, in that order.
    pub fn pattern(&mut self, max_depth: u32) -> Pattern {
        let red = self.tree(max_depth);
        let green = self.tree(max_depth);
        let blue = self.tree(max_depth);
        for (channel, expr) in [("red", &red), ("green", &green), ("blue", &blue)] {
            debug!(
                channel,
                depth = max_depth,
                nodes = expr.node_count(),
                expression = %expr,
                "generated channel expression"
            );
        }
        Pattern { red, green, blue }
    }
}

/// Generates one expression over the default grammar using OS entropy.
pub fn generate_expression(max_depth: u32) -> String {
    Generator::with_seed(Grammar::default(), None).expression(max_depth)
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    use super::*;
    use crate::grammar::{ParameterSet, TemplateCatalog, PLACEHOLDER};

    /// Replays a fixed list of choices, then keeps returning `fallback`.
    struct Scripted {
        script: VecDeque<usize>,
        fallback: usize,
        calls: usize,
    }

    impl Scripted {
        fn new(script: &[usize], fallback: usize) -> Self {
            Self {
                script: script.iter().copied().collect(),
                fallback,
                calls: 0,
            }
        }
    }

    impl Chooser for Scripted {
        fn choose(&mut self, n: usize) -> usize {
            self.calls += 1;
            let value = self.script.pop_front().unwrap_or(self.fallback);
            assert!(value < n, "scripted choice {value} out of range {n}");
            value
        }
    }

    fn small_grammar() -> Grammar {
        Grammar::new(
            ParameterSet::new(["x", "y", "t"]).unwrap(),
            TemplateCatalog::from_patterns(["$", "$ + $"]).unwrap(),
        )
    }

    fn leaf_depths(expr: &Expr, depth: u32, out: &mut Vec<u32>) {
        match expr {
            Expr::Leaf(_) => out.push(depth),
            Expr::Node(_, children) => {
                for child in children {
                    leaf_depths(child, depth + 1, out);
                }
            }
        }
    }

    #[test]
    fn worked_example_produces_three_term_sum() {
        let chooser = Scripted::new(&[1, 0, 0, 1, 0, 0], 0);
        let mut generator = Generator::new(small_grammar(), chooser);
        assert_eq!(generator.expression(2), "x + x + x");
    }

    #[test]
    fn depth_zero_returns_a_single_parameter() {
        let mut generator = Generator::with_seed(Grammar::default(), Some(9));
        for _ in 0..50 {
            let text = generator.expression(0);
            assert!(
                ["x", "y", "t"].contains(&text.as_str()),
                "unexpected leaf {text}"
            );
        }
    }

    #[test]
    fn always_first_choice_is_deterministic() {
        let mut first = Generator::new(Grammar::default(), Scripted::new(&[], 0));
        let mut second = Generator::new(Grammar::default(), Scripted::new(&[], 0));
        for depth in 0..6 {
            let a = first.expression(depth);
            assert_eq!(a, second.expression(depth));
            // The first default template is the identity `$`.
            assert_eq!(a, "x");
        }
    }

    #[test]
    fn recursion_performs_one_draw_per_node() {
        for depth in 0..8 {
            let mut generator = Generator::new(small_grammar(), Scripted::new(&[], 0));
            let tree = generator.tree(depth);
            assert_eq!(generator.chooser.calls, depth as usize + 1);
            assert_eq!(tree.node_count(), depth as usize + 1);
        }

        let mut generator = Generator::new(small_grammar(), Scripted::new(&[], 1));
        let tree = generator.tree(4);
        // Binary tree of height 4: 15 internal nodes plus 16 leaves.
        assert_eq!(generator.chooser.calls, 31);
        assert_eq!(tree.node_count(), 31);
    }

    #[test]
    fn output_is_fully_substituted_and_closed_over_alphabet() {
        let grammar = Grammar::new(
            ParameterSet::new(["a", "b"]).unwrap(),
            TemplateCatalog::from_patterns(["$ + $", "($ * $)", "-$", "$"]).unwrap(),
        );
        let mut generator = Generator::new(grammar, RngChooser::seeded(7));
        for depth in 0..6 {
            let text = generator.expression(depth);
            assert!(!text.is_empty());
            assert!(!text.contains(PLACEHOLDER));
            for token in text
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                assert!(token == "a" || token == "b", "foreign token {token}");
            }
        }
    }

    #[test]
    fn every_leaf_sits_at_max_depth() {
        let mut generator = Generator::with_seed(Grammar::default(), Some(1234));
        for depth in 0..5 {
            let tree = generator.tree(depth);
            assert_eq!(tree.depth(), depth);
            let mut depths = Vec::new();
            leaf_depths(&tree, 0, &mut depths);
            assert!(depths.iter().all(|&d| d == depth));
            let grammar = generator.grammar();
            assert!(tree
                .leaves()
                .all(|leaf| grammar.parameters.contains(leaf.as_str())));
            assert!(!tree.render().contains(PLACEHOLDER));
        }
    }

    #[test]
    fn depth_one_covers_whole_catalog() {
        let mut generator = Generator::with_seed(Grammar::default(), Some(42));
        let mut seen = HashSet::new();
        for _ in 0..5_000 {
            if let Expr::Node(template, _) = generator.tree(1) {
                seen.insert(template.pattern().to_string());
            }
        }
        let expected: HashSet<_> = generator
            .grammar()
            .templates
            .iter()
            .map(|t| t.pattern().to_string())
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn same_seed_reproduces_pattern() {
        let mut first = Generator::with_seed(Grammar::default(), Some(5));
        let mut second = Generator::with_seed(Grammar::default(), Some(5));
        assert_eq!(first.pattern(3), second.pattern(3));
    }

    #[test]
    fn pattern_channels_are_drawn_independently() {
        let chooser = Scripted::new(&[0, 1, 1, 0, 0, 1, 2, 0], 0);
        let mut generator = Generator::new(small_grammar(), chooser);
        let pattern = generator.pattern(1);
        assert_eq!(pattern.render(), ["y", "x + x", "t + x"]);
    }

    #[test]
    fn free_function_uses_default_grammar() {
        let text = generate_expression(2);
        assert!(!text.contains(PLACEHOLDER));
        assert!(!text.is_empty());
    }
}

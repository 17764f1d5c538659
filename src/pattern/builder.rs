//! Turns a parse tree into a [`Program`] of generator steps.
//!
//! A single visitor walks the tree top-down. A node whose non-terminal has an
//! entry in [`BUILDERS`] is compiled by that builder and not descended into;
//! any other node just visits its children, so plain concatenation needs no
//! builder of its own. Quantifier builders pop the step built for their
//! operand (always the most recent one) and wrap it.

use std::sync::Arc;

use phf::{Map, phf_map};

use crate::config::{Alphabet, Config};
use crate::error::{CompileError, ConfigError};

use super::ast::{Bounds, FirstModifier, NumberFormat, Program, Step};
use super::charset::CharSet;
use super::expr::Expression;
use super::parser::ParseNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builder {
    Literal,
    EscapedMeta,
    AnyOf(Alphabet),
    InclusiveList,
    ExclusiveList,
    Group,
    Backref,
    SourceBackref,
    Numeric,
    ZeroOrMore,
    ZeroOrOne,
    OneOrMore,
    NumberOf,
    NumberOrMoreOf,
    NumberRangeOf,
    Alternatives,
}

/// Non-terminals with generation semantics of their own.
const BUILDERS: Map<&'static str, Builder> = phf_map! {
    "ALTERNATIVES" => Builder::Alternatives,
    "BACKREF" => Builder::Backref,
    "DIGIT_ALIAS" => Builder::AnyOf(Alphabet::Digit),
    "DOT" => Builder::AnyOf(Alphabet::Base),
    "ESC_META_CHAR" => Builder::EscapedMeta,
    "EXCLUSIVE_CHAR_LIST" => Builder::ExclusiveList,
    "INCLUSIVE_CHAR_LIST" => Builder::InclusiveList,
    "NON_DIGIT_ALIAS" => Builder::AnyOf(Alphabet::NonDigit),
    "NON_META_CHAR" => Builder::Literal,
    "NON_WHITESPACE" => Builder::AnyOf(Alphabet::NonWhitespace),
    "NON_WORD_CHAR" => Builder::AnyOf(Alphabet::NonWord),
    "NUMBER_OF" => Builder::NumberOf,
    "NUMBER_OR_MORE_OF" => Builder::NumberOrMoreOf,
    "NUMBER_RANGE_OF" => Builder::NumberRangeOf,
    "NUMERIC_EXPR" => Builder::Numeric,
    "ONE_OR_MORE" => Builder::OneOrMore,
    "PARENS" => Builder::Group,
    "SRCBACKREF_EXPR" => Builder::SourceBackref,
    "WHITESPACE" => Builder::AnyOf(Alphabet::Whitespace),
    "WORD_CHAR" => Builder::AnyOf(Alphabet::Word),
    "ZERO_OR_MORE" => Builder::ZeroOrMore,
    "ZERO_OR_ONE" => Builder::ZeroOrOne,
};

/// Nesting limit for compiled steps. Generation recurses once per level on
/// the caller's stack, so deeper programs are rejected here.
pub const MAX_NESTING: usize = 256;

/// Compile a parse tree rooted at the start symbol.
pub fn build(root: &ParseNode<'_>, config: &Config) -> Result<Program, CompileError> {
    let mut compiler = StepCompiler {
        config,
        group_count: 0,
    };
    let steps = compiler.compile(root)?;
    let program = Program {
        steps,
        group_count: compiler.group_count,
    };
    if program.depth() > MAX_NESTING {
        return Err(CompileError::TooDeep { limit: MAX_NESTING });
    }
    Ok(program)
}

struct StepCompiler<'c> {
    config: &'c Config,
    group_count: usize,
}

impl StepCompiler<'_> {
    /// Compile `node` into its own step list.
    fn compile(&mut self, node: &ParseNode<'_>) -> Result<Vec<Step>, CompileError> {
        let mut steps = Vec::new();
        self.walk(node, &mut steps)?;
        Ok(steps)
    }

    fn walk(&mut self, node: &ParseNode<'_>, steps: &mut Vec<Step>) -> Result<(), CompileError> {
        if let Some(builder) = node.name().and_then(|name| BUILDERS.get(name)) {
            let step = self.build_step(*builder, node, steps)?;
            steps.push(step);
        } else {
            for child in &node.children {
                self.walk(child, steps)?;
            }
        }
        Ok(())
    }

    fn build_step(
        &mut self,
        builder: Builder,
        node: &ParseNode<'_>,
        steps: &mut Vec<Step>,
    ) -> Result<Step, CompileError> {
        let step = match builder {
            Builder::Literal => Step::Literal(node.text.to_string()),
            Builder::EscapedMeta => Step::Literal(child_text(node, "META_CHAR").to_string()),
            Builder::AnyOf(alphabet) => Step::Class(Arc::clone(self.config.alphabet(alphabet))),
            Builder::InclusiveList => Step::Class(Arc::new(self.char_list(node))),
            Builder::ExclusiveList => {
                Step::Class(Arc::new(self.config.base().difference(&self.char_list(node))))
            }
            Builder::Group => {
                let id = self.group_count;
                self.group_count += 1;
                let body = match node.find_first("REGEX") {
                    Some(inner) => self.compile(inner)?,
                    None => Vec::new(),
                };
                Step::Group { id, body }
            }
            Builder::Backref => {
                let digit = child_text(node, "DIGIT");
                let n = digit.parse().map_err(|_| ConfigError::InvalidNumber {
                    text: digit.to_string(),
                })?;
                Step::Backref(n)
            }
            Builder::SourceBackref => {
                let modifier = if node.find_first("BACKREF_MOD_FIRST").is_some() {
                    Some(FirstModifier::First)
                } else if node.find_first("BACKREF_MOD_MIN_FIRST").is_some() {
                    Some(FirstModifier::MinusFirst)
                } else {
                    None
                };
                Step::SourceBackref {
                    index: expressions(node).into_iter().next().unwrap_or_else(empty_expr),
                    modifier,
                    construct: node.text.to_string(),
                }
            }
            Builder::Numeric => Step::Numeric {
                value: expressions(node).into_iter().next().unwrap_or_else(empty_expr),
                format: number_format(node)?,
            },
            Builder::ZeroOrMore => self.repeat(node, steps, Bounds::ZeroOrMore)?,
            Builder::ZeroOrOne => self.repeat(node, steps, Bounds::ZeroOrOne)?,
            Builder::OneOrMore => self.repeat(node, steps, Bounds::OneOrMore)?,
            Builder::NumberOf | Builder::NumberOrMoreOf | Builder::NumberRangeOf => {
                let bounds = self.counted_bounds(builder, node)?;
                self.repeat(node, steps, bounds)?
            }
            Builder::Alternatives => Step::Alternation(
                node.find_all("TERM")
                    .into_iter()
                    .map(|term| self.compile(term))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(step)
    }

    fn repeat(
        &self,
        node: &ParseNode<'_>,
        steps: &mut Vec<Step>,
        bounds: Bounds,
    ) -> Result<Step, CompileError> {
        let operand = steps.pop().ok_or_else(|| CompileError::MissingOperand {
            construct: node.text.to_string(),
        })?;
        Ok(Step::Repeat {
            step: Box::new(operand),
            bounds,
            construct: node.text.to_string(),
        })
    }

    /// Bounds of `{n}`, `{n,}` and `{n,m}`, checked now when they are constant.
    fn counted_bounds(&self, builder: Builder, node: &ParseNode<'_>) -> Result<Bounds, CompileError> {
        let mut exprs = expressions(node).into_iter();
        let mut next = || exprs.next().unwrap_or_else(empty_expr);
        let bounds = match builder {
            Builder::NumberOf => Bounds::Exactly(next()),
            Builder::NumberOrMoreOf => Bounds::AtLeast(next()),
            _ => Bounds::Between(next(), next()),
        };
        let upper_bound = self.config.upper_bound();
        match &bounds {
            Bounds::AtLeast(min) => {
                if let Some(min) = min.constant_value()
                    && min >= 0.0
                    && (min as usize) > upper_bound
                {
                    return Err(ConfigError::MinimumAboveUpperBound {
                        minimum: min as usize,
                        upper_bound,
                        construct: node.text.to_string(),
                    }
                    .into());
                }
            }
            Bounds::Between(min, max) => {
                if let (Some(min), Some(max)) = (min.constant_value(), max.constant_value())
                    && max.trunc() < min.trunc()
                {
                    return Err(ConfigError::BoundsOutOfOrder {
                        construct: node.text.to_string(),
                    }
                    .into());
                }
            }
            _ => {}
        }
        Ok(bounds)
    }

    /// The characters of a `[...]` or `[^...]` list, limited to the base alphabet.
    fn char_list(&self, node: &ParseNode<'_>) -> CharSet {
        let specs = node.find_all("CHAR_SPEC").into_iter().map(|spec| {
            match spec.find_first("RANGE") {
                Some(range) => format!(
                    "{}-{}",
                    spec_char(&range.children[0]),
                    spec_char(&range.children[2])
                ),
                None => spec_char(&spec.children[0]).to_string(),
            }
        });
        CharSet::from_specs(specs).intersection(self.config.base())
    }
}

/// The character a `CHAR_SPEC_CHAR` stands for, with any escape removed.
fn spec_char<'a>(node: &ParseNode<'a>) -> &'a str {
    match node.find_first("ESC_META_CHAR_SPEC") {
        Some(escaped) => escaped.children[1].text,
        None => node.text,
    }
}

fn child_text<'a>(node: &ParseNode<'a>, name: &str) -> &'a str {
    node.find_first(name).map_or("", |child| child.text)
}

fn expressions(node: &ParseNode<'_>) -> Vec<Expression> {
    node.find_all("EXPRESSION")
        .into_iter()
        .map(|expr| Expression::new(expr.text))
        .collect()
}

fn empty_expr() -> Expression {
    Expression::new("")
}

fn number_format(node: &ParseNode<'_>) -> Result<NumberFormat, CompileError> {
    let mut format = NumberFormat::default();
    for modifier in node.find_all("EXPR_MOD") {
        if modifier.text.starts_with("fixed(") {
            let digits = child_text(modifier, "NUMBER");
            format.fixed = Some(digits.parse().map_err(|_| ConfigError::InvalidNumber {
                text: digits.to_string(),
            })?);
        } else if modifier.text == "simplify" {
            format.simplify = true;
        }
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::pattern::grammar::Grammar;
    use crate::pattern::parser::parse;

    fn build_with(pattern: &str, config: &Config) -> Result<Program, CompileError> {
        let root = parse(Grammar::get(), pattern).expect("parse should succeed");
        build(&root, config)
    }

    fn steps(pattern: &str) -> Vec<Step> {
        build_with(pattern, &Config::default()).unwrap().steps
    }

    fn build_err(pattern: &str) -> CompileError {
        build_with(pattern, &Config::default()).unwrap_err()
    }

    #[test]
    fn test_literals_are_one_step_each() {
        let s = steps("ab");
        assert_eq!(s.len(), 2);
        assert!(matches!(&s[0], Step::Literal(t) if t == "a"));
        assert!(matches!(&s[1], Step::Literal(t) if t == "b"));
    }

    #[test]
    fn test_escaped_meta_drops_backslash() {
        let s = steps(r"\(\\");
        assert!(matches!(&s[0], Step::Literal(t) if t == "("));
        assert!(matches!(&s[1], Step::Literal(t) if t == "\\"));
    }

    #[test]
    fn test_alphabet_steps_share_config_sets() {
        let config = Config::default();
        let program = build_with(r".\d", &config).unwrap();
        match &program.steps[..] {
            [Step::Class(dot), Step::Class(digit)] => {
                assert!(Arc::ptr_eq(dot, config.alphabet(Alphabet::Base)));
                assert!(Arc::ptr_eq(digit, config.alphabet(Alphabet::Digit)));
            }
            other => panic!("unexpected steps {other:?}"),
        }
    }

    #[test]
    fn test_inclusive_list_is_clipped_to_base() {
        let settings = Settings {
            base_charset: vec!["a-m".into()],
            ..Settings::default()
        };
        let program = build_with("[k-p]", &Config::new(&settings)).unwrap();
        match &program.steps[0] {
            Step::Class(set) => assert_eq!(set.chars(), &['k', 'l', 'm']),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_exclusive_list_complements_base() {
        let settings = Settings {
            base_charset: vec!["a-e".into()],
            ..Settings::default()
        };
        let program = build_with("[^b-d]", &Config::new(&settings)).unwrap();
        match &program.steps[0] {
            Step::Class(set) => assert_eq!(set.chars(), &['a', 'e']),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_escaped_bracket_in_list() {
        match &steps(r"[\]]")[0] {
            Step::Class(set) => assert_eq!(set.chars(), &[']']),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_quantifier_wraps_previous_step() {
        let s = steps("ab*");
        assert_eq!(s.len(), 2);
        match &s[1] {
            Step::Repeat {
                step,
                bounds,
                construct,
            } => {
                assert!(matches!(step.as_ref(), Step::Literal(t) if t == "b"));
                assert_eq!(*bounds, Bounds::ZeroOrMore);
                assert_eq!(construct, "*");
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_stacked_quantifiers_nest() {
        let s = steps("a{2}?");
        match &s[0] {
            Step::Repeat { step, bounds, .. } => {
                assert_eq!(*bounds, Bounds::ZeroOrOne);
                assert!(matches!(
                    step.as_ref(),
                    Step::Repeat {
                        bounds: Bounds::Exactly(_),
                        ..
                    }
                ));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_groups_get_distinct_ids() {
        let program = build_with("(a(b))(c)", &Config::default()).unwrap();
        assert_eq!(program.group_count, 3);
        match &program.steps[..] {
            [Step::Group { id: 0, body }, Step::Group { id: 2, .. }] => {
                assert!(matches!(&body[1], Step::Group { id: 1, .. }));
            }
            other => panic!("unexpected steps {other:?}"),
        }
    }

    #[test]
    fn test_alternation_branches() {
        let s = steps("ab|c|");
        match &s[..] {
            [Step::Alternation(branches)] => {
                assert_eq!(branches.len(), 3);
                assert_eq!(branches[0].len(), 2);
                assert_eq!(branches[1].len(), 1);
                assert!(branches[2].is_empty());
            }
            other => panic!("unexpected steps {other:?}"),
        }
    }

    #[test]
    fn test_source_backref_modifiers() {
        match &steps("{{0:-first}}")[0] {
            Step::SourceBackref {
                index,
                modifier,
                construct,
            } => {
                assert_eq!(index.text, "0");
                assert_eq!(*modifier, Some(FirstModifier::MinusFirst));
                assert_eq!(construct, "{{0:-first}}");
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_numeric_format_modifiers() {
        match &steps("{{=i:fixed(2):simplify}}")[0] {
            Step::Numeric { value, format } => {
                assert_eq!(value.text, "i");
                assert_eq!(format.fixed, Some(2));
                assert!(format.simplify);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_constant_bounds_out_of_order_are_rejected() {
        assert!(matches!(
            build_err("a{3,2}"),
            CompileError::Config(ConfigError::BoundsOutOfOrder { .. })
        ));
    }

    #[test]
    fn test_constant_minimum_above_cap_is_rejected() {
        assert_eq!(
            build_err("a{11,}"),
            CompileError::Config(ConfigError::MinimumAboveUpperBound {
                minimum: 11,
                upper_bound: 10,
                construct: "{11,}".into(),
            })
        );
        assert!(build_with("a{10,}", &Config::default()).is_ok());
    }

    #[test]
    fn test_variable_bounds_are_left_for_generation() {
        assert!(build_with("a{i+20,}", &Config::default()).is_ok());
        assert!(build_with("a{N,1}", &Config::default()).is_ok());
    }

    #[test]
    fn test_digits_are_plain_literals() {
        let s = steps("7x");
        assert!(matches!(&s[0], Step::Literal(t) if t == "7"));
        assert!(!BUILDERS.contains_key("DIGIT"));
    }

    #[test]
    fn test_every_builder_names_a_non_terminal() {
        for name in BUILDERS.keys() {
            assert!(Grammar::get().lookup(name).is_some(), "{name}");
        }
    }
}

//! Compiled generator steps.

use std::sync::Arc;

use super::charset::CharSet;
use super::expr::Expression;

/// A compiled pattern: the top-level steps plus the number of capturing
/// groups anywhere inside them.
#[derive(Debug, Clone)]
pub struct Program {
    pub steps: Vec<Step>,
    pub group_count: usize,
}

impl Program {
    /// Deepest nesting of steps, counting each group, repetition and
    /// alternation level.
    pub fn depth(&self) -> usize {
        steps_depth(&self.steps)
    }
}

/// One unit of generation. Evaluating a step yields a string; a sequence of
/// steps yields the concatenation of their strings.
#[derive(Debug, Clone)]
pub enum Step {
    Literal(String),
    /// One character drawn from the set; nothing when the set is empty.
    Class(Arc<CharSet>),
    /// `(...)`. `id` is unique within the [`Program`]; the capture index is
    /// claimed at generation time.
    Group { id: usize, body: Vec<Step> },
    /// `\N`, 1-based.
    Backref(usize),
    Repeat {
        step: Box<Step>,
        bounds: Bounds,
        /// The quantifier as written, for error messages.
        construct: String,
    },
    /// `{{expr}}`
    SourceBackref {
        index: Expression,
        modifier: Option<FirstModifier>,
        construct: String,
    },
    /// `{{=expr}}`
    Numeric {
        value: Expression,
        format: NumberFormat,
    },
    Alternation(Vec<Vec<Step>>),
}

impl Step {
    pub fn depth(&self) -> usize {
        match self {
            Step::Group { body, .. } => 1 + steps_depth(body),
            Step::Repeat { step, .. } => 1 + step.depth(),
            Step::Alternation(branches) => {
                1 + branches.iter().map(|branch| steps_depth(branch)).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

fn steps_depth(steps: &[Step]) -> usize {
    steps.iter().map(Step::depth).max().unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Bounds {
    /// `*`
    ZeroOrMore,
    /// `?`
    ZeroOrOne,
    /// `+`
    OneOrMore,
    /// `{n}`
    Exactly(Expression),
    /// `{n,}`
    AtLeast(Expression),
    /// `{n,m}`
    Between(Expression, Expression),
}

/// Modifiers on a source backreference relating it to the first range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstModifier {
    /// `:first`, the group's value on the first range.
    First,
    /// `:-first`, the current value with the first range's value stripped
    /// from its front.
    MinusFirst,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumberFormat {
    /// `fixed(k)`
    pub fixed: Option<usize>,
    /// `simplify`
    pub simplify: bool,
}

impl NumberFormat {
    pub fn format(&self, value: f64) -> String {
        let Some(digits) = self.fixed else {
            return plain(value);
        };
        if self.simplify && value.fract() == 0.0 {
            return plain(value);
        }
        let mut text = to_fixed(value, digits);
        if self.simplify && digits > 0 {
            let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
            text.truncate(trimmed);
        }
        text
    }
}

/// Fractional digits in the exact decimal expansion of the smallest
/// subnormal `f64`; no finite value needs more.
const EXACT_DIGITS: usize = 1074;

/// `value` with `digits` decimal places, rounding halves of the exact value
/// away from zero. Negative zero renders unsigned.
fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() || value.abs() >= 1e21 {
        return plain(value);
    }
    let exact = format!("{:.*}", EXACT_DIGITS.max(digits + 1), value.abs());
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> = whole
        .bytes()
        .chain(fraction.bytes().take(digits))
        .collect();
    if fraction.as_bytes().get(digits).is_some_and(|&next| next >= b'5') {
        let carried = kept.iter_mut().rev().all(|d| {
            if *d == b'9' {
                *d = b'0';
                true
            } else {
                *d += 1;
                false
            }
        });
        if carried {
            kept.insert(0, b'1');
        }
    }

    let whole_len = kept.len() - digits;
    let mut text = String::with_capacity(kept.len() + 2);
    if value < 0.0 {
        text.push('-');
    }
    text.extend(kept[..whole_len].iter().map(|&d| char::from(d)));
    if digits > 0 {
        text.push('.');
        text.extend(kept[whole_len..].iter().map(|&d| char::from(d)));
    }
    text
}

/// Shortest decimal rendering; integral values have no fraction.
fn plain(value: f64) -> String {
    if value == 0.0 {
        // Also folds -0 into 0.
        "0".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(digits: usize, simplify: bool) -> NumberFormat {
        NumberFormat {
            fixed: Some(digits),
            simplify,
        }
    }

    #[test]
    fn test_plain_format() {
        let f = NumberFormat::default();
        assert_eq!(f.format(3.0), "3");
        assert_eq!(f.format(2.5), "2.5");
        assert_eq!(f.format(-0.0), "0");
        assert_eq!(f.format(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_fixed_format() {
        assert_eq!(fixed(2, false).format(1.0), "1.00");
        assert_eq!(fixed(2, false).format(2.345), "2.35");
        assert_eq!(fixed(0, false).format(2.4), "2");
        assert_eq!(fixed(2, false).format(1.005), "1.00");
        assert_eq!(fixed(1, false).format(-0.04), "-0.0");
    }

    #[test]
    fn test_fixed_rounds_halves_away_from_zero() {
        assert_eq!(fixed(0, false).format(2.5), "3");
        assert_eq!(fixed(2, false).format(0.125), "0.13");
        assert_eq!(fixed(0, false).format(-2.5), "-3");
        assert_eq!(fixed(1, false).format(9.95), "9.9");
        assert_eq!(fixed(0, false).format(9.5), "10");
        assert_eq!(fixed(1, false).format(99.96), "100.0");
    }

    #[test]
    fn test_fixed_drops_sign_of_negative_zero() {
        assert_eq!(fixed(1, false).format(-0.0), "0.0");
        assert_eq!(fixed(0, false).format(-0.0), "0");
    }

    #[test]
    fn test_simplify_trims_zeros() {
        assert_eq!(fixed(3, true).format(1.5), "1.5");
        assert_eq!(fixed(3, true).format(4.0), "4");
        assert_eq!(fixed(2, true).format(1.999), "2");
        assert_eq!(fixed(2, true).format(10.0), "10");
    }
}

//! Arithmetic expressions used by counted repetition, `{{expr}}` and `{{=expr}}`.
//!
//! | Term     | Value                                                        |
//! |----------|--------------------------------------------------------------|
//! | `12.5`   | Decimal literal                                              |
//! | `i`      | Innermost repetition counter, or the range index at top level |
//! | `j[k]`   | Repetition counter `k` levels out from the innermost         |
//! | `N`      | Number of source capture groups                              |
//! | `S[k]`   | Numeric value of source capture group `k` (0 if not numeric)  |
//!
//! Operators are `+ - * / %` with the usual precedence, unary `+`/`-`, and
//! parentheses. Arithmetic is done in `f64`.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::GenerationErrorKind;

/// Evaluation recurses once per level of the expression tree.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn from_char(c: char) -> Option<BinOp> {
        match c {
            '+' => Some(BinOp::Add),
            '-' => Some(BinOp::Sub),
            '*' => Some(BinOp::Mul),
            '/' => Some(BinOp::Div),
            '%' => Some(BinOp::Rem),
            _ => None,
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 2,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div => lhs / rhs,
            BinOp::Rem => lhs % rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// `i`
    Counter,
    /// `j[k]`
    OuterCounter(Box<Expr>),
    /// `N`
    SourceCount,
    /// `S[k]`
    SourceValue(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// Why an expression has no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    Syntax(String),
    NonNumeric,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(message) => f.write_str(message),
            Self::NonNumeric => f.write_str("Non-numeric result"),
        }
    }
}

/// Values visible to an expression while it is evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    /// Active repetition counters, outermost first.
    pub counters: &'a [usize],
    pub range_index: usize,
    pub source_values: &'a [f64],
}

impl Expr {
    /// Parse a complete expression.
    pub fn parse(text: &str) -> Result<Expr, ExprError> {
        let mut parser = ExprParser {
            chars: text.chars().peekable(),
        };
        let expr = parser.parse_binary(0)?;
        if let Some(c) = parser.chars.next() {
            return Err(ExprError::Syntax(format!("Unexpected character {c:?}")));
        }
        if expr.depth() > MAX_DEPTH {
            return Err(ExprError::Syntax(format!(
                "Expression nests more than {MAX_DEPTH} levels deep"
            )));
        }
        Ok(expr)
    }

    /// Height of the expression tree; a lone term has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Counter | Expr::SourceCount => 1,
            Expr::OuterCounter(inner) | Expr::SourceValue(inner) | Expr::Neg(inner) => {
                1 + inner.depth()
            }
            Expr::Binary(_, lhs, rhs) => 1 + lhs.depth().max(rhs.depth()),
        }
    }

    /// True when the expression refers to no variables.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Number(_) => true,
            Expr::Counter | Expr::OuterCounter(_) | Expr::SourceCount | Expr::SourceValue(_) => {
                false
            }
            Expr::Neg(inner) => inner.is_constant(),
            Expr::Binary(_, lhs, rhs) => lhs.is_constant() && rhs.is_constant(),
        }
    }

    pub fn eval(&self, scope: &Scope<'_>) -> Result<f64, ExprError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Counter => Ok(scope
                .counters
                .last()
                .map_or(scope.range_index, |&c| c) as f64),
            Expr::OuterCounter(k) => {
                let k = index_value(k.eval(scope)?)?;
                let counters = scope.counters;
                counters
                    .len()
                    .checked_sub(k + 1)
                    .map(|at| counters[at] as f64)
                    .ok_or(ExprError::NonNumeric)
            }
            Expr::SourceCount => Ok(scope.source_values.len() as f64),
            Expr::SourceValue(k) => {
                let k = index_value(k.eval(scope)?)?;
                scope
                    .source_values
                    .get(k)
                    .copied()
                    .ok_or(ExprError::NonNumeric)
            }
            Expr::Neg(inner) => Ok(-inner.eval(scope)?),
            Expr::Binary(op, lhs, rhs) => Ok(op.apply(lhs.eval(scope)?, rhs.eval(scope)?)),
        }
    }

    /// Evaluate, rejecting NaN and infinite results.
    pub fn eval_finite(&self, scope: &Scope<'_>) -> Result<f64, ExprError> {
        let value = self.eval(scope)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NonNumeric)
        }
    }
}

/// A non-negative integral index, as accepted by `j[...]` and `S[...]`.
pub fn index_value(value: f64) -> Result<usize, ExprError> {
    if value >= 0.0 && value.fract() == 0.0 && value <= usize::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(ExprError::NonNumeric)
    }
}

struct ExprParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl ExprParser<'_> {
    /// Precedence climbing: parse operands joined by operators binding at
    /// least as tightly as `min_prec`.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.chars.peek().copied().and_then(BinOp::from_char) {
            if op.precedence() <= min_prec {
                break;
            }
            self.chars.next();
            let rhs = self.parse_binary(op.precedence())?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        match self.chars.peek() {
            Some('-') => {
                self.chars.next();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some('+') => {
                self.chars.next();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.chars.next() {
            None => Err(incomplete()),
            Some('(') => {
                let inner = self.parse_binary(0)?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('i') => Ok(Expr::Counter),
            Some('N') => Ok(Expr::SourceCount),
            Some('j') => Ok(Expr::OuterCounter(Box::new(self.parse_subscript('j')?))),
            Some('S') => Ok(Expr::SourceValue(Box::new(self.parse_subscript('S')?))),
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(c),
            Some(c) => Err(ExprError::Syntax(format!("Unexpected character {c:?}"))),
        }
    }

    fn parse_subscript(&mut self, name: char) -> Result<Expr, ExprError> {
        match self.chars.next() {
            Some('[') => {}
            None => return Err(incomplete()),
            Some(_) => return Err(ExprError::Syntax(format!("Expected '[' after {name:?}"))),
        }
        let index = self.parse_binary(0)?;
        self.expect(']')?;
        Ok(index)
    }

    fn parse_number(&mut self, first: char) -> Result<Expr, ExprError> {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s.parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| ExprError::Syntax(format!("Invalid number {s:?}")))
    }

    fn expect(&mut self, want: char) -> Result<(), ExprError> {
        match self.chars.next() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(ExprError::Syntax(format!(
                "Expected {want:?}, found {c:?}"
            ))),
            None => Err(incomplete()),
        }
    }
}

fn incomplete() -> ExprError {
    ExprError::Syntax("Incomplete expression".to_string())
}

/// An expression as written in a pattern, parsed once at compile time.
///
/// Syntax errors are kept rather than reported immediately; they surface as
/// generation errors when the expression is first needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub text: String,
    parsed: Result<Expr, ExprError>,
}

impl Expression {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            parsed: Expr::parse(text),
        }
    }

    /// The value of a variable-free expression, if it has one.
    pub fn constant_value(&self) -> Option<f64> {
        match &self.parsed {
            Ok(expr) if expr.is_constant() => expr.eval_finite(&Scope::default()).ok(),
            _ => None,
        }
    }

    pub fn eval(&self, scope: &Scope<'_>) -> Result<f64, GenerationErrorKind> {
        let result = match &self.parsed {
            Ok(expr) => expr.eval_finite(scope),
            Err(err) => Err(err.clone()),
        };
        result.map_err(|err| match err {
            ExprError::Syntax(message) => GenerationErrorKind::ExpressionSyntax {
                expression: self.text.clone(),
                message,
            },
            ExprError::NonNumeric => GenerationErrorKind::NonNumeric {
                expression: self.text.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> Result<f64, ExprError> {
        eval_in(text, &Scope::default())
    }

    fn eval_in(text: &str, scope: &Scope<'_>) -> Result<f64, ExprError> {
        Expr::parse(text)?.eval_finite(scope)
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("42"), Ok(42.0));
        assert_eq!(eval("2.5"), Ok(2.5));
        assert_eq!(eval(".5"), Ok(0.5));
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("1+2*3"), Ok(7.0));
        assert_eq!(eval("(1+2)*3"), Ok(9.0));
        assert_eq!(eval("10-4-3"), Ok(3.0));
        assert_eq!(eval("100/10/5"), Ok(2.0));
        assert_eq!(eval("7%4*2"), Ok(6.0));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(eval("-3+5"), Ok(2.0));
        assert_eq!(eval("2--1"), Ok(3.0));
        assert_eq!(eval("+4"), Ok(4.0));
        assert_eq!(eval("-(2*3)"), Ok(-6.0));
    }

    #[test]
    fn test_remainder_follows_dividend_sign() {
        assert_eq!(eval("-7%3"), Ok(-1.0));
    }

    #[test]
    fn test_counters() {
        let counters = [4, 1];
        let scope = Scope {
            counters: &counters,
            range_index: 9,
            source_values: &[],
        };
        assert_eq!(eval_in("i", &scope), Ok(1.0));
        assert_eq!(eval_in("j[0]", &scope), Ok(1.0));
        assert_eq!(eval_in("j[1]", &scope), Ok(4.0));
        assert_eq!(eval_in("j[2]", &scope), Err(ExprError::NonNumeric));
        assert_eq!(eval_in("j[0.5]", &scope), Err(ExprError::NonNumeric));
    }

    #[test]
    fn test_counter_outside_repetition_is_range_index() {
        let scope = Scope {
            counters: &[],
            range_index: 3,
            source_values: &[],
        };
        assert_eq!(eval_in("i+1", &scope), Ok(4.0));
    }

    #[test]
    fn test_source_values() {
        let values = [10.0, 2.5];
        let scope = Scope {
            counters: &[],
            range_index: 0,
            source_values: &values,
        };
        assert_eq!(eval_in("N", &scope), Ok(2.0));
        assert_eq!(eval_in("S[1]*2", &scope), Ok(5.0));
        assert_eq!(eval_in("S[N-2]", &scope), Ok(10.0));
        assert_eq!(eval_in("S[2]", &scope), Err(ExprError::NonNumeric));
    }

    #[test]
    fn test_division_by_zero_is_not_a_number() {
        assert_eq!(eval("1/0"), Err(ExprError::NonNumeric));
        assert_eq!(eval("0/0"), Err(ExprError::NonNumeric));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            Expr::parse("1+"),
            Err(ExprError::Syntax("Incomplete expression".into()))
        );
        assert!(matches!(Expr::parse("(1"), Err(ExprError::Syntax(_))));
        assert!(matches!(Expr::parse("1)"), Err(ExprError::Syntax(_))));
        assert!(matches!(Expr::parse("j+1"), Err(ExprError::Syntax(_))));
        assert!(matches!(Expr::parse("1.2.3"), Err(ExprError::Syntax(_))));
        assert!(matches!(Expr::parse("2i"), Err(ExprError::Syntax(_))));
    }

    #[test]
    fn test_long_operator_chains_are_bounded() {
        let sum = vec!["1"; MAX_DEPTH].join("+");
        assert_eq!(eval(&sum), Ok(MAX_DEPTH as f64));

        let longer = vec!["1"; MAX_DEPTH + 1].join("+");
        assert!(matches!(Expr::parse(&longer), Err(ExprError::Syntax(m)) if m.contains("nests")));
    }

    #[test]
    fn test_constant_detection() {
        assert_eq!(Expression::new("2*3").constant_value(), Some(6.0));
        assert_eq!(Expression::new("i+1").constant_value(), None);
        assert_eq!(Expression::new("1+").constant_value(), None);
    }

    #[test]
    fn test_expression_errors_carry_text() {
        let err = Expression::new("S[").eval(&Scope::default()).unwrap_err();
        assert_eq!(
            err,
            GenerationErrorKind::ExpressionSyntax {
                expression: "S[".into(),
                message: "Incomplete expression".into(),
            }
        );
        let err = Expression::new("1/0").eval(&Scope::default()).unwrap_err();
        assert_eq!(
            err,
            GenerationErrorKind::NonNumeric {
                expression: "1/0".into()
            }
        );
    }
}

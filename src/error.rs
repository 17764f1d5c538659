//! Errors raised while compiling a pattern or generating text from it.

use std::fmt;

/// The pattern could not be consumed in full by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The longest prefix the grammar accepted.
    pub consumed: String,
    /// Everything after `consumed`.
    pub remainder: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to parse pattern, consumed: {:?}, unable to parse: {:?}",
            self.consumed, self.remainder
        )
    }
}

impl std::error::Error for ParseError {}

/// A repetition whose bounds cannot be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MinimumAboveUpperBound {
        minimum: usize,
        upper_bound: usize,
        construct: String,
    },
    BoundsOutOfOrder {
        construct: String,
    },
    InvalidNumber {
        text: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinimumAboveUpperBound {
                minimum,
                upper_bound,
                construct,
            } => write!(
                f,
                "Invalid pattern, minimum ({minimum}) > upper bound ({upper_bound}) in: {construct}"
            ),
            Self::BoundsOutOfOrder { construct } => {
                write!(f, "Invalid pattern, numbers in wrong order in: {construct}")
            }
            Self::InvalidNumber { text } => write!(f, "Invalid number in pattern: {text}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors detected before a generator exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Parse(ParseError),
    Config(ConfigError),
    /// A quantifier with nothing before it to repeat.
    MissingOperand { construct: String },
    /// Groups, repetitions and alternations nested past `limit` levels.
    TooDeep { limit: usize },
    /// A pattern longer than `limit` bytes.
    TooLong { length: usize, limit: usize },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => err.fmt(f),
            Self::Config(err) => err.fmt(f),
            Self::MissingOperand { construct } => {
                write!(f, "Nothing to repeat before: {construct}")
            }
            Self::TooDeep { limit } => {
                write!(f, "Pattern nests more than {limit} levels deep")
            }
            Self::TooLong { length, limit } => {
                write!(f, "Pattern is {length} bytes long, the limit is {limit}")
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::MissingOperand { .. } | Self::TooDeep { .. } | Self::TooLong { .. } => None,
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<ConfigError> for CompileError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// What went wrong while generating the text for one range.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationErrorKind {
    /// `\N` referenced a group that has not been generated.
    UnknownGroup(usize),
    /// `{{expr}}` evaluated to an index with no source capture group.
    UnknownSourceGroup { construct: String, index: String },
    /// An expression produced something other than a finite number.
    NonNumeric { expression: String },
    ExpressionSyntax { expression: String, message: String },
    /// A repetition count that is negative or not finite.
    InvalidCount { construct: String, count: f64 },
    /// Repetition bounds computed at generation time were unusable.
    Config(ConfigError),
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownGroup(n) => write!(f, "Unknown group: \\{n}"),
            Self::UnknownSourceGroup { construct, index } => {
                write!(f, "Unknown original text group: {construct} => {{{{{index}}}}}")
            }
            Self::NonNumeric { expression } => write!(f, "Error calculating: {expression}"),
            Self::ExpressionSyntax {
                expression,
                message,
            } => write!(f, "{message} in {expression}"),
            Self::InvalidCount { construct, count } => {
                write!(f, "Invalid repetition count ({count}) in: {construct}")
            }
            Self::Config(err) => err.fmt(f),
        }
    }
}

/// A generation failure, tagged with the range it happened in.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationError {
    pub range_index: usize,
    pub kind: GenerationErrorKind,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "range {}: {}", self.range_index, self.kind)
    }
}

impl std::error::Error for GenerationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_reports_remainder() {
        let err = ParseError {
            consumed: "x".into(),
            remainder: "(".into(),
        };
        assert_eq!(
            err.to_string(),
            r#"Unable to parse pattern, consumed: "x", unable to parse: "(""#
        );
    }

    #[test]
    fn test_source_group_message_shows_resolved_index() {
        let kind = GenerationErrorKind::UnknownSourceGroup {
            construct: "{{i+3}}".into(),
            index: "3".into(),
        };
        assert_eq!(
            kind.to_string(),
            "Unknown original text group: {{i+3}} => {{3}}"
        );
    }

    #[test]
    fn test_generation_error_names_the_range() {
        let err = GenerationError {
            range_index: 2,
            kind: GenerationErrorKind::UnknownGroup(1),
        };
        assert_eq!(err.to_string(), r"range 2: Unknown group: \1");
    }

    #[test]
    fn test_size_limits_are_named() {
        assert_eq!(
            CompileError::TooDeep { limit: 256 }.to_string(),
            "Pattern nests more than 256 levels deep"
        );
        assert_eq!(
            CompileError::TooLong {
                length: 70000,
                limit: 65536
            }
            .to_string(),
            "Pattern is 70000 bytes long, the limit is 65536"
        );
    }
}

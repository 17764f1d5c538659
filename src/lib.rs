//! Text generation from regular-expression-like patterns.
//!
//! A generator pattern describes text to produce rather than text to match.
//! Each target range of an operation gets its own generated text, which can
//! refer to the range's index, to repetition counters, and to capture groups
//! of the range's original text.
//!
//! # Example
//!
//! ```rust
//! use regen::{Config, Operation, SourceMatcher, compile};
//!
//! let generator = compile("{{1}}_{{=i+1:fixed(1)}}", &Config::default()).unwrap();
//! let mut operation = Operation::new(generator, SourceMatcher::new(r"(\w+)").unwrap());
//!
//! let outcomes = operation.run(["alpha", "beta"]);
//! assert_eq!(outcomes[0].text_or("alpha"), "alpha_1.0");
//! assert_eq!(outcomes[1].text_or("beta"), "beta_2.0");
//! ```

mod config;
pub mod error;
mod generator;
mod operation;
pub mod pattern;
mod source;

pub use config::{Alphabet, Config, Settings};
pub use error::{CompileError, ConfigError, GenerationError, GenerationErrorKind, ParseError};
pub use generator::Generator;
pub use operation::{Operation, RangeOutcome};
pub use pattern::{CharSet, compile, parse_tree};
pub use source::SourceMatcher;

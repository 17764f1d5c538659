//! Generator pattern language.
//!
//! A pattern reads like a regular expression but describes text to
//! *produce*. It is parsed against a declarative grammar, compiled into a
//! list of steps, and evaluated by a [`Generator`].
//!
//! # Pattern syntax
//!
//! | Token                     | Meaning                                         |
//! |---------------------------|-------------------------------------------------|
//! | `x`                       | Literal character                               |
//! | `\x`                      | Escaped meta character (`^${}[]().\|*+?\`)      |
//! | `.`                       | One character of the base alphabet              |
//! | `\d` `\D`                 | Digit / non-digit                               |
//! | `\s` `\S`                 | Whitespace / non-whitespace                     |
//! | `\w` `\W`                 | Word / non-word character                       |
//! | `[a-z_]`                  | One character from the list                     |
//! | `[^a-z]`                  | One base character not in the list              |
//! | `X*` `X+` `X?`            | Repeat 0..U, 1..U, 0..1 times                   |
//! | `X{n}` `X{n,}` `X{n,m}`   | Repeat n, n..U, n..m times                      |
//! | `(X)`                     | Capturing group                                 |
//! | `\N`                      | Text generated for group N                      |
//! | `X\|Y`                    | Either alternative                              |
//! | `{{e}}`                   | Source capture group number `e`                 |
//! | `{{e:first}}`             | Same group as captured on the first range       |
//! | `{{e:-first}}`            | Current group minus the first range's prefix    |
//! | `{{=e}}`                  | Value of expression `e`                         |
//! | `{{=e:fixed(k)}}`         | ... with `k` decimal places                     |
//! | `{{=e:fixed(k):simplify}}`| ... without trailing zeros                      |
//!
//! `U` is the configured upper bound. Counts and `e` are arithmetic over
//! numbers, `+ - * / %`, parentheses and the variables `i` (innermost loop
//! counter, or the range index outside any loop), `j[k]` (loop counter `k`
//! levels out), `N` (number of source groups) and `S[k]` (numeric value of
//! source group `k`).

pub mod ast;
pub mod builder;
pub mod charset;
pub mod expr;
pub mod grammar;
pub mod parser;

use std::thread;

use crate::config::Config;
use crate::error::CompileError;
use crate::generator::Generator;

pub use charset::CharSet;
pub use grammar::Grammar;
pub use parser::{ParseNode, parse};

/// Longest pattern accepted by [`compile`] and [`parse_tree`], in bytes.
pub const MAX_PATTERN_LEN: usize = 64 * 1024;

/// Patterns up to this length are parsed on the caller's stack.
const INLINE_PATTERN_LEN: usize = 256;

/// Parser recursion grows with pattern length; longer patterns are parsed
/// on a worker thread with this much stack per byte, on top of `BASE_STACK`.
const STACK_PER_BYTE: usize = 16 * 1024;
const BASE_STACK: usize = 1024 * 1024;

/// Compile `pattern` into a generator using the alphabets of `config`.
pub fn compile(pattern: &str, config: &Config) -> Result<Generator, CompileError> {
    with_parse_stack(pattern, || {
        let root = parse(Grammar::get(), pattern)?;
        let program = builder::build(&root, config)?;
        Ok(Generator::new(program, config))
    })
}

/// Render the parse tree of `pattern`, one node per line.
pub fn parse_tree(pattern: &str) -> Result<String, CompileError> {
    with_parse_stack(pattern, || Ok(parse(Grammar::get(), pattern)?.to_string()))
}

/// Run `task` over `pattern` with a stack deep enough for its parse tree.
fn with_parse_stack<T, F>(pattern: &str, task: F) -> Result<T, CompileError>
where
    T: Send,
    F: FnOnce() -> Result<T, CompileError> + Send,
{
    let too_long = || CompileError::TooLong {
        length: pattern.len(),
        limit: MAX_PATTERN_LEN,
    };
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(too_long());
    }
    if pattern.len() <= INLINE_PATTERN_LEN {
        return task();
    }
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("regen-parse".to_string())
            .stack_size(BASE_STACK + pattern.len() * STACK_PER_BYTE)
            .spawn_scoped(scope, task)
            .map_err(|_| too_long())?;
        match worker.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

//! Generating replacements for the ranges of one host operation.

use crate::error::GenerationError;
use crate::generator::Generator;
use crate::source::SourceMatcher;

/// The result of generating one range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeOutcome {
    pub index: usize,
    pub result: Result<String, GenerationError>,
}

impl RangeOutcome {
    /// The generated text, or `original` if generation failed.
    pub fn text_or<'a>(&'a self, original: &'a str) -> &'a str {
        match &self.result {
            Ok(text) => text,
            Err(_) => original,
        }
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.result.as_ref().err()
    }
}

/// Drives a compiled generator over an ordered list of ranges.
#[derive(Debug)]
pub struct Operation {
    generator: Generator,
    source: SourceMatcher,
}

impl Operation {
    pub fn new(generator: Generator, source: SourceMatcher) -> Self {
        Self { generator, source }
    }

    pub fn generator_mut(&mut self) -> &mut Generator {
        &mut self.generator
    }

    /// Generate one outcome per range, in order.
    ///
    /// Each range is generated with the capture groups of its own original
    /// text. A failure affects only the range it happens in.
    pub fn run<I, S>(&mut self, originals: I) -> Vec<RangeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.generator.reset_first_snapshot();
        originals
            .into_iter()
            .enumerate()
            .map(|(index, original)| {
                let groups = self.source.captures(original.as_ref());
                self.generator.set_range_context(index, groups);
                RangeOutcome {
                    index,
                    result: self.generator.generate(),
                }
            })
            .collect()
    }
}

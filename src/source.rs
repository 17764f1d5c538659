//! Capture groups of the original text of each range.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

const FLAGS: &str = "gims";

/// Split a leading flag group such as `(?gi)` from `pattern`.
///
/// Groups with any other letter are left for the regex engine.
fn split_flags(pattern: &str) -> (&str, &str) {
    pattern
        .strip_prefix("(?")
        .and_then(|rest| rest.split_once(')'))
        .filter(|(flags, _)| !flags.is_empty() && flags.chars().all(|c| FLAGS.contains(c)))
        .unwrap_or(("", pattern))
}

/// Matches the original text of a range and extracts its capture groups.
///
/// The pattern may start with a flag group: `i` ignores case, `m` makes `^`
/// and `$` match at line breaks, `s` lets `.` match a newline and `g` selects
/// global mode, where every match is reported instead of one match and its
/// groups.
#[derive(Debug, Clone)]
pub struct SourceMatcher {
    regex: Regex,
    global: bool,
}

impl SourceMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let (flags, body) = split_flags(pattern);
        let regex = RegexBuilder::new(body)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .with_context(|| format!("Invalid original text pattern: {pattern}"))?;
        Ok(Self {
            regex,
            global: flags.contains('g'),
        })
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    /// Source groups for `text`.
    ///
    /// Without the `g` flag: the whole match followed by every capture group,
    /// with `None` for groups that did not participate. With it: every
    /// non-overlapping match. No match gives an empty list either way.
    pub fn captures(&self, text: &str) -> Vec<Option<String>> {
        if self.global {
            return self
                .regex
                .find_iter(text)
                .map(|m| Some(m.as_str().to_string()))
                .collect();
        }
        match self.regex.captures(text) {
            Some(caps) => caps
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
            None => Vec::new(),
        }
    }
}

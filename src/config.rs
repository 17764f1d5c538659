//! Generator configuration: alphabets and the cap on unbounded repetition.

use std::sync::Arc;

use crate::pattern::charset::CharSet;

/// Raw settings, as a host would read them from its own configuration.
///
/// Alphabets are lists of char specs (see [`CharSet::from_specs`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_charset: Vec<String>,
    pub whitespace_charset: Vec<String>,
    pub digit_charset: Vec<String>,
    pub word_charset: Vec<String>,
    /// Stand-in for "unlimited" in `*`, `+` and `{n,}`.
    pub upper_bound: usize,
}

impl Default for Settings {
    fn default() -> Self {
        fn specs(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            base_charset: specs(&[" -~"]),
            whitespace_charset: specs(&[" "]),
            digit_charset: specs(&["0-9"]),
            word_charset: specs(&["a-z", "A-Z", "0-9", "_"]),
            upper_bound: 10,
        }
    }
}

/// Alphabets available to single-character constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// `.`
    Base,
    /// `\s`
    Whitespace,
    /// `\S`
    NonWhitespace,
    /// `\d`
    Digit,
    /// `\D`
    NonDigit,
    /// `\w`
    Word,
    /// `\W`
    NonWord,
}

/// Alphabets derived from [`Settings`], ready for compiling patterns.
///
/// Every alphabet is a subset of the base alphabet; the negated ones are
/// complements against it.
#[derive(Debug, Clone)]
pub struct Config {
    base: Arc<CharSet>,
    whitespace: Arc<CharSet>,
    non_whitespace: Arc<CharSet>,
    digit: Arc<CharSet>,
    non_digit: Arc<CharSet>,
    word: Arc<CharSet>,
    non_word: Arc<CharSet>,
    upper_bound: usize,
}

impl Config {
    pub fn new(settings: &Settings) -> Self {
        let base = CharSet::from_specs(&settings.base_charset);
        let whitespace = CharSet::from_specs(&settings.whitespace_charset).intersection(&base);
        let digit = CharSet::from_specs(&settings.digit_charset).intersection(&base);
        let word = CharSet::from_specs(&settings.word_charset).intersection(&base);
        Self {
            non_whitespace: Arc::new(base.difference(&whitespace)),
            non_digit: Arc::new(base.difference(&digit)),
            non_word: Arc::new(base.difference(&word)),
            whitespace: Arc::new(whitespace),
            digit: Arc::new(digit),
            word: Arc::new(word),
            base: Arc::new(base),
            upper_bound: settings.upper_bound,
        }
    }

    pub fn alphabet(&self, alphabet: Alphabet) -> &Arc<CharSet> {
        match alphabet {
            Alphabet::Base => &self.base,
            Alphabet::Whitespace => &self.whitespace,
            Alphabet::NonWhitespace => &self.non_whitespace,
            Alphabet::Digit => &self.digit,
            Alphabet::NonDigit => &self.non_digit,
            Alphabet::Word => &self.word,
            Alphabet::NonWord => &self.non_word,
        }
    }

    pub fn base(&self) -> &CharSet {
        &self.base
    }

    pub fn upper_bound(&self) -> usize {
        self.upper_bound
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(&Settings::default())
    }
}

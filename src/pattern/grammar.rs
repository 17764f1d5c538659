//! The declarative grammar of generator patterns.
//!
//! Rules are written as `(non-terminal, production)` pairs. A production is a
//! space-separated list of tokens: a token naming a non-terminal refers to it,
//! any other token is a terminal matching one of its characters (or, with a
//! leading `~`, any character *not* among them). An empty production matches
//! the empty string.
//!
//! Several non-terminals are deliberately ambiguous (`REGEX` may be a `TERM` or
//! an `ALTERNATIVES` that starts with the same `TERM`); the parser resolves
//! them by taking the longest match.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// Name of the start symbol.
pub const START_SYMBOL: &str = "REGEX";

/// Production rules, in the order alternatives are tried.
const RULES: &[(&str, &str)] = &[
    ("REGEX", "TERM"),
    ("REGEX", "ALTERNATIVES"),
    ("ALTERNATIVES", "TERM | REGEX"),
    ("TERM", "FACTOR TERM"),
    ("TERM", ""),
    ("FACTOR", "BASE MULTIPLIERS"),
    ("BASE", "CHAR"),
    ("BASE", "DOT"),
    ("BASE", "PARENS"),
    ("BASE", "BACKREF"),
    ("BASE", "SRCBACKREF_EXPR"),
    ("BASE", "NUMERIC_EXPR"),
    ("PARENS", "( REGEX )"),
    ("MULTIPLIERS", "MULTIPLIER MULTIPLIERS"),
    ("MULTIPLIERS", ""),
    ("MULTIPLIER", "ZERO_OR_MORE"),
    ("MULTIPLIER", "ZERO_OR_ONE"),
    ("MULTIPLIER", "ONE_OR_MORE"),
    ("MULTIPLIER", "NUMBER_OF"),
    ("MULTIPLIER", "NUMBER_OR_MORE_OF"),
    ("MULTIPLIER", "NUMBER_RANGE_OF"),
    ("ZERO_OR_MORE", "*"),
    ("ZERO_OR_ONE", "?"),
    ("ONE_OR_MORE", "+"),
    ("NUMBER_OF", "{ EXPRESSION }"),
    ("NUMBER_OR_MORE_OF", "{ EXPRESSION , }"),
    ("NUMBER_RANGE_OF", "{ EXPRESSION , EXPRESSION }"),
    ("DOT", "."),
    ("CHAR", "NON_META_CHAR"),
    ("CHAR", "ESC_META_CHAR"),
    ("CHAR", "DIGIT"),
    ("CHAR", "WHITESPACE"),
    ("CHAR", "NON_WHITESPACE"),
    ("CHAR", "DIGIT_ALIAS"),
    ("CHAR", "NON_DIGIT_ALIAS"),
    ("CHAR", "WORD_CHAR"),
    ("CHAR", "NON_WORD_CHAR"),
    // `[^a]` also parses as an inclusive list of `^` and `a`; on that tie
    // the exclusive reading must come first.
    ("CHAR", "EXCLUSIVE_CHAR_LIST"),
    ("CHAR", "INCLUSIVE_CHAR_LIST"),
    ("INCLUSIVE_CHAR_LIST", "[ CHAR_SPEC CHAR_SPECS ]"),
    ("EXCLUSIVE_CHAR_LIST", "[ ^ CHAR_SPEC CHAR_SPECS ]"),
    ("CHAR_SPEC", "CHAR_SPEC_CHAR"),
    ("CHAR_SPEC", "RANGE"),
    ("RANGE", "CHAR_SPEC_CHAR - CHAR_SPEC_CHAR"),
    ("CHAR_SPECS", "CHAR_SPEC CHAR_SPECS"),
    ("CHAR_SPECS", ""),
    ("CHAR_SPEC_CHAR", "NON_META_CHAR_SPEC"),
    ("CHAR_SPEC_CHAR", "ESC_META_CHAR_SPEC"),
    ("META_CHAR", "^${}[]().|*+?\\"),
    ("NON_META_CHAR", "~^${}[]().|*+?\\"),
    ("META_CHAR_SPEC", "]"),
    ("NON_META_CHAR_SPEC", "~]"),
    ("DIGIT", "1234567890"),
    ("DIGITS", "DIGIT DIGITS"),
    ("DIGITS", ""),
    ("NUMBER", "DIGIT DIGITS"),
    ("SRCBACKREF_EXPR", "{ { EXPRESSION OPT_BACKREF_MOD } }"),
    ("NUMERIC_EXPR", "{ { = EXPRESSION OPT_EXPR_MODS } }"),
    ("EXPR_CHAR", "ij[]+-*/%()SN"),
    ("EXPR_CHAR", "DIGIT"),
    ("EXPR_CHAR", "DOT"),
    ("EXPR_CHARS", "EXPR_CHAR EXPR_CHARS"),
    ("EXPR_CHARS", ""),
    ("EXPRESSION", "EXPR_CHAR EXPR_CHARS"),
    ("OPT_BACKREF_MOD", ": BACKREF_MOD"),
    ("OPT_BACKREF_MOD", ""),
    ("BACKREF_MOD", "BACKREF_MOD_FIRST"),
    ("BACKREF_MOD", "BACKREF_MOD_MIN_FIRST"),
    ("BACKREF_MOD_FIRST", "f i r s t"),
    ("BACKREF_MOD_MIN_FIRST", "- f i r s t"),
    ("OPT_EXPR_MODS", ": EXPR_MOD OPT_EXPR_MODS"),
    ("OPT_EXPR_MODS", ""),
    ("EXPR_MOD", "f i x e d ( NUMBER )"),
    ("EXPR_MOD", "s i m p l i f y"),
    ("BACKREF", "\\ DIGIT"),
    ("ESC_META_CHAR", "\\ META_CHAR"),
    ("ESC_META_CHAR_SPEC", "\\ META_CHAR_SPEC"),
    ("WHITESPACE", "\\ s"),
    ("NON_WHITESPACE", "\\ S"),
    ("DIGIT_ALIAS", "\\ d"),
    ("NON_DIGIT_ALIAS", "\\ D"),
    ("WORD_CHAR", "\\ w"),
    ("NON_WORD_CHAR", "\\ W"),
];

static GRAMMAR: Lazy<Grammar> = Lazy::new(|| Grammar::from_rules(RULES));

/// Index of a non-terminal within its [`Grammar`].
pub type NonTerminalId = usize;

/// A single-character test, or the empty-string match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    OneOf(Vec<char>),
    NoneOf(Vec<char>),
    Epsilon,
}

impl Terminal {
    fn from_token(token: &str) -> Self {
        match token.strip_prefix('~') {
            Some(rest) if !rest.is_empty() => Terminal::NoneOf(rest.chars().collect()),
            _ => Terminal::OneOf(token.chars().collect()),
        }
    }

    /// Test a single character. [`Terminal::Epsilon`] consumes nothing and
    /// never tests one.
    pub fn matches(&self, ch: char) -> bool {
        match self {
            Terminal::OneOf(chars) => chars.contains(&ch),
            Terminal::NoneOf(chars) => !chars.contains(&ch),
            Terminal::Epsilon => false,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::OneOf(chars) => write!(f, "{:?}", chars.iter().collect::<String>()),
            Terminal::NoneOf(chars) => {
                write!(f, "not one of: {:?}", chars.iter().collect::<String>())
            }
            Terminal::Epsilon => write!(f, "<epsilon>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Terminal(Terminal),
    NonTerminal(NonTerminalId),
}

/// An ordered sequence of symbols.
pub type Production = Vec<Symbol>;

#[derive(Debug)]
pub struct NonTerminal {
    pub name: &'static str,
    pub productions: Vec<Production>,
}

/// An immutable set of non-terminals with a start symbol.
#[derive(Debug)]
pub struct Grammar {
    non_terminals: Vec<NonTerminal>,
    by_name: HashMap<&'static str, NonTerminalId>,
    start: NonTerminalId,
}

impl Grammar {
    /// The generator pattern grammar, built on first use.
    pub fn get() -> &'static Grammar {
        &GRAMMAR
    }

    /// Build a grammar from rule pairs. The first rule names the start symbol.
    pub fn from_rules(rules: &[(&'static str, &'static str)]) -> Self {
        let mut by_name = HashMap::new();
        let mut non_terminals = Vec::new();
        for &(name, _) in rules {
            by_name.entry(name).or_insert_with(|| {
                non_terminals.push(NonTerminal {
                    name,
                    productions: Vec::new(),
                });
                non_terminals.len() - 1
            });
        }

        for &(name, production) in rules {
            let mut symbols: Production = production
                .split_whitespace()
                .map(|token| match by_name.get(token) {
                    Some(&id) => Symbol::NonTerminal(id),
                    None => Symbol::Terminal(Terminal::from_token(token)),
                })
                .collect();
            if symbols.is_empty() {
                symbols.push(Symbol::Terminal(Terminal::Epsilon));
            }
            non_terminals[by_name[name]].productions.push(symbols);
        }

        Grammar {
            non_terminals,
            by_name,
            start: 0,
        }
    }

    pub fn start(&self) -> NonTerminalId {
        self.start
    }

    pub fn non_terminal(&self, id: NonTerminalId) -> &NonTerminal {
        &self.non_terminals[id]
    }

    pub fn lookup(&self, name: &str) -> Option<NonTerminalId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.non_terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.non_terminals.is_empty()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nt in &self.non_terminals {
            for production in &nt.productions {
                write!(f, "{:<22}:", nt.name)?;
                for symbol in production {
                    match symbol {
                        Symbol::Terminal(t) => write!(f, " {t}")?,
                        Symbol::NonTerminal(id) => write!(f, " {}", self.non_terminals[*id].name)?,
                    }
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn productions(name: &str) -> &'static [Production] {
        let g = Grammar::get();
        &g.non_terminal(g.lookup(name).unwrap()).productions
    }

    #[test]
    fn test_start_symbol_is_regex() {
        let g = Grammar::get();
        assert_eq!(g.non_terminal(g.start()).name, START_SYMBOL);
    }

    #[test]
    fn test_productions_keep_declaration_order() {
        let base = productions("BASE");
        assert_eq!(base.len(), 6);
        let g = Grammar::get();
        assert_eq!(base[0], vec![Symbol::NonTerminal(g.lookup("CHAR").unwrap())]);
        assert_eq!(
            base[5],
            vec![Symbol::NonTerminal(g.lookup("NUMERIC_EXPR").unwrap())]
        );
    }

    #[test]
    fn test_empty_production_is_epsilon() {
        let term = productions("TERM");
        assert_eq!(term[1], vec![Symbol::Terminal(Terminal::Epsilon)]);
    }

    #[test]
    fn test_negated_terminal() {
        let non_meta = &productions("NON_META_CHAR")[0][0];
        let Symbol::Terminal(t) = non_meta else {
            panic!("expected terminal");
        };
        assert!(t.matches('a'));
        assert!(t.matches('5'));
        assert!(!t.matches('*'));
        assert!(!t.matches('\\'));
    }

    #[test]
    fn test_every_uppercase_token_is_a_non_terminal() {
        // A misspelt rule name would silently become a terminal.
        for (_, production) in RULES {
            for token in production.split_whitespace() {
                if token.len() > 1 && token.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                    assert!(Grammar::get().lookup(token).is_some(), "{token}");
                }
            }
        }
    }

    #[test]
    fn test_display_lists_every_production() {
        let text = Grammar::get().to_string();
        assert_eq!(text.lines().count(), RULES.len());
        assert!(text.contains("<epsilon>"));
    }
}

//! Backtracking, longest-match parser for generator patterns.
//!
//! Every alternative production of a non-terminal is tried against the same
//! input; the one consuming the most text wins, the first declared on ties.
//! Each symbol within a production contributes its own single longest match.
//! Results are memoized per `(non-terminal, offset)`, which keeps the
//! exhaustive search polynomial without changing which tree is chosen.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::ParseError;

use super::grammar::{Grammar, NonTerminalId, Symbol, Terminal};

/// What a parse tree node matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matched {
    Terminal,
    NonTerminal {
        id: NonTerminalId,
        name: &'static str,
    },
}

/// A node of the parse tree. `text` is the exact slice of the pattern it
/// consumed; children are present only for non-terminal matches.
#[derive(Debug)]
pub struct ParseNode<'a> {
    pub matched: Matched,
    pub text: &'a str,
    pub children: Vec<Rc<ParseNode<'a>>>,
}

impl<'a> ParseNode<'a> {
    /// The non-terminal name, or `None` for terminals.
    pub fn name(&self) -> Option<&'static str> {
        match self.matched {
            Matched::NonTerminal { name, .. } => Some(name),
            Matched::Terminal => None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// Outermost descendants named `name`, in tree order.
    ///
    /// The search does not look inside a node once it matches, so nested
    /// occurrences of the same non-terminal are not reported.
    pub fn find_all(&self, name: &str) -> Vec<&ParseNode<'a>> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'n>(&'n self, name: &str, found: &mut Vec<&'n ParseNode<'a>>) {
        if self.is(name) {
            found.push(self);
        } else {
            for child in &self.children {
                child.collect_named(name, found);
            }
        }
    }

    /// First node named `name` in pre-order, this node included.
    pub fn find_first(&self, name: &str) -> Option<&ParseNode<'a>> {
        if self.is(name) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_first(name))
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self.name() {
            Some(name) => writeln!(f, "{:indent$}{name}", "", indent = depth * 2)?,
            None if self.text.is_empty() => {
                writeln!(f, "{:indent$}<epsilon>", "", indent = depth * 2)?
            }
            None => writeln!(f, "{:indent$}{:?}", "", self.text, indent = depth * 2)?,
        }
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ParseNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Parse `input` from the grammar's start symbol.
///
/// Fails unless the whole input is consumed. Recursion depth grows with the
/// length of `input`; [`compile`](super::compile) and
/// [`parse_tree`](super::parse_tree) size a stack for it.
pub fn parse<'a>(grammar: &Grammar, input: &'a str) -> Result<Rc<ParseNode<'a>>, ParseError> {
    let mut parser = Parser {
        grammar,
        input,
        memo: HashMap::new(),
    };
    let consumed = parser
        .consume_non_terminal(grammar.start(), 0)
        .map(|root| (root.text.len(), root));
    match consumed {
        Some((len, root)) if len == input.len() => Ok(root),
        other => {
            let len = other.map(|(len, _)| len).unwrap_or(0);
            Err(ParseError {
                consumed: input[..len].to_string(),
                remainder: input[len..].to_string(),
            })
        }
    }
}

type Memo<'a> = HashMap<(NonTerminalId, usize), Option<Rc<ParseNode<'a>>>>;

struct Parser<'g, 'a> {
    grammar: &'g Grammar,
    input: &'a str,
    memo: Memo<'a>,
}

impl<'a> Parser<'_, 'a> {
    fn consume(&mut self, symbol: &Symbol, pos: usize) -> Option<Rc<ParseNode<'a>>> {
        match symbol {
            Symbol::Terminal(terminal) => self.consume_terminal(terminal, pos),
            Symbol::NonTerminal(id) => self.consume_non_terminal(*id, pos),
        }
    }

    fn consume_terminal(&self, terminal: &Terminal, pos: usize) -> Option<Rc<ParseNode<'a>>> {
        let end = match terminal {
            Terminal::Epsilon => pos,
            _ => {
                let ch = self.input[pos..].chars().next()?;
                if !terminal.matches(ch) {
                    return None;
                }
                pos + ch.len_utf8()
            }
        };
        Some(Rc::new(ParseNode {
            matched: Matched::Terminal,
            text: &self.input[pos..end],
            children: Vec::new(),
        }))
    }

    fn consume_non_terminal(&mut self, id: NonTerminalId, pos: usize) -> Option<Rc<ParseNode<'a>>> {
        if let Some(result) = self.memo.get(&(id, pos)) {
            return result.clone();
        }

        let grammar = self.grammar;
        let non_terminal = grammar.non_terminal(id);
        let mut candidates = Vec::new();
        for production in &non_terminal.productions {
            if let Some((children, end)) = self.consume_production(production, pos) {
                candidates.push(ParseNode {
                    matched: Matched::NonTerminal {
                        id,
                        name: non_terminal.name,
                    },
                    text: &self.input[pos..end],
                    children,
                });
            }
        }

        // `min_by_key` keeps the first of equal keys: longest, then earliest.
        let best = candidates
            .into_iter()
            .min_by_key(|node| Reverse(node.text.len()))
            .map(Rc::new);
        self.memo.insert((id, pos), best.clone());
        best
    }

    fn consume_production(
        &mut self,
        production: &[Symbol],
        pos: usize,
    ) -> Option<(Vec<Rc<ParseNode<'a>>>, usize)> {
        let mut children = Vec::with_capacity(production.len());
        let mut cur = pos;
        for symbol in production {
            let child = self.consume(symbol, cur)?;
            cur += child.text.len();
            children.push(child);
        }
        Some((children, cur))
    }
}

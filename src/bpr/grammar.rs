//! Grammar Engine
//!
//!     Bootstraparse markup is recognized by a declarative grammar: named rules composed from
//!     a handful of primitives (literals, anchored patterns, delimiter runs) and combinators
//!     (sequence, ordered choice, repetition, permutation, look-ahead). Rules emit tokens from
//!     the [token model](crate::bpr::token), so a successful parse of a line is already the
//!     token list the rest of the pipeline consumes.
//!
//!     The grammar is line oriented. Block constructs (headers, list items, table rows,
//!     structural markers, quotations) are anchored at the start of a line; inline markup
//!     and plain text fill the rest. The only multi-line rule is `code`, applied by the
//!     tokenizer to a buffered fenced block.
//!
//! Registry
//!
//!     All rules are built once into the process-wide [`Grammar`] and looked up by name:
//!
//!         let tokens = Grammar::global().parse_tokens("line", "# Title #")?;
//!
//!     Naming a rule that does not exist is an error, not a panic.

pub mod combinators;
pub mod engine;
mod rules;

pub use engine::{Match, Rule, RuleRef};
pub use rules::{CODE_FENCE, MAX_HEADER_LEVEL, STRUCTURAL_ELEMENTS};

use crate::bpr::token::{Content, Token};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Errors raised by the grammar registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// No rule registered under this name
    UnknownRule(String),
    /// A rule pattern failed to compile
    InvalidPattern(String),
}

impl std::fmt::Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::UnknownRule(name) => write!(f, "Unknown grammar rule: {}", name),
            GrammarError::InvalidPattern(msg) => write!(f, "Invalid rule pattern: {}", msg),
        }
    }
}

impl std::error::Error for GrammarError {}

static GRAMMAR: Lazy<Grammar> = Lazy::new(|| Grammar {
    rules: rules::build(),
});

/// Named rule registry.
pub struct Grammar {
    rules: HashMap<&'static str, RuleRef>,
}

impl Grammar {
    /// The shared, lazily built grammar.
    pub fn global() -> &'static Grammar {
        &GRAMMAR
    }

    pub fn get(&self, name: &str) -> Result<RuleRef, GrammarError> {
        self.rules
            .get(name)
            .cloned()
            .ok_or_else(|| GrammarError::UnknownRule(name.to_string()))
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.rules.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Apply a rule at the start of `text`. `Ok(None)` when it does not match.
    pub fn apply(&self, name: &str, text: &str) -> Result<Option<Match>, GrammarError> {
        Ok(self.get(name)?.apply(text, 0))
    }

    /// Output of the rule matched at the start of `text`; empty when it does not match.
    ///
    /// Like a prefix parse, text after the match is ignored.
    pub fn parse(&self, name: &str, text: &str) -> Result<Vec<Content>, GrammarError> {
        Ok(self
            .apply(name, text)?
            .map(|found| found.output)
            .unwrap_or_default())
    }

    /// Tokens produced by [`parse`](Self::parse), raw fragments skipped.
    pub fn parse_tokens(&self, name: &str, text: &str) -> Result<Vec<Token>, GrammarError> {
        Ok(self
            .parse(name, text)?
            .into_iter()
            .filter_map(|item| match item {
                Content::Token(token) => Some(token),
                Content::Raw(_) => None,
            })
            .collect())
    }

    /// Whether the rule matches the whole of `text`.
    pub fn matches(&self, name: &str, text: &str) -> bool {
        matches!(self.apply(name, text), Ok(Some(found)) if found.end == text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpr::token::TokenKind;

    #[test]
    fn unknown_rule_is_an_error() {
        let err = Grammar::global().parse("nope", "text").unwrap_err();
        assert_eq!(err, GrammarError::UnknownRule("nope".to_string()));
        assert_eq!(err.to_string(), "Unknown grammar rule: nope");
    }

    #[test]
    fn registry_lists_core_rules() {
        let names = Grammar::global().names();
        for expected in ["line", "optional", "markup", "table_row", "code", "line_to_replace"] {
            assert!(names.contains(&expected), "missing rule {}", expected);
        }
    }

    #[test]
    fn parse_is_a_prefix_parse() {
        let grammar = Grammar::global();
        let out = grammar.parse("et_strong", "**rest").unwrap();
        assert_eq!(
            out,
            vec![Content::Token(Token::with_raw(TokenKind::EtStrong, &["**"]))]
        );
        assert!(!grammar.matches("et_strong", "**rest"));
        assert!(grammar.matches("et_strong", "**"));
        assert!(grammar.parse("et_strong", "rest").unwrap().is_empty());
    }
}

//! Document tokenizer
//!
//!     Turns preprocessed text into the flat token stream. Each line is run through the
//!     grammar `line` rule and followed by one `Linebreak` token, so the number of top-level
//!     linebreaks always equals the number of input lines.
//!
//!     Two constructs span lines and are buffered before tokenizing:
//!
//!     - Fenced code: an opening fence line (optionally naming a language) up to the next
//!       closing fence line becomes one `Code` token `["```", lang, body]`. A fence that is
//!       never closed is tokenized as ordinary lines.
//!     - Quotations: consecutive lines starting with `>` become one `BlockQuote` token whose
//!       content is the inline content of every line, author lines kept as
//!       `BlockQuoteAuthor` tokens.
//!
//!     Buffered blocks are followed by one linebreak per consumed line.
//!
//!     A line that produces no tokens at all (blank lines) yields an empty `Text` token.

use crate::bpr::grammar::{Grammar, GrammarError, RuleRef};
use crate::bpr::token::{Content, Token, TokenKind};
use std::iter;
use tracing::debug;

/// Line and document tokenizer over the named grammar rules.
pub struct Tokenizer {
    line: RuleRef,
    quotation: RuleRef,
    code: RuleRef,
    code_fence: RuleRef,
    code_close: RuleRef,
}

impl Tokenizer {
    pub fn new(grammar: &Grammar) -> Result<Self, GrammarError> {
        Ok(Self {
            line: grammar.get("line")?,
            quotation: grammar.get("quotation")?,
            code: grammar.get("code")?,
            code_fence: grammar.get("code_fence")?,
            code_close: grammar.get("code_close")?,
        })
    }

    /// Tokens of a single line, without the trailing linebreak.
    pub fn line(&self, line: &str) -> Vec<Token> {
        let tokens = self
            .line
            .apply(line, 0)
            .map(|found| found.tokens())
            .unwrap_or_default();
        if tokens.is_empty() {
            vec![Token::text("")]
        } else {
            tokens
        }
    }

    pub fn lines<S: AsRef<str>>(&self, lines: &[S]) -> Vec<Token> {
        let mut out = Vec::new();
        let mut idx = 0;
        while idx < lines.len() {
            let consumed = self
                .code_block(lines, idx, &mut out)
                .or_else(|| self.quotation_block(lines, idx, &mut out));
            match consumed {
                Some(count) => idx += count,
                None => {
                    out.extend(self.line(lines[idx].as_ref()));
                    out.push(Token::linebreak());
                    idx += 1;
                }
            }
        }
        debug!(lines = lines.len(), tokens = out.len(), "tokenized lines");
        out
    }

    pub fn document(&self, source: &str) -> Vec<Token> {
        let lines: Vec<&str> = source.lines().collect();
        self.lines(&lines)
    }

    fn code_block<S: AsRef<str>>(
        &self,
        lines: &[S],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Option<usize> {
        self.code_fence.apply(lines[start].as_ref(), 0)?;
        let close = start
            + 1
            + lines[start + 1..]
                .iter()
                .position(|line| self.code_close.apply(line.as_ref(), 0).is_some())?;
        let block = lines[start..=close]
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join("\n");
        let found = self
            .code
            .apply(&block, 0)
            .filter(|found| found.end == block.len())?;
        let consumed = close - start + 1;
        out.push(Token::new(TokenKind::Code, found.output));
        out.extend(iter::repeat_with(Token::linebreak).take(consumed));
        Some(consumed)
    }

    fn quotation_block<S: AsRef<str>>(
        &self,
        lines: &[S],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Option<usize> {
        let mut content: Vec<Content> = Vec::new();
        let mut consumed = 0;
        for line in &lines[start..] {
            let Some(found) = self.quotation.apply(line.as_ref(), 0) else {
                break;
            };
            for token in found.tokens() {
                if token.is(TokenKind::BlockQuote) {
                    content.extend(token.into_content());
                } else {
                    content.push(token.into());
                }
            }
            consumed += 1;
        }
        if consumed == 0 {
            return None;
        }
        out.push(Token::new(TokenKind::BlockQuote, content));
        out.extend(iter::repeat_with(Token::linebreak).take(consumed));
        Some(consumed)
    }
}

/// Tokenize a whole document with the global grammar.
pub fn tokenize(source: &str) -> Result<Vec<Token>, GrammarError> {
    Ok(Tokenizer::new(Grammar::global())?.document(source))
}

/// Tokenize pre-split lines with the global grammar.
pub fn tokenize_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Token>, GrammarError> {
    Ok(Tokenizer::new(Grammar::global())?.lines(lines))
}

//! Grammar engine core: the `Rule` interface and the text primitives.
//!
//! A rule is tried at a byte offset of a line and either fails or reports how far it
//! consumed plus the content it produced (raw fragments and tokens). Composition lives
//! in [combinators](super::combinators); this module only knows about characters.
//!
//! Rules receive the whole line and an offset rather than a suffix, so anchoring rules
//! such as [`LineStart`] can tell a line-start from a mid-line position.

use super::GrammarError;
use crate::bpr::token::{Content, Token, TokenKind};
use regex::Regex;
use std::sync::Arc;

/// Result of a successful rule application.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Byte offset just past the consumed text.
    pub end: usize,
    /// Produced content, in encounter order.
    pub output: Vec<Content>,
}

impl Match {
    pub fn new(end: usize, output: Vec<Content>) -> Self {
        Self { end, output }
    }

    /// A match that consumed up to `end` and produced nothing.
    pub fn silent(end: usize) -> Self {
        Self::new(end, Vec::new())
    }

    /// Nested tokens of the output, raw fragments skipped.
    pub fn tokens(&self) -> Vec<Token> {
        self.output
            .iter()
            .filter_map(|item| item.as_token().cloned())
            .collect()
    }
}

/// A grammar rule: match at a position, or no match.
pub trait Rule: Send + Sync {
    fn apply(&self, input: &str, pos: usize) -> Option<Match>;
}

/// Shared handle to a rule, so one rule can be reused by several composites.
pub type RuleRef = Arc<dyn Rule>;

/// Exact literal text. Emits the text as written in the input unless suppressed.
pub struct Literal {
    text: String,
    caseless: bool,
}

impl Literal {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            caseless: false,
        }
    }

    pub fn caseless(text: &str) -> Self {
        Self {
            text: text.to_string(),
            caseless: true,
        }
    }
}

impl Rule for Literal {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        let candidate = rest.get(..self.text.len())?;
        let matched = if self.caseless {
            candidate.eq_ignore_ascii_case(&self.text)
        } else {
            candidate == self.text
        };
        matched.then(|| Match::new(pos + self.text.len(), vec![candidate.into()]))
    }
}

/// A delimiter run of exactly `len` copies of `ch`.
///
/// The run must not be part of a longer run: the characters right before and right after
/// it differ from `ch`. `***` is therefore neither `*` nor `**`.
pub struct Run {
    ch: char,
    len: usize,
}

impl Run {
    pub fn new(ch: char, len: usize) -> Self {
        Self { ch, len }
    }
}

impl Rule for Run {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let before = input.get(..pos)?;
        if before.ends_with(self.ch) {
            return None;
        }
        let rest = &input[pos..];
        let width = self.ch.len_utf8() * self.len;
        let run = rest.get(..width)?;
        if run.chars().any(|c| c != self.ch) || rest[width..].starts_with(self.ch) {
            return None;
        }
        Some(Match::new(pos + width, vec![run.into()]))
    }
}

/// Which part of a regex match becomes output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// The whole matched text.
    Whole,
    /// Every participating capture group, in group order.
    Groups,
}

/// A regex anchored at the current position.
pub struct Pattern {
    regex: Regex,
    capture: Capture,
}

impl Pattern {
    pub fn new(pattern: &str, capture: Capture) -> Result<Self, GrammarError> {
        let anchored = format!(r"\A(?:{})", pattern);
        let regex = Regex::new(&anchored)
            .map_err(|e| GrammarError::InvalidPattern(format!("{}: {}", pattern, e)))?;
        Ok(Self { regex, capture })
    }
}

impl Rule for Pattern {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        let caps = self.regex.captures(rest)?;
        let whole = caps.get(0)?;
        let output = match self.capture {
            Capture::Whole => vec![whole.as_str().into()],
            Capture::Groups => caps
                .iter()
                .skip(1)
                .flatten()
                .map(|group| group.as_str().into())
                .collect(),
        };
        Some(Match::new(pos + whole.end(), output))
    }
}

/// Zero-width: only matches at the very start of the line.
pub struct LineStart;

impl Rule for LineStart {
    fn apply(&self, _input: &str, pos: usize) -> Option<Match> {
        (pos == 0).then(|| Match::silent(0))
    }
}

/// Matches when nothing but whitespace remains, and consumes it.
pub struct LineEnd;

impl Rule for LineEnd {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        rest.trim().is_empty().then(|| Match::silent(input.len()))
    }
}

/// Optional horizontal whitespace, never produces output.
pub struct Whitespace;

impl Rule for Whitespace {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        let skipped = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        Some(Match::silent(pos + skipped))
    }
}

/// Everything up to the end of the line, trimmed.
pub struct RestOfLine;

impl Rule for RestOfLine {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        Some(Match::new(input.len(), vec![rest.trim().into()]))
    }
}

/// Consumes raw text up to where `target` matches (the target itself is not consumed).
///
/// With `or_end` the skip may run to the end of the line when the target never matches.
/// The skipped text must be non-empty.
pub struct SkipTo {
    target: RuleRef,
    or_end: bool,
}

impl SkipTo {
    pub fn new(target: RuleRef, or_end: bool) -> Self {
        Self { target, or_end }
    }
}

impl Rule for SkipTo {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        for (offset, _) in rest.char_indices().skip(1) {
            if self.target.apply(input, pos + offset).is_some() {
                return Some(Match::new(pos + offset, vec![rest[..offset].into()]));
            }
        }
        (self.or_end && !rest.is_empty()).then(|| Match::new(input.len(), vec![rest.into()]))
    }
}

/// How a [`TextRun`] trims its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    Both,
    Start,
}

/// Plain text up to the next `stop` match or the end of the line, as a `Text` token.
///
/// A backslash escapes the following character: it is never taken as the start of a stop
/// match and is emitted without the backslash. Runs that trim to nothing are emitted as
/// `Empty` and thus dropped.
pub struct TextRun {
    stop: RuleRef,
    trim: Trim,
}

impl TextRun {
    pub fn new(stop: RuleRef, trim: Trim) -> Self {
        Self { stop, trim }
    }
}

impl Rule for TextRun {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        if rest.is_empty() {
            return None;
        }
        let mut text = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut end = input.len();
        let mut first = true;
        while let Some((offset, ch)) = chars.next() {
            if !first && self.stop.apply(input, pos + offset).is_some() {
                end = pos + offset;
                break;
            }
            first = false;
            if ch == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    text.push(escaped);
                    continue;
                }
            }
            text.push(ch);
        }
        let trimmed = match self.trim {
            Trim::Both => text.trim(),
            Trim::Start => text.trim_start(),
        };
        let kind = if trimmed.is_empty() {
            TokenKind::Empty
        } else {
            TokenKind::Text
        };
        let output = Token::emit(kind, vec![trimmed.into()])
            .map(Content::Token)
            .into_iter()
            .collect();
        Some(Match::new(end, output))
    }
}

/// `#...#` / `!...!` constructs: a marker run, then text up to the same run again.
///
/// Output is `[run, inner]`, leading whitespace of the inner text skipped.
pub struct Enclosed {
    marker: char,
}

impl Enclosed {
    pub fn new(marker: char) -> Self {
        Self { marker }
    }
}

impl Rule for Enclosed {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        let run_len = rest.len() - rest.trim_start_matches(self.marker).len();
        if run_len == 0 {
            return None;
        }
        let run = &rest[..run_len];
        let after_run = &rest[run_len..];
        let inner_start = run_len + (after_run.len() - after_run.trim_start().len());
        let body = &rest[inner_start..];
        let mut search = 0;
        while let Some(found) = body[search..].find(run) {
            let at = search + found;
            let longer_before = body[..at].ends_with(self.marker);
            let longer_after = body[at + run_len..].starts_with(self.marker);
            if !longer_before && !longer_after {
                let end = pos + inner_start + at + run_len;
                return Some(Match::new(end, vec![run.into(), body[..at].into()]));
            }
            search = at + run_len;
        }
        None
    }
}

/// A table row: cells split on unescaped `|`, each cell an optional span number followed by
/// inline content, and an optional-arguments suffix after the closing pipe.
pub struct TableRow {
    cell: RuleRef,
    optional: RuleRef,
}

impl TableRow {
    pub fn new(cell: RuleRef, optional: RuleRef) -> Self {
        Self { cell, optional }
    }

    fn pipes(line: &str) -> Vec<usize> {
        let mut pipes = Vec::new();
        let mut escaped = false;
        for (idx, ch) in line.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '|' => pipes.push(idx),
                _ => {}
            }
        }
        pipes
    }

    fn cell(&self, segment: &str, row: &mut Vec<Content>) {
        let digits = segment.len() - segment.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let body = if digits > 0 {
            row.push(segment[..digits].into());
            &segment[digits..]
        } else {
            segment
        };
        let body = body.trim_start();
        let content = self
            .cell
            .apply(body, 0)
            .map(|found| found.output)
            .unwrap_or_default();
        row.push(Token::new(TokenKind::TableCell, content).into());
    }
}

impl Rule for TableRow {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        if pos != 0 || !input.starts_with('|') {
            return None;
        }
        let pipes = Self::pipes(input);
        if pipes.len() < 2 {
            return None;
        }
        let mut row = Vec::new();
        for bounds in pipes.windows(2) {
            self.cell(&input[bounds[0] + 1..bounds[1]], &mut row);
        }
        let tail_start = pipes[pipes.len() - 1] + 1;
        let tail = &input[tail_start..];
        if !tail.trim().is_empty() {
            match self.optional.apply(input, tail_start) {
                Some(found) if input[found.end..].trim().is_empty() => row.extend(found.output),
                _ => self.cell(tail, &mut row),
            }
        }
        let output = Token::emit(TokenKind::TableRow, row)
            .map(Content::Token)
            .into_iter()
            .collect();
        Some(Match::new(input.len(), output))
    }
}

/// A fenced code block over a multi-line input: an opening fence line with an optional
/// language, the body, and a closing fence line.
///
/// Output is `[fence, language, body]`, the body lines joined with `\n`.
pub struct CodeBlock {
    fence: &'static str,
}

impl CodeBlock {
    pub fn new(fence: &'static str) -> Self {
        Self { fence }
    }

    /// Language of an opening fence line, `None` if the line is not a fence.
    ///
    /// Fence lines may only be padded with spaces and tabs.
    pub fn opening(&self, line: &str) -> Option<String> {
        let language = line
            .trim_end_matches(FENCE_PADDING)
            .strip_prefix(self.fence)?;
        language
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '+'))
            .then(|| language.to_string())
    }

    pub fn is_closing(&self, line: &str) -> bool {
        line.trim_matches(FENCE_PADDING) == self.fence
    }
}

const FENCE_PADDING: [char; 2] = [' ', '\t'];

/// Which side of a fenced block a [`FenceLine`] recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fence {
    Opening,
    Closing,
}

/// A single line that opens or closes a fenced code block, judged by the same tests as
/// [`CodeBlock`], so the tokenizer and the block rule always agree on the boundaries.
pub struct FenceLine {
    block: CodeBlock,
    fence: Fence,
}

impl FenceLine {
    pub fn new(fence_text: &'static str, fence: Fence) -> Self {
        Self {
            block: CodeBlock::new(fence_text),
            fence,
        }
    }
}

impl Rule for FenceLine {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        if pos != 0 {
            return None;
        }
        let found = match self.fence {
            Fence::Opening => self.block.opening(input).is_some(),
            Fence::Closing => self.block.is_closing(input),
        };
        found.then(|| Match::silent(input.len()))
    }
}

impl Rule for CodeBlock {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let rest = input.get(pos..)?;
        let mut lines = rest.split('\n');
        let language = self.opening(lines.next()?)?;
        let mut consumed = rest.find('\n')? + 1;
        let mut body = Vec::new();
        for line in lines {
            consumed += line.len();
            if self.is_closing(line) {
                let output = vec![
                    self.fence.into(),
                    language.into(),
                    body.join("\n").into(),
                ];
                return Some(Match::new(pos + consumed, output));
            }
            body.push(line);
            consumed += 1;
        }
        None
    }
}

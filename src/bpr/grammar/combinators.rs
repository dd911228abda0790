//! Rule combinators and the small constructor functions the grammar is written with.
//!
//! Every constructor returns a [`RuleRef`] so definitions read top-down:
//!
//!     let assignation = emit(TokenKind::VarAssign, seq([identifier, ws(), suppress(lit("=")), ws(), value]));
//!
//! Composites never backtrack into a child: a child either matches at a position or not,
//! and alternation is ordered (first match wins) unless [`longest`] is asked for.

use super::engine::{
    Capture, Enclosed, LineEnd, LineStart, Literal, Match, Pattern, RestOfLine, Rule, RuleRef,
    Run, SkipTo, TextRun, Trim, Whitespace,
};
use crate::bpr::token::{Content, Token, TokenKind};
use std::sync::Arc;

/// All children in order.
pub struct Seq(pub Vec<RuleRef>);

impl Rule for Seq {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let mut end = pos;
        let mut output = Vec::new();
        for rule in &self.0 {
            let found = rule.apply(input, end)?;
            end = found.end;
            output.extend(found.output);
        }
        Some(Match::new(end, output))
    }
}

/// First child that matches.
pub struct Alt(pub Vec<RuleRef>);

impl Rule for Alt {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        self.0.iter().find_map(|rule| rule.apply(input, pos))
    }
}

/// Child with the longest match; ties go to the earlier child.
pub struct Longest(pub Vec<RuleRef>);

impl Rule for Longest {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let mut best: Option<Match> = None;
        for rule in &self.0 {
            if let Some(found) = rule.apply(input, pos) {
                if best.as_ref().map_or(true, |b| found.end > b.end) {
                    best = Some(found);
                }
            }
        }
        best
    }
}

/// Child or nothing.
pub struct Opt(pub RuleRef);

impl Rule for Opt {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        Some(self.0.apply(input, pos).unwrap_or_else(|| Match::silent(pos)))
    }
}

/// Greedy repetition between `min` and `max` times. A match that consumes nothing ends the loop.
pub struct Repeat {
    pub rule: RuleRef,
    pub min: usize,
    pub max: Option<usize>,
}

impl Rule for Repeat {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let mut end = pos;
        let mut output = Vec::new();
        let mut count = 0;
        while self.max.map_or(true, |max| count < max) {
            match self.rule.apply(input, end) {
                Some(found) if found.end > end => {
                    end = found.end;
                    output.extend(found.output);
                    count += 1;
                }
                _ => break,
            }
        }
        (count >= self.min).then(|| Match::new(end, output))
    }
}

/// Each child at most once, in any order; at least one must match.
pub struct Each(pub Vec<RuleRef>);

impl Rule for Each {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let mut used = vec![false; self.0.len()];
        let mut end = pos;
        let mut output = Vec::new();
        'outer: loop {
            for (idx, rule) in self.0.iter().enumerate() {
                if used[idx] {
                    continue;
                }
                if let Some(found) = rule.apply(input, end) {
                    used[idx] = true;
                    end = found.end;
                    output.extend(found.output);
                    continue 'outer;
                }
            }
            break;
        }
        used.contains(&true).then(|| Match::new(end, output))
    }
}

/// Positive look-ahead: succeeds without consuming.
pub struct Peek(pub RuleRef);

impl Rule for Peek {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        self.0.apply(input, pos).map(|_| Match::silent(pos))
    }
}

/// Negative look-ahead.
pub struct Not(pub RuleRef);

impl Rule for Not {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        match self.0.apply(input, pos) {
            Some(_) => None,
            None => Some(Match::silent(pos)),
        }
    }
}

/// Match and drop the output.
pub struct Suppress(pub RuleRef);

impl Rule for Suppress {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        self.0.apply(input, pos).map(|found| Match::silent(found.end))
    }
}

/// Decides the kind of an emitted token.
pub enum EmitKind {
    Fixed(TokenKind),
    Classify(fn(&[Content]) -> TokenKind),
}

/// Wraps the child's output into one token. `Empty` results are dropped.
pub struct Emit {
    pub rule: RuleRef,
    pub kind: EmitKind,
}

impl Rule for Emit {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let found = self.rule.apply(input, pos)?;
        let kind = match &self.kind {
            EmitKind::Fixed(kind) => *kind,
            EmitKind::Classify(classify) => classify(&found.output),
        };
        let output = Token::emit(kind, found.output)
            .map(Content::Token)
            .into_iter()
            .collect();
        Some(Match::new(found.end, output))
    }
}

/// Rewrites the child's output.
pub struct Map {
    pub rule: RuleRef,
    pub f: fn(Vec<Content>) -> Vec<Content>,
}

impl Rule for Map {
    fn apply(&self, input: &str, pos: usize) -> Option<Match> {
        let found = self.rule.apply(input, pos)?;
        Some(Match::new(found.end, (self.f)(found.output)))
    }
}

pub fn lit(text: &str) -> RuleRef {
    Arc::new(Literal::new(text))
}

pub fn caseless(text: &str) -> RuleRef {
    Arc::new(Literal::caseless(text))
}

/// Caseless keyword set, longest keyword tried first, not followed by a word character.
pub fn keywords(words: &[&str]) -> RuleRef {
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by_key(|word| std::cmp::Reverse(word.len()));
    let choices = sorted.into_iter().map(caseless).collect();
    seq([Arc::new(Alt(choices)) as RuleRef, not(word_char())])
}

fn word_char() -> RuleRef {
    pattern(r"\w")
}

pub fn run(ch: char, len: usize) -> RuleRef {
    Arc::new(Run::new(ch, len))
}

/// Anchored regex emitting the whole match. Grammar patterns are fixed text, so a bad one
/// is a programming error.
pub fn pattern(re: &str) -> RuleRef {
    match Pattern::new(re, Capture::Whole) {
        Ok(rule) => Arc::new(rule),
        Err(e) => panic!("{}", e),
    }
}

/// Anchored regex emitting its participating capture groups.
pub fn groups(re: &str) -> RuleRef {
    match Pattern::new(re, Capture::Groups) {
        Ok(rule) => Arc::new(rule),
        Err(e) => panic!("{}", e),
    }
}

pub fn seq<const N: usize>(rules: [RuleRef; N]) -> RuleRef {
    Arc::new(Seq(rules.to_vec()))
}

pub fn alt<const N: usize>(rules: [RuleRef; N]) -> RuleRef {
    Arc::new(Alt(rules.to_vec()))
}

pub fn longest<const N: usize>(rules: [RuleRef; N]) -> RuleRef {
    Arc::new(Longest(rules.to_vec()))
}

pub fn each<const N: usize>(rules: [RuleRef; N]) -> RuleRef {
    Arc::new(Each(rules.to_vec()))
}

pub fn opt(rule: RuleRef) -> RuleRef {
    Arc::new(Opt(rule))
}

pub fn many(rule: RuleRef) -> RuleRef {
    Arc::new(Repeat {
        rule,
        min: 0,
        max: None,
    })
}

pub fn many1(rule: RuleRef) -> RuleRef {
    Arc::new(Repeat {
        rule,
        min: 1,
        max: None,
    })
}

/// `item (sep item)*`
pub fn delimited(item: RuleRef, sep: RuleRef) -> RuleRef {
    seq([item.clone(), many(seq([sep, item]))])
}

pub fn peek(rule: RuleRef) -> RuleRef {
    Arc::new(Peek(rule))
}

pub fn not(rule: RuleRef) -> RuleRef {
    Arc::new(Not(rule))
}

pub fn suppress(rule: RuleRef) -> RuleRef {
    Arc::new(Suppress(rule))
}

pub fn emit(kind: TokenKind, rule: RuleRef) -> RuleRef {
    Arc::new(Emit {
        rule,
        kind: EmitKind::Fixed(kind),
    })
}

pub fn emit_with(classify: fn(&[Content]) -> TokenKind, rule: RuleRef) -> RuleRef {
    Arc::new(Emit {
        rule,
        kind: EmitKind::Classify(classify),
    })
}

pub fn map(rule: RuleRef, f: fn(Vec<Content>) -> Vec<Content>) -> RuleRef {
    Arc::new(Map { rule, f })
}

pub fn ws() -> RuleRef {
    Arc::new(Whitespace)
}

pub fn line_start() -> RuleRef {
    Arc::new(LineStart)
}

pub fn line_end() -> RuleRef {
    Arc::new(LineEnd)
}

pub fn rest_of_line() -> RuleRef {
    Arc::new(RestOfLine)
}

pub fn skip_to(target: RuleRef) -> RuleRef {
    Arc::new(SkipTo::new(target, true))
}

pub fn text_run(stop: RuleRef, trim: Trim) -> RuleRef {
    Arc::new(TextRun::new(stop, trim))
}

pub fn enclosed(marker: char) -> RuleRef {
    Arc::new(Enclosed::new(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(items: &[&str]) -> Vec<Content> {
        items.iter().map(|item| Content::from(*item)).collect()
    }

    #[test]
    fn seq_concatenates_output() {
        let rule = seq([lit("a"), suppress(lit("-")), lit("b")]);
        assert_eq!(rule.apply("a-b", 0), Some(Match::new(3, raw(&["a", "b"]))));
        assert_eq!(rule.apply("a-c", 0), None);
    }

    #[test]
    fn alt_is_ordered_and_longest_is_not() {
        let ordered = alt([lit("a"), lit("ab")]);
        assert_eq!(ordered.apply("ab", 0).map(|m| m.end), Some(1));
        let widest = longest([lit("a"), lit("ab")]);
        assert_eq!(widest.apply("ab", 0).map(|m| m.end), Some(2));
    }

    #[test]
    fn repeat_respects_bounds() {
        let rule: RuleRef = Arc::new(Repeat {
            rule: lit("a"),
            min: 2,
            max: Some(3),
        });
        assert_eq!(rule.apply("a", 0), None);
        assert_eq!(rule.apply("aaaa", 0).map(|m| m.end), Some(3));
    }

    #[test]
    fn repeat_stops_on_empty_match() {
        let rule = many(opt(lit("x")));
        assert_eq!(rule.apply("yyy", 0), Some(Match::silent(0)));
    }

    #[test]
    fn each_accepts_any_order_at_most_once() {
        let rule = each([lit("a"), lit("b")]);
        assert_eq!(rule.apply("ba", 0), Some(Match::new(2, raw(&["b", "a"]))));
        assert_eq!(rule.apply("aab", 0).map(|m| m.end), Some(1));
        assert_eq!(rule.apply("c", 0), None);
    }

    #[test]
    fn lookaheads_do_not_consume() {
        assert_eq!(peek(lit("a")).apply("a", 0), Some(Match::silent(0)));
        assert_eq!(not(lit("a")).apply("a", 0), None);
        assert_eq!(not(lit("a")).apply("b", 0), Some(Match::silent(0)));
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        let rule = keywords(&["div", "article"]);
        assert!(rule.apply("DIV", 0).is_some());
        assert!(rule.apply("divider", 0).is_none());
    }

    #[test]
    fn emit_wraps_and_drops_empty() {
        let rule = emit(TokenKind::VarValue, lit("x"));
        let found = rule.apply("x", 0).unwrap();
        assert_eq!(found.tokens(), vec![Token::with_raw(TokenKind::VarValue, &["x"])]);
        let dropped = emit(TokenKind::Empty, lit("x"));
        assert!(dropped.apply("x", 0).unwrap().output.is_empty());
    }

    #[test]
    fn delimited_list() {
        let rule = delimited(pattern(r"\d"), suppress(lit(",")));
        assert_eq!(rule.apply("1,2,3", 0), Some(Match::new(5, raw(&["1", "2", "3"]))));
    }
}

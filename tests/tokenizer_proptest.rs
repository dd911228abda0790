//! Property-based tests for the document tokenizer
//!
//! Whatever the input, tokenizing must not panic, must emit exactly one top-level linebreak
//! per input line and must never let an `Empty` token through.

use bootstraparse::bpr::tokenizer::tokenize;
use bootstraparse::{Token, TokenKind};
use proptest::prelude::*;

fn contains_kind(tokens: &[Token], kind: TokenKind) -> bool {
    tokens
        .iter()
        .any(|t| t.is(kind) || contains_kind(&t.tokens().cloned().collect::<Vec<_>>(), kind))
}

/// Lines built from the constructs the grammar knows about, mixed with noise
fn bpr_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ]{0,20}",
        "[#!]{1,8} [a-z ]{0,10} [#!]{1,8}",
        "(- |#\\. )[a-z*_~ ]{0,20}",
        "\\|([0-9]?[a-z ]{0,5}\\|){1,4}",
        "\\|(:?-{1,3}:?\\|){1,4}",
        "(<<|)(div|aside|body)(>>|)",
        "> (-- )?[a-z ]{0,10}",
        "```[a-z]{0,4}",
        "[a-z]{0,5} ?\\[[a-z]=[0-9]\\] ?\\{[a-z]{1,3}\\}",
        "@[\\[{][a-z]{1,5}[\\]}]",
        "[ -~]{0,30}",
    ]
}

proptest! {
    #[test]
    fn one_linebreak_per_line(lines in prop::collection::vec(bpr_line(), 0..20)) {
        let source = lines.join("\n");
        let tokens = tokenize(&source).unwrap();
        let breaks = tokens.iter().filter(|t| t.is(TokenKind::Linebreak)).count();
        prop_assert_eq!(breaks, source.lines().count());
    }

    #[test]
    fn empty_tokens_never_escape(lines in prop::collection::vec(bpr_line(), 0..20)) {
        let tokens = tokenize(&lines.join("\n")).unwrap();
        prop_assert!(!contains_kind(&tokens, TokenKind::Empty));
    }

    #[test]
    fn arbitrary_text_does_not_panic(source in "\\PC{0,200}") {
        let _ = tokenize(&source).unwrap();
    }
}

#[test]
fn test_line_count_with_trailing_newline() {
    let tokens = tokenize("a\nb\n").unwrap();
    let breaks = tokens.iter().filter(|t| t.is(TokenKind::Linebreak)).count();
    assert_eq!(breaks, 2);
}

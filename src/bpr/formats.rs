//! Renderings of a token stream
//!
//!     - `markup`: the readable `<label = 'content' />` form, tokens separated by spaces.
//!     - `json`: one `{"kind", "content"}` object per token, raw fragments as strings.
//!     - `tree`: one row per token, grouped by source line. The line number opens the
//!       first row of each line and nesting is indented two spaces per level:
//!
//!         1   list:ulist
//!               text "item"
//!               text:em "*"
//!         2   text ""
//!
//! Linebreaks are not drawn in the tree; they only advance the line number.

use crate::bpr::token::{readable_markup, Content, Token, TokenKind};
use std::fmt::Write;
use std::str::FromStr;

/// Raw fragments longer than this are clipped in the tree view.
const CLIP: usize = 30;

/// Errors raised while rendering tokens
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// No format with this name
    UnknownFormat(String),
    /// serde_json rejected the token stream
    Json(String),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::UnknownFormat(name) => write!(
                f,
                "Unknown format '{}', expected one of: {}",
                name,
                Format::ALL.map(Format::name).join(", ")
            ),
            FormatError::Json(msg) => write!(f, "JSON serialization failed: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

/// Output format of a token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Markup,
    Json,
    Tree,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Markup, Format::Json, Format::Tree];

    pub fn name(self) -> &'static str {
        match self {
            Format::Markup => "markup",
            Format::Json => "json",
            Format::Tree => "tree",
        }
    }

    pub fn render(self, tokens: &[Token]) -> Result<String, FormatError> {
        match self {
            Format::Markup => Ok(readable_markup(tokens)),
            Format::Json => to_json_str(tokens),
            Format::Tree => Ok(to_tree_str(tokens)),
        }
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == name)
            .ok_or_else(|| FormatError::UnknownFormat(name.to_string()))
    }
}

/// Render tokens in the format called `name`.
pub fn render(name: &str, tokens: &[Token]) -> Result<String, FormatError> {
    name.parse::<Format>()?.render(tokens)
}

pub fn to_json_str(tokens: &[Token]) -> Result<String, FormatError> {
    serde_json::to_string_pretty(tokens).map_err(|e| FormatError::Json(e.to_string()))
}

pub fn to_tree_str(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut line = 1;
    let mut line_opened = false;
    for token in tokens {
        if token.is(TokenKind::Linebreak) {
            line += 1;
            line_opened = false;
            continue;
        }
        let gutter = (!line_opened).then_some(line);
        line_opened = true;
        write_row(&mut out, gutter, token, 0);
    }
    out
}

fn write_row(out: &mut String, gutter: Option<usize>, token: &Token, depth: usize) {
    match gutter {
        Some(line) => {
            let _ = write!(out, "{:<4}", line);
        }
        None => out.push_str("    "),
    }
    out.push_str(&"  ".repeat(depth));
    out.push_str(token.label());
    for raw in token.content().iter().filter_map(Content::as_raw) {
        let _ = write!(out, " {:?}", clip(raw));
    }
    out.push('\n');
    for child in token.tokens() {
        write_row(out, None, child, depth + 1);
    }
}

fn clip(text: &str) -> String {
    match text.char_indices().nth(CLIP) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpr::tokenizer::tokenize;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn tree_groups_rows_by_line() {
        let tokens = tokenize("- item *em*\n\n|a|").unwrap();
        insta::assert_snapshot!(to_tree_str(&tokens), @r#"
        1   list:ulist
              text "item"
              text:em "*"
              text "em"
              text:em "*"
        2   text ""
        3   table:row
              table:cell
                text "a"
        "#);
    }

    #[test]
    fn tree_clips_long_fragments() {
        let out = to_tree_str(&[Token::text("a".repeat(40))]);
        assert_eq!(out, format!("1   text \"{}...\"\n", "a".repeat(30)));
    }

    #[test]
    fn json_shape() {
        let tokens = vec![
            Token::with_tokens(TokenKind::Header, vec![Token::text("x")]),
            Token::linebreak(),
        ];
        let value: serde_json::Value =
            serde_json::from_str(&to_json_str(&tokens).unwrap()).unwrap();
        assert_eq!(
            value,
            json!([
                {"kind": "header", "content": [{"kind": "text", "content": ["x"]}]},
                {"kind": "linebreak", "content": []}
            ])
        );
    }

    #[rstest]
    #[case("markup", Format::Markup)]
    #[case("json", Format::Json)]
    #[case("tree", Format::Tree)]
    fn formats_parse_by_name(#[case] name: &str, #[case] expected: Format) {
        assert_eq!(name.parse::<Format>(), Ok(expected));
    }

    #[test]
    fn unknown_format_lists_the_known_ones() {
        let err = render("pdf", &[]).unwrap_err();
        assert_eq!(err, FormatError::UnknownFormat("pdf".to_string()));
        assert_eq!(
            err.to_string(),
            "Unknown format 'pdf', expected one of: markup, json, tree"
        );
    }

    #[test]
    fn markup_is_readable_markup() {
        let tokens = tokenize("Hello **world**").unwrap();
        assert_eq!(render("markup", &tokens).unwrap(), readable_markup(&tokens));
    }
}

//! Import directive lexer
//!
//! An import directive is the marker `::` followed by one or more bracketed paths:
//!
//!     ::<header.bpr> <../shared/footer.bpr>
//!
//! Directives are found with a small logos lexer; anything that is not a marker, a path or
//! whitespace ends the current directive.

use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
enum DirectiveToken {
    #[token("::")]
    Marker,

    #[regex(r"<[ \t]*[A-Za-z0-9_\-./]+[ \t]*>", |lex| {
        let slice = lex.slice();
        slice[1..slice.len() - 1].trim().to_string()
    })]
    Path(String),

    #[regex(r"[ \t\r\n]+")]
    Whitespace,
}

/// Paths named by the import directives of one line, in order.
pub fn paths_in_line(line: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut in_directive = false;
    for token in DirectiveToken::lexer(line) {
        match token {
            Ok(DirectiveToken::Marker) => in_directive = true,
            Ok(DirectiveToken::Path(path)) if in_directive => paths.push(path),
            Ok(DirectiveToken::Whitespace) => {}
            _ => in_directive = false,
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("::<a.bpr>", &["a.bpr"])]
    #[case("::<a.bpr> <dir/b.bpr>", &["a.bpr", "dir/b.bpr"])]
    #[case(":: < ../up.bpr >", &["../up.bpr"])]
    #[case("text ::<a.bpr> more ::<b.bpr>", &["a.bpr", "b.bpr"])]
    #[case("<a.bpr>", &[])]
    #[case("::text <a.bpr>", &[])]
    #[case("plain line", &[])]
    fn finds_paths(#[case] line: &str, #[case] expected: &[&str]) {
        assert_eq!(paths_in_line(line), expected);
    }
}

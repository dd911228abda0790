//! The bootstraparse grammar, built once and registered by name.
//!
//! Rules are defined bottom-up: argument values, optional argument groups, inline markup,
//! then the line-level block constructs. Shared sub-rules are `Arc`s, so `markup` used by
//! both body text and table cells is one rule object.

use super::combinators::*;
use super::engine::{CodeBlock, Fence, FenceLine, RuleRef, TableRow, Trim};
use crate::bpr::token::{Content, TokenKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Section keywords accepted by `<<kw` / `kw>>`.
pub const STRUCTURAL_ELEMENTS: [&str; 4] = ["div", "article", "aside", "section"];

/// Header levels past this are not rendered as headers.
pub const MAX_HEADER_LEVEL: usize = 6;

pub const CODE_FENCE: &str = "```";

const HYPERLINK: &str = r#"\[[^\]\n]+\]\((?:'[^'\n]*'|"[^"\n]*"|[^()\s]+)\)"#;

const VALUE: &str =
    r#"'([^']*)'|"([^"]*)"|([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?|[A-Za-z_][\w.\-]*)"#;

fn lowercase(output: Vec<Content>) -> Vec<Content> {
    output
        .into_iter()
        .map(|item| match item {
            Content::Raw(text) => Content::Raw(text.to_lowercase()),
            other => other,
        })
        .collect()
}

fn separator_cells(output: Vec<Content>) -> Vec<Content> {
    output
        .iter()
        .filter_map(Content::as_raw)
        .flat_map(|line| line.split('|'))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(Content::from)
        .collect()
}

/// Folds a top-level optional-arguments token into the token it trails.
fn attach_trailing_optional(output: Vec<Content>) -> Vec<Content> {
    let mut attached: Vec<Content> = Vec::with_capacity(output.len());
    for item in output {
        match item {
            Content::Token(optional) if optional.is(TokenKind::Optional) => {
                match attached.last_mut() {
                    Some(Content::Token(owner)) if !owner.is(TokenKind::Optional) => {
                        owner.push(optional)
                    }
                    _ => attached.push(Content::Token(optional)),
                }
            }
            other => attached.push(other),
        }
    }
    attached
}

fn header_kind(output: &[Content]) -> TokenKind {
    match output.first().and_then(Content::as_raw) {
        Some(run) if run.len() > MAX_HEADER_LEVEL => TokenKind::Unimplemented,
        _ => TokenKind::Header,
    }
}

pub(super) fn build() -> HashMap<&'static str, RuleRef> {
    let mut rules: HashMap<&'static str, RuleRef> = HashMap::new();

    // Argument values
    let quotes = pattern(r#"['"]"#);
    let identifier = pattern(r"[A-Za-z_][A-Za-z0-9_]*");
    let value = groups(VALUE);
    let assignation = emit(
        TokenKind::VarAssign,
        seq([
            identifier.clone(),
            ws(),
            suppress(lit("=")),
            ws(),
            value.clone(),
        ]),
    );
    let var_item = alt([assignation.clone(), emit(TokenKind::VarValue, value.clone())]);
    let comma = suppress(seq([ws(), lit(","), ws()]));
    let assignments = seq([
        ws(),
        delimited(var_item.clone(), comma.clone()),
        line_end(),
    ]);

    // Optional argument groups
    let var = emit(
        TokenKind::OptionalVar,
        seq([
            suppress(lit("[")),
            ws(),
            delimited(var_item, comma),
            ws(),
            suppress(lit("]")),
        ]),
    );
    let class_insert = emit(TokenKind::OptionalClass, groups(r"\{\{([^{}]+)\}\}"));
    let html_insert = emit(TokenKind::OptionalInsert, groups(r"\{([^{}]+)\}"));
    let optional = emit(
        TokenKind::Optional,
        each([
            seq([ws(), class_insert.clone()]),
            seq([ws(), html_insert.clone()]),
            seq([ws(), var.clone()]),
        ]),
    );
    let attached = opt(seq([peek(alt([lit("{"), lit("[")])), optional.clone()]));
    let trailing_optional = seq([optional.clone(), line_end()]);

    // Inline markup
    let shortcode_name = pattern(r"[\w.\-]+");
    let hyperlink = emit(TokenKind::Hyperlink, seq([pattern(HYPERLINK), attached.clone()]));
    let image = emit(
        TokenKind::Image,
        seq([
            suppress(lit("@{")),
            shortcode_name.clone(),
            suppress(lit("}")),
            attached.clone(),
        ]),
    );
    let alias = emit(
        TokenKind::Alias,
        seq([
            suppress(lit("@[")),
            shortcode_name,
            suppress(lit("]")),
            attached.clone(),
        ]),
    );
    let et_strong = emit(TokenKind::EtStrong, run('*', 2));
    let et_em = emit(TokenKind::EtEm, run('*', 1));
    let et_underline = emit(TokenKind::EtUnderline, run('_', 2));
    let et_strikethrough = emit(TokenKind::EtStrikethrough, run('~', 2));
    let et_custom_span = emit(
        TokenKind::EtCustomSpan,
        seq([
            suppress(lit("(#")),
            pattern(r"\d+"),
            suppress(lit(")")),
            attached,
        ]),
    );
    let code_inline = emit(TokenKind::Code, run('`', 3));
    let markup = alt([
        hyperlink.clone(),
        image.clone(),
        alias.clone(),
        et_strong.clone(),
        et_em.clone(),
        et_underline.clone(),
        et_strikethrough.clone(),
        et_custom_span.clone(),
        code_inline.clone(),
    ]);
    let text = text_run(alt([markup.clone(), trailing_optional.clone()]), Trim::Both);
    let enhanced_text = many(alt([markup.clone(), trailing_optional.clone(), text.clone()]));
    let cell = many(alt([markup.clone(), text_run(markup.clone(), Trim::Start)]));

    // Line-level blocks
    let structural_elements = map(keywords(&STRUCTURAL_ELEMENTS), lowercase);
    let se_start = emit(
        TokenKind::StructuralElementStart,
        seq([
            line_start(),
            suppress(lit("<<")),
            structural_elements.clone(),
            opt(optional.clone()),
            line_end(),
        ]),
    );
    let se_end = emit(
        TokenKind::StructuralElementEnd,
        seq([
            line_start(),
            ws(),
            structural_elements.clone(),
            suppress(lit(">>")),
            opt(optional.clone()),
            line_end(),
        ]),
    );
    let table_separator = emit(
        TokenKind::TableSeparator,
        seq([
            line_start(),
            map(
                pattern(r"\|(?:[ \t]*[-:]*-[-:]*[ \t]*\|)+[ \t]*$"),
                separator_cells,
            ),
        ]),
    );
    let table_row: RuleRef = Arc::new(TableRow::new(cell.clone(), optional.clone()));
    let olist = emit(
        TokenKind::EtOlist,
        seq([
            line_start(),
            suppress(pattern(r"#\.[ \t]+")),
            enhanced_text.clone(),
        ]),
    );
    let ulist = emit(
        TokenKind::EtUlist,
        seq([
            line_start(),
            suppress(pattern(r"-[ \t]+")),
            enhanced_text.clone(),
        ]),
    );
    let header = emit_with(
        header_kind,
        seq([line_start(), enclosed('#'), opt(optional.clone())]),
    );
    let display = emit(
        TokenKind::Display,
        seq([line_start(), enclosed('!'), opt(optional.clone())]),
    );
    let blockquote_author = emit(
        TokenKind::BlockQuoteAuthor,
        seq([
            line_start(),
            suppress(pattern(r">[ \t]*--[ \t]*")),
            rest_of_line(),
        ]),
    );
    let blockquote = emit(
        TokenKind::BlockQuote,
        seq([
            line_start(),
            suppress(pattern(r">[ \t]*")),
            enhanced_text.clone(),
        ]),
    );
    let quotation = alt([blockquote_author.clone(), blockquote.clone()]);
    let block = alt([
        se_start.clone(),
        se_end.clone(),
        table_separator.clone(),
        table_row.clone(),
        olist.clone(),
        ulist.clone(),
        header.clone(),
        display.clone(),
        quotation.clone(),
    ]);
    let line = map(
        seq([opt(block.clone()), enhanced_text.clone()]),
        attach_trailing_optional,
    );

    // Multi-line code blocks
    let code: RuleRef = Arc::new(CodeBlock::new(CODE_FENCE));
    let code_fence: RuleRef = Arc::new(FenceLine::new(CODE_FENCE, Fence::Opening));
    let code_close: RuleRef = Arc::new(FenceLine::new(CODE_FENCE, Fence::Closing));

    // Shortcode replacement works on raw text around images and aliases
    let shortcode = alt([image.clone(), alias.clone()]);
    let line_to_replace = many(alt([
        shortcode.clone(),
        emit(TokenKind::Text, skip_to(shortcode.clone())),
    ]));

    rules.insert("quotes", quotes);
    rules.insert("identifier", identifier);
    rules.insert("value", value);
    rules.insert("assignation", assignation);
    rules.insert("assignments", assignments);
    rules.insert("var", var);
    rules.insert("class_insert", class_insert);
    rules.insert("html_insert", html_insert);
    rules.insert("optional", optional);
    rules.insert("trailing_optional", trailing_optional);
    rules.insert("il_link", hyperlink);
    rules.insert("image", image);
    rules.insert("alias", alias);
    rules.insert("et_strong", et_strong);
    rules.insert("et_em", et_em);
    rules.insert("et_underline", et_underline);
    rules.insert("et_strikethrough", et_strikethrough);
    rules.insert("et_custom_span", et_custom_span);
    rules.insert("code_inline", code_inline);
    rules.insert("markup", markup);
    rules.insert("text", text);
    rules.insert("enhanced_text", enhanced_text);
    rules.insert("cell", cell);
    rules.insert("structural_elements", structural_elements);
    rules.insert("se_start", se_start);
    rules.insert("se_end", se_end);
    rules.insert("table_separator", table_separator);
    rules.insert("table_row", table_row);
    rules.insert("olist", olist);
    rules.insert("ulist", ulist);
    rules.insert("header", header);
    rules.insert("display", display);
    rules.insert("blockquote_author", blockquote_author);
    rules.insert("blockquote", blockquote);
    rules.insert("quotation", quotation);
    rules.insert("block", block);
    rules.insert("line", line);
    rules.insert("code", code);
    rules.insert("code_fence", code_fence);
    rules.insert("code_close", code_close);
    rules.insert("shortcode", shortcode);
    rules.insert("line_to_replace", line_to_replace);
    rules
}

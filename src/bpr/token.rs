//! Token model shared by the grammar engine, the tokenizer and the preparser.
//!
//!     A token is a labeled unit of recognized markup. Its content is an ordered sequence
//!     mixing raw text fragments and nested tokens, so a list item can carry the emphasis
//!     tokens of its text followed by the optional-arguments token trailing the line.
//!
//! Equality
//!
//!     Two tokens are equal when they have the same kind and element-wise equal content.
//!     The comparison is recursive, order sensitive and length sensitive. A `Text` token is
//!     never equal to a `Header` token even with identical content.
//!
//! Dropping
//!
//!     `TokenKind::Empty` is a signal rather than a token: [`Token::emit`] returns `None` for
//!     it, and every stage that builds tokens from a grammar match goes through `emit`. An
//!     `Empty` token therefore never reaches the output stream.

use serde::Serialize;
use std::fmt;

/// The closed set of token variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Text,
    Alias,
    Image,
    Hyperlink,
    Header,
    Display,
    EtEm,
    EtStrong,
    EtUnderline,
    EtStrikethrough,
    EtCustomSpan,
    EtUlist,
    EtOlist,
    StructuralElementStart,
    StructuralElementEnd,
    Table,
    TableRow,
    TableCell,
    TableSeparator,
    BlockQuote,
    BlockQuoteAuthor,
    Code,
    /// Optional-arguments suffix, wraps at most one of each sub-kind below.
    Optional,
    /// `[key=value, value, ...]`
    OptionalVar,
    /// `{raw html insert}`
    OptionalInsert,
    /// `{{raw css classes}}`
    OptionalClass,
    /// `key=value` inside a var list: content is `[key, value]`.
    VarAssign,
    /// Bare value inside a var list: content is `[value]`.
    VarValue,
    /// End of a source line.
    Linebreak,
    /// A construct that matched but has no supported rendering.
    Unimplemented,
    /// Dropped on construction.
    Empty,
}

impl TokenKind {
    pub const ALL: &'static [TokenKind] = &[
        TokenKind::Text,
        TokenKind::Alias,
        TokenKind::Image,
        TokenKind::Hyperlink,
        TokenKind::Header,
        TokenKind::Display,
        TokenKind::EtEm,
        TokenKind::EtStrong,
        TokenKind::EtUnderline,
        TokenKind::EtStrikethrough,
        TokenKind::EtCustomSpan,
        TokenKind::EtUlist,
        TokenKind::EtOlist,
        TokenKind::StructuralElementStart,
        TokenKind::StructuralElementEnd,
        TokenKind::Table,
        TokenKind::TableRow,
        TokenKind::TableCell,
        TokenKind::TableSeparator,
        TokenKind::BlockQuote,
        TokenKind::BlockQuoteAuthor,
        TokenKind::Code,
        TokenKind::Optional,
        TokenKind::OptionalVar,
        TokenKind::OptionalInsert,
        TokenKind::OptionalClass,
        TokenKind::VarAssign,
        TokenKind::VarValue,
        TokenKind::Linebreak,
        TokenKind::Unimplemented,
        TokenKind::Empty,
    ];

    /// Stable string identifier of the variant.
    pub fn label(self) -> &'static str {
        match self {
            TokenKind::Text => "text",
            TokenKind::Alias => "alias",
            TokenKind::Image => "image",
            TokenKind::Hyperlink => "hyperlink",
            TokenKind::Header => "header",
            TokenKind::Display => "display",
            TokenKind::EtEm => "text:em",
            TokenKind::EtStrong => "text:strong",
            TokenKind::EtUnderline => "text:underline",
            TokenKind::EtStrikethrough => "text:strikethrough",
            TokenKind::EtCustomSpan => "text:custom_span",
            TokenKind::EtUlist => "list:ulist",
            TokenKind::EtOlist => "list:olist",
            TokenKind::StructuralElementStart => "se:start",
            TokenKind::StructuralElementEnd => "se:end",
            TokenKind::Table => "table",
            TokenKind::TableRow => "table:row",
            TokenKind::TableCell => "table:cell",
            TokenKind::TableSeparator => "table:separator",
            TokenKind::BlockQuote => "blockquote",
            TokenKind::BlockQuoteAuthor => "blockquote:author",
            TokenKind::Code => "code",
            TokenKind::Optional => "optional",
            TokenKind::OptionalVar => "optional:var",
            TokenKind::OptionalInsert => "optional:insert",
            TokenKind::OptionalClass => "optional:class",
            TokenKind::VarAssign => "var:assign",
            TokenKind::VarValue => "var:value",
            TokenKind::Linebreak => "linebreak",
            TokenKind::Unimplemented => "unimplemented",
            TokenKind::Empty => "empty",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.label() == label)
    }

    /// Inline emphasis delimiters render without content.
    pub fn is_delimiter(self) -> bool {
        matches!(
            self,
            TokenKind::EtEm
                | TokenKind::EtStrong
                | TokenKind::EtUnderline
                | TokenKind::EtStrikethrough
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One element of a token's content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Raw(String),
    Token(Token),
}

impl Content {
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Content::Raw(text) => Some(text),
            Content::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Content::Token(token) => Some(token),
            Content::Raw(_) => None,
        }
    }

    fn to_markup(&self) -> String {
        match self {
            Content::Raw(text) => text.clone(),
            Content::Token(token) => token.to_markup(),
        }
    }

    fn is_meaningful(&self) -> bool {
        match self {
            Content::Raw(text) => !text.is_empty(),
            Content::Token(_) => true,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Raw(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Raw(text)
    }
}

impl From<Token> for Content {
    fn from(token: Token) -> Self {
        Content::Token(token)
    }
}

/// A typed, labeled unit of recognized markup with ordered content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    kind: TokenKind,
    content: Vec<Content>,
}

impl Token {
    pub fn new(kind: TokenKind, content: Vec<Content>) -> Self {
        Self { kind, content }
    }

    /// Build a token from a parse match, honoring the `Empty` drop signal.
    pub fn emit(kind: TokenKind, content: Vec<Content>) -> Option<Self> {
        match kind {
            TokenKind::Empty => None,
            _ => Some(Self::new(kind, content)),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Text, vec![Content::Raw(text.into())])
    }

    pub fn linebreak() -> Self {
        Self::new(TokenKind::Linebreak, Vec::new())
    }

    /// Token whose content is only raw strings.
    pub fn with_raw(kind: TokenKind, raw: &[&str]) -> Self {
        Self::new(kind, raw.iter().map(|text| Content::from(*text)).collect())
    }

    /// Token whose content is only nested tokens.
    pub fn with_tokens(kind: TokenKind, tokens: Vec<Token>) -> Self {
        Self::new(kind, tokens.into_iter().map(Content::Token).collect())
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn content(&self) -> &[Content] {
        &self.content
    }

    pub fn into_content(self) -> Vec<Content> {
        self.content
    }

    pub fn push(&mut self, item: impl Into<Content>) {
        self.content.push(item.into());
    }

    /// First raw fragment of the content, if any.
    pub fn raw(&self) -> Option<&str> {
        self.content.iter().find_map(Content::as_raw)
    }

    /// Concatenation of every raw fragment, nested tokens skipped.
    pub fn raw_text(&self) -> String {
        self.content.iter().filter_map(Content::as_raw).collect()
    }

    /// Nested tokens of the content, in order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.content.iter().filter_map(Content::as_token)
    }

    /// The optional-arguments token attached as last content element, if any.
    pub fn optional(&self) -> Option<&Token> {
        self.content
            .last()
            .and_then(Content::as_token)
            .filter(|token| token.is(TokenKind::Optional))
    }

    fn has_content(&self) -> bool {
        self.content.iter().any(Content::is_meaningful)
    }

    fn joined_content(&self) -> String {
        self.content
            .iter()
            .map(Content::to_markup)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Human readable markup representation.
    ///
    /// Text renders as its raw text. Other tokens render as `<label = 'content' />`, with
    /// nested tokens rendered recursively and content joined by commas. Tokens without
    /// meaningful content render as `<[NOC] label />`.
    pub fn to_markup(&self) -> String {
        let label = self.label();
        match self.kind {
            TokenKind::Text => self.raw_text(),
            kind if kind.is_delimiter() => format!("<{} />", label),
            TokenKind::EtCustomSpan => format!("<{}:{} />", label, self.joined_content()),
            TokenKind::StructuralElementStart | TokenKind::StructuralElementEnd => {
                match self.raw() {
                    Some(element) => {
                        format!("<{}:{} = '{}' />", label, element, self.joined_content())
                    }
                    None => format!("<[NOC] {} />", label),
                }
            }
            _ if !self.has_content() => format!("<[NOC] {} />", label),
            _ => format!("<{} = '{}' />", label, self.joined_content()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// Markup of a token list, tokens separated by a single space.
pub fn readable_markup(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::to_markup)
        .collect::<Vec<_>>()
        .join(" ")
}

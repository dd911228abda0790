//! # bootstraparse
//!
//! A processor for the bpr markup format: a markdown-like syntax with headers,
//! emphasis, lists, tables, structural blocks, shortcodes and file imports.
//!
//! Pipeline
//!
//!     raw file
//!       ├── preparse::imports      textual merge of `::<path>` imports
//!       ├── preparse::shortcodes   `@[alias]` / `@{image}` rewrites from the config store
//!       └── tokenizer              grammar `line` rule per line, plus linebreaks
//!
//! The resulting token stream is handed to an export layer that turns tokens into
//! final HTML; that layer lives outside this crate and is only consumed through
//! the [export boundary](bpr::export).

#![allow(rustdoc::invalid_html_tags)]

pub mod bpr;

pub use bpr::loader::DocumentLoader;
pub use bpr::token::{Content, Token, TokenKind};

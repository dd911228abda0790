//! Splitting of optional-argument tokens
//!
//! An `Optional` token carries up to one of each sub-group: a class insert `{{...}}`, an
//! HTML insert `{...}` and a variable list `[...]`. [`split_optionals`] flattens it into
//! an [`OptionalArguments`] record that templates and exporters consume.

use crate::bpr::token::{Content, Token, TokenKind};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Flattened optional arguments.
///
/// Bare values of the variable list go to `var_list` in order; `name=value` pairs go to
/// `var_dict`, a repeated name keeping its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionalArguments {
    pub html_insert: String,
    pub class_insert: String,
    pub var_list: Vec<String>,
    pub var_dict: BTreeMap<String, String>,
}

impl OptionalArguments {
    pub fn is_empty(&self) -> bool {
        self.html_insert.is_empty()
            && self.class_insert.is_empty()
            && self.var_list.is_empty()
            && self.var_dict.is_empty()
    }

    fn add_var(&mut self, var: &Token) {
        match var.kind() {
            TokenKind::VarValue => self.var_list.push(var.raw_text()),
            TokenKind::VarAssign => {
                let mut parts = var.content().iter().filter_map(Content::as_raw);
                let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                    return;
                };
                if let Some(previous) = self.var_dict.insert(name.to_string(), value.to_string())
                {
                    warn!(variable = name, previous = %previous, value, "duplicate variable in optional arguments");
                }
            }
            _ => {}
        }
    }
}

/// Split an `Optional` token into its parts. `None`, or a token of another kind, yields the
/// empty record.
pub fn split_optionals(optional: Option<&Token>) -> OptionalArguments {
    let mut args = OptionalArguments::default();
    let Some(optional) = optional.filter(|token| token.is(TokenKind::Optional)) else {
        return args;
    };
    for part in optional.tokens() {
        match part.kind() {
            TokenKind::OptionalInsert => args.html_insert = part.raw_text(),
            TokenKind::OptionalClass => args.class_insert = part.raw_text(),
            TokenKind::OptionalVar => part.tokens().for_each(|var| args.add_var(var)),
            _ => {}
        }
    }
    args
}

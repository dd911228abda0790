//! Shortcode replacement
//!
//! After imports are merged, `@[name]` aliases and `@{name}` images are replaced by text from
//! the config store (`aliases.shortcuts.<name>` and `aliases.images.<name>`). The stored text
//! is a template filled from the shortcode's optional arguments: bare values of `[...]` are
//! positional, `name=value` pairs of `[...]` or of the `{...}` insert are keywords. Image
//! text is additionally wrapped by the exporter.
//!
//! Text around shortcodes is copied unchanged and every output line ends with `\n`.

use super::template;
use crate::bpr::config::{ConfigError, ConfigStore};
use crate::bpr::export::{Export, ExportRequest};
use crate::bpr::grammar::{Grammar, GrammarError, RuleRef};
use crate::bpr::optionals::{split_optionals, OptionalArguments};
use crate::bpr::token::{Content, Token, TokenKind};
use std::collections::BTreeMap;
use std::io::{BufRead, Cursor};
use tracing::error;

/// Errors raised while replacing shortcodes
#[derive(Debug, Clone, PartialEq)]
pub enum ShortcodeError {
    Config(ConfigError),
    /// The config entry exists but is a mapping or a list
    NotAString { key_path: String },
    Grammar(GrammarError),
    Io(String),
}

impl std::fmt::Display for ShortcodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortcodeError::Config(err) => write!(f, "{}", err),
            ShortcodeError::NotAString { key_path } => {
                write!(f, "Config entry {} is not a string", key_path)
            }
            ShortcodeError::Grammar(err) => write!(f, "{}", err),
            ShortcodeError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ShortcodeError {}

impl From<ConfigError> for ShortcodeError {
    fn from(err: ConfigError) -> Self {
        ShortcodeError::Config(err)
    }
}

impl From<GrammarError> for ShortcodeError {
    fn from(err: GrammarError) -> Self {
        ShortcodeError::Grammar(err)
    }
}

impl From<std::io::Error> for ShortcodeError {
    fn from(err: std::io::Error) -> Self {
        ShortcodeError::Io(err.to_string())
    }
}

/// Replaces shortcodes with config text.
pub struct ShortcodeResolver<'a> {
    config: &'a ConfigStore,
    export: &'a dyn Export,
    line_rule: RuleRef,
    assignments: RuleRef,
}

impl<'a> ShortcodeResolver<'a> {
    pub fn new(config: &'a ConfigStore, export: &'a dyn Export) -> Result<Self, ShortcodeError> {
        let grammar = Grammar::global();
        Ok(Self {
            config,
            export,
            line_rule: grammar.get("line_to_replace")?,
            assignments: grammar.get("assignments")?,
        })
    }

    /// Every line of `input` with shortcodes replaced.
    pub fn resolve<R: BufRead>(&self, input: R) -> Result<Cursor<String>, ShortcodeError> {
        let mut output = String::new();
        for line in input.lines() {
            output.push_str(&self.resolve_line(&line?)?);
            output.push('\n');
        }
        Ok(Cursor::new(output))
    }

    /// One line with shortcodes replaced, without a trailing newline.
    pub fn resolve_line(&self, line: &str) -> Result<String, ShortcodeError> {
        let Some(found) = self.line_rule.apply(line, 0) else {
            return Ok(line.to_string());
        };
        let mut output = String::new();
        for token in found.tokens() {
            match token.kind() {
                TokenKind::Alias => output.push_str(&self.alias(&token)?),
                TokenKind::Image => output.push_str(&self.image(&token)?),
                _ => output.push_str(&token.raw_text()),
            }
        }
        output.push_str(&line[found.end..]);
        Ok(output)
    }

    /// Text of an `Alias` token.
    pub fn alias(&self, token: &Token) -> Result<String, ShortcodeError> {
        let (name, args) = self.shortcode_parts(token);
        let text = self.lookup(&["aliases", "shortcuts", &name])?;
        Ok(self.fill(&text, &args))
    }

    /// Text of an `Image` token, wrapped by the exporter.
    pub fn image(&self, token: &Token) -> Result<String, ShortcodeError> {
        let (name, args) = self.shortcode_parts(token);
        let text = self.lookup(&["aliases", "images", &name])?;
        let request = ExportRequest::new("inline_elements", "image", &args);
        Ok(self.export.export(&request).wrap(&self.fill(&text, &args)))
    }

    fn shortcode_parts(&self, token: &Token) -> (String, OptionalArguments) {
        let name = token.raw().unwrap_or_default().to_string();
        (name, split_optionals(token.optional()))
    }

    fn lookup(&self, keys: &[&str]) -> Result<String, ShortcodeError> {
        let found = self.config.get_string(keys).map_err(|err| {
            error!("{}", err);
            ShortcodeError::from(err)
        })?;
        found.ok_or_else(|| {
            let err = ShortcodeError::NotAString {
                key_path: keys.join("."),
            };
            error!("{}", err);
            err
        })
    }

    fn fill(&self, text: &str, args: &OptionalArguments) -> String {
        let mut keywords = self.insert_keywords(&args.html_insert);
        keywords.extend(args.var_dict.clone());
        template::substitute(text, &args.var_list, &keywords)
    }

    /// `name=value` pairs of an HTML insert, when it is made only of those.
    fn insert_keywords(&self, insert: &str) -> BTreeMap<String, String> {
        let Some(found) = self.assignments.apply(insert, 0) else {
            return BTreeMap::new();
        };
        found
            .tokens()
            .iter()
            .filter(|token| token.is(TokenKind::VarAssign))
            .filter_map(|token| {
                let mut parts = token.content().iter().filter_map(Content::as_raw);
                Some((parts.next()?.to_string(), parts.next()?.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpr::export::{ExportResponse, NoWrap};

    fn config(yaml: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store.insert("aliases", serde_yaml::from_str(yaml).unwrap());
        store
    }

    fn figure(_request: &ExportRequest<'_>) -> ExportResponse {
        ExportResponse::new("<figure>", "</figure>")
    }

    #[test]
    fn alias_with_insert_keywords() {
        let store = config("shortcuts:\n  greet: 'Hi {a}'\n");
        let resolver = ShortcodeResolver::new(&store, &NoWrap).unwrap();
        assert_eq!(resolver.resolve_line("@[greet]{a=1}").unwrap(), "Hi 1");
    }

    #[test]
    fn alias_with_positional_and_keyword_vars() {
        let store = config("shortcuts:\n  pair: '{0}-{1} {k}'\n");
        let resolver = ShortcodeResolver::new(&store, &NoWrap).unwrap();
        assert_eq!(
            resolver.resolve_line("x @[pair]['a', 'b', k=v] y").unwrap(),
            "x a-b v y"
        );
    }

    #[test]
    fn unfillable_template_is_kept() {
        let store = config("shortcuts:\n  greet: 'Hi {who}'\n");
        let resolver = ShortcodeResolver::new(&store, &NoWrap).unwrap();
        assert_eq!(resolver.resolve_line("@[greet]").unwrap(), "Hi {who}");
    }

    #[test]
    fn image_is_wrapped_by_exporter() {
        let store = config("images:\n  logo: 'logo.png'\n");
        let resolver = ShortcodeResolver::new(&store, &figure).unwrap();
        assert_eq!(
            resolver.resolve_line("see @{logo}!").unwrap(),
            "see <figure>logo.png</figure>!"
        );
    }

    #[test]
    fn missing_alias_is_an_error() {
        let store = config("shortcuts: {}\n");
        let resolver = ShortcodeResolver::new(&store, &NoWrap).unwrap();
        let err = resolver.resolve_line("@[nope]").unwrap_err();
        assert!(err.to_string().contains("aliases.shortcuts.nope"));
    }

    #[test]
    fn mapping_entry_is_not_a_string() {
        let store = config("shortcuts:\n  nested: {a: 1}\n");
        let resolver = ShortcodeResolver::new(&store, &NoWrap).unwrap();
        assert_eq!(
            resolver.resolve_line("@[nested]").unwrap_err(),
            ShortcodeError::NotAString {
                key_path: "aliases.shortcuts.nested".into()
            }
        );
    }

    #[test]
    fn plain_lines_are_unchanged() {
        let store = ConfigStore::new();
        let resolver = ShortcodeResolver::new(&store, &NoWrap).unwrap();
        let out = resolver.resolve(Cursor::new("a *b*\n\n  c  \n")).unwrap();
        assert_eq!(out.into_inner(), "a *b*\n\n  c  \n");
    }
}

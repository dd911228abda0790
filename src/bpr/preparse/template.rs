//! Placeholder substitution for shortcode templates.
//!
//! Templates use brace placeholders: `{}` takes the next positional value, `{0}` a positional
//! value by index and `{name}` a keyword value. `{{` and `}}` are literal braces. Anything
//! after `:` or `!` inside a placeholder is accepted and ignored.

use std::collections::BTreeMap;
use tracing::warn;

/// Why a template could not be filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    MissingPositional(usize),
    MissingKeyword(String),
    Malformed(String),
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::MissingPositional(idx) => {
                write!(f, "no positional value at index {}", idx)
            }
            TemplateError::MissingKeyword(name) => write!(f, "no value named '{}'", name),
            TemplateError::Malformed(msg) => write!(f, "malformed template: {}", msg),
        }
    }
}

impl std::error::Error for TemplateError {}

#[derive(PartialEq)]
enum Numbering {
    Unset,
    Auto(usize),
    Manual,
}

/// Fill every placeholder of `template`.
pub fn format(
    template: &str,
    args: &[String],
    kwargs: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut numbering = Numbering::Unset;
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(TemplateError::Malformed("single '}' encountered".into())),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => {
                            return Err(TemplateError::Malformed("unexpected '{' in field".into()))
                        }
                        Some(c) => field.push(c),
                        None => return Err(TemplateError::Malformed("unclosed '{'".into())),
                    }
                }
                let name = field
                    .split([':', '!'])
                    .next()
                    .unwrap_or_default()
                    .trim();
                out.push_str(lookup(name, &mut numbering, args, kwargs)?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn lookup<'a>(
    name: &str,
    numbering: &mut Numbering,
    args: &'a [String],
    kwargs: &'a BTreeMap<String, String>,
) -> Result<&'a str, TemplateError> {
    if name.is_empty() {
        let idx = match numbering {
            Numbering::Manual => {
                return Err(TemplateError::Malformed(
                    "cannot mix automatic and manual field numbering".into(),
                ))
            }
            Numbering::Unset => 0,
            Numbering::Auto(next) => *next,
        };
        *numbering = Numbering::Auto(idx + 1);
        return args
            .get(idx)
            .map(String::as_str)
            .ok_or(TemplateError::MissingPositional(idx));
    }
    if let Ok(idx) = name.parse::<usize>() {
        if matches!(numbering, Numbering::Auto(_)) {
            return Err(TemplateError::Malformed(
                "cannot mix automatic and manual field numbering".into(),
            ));
        }
        *numbering = Numbering::Manual;
        return args
            .get(idx)
            .map(String::as_str)
            .ok_or(TemplateError::MissingPositional(idx));
    }
    kwargs
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| TemplateError::MissingKeyword(name.to_string()))
}

/// Like [`format`], but a template that cannot be filled is logged and returned unchanged.
pub fn substitute(template: &str, args: &[String], kwargs: &BTreeMap<String, String>) -> String {
    match format(template, args, kwargs) {
        Ok(filled) => filled,
        Err(err) => {
            warn!(
                template,
                args = ?args,
                kwargs = ?kwargs,
                error = %err,
                "could not find replacement values for template"
            );
            template.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kwargs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[rstest]
    #[case("Hi {a}", &[], &[("a", "1")], "Hi 1")]
    #[case("{} and {}", &["x", "y"], &[], "x and y")]
    #[case("{1}{0}", &["x", "y"], &[], "yx")]
    #[case("{{literal}} {n:>4}", &[], &[("n", "7")], "{literal} 7")]
    #[case("no placeholders", &["x"], &[], "no placeholders")]
    fn fills_placeholders(
        #[case] template: &str,
        #[case] positional: &[&str],
        #[case] named: &[(&str, &str)],
        #[case] expected: &str,
    ) {
        assert_eq!(
            format(template, &args(positional), &kwargs(named)).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case("{a}", TemplateError::MissingKeyword("a".into()))]
    #[case("{}", TemplateError::MissingPositional(0))]
    #[case("{3}", TemplateError::MissingPositional(3))]
    fn reports_missing_values(#[case] template: &str, #[case] expected: TemplateError) {
        assert_eq!(format(template, &[], &BTreeMap::new()), Err(expected));
    }

    #[rstest]
    #[case("a } b")]
    #[case("a { b")]
    #[case("{}{0}")]
    fn rejects_malformed(#[case] template: &str) {
        let result = format(template, &args(&["x"]), &BTreeMap::new());
        assert!(matches!(result, Err(TemplateError::Malformed(_))));
    }

    #[test]
    fn substitute_falls_back_to_template() {
        assert_eq!(substitute("Hi {who}", &[], &BTreeMap::new()), "Hi {who}");
    }
}

//! Export boundary
//!
//! The HTML exporter lives outside this crate. Preprocessing only needs one thing from it:
//! the opening and closing markup that wraps an element of a given category and kind, such as
//! the `<img ...>` around an image shortcode. [`Export`] is that seam. It is implemented for
//! plain closures, for [`NoWrap`] and for the config-driven [`ConfigExport`].

use crate::bpr::config::ConfigStore;
use crate::bpr::optionals::OptionalArguments;
use crate::bpr::preparse::template;
use std::collections::BTreeMap;
use tracing::debug;

/// What the exporter is asked to wrap.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub category: &'a str,
    pub kind: &'a str,
    pub optionals: &'a OptionalArguments,
}

impl<'a> ExportRequest<'a> {
    pub fn new(category: &'a str, kind: &'a str, optionals: &'a OptionalArguments) -> Self {
        Self {
            category,
            kind,
            optionals,
        }
    }
}

/// Opening and closing markup around an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResponse {
    pub start: String,
    pub end: String,
}

impl ExportResponse {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// `content` between start and end.
    pub fn wrap(&self, content: &str) -> String {
        format!("{}{}{}", self.start, content, self.end)
    }
}

pub trait Export {
    fn export(&self, request: &ExportRequest<'_>) -> ExportResponse;
}

impl<F> Export for F
where
    F: Fn(&ExportRequest<'_>) -> ExportResponse,
{
    fn export(&self, request: &ExportRequest<'_>) -> ExportResponse {
        self(request)
    }
}

/// Wraps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWrap;

impl Export for NoWrap {
    fn export(&self, _request: &ExportRequest<'_>) -> ExportResponse {
        ExportResponse::default()
    }
}

/// Reads wrappers from `export.<category>.<kind>.start` / `.end` in a config store.
///
/// The wrappers may use `{class}` and `{insert}`, filled from the request's class and HTML
/// inserts. Missing entries wrap with nothing.
#[derive(Debug, Clone)]
pub struct ConfigExport {
    config: ConfigStore,
}

impl ConfigExport {
    pub fn new(config: ConfigStore) -> Self {
        Self { config }
    }

    fn part(
        &self,
        request: &ExportRequest<'_>,
        which: &str,
        values: &BTreeMap<String, String>,
    ) -> String {
        let keys = ["export", request.category, request.kind, which];
        match self.config.get_string(&keys) {
            Ok(Some(wrapper)) => template::substitute(&wrapper, &[], values),
            _ => {
                debug!(key = %keys.join("."), "no export wrapper configured");
                String::new()
            }
        }
    }
}

impl Export for ConfigExport {
    fn export(&self, request: &ExportRequest<'_>) -> ExportResponse {
        let values = BTreeMap::from([
            ("class".to_string(), request.optionals.class_insert.clone()),
            ("insert".to_string(), request.optionals.html_insert.clone()),
        ]);
        ExportResponse {
            start: self.part(request, "start", &values),
            end: self.part(request, "end", &values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store.insert("export", serde_yaml::from_str(yaml).unwrap());
        store
    }

    fn tag_wrapper(request: &ExportRequest<'_>) -> ExportResponse {
        ExportResponse::new(format!("<{}>", request.kind), "</>")
    }

    #[test]
    fn functions_are_exporters() {
        let args = OptionalArguments::default();
        let request = ExportRequest::new("inline_elements", "image", &args);
        assert_eq!(tag_wrapper.export(&request).wrap("x"), "<image>x</>");
    }

    #[test]
    fn no_wrap_is_empty() {
        let args = OptionalArguments::default();
        let response = NoWrap.export(&ExportRequest::new("a", "b", &args));
        assert_eq!(response, ExportResponse::default());
    }

    #[test]
    fn config_export_fills_class_and_insert() {
        let store = config(
            "inline_elements:\n  image:\n    start: \"<div class='{class}' {insert}>\"\n    end: \"</div>\"\n",
        );
        let args = OptionalArguments {
            class_insert: "pic".into(),
            html_insert: "id=a".into(),
            ..Default::default()
        };
        let request = ExportRequest::new("inline_elements", "image", &args);
        let response = ConfigExport::new(store).export(&request);
        assert_eq!(response.start, "<div class='pic' id=a>");
        assert_eq!(response.end, "</div>");
    }

    #[test]
    fn config_export_without_entry_wraps_nothing() {
        let args = OptionalArguments::default();
        let request = ExportRequest::new("x", "y", &args);
        let response = ConfigExport::new(ConfigStore::new()).export(&request);
        assert_eq!(response, ExportResponse::default());
    }
}

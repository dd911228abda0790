//! Preprocessing: textual passes that run before tokenizing.
//!
//!     1. [imports]: `::<path>` directives are replaced by the merged text of the named files.
//!     2. [shortcodes]: `@[alias]` and `@{image}` are replaced by config text.
//!
//! [`Preprocessor`] runs both over one entry file and caches each stage's output, so asking
//! for a stage again returns the same buffer rewound instead of redoing the work.

pub mod directive;
pub mod imports;
pub mod shortcodes;
pub mod template;

use crate::bpr::config::ConfigStore;
use crate::bpr::export::{Export, NoWrap};
use imports::{ImportError, ImportResolver};
use shortcodes::{ShortcodeError, ShortcodeResolver};
use std::io::{BufRead, Cursor};
use std::path::{Path, PathBuf};
use tracing::info;

/// Errors raised while preprocessing
#[derive(Debug, Clone, PartialEq)]
pub enum PreparseError {
    Import(ImportError),
    Shortcode(ShortcodeError),
}

impl std::fmt::Display for PreparseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreparseError::Import(err) => write!(f, "Import error: {}", err),
            PreparseError::Shortcode(err) => write!(f, "Shortcode error: {}", err),
        }
    }
}

impl std::error::Error for PreparseError {}

impl From<ImportError> for PreparseError {
    fn from(err: ImportError) -> Self {
        PreparseError::Import(err)
    }
}

impl From<ShortcodeError> for PreparseError {
    fn from(err: ShortcodeError) -> Self {
        PreparseError::Shortcode(err)
    }
}

/// Configuration and exporter shared by a run.
pub struct Environment {
    pub config: ConfigStore,
    pub export: Box<dyn Export>,
}

impl Environment {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            config,
            export: Box::new(NoWrap),
        }
    }

    pub fn with_export(mut self, export: impl Export + 'static) -> Self {
        self.export = Box::new(export);
        self
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(ConfigStore::new())
    }
}

/// Runs the preprocessing passes over one entry file.
pub struct Preprocessor<'env> {
    env: &'env Environment,
    resolver: ImportResolver,
    root: PathBuf,
    replaced: Option<Cursor<String>>,
}

impl<'env> Preprocessor<'env> {
    pub fn new(path: impl AsRef<Path>, env: &'env Environment) -> Result<Self, PreparseError> {
        let mut resolver = ImportResolver::new();
        let root = resolver.load_root(path)?;
        Ok(Self {
            env,
            resolver,
            root,
            replaced: None,
        })
    }

    /// Absolute path of the entry file.
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self) -> &ImportResolver {
        &self.resolver
    }

    /// The entry file's own lines, no pass applied.
    pub fn readlines(&self) -> Result<&[String], PreparseError> {
        Ok(self.resolver.node(&self.root)?.readlines())
    }

    /// The entry file with imports done.
    pub fn do_imports(&mut self) -> Result<&mut Cursor<String>, PreparseError> {
        Ok(self.resolver.merge(&self.root)?)
    }

    /// The entry file with imports done and shortcodes replaced.
    pub fn do_replacements(&mut self) -> Result<&mut Cursor<String>, PreparseError> {
        if self.replaced.is_some() {
            info!(path = %self.root.display(), "replacements already done, rewinding");
            let replaced = self.replaced.get_or_insert_with(Cursor::default);
            replaced.set_position(0);
            return Ok(replaced);
        }
        let merged = Cursor::new(self.resolver.merged_text(&self.root)?);
        let shortcodes = ShortcodeResolver::new(&self.env.config, self.env.export.as_ref())?;
        let replaced = shortcodes.resolve(merged)?;
        Ok(self.replaced.insert(replaced))
    }

    /// Every line after both passes.
    pub fn all_lines(&mut self) -> Result<Vec<String>, PreparseError> {
        let replaced = self.do_replacements()?;
        Ok(replaced.get_ref().lines().map(String::from).collect())
    }

    /// Lines of the final buffer read from its current position.
    pub fn read_remaining(&mut self) -> Result<Vec<String>, PreparseError> {
        let replaced = self.do_replacements()?;
        replaced
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PreparseError::Shortcode(e.into()))
    }
}

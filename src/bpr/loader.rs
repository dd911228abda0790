//! Document loading utilities
//!
//! This module provides `DocumentLoader`, which loads bpr source from files or strings and
//! runs the pipeline stages on it. Used by both production code and tests.
//!
//! # Example
//!
//! ```rust
//! use bootstraparse::bpr::loader::DocumentLoader;
//! use bootstraparse::bpr::preparse::Environment;
//!
//! // Raw file, no preprocessing
//! let tokens = DocumentLoader::from_path("page.bpr").unwrap().tokenize().unwrap();
//!
//! // Imports and shortcodes resolved first
//! let env = Environment::default();
//! let tokens = DocumentLoader::from_preprocessed("page.bpr", &env).unwrap().tokenize().unwrap();
//!
//! // From string
//! let tokens = DocumentLoader::from_string("# Title #\n").tokenize().unwrap();
//! ```

use crate::bpr::formats::{self, FormatError};
use crate::bpr::grammar::GrammarError;
use crate::bpr::preparse::{Environment, PreparseError, Preprocessor};
use crate::bpr::token::Token;
use crate::bpr::tokenizer;
use std::fs;
use std::path::Path;
use tracing::error;

/// Error that can occur when loading documents
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderError {
    /// IO error when reading file
    IoError(String),
    /// Import or shortcode resolution failed
    PreparseError(PreparseError),
    /// Grammar rule lookup failed
    GrammarError(GrammarError),
    /// Output formatting failed
    FormatError(FormatError),
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderError::IoError(msg) => write!(f, "IO error: {}", msg),
            LoaderError::PreparseError(err) => write!(f, "Preparse error: {}", err),
            LoaderError::GrammarError(err) => write!(f, "Grammar error: {}", err),
            LoaderError::FormatError(err) => write!(f, "Format error: {}", err),
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::IoError(err.to_string())
    }
}

impl From<PreparseError> for LoaderError {
    fn from(err: PreparseError) -> Self {
        LoaderError::PreparseError(err)
    }
}

impl From<GrammarError> for LoaderError {
    fn from(err: GrammarError) -> Self {
        LoaderError::GrammarError(err)
    }
}

impl From<FormatError> for LoaderError {
    fn from(err: FormatError) -> Self {
        LoaderError::FormatError(err)
    }
}

/// Document loader with pipeline shortcuts
pub struct DocumentLoader {
    source: String,
}

impl DocumentLoader {
    /// Load a file as is, without preprocessing
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let source = fs::read_to_string(path)?;
        Ok(DocumentLoader { source })
    }

    /// Load a file with imports merged and shortcodes replaced
    ///
    /// Failures are logged with their full context before being returned.
    pub fn from_preprocessed<P: AsRef<Path>>(
        path: P,
        env: &Environment,
    ) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let run = || -> Result<String, PreparseError> {
            let mut pre = Preprocessor::new(path, env)?;
            Ok(pre.do_replacements()?.get_ref().clone())
        };
        match run() {
            Ok(source) => Ok(DocumentLoader { source }),
            Err(err) => {
                error!(path = %path.display(), error = %err, "preprocessing failed");
                Err(err.into())
            }
        }
    }

    /// Load from a string
    pub fn from_string<S: Into<String>>(source: S) -> Self {
        DocumentLoader {
            source: source.into(),
        }
    }

    /// Tokenize the source: one `line` parse per line, fenced code and quotations grouped
    pub fn tokenize(&self) -> Result<Vec<Token>, LoaderError> {
        Ok(tokenizer::tokenize(&self.source)?)
    }

    /// Tokens rendered in the named output format (`markup`, `json` or `tree`)
    pub fn render(&self, format: &str) -> Result<String, LoaderError> {
        Ok(formats::render(format, &self.tokenize()?)?)
    }

    /// Get the source string
    pub fn source(&self) -> String {
        self.source.clone()
    }

    /// Get a reference to the source string
    pub fn source_ref(&self) -> &str {
        &self.source
    }

    pub fn lines(&self) -> Vec<&str> {
        self.source.lines().collect()
    }
}

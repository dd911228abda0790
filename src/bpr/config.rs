//! Configuration store
//!
//!     Configuration is a set of folders of YAML files. Every file with a configured
//!     extension (`yaml` and `yml` by default) is loaded under its file stem, so
//!     `config/aliases.yaml` becomes the top-level key `aliases`. Two files with the same
//!     stem are merged: the later file's top-level keys overwrite the earlier ones and a
//!     warning is logged.
//!
//!     Lookups walk nested mappings by key and fail with the full dotted key path and the
//!     searched folders, since a missing key is how a misspelled shortcode surfaces.

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Errors raised while loading or querying configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A folder or file could not be read
    Io { path: PathBuf, message: String },
    /// A file is not valid YAML
    Yaml { file: PathBuf, message: String },
    /// A key path does not exist
    MissingKey {
        key_path: String,
        folders: Vec<PathBuf>,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Could not read {}: {}", path.display(), message)
            }
            ConfigError::Yaml { file, message } => {
                write!(f, "Error parsing config file {}: {}", file.display(), message)
            }
            ConfigError::MissingKey { key_path, folders } => {
                let folders = folders
                    .iter()
                    .map(|folder| folder.display().to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "Could not find key {} in configs {}", key_path, folders)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Layered configuration loaded from YAML folders.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    folders: Vec<PathBuf>,
    extensions: Vec<String>,
    loaded: BTreeMap<String, Value>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Empty store with the default extensions.
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            loaded: BTreeMap::new(),
        }
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|ext| ext.to_string()).collect();
        self
    }

    /// Store loaded from each folder in order.
    pub fn from_folders<I, P>(folders: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut store = Self::new();
        for folder in folders {
            store.add_folder(folder)?;
        }
        Ok(store)
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    /// Names of the loaded top-level entries.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }

    pub fn add_folder(&mut self, folder: impl AsRef<Path>) -> Result<(), ConfigError> {
        let folder = folder.as_ref().to_path_buf();
        self.load_folder(&folder)?;
        self.folders.push(folder);
        Ok(())
    }

    /// Drop everything loaded and read every folder again.
    pub fn reload_all(&mut self) -> Result<(), ConfigError> {
        self.loaded.clear();
        for folder in self.folders.clone() {
            self.load_folder(&folder)?;
        }
        Ok(())
    }

    fn load_folder(&mut self, folder: &Path) -> Result<(), ConfigError> {
        let io_error = |e: std::io::Error| ConfigError::Io {
            path: folder.to_path_buf(),
            message: e.to_string(),
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(folder).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let wanted = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| self.extensions.iter().any(|e| e == ext));
            if wanted && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        for file in files {
            self.load_file(&file)?;
        }
        Ok(())
    }

    /// Load one YAML file under its stem.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let value: Value = serde_yaml::from_str(&text).map_err(|e| ConfigError::Yaml {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(file = %path.display(), name = %name, "loaded config file");
        self.insert(name, value);
        Ok(())
    }

    /// Add a top-level entry, merging into an existing one of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.loaded.get_mut(&name) {
            None => {
                self.loaded.insert(name, value);
            }
            Some(existing) => {
                warn!(name = %name, "config entry already loaded, merging");
                match (existing, value) {
                    (Value::Mapping(current), Value::Mapping(update)) => {
                        for (key, val) in update {
                            current.insert(key, val);
                        }
                    }
                    (_, Value::Null) => {}
                    (current, update) => *current = update,
                }
            }
        }
    }

    /// Walk nested mappings along `keys`.
    pub fn get(&self, keys: &[&str]) -> Result<&Value, ConfigError> {
        let missing = || ConfigError::MissingKey {
            key_path: keys.join("."),
            folders: self.folders.clone(),
        };
        let (first, rest) = keys.split_first().ok_or_else(missing)?;
        let mut node = self.loaded.get(*first).ok_or_else(missing)?;
        for key in rest {
            node = node.get(*key).ok_or_else(missing)?;
        }
        Ok(node)
    }

    /// Scalar at `keys` rendered as a string; `None` for mappings and sequences.
    pub fn get_string(&self, keys: &[&str]) -> Result<Option<String>, ConfigError> {
        Ok(match self.get(keys)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        })
    }
}

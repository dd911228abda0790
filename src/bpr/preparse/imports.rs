//! Import resolution
//!
//!     A document may pull other files in with `::<path>` directives. Resolution happens on
//!     raw lines, before any tokenizing: every directive line is dropped and replaced by the
//!     fully merged text of the file it names.
//!
//!     Files are nodes of an import graph owned by an [`ImportResolver`], keyed by absolute
//!     normalized path, so a file imported from several places is read and merged once. Each
//!     node remembers the chain of files through which it was first reached; a directive
//!     naming a file already on the importing node's chain is a cycle and aborts the run.
//!
//! Stages
//!
//!     Each node goes through three cached stages, each running the previous one on demand:
//!
//!     1. `parse_import_list`: directives found in the file, with their line numbers.
//!     2. `build_import_graph`: child nodes created (or reused) and checked for cycles.
//!     3. `merge`: the file's lines with every directive line replaced by the child's
//!        merged text. A second request returns the same buffer rewound to the start.

use super::directive;
use crate::bpr::paths::{self, PathResolver};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Errors raised while resolving imports
#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    /// A file could not be read
    Io { path: PathBuf, message: String },
    /// A directive names a file that does not exist
    MissingImport {
        path: PathBuf,
        importer: PathBuf,
        line: usize,
    },
    /// A directive names a file that is already being imported
    Cycle { path: PathBuf, chain: Vec<PathBuf> },
    /// The path was never loaded into the resolver
    NotLoaded(PathBuf),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io { path, message } => {
                write!(f, "Could not read {}: {}", path.display(), message)
            }
            ImportError::MissingImport {
                path,
                importer,
                line,
            } => write!(
                f,
                "File {} imported at line {} of {} does not exist",
                path.display(),
                line,
                importer.display()
            ),
            ImportError::Cycle { path, chain } => {
                let chain = chain
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                write!(f, "Import cycle on {}: {}", path.display(), chain)
            }
            ImportError::NotLoaded(path) => {
                write!(f, "No import node for {}", path.display())
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// One directive: the resolved target and the 0-based line it sits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub path: PathBuf,
    pub line: usize,
}

/// One file of the import graph.
#[derive(Debug)]
pub struct ImportNode {
    path: PathBuf,
    resolver: PathResolver,
    lines: Vec<String>,
    ancestors: Vec<PathBuf>,
    directives: Option<Vec<ImportDirective>>,
    local: Option<Vec<PathBuf>>,
    merged: Option<Cursor<String>>,
}

impl ImportNode {
    fn read(path: &Path, ancestors: Vec<PathBuf>) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            resolver: PathResolver::new(path),
            lines: text.lines().map(String::from).collect(),
            ancestors,
            directives: None,
            local: None,
            merged: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for display.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// The file's own lines, without any import done.
    pub fn readlines(&self) -> &[String] {
        &self.lines
    }

    /// Files through which this node was first reached, outermost first.
    pub fn ancestors(&self) -> &[PathBuf] {
        &self.ancestors
    }

    /// Ancestors followed by the node itself.
    pub fn lineage(&self) -> Vec<PathBuf> {
        let mut chain = self.ancestors.clone();
        chain.push(self.path.clone());
        chain
    }

    /// Distinct files this node imports, once the graph is built.
    pub fn local_imports(&self) -> Option<&[PathBuf]> {
        self.local.as_deref()
    }

    pub fn is_merged(&self) -> bool {
        self.merged.is_some()
    }
}

/// The import graph of one run.
#[derive(Debug, Default)]
pub struct ImportResolver {
    nodes: HashMap<PathBuf, ImportNode>,
    merging: HashSet<PathBuf>,
}

impl ImportResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the entry file and return its key.
    pub fn load_root(&mut self, path: impl AsRef<Path>) -> Result<PathBuf, ImportError> {
        let path = path.as_ref();
        let io_error = |e: std::io::Error| ImportError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let key = paths::absolute(path).map_err(io_error)?;
        if !self.nodes.contains_key(&key) {
            let node = ImportNode::read(&key, Vec::new()).map_err(io_error)?;
            debug!(path = %key.display(), "loaded root file");
            self.nodes.insert(key.clone(), node);
        }
        Ok(key)
    }

    pub fn node(&self, key: &Path) -> Result<&ImportNode, ImportError> {
        self.nodes
            .get(key)
            .ok_or_else(|| ImportError::NotLoaded(key.to_path_buf()))
    }

    fn node_mut(&mut self, key: &Path) -> Result<&mut ImportNode, ImportError> {
        self.nodes
            .get_mut(key)
            .ok_or_else(|| ImportError::NotLoaded(key.to_path_buf()))
    }

    /// Number of files in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Directives of a file, targets resolved against the file's directory.
    pub fn parse_import_list(&mut self, key: &Path) -> Result<Vec<ImportDirective>, ImportError> {
        let node = self.node_mut(key)?;
        if let Some(directives) = &node.directives {
            return Ok(directives.clone());
        }
        let directives: Vec<ImportDirective> = node
            .lines
            .iter()
            .enumerate()
            .flat_map(|(line, text)| {
                directive::paths_in_line(text)
                    .into_iter()
                    .map(move |target| (line, target))
            })
            .map(|(line, target)| ImportDirective {
                path: node.resolver.resolve(target),
                line,
            })
            .collect();
        debug!(path = %key.display(), count = directives.len(), "parsed import list");
        node.directives = Some(directives.clone());
        Ok(directives)
    }

    /// Create or reuse the node of every import, depth first, rejecting cycles.
    ///
    /// Returns the distinct files the node imports.
    pub fn build_import_graph(&mut self, key: &Path) -> Result<Vec<PathBuf>, ImportError> {
        if let Some(local) = self.node(key)?.local_imports() {
            return Ok(local.to_vec());
        }
        let directives = self.parse_import_list(key)?;
        let lineage = self.node(key)?.lineage();
        let mut local: Vec<PathBuf> = Vec::new();
        for directive in &directives {
            let target = &directive.path;
            if lineage.contains(target) {
                let mut chain = lineage.clone();
                chain.push(target.clone());
                let err = ImportError::Cycle {
                    path: target.clone(),
                    chain,
                };
                error!(importer = %key.display(), line = directive.line + 1, "{}", err);
                return Err(err);
            }
            if local.contains(target) {
                warn!(
                    importer = %key.display(),
                    path = %target.display(),
                    line = directive.line + 1,
                    "file imported more than once"
                );
                continue;
            }
            if self.nodes.contains_key(target) {
                debug!(path = %target.display(), "reusing import node");
            } else {
                let child = ImportNode::read(target, lineage.clone()).map_err(|_| {
                    let err = ImportError::MissingImport {
                        path: target.clone(),
                        importer: key.to_path_buf(),
                        line: directive.line + 1,
                    };
                    error!("{}", err);
                    err
                })?;
                debug!(path = %target.display(), depth = lineage.len(), "created import node");
                self.nodes.insert(target.clone(), child);
                self.build_import_graph(target)?;
            }
            local.push(target.clone());
        }
        self.node_mut(key)?.local = Some(local.clone());
        Ok(local)
    }

    /// The file with every import done, as a readable buffer.
    pub fn merge(&mut self, key: &Path) -> Result<&mut Cursor<String>, ImportError> {
        if self.node(key)?.is_merged() {
            info!(path = %key.display(), "imports already done, rewinding");
            let node = self.node_mut(key)?;
            let merged = node.merged.get_or_insert_with(Cursor::default);
            merged.set_position(0);
            return Ok(merged);
        }
        self.build_import_graph(key)?;
        if !self.merging.insert(key.to_path_buf()) {
            return Err(ImportError::Cycle {
                path: key.to_path_buf(),
                chain: vec![key.to_path_buf()],
            });
        }
        let node = self.node(key)?;
        let lines = node.lines.clone();
        let directives = node.directives.clone().unwrap_or_default();

        let mut text = String::new();
        let mut next = 0;
        for directive in &directives {
            if directive.line >= next {
                for line in &lines[next..directive.line] {
                    text.push_str(line);
                    text.push('\n');
                }
                next = directive.line + 1;
            }
            let imported = self.merge(&directive.path)?.get_ref().clone();
            text.push_str(&imported);
        }
        for line in &lines[next.min(lines.len())..] {
            text.push_str(line);
            text.push('\n');
        }

        self.merging.remove(key);
        debug!(path = %key.display(), bytes = text.len(), "merged imports");
        let node = self.node_mut(key)?;
        Ok(node.merged.insert(Cursor::new(text)))
    }

    /// Merged text of a file.
    pub fn merged_text(&mut self, key: &Path) -> Result<String, ImportError> {
        Ok(self.merge(key)?.get_ref().clone())
    }

    /// One line per import directive below `root`, drawn as a tree with the 1-based line
    /// of each directive.
    ///
    /// Entries that were never resolved are flagged with `!!`: a file whose directives were
    /// not parsed yet, a target with no node (missing, or the graph was not built) and a
    /// target already on the branch (cycle).
    pub fn tree(&self, root: &Path) -> String {
        let Some(node) = self.nodes.get(root) else {
            return String::new();
        };
        let mut output = format!("⧉ {}\n", node.name());
        let mut branch = vec![node.path()];
        self.format_children(node, "", &mut branch, &mut output);
        output
    }

    fn format_children<'a>(
        &'a self,
        node: &'a ImportNode,
        prefix: &str,
        branch: &mut Vec<&'a Path>,
        output: &mut String,
    ) {
        let Some(directives) = node.directives.as_deref() else {
            output.push_str(&format!(
                "{}└─ !! imports not parsed, run build_import_graph first\n",
                prefix
            ));
            return;
        };
        for (idx, directive) in directives.iter().enumerate() {
            let is_last = idx + 1 == directives.len();
            let connector = if is_last { "└─" } else { "├─" };
            let line = directive.line + 1;
            let target = directive
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| directive.path.display().to_string());
            let child = match self.nodes.get(&directive.path) {
                None => {
                    output.push_str(&format!(
                        "{}{} !! {} (line {}) not resolved\n",
                        prefix, connector, target, line
                    ));
                    continue;
                }
                Some(_) if branch.contains(&directive.path.as_path()) => {
                    output.push_str(&format!(
                        "{}{} !! {} (line {}) cycle\n",
                        prefix, connector, target, line
                    ));
                    continue;
                }
                Some(child) => child,
            };
            output.push_str(&format!(
                "{}{} ↳ {} (line {})\n",
                prefix, connector, target, line
            ));
            let child_prefix = format!("{}{}", prefix, if is_last { "  " } else { "│ " });
            branch.push(child.path());
            self.format_children(child, &child_prefix, branch, output);
            branch.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn directives_resolve_relative_to_file() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "pages/index.bpr", "a\n::<../parts/nav.bpr>\n");
        write(dir.path(), "parts/nav.bpr", "nav\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        let directives = resolver.parse_import_list(&key).unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].line, 1);
        assert!(directives[0].path.ends_with("parts/nav.bpr"));
        assert!(directives[0].path.is_absolute());
    }

    #[test]
    fn merge_splices_imported_text() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "top\n::<a.bpr>\nbottom\n");
        write(dir.path(), "a.bpr", "a1\n::<b.bpr>\na2\n");
        write(dir.path(), "b.bpr", "b1\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        let text = resolver.merged_text(&key).unwrap();
        assert_eq!(text, "top\na1\nb1\na2\nbottom\n");
        assert_eq!(resolver.len(), 3);
    }

    #[test]
    fn several_paths_on_one_line() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "::<a.bpr> <b.bpr>\nend\n");
        write(dir.path(), "a.bpr", "A\n");
        write(dir.path(), "b.bpr", "B\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        assert_eq!(resolver.merged_text(&key).unwrap(), "A\nB\nend\n");
    }

    #[test]
    fn shared_import_is_one_node() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "::<a.bpr>\n::<b.bpr>\n");
        write(dir.path(), "a.bpr", "::<common.bpr>\n");
        write(dir.path(), "b.bpr", "::<./common.bpr>\n");
        write(dir.path(), "common.bpr", "shared\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        assert_eq!(resolver.merged_text(&key).unwrap(), "shared\nshared\n");
        assert_eq!(resolver.len(), 4);
    }

    #[test]
    fn second_merge_is_rewound() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "only\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        let mut first = String::new();
        resolver.merge(&key).unwrap().read_to_string(&mut first).unwrap();
        let mut second = String::new();
        resolver.merge(&key).unwrap().read_to_string(&mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, "only\n");
    }

    #[test]
    fn cycle_is_rejected() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "a.bpr", "::<b.bpr>\n");
        write(dir.path(), "b.bpr", "::<a.bpr>\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        let err = resolver.merge(&key).unwrap_err();
        match err {
            ImportError::Cycle { path, chain } => {
                assert_eq!(path, key);
                assert_eq!(chain.len(), 3);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn self_import_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "a.bpr", "x\n::<a.bpr>\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        assert!(matches!(
            resolver.build_import_graph(&key),
            Err(ImportError::Cycle { .. })
        ));
    }

    #[test]
    fn missing_import_names_importer_and_line() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "x\ny\n::<gone.bpr>\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        let err = resolver.merge(&key).unwrap_err();
        assert!(matches!(
            &err,
            ImportError::MissingImport { line: 3, importer, .. } if importer == &key
        ));
        assert!(err.to_string().contains("gone.bpr"));
    }

    #[test]
    fn tree_shows_nested_imports() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "::<a.bpr>\n::<b.bpr>\n");
        write(dir.path(), "a.bpr", "::<c.bpr>\n");
        write(dir.path(), "b.bpr", "b\n");
        write(dir.path(), "c.bpr", "c\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        resolver.build_import_graph(&key).unwrap();
        insta::assert_snapshot!(resolver.tree(&key), @r"
        ⧉ main.bpr
        ├─ ↳ a.bpr (line 1)
        │ └─ ↳ c.bpr (line 1)
        └─ ↳ b.bpr (line 2)
        ");
    }

    #[test]
    fn tree_lists_every_directive() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "x\n::<a.bpr>\ny\n::<a.bpr>\n");
        write(dir.path(), "a.bpr", "a\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        resolver.build_import_graph(&key).unwrap();
        insta::assert_snapshot!(resolver.tree(&key), @r"
        ⧉ main.bpr
        ├─ ↳ a.bpr (line 2)
        └─ ↳ a.bpr (line 4)
        ");
    }

    #[test]
    fn tree_flags_unresolved_entries() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.bpr", "x\n::<a.bpr>\n");
        write(dir.path(), "a.bpr", "a\n");
        let mut resolver = ImportResolver::new();
        let key = resolver.load_root(&root).unwrap();
        assert_eq!(
            resolver.tree(&key),
            "⧉ main.bpr\n└─ !! imports not parsed, run build_import_graph first\n"
        );
        resolver.parse_import_list(&key).unwrap();
        assert_eq!(
            resolver.tree(&key),
            "⧉ main.bpr\n└─ !! a.bpr (line 2) not resolved\n"
        );
    }
}

//! End-to-end preprocessing: imports, shortcodes and tokenizing over real files

use bootstraparse::bpr::config::ConfigStore;
use bootstraparse::bpr::export::{ConfigExport, ExportRequest, ExportResponse};
use bootstraparse::bpr::preparse::imports::ImportError;
use bootstraparse::bpr::preparse::{Environment, PreparseError, Preprocessor};
use bootstraparse::{DocumentLoader, TokenKind};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        Site {
            dir: TempDir::new().unwrap(),
        }
    }

    fn file(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn config_with(site: &Site, files: &[(&str, &str)]) -> ConfigStore {
    for (name, text) in files {
        site.file(&format!("config/{}", name), text);
    }
    ConfigStore::from_folders([site.path().join("config")]).unwrap()
}

fn image_tag(request: &ExportRequest<'_>) -> ExportResponse {
    ExportResponse::new(
        format!("<img class=\"{}\" src=\"", request.optionals.class_insert),
        "\">",
    )
}

#[test]
fn imports_and_shortcodes_feed_the_tokenizer() {
    let site = Site::new();
    let config = config_with(
        &site,
        &[(
            "aliases.yaml",
            "shortcuts:\n  greet: 'Hi {a}'\n  sig: '-- {0}'\nimages:\n  logo: 'logo.png'\n",
        )],
    );
    site.file("parts/header.bpr", "# @[greet]{a=1} #\n");
    site.file("parts/footer.bpr", "@{logo}{{wide}}\n@[sig]['Ada']\n");
    let root = site.file(
        "index.bpr",
        "::<parts/header.bpr>\nBody with *em*\n::<parts/footer.bpr>\n",
    );

    let env = Environment::new(config).with_export(image_tag);
    let loader = DocumentLoader::from_preprocessed(&root, &env).unwrap();
    assert_eq!(
        loader.source_ref(),
        "# Hi 1 #\nBody with *em*\n<img class=\"wide\" src=\"logo.png\">\n-- Ada\n"
    );

    let tokens = loader.tokenize().unwrap();
    assert_eq!(
        tokens.iter().filter(|t| t.is(TokenKind::Linebreak)).count(),
        4
    );
    assert!(tokens[0].is(TokenKind::Header));
}

#[test]
fn config_export_wraps_images() {
    let site = Site::new();
    let config = config_with(
        &site,
        &[
            ("aliases.yaml", "images:\n  cat: 'cat.jpg'\n"),
            (
                "export.yaml",
                "inline_elements:\n  image:\n    start: '<img class=\"{class}\" src=\"'\n    end: '\">'\n",
            ),
        ],
    );
    let root = site.file("page.bpr", "@{cat}{{round}}\n");
    let env = Environment::new(config.clone()).with_export(ConfigExport::new(config));
    let mut pre = Preprocessor::new(&root, &env).unwrap();
    assert_eq!(
        pre.all_lines().unwrap(),
        vec!["<img class=\"round\" src=\"cat.jpg\">"]
    );
}

#[test]
fn missing_shortcode_aborts_with_key_path() {
    let site = Site::new();
    let config = config_with(&site, &[("aliases.yaml", "shortcuts: {}\n")]);
    let root = site.file("page.bpr", "text @[nope] text\n");
    let env = Environment::new(config);
    let err = DocumentLoader::from_preprocessed(&root, &env)
        .err()
        .unwrap();
    assert!(err.to_string().contains("aliases.shortcuts.nope"));
}

#[test]
fn import_cycle_aborts() {
    let site = Site::new();
    let root = site.file("a.bpr", "::<b.bpr>\n");
    site.file("b.bpr", "::<c.bpr>\n");
    site.file("c.bpr", "::<a.bpr>\n");
    let env = Environment::default();
    let mut pre = Preprocessor::new(&root, &env).unwrap();
    let err = pre.do_imports().unwrap_err();
    match err {
        PreparseError::Import(ImportError::Cycle { chain, .. }) => {
            let names: Vec<_> = chain
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            assert_eq!(names, vec!["a.bpr", "b.bpr", "c.bpr", "a.bpr"]);
        }
        other => panic!("expected an import cycle, got {:?}", other),
    }
}

#[test]
fn diamond_imports_are_shared() {
    let site = Site::new();
    let root = site.file("main.bpr", "::<left.bpr> <right.bpr>\n");
    site.file("left.bpr", "L\n::<shared/base.bpr>\n");
    site.file("right.bpr", "R\n::<shared/../shared/base.bpr>\n");
    site.file("shared/base.bpr", "base\n");
    let env = Environment::default();
    let mut pre = Preprocessor::new(&root, &env).unwrap();
    let merged = pre.do_imports().unwrap().get_ref().clone();
    assert_eq!(merged, "L\nbase\nR\nbase\n");
    assert_eq!(pre.resolver().len(), 4);
}

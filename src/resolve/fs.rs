use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::platform::{self, PathKind};
use crate::resolve::{LoadError, ModuleHandle, ModuleResolver};

pub const DEFAULT_CANDIDATES: &[&str] = &[
    "{path}.py",
    "{path}/__init__.py",
    "{path}.rs",
    "{path}/mod.rs",
];

/// Resolves dotted module names to source files under a set of search paths.
#[derive(Debug, Clone)]
pub struct FsResolver {
    search_paths: Vec<PathBuf>,
    candidates: Vec<String>,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            search_paths: vec![root.into()],
            candidates: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        if !paths.is_empty() {
            self.search_paths = paths;
        }
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        if !candidates.is_empty() {
            self.candidates = candidates;
        }
        self
    }

    fn locate(&self, name: &str) -> Result<Option<PathBuf>, LoadError> {
        let rel_path = name.replace('.', "/");
        for dir in &self.search_paths {
            for template in &self.candidates {
                let candidate = template
                    .replace("{path}", &rel_path)
                    .replace("{name}", name);
                let path = dir.join(candidate);
                match platform::path_kind(&path) {
                    Ok(Some(PathKind::File)) => return Ok(Some(path)),
                    Ok(_) => {}
                    Err(err) => return Err(LoadError::failed(name, err.to_string())),
                }
            }
        }
        Ok(None)
    }

    fn searched(&self) -> String {
        let dirs: Vec<String> = self
            .search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!("searched {}", dirs.join(", "))
    }
}

impl ModuleResolver for FsResolver {
    fn resolve(&self, name: &str) -> Result<ModuleHandle, LoadError> {
        let Some(path) = self.locate(name)? else {
            return Err(LoadError::NotFound {
                name: name.to_string(),
                detail: self.searched(),
            });
        };

        let mut handle = ModuleHandle::new(name).with_location(path.clone());
        match std::fs::read_to_string(&path) {
            Ok(source) => {
                let scanned = scan_source(&source);
                handle = handle.with_exports(scanned.exports);
                for (k, v) in scanned.metadata {
                    handle = handle.with_metadata(k, v);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {}
            Err(err) => return Err(LoadError::failed(name, err.to_string())),
        }
        Ok(handle)
    }
}

#[derive(Debug, Default)]
struct ScannedSource {
    exports: BTreeSet<String>,
    metadata: BTreeMap<String, String>,
}

const DEFINITION_KEYWORDS: &[&str] = &[
    "def ", "class ", "fn ", "struct ", "enum ", "trait ", "const ", "static ", "type ", "mod ",
];

const MODIFIERS: &[&str] = &["pub(crate) ", "pub ", "async ", "unsafe "];

/// Line-based scan of top-level definitions and `__key__ = "value"` metadata.
fn scan_source(source: &str) -> ScannedSource {
    let mut out = ScannedSource::default();
    for line in source.lines() {
        if line.starts_with(char::is_whitespace) || line.starts_with('#') {
            continue;
        }
        let mut rest = line.trim_end();
        while let Some(stripped) = MODIFIERS.iter().find_map(|m| rest.strip_prefix(*m)) {
            rest = stripped;
        }

        if let Some(after) = DEFINITION_KEYWORDS.iter().find_map(|k| rest.strip_prefix(*k)) {
            if let Some(ident) = leading_ident(after) {
                out.exports.insert(ident.to_string());
            }
            continue;
        }

        if let Some(imported) = rest
            .strip_prefix("from ")
            .and_then(|r| r.split_once(" import "))
            .map(|(_, names)| names)
        {
            for item in imported.trim_matches(|c| c == '(' || c == ')').split(',') {
                let alias = item.split(" as ").last().unwrap_or(item).trim();
                if let Some(ident) = leading_ident(alias) {
                    out.exports.insert(ident.to_string());
                }
            }
            continue;
        }

        let Some(ident) = leading_ident(rest) else {
            continue;
        };
        let tail = rest[ident.len()..].trim_start();
        let Some(value) = tail.strip_prefix('=') else {
            continue;
        };
        if value.starts_with('=') {
            continue;
        }
        out.exports.insert(ident.to_string());

        let key = ident
            .strip_prefix("__")
            .and_then(|k| k.strip_suffix("__"))
            .filter(|k| !k.is_empty());
        if let (Some(key), Some(text)) = (key, string_literal(value.trim())) {
            out.metadata.insert(key.to_string(), text.to_string());
        }
    }
    out
}

fn leading_ident(s: &str) -> Option<&str> {
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let ident = &s[..end];
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        None
    } else {
        Some(ident)
    }
}

fn string_literal(s: &str) -> Option<&str> {
    let quote = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &s[1..];
    let end = inner.find(quote)?;
    Some(&inner[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn make_temp_root() -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "readycheck-fs-resolver-test-{}-{seq}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create dir");
        dir
    }

    fn write_file(path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdirs");
        }
        std::fs::write(path, body).expect("write");
    }

    #[test]
    fn scan_collects_top_level_definitions_and_metadata() {
        let scanned = scan_source(
            r#"
__version__ = "2.0.0"
__author__ = 'someone'
from .core import Engine, Detector as PrimaryDetector
import json

class ScanConfiguration:
    def nested(self):
        pass

async def main():
    pass

DEFAULT_LIMIT = 10
if DEFAULT_LIMIT == 10:
    pass
pub fn build() {}
"#,
        );
        for name in [
            "__version__",
            "Engine",
            "PrimaryDetector",
            "ScanConfiguration",
            "main",
            "DEFAULT_LIMIT",
            "build",
        ] {
            assert!(scanned.exports.contains(name), "missing export {name}");
        }
        assert!(!scanned.exports.contains("nested"));
        assert!(!scanned.exports.contains("Detector"));
        assert_eq!(scanned.metadata.get("version").map(String::as_str), Some("2.0.0"));
        assert_eq!(scanned.metadata.get("author").map(String::as_str), Some("someone"));
    }

    #[test]
    fn resolves_packages_and_plain_modules() {
        let root = make_temp_root();
        write_file(
            &root.join("pkg/__init__.py"),
            "__version__ = \"1.2.3\"\nfrom .core import Engine\n",
        );
        write_file(&root.join("pkg/core.py"), "class Engine:\n    pass\n");

        let resolver = FsResolver::new(&root);
        let pkg = resolver.resolve("pkg").expect("package");
        assert_eq!(pkg.version(), Some("1.2.3"));
        assert!(pkg.has_symbol("Engine"));

        let core = resolver.resolve_in("pkg", "core").expect("module");
        assert_eq!(core.name(), "pkg.core");
        assert_eq!(core.location(), Some(root.join("pkg/core.py").as_path()));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_module_reports_search_paths() {
        let root = make_temp_root();
        let resolver = FsResolver::new(&root).with_candidates(vec!["{path}.py".to_string()]);

        let err = resolver.resolve("pkg.gone").expect_err("missing");
        match err {
            LoadError::NotFound { name, detail } => {
                assert_eq!(name, "pkg.gone");
                assert!(detail.contains(&root.display().to_string()), "detail={detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn later_search_paths_are_consulted() {
        let root = make_temp_root();
        write_file(&root.join("vendor/lib/helper.py"), "def run():\n    pass\n");

        let resolver =
            FsResolver::new(&root).with_search_paths(vec![root.join("src"), root.join("vendor/lib")]);
        let helper = resolver.resolve("helper").expect("helper");
        assert!(helper.has_symbol("run"));

        let _ = std::fs::remove_dir_all(&root);
    }
}

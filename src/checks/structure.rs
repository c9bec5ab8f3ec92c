use std::path::PathBuf;

use crate::checks::{isolate, record, stage_finished};
use crate::core::{Category, CheckReport, CheckResult, FailureKind};
use crate::platform::{self, PathKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredPath {
    pub path: PathBuf,
    pub kind: ExpectedKind,
}

impl RequiredPath {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ExpectedKind::File,
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ExpectedKind::Dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructuralChecker {
    root: PathBuf,
    required: Vec<RequiredPath>,
}

impl StructuralChecker {
    pub fn new(root: impl Into<PathBuf>, required: Vec<RequiredPath>) -> Self {
        Self {
            root: root.into(),
            required,
        }
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    pub fn run(&self, report: &mut CheckReport) {
        for req in &self.required {
            let name = format!("structure: {}", req.path.display());
            let result = isolate(&name, Category::Structural, || self.check(&name, req));
            record(report, result);
        }
        stage_finished(report, Category::Structural);
    }

    fn check(&self, name: &str, req: &RequiredPath) -> CheckResult {
        let full = self.root.join(&req.path);
        let shown = req.path.display();
        let failed = |detail: String| {
            CheckResult::failed(name, Category::Structural, FailureKind::MissingResource, detail)
        };

        match (platform::path_kind(&full), req.kind) {
            (Ok(Some(PathKind::File)), ExpectedKind::File)
            | (Ok(Some(PathKind::Dir)), ExpectedKind::Dir) => {
                CheckResult::success(name, Category::Structural)
            }
            (Ok(Some(PathKind::Dir)), ExpectedKind::File) => {
                failed(format!("expected file, found directory: {shown}"))
            }
            (Ok(Some(PathKind::File)), ExpectedKind::Dir) => {
                failed(format!("expected directory, found file: {shown}"))
            }
            (Ok(Some(PathKind::Other)), _) => {
                failed(format!("not a regular file or directory: {shown}"))
            }
            (Ok(None), _) => failed(format!("missing: {shown}")),
            (Err(err), _) => failed(format!("{shown}: {err}")),
        }
    }
}

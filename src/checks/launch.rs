use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::checks::{isolate, record, stage_finished};
use crate::core::{Category, CheckReport, CheckResult, FailureKind};
use crate::platform::{self, PathKind};
use crate::resolve::{ModuleHandle, ModuleRegistry, ModuleResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    Script(PathBuf),
    Callable { module: String, symbol: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEntry {
    pub name: String,
    pub target: LaunchTarget,
}

impl LaunchEntry {
    pub fn script(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            target: LaunchTarget::Script(path.into()),
        }
    }

    pub fn callable(
        name: impl Into<String>,
        module: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: LaunchTarget::Callable {
                module: module.into(),
                symbol: symbol.into(),
            },
        }
    }
}

/// Confirms entry points exist. Nothing is ever invoked.
pub struct LaunchSurfaceChecker {
    root: PathBuf,
    resolver: Arc<dyn ModuleResolver>,
    entries: Vec<LaunchEntry>,
}

impl LaunchSurfaceChecker {
    pub fn new(
        root: impl Into<PathBuf>,
        resolver: Arc<dyn ModuleResolver>,
        entries: Vec<LaunchEntry>,
    ) -> Self {
        Self {
            root: root.into(),
            resolver,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn run(&self, report: &mut CheckReport, registry: &ModuleRegistry) {
        for entry in &self.entries {
            let name = format!("launch: {}", entry.name);
            let result = isolate(&name, Category::LaunchSurface, || match &entry.target {
                LaunchTarget::Script(path) => self.check_script(&name, path),
                LaunchTarget::Callable { module, symbol } => {
                    self.check_callable(&name, registry, module, symbol)
                }
            });
            record(report, result);
        }
        stage_finished(report, Category::LaunchSurface);
    }

    fn check_script(&self, name: &str, path: &Path) -> CheckResult {
        let shown = path.display();
        let detail = match platform::path_kind(&self.root.join(path)) {
            Ok(Some(PathKind::File)) => return CheckResult::success(name, Category::LaunchSurface),
            Ok(Some(_)) => format!("not a file: {shown}"),
            Ok(None) => format!("missing: {shown}"),
            Err(err) => format!("{shown}: {err}"),
        };
        CheckResult::failed(
            name,
            Category::LaunchSurface,
            FailureKind::MissingResource,
            detail,
        )
    }

    fn check_callable(
        &self,
        name: &str,
        registry: &ModuleRegistry,
        module: &str,
        symbol: &str,
    ) -> CheckResult {
        let fresh: ModuleHandle;
        let handle = match registry.get(module) {
            Some(handle) => handle,
            None => match self.resolver.resolve(module) {
                Ok(handle) => {
                    fresh = handle;
                    &fresh
                }
                Err(err) => return unresolved(name, err.to_string()),
            },
        };
        match self.resolver.resolve_symbol(handle, symbol) {
            Ok(()) => CheckResult::success(name, Category::LaunchSurface),
            Err(err) => unresolved(name, err.to_string()),
        }
    }
}

fn unresolved(name: &str, detail: String) -> CheckResult {
    CheckResult::failed(
        name,
        Category::LaunchSurface,
        FailureKind::UnresolvedDependency,
        detail,
    )
}

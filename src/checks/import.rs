use std::sync::Arc;

use crate::checks::{isolate, record, stage_finished};
use crate::core::{Category, CheckReport, CheckResult, FailureKind};
use crate::resolve::{ModuleHandle, ModuleRegistry, ModuleResolver, qualify};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    pub module: String,
    pub package: String,
}

impl ModuleSpec {
    pub fn new(package: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            package: package.into(),
        }
    }

    pub fn qualified(&self) -> String {
        qualify(&self.package, &self.module)
    }
}

/// Loads internal modules and hands every successful load to the registry so
/// later stages reuse the handle instead of resolving again.
pub struct ModuleImportTester {
    resolver: Arc<dyn ModuleResolver>,
    modules: Vec<ModuleSpec>,
}

impl ModuleImportTester {
    pub fn new(resolver: Arc<dyn ModuleResolver>, modules: Vec<ModuleSpec>) -> Self {
        Self { resolver, modules }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn run(&self, report: &mut CheckReport, registry: &mut ModuleRegistry) {
        for spec in &self.modules {
            let qualified = spec.qualified();
            let name = format!("import: {qualified}");
            let mut loaded: Option<ModuleHandle> = None;
            let result = isolate(&name, Category::Import, || {
                match self.resolver.resolve_in(&spec.package, &spec.module) {
                    Ok(handle) => {
                        loaded = Some(handle);
                        CheckResult::success(&name, Category::Import)
                    }
                    Err(err) => CheckResult::failed(
                        &name,
                        Category::Import,
                        FailureKind::UnresolvedDependency,
                        err.to_string(),
                    ),
                }
            });
            if let Some(handle) = loaded {
                registry.insert(qualified, handle);
            }
            record(report, result);
        }
        stage_finished(report, Category::Import);
    }
}

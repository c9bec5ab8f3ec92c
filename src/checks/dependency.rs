use std::cmp::Ordering;
use std::sync::Arc;

use crate::checks::{isolate, record, stage_finished};
use crate::core::{Category, CheckReport, CheckResult, FailureKind};
use crate::resolve::{LoadError, ModuleResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub min_version: Option<String>,
}

impl DependencySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_version: None,
        }
    }

    pub fn at_least(mut self, version: impl Into<String>) -> Self {
        self.min_version = Some(version.into());
        self
    }
}

pub struct DependencyResolver {
    resolver: Arc<dyn ModuleResolver>,
    dependencies: Vec<DependencySpec>,
}

impl DependencyResolver {
    pub fn new(resolver: Arc<dyn ModuleResolver>, dependencies: Vec<DependencySpec>) -> Self {
        Self {
            resolver,
            dependencies,
        }
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn run(&self, report: &mut CheckReport) {
        for dep in &self.dependencies {
            let name = format!("dependency: {}", dep.name);
            let result = isolate(&name, Category::Dependency, || self.check(&name, dep));
            record(report, result);
        }
        stage_finished(report, Category::Dependency);
    }

    fn check(&self, name: &str, dep: &DependencySpec) -> CheckResult {
        let handle = match self.resolver.resolve(&dep.name) {
            Ok(handle) => handle,
            Err(err) => return unresolved(name, err.to_string()),
        };

        if let (Some(required), Some(found)) = (dep.min_version.as_deref(), handle.version())
            && !version_at_least(found, required)
        {
            let err = LoadError::Incompatible {
                name: dep.name.clone(),
                reason: format!("version {found} is older than required {required}"),
            };
            return unresolved(name, err.to_string());
        }

        CheckResult::success(name, Category::Dependency)
    }
}

fn unresolved(name: &str, detail: String) -> CheckResult {
    CheckResult::failed(
        name,
        Category::Dependency,
        FailureKind::UnresolvedDependency,
        detail,
    )
}

/// Compares dotted numeric versions component by component. Versions that do
/// not parse are accepted.
fn version_at_least(found: &str, required: &str) -> bool {
    let (Some(found), Some(required)) = (parse_version(found), parse_version(required)) else {
        return true;
    };
    let len = found.len().max(required.len());
    for i in 0..len {
        let a = found.get(i).copied().unwrap_or(0);
        let b = required.get(i).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    true
}

fn parse_version(raw: &str) -> Option<Vec<u64>> {
    let raw = raw.trim().trim_start_matches('v');
    let mut parts = Vec::new();
    for piece in raw.split('.') {
        let digits: String = piece.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            break;
        }
        parts.push(digits.parse().ok()?);
        if digits.len() != piece.len() {
            break;
        }
    }
    if parts.is_empty() { None } else { Some(parts) }
}

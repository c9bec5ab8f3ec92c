use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::checks::{isolate, prerequisite_missing, probe_error, record, stage_finished};
use crate::core::{Category, CheckReport, CheckResult, FailureKind};
use crate::probe::{Probe, ProbeArgs};
use crate::resolve::{ModuleRegistry, ModuleResolver};

/// One smoke-test construction: build `symbol` from `module` with probe-only
/// arguments.
pub struct ConstructorCall {
    pub name: String,
    pub module: String,
    pub symbol: String,
    pub probe: Box<dyn Probe>,
}

impl ConstructorCall {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        symbol: impl Into<String>,
        probe: Box<dyn Probe>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            symbol: symbol.into(),
            probe,
        }
    }
}

pub struct FunctionalProbe {
    resolver: Arc<dyn ModuleResolver>,
    calls: Vec<ConstructorCall>,
    budget: Duration,
}

impl FunctionalProbe {
    pub fn new(
        resolver: Arc<dyn ModuleResolver>,
        calls: Vec<ConstructorCall>,
        budget: Duration,
    ) -> Self {
        Self {
            resolver,
            calls,
            budget,
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn run(&self, report: &mut CheckReport, registry: &ModuleRegistry, args: &ProbeArgs) {
        for call in &self.calls {
            let started = Instant::now();
            let result = isolate(&call.name, Category::Functional, || {
                self.check(call, registry, args)
            });
            record(report, result.with_duration(started.elapsed()));
        }
        stage_finished(report, Category::Functional);
    }

    fn check(
        &self,
        call: &ConstructorCall,
        registry: &ModuleRegistry,
        args: &ProbeArgs,
    ) -> CheckResult {
        let name = call.name.as_str();
        let Some(handle) = registry.get(&call.module) else {
            return prerequisite_missing(name, Category::Functional, &call.module);
        };
        if let Err(err) = self.resolver.resolve_symbol(handle, &call.symbol) {
            return CheckResult::failed(
                name,
                Category::Functional,
                FailureKind::UnresolvedDependency,
                err.to_string(),
            );
        }

        let started = Instant::now();
        let outcome = call.probe.invoke(handle, &call.symbol, args, self.budget);
        let elapsed = started.elapsed();
        match outcome {
            Err(err) => probe_error(name, Category::Functional, &err),
            Ok(()) if elapsed > self.budget => {
                warn!(check = name, ?elapsed, budget = ?self.budget, "probe over budget");
                CheckResult::failed(
                    name,
                    Category::Functional,
                    FailureKind::Timeout,
                    format!(
                        "took {}ms, budget is {}ms",
                        elapsed.as_millis(),
                        self.budget.as_millis()
                    ),
                )
            }
            Ok(()) => CheckResult::success(name, Category::Functional),
        }
    }
}

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::warn;

use crate::checks::{panicked, prerequisite_missing, probe_error, record, stage_finished};
use crate::core::{Category, CheckReport, CheckResult, FailureKind};
use crate::probe::{AsyncProbe, ProbeArgs};
use crate::resolve::{ModuleRegistry, ModuleResolver};

/// A cross-module call. `depends_on` names other components the call wires
/// together; they are reported but never gate execution.
pub struct IntegrationCall {
    pub name: String,
    pub module: String,
    pub symbol: String,
    pub depends_on: Vec<String>,
    pub probe: Box<dyn AsyncProbe>,
}

impl IntegrationCall {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        symbol: impl Into<String>,
        probe: Box<dyn AsyncProbe>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            symbol: symbol.into(),
            depends_on: Vec::new(),
            probe,
        }
    }

    pub fn depends_on<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(modules.into_iter().map(Into::into));
        self
    }
}

pub struct IntegrationProbe {
    resolver: Arc<dyn ModuleResolver>,
    calls: Vec<IntegrationCall>,
    timeout: Option<Duration>,
}

impl IntegrationProbe {
    pub fn new(resolver: Arc<dyn ModuleResolver>, calls: Vec<IntegrationCall>) -> Self {
        Self {
            resolver,
            calls,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Awaits each call to completion before starting the next, so results
    /// land in declaration order. A panic anywhere in a call, including in
    /// the resolver, becomes that call's FAILED result.
    pub async fn run(
        &self,
        report: &mut CheckReport,
        registry: &ModuleRegistry,
        args: &ProbeArgs,
    ) {
        for call in &self.calls {
            let started = Instant::now();
            let checked = AssertUnwindSafe(self.check(call, registry, args))
                .catch_unwind()
                .await;
            let result = match checked {
                Ok(result) => result,
                Err(payload) => panicked(&call.name, Category::Integration, payload),
            };
            record(report, result.with_duration(started.elapsed()));
        }
        stage_finished(report, Category::Integration);
    }

    async fn check(
        &self,
        call: &IntegrationCall,
        registry: &ModuleRegistry,
        args: &ProbeArgs,
    ) -> CheckResult {
        let name = call.name.as_str();
        let Some(handle) = registry.get(&call.module) else {
            return prerequisite_missing(name, Category::Integration, &call.module);
        };
        if let Err(err) = self.resolver.resolve_symbol(handle, &call.symbol) {
            return CheckResult::failed(
                name,
                Category::Integration,
                FailureKind::UnresolvedDependency,
                err.to_string(),
            );
        }

        let unavailable: Vec<&str> = call
            .depends_on
            .iter()
            .filter(|m| !registry.contains(m))
            .map(String::as_str)
            .collect();

        let invocation = call.probe.invoke(handle, &call.symbol, args);

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(check = name, ?limit, "integration call timed out");
                    return CheckResult::failed(
                        name,
                        Category::Integration,
                        FailureKind::Timeout,
                        format!("did not complete within {}ms", limit.as_millis()),
                    );
                }
            },
            None => invocation.await,
        };

        let mut result = match outcome {
            Ok(()) => return CheckResult::success(name, Category::Integration),
            Err(err) => probe_error(name, Category::Integration, &err),
        };
        if !unavailable.is_empty()
            && let Some(detail) = result.detail.as_mut()
        {
            detail.push_str(&format!("; unavailable dependencies: {}", unavailable.join(", ")));
        }
        result
    }
}

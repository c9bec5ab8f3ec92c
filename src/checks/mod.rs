//! The six check stages.
//!
//! Every checker converts its own failures, including panics, into FAILED
//! results. Nothing raised inside a probe escapes the checker that ran it.

mod dependency;
mod functional;
mod import;
mod integration;
mod launch;
mod structure;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};

use crate::core::{Category, CheckOutcome, CheckReport, CheckResult, FailureKind};
use crate::platform::CommandTimedOut;

pub use dependency::{DependencyResolver, DependencySpec};
pub use functional::{ConstructorCall, FunctionalProbe};
pub use import::{ModuleImportTester, ModuleSpec};
pub use integration::{IntegrationCall, IntegrationProbe};
pub use launch::{LaunchEntry, LaunchSurfaceChecker, LaunchTarget};
pub use structure::{ExpectedKind, RequiredPath, StructuralChecker};

/// Runs one check, turning a panic into a FAILED result.
pub(crate) fn isolate<F>(name: &str, category: Category, check: F) -> CheckResult
where
    F: FnOnce() -> CheckResult,
{
    match panic::catch_unwind(AssertUnwindSafe(check)) {
        Ok(result) => result,
        Err(payload) => panicked(name, category, payload),
    }
}

pub(crate) fn panicked(name: &str, category: Category, payload: Box<dyn Any + Send>) -> CheckResult {
    let message = panic_message(payload.as_ref());
    warn!(check = name, %category, panic = %message, "check panicked");
    CheckResult::failed(
        name,
        category,
        panic_kind(category),
        format!("panicked: {message}"),
    )
}

pub(crate) fn prerequisite_missing(name: &str, category: Category, module: &str) -> CheckResult {
    CheckResult::skipped(
        name,
        category,
        FailureKind::UnresolvedDependency,
        format!("prerequisite not imported: {module}"),
    )
}

/// Maps an error returned by a probe. A killed child process is a timeout;
/// everything else means the constructor itself failed.
pub(crate) fn probe_error(name: &str, category: Category, err: &anyhow::Error) -> CheckResult {
    let kind = if err.downcast_ref::<CommandTimedOut>().is_some() {
        warn!(check = name, error = %err, "probe timed out");
        FailureKind::Timeout
    } else {
        FailureKind::ConstructionFailure
    };
    CheckResult::failed(name, category, kind, format!("{err:#}"))
}

pub(crate) fn record(report: &mut CheckReport, result: CheckResult) {
    match result.outcome {
        CheckOutcome::Success => {
            debug!(check = %result.name, category = %result.category, "check passed")
        }
        CheckOutcome::Failed | CheckOutcome::Skipped => debug!(
            check = %result.name,
            category = %result.category,
            outcome = %result.outcome,
            detail = result.detail.as_deref().unwrap_or(""),
            "check did not pass"
        ),
    }
    report.push(result);
}

pub(crate) fn stage_finished(report: &CheckReport, category: Category) {
    let (mut passed, mut failed, mut skipped) = (0usize, 0usize, 0usize);
    for r in report.in_category(category) {
        match r.outcome {
            CheckOutcome::Success => passed += 1,
            CheckOutcome::Failed => failed += 1,
            CheckOutcome::Skipped => skipped += 1,
        }
    }
    info!(stage = %category, passed, failed, skipped, "stage finished");
}

fn panic_kind(category: Category) -> FailureKind {
    match category {
        Category::Structural | Category::LaunchSurface => FailureKind::MissingResource,
        Category::Dependency | Category::Import => FailureKind::UnresolvedDependency,
        Category::Functional | Category::Integration => FailureKind::ConstructionFailure,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

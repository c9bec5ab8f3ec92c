use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::core::{Category, CheckOutcome, CheckResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub name: String,
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Results of one validation run.
///
/// Results are append-only and only reachable by shared reference once
/// recorded. `total` and `passed` are computed from the results list, so
/// `passed <= total == results().len()` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub schema_version: String,
    pub tool_version: String,
    pub target: TargetInfo,
    pub started_at: String,
    pub duration_ms: u64,
    results: Vec<CheckResult>,
    errors: Vec<String>,
}

impl CheckReport {
    pub fn new(target: TargetInfo) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            target,
            started_at: crate::core::now_rfc3339(),
            duration_ms: 0,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, result: CheckResult) {
        if result.outcome != CheckOutcome::Success {
            let detail = result.detail.as_deref().unwrap_or("no detail");
            self.errors.push(format!("{}: {detail}", result.name));
        }
        self.results.push(result);
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.count(CheckOutcome::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(CheckOutcome::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CheckOutcome::Skipped)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(move |r| r.category == category)
    }


    fn count(&self, outcome: CheckOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }
}

impl Serialize for CheckReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CheckReport", 11)?;
        s.serialize_field("schema_version", &self.schema_version)?;
        s.serialize_field("tool_version", &self.tool_version)?;
        s.serialize_field("target", &self.target)?;
        s.serialize_field("started_at", &self.started_at)?;
        s.serialize_field("duration_ms", &self.duration_ms)?;
        s.serialize_field("total", &self.total())?;
        s.serialize_field("passed", &self.passed())?;
        s.serialize_field("failed", &self.failed())?;
        s.serialize_field("skipped", &self.skipped())?;
        s.serialize_field("results", &self.results)?;
        s.serialize_field("errors", &self.errors)?;
        s.end()
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Category, CheckOutcome, FailureKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub category: Category,
    pub outcome: CheckOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: String,
    pub duration_ms: u64,
}

impl CheckResult {
    pub fn success(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            outcome: CheckOutcome::Success,
            kind: None,
            detail: None,
            timestamp: crate::core::now_rfc3339(),
            duration_ms: 0,
        }
    }

    pub fn failed(
        name: impl Into<String>,
        category: Category,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            outcome: CheckOutcome::Failed,
            kind: Some(kind),
            detail: Some(detail.into()),
            timestamp: crate::core::now_rfc3339(),
            duration_ms: 0,
        }
    }

    /// `kind` names what the missing prerequisite would have failed with.
    pub fn skipped(
        name: impl Into<String>,
        category: Category,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            outcome: CheckOutcome::Skipped,
            kind: Some(kind),
            detail: Some(detail.into()),
            timestamp: crate::core::now_rfc3339(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == CheckOutcome::Success
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == CheckOutcome::Failed
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{Category, CheckReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Critical,
    NeedsWork,
    Good,
    Excellent,
}

impl Tier {
    pub const EXCELLENT_PERCENT: u64 = 90;
    pub const GOOD_PERCENT: u64 = 75;
    pub const NEEDS_WORK_PERCENT: u64 = 50;

    /// Thresholds are inclusive lower bounds; compared in integers so that
    /// exact ratios such as 9/10 never fall below 90 through rounding.
    pub fn classify(passed: usize, total: usize) -> Tier {
        if total == 0 {
            return Tier::Critical;
        }
        let scaled = (passed as u64).saturating_mul(100);
        let total = total as u64;
        if scaled >= total.saturating_mul(Self::EXCELLENT_PERCENT) {
            Tier::Excellent
        } else if scaled >= total.saturating_mul(Self::GOOD_PERCENT) {
            Tier::Good
        } else if scaled >= total.saturating_mul(Self::NEEDS_WORK_PERCENT) {
            Tier::NeedsWork
        } else {
            Tier::Critical
        }
    }


    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::Excellent => "EXCELLENT",
            Tier::Good => "GOOD",
            Tier::NeedsWork => "NEEDS_WORK",
            Tier::Critical => "CRITICAL",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Tier::Excellent => "excellent",
            Tier::Good => "good",
            Tier::NeedsWork => "needs work",
            Tier::Critical => "critical issues",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub category: Category,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessVerdict {
    pub success_rate: f64,
    pub tier: Tier,
    pub remediations: Vec<Remediation>,
}

impl ReadinessVerdict {
    pub fn is_ready(&self) -> bool {
        self.tier == Tier::Excellent
    }

    pub fn percent(&self) -> f64 {
        self.success_rate * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub report: CheckReport,
    pub verdict: ReadinessVerdict,
}

impl ValidationOutcome {
    pub fn is_ready(&self) -> bool {
        self.verdict.is_ready()
    }
}

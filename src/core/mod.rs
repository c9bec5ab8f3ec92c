mod outcome;
mod report;
mod result;
mod verdict;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub use outcome::{Category, CheckOutcome, FailureKind};
pub use report::{CheckReport, TargetInfo};
pub use result::CheckResult;
pub use verdict::{ReadinessVerdict, Remediation, Tier, ValidationOutcome};

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

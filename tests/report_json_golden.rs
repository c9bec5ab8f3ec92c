use std::time::Duration;

use readycheck::core::{
    Category, CheckReport, CheckResult, FailureKind, TargetInfo, ValidationOutcome,
};

const TS: &str = "2026-01-01T00:00:00Z";

#[test]
fn outcome_json_matches_golden() {
    let mut report = CheckReport::new(TargetInfo {
        name: "pkg".to_string(),
        root: "/srv/pkg".to_string(),
        version: Some("2.0.0".to_string()),
    });
    report.tool_version = "0.1.0".to_string();
    report.started_at = TS.to_string();

    report.push(
        CheckResult::success("structure: pkg/__init__.py", Category::Structural).with_timestamp(TS),
    );
    report.push(
        CheckResult::failed(
            "structure: docs",
            Category::Structural,
            FailureKind::MissingResource,
            "missing: docs",
        )
        .with_timestamp(TS),
    );
    report.push(
        CheckResult::success("dependency: yaml", Category::Dependency).with_timestamp(TS),
    );
    report.push(CheckResult::success("import: pkg.core", Category::Import).with_timestamp(TS));
    report.push(
        CheckResult::success("configuration", Category::Functional)
            .with_timestamp(TS)
            .with_duration(Duration::from_millis(12)),
    );
    report.finish(Duration::from_millis(40));

    let verdict = readycheck::aggregate::assess(&report);
    let outcome = ValidationOutcome { report, verdict };

    let actual = serde_json::to_value(&outcome).expect("serialize outcome");
    let expected: serde_json::Value =
        serde_json::from_str(include_str!("golden/report.json")).expect("parse golden json");
    assert_eq!(actual, expected);
}

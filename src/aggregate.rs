use crate::core::{Category, CheckReport, ReadinessVerdict, Remediation, Tier};

pub fn assess(report: &CheckReport) -> ReadinessVerdict {
    let total = report.total();
    let passed = report.passed();
    let success_rate = if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64).clamp(0.0, 1.0)
    };

    ReadinessVerdict {
        success_rate,
        tier: Tier::classify(passed, total),
        remediations: remediations(report),
    }
}

fn remediations(report: &CheckReport) -> Vec<Remediation> {
    Category::ALL
        .into_iter()
        .filter(|category| report.in_category(*category).any(|r| r.is_failed()))
        .map(|category| Remediation {
            category,
            action: category.remediation().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckResult, FailureKind, TargetInfo};

    fn report() -> CheckReport {
        CheckReport::new(TargetInfo {
            name: "demo".to_string(),
            root: ".".to_string(),
            version: None,
        })
    }

    fn fail(name: &str, category: Category) -> CheckResult {
        CheckResult::failed(name, category, FailureKind::MissingResource, "boom")
    }

    #[test]
    fn empty_report_is_critical_with_zero_rate() {
        let verdict = assess(&report());
        assert_eq!(verdict.success_rate, 0.0);
        assert_eq!(verdict.tier, Tier::Critical);
        assert!(verdict.remediations.is_empty());
    }

    #[test]
    fn nine_of_ten_is_excellent_with_one_remediation() {
        let mut r = report();
        for i in 0..9 {
            r.push(CheckResult::success(format!("ok-{i}"), Category::Import));
        }
        r.push(fail("missing", Category::Dependency));

        let verdict = assess(&r);
        assert_eq!(verdict.success_rate, 0.9);
        assert_eq!(verdict.tier, Tier::Excellent);
        assert!(verdict.is_ready());
        assert_eq!(verdict.remediations.len(), 1);
        assert_eq!(verdict.remediations[0].category, Category::Dependency);
    }

    #[test]
    fn remediations_are_deduplicated_and_in_stage_order() {
        let mut r = report();
        r.push(fail("l1", Category::LaunchSurface));
        for i in 0..5 {
            r.push(fail(&format!("d{i}"), Category::Dependency));
        }
        r.push(fail("s1", Category::Structural));

        let verdict = assess(&r);
        let categories: Vec<Category> = verdict.remediations.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                Category::Structural,
                Category::Dependency,
                Category::LaunchSurface
            ]
        );
        assert_eq!(verdict.tier, Tier::Critical);
    }

    #[test]
    fn skipped_checks_lower_the_rate_but_add_no_remediation() {
        let mut r = report();
        r.push(CheckResult::success("a", Category::Import));
        r.push(CheckResult::skipped(
            "b",
            Category::Functional,
            FailureKind::UnresolvedDependency,
            "prerequisite not imported: x",
        ));

        let verdict = assess(&r);
        assert_eq!(verdict.success_rate, 0.5);
        assert_eq!(verdict.tier, Tier::NeedsWork);
        assert!(verdict.remediations.is_empty());
    }
}

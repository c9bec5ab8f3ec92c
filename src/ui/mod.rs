use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{Category, CheckOutcome, CheckResult, Tier, ValidationOutcome};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub max_issue_rows: usize,
    pub include_passed: bool,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(
        stderr,
        "  - re-run with `--verbose` for per-check logging"
    );
    let _ = writeln!(
        stderr,
        "  - see `readycheck --help` for available commands and options"
    );
}

pub fn print_outcome(outcome: &ValidationOutcome, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_outcome(&mut out, outcome, cfg);
}

fn write_outcome(out: &mut dyn Write, outcome: &ValidationOutcome, cfg: &UiConfig) {
    let report = &outcome.report;
    let verdict = &outcome.verdict;

    let version = report
        .target
        .version
        .as_deref()
        .map(|v| format!(" v{v}"))
        .unwrap_or_default();
    let _ = writeln!(out, "Readiness check: {}{version}", report.target.name);
    let _ = writeln!(out, "Root: {}", report.target.root);
    let _ = writeln!(out, "Started: {}", report.started_at);

    let name_w = report
        .results()
        .iter()
        .filter(|r| cfg.include_passed || !r.is_success())
        .map(|r| visible_width_ansi(&r.name))
        .max()
        .unwrap_or(0);

    for category in Category::ALL {
        let results: Vec<&CheckResult> = report.in_category(category).collect();
        if results.is_empty() {
            continue;
        }
        let passed = results.iter().filter(|r| r.is_success()).count();
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} ({passed}/{})",
            category.title(),
            results.len()
        );
        for result in results {
            if result.is_success() && !cfg.include_passed {
                continue;
            }
            let status = pad_end_ansi(&format_outcome(result.outcome, cfg.color), 4);
            let name = pad_end_ansi(&result.name, name_w);
            match &result.detail {
                Some(detail) => {
                    let _ = writeln!(out, "  {status}  {name}  {detail}");
                }
                None if cfg.verbose => {
                    let _ = writeln!(out, "  {status}  {name}  ({} ms)", result.duration_ms);
                }
                None => {
                    let _ = writeln!(out, "  {status}  {}", result.name);
                }
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {}  Passed: {}  Failed: {}  Skipped: {}  ({} ms)",
        report.total(),
        report.passed(),
        report.failed(),
        report.skipped(),
        report.duration_ms
    );
    let _ = writeln!(
        out,
        "Success rate: {:.1}%  Status: {}",
        verdict.percent(),
        format_tier(verdict.tier, cfg.color)
    );

    let errors = report.errors();
    if !errors.is_empty() {
        let rows = cfg.max_issue_rows.min(errors.len());
        let _ = writeln!(out);
        if errors.len() > rows {
            let _ = writeln!(out, "Issues found ({rows} of {}):", errors.len());
        } else {
            let _ = writeln!(out, "Issues found ({}):", errors.len());
        }
        let idx_w = rows.to_string().len();
        for (i, issue) in errors.iter().take(rows).enumerate() {
            let idx = pad_start_ansi(&(i + 1).to_string(), idx_w);
            let _ = writeln!(out, "  {idx}. {issue}");
        }
    }

    if !verdict.remediations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Recommendations:");
        for r in &verdict.remediations {
            let _ = writeln!(out, "  - {}: {}", r.category.title(), r.action);
        }
    }

    let _ = writeln!(out);
    if outcome.is_ready() {
        let _ = writeln!(out, "{}", paint("Ready for use.", "32", cfg.color));
    } else {
        let _ = writeln!(
            out,
            "{}",
            paint(
                "Not ready: address the issues above and re-run.",
                "31",
                cfg.color
            )
        );
    }
}

pub fn format_markdown(outcome: &ValidationOutcome, cfg: &UiConfig) -> String {
    use std::fmt::Write as _;

    let report = &outcome.report;
    let verdict = &outcome.verdict;
    let mut out = String::new();

    let _ = writeln!(out, "# readycheck report: {}", report.target.name);
    let _ = writeln!(out);
    let _ = writeln!(out, "- Tool version: {}", report.tool_version);
    let _ = writeln!(out, "- Root: `{}`", report.target.root);
    if let Some(version) = &report.target.version {
        let _ = writeln!(out, "- Target version: {version}");
    }
    let _ = writeln!(out, "- Started: {}", report.started_at);
    let _ = writeln!(out, "- Duration: {} ms", report.duration_ms);
    let _ = writeln!(
        out,
        "- Checks: {} total, {} passed, {} failed, {} skipped",
        report.total(),
        report.passed(),
        report.failed(),
        report.skipped()
    );
    let _ = writeln!(out, "- Success rate: {:.1}%", verdict.percent());
    let _ = writeln!(
        out,
        "- Status: **{}** ({})",
        verdict.tier.as_str(),
        verdict.tier.label()
    );

    for category in Category::ALL {
        let results: Vec<&CheckResult> = report
            .in_category(category)
            .filter(|r| cfg.include_passed || !r.is_success())
            .collect();
        if results.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", category.title());
        let _ = writeln!(out);
        let _ = writeln!(out, "| Check | Outcome | Detail |");
        let _ = writeln!(out, "| --- | --- | --- |");
        for r in results {
            let detail = r.detail.as_deref().unwrap_or("");
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                escape_cell(&r.name),
                r.outcome,
                escape_cell(detail)
            );
        }
    }

    let errors = report.errors();
    if !errors.is_empty() {
        let rows = cfg.max_issue_rows.min(errors.len());
        let _ = writeln!(out);
        let _ = writeln!(out, "## Issues ({})", errors.len());
        let _ = writeln!(out);
        for (i, issue) in errors.iter().take(rows).enumerate() {
            let _ = writeln!(out, "{}. {issue}", i + 1);
        }
        if errors.len() > rows {
            let _ = writeln!(out);
            let _ = writeln!(out, "_{} more not shown._", errors.len() - rows);
        }
    }

    if !verdict.remediations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Recommendations");
        let _ = writeln!(out);
        for r in &verdict.remediations {
            let _ = writeln!(out, "- **{}**: {}", r.category.title(), r.action);
        }
    }

    out
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn outcome_label(outcome: CheckOutcome) -> &'static str {
    match outcome {
        CheckOutcome::Success => "PASS",
        CheckOutcome::Failed => "FAIL",
        CheckOutcome::Skipped => "SKIP",
    }
}

fn format_outcome(outcome: CheckOutcome, color: bool) -> String {
    let code = match outcome {
        CheckOutcome::Success => "32",
        CheckOutcome::Failed => "31",
        CheckOutcome::Skipped => "33",
    };
    paint(outcome_label(outcome), code, color)
}

fn format_tier(tier: Tier, color: bool) -> String {
    let code = match tier {
        Tier::Excellent => "32",
        Tier::Good => "36",
        Tier::NeedsWork => "33",
        Tier::Critical => "31",
    };
    paint(&format!("{} ({})", tier.as_str(), tier.label()), code, color)
}

fn paint(s: &str, code: &str, color: bool) -> String {
    if !color {
        return s.to_string();
    }
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_start_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - w), s)
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}

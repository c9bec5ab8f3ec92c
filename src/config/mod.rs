use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub run: RunConfig,
    pub report: ReportConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_issue_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub probe_budget_secs: u64,
    pub command_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub include_passed: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_issue_rows: 20,
            },
            run: RunConfig {
                probe_budget_secs: 10,
                command_timeout_secs: 30,
                integration_timeout_secs: None,
            },
            report: ReportConfig {
                include_passed: true,
            },
            config_path: None,
        }
    }
}

impl RunConfig {
    pub fn probe_budget(&self) -> Duration {
        Duration::from_secs(self.probe_budget_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn integration_timeout(&self) -> Option<Duration> {
        self.integration_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    run: Option<RawRunConfig>,
    report: Option<RawReportConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUiConfig {
    color: Option<bool>,
    max_issue_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRunConfig {
    probe_budget_secs: Option<u64>,
    command_timeout_secs: Option<u64>,
    integration_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReportConfig {
    include_passed: Option<bool>,
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/readycheck/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: Option<&Path>) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .or_else(|| home_dir.map(default_config_path));

    if let Some(path) = path.filter(|p| p.exists()) {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s)
            .with_context(|| format!("failed to parse config file (TOML): {}", path.display()))?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_issue_rows) = ui.max_issue_rows {
            cfg.ui.max_issue_rows = max_issue_rows;
        }
    }

    if let Some(run) = raw.run {
        if let Some(secs) = run.probe_budget_secs {
            cfg.run.probe_budget_secs = secs;
        }
        if let Some(secs) = run.command_timeout_secs {
            cfg.run.command_timeout_secs = secs;
        }
        if let Some(secs) = run.integration_timeout_secs {
            cfg.run.integration_timeout_secs = (secs > 0).then_some(secs);
        }
    }

    if let Some(report) = raw.report
        && let Some(include_passed) = report.include_passed
    {
        cfg.report.include_passed = include_passed;
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("READYCHECK_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).context("READYCHECK_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("READYCHECK_UI_MAX_ISSUE_ROWS") {
        cfg.ui.max_issue_rows = v
            .trim()
            .parse::<usize>()
            .context("READYCHECK_UI_MAX_ISSUE_ROWS")?;
    }
    if let Ok(v) = std::env::var("READYCHECK_RUN_PROBE_BUDGET") {
        cfg.run.probe_budget_secs = parse_secs(&v).context("READYCHECK_RUN_PROBE_BUDGET")?;
    }
    if let Ok(v) = std::env::var("READYCHECK_RUN_COMMAND_TIMEOUT") {
        cfg.run.command_timeout_secs =
            parse_secs(&v).context("READYCHECK_RUN_COMMAND_TIMEOUT")?;
    }
    if let Ok(v) = std::env::var("READYCHECK_RUN_INTEGRATION_TIMEOUT") {
        let secs = parse_secs(&v).context("READYCHECK_RUN_INTEGRATION_TIMEOUT")?;
        cfg.run.integration_timeout_secs = (secs > 0).then_some(secs);
    }
    if let Ok(v) = std::env::var("READYCHECK_REPORT_INCLUDE_PASSED") {
        cfg.report.include_passed =
            parse_bool(&v).context("READYCHECK_REPORT_INCLUDE_PASSED")?;
    }

    Ok(())
}

fn validate(cfg: &EffectiveConfig) -> Result<()> {
    if cfg.run.probe_budget_secs == 0 {
        anyhow::bail!("run.probe_budget_secs must be at least 1");
    }
    if cfg.run.command_timeout_secs == 0 {
        anyhow::bail!("run.command_timeout_secs must be at least 1");
    }
    Ok(())
}

fn parse_secs(s: &str) -> Result<u64> {
    s.trim()
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("invalid number of seconds: {}", s.trim()))
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}

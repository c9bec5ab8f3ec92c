use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

fn readycheck_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_readycheck"));
    cmd.env("HOME", home);
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("READYCHECK_CONFIG");
    cmd.env_remove("READYCHECK_UI_COLOR");
    cmd.env_remove("READYCHECK_UI_MAX_ISSUE_ROWS");
    cmd.env_remove("READYCHECK_RUN_PROBE_BUDGET");
    cmd.env_remove("READYCHECK_RUN_COMMAND_TIMEOUT");
    cmd.env_remove("READYCHECK_RUN_INTEGRATION_TIMEOUT");
    cmd.env_remove("READYCHECK_REPORT_INCLUDE_PASSED");
    cmd
}

fn make_temp_dir() -> PathBuf {
    static DIR_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "readycheck-env-test-{}-{seq}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

#[test]
fn env_overrides_config_file() {
    let home = make_temp_dir();
    write_file(
        &home.join(".config/readycheck/config.toml"),
        br#"
[ui]
color = true

[run]
probe_budget_secs = 3

[report]
include_passed = true
"#,
    );

    let out = readycheck_cmd(&home)
        .env("READYCHECK_UI_COLOR", "off")
        .env("READYCHECK_RUN_PROBE_BUDGET", "8")
        .env("READYCHECK_REPORT_INCLUDE_PASSED", "no")
        .args(["--json", "config", "--show"])
        .output()
        .expect("run readycheck");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["ui"]["color"], false);
    assert_eq!(v["run"]["probe_budget_secs"], 8);
    assert_eq!(v["report"]["include_passed"], false);
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn env_config_path_is_used_when_no_flag_is_given() {
    let home = make_temp_dir();
    let custom = home.join("custom.toml");
    write_file(&custom, b"[ui]\nmax_issue_rows = 2\n");

    let out = readycheck_cmd(&home)
        .env("READYCHECK_CONFIG", &custom)
        .args(["--json", "config", "--show"])
        .output()
        .expect("run readycheck");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["ui"]["max_issue_rows"], 2);
    assert_eq!(v["config_path"], custom.display().to_string());
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn zero_integration_timeout_env_means_unbounded() {
    let home = make_temp_dir();
    write_file(
        &home.join(".config/readycheck/config.toml"),
        b"[run]\nintegration_timeout_secs = 30\n",
    );

    let out = readycheck_cmd(&home)
        .env("READYCHECK_RUN_INTEGRATION_TIMEOUT", "0")
        .args(["--json", "config", "--show"])
        .output()
        .expect("run readycheck");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert!(v["run"].get("integration_timeout_secs").is_none());
    let _ = std::fs::remove_dir_all(&home);
}

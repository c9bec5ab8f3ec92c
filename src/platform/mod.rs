use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use wait_timeout::ChildExt;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-empty stderr line, falling back to stdout.
    pub fn failure_message(&self) -> String {
        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .map(str::to_string)
            .unwrap_or_else(|| format!("exited with code {}", self.exit_code))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandRunOptions {
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
#[error("timed out after {timeout:?}: {cmd}")]
pub struct CommandTimedOut {
    pub cmd: String,
    pub timeout: Duration,
}

pub fn run_command_with_options(
    cmd: &str,
    args: &[&str],
    timeout: Duration,
    options: &CommandRunOptions,
) -> Result<CommandOutput> {
    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (k, v) in &options.env {
        command.env(k, v);
    }
    if let Some(dir) = &options.current_dir {
        command.current_dir(dir);
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start process: {cmd}"))?;

    // Both pipes drain while the child runs; a full pipe must not stall it.
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let status = match child
        .wait_timeout(timeout)
        .with_context(|| format!("failed to wait for process: {cmd}"))?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandTimedOut {
                cmd: cmd.to_string(),
                timeout,
            }
            .into());
        }
    };

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

pub fn effective_home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME is not set"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Dir,
    Other,
}

/// `Ok(None)` when nothing exists at `path`. A dangling symlink is an error,
/// not an absence.
pub fn path_kind(path: &Path) -> std::io::Result<Option<PathKind>> {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let kind = if meta.is_file() {
                PathKind::File
            } else if meta.is_dir() {
                PathKind::Dir
            } else {
                PathKind::Other
            };
            Ok(Some(kind))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            match std::fs::symlink_metadata(path) {
                Ok(meta) if meta.file_type().is_symlink() => Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("broken symlink: {}", path.display()),
                )),
                _ => Ok(None),
            }
        }
        Err(err) => Err(err),
    }
}

fn last_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn make_temp_dir() -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "readycheck-platform-test-{}-{seq}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create dir");
        dir
    }

    #[test]
    fn path_kind_distinguishes_files_and_dirs() {
        let dir = make_temp_dir();
        std::fs::write(dir.join("a.txt"), b"x").expect("write");

        assert_eq!(path_kind(&dir).expect("kind"), Some(PathKind::Dir));
        assert_eq!(
            path_kind(&dir.join("a.txt")).expect("kind"),
            Some(PathKind::File)
        );
        assert_eq!(path_kind(&dir.join("nope")).expect("kind"), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn path_kind_reports_broken_symlink_as_error() {
        let dir = make_temp_dir();
        std::os::unix::fs::symlink(dir.join("gone"), dir.join("link")).expect("symlink");

        let err = path_kind(&dir.join("link")).expect_err("broken symlink");
        assert!(err.to_string().contains("broken symlink"), "err={err}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    fn sh(script: &str, timeout: Duration) -> Result<CommandOutput> {
        run_command_with_options(
            "sh",
            &["-c", script],
            timeout,
            &CommandRunOptions::default(),
        )
    }

    #[cfg(unix)]
    #[test]
    fn run_command_kills_on_timeout() {
        let err = sh("sleep 5", Duration::from_millis(200)).expect_err("timeout");
        assert!(err.downcast_ref::<CommandTimedOut>().is_some(), "err={err}");
    }

    #[cfg(unix)]
    #[test]
    fn large_output_does_not_stall_the_child() {
        let started = std::time::Instant::now();
        let out = sh(
            "head -c 200000 /dev/zero | tr '\\0' x; echo done >&2; exit 0",
            Duration::from_secs(10),
        )
        .expect("large output completes");
        assert!(out.success());
        assert_eq!(out.stdout.len(), 200_000);
        assert_eq!(out.stderr.trim(), "done");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn run_command_passes_env_and_dir() {
        let dir = make_temp_dir();
        let out = run_command_with_options(
            "sh",
            &["-c", "printf '%s' \"$RUN_MODE\"; pwd"],
            Duration::from_secs(5),
            &CommandRunOptions {
                env: vec![("RUN_MODE".to_string(), "memory".to_string())],
                current_dir: Some(dir.clone()),
            },
        )
        .expect("run");
        assert!(out.stdout.starts_with("memory"), "stdout={}", out.stdout);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failure_message_prefers_stderr_tail() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: "progress\n".to_string(),
            stderr: "Traceback\nModuleNotFoundError: No module named 'x'\n\n".to_string(),
        };
        assert_eq!(
            out.failure_message(),
            "ModuleNotFoundError: No module named 'x'"
        );

        let silent = CommandOutput {
            exit_code: 3,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(silent.failure_message(), "exited with code 3");
    }
}

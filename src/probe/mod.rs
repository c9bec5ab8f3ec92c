//! Constructor probes used by the functional and integration stages.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Result, anyhow};
use futures::future::BoxFuture;

use crate::platform::{self, CommandOutput, CommandRunOptions};
use crate::resolve::ModuleHandle;

pub const IN_MEMORY_STORAGE: &str = ":memory:";

/// The only inputs a probe may hand to the code under test: a minimal
/// configuration value, in-memory storage and no network target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeArgs {
    config: String,
}

impl ProbeArgs {
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
        }
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    pub const fn storage(&self) -> &'static str {
        IN_MEMORY_STORAGE
    }

    pub const fn network(&self) -> Option<&'static str> {
        None
    }

    fn env(&self) -> Vec<(String, String)> {
        vec![
            ("READYCHECK_PROBE_CONFIG".to_string(), self.config.clone()),
            (
                "READYCHECK_PROBE_STORAGE".to_string(),
                self.storage().to_string(),
            ),
            (
                "READYCHECK_PROBE_NETWORK".to_string(),
                self.network().unwrap_or("none").to_string(),
            ),
        ]
    }
}

impl Default for ProbeArgs {
    fn default() -> Self {
        Self::new("{}")
    }
}

pub trait Probe: Send + Sync {
    fn invoke(
        &self,
        target: &ModuleHandle,
        symbol: &str,
        args: &ProbeArgs,
        budget: Duration,
    ) -> Result<()>;
}

pub trait AsyncProbe: Send + Sync {
    fn invoke<'a>(
        &'a self,
        target: &'a ModuleHandle,
        symbol: &'a str,
        args: &'a ProbeArgs,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Runs an argv template with `{module}`, `{symbol}`, `{config}` and
/// `{storage}` substituted. Success is exit status 0.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    argv: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandProbe {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            current_dir: None,
        }
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl Probe for CommandProbe {
    fn invoke(
        &self,
        target: &ModuleHandle,
        symbol: &str,
        args: &ProbeArgs,
        budget: Duration,
    ) -> Result<()> {
        let argv = expand_argv(&self.argv, target, symbol, args);
        let Some((cmd, rest)) = argv.split_first() else {
            return Err(anyhow!("empty probe command"));
        };
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
        let options = CommandRunOptions {
            env: args.env(),
            current_dir: self.current_dir.clone(),
        };
        let out = platform::run_command_with_options(cmd, &rest, budget, &options)?;
        check_exit(&out)
    }
}

/// Async counterpart of [`CommandProbe`]; it imposes no timeout of its own.
#[derive(Debug, Clone)]
pub struct AsyncCommandProbe {
    argv: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl AsyncCommandProbe {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            current_dir: None,
        }
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl AsyncProbe for AsyncCommandProbe {
    fn invoke<'a>(
        &'a self,
        target: &'a ModuleHandle,
        symbol: &'a str,
        args: &'a ProbeArgs,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let argv = expand_argv(&self.argv, target, symbol, args);
            let Some((cmd, rest)) = argv.split_first() else {
                return Err(anyhow!("empty probe command"));
            };
            let mut command = tokio::process::Command::new(cmd);
            command
                .args(rest)
                .envs(args.env())
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = &self.current_dir {
                command.current_dir(dir);
            }
            let output = command
                .output()
                .await
                .map_err(|e| anyhow!("failed to start process: {cmd}: {e}"))?;
            check_exit(&CommandOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// In-process probe backed by a closure.
pub struct FnProbe<F>(pub F);

impl<F> Probe for FnProbe<F>
where
    F: Fn(&ModuleHandle, &ProbeArgs) -> Result<()> + Send + Sync,
{
    fn invoke(
        &self,
        target: &ModuleHandle,
        _symbol: &str,
        args: &ProbeArgs,
        _budget: Duration,
    ) -> Result<()> {
        (self.0)(target, args)
    }
}

/// In-process async probe backed by a closure returning a future.
pub struct AsyncFnProbe<F>(pub F);

impl<F, Fut> AsyncProbe for AsyncFnProbe<F>
where
    F: Fn(ModuleHandle, ProbeArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn invoke<'a>(
        &'a self,
        target: &'a ModuleHandle,
        _symbol: &'a str,
        args: &'a ProbeArgs,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin((self.0)(target.clone(), args.clone()))
    }
}

fn expand_argv(
    argv: &[String],
    target: &ModuleHandle,
    symbol: &str,
    args: &ProbeArgs,
) -> Vec<String> {
    argv.iter()
        .map(|arg| {
            arg.replace("{module}", target.name())
                .replace("{symbol}", symbol)
                .replace("{config}", args.config())
                .replace("{storage}", args.storage())
        })
        .collect()
}

fn check_exit(out: &CommandOutput) -> Result<()> {
    if out.success() {
        Ok(())
    } else {
        Err(anyhow!(out.failure_message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn probe_args_never_carry_a_network_target() {
        let args = ProbeArgs::new("target=local");
        assert_eq!(args.storage(), ":memory:");
        assert_eq!(args.network(), None);
        assert!(
            args.env()
                .contains(&("READYCHECK_PROBE_NETWORK".to_string(), "none".to_string()))
        );
    }

    #[test]
    fn expand_argv_substitutes_call_context() {
        let argv = expand_argv(
            &["run".to_string(), "{module}:{symbol}".to_string(), "--db={storage}".to_string()],
            &ModuleHandle::new("pkg.config"),
            "ScanConfiguration",
            &ProbeArgs::default(),
        );
        assert_eq!(argv, ["run", "pkg.config:ScanConfiguration", "--db=:memory:"]);
    }

    #[cfg(unix)]
    #[test]
    fn command_probe_passes_probe_environment() {
        let probe = CommandProbe::new(sh(
            "test \"$READYCHECK_PROBE_STORAGE\" = ':memory:' || { echo \"bad storage\" >&2; exit 1; }",
        ));
        probe
            .invoke(
                &ModuleHandle::new("pkg.db"),
                "Database",
                &ProbeArgs::default(),
                Duration::from_secs(5),
            )
            .expect("probe ok");
    }

    #[cfg(unix)]
    #[test]
    fn async_command_probe_reports_stderr() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let probe = AsyncCommandProbe::new(sh("echo 'detector wiring failed' >&2; exit 2"));
        let module = ModuleHandle::new("pkg.demo");
        let args = ProbeArgs::default();
        let err = rt
            .block_on(probe.invoke(&module, "Demo", &args))
            .expect_err("probe fails");
        assert_eq!(err.to_string(), "detector wiring failed");
    }
}

use std::path::PathBuf;
use std::time::Duration;

use crate::platform::{self, CommandOutput, CommandRunOptions};
use crate::resolve::{LoadError, ModuleHandle, ModuleResolver};

/// Resolves names by running an interpreter or loader command, e.g.
/// `python3 -c "import {name}"`. Exit status 0 means loaded; the last non-empty
/// line of stdout, when present, is taken as the module version. Anything a
/// module prints while loading comes before it.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    argv: Vec<String>,
    symbol_argv: Option<Vec<String>>,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl CommandResolver {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self {
            argv,
            symbol_argv: None,
            timeout,
            current_dir: None,
        }
    }

    pub fn with_symbol_command(mut self, argv: Vec<String>) -> Self {
        self.symbol_argv = Some(argv);
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn run(&self, name: &str, argv: &[String], vars: &[(&str, &str)]) -> Result<CommandOutput, LoadError> {
        let expanded: Vec<String> = argv.iter().map(|arg| expand(arg, vars)).collect();
        let Some((cmd, args)) = expanded.split_first() else {
            return Err(LoadError::failed(name, "empty resolver command"));
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let options = CommandRunOptions {
            env: Vec::new(),
            current_dir: self.current_dir.clone(),
        };
        platform::run_command_with_options(cmd, &args, self.timeout, &options)
            .map_err(|err| LoadError::failed(name, format!("{err:#}")))
    }
}

impl ModuleResolver for CommandResolver {
    fn resolve(&self, name: &str) -> Result<ModuleHandle, LoadError> {
        let out = self.run(name, &self.argv, &[("name", name)])?;
        if !out.success() {
            return Err(classify_failure(name, &out.failure_message()));
        }

        let handle = ModuleHandle::new(name);
        match out.stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
            Some(version) => Ok(handle.with_metadata("version", version)),
            None => Ok(handle),
        }
    }

    fn resolve_symbol(&self, module: &ModuleHandle, symbol: &str) -> Result<(), LoadError> {
        let Some(argv) = &self.symbol_argv else {
            return Ok(());
        };
        let qualified = format!("{}.{symbol}", module.name());
        let out = self.run(
            &qualified,
            argv,
            &[("module", module.name()), ("name", module.name()), ("symbol", symbol)],
        )?;
        if out.success() {
            return Ok(());
        }
        Err(LoadError::failed(qualified, out.failure_message()))
    }
}

fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

fn classify_failure(name: &str, message: &str) -> LoadError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("no module named")
        || lower.contains("not found")
        || lower.contains("cannot find")
    {
        LoadError::NotFound {
            name: name.to_string(),
            detail: message.to_string(),
        }
    } else if lower.contains("incompatible") || lower.contains("version") {
        LoadError::Incompatible {
            name: name.to_string(),
            reason: message.to_string(),
        }
    } else {
        LoadError::failed(name, message)
    }
}

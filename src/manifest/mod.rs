//! `readycheck.toml`: what a run checks.
//!
//! ```toml
//! structure = ["pkg/__init__.py", "plugins/"]
//! dependencies = ["aiohttp", { name = "yaml", min_version = "6.0" }]
//!
//! [target]
//! name = "pkg"
//! package = "pkg"
//!
//! [imports]
//! package = "pkg"
//! modules = ["core", "config"]
//!
//! [probe]
//! command = ["python3", "-c", "import {module}; {module}.{symbol}()"]
//!
//! [[functional]]
//! name = "configuration"
//! module = "pkg.config"
//! symbol = "ScanConfiguration"
//!
//! [[launch]]
//! name = "launcher"
//! script = "run.sh"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use crate::checks::{
    ConstructorCall, DependencySpec, IntegrationCall, LaunchEntry, ModuleSpec, RequiredPath,
};
use crate::engine::ValidationPlan;
use crate::probe::{AsyncCommandProbe, CommandProbe, ProbeArgs};
use crate::resolve::{CommandResolver, FsResolver, ModuleResolver};

pub const DEFAULT_MANIFEST: &str = "readycheck.toml";

pub fn default_manifest_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_MANIFEST)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub structure: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    pub target: TargetSection,
    #[serde(default)]
    pub imports: ImportsSection,
    #[serde(default)]
    pub functional: Vec<CallEntry>,
    #[serde(default)]
    pub integration: Vec<CallEntry>,
    #[serde(default)]
    pub launch: Vec<LaunchSection>,
    #[serde(default)]
    pub probe: ProbeSection,
    #[serde(default)]
    pub resolver: ResolverSection,
    pub dependency_resolver: Option<ResolverSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub name: Option<String>,
    pub package: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependencyEntry {
    Name(String),
    Spec {
        name: String,
        min_version: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportsSection {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModuleEntry {
    Name(String),
    Spec {
        module: String,
        package: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallEntry {
    pub name: String,
    pub module: String,
    pub symbol: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchSection {
    pub name: String,
    pub script: Option<PathBuf>,
    pub module: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSection {
    pub config: Option<String>,
    pub command: Option<Vec<String>>,
    pub async_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolverSection {
    Fs {
        #[serde(default)]
        search_paths: Vec<PathBuf>,
        #[serde(default)]
        candidates: Vec<String>,
    },
    Command {
        command: Vec<String>,
        symbol_command: Option<Vec<String>>,
    },
}

impl Default for ResolverSection {
    fn default() -> Self {
        ResolverSection::Fs {
            search_paths: Vec::new(),
            candidates: Vec::new(),
        }
    }
}

impl ResolverSection {
    fn build(&self, root: &Path, timeout: Duration) -> Result<Arc<dyn ModuleResolver>> {
        match self {
            ResolverSection::Fs {
                search_paths,
                candidates,
            } => {
                let paths = search_paths.iter().map(|p| root.join(p)).collect();
                Ok(Arc::new(
                    FsResolver::new(root)
                        .with_search_paths(paths)
                        .with_candidates(candidates.clone()),
                ))
            }
            ResolverSection::Command {
                command,
                symbol_command,
            } => {
                non_empty(command, "resolver command")?;
                let mut resolver =
                    CommandResolver::new(command.clone(), timeout).with_current_dir(root);
                if let Some(argv) = symbol_command {
                    non_empty(argv, "resolver symbol_command")?;
                    resolver = resolver.with_symbol_command(argv.clone());
                }
                Ok(Arc::new(resolver))
            }
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&s).with_context(|| format!("invalid manifest: {}", path.display()))
    }

    pub fn parse(s: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(s).context("failed to parse manifest (TOML)")?;
        Ok(manifest)
    }

    /// Builds the run plan. Relative paths resolve against `root`; resolver
    /// commands run with `command_timeout`.
    pub fn into_plan(self, root: &Path, command_timeout: Duration) -> Result<ValidationPlan> {
        let resolver = self.resolver.build(root, command_timeout)?;
        let dependency_resolver = self
            .dependency_resolver
            .as_ref()
            .map(|section| section.build(root, command_timeout))
            .transpose()?;

        let name = self
            .target
            .name
            .clone()
            .or_else(|| self.target.package.clone())
            .or_else(|| {
                root.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "target".to_string());

        let mut plan = ValidationPlan::new(name, root, resolver);
        plan.package = self.target.package.clone();
        plan.dependency_resolver = dependency_resolver;
        plan.probe_args = self
            .probe
            .config
            .clone()
            .map(ProbeArgs::new)
            .unwrap_or_default();

        plan.structure = self.structure.iter().map(|p| required_path(p)).collect();
        plan.dependencies = self
            .dependencies
            .iter()
            .map(|d| match d {
                DependencyEntry::Name(name) => DependencySpec::new(name),
                DependencyEntry::Spec { name, min_version } => DependencySpec {
                    name: name.clone(),
                    min_version: min_version.clone(),
                },
            })
            .collect();
        plan.modules = self
            .imports
            .modules
            .iter()
            .map(|m| match m {
                ModuleEntry::Name(module) => ModuleSpec::new(&self.imports.package, module),
                ModuleEntry::Spec { module, package } => ModuleSpec::new(
                    package.as_deref().unwrap_or(&self.imports.package),
                    module,
                ),
            })
            .collect();

        for call in &self.functional {
            let argv = self.probe_command(call, self.probe.command.as_ref(), "functional")?;
            plan.functional.push(ConstructorCall::new(
                &call.name,
                &call.module,
                &call.symbol,
                Box::new(CommandProbe::new(argv).with_current_dir(root)),
            ));
        }
        for call in &self.integration {
            let default = self
                .probe
                .async_command
                .as_ref()
                .or(self.probe.command.as_ref());
            let argv = self.probe_command(call, default, "integration")?;
            plan.integration.push(
                IntegrationCall::new(
                    &call.name,
                    &call.module,
                    &call.symbol,
                    Box::new(AsyncCommandProbe::new(argv).with_current_dir(root)),
                )
                .depends_on(call.depends_on.iter().cloned()),
            );
        }
        for entry in &self.launch {
            plan.launch.push(launch_entry(entry)?);
        }

        plan.validate()?;
        Ok(plan)
    }

    fn probe_command(
        &self,
        call: &CallEntry,
        default: Option<&Vec<String>>,
        section: &str,
    ) -> Result<Vec<String>> {
        let argv = call
            .command
            .as_ref()
            .or(default)
            .ok_or_else(|| anyhow!("{section} call {} has no probe command", call.name))?;
        non_empty(argv, &format!("{section} call {} command", call.name))?;
        Ok(argv.clone())
    }

    /// Total number of checks the manifest declares.
    pub fn check_count(&self) -> usize {
        self.structure.len()
            + self.dependencies.len()
            + self.imports.modules.len()
            + self.functional.len()
            + self.integration.len()
            + self.launch.len()
    }

}

fn required_path(raw: &str) -> RequiredPath {
    match raw.strip_suffix('/') {
        Some(dir) => RequiredPath::dir(dir),
        None => RequiredPath::file(raw),
    }
}

fn launch_entry(entry: &LaunchSection) -> Result<LaunchEntry> {
    match (&entry.script, &entry.module, &entry.symbol) {
        (Some(script), None, None) => Ok(LaunchEntry::script(&entry.name, script)),
        (None, Some(module), Some(symbol)) => {
            Ok(LaunchEntry::callable(&entry.name, module, symbol))
        }
        _ => bail!(
            "launch entry {} needs either `script` or both `module` and `symbol`",
            entry.name
        ),
    }
}

fn non_empty(argv: &[String], what: &str) -> Result<()> {
    if argv.first().is_none_or(|cmd| cmd.trim().is_empty()) {
        bail!("{what} must not be empty");
    }
    Ok(())
}

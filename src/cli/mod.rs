use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::engine::{EngineOptions, ValidationOrchestrator};
use crate::exit::ExitCode;
use crate::manifest::Manifest;
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "readycheck",
    version,
    about = "Verify that a modular project is assembled and operable before it is put to use"
)]
pub struct Cli {
    #[arg(long, global = true, conflicts_with = "markdown")]
    pub json: bool,
    #[arg(long, global = true)]
    pub markdown: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Timeout in seconds for resolver commands.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every check declared in the manifest.
    Check(CheckArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Project root; defaults to the current directory.
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Manifest path; defaults to `<root>/readycheck.toml`.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::platform::effective_home_dir().ok();
    let env_config_path = std::env::var_os("READYCHECK_CONFIG").map(PathBuf::from);
    let mut cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        home_dir.as_deref(),
    )
    .map_err(crate::exit::invalid_args_err)?;

    if let Some(secs) = cli.timeout {
        if secs == 0 {
            return Err(crate::exit::invalid_args("--timeout must be at least 1"));
        }
        cfg.run.command_timeout_secs = secs;
    }

    let ui_cfg = UiConfig {
        color: stdout_is_tty && cfg.ui.color && !cli.no_color,
        max_issue_rows: cfg.ui.max_issue_rows,
        include_passed: cfg.report.include_passed,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Check(args) => {
            let root = match args.root {
                Some(root) => root,
                None => std::env::current_dir().context("failed to read current directory")?,
            };
            if !root.is_dir() {
                return Err(crate::exit::invalid_args(format!(
                    "root is not a directory: {}",
                    root.display()
                )));
            }
            let manifest_path = args
                .manifest
                .unwrap_or_else(|| crate::manifest::default_manifest_path(&root));
            if !manifest_path.is_file() {
                return Err(crate::exit::invalid_args(format!(
                    "manifest not found: {} (create readycheck.toml or pass --manifest)",
                    manifest_path.display()
                )));
            }

            let plan = Manifest::load(&manifest_path)
                .and_then(|m| m.into_plan(&root, cfg.run.command_timeout()))
                .map_err(crate::exit::invalid_args_err)?;
            let engine = ValidationOrchestrator::new(
                plan,
                EngineOptions {
                    probe_budget: cfg.run.probe_budget(),
                    integration_timeout: cfg.run.integration_timeout(),
                    show_progress: stderr_is_tty && !cli.quiet && !cli.json && !cli.markdown,
                },
            )
            .map_err(crate::exit::invalid_args_err)?;

            let outcome = engine.run()?;
            if cli.json {
                write_json(&outcome)?;
            } else if cli.markdown {
                write_stdout(crate::ui::format_markdown(&outcome, &ui_cfg).as_bytes())?;
            } else {
                crate::ui::print_outcome(&outcome, &ui_cfg);
            }

            return Ok(if outcome.is_ready() {
                ExitCode::Ready
            } else {
                ExitCode::NotReady
            });
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "readycheck", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    write_json(&cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `readycheck config --show`");
            }
        }
    }

    Ok(ExitCode::Ready)
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("readycheck=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(if quiet { "error" } else { "warn" }))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn write_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut buf = serde_json::to_vec_pretty(value)?;
    buf.push(b'\n');
    write_stdout(&buf)
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match stdout.write_all(bytes).and_then(|()| stdout.flush()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}

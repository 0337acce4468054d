use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use repl::Session;

mod command;
mod dialect;
mod error;
mod repl;
mod sqlite;

/// Maintenance utilities for SQLite database files.
///
/// Without `--command` or `--script`, starts an interactive prompt.
#[derive(Debug, Parser)]
#[command(name = "sqltools", version)]
struct Cli {
    /// Command line to run instead of prompting (repeatable, run in order)
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    commands: Vec<String>,

    /// File of command lines to run, `-` for stdin
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Stop a batch run at the first failing command
    #[arg(long)]
    fail_fast: bool,

    /// Prompt shown before each interactive command
    #[arg(long, env = "SQLTOOLS_PROMPT", default_value = repl::DEFAULT_PROMPT)]
    prompt: String,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn script_lines(path: &Path) -> Result<Vec<String>> {
    if path.as_os_str() == "-" {
        return io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<_>>()
            .context("reading script from stdin");
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.commands.is_empty() && cli.script.is_none() {
        repl::interactive(io::stdin().lock(), &cli.prompt)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut lines = Vec::new();
    if let Some(script) = &cli.script {
        lines.extend(script_lines(script)?);
    }
    lines.extend(cli.commands);

    let mut session = Session::new(io::stdout().lock());
    let failures = repl::batch(&mut session, lines, cli.fail_fast);
    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

//! Keyplace CLI entry point.
//!
//! With no subcommand the key is installed. `check` verifies the container
//! environment and the installed key; `env` prints the compose wiring.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use keyplace::config::{self, Config};
use keyplace::environment::{compose_snippet, ComposeSettings, EnvironmentReport};
use keyplace::installer::{InstallOutcome, Installer};
use keyplace::key::{self, KeyStatus, ServiceAccountKey};
use keyplace::{logging, permissions};

/// Keyplace — install a Google Cloud service-account key for the backend container.
#[derive(Parser)]
#[command(name = "keyplace", version, about)]
struct Cli {
    /// Path to the configuration file (default: ~/.keyplace/config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute; defaults to `install`.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Find the key and install it into the credentials directory.
    Install,
    /// Verify environment variables and the installed key.
    Check,
    /// Print the compose volume and environment lines for the backend service.
    Env,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_cli();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let config = config::load_config_or_default(&config_path)?;
    debug!(config = %config_path.display(), "configuration loaded");

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;

    match cli.command.unwrap_or(Command::Install) {
        Command::Install => handle_install(&config, &cwd),
        Command::Check => handle_check(&config, &cwd),
        Command::Env => handle_env(&config, &cwd),
    }
}

/// Install the key from the first candidate location.
fn handle_install(config: &Config, cwd: &Path) -> anyhow::Result<bool> {
    let home = config::home_dir()?;
    let installer = Installer::from(config.install_paths(&home, cwd));

    let outcome = installer.install(&mut std::io::stdout().lock())?;
    if let InstallOutcome::Installed { destination, .. } = outcome {
        println!("Installed credentials at {}", destination.display());
    }
    Ok(true)
}

/// Verify the contract variables and the key they point at.
fn handle_check(config: &Config, cwd: &Path) -> anyhow::Result<bool> {
    let env_file = cwd.join(".env");
    if env_file.exists() {
        dotenvy::from_path(&env_file)
            .with_context(|| format!("failed to load {}", env_file.display()))?;
        debug!(path = %env_file.display(), "loaded environment file");
    }

    println!("Environment variables");
    let env = EnvironmentReport::from_process();
    for var in env.vars() {
        let mark = if var.value.is_some() {
            "[ok]"
        } else if var.required {
            "[missing]"
        } else {
            "[optional]"
        };
        println!("  {mark:<11}{:<32}= {}", var.name, var.display_value());
    }
    let env_ok = env.is_complete();
    let mode = if env.uses_vertex() { "Vertex AI" } else { "API key" };
    println!("  authentication mode: {mode}");

    // The variable holds the container path; fall back to the host install
    // location when it does not exist here.
    let key_path = env
        .credentials_path()
        .map(PathBuf::from)
        .filter(|path| path.exists())
        .unwrap_or_else(|| config.destination(cwd));

    println!();
    println!("Credentials file: {}", key_path.display());
    let status = key::inspect_key(&key_path);
    match &status {
        KeyStatus::Missing => println!("  [missing]  file does not exist"),
        KeyStatus::Unreadable(reason) | KeyStatus::Malformed(reason) => {
            println!("  [error]    {reason}");
        }
        KeyStatus::NotServiceAccount(found) => println!(
            "  [warning]  valid JSON but type is {}, expected service_account",
            found.key_type.as_deref().unwrap_or("(none)")
        ),
        KeyStatus::Valid(found) => {
            println!("  [ok]       valid service account key");
            println!(
                "             account: {}",
                found.client_email.as_deref().unwrap_or("N/A")
            );
            println!(
                "             project: {}",
                found.project_id.as_deref().unwrap_or("N/A")
            );
        }
    }
    if !matches!(status, KeyStatus::Missing) {
        match permissions::is_private(&key_path) {
            Ok(true) => println!("  [ok]       permissions restricted to owner"),
            Ok(false) => println!("  [warning]  file is readable by group or others"),
            Err(e) => warn!(path = %key_path.display(), error = %e, "failed to inspect permissions"),
        }
    }
    let key_ok = status.is_ok();

    println!();
    println!("Environment: {}", if env_ok { "ok" } else { "incomplete" });
    println!("Credentials: {}", if key_ok { "ok" } else { "invalid" });
    Ok(env_ok && key_ok)
}

/// Print the compose wiring for the installed key.
fn handle_env(config: &Config, cwd: &Path) -> anyhow::Result<bool> {
    let destination = config.destination(cwd);
    let host_path = destination
        .strip_prefix(cwd)
        .map(|relative| Path::new(".").join(relative))
        .unwrap_or_else(|_| destination.clone());

    let key_project = key::parse_document(&destination)
        .ok()
        .map(|document| ServiceAccountKey::from_document(&document))
        .and_then(|found| found.project_id);
    let project = config.container.project.clone().or(key_project);

    print!(
        "{}",
        compose_snippet(&ComposeSettings {
            host_path: &host_path,
            container_path: &config.container.key_path,
            project: project.as_deref(),
            location: &config.container.location,
        })
    );
    Ok(true)
}

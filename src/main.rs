#![cfg_attr(not(windows), forbid(unsafe_code))]

mod adapter;
mod apply;
mod constants;
mod display_api;
mod display_config;
mod error;
mod matcher;
mod profile;
mod reconcile;
mod store;
#[cfg(windows)]
mod win32;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use apply::{apply_profile, ApplyOutcome};
use display_api::DisplayApi;
use profile::Profile;
use store::ProfileStore;

#[derive(Parser)]
#[command(
    name = "monitor-profiles",
    version,
    about = "Save and restore multi-monitor display configurations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the current display topology as a new profile
    Create {
        /// Profile name
        name: String,
        /// Save to this file instead of the profile store
        #[arg(long)]
        path: Option<PathBuf>,
        /// Create even if a similarly named profile already exists
        #[arg(long)]
        force: bool,
    },
    /// Apply a saved profile, remapping adapters if needed
    Apply {
        /// Profile name or GUID, or a JSON file path with --path
        name: String,
        /// Treat NAME as a JSON file path, not a profile name
        #[arg(long)]
        path: bool,
        /// Update the adapter list saved in the profile after a remapped apply
        #[arg(long)]
        update: bool,
    },
    /// List saved profiles
    List,
    /// Print the current adapters and display topology as JSON
    Query,
}

#[cfg(windows)]
fn display_api() -> Result<Box<dyn DisplayApi>> {
    Ok(Box::new(win32::Win32Display::new()))
}

#[cfg(not(windows))]
fn display_api() -> Result<Box<dyn DisplayApi>> {
    anyhow::bail!("display configuration access requires Windows")
}

fn cmd_create(name: String, path: Option<PathBuf>, force: bool) -> Result<ExitCode> {
    let store = ProfileStore::at_default_location();
    if !force && let Some(existing) = store.find_by_name(&name)? {
        eprintln!(
            "A similarly named profile already exists (`{}`); re-run with `--force` to create a duplicate.",
            existing.name
        );
        return Ok(ExitCode::FAILURE);
    }

    let api = display_api()?;
    let profile = Profile::capture(name, api.as_ref())?;
    match path {
        Some(path) => profile.save_to(&path)?,
        None => {
            store.save(&profile)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_apply(name: String, name_is_path: bool, update: bool) -> Result<ExitCode> {
    let store = ProfileStore::at_default_location();
    let profile = if name_is_path {
        Profile::load(&name)?
    } else {
        // A GUID names the profile directly; otherwise match by name,
        // exact first, case-insensitive second.
        let found = match store::parse_guid(&name) {
            Some(guid) => store.find_by_guid(guid)?,
            None => store.find_by_name(&name)?,
        };
        match found {
            Some(profile) => profile,
            None => {
                eprintln!("Couldn't find a profile called '{name}'");
                return Ok(ExitCode::FAILURE);
            }
        }
    };

    let api = display_api()?;
    match apply_profile(&profile, api.as_ref(), &store, update)? {
        ApplyOutcome::ConfigurationChanged => {
            eprintln!("Profile can't be applied due to a configuration change");
            Ok(ExitCode::FAILURE)
        }
        outcome => {
            info!(profile = %profile.name, ?outcome, "profile applied");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cmd_list() -> Result<ExitCode> {
    let store = ProfileStore::at_default_location();
    let profiles = store.enumerate()?;
    if profiles.is_empty() {
        println!("No profiles have been saved yet.");
    } else {
        println!("Profiles:");
        for profile in &profiles {
            println!("- '{}'\t{}", profile.name, profile.guid);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_query() -> Result<ExitCode> {
    let api = display_api()?;
    let adapters = api.enumerate_adapters()?;
    let config = api.query_display_config()?;
    let report = serde_json::json!({
        "Adapters": adapters,
        "Paths": config.paths,
        "Modes": config.modes,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to encode display configuration")?
    );
    Ok(ExitCode::SUCCESS)
}

fn run() -> Result<ExitCode> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Command::Create { name, path, force } => cmd_create(name, path, force),
        Command::Apply { name, path, update } => cmd_apply(name, path, update),
        Command::List => cmd_list(),
        Command::Query => cmd_query(),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::{CONFIG_ENV_VAR, ConfigError, SyncConfig};
use crate::output;
use crate::remote::{self, RemoteShell};
use crate::sync::{InstallationProbe, SyncEngine};

/// Exit status when the pass finished but some mods failed.
pub const EXIT_PARTIAL_FAILURE: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "workshop-sync",
    version,
    about = "Install missing Steam Workshop mods into a game server"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = CONFIG_ENV_VAR,
        help = "Config file (default: platform config dir)"
    )]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace)"
    )]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install missing mods and print the load order (default)
    Sync(SyncArgs),
    /// Print the load-order string without contacting the target
    LoadOrder,
    /// Verify config, credentials and target connectivity
    Check,
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    #[arg(long, help = "Ask the fetch tool to validate downloaded files")]
    pub validate: bool,
    #[arg(long, help = "Probe and print the fetch command without running it")]
    pub dry_run: bool,
}

/// Execute the parsed command line.
pub fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = SyncConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    match cli.command.unwrap_or(Commands::Sync(SyncArgs::default())) {
        Commands::LoadOrder => {
            output::print_load_order(cli.json, &config.catalog)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => check(&config, cli.json),
        Commands::Sync(args) => sync(&config, &args, cli.json),
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    SyncConfig::default_path()
        .filter(|p| p.exists())
        .ok_or(ConfigError::NotFound)
}

fn sync(config: &SyncConfig, args: &SyncArgs, json: bool) -> Result<ExitCode> {
    let (credentials, shell) = crate::connect_with_credentials(config, remote::connect)?;

    let mut engine = SyncEngine::new(&shell, config, &credentials).with_dry_run(args.dry_run);
    if args.validate {
        engine = engine.with_validate(true);
    }

    let report = engine.run(&mut |event| {
        if !json {
            output::print_event(event);
        }
    })?;
    output::print_report(json, &report)?;

    if report.failed_count() > 0 {
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn check(config: &SyncConfig, json: bool) -> Result<ExitCode> {
    let (credentials, shell) = crate::connect_with_credentials(config, remote::connect)?;

    let probe = InstallationProbe::new(&shell);
    let status = output::CheckStatus {
        target: config.target.to_string(),
        username: credentials.username().to_string(),
        mods_root_present: probe.exists(&config.mods_root)?,
        tool_present: shell.execute(&format!(
            "test -x {}",
            shell_words::quote(&config.tool_path)
        ))? == 0,
        catalog_size: config.catalog.len(),
    };
    output::print_check(json, &status)?;
    Ok(ExitCode::SUCCESS)
}

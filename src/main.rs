//! ClickUp Chat Backup - Archive ClickUp chat history to JSON and CSV.
//!
//! Pages through the ClickUp REST API (v3 chat, v2 legacy chat views),
//! flattens every message and thread reply into one record shape and
//! writes per-kind and combined exports plus a summary.
//!
//! QUICK START:
//!   clickup-chat-backup init-config         # Write ~/.clickup-chat-backup/config.toml
//!   clickup-chat-backup workspaces          # List accessible workspaces
//!   clickup-chat-backup backup              # Back up the only workspace
//!   clickup-chat-backup backup -w <id> --no-replies

mod application;
mod cli;
mod domain;
mod infrastructure;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{format_summary, format_workspaces_table, BackupOptions, BackupService};
use cli::{Cli, Commands};
use domain::AppConfig;
use infrastructure::{ensure_config_exists, load_config, resolve_token, ApiClient, ReqwestTransport};

fn main() {
    // A missing .env is fine; the token may come from elsewhere.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    match cli.command {
        Commands::InitConfig => cmd_init_config(cli.config.as_deref()),
        Commands::Workspaces => {
            let config = load_config(cli.config.as_deref())?;
            let service = build_service(cli.token.as_deref(), &config)?;
            cmd_workspaces(&service)
        }
        Commands::Backup {
            workspace_id,
            no_replies,
            skip_legacy,
            output_dir,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = BackupOptions {
                workspace_id,
                include_replies: config.backup.include_replies && !no_replies,
                include_legacy: config.backup.include_legacy && !skip_legacy,
                output_dir: output_dir.unwrap_or_else(|| config.output_dir()),
            };
            let service = build_service(cli.token.as_deref(), &config)?;
            cmd_backup(&service, options)
        }
    }
}

fn build_service(token: Option<&str>, config: &AppConfig) -> domain::Result<BackupService<ReqwestTransport>> {
    let token = resolve_token(token)?;
    let transport = ReqwestTransport::new(&token, &config.api)?;
    Ok(BackupService::new(ApiClient::new(transport, config.api.clone())))
}

/// Write the default configuration file.
fn cmd_init_config(path: Option<&std::path::Path>) -> domain::Result<()> {
    let path = ensure_config_exists(path)?;
    println!("{} Configuration at {}", "✓".green().bold(), path.display());
    Ok(())
}

/// List workspaces command.
fn cmd_workspaces(service: &BackupService<ReqwestTransport>) -> domain::Result<()> {
    let workspaces = service.list_workspaces()?;
    println!("{}", format_workspaces_table(&workspaces));
    println!();
    println!("Total: {} workspace(s)", workspaces.len());
    Ok(())
}

/// Backup command.
fn cmd_backup(
    service: &BackupService<ReqwestTransport>,
    options: BackupOptions,
) -> domain::Result<()> {
    println!("{}", "🚀 Starting ClickUp chat backup".bold());
    if !options.include_replies {
        println!("   Thread replies: {}", "skipped".yellow());
    }
    if !options.include_legacy {
        println!("   Legacy chat views: {}", "skipped".yellow());
    }

    let report = service.run(options)?;

    println!();
    println!("{}", format_summary(&report.summary, &report.run_dir));
    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

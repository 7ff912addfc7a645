//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ClickUp Chat Backup - Archive channels, DMs, threads and chat views.
///
/// Writes JSON and CSV exports plus a summary into a timestamped folder.
#[derive(Parser, Debug)]
#[command(name = "clickup-chat-backup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: ~/.clickup-chat-backup/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ClickUp API token (overrides CLICKUP_API_TOKEN and .env).
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up every chat in a workspace.
    Backup {
        /// Workspace to back up (required when the token sees several).
        #[arg(short, long)]
        workspace_id: Option<String>,

        /// Skip thread replies.
        #[arg(long)]
        no_replies: bool,

        /// Skip the legacy chat view scan.
        #[arg(long)]
        skip_legacy: bool,

        /// Directory that receives the run folder.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List the workspaces the token can access.
    Workspaces,

    /// Write a default configuration file if none exists.
    InitConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backup_flags() {
        let cli = Cli::parse_from([
            "clickup-chat-backup",
            "backup",
            "-w",
            "123",
            "--no-replies",
            "--output-dir",
            "out",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Backup {
                workspace_id,
                no_replies,
                skip_legacy,
                output_dir,
            } => {
                assert_eq!(workspace_id.as_deref(), Some("123"));
                assert!(no_replies);
                assert!(!skip_legacy);
                assert_eq!(output_dir, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_token_after_subcommand() {
        let cli = Cli::parse_from(["clickup-chat-backup", "workspaces", "--token", "pk_1"]);
        assert_eq!(cli.token.as_deref(), Some("pk_1"));
        assert!(matches!(cli.command, Commands::Workspaces));
    }
}

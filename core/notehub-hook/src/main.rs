//! notehub-hook: CLI client for the notehub daemon.
//!
//! Appends notes and manages per-document tracker settings by sending
//! webhooks over the daemon socket. The reply JSON is printed to stdout.
//!
//! ## Subcommands
//!
//! - `append`: Append a note (argument or stdin)
//! - `config`: Change tracker settings for a document
//! - `register`: Register a document with fresh settings
//! - `update-stats`: Refresh the tracker blocks without appending
//! - `health`: Check that the daemon is up

mod commands;
mod daemon_client;
mod logging;

use clap::{Args, Parser, Subcommand};
use notehub_protocol::Action;

use commands::{CommandError, Settings};

#[derive(Parser)]
#[command(name = "notehub-hook")]
#[command(about = "Send notes and tracker settings to the notehub daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Owner token
    #[arg(long)]
    token: String,

    /// Document identifier
    #[arg(long = "doc-id")]
    doc_id: String,
}

#[derive(Args)]
struct SettingsArgs {
    /// Keep a tracker block at the top of the document
    #[arg(long, value_name = "BOOL")]
    stats_top: Option<bool>,

    /// Keep a tracker block at the bottom of the document
    #[arg(long, value_name = "BOOL")]
    stats_bottom: Option<bool>,

    /// Expand ⏳ placeholders anywhere in the document
    #[arg(long, value_name = "BOOL")]
    stats_anywhere: Option<bool>,

    /// IANA timezone for rendered timestamps (e.g., Europe/Paris)
    #[arg(long)]
    timezone: Option<String>,
}

impl From<SettingsArgs> for Settings {
    fn from(args: SettingsArgs) -> Self {
        Settings {
            stats_top: args.stats_top,
            stats_bottom: args.stats_bottom,
            stats_anywhere: args.stats_anywhere,
            timezone: args.timezone,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Append a note (reads stdin when TEXT is omitted or "-")
    Append {
        #[command(flatten)]
        target: Target,

        #[arg(value_name = "TEXT")]
        text: Option<String>,
    },

    /// Update tracker settings for a document
    Config {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Register a document, replacing any stored settings
    Register {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Refresh tracker blocks without appending
    UpdateStats {
        #[command(flatten)]
        target: Target,
    },

    /// Check daemon health
    Health,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Health => match daemon_client::daemon_health() {
            Ok(data) => {
                println!("{}", data);
                Ok(())
            }
            Err(err) => Err(CommandError::DaemonUnavailable(err)),
        },
        Commands::Append { target, text } => {
            commands::resolve_text(text, &mut std::io::stdin().lock()).and_then(|text| {
                send(&target, Action::Append, Some(&text), &Settings::default())
            })
        }
        Commands::Config { target, settings } => {
            send(&target, Action::SetConfig, None, &settings.into())
        }
        Commands::Register { target, settings } => {
            send(&target, Action::RegisterDoc, None, &settings.into())
        }
        Commands::UpdateStats { target } => {
            send(&target, Action::UpdateStats, None, &Settings::default())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "notehub-hook failed");
        eprintln!("notehub-hook: {}", e);
        std::process::exit(1);
    }
}

fn send(
    target: &Target,
    action: Action,
    text: Option<&str>,
    settings: &Settings,
) -> Result<(), CommandError> {
    let request = commands::build_request(&target.token, &target.doc_id, action, text, settings);
    tracing::debug!(doc_id = %target.doc_id, action = action.as_str(), "Sending webhook");
    let reply = commands::run(&request)?;
    match serde_json::to_string(&reply) {
        Ok(json) => println!("{}", json),
        Err(err) => tracing::warn!(error = %err, "Failed to render reply"),
    }
    Ok(())
}

//! Ride sync CLI - follow rides live and run lifecycle procedures.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{Context, ReconnectPolicy};
use ride_types::{RideId, UserId};
use sync_config_and_utils::{init_logging, Config, Paths};
use tracing::debug;

/// Ride sync CLI - watch a ride's status, location and messages as they change.
#[derive(Parser, Debug)]
#[command(name = "ride-sync")]
#[command(about = "Follow rides live and invoke ride lifecycle procedures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User access token (JWT) the backend authorizes requests with
    #[arg(long, env = "SUPABASE_ACCESS_TOKEN", global = true, hide_env_values = true)]
    access_token: Option<String>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow a ride live until Ctrl-C
    Watch {
        #[arg(long, value_parser = parse_ride_id)]
        ride_id: RideId,
        /// The user watching; own messages do not raise notifications
        #[arg(long, value_parser = parse_user_id)]
        user_id: UserId,
        /// Give up after this many consecutive reconnect attempts (0 = never retry)
        #[arg(long, default_value = "10")]
        max_reconnects: u32,
        /// Keep reconnecting forever
        #[arg(long, conflicts_with = "max_reconnects")]
        forever: bool,
    },

    /// Mark a ride completed
    Complete {
        #[arg(long, value_parser = parse_ride_id)]
        ride_id: RideId,
    },

    /// Release a scheduled ride back to the open requests
    ReturnToRequests {
        #[arg(long, value_parser = parse_ride_id)]
        ride_id: RideId,
    },

    /// Cancel a ride
    Cancel {
        #[arg(long, value_parser = parse_ride_id)]
        ride_id: RideId,
        /// The user cancelling
        #[arg(long, value_parser = parse_user_id)]
        user_id: UserId,
        /// Cancellation reason
        #[arg(long)]
        reason: Option<String>,
    },

    /// List a ride's messages
    Messages {
        #[arg(long, value_parser = parse_ride_id)]
        ride_id: RideId,
    },

    /// Send a message to the other party of a ride
    SendMessage {
        #[arg(long, value_parser = parse_ride_id)]
        ride_id: RideId,
        /// The sender
        #[arg(long, value_parser = parse_user_id)]
        user_id: UserId,
        #[arg(long, value_parser = parse_user_id)]
        recipient_id: UserId,
        #[arg(long)]
        content: String,
    },
}

fn parse_ride_id(raw: &str) -> Result<RideId, String> {
    RideId::parse(raw).ok_or_else(|| "ride id must not be empty".to_string())
}

fn parse_user_id(raw: &str) -> Result<UserId, String> {
    UserId::parse(raw).ok_or_else(|| "user id must not be empty".to_string())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let mut config = Config::load(&paths)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    match init_logging(&paths, "ride-sync-cli", &config.log_level, cli.verbose) {
        Ok(log_path) => debug!(log_path = ?log_path, "Logging initialized"),
        Err(e) => eprintln!("Warning: file logging disabled: {}", e),
    }

    let ctx = Context::new(config, cli.access_token, cli.format);

    match cli.command {
        Commands::Watch {
            ride_id,
            user_id,
            max_reconnects,
            forever,
        } => {
            let policy = ReconnectPolicy {
                max_attempts: (!forever).then_some(max_reconnects),
                ..Default::default()
            };
            commands::watch(&ctx, ride_id, user_id, policy).await
        }
        Commands::Complete { ride_id } => commands::complete(&ctx, &ride_id).await,
        Commands::ReturnToRequests { ride_id } => {
            commands::return_to_requests(&ctx, &ride_id).await
        }
        Commands::Cancel {
            ride_id,
            user_id,
            reason,
        } => commands::cancel(&ctx, &ride_id, &user_id, reason.as_deref()).await,
        Commands::Messages { ride_id } => commands::list_messages(&ctx, &ride_id).await,
        Commands::SendMessage {
            ride_id,
            user_id,
            recipient_id,
            content,
        } => commands::send_message(&ctx, ride_id, user_id, recipient_id, content).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from([
            "ride-sync",
            "watch",
            "--ride-id",
            "ride-1",
            "--user-id",
            "parent-1",
            "--max-reconnects",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Watch {
                ride_id,
                user_id,
                max_reconnects,
                forever,
            } => {
                assert_eq!(ride_id.as_str(), "ride-1");
                assert_eq!(user_id.as_str(), "parent-1");
                assert_eq!(max_reconnects, 3);
                assert!(!forever);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_blank_ride_id_rejected() {
        let result = Cli::try_parse_from(["ride-sync", "complete", "--ride-id", "  "]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_cancel_with_reason() {
        let cli = Cli::try_parse_from([
            "ride-sync",
            "--format",
            "json",
            "cancel",
            "--ride-id",
            "42",
            "--user-id",
            "driver-7",
            "--reason",
            "Flat tyre",
        ])
        .unwrap();

        assert_eq!(cli.format, output::OutputFormat::Json);
        match cli.command {
            Commands::Cancel {
                ride_id, reason, ..
            } => {
                assert_eq!(ride_id.as_str(), "42");
                assert_eq!(reason.as_deref(), Some("Flat tyre"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

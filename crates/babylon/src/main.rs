mod commands;

use std::net::IpAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use babylon::config::DEFAULT_CONFIG_FILE;
use commands::session::SessionAction;

// ============================================================================
// CLI Types
// ============================================================================

/// Babylon - A test-orchestration hub for pluggable actors, drivers and reporters
#[derive(Parser, Debug)]
#[command(version = babylon::build_info::VERSION, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the hub HTTP server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Host to bind to (overrides config file)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage sessions on a running hub
    Session {
        #[command(subcommand)]
        action: SessionCommand,

        /// Hub base URL
        #[arg(short, long, default_value = "http://127.0.0.1:8080", global = true)]
        server: String,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Create a new session and print it
    New,
    /// Print a session and its log
    Show {
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
    /// Append a client log line to a session
    Log {
        #[arg(value_name = "SESSION_ID")]
        id: String,
        message: String,
    },
    /// End a session
    End {
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
}

impl From<SessionCommand> for SessionAction {
    fn from(command: SessionCommand) -> Self {
        match command {
            SessionCommand::New => SessionAction::New,
            SessionCommand::Show { id } => SessionAction::Show { id },
            SessionCommand::Log { id, message } => SessionAction::Log { id, message },
            SessionCommand::End { id } => SessionAction::End { id },
        }
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => commands::serve::run(&config, host, port).await,
        Commands::Session { action, server } => {
            commands::session::run(&server, action.into()).await
        }
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

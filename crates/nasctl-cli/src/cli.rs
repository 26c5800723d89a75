//! Command-line argument parsing with clap.

use clap::{Parser, Subcommand, ValueEnum};

/// nasctl - TrueNAS Scale application control.
#[derive(Parser, Debug, Clone)]
#[command(name = "nasctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TrueNAS management URL (http:// or https://).
    #[arg(long, env = "TRUENAS_URL")]
    pub url: String,

    /// TrueNAS API key.
    #[arg(long, env = "TRUENAS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Skip TLS certificate verification (self-signed appliances).
    #[arg(long)]
    pub no_ssl_verify: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Seconds to wait for a stop/start job to finish.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Seconds between job polls.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the status of an application.
    Status {
        /// Application name.
        app_name: String,
    },

    /// Stop an application and wait for completion.
    Stop {
        /// Application name.
        app_name: String,
    },

    /// Start an application and wait for completion.
    Start {
        /// Application name.
        app_name: String,
    },

    /// Restart an application and report its final status.
    Restart {
        /// Application name.
        app_name: String,
    },
}

impl Commands {
    /// The application name the command targets.
    #[must_use]
    pub fn app_name(&self) -> &str {
        match self {
            Self::Status { app_name }
            | Self::Stop { app_name }
            | Self::Start { app_name }
            | Self::Restart { app_name } => app_name,
        }
    }
}

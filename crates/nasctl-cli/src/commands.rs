//! Command execution against a live appliance.

use std::io::Write;
use std::time::Duration;

use tracing::debug;

use nasctl_client::{ClientConfig, JobWaitOptions, TrueNasClient};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::{OperationReport, OutputFormat, StatusReport};

/// Executes one app command over a fresh client session.
///
/// Each invocation is a single short-lived connection: connect,
/// authenticate, run the operation, close.
pub struct AppCommand {
    config: ClientConfig,
    wait: JobWaitOptions,
}

impl AppCommand {
    /// Build the command executor from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or API key is invalid.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config = ClientConfig::new(&cli.url, &cli.api_key)?
            .with_ssl_verify(!cli.no_ssl_verify);
        let wait = JobWaitOptions {
            timeout: Duration::from_secs(cli.timeout_secs),
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
        };
        Ok(Self { config, wait })
    }

    /// Connect, run the requested operation, and write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, the operation, or output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &Commands,
    ) -> Result<(), CliError> {
        let mut client = TrueNasClient::connect(&self.config).await?;

        let result = self.run(&mut client, command).await;
        if let Err(e) = client.close().await {
            debug!(error = %e, "close failed after operation");
        }

        match result? {
            Report::Status(report) => format.write(writer, &report)?,
            Report::Operation(report) => format.write(writer, &report)?,
        }
        Ok(())
    }

    async fn run(
        &self,
        client: &mut TrueNasClient,
        command: &Commands,
    ) -> Result<Report, CliError> {
        let app = command.app_name().to_string();
        match command {
            Commands::Status { .. } => {
                let status = client.get_app_status(&app).await?;
                Ok(Report::Status(StatusReport {
                    app,
                    status: status.unwrap_or_else(|| "UNKNOWN".to_string()),
                }))
            }
            Commands::Stop { .. } => {
                client.stop_app(&app, &self.wait).await?;
                let status = client.get_app_status(&app).await?;
                Ok(Report::Operation(OperationReport {
                    app,
                    action: "stop".into(),
                    success: true,
                    status,
                }))
            }
            Commands::Start { .. } => {
                client.start_app(&app, &self.wait).await?;
                let status = client.get_app_status(&app).await?;
                Ok(Report::Operation(OperationReport {
                    app,
                    action: "start".into(),
                    success: true,
                    status,
                }))
            }
            Commands::Restart { .. } => {
                let status = client.restart_app(&app, &self.wait).await?;
                Ok(Report::Operation(OperationReport {
                    app,
                    action: "restart".into(),
                    success: true,
                    status: Some(status),
                }))
            }
        }
    }
}

enum Report {
    Status(StatusReport),
    Operation(OperationReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec![
            "nasctl",
            "--url",
            "https://nas.local",
            "--api-key",
            "1-abcdefghijklmnop",
        ];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn from_cli_builds_wait_options() {
        let cmd = AppCommand::from_cli(&cli(&[
            "--timeout-secs",
            "60",
            "--poll-interval-secs",
            "5",
            "stop",
            "plex",
        ]))
        .expect("valid cli");
        assert_eq!(cmd.wait.timeout, Duration::from_secs(60));
        assert_eq!(cmd.wait.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn from_cli_rejects_bad_url() {
        let mut parsed = cli(&["status", "plex"]);
        parsed.url = "ftp://nas.local".into();
        assert!(AppCommand::from_cli(&parsed).is_err());
    }

    #[test]
    fn from_cli_respects_ssl_toggle() {
        let cmd = AppCommand::from_cli(&cli(&["--no-ssl-verify", "status", "plex"]))
            .expect("valid cli");
        assert!(!cmd.config.ssl_verify());
    }
}

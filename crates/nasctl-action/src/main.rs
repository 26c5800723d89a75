//! GitHub Actions wrapper around the TrueNAS app client.
//!
//! Reads the action inputs from `INPUT_*` environment variables (the
//! runner's convention for declared inputs), runs one operation, and
//! appends the declared outputs (`app-status`, `success`) to the file
//! named by `GITHUB_OUTPUT`. Any failure exits non-zero with
//! `success=false` recorded.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use nasctl_client::{ClientConfig, ClientError, JobWaitOptions, TrueNasClient};

/// Errors specific to the action wrapper.
#[derive(Debug)]
enum ActionError {
    /// A declared input is missing or invalid.
    Input(String),
    /// The underlying client operation failed.
    Client(ClientError),
    /// Writing the outputs failed.
    Io(io::Error),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(msg) => write!(f, "input error: {msg}"),
            Self::Client(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<ClientError> for ActionError {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

impl From<io::Error> for ActionError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// The operation requested via the `action` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Status,
    Stop,
    Start,
    Restart,
}

impl ActionKind {
    fn parse(value: &str) -> Result<Self, ActionError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(Self::Status),
            "stop" => Ok(Self::Stop),
            "start" => Ok(Self::Start),
            "restart" => Ok(Self::Restart),
            other => Err(ActionError::Input(format!(
                "unsupported action '{other}', expected status|stop|start|restart"
            ))),
        }
    }
}

/// Declared inputs, resolved from the environment.
struct Inputs {
    url: String,
    api_key: String,
    app_name: String,
    action: ActionKind,
    ssl_verify: bool,
}

impl Inputs {
    fn from_env() -> Result<Self, ActionError> {
        Ok(Self {
            url: required_input("truenas-url")?,
            api_key: required_input("api-key")?,
            app_name: required_input("app-name")?,
            action: ActionKind::parse(&required_input("action")?)?,
            ssl_verify: !input("disable-ssl-verify")
                .as_deref()
                .is_some_and(truthy),
        })
    }
}

/// Read a declared input. The runner exposes input `foo-bar` as the
/// environment variable `INPUT_FOO-BAR`.
fn input(name: &str) -> Option<String> {
    let key = format!("INPUT_{}", name.to_ascii_uppercase());
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required_input(name: &str) -> Result<String, ActionError> {
    input(name).ok_or_else(|| ActionError::Input(format!("missing required input '{name}'")))
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

/// Append the declared outputs in the runner's `name=value` format.
fn render_outputs(status: &str, success: bool) -> String {
    format!("app-status={status}\nsuccess={success}\n")
}

fn write_outputs(status: &str, success: bool) -> Result<(), ActionError> {
    let rendered = render_outputs(status, success);
    match std::env::var("GITHUB_OUTPUT") {
        Ok(path) => {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(rendered.as_bytes())?;
        }
        // Outside a runner, print the outputs for inspection.
        Err(_) => print!("{rendered}"),
    }
    Ok(())
}

async fn run(inputs: Inputs) -> Result<String, ActionError> {
    let config =
        ClientConfig::new(&inputs.url, &inputs.api_key)?.with_ssl_verify(inputs.ssl_verify);
    let wait = JobWaitOptions {
        timeout: Duration::from_secs(30),
        poll_interval: Duration::from_secs(2),
    };

    let mut client = TrueNasClient::connect(&config).await?;
    let result = match inputs.action {
        ActionKind::Status => client.get_app_status(&inputs.app_name).await.map(|status| {
            status.unwrap_or_else(|| "UNKNOWN".to_string())
        }),
        ActionKind::Stop => match client.stop_app(&inputs.app_name, &wait).await {
            Ok(()) => final_status(&mut client, &inputs.app_name).await,
            Err(e) => Err(e),
        },
        ActionKind::Start => match client.start_app(&inputs.app_name, &wait).await {
            Ok(()) => final_status(&mut client, &inputs.app_name).await,
            Err(e) => Err(e),
        },
        ActionKind::Restart => client.restart_app(&inputs.app_name, &wait).await,
    };
    if let Err(e) = client.close().await {
        tracing::debug!(error = %e, "close failed after operation");
    }
    Ok(result?)
}

async fn final_status(client: &mut TrueNasClient, app: &str) -> Result<String, ClientError> {
    Ok(client
        .get_app_status(app)
        .await?
        .unwrap_or_else(|| "UNKNOWN".to_string()))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = Inputs::from_env().map(|inputs| runtime.block_on(run(inputs)));
    match outcome {
        Ok(Ok(status)) => {
            if let Err(e) = write_outputs(&status, true) {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Ok(Err(e)) | Err(e) => {
            // Best effort; the non-zero exit is the authoritative signal.
            let _ = write_outputs("UNKNOWN", false);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_parses_all_values() {
        assert_eq!(ActionKind::parse("status").expect("valid"), ActionKind::Status);
        assert_eq!(ActionKind::parse(" Stop ").expect("valid"), ActionKind::Stop);
        assert_eq!(ActionKind::parse("START").expect("valid"), ActionKind::Start);
        assert_eq!(ActionKind::parse("restart").expect("valid"), ActionKind::Restart);
        assert!(ActionKind::parse("reboot").is_err());
    }

    #[test]
    fn truthy_values() {
        assert!(truthy("true"));
        assert!(truthy("YES"));
        assert!(truthy("1"));
        assert!(!truthy("false"));
        assert!(!truthy(""));
    }

    #[test]
    fn outputs_render_in_runner_format() {
        assert_eq!(
            render_outputs("RUNNING", true),
            "app-status=RUNNING\nsuccess=true\n"
        );
        assert_eq!(
            render_outputs("UNKNOWN", false),
            "app-status=UNKNOWN\nsuccess=false\n"
        );
    }
}

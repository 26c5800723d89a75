//! TrueNAS WebSocket client: connection manager and operation engine.
//!
//! A client owns exactly one channel. Calls are strictly sequential: one
//! correlated call in flight at a time, matched to its response by id, never
//! by arrival order. Mutating operations return a server-side job id which
//! is polled at a fixed interval until it reaches a terminal state or the
//! wait deadline passes.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, Connector, MaybeTlsStream,
    WebSocketStream,
};
use tracing::{debug, info, trace, warn};

use nasctl_proto::{methods, AppInstance, ClientMessage, Job, JobState, ServerMessage};

use crate::config::ClientConfig;
use crate::error::{AuthErrorKind, ClientError};

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-call response timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for a job and how often to poll it.
///
/// The interval is a deliberate fixed backoff; TrueNAS jobs settle in
/// seconds and an exponential schedule would only delay detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobWaitOptions {
    /// Total wait deadline.
    pub timeout: Duration,
    /// Sleep between polls.
    pub poll_interval: Duration,
}

impl Default for JobWaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Authenticated client session against one TrueNAS appliance.
pub struct TrueNasClient {
    /// The single persistent channel. Destroyed on [`close`](Self::close)
    /// or fatal error; there is no reconnection.
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Last issued correlation id. Strictly increasing, never reused
    /// within the session.
    next_id: u64,
    /// Per-call response deadline.
    request_timeout: Duration,
}

impl std::fmt::Debug for TrueNasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueNasClient")
            .field("next_id", &self.next_id)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl TrueNasClient {
    /// Connect to the appliance, negotiate the protocol, and authenticate.
    ///
    /// On success the channel is ready for operational calls. Any failure
    /// (network, handshake rejection, bad credential) is fatal; the caller
    /// decides whether to retry from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be opened or either handshake
    /// phase fails.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::connect_with_timeout(config, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect with a custom socket-open timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if connection, negotiation, or authentication fails.
    pub async fn connect_with_timeout(
        config: &ClientConfig,
        connect_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let connector = tls_connector(config)?;

        debug!(url = %config.ws_url(), ssl_verify = config.ssl_verify(), "connecting");

        let (ws, _response) = timeout(
            connect_timeout,
            connect_async_tls_with_config(config.ws_url(), None, false, connector),
        )
        .await
        .map_err(|_| ClientError::Timeout("connection timed out".into()))?
        .map_err(|e| ClientError::Connection(e.to_string()))?;

        let mut client = Self {
            ws,
            next_id: 0,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        };

        client.negotiate().await?;
        client.authenticate(config.api_key()).await?;

        debug!("session ready");
        Ok(client)
    }

    /// Set the per-call response timeout.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    /// Close the channel gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close frame cannot be sent.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws
            .close(None)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))
    }

    /// Send the version-negotiation message and require acceptance.
    ///
    /// Exactly one response is expected; anything other than `connected`
    /// is a fatal handshake failure.
    async fn negotiate(&mut self) -> Result<(), ClientError> {
        let json = ClientMessage::connect().to_json()?;
        self.send_text(json).await?;

        match self.recv_message().await? {
            ServerMessage::Connected { session } => {
                debug!(session = session.as_deref().unwrap_or("-"), "channel accepted");
                Ok(())
            }
            ServerMessage::Failed { version } => Err(ClientError::Handshake(format!(
                "server rejected protocol version (supports {})",
                version.as_deref().unwrap_or("unknown")
            ))),
            other => Err(ClientError::Handshake(format!(
                "unexpected reply to connect: {other:?}"
            ))),
        }
    }

    /// Authenticate the session with the configured API key.
    ///
    /// Runs before any operational call. A server error or a literal
    /// `false` result both fail the whole connect; the classification is
    /// diagnostic only, there is no automatic retry or fallback method.
    async fn authenticate(&mut self, api_key: &str) -> Result<(), ClientError> {
        match self
            .call_method(methods::AUTH_LOGIN_WITH_API_KEY, vec![api_key.into()])
            .await
        {
            Ok(result) => {
                if result.as_bool() == Some(false) {
                    return Err(ClientError::Auth {
                        kind: AuthErrorKind::InvalidKey,
                        message: "server rejected the API key".into(),
                    });
                }
                debug!("session authenticated");
                Ok(())
            }
            Err(ClientError::Method { message, .. }) => Err(ClientError::Auth {
                kind: AuthErrorKind::classify(&message),
                message,
            }),
            Err(e) => Err(e),
        }
    }

    /// Issue one correlated method call and wait for its response.
    ///
    /// Allocates the next id, sends a single envelope, then reads incoming
    /// messages until a result bearing that exact id arrives. Responses
    /// with unrelated ids and non-result traffic (pings, collection change
    /// notifications) are skipped, never mistaken for the response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Method`] when the server reports an error,
    /// [`ClientError::Timeout`] when no matching response arrives in time,
    /// or a connection/protocol error.
    pub async fn call_method(
        &mut self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, ClientError> {
        self.next_id += 1;
        let id = self.next_id;

        let json = ClientMessage::method(id, method, params).to_json()?;
        trace!(method, id, "sending call");
        self.send_text(json).await?;

        let deadline = Instant::now() + self.request_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ClientError::Timeout(format!("call '{method}' timed out")));
            }

            let message = timeout(remaining, self.ws.next())
                .await
                .map_err(|_| ClientError::Timeout(format!("call '{method}' timed out")))?
                .ok_or_else(|| ClientError::Connection("connection closed".into()))?
                .map_err(|e| ClientError::Connection(e.to_string()))?;

            let text = match message {
                Message::Text(text) => text,
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                Message::Binary(_) => {
                    return Err(ClientError::Protocol("unexpected binary message".into()))
                }
                Message::Close(_) => {
                    return Err(ClientError::Connection("connection closed by server".into()))
                }
            };

            match ServerMessage::from_json(&text)? {
                ServerMessage::MethodResult {
                    id: got,
                    result,
                    error,
                } if got == id => {
                    return match error {
                        Some(err) => Err(ClientError::Method {
                            method: method.to_string(),
                            message: err.text().to_string(),
                        }),
                        None => {
                            trace!(method, id, "call resolved");
                            Ok(result.unwrap_or(Value::Null))
                        }
                    };
                }
                ServerMessage::MethodResult { id: got, .. } => {
                    warn!(expected = id, got, "skipping result with unrelated id");
                }
                other => {
                    trace!(?other, "skipping non-result message");
                }
            }
        }
    }

    /// Query the state of a named application.
    ///
    /// Used both directly and as the pre-flight existence check before
    /// mutating operations, so it degrades gracefully: a server-reported
    /// failure (not found, permission, anything) is logged and collapsed
    /// to `Ok(None)` rather than surfaced as an error. Transport failures
    /// still propagate; a dead channel is fatal to the session.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names and connection-level failures
    /// only.
    pub async fn get_app_status(&mut self, name: &str) -> Result<Option<String>, ClientError> {
        let name = valid_app_name(name)?;

        match self
            .call_method(methods::APP_GET_INSTANCE, vec![name.into()])
            .await
        {
            Ok(Value::Null) => {
                debug!(app = name, "no descriptor returned; status unknown");
                Ok(None)
            }
            Ok(result) => {
                let app = AppInstance::from_result(&result)?;
                debug!(app = name, state = %app.state, "status fetched");
                Ok(Some(app.state))
            }
            Err(ClientError::Method { message, .. }) => {
                warn!(app = name, error = %message, "status query failed; treating as unknown");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll a server-side job until it reaches a terminal state or the
    /// deadline passes.
    ///
    /// Returns `Ok(true)` on SUCCESS and `Ok(false)` on FAILED, ABORTED,
    /// or timeout; the three are distinguished in the logs only. A
    /// transient poll failure (flaky query, job not visible yet) never
    /// aborts the wait — polling continues until the deadline.
    ///
    /// # Errors
    ///
    /// Returns an error only for non-positive job ids.
    pub async fn wait_for_job(
        &mut self,
        job_id: i64,
        options: &JobWaitOptions,
    ) -> Result<bool, ClientError> {
        if job_id <= 0 {
            return Err(ClientError::Config(format!("invalid job id: {job_id}")));
        }

        let started = Instant::now();
        while started.elapsed() < options.timeout {
            match self.query_job(job_id).await {
                Ok(Some(job)) => match job.state {
                    JobState::Success => {
                        info!(job_id, "job completed");
                        return Ok(true);
                    }
                    JobState::Failed | JobState::Aborted => {
                        warn!(
                            job_id,
                            state = %job.state,
                            error = job.error.as_deref().unwrap_or("no error detail"),
                            "job failed"
                        );
                        return Ok(false);
                    }
                    JobState::Running => {
                        if let Some(progress) = &job.progress {
                            debug!(
                                job_id,
                                percent = progress.percent.unwrap_or(0.0),
                                description = progress.description.as_deref().unwrap_or(""),
                                "job running"
                            );
                        }
                    }
                    JobState::Waiting | JobState::Unknown => {
                        trace!(job_id, state = %job.state, "job not running yet");
                    }
                },
                Ok(None) => {
                    debug!(job_id, "job not visible yet; still polling");
                }
                Err(e) => {
                    warn!(job_id, error = %e, "job poll failed; still polling");
                }
            }

            sleep(options.poll_interval).await;
        }

        warn!(job_id, timeout = ?options.timeout, "timed out waiting for job");
        Ok(false)
    }

    /// Stop a named application and wait for the stop job to finish.
    ///
    /// Fails fast with [`ClientError::AppNotFound`] if the app does not
    /// exist, without issuing the stop call. An "already stopped" server
    /// error is a success no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the app is missing, the call fails, or the job
    /// fails or times out.
    pub async fn stop_app(
        &mut self,
        name: &str,
        options: &JobWaitOptions,
    ) -> Result<(), ClientError> {
        self.run_app_job(name, methods::APP_STOP, "stop", is_already_stopped, options)
            .await
    }

    /// Start a named application and wait for the start job to finish.
    ///
    /// Fails fast with [`ClientError::AppNotFound`] if the app does not
    /// exist, without issuing the start call. An "already running" server
    /// error is a success no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the app is missing, the call fails, or the job
    /// fails or times out.
    pub async fn start_app(
        &mut self,
        name: &str,
        options: &JobWaitOptions,
    ) -> Result<(), ClientError> {
        self.run_app_job(name, methods::APP_START, "start", is_already_running, options)
            .await
    }

    /// Restart a named application: stop, then start, then report the
    /// final observed status.
    ///
    /// No rollback: if the stop succeeds and the start fails, the error
    /// propagates and the application is left stopped.
    ///
    /// # Errors
    ///
    /// Returns the first error from the stop or start phase.
    pub async fn restart_app(
        &mut self,
        name: &str,
        options: &JobWaitOptions,
    ) -> Result<String, ClientError> {
        info!(app = name, "restarting");
        self.stop_app(name, options).await?;

        // Informational only; the start proceeds regardless.
        if let Some(status) = self.get_app_status(name).await? {
            debug!(app = name, status = %status, "status after stop");
        }

        self.start_app(name, options).await?;

        let status = self
            .get_app_status(name)
            .await?
            .unwrap_or_else(|| "UNKNOWN".to_string());
        info!(app = name, status = %status, "restart finished");
        Ok(status)
    }

    /// Shared stop/start script: existence check, mutating call, job wait.
    ///
    /// `already` decides whether a server error means the app is already in
    /// the state this verb would produce; only that exact condition is
    /// treated as a success no-op.
    async fn run_app_job(
        &mut self,
        name: &str,
        method: &str,
        verb: &str,
        already: fn(&str) -> bool,
        options: &JobWaitOptions,
    ) -> Result<(), ClientError> {
        let name = valid_app_name(name)?;

        let Some(status) = self.get_app_status(name).await? else {
            return Err(ClientError::AppNotFound(name.to_string()));
        };
        debug!(app = name, status = %status, "pre-flight status");

        let result = match self.call_method(method, vec![name.into()]).await {
            Ok(result) => result,
            Err(ClientError::Method { message, .. }) if already(&message) => {
                info!(app = name, reason = %message, "{verb} is a no-op");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let Some(job_id) = result.as_i64() else {
            return Err(ClientError::Protocol(format!(
                "{method} did not return a job id: {result}"
            )));
        };
        info!(app = name, job_id, "waiting for {verb} job");

        if self.wait_for_job(job_id, options).await? {
            info!(app = name, "{verb} succeeded");
            Ok(())
        } else {
            Err(ClientError::OperationFailed(format!(
                "{verb} of '{name}' failed or timed out"
            )))
        }
    }

    /// Fetch one job by id via `core.get_jobs`.
    ///
    /// The query is filtered server-side, but the job is still located by
    /// id in the returned list rather than taken positionally.
    async fn query_job(&mut self, job_id: i64) -> Result<Option<Job>, ClientError> {
        let filters = json!([["id", "=", job_id]]);
        let result = self
            .call_method(methods::CORE_GET_JOBS, vec![filters])
            .await?;

        let jobs = Job::list_from_result(&result)?;
        Ok(jobs.into_iter().find(|job| job.id == job_id))
    }

    async fn send_text(&mut self, json: String) -> Result<(), ClientError> {
        self.ws
            .send(Message::Text(json))
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))
    }

    async fn recv_message(&mut self) -> Result<ServerMessage, ClientError> {
        let message = timeout(self.request_timeout, self.ws.next())
            .await
            .map_err(|_| ClientError::Timeout("no reply from server".into()))?
            .ok_or_else(|| ClientError::Connection("connection closed".into()))?
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        match message {
            Message::Text(text) => Ok(ServerMessage::from_json(&text)?),
            Message::Close(_) => Err(ClientError::Connection(
                "connection closed by server".into(),
            )),
            other => Err(ClientError::Protocol(format!(
                "unexpected message type: {other:?}"
            ))),
        }
    }
}

/// Validate an application name argument.
fn valid_app_name(name: &str) -> Result<&str, ClientError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Config("app name must not be empty".into()));
    }
    Ok(trimmed)
}

/// Whether a stop error means the app was never running, which `stop_app`
/// treats as a success no-op.
fn is_already_stopped(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already stopped") || lower.contains("not running")
}

/// Whether a start error means the app is already up, which `start_app`
/// treats as a success no-op. Deliberately narrower than the stop check:
/// a start failure that merely mentions "not running" is a real failure.
fn is_already_running(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already running")
}

/// Build the TLS connector, disabling certificate checks when configured.
fn tls_connector(config: &ClientConfig) -> Result<Option<Connector>, ClientError> {
    if config.ssl_verify() {
        return Ok(None);
    }

    warn!("TLS certificate verification is disabled");
    let tls = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| ClientError::Connection(format!("TLS setup failed: {e}")))?;
    Ok(Some(Connector::NativeTls(tls)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_wait_options_defaults() {
        let options = JobWaitOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn already_stopped_detection() {
        assert!(is_already_stopped("[EFAULT] App already stopped"));
        assert!(is_already_stopped("app is not running"));
        assert!(!is_already_stopped("permission denied"));
    }

    #[test]
    fn already_running_detection_is_narrower() {
        assert!(is_already_running("Application 'plex' is already running"));
        // A start failure that mentions "not running" must not be
        // mistaken for the app already being up.
        assert!(!is_already_running("health check failed: service not running"));
        assert!(!is_already_running("already stopped"));
        assert!(!is_already_running("permission denied"));
    }

    #[test]
    fn app_name_validation() {
        assert_eq!(valid_app_name(" plex ").expect("valid"), "plex");
        assert!(valid_app_name("   ").is_err());
        assert!(valid_app_name("").is_err());
    }

    #[test]
    fn verifying_config_uses_default_connector() {
        let config = ClientConfig::new("https://nas.local", "1-abcdefghijklmnop")
            .expect("valid config");
        assert!(tls_connector(&config).expect("connector").is_none());
    }

    #[test]
    fn insecure_config_builds_custom_connector() {
        let config = ClientConfig::new("https://nas.local", "1-abcdefghijklmnop")
            .expect("valid config")
            .with_ssl_verify(false);
        assert!(tls_connector(&config).expect("connector").is_some());
    }

    #[tokio::test]
    async fn connect_to_unreachable_host_times_out() {
        let config = ClientConfig::new("http://10.255.255.1:9999", "1-abcdefghijklmnop")
            .expect("valid config");
        let result =
            TrueNasClient::connect_with_timeout(&config, Duration::from_millis(100)).await;
        assert!(result.is_err());
    }
}

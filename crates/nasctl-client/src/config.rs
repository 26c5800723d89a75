//! Client configuration and target URL handling.

use crate::error::ClientError;

/// Minimum accepted API key length. TrueNAS keys are far longer; this only
/// catches obviously truncated values before any network I/O.
pub const MIN_API_KEY_LEN: usize = 16;

/// Immutable connection configuration for a [`TrueNasClient`](crate::TrueNasClient).
///
/// The target is given as the appliance's web UI address (`http://` or
/// `https://`) and rewritten to the WebSocket endpoint the API lives on.
#[derive(Clone)]
pub struct ClientConfig {
    ws_url: String,
    api_key: String,
    ssl_verify: bool,
}

impl ClientConfig {
    /// Validate the target URL and API key and build a configuration.
    ///
    /// Certificate verification defaults to enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the URL is not a well-formed
    /// `http`/`https` URL or the key is empty or too short.
    pub fn new(url: &str, api_key: &str) -> Result<Self, ClientError> {
        let ws_url = websocket_url(url)?;

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ClientError::Config("API key must not be empty".into()));
        }
        if api_key.len() < MIN_API_KEY_LEN {
            return Err(ClientError::Config(format!(
                "API key is too short (minimum {MIN_API_KEY_LEN} characters)"
            )));
        }

        Ok(Self {
            ws_url,
            api_key: api_key.to_string(),
            ssl_verify: true,
        })
    }

    /// Enable or disable remote TLS certificate verification.
    ///
    /// Disabling this skips certificate validation entirely and should only
    /// be used against appliances with self-signed certificates on trusted
    /// networks.
    #[must_use]
    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    /// The rewritten `ws://`/`wss://` endpoint URL.
    #[must_use]
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// The API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Whether TLS certificates are verified.
    #[must_use]
    pub fn ssl_verify(&self) -> bool {
        self.ssl_verify
    }
}

// The key never appears in logs or debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("ws_url", &self.ws_url)
            .field("api_key", &"<redacted>")
            .field("ssl_verify", &self.ssl_verify)
            .finish()
    }
}

/// Rewrite an `http(s)://` management URL to the `/websocket` API endpoint.
fn websocket_url(url: &str) -> Result<String, ClientError> {
    let url = url.trim();
    let (scheme, rest) = if let Some(rest) = url.strip_prefix("http://") {
        ("ws", rest)
    } else if let Some(rest) = url.strip_prefix("https://") {
        ("wss", rest)
    } else {
        return Err(ClientError::Config(format!(
            "invalid TrueNAS URL: {url}, must start with http:// or https://"
        )));
    };

    let host = rest.trim_end_matches('/');
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(ClientError::Config(format!(
            "invalid TrueNAS URL: {url}, missing host"
        )));
    }

    Ok(format!("{scheme}://{host}/websocket"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "1-abcdefghijklmnopqrstuvwxyz";

    #[test]
    fn http_url_rewritten_to_ws() {
        let config = ClientConfig::new("http://nas.local", KEY).expect("valid config");
        assert_eq!(config.ws_url(), "ws://nas.local/websocket");
    }

    #[test]
    fn https_url_rewritten_to_wss() {
        let config = ClientConfig::new("https://nas.local:8443/", KEY).expect("valid config");
        assert_eq!(config.ws_url(), "wss://nas.local:8443/websocket");
    }

    #[test]
    fn non_http_scheme_rejected() {
        let err = ClientConfig::new("ftp://nas.local", KEY).unwrap_err();
        assert!(err.to_string().contains("must start with http"));
    }

    #[test]
    fn missing_host_rejected() {
        assert!(ClientConfig::new("https://", KEY).is_err());
        assert!(ClientConfig::new("https:///", KEY).is_err());
    }

    #[test]
    fn empty_api_key_rejected() {
        let err = ClientConfig::new("https://nas.local", "  ").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn short_api_key_rejected() {
        let err = ClientConfig::new("https://nas.local", "short").unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn ssl_verify_defaults_on() {
        let config = ClientConfig::new("https://nas.local", KEY).expect("valid config");
        assert!(config.ssl_verify());
        assert!(!config.with_ssl_verify(false).ssl_verify());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ClientConfig::new("https://nas.local", KEY).expect("valid config");
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(KEY));
    }
}

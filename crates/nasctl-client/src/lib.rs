//! # nasctl-client
//!
//! Client for driving a TrueNAS Scale appliance over its persistent
//! WebSocket API: start, stop, restart, and query the status of a named
//! application.
//!
//! One client owns one channel. [`TrueNasClient::connect`] opens the
//! socket, negotiates the protocol version, and authenticates with an API
//! key; after that the operation methods issue id-correlated calls and,
//! for mutating operations, poll the resulting server-side job to a
//! terminal state.
//!
//! ```rust,no_run
//! use nasctl_client::{ClientConfig, JobWaitOptions, TrueNasClient};
//!
//! # async fn example() -> Result<(), nasctl_client::ClientError> {
//! let config = ClientConfig::new("https://nas.example.com", "1-abcdefghijklmnop")?;
//! let mut client = TrueNasClient::connect(&config).await?;
//! client.stop_app("plex", &JobWaitOptions::default()).await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;

pub use client::{JobWaitOptions, TrueNasClient};
pub use config::ClientConfig;
pub use error::{AuthErrorKind, ClientError};

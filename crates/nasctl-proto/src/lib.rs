//! # nasctl-proto
//!
//! Message types for the TrueNAS Scale WebSocket API as used by `nasctl`.
//!
//! TrueNAS exposes a JSON message channel: a version-negotiation handshake
//! followed by id-correlated method calls.
//!
//! ```text
//! ┌──────────┐     ClientMessage     ┌─────────────────┐
//! │  nasctl  │──────────────────────►│  TrueNAS Scale  │
//! │          │◄──────────────────────│                 │
//! └──────────┘     ServerMessage     └─────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod messages;
pub mod types;

pub use error::ProtoError;
pub use messages::{methods, ClientMessage, RpcError, ServerMessage, PROTOCOL_VERSION};
pub use types::{AppInstance, Job, JobProgress, JobState};

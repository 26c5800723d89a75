//! Domain types carried inside method results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtoError;

/// Observable state of a server-side job.
///
/// The server owns the job lifecycle; the client only polls it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    /// Queued, not yet running.
    Waiting,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failed,
    /// Cancelled server-side before completion.
    Aborted,
    /// Any state this client does not model; treated as transient.
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Whether this state ends polling.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Aborted)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
            Self::Aborted => write!(f, "ABORTED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Progress snapshot reported while a job is running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobProgress {
    /// Completion percentage, 0-100.
    #[serde(default)]
    pub percent: Option<f64>,
    /// What the job is currently doing.
    #[serde(default)]
    pub description: Option<String>,
}

/// A server-side asynchronous job, as returned by `core.get_jobs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Job id.
    pub id: i64,
    /// Current state.
    pub state: JobState,
    /// Progress, if the server reports any.
    #[serde(default)]
    pub progress: Option<JobProgress>,
    /// Error detail, set when the job failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl Job {
    /// Parse the jobs out of a `core.get_jobs` result payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a job list.
    pub fn list_from_result(result: &Value) -> Result<Vec<Self>, ProtoError> {
        serde_json::from_value(result.clone())
            .map_err(|e| ProtoError::UnexpectedPayload(format!("core.get_jobs result: {e}")))
    }
}

/// An application descriptor, as returned by `app.get_instance`.
///
/// Only the fields nasctl reads are modeled; the server sends many more and
/// they are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppInstance {
    /// Application name.
    pub name: String,
    /// Application state, e.g. `RUNNING` or `STOPPED`. Server-defined and
    /// treated as opaque; not validated against a closed set.
    pub state: String,
}

impl AppInstance {
    /// Parse an `app.get_instance` result payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not an app descriptor.
    pub fn from_result(result: &Value) -> Result<Self, ProtoError> {
        serde_json::from_value(result.clone())
            .map_err(|e| ProtoError::UnexpectedPayload(format!("app.get_instance result: {e}")))
    }
}

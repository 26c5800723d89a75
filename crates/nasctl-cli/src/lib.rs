//! # nasctl-cli
//!
//! Command-line interface for controlling TrueNAS Scale applications.
//!
//! Provides four commands against a named app:
//! - `status` — query the current state
//! - `stop` / `start` — mutate and wait for the server-side job
//! - `restart` — stop, start, report the final state
//!
//! The target appliance and credential come from `TRUENAS_URL` and
//! `TRUENAS_API_KEY` (or the matching flags). Connection handling lives in
//! [`nasctl_client`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use commands::AppCommand;
pub use error::CliError;
pub use output::OutputFormat;

//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Result of a status query.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Application name.
    pub app: String,
    /// Observed state, `UNKNOWN` when the server has no answer.
    pub status: String,
}

impl TableDisplay for StatusReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "App:     {}", self.app)?;
        writeln!(writer, "Status:  {}", self.status)?;
        Ok(())
    }
}

/// Result of a stop/start/restart operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    /// Application name.
    pub app: String,
    /// Operation that ran.
    pub action: String,
    /// Whether the operation completed.
    pub success: bool,
    /// Status observed after the operation, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TableDisplay for OperationReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "App:     {}", self.app)?;
        writeln!(writer, "Action:  {}", self.action)?;
        writeln!(writer, "Result:  {}", if self.success { "ok" } else { "failed" })?;
        if let Some(status) = &self.status {
            writeln!(writer, "Status:  {status}")?;
        }
        Ok(())
    }
}

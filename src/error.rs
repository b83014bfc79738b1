//! Error types for tool set reconciliation.
//!
//! Per-tool operation failures are captured in [`crate::types::OperationOutcome`]
//! records and never abort a pass; the variants here cover the conditions that
//! do propagate (unreadable attachment state, failed search, config problems)
//! plus the per-operation causes that get rendered into outcome records.

use thiserror::Error;

pub type ToolSyncResult<T> = Result<T, ToolSyncError>;

#[derive(Debug, Error)]
pub enum ToolSyncError {
    /// A tool could not be registered with the agent runtime. Isolated per
    /// tool; the rest of the batch continues.
    #[error("Registration failed for '{tool}': {cause}")]
    RegistrationFailed { tool: String, cause: String },

    /// The agent's current attachment state could not be read. Fatal to a
    /// reconciliation pass: planning on partial state risks bad detachments.
    #[error("Attachment state unavailable: {0}")]
    StateUnavailable(String),

    /// A single attach/detach attempt exceeded its network timeout.
    #[error("Operation timed out for tool '{tool_id}'")]
    OperationTimeout { tool_id: String },

    /// A single attach/detach attempt was rejected by the runtime.
    #[error("Operation failed for tool '{tool_id}' (status {status:?}): {message}")]
    OperationFailed {
        tool_id: String,
        status: Option<u16>,
        message: String,
    },

    /// The runtime returned a success status with a body we could not decode.
    /// Non-fatal: the status code governs, the body is kept for diagnostics.
    #[error("Malformed response from runtime: {context}")]
    MalformedResponse { context: String },

    /// The candidate source could not serve the query.
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// A search index write failed during a sync pass.
    #[error("Index write failed for '{tool}': {cause}")]
    IndexWrite { tool: String, cause: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ToolSyncError {
    /// Whether a per-tool operation error is worth another attempt.
    /// Timeouts and runtime rejections are retryable up to the budget;
    /// everything else is terminal for the attempt loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolSyncError::OperationTimeout { .. }
                | ToolSyncError::OperationFailed { .. }
                | ToolSyncError::Http(_)
        )
    }
}

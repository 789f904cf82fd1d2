//! Error domain for the aggregation engine.
//!
//! Every public operation returns `Result<_, FetchError>`; the MCP
//! façade turns any `Err` into an `{"error": ...}` payload, so no
//! internal failure escapes a tool unhandled.

use thiserror::Error;

/// Failures from the upstream platform and the aggregation engine.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Token exchange failed; the operation stops before touching the
    /// compute API.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport failure, timeout, or non-success status. Recoverable
    /// per workspace during a fan-out, fatal for single-VM operations.
    #[error("{0}")]
    Remote(String),

    /// The response decoded as JSON but did not match the expected
    /// shape. Handled exactly like [`FetchError::Remote`].
    #[error("unexpected response shape: {0}")]
    Malformed(String),

    /// No routing entry and no static scope covers the requested VM.
    #[error("VM not found.")]
    VmNotFound,

    /// Account-wide operation found an empty workspace directory.
    #[error("No workspaces found")]
    NoWorkspaces,

    /// The operation only works against a statically configured
    /// workspace.
    #[error("Configure a workspace CRN to {0}.")]
    NotConfigured(String),
}

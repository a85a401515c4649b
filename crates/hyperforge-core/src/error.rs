//! Error types for hyperforge
//!
//! Only unrecoverable defects live here. Recoverable conditions (a failed
//! subsolve, a rootsearch that did not converge) are carried as statuses in
//! the solver crate and never abort a run.

use thiserror::Error;

/// Fatal error type for hyperforge operations.
///
/// Any of these indicates a configuration or programming defect and is
/// propagated to the top-level solve loop, which aborts with the diagnostic.
#[derive(Debug, Error)]
pub enum HyperforgeError {
    /// A pipeline jump referenced a task identifier that was never registered.
    #[error("task `{0}` is not registered in the pipeline")]
    TaskNotFound(String),

    /// Error in the problem definition
    #[error("problem definition error: {0}")]
    Problem(String),

    /// Error in solver configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A subsolver backend failed while setting up its model
    #[error("backend error: {0}")]
    Backend(String),

    /// A capability was requested that no available component supports
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for hyperforge operations
pub type Result<T> = std::result::Result<T, HyperforgeError>;

//! Environment error types.

use thiserror::Error;

use crate::types::AccessVector;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("contract {filename} not found on {hostname}")]
    ContractNotFound { filename: String, hostname: String },

    #[error("access vector {vector} failed on {hostname}")]
    VectorFailed {
        vector: AccessVector,
        hostname: String,
    },

    #[error("elevation denied on {0}: not enough open access vectors")]
    ElevationDenied(String),

    #[error("environment I/O error: {0}")]
    Io(String),
}

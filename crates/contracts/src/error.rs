//! Contract pipeline error types.

use thiserror::Error;

/// Errors in port-queue access. These are the only fatal errors in the
/// pipeline: a consumer hitting one terminates its loop.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("port {0} is not open")]
    Closed(u16),

    #[error("port registry lock poisoned")]
    Poisoned,
}

/// Outcome classes of a solver call. `Transport` is transient (the job is
/// rediscovered next scan cycle); the other two are permanent and produce an
/// [`crate::ErrorRecord`].
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("solver transport failure: {0}")]
    Transport(String),

    #[error("solver returned status {status}")]
    Status { status: u16, body: String },

    #[error("unparseable solver response: {error}")]
    Parse { error: String, raw: String },
}

impl SolveError {
    /// Whether the failure is transient (retried implicitly, no artifact).
    pub fn is_transient(&self) -> bool {
        matches!(self, SolveError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_transient() {
        assert!(SolveError::Transport("timeout".into()).is_transient());
        assert!(!SolveError::Status {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!SolveError::Parse {
            error: "eof".into(),
            raw: String::new()
        }
        .is_transient());
    }
}

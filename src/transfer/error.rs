use thiserror::Error;

/// Terminal outcomes a transfer can report to its caller.
///
/// Failures inside a single protocol step are retried locally and never
/// surface individually; only the variants below escalate.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Rejected before any upload attempt, never retried.
    #[error("{0}")]
    Precondition(String),

    /// Cooperative cancellation, distinct from failure.
    #[error("transfer cancelled")]
    Cancelled,

    /// A network step kept failing until the attempt bound was reached.
    #[error("{op} failed after {attempts} attempts: {reason}")]
    RetryExhausted {
        op: &'static str,
        attempts: u32,
        reason: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for TransferError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err)
    }
}

impl TransferError {
    /// `true` when the transfer ended by user request rather than by failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

//! Error types for clothoid construction and the iterative solvers.

use thiserror::Error;

/// Result type alias for clothoid operations.
pub type ClothoidResult<T> = Result<T, ClothoidError>;

/// Errors reported by curve construction, mutation and the solvers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClothoidError {
    /// Malformed input: negative length, zero scale factor, empty trim range,
    /// coincident points where a direction is needed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An iterative solver ran out of iterations without meeting its tolerance.
    #[error("solver did not converge: {0}")]
    ConvergenceFailure(String),

    /// Solver results were read before a successful build.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl ClothoidError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Self::InvalidArgument(details.into())
    }

    /// Create a convergence failure error.
    #[must_use]
    pub fn convergence_failure(details: impl Into<String>) -> Self {
        Self::ConvergenceFailure(details.into())
    }

    /// Create an invalid state error.
    #[must_use]
    pub fn invalid_state(details: impl Into<String>) -> Self {
        Self::InvalidState(details.into())
    }
}

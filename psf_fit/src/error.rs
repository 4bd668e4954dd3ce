//! Error types for profile fitting.

use thiserror::Error;

use crate::lm_optimizer::LmStatus;

/// Errors that abort a profile fit. No partial result is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("'{0}' fitting method not implemented (expected 'g' or 'm')")]
    UnsupportedMethod(char),

    #[error("least-squares solve failed (status {}): {}", .status.code(), .status.message())]
    SolverFailure { status: LmStatus },

    #[error("too few pixels to fit: {n_ok} included for {n_params} free parameters")]
    DegenerateFit { n_ok: usize, n_params: usize },

    #[error("covariance matrix is singular; parameter errors cannot be estimated")]
    SingularCovariance,

    #[error("{what} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    #[error("pixel rejection still active after {passes} passes")]
    RejectionLimit { passes: usize },
}

pub type Result<T> = std::result::Result<T, FitError>;

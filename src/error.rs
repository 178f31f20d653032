//! Error types shared by every spline family.

use thiserror::Error;

/// Error raised by spline construction, evaluation and algebra
#[derive(Error, Debug)]
pub enum SplineError {
    /// Buffers handed to a constructor do not describe a valid spline
    #[error("Invalid construction: {0}")]
    Construction(String),

    /// Operands disagree on family, parametric dimension or physical dimension
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The family does not offer the requested operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No kernel is instantiated for the requested dimensions
    #[error("Unsupported dimension: parametric dimension {para_dim}, physical dimension {dim}")]
    UnsupportedDimension { para_dim: usize, dim: usize },

    /// A rational quantity has a vanishing or non-finite denominator
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A query argument is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Nearest point search failed
    #[error("Proximity error: {0}")]
    Proximity(#[from] anyhow::Error),
}

/// Result type alias using [`SplineError`]
pub type Result<T> = std::result::Result<T, SplineError>;

impl SplineError {
    pub fn size_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::Construction(format!(
            "{context}: expected {expected} entries, got {actual}"
        ))
    }

    pub fn unsupported(operation: &str, family: &str) -> Self {
        Self::UnsupportedOperation(format!("{operation} is not available for {family}"))
    }

    pub fn invalid_axis(axis: usize, para_dim: usize) -> Self {
        Self::InvalidParameter(format!(
            "parametric axis {axis} is out of range for parametric dimension {para_dim}"
        ))
    }

    pub fn non_finite(context: &str) -> Self {
        Self::Construction(format!("{context} contains NaN or infinite values"))
    }
}

/// Check that `axis` names one of the `para_dim` parametric axes
pub fn check_axis(axis: usize, para_dim: usize) -> Result<()> {
    if axis < para_dim {
        Ok(())
    } else {
        Err(SplineError::invalid_axis(axis, para_dim))
    }
}

//! Error types for H-infinity synthesis.
//!
//! Only fatal conditions are errors. An infeasible γ, or a plant that fails
//! one of the structural assumption checks, is reported through return values.

use ndarray::ShapeError;
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// Errors raised while validating a plant or synthesizing a controller.
#[derive(Error, Debug)]
pub enum HinfError {
    /// Matrix block sizes are inconsistent with the plant dimensions.
    #[error("dimension mismatch in {block}: expected {expected:?}, got {found:?}")]
    DimensionMismatch {
        block: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A feedthrough block that must be scaled lacks full rank.
    #[error("{block} is rank deficient: rank {rank}, required {required}")]
    RankDeficiency {
        block: &'static str,
        rank: usize,
        required: usize,
    },

    /// A factorization or inversion failed its conditioning check.
    #[error("numerical conditioning failure: {0}")]
    NumericalConditioning(String),

    /// The plant lies outside what the synthesis formulas support.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// Search options are out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// An underlying LAPACK call failed.
    #[error("LAPACK failure: {0}")]
    Linalg(#[from] LinalgError),

    /// A matrix could not be reshaped from raw LAPACK output.
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
}

impl HinfError {
    pub(crate) fn conditioning(msg: impl Into<String>) -> Self {
        HinfError::NumericalConditioning(msg.into())
    }

    /// True for errors the γ-search treats as an infeasible γ.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HinfError::NumericalConditioning(_) | HinfError::Linalg(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HinfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_dimension_mismatch() {
        let err = HinfError::DimensionMismatch {
            block: "B1",
            expected: (3, 1),
            found: (2, 1),
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch in B1: expected (3, 1), got (2, 1)"
        );
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(HinfError::conditioning("U11 singular").is_recoverable());
        assert!(!HinfError::Unsupported("D22".into()).is_recoverable());
        assert!(!HinfError::RankDeficiency {
            block: "D12",
            rank: 0,
            required: 1
        }
        .is_recoverable());
    }
}

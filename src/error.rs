use thiserror::Error;

/// Estimator error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("{what}: expected {}x{}, found {}x{}", .expected.0, .expected.1, .found.0, .found.1)]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid {what} dimension: {value}")]
    InvalidDimension { what: &'static str, value: usize },

    #[error("Invalid time step: {0} (must be finite and > 0)")]
    InvalidTimeStep(f64),

    #[error("Invalid {what}: {value}")]
    InvalidNoise { what: &'static str, value: f64 },

    #[error("Measurement contains non-finite values")]
    NonFiniteMeasurement,

    #[error("Innovation covariance is singular")]
    SingularInnovationCovariance,

    /// State or covariance overflowed to NaN/inf; the estimator keeps its previous values.
    #[error("State or covariance contains non-finite values")]
    NonFiniteState,
}

/// Result type for estimator operations
pub type FilterResult<T> = Result<T, FilterError>;

impl FilterError {
    /// Shape check used by every setter and by `update`.
    pub(crate) fn check_shape(
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> FilterResult<()> {
        if expected == found {
            Ok(())
        } else {
            Err(FilterError::DimensionMismatch {
                what,
                expected,
                found,
            })
        }
    }
}

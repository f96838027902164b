//! Linear Kalman filtering for noisy, intermittent position measurements.
//!
//! Two independent estimators share the same predict/update recursion:
//! [`KalmanFilter`] for caller-defined models of any size, and
//! [`NavigationFilter`] for 2D constant-acceleration tracking from position fixes.

pub mod config;
pub mod error;
pub mod filters;
pub mod types;

pub use config::NavigationConfig;
pub use error::{FilterError, FilterResult};
pub use filters::kalman::KalmanFilter;
pub use filters::navigation::{NavigationFilter, NavigationState};
pub use types::PositionFix;

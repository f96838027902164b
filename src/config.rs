use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FilterError, FilterResult};

/// Tuning for the 6-state navigation filter
///
/// Noise values are scale factors on identity blocks:
/// Q = diag(position, position, velocity, velocity, acceleration, acceleration),
/// R = measurement_noise · I₂, P₀ = initial_covariance · I₆.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Integration time step [seconds]
    pub dt: f64,

    /// Initial covariance scale (large = low confidence)
    pub initial_covariance: f64,

    /// Process noise, position block
    pub position_noise: f64,

    /// Process noise, velocity block
    pub velocity_noise: f64,

    /// Process noise, acceleration block (least constrained)
    pub acceleration_noise: f64,

    /// Sensor (GPS) noise on x and y
    pub measurement_noise: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            initial_covariance: 100.0,
            position_noise: 0.1,
            velocity_noise: 0.2,
            acceleration_noise: 0.3,
            measurement_noise: 5.0,
        }
    }
}

impl NavigationConfig {
    pub fn with_dt(dt: f64) -> Self {
        Self {
            dt,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> FilterResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(FilterError::InvalidTimeStep(self.dt));
        }
        if !self.initial_covariance.is_finite() || self.initial_covariance <= 0.0 {
            return Err(FilterError::InvalidNoise {
                what: "initial covariance",
                value: self.initial_covariance,
            });
        }
        let noise = [
            ("position noise", self.position_noise),
            ("velocity noise", self.velocity_noise),
            ("acceleration noise", self.acceleration_noise),
        ];
        for (what, value) in noise {
            if !value.is_finite() || value < 0.0 {
                return Err(FilterError::InvalidNoise { what, value });
            }
        }
        // R must stay positive definite or S can go singular
        if !self.measurement_noise.is_finite() || self.measurement_noise <= 0.0 {
            return Err(FilterError::InvalidNoise {
                what: "measurement noise",
                value: self.measurement_noise,
            });
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse navigation config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

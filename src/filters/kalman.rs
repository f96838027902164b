//! Generic linear Kalman filter
//!
//! Dimension-agnostic estimator: the caller picks the state size `n` and the
//! measurement size `m`, then overrides whichever system matrices it needs.
//!
//! Defaults after construction:
//!   x = 0 (n×1), P = I_n, F = I_n, Q = I_n, R = I_m
//!   H = first m rows of I_n
//!
//! The default H only observes the leading `m` state components. It is a
//! convenience for models laid out that way; anything else must call `set_h`
//! before the first update.
//!
//! S = H·P·Hᵀ + R is solved with a Cholesky factorization rather than an
//! explicit inverse, so larger measurement vectors stay well conditioned.
use nalgebra::{DMatrix, DVector};

use crate::error::{FilterError, FilterResult};
use crate::types::linalg::symmetrize_dyn;

#[derive(Clone, Debug)]
pub struct KalmanFilter {
    /// State estimate x [n]
    state: DVector<f64>,

    /// Estimate covariance P [n×n]
    covariance: DMatrix<f64>,

    /// State transition F [n×n]
    transition: DMatrix<f64>,

    /// Measurement matrix H [m×n]
    measurement_matrix: DMatrix<f64>,

    /// Process noise Q [n×n]
    process_noise: DMatrix<f64>,

    /// Measurement noise R [m×m]
    measurement_noise: DMatrix<f64>,

    predict_count: u64,
    update_count: u64,
}

impl KalmanFilter {
    /// Create a filter with `P = I_n`.
    pub fn new(state_dim: usize, measure_dim: usize) -> FilterResult<Self> {
        Self::with_initial_covariance(state_dim, measure_dim, 1.0)
    }

    /// Create a filter with `P = scale·I_n`; a large scale means low initial confidence.
    pub fn with_initial_covariance(
        state_dim: usize,
        measure_dim: usize,
        scale: f64,
    ) -> FilterResult<Self> {
        if state_dim < 1 {
            return Err(FilterError::InvalidDimension {
                what: "state",
                value: state_dim,
            });
        }
        if measure_dim < 1 || measure_dim > state_dim {
            return Err(FilterError::InvalidDimension {
                what: "measurement",
                value: measure_dim,
            });
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(FilterError::InvalidNoise {
                what: "initial covariance scale",
                value: scale,
            });
        }

        log::debug!(
            "KalmanFilter: n={} m={} initial covariance {}·I",
            state_dim,
            measure_dim,
            scale
        );

        Ok(Self {
            state: DVector::zeros(state_dim),
            covariance: DMatrix::identity(state_dim, state_dim) * scale,
            transition: DMatrix::identity(state_dim, state_dim),
            measurement_matrix: DMatrix::identity(measure_dim, state_dim),
            process_noise: DMatrix::identity(state_dim, state_dim),
            measurement_noise: DMatrix::identity(measure_dim, measure_dim),
            predict_count: 0,
            update_count: 0,
        })
    }

    pub fn state_dim(&self) -> usize {
        self.state.len()
    }

    pub fn measure_dim(&self) -> usize {
        self.measurement_noise.nrows()
    }

    fn square(&self) -> (usize, usize) {
        (self.state_dim(), self.state_dim())
    }

    pub fn set_f(&mut self, f: DMatrix<f64>) -> FilterResult<()> {
        FilterError::check_shape("F", self.square(), f.shape())?;
        self.transition = f;
        Ok(())
    }

    pub fn set_h(&mut self, h: DMatrix<f64>) -> FilterResult<()> {
        FilterError::check_shape("H", (self.measure_dim(), self.state_dim()), h.shape())?;
        self.measurement_matrix = h;
        Ok(())
    }

    pub fn set_q(&mut self, q: DMatrix<f64>) -> FilterResult<()> {
        FilterError::check_shape("Q", self.square(), q.shape())?;
        self.process_noise = q;
        Ok(())
    }

    pub fn set_r(&mut self, r: DMatrix<f64>) -> FilterResult<()> {
        let m = self.measure_dim();
        FilterError::check_shape("R", (m, m), r.shape())?;
        self.measurement_noise = r;
        Ok(())
    }

    pub fn set_state(&mut self, state: DVector<f64>) -> FilterResult<()> {
        FilterError::check_shape("state", (self.state_dim(), 1), state.shape())?;
        if state.iter().any(|v| !v.is_finite()) {
            return Err(FilterError::NonFiniteState);
        }
        self.state = state;
        Ok(())
    }

    pub fn set_p(&mut self, p: DMatrix<f64>) -> FilterResult<()> {
        FilterError::check_shape("P", self.square(), p.shape())?;
        self.covariance = p;
        Ok(())
    }

    /// Predict step: `x ← F·x`, `P ← F·P·Fᵀ + Q`
    ///
    /// Safe to call repeatedly without an update (open-loop dead reckoning).
    pub fn predict(&mut self) {
        let f = &self.transition;
        self.state = f * &self.state;
        let mut p = f * &self.covariance * f.transpose() + &self.process_noise;
        symmetrize_dyn(&mut p);
        self.covariance = p;
        self.predict_count += 1;

        log::trace!(
            "KalmanFilter predict #{}: trace(P)={:.4}",
            self.predict_count,
            self.covariance.trace()
        );
    }

    /// Innovation `y = z − H·x` and its covariance `S = H·P·Hᵀ + R`.
    ///
    /// Read-only; performs the same validation as `update`.
    pub fn innovation(
        &self,
        measurement: &DVector<f64>,
    ) -> FilterResult<(DVector<f64>, DMatrix<f64>)> {
        FilterError::check_shape(
            "measurement",
            (self.measure_dim(), 1),
            measurement.shape(),
        )?;
        if measurement.iter().any(|v| !v.is_finite()) {
            return Err(FilterError::NonFiniteMeasurement);
        }

        let h = &self.measurement_matrix;
        let y = measurement - h * &self.state;
        let s = h * &self.covariance * h.transpose() + &self.measurement_noise;
        Ok((y, s))
    }

    /// Update step with one measurement `z` [m]
    ///
    ///   K = P·Hᵀ·S⁻¹
    ///   x ← x + K·y
    ///   P ← (I − K·H)·P
    ///
    /// Either commits both `x` and `P` or returns an error with both untouched.
    pub fn update(&mut self, measurement: &DVector<f64>) -> FilterResult<()> {
        let (residual, mut s) = match self.innovation(measurement) {
            Ok(parts) => parts,
            Err(e) => {
                log::warn!("KalmanFilter update rejected: {}", e);
                return Err(e);
            }
        };

        symmetrize_dyn(&mut s);
        let chol = match s.cholesky() {
            Some(chol) => chol,
            None => {
                log::warn!("KalmanFilter update rejected: S is not positive definite");
                return Err(FilterError::SingularInnovationCovariance);
            }
        };

        let h = &self.measurement_matrix;
        let p = &self.covariance;

        // Kᵀ = S⁻¹·(P·Hᵀ)ᵀ, valid because S and P are symmetric
        let pht = p * h.transpose();
        let gain = chol.solve(&pht.transpose()).transpose();

        let n = self.state_dim();
        let state = &self.state + &gain * &residual;
        let mut covariance = (DMatrix::identity(n, n) - &gain * h) * p;
        symmetrize_dyn(&mut covariance);

        if state.iter().any(|v| !v.is_finite()) || covariance.iter().any(|v| !v.is_finite()) {
            log::warn!("KalmanFilter update rejected: state or covariance overflowed");
            return Err(FilterError::NonFiniteState);
        }

        self.state = state;
        self.covariance = covariance;
        self.update_count += 1;

        log::trace!(
            "KalmanFilter update #{}: |y|={:.4} trace(P)={:.4}",
            self.update_count,
            residual.norm(),
            self.covariance.trace()
        );
        Ok(())
    }

    /// Copy of the current state estimate
    pub fn get_state(&self) -> DVector<f64> {
        self.state.clone()
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    pub fn measurement_matrix(&self) -> &DMatrix<f64> {
        &self.measurement_matrix
    }

    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.process_noise
    }

    pub fn measurement_noise(&self) -> &DMatrix<f64> {
        &self.measurement_noise
    }

    pub fn predict_count(&self) -> u64 {
        self.predict_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}

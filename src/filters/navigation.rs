//! 6-State Navigation Kalman Filter
//!
//! State Vector (6D):
//! [0-1]: Position (x, y) in local frame (meters)
//! [2-3]: Velocity (vx, vy) (m/s)
//! [4-5]: Acceleration (ax, ay) (m/s²)
//!
//! Measurement (2D): position fix (x, y), e.g. GPS projected to local meters.
//!
//! Constant-acceleration model over one step `dt`:
//!   p ← p + v·dt + ½·a·dt²
//!   v ← v + a·dt
//!   a ← a
use serde::{Deserialize, Serialize};

use crate::config::NavigationConfig;
use crate::error::{FilterError, FilterResult};
use crate::types::linalg::{
    symmetrize, NavGainMat, NavMeasureMat, NavMeasureNoise, NavMeasureVec, NavStateMat,
    NavStateVec, IDX_AX, IDX_AY, IDX_VX, IDX_VY, IDX_X, IDX_Y, NAV_STATE_DIM,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavigationState {
    /// Position in local frame [meters]
    pub position: (f64, f64),

    /// Velocity [m/s]
    pub velocity: (f64, f64),

    /// Acceleration [m/s²]
    pub acceleration: (f64, f64),

    pub speed: f64,

    /// atan2(vy, vx) [radians]
    pub heading: f64,
    pub heading_deg: f64,

    /// 1-sigma horizontal position uncertainty [meters]
    pub uncertainty_m: f64,
    pub covariance_trace: f64,

    pub predict_count: u64,
    pub update_count: u64,
}

#[derive(Clone, Debug)]
pub struct NavigationFilter {
    config: NavigationConfig,

    /// State vector [6D]
    state: NavStateVec,

    /// Covariance matrix [6x6]
    covariance: NavStateMat,

    /// Kinematic transition, derived from dt [6x6]
    transition: NavStateMat,

    /// Position selector [2x6]
    measurement_matrix: NavMeasureMat,

    /// Process noise [6x6]
    process_noise: NavStateMat,

    /// GPS measurement noise [2x2]
    measurement_noise: NavMeasureNoise,

    predict_count: u64,
    update_count: u64,
}

impl Default for NavigationFilter {
    fn default() -> Self {
        Self::build(NavigationConfig::default())
    }
}

impl NavigationFilter {
    /// Create a filter with the default tuning and the given time step.
    pub fn new(dt: f64) -> FilterResult<Self> {
        Self::with_config(NavigationConfig::with_dt(dt))
    }

    pub fn with_config(config: NavigationConfig) -> FilterResult<Self> {
        config.validate()?;
        log::debug!("NavigationFilter: {:?}", config);
        Ok(Self::build(config))
    }

    fn build(config: NavigationConfig) -> Self {
        Self {
            state: NavStateVec::zeros(),
            covariance: Self::initial_covariance(&config),
            transition: Self::build_transition(config.dt),
            measurement_matrix: Self::position_measurement_matrix(),
            process_noise: Self::build_process_noise(&config),
            measurement_noise: NavMeasureNoise::identity() * config.measurement_noise,
            config,
            predict_count: 0,
            update_count: 0,
        }
    }

    fn initial_covariance(config: &NavigationConfig) -> NavStateMat {
        NavStateMat::identity() * config.initial_covariance
    }

    fn build_transition(dt: f64) -> NavStateMat {
        let half_dt2 = 0.5 * dt * dt;
        let mut f = NavStateMat::identity();

        f[(IDX_X, IDX_VX)] = dt;
        f[(IDX_X, IDX_AX)] = half_dt2;

        f[(IDX_Y, IDX_VY)] = dt;
        f[(IDX_Y, IDX_AY)] = half_dt2;

        f[(IDX_VX, IDX_AX)] = dt;
        f[(IDX_VY, IDX_AY)] = dt;

        f
    }

    fn position_measurement_matrix() -> NavMeasureMat {
        let mut h = NavMeasureMat::zeros();
        h[(0, IDX_X)] = 1.0;
        h[(1, IDX_Y)] = 1.0;
        h
    }

    fn build_process_noise(config: &NavigationConfig) -> NavStateMat {
        let diag = NavStateVec::from_column_slice(&[
            config.position_noise,
            config.position_noise,
            config.velocity_noise,
            config.velocity_noise,
            config.acceleration_noise,
            config.acceleration_noise,
        ]);
        NavStateMat::from_diagonal(&diag)
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn dt(&self) -> f64 {
        self.config.dt
    }

    /// Predict step: integrate kinematics one `dt` forward
    pub fn predict(&mut self) {
        self.state = self.transition * self.state;
        self.covariance =
            self.transition * self.covariance * self.transition.transpose() + self.process_noise;
        symmetrize(&mut self.covariance);
        self.predict_count += 1;

        log::trace!(
            "NavigationFilter predict #{}: pos=({:.3}, {:.3}) trace(P)={:.3}",
            self.predict_count,
            self.state[IDX_X],
            self.state[IDX_Y],
            self.covariance.trace()
        );
    }

    /// Update with one position fix [meters]
    ///
    /// `I₆ − K·H` is rebuilt on every call. S is 2x2, so a direct inverse is fine.
    pub fn update(&mut self, measurement: &NavMeasureVec) -> FilterResult<()> {
        if measurement.iter().any(|v| !v.is_finite()) {
            log::warn!("NavigationFilter: dropping non-finite fix {:?}", measurement);
            return Err(FilterError::NonFiniteMeasurement);
        }

        let h = self.measurement_matrix;
        let residual = measurement - h * self.state;
        let s = h * self.covariance * h.transpose() + self.measurement_noise;
        let s_inv = s.try_inverse().ok_or_else(|| {
            log::warn!("NavigationFilter: innovation covariance is singular");
            FilterError::SingularInnovationCovariance
        })?;

        let gain: NavGainMat = self.covariance * h.transpose() * s_inv;
        let state = self.state + gain * residual;

        let i_kh = NavStateMat::identity() - gain * h;
        let mut covariance = i_kh * self.covariance;
        symmetrize(&mut covariance);

        if state.iter().any(|v| !v.is_finite()) || covariance.iter().any(|v| !v.is_finite()) {
            log::warn!("NavigationFilter: update overflowed, keeping previous estimate");
            return Err(FilterError::NonFiniteState);
        }

        self.state = state;
        self.covariance = covariance;
        self.update_count += 1;

        log::trace!(
            "NavigationFilter update #{}: residual=({:.3}, {:.3})",
            self.update_count,
            residual[0],
            residual[1]
        );
        Ok(())
    }

    pub fn update_position(&mut self, x: f64, y: f64) -> FilterResult<()> {
        self.update(&NavMeasureVec::new(x, y))
    }

    /// Restore the construction-time state and covariance, keeping the tuning.
    pub fn reset(&mut self) {
        self.state = NavStateVec::zeros();
        self.covariance = Self::initial_covariance(&self.config);
        self.predict_count = 0;
        self.update_count = 0;
    }

    pub fn set_state(&mut self, state: NavStateVec) -> FilterResult<()> {
        if state.iter().any(|v| !v.is_finite()) {
            return Err(FilterError::NonFiniteState);
        }
        self.state = state;
        Ok(())
    }

    pub fn state(&self) -> NavStateVec {
        self.state
    }

    pub fn covariance(&self) -> &NavStateMat {
        &self.covariance
    }

    pub fn transition(&self) -> &NavStateMat {
        &self.transition
    }

    pub fn measurement_matrix(&self) -> &NavMeasureMat {
        &self.measurement_matrix
    }

    pub fn process_noise(&self) -> &NavStateMat {
        &self.process_noise
    }

    pub fn measurement_noise(&self) -> &NavMeasureNoise {
        &self.measurement_noise
    }

    pub fn get_position(&self) -> NavMeasureVec {
        NavMeasureVec::new(self.state[IDX_X], self.state[IDX_Y])
    }

    pub fn get_velocity(&self) -> NavMeasureVec {
        NavMeasureVec::new(self.state[IDX_VX], self.state[IDX_VY])
    }

    pub fn get_acceleration(&self) -> NavMeasureVec {
        NavMeasureVec::new(self.state[IDX_AX], self.state[IDX_AY])
    }

    pub fn get_speed(&self) -> f64 {
        self.get_velocity().norm()
    }

    /// Heading of the velocity vector, `atan2(vy, vx)` in radians.
    ///
    /// Meaningless at rest: zero velocity reports 0.0 (atan2(0, 0)).
    pub fn get_heading(&self) -> f64 {
        self.state[IDX_VY].atan2(self.state[IDX_VX])
    }

    pub fn heading_deg(&self) -> f64 {
        self.get_heading().to_degrees()
    }

    pub fn position_uncertainty(&self) -> f64 {
        ((self.covariance[(IDX_X, IDX_X)] + self.covariance[(IDX_Y, IDX_Y)]) / 2.0).sqrt()
    }

    pub fn predict_count(&self) -> u64 {
        self.predict_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn snapshot(&self) -> NavigationState {
        let position = self.get_position();
        let velocity = self.get_velocity();
        let acceleration = self.get_acceleration();

        NavigationState {
            position: (position[0], position[1]),
            velocity: (velocity[0], velocity[1]),
            acceleration: (acceleration[0], acceleration[1]),
            speed: self.get_speed(),
            heading: self.get_heading(),
            heading_deg: self.heading_deg(),
            uncertainty_m: self.position_uncertainty(),
            covariance_trace: (0..NAV_STATE_DIM).map(|i| self.covariance[(i, i)]).sum(),
            predict_count: self.predict_count,
            update_count: self.update_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn min_eigenvalue(p: &NavStateMat) -> f64 {
        p.symmetric_eigen().eigenvalues.min()
    }

    fn run(filter: &mut NavigationFilter, fixes: &[(f64, f64)]) {
        for &(x, y) in fixes {
            filter.predict();
            filter.update_position(x, y).unwrap();
        }
    }

    #[test]
    fn test_construction() {
        let filter = NavigationFilter::new(0.1).unwrap();
        assert_eq!(filter.state(), NavStateVec::zeros());
        assert_eq!(filter.covariance(), &(NavStateMat::identity() * 100.0));
        assert_eq!(filter.covariance(), &filter.covariance().transpose());
        assert_eq!(filter.measurement_noise(), &(NavMeasureNoise::identity() * 5.0));

        let q = filter.process_noise();
        for (i, expected) in [0.1, 0.1, 0.2, 0.2, 0.3, 0.3].iter().enumerate() {
            assert_eq!(q[(i, i)], *expected);
        }
        assert_eq!(q[(IDX_X, IDX_VX)], 0.0);
    }

    #[test]
    fn test_default_uses_tenth_second_step() {
        let filter = NavigationFilter::default();
        assert_eq!(filter.dt(), 0.1);
        assert_eq!(filter.transition(), NavigationFilter::new(0.1).unwrap().transition());
    }

    #[test]
    fn test_transition_structure() {
        let dt = 0.5;
        let filter = NavigationFilter::new(dt).unwrap();
        let f = filter.transition();

        assert_eq!(f[(IDX_X, IDX_VX)], dt);
        assert_eq!(f[(IDX_X, IDX_AX)], 0.125);
        assert_eq!(f[(IDX_Y, IDX_VY)], dt);
        assert_eq!(f[(IDX_Y, IDX_AY)], 0.125);
        assert_eq!(f[(IDX_VX, IDX_AX)], dt);
        assert_eq!(f[(IDX_VY, IDX_AY)], dt);
        for i in 0..NAV_STATE_DIM {
            assert_eq!(f[(i, i)], 1.0);
        }
        // x and y axes never couple
        assert_eq!(f[(IDX_X, IDX_VY)], 0.0);
        assert_eq!(f[(IDX_Y, IDX_AX)], 0.0);
    }

    #[test]
    fn test_measurement_matrix_selects_position() {
        let filter = NavigationFilter::default();
        let h = filter.measurement_matrix();
        assert_eq!(h.sum(), 2.0);
        assert_eq!(h[(0, IDX_X)], 1.0);
        assert_eq!(h[(1, IDX_Y)], 1.0);
    }

    #[test]
    fn test_invalid_time_step() {
        assert_eq!(
            NavigationFilter::new(0.0).unwrap_err(),
            FilterError::InvalidTimeStep(0.0)
        );
        assert!(NavigationFilter::new(-1.0).is_err());
    }

    #[test]
    fn test_predict_integrates_kinematics() {
        let mut filter = NavigationFilter::new(0.5).unwrap();
        filter
            .set_state(NavStateVec::from_column_slice(&[1.0, 2.0, 4.0, -2.0, 2.0, 0.0]))
            .unwrap();
        filter.predict();

        // x: 1 + 4·0.5 + ½·2·0.25 = 3.25, vx: 4 + 2·0.5 = 5
        let expected_pos = NavMeasureVec::new(3.25, 1.0);
        let expected_vel = NavMeasureVec::new(5.0, -2.0);
        assert_abs_diff_eq!(filter.get_position(), expected_pos, epsilon = 1e-12);
        assert_abs_diff_eq!(filter.get_velocity(), expected_vel, epsilon = 1e-12);
        assert_eq!(filter.get_acceleration(), NavMeasureVec::new(2.0, 0.0));
    }

    #[test]
    fn test_gps_track_scenario() {
        let mut filter = NavigationFilter::new(0.1).unwrap();
        run(&mut filter, &[(0.0, 0.0), (1.1, 0.9), (2.3, 2.1), (3.2, 2.9)]);

        let pos = filter.get_position();
        assert_abs_diff_eq!(pos[0], 2.50522984, epsilon = 1e-6);
        assert_abs_diff_eq!(pos[1], 2.25908693, epsilon = 1e-6);
        assert!((pos - NavMeasureVec::new(3.2, 2.9)).norm() < 1.0);

        let vel = filter.get_velocity();
        assert_abs_diff_eq!(vel[0], 5.70729744, epsilon = 1e-6);
        assert_abs_diff_eq!(vel[1], 5.22916458, epsilon = 1e-6);

        let speed = filter.get_speed();
        assert!(speed.is_finite());
        assert!(speed > 5.0 && speed < 15.0);
        assert_abs_diff_eq!(filter.heading_deg(), 42.4966711, epsilon = 1e-4);
        assert_eq!(filter.update_count(), 4);
    }

    #[test]
    fn test_constant_velocity_track_converges() {
        let mut filter = NavigationFilter::new(0.1).unwrap();
        let fixes: Vec<(f64, f64)> = (0..60).map(|k| (k as f64, 0.5 * k as f64)).collect();
        run(&mut filter, &fixes);

        // 1 m and 0.5 m per 0.1 s step
        assert_abs_diff_eq!(filter.get_speed(), 125.0_f64.sqrt(), epsilon = 0.1);
        assert_abs_diff_eq!(filter.heading_deg(), 0.5_f64.atan().to_degrees(), epsilon = 0.5);
        assert_abs_diff_eq!(filter.get_position(), NavMeasureVec::new(59.0, 29.5), epsilon = 0.05);
    }

    #[test]
    fn test_heading_at_rest_is_zero() {
        let filter = NavigationFilter::default();
        assert_eq!(filter.get_speed(), 0.0);
        assert_eq!(filter.get_heading(), 0.0);
    }

    #[test]
    fn test_covariance_stays_symmetric_psd() {
        let mut filter = NavigationFilter::new(0.05).unwrap();
        for k in 0..300 {
            filter.predict();
            // Sparse fixes: dead reckoning in between
            if k % 4 == 0 {
                let t = k as f64 * 0.05;
                filter.update_position(10.0 * t.cos(), 10.0 * t.sin()).unwrap();
            }
            let p = filter.covariance();
            assert_eq!(p, &p.transpose());
            assert!(min_eigenvalue(p) >= -1e-9);
        }
    }

    #[test]
    fn test_update_shrinks_position_uncertainty() {
        let mut filter = NavigationFilter::default();
        let mut last = filter.position_uncertainty();
        for _ in 0..10 {
            filter.update_position(1.0, 1.0).unwrap();
            let now = filter.position_uncertainty();
            assert!(now <= last);
            last = now;
        }
        assert!(last < 1.0);
    }

    #[test]
    fn test_non_finite_fix_leaves_filter_unchanged() {
        let mut filter = NavigationFilter::default();
        run(&mut filter, &[(0.0, 0.0), (1.0, 1.0)]);
        let state = filter.state();
        let covariance = *filter.covariance();

        let err = filter.update_position(f64::NAN, 1.0).unwrap_err();
        assert_eq!(err, FilterError::NonFiniteMeasurement);
        assert_eq!(filter.state(), state);
        assert_eq!(filter.covariance(), &covariance);
        assert_eq!(filter.update_count(), 2);
    }

    #[test]
    fn test_overflowing_update_leaves_filter_unchanged() {
        let mut filter = NavigationFilter::default();
        let mut start = NavStateVec::zeros();
        start[IDX_X] = -1e308;
        filter.set_state(start).unwrap();
        let covariance = *filter.covariance();

        let err = filter.update_position(1e308, 0.0).unwrap_err();
        assert_eq!(err, FilterError::NonFiniteState);
        assert_eq!(filter.state(), start);
        assert_eq!(filter.covariance(), &covariance);
        assert_eq!(filter.update_count(), 0);
    }

    #[test]
    fn test_set_state_rejects_non_finite() {
        let mut filter = NavigationFilter::default();
        let mut bad = NavStateVec::zeros();
        bad[IDX_VY] = f64::NAN;
        assert_eq!(filter.set_state(bad).unwrap_err(), FilterError::NonFiniteState);
        assert_eq!(filter.state(), NavStateVec::zeros());
    }

    #[test]
    fn test_reset() {
        let mut filter = NavigationFilter::default();
        run(&mut filter, &[(5.0, 5.0), (6.0, 6.0)]);
        filter.reset();
        assert_eq!(filter.state(), NavStateVec::zeros());
        assert_eq!(filter.covariance(), &(NavStateMat::identity() * 100.0));
        assert_eq!(filter.predict_count(), 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut filter = NavigationFilter::default();
        run(&mut filter, &[(0.0, 0.0), (1.0, 0.0)]);
        let snapshot = filter.snapshot();

        assert_eq!(snapshot.update_count, 2);
        assert_eq!(snapshot.speed, filter.get_speed());
        assert_abs_diff_eq!(snapshot.covariance_trace, filter.covariance().trace(), epsilon = 1e-9);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: NavigationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.position, snapshot.position);
    }
}

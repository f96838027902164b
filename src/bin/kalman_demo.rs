//! Generic filter walkthrough
//!
//! Two-state constant-velocity model observed through position only:
//!   F = [[1, 1], [0, 1]], H = [1, 0]
//! One predict/update with the measurement 1.0.
use anyhow::Result;
use nalgebra::{DMatrix, DVector};

use nav_kalman_rs::KalmanFilter;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut kf = KalmanFilter::new(2, 1)?;
    kf.set_f(DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]))?;
    kf.set_h(DMatrix::from_row_slice(1, 2, &[1.0, 0.0]))?;
    kf.set_state(DVector::zeros(2))?;

    let measurement = DVector::from_vec(vec![1.0]);
    kf.predict();
    kf.update(&measurement)?;

    let state = kf.get_state();
    println!("Estimated state:");
    println!("  position: {:.4}", state[0]);
    println!("  velocity: {:.4}", state[1]);
    println!("Covariance:{}", kf.covariance());
    Ok(())
}

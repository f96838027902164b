//! Linear algebra type system for the estimators
//!
//! Fixed-size aliases for the navigation filter (dimension errors surface at
//! compile time) plus the shared covariance helpers.

use nalgebra::{DMatrix, SMatrix, SVector};

// ===== Navigation Dimensions =====
pub const NAV_STATE_DIM: usize = 6; // (x, y, vx, vy, ax, ay)
pub const NAV_MEASURE_DIM: usize = 2; // (x, y)

// ===== Navigation State Layout =====
pub const IDX_X: usize = 0;
pub const IDX_Y: usize = 1;
pub const IDX_VX: usize = 2;
pub const IDX_VY: usize = 3;
pub const IDX_AX: usize = 4;
pub const IDX_AY: usize = 5;

// ===== Navigation Filter Types =====
pub type NavStateVec = SVector<f64, NAV_STATE_DIM>;
pub type NavStateMat = SMatrix<f64, NAV_STATE_DIM, NAV_STATE_DIM>;

pub type NavMeasureVec = SVector<f64, NAV_MEASURE_DIM>;
pub type NavMeasureNoise = SMatrix<f64, NAV_MEASURE_DIM, NAV_MEASURE_DIM>;
pub type NavMeasureMat = SMatrix<f64, NAV_MEASURE_DIM, NAV_STATE_DIM>; // 2×6
pub type NavGainMat = SMatrix<f64, NAV_STATE_DIM, NAV_MEASURE_DIM>; // 6×2

/// Force exact symmetry on a fixed-size covariance: `P ← (P + Pᵀ) / 2`.
pub fn symmetrize<const N: usize>(p: &mut SMatrix<f64, N, N>) {
    *p = (*p + p.transpose()) * 0.5;
}

/// Dynamic-size counterpart of [`symmetrize`].
pub fn symmetrize_dyn(p: &mut DMatrix<f64>) {
    let sym = (&*p + p.transpose()) * 0.5;
    *p = sym;
}

/// Largest absolute difference between `P` and `Pᵀ`.
#[cfg(test)]
pub(crate) fn asymmetry(p: &DMatrix<f64>) -> f64 {
    (p - p.transpose()).amax()
}

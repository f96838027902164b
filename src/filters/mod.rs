pub mod kalman;
pub mod navigation;

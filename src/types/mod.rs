pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One externally supplied position observation in the local frame [meters]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    #[serde(default)]
    pub timestamp: Option<f64>,
    pub x: f64,
    pub y: f64,
}

impl PositionFix {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            timestamp: None,
            x,
            y,
        }
    }

    pub fn with_timestamp(x: f64, y: f64, timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            x,
            y,
        }
    }

    pub fn as_vector(&self) -> NavMeasureVec {
        NavMeasureVec::new(self.x, self.y)
    }

    /// Seconds elapsed since `previous`, when both fixes carry a timestamp.
    pub fn interval_since(&self, previous: &PositionFix) -> Option<f64> {
        Some(self.timestamp? - previous.timestamp?)
    }
}

/// Parse a fix stream: either a JSON array or concatenated / newline-separated objects.
pub fn parse_fixes(input: &str) -> serde_json::Result<Vec<PositionFix>> {
    if input.trim_start().starts_with('[') {
        return serde_json::from_str(input);
    }
    serde_json::Deserializer::from_str(input)
        .into_iter::<PositionFix>()
        .collect()
}

//! Evaluation settings shared by both robustness evaluators.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Robustness assigned to `true`. `false` is its negation.
pub const DEFAULT_MAXIMUM_ROBUSTNESS: f64 = 1e12;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("Maximum robustness must be finite and positive, got {0}")]
    InvalidMaximumRobustness(f64),
}

/// Configuration threaded through an evaluator when it is constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Saturating robustness value that stands for the Boolean constants and for empty windows.
    pub maximum_robustness: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maximum_robustness: DEFAULT_MAXIMUM_ROBUSTNESS,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maximum_robustness(mut self, maximum_robustness: f64) -> Self {
        self.maximum_robustness = maximum_robustness;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.maximum_robustness.is_finite() || self.maximum_robustness <= 0.0 {
            return Err(ConfigError::InvalidMaximumRobustness(self.maximum_robustness));
        }

        Ok(())
    }
}

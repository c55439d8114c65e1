#![deny(clippy::all)]

//! Quantitative monitoring and statistical model checking for Signal Temporal Logic.
//!
//! A [`Formula`] is evaluated against a [`Trace`] by one of two evaluators that share the same
//! semantics. The [`PointEvaluator`] recursively computes the robustness at a single sample, and
//! the [`VectorizedEvaluator`] computes the robustness of every sample at once using the sliding
//! window algorithms in [`signal`]. The [`statistics`] module aggregates the robustness of many
//! traces into a satisfaction rate with a confidence interval.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use fleance::{evaluate, parse_formula, Config, Trace, VectorizedEvaluator};
//!
//! let mut variables = BTreeMap::new();
//! variables.insert("x".to_string(), vec![0.0, 2.0, 5.0, 3.0]);
//! let trace = Trace::uniform(1.0, variables).unwrap();
//!
//! let formula = parse_formula("F[0,2] x > 4").unwrap();
//! let evaluator = VectorizedEvaluator::compile(&formula, Config::default()).unwrap();
//!
//! assert_eq!(evaluate(&evaluator, &trace), Ok(1.0));
//! ```

pub mod config;
pub mod expression;
pub mod formula;
pub mod ingest;
pub mod metrics;
#[cfg(feature = "parser")]
pub mod parser;
pub mod point;
pub mod signal;
pub mod statistics;
pub mod trace;
pub mod vectorized;

use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

pub use crate::config::Config;
pub use crate::formula::Formula;
#[cfg(feature = "parser")]
pub use crate::parser::parse_formula;
pub use crate::point::PointEvaluator;
pub use crate::trace::Trace;
pub use crate::vectorized::VectorizedEvaluator;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Variable {0} is not present in the trace")]
    MissingVariable(String),

    #[error("Sample {index} is outside of a trace with {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Robustness at sample {index} is undefined")]
    Indeterminate { index: usize },

    #[error("A {0} formula cannot be evaluated")]
    Unsupported(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Compute the robustness of a formula for a trace at a given sample.
///
/// Positive values indicate that the trace satisfies the formula at that sample, and the
/// magnitude is the margin by which it does so. Implementations never return NaN: an undefined
/// result is reported as [`EvaluationError::Indeterminate`].
pub trait Robustness {
    fn robustness(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError>;
}

impl<T> Robustness for &T
where
    T: Robustness + ?Sized,
{
    fn robustness(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError> {
        (**self).robustness(trace, index)
    }
}

impl<T> Robustness for Box<T>
where
    T: Robustness + ?Sized,
{
    fn robustness(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError> {
        (**self).robustness(trace, index)
    }
}

impl<T> Robustness for Rc<T>
where
    T: Robustness + ?Sized,
{
    fn robustness(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError> {
        (**self).robustness(trace, index)
    }
}

impl<T> Robustness for Arc<T>
where
    T: Robustness + ?Sized,
{
    fn robustness(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError> {
        (**self).robustness(trace, index)
    }
}

/// Robustness of the trace at its first sample.
pub fn evaluate<R>(evaluator: &R, trace: &Trace) -> Result<f64, EvaluationError>
where
    R: Robustness + ?Sized,
{
    evaluator.robustness(trace, 0)
}

//! Discretely sampled, multi-variable signals.
//!
//! A [`Trace`] stores a strictly increasing sequence of sample times together with one value
//! column per named variable. Every column is aligned to the time index, so the value of variable
//! `x` at sample `i` was observed at `trace.time(i)`. Sampling may be non-uniform.
//!
//! Traces are validated once when they are constructed and are immutable afterwards, which allows
//! a single trace to be shared by any number of evaluations.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use fleance::Trace;
//!
//! let mut variables = BTreeMap::new();
//! variables.insert("x".to_string(), vec![8.0, 8.0, 11.0, 11.0]);
//!
//! let trace = Trace::uniform(1.0, variables).unwrap();
//!
//! assert_eq!(trace.len(), 4);
//! assert_eq!(trace.times(), &[0.0, 1.0, 2.0, 3.0]);
//! assert_eq!(trace.value("x", 2), Some(11.0));
//! ```

use std::collections::BTreeMap;

use ordered_float::NotNan;
use thiserror::Error;

/// Error produced when the columns of a trace do not describe a valid signal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error("A trace must contain at least one sample")]
    Empty,

    #[error("Variable {name} has {found} samples, expected {expected}")]
    MismatchedLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Time at sample {index} is NaN")]
    NanTime { index: usize },

    #[error("Time at sample {index} does not increase over the previous sample")]
    NonIncreasingTime { index: usize },

    #[error("Sampling step must be finite and positive, got {0}")]
    InvalidStep(f64),
}

/// A set of variables sampled at a common, strictly increasing sequence of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    times: Vec<f64>,
    variables: BTreeMap<String, Vec<f64>>,
}

fn validate_times(times: &[f64]) -> Result<(), TraceError> {
    if times.is_empty() {
        return Err(TraceError::Empty);
    }

    let mut previous: Option<NotNan<f64>> = None;

    for (index, &time) in times.iter().enumerate() {
        let time = NotNan::new(time).map_err(|_| TraceError::NanTime { index })?;

        if previous.map_or(false, |prev| time <= prev) {
            return Err(TraceError::NonIncreasingTime { index });
        }

        previous = Some(time);
    }

    Ok(())
}

impl Trace {
    /// Create a trace from explicit sample times and a set of variable columns.
    ///
    /// Every column must have one value per time, and the times must be strictly increasing.
    pub fn new(times: Vec<f64>, variables: BTreeMap<String, Vec<f64>>) -> Result<Self, TraceError> {
        validate_times(&times)?;

        for (name, values) in &variables {
            if values.len() != times.len() {
                return Err(TraceError::MismatchedLength {
                    name: name.clone(),
                    expected: times.len(),
                    found: values.len(),
                });
            }
        }

        Ok(Self { times, variables })
    }

    /// Create a trace whose samples are `step` time units apart, starting at time zero.
    ///
    /// The number of samples is taken from the variable columns, which must all have the same
    /// length.
    pub fn uniform(step: f64, variables: BTreeMap<String, Vec<f64>>) -> Result<Self, TraceError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(TraceError::InvalidStep(step));
        }

        let len = variables.values().next().map_or(0, Vec::len);
        let times = (0..len).map(|index| index as f64 * step).collect();

        Self::new(times, variables)
    }

    /// Number of samples in the trace
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false for a successfully constructed trace
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn time(&self, index: usize) -> Option<f64> {
        self.times.get(index).copied()
    }

    /// The value column for the variable `name`, aligned to [`Trace::times`].
    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.values(name).and_then(|values| values.get(index).copied())
    }

    /// Names of all variables in the trace, in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{Trace, TraceError};

    fn columns() -> BTreeMap<String, Vec<f64>> {
        let mut variables = BTreeMap::new();
        variables.insert("x".to_string(), vec![1.0, 2.0, 3.0]);
        variables.insert("y".to_string(), vec![4.0, 5.0, 6.0]);
        variables
    }

    #[test]
    fn get_element() -> Result<(), TraceError> {
        let trace = Trace::new(vec![0.0, 0.5, 2.0], columns())?;

        assert_eq!(trace.value("y", 1), Some(5.0));
        assert_eq!(trace.value("y", 3), None);
        assert_eq!(trace.value("z", 0), None);
        assert_eq!(trace.time(2), Some(2.0));

        Ok(())
    }

    #[test]
    fn uniform_times() -> Result<(), TraceError> {
        let trace = Trace::uniform(0.25, columns())?;

        assert_eq!(trace.times(), &[0.0, 0.25, 0.5]);
        assert_eq!(trace.variables().collect::<Vec<_>>(), vec!["x", "y"]);

        Ok(())
    }

    #[test]
    fn mismatched_length() {
        let mut variables = columns();
        variables.insert("z".to_string(), vec![1.0]);

        let result = Trace::new(vec![0.0, 1.0, 2.0], variables);

        assert_eq!(
            result,
            Err(TraceError::MismatchedLength {
                name: "z".to_string(),
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn invalid_times() {
        assert_eq!(
            Trace::new(vec![0.0, 1.0, 1.0], columns()),
            Err(TraceError::NonIncreasingTime { index: 2 })
        );
        assert_eq!(
            Trace::new(vec![0.0, f64::NAN, 2.0], columns()),
            Err(TraceError::NanTime { index: 1 })
        );
        assert_eq!(Trace::new(vec![], BTreeMap::new()), Err(TraceError::Empty));
        assert_eq!(Trace::uniform(0.0, columns()), Err(TraceError::InvalidStep(0.0)));
    }
}

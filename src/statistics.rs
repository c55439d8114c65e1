//! Monte-Carlo estimation of the probability that a system satisfies a formula.
//!
//! Each trace in a population is evaluated at its first sample and counts as satisfying when its
//! robustness is non-negative. The fraction of satisfying traces estimates the probability of
//! satisfaction, and a Wald interval bounds the estimate at a requested confidence level:
//!
//! ```text
//! ε = z((1 + level) / 2) · sqrt((1 - p̂) / (p̂ · n))
//! [max(0, p̂ - ε), min(1, p̂ + ε)]
//! ```
//!
//! where `z` is the inverse of the standard normal CDF. The interval is undefined when no trace
//! satisfies the formula, which is reported as [`StatisticsError::DegenerateStatistics`].

use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

use nonempty::NonEmpty;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;
use tracing::{debug, trace};

use crate::trace::Trace;
use crate::{EvaluationError, Robustness};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticsError {
    #[error("No trace satisfies the formula, so the confidence interval is undefined")]
    DegenerateStatistics,

    #[error("Cannot compute statistics over an empty population")]
    EmptyPopulation,

    #[error("Confidence level must lie strictly between 0 and 1, got {0}")]
    InvalidLevel(f64),

    #[error("Satisfaction rate must lie between 0 and 1, got {0}")]
    InvalidRate(f64),

    #[error("Could not construct the standard normal distribution: {0}")]
    Distribution(String),
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Statistics(#[from] StatisticsError),
}

/// Count of satisfying traces in a population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SatisfactionRate {
    pub satisfied: usize,
    pub total: usize,
}

impl SatisfactionRate {
    /// Add one trace with the given robustness to the population.
    pub fn record(&mut self, robustness: f64) {
        self.total += 1;

        if robustness >= 0.0 {
            self.satisfied += 1;
        }
    }

    /// Fraction of satisfying traces
    pub fn rate(&self) -> Result<f64, StatisticsError> {
        if self.total == 0 {
            return Err(StatisticsError::EmptyPopulation);
        }

        Ok(self.satisfied as f64 / self.total as f64)
    }

    pub fn confidence_interval(&self, level: f64) -> Result<ConfidenceInterval, StatisticsError> {
        confidence_interval(self.rate()?, self.total, level)
    }
}

/// Evaluate every trace at its first sample and count the traces that satisfy the formula.
pub fn satisfaction_rate<R, T>(evaluator: &R, traces: &NonEmpty<T>) -> Result<SatisfactionRate, EvaluationError>
where
    R: Robustness + ?Sized,
    T: Borrow<Trace>,
{
    let mut rate = SatisfactionRate::default();

    for (index, trace) in traces.iter().enumerate() {
        let robustness = crate::evaluate(evaluator, trace.borrow())?;
        trace!(trace = index, robustness, "evaluated trace");
        rate.record(robustness);
    }

    Ok(rate)
}

/// Wald interval around an estimated satisfaction rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Half-width of the interval before clamping to `[0, 1]`
    pub error: f64,
    pub level: f64,
}

fn quantile(probability: f64) -> Result<f64, StatisticsError> {
    let normal = Normal::new(0.0, 1.0).map_err(|err| StatisticsError::Distribution(err.to_string()))?;

    Ok(normal.inverse_cdf(probability))
}

/// Compute the confidence interval of a satisfaction rate estimated from `samples` traces.
pub fn confidence_interval(rate: f64, samples: usize, level: f64) -> Result<ConfidenceInterval, StatisticsError> {
    if samples == 0 {
        return Err(StatisticsError::EmptyPopulation);
    }

    if !(0.0..=1.0).contains(&rate) {
        return Err(StatisticsError::InvalidRate(rate));
    }

    if !(level > 0.0 && level < 1.0) {
        return Err(StatisticsError::InvalidLevel(level));
    }

    if rate == 0.0 {
        return Err(StatisticsError::DegenerateStatistics);
    }

    let z = quantile((1.0 + level) / 2.0)?;
    let error = z * ((1.0 - rate) / (rate * samples as f64)).sqrt();

    Ok(ConfidenceInterval {
        lower: f64::max(0.0, rate - error),
        upper: f64::min(1.0, rate + error),
        error,
        level,
    })
}

/// Outcome of verifying a population of traces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub satisfaction: SatisfactionRate,
    pub rate: f64,
    pub interval: ConfidenceInterval,
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:.2}% of traces satisfy the property.", self.rate * 100.0)?;
        write!(
            f,
            "The true satisfying percentage is between {:.2}% and {:.2}% with {:.2}% confidence.",
            self.interval.lower * 100.0,
            self.interval.upper * 100.0,
            self.interval.level * 100.0
        )
    }
}

/// Estimates the satisfaction probability of a formula at a fixed confidence level.
#[derive(Debug, Clone)]
pub struct Verifier<R> {
    evaluator: R,
    level: f64,
}

impl<R> Verifier<R>
where
    R: Robustness,
{
    pub fn new(evaluator: R, level: f64) -> Result<Self, StatisticsError> {
        if !(level > 0.0 && level < 1.0) {
            return Err(StatisticsError::InvalidLevel(level));
        }

        Ok(Self { evaluator, level })
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Evaluate a single trace and add it to a running count.
    pub fn record(&self, rate: &mut SatisfactionRate, trace: &Trace) -> Result<f64, EvaluationError> {
        let robustness = crate::evaluate(&self.evaluator, trace)?;
        rate.record(robustness);

        Ok(robustness)
    }

    /// Summarize a running count into a report.
    pub fn report(&self, satisfaction: SatisfactionRate) -> Result<Report, StatisticsError> {
        let rate = satisfaction.rate()?;
        let interval = confidence_interval(rate, satisfaction.total, self.level)?;
        debug!(satisfied = satisfaction.satisfied, total = satisfaction.total, "verified population");

        Ok(Report {
            satisfaction,
            rate,
            interval,
        })
    }

    pub fn verify<T>(&self, traces: &NonEmpty<T>) -> Result<Report, VerificationError>
    where
        T: Borrow<Trace>,
    {
        let satisfaction = satisfaction_rate(&self.evaluator, traces)?;

        Ok(self.report(satisfaction)?)
    }
}

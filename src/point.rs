//! Recursive robustness evaluation at a single sample.
//!
//! Temporal intervals are read as sample offsets: `G[l,h] φ` at sample `t` is the minimum of `φ`
//! over samples `t+l` through `t+h`. Windows are truncated at the last sample of the trace, and
//! a window that starts after the last sample is empty. An empty window evaluates to the identity
//! of its operator, which is the maximum robustness for always and the minimum robustness for
//! eventually and until.

use tracing::trace;

use crate::config::Config;
use crate::formula::Formula;
use crate::metrics::{Join, Meet};
use crate::trace::Trace;
use crate::{EvaluationError, Robustness};

/// Reference evaluator that walks the formula tree once per requested sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvaluator {
    formula: Formula,
    config: Config,
}

impl PointEvaluator {
    pub fn new(formula: Formula, config: Config) -> Result<Self, EvaluationError> {
        config.validate()?;

        Ok(Self { formula, config })
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    fn window(&self, trace: &Trace, t: usize, low: usize, high: usize) -> std::ops::RangeInclusive<usize> {
        let last = trace.len() - 1;

        t.saturating_add(low)..=t.saturating_add(high).min(last)
    }

    fn evaluate(&self, formula: &Formula, trace: &Trace, t: usize) -> Result<f64, EvaluationError> {
        let maximum = self.config.maximum_robustness;

        let value = match formula {
            Formula::Constant(true) => maximum,
            Formula::Constant(false) => -maximum,
            Formula::Predicate(predicate) => {
                let left = predicate.left.value_at(trace, t)?;
                let right = predicate.right.value_at(trace, t)?;

                predicate.relation.robustness(left, right)
            }
            Formula::Not(child) => -self.evaluate(child, trace, t)?,
            Formula::And(left, right) => self.evaluate(left, trace, t)?.meet(self.evaluate(right, trace, t)?),
            Formula::Or(left, right) => self.evaluate(left, trace, t)?.join(self.evaluate(right, trace, t)?),
            Formula::Implies(left, right) => {
                (-self.evaluate(left, trace, t)?).meet(self.evaluate(right, trace, t)?)
            }
            Formula::Always(interval, child) => {
                let mut result: Option<f64> = None;

                for tau in self.window(trace, t, interval.low(), interval.high()) {
                    let value = self.evaluate(child, trace, tau)?;
                    result = Some(result.map_or(value, |r| r.meet(value)));
                }

                result.unwrap_or(maximum)
            }
            Formula::Eventually(interval, child) => {
                let mut result: Option<f64> = None;

                for tau in self.window(trace, t, interval.low(), interval.high()) {
                    let value = self.evaluate(child, trace, tau)?;
                    result = Some(result.map_or(value, |r| r.join(value)));
                }

                result.unwrap_or(-maximum)
            }
            Formula::Until(interval, left, right) => {
                let mut held = f64::INFINITY;
                let mut result: Option<f64> = None;

                // Left must hold from t up to the start of the interval.
                for tau in t..t.saturating_add(interval.low()).min(trace.len()) {
                    held = held.meet(self.evaluate(left, trace, tau)?);
                }

                for tau in self.window(trace, t, interval.low(), interval.high()) {
                    held = held.meet(self.evaluate(left, trace, tau)?);
                    let value = held.meet(self.evaluate(right, trace, tau)?);
                    result = Some(result.map_or(value, |r| r.join(value)));
                }

                result.unwrap_or(-maximum)
            }
            Formula::Concatenation(..) => return Err(EvaluationError::Unsupported(formula.kind())),
        };

        Ok(value)
    }
}

impl Robustness for PointEvaluator {
    fn robustness(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError> {
        if index >= trace.len() {
            return Err(EvaluationError::IndexOutOfRange { index, len: trace.len() });
        }

        let value = self.evaluate(&self.formula, trace, index)?;
        trace!(index, value, "point robustness");

        if value.is_nan() {
            return Err(EvaluationError::Indeterminate { index });
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::error::Error;

    use approx::assert_relative_eq;

    use super::PointEvaluator;
    use crate::config::Config;
    use crate::expression::{Expression, Function};
    use crate::formula::{Formula, Interval, Predicate, Relation};
    use crate::trace::Trace;
    use crate::{EvaluationError, Robustness};

    type TestResult = Result<(), Box<dyn Error>>;

    fn trace() -> Trace {
        let mut variables = BTreeMap::new();
        variables.insert("x".to_string(), vec![8.0, 8.0, 11.0, 11.0]);
        variables.insert("y".to_string(), vec![2.0, 3.0, 1.0, 2.0]);
        variables.insert("z".to_string(), vec![3.0, 9.0, 8.0, 9.0]);

        Trace::uniform(1.0, variables).unwrap()
    }

    fn p(name: &str, relation: Relation, threshold: f64) -> Formula {
        Formula::predicate(Predicate::linear(name, relation, threshold))
    }

    fn robustness(formula: Formula, index: usize) -> Result<f64, EvaluationError> {
        PointEvaluator::new(formula, Config::default())?.robustness(&trace(), index)
    }

    #[test]
    fn predicates() -> TestResult {
        assert_relative_eq!(robustness(p("x", Relation::Lt, 10.0), 0)?, 2.0);
        assert_relative_eq!(robustness(p("x", Relation::Ge, 10.0), 2)?, 1.0);
        assert_relative_eq!(robustness(p("y", Relation::Eq, 2.5), 1)?, -0.5);

        Ok(())
    }

    #[test]
    fn constants() -> TestResult {
        assert_relative_eq!(robustness(Formula::constant(true), 0)?, 1e12);
        assert_relative_eq!(robustness(Formula::constant(false), 3)?, -1e12);

        Ok(())
    }

    #[test]
    fn boolean_operators() -> TestResult {
        let a = p("x", Relation::Lt, 10.0);
        let b = p("y", Relation::Gt, 2.0);

        assert_relative_eq!(robustness(Formula::and(a.clone(), b.clone()), 1)?, 1.0);
        assert_relative_eq!(robustness(Formula::or(a.clone(), b.clone()), 2)?, -1.0);
        assert_relative_eq!(robustness(Formula::implies(a.clone(), b.clone()), 0)?, -2.0);
        assert_relative_eq!(robustness(Formula::not(a), 0)?, -2.0);

        Ok(())
    }

    #[test]
    fn temporal_operators() -> TestResult {
        let y = p("y", Relation::Gt, 2.0);
        let z = p("z", Relation::Le, 8.0);

        assert_relative_eq!(robustness(Formula::eventually(Interval::new(0, 2)?, y.clone()), 0)?, 1.0);
        assert_relative_eq!(robustness(Formula::always(Interval::new(1, 3)?, z.clone()), 0)?, -1.0);

        // Windows are truncated at the end of the trace.
        assert_relative_eq!(robustness(Formula::eventually(Interval::new(0, 5)?, y.clone()), 2)?, 0.0);

        // Windows that start after the end are empty.
        assert_relative_eq!(robustness(Formula::eventually(Interval::new(2, 3)?, y), 2)?, -1e12);
        assert_relative_eq!(robustness(Formula::always(Interval::new(2, 3)?, z), 2)?, 1e12);

        Ok(())
    }

    #[test]
    fn until() -> TestResult {
        let x = p("x", Relation::Lt, 10.0);
        let y = p("y", Relation::Ge, 3.0);

        // x < 10 holds for the first two samples and y >= 3 holds at the second.
        assert_relative_eq!(robustness(Formula::until(Interval::new(0, 3)?, x.clone(), y.clone()), 0)?, 0.0);
        assert_relative_eq!(robustness(Formula::until(Interval::new(2, 3)?, x, y), 0)?, -1.0);

        Ok(())
    }

    #[test]
    fn derivative_predicate() -> TestResult {
        let der = Predicate::new(
            Expression::call(Function::Derivative, Expression::variable("z")),
            Relation::Le,
            Expression::constant(5.0),
        );

        assert_relative_eq!(robustness(der.clone().into(), 0)?, 5.0);
        assert_relative_eq!(robustness(der.into(), 1)?, -1.0);

        Ok(())
    }

    #[test]
    fn errors() {
        let missing = p("w", Relation::Lt, 1.0);
        let concatenation = Formula::concatenation(
            Formula::eventually(Interval::new(0, 1).unwrap(), p("x", Relation::Lt, 1.0)),
            Formula::constant(true),
        );
        let undefined = Formula::predicate(Predicate::new(
            Expression::call(Function::Sqrt, Expression::constant(-1.0)),
            Relation::Lt,
            Expression::constant(0.0),
        ));

        assert_eq!(
            robustness(missing, 0),
            Err(EvaluationError::MissingVariable("w".to_string()))
        );
        assert_eq!(
            robustness(Formula::constant(true), 4),
            Err(EvaluationError::IndexOutOfRange { index: 4, len: 4 })
        );
        assert_eq!(
            robustness(concatenation, 0),
            Err(EvaluationError::Unsupported("concatenation"))
        );
        assert_eq!(robustness(undefined, 0), Err(EvaluationError::Indeterminate { index: 0 }));
    }
}

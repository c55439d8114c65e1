//! The Signal Temporal Logic formula tree.
//!
//! A [`Formula`] is an immutable tree that is built once, usually by the
//! [parser](crate::parser), and then evaluated against any number of traces. Temporal operators
//! carry an [`Interval`] of sample offsets relative to the time of evaluation.
//!
//! ```rust
//! use fleance::formula::{Formula, Interval, Predicate, Relation};
//!
//! let p = Formula::predicate(Predicate::linear("speed", Relation::Le, 30.0));
//! let formula = Formula::always(Interval::new(0, 10).unwrap(), p);
//!
//! assert_eq!(formula.to_string(), "G[0,10] speed <= 30");
//! ```

mod algebra;

use std::fmt::{Display, Formatter};

use thiserror::Error;

pub use self::algebra::AlgebraError;
use crate::expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Relation {
    /// Robustness of `left REL right`, where `right` plays the role of the threshold.
    ///
    /// | Relation    | Robustness          |
    /// | ----------- | ------------------- |
    /// | `<`, `<=`   | `right - left`      |
    /// | `>`, `>=`   | `left - right`      |
    /// | `=`         | `-abs(right - left)`|
    pub fn robustness(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Lt | Self::Le => right - left,
            Self::Gt | Self::Ge => left - right,
            Self::Eq => -(right - left).abs(),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
        }
    }
}

/// Comparison between two arithmetic expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub left: Expression,
    pub relation: Relation,
    pub right: Expression,
}

impl Predicate {
    pub fn new(left: Expression, relation: Relation, right: Expression) -> Self {
        Self { left, relation, right }
    }

    /// Create the predicate `variable REL threshold`.
    pub fn linear(variable: impl Into<String>, relation: Relation, threshold: f64) -> Self {
        Self::new(Expression::variable(variable), relation, Expression::constant(threshold))
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.left, self.relation.symbol(), self.right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("Interval lower bound {low} is greater than upper bound {high}")]
    Inverted { low: usize, high: usize },

    #[error("Shifting interval [{low},{high}] by {delta} overflows")]
    Overflow { low: usize, high: usize, delta: usize },
}

/// Closed interval `[low, high]` of offsets from the time of evaluation.
///
/// The point evaluator reads the bounds as a number of samples, while the vectorized evaluator
/// reads them as a duration in the time unit of the trace. Both readings coincide on traces
/// sampled once per time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    low: usize,
    high: usize,
}

impl Interval {
    pub fn new(low: usize, high: usize) -> Result<Self, IntervalError> {
        if low > high {
            return Err(IntervalError::Inverted { low, high });
        }

        Ok(Self { low, high })
    }

    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }

    pub fn width(&self) -> usize {
        self.high - self.low
    }

    pub fn shifted(&self, delta: usize) -> Result<Self, IntervalError> {
        let overflow = IntervalError::Overflow {
            low: self.low,
            high: self.high,
            delta,
        };

        let low = self.low.checked_add(delta).ok_or(overflow)?;
        let high = self.high.checked_add(delta).ok_or(overflow)?;

        Ok(Self { low, high })
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.low, self.high)
    }
}

/// A Signal Temporal Logic formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Constant(bool),
    Predicate(Predicate),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Always(Interval, Box<Formula>),
    Eventually(Interval, Box<Formula>),
    Until(Interval, Box<Formula>, Box<Formula>),
    /// Sequential composition `left >> right`. This node only exists to be rewritten away by
    /// [`Formula::expand_concatenations`] and cannot be evaluated.
    Concatenation(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn constant(value: bool) -> Self {
        Self::Constant(value)
    }

    pub fn predicate(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Formula) -> Self {
        Self::Not(Box::new(child))
    }

    pub fn and(left: Formula, right: Formula) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Formula, right: Formula) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn implies(left: Formula, right: Formula) -> Self {
        Self::Implies(Box::new(left), Box::new(right))
    }

    pub fn always(interval: Interval, child: Formula) -> Self {
        Self::Always(interval, Box::new(child))
    }

    pub fn eventually(interval: Interval, child: Formula) -> Self {
        Self::Eventually(interval, Box::new(child))
    }

    pub fn until(interval: Interval, left: Formula, right: Formula) -> Self {
        Self::Until(interval, Box::new(left), Box::new(right))
    }

    pub fn concatenation(left: Formula, right: Formula) -> Self {
        Self::Concatenation(Box::new(left), Box::new(right))
    }

    /// True if a [`Formula::Concatenation`] node appears anywhere in the tree.
    pub fn contains_concatenation(&self) -> bool {
        match self {
            Self::Constant(_) | Self::Predicate(_) => false,
            Self::Not(child) | Self::Always(_, child) | Self::Eventually(_, child) => child.contains_concatenation(),
            Self::And(left, right) | Self::Or(left, right) | Self::Implies(left, right) | Self::Until(_, left, right) => {
                left.contains_concatenation() || right.contains_concatenation()
            }
            Self::Concatenation(..) => true,
        }
    }
}

impl From<Predicate> for Formula {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "{}", value),
            Self::Predicate(predicate) => write!(f, "{}", predicate),
            Self::Not(child) => write!(f, "!{}", child),
            Self::And(left, right) => write!(f, "({} && {})", left, right),
            Self::Or(left, right) => write!(f, "({} || {})", left, right),
            Self::Implies(left, right) => write!(f, "({} => {})", left, right),
            Self::Always(interval, child) => write!(f, "G{} {}", interval, child),
            Self::Eventually(interval, child) => write!(f, "F{} {}", interval, child),
            Self::Until(interval, left, right) => write!(f, "({} U{} {})", left, interval, right),
            Self::Concatenation(left, right) => write!(f, "({} >> {})", left, right),
        }
    }
}

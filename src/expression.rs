//! Arithmetic expressions over trace variables.
//!
//! Expressions form the two sides of a [`Predicate`](crate::formula::Predicate). Most operators
//! act on one sample at a time. The exceptions are [`Function::Derivative`] and
//! [`Function::Integral`], which depend on the samples before the current one and on the actual
//! spacing of the sample times.
//!
//! | Expression   | Value at sample `i`                                    |
//! | ------------ | ------------------------------------------------------ |
//! | `x`          | `x[i]`                                                 |
//! | `der(e)`     | `0` for `i = 0`, else `(e[i] - e[i-1]) / (t[i] - t[i-1])` |
//! | `int(e)`     | `0` for `i = 0`, else `int(e)[i-1] + (e[i] + e[i-1]) / 2 * (t[i] - t[i-1])` |
//! | `log(e)`     | base-10 logarithm of `e[i]`                            |

use std::fmt::{Display, Formatter};

use crate::signal;
use crate::trace::Trace;
use crate::EvaluationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ArithmeticOp {
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Sub => left - right,
            Self::Mul => left * right,
            Self::Div => left / right,
            Self::Pow => left.powf(right),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sqrt,
    Log10,
    Ln,
    Abs,
    /// Forward-difference derivative with respect to time
    Derivative,
    /// Trapezoidal running integral starting from the first sample
    Integral,
}

impl Function {
    /// Apply a function that only depends on the current sample.
    ///
    /// Returns `None` for [`Function::Derivative`] and [`Function::Integral`], which need the
    /// whole signal.
    pub fn apply_pointwise(self, value: f64) -> Option<f64> {
        match self {
            Self::Sqrt => Some(value.sqrt()),
            Self::Log10 => Some(value.log10()),
            Self::Ln => Some(value.ln()),
            Self::Abs => Some(value.abs()),
            Self::Derivative | Self::Integral => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Log10 => "log",
            Self::Ln => "ln",
            Self::Abs => "abs",
            Self::Derivative => "der",
            Self::Integral => "int",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Variable(String),
    Constant(f64),
    Negate(Box<Expression>),
    Binary(ArithmeticOp, Box<Expression>, Box<Expression>),
    Function(Function, Box<Expression>),
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn constant(value: f64) -> Self {
        Self::Constant(value)
    }

    pub fn binary(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Self::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn call(function: Function, argument: Expression) -> Self {
        Self::Function(function, Box::new(argument))
    }

    /// Evaluate the expression at a single sample of the trace.
    pub fn value_at(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError> {
        match self {
            Self::Variable(name) => match trace.values(name) {
                Some(values) => values
                    .get(index)
                    .copied()
                    .ok_or(EvaluationError::IndexOutOfRange { index, len: trace.len() }),
                None => Err(EvaluationError::MissingVariable(name.clone())),
            },
            Self::Constant(value) => Ok(*value),
            Self::Negate(inner) => inner.value_at(trace, index).map(|value| -value),
            Self::Binary(op, left, right) => {
                let left = left.value_at(trace, index)?;
                let right = right.value_at(trace, index)?;

                Ok(op.apply(left, right))
            }
            Self::Function(function, inner) => match function.apply_pointwise(inner.value_at(trace, index)?) {
                Some(value) => Ok(value),
                None => {
                    let times = trace
                        .times()
                        .get(..=index)
                        .ok_or(EvaluationError::IndexOutOfRange { index, len: trace.len() })?;
                    let values = (0..=index)
                        .map(|i| inner.value_at(trace, i))
                        .collect::<Result<Vec<_>, _>>()?;
                    let output = match function {
                        Function::Derivative => signal::derivative(&values, times),
                        _ => signal::integral(&values, times),
                    };

                    Ok(output[index])
                }
            },
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "{}", name),
            Self::Constant(value) => write!(f, "{}", value),
            Self::Negate(inner) => write!(f, "-{}", inner),
            Self::Binary(op, left, right) => write!(f, "({} {} {})", left, op.symbol(), right),
            Self::Function(function, inner) => write!(f, "{}({})", function.name(), inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::error::Error;

    use approx::assert_relative_eq;

    use super::{ArithmeticOp, Expression, Function};
    use crate::trace::Trace;
    use crate::EvaluationError;

    fn trace() -> Trace {
        let mut variables = BTreeMap::new();
        variables.insert("x".to_string(), vec![1.0, 3.0, 4.0, 8.0]);

        Trace::new(vec![0.0, 1.0, 1.5, 3.5], variables).unwrap()
    }

    #[test]
    fn arithmetic() -> Result<(), Box<dyn Error>> {
        let trace = trace();
        let expr = Expression::binary(
            ArithmeticOp::Sub,
            Expression::binary(ArithmeticOp::Pow, Expression::variable("x"), Expression::constant(2.0)),
            Expression::Negate(Box::new(Expression::constant(1.0))),
        );

        assert_relative_eq!(expr.value_at(&trace, 1)?, 10.0);
        assert_relative_eq!(expr.value_at(&trace, 3)?, 65.0);

        let log = Expression::call(Function::Log10, Expression::constant(100.0));
        assert_relative_eq!(log.value_at(&trace, 0)?, 2.0);

        Ok(())
    }

    #[test]
    fn derivative_uses_spacing() -> Result<(), Box<dyn Error>> {
        let trace = trace();
        let der = Expression::call(Function::Derivative, Expression::variable("x"));

        assert_relative_eq!(der.value_at(&trace, 0)?, 0.0);
        assert_relative_eq!(der.value_at(&trace, 2)?, 2.0);
        assert_relative_eq!(der.value_at(&trace, 3)?, 2.0);

        Ok(())
    }

    #[test]
    fn integral_trapezoid() -> Result<(), Box<dyn Error>> {
        let trace = trace();
        let int = Expression::call(Function::Integral, Expression::variable("x"));

        assert_relative_eq!(int.value_at(&trace, 0)?, 0.0);
        assert_relative_eq!(int.value_at(&trace, 1)?, 2.0);
        assert_relative_eq!(int.value_at(&trace, 2)?, 3.75);
        assert_relative_eq!(int.value_at(&trace, 3)?, 15.75);

        Ok(())
    }

    #[test]
    fn missing_variable() {
        let result = Expression::variable("y").value_at(&trace(), 0);

        assert_eq!(result, Err(EvaluationError::MissingVariable("y".to_string())));
    }

    #[test]
    fn display() {
        let expr = Expression::call(
            Function::Abs,
            Expression::binary(ArithmeticOp::Mul, Expression::constant(2.5), Expression::variable("speed")),
        );

        assert_eq!(expr.to_string(), "abs((2.5 * speed))");
    }
}

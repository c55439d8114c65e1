use thiserror::Error;

use super::{Formula, IntervalError, Predicate, Relation};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlgebraError {
    #[error("{operation} is not defined for {node} formulas")]
    Unsupported {
        operation: &'static str,
        node: &'static str,
    },

    #[error("Cannot concatenate a bare predicate")]
    BarePredicate,

    #[error("No concatenation rewrite exists for a left operand of kind {0}")]
    NoRewrite(&'static str),

    #[error(transparent)]
    Interval(#[from] IntervalError),
}

impl Predicate {
    /// The complement of the predicate. Equality has no single complementary relation, so its
    /// negation is the disjunction of the two strict inequalities.
    pub fn negate(&self) -> Formula {
        let flipped = |relation| Formula::Predicate(Predicate::new(self.left.clone(), relation, self.right.clone()));

        match self.relation {
            Relation::Lt => flipped(Relation::Ge),
            Relation::Le => flipped(Relation::Gt),
            Relation::Gt => flipped(Relation::Le),
            Relation::Ge => flipped(Relation::Lt),
            Relation::Eq => Formula::or(flipped(Relation::Gt), flipped(Relation::Lt)),
        }
    }
}

impl Formula {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::Predicate(_) => "predicate",
            Self::Not(_) => "negation",
            Self::And(..) => "conjunction",
            Self::Or(..) => "disjunction",
            Self::Implies(..) => "implication",
            Self::Always(..) => "always",
            Self::Eventually(..) => "eventually",
            Self::Until(..) => "until",
            Self::Concatenation(..) => "concatenation",
        }
    }

    /// Structural negation of the formula.
    ///
    /// The result has exactly the negated robustness of the original formula. Conjunction and
    /// disjunction, as well as always and eventually, are swapped according to De Morgan's laws
    /// and an implication `a => b` becomes `a || !b`. An until formula is wrapped in a negation,
    /// and concatenation has no negation.
    pub fn negate(&self) -> Result<Formula, AlgebraError> {
        let negated = match self {
            Self::Constant(value) => Self::Constant(!value),
            Self::Predicate(predicate) => predicate.negate(),
            Self::Not(child) => child.as_ref().clone(),
            Self::And(left, right) => Self::or(left.negate()?, right.negate()?),
            Self::Or(left, right) => Self::and(left.negate()?, right.negate()?),
            Self::Implies(left, right) => Self::or(left.as_ref().clone(), right.negate()?),
            Self::Always(interval, child) => Self::eventually(*interval, child.negate()?),
            Self::Eventually(interval, child) => Self::always(*interval, child.negate()?),
            Self::Until(..) => Self::not(self.clone()),
            Self::Concatenation(..) => {
                return Err(AlgebraError::Unsupported {
                    operation: "Negation",
                    node: self.kind(),
                })
            }
        };

        Ok(negated)
    }

    /// Move every temporal interval of the formula `delta` samples into the future.
    ///
    /// Predicates and constants are unaffected. Temporal operators offset their own interval and
    /// leave their operand untouched.
    pub fn shifted(&self, delta: usize) -> Result<Formula, AlgebraError> {
        let shifted = match self {
            Self::Constant(_) | Self::Predicate(_) => self.clone(),
            Self::Not(child) => Self::not(child.shifted(delta)?),
            Self::And(left, right) => Self::and(left.shifted(delta)?, right.shifted(delta)?),
            Self::Or(left, right) => Self::or(left.shifted(delta)?, right.shifted(delta)?),
            Self::Always(interval, child) => Self::Always(interval.shifted(delta)?, child.clone()),
            Self::Eventually(interval, child) => Self::Eventually(interval.shifted(delta)?, child.clone()),
            Self::Concatenation(left, right) => Self::concatenation(left.shifted(delta)?, right.shifted(delta)?),
            Self::Implies(..) | Self::Until(..) => {
                return Err(AlgebraError::Unsupported {
                    operation: "Shifting",
                    node: self.kind(),
                })
            }
        };

        Ok(shifted)
    }

    /// Rewrite a single concatenation `left >> right` into an equivalent formula.
    ///
    /// | left        | right       | result                               |
    /// | ----------- | ----------- | ------------------------------------ |
    /// | `a && b`    | any         | `(a >> right) && (b >> right)`       |
    /// | `a \|\| b`  | any         | `(a >> right) \|\| (b >> right)`     |
    /// | `F[l,h] c`  | `F`, `G`    | `F[l,h] (c && right)`                |
    /// | `G[l,h] c`  | `G`, `F`    | `G[l,h] c && right.shifted(h - l)`   |
    /// | `F[l,h] c`  | any         | `F[l,h] (c && right)`                |
    /// | `G[l,h] c`  | any         | `G[l,h] c && right.shifted(h - l)`   |
    ///
    /// Either operand being a bare predicate is an error, as is any other left operand.
    pub fn concatenate(left: &Formula, right: &Formula) -> Result<Formula, AlgebraError> {
        if matches!(left, Self::Predicate(_)) || matches!(right, Self::Predicate(_)) {
            return Err(AlgebraError::BarePredicate);
        }

        let rewritten = match left {
            Self::And(a, b) => Self::and(
                Self::concatenation(a.as_ref().clone(), right.clone()),
                Self::concatenation(b.as_ref().clone(), right.clone()),
            ),
            Self::Or(a, b) => Self::or(
                Self::concatenation(a.as_ref().clone(), right.clone()),
                Self::concatenation(b.as_ref().clone(), right.clone()),
            ),
            Self::Eventually(interval, child) => {
                Self::eventually(*interval, Self::and(child.as_ref().clone(), right.clone()))
            }
            Self::Always(interval, _) => Self::and(left.clone(), right.shifted(interval.width())?),
            _ => return Err(AlgebraError::NoRewrite(left.kind())),
        };

        Ok(rewritten)
    }

    /// Replace every concatenation in the formula by its rewrite, innermost first.
    pub fn expand_concatenations(&self) -> Result<Formula, AlgebraError> {
        let expanded = match self {
            Self::Constant(_) | Self::Predicate(_) => self.clone(),
            Self::Not(child) => Self::not(child.expand_concatenations()?),
            Self::And(left, right) => Self::and(left.expand_concatenations()?, right.expand_concatenations()?),
            Self::Or(left, right) => Self::or(left.expand_concatenations()?, right.expand_concatenations()?),
            Self::Implies(left, right) => {
                Self::implies(left.expand_concatenations()?, right.expand_concatenations()?)
            }
            Self::Always(interval, child) => Self::always(*interval, child.expand_concatenations()?),
            Self::Eventually(interval, child) => Self::eventually(*interval, child.expand_concatenations()?),
            Self::Until(interval, left, right) => Self::until(
                *interval,
                left.expand_concatenations()?,
                right.expand_concatenations()?,
            ),
            Self::Concatenation(left, right) => {
                let left = left.expand_concatenations()?;
                let right = right.expand_concatenations()?;

                Self::concatenate(&left, &right)?.expand_concatenations()?
            }
        };

        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::AlgebraError;
    use crate::formula::{Formula, Interval, Predicate, Relation};

    fn p(name: &str, relation: Relation, threshold: f64) -> Formula {
        Formula::predicate(Predicate::linear(name, relation, threshold))
    }

    fn interval(low: usize, high: usize) -> Interval {
        Interval::new(low, high).unwrap()
    }

    #[test]
    fn negate_relations() -> Result<(), AlgebraError> {
        assert_eq!(p("x", Relation::Lt, 1.0).negate()?, p("x", Relation::Ge, 1.0));
        assert_eq!(p("x", Relation::Le, 1.0).negate()?, p("x", Relation::Gt, 1.0));
        assert_eq!(p("x", Relation::Gt, 1.0).negate()?, p("x", Relation::Le, 1.0));
        assert_eq!(p("x", Relation::Ge, 1.0).negate()?, p("x", Relation::Lt, 1.0));
        assert_eq!(
            p("x", Relation::Eq, 1.0).negate()?,
            Formula::or(p("x", Relation::Gt, 1.0), p("x", Relation::Lt, 1.0))
        );

        Ok(())
    }

    #[test]
    fn negate_operators() -> Result<(), AlgebraError> {
        let a = p("a", Relation::Lt, 0.0);
        let b = p("b", Relation::Gt, 0.0);
        let not_a = p("a", Relation::Ge, 0.0);
        let not_b = p("b", Relation::Le, 0.0);

        assert_eq!(Formula::constant(true).negate()?, Formula::constant(false));
        assert_eq!(Formula::not(a.clone()).negate()?, a);
        assert_eq!(
            Formula::and(a.clone(), b.clone()).negate()?,
            Formula::or(not_a.clone(), not_b.clone())
        );
        assert_eq!(
            Formula::implies(a.clone(), b.clone()).negate()?,
            Formula::or(a.clone(), not_b.clone())
        );
        assert_eq!(
            Formula::always(interval(1, 3), a.clone()).negate()?,
            Formula::eventually(interval(1, 3), not_a.clone())
        );
        assert_eq!(
            Formula::eventually(interval(0, 2), b.clone()).negate()?,
            Formula::always(interval(0, 2), not_b)
        );

        let until = Formula::until(interval(0, 2), a.clone(), b.clone());
        assert_eq!(until.negate()?, Formula::not(until.clone()));
        assert_eq!(until.negate()?.negate()?, until);

        let result = Formula::concatenation(a, b).negate();
        assert!(matches!(result, Err(AlgebraError::Unsupported { .. })));

        Ok(())
    }

    #[test]
    fn shift_intervals() -> Result<(), AlgebraError> {
        let a = p("a", Relation::Lt, 0.0);
        let formula = Formula::and(
            Formula::always(interval(0, 2), Formula::eventually(interval(1, 1), a.clone())),
            Formula::not(a.clone()),
        );

        let expected = Formula::and(
            Formula::always(interval(3, 5), Formula::eventually(interval(1, 1), a.clone())),
            Formula::not(a.clone()),
        );

        assert_eq!(formula.shifted(3)?, expected);
        assert_eq!(a.shifted(10)?, a);

        let implies = Formula::implies(a.clone(), a.clone());
        assert!(matches!(implies.shifted(1), Err(AlgebraError::Unsupported { .. })));

        let until = Formula::until(interval(0, 1), a.clone(), a);
        assert!(matches!(until.shifted(1), Err(AlgebraError::Unsupported { .. })));

        Ok(())
    }

    #[test]
    fn concatenate_temporal() -> Result<(), Box<dyn Error>> {
        let a = p("a", Relation::Lt, 0.0);
        let b = p("b", Relation::Gt, 0.0);
        let fa = Formula::eventually(interval(1, 3), a.clone());
        let ga = Formula::always(interval(1, 3), a.clone());
        let fb = Formula::eventually(interval(0, 2), b.clone());
        let gb = Formula::always(interval(0, 2), b.clone());

        for right in [&fb, &gb, &Formula::not(b.clone())] {
            assert_eq!(
                Formula::concatenate(&fa, right)?,
                Formula::eventually(interval(1, 3), Formula::and(a.clone(), right.clone()))
            );
        }

        assert_eq!(
            Formula::concatenate(&ga, &gb)?,
            Formula::and(ga.clone(), Formula::always(interval(2, 4), b.clone()))
        );
        assert_eq!(
            Formula::concatenate(&ga, &fb)?,
            Formula::and(ga.clone(), Formula::eventually(interval(2, 4), b.clone()))
        );
        assert_eq!(
            Formula::concatenate(&ga, &Formula::constant(true))?,
            Formula::and(ga.clone(), Formula::constant(true))
        );

        Ok(())
    }

    #[test]
    fn concatenate_boolean() -> Result<(), AlgebraError> {
        let fa = Formula::eventually(interval(0, 1), p("a", Relation::Lt, 0.0));
        let gb = Formula::always(interval(0, 1), p("b", Relation::Lt, 0.0));
        let right = Formula::eventually(interval(2, 2), p("c", Relation::Gt, 0.0));

        assert_eq!(
            Formula::concatenate(&Formula::and(fa.clone(), gb.clone()), &right)?,
            Formula::and(
                Formula::concatenation(fa.clone(), right.clone()),
                Formula::concatenation(gb.clone(), right.clone())
            )
        );
        assert_eq!(
            Formula::concatenate(&Formula::or(fa.clone(), gb.clone()), &right)?,
            Formula::or(
                Formula::concatenation(fa, right.clone()),
                Formula::concatenation(gb, right)
            )
        );

        Ok(())
    }

    #[test]
    fn concatenate_errors() {
        let a = p("a", Relation::Lt, 0.0);
        let fa = Formula::eventually(interval(0, 1), a.clone());

        assert_eq!(Formula::concatenate(&a, &fa), Err(AlgebraError::BarePredicate));
        assert_eq!(Formula::concatenate(&fa, &a), Err(AlgebraError::BarePredicate));
        assert_eq!(
            Formula::concatenate(&Formula::not(fa.clone()), &fa),
            Err(AlgebraError::NoRewrite("negation"))
        );
    }

    #[test]
    fn expand_nested() -> Result<(), AlgebraError> {
        let fa = Formula::eventually(interval(0, 1), p("a", Relation::Lt, 0.0));
        let gb = Formula::always(interval(0, 2), p("b", Relation::Lt, 0.0));
        let fc = Formula::eventually(interval(1, 1), p("c", Relation::Gt, 0.0));
        let formula = Formula::not(Formula::concatenation(Formula::and(fa.clone(), gb.clone()), fc.clone()));

        let expanded = formula.expand_concatenations()?;

        assert!(!expanded.contains_concatenation());
        assert_eq!(
            expanded,
            Formula::not(Formula::and(
                Formula::eventually(interval(0, 1), Formula::and(p("a", Relation::Lt, 0.0), fc.clone())),
                Formula::and(gb, Formula::eventually(interval(3, 3), p("c", Relation::Gt, 0.0)))
            ))
        );

        Ok(())
    }
}

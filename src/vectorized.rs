//! Evaluation of the robustness of every sample of a trace in one pass.
//!
//! A formula is compiled once into a flat list of nodes in post-order, so every node appears
//! after its operands and is identified by its position in the list. Evaluating a trace walks the
//! list front to back and produces one signal per node, which means each subformula is evaluated
//! exactly once regardless of how many samples the temporal operators above it inspect.
//!
//! Temporal intervals are interpreted in the time unit of the trace, and the signal between two
//! samples is linearly interpolated. On a trace with one sample per time unit this agrees with the
//! [`PointEvaluator`](crate::PointEvaluator) at every sample whose windows end before the last
//! sample. Samples whose windows run past the end of the trace are undefined.

use tracing::{debug, trace};

use crate::config::Config;
use crate::expression::{ArithmeticOp, Expression, Function};
use crate::formula::{Formula, Interval, Relation};
use crate::metrics::{Join, Meet};
use crate::signal;
use crate::trace::Trace;
use crate::{EvaluationError, Robustness};

/// Position of a node in a compiled formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Constant(bool),
    Variable(String),
    Literal(f64),
    Negate(NodeId),
    Arithmetic(ArithmeticOp, NodeId, NodeId),
    Function(Function, NodeId),
    Compare(Relation, NodeId, NodeId),
    Not(NodeId),
    And(NodeId, NodeId),
    Or(NodeId, NodeId),
    Implies(NodeId, NodeId),
    Always(Interval, NodeId),
    Eventually(Interval, NodeId),
    Until(Interval, NodeId, NodeId),
}

/// A formula compiled for whole-signal evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizedEvaluator {
    nodes: Vec<Node>,
    config: Config,
}

fn map<F>(values: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    values.iter().map(|&value| f(value)).collect()
}

fn zip_with<F>(left: &[f64], right: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64,
{
    left.iter().zip(right).map(|(&l, &r)| f(l, r)).collect()
}

impl VectorizedEvaluator {
    /// Flatten a formula into its node list.
    ///
    /// Concatenations have no robustness of their own and must be removed with
    /// [`Formula::expand_concatenations`] before compiling.
    pub fn compile(formula: &Formula, config: Config) -> Result<Self, EvaluationError> {
        config.validate()?;

        let mut evaluator = Self {
            nodes: Vec::new(),
            config,
        };

        evaluator.push_formula(formula)?;
        debug!(nodes = evaluator.nodes.len(), "compiled formula");

        Ok(evaluator)
    }

    /// Number of nodes in the compiled formula
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node holding the robustness of the whole formula.
    pub fn root(&self) -> NodeId {
        NodeId(self.nodes.len() - 1)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn push_expression(&mut self, expression: &Expression) -> NodeId {
        let node = match expression {
            Expression::Variable(name) => Node::Variable(name.clone()),
            Expression::Constant(value) => Node::Literal(*value),
            Expression::Negate(inner) => Node::Negate(self.push_expression(inner)),
            Expression::Binary(op, left, right) => {
                let left = self.push_expression(left);
                let right = self.push_expression(right);

                Node::Arithmetic(*op, left, right)
            }
            Expression::Function(function, inner) => Node::Function(*function, self.push_expression(inner)),
        };

        self.push(node)
    }

    fn push_binary<F>(&mut self, left: &Formula, right: &Formula, node: F) -> Result<NodeId, EvaluationError>
    where
        F: FnOnce(NodeId, NodeId) -> Node,
    {
        let left = self.push_formula(left)?;
        let right = self.push_formula(right)?;

        Ok(self.push(node(left, right)))
    }

    fn push_formula(&mut self, formula: &Formula) -> Result<NodeId, EvaluationError> {
        let id = match formula {
            Formula::Constant(value) => self.push(Node::Constant(*value)),
            Formula::Predicate(predicate) => {
                let left = self.push_expression(&predicate.left);
                let right = self.push_expression(&predicate.right);

                self.push(Node::Compare(predicate.relation, left, right))
            }
            Formula::Not(child) => {
                let child = self.push_formula(child)?;
                self.push(Node::Not(child))
            }
            Formula::And(left, right) => self.push_binary(left, right, Node::And)?,
            Formula::Or(left, right) => self.push_binary(left, right, Node::Or)?,
            Formula::Implies(left, right) => self.push_binary(left, right, Node::Implies)?,
            Formula::Always(interval, child) => {
                let child = self.push_formula(child)?;
                self.push(Node::Always(*interval, child))
            }
            Formula::Eventually(interval, child) => {
                let child = self.push_formula(child)?;
                self.push(Node::Eventually(*interval, child))
            }
            Formula::Until(interval, left, right) => {
                let interval = *interval;
                self.push_binary(left, right, |l, r| Node::Until(interval, l, r))?
            }
            Formula::Concatenation(..) => return Err(EvaluationError::Unsupported(formula.kind())),
        };

        Ok(id)
    }

    /// Compute the signal of every node, indexed by [`NodeId::index`].
    ///
    /// The signals are scratch space for a single call and are not cached between evaluations.
    pub fn signals(&self, trace: &Trace) -> Result<Vec<Vec<f64>>, EvaluationError> {
        let times = trace.times();
        let n = times.len();
        let maximum = self.config.maximum_robustness;
        let mut signals: Vec<Vec<f64>> = Vec::with_capacity(self.nodes.len());

        for (index, node) in self.nodes.iter().enumerate() {
            let get = |id: &NodeId| signals[id.0].as_slice();

            let signal = match node {
                Node::Constant(true) => vec![maximum; n],
                Node::Constant(false) => vec![-maximum; n],
                Node::Variable(name) => trace
                    .values(name)
                    .ok_or_else(|| EvaluationError::MissingVariable(name.clone()))?
                    .to_vec(),
                Node::Literal(value) => vec![*value; n],
                Node::Negate(id) | Node::Not(id) => map(get(id), |value| -value),
                Node::Arithmetic(op, left, right) => zip_with(get(left), get(right), |l, r| op.apply(l, r)),
                Node::Function(Function::Derivative, id) => signal::derivative(get(id), times),
                Node::Function(Function::Integral, id) => signal::integral(get(id), times),
                Node::Function(function, id) => {
                    map(get(id), |value| function.apply_pointwise(value).unwrap_or(f64::NAN))
                }
                Node::Compare(relation, left, right) => {
                    zip_with(get(left), get(right), |l, r| relation.robustness(l, r))
                }
                Node::And(left, right) => zip_with(get(left), get(right), |l, r| l.meet(r)),
                Node::Or(left, right) => zip_with(get(left), get(right), |l, r| l.join(r)),
                Node::Implies(left, right) => zip_with(get(left), get(right), |l, r| (-l).meet(r)),
                Node::Always(interval, id) => {
                    signal::always(get(id), times, interval.low() as f64, interval.high() as f64)
                }
                Node::Eventually(interval, id) => {
                    signal::eventually(get(id), times, interval.low() as f64, interval.high() as f64)
                }
                Node::Until(interval, left, right) => signal::until(
                    get(left),
                    get(right),
                    times,
                    interval.low() as f64,
                    interval.high() as f64,
                ),
            };

            trace!(node = index, "evaluated node");
            signals.push(signal);
        }

        Ok(signals)
    }

    /// Robustness of the whole formula at every sample. Undefined samples are NaN.
    pub fn signal(&self, trace: &Trace) -> Result<Vec<f64>, EvaluationError> {
        let mut signals = self.signals(trace)?;

        Ok(signals.pop().unwrap_or_default())
    }
}

impl Robustness for VectorizedEvaluator {
    fn robustness(&self, trace: &Trace, index: usize) -> Result<f64, EvaluationError> {
        let signal = self.signal(trace)?;
        let value = *signal
            .get(index)
            .ok_or(EvaluationError::IndexOutOfRange { index, len: trace.len() })?;

        if value.is_nan() {
            return Err(EvaluationError::Indeterminate { index });
        }

        Ok(value)
    }
}

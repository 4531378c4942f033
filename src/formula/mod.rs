//! Formula algebra
//!
//! A [`Formula`] is a well-formed expression over predicates, the boolean
//! connectives and modal operators. Like terms, formulas are immutable and
//! share their payloads through `Arc`.
//!
//! The `&`, `|` and `~` operators build conjunctions, disjunctions and
//! negations; same-kind operands flatten associatively, so `p & (q & r)`
//! yields one three-operand conjunction rather than a nested pair.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use crate::term::{Compound, Substitution, Variable};

mod framed;
mod modal;

pub use framed::{ComparisonOperator, FramedLiteral};
pub use modal::{ModalOperator, TimeInterval};

/// The kind of an n-ary boolean connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectiveKind {
    And,
    Or,
    Impl,
}

/// A well-formed formula of the query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// An atomic formula: a predicate application.
    Predicate(Arc<Compound>),
    /// Negation of a formula.
    Negation(Arc<Formula>),
    /// An n-ary connective. Implication has exactly two operands; `And` and
    /// `Or` hold two or more after flattening.
    Connective { kind: ConnectiveKind, operands: Vec<Formula> },
    /// A modal operator applied to a formula.
    Modal { op: ModalOperator, body: Arc<Formula> },
}

impl Formula {
    pub fn predicate(compound: Compound) -> Self {
        Formula::Predicate(Arc::new(compound))
    }

    pub fn negation(inner: Formula) -> Self {
        Formula::Negation(Arc::new(inner))
    }

    pub fn conjunction(operands: Vec<Formula>) -> Self {
        Formula::Connective { kind: ConnectiveKind::And, operands }
    }

    pub fn disjunction(operands: Vec<Formula>) -> Self {
        Formula::Connective { kind: ConnectiveKind::Or, operands }
    }

    pub fn implication(antecedent: Formula, consequent: Formula) -> Self {
        Formula::Connective { kind: ConnectiveKind::Impl, operands: vec![antecedent, consequent] }
    }

    pub fn modal(op: ModalOperator, body: Formula) -> Self {
        Formula::Modal { op, body: Arc::new(body) }
    }

    /// True iff no variable is reachable from this formula.
    pub fn is_ground(&self) -> bool {
        match self {
            Formula::Predicate(c) => c.is_ground(),
            Formula::Negation(f) => f.is_ground(),
            Formula::Connective { operands, .. } => operands.iter().all(Formula::is_ground),
            Formula::Modal { body, .. } => body.is_ground(),
        }
    }

    /// Apply a substitution, returning a new formula. Ground subformulas
    /// are reused by reference.
    pub fn apply(&self, sub: &Substitution) -> Formula {
        if self.is_ground() {
            return self.clone();
        }
        match self {
            Formula::Predicate(c) => {
                let args = c.args().iter().map(|a| sub.apply(a)).collect();
                Formula::predicate(Compound::new(c.functor(), args))
            }
            Formula::Negation(f) => Formula::Negation(Arc::new(f.apply(sub))),
            Formula::Connective { kind, operands } => Formula::Connective {
                kind: *kind,
                operands: operands
                    .iter()
                    .map(|f| if f.is_ground() { f.clone() } else { f.apply(sub) })
                    .collect(),
            },
            Formula::Modal { op, body } => {
                Formula::Modal { op: op.clone(), body: Arc::new(body.apply(sub)) }
            }
        }
    }

    /// The predicate at the core of this formula, descending through modal
    /// operators. The manager dispatches queries on its indicator.
    pub fn innermost_predicate(&self) -> Option<&Arc<Compound>> {
        match self {
            Formula::Predicate(c) => Some(c),
            Formula::Modal { body, .. } => body.innermost_predicate(),
            _ => None,
        }
    }

    /// Collect the free variables of this formula into `out`.
    pub fn collect_variables(&self, out: &mut std::collections::BTreeSet<Variable>) {
        match self {
            Formula::Predicate(c) => {
                for arg in c.args() {
                    arg.collect_variables(out);
                }
            }
            Formula::Negation(f) => f.collect_variables(out),
            Formula::Connective { operands, .. } => {
                for f in operands {
                    f.collect_variables(out);
                }
            }
            Formula::Modal { body, .. } => body.collect_variables(out),
        }
    }

    // Binding strength, tightest first: unary (3) > and (2) > or (1) > impl (0).
    fn precedence(&self) -> u8 {
        match self {
            Formula::Predicate(_) | Formula::Negation(_) | Formula::Modal { .. } => 3,
            Formula::Connective { kind: ConnectiveKind::And, .. } => 2,
            Formula::Connective { kind: ConnectiveKind::Or, .. } => 1,
            Formula::Connective { kind: ConnectiveKind::Impl, .. } => 0,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

fn flatten(kind: ConnectiveKind, lhs: Formula, rhs: Formula) -> Formula {
    let mut operands = Vec::new();
    for side in [lhs, rhs] {
        match side {
            Formula::Connective { kind: k, operands: ops } if k == kind => operands.extend(ops),
            other => operands.push(other),
        }
    }
    Formula::Connective { kind, operands }
}

impl BitAnd for Formula {
    type Output = Formula;

    fn bitand(self, rhs: Formula) -> Formula {
        flatten(ConnectiveKind::And, self, rhs)
    }
}

impl BitOr for Formula {
    type Output = Formula;

    fn bitor(self, rhs: Formula) -> Formula {
        flatten(ConnectiveKind::Or, self, rhs)
    }
}

impl Not for Formula {
    type Output = Formula;

    fn not(self) -> Formula {
        Formula::negation(self)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Predicate(c) => write!(f, "{}", c),
            Formula::Negation(inner) => {
                write!(f, "~")?;
                inner.fmt_operand(f, 3)
            }
            Formula::Connective { kind: ConnectiveKind::Impl, operands } => {
                // right-associative: only a nested implication on the left
                // needs brackets
                operands[0].fmt_operand(f, 1)?;
                write!(f, " -> ")?;
                operands[1].fmt_operand(f, 0)
            }
            Formula::Connective { kind, operands } => {
                let (sep, prec) = match kind {
                    ConnectiveKind::And => (", ", 2),
                    ConnectiveKind::Or => ("; ", 1),
                    ConnectiveKind::Impl => unreachable!(),
                };
                for (i, op) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    op.fmt_operand(f, prec + 1)?;
                }
                Ok(())
            }
            Formula::Modal { op, body } => {
                write!(f, "{}", op)?;
                write!(f, " ")?;
                body.fmt_operand(f, 3)
            }
        }
    }
}

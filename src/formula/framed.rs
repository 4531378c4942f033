//! Framed literals
//!
//! A [`FramedLiteral`] is the triple-pattern shape graph backends consume:
//! subject, property and object terms, a comparison operator on the object,
//! plus the epistemic/temporal frame (graph name, agent, begin/end with
//! their operators, confidence). It is the bridge between a parsed formula
//! and a graph query.

use std::fmt;

use crate::term::Term;

/// A comparison applied to the object, confidence or time terms of a
/// framed literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Lt,
    Gt,
    Leq,
    Geq,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Leq => "=<",
            ComparisonOperator::Geq => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A triple pattern with temporal and epistemic framing.
#[derive(Debug, Clone, PartialEq)]
pub struct FramedLiteral {
    subject: Term,
    property: Term,
    object: Term,
    object_operator: ComparisonOperator,
    graph: Term,
    agent: Option<Term>,
    begin: Option<Term>,
    end: Option<Term>,
    confidence: Option<Term>,
    begin_operator: ComparisonOperator,
    end_operator: ComparisonOperator,
    confidence_operator: ComparisonOperator,
}

impl FramedLiteral {
    pub fn new(
        subject: Term,
        property: Term,
        object: Term,
        object_operator: ComparisonOperator,
        graph_name: &str,
    ) -> Self {
        FramedLiteral {
            subject,
            property,
            object,
            object_operator,
            graph: Term::atom(graph_name),
            agent: None,
            begin: None,
            end: None,
            confidence: None,
            begin_operator: ComparisonOperator::Eq,
            end_operator: ComparisonOperator::Eq,
            confidence_operator: ComparisonOperator::Eq,
        }
    }

    /// A pattern matching triples in any graph, with object equality.
    pub fn pattern(subject: Term, property: Term, object: Term) -> Self {
        FramedLiteral::new(subject, property, object, ComparisonOperator::Eq, "*")
    }

    /// True iff the pattern and every present frame term is variable-free.
    pub fn is_ground(&self) -> bool {
        self.subject.is_ground()
            && self.property.is_ground()
            && self.object.is_ground()
            && self.agent.iter().all(Term::is_ground)
            && self.begin.iter().all(Term::is_ground)
            && self.end.iter().all(Term::is_ground)
            && self.confidence.iter().all(Term::is_ground)
    }

    pub fn subject_term(&self) -> &Term {
        &self.subject
    }

    pub fn property_term(&self) -> &Term {
        &self.property
    }

    pub fn object_term(&self) -> &Term {
        &self.object
    }

    pub fn graph_term(&self) -> &Term {
        &self.graph
    }

    pub fn agent_term(&self) -> Option<&Term> {
        self.agent.as_ref()
    }

    pub fn begin_term(&self) -> Option<&Term> {
        self.begin.as_ref()
    }

    pub fn end_term(&self) -> Option<&Term> {
        self.end.as_ref()
    }

    pub fn confidence_term(&self) -> Option<&Term> {
        self.confidence.as_ref()
    }

    pub fn object_operator(&self) -> ComparisonOperator {
        self.object_operator
    }

    pub fn begin_operator(&self) -> ComparisonOperator {
        self.begin_operator
    }

    pub fn end_operator(&self) -> ComparisonOperator {
        self.end_operator
    }

    pub fn confidence_operator(&self) -> ComparisonOperator {
        self.confidence_operator
    }

    pub fn set_agent(&mut self, agent: &str) {
        self.agent = Some(Term::atom(agent));
    }

    pub fn set_begin_term(&mut self, begin: Term) {
        self.begin = Some(begin);
    }

    pub fn set_end_term(&mut self, end: Term) {
        self.end = Some(end);
    }

    pub fn set_begin_operator(&mut self, op: ComparisonOperator) {
        self.begin_operator = op;
    }

    pub fn set_end_operator(&mut self, op: ComparisonOperator) {
        self.end_operator = op;
    }

    /// Only match triples whose confidence is at least `limit`.
    pub fn set_min_confidence(&mut self, limit: f64) {
        self.confidence = Some(Term::Float(limit));
        self.confidence_operator = ComparisonOperator::Geq;
    }

    /// Only match triples whose confidence is at most `limit`.
    pub fn set_max_confidence(&mut self, limit: f64) {
        self.confidence = Some(Term::Float(limit));
        self.confidence_operator = ComparisonOperator::Leq;
    }

    pub fn set_min_begin(&mut self, limit: f64) {
        self.begin = Some(Term::Float(limit));
        self.begin_operator = ComparisonOperator::Geq;
    }

    pub fn set_max_begin(&mut self, limit: f64) {
        self.begin = Some(Term::Float(limit));
        self.begin_operator = ComparisonOperator::Leq;
    }

    pub fn set_min_end(&mut self, limit: f64) {
        self.end = Some(Term::Float(limit));
        self.end_operator = ComparisonOperator::Geq;
    }

    pub fn set_max_end(&mut self, limit: f64) {
        self.end = Some(Term::Float(limit));
        self.end_operator = ComparisonOperator::Leq;
    }
}

impl fmt::Display for FramedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} ", self.subject, self.property)?;
        if self.object_operator != ComparisonOperator::Eq {
            write!(f, "{}", self.object_operator)?;
        }
        write!(f, "{})", self.object)
    }
}

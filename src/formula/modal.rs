//! Modal operators
//!
//! The query language carries four parametric modal operators:
//!
//! - `K` - knowledge of an agent (the querying agent itself when absent)
//! - `B` - belief, optionally qualified by agent and confidence
//! - `P` - "at some past instant", optionally within a time interval
//! - `H` - "at all past instants", optionally within a time interval
//!
//! The core treats these purely structurally; their model-level semantics
//! are a backend concern. The agent name `self` is canonicalized to "no
//! agent" at construction time.

use std::fmt;

/// A time interval with at least one bounded side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInterval {
    begin: Option<f64>,
    end: Option<f64>,
}

impl TimeInterval {
    pub fn new(begin: Option<f64>, end: Option<f64>) -> Self {
        TimeInterval { begin, end }
    }

    pub fn since(begin: f64) -> Self {
        TimeInterval { begin: Some(begin), end: None }
    }

    pub fn until(end: f64) -> Self {
        TimeInterval { begin: None, end: Some(end) }
    }

    pub fn begin(&self) -> Option<f64> {
        self.begin
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.begin, self.end) {
            (Some(b), Some(e)) => write!(f, "{},{}", b, e),
            (Some(b), None) => write!(f, "{}", b),
            (None, Some(e)) => write!(f, ",{}", e),
            (None, None) => Ok(()),
        }
    }
}

/// A parametric modal operator.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalOperator {
    /// Knowledge of `agent`, or of the querying agent itself when absent.
    Knowledge { agent: Option<String> },
    /// Belief, optionally of a specific agent and with a confidence bound.
    Belief { agent: Option<String>, confidence: Option<f64> },
    /// Holds at some past instant, optionally within `interval`.
    OncePast { interval: Option<TimeInterval> },
    /// Holds at all past instants, optionally within `interval`.
    AlwaysPast { interval: Option<TimeInterval> },
}

fn canonical_agent(agent: &str) -> Option<String> {
    if agent == "self" {
        None
    } else {
        Some(agent.to_string())
    }
}

impl ModalOperator {
    pub fn k() -> Self {
        ModalOperator::Knowledge { agent: None }
    }

    pub fn k_of(agent: &str) -> Self {
        ModalOperator::Knowledge { agent: canonical_agent(agent) }
    }

    pub fn b() -> Self {
        ModalOperator::Belief { agent: None, confidence: None }
    }

    pub fn b_of(agent: &str) -> Self {
        ModalOperator::Belief { agent: canonical_agent(agent), confidence: None }
    }

    pub fn b_confident(confidence: f64) -> Self {
        ModalOperator::Belief { agent: None, confidence: Some(confidence) }
    }

    pub fn b_of_confident(agent: &str, confidence: f64) -> Self {
        ModalOperator::Belief { agent: canonical_agent(agent), confidence: Some(confidence) }
    }

    pub fn p() -> Self {
        ModalOperator::OncePast { interval: None }
    }

    pub fn p_during(interval: TimeInterval) -> Self {
        ModalOperator::OncePast { interval: Some(interval) }
    }

    pub fn h() -> Self {
        ModalOperator::AlwaysPast { interval: None }
    }

    pub fn h_during(interval: TimeInterval) -> Self {
        ModalOperator::AlwaysPast { interval: Some(interval) }
    }

    /// The one-character display symbol of this operator.
    pub fn symbol(&self) -> char {
        match self {
            ModalOperator::Knowledge { .. } => 'K',
            ModalOperator::Belief { .. } => 'B',
            ModalOperator::OncePast { .. } => 'P',
            ModalOperator::AlwaysPast { .. } => 'H',
        }
    }

    pub fn agent(&self) -> Option<&str> {
        match self {
            ModalOperator::Knowledge { agent } | ModalOperator::Belief { agent, .. } => {
                agent.as_deref()
            }
            _ => None,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            ModalOperator::Belief { confidence, .. } => *confidence,
            _ => None,
        }
    }

    pub fn interval(&self) -> Option<&TimeInterval> {
        match self {
            ModalOperator::OncePast { interval } | ModalOperator::AlwaysPast { interval } => {
                interval.as_ref()
            }
            _ => None,
        }
    }
}

// Writes the operator with its option list in the surface syntax, e.g.
// `B[fred,0.8]` or `P[,20]`.
impl fmt::Display for ModalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())?;
        match self {
            ModalOperator::Knowledge { agent: Some(a) } => write!(f, "['{}']", a),
            ModalOperator::Belief { agent: Some(a), confidence: Some(c) } => {
                write!(f, "['{}',{}]", a, c)
            }
            ModalOperator::Belief { agent: Some(a), confidence: None } => write!(f, "['{}']", a),
            ModalOperator::Belief { agent: None, confidence: Some(c) } => write!(f, "[{}]", c),
            ModalOperator::OncePast { interval: Some(i) }
            | ModalOperator::AlwaysPast { interval: Some(i) } => write!(f, "[{}]", i),
            _ => Ok(()),
        }
    }
}

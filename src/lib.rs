//! MKB - Modal Knowledge Base
//!
//! A knowledge-base engine that evaluates modal first-order queries
//! against pluggable reasoning backends over a shared vocabulary of
//! logical terms.
//!
//! # Architecture
//!
//! - [`term`] - immutable logical values: variables, constants, compound
//!   predicates, lists and the `Top`/`Bottom` constants, plus
//!   substitutions, reversible merges and unification
//! - [`formula`] - predicates, boolean connectives and parametric modal
//!   operators (`K`, `B`, `P`, `H`), and the framed-literal shape graph
//!   backends consume
//! - [`parser`] - the combinator grammar of the query surface syntax with
//!   IRI prefix expansion
//! - [`query`] - answer streams: bounded multi-producer channels carrying
//!   substitutions, terminated by a single end-of-stream marker
//! - [`reasoner`] - the backend contract, instance configuration, the
//!   plugin ABI and the reasoner manager
//! - [`worker`] - the cooperative worker pool running cancellable query
//!   evaluations
//! - [`kb`] - the facade tying configuration, manager and dispatch
//!   together
//!
//! # Example
//!
//! ```rust
//! use mkb::{parser, KnowledgeBase};
//!
//! let config = "[[reasoner]]\ntype = \"Computable\"".parse().unwrap();
//! let kb = KnowledgeBase::new(&config).unwrap();
//!
//! let goal = parser::parse("member(X, [a, b, c])").unwrap();
//! for answer in kb.submit_query(goal, 64) {
//!     println!("{}", answer.substitution());
//! }
//! ```

pub mod error;
pub mod formula;
pub mod kb;
pub mod parser;
pub mod query;
pub mod reasoner;
pub mod term;
pub mod worker;

// Re-export the core vocabulary
pub use crate::error::{QueryError, QueryResult, ReasonerError, ReasonerResult};
pub use crate::formula::{
    ComparisonOperator, ConnectiveKind, Formula, FramedLiteral, ModalOperator, TimeInterval,
};
pub use crate::kb::{KnowledgeBase, DEFAULT_STREAM_CAPACITY};
pub use crate::parser::{parse, parse_constant, parse_predicate, parse_raw_atom, PrefixRegistry, QueryParser};
pub use crate::query::{ActiveQuery, Answer, AnswerStream, Channel, Query};
pub use crate::reasoner::{
    ComputedReasoner, DataFile, DataFileHandlers, PluginCapabilities, Reasoner,
    ReasonerConfiguration, ReasonerFactory, ReasonerInit, ReasonerManager, ReasonerPlugin,
    TypedReasonerFactory,
};
pub use crate::term::{
    Compound, ListTerm, PredicateIndicator, Reversible, Substitution, Term, Unifier, Variable,
};
pub use crate::worker::{Runner, StopToken, TaskHandle, ThreadPool, WorkerHooks};

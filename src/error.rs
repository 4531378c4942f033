//! Error types for mkb
//!
//! Two error domains cross the public API boundary:
//!
//! - [`QueryError`] - surface syntax errors, unrecognized modal options and
//!   unknown IRI prefixes raised by the query parser. Always surfaced to the
//!   caller.
//! - [`ReasonerError`] - reasoner manager and plugin lifecycle failures,
//!   surfaced to the caller of `load_reasoner`.
//!
//! Unification failure is *not* an error: merges report `false` and callers
//! roll back via the journal. Soft conditions (malformed data sources,
//! unknown data-file formats, list-valued setting nodes) are logged with
//! `tracing` and execution continues.

use thiserror::Error;

/// Errors raised while parsing the query surface syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The input did not match the query grammar, or trailing garbage
    /// remained after a full-input parse.
    #[error("Query string ({0}) has invalid syntax.")]
    InvalidSyntax(String),

    /// An `ns:name` atom referenced a namespace alias that is not known to
    /// the prefix registry.
    #[error("Cannot construct IRI for '{name}': IRI prefix '{prefix}' is not registered!")]
    UnknownPrefix { prefix: String, name: String },

    /// A modal operator option list contained a duplicate assignment, an
    /// unknown key, or a value of the wrong type.
    #[error("Unrecognized option ({0}) in modal operator.")]
    UnrecognizedOption(String),
}

/// A result type for parser entry points.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Errors raised by the reasoner manager and the plugin lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReasonerError {
    /// Neither a plugin nor a built-in factory could be resolved for a
    /// reasoner configuration.
    #[error("failed to load a reasoner.")]
    NoFactory,

    /// A plugin library could not be opened or its entry points did not
    /// resolve.
    #[error("failed to open reasoner library at path '{0}'.")]
    PluginLoad(String),
}

/// A result type for manager operations.
pub type ReasonerResult<T> = std::result::Result<T, ReasonerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_messages() {
        assert_eq!(
            QueryError::InvalidSyntax("p,".into()).to_string(),
            "Query string (p,) has invalid syntax."
        );
        assert_eq!(
            QueryError::UnknownPrefix { prefix: "foo".into(), name: "Bar".into() }.to_string(),
            "Cannot construct IRI for 'Bar': IRI prefix 'foo' is not registered!"
        );
        assert_eq!(
            QueryError::UnrecognizedOption("=(foo, fred)".into()).to_string(),
            "Unrecognized option (=(foo, fred)) in modal operator."
        );
    }

    #[test]
    fn reasoner_error_messages() {
        assert_eq!(ReasonerError::NoFactory.to_string(), "failed to load a reasoner.");
        assert_eq!(
            ReasonerError::PluginLoad("libfoo.so".into()).to_string(),
            "failed to open reasoner library at path 'libfoo.so'."
        );
    }
}

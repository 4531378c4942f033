//! Reasoner contract and configuration
//!
//! Every reasoning backend implements the [`Reasoner`] trait. The
//! callbacks (`start_query`, `push_substitution`, `finish_query`) run on
//! the caller's thread and must return promptly: heavy work belongs on a
//! worker pool, and the only completion signal visible to the reader of a
//! query is the end-of-stream marker on its answer channel. Backends never
//! panic across this boundary; they report trouble by logging and by
//! closing their channels.
//!
//! [`ReasonerConfiguration`] is the flattened form of the property tree a
//! backend is configured from; [`DataFile`] and [`DataFileHandlers`] cover
//! the data-source hook every backend exposes.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use fnv::FnvHashMap;
use tracing::{debug, warn};

use crate::formula::Formula;
use crate::query::Channel;
use crate::term::{Compound, PredicateIndicator, Substitution, Term};

mod computed;
mod manager;
mod plugin;

pub use computed::{AnswerPublisher, ComputableFn, ComputedReasoner};
pub use manager::ReasonerManager;
pub use plugin::{register_plugin, PluginCapabilities, ReasonerPlugin};

/// A data source descriptor handed to a backend: a file path plus a format
/// label. The empty format means the format is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    path: String,
    format: String,
}

impl DataFile {
    pub fn new(path: impl Into<String>, format: impl Into<String>) -> Self {
        DataFile { path: path.into(), format: format.into() }
    }

    pub fn with_unknown_format(path: impl Into<String>) -> Self {
        DataFile::new(path, "")
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn has_unknown_format(&self) -> bool {
        self.format.is_empty()
    }
}

/// A loader callback for one data-file format.
pub type DataFileLoader = Box<dyn Fn(&DataFile) -> bool + Send + Sync>;

/// Format-to-loader registrations of a backend.
#[derive(Default)]
pub struct DataFileHandlers {
    handlers: FnvHashMap<String, DataFileLoader>,
}

impl DataFileHandlers {
    pub fn new() -> Self {
        DataFileHandlers::default()
    }

    /// Register a loader for `format`, replacing any previous one.
    pub fn add(
        &mut self,
        format: impl Into<String>,
        loader: impl Fn(&DataFile) -> bool + Send + Sync + 'static,
    ) {
        self.handlers.insert(format.into(), Box::new(loader));
    }

    pub fn get(&self, format: &str) -> Option<&DataFileLoader> {
        self.handlers.get(format)
    }
}

impl fmt::Debug for DataFileHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFileHandlers")
            .field("formats", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An interface for reasoning subsystems.
///
/// `load_config` is called exactly once per instance, before the instance
/// joins the manager's pool. The query callbacks may then be invoked from
/// any thread; implementations guard their own state.
pub trait Reasoner: Send + Sync {
    /// Load the instance configuration. Returning `false` drops the
    /// instance with a warning.
    fn load_config(&mut self, cfg: &ReasonerConfiguration) -> bool;

    /// Whether this backend can evaluate `functor/arity`.
    fn is_current_predicate(&self, indicator: &PredicateIndicator) -> bool;

    /// Begin evaluating a query. Non-blocking; answers for `goal` and for
    /// every pushed instance of it are published on `channel`.
    fn start_query(&self, query_id: u32, channel: Channel, goal: Arc<Formula>);

    /// Supply an additional instantiation of the query goal. May be called
    /// many times in quick succession after `start_query`; each call
    /// spawns at most one additional evaluation of `apply(goal, sub)`.
    fn push_substitution(&self, query_id: u32, substitution: Arc<Substitution>);

    /// No further substitutions will arrive. With `immediate`, in-flight
    /// work should be cancelled as soon as practical; otherwise it drains.
    /// Non-blocking; the final downstream action is end-of-stream on the
    /// query channel.
    fn finish_query(&self, query_id: u32, immediate: bool);

    /// Hook for wrapping a goal in a backend-specific meta-predicate
    /// before evaluation. The default is the identity.
    fn transform_query(&self, goal: Arc<Formula>) -> Arc<Formula> {
        goal
    }

    /// The backend's data-file format registrations, if it has any.
    fn data_file_handlers(&self) -> Option<&DataFileHandlers> {
        None
    }

    /// Fallback for data files whose format is unknown.
    fn load_data_file_with_unknown_format(&self, _file: &DataFile) -> bool {
        false
    }

    /// Dispatch a data file to the loader registered for its format. A
    /// missing loader is a warning, not an error.
    fn load_data_file(&self, file: &DataFile) -> bool {
        if file.has_unknown_format() {
            return self.load_data_file_with_unknown_format(file);
        }
        match self.data_file_handlers().and_then(|h| h.get(file.format())) {
            Some(loader) => {
                debug!(path = file.path(), format = file.format(), "loading data file");
                loader(file)
            }
            None => {
                warn!(format = file.format(), "ignoring data file with unknown format");
                false
            }
        }
    }
}

impl std::fmt::Debug for dyn Reasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Reasoner").finish_non_exhaustive()
    }
}

/// Creates reasoner instances of one registered type.
pub trait ReasonerFactory: Send + Sync {
    /// The stable type name of the instances this factory creates.
    fn name(&self) -> &str;

    fn create(&self, id: &str) -> Box<dyn Reasoner>;
}

/// Construction entry point for reasoner types usable with
/// [`TypedReasonerFactory`] and the plugin macro: a single-argument
/// constructor taking the instance id.
pub trait ReasonerInit: Reasoner + Sized + 'static {
    fn with_id(id: &str) -> Self;
}

/// A factory for any [`ReasonerInit`] type.
pub struct TypedReasonerFactory<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ReasonerInit> TypedReasonerFactory<T> {
    pub fn new(name: impl Into<String>) -> Self {
        TypedReasonerFactory { name: name.into(), _marker: PhantomData }
    }
}

impl<T: ReasonerInit> ReasonerFactory for TypedReasonerFactory<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, id: &str) -> Box<dyn Reasoner> {
        Box::new(T::with_id(id))
    }
}

/// A factory backed by a closure; convenient for tests and embedders.
pub struct FnReasonerFactory {
    name: String,
    create: Box<dyn Fn(&str) -> Box<dyn Reasoner> + Send + Sync>,
}

impl FnReasonerFactory {
    pub fn new(
        name: impl Into<String>,
        create: impl Fn(&str) -> Box<dyn Reasoner> + Send + Sync + 'static,
    ) -> Self {
        FnReasonerFactory { name: name.into(), create: Box::new(create) }
    }
}

impl ReasonerFactory for FnReasonerFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, id: &str) -> Box<dyn Reasoner> {
        (self.create)(id)
    }
}

/// A reasoner instance configuration, flattened from a property tree.
///
/// Nested keys are joined into `key1 : key2` compound terms with the `:`
/// functor; leaf values become string terms. Children of `data-sources`
/// that carry a `file` value become [`DataFile`]s.
#[derive(Debug, Default)]
pub struct ReasonerConfiguration {
    pub settings: Vec<(Term, Term)>,
    pub data_files: Vec<DataFile>,
}

impl ReasonerConfiguration {
    /// Flatten a property tree.
    pub fn from_value(config: &toml::Value) -> Self {
        let mut cfg = ReasonerConfiguration::default();
        if let Some(table) = config.as_table() {
            for (key, value) in table {
                if key == "data-sources" {
                    cfg.load_data_sources(value);
                    continue;
                }
                cfg.load_settings(Term::atom(key.as_str()), value);
            }
        }
        cfg
    }

    /// Look up a top-level scalar setting by key.
    pub fn string_setting(&self, name: &str) -> Option<&str> {
        let key = Term::atom(name);
        self.settings.iter().find(|(k, _)| *k == key).and_then(|(_, v)| v.text())
    }

    fn load_settings(&mut self, key: Term, value: &toml::Value) {
        match value {
            toml::Value::Table(table) => {
                for (child_key, child_value) in table {
                    let nested = Term::compound(":", vec![key.clone(), Term::atom(child_key.as_str())]);
                    self.load_settings(nested, child_value);
                }
            }
            toml::Value::Array(_) => {
                // list semantics are undefined; skipped on purpose
                warn!(key = %key, "ignoring list-valued setting");
            }
            leaf => {
                self.settings.push((key, Term::string(scalar_to_string(leaf))));
            }
        }
    }

    fn load_data_sources(&mut self, value: &toml::Value) {
        let Some(entries) = value.as_array() else {
            warn!("ignoring malformed \"data-sources\" value");
            return;
        };
        for entry in entries {
            match entry.get("file").and_then(toml::Value::as_str) {
                Some(file) => {
                    let format = entry
                        .get("format")
                        .and_then(toml::Value::as_str)
                        .unwrap_or_default();
                    self.data_files.push(DataFile::new(file, format));
                }
                None => warn!("ignoring data source without \"file\" key"),
            }
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(v) => v.to_string(),
        toml::Value::Float(v) => v.to_string(),
        toml::Value::Boolean(v) => v.to_string(),
        toml::Value::Datetime(v) => v.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => String::new(),
    }
}

// A goal's dispatch target is the predicate at its core; modal wrappers
// are carried structurally and left to the backend.
pub(crate) fn goal_predicate(goal: &Formula) -> Option<&Arc<Compound>> {
    goal.innermost_predicate()
}

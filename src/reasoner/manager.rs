//! Reasoner manager
//!
//! Owns the factory registry (built-ins plus plugin-provided), the plugin
//! registry keyed by library path, and the pool of live reasoner
//! instances. Registries are read during every query dispatch and written
//! only while loading, so they sit behind reader-writer locks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use fnv::FnvHashMap;
use tracing::{info, warn};

use crate::error::{ReasonerError, ReasonerResult};
use crate::term::PredicateIndicator;

use super::{
    ComputedReasoner, Reasoner, ReasonerConfiguration, ReasonerFactory, ReasonerPlugin,
    TypedReasonerFactory,
};

/// Loads, registers and dispatches reasoner backends.
pub struct ReasonerManager {
    factories: RwLock<FnvHashMap<String, Arc<dyn ReasonerFactory>>>,
    plugins: RwLock<FnvHashMap<String, Arc<ReasonerPlugin>>>,
    pool: RwLock<Vec<Arc<dyn Reasoner>>>,
    index: AtomicU32,
}

impl Default for ReasonerManager {
    fn default() -> Self {
        ReasonerManager::new()
    }
}

impl ReasonerManager {
    /// A manager with the built-in factories registered.
    pub fn new() -> Self {
        let manager = ReasonerManager {
            factories: RwLock::new(FnvHashMap::default()),
            plugins: RwLock::new(FnvHashMap::default()),
            pool: RwLock::new(Vec::new()),
            index: AtomicU32::new(0),
        };
        manager.add_factory(
            "Computable",
            Arc::new(TypedReasonerFactory::<ComputedReasoner>::new("Computable")),
        );
        manager
    }

    /// Register a factory under a type name.
    pub fn add_factory(&self, type_name: &str, factory: Arc<dyn ReasonerFactory>) {
        self.factories
            .write()
            .expect("factory registry lock poisoned")
            .insert(type_name.to_string(), factory);
    }

    /// Load a reasoner instance from a configuration subtree.
    ///
    /// The factory is resolved from the `lib` key (a plugin path) in
    /// preference to the `type` key (a built-in type name). A `lib` path
    /// that cannot be opened raises [`ReasonerError::PluginLoad`]; an
    /// unknown type name, or a config missing both keys, warns and raises
    /// [`ReasonerError::NoFactory`]. The instance id is the `name` key
    /// when present, otherwise the factory name suffixed with the running
    /// index. A configuration the instance rejects is a warning: the
    /// instance is dropped and `Ok(None)` returned. The index advances
    /// regardless of the outcome.
    pub fn load_reasoner(&self, config: &toml::Value) -> ReasonerResult<Option<Arc<dyn Reasoner>>> {
        let lib = config.get("lib").and_then(toml::Value::as_str);
        let type_name = config.get("type").and_then(toml::Value::as_str);
        let name = config.get("name").and_then(toml::Value::as_str);

        let result = self.load_with_factory(lib, type_name, name, config);
        self.index.fetch_add(1, Ordering::Relaxed);
        result
    }

    fn load_with_factory(
        &self,
        lib: Option<&str>,
        type_name: Option<&str>,
        name: Option<&str>,
        config: &toml::Value,
    ) -> ReasonerResult<Option<Arc<dyn Reasoner>>> {
        let factory: Arc<dyn ReasonerFactory> = if let Some(path) = lib {
            match self.load_plugin(path) {
                Some(plugin) => plugin,
                None => return Err(ReasonerError::PluginLoad(path.to_string())),
            }
        } else if let Some(type_name) = type_name {
            match self
                .factories
                .read()
                .expect("factory registry lock poisoned")
                .get(type_name)
                .cloned()
            {
                Some(factory) => factory,
                None => {
                    warn!(type_name, "no factory registered for reasoner type");
                    return Err(ReasonerError::NoFactory);
                }
            }
        } else {
            warn!("missing 'type' or 'lib' key in reasoner config");
            return Err(ReasonerError::NoFactory);
        };

        let id = match name {
            Some(name) => name.to_string(),
            None => format!("{}{}", factory.name(), self.index.load(Ordering::Relaxed)),
        };
        info!(id = %id, factory = factory.name(), "using reasoner");

        let mut reasoner = factory.create(&id);
        let cfg = ReasonerConfiguration::from_value(config);
        if !reasoner.load_config(&cfg) {
            warn!(id = %id, "reasoner failed to load its configuration");
            return Ok(None);
        }

        let reasoner: Arc<dyn Reasoner> = Arc::from(reasoner);
        self.pool
            .write()
            .expect("reasoner pool lock poisoned")
            .push(Arc::clone(&reasoner));
        Ok(Some(reasoner))
    }

    /// Resolve a plugin by path. Each path is probed once; both successes
    /// and failures are cached.
    pub fn load_plugin(&self, path: &str) -> Option<Arc<ReasonerPlugin>> {
        if let Some(plugin) = self
            .plugins
            .read()
            .expect("plugin registry lock poisoned")
            .get(path)
        {
            if plugin.is_loaded() {
                return Some(Arc::clone(plugin));
            }
            warn!(path, "failed to open reasoner library");
            return None;
        }

        let plugin = Arc::new(ReasonerPlugin::open(path));
        self.plugins
            .write()
            .expect("plugin registry lock poisoned")
            .insert(path.to_string(), Arc::clone(&plugin));
        if plugin.is_loaded() {
            Some(plugin)
        } else {
            warn!(path, "failed to open reasoner library");
            None
        }
    }

    /// The pool members able to evaluate `indicator`.
    pub fn get_for_predicate(&self, indicator: &PredicateIndicator) -> Vec<Arc<dyn Reasoner>> {
        self.pool
            .read()
            .expect("reasoner pool lock poisoned")
            .iter()
            .filter(|r| r.is_current_predicate(indicator))
            .cloned()
            .collect()
    }

    /// Detach an instance from the pool. Outstanding queries are not
    /// terminated; callers finish them first.
    pub fn remove_reasoner(&self, reasoner: &Arc<dyn Reasoner>) {
        self.pool
            .write()
            .expect("reasoner pool lock poisoned")
            .retain(|r| !Arc::ptr_eq(r, reasoner));
    }

    /// A snapshot of the current instance pool.
    pub fn reasoners(&self) -> Vec<Arc<dyn Reasoner>> {
        self.pool.read().expect("reasoner pool lock poisoned").clone()
    }
}

impl std::fmt::Debug for ReasonerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasonerManager")
            .field("reasoners", &self.pool.read().map(|p| p.len()).unwrap_or(0))
            .finish()
    }
}

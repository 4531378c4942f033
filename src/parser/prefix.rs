//! IRI prefix registry
//!
//! Maps namespace aliases to IRI prefixes so the query surface syntax can
//! write `owl:Thing` instead of a full IRI. The registry is the injection
//! point the parser uses to expand `ns:name` atoms; a process-wide default
//! instance carries the common semantic-web vocabularies.

use std::sync::{Arc, OnceLock, RwLock};

use indexmap::IndexMap;
use tracing::debug;

/// An ordered, thread-safe alias-to-IRI map.
#[derive(Debug, Default)]
pub struct PrefixRegistry {
    alias_to_uri: RwLock<IndexMap<String, String>>,
    uri_to_alias: RwLock<IndexMap<String, String>>,
}

impl PrefixRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PrefixRegistry::default()
    }

    /// A registry pre-loaded with the common vocabularies.
    pub fn with_defaults() -> Self {
        let registry = PrefixRegistry::new();
        registry.register("owl", "http://www.w3.org/2002/07/owl");
        registry.register("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns");
        registry.register("rdfs", "http://www.w3.org/2000/01/rdf-schema");
        registry.register("xsd", "http://www.w3.org/2001/XMLSchema");
        registry.register("dul", "http://www.ontologydesignpatterns.org/ont/dul/DUL.owl");
        registry
    }

    /// The process-wide default registry.
    pub fn global() -> &'static Arc<PrefixRegistry> {
        static GLOBAL: OnceLock<Arc<PrefixRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(PrefixRegistry::with_defaults()))
    }

    /// Register `alias` for `uri`. A trailing `#` on the IRI is stripped so
    /// both spellings map to the same prefix.
    pub fn register(&self, alias: &str, uri: &str) {
        let uri = uri.strip_suffix('#').unwrap_or(uri);
        debug!(alias, uri, "registered IRI prefix");
        self.alias_to_uri
            .write()
            .expect("prefix registry lock poisoned")
            .insert(alias.to_string(), uri.to_string());
        self.uri_to_alias
            .write()
            .expect("prefix registry lock poisoned")
            .insert(uri.to_string(), alias.to_string());
    }

    pub fn alias_to_uri(&self, alias: &str) -> Option<String> {
        self.alias_to_uri
            .read()
            .expect("prefix registry lock poisoned")
            .get(alias)
            .cloned()
    }

    pub fn uri_to_alias(&self, uri: &str) -> Option<String> {
        let uri = uri.strip_suffix('#').unwrap_or(uri);
        self.uri_to_alias
            .read()
            .expect("prefix registry lock poisoned")
            .get(uri)
            .cloned()
    }

    /// Expand `alias:entity` into a full IRI, or `None` when the alias is
    /// unknown.
    pub fn expand(&self, alias: &str, entity: &str) -> Option<String> {
        self.alias_to_uri(alias).map(|uri| format!("{}#{}", uri, entity))
    }
}

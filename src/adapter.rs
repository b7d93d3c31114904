//! Adapter orchestrating resolver, source and serializer to answer
//! legacy-shaped requests.
//!
//! Errors stay transport-agnostic here; mapping to HTTP status codes is
//! the web layer's job. The adapter only collapses resolver/source
//! misses into a single `NotFound` category and rewraps transient
//! storage failures as `TemporarilyUnavailable`, mirroring what the
//! legacy toolchain distinguished.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::error::CompatError;
use crate::model::Document;
use crate::resolver::{AliasResolver, AliasTable};
use crate::serializer::Serializer;
use crate::source::{Fragment, IndexableSource};
use crate::IncludeMode;

/// Startup configuration supplied by the configuration-loading layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatConfig {
    pub include_mode: IncludeMode,
    #[serde(default = "default_aliases")]
    pub aliases: AliasTable,
}

fn default_aliases() -> AliasTable {
    AliasTable::default()
}

impl Default for CompatConfig {
    fn default() -> Self {
        CompatConfig {
            include_mode: IncludeMode::Reference,
            aliases: AliasTable::default(),
        }
    }
}

impl CompatConfig {
    pub fn from_json(json: &str) -> Result<Self, CompatError> {
        serde_json::from_str(json)
            .map_err(|e| CompatError::Parse { reason: format!("config: {e}") })
    }
}

/// Summary of one canonical category for management tooling.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryMeta {
    pub name: String,
    /// Legacy directory names this category is known as.
    pub aliases: Vec<String>,
    pub total_count: usize,
}

/// Orchestrates legacy-shaped requests end-to-end. Stateless apart from
/// the reloadable alias table, so a single instance serves concurrent
/// callers.
pub struct Adapter<S: IndexableSource> {
    source: S,
    serializer: Serializer,
    resolver: RwLock<Arc<AliasResolver>>,
    include_mode: IncludeMode,
}

impl<S: IndexableSource> Adapter<S> {
    pub fn new(config: CompatConfig, source: S) -> Self {
        Adapter {
            source,
            serializer: Serializer::new(),
            resolver: RwLock::new(Arc::new(AliasResolver::new(config.aliases))),
            include_mode: config.include_mode,
        }
    }

    /// Serve a fragment by legacy path, verbatim. Fragments are already
    /// XML; no transformation happens on this path.
    pub fn serve_fragment(&self, legacy_path: &str) -> Result<Fragment, CompatError> {
        debug!("serving fragment for legacy path {legacy_path:?}");
        let key = match self.current_resolver().resolve(legacy_path) {
            Ok(key) => key,
            Err(err @ (CompatError::UnknownCategory { .. }
            | CompatError::InvalidIdentifier { .. })) => {
                debug!("path {legacy_path:?} did not resolve: {err}");
                return Err(CompatError::NotFound { key: legacy_path.to_string() });
            }
            Err(other) => return Err(other),
        };

        match self.source.fetch(&key) {
            Ok(fragment) => {
                debug!("fragment {key} served, hash {}", fragment.meta.hash);
                Ok(fragment)
            }
            Err(CompatError::SourceUnavailable { key, reason }) => {
                warn!("source unavailable for {key}: {reason}");
                Err(CompatError::TemporarilyUnavailable { key, reason })
            }
            Err(other) => Err(other),
        }
    }

    /// Interpret a legacy XML submission into the internal model.
    /// Parse and deprecation errors surface unchanged.
    pub fn ingest_submission(&self, xml: &str) -> Result<Document, CompatError> {
        self.serializer.from_xml(xml)
    }

    /// Render a document as xml2rfc XML with an explicit include mode.
    pub fn render_document(
        &self,
        doc: &Document,
        mode: IncludeMode,
    ) -> Result<String, CompatError> {
        let resolver = self.current_resolver();
        self.serializer.to_xml(doc, mode, &resolver, &self.source)
    }

    /// Render with the configured default include mode.
    pub fn render_document_default(&self, doc: &Document) -> Result<String, CompatError> {
        self.render_document(doc, self.include_mode)
    }

    /// Emulate a legacy directory listing for a category.
    pub fn list_directory(&self, legacy_category: &str) -> Result<Vec<String>, CompatError> {
        let key = self.current_resolver().resolve_category(legacy_category)?;
        self.source.list(&key)
    }

    /// Overview of every canonical category: aliases and fragment counts.
    pub fn directory_overview(&self) -> Result<Vec<DirectoryMeta>, CompatError> {
        let resolver = self.current_resolver();
        let mut overview = Vec::new();
        for key in resolver.canonical_keys() {
            overview.push(DirectoryMeta {
                aliases: resolver.aliases_of(&key),
                total_count: self.source.list(&key)?.len(),
                name: key,
            });
        }
        Ok(overview)
    }

    /// Atomically swap in a new alias table. The new resolver is fully
    /// built before it becomes visible; in-flight calls keep the table
    /// they started with.
    pub fn reload_aliases(&self, table: AliasTable) {
        let resolver = Arc::new(AliasResolver::new(table));
        info!("reloading alias table");
        *self.resolver.write().expect("alias table lock poisoned") = resolver;
    }

    fn current_resolver(&self) -> Arc<AliasResolver> {
        self.resolver.read().expect("alias table lock poisoned").clone()
    }
}

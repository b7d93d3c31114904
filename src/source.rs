//! Indexable fragment sources.
//!
//! A source hands out includable XML fragments (bibliographic reference
//! entries, boilerplate blocks) by resolved key, and enumerates a
//! category in stable order to emulate legacy directory listings.
//! Fragments are content-addressed: a fragment is immutable under a
//! given key+hash, and updates publish a new hash.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::CompatError;
use crate::resolver::ResolvedKey;

/// Metadata accompanying fragment content. The hash lets callers build
/// conditional-fetch (If-Modified / ETag-style) behavior without
/// re-reading content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentMeta {
    pub category: String,
    pub key: String,
    /// Lowercase hex sha256 of the content.
    pub hash: String,
    pub last_modified: DateTime<Utc>,
}

/// An includable XML snippet together with its metadata. Content is
/// well-formed XML fit to embed as a child of a reference/boilerplate
/// container element; that is the publishing contract, not something
/// this layer re-validates on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub content: Vec<u8>,
    pub meta: FragmentMeta,
}

/// Result of a conditional fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fresh(Fragment),
    NotModified { hash: String },
}

/// Lookup service over indexed fragments.
///
/// `fetch` and `list` may delegate to storage I/O internally; callers
/// needing timeouts apply them around these calls. Storage failures
/// surface as `SourceUnavailable` (retryable), never as `NotFound`.
pub trait IndexableSource: Send + Sync {
    fn fetch(&self, key: &ResolvedKey) -> Result<Fragment, CompatError>;

    /// Stable enumeration of fragment identifiers in a canonical
    /// category, sorted. Each call re-enumerates.
    fn list(&self, category: &str) -> Result<Vec<String>, CompatError>;

    /// Fetch only if the stored hash differs from `known_hash`.
    fn fetch_if_modified(
        &self,
        key: &ResolvedKey,
        known_hash: Option<&str>,
    ) -> Result<FetchOutcome, CompatError> {
        let fragment = self.fetch(key)?;
        match known_hash {
            Some(hash) if hash == fragment.meta.hash => {
                Ok(FetchOutcome::NotModified { hash: fragment.meta.hash })
            }
            _ => Ok(FetchOutcome::Fresh(fragment)),
        }
    }
}

pub fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{digest:x}")
}

#[derive(Debug, Clone)]
struct StoredFragment {
    content: Vec<u8>,
    hash: String,
    last_modified: DateTime<Utc>,
}

/// In-memory source keyed by category and fragment identifier.
///
/// Backs tests and the demo binary; production deployments put the real
/// storage index behind the same trait. Invalidation is push-based:
/// publishing under an existing identifier replaces content and hash in
/// one step.
#[derive(Debug, Default)]
pub struct MemorySource {
    categories: RwLock<HashMap<String, BTreeMap<String, StoredFragment>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    /// Publish a fragment under `category`/`id`. Returns the content hash.
    pub fn publish(&self, category: &str, id: &str, xml: &str) -> String {
        let hash = content_hash(xml.as_bytes());
        debug!("publishing fragment {category}:{id} hash {hash}");
        let mut categories = self.categories.write().expect("source index lock poisoned");
        categories.entry(category.to_string()).or_default().insert(
            id.to_string(),
            StoredFragment {
                content: xml.as_bytes().to_vec(),
                hash: hash.clone(),
                last_modified: Utc::now(),
            },
        );
        hash
    }
}

impl IndexableSource for MemorySource {
    fn fetch(&self, key: &ResolvedKey) -> Result<Fragment, CompatError> {
        let categories = self.categories.read().expect("source index lock poisoned");
        let stored = categories
            .get(&key.category)
            .and_then(|fragments| fragments.get(&key.id))
            .ok_or_else(|| CompatError::NotFound { key: key.lookup_key() })?;
        Ok(Fragment {
            content: stored.content.clone(),
            meta: FragmentMeta {
                category: key.category.clone(),
                key: key.id.clone(),
                hash: stored.hash.clone(),
                last_modified: stored.last_modified,
            },
        })
    }

    fn list(&self, category: &str) -> Result<Vec<String>, CompatError> {
        let categories = self.categories.read().expect("source index lock poisoned");
        Ok(categories
            .get(category)
            .map(|fragments| fragments.keys().cloned().collect())
            .unwrap_or_default())
    }
}

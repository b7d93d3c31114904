//! Alias resolution: maps legacy xml2rfc directory-style paths onto
//! canonical lookup keys of the modern source index.
//!
//! The legacy toolchain addressed includable fragments through a fixed
//! directory convention (`bibxml/reference.RFC.2119.xml` and friends).
//! The alias table replaces that implicit filesystem convention with an
//! explicit, testable pure function from legacy path to canonical key.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::CompatError;

/// One alias table entry: a legacy category pattern (optionally with a
/// sub-path segment) mapped to a canonical category key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub pattern: String,
    pub key: String,
}

/// Read-only mapping table from legacy directory names to canonical
/// category keys. Several legacy names may map to the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasTable {
    pub entries: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn from_json(json: &str) -> Result<Self, CompatError> {
        serde_json::from_str(json)
            .map_err(|e| CompatError::Parse { reason: format!("alias table: {e}") })
    }
}

impl Default for AliasTable {
    /// Built-in table covering the historical xml2rfc directory set.
    fn default() -> Self {
        let entries = [
            ("normative-reference-set", "ref"),
            ("informative-reference-set", "ref"),
            ("bibxml", "ref"),
            ("internet-draft-set", "ids"),
            ("bibxml3", "ids"),
            ("boilerplate-set", "boilerplate"),
            ("boilerplate", "boilerplate"),
        ];
        AliasTable {
            entries: entries
                .iter()
                .map(|(pattern, key)| AliasEntry {
                    pattern: (*pattern).to_string(),
                    key: (*key).to_string(),
                })
                .collect(),
        }
    }
}

/// Canonical lookup key understood by the source index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedKey {
    pub category: String,
    pub id: String,
}

impl ResolvedKey {
    /// Rendering used by the source index, e.g. `ref:rfc2119`.
    pub fn lookup_key(&self) -> String {
        format!("{}:{}", self.category, self.id)
    }
}

impl fmt::Display for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.id)
    }
}

/// Pure resolver over an immutable alias table. No I/O, no side effects;
/// safe to share across threads.
#[derive(Debug)]
pub struct AliasResolver {
    /// Entries sorted by pattern length, longest first.
    entries: Vec<AliasEntry>,
    series_id: Regex,
    numeric_id: Regex,
    plain_id: Regex,
}

impl AliasResolver {
    pub fn new(table: AliasTable) -> Self {
        let mut entries = table.entries;
        entries.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
        AliasResolver {
            entries,
            // "rfc2119", "rfc.2119", "rfc-2119", "rfc_2119", with or
            // without zero padding
            series_id: Regex::new(r"^([a-z]+)[._-]?0*([0-9]+)$").expect("static pattern"),
            numeric_id: Regex::new(r"^0*([0-9]+)$").expect("static pattern"),
            plain_id: Regex::new(r"^[a-z0-9][a-z0-9._-]*$").expect("static pattern"),
        }
    }

    /// Resolve a legacy `<category>/<identifier>` path to a canonical key.
    ///
    /// Longest-prefix match on the category part; the identifier is then
    /// normalized so all historical spellings of the same reference
    /// converge on one key.
    pub fn resolve(&self, legacy_path: &str) -> Result<ResolvedKey, CompatError> {
        let path = legacy_path.trim_matches('/');
        let entry = self.match_prefix(path).ok_or_else(|| CompatError::UnknownCategory {
            path: legacy_path.to_string(),
        })?;

        let rest = &path[entry.pattern.len()..];
        let raw_id = rest.trim_start_matches('/');
        if raw_id.is_empty() {
            return Err(CompatError::InvalidIdentifier {
                path: legacy_path.to_string(),
                reason: "missing identifier segment".to_string(),
            });
        }

        let id = self.normalize_identifier(raw_id).map_err(|reason| {
            CompatError::InvalidIdentifier { path: legacy_path.to_string(), reason }
        })?;

        Ok(ResolvedKey { category: entry.key.clone(), id })
    }

    /// Resolve a bare legacy category name (no identifier) to its
    /// canonical category key. Used for directory-listing emulation.
    pub fn resolve_category(&self, legacy_category: &str) -> Result<String, CompatError> {
        let category = legacy_category.trim_matches('/');
        self.match_prefix(category)
            .filter(|entry| entry.pattern == category)
            .map(|entry| entry.key.clone())
            .ok_or_else(|| CompatError::UnknownCategory { path: legacy_category.to_string() })
    }

    /// All canonical category keys, sorted.
    pub fn canonical_keys(&self) -> Vec<String> {
        let keys: BTreeSet<&str> = self.entries.iter().map(|e| e.key.as_str()).collect();
        keys.into_iter().map(String::from).collect()
    }

    /// Legacy directory names known for a canonical key, in table order.
    pub fn aliases_of(&self, key: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.pattern.clone())
            .collect();
        aliases.sort();
        aliases
    }

    /// Longest pattern that is a `/`-boundary prefix of `path`.
    fn match_prefix(&self, path: &str) -> Option<&AliasEntry> {
        self.entries.iter().find(|entry| {
            path.strip_prefix(entry.pattern.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Deterministic identifier normalization: case-fold, strip the
    /// `reference.` prefix and `.xml` suffix the legacy tool attached,
    /// collapse series separators, strip leading zeros.
    fn normalize_identifier(&self, raw: &str) -> Result<String, String> {
        let mut id = raw.to_lowercase();
        if let Some(stripped) = id.strip_prefix("reference.") {
            id = stripped.to_string();
        }
        if let Some(stripped) = id.strip_suffix(".xml") {
            id = stripped.to_string();
        }
        if id.is_empty() {
            return Err("identifier empty after normalization".to_string());
        }

        if let Some(caps) = self.series_id.captures(&id) {
            return Ok(format!("{}{}", &caps[1], &caps[2]));
        }
        if let Some(caps) = self.numeric_id.captures(&id) {
            return Ok(caps[1].to_string());
        }
        if self.plain_id.is_match(&id) {
            return Ok(id);
        }
        Err(format!("malformed identifier {raw:?}"))
    }
}

impl Default for AliasResolver {
    fn default() -> Self {
        AliasResolver::new(AliasTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_spellings_converge_on_one_key() {
        let resolver = AliasResolver::default();
        let spellings = [
            "normative-reference-set/RFC2119",
            "normative-reference-set/RFC0002119",
            "normative-reference-set/rfc.2119",
            "normative-reference-set/RFC-2119",
            "normative-reference-set/reference.RFC.2119.xml",
            "bibxml/reference.RFC.2119.xml",
        ];
        for path in spellings {
            let key = resolver.resolve(path).unwrap();
            assert_eq!(key.lookup_key(), "ref:rfc2119", "path {path}");
        }
    }

    #[test]
    fn resolution_is_idempotent_over_normalized_form() {
        let resolver = AliasResolver::default();
        let key = resolver.resolve("normative-reference-set/RFC0002119").unwrap();
        let renormalized = resolver
            .resolve(&format!("normative-reference-set/{}", key.id))
            .unwrap();
        assert_eq!(key, renormalized);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let resolver = AliasResolver::default();
        let err = resolver.resolve("nonexistent-category/123").unwrap_err();
        assert!(matches!(err, CompatError::UnknownCategory { .. }));
    }

    #[test]
    fn malformed_identifier_is_rejected() {
        let resolver = AliasResolver::default();
        let err = resolver.resolve("normative-reference-set/../etc").unwrap_err();
        assert!(matches!(err, CompatError::InvalidIdentifier { .. }));

        let err = resolver.resolve("normative-reference-set/").unwrap_err();
        assert!(matches!(err, CompatError::InvalidIdentifier { .. }));
    }

    #[test]
    fn longest_prefix_wins() {
        let table = AliasTable {
            entries: vec![
                AliasEntry { pattern: "bibxml".into(), key: "ref".into() },
                AliasEntry { pattern: "bibxml/ids".into(), key: "ids".into() },
            ],
        };
        let resolver = AliasResolver::new(table);
        let key = resolver.resolve("bibxml/ids/draft-foo-01").unwrap();
        assert_eq!(key.category, "ids");
        assert_eq!(key.id, "draft-foo-01");

        let key = resolver.resolve("bibxml/RFC2119").unwrap();
        assert_eq!(key.category, "ref");
    }

    #[test]
    fn informative_and_normative_sets_share_a_key() {
        let resolver = AliasResolver::default();
        let a = resolver.resolve("normative-reference-set/RFC2119").unwrap();
        let b = resolver.resolve("informative-reference-set/RFC2119").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn aliases_enumerate_legacy_names() {
        let resolver = AliasResolver::default();
        let aliases = resolver.aliases_of("ref");
        assert_eq!(
            aliases,
            vec!["bibxml", "informative-reference-set", "normative-reference-set"]
        );
    }

    #[test]
    fn category_only_resolution() {
        let resolver = AliasResolver::default();
        assert_eq!(resolver.resolve_category("bibxml").unwrap(), "ref");
        assert!(matches!(
            resolver.resolve_category("nonexistent-category"),
            Err(CompatError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn table_loads_from_json() {
        let json = r#"{"entries": [{"pattern": "custom-set", "key": "custom"}]}"#;
        let resolver = AliasResolver::new(AliasTable::from_json(json).unwrap());
        let key = resolver.resolve("custom-set/XYZ9").unwrap();
        assert_eq!(key.lookup_key(), "custom:xyz9");
    }
}

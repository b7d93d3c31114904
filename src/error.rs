use thiserror::Error;

/// Structured error taxonomy for the compatibility core.
///
/// Every variant carries the offending path/key/element so callers can
/// report it without re-deriving context. `SourceUnavailable` (and its
/// adapter-level rewrap `TemporarilyUnavailable`) is the only retryable
/// kind; all others are permanent for the given input.
#[derive(Debug, Error)]
pub enum CompatError {
    /// No alias table pattern matches the category segment of the path.
    #[error("unknown legacy category in path {path:?}")]
    UnknownCategory { path: String },

    /// The category matched, but the identifier segment does not survive
    /// normalization.
    #[error("invalid identifier in path {path:?}: {reason}")]
    InvalidIdentifier { path: String, reason: String },

    /// The resolved key has no fragment behind it.
    #[error("no fragment under key {key:?}")]
    NotFound { key: String },

    /// The storage layer behind the source failed; retryable.
    #[error("source unavailable for {key:?}: {reason}")]
    SourceUnavailable { key: String, reason: String },

    /// Adapter-level rewrap of `SourceUnavailable` for legacy callers.
    #[error("temporarily unavailable: {key:?}: {reason}")]
    TemporarilyUnavailable { key: String, reason: String },

    /// Malformed or structurally invalid xml2rfc input.
    #[error("cannot interpret submission: {reason}")]
    Parse { reason: String },

    /// Element from a retired schema generation; rejected, never passed through.
    #[error("deprecated element <{element}> is not accepted")]
    DeprecatedElement { element: String },

    /// A required RFC 7991 value has neither a source value nor a documented
    /// default.
    #[error("document is missing required field {field:?}")]
    IncompleteDocument { field: String },

    /// A reference entry could not be resolved to a fragment; serialization
    /// is all-or-nothing, so this aborts the whole call.
    #[error("unresolved reference {category}/{id}")]
    UnresolvedReference {
        category: String,
        id: String,
        #[source]
        source: Box<CompatError>,
    },

    /// A structural kind with no schema mapping entry. This is a
    /// configuration defect, not an input problem.
    #[error("no schema mapping for structural kind {kind:?}")]
    UnsupportedStructuralKind { kind: String },

    /// Serializer-internal failure (e.g. the underlying writer).
    #[error("internal serializer failure: {reason}")]
    Internal { reason: String },
}

impl CompatError {
    /// Whether a caller may retry the failed call with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompatError::SourceUnavailable { .. } | CompatError::TemporarilyUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_availability_errors_are_retryable() {
        assert!(CompatError::SourceUnavailable {
            key: "ref:rfc2119".into(),
            reason: "timeout".into(),
        }
        .is_retryable());
        assert!(CompatError::TemporarilyUnavailable {
            key: "ref:rfc2119".into(),
            reason: "timeout".into(),
        }
        .is_retryable());
        assert!(!CompatError::NotFound { key: "ref:rfc1".into() }.is_retryable());
        assert!(!CompatError::Parse { reason: "bad".into() }.is_retryable());
    }

    #[test]
    fn unresolved_reference_names_the_offender() {
        let err = CompatError::UnresolvedReference {
            category: "normative-reference-set".into(),
            id: "RFC2119".into(),
            source: Box::new(CompatError::NotFound { key: "ref:rfc2119".into() }),
        };
        let msg = err.to_string();
        assert!(msg.contains("normative-reference-set"));
        assert!(msg.contains("RFC2119"));
    }
}

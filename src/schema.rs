//! Mapping from internal structural kinds to RFC 7991 elements.
//!
//! The table is total over every kind the document model can produce
//! (except `Unknown`, which carries its own element name through). A
//! lookup miss is a configuration defect and aborts serialization.

use std::collections::HashMap;

use crate::model::StructuralKind;

/// How a kind's children are ordered on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOrder {
    /// Children serialize in input order.
    AsAuthored,
    /// Children sort by fragment key, unless the node opts into a
    /// custom order.
    SortedByKey,
}

/// Serialization rule for one structural kind.
#[derive(Debug, Clone)]
pub struct ElementRule {
    pub element: &'static str,
    /// Required RFC 7991 attributes with their documented defaults,
    /// written when the model carries no value.
    pub default_attrs: &'static [(&'static str, &'static str)],
    pub child_order: ChildOrder,
    /// Whether node text serializes as a `<name>` child (sections) or
    /// as element character data.
    pub text_as_name_child: bool,
}

/// Schema mapping table, keyed by `StructuralKind::kind_name`.
#[derive(Debug, Clone)]
pub struct SchemaMap {
    rules: HashMap<&'static str, ElementRule>,
}

impl SchemaMap {
    /// Empty table; only useful for exercising the lookup-miss path.
    pub fn empty() -> Self {
        SchemaMap { rules: HashMap::new() }
    }

    pub fn rule(&self, kind: &StructuralKind) -> Option<&ElementRule> {
        self.rules.get(kind.kind_name())
    }

    pub fn covers(&self, kind_name: &str) -> bool {
        self.rules.contains_key(kind_name)
    }
}

impl Default for SchemaMap {
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            "section",
            ElementRule {
                element: "section",
                default_attrs: &[("numbered", "true"), ("toc", "include")],
                child_order: ChildOrder::AsAuthored,
                text_as_name_child: true,
            },
        );
        rules.insert(
            "paragraph",
            ElementRule {
                element: "t",
                default_attrs: &[],
                child_order: ChildOrder::AsAuthored,
                text_as_name_child: false,
            },
        );
        rules.insert(
            "list",
            ElementRule {
                element: "ul",
                default_attrs: &[],
                child_order: ChildOrder::AsAuthored,
                text_as_name_child: false,
            },
        );
        rules.insert(
            "list-item",
            ElementRule {
                element: "li",
                default_attrs: &[],
                child_order: ChildOrder::AsAuthored,
                text_as_name_child: false,
            },
        );
        rules.insert(
            "code-block",
            ElementRule {
                element: "sourcecode",
                default_attrs: &[],
                child_order: ChildOrder::AsAuthored,
                text_as_name_child: false,
            },
        );
        rules.insert(
            "table",
            ElementRule {
                element: "table",
                default_attrs: &[],
                child_order: ChildOrder::AsAuthored,
                text_as_name_child: true,
            },
        );
        rules.insert(
            "reference-section",
            ElementRule {
                element: "references",
                default_attrs: &[],
                child_order: ChildOrder::SortedByKey,
                text_as_name_child: true,
            },
        );
        rules.insert(
            "reference-entry",
            ElementRule {
                element: "xi:include",
                default_attrs: &[],
                child_order: ChildOrder::AsAuthored,
                text_as_name_child: false,
            },
        );
        SchemaMap { rules }
    }
}

/// Elements from retired schema generations. These are rejected on
/// input rather than passed through, so legacy v2 documents fail loudly
/// instead of producing silently broken drafts.
pub const DEPRECATED_ELEMENTS: &[&str] = &[
    "list",
    "texttable",
    "ttcol",
    "c",
    "facts",
    "preamble",
    "postamble",
    "spanx",
    "vspace",
];

pub fn is_deprecated_element(name: &str) -> bool {
    DEPRECATED_ELEMENTS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_total_over_mapped_kinds() {
        let schema = SchemaMap::default();
        for kind_name in StructuralKind::MAPPED_KINDS {
            assert!(schema.covers(kind_name), "no rule for kind {kind_name}");
        }
    }

    #[test]
    fn reference_sections_sort_by_key() {
        let schema = SchemaMap::default();
        let rule = schema
            .rule(&StructuralKind::ReferenceSection { custom_order: false })
            .unwrap();
        assert_eq!(rule.element, "references");
        assert_eq!(rule.child_order, ChildOrder::SortedByKey);
    }

    #[test]
    fn v2_vocabulary_is_deprecated() {
        for element in ["list", "spanx", "vspace", "texttable"] {
            assert!(is_deprecated_element(element));
        }
        assert!(!is_deprecated_element("ul"));
        assert!(!is_deprecated_element("section"));
    }
}

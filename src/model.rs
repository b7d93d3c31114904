//! Internal, schema-neutral representation of one Internet-Draft revision.
//!
//! The model is pure data: the serializer and adapter borrow it read-only
//! for the duration of a translation call and never mutate it.

use serde::{Deserialize, Serialize};

/// One Internet-Draft revision. `name` + `rev` identify it uniquely;
/// revision numbers per name are strictly increasing but may have gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub rev: u32,
    pub title: String,
    /// Authors in original input order; the serializer never reorders them.
    pub authors: Vec<Author>,
    pub date: DocDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub category: DocCategory,
    /// Ordered tree of structural sections. Reference sections live here
    /// too; the serializer moves them into back matter.
    pub body: Vec<BodyNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub fullname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Document date. Year is required; month and day are optional as in
/// draft front matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocDate {
    pub year: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
}

/// Intended status of the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocCategory {
    Std,
    Bcp,
    Info,
    Exp,
    Historic,
}

impl DocCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocCategory::Std => "std",
            DocCategory::Bcp => "bcp",
            DocCategory::Info => "info",
            DocCategory::Exp => "exp",
            DocCategory::Historic => "historic",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "std" => Some(DocCategory::Std),
            "bcp" => Some(DocCategory::Bcp),
            "info" => Some(DocCategory::Info),
            "exp" => Some(DocCategory::Exp),
            "historic" => Some(DocCategory::Historic),
            _ => None,
        }
    }
}

/// A node in the structural body tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyNode {
    pub kind: StructuralKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    /// Text content; for sections this is the section title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Extra attributes carried through verbatim (mainly for `Unknown`
    /// pass-through nodes). Order is preserved for determinism.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BodyNode>,
}

/// Tag/role of a body node. `Unknown` preserves elements the model does
/// not understand so they survive a round trip instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StructuralKind {
    Section,
    Paragraph,
    List,
    ListItem,
    CodeBlock,
    Table,
    /// Container for reference entries. When `custom_order` is set the
    /// serializer keeps entries in input order instead of sorting by key.
    ReferenceSection { custom_order: bool },
    /// Include-directive pointing at a fragment by legacy category and
    /// identifier; resolved at serialization time.
    ReferenceEntry { category: String, id: String },
    /// Bare character data between sibling elements in mixed content
    /// (`<t>see <bcp14>MUST</bcp14> for details</t>`). Carries no
    /// element of its own; the segment lives in the node's `text`.
    Text,
    Unknown { element: String },
}

impl Default for StructuralKind {
    fn default() -> Self {
        StructuralKind::Paragraph
    }
}

impl StructuralKind {
    /// Stable name used as the schema mapping lookup key.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StructuralKind::Section => "section",
            StructuralKind::Paragraph => "paragraph",
            StructuralKind::List => "list",
            StructuralKind::ListItem => "list-item",
            StructuralKind::CodeBlock => "code-block",
            StructuralKind::Table => "table",
            StructuralKind::ReferenceSection { .. } => "reference-section",
            StructuralKind::ReferenceEntry { .. } => "reference-entry",
            StructuralKind::Text => "text",
            StructuralKind::Unknown { .. } => "unknown",
        }
    }

    /// All kind names the schema mapping must cover. `unknown` and `text`
    /// are absent: pass-through nodes carry their own element name, and
    /// text segments produce no element at all.
    pub const MAPPED_KINDS: &'static [&'static str] = &[
        "section",
        "paragraph",
        "list",
        "list-item",
        "code-block",
        "table",
        "reference-section",
        "reference-entry",
    ];
}

impl BodyNode {
    pub fn new(kind: StructuralKind) -> Self {
        BodyNode { kind, ..Default::default() }
    }

    pub fn with_text(kind: StructuralKind, text: impl Into<String>) -> Self {
        BodyNode { kind, text: Some(text.into()), ..Default::default() }
    }
}

impl Document {
    /// Structural equality for round-trip checks: reference sections
    /// without a custom order carry no semantic order, so their entries
    /// are compared sorted by (category, id).
    pub fn structurally_equals(&self, other: &Document) -> bool {
        self.name == other.name
            && self.rev == other.rev
            && self.title == other.title
            && self.authors == other.authors
            && self.date == other.date
            && self.abstract_text == other.abstract_text
            && self.category == other.category
            && normalized_nodes(&self.body) == normalized_nodes(&other.body)
    }
}

fn normalized_nodes(nodes: &[BodyNode]) -> Vec<BodyNode> {
    nodes
        .iter()
        .map(|n| {
            let mut node = n.clone();
            node.children = normalized_nodes(&n.children);
            if let StructuralKind::ReferenceSection { custom_order: false } = node.kind {
                node.children.sort_by(|a, b| entry_sort_key(a).cmp(&entry_sort_key(b)));
            }
            node
        })
        .collect()
}

fn entry_sort_key(node: &BodyNode) -> (String, String) {
    match &node.kind {
        StructuralKind::ReferenceEntry { category, id } => {
            (category.to_lowercase(), id.to_lowercase())
        }
        other => (other.kind_name().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(category: &str, id: &str) -> BodyNode {
        BodyNode::new(StructuralKind::ReferenceEntry {
            category: category.into(),
            id: id.into(),
        })
    }

    fn doc_with_refs(custom_order: bool, ids: &[&str]) -> Document {
        let mut section =
            BodyNode::with_text(StructuralKind::ReferenceSection { custom_order }, "References");
        section.children = ids
            .iter()
            .map(|id| entry("normative-reference-set", id))
            .collect();
        Document {
            name: "draft-test-model".into(),
            rev: 0,
            title: "Test".into(),
            authors: vec![],
            date: DocDate { year: 2024, month: None, day: None },
            abstract_text: None,
            category: DocCategory::Info,
            body: vec![section],
        }
    }

    #[test]
    fn sorted_reference_order_is_not_semantic() {
        let a = doc_with_refs(false, &["RFC8174", "RFC2119"]);
        let b = doc_with_refs(false, &["RFC2119", "RFC8174"]);
        assert!(a.structurally_equals(&b));
    }

    #[test]
    fn custom_reference_order_is_semantic() {
        let a = doc_with_refs(true, &["RFC8174", "RFC2119"]);
        let b = doc_with_refs(true, &["RFC2119", "RFC8174"]);
        assert!(!a.structurally_equals(&b));
    }

    #[test]
    fn every_plain_kind_has_a_mapped_name() {
        let kinds = [
            StructuralKind::Section,
            StructuralKind::Paragraph,
            StructuralKind::List,
            StructuralKind::ListItem,
            StructuralKind::CodeBlock,
            StructuralKind::Table,
            StructuralKind::ReferenceSection { custom_order: false },
            StructuralKind::ReferenceEntry { category: "c".into(), id: "i".into() },
        ];
        for kind in &kinds {
            assert!(StructuralKind::MAPPED_KINDS.contains(&kind.kind_name()));
        }
    }
}

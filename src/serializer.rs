//! Bidirectional serializer between the internal document model and
//! RFC 7991 xml2rfc XML.
//!
//! Output is canonical: fixed element order (front, middle, back), fixed
//! attribute order, no pretty-printing, so the same document always
//! serializes to byte-identical XML. Input is validated structurally
//! (required elements, nesting) rather than against the full schema;
//! unknown elements pass through opaquely, deprecated v2 elements are
//! rejected.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::Node;

use crate::error::CompatError;
use crate::model::{Author, BodyNode, DocCategory, DocDate, Document, StructuralKind};
use crate::resolver::AliasResolver;
use crate::schema::{is_deprecated_element, ChildOrder, SchemaMap};
use crate::source::IndexableSource;
use crate::IncludeMode;

const XINCLUDE_NS: &str = "http://www.w3.org/2001/XInclude";

type XmlWriter = Writer<Vec<u8>>;

/// RFC 7991 serializer. Holds only the schema mapping table; resolver
/// and source are borrowed per call, so one serializer can be shared
/// across threads.
#[derive(Debug)]
pub struct Serializer {
    schema: SchemaMap,
}

impl Default for Serializer {
    fn default() -> Self {
        Serializer::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Serializer { schema: SchemaMap::default() }
    }

    /// Build with a custom schema table. Lookup misses during
    /// serialization surface as `UnsupportedStructuralKind`.
    pub fn with_schema(schema: SchemaMap) -> Self {
        Serializer { schema }
    }

    /// Serialize a document to canonical xml2rfc XML.
    ///
    /// All-or-nothing: any unresolvable reference or missing required
    /// value aborts the call; partial output is never returned.
    pub fn to_xml(
        &self,
        doc: &Document,
        mode: IncludeMode,
        resolver: &AliasResolver,
        source: &dyn IndexableSource,
    ) -> Result<String, CompatError> {
        validate_required(doc)?;

        let mut writer = Writer::new(Vec::new());
        let doc_name = format!("{}-{:02}", doc.name, doc.rev);

        let mut rfc = BytesStart::new("rfc");
        rfc.push_attribute(("xmlns:xi", XINCLUDE_NS));
        rfc.push_attribute(("version", "3"));
        rfc.push_attribute(("category", doc.category.as_str()));
        rfc.push_attribute(("docName", doc_name.as_str()));
        rfc.push_attribute(("submissionType", "IETF"));
        writer.write_event(Event::Start(rfc)).map_err(write_err)?;

        self.write_front(&mut writer, doc)?;

        let (middle, back): (Vec<&BodyNode>, Vec<&BodyNode>) = doc
            .body
            .iter()
            .partition(|node| !matches!(node.kind, StructuralKind::ReferenceSection { .. }));

        writer
            .write_event(Event::Start(BytesStart::new("middle")))
            .map_err(write_err)?;
        for node in &middle {
            self.write_node(&mut writer, node, mode, resolver, source)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("middle")))
            .map_err(write_err)?;

        if !back.is_empty() {
            writer
                .write_event(Event::Start(BytesStart::new("back")))
                .map_err(write_err)?;
            for node in &back {
                self.write_node(&mut writer, node, mode, resolver, source)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("back")))
                .map_err(write_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("rfc")))
            .map_err(write_err)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| CompatError::Internal { reason: e.to_string() })
    }

    /// Interpret an xml2rfc submission into the internal model.
    pub fn from_xml(&self, xml: &str) -> Result<Document, CompatError> {
        let tree = roxmltree::Document::parse(xml)
            .map_err(|e| CompatError::Parse { reason: e.to_string() })?;
        let root = tree.root_element();
        if root.tag_name().name() != "rfc" {
            return Err(CompatError::Parse {
                reason: format!("expected <rfc> root, found <{}>", root.tag_name().name()),
            });
        }

        let doc_name = root.attribute("docName").ok_or_else(|| CompatError::Parse {
            reason: "missing docName attribute on <rfc>".to_string(),
        })?;
        let (name, rev) = split_doc_name(doc_name);

        let category = match root.attribute("category") {
            Some(raw) => DocCategory::from_str_opt(raw).ok_or_else(|| CompatError::Parse {
                reason: format!("unknown category {raw:?}"),
            })?,
            None => DocCategory::Info,
        };

        let front = named_child(root, "front").ok_or_else(|| CompatError::Parse {
            reason: "missing <front>".to_string(),
        })?;
        let (title, authors, date, abstract_text) = parse_front(front)?;

        let middle = named_child(root, "middle").ok_or_else(|| CompatError::Parse {
            reason: "missing <middle>".to_string(),
        })?;
        let mut body = Vec::new();
        for child in middle.children().filter(Node::is_element) {
            body.push(parse_body_node(child)?);
        }
        if let Some(back) = named_child(root, "back") {
            for child in back.children().filter(Node::is_element) {
                body.push(parse_body_node(child)?);
            }
        }

        Ok(Document {
            name,
            rev,
            title,
            authors,
            date,
            abstract_text,
            category,
            body,
        })
    }

    fn write_front(&self, writer: &mut XmlWriter, doc: &Document) -> Result<(), CompatError> {
        writer
            .write_event(Event::Start(BytesStart::new("front")))
            .map_err(write_err)?;

        write_text_element(writer, "title", &doc.title)?;

        for author in &doc.authors {
            write_author(writer, author)?;
        }

        let mut date = BytesStart::new("date");
        let year = doc.date.year.to_string();
        date.push_attribute(("year", year.as_str()));
        if let Some(month) = doc.date.month {
            let month = month.to_string();
            date.push_attribute(("month", month.as_str()));
        }
        if let Some(day) = doc.date.day {
            let day = day.to_string();
            date.push_attribute(("day", day.as_str()));
        }
        writer.write_event(Event::Empty(date)).map_err(write_err)?;

        if let Some(text) = &doc.abstract_text {
            writer
                .write_event(Event::Start(BytesStart::new("abstract")))
                .map_err(write_err)?;
            write_text_element(writer, "t", text)?;
            writer
                .write_event(Event::End(BytesEnd::new("abstract")))
                .map_err(write_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("front")))
            .map_err(write_err)
    }

    fn write_node(
        &self,
        writer: &mut XmlWriter,
        node: &BodyNode,
        mode: IncludeMode,
        resolver: &AliasResolver,
        source: &dyn IndexableSource,
    ) -> Result<(), CompatError> {
        match &node.kind {
            StructuralKind::ReferenceEntry { category, id } => {
                self.write_reference_entry(writer, category, id, mode, resolver, source)
            }
            StructuralKind::Text => {
                if let Some(text) = &node.text {
                    writer
                        .write_event(Event::Text(BytesText::new(text)))
                        .map_err(write_err)?;
                }
                Ok(())
            }
            StructuralKind::Unknown { element } => {
                self.write_passthrough(writer, element, node, mode, resolver, source)
            }
            kind => {
                let rule = self.schema.rule(kind).ok_or_else(|| {
                    CompatError::UnsupportedStructuralKind { kind: kind.kind_name().to_string() }
                })?;

                let mut start = BytesStart::new(rule.element);
                if let Some(anchor) = &node.anchor {
                    start.push_attribute(("anchor", anchor.as_str()));
                }
                for (attr, default) in rule.default_attrs {
                    start.push_attribute((*attr, *default));
                }
                if let StructuralKind::ReferenceSection { custom_order: true } = kind {
                    start.push_attribute(("sortRefs", "false"));
                }

                writer.write_event(Event::Start(start)).map_err(write_err)?;

                if let Some(text) = &node.text {
                    if rule.text_as_name_child {
                        write_text_element(writer, "name", text)?;
                    } else {
                        writer
                            .write_event(Event::Text(BytesText::new(text)))
                            .map_err(write_err)?;
                    }
                }

                let sort_children = rule.child_order == ChildOrder::SortedByKey
                    && !matches!(kind, StructuralKind::ReferenceSection { custom_order: true });
                let children = if sort_children {
                    self.sorted_by_fragment_key(&node.children, resolver)?
                } else {
                    node.children.iter().collect()
                };
                for child in children {
                    self.write_node(writer, child, mode, resolver, source)?;
                }

                writer
                    .write_event(Event::End(BytesEnd::new(rule.element)))
                    .map_err(write_err)
            }
        }
    }

    /// Resolve an include-directive and emit it per the include mode:
    /// the fragment content itself (`Inline`) or a pointer (`Reference`),
    /// never both.
    fn write_reference_entry(
        &self,
        writer: &mut XmlWriter,
        category: &str,
        id: &str,
        mode: IncludeMode,
        resolver: &AliasResolver,
        source: &dyn IndexableSource,
    ) -> Result<(), CompatError> {
        let legacy_path = format!("{category}/{id}");
        let unresolved = |cause: CompatError| CompatError::UnresolvedReference {
            category: category.to_string(),
            id: id.to_string(),
            source: Box::new(cause),
        };

        let key = resolver.resolve(&legacy_path).map_err(unresolved)?;
        let fragment = source.fetch(&key).map_err(unresolved)?;

        match mode {
            IncludeMode::Inline => {
                let content = String::from_utf8(fragment.content)
                    .map_err(|e| CompatError::Internal { reason: e.to_string() })?;
                // fragment content is well-formed XML by the publishing
                // contract; emit it verbatim
                writer
                    .write_event(Event::Text(BytesText::from_escaped(content)))
                    .map_err(write_err)
            }
            IncludeMode::Reference => {
                let mut include = BytesStart::new("xi:include");
                include.push_attribute(("href", legacy_path.as_str()));
                writer.write_event(Event::Empty(include)).map_err(write_err)
            }
        }
    }

    /// Opaque pass-through for elements the model does not understand.
    fn write_passthrough(
        &self,
        writer: &mut XmlWriter,
        element: &str,
        node: &BodyNode,
        mode: IncludeMode,
        resolver: &AliasResolver,
        source: &dyn IndexableSource,
    ) -> Result<(), CompatError> {
        let mut start = BytesStart::new(element);
        if let Some(anchor) = &node.anchor {
            start.push_attribute(("anchor", anchor.as_str()));
        }
        for (attr, value) in &node.attrs {
            start.push_attribute((attr.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(start)).map_err(write_err)?;
        if let Some(text) = &node.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_err)?;
        }
        for child in &node.children {
            self.write_node(writer, child, mode, resolver, source)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(element)))
            .map_err(write_err)
    }

    /// Order reference entries by their resolved fragment key. Resolution
    /// failures abort here rather than midway through writing.
    fn sorted_by_fragment_key<'a>(
        &self,
        children: &'a [BodyNode],
        resolver: &AliasResolver,
    ) -> Result<Vec<&'a BodyNode>, CompatError> {
        let mut keyed: Vec<(String, &BodyNode)> = Vec::with_capacity(children.len());
        for child in children {
            let sort_key = match &child.kind {
                StructuralKind::ReferenceEntry { category, id } => resolver
                    .resolve(&format!("{category}/{id}"))
                    .map_err(|e| CompatError::UnresolvedReference {
                        category: category.clone(),
                        id: id.clone(),
                        source: Box::new(e),
                    })?
                    .lookup_key(),
                other => other.kind_name().to_string(),
            };
            keyed.push((sort_key, child));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(keyed.into_iter().map(|(_, node)| node).collect())
    }
}

fn validate_required(doc: &Document) -> Result<(), CompatError> {
    if doc.name.trim().is_empty() {
        return Err(CompatError::IncompleteDocument { field: "name".to_string() });
    }
    if doc.title.trim().is_empty() {
        return Err(CompatError::IncompleteDocument { field: "title".to_string() });
    }
    if doc.date.year == 0 {
        return Err(CompatError::IncompleteDocument { field: "date.year".to_string() });
    }
    for author in &doc.authors {
        if author.fullname.trim().is_empty() {
            return Err(CompatError::IncompleteDocument {
                field: "author.fullname".to_string(),
            });
        }
    }
    Ok(())
}

fn write_err(e: quick_xml::Error) -> CompatError {
    CompatError::Internal { reason: e.to_string() }
}

fn write_text_element(
    writer: &mut XmlWriter,
    element: &str,
    text: &str,
) -> Result<(), CompatError> {
    writer
        .write_event(Event::Start(BytesStart::new(element)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(element)))
        .map_err(write_err)
}

fn write_author(writer: &mut XmlWriter, author: &Author) -> Result<(), CompatError> {
    let mut start = BytesStart::new("author");
    start.push_attribute(("fullname", author.fullname.as_str()));
    if let Some(initials) = &author.initials {
        start.push_attribute(("initials", initials.as_str()));
    }
    if let Some(surname) = &author.surname {
        start.push_attribute(("surname", surname.as_str()));
    }

    if author.organization.is_none() && author.email.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(write_err);
    }

    writer.write_event(Event::Start(start)).map_err(write_err)?;
    if let Some(organization) = &author.organization {
        write_text_element(writer, "organization", organization)?;
    }
    if let Some(email) = &author.email {
        writer
            .write_event(Event::Start(BytesStart::new("address")))
            .map_err(write_err)?;
        write_text_element(writer, "email", email)?;
        writer
            .write_event(Event::End(BytesEnd::new("address")))
            .map_err(write_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("author")))
        .map_err(write_err)
}

/// `docName` carries the revision as a trailing numeric segment
/// (`draft-foo-bar-03`); absent revision parses as 0.
fn split_doc_name(doc_name: &str) -> (String, u32) {
    match doc_name.rsplit_once('-') {
        Some((name, rev)) if !rev.is_empty() && rev.bytes().all(|b| b.is_ascii_digit()) => {
            match rev.parse() {
                Ok(rev) => (name.to_string(), rev),
                Err(_) => (doc_name.to_string(), 0),
            }
        }
        _ => (doc_name.to_string(), 0),
    }
}

fn named_child<'a>(node: Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn text_of(node: Node) -> Option<String> {
    node.text()
        .map(str::to_string)
        .filter(|text| !text.is_empty())
}

/// All character data under `node` in document order, markup stripped.
fn flattened_text(node: Node) -> Option<String> {
    let mut out = String::new();
    for descendant in node.descendants().filter(Node::is_text) {
        if let Some(text) = descendant.text() {
            out.push_str(text);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Parse mixed content: leading character data goes into the node's
/// `text`, later segments become `Text` children interleaved with the
/// element children, so tail text after an inline element survives a
/// round trip.
fn parse_mixed(node: Node) -> Result<(Option<String>, Vec<BodyNode>), CompatError> {
    let mut leading: Option<String> = None;
    let mut items = Vec::new();
    for child in node.children() {
        if child.is_element() {
            items.push(parse_body_node(child)?);
        } else if child.is_text() {
            let Some(segment) = child.text().filter(|t| !t.is_empty()) else {
                continue;
            };
            if items.is_empty() {
                leading.get_or_insert_with(String::new).push_str(segment);
            } else {
                items.push(BodyNode::with_text(StructuralKind::Text, segment));
            }
        }
    }
    Ok((leading, items))
}

fn parse_front(
    front: Node,
) -> Result<(String, Vec<Author>, DocDate, Option<String>), CompatError> {
    let title = named_child(front, "title")
        .and_then(text_of)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| CompatError::Parse { reason: "missing or empty <title>".to_string() })?;

    let mut authors = Vec::new();
    for node in front
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "author")
    {
        authors.push(parse_author(node)?);
    }

    let date_node = named_child(front, "date")
        .ok_or_else(|| CompatError::Parse { reason: "missing <date>".to_string() })?;
    let date = DocDate {
        year: parse_numeric_attr(date_node, "year")?
            .ok_or_else(|| CompatError::Parse { reason: "missing date year".to_string() })?,
        month: parse_numeric_attr(date_node, "month")?,
        day: parse_numeric_attr(date_node, "day")?,
    };

    let abstract_text = named_child(front, "abstract").and_then(|node| {
        let paragraphs: Vec<String> = node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "t")
            .filter_map(flattened_text)
            .collect();
        if paragraphs.is_empty() {
            None
        } else {
            Some(paragraphs.join("\n\n"))
        }
    });

    Ok((title, authors, date, abstract_text))
}

fn parse_numeric_attr<T: std::str::FromStr>(
    node: Node,
    attr: &str,
) -> Result<Option<T>, CompatError> {
    node.attribute(attr)
        .map(|raw| {
            raw.parse().map_err(|_| CompatError::Parse {
                reason: format!("bad {attr} attribute {raw:?} on <{}>", node.tag_name().name()),
            })
        })
        .transpose()
}

fn parse_author(node: Node) -> Result<Author, CompatError> {
    let fullname = node
        .attribute("fullname")
        .ok_or_else(|| CompatError::Parse { reason: "author missing fullname".to_string() })?;
    Ok(Author {
        fullname: fullname.to_string(),
        initials: node.attribute("initials").map(str::to_string),
        surname: node.attribute("surname").map(str::to_string),
        organization: named_child(node, "organization").and_then(text_of),
        email: named_child(node, "address")
            .and_then(|address| named_child(address, "email"))
            .and_then(text_of),
    })
}

fn parse_body_node(node: Node) -> Result<BodyNode, CompatError> {
    let name = node.tag_name().name();
    if is_deprecated_element(name) {
        return Err(CompatError::DeprecatedElement { element: name.to_string() });
    }
    check_nesting(node, name)?;

    if name == "include" && node.tag_name().namespace() == Some(XINCLUDE_NS) {
        let href = node.attribute("href").ok_or_else(|| CompatError::Parse {
            reason: "xi:include missing href".to_string(),
        })?;
        let (category, id) = href.rsplit_once('/').ok_or_else(|| CompatError::Parse {
            reason: format!("unintelligible include href {href:?}"),
        })?;
        return Ok(BodyNode::new(StructuralKind::ReferenceEntry {
            category: category.to_string(),
            id: id.to_string(),
        }));
    }

    let anchor = node.attribute("anchor").map(str::to_string);
    let mut body = match name {
        "section" => BodyNode {
            kind: StructuralKind::Section,
            text: named_child(node, "name").and_then(text_of),
            children: parse_children(node, true)?,
            ..Default::default()
        },
        "t" => {
            let (text, children) = parse_mixed(node)?;
            BodyNode {
                kind: StructuralKind::Paragraph,
                text,
                children,
                ..Default::default()
            }
        }
        "ul" => BodyNode {
            kind: StructuralKind::List,
            children: parse_children(node, false)?,
            ..Default::default()
        },
        "li" => {
            let (text, children) = parse_mixed(node)?;
            BodyNode {
                kind: StructuralKind::ListItem,
                text,
                children,
                ..Default::default()
            }
        }
        "sourcecode" => BodyNode {
            kind: StructuralKind::CodeBlock,
            text: text_of(node),
            ..Default::default()
        },
        "table" => BodyNode {
            kind: StructuralKind::Table,
            text: named_child(node, "name").and_then(text_of),
            children: parse_children(node, true)?,
            ..Default::default()
        },
        "references" => BodyNode {
            kind: StructuralKind::ReferenceSection {
                custom_order: node.attribute("sortRefs") == Some("false"),
            },
            text: named_child(node, "name").and_then(text_of),
            children: parse_children(node, true)?,
            ..Default::default()
        },
        other => {
            let (text, children) = parse_mixed(node)?;
            BodyNode {
                kind: StructuralKind::Unknown { element: other.to_string() },
                text,
                attrs: node
                    .attributes()
                    .filter(|a| a.name() != "anchor")
                    .map(|a| (a.name().to_string(), a.value().to_string()))
                    .collect(),
                children,
                ..Default::default()
            }
        }
    };
    body.anchor = anchor;
    Ok(body)
}

/// Structural nesting rules: `<section>` may only sit at structural
/// level (`<middle>`, `<section>`, `<back>`), and front-matter elements
/// do not appear there. The checks look at the direct parent only, so
/// opaque pass-through subtrees (an inlined `<reference>` carries its
/// own `<front>`/`<author>`) stay untouched.
fn check_nesting(node: Node, name: &str) -> Result<(), CompatError> {
    let parent = node
        .parent()
        .filter(Node::is_element)
        .map(|p| p.tag_name().name())
        .unwrap_or_default();
    let structural_parent = matches!(parent, "middle" | "section" | "back");
    match name {
        "section" if !structural_parent => Err(CompatError::Parse {
            reason: format!("<section> not allowed under <{parent}>"),
        }),
        "author" | "title" | "abstract" | "date" if structural_parent => {
            Err(CompatError::Parse { reason: format!("<{name}> only allowed in <front>") })
        }
        _ => Ok(()),
    }
}

fn parse_children(node: Node, skip_name: bool) -> Result<Vec<BodyNode>, CompatError> {
    node.children()
        .filter(Node::is_element)
        .filter(|child| !(skip_name && child.tag_name().name() == "name"))
        .map(parse_body_node)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::AliasResolver;
    use crate::source::MemorySource;

    const RFC2119_XML: &str = "<reference anchor=\"RFC2119\"><front>\
        <title>Key words for use in RFCs to Indicate Requirement Levels</title>\
        <author fullname=\"S. Bradner\"/><date year=\"1997\"/></front></reference>";
    const RFC8174_XML: &str = "<reference anchor=\"RFC8174\"><front>\
        <title>Ambiguity of Uppercase vs Lowercase in RFC 2119 Key Words</title>\
        <author fullname=\"B. Leiba\"/><date year=\"2017\"/></front></reference>";

    fn fixture() -> (AliasResolver, MemorySource) {
        let source = MemorySource::new();
        source.publish("ref", "rfc2119", RFC2119_XML);
        source.publish("ref", "rfc8174", RFC8174_XML);
        (AliasResolver::default(), source)
    }

    fn entry(id: &str) -> BodyNode {
        BodyNode::new(StructuralKind::ReferenceEntry {
            category: "normative-reference-set".into(),
            id: id.into(),
        })
    }

    fn sample_document() -> Document {
        let mut intro = BodyNode::with_text(StructuralKind::Section, "Introduction");
        intro.anchor = Some("intro".into());
        intro.children = vec![
            BodyNode::with_text(
                StructuralKind::Paragraph,
                "This document demonstrates the translation layer.",
            ),
            {
                let mut list = BodyNode::new(StructuralKind::List);
                list.children = vec![
                    BodyNode::with_text(StructuralKind::ListItem, "first item"),
                    BodyNode::with_text(StructuralKind::ListItem, "second item"),
                ];
                list
            },
            BodyNode::with_text(StructuralKind::CodeBlock, "GET /example HTTP/1.1"),
        ];

        let mut refs = BodyNode::with_text(
            StructuralKind::ReferenceSection { custom_order: false },
            "Normative References",
        );
        // deliberately unsorted
        refs.children = vec![entry("RFC8174"), entry("RFC2119")];

        Document {
            name: "draft-compat-demo".into(),
            rev: 3,
            title: "A Compatibility Demonstration".into(),
            authors: vec![
                Author {
                    fullname: "Jane Roe".into(),
                    initials: Some("J.".into()),
                    surname: Some("Roe".into()),
                    organization: Some("Example Org".into()),
                    email: Some("jane@example.org".into()),
                },
                Author { fullname: "John Doe".into(), ..Default::default() },
            ],
            date: DocDate { year: 2024, month: Some(6), day: None },
            abstract_text: Some("Demonstrates round-trip serialization.".into()),
            category: DocCategory::Std,
            body: vec![intro, refs],
        }
    }

    #[test]
    fn serialization_is_deterministic() {
        let (resolver, source) = fixture();
        let serializer = Serializer::new();
        let doc = sample_document();
        let a = serializer
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap();
        let b = serializer
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn round_trip_preserves_structure() {
        let (resolver, source) = fixture();
        let serializer = Serializer::new();
        let doc = sample_document();
        let xml = serializer
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap();
        let parsed = serializer.from_xml(&xml).unwrap();
        assert!(
            parsed.structurally_equals(&doc),
            "round trip changed the document:\noriginal: {doc:#?}\nparsed: {parsed:#?}"
        );
    }

    #[test]
    fn inline_mode_embeds_content_and_no_pointer() {
        let (resolver, source) = fixture();
        let xml = Serializer::new()
            .to_xml(&sample_document(), IncludeMode::Inline, &resolver, &source)
            .unwrap();
        assert!(xml.contains("Key words for use in RFCs"));
        assert!(!xml.contains("xi:include"));
    }

    #[test]
    fn reference_mode_emits_pointer_and_no_content() {
        let (resolver, source) = fixture();
        let xml = Serializer::new()
            .to_xml(&sample_document(), IncludeMode::Reference, &resolver, &source)
            .unwrap();
        assert!(xml.contains("<xi:include href=\"normative-reference-set/RFC2119\"/>"));
        assert!(!xml.contains("Key words for use in RFCs"));
    }

    #[test]
    fn references_sort_by_fragment_key_without_custom_order() {
        let (resolver, source) = fixture();
        let xml = Serializer::new()
            .to_xml(&sample_document(), IncludeMode::Reference, &resolver, &source)
            .unwrap();
        let first = xml.find("RFC2119").unwrap();
        let second = xml.find("RFC8174").unwrap();
        assert!(first < second, "entries not sorted by key:\n{xml}");
    }

    #[test]
    fn custom_order_preserves_input_order() {
        let (resolver, source) = fixture();
        let mut doc = sample_document();
        doc.body[1].kind = StructuralKind::ReferenceSection { custom_order: true };
        let xml = Serializer::new()
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap();
        let first = xml.find("RFC8174").unwrap();
        let second = xml.find("RFC2119").unwrap();
        assert!(first < second, "custom order not preserved:\n{xml}");
        assert!(xml.contains("sortRefs=\"false\""));

        // and it survives a round trip
        let parsed = Serializer::new().from_xml(&xml).unwrap();
        assert!(parsed.structurally_equals(&doc));
    }

    #[test]
    fn unresolvable_reference_fails_whole_serialization() {
        let (resolver, source) = fixture();
        let mut doc = sample_document();
        doc.body[1].children.push(entry("RFC9999"));
        let err = Serializer::new()
            .to_xml(&doc, IncludeMode::Inline, &resolver, &source)
            .unwrap_err();
        match err {
            CompatError::UnresolvedReference { category, id, .. } => {
                assert_eq!(category, "normative-reference-set");
                assert_eq!(id, "RFC9999");
            }
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn unknown_category_in_entry_fails_as_unresolved() {
        let (resolver, source) = fixture();
        let mut doc = sample_document();
        doc.body[1].children = vec![BodyNode::new(StructuralKind::ReferenceEntry {
            category: "no-such-set".into(),
            id: "RFC2119".into(),
        })];
        let err = Serializer::new()
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap_err();
        assert!(matches!(err, CompatError::UnresolvedReference { .. }));
    }

    #[test]
    fn missing_required_field_is_incomplete_document() {
        let (resolver, source) = fixture();
        let mut doc = sample_document();
        doc.title = String::new();
        let err = Serializer::new()
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap_err();
        assert!(matches!(err, CompatError::IncompleteDocument { field } if field == "title"));
    }

    #[test]
    fn unmapped_kind_is_a_hard_error() {
        let (resolver, source) = fixture();
        let serializer = Serializer::with_schema(crate::schema::SchemaMap::empty());
        let err = serializer
            .to_xml(&sample_document(), IncludeMode::Reference, &resolver, &source)
            .unwrap_err();
        assert!(matches!(
            err,
            CompatError::UnsupportedStructuralKind { kind } if kind == "section"
        ));
    }

    #[test]
    fn deprecated_elements_are_rejected() {
        let xml = "<rfc docName=\"draft-old-00\" category=\"info\"><front>\
            <title>Old</title><date year=\"2001\"/></front>\
            <middle><t>uses <spanx>emphasis</spanx></t></middle></rfc>";
        // roxmltree sees spanx as a child element of t
        let err = Serializer::new().from_xml(xml).unwrap_err();
        assert!(matches!(err, CompatError::DeprecatedElement { element } if element == "spanx"));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = Serializer::new().from_xml("<rfc><front>").unwrap_err();
        assert!(matches!(err, CompatError::Parse { .. }));
    }

    #[test]
    fn missing_front_matter_is_a_parse_error() {
        let err = Serializer::new()
            .from_xml("<rfc docName=\"draft-x-00\"><middle/></rfc>")
            .unwrap_err();
        assert!(matches!(err, CompatError::Parse { reason } if reason.contains("front")));
    }

    #[test]
    fn unknown_elements_pass_through_opaquely() {
        let xml = "<rfc xmlns:xi=\"http://www.w3.org/2001/XInclude\" docName=\"draft-x-02\" \
            category=\"info\"><front><title>X</title><date year=\"2024\"/></front>\
            <middle><metadata-block stage=\"draft\">internal</metadata-block></middle></rfc>";
        let serializer = Serializer::new();
        let doc = serializer.from_xml(xml).unwrap();
        let node = &doc.body[0];
        assert_eq!(node.kind, StructuralKind::Unknown { element: "metadata-block".into() });
        assert_eq!(node.attrs, vec![("stage".to_string(), "draft".to_string())]);
        assert_eq!(node.text.as_deref(), Some("internal"));

        let (resolver, source) = fixture();
        let rendered = serializer
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap();
        assert!(rendered.contains("<metadata-block stage=\"draft\">internal</metadata-block>"));
    }

    #[test]
    fn mixed_content_keeps_tail_text() {
        let xml = "<rfc docName=\"draft-x-00\" category=\"info\"><front><title>X</title>\
            <date year=\"2024\"/></front>\
            <middle><t>see <bcp14>MUST</bcp14> for details</t></middle></rfc>";
        let serializer = Serializer::new();
        let doc = serializer.from_xml(xml).unwrap();

        let paragraph = &doc.body[0];
        assert_eq!(paragraph.text.as_deref(), Some("see "));
        assert_eq!(paragraph.children.len(), 2);
        assert_eq!(
            paragraph.children[0].kind,
            StructuralKind::Unknown { element: "bcp14".into() }
        );
        assert_eq!(paragraph.children[1].kind, StructuralKind::Text);
        assert_eq!(paragraph.children[1].text.as_deref(), Some(" for details"));

        let (resolver, source) = fixture();
        let rendered = serializer
            .to_xml(&doc, IncludeMode::Reference, &resolver, &source)
            .unwrap();
        assert!(rendered.contains("<t>see <bcp14>MUST</bcp14> for details</t>"));
    }

    #[test]
    fn list_item_tail_text_survives() {
        let xml = "<rfc docName=\"draft-x-00\" category=\"info\"><front><title>X</title>\
            <date year=\"2024\"/></front>\
            <middle><ul><li>use <tt>fetch</tt> here</li></ul></middle></rfc>";
        let doc = Serializer::new().from_xml(xml).unwrap();
        let item = &doc.body[0].children[0];
        assert_eq!(item.text.as_deref(), Some("use "));
        assert_eq!(item.children[1].text.as_deref(), Some(" here"));
    }

    #[test]
    fn section_inside_paragraph_is_rejected() {
        let xml = "<rfc docName=\"draft-x-00\" category=\"info\"><front><title>X</title>\
            <date year=\"2024\"/></front>\
            <middle><t>intro <section><name>Bad</name></section></t></middle></rfc>";
        let err = Serializer::new().from_xml(xml).unwrap_err();
        assert!(matches!(err, CompatError::Parse { reason } if reason.contains("<section>")));
    }

    #[test]
    fn front_matter_elements_in_body_are_rejected() {
        let xml = "<rfc docName=\"draft-x-00\" category=\"info\"><front><title>X</title>\
            <date year=\"2024\"/></front>\
            <middle><author fullname=\"Stray\"/></middle></rfc>";
        let err = Serializer::new().from_xml(xml).unwrap_err();
        assert!(matches!(err, CompatError::Parse { reason } if reason.contains("<author>")));
    }

    #[test]
    fn inlined_reference_front_matter_still_passes_through() {
        // an embedded <reference> subtree carries its own front matter;
        // the nesting rules must not reject it
        let (resolver, source) = fixture();
        let serializer = Serializer::new();
        let inline = serializer
            .to_xml(&sample_document(), IncludeMode::Inline, &resolver, &source)
            .unwrap();
        let doc = serializer.from_xml(&inline).unwrap();
        let refs = doc
            .body
            .iter()
            .find(|n| matches!(n.kind, StructuralKind::ReferenceSection { .. }))
            .unwrap();
        assert!(refs
            .children
            .iter()
            .any(|n| n.kind == StructuralKind::Unknown { element: "reference".into() }));
    }

    #[test]
    fn doc_name_revision_parsing() {
        assert_eq!(split_doc_name("draft-compat-demo-03"), ("draft-compat-demo".into(), 3));
        assert_eq!(split_doc_name("draft-compat-demo"), ("draft-compat-demo".into(), 0));
    }
}

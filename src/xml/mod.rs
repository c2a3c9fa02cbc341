//! Owned XML document tree with byte-faithful round-tripping.
//!
//! The parser walks `quick-xml` events and stores the exact source slice of
//! every construct. Serialization re-emits those slices verbatim, so any
//! region the editor does not touch comes back byte-identical — attribute
//! order, quoting, whitespace, comments, and the declaration included. Only
//! text the editor rewrites is re-escaped.

use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::core::NotaError;

/// A node in the document tree. Non-element constructs keep their raw
/// source form and only participate in serialization (and, for text-like
/// kinds, in [`Element::text_content`]).
#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(Element),
    /// Character data in escaped source form.
    Text(String),
    /// Full `<![CDATA[...]]>` construct.
    CData(String),
    /// XML declaration, verbatim (`<?xml ...?>`).
    Decl(String),
    /// Any other construct kept verbatim: comment, processing instruction,
    /// doctype, entity reference.
    Other(String),
}

/// An element with its raw tag markup and children.
#[derive(Debug, Clone)]
pub struct Element {
    /// Full opening tag as written, angle brackets included.
    raw_open: String,
    /// Qualified tag name.
    name: String,
    /// Full closing tag as written; empty for self-closing elements.
    raw_close: String,
    self_closing: bool,
    children: Vec<XmlNode>,
}

impl Element {
    /// A fresh `<name>text</name>` element with canonical markup.
    fn with_text(name: &str, text: &str) -> Self {
        Element {
            raw_open: format!("<{name}>"),
            name: name.to_string(),
            raw_close: format!("</{name}>"),
            self_closing: false,
            children: vec![XmlNode::Text(escape(text).into_owned())],
        }
    }

    /// Qualified tag name as written (`ns:tag`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name with any namespace prefix removed.
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Attribute value by qualified name, entity references resolved.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let end = self.raw_open.len() - if self.self_closing { 2 } else { 1 };
        let content = &self.raw_open[1..end];
        let start = BytesStart::from_content(content, self.name.len());
        for attr in start.attributes().flatten() {
            if attr.key.as_ref() == name.as_bytes() {
                let raw = String::from_utf8_lossy(&attr.value);
                return Some(match unescape(&raw) {
                    Ok(v) => v.into_owned(),
                    Err(_) => raw.into_owned(),
                });
            }
        }
        None
    }

    /// Child elements, in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn first_child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.local_name() == local)
    }

    /// Like [`Self::first_child`] but mutable.
    pub fn first_child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            XmlNode::Element(el) if el.local_name() == local => Some(el),
            _ => None,
        })
    }

    /// Trimmed text content of the first child element with the given local
    /// name, or `None` when no such child exists.
    pub fn child_text(&self, local: &str) -> Option<String> {
        self.first_child(local)
            .map(|el| el.text_content().trim().to_string())
    }

    /// Concatenated descendant character data, entity references resolved.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Overwrite the text of the first child element with the given name,
    /// or append a newly created `<name>value</name>` child. A self-closing
    /// child is expanded in place.
    pub fn set_child_text(&mut self, name: &str, value: &str) {
        match self.first_child_mut(name) {
            Some(child) => {
                if child.self_closing {
                    let end = child.raw_open.len() - 2;
                    child.raw_open = format!("{}>", &child.raw_open[..end]);
                    child.raw_close = format!("</{}>", child.name);
                    child.self_closing = false;
                }
                child.children = vec![XmlNode::Text(escape(value).into_owned())];
            }
            None => {
                self.children
                    .push(XmlNode::Element(Element::with_text(name, value)));
            }
        }
    }

    /// Remove the first child element with the given local name. Returns
    /// whether a child was removed. Surrounding whitespace is left alone.
    pub fn remove_child(&mut self, local: &str) -> bool {
        let pos = self.children.iter().position(|n| {
            matches!(n, XmlNode::Element(el) if el.local_name() == local)
        });
        match pos {
            Some(i) => {
                self.children.remove(i);
                true
            }
            None => false,
        }
    }

    fn write(&self, out: &mut String) {
        out.push_str(&self.raw_open);
        for child in &self.children {
            child.write(out);
        }
        out.push_str(&self.raw_close);
    }
}

impl XmlNode {
    fn write(&self, out: &mut String) {
        match self {
            XmlNode::Element(el) => el.write(out),
            XmlNode::Text(raw)
            | XmlNode::CData(raw)
            | XmlNode::Decl(raw)
            | XmlNode::Other(raw) => out.push_str(raw),
        }
    }
}

fn collect_text(nodes: &[XmlNode], out: &mut String) {
    for node in nodes {
        match node {
            XmlNode::Element(el) => collect_text(&el.children, out),
            XmlNode::Text(raw) => match unescape(raw) {
                Ok(v) => out.push_str(&v),
                Err(_) => out.push_str(raw),
            },
            XmlNode::CData(raw) => {
                let inner = raw
                    .strip_prefix("<![CDATA[")
                    .and_then(|r| r.strip_suffix("]]>"))
                    .unwrap_or(raw);
                out.push_str(inner);
            }
            // Entity references split out of text by the reader.
            XmlNode::Other(raw) if raw.starts_with('&') => match unescape(raw) {
                Ok(v) => out.push_str(&v),
                Err(_) => out.push_str(raw),
            },
            XmlNode::Other(_) | XmlNode::Decl(_) => {}
        }
    }
}

/// A parsed document: prolog nodes, exactly one root element, epilog nodes.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
}

impl XmlDocument {
    /// Parse a full document. Mismatched or unclosed tags and documents
    /// without exactly one root element are [`NotaError::Parse`] errors.
    pub fn parse(text: &str) -> Result<XmlDocument, NotaError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut top: Vec<XmlNode> = Vec::new();
        let mut last_pos = 0usize;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| NotaError::parse(e.to_string()))?;
            let pos = reader.buffer_position() as usize;
            let raw = &text[last_pos..pos];
            last_pos = pos;

            match event {
                Event::Start(ref e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    stack.push(Element {
                        raw_open: raw.to_string(),
                        name,
                        raw_close: String::new(),
                        self_closing: false,
                        children: Vec::new(),
                    });
                }
                Event::Empty(ref e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let el = Element {
                        raw_open: raw.to_string(),
                        name,
                        raw_close: String::new(),
                        self_closing: true,
                        children: Vec::new(),
                    };
                    attach(XmlNode::Element(el), &mut stack, &mut top);
                }
                Event::End(ref e) => {
                    let mut el = stack.pop().ok_or_else(|| {
                        NotaError::parse(format!(
                            "closing tag </{}> without opening tag",
                            String::from_utf8_lossy(e.name().as_ref())
                        ))
                    })?;
                    if e.name().as_ref() != el.name.as_bytes() {
                        return Err(NotaError::parse(format!(
                            "mismatched closing tag </{}> for <{}>",
                            String::from_utf8_lossy(e.name().as_ref()),
                            el.name
                        )));
                    }
                    el.raw_close = raw.to_string();
                    attach(XmlNode::Element(el), &mut stack, &mut top);
                }
                Event::Text(_) => attach(XmlNode::Text(raw.to_string()), &mut stack, &mut top),
                Event::CData(_) => attach(XmlNode::CData(raw.to_string()), &mut stack, &mut top),
                Event::Decl(_) => attach(XmlNode::Decl(raw.to_string()), &mut stack, &mut top),
                Event::Eof => break,
                // Comments, PIs, doctype, entity references: verbatim.
                _ => attach(XmlNode::Other(raw.to_string()), &mut stack, &mut top),
            }
        }

        if let Some(open) = stack.last() {
            return Err(NotaError::parse(format!("unclosed element <{}>", open.name)));
        }
        let roots = top
            .iter()
            .filter(|n| matches!(n, XmlNode::Element(_)))
            .count();
        match roots {
            0 => Err(NotaError::parse("document has no root element")),
            1 => Ok(XmlDocument { nodes: top }),
            _ => Err(NotaError::parse("document has multiple root elements")),
        }
    }

    /// The root element.
    pub fn root(&self) -> &Element {
        self.nodes
            .iter()
            .find_map(|n| match n {
                XmlNode::Element(el) => Some(el),
                _ => None,
            })
            .expect("parse guarantees a root element")
    }

    fn root_mut(&mut self) -> &mut Element {
        self.nodes
            .iter_mut()
            .find_map(|n| match n {
                XmlNode::Element(el) => Some(el),
                _ => None,
            })
            .expect("parse guarantees a root element")
    }

    /// First element with the given local name, in document order (the root
    /// itself included).
    pub fn first_element(&self, local: &str) -> Option<&Element> {
        let root = self.root();
        if root.local_name() == local {
            return Some(root);
        }
        find_first(&root.children, local)
    }

    /// Like [`Self::first_element`] but mutable.
    pub fn first_element_mut(&mut self, local: &str) -> Option<&mut Element> {
        // Two-phase to keep the borrow checker happy with the root fast path.
        if self.root().local_name() == local {
            return Some(self.root_mut());
        }
        find_first_mut(&mut self.root_mut().children, local)
    }

    /// All elements with the given local name, in document order.
    pub fn elements(&self, local: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        let root = self.root();
        if root.local_name() == local {
            out.push(root);
        }
        collect_elements(&root.children, local, &mut out);
        out
    }

    /// Visit every element with the given local name, mutably, in document
    /// order.
    pub fn for_each_element_mut(&mut self, local: &str, mut f: impl FnMut(&mut Element)) {
        let root = self.root_mut();
        if root.local_name() == local {
            f(&mut *root);
        }
        visit_elements_mut(&mut root.children, local, &mut f);
    }

    /// Serialize the document; untouched regions are byte-identical to the
    /// parsed input.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write(&mut out);
        }
        out
    }
}

fn attach(node: XmlNode, stack: &mut [Element], top: &mut Vec<XmlNode>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn find_first<'a>(nodes: &'a [XmlNode], local: &str) -> Option<&'a Element> {
    for node in nodes {
        if let XmlNode::Element(el) = node {
            if el.local_name() == local {
                return Some(el);
            }
            if let Some(found) = find_first(&el.children, local) {
                return Some(found);
            }
        }
    }
    None
}

fn find_first_mut<'a>(nodes: &'a mut [XmlNode], local: &str) -> Option<&'a mut Element> {
    for node in nodes {
        if let XmlNode::Element(el) = node {
            if el.local_name() == local {
                return Some(el);
            }
            if let Some(found) = find_first_mut(&mut el.children, local) {
                return Some(found);
            }
        }
    }
    None
}

fn collect_elements<'a>(nodes: &'a [XmlNode], local: &str, out: &mut Vec<&'a Element>) {
    for node in nodes {
        if let XmlNode::Element(el) = node {
            if el.local_name() == local {
                out.push(el);
            }
            collect_elements(&el.children, local, out);
        }
    }
}

fn visit_elements_mut(nodes: &mut [XmlNode], local: &str, f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let XmlNode::Element(el) = node {
            if el.local_name() == local {
                f(&mut *el);
            }
            visit_elements_mut(&mut el.children, local, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<root atributo='aspas simples'>\n",
        "  <!-- comentario -->\n",
        "  <filho  a=\"1\" >texto &amp; escape</filho>\n",
        "  <vazio/>\n",
        "</root>"
    );

    #[test]
    fn round_trip_is_byte_identical() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.to_xml(), SAMPLE);
    }

    #[test]
    fn attribute_quoting_preserved_and_read() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        assert_eq!(
            doc.root().attribute("atributo").as_deref(),
            Some("aspas simples")
        );
        let filho = doc.first_element("filho").unwrap();
        assert_eq!(filho.attribute("a").as_deref(), Some("1"));
        assert_eq!(filho.attribute("b"), None);
    }

    #[test]
    fn text_content_resolves_entities() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let filho = doc.first_element("filho").unwrap();
        assert_eq!(filho.text_content(), "texto & escape");
    }

    #[test]
    fn set_child_text_overwrites_in_place() {
        let mut doc = XmlDocument::parse(SAMPLE).unwrap();
        doc.first_element_mut("root")
            .unwrap()
            .set_child_text("filho", "novo");
        let out = doc.to_xml();
        assert!(out.contains("<filho  a=\"1\" >novo</filho>"));
        // Untouched sibling still exact.
        assert!(out.contains("<vazio/>"));
    }

    #[test]
    fn set_child_text_creates_missing_child() {
        let mut doc = XmlDocument::parse("<a><b>1</b></a>").unwrap();
        doc.first_element_mut("a").unwrap().set_child_text("c", "2");
        assert_eq!(doc.to_xml(), "<a><b>1</b><c>2</c></a>");
    }

    #[test]
    fn set_child_text_expands_self_closing() {
        let mut doc = XmlDocument::parse("<a><b/></a>").unwrap();
        doc.first_element_mut("a").unwrap().set_child_text("b", "x");
        assert_eq!(doc.to_xml(), "<a><b>x</b></a>");
    }

    #[test]
    fn set_child_text_escapes_value() {
        let mut doc = XmlDocument::parse("<a><b>1</b></a>").unwrap();
        doc.first_element_mut("a")
            .unwrap()
            .set_child_text("b", "R&D <ltda>");
        assert_eq!(doc.to_xml(), "<a><b>R&amp;D &lt;ltda&gt;</b></a>");
    }

    #[test]
    fn remove_child_leaves_siblings() {
        let mut doc = XmlDocument::parse("<a> <b>1</b> <c>2</c> </a>").unwrap();
        assert!(doc.first_element_mut("a").unwrap().remove_child("b"));
        assert!(!doc.first_element_mut("a").unwrap().remove_child("b"));
        assert_eq!(doc.to_xml(), "<a>  <c>2</c> </a>");
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("<a>").is_err());
        assert!(XmlDocument::parse("apenas texto").is_err());
        assert!(XmlDocument::parse("<a/><b/>").is_err());
        assert!(XmlDocument::parse("").is_err());
    }

    #[test]
    fn elements_in_document_order() {
        let doc =
            XmlDocument::parse("<r><det n=\"1\"/><x><det n=\"2\"/></x><det n=\"3\"/></r>")
                .unwrap();
        let order: Vec<String> = doc
            .elements("det")
            .iter()
            .map(|d| d.attribute("n").unwrap())
            .collect();
        assert_eq!(order, ["1", "2", "3"]);
    }

    #[test]
    fn prefixed_names_match_local() {
        let doc = XmlDocument::parse("<ns:r xmlns:ns=\"u\"><ns:det/></ns:r>").unwrap();
        assert!(doc.first_element("det").is_some());
        assert_eq!(doc.root().local_name(), "r");
    }
}

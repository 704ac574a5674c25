/// Parsing and serialization of whole XML parts.
use crate::common::xml::{escape_attr, escape_text, resolve_entity};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::xml::element::{Attribute, Element, Node};
use crate::ooxml::xml::name::{XName, ns, well_known_prefix};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// A parsed XML part: the root element plus the namespace declarations
/// that should be written on it.
///
/// Declarations found anywhere in the source document are hoisted to the root on
/// output, so a declaration recorded here survives even when no element uses it
/// (`mc:Ignorable` refers to prefixes, not to names in the tree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
    /// `(prefix, uri)` pairs in declaration order; never contains the default namespace.
    namespaces: Vec<(String, String)>,
}

impl XmlDocument {
    /// Create a document from a root element, with no recorded declarations.
    pub fn new(root: Element) -> Self {
        Self {
            root,
            namespaces: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> &Element {
        &self.root
    }

    #[inline]
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    #[inline]
    pub fn into_root(self) -> Element {
        self.root
    }

    /// Recorded namespace declarations, in order.
    #[inline]
    pub fn namespaces(&self) -> &[(String, String)] {
        &self.namespaces
    }

    /// Record a namespace declaration.
    ///
    /// Ignored when the URI is already bound or the prefix is already taken.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        if prefix.is_empty() || prefix == "xml" || prefix == "xmlns" {
            return;
        }
        if self
            .namespaces
            .iter()
            .any(|(p, u)| p == prefix || u == uri)
        {
            return;
        }
        self.namespaces.push((prefix.to_string(), uri.to_string()));
    }

    /// Recorded prefix for a namespace URI.
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Recorded URI for a prefix.
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, u)| u.as_str())
    }

    /// Parse a complete XML document.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();

        let mut scopes: Vec<Vec<(String, String)>> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut namespaces: Vec<(String, String)> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let element = open_element(e, &mut scopes, &mut namespaces)?;
                    stack.push(element);
                },
                Event::Empty(ref e) => {
                    let element = open_element(e, &mut scopes, &mut namespaces)?;
                    scopes.pop();
                    close_element(element, &mut stack, &mut root)?;
                },
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| OoxmlError::Xml("unbalanced end tag".to_string()))?;
                    scopes.pop();
                    close_element(element, &mut stack, &mut root)?;
                },
                Event::Text(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = std::str::from_utf8(e)?;
                        push_text(parent, text);
                    }
                },
                Event::CData(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = std::str::from_utf8(e)?;
                        push_text(parent, text);
                    }
                },
                Event::GeneralRef(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        let name = std::str::from_utf8(e)?;
                        let ch = resolve_entity(name).ok_or_else(|| {
                            OoxmlError::Xml(format!("unknown entity reference &{};", name))
                        })?;
                        let mut tmp = [0u8; 4];
                        push_text(parent, ch.encode_utf8(&mut tmp));
                    }
                },
                Event::Comment(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = std::str::from_utf8(e)?;
                        parent.nodes_mut().push(Node::Comment(text.to_string()));
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(OoxmlError::Xml("unexpected end of document".to_string()));
        }
        let root = root.ok_or_else(|| OoxmlError::Xml("document has no root element".to_string()))?;
        Ok(Self { root, namespaces })
    }

    /// Serialize to UTF-8 bytes with a standalone XML declaration.
    pub fn to_xml_bytes(&self) -> Vec<u8> {
        self.to_xml_string().into_bytes()
    }

    /// Serialize to a string with a standalone XML declaration.
    pub fn to_xml_string(&self) -> String {
        let prefixes = self.assign_prefixes();

        let mut out = String::with_capacity(4096);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push_str("\r\n");

        let mut decls = String::new();
        for (prefix, uri) in &prefixes.ordered {
            decls.push_str(" xmlns:");
            decls.push_str(prefix);
            decls.push_str("=\"");
            decls.push_str(&escape_attr(uri));
            decls.push('"');
        }
        write_element(&self.root, &prefixes, Some(&decls), &mut out);
        out
    }

    fn assign_prefixes(&self) -> Prefixes {
        let mut prefixes = Prefixes::default();
        for (prefix, uri) in &self.namespaces {
            prefixes.bind(prefix, uri);
        }

        let mut used: Vec<&str> = Vec::new();
        for element in self.root.descendants_and_self() {
            let names = std::iter::once(element.name()).chain(element.attributes().iter().map(|a| &a.name));
            for name in names {
                let uri = name.namespace();
                if !uri.is_empty() && uri != ns::XML && !used.contains(&uri) {
                    used.push(uri);
                }
            }
        }

        let mut counter = 0usize;
        for uri in used {
            if prefixes.by_uri.contains_key(uri) {
                continue;
            }
            if let Some(p) = well_known_prefix(uri)
                && !prefixes.is_taken(p)
            {
                prefixes.bind(p, uri);
                continue;
            }
            loop {
                let candidate = format!("ns{}", counter);
                counter += 1;
                if !prefixes.is_taken(&candidate) {
                    prefixes.bind(&candidate, uri);
                    break;
                }
            }
        }
        prefixes
    }
}

#[derive(Default)]
struct Prefixes {
    ordered: Vec<(String, String)>,
    by_uri: HashMap<String, String>,
}

impl Prefixes {
    fn bind(&mut self, prefix: &str, uri: &str) {
        if self.by_uri.contains_key(uri) || self.is_taken(prefix) {
            return;
        }
        self.by_uri.insert(uri.to_string(), prefix.to_string());
        self.ordered.push((prefix.to_string(), uri.to_string()));
    }

    fn is_taken(&self, prefix: &str) -> bool {
        self.ordered.iter().any(|(p, _)| p == prefix)
    }

    fn qualify(&self, name: &XName, out: &mut String) {
        let uri = name.namespace();
        if uri == ns::XML {
            out.push_str("xml:");
        } else if !uri.is_empty()
            && let Some(prefix) = self.by_uri.get(uri)
        {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(name.local_name());
    }
}

fn push_text(parent: &mut Element, text: &str) {
    if let Some(Node::Text(existing)) = parent.nodes_mut().last_mut() {
        existing.push_str(text);
    } else {
        parent.nodes_mut().push(Node::Text(text.to_string()));
    }
}

fn resolve_prefix<'s>(scopes: &'s [Vec<(String, String)>], prefix: &str) -> Option<&'s str> {
    scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter().rev())
        .find(|(p, _)| p == prefix)
        .map(|(_, u)| u.as_str())
}

fn split_qname(qname: &str) -> (&str, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", qname),
    }
}

fn open_element(
    e: &BytesStart<'_>,
    scopes: &mut Vec<Vec<(String, String)>>,
    namespaces: &mut Vec<(String, String)>,
) -> Result<Element> {
    // Declarations first: they are in scope for the element's own name and attributes.
    let mut scope = Vec::new();
    let mut plain = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            scope.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            if !namespaces.iter().any(|(p, u)| p == prefix || *u == value) {
                namespaces.push((prefix.to_string(), value.clone()));
            }
            scope.push((prefix.to_string(), value));
        } else {
            plain.push((key, value));
        }
    }
    scopes.push(scope);

    let qname = std::str::from_utf8(e.name().as_ref())?.to_string();
    let (prefix, local) = split_qname(&qname);
    let namespace = if prefix == "xml" {
        ns::XML
    } else {
        match resolve_prefix(scopes, prefix) {
            Some(uri) => uri,
            None if prefix.is_empty() => "",
            None => {
                return Err(OoxmlError::Xml(format!(
                    "undeclared namespace prefix '{}'",
                    prefix
                )));
            },
        }
    };
    let mut element = Element::new(XName::new(namespace, local));

    for (key, value) in plain {
        let (prefix, local) = split_qname(&key);
        let name = if prefix.is_empty() {
            XName::unqualified(local)
        } else if prefix == "xml" {
            XName::new(ns::XML, local)
        } else {
            let uri = resolve_prefix(scopes, prefix).ok_or_else(|| {
                OoxmlError::Xml(format!("undeclared namespace prefix '{}'", prefix))
            })?;
            XName::new(uri, local)
        };
        element.attributes_mut().push(Attribute { name, value });
    }
    Ok(element)
}

fn close_element(element: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None => {
            if root.is_some() {
                return Err(OoxmlError::Xml("multiple root elements".to_string()));
            }
            *root = Some(element);
        },
    }
    Ok(())
}

fn write_element(element: &Element, prefixes: &Prefixes, decls: Option<&str>, out: &mut String) {
    out.push('<');
    prefixes.qualify(element.name(), out);
    if let Some(decls) = decls {
        out.push_str(decls);
    }
    for attr in element.attributes() {
        out.push(' ');
        prefixes.qualify(&attr.name, out);
        out.push_str("=\"");
        out.push_str(&escape_attr(&attr.value));
        out.push('"');
    }

    if element.nodes().is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for node in element.nodes() {
        match node {
            Node::Element(child) => write_element(child, prefixes, None, out),
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            },
        }
    }
    out.push_str("</");
    prefixes.qualify(element.name(), out);
    out.push('>');
}

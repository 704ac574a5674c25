/// Mutable, namespace-resolved XML element tree.
///
/// Every name in the tree is an expanded [`XName`]; prefixes only exist at the
/// document boundary (parsing and serialization). This lets content move freely
/// between parts whose root elements bind different prefixes.
use crate::ooxml::xml::name::XName;
use smallvec::SmallVec;

/// A single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: XName,
    pub value: String,
}

/// A child node of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    #[inline]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn into_element(self) -> Option<Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: XName,
    attributes: SmallVec<[Attribute; 4]>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: XName) -> Self {
        Self {
            name,
            attributes: SmallVec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr<V: Into<String>>(mut self, name: XName, value: V) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder-style text appender.
    pub fn with_text<T: Into<String>>(mut self, text: T) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    #[inline]
    pub fn name(&self) -> &XName {
        &self.name
    }

    #[inline]
    pub fn set_name(&mut self, name: XName) {
        self.name = name;
    }

    /// Check the element's expanded name.
    #[inline]
    pub fn is(&self, name: &XName) -> bool {
        self.name == *name
    }

    /// Check whether the element's name is any of `names`.
    #[inline]
    pub fn is_any(&self, names: &[XName]) -> bool {
        names.iter().any(|n| self.name == *n)
    }

    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[inline]
    pub fn attributes_mut(&mut self) -> &mut SmallVec<[Attribute; 4]> {
        &mut self.attributes
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &XName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == *name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing value and keeping its position.
    pub fn set_attr<V: Into<String>>(&mut self, name: XName, value: V) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &XName) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == *name)?;
        Some(self.attributes.remove(pos).value)
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Iterate over child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Iterate mutably over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// Iterate over child elements with the given name.
    pub fn elements_named<'a>(&'a self, name: &XName) -> impl Iterator<Item = &'a Element> + use<'a> {
        let name = name.clone();
        self.elements().filter(move |e| e.is(&name))
    }

    /// First child element with the given name.
    pub fn child(&self, name: &XName) -> Option<&Element> {
        self.elements().find(|e| e.is(name))
    }

    /// First child element with the given name, mutably.
    pub fn child_mut(&mut self, name: &XName) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(name))
    }

    /// Value of `w:val`-style attribute on a named child.
    pub fn child_attr(&self, child: &XName, attr: &XName) -> Option<&str> {
        self.child(child).and_then(|c| c.attr(attr))
    }

    /// Index (into [`Element::nodes`]) of the first child element with the given name.
    pub fn position_of(&self, name: &XName) -> Option<usize> {
        self.children
            .iter()
            .position(|n| n.as_element().is_some_and(|e| e.is(name)))
    }

    /// Append a child element.
    #[inline]
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Insert a child node at the given node index.
    #[inline]
    pub fn insert(&mut self, index: usize, child: Node) {
        self.children.insert(index, child);
    }

    /// Keep only the direct child elements for which `keep` returns true.
    /// Text and comment nodes are untouched.
    pub fn retain_elements<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Element) -> bool,
    {
        self.children.retain(|n| match n {
            Node::Element(e) => keep(e),
            _ => true,
        });
    }

    /// Remove every descendant element (at any depth) matching `remove`.
    /// A removed element's subtree is discarded without being visited.
    pub fn remove_descendants<F>(&mut self, remove: &mut F)
    where
        F: FnMut(&Element) -> bool,
    {
        self.children.retain(|n| match n {
            Node::Element(e) => !remove(e),
            _ => true,
        });
        for child in self.elements_mut() {
            child.remove_descendants(remove);
        }
    }

    /// Pre-order iterator over all descendant elements, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    /// Pre-order iterator over `self` and all descendant elements.
    pub fn descendants_and_self(&self) -> impl Iterator<Item = &Element> {
        std::iter::once(self).chain(self.descendants())
    }

    /// Visit `self` and every descendant element in pre-order.
    ///
    /// The callback may rewrite the visited element's children; the rewritten
    /// children are what gets visited next.
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        f(self);
        for child in self.elements_mut() {
            child.visit_mut(f);
        }
    }

    /// Fallible variant of [`Element::visit_mut`]; stops at the first error.
    pub fn try_visit_mut<F, E>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut Element) -> Result<(), E>,
    {
        f(self)?;
        for child in self.elements_mut() {
            child.try_visit_mut(f)?;
        }
        Ok(())
    }

    /// Concatenated text content of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                Node::Comment(_) => {},
            }
        }
    }
}

/// Pre-order iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Node::Element(e)) => {
                    self.stack.push(e.children.iter());
                    return Some(e);
                },
                Some(_) => continue,
                None => {
                    self.stack.pop();
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::xml::name::{noname, w};

    fn sample() -> Element {
        Element::new(w::body)
            .with_child(
                Element::new(w::p)
                    .with_child(Element::new(w::pPr).with_child(
                        Element::new(w::pStyle).with_attr(w::val, "Heading1"),
                    ))
                    .with_child(
                        Element::new(w::r)
                            .with_child(Element::new(w::t).with_text("Hello")),
                    ),
            )
            .with_child(Element::new(w::sectPr))
    }

    #[test]
    fn test_descendants_preorder() {
        let body = sample();
        let names: Vec<&str> = body.descendants().map(|e| e.name().local_name()).collect();
        assert_eq!(names, vec!["p", "pPr", "pStyle", "r", "t", "sectPr"]);
    }

    #[test]
    fn test_attr_set_and_remove() {
        let mut el = Element::new(w::bookmarkStart).with_attr(w::id, "1");
        el.set_attr(w::id, "7");
        el.set_attr(w::name, "_Toc");
        assert_eq!(el.attr(&w::id), Some("7"));
        assert_eq!(el.attributes().len(), 2);
        assert_eq!(el.remove_attr(&w::id), Some("7".to_string()));
        assert_eq!(el.attr(&w::id), None);
        assert_eq!(el.attr(&noname::id), None);
    }

    #[test]
    fn test_remove_descendants_any_depth() {
        let mut body = sample();
        body.remove_descendants(&mut |e| e.is(&w::pStyle) || e.is(&w::sectPr));
        assert!(body.descendants().all(|e| !e.is(&w::pStyle)));
        assert_eq!(body.elements().count(), 1);
    }

    #[test]
    fn test_visit_mut_and_text() {
        let mut body = sample();
        body.visit_mut(&mut |e| {
            if e.is(&w::pStyle) {
                e.set_attr(w::val, "Title");
            }
        });
        let style = body.descendants().find(|e| e.is(&w::pStyle)).unwrap();
        assert_eq!(style.attr(&w::val), Some("Title"));
        assert_eq!(body.text(), "Hello");
    }

    #[test]
    fn test_try_visit_mut_stops_on_error() {
        let mut body = sample();
        let mut seen = 0;
        let result: Result<(), &str> = body.try_visit_mut(&mut |e| {
            seen += 1;
            if e.is(&w::pStyle) { Err("stop") } else { Ok(()) }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(seen, 4);
    }
}

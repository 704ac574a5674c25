/// Shared state for one build and for one source's merge into the target.
use super::error::{BuilderError, Result};
use super::ids::IdAllocator;
use super::images::ImageCache;
use super::options::BuilderOptions;
use crate::ooxml::opc::error::OpcError;
use crate::ooxml::opc::{OpcPackage, PackURI, Part, XmlPart};
use crate::ooxml::xml::name::{mc, w};
use crate::ooxml::xml::{Element, XName, XmlDocument, ns};
use log::debug;
use std::collections::HashMap;

/// State that outlives a single source: id counters, the image cache and
/// the record of parts already copied into the target.
#[derive(Debug, Default)]
pub(crate) struct BuildState {
    pub(crate) ids: IdAllocator,
    pub(crate) images: ImageCache,
    /// `(source index, source partname)` to target partname, for parts copied wholesale
    pub(crate) copied: HashMap<(usize, PackURI), PackURI>,
    /// `(numbering partname, abstractNumId)` to the serial of the step that created it
    pub(crate) abstract_epochs: HashMap<(PackURI, String), usize>,
    serial: usize,
}

impl BuildState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serial number for the next merge step; never repeats within a build.
    pub(crate) fn next_serial(&mut self) -> usize {
        self.serial += 1;
        self.serial
    }
}

/// Source-to-target id maps that are only valid while one source is merged.
#[derive(Debug, Default)]
pub(crate) struct StepMaps {
    /// `(source part, source rId, target part)` to target rId
    pub(crate) rels: HashMap<(PackURI, String, PackURI), String>,
    /// Header/footer parts cloned in this step
    pub(crate) content_parts: HashMap<PackURI, PackURI>,
    /// Cloned header/footer parts whose style and numbering references are not yet remapped
    pub(crate) pending_content: Vec<PackURI>,
    pub(crate) styles: HashMap<String, String>,
    pub(crate) nums: HashMap<String, String>,
    pub(crate) abstract_nums: HashMap<String, String>,
    pub(crate) pic_bullets: HashMap<String, String>,
}

/// One source's merge into the target.
///
/// `source_container` and `target_container` are the parts whose content is
/// being moved: the main documents, or the glossary documents. Auxiliary parts
/// (styles, numbering, notes, comments) are always those related to the
/// containers.
pub(crate) struct MergeStep<'a> {
    pub(crate) index: usize,
    pub(crate) serial: usize,
    pub(crate) source: &'a OpcPackage,
    pub(crate) source_container: PackURI,
    pub(crate) target: &'a mut OpcPackage,
    pub(crate) target_container: PackURI,
    pub(crate) state: &'a mut BuildState,
    pub(crate) options: &'a BuilderOptions,
    pub(crate) maps: StepMaps,
}

impl<'a> MergeStep<'a> {
    pub(crate) fn new(
        index: usize,
        source: &'a OpcPackage,
        source_container: PackURI,
        target: &'a mut OpcPackage,
        target_container: PackURI,
        state: &'a mut BuildState,
        options: &'a BuilderOptions,
    ) -> Self {
        let serial = state.next_serial();
        Self {
            index,
            serial,
            source,
            source_container,
            target,
            target_container,
            state,
            options,
            maps: StepMaps::default(),
        }
    }

    #[inline]
    pub(crate) fn invalid<S: Into<String>>(&self, reason: S) -> BuilderError {
        BuilderError::invalid(self.index, reason)
    }

    /// Source part related to the source container by `reltype`.
    #[inline]
    pub(crate) fn source_related(&self, reltype: &str) -> Option<PackURI> {
        self.source.related_partname(&self.source_container, reltype)
    }

    /// Target part related to the target container by `reltype`.
    #[inline]
    pub(crate) fn target_related(&self, reltype: &str) -> Option<PackURI> {
        self.target.related_partname(&self.target_container, reltype)
    }

    /// Add an internal relationship with a fresh id from `from` to `to`.
    pub(crate) fn add_internal_rel(&mut self, from: &PackURI, to: &PackURI, reltype: &str) -> Result<String> {
        let target_ref = to.relative_ref(from.base_uri());
        let part = self.target.get_part_mut(from)?;
        let r_id = self.state.ids.rel_id(part.rels());
        part.rels_mut()
            .add_relationship(reltype.to_string(), target_ref, r_id.clone(), false);
        Ok(r_id)
    }

    /// Find the target container's auxiliary part of `reltype`, creating an
    /// empty one next to the container when it does not exist yet.
    pub(crate) fn ensure_target_part(
        &mut self,
        reltype: &str,
        content_type: &str,
        filename: &str,
        root: XName,
    ) -> Result<PackURI> {
        if let Some(partname) = self.target_related(reltype) {
            return Ok(partname);
        }

        let dir = self.target_container.base_uri().to_string();
        let mut partname = PackURI::new(format!("{}/{}", dir.trim_end_matches('/'), filename))
            .map_err(OpcError::InvalidPackUri)?;
        if self.target.contains_part(&partname) {
            partname = self.target.next_partname(&partname.template_in(&dir))?;
        }

        self.target.add_part(Box::new(XmlPart::new(
            partname.clone(),
            content_type.to_string(),
            new_wml_document(Element::new(root)),
        )));
        let container = self.target_container.clone();
        self.add_internal_rel(&container, &partname, reltype)?;
        debug!("created {} for {}", partname, container);
        Ok(partname)
    }

    /// Rewrite style and numbering references in content copied from the source.
    pub(crate) fn process_content(&mut self, tree: &mut Element) -> Result<()> {
        self.remap_styles(tree);
        self.apply_numbering(tree)
    }

    /// Carry the namespace declarations of a source part over to a target part.
    pub(crate) fn merge_namespaces_into(&mut self, source_part: &PackURI, target_part: &PackURI) -> Result<()> {
        let source = self.source;
        let src = source.xml_part(source_part)?;
        let dst = self.target.xml_part_mut(target_part)?;
        merge_namespaces(src, dst);
        Ok(())
    }
}

/// Empty WordprocessingML part content with the usual prefixes declared.
pub(crate) fn new_wml_document(root: Element) -> XmlDocument {
    let mut document = XmlDocument::new(root);
    document.declare_namespace("w", ns::W);
    document.declare_namespace("r", ns::R);
    document
}

/// Union the declarations and `mc:Ignorable` prefixes of `src` into `dst`.
///
/// An ignorable prefix is only carried over when `dst` binds a prefix to the
/// same namespace, so the attribute never names an undeclared prefix.
pub(crate) fn merge_namespaces(src: &XmlDocument, dst: &mut XmlDocument) {
    for (prefix, uri) in src.namespaces() {
        dst.declare_namespace(prefix, uri);
    }

    let Some(ignorable) = src.root().attr(&mc::Ignorable) else {
        return;
    };

    let mut tokens: Vec<String> = dst
        .root()
        .attr(&mc::Ignorable)
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let before = tokens.len();

    for token in ignorable.split_whitespace() {
        let Some(uri) = src.uri_for(token) else {
            continue;
        };
        let Some(prefix) = dst.prefix_for(uri) else {
            continue;
        };
        if !tokens.iter().any(|t| t == prefix) {
            tokens.push(prefix.to_string());
        }
    }

    if tokens.len() != before {
        dst.declare_namespace("mc", ns::MC);
        dst.root_mut().set_attr(mc::Ignorable, tokens.join(" "));
    }
}

/// Body element of a main document root.
pub(crate) fn body_mut(doc: &mut XmlDocument) -> Option<&mut Element> {
    doc.root_mut().child_mut(&w::body)
}

/// Distinct values of `attr` on elements named in `names`, in document order.
pub(crate) fn distinct_attr_values(fragment: &[Element], names: &[XName], attr: &XName) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for element in fragment.iter().flat_map(|e| e.descendants_and_self()) {
        if !element.is_any(names) {
            continue;
        }
        if let Some(value) = element.attr(attr)
            && !values.iter().any(|v| v == value)
        {
            values.push(value.to_string());
        }
    }
    values
}

/// Rewrite `attr` on elements named in `names` through `map`.
pub(crate) fn rewrite_attr_values(
    fragment: &mut [Element],
    names: &[XName],
    attr: &XName,
    map: &HashMap<String, String>,
) {
    if map.is_empty() {
        return;
    }
    for element in fragment.iter_mut() {
        element.visit_mut(&mut |e| {
            if !e.is_any(names) {
                return;
            }
            if let Some(new) = e.attr(attr).and_then(|v| map.get(v)).cloned() {
                e.set_attr(attr.clone(), new);
            }
        });
    }
}

/// Remove every element named in `names` whose `attr` is one of `values`.
pub(crate) fn remove_by_attr(fragment: &mut Vec<Element>, names: &[XName], attr: &XName, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let mut doomed =
        |e: &Element| e.is_any(names) && e.attr(attr).is_some_and(|v| values.iter().any(|x| x == v));
    fragment.retain(|e| !doomed(e));
    for element in fragment.iter_mut() {
        element.remove_descendants(&mut doomed);
    }
}

/// Relationship grafting: moving relationship-bearing markup between parts.
///
/// Every attribute listed in [`REL_ATTRIBUTES`] holds the id of a relationship
/// of the part the markup lives in. When markup moves to another part, the
/// relationship is recreated there under a fresh id and the attribute rewritten.
/// The related part comes along too: images through the image cache,
/// headers and footers as cloned content parts, and anything else (charts,
/// diagrams, embedded objects, fonts) copied wholesale with its own
/// relationships intact.
use super::error::Result;
use super::step::{MergeStep, merge_namespaces};
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::{PackURI, Part, Relationship, XmlPart};
use crate::ooxml::xml::name::{a, asvg, c, dgm, o, r, v, w, wne};
use crate::ooxml::xml::{Element, XName, XmlDocument};
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Elements that refer to relationships, and the attributes holding the ids.
pub(crate) static REL_ATTRIBUTES: Lazy<HashMap<XName, Vec<XName>>> = Lazy::new(|| {
    let mut table: HashMap<XName, Vec<XName>> = HashMap::new();
    let mut add = |names: &[XName], attrs: &[XName]| {
        for name in names {
            table.insert(name.clone(), attrs.to_vec());
        }
    };

    add(&[a::blip, asvg::svgBlip], &[r::embed, r::link]);
    add(&[a::hlinkClick, a::hlinkHover, a::hlinkMouseOver], &[r::id]);
    add(
        &[a::audioFile, a::videoFile, a::quickTimeFile, a::wavAudioFile],
        &[r::embed, r::link],
    );
    add(&[dgm::relIds], &[r::dm, r::lo, r::qs, r::cs]);
    add(&[c::chart, c::externalData, c::userShapes], &[r::id]);
    add(&[o::OLEObject], &[r::id]);
    add(&[v::fill, v::stroke], &[r::id]);
    add(&[v::imagedata], &[r::id, r::href, r::pict, o::relid]);
    add(
        &[
            w::hyperlink,
            w::headerReference,
            w::footerReference,
            w::altChunk,
            w::subDoc,
            w::control,
            w::attachedTemplate,
            w::dataSource,
            w::headerSource,
            w::sourceFileName,
            w::printerSettings,
            w::recipientData,
            w::src,
            w::embedRegular,
            w::embedBold,
            w::embedItalic,
            w::embedBoldItalic,
        ],
        &[r::id],
    );
    add(&[wne::toolbarData], &[r::id]);
    table
});

impl MergeStep<'_> {
    /// Re-home every relationship referenced from `tree`.
    ///
    /// `src_part` is the source part the markup was taken from and `dst_part`
    /// the target part it is moving to. Within one step, the same source id
    /// grafted onto the same destination part always maps to the same new id.
    pub(crate) fn graft(&mut self, src_part: &PackURI, dst_part: &PackURI, tree: &mut Element) -> Result<()> {
        tree.try_visit_mut(&mut |element: &mut Element| -> Result<()> {
            let Some(attrs) = REL_ATTRIBUTES.get(element.name()) else {
                return Ok(());
            };
            for attr in attrs {
                let Some(old_id) = element.attr(attr).filter(|id| !id.is_empty()).map(str::to_string) else {
                    continue;
                };
                let new_id = self.graft_rel(src_part, dst_part, &old_id)?;
                element.set_attr(attr.clone(), new_id);
            }
            Ok(())
        })
    }

    fn graft_rel(&mut self, src_part: &PackURI, dst_part: &PackURI, old_id: &str) -> Result<String> {
        let key = (src_part.clone(), old_id.to_string(), dst_part.clone());
        if let Some(new_id) = self.maps.rels.get(&key) {
            return Ok(new_id.clone());
        }

        let source = self.source;
        let rel = source
            .get_part(src_part)?
            .rels()
            .get(old_id)
            .ok_or_else(|| self.invalid(format!("relationship {} not found in {}", old_id, src_part)))?;

        let new_id = if rel.is_external() {
            let part = self.target.get_part_mut(dst_part)?;
            let new_id = self.state.ids.rel_id(part.rels());
            part.rels_mut().add_relationship(
                rel.reltype().to_string(),
                rel.target_ref().to_string(),
                new_id.clone(),
                true,
            );
            new_id
        } else {
            let src_target = rel.target_partname()?;
            if !source.contains_part(&src_target) {
                return Err(self.invalid(format!(
                    "relationship {} in {} targets missing part {}",
                    old_id, src_part, src_target
                )));
            }
            let dst_target = match rel.reltype() {
                rt::IMAGE => self.copy_image(&src_target, dst_part)?,
                rt::HEADER | rt::FOOTER => self.clone_content_part(&src_target)?,
                _ => self.copy_part(&src_target)?,
            };
            self.add_internal_rel(dst_part, &dst_target, rel.reltype())?
        };

        self.maps.rels.insert(key, new_id.clone());
        Ok(new_id)
    }

    /// Copy a source part, and everything it relates to, into the target.
    ///
    /// Relationship ids inside the copy are kept, since its markup is not
    /// rewritten. A part is copied at most once per source.
    pub(crate) fn copy_part(&mut self, src_partname: &PackURI) -> Result<PackURI> {
        let key = (self.index, src_partname.clone());
        if let Some(partname) = self.state.copied.get(&key) {
            return Ok(partname.clone());
        }

        let source = self.source;
        let part = source.get_part(src_partname)?;
        let partname = if self.target.contains_part(src_partname) {
            self.target
                .next_partname(&src_partname.template_in(src_partname.base_uri()))?
        } else {
            src_partname.clone()
        };

        self.target.add_part(part.duplicate(partname.clone()));
        self.state.copied.insert(key, partname.clone());
        debug!("copied {} to {}", src_partname, partname);

        let rels: Vec<&Relationship> = part.rels().iter().collect();
        for rel in rels {
            if rel.is_external() {
                self.target.get_part_mut(&partname)?.rels_mut().add_relationship(
                    rel.reltype().to_string(),
                    rel.target_ref().to_string(),
                    rel.r_id().to_string(),
                    true,
                );
                continue;
            }

            let child = rel.target_partname()?;
            if !source.contains_part(&child) {
                warn!(
                    "source {}: {} relates to missing part {}, relationship dropped",
                    self.index, src_partname, child
                );
                continue;
            }
            let dst_child = if rel.reltype() == rt::IMAGE {
                self.copy_image(&child, &partname)?
            } else {
                self.copy_part(&child)?
            };
            let target_ref = dst_child.relative_ref(partname.base_uri());
            self.target.get_part_mut(&partname)?.rels_mut().add_relationship(
                rel.reltype().to_string(),
                target_ref,
                rel.r_id().to_string(),
                false,
            );
        }

        Ok(partname)
    }

    /// Clone a header or footer part next to the target container.
    ///
    /// Unlike wholesale copies, the clone's markup is grafted, so it gets fresh
    /// relationship ids. Its style and numbering references are remapped later
    /// by [`MergeStep::process_cloned_parts`], once the step's style map is known.
    pub(crate) fn clone_content_part(&mut self, src_partname: &PackURI) -> Result<PackURI> {
        if let Some(partname) = self.maps.content_parts.get(src_partname) {
            return Ok(partname.clone());
        }

        let source = self.source;
        let part = source.get_part(src_partname)?;
        let doc = part
            .xml()
            .ok_or_else(|| self.invalid(format!("{} is not an XML part", src_partname)))?;

        let dir = self.target_container.base_uri().to_string();
        let partname = self
            .target
            .next_partname(&src_partname.template_in(&dir))?;
        let mut root = doc.root().clone();
        self.target.add_part(Box::new(XmlPart::new(
            partname.clone(),
            part.content_type().to_string(),
            XmlDocument::new(Element::new(root.name().clone())),
        )));
        self.maps
            .content_parts
            .insert(src_partname.clone(), partname.clone());

        self.graft(src_partname, &partname, &mut root)?;

        let dst = self.target.xml_part_mut(&partname)?;
        *dst.root_mut() = root;
        merge_namespaces(doc, dst);
        self.maps.pending_content.push(partname.clone());
        debug!("cloned {} to {}", src_partname, partname);
        Ok(partname)
    }

    /// Remap style and numbering references in the headers and footers cloned
    /// since the last call.
    pub(crate) fn process_cloned_parts(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.maps.pending_content);
        for partname in pending {
            let root = self.target.xml_part_mut(&partname)?.root_mut();
            let placeholder = Element::new(root.name().clone());
            let mut tree = std::mem::replace(root, placeholder);
            let processed = self.process_content(&mut tree);
            *self.target.xml_part_mut(&partname)?.root_mut() = tree;
            processed?;
        }
        Ok(())
    }
}

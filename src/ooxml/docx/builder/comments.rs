/// Comment merge.
use super::error::Result;
use super::ids::{IdSpace, format_id, ids_in};
use super::step::{MergeStep, distinct_attr_values, remove_by_attr, rewrite_attr_values};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::PackURI;
use crate::ooxml::xml::name::w;
use crate::ooxml::xml::{Element, XName};
use log::{debug, warn};
use std::collections::HashMap;

const COMMENT_MARKERS: [XName; 3] = [w::commentReference, w::commentRangeStart, w::commentRangeEnd];

impl MergeStep<'_> {
    /// Copy the comments `fragment` refers to into the target comments part
    /// under fresh ids, and rewrite the references and range markers.
    ///
    /// Markers of comments whose body is missing from the source are removed.
    pub(crate) fn merge_comments(&mut self, fragment: &mut Vec<Element>) -> Result<()> {
        let ids = distinct_attr_values(fragment, &COMMENT_MARKERS, &w::id);
        if ids.is_empty() {
            return Ok(());
        }

        let source = self.source;
        let src_part = self.source_related(rt::COMMENTS);
        let src_root = match &src_part {
            Some(partname) => Some(source.xml_part(partname)?.root()),
            None => None,
        };

        let mut map = HashMap::with_capacity(ids.len());
        let mut bodiless = Vec::new();
        let mut dst_part: Option<PackURI> = None;

        for id in ids {
            let body = src_root.and_then(|root| {
                root.elements_named(&w::comment)
                    .find(|c| c.attr(&w::id) == Some(id.as_str()))
            });
            let (Some(body), Some(src_part)) = (body, &src_part) else {
                bodiless.push(id);
                continue;
            };

            let dst = match &dst_part {
                Some(partname) => partname.clone(),
                None => {
                    let partname =
                        self.ensure_target_part(rt::COMMENTS, ct::WML_COMMENTS, "comments.xml", w::comments)?;
                    dst_part = Some(partname.clone());
                    partname
                }
            };

            let new_id = {
                let target = &*self.target;
                self.state
                    .ids
                    .next(IdSpace::Comment, dst.as_str(), || ids_in(target, &dst, &w::comment, &w::id))
            };
            let new_id = format_id(new_id);

            let mut clone = body.clone();
            clone.set_attr(w::id, new_id.clone());
            self.graft(src_part, &dst, &mut clone)?;
            self.process_content(&mut clone)?;
            self.target.xml_part_mut(&dst)?.root_mut().push(clone);

            debug!("source {}: comment {} -> {}", self.index, id, new_id);
            map.insert(id, new_id);
        }

        if let (Some(src), Some(dst)) = (&src_part, &dst_part) {
            self.merge_namespaces_into(src, dst)?;
        }

        // A new id may equal a bodiless source id, so remove first
        remove_by_attr(fragment, &COMMENT_MARKERS, &w::id, &bodiless);
        rewrite_attr_values(fragment, &COMMENT_MARKERS, &w::id, &map);
        if !bodiless.is_empty() {
            warn!(
                "source {}: comments {:?} have no body, references removed",
                self.index, bodiless
            );
        }
        Ok(())
    }
}

/// Numbering merge: list instances, abstract definitions and picture bullets.
///
/// Every numbering instance referenced by merged content gets a fresh `w:num`
/// in the target. Abstract definitions are shared by `w:nsid` with definitions
/// already in the target, except those introduced by the step in progress.
use super::error::Result;
use super::ids::{IdSpace, format_id, ids_in};
use super::step::{MergeStep, merge_namespaces};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::PackURI;
use crate::ooxml::xml::name::w;
use crate::ooxml::xml::{Element, Node, XName, XmlDocument};
use log::{debug, warn};
use std::collections::HashMap;

/// The value of `w:numId` that turns numbering off.
const NO_NUMBERING: &str = "0";

impl<'a> MergeStep<'a> {
    /// Rewrite every `w:numId` in `tree` to a target numbering instance.
    pub(crate) fn apply_numbering(&mut self, tree: &mut Element) -> Result<()> {
        let mut wanted: Vec<String> = Vec::new();
        for element in tree.descendants_and_self().filter(|e| e.is(&w::numId)) {
            if let Some(id) = element.attr(&w::val)
                && id != NO_NUMBERING
                && !wanted.iter().any(|seen| seen == id)
            {
                wanted.push(id.to_string());
            }
        }
        if wanted.is_empty() {
            return Ok(());
        }

        let mut map = HashMap::with_capacity(wanted.len());
        for id in wanted {
            let new = self.map_num(&id)?;
            map.insert(id, new);
        }

        tree.visit_mut(&mut |e: &mut Element| {
            if !e.is(&w::numId) {
                return;
            }
            if let Some(new) = e.attr(&w::val).and_then(|v| map.get(v)).cloned() {
                e.set_attr(w::val, new);
            }
        });
        Ok(())
    }

    /// Target `w:numId` for a source numbering instance.
    fn map_num(&mut self, src_id: &str) -> Result<String> {
        if let Some(new) = self.maps.nums.get(src_id) {
            return Ok(new.clone());
        }

        let source = self.source;
        let Some(src_part) = self.source_related(rt::NUMBERING) else {
            warn!(
                "source {}: numbering instance {} has no numbering part, numbering removed",
                self.index, src_id
            );
            self.maps.nums.insert(src_id.to_string(), NO_NUMBERING.to_string());
            return Ok(NO_NUMBERING.to_string());
        };
        let src_doc: &'a XmlDocument = source.xml_part(&src_part)?;

        let num = src_doc
            .root()
            .elements_named(&w::num)
            .find(|n| n.attr(&w::numId) == Some(src_id))
            .ok_or_else(|| self.invalid(format!("numbering instance {} is not defined", src_id)))?;
        let abstract_id = num
            .child_attr(&w::abstractNumId, &w::val)
            .ok_or_else(|| self.invalid(format!("numbering instance {} has no abstract definition", src_id)))?;

        let dst_part = self.ensure_target_part(rt::NUMBERING, ct::WML_NUMBERING, "numbering.xml", w::numbering)?;
        let target_abstract = self.map_abstract_num(&src_part, src_doc, abstract_id, &dst_part)?;

        let new_id = {
            let target = &*self.target;
            self.state
                .ids
                .next(IdSpace::Numbering, dst_part.as_str(), || ids_in(target, &dst_part, &w::num, &w::numId))
        };
        let new_id = format_id(new_id);

        let mut clone = num.clone();
        clone.set_attr(w::numId, new_id.clone());
        if let Some(link) = clone.child_mut(&w::abstractNumId) {
            link.set_attr(w::val, target_abstract);
        }
        self.remap_styles(&mut clone);
        self.map_pic_bullets(&src_part, src_doc, &dst_part, &mut clone)?;

        let dst = self.target.xml_part_mut(&dst_part)?;
        insert_in_schema_order(dst.root_mut(), clone);
        merge_namespaces(src_doc, dst);

        debug!("source {}: numbering instance {} -> {}", self.index, src_id, new_id);
        self.maps.nums.insert(src_id.to_string(), new_id.clone());
        Ok(new_id)
    }

    fn map_abstract_num(
        &mut self,
        src_part: &PackURI,
        src_doc: &'a XmlDocument,
        src_id: &str,
        dst_part: &PackURI,
    ) -> Result<String> {
        if let Some(new) = self.maps.abstract_nums.get(src_id) {
            return Ok(new.clone());
        }

        let definition = src_doc
            .root()
            .elements_named(&w::abstractNum)
            .find(|a| a.attr(&w::abstractNumId) == Some(src_id))
            .ok_or_else(|| self.invalid(format!("abstract numbering {} is not defined", src_id)))?;

        if let Some(nsid) = definition.child_attr(&w::nsid, &w::val) {
            let epochs = &self.state.abstract_epochs;
            let serial = self.serial;
            let reusable = self
                .target
                .xml_part(dst_part)?
                .root()
                .elements_named(&w::abstractNum)
                .filter(|a| a.child_attr(&w::nsid, &w::val) == Some(nsid))
                .filter_map(|a| a.attr(&w::abstractNumId))
                .find(|id| epochs.get(&(dst_part.clone(), id.to_string())) != Some(&serial))
                .map(str::to_string);
            if let Some(existing) = reusable {
                debug!(
                    "source {}: abstract numbering {} shares nsid {} with {}",
                    self.index, src_id, nsid, existing
                );
                self.maps.abstract_nums.insert(src_id.to_string(), existing.clone());
                return Ok(existing);
            }
        }

        let new_id = {
            let target = &*self.target;
            self.state.ids.next(IdSpace::AbstractNumbering, dst_part.as_str(), || {
                ids_in(target, dst_part, &w::abstractNum, &w::abstractNumId)
            })
        };
        let new_id = format_id(new_id);

        let mut clone = definition.clone();
        clone.set_attr(w::abstractNumId, new_id.clone());
        self.remap_styles(&mut clone);
        self.map_pic_bullets(src_part, src_doc, dst_part, &mut clone)?;

        insert_in_schema_order(self.target.xml_part_mut(dst_part)?.root_mut(), clone);
        self.state
            .abstract_epochs
            .insert((dst_part.clone(), new_id.clone()), self.serial);
        self.maps.abstract_nums.insert(src_id.to_string(), new_id.clone());
        Ok(new_id)
    }

    /// Clone the picture bullets `tree` refers to and rewrite the references.
    fn map_pic_bullets(
        &mut self,
        src_part: &PackURI,
        src_doc: &'a XmlDocument,
        dst_part: &PackURI,
        tree: &mut Element,
    ) -> Result<()> {
        let wanted: Vec<String> = tree
            .descendants_and_self()
            .filter(|e| e.is(&w::lvlPicBulletId))
            .filter_map(|e| e.attr(&w::val))
            .map(str::to_string)
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let mut map = HashMap::new();
        for id in wanted {
            if map.contains_key(&id) {
                continue;
            }
            let new = self.map_pic_bullet(src_part, src_doc, dst_part, &id)?;
            map.insert(id, new);
        }

        tree.visit_mut(&mut |e: &mut Element| {
            if !e.is(&w::lvlPicBulletId) {
                return;
            }
            if let Some(new) = e.attr(&w::val).and_then(|v| map.get(v)).cloned() {
                e.set_attr(w::val, new);
            }
        });
        Ok(())
    }

    fn map_pic_bullet(
        &mut self,
        src_part: &PackURI,
        src_doc: &'a XmlDocument,
        dst_part: &PackURI,
        src_id: &str,
    ) -> Result<String> {
        if let Some(new) = self.maps.pic_bullets.get(src_id) {
            return Ok(new.clone());
        }

        let bullet = src_doc
            .root()
            .elements_named(&w::numPicBullet)
            .find(|b| b.attr(&w::numPicBulletId) == Some(src_id))
            .ok_or_else(|| self.invalid(format!("picture bullet {} is not defined", src_id)))?;

        let new_id = {
            let target = &*self.target;
            self.state.ids.next(IdSpace::NumPicBullet, dst_part.as_str(), || {
                ids_in(target, dst_part, &w::numPicBullet, &w::numPicBulletId)
            })
        };
        let new_id = format_id(new_id);

        let mut clone = bullet.clone();
        clone.set_attr(w::numPicBulletId, new_id.clone());
        self.graft(src_part, dst_part, &mut clone)?;

        insert_in_schema_order(self.target.xml_part_mut(dst_part)?.root_mut(), clone);
        self.maps.pic_bullets.insert(src_id.to_string(), new_id.clone());
        Ok(new_id)
    }
}

/// Position of a `w:numbering` child in the schema's sequence.
fn schema_rank(name: &XName) -> u8 {
    if *name == w::numPicBullet {
        0
    } else if *name == w::abstractNum {
        1
    } else if *name == w::num {
        2
    } else if *name == w::numIdMacAtCleanup {
        3
    } else {
        0
    }
}

/// Insert after the last child that may precede `element`.
fn insert_in_schema_order(numbering: &mut Element, element: Element) {
    let rank = schema_rank(element.name());
    let pos = numbering
        .nodes()
        .iter()
        .rposition(|n| n.as_element().is_some_and(|e| schema_rank(e.name()) <= rank))
        .map(|p| p + 1)
        .unwrap_or(0);
    numbering.insert(pos, Node::Element(element));
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{Fixture, build_state, step_into, xml_of};
    use super::*;
    use crate::ooxml::docx::Package;

    const LIST: &str = r#"<w:abstractNum w:abstractNumId="0"><w:nsid w:val="1A2B3C4D"/><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>"#;
    const ITEM: &str = r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr></w:p>"#;

    fn num_ids(tree: &Element) -> Vec<String> {
        tree.descendants()
            .filter(|e| e.is(&w::numId))
            .filter_map(|e| e.attr(&w::val))
            .map(str::to_string)
            .collect()
    }

    fn apply(src: &Package, target: &mut Package, state: &mut super::super::step::BuildState) -> Element {
        let mut tree = src.main_document().unwrap().root().clone();
        let mut step = step_into(0, src, target, state);
        step.apply_numbering(&mut tree).unwrap();
        tree
    }

    #[test]
    fn test_instances_are_fresh_and_definitions_shared() {
        let src = Fixture::body(ITEM).numbering(LIST).package();
        let mut target = Package::new_document();
        let mut state = build_state();

        let first = apply(&src, &mut target, &mut state);
        let second = apply(&src, &mut target, &mut state);
        assert_eq!(num_ids(&first), vec!["1"]);
        assert_eq!(num_ids(&second), vec!["2"]);

        let numbering = xml_of(&target, "/word/numbering.xml").root();
        assert_eq!(numbering.elements_named(&w::abstractNum).count(), 1);
        let nums: Vec<&Element> = numbering.elements_named(&w::num).collect();
        assert_eq!(nums.len(), 2);
        assert!(nums.iter().all(|n| n.child_attr(&w::abstractNumId, &w::val) == Some("0")));
    }

    #[test]
    fn test_same_step_definitions_are_not_shared() {
        // Two definitions with one nsid in a single source stay separate
        let list = r#"<w:abstractNum w:abstractNumId="0"><w:nsid w:val="AAAA0001"/></w:abstractNum><w:abstractNum w:abstractNumId="1"><w:nsid w:val="AAAA0001"/></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num><w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>"#;
        let body = r#"<w:p><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr></w:pPr></w:p><w:p><w:pPr><w:numPr><w:numId w:val="2"/></w:numPr></w:pPr></w:p>"#;
        let src = Fixture::body(body).numbering(list).package();
        let mut target = Package::new_document();
        let mut state = build_state();
        apply(&src, &mut target, &mut state);

        let numbering = xml_of(&target, "/word/numbering.xml").root();
        assert_eq!(numbering.elements_named(&w::abstractNum).count(), 2);
    }

    #[test]
    fn test_zero_is_left_alone_and_order_is_kept() {
        let body = r#"<w:p><w:pPr><w:numPr><w:numId w:val="0"/></w:numPr></w:pPr></w:p>"#;
        let src = Fixture::body(&format!("{}{}", ITEM, body)).numbering(LIST).package();
        let mut target = Package::new_document();
        let mut state = build_state();
        let tree = apply(&src, &mut target, &mut state);
        assert_eq!(num_ids(&tree), vec!["1", "0"]);

        let names: Vec<&str> = xml_of(&target, "/word/numbering.xml")
            .root()
            .elements()
            .map(|e| e.name().local_name())
            .collect();
        assert_eq!(names, vec!["abstractNum", "num"]);
    }

    #[test]
    fn test_undefined_instance_is_invalid() {
        let src = Fixture::body(ITEM).numbering("").package();
        let mut target = Package::new_document();
        let mut state = build_state();
        let mut tree = src.main_document().unwrap().root().clone();
        let mut step = step_into(3, &src, &mut target, &mut state);
        let err = step.apply_numbering(&mut tree).unwrap_err();
        assert_eq!(err.source_index(), Some(3));
        assert!(err.to_string().contains("numbering instance 1"));
    }

    #[test]
    fn test_tracked_numbering_without_part_is_turned_off() {
        let body = r#"<w:p><w:pPr><w:numPr><w:numId w:val="5"/><w:ins w:id="1" w:author="a"/></w:numPr></w:pPr></w:p>"#;
        let src = Fixture::body(body).package();
        let mut target = Package::new_document();
        let mut state = build_state();
        let tree = apply(&src, &mut target, &mut state);
        assert_eq!(num_ids(&tree), vec!["0"]);
    }

    #[test]
    fn test_insert_in_schema_order() {
        let mut numbering = Element::new(w::numbering)
            .with_child(Element::new(w::abstractNum))
            .with_child(Element::new(w::num))
            .with_child(Element::new(w::numIdMacAtCleanup));
        insert_in_schema_order(&mut numbering, Element::new(w::numPicBullet));
        insert_in_schema_order(&mut numbering, Element::new(w::abstractNum).with_attr(w::abstractNumId, "9"));
        insert_in_schema_order(&mut numbering, Element::new(w::num).with_attr(w::numId, "9"));

        let names: Vec<&str> = numbering.elements().map(|e| e.name().local_name()).collect();
        assert_eq!(
            names,
            vec!["numPicBullet", "abstractNum", "abstractNum", "num", "num", "numIdMacAtCleanup"]
        );
    }
}

/// Section properties, placeholders and body splicing.
///
/// A WordprocessingML body ends with its final section's `w:sectPr`; every
/// earlier section lives in the `w:pPr` of the paragraph that closes it.
use super::error::Result;
use super::ids::IdAllocator;
use super::step::new_wml_document;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part, XmlPart};
use crate::ooxml::xml::name::{noname, pt, r, w};
use crate::ooxml::xml::{Element, Node, XName};
use log::debug;
use std::collections::HashMap;

const HEADER_FOOTER_REFERENCES: [XName; 2] = [w::headerReference, w::footerReference];

/// `w:type` values of header and footer references.
const REFERENCE_TYPES: [&str; 3] = ["default", "first", "even"];

/// Get a fragment's section properties ready for merging.
///
/// Without `keep`, every `w:sectPr` is stripped. Otherwise a body-level
/// `w:sectPr` at the end of the fragment moves into the paragraph before it,
/// and with `discard_headers_and_footers` the sections lose their header and
/// footer references.
pub(crate) fn prepare_sections(fragment: &mut Vec<Element>, keep: bool, discard_headers_and_footers: bool) {
    if !keep {
        fragment.retain(|e| !e.is(&w::sectPr));
        for element in fragment.iter_mut() {
            element.remove_descendants(&mut |e: &Element| e.is(&w::sectPr));
        }
        return;
    }

    if fragment.last().is_some_and(|e| e.is(&w::sectPr))
        && let Some(sect_pr) = fragment.pop()
    {
        relocate_into_paragraph(fragment, sect_pr);
    }

    if discard_headers_and_footers {
        for element in fragment.iter_mut() {
            element.visit_mut(&mut |e: &mut Element| {
                if e.is(&w::sectPr) {
                    e.retain_elements(|c| !c.is_any(&HEADER_FOOTER_REFERENCES));
                }
            });
        }
    }
}

fn relocate_into_paragraph(fragment: &mut Vec<Element>, sect_pr: Element) {
    if let Some(last) = fragment.last_mut()
        && last.is(&w::p)
        && last.child(&w::pPr).is_none_or(|p_pr| p_pr.child(&w::sectPr).is_none())
    {
        if last.child(&w::pPr).is_none() {
            last.insert(0, Node::Element(Element::new(w::pPr)));
        }
        if let Some(p_pr) = last.child_mut(&w::pPr) {
            p_pr.push(sect_pr);
            return;
        }
    }
    fragment.push(Element::new(w::p).with_child(Element::new(w::pPr).with_child(sect_pr)));
}

fn is_placeholder(element: &Element, id: &str) -> bool {
    element.is(&pt::Insert) && element.attr(&noname::Id) == Some(id)
}

/// The part holding the placeholder `id`: the container itself, or one of the
/// headers and footers it relates to.
pub(crate) fn locate_placeholder(target: &OpcPackage, container: &PackURI, id: &str) -> Option<PackURI> {
    let holds = |partname: &PackURI| {
        target
            .xml_part(partname)
            .is_ok_and(|doc| doc.root().descendants_and_self().any(|e| is_placeholder(e, id)))
    };
    if holds(container) {
        return Some(container.clone());
    }

    let part = target.get_part(container).ok()?;
    part.rels()
        .iter()
        .filter(|rel| !rel.is_external() && (rel.reltype() == rt::HEADER || rel.reltype() == rt::FOOTER))
        .filter_map(|rel| rel.target_partname().ok())
        .find(|partname| holds(partname))
}

enum Hit {
    Miss,
    Replaced,
    /// Found inside a paragraph that an ancestor frame must replace
    Enclosing,
}

/// Replace the placeholder `id` under `root` with `fragment`.
///
/// The nearest paragraph enclosing the placeholder is replaced; a placeholder
/// outside any paragraph is replaced itself. Returns whether it was found.
pub(crate) fn replace_placeholder(root: &mut Element, id: &str, fragment: Vec<Element>) -> bool {
    let mut fragment = Some(fragment);
    let inside_p = root.is(&w::p);
    matches!(splice_at_placeholder(root, id, &mut fragment, inside_p), Hit::Replaced)
}

fn splice_at_placeholder(parent: &mut Element, id: &str, fragment: &mut Option<Vec<Element>>, inside_p: bool) -> Hit {
    for index in 0..parent.nodes().len() {
        let Some(child) = parent.nodes_mut()[index].as_element_mut() else {
            continue;
        };

        let hit = if is_placeholder(child, id) {
            if inside_p { Hit::Enclosing } else { Hit::Replaced }
        } else if child.descendants().any(|e| is_placeholder(e, id)) {
            let is_p = child.is(&w::p);
            match splice_at_placeholder(child, id, fragment, inside_p || is_p) {
                Hit::Enclosing if is_p => Hit::Replaced,
                other => return other,
            }
        } else {
            continue;
        };

        if let Hit::Replaced = hit {
            let replacement = fragment.take().unwrap_or_default();
            parent
                .nodes_mut()
                .splice(index..=index, replacement.into_iter().map(Node::Element));
        }
        return hit;
    }
    Hit::Miss
}

/// Append blocks to a body, keeping a trailing body-level `w:sectPr` last.
pub(crate) fn append_to_body(body: &mut Element, fragment: Vec<Element>) {
    let nodes = body.nodes_mut();
    let at = match nodes.iter().rposition(|n| n.as_element().is_some()) {
        Some(last) if nodes[last].as_element().is_some_and(|e| e.is(&w::sectPr)) => last,
        _ => nodes.len(),
    };
    nodes.splice(at..at, fragment.into_iter().map(Node::Element));
}

/// Make sure the body ends with the final section's properties.
///
/// When the body has no body-level `w:sectPr`, the one of the last paragraph
/// that closes a section is moved there. Returns whether the body now ends
/// with one.
pub(crate) fn promote_final_section(body: &mut Element) -> bool {
    if body.elements().last().is_some_and(|e| e.is(&w::sectPr)) {
        return true;
    }
    let sect_pr = body
        .elements_mut()
        .filter(|e| e.is(&w::p))
        .filter_map(|p| p.child_mut(&w::pPr))
        .filter(|p_pr| p_pr.child(&w::sectPr).is_some())
        .last()
        .and_then(|p_pr| {
            let pos = p_pr.nodes().iter().position(|n| n.as_element().is_some_and(|e| e.is(&w::sectPr)))?;
            p_pr.nodes_mut().remove(pos).into_element()
        });
    match sect_pr {
        Some(sect_pr) => {
            body.push(sect_pr);
            true
        },
        None => false,
    }
}

/// Where a section gets a header or footer reference it lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Inherited {
    Reference(String),
    /// An empty part of the reference's kind, created on demand
    Empty,
}

/// Spell out header and footer inheritance between sections.
///
/// Each section receives explicit references for the kinds it lacks: the one
/// of the nearest earlier section, or an empty header or footer when no
/// earlier section has one. Bodies without any header or footer reference are
/// left alone.
pub(crate) fn link_headers_and_footers(pkg: &mut OpcPackage, container: &PackURI, ids: &mut IdAllocator) -> Result<()> {
    let plan = {
        let doc = pkg.xml_part(container)?;
        let Some(body) = doc.root().child(&w::body) else {
            return Ok(());
        };
        let sections: Vec<&Element> = body.descendants().filter(|e| e.is(&w::sectPr)).collect();
        if !sections
            .iter()
            .any(|s| s.elements().any(|e| e.is_any(&HEADER_FOOTER_REFERENCES)))
        {
            return Ok(());
        }
        plan_links(&sections)
    };
    if plan.iter().all(Vec::is_empty) {
        return Ok(());
    }

    let mut empties: HashMap<XName, String> = HashMap::new();
    for (kind, _, inherited) in plan.iter().flatten() {
        if *inherited == Inherited::Empty && !empties.contains_key(kind) {
            let r_id = add_empty_part(pkg, container, kind, ids)?;
            empties.insert(kind.clone(), r_id);
        }
    }

    let mut section = 0usize;
    let root = pkg.xml_part_mut(container)?.root_mut();
    root.visit_mut(&mut |e: &mut Element| {
        if !e.is(&w::sectPr) {
            return;
        }
        let Some(additions) = plan.get(section) else {
            return;
        };
        section += 1;
        let mut at = e
            .nodes()
            .iter()
            .rposition(|n| n.as_element().is_some_and(|c| c.is_any(&HEADER_FOOTER_REFERENCES)))
            .map(|p| p + 1)
            .unwrap_or(0);
        for (kind, ref_type, inherited) in additions {
            let r_id = match inherited {
                Inherited::Reference(r_id) => r_id.clone(),
                Inherited::Empty => match empties.get(kind) {
                    Some(r_id) => r_id.clone(),
                    None => continue,
                },
            };
            let reference = Element::new(kind.clone())
                .with_attr(w::type_, *ref_type)
                .with_attr(r::id, r_id);
            e.insert(at, Node::Element(reference));
            at += 1;
        }
    });
    Ok(())
}

/// For each section in order, the references it must gain.
fn plan_links(sections: &[&Element]) -> Vec<Vec<(XName, &'static str, Inherited)>> {
    let mut cache: HashMap<(XName, &'static str), Inherited> = HashMap::new();
    let mut plan = Vec::with_capacity(sections.len());
    for sect_pr in sections {
        let mut additions = Vec::new();
        for kind in &HEADER_FOOTER_REFERENCES {
            for ref_type in REFERENCE_TYPES {
                let own = sect_pr
                    .elements_named(kind)
                    .find(|e| e.attr(&w::type_).unwrap_or("default") == ref_type)
                    .and_then(|e| e.attr(&r::id));
                let key = (kind.clone(), ref_type);
                match own {
                    Some(r_id) => {
                        cache.insert(key, Inherited::Reference(r_id.to_string()));
                    },
                    None => {
                        let inherited = cache.entry(key).or_insert(Inherited::Empty).clone();
                        additions.push((kind.clone(), ref_type, inherited));
                    },
                }
            }
        }
        plan.push(additions);
    }
    plan
}

fn add_empty_part(pkg: &mut OpcPackage, container: &PackURI, kind: &XName, ids: &mut IdAllocator) -> Result<String> {
    let (root, reltype, content_type, stem) = if *kind == w::headerReference {
        (w::hdr, rt::HEADER, ct::WML_HEADER, "header")
    } else {
        (w::ftr, rt::FOOTER, ct::WML_FOOTER, "footer")
    };
    let dir = container.base_uri();
    let partname = pkg.next_partname(&format!("{}/{}%d.xml", dir.trim_end_matches('/'), stem))?;
    let document = new_wml_document(Element::new(root).with_child(Element::new(w::p)));
    pkg.add_part(Box::new(XmlPart::new(partname.clone(), content_type.to_string(), document)));

    let target_ref = partname.relative_ref(dir);
    let part = pkg.get_part_mut(container)?;
    let r_id = ids.rel_id(part.rels());
    part.rels_mut()
        .add_relationship(reltype.to_string(), target_ref, r_id.clone(), false);
    debug!("created empty {} for unlinked sections", partname);
    Ok(r_id)
}

/// Range marker repair for extracted fragments.
///
/// A fragment cut out of a source body may hold one half of a bookmark,
/// comment, permission or tracked-move range. The missing half is copied in
/// from the full source body, and orphaned halves of tracked moves are dropped.
use super::ids::{IdSpace, format_id, ids_in};
use super::step::{MergeStep, distinct_attr_values, remove_by_attr, rewrite_attr_values};
use crate::ooxml::opc::PackURI;
use crate::ooxml::xml::name::w;
use crate::ooxml::xml::{Element, Node, XName};
use log::{debug, warn};
use std::collections::HashMap;

/// A kind of start/end marker pair matched by `w:id`.
struct RangeKind {
    start: XName,
    end: XName,
    /// Reference run that accompanies the end marker, if any
    reference: Option<XName>,
}

const RANGE_KINDS: [RangeKind; 5] = [
    RangeKind {
        start: w::commentRangeStart,
        end: w::commentRangeEnd,
        reference: Some(w::commentReference),
    },
    RangeKind {
        start: w::bookmarkStart,
        end: w::bookmarkEnd,
        reference: None,
    },
    RangeKind {
        start: w::permStart,
        end: w::permEnd,
        reference: None,
    },
    RangeKind {
        start: w::moveFromRangeStart,
        end: w::moveFromRangeEnd,
        reference: None,
    },
    RangeKind {
        start: w::moveToRangeStart,
        end: w::moveToRangeEnd,
        reference: None,
    },
];

/// Complete every range in `fragment` using the full `source` body, then drop
/// tracked moves whose other half is not in the fragment.
pub(crate) fn fix_ranges(fragment: &mut Vec<Element>, source: &Element) {
    for kind in &RANGE_KINDS {
        fix_range(fragment, source, kind);
    }
    delete_unmatched_moves(fragment, &w::moveFromRangeStart, &w::moveFromRangeEnd, &w::moveToRangeStart);
    delete_unmatched_moves(fragment, &w::moveToRangeStart, &w::moveToRangeEnd, &w::moveFromRangeStart);
}

fn fix_range(fragment: &mut Vec<Element>, source: &Element, kind: &RangeKind) {
    let starts = distinct_attr_values(fragment, std::slice::from_ref(&kind.start), &w::id);
    let ends = distinct_attr_values(fragment, std::slice::from_ref(&kind.end), &w::id);

    let mut orphans = Vec::new();
    for id in starts.iter().filter(|id| !ends.contains(id)) {
        let Some(end) = find_marker(source, &kind.end, id) else {
            orphans.push(id.clone());
            continue;
        };
        let mut markers = vec![end.clone()];
        if let Some(reference) = &kind.reference
            && !contains_marker(fragment, reference, id)
        {
            markers.push(Element::new(w::r).with_child(Element::new(reference.clone()).with_attr(w::id, id.as_str())));
        }
        add_at_end(fragment, markers);
        debug!("completed {} range {} at fragment end", kind.start.local_name(), id);
    }

    for id in ends.iter().filter(|id| !starts.contains(id)) {
        let Some(start) = find_marker(source, &kind.start, id) else {
            orphans.push(id.clone());
            continue;
        };
        add_at_beginning(fragment, start.clone());
        debug!("completed {} range {} at fragment start", kind.start.local_name(), id);
    }

    if !orphans.is_empty() {
        warn!(
            "{} ranges {:?} have no counterpart in the source, markers removed",
            kind.start.local_name(),
            orphans
        );
        remove_by_attr(fragment, &[kind.start.clone(), kind.end.clone()], &w::id, &orphans);
    }
}

fn find_marker<'e>(source: &'e Element, name: &XName, id: &str) -> Option<&'e Element> {
    source
        .descendants()
        .find(|e| e.is(name) && e.attr(&w::id) == Some(id))
}

fn contains_marker(fragment: &[Element], name: &XName, id: &str) -> bool {
    fragment
        .iter()
        .flat_map(|e| e.descendants_and_self())
        .any(|e| e.is(name) && e.attr(&w::id) == Some(id))
}

/// Put `markers`, in order, into the last paragraph right after its
/// properties, or into a new trailing paragraph when the fragment does not end
/// with one.
fn add_at_end(fragment: &mut Vec<Element>, markers: Vec<Element>) {
    match fragment.last_mut() {
        Some(last) if last.is(&w::p) => {
            let pos = last.position_of(&w::pPr).map(|p| p + 1).unwrap_or(0);
            for (offset, marker) in markers.into_iter().enumerate() {
                last.insert(pos + offset, Node::Element(marker));
            }
        },
        _ => {
            let mut paragraph = Element::new(w::p);
            for marker in markers {
                paragraph.push(marker);
            }
            fragment.push(paragraph);
        },
    }
}

/// Insert `marker` at the start of the first paragraph, after its properties.
fn add_at_beginning(fragment: &mut Vec<Element>, marker: Element) {
    match fragment.first_mut() {
        Some(first) if first.is(&w::p) => {
            let pos = first.position_of(&w::pPr).map(|p| p + 1).unwrap_or(0);
            first.insert(pos, Node::Element(marker));
        }
        _ => fragment.insert(0, Element::new(w::p).with_child(marker)),
    }
}

/// Remove `start` markers (and their `end` markers) whose `w:name` does not
/// appear on any `counterpart` start in the fragment.
fn delete_unmatched_moves(fragment: &mut Vec<Element>, start: &XName, end: &XName, counterpart: &XName) {
    let names = distinct_attr_values(fragment, std::slice::from_ref(counterpart), &w::name);
    let doomed: Vec<String> = fragment
        .iter()
        .flat_map(|e| e.descendants_and_self())
        .filter(|e| e.is(start))
        .filter(|e| e.attr(&w::name).is_none_or(|n| !names.iter().any(|x| x == n)))
        .filter_map(|e| e.attr(&w::id))
        .map(str::to_string)
        .collect();
    if doomed.is_empty() {
        return;
    }
    debug!("dropping unmatched {} ranges {:?}", start.local_name(), doomed);
    remove_by_attr(fragment, &[start.clone(), end.clone()], &w::id, &doomed);
}

impl MergeStep<'_> {
    /// Give every bookmark in `fragment` a fresh id in `dest`, the part the
    /// fragment is spliced into.
    pub(crate) fn renumber_bookmarks(&mut self, fragment: &mut [Element], dest: &PackURI) {
        let names = [w::bookmarkStart, w::bookmarkEnd];
        let ids = distinct_attr_values(fragment, &names, &w::id);
        if ids.is_empty() {
            return;
        }

        let target = &*self.target;
        let mut map = HashMap::with_capacity(ids.len());
        for id in ids {
            let new = self
                .state
                .ids
                .next(IdSpace::Bookmark, dest.as_str(), || ids_in(target, dest, &w::bookmarkStart, &w::id));
            map.insert(id, format_id(new));
        }
        rewrite_attr_values(fragment, &names, &w::id, &map);
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{Fixture, MAIN, build_state, part_xml, step_into};
    use super::*;
    use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
    use crate::ooxml::xml::XmlDocument;

    fn body(xml: &str) -> Element {
        let doc = XmlDocument::parse(super::super::fixtures::document_xml(xml).as_bytes()).unwrap();
        doc.into_root().child(&w::body).unwrap().clone()
    }

    fn blocks(body: &Element, range: std::ops::Range<usize>) -> Vec<Element> {
        body.elements().skip(range.start).take(range.len()).cloned().collect()
    }

    fn markers(fragment: &[Element], name: &XName) -> Vec<String> {
        fragment
            .iter()
            .flat_map(|e| e.descendants_and_self())
            .filter(|e| e.is(name))
            .filter_map(|e| e.attr(&w::id))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_missing_bookmark_end_is_copied_from_source() {
        let source = body(
            r#"<w:p><w:bookmarkStart w:id="7" w:name="b"/><w:r><w:t>a</w:t></w:r></w:p><w:p><w:bookmarkEnd w:id="7"/></w:p>"#,
        );
        let mut fragment = blocks(&source, 0..1);
        fix_ranges(&mut fragment, &source);
        assert_eq!(fragment.len(), 1);
        assert_eq!(markers(&fragment, &w::bookmarkEnd), vec!["7"]);
        let names: Vec<&str> = fragment[0].elements().map(|e| e.name().local_name()).collect();
        assert_eq!(names, vec!["bookmarkEnd", "bookmarkStart", "r"]);
    }

    #[test]
    fn test_missing_start_goes_after_paragraph_properties() {
        let source = body(
            r#"<w:p><w:permStart w:id="2"/></w:p><w:p><w:pPr><w:jc w:val="left"/></w:pPr><w:permEnd w:id="2"/></w:p>"#,
        );
        let mut fragment = blocks(&source, 1..2);
        fix_ranges(&mut fragment, &source);
        let names: Vec<&str> = fragment[0].elements().map(|e| e.name().local_name()).collect();
        assert_eq!(names, vec!["pPr", "permStart", "permEnd"]);
    }

    #[test]
    fn test_comment_end_brings_reference_run() {
        let source = body(concat!(
            r#"<w:p><w:pPr><w:jc w:val="left"/></w:pPr><w:commentRangeStart w:id="0"/><w:r><w:t>x</w:t></w:r></w:p>"#,
            r#"<w:p><w:commentRangeEnd w:id="0"/><w:r><w:commentReference w:id="0"/></w:r></w:p>"#,
        ));
        let mut fragment = blocks(&source, 0..1);
        fix_ranges(&mut fragment, &source);
        assert_eq!(markers(&fragment, &w::commentRangeEnd), vec!["0"]);
        assert_eq!(markers(&fragment, &w::commentReference), vec!["0"]);

        // End marker first, then the reference run, both right after the properties
        let children: Vec<&Element> = fragment[0].elements().collect();
        let names: Vec<&str> = children.iter().map(|e| e.name().local_name()).collect();
        assert_eq!(names, vec!["pPr", "commentRangeEnd", "r", "commentRangeStart", "r"]);
        assert!(children[2].child(&w::commentReference).is_some());
    }

    #[test]
    fn test_fragment_ending_in_table_gets_new_paragraph() {
        let source = body(r#"<w:tbl><w:tr><w:tc><w:p><w:bookmarkStart w:id="1" w:name="t"/></w:p></w:tc></w:tr></w:tbl><w:p><w:bookmarkEnd w:id="1"/></w:p>"#);
        let mut fragment = blocks(&source, 0..1);
        fix_ranges(&mut fragment, &source);
        assert_eq!(fragment.len(), 2);
        assert!(fragment[1].is(&w::p));
        assert_eq!(markers(&fragment, &w::bookmarkEnd), vec!["1"]);
    }

    #[test]
    fn test_orphan_without_counterpart_is_removed() {
        let source = body(r#"<w:p><w:bookmarkStart w:id="3" w:name="lost"/></w:p>"#);
        let mut fragment = blocks(&source, 0..1);
        fix_ranges(&mut fragment, &source);
        assert!(markers(&fragment, &w::bookmarkStart).is_empty());
    }

    #[test]
    fn test_unmatched_move_is_deleted() {
        let source = body(concat!(
            r#"<w:p><w:moveFromRangeStart w:id="1" w:name="move1"/><w:moveFromRangeEnd w:id="1"/></w:p>"#,
            r#"<w:p><w:moveToRangeStart w:id="2" w:name="move1"/><w:moveToRangeEnd w:id="2"/></w:p>"#,
        ));

        let mut both = blocks(&source, 0..2);
        fix_ranges(&mut both, &source);
        assert_eq!(markers(&both, &w::moveFromRangeStart), vec!["1"]);
        assert_eq!(markers(&both, &w::moveToRangeEnd), vec!["2"]);

        let mut half = blocks(&source, 0..1);
        fix_ranges(&mut half, &source);
        assert!(markers(&half, &w::moveFromRangeStart).is_empty());
        assert!(markers(&half, &w::moveFromRangeEnd).is_empty());
    }

    #[test]
    fn test_bookmarks_renumbered_past_target() {
        let src = Fixture::body(r#"<w:p><w:bookmarkStart w:id="0" w:name="a"/><w:bookmarkEnd w:id="0"/></w:p>"#).package();
        let mut target = Fixture::body(r#"<w:p><w:bookmarkStart w:id="4" w:name="x"/><w:bookmarkEnd w:id="4"/></w:p>"#).package();
        let mut state = build_state();
        let mut fragment = blocks(src.main_document().unwrap().root().child(&w::body).unwrap(), 0..1);

        let main = PackURI::new(MAIN).unwrap();
        let mut step = step_into(0, &src, &mut target, &mut state);
        step.renumber_bookmarks(&mut fragment, &main);
        assert_eq!(markers(&fragment, &w::bookmarkStart), vec!["5"]);
        assert_eq!(markers(&fragment, &w::bookmarkEnd), vec!["5"]);

        let mut again = fragment.clone();
        step.renumber_bookmarks(&mut again, &main);
        assert_eq!(markers(&again, &w::bookmarkStart), vec!["6"]);
    }

    #[test]
    fn test_bookmarks_renumbered_past_destination_header() {
        let src = Fixture::body(r#"<w:p><w:bookmarkStart w:id="5" w:name="a"/><w:bookmarkEnd w:id="5"/></w:p>"#).package();
        let header = part_xml("hdr", r#"<w:p><w:bookmarkStart w:id="0" w:name="h"/><w:bookmarkEnd w:id="0"/></w:p>"#);
        let mut target = Fixture::body("<w:p/>")
            .part("/word/header1.xml", ct::WML_HEADER, &header)
            .rel("rIdH", rt::HEADER, "header1.xml")
            .package();
        let mut state = build_state();
        let mut fragment = blocks(src.main_document().unwrap().root().child(&w::body).unwrap(), 0..1);

        let header = PackURI::new("/word/header1.xml").unwrap();
        let mut step = step_into(0, &src, &mut target, &mut state);
        step.renumber_bookmarks(&mut fragment, &header);
        assert_eq!(markers(&fragment, &w::bookmarkStart), vec!["1"]);
    }
}

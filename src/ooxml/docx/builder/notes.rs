/// Footnote and endnote merge.
use super::error::Result;
use super::ids::{IdSpace, format_id, ids_in};
use super::step::{MergeStep, distinct_attr_values, rewrite_attr_values};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::PackURI;
use crate::ooxml::xml::name::w;
use crate::ooxml::xml::{Element, XName};
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// The two note families; they differ only in names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    fn reference(self) -> XName {
        match self {
            NoteKind::Footnote => w::footnoteReference,
            NoteKind::Endnote => w::endnoteReference,
        }
    }

    fn note(self) -> XName {
        match self {
            NoteKind::Footnote => w::footnote,
            NoteKind::Endnote => w::endnote,
        }
    }

    fn root(self) -> XName {
        match self {
            NoteKind::Footnote => w::footnotes,
            NoteKind::Endnote => w::endnotes,
        }
    }

    fn reltype(self) -> &'static str {
        match self {
            NoteKind::Footnote => rt::FOOTNOTES,
            NoteKind::Endnote => rt::ENDNOTES,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            NoteKind::Footnote => ct::WML_FOOTNOTES,
            NoteKind::Endnote => ct::WML_ENDNOTES,
        }
    }

    fn filename(self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnotes.xml",
            NoteKind::Endnote => "endnotes.xml",
        }
    }

    fn id_space(self) -> IdSpace {
        match self {
            NoteKind::Footnote => IdSpace::Footnote,
            NoteKind::Endnote => IdSpace::Endnote,
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoteKind::Footnote => "footnote",
            NoteKind::Endnote => "endnote",
        })
    }
}

/// Separator and continuation notes carry a `w:type`; regular notes do not.
fn is_special(note: &Element) -> bool {
    note.attr(&w::type_).is_some_and(|t| t != "normal")
}

impl MergeStep<'_> {
    /// Copy the notes of `kind` that `fragment` references into the target and
    /// rewrite the references to the new ids.
    pub(crate) fn merge_notes(&mut self, kind: NoteKind, fragment: &mut [Element]) -> Result<()> {
        let reference = kind.reference();
        let ids = distinct_attr_values(fragment, std::slice::from_ref(&reference), &w::id);
        if ids.is_empty() {
            return Ok(());
        }

        let source = self.source;
        let src_part = self
            .source_related(kind.reltype())
            .ok_or_else(|| self.invalid(format!("{} reference without {}s part", kind, kind)))?;
        let src_root = source.xml_part(&src_part)?.root();

        let dst_part = self.ensure_note_part(kind, src_root)?;
        let note_name = kind.note();

        let mut map = HashMap::with_capacity(ids.len());
        for id in ids {
            let body = src_root
                .elements_named(&note_name)
                .find(|n| n.attr(&w::id) == Some(id.as_str()))
                .ok_or_else(|| self.invalid(format!("{} {} not found in {}", kind, id, src_part)))?;

            let new_id = {
                let target = &*self.target;
                self.state.ids.next(kind.id_space(), dst_part.as_str(), || {
                    ids_in(target, &dst_part, &note_name, &w::id)
                })
            };
            let new_id = format_id(new_id);

            let mut clone = body.clone();
            clone.set_attr(w::id, new_id.clone());
            self.graft(&src_part, &dst_part, &mut clone)?;
            self.process_content(&mut clone)?;
            self.target.xml_part_mut(&dst_part)?.root_mut().push(clone);

            debug!("source {}: {} {} -> {}", self.index, kind, id, new_id);
            map.insert(id, new_id);
        }

        self.merge_namespaces_into(&src_part, &dst_part)?;
        rewrite_attr_values(fragment, &[reference], &w::id, &map);
        Ok(())
    }

    /// The target notes part, created with the source's separator notes when
    /// the target has none.
    fn ensure_note_part(&mut self, kind: NoteKind, src_root: &Element) -> Result<PackURI> {
        if let Some(partname) = self.target_related(kind.reltype()) {
            return Ok(partname);
        }

        let partname = self.ensure_target_part(kind.reltype(), kind.content_type(), kind.filename(), kind.root())?;
        let special: Vec<Element> = src_root
            .elements_named(&kind.note())
            .filter(|n| is_special(n))
            .cloned()
            .collect();
        let root = self.target.xml_part_mut(&partname)?.root_mut();
        for note in special {
            root.push(note);
        }
        Ok(partname)
    }
}

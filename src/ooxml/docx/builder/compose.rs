/// The document builder: drives one merge step per source.
use super::drawing::renumber_drawing_ids;
use super::error::{BuilderError, Result};
use super::glossary::{append_doc_parts, ensure_glossary, source_glossary};
use super::notes::NoteKind;
use super::options::BuilderOptions;
use super::ranges::fix_ranges;
use super::sections::{
    append_to_body, link_headers_and_footers, locate_placeholder, prepare_sections, promote_final_section,
    replace_placeholder,
};
use super::source::Source;
use super::step::{BuildState, MergeStep, body_mut};
use super::validate::validate_source;
use crate::ooxml::docx::Package;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::packuri::PACKAGE_URI;
use crate::ooxml::opc::PackURI;
use crate::ooxml::xml::Element;
use crate::ooxml::xml::name::w;
use log::debug;

/// Package-level parts taken over from the first source.
const PACKAGE_PART_RELTYPES: [&str; 3] = [rt::CORE_PROPERTIES, rt::EXTENDED_PROPERTIES, rt::CUSTOM_PROPERTIES];

/// Document-level parts taken over from the first source.
const DOCUMENT_PART_RELTYPES: [&str; 3] = [rt::SETTINGS, rt::WEB_SETTINGS, rt::THEME];

/// Composes WordprocessingML packages out of ranges of other packages.
///
/// Each [`Source`] contributes a range of its body's top-level blocks. Styles,
/// numbering, notes, comments, images and every other related part the range
/// needs are carried along, with ids rewritten so the result is consistent.
///
/// # Examples
///
/// ```rust,no_run
/// use litchi_builder::ooxml::docx::Package;
/// use litchi_builder::ooxml::docx::builder::{BuilderOptions, DocumentBuilder, Source};
///
/// # fn load(_: &str) -> Package { Package::new_document() }
/// let cover = load("cover.docx");
/// let report = load("report.docx");
///
/// let builder = DocumentBuilder::new(BuilderOptions::default());
/// let merged = builder.build(&[
///     Source::new(&cover).with_keep_sections(false),
///     Source::new(&report).with_start(2),
/// ])?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    options: BuilderOptions,
}

impl DocumentBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Compose `sources` into a new package.
    ///
    /// Settings, theme and document properties come from the first source.
    pub fn build(&self, sources: &[Source<'_>]) -> Result<Package> {
        validate_all(sources)?;

        let mut target = Package::new_document();
        let mut state = BuildState::new();
        self.seed_from_first(&sources[0], &mut target, &mut state)?;
        self.compose(&mut target, sources, &mut state, true)?;
        Ok(target)
    }

    /// Compose `sources` into a copy of `template`.
    ///
    /// Sources with an insert id replace the matching `pt:Insert` placeholder
    /// of the template; the others are appended to its body.
    pub fn build_into(&self, template: &Package, sources: &[Source<'_>]) -> Result<Package> {
        validate_all(sources)?;

        let mut target = template.clone();
        let mut state = BuildState::new();
        self.compose(&mut target, sources, &mut state, false)?;
        Ok(target)
    }

    fn seed_from_first(&self, source: &Source<'_>, target: &mut Package, state: &mut BuildState) -> Result<()> {
        let src_opc = source.package().opc_package();
        let src_main = source.package().main_partname()?;
        let target_main = target.main_partname()?;
        let mut step = MergeStep::new(
            0,
            src_opc,
            src_main.clone(),
            target.opc_package_mut(),
            target_main.clone(),
            state,
            &self.options,
        );

        let package_uri = PackURI::from_static(PACKAGE_URI);
        for reltype in PACKAGE_PART_RELTYPES {
            if let Some(partname) = src_opc.related_partname(&package_uri, reltype) {
                let copied = step.copy_part(&partname)?;
                step.target.relate_to(&copied, reltype);
            }
        }
        for reltype in DOCUMENT_PART_RELTYPES {
            if let Some(partname) = src_opc.related_partname(&src_main, reltype) {
                let copied = step.copy_part(&partname)?;
                step.add_internal_rel(&target_main, &copied, reltype)?;
            }
        }
        Ok(())
    }

    fn compose(&self, target: &mut Package, sources: &[Source<'_>], state: &mut BuildState, fresh: bool) -> Result<()> {
        let mut kept_sections = false;
        for (index, source) in sources.iter().enumerate() {
            kept_sections |= self.merge_body(index, source, target, state)?;
        }

        if self.options.include_glossary {
            for (index, source) in sources.iter().enumerate() {
                self.merge_glossary(index, source, target, state)?;
            }
        }

        self.finalize(target, sources, state, fresh && !kept_sections)
    }

    /// Merge one source's body range. Returns whether section properties were kept.
    fn merge_body(&self, index: usize, source: &Source<'_>, target: &mut Package, state: &mut BuildState) -> Result<bool> {
        let src_opc = source.package().opc_package();
        let src_main = source.package().main_partname()?;
        let src_body = src_opc
            .xml_part(&src_main)?
            .root()
            .child(&w::body)
            .ok_or_else(|| BuilderError::invalid(index, "main document has no body"))?;

        let blocks: Vec<&Element> = src_body.elements().collect();
        let window = source.window(blocks.len());
        let mut fragment: Vec<Element> = blocks[window].iter().map(|e| (*e).clone()).collect();
        debug!("source {}: merging {} of {} blocks", index, fragment.len(), blocks.len());

        let target_main = target.main_partname()?;
        let dest = match source.insert_id() {
            Some(id) => locate_placeholder(target.opc_package(), &target_main, id)
                .ok_or_else(|| BuilderError::InsertPointNotFound(id.to_string()))?,
            None => target_main.clone(),
        };

        let keep = source.keep_sections() && dest == target_main;
        prepare_sections(&mut fragment, keep, source.discard_headers_and_footers());
        let kept = keep
            && fragment
                .iter()
                .any(|e| e.descendants_and_self().any(|d| d.is(&w::sectPr)));

        let mut step = MergeStep::new(
            index,
            src_opc,
            src_main,
            target.opc_package_mut(),
            target_main,
            state,
            &self.options,
        );
        step.merge_fragment(&mut fragment, src_body, &dest)?;

        let doc = target.opc_package_mut().xml_part_mut(&dest)?;
        match source.insert_id() {
            Some(id) => {
                if !replace_placeholder(doc.root_mut(), id, fragment) {
                    return Err(BuilderError::Internal(format!("placeholder {} vanished from {}", id, dest)));
                }
            },
            None => {
                let body = body_mut(doc).ok_or_else(|| BuilderError::Internal(format!("{} has no body", dest)))?;
                append_to_body(body, fragment);
            },
        }
        debug!("source {}: merged into {}", index, dest);
        Ok(kept)
    }

    fn merge_glossary(&self, index: usize, source: &Source<'_>, target: &mut Package, state: &mut BuildState) -> Result<()> {
        let Some((src_glossary, src_parts)) = source_glossary(index, source.package())? else {
            return Ok(());
        };
        let mut fragment: Vec<Element> = src_parts.elements().cloned().collect();
        if fragment.is_empty() {
            return Ok(());
        }

        let target_main = target.main_partname()?;
        let dst_glossary = ensure_glossary(target.opc_package_mut(), &target_main, &mut state.ids)?;
        let mut step = MergeStep::new(
            index,
            source.package().opc_package(),
            src_glossary,
            target.opc_package_mut(),
            dst_glossary.clone(),
            state,
            &self.options,
        );
        step.merge_fragment(&mut fragment, src_parts, &dst_glossary)?;

        debug!("source {}: merged {} building blocks", index, fragment.len());
        append_doc_parts(target.opc_package_mut(), &dst_glossary, fragment)
    }

    fn finalize(
        &self,
        target: &mut Package,
        sources: &[Source<'_>],
        state: &mut BuildState,
        adopt_first_section: bool,
    ) -> Result<()> {
        let main = target.main_partname()?;
        let has_final = {
            let doc = target.opc_package_mut().xml_part_mut(&main)?;
            let body = body_mut(doc).ok_or_else(|| BuilderError::Internal(format!("{} has no body", main)))?;
            promote_final_section(body)
        };
        if !has_final && adopt_first_section {
            self.adopt_final_section(&sources[0], target, state)?;
        }

        let opc = target.opc_package_mut();
        link_headers_and_footers(opc, &main, &mut state.ids)?;

        if self.options.renumber_drawing_ids {
            let mut containers = vec![main.clone()];
            containers.extend(opc.related_partname(&main, rt::GLOSSARY_DOCUMENT));
            renumber_drawing_ids(opc, &containers)?;
        }
        Ok(())
    }

    /// Give the target the first source's final section, headers and footers included.
    fn adopt_final_section(&self, source: &Source<'_>, target: &mut Package, state: &mut BuildState) -> Result<()> {
        let src_opc = source.package().opc_package();
        let src_main = source.package().main_partname()?;
        let Some(mut sect_pr) = src_opc
            .xml_part(&src_main)?
            .root()
            .child(&w::body)
            .and_then(|body| body.elements().last())
            .filter(|e| e.is(&w::sectPr))
            .cloned()
        else {
            return Ok(());
        };
        if source.discard_headers_and_footers() {
            sect_pr.retain_elements(|e| !e.is(&w::headerReference) && !e.is(&w::footerReference));
        }

        let target_main = target.main_partname()?;
        {
            let mut step = MergeStep::new(
                0,
                src_opc,
                src_main.clone(),
                target.opc_package_mut(),
                target_main.clone(),
                state,
                &self.options,
            );
            step.merge_styles()?;
            step.graft(&src_main, &target_main, &mut sect_pr)?;
            step.process_cloned_parts()?;
        }

        let doc = target.opc_package_mut().xml_part_mut(&target_main)?;
        let body = body_mut(doc).ok_or_else(|| BuilderError::Internal(format!("{} has no body", target_main)))?;
        body.push(sect_pr);
        debug!("adopted the first source's final section");
        Ok(())
    }
}

fn validate_all(sources: &[Source<'_>]) -> Result<()> {
    if sources.is_empty() {
        return Err(BuilderError::NoSources);
    }
    for (index, source) in sources.iter().enumerate() {
        validate_source(index, source.package())?;
    }
    Ok(())
}

impl MergeStep<'_> {
    /// Move `fragment` from the source container into `dest`.
    ///
    /// `source_root` is the full element the fragment was cut from; missing
    /// range halves are looked up there. The fragment is left ready to splice.
    pub(crate) fn merge_fragment(
        &mut self,
        fragment: &mut Vec<Element>,
        source_root: &Element,
        dest: &PackURI,
    ) -> Result<()> {
        fix_ranges(fragment, source_root);
        self.renumber_bookmarks(fragment, dest);

        let src_container = self.source_container.clone();
        for element in fragment.iter_mut() {
            self.graft(&src_container, dest, element)?;
        }

        self.merge_styles()?;
        for element in fragment.iter_mut() {
            self.process_content(element)?;
        }
        self.process_cloned_parts()?;

        self.merge_notes(NoteKind::Footnote, fragment)?;
        self.merge_notes(NoteKind::Endnote, fragment)?;
        self.merge_comments(fragment)?;
        self.process_cloned_parts()?;

        self.merge_namespaces_into(&src_container, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{
        Fixture, MAIN, assert_referentially_closed, body_texts, part_xml, picture, xml_of,
    };
    use super::super::options::StyleMergeMode;
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;
    use crate::ooxml::xml::XName;
    use crate::ooxml::xml::name::{noname, pt, r, wp};
    use std::collections::HashSet;

    const PNG_A: &[u8] = b"\x89PNG\r\n\x1a\nimage-a";
    const PNG_B: &[u8] = b"\x89PNG\r\n\x1a\nimage-b";

    const HEADING_STYLES: &str = r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/></w:style>"#;

    fn paragraph(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    fn image_source(text: &str, bytes: &[u8]) -> Package {
        Fixture::body(&format!("<w:p><w:r><w:t>{}</w:t></w:r>{}</w:p>", text, picture("rId5", 1)))
            .styles(HEADING_STYLES)
            .image("/word/media/image1.png", "rId5", bytes)
            .package()
    }

    fn builder() -> DocumentBuilder {
        DocumentBuilder::new(BuilderOptions::default())
    }

    fn main_rels_of_type(pkg: &Package, reltype: &str) -> Vec<String> {
        pkg.opc_package()
            .get_part(&PackURI::new(MAIN).unwrap())
            .unwrap()
            .rels()
            .iter()
            .filter(|r| r.reltype() == reltype)
            .map(|r| r.target_ref().to_string())
            .collect()
    }

    fn attr_values(pkg: &Package, partname: &str, name: &XName, attr: &XName) -> Vec<String> {
        xml_of(pkg, partname)
            .root()
            .descendants()
            .filter(|e| e.is(name))
            .filter_map(|e| e.attr(attr))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_no_sources() {
        assert!(matches!(builder().build(&[]), Err(BuilderError::NoSources)));
    }

    #[test]
    fn test_two_image_documents_without_sections() {
        let a = image_source("first", PNG_A);
        let b = image_source("second", PNG_B);
        let merged = builder()
            .build(&[
                Source::new(&a).with_keep_sections(false),
                Source::new(&b).with_keep_sections(false),
            ])
            .unwrap();

        assert_eq!(body_texts(&merged), vec!["first", "second"]);
        let images = main_rels_of_type(&merged, rt::IMAGE);
        assert_eq!(images.len(), 2);
        assert_eq!(images.iter().collect::<HashSet<_>>().len(), 2);

        let styles = attr_values(&merged, "/word/styles.xml", &w::style, &w::styleId);
        assert_eq!(styles, vec!["Normal", "Heading1"]);
        assert!(merged.opc_package().related_partname(&PackURI::new(MAIN).unwrap(), rt::NUMBERING).is_none());
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_same_image_is_stored_once() {
        let a = image_source("one", PNG_A);
        let merged = builder()
            .build(&[Source::new(&a), Source::new(&a)])
            .unwrap();

        // One relationship per merged fragment, all to the one image part
        let rels = main_rels_of_type(&merged, rt::IMAGE);
        assert_eq!(rels, vec!["media/image1.png", "media/image1.png"]);
        let media: Vec<String> = merged
            .opc_package()
            .iter_parts()
            .map(|p| p.partname().to_string())
            .filter(|n| n.starts_with("/word/media/"))
            .collect();
        assert_eq!(media, vec!["/word/media/image1.png"]);
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_drawing_ids_are_unique() {
        let a = image_source("one", PNG_A);
        let merged = builder().build(&[Source::new(&a), Source::new(&a)]).unwrap();
        assert_eq!(attr_values(&merged, MAIN, &wp::docPr, &noname::id), vec!["1", "2"]);
    }

    #[test]
    fn test_numbering_shared_by_nsid() {
        let list = r#"<w:abstractNum w:abstractNumId="3"><w:nsid w:val="0F00BA11"/><w:lvl w:ilvl="0"/></w:abstractNum><w:num w:numId="7"><w:abstractNumId w:val="3"/></w:num>"#;
        let body = r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="7"/></w:numPr></w:pPr><w:r><w:t>item</w:t></w:r></w:p>"#;
        let src = Fixture::body(body).numbering(list).package();
        let merged = builder().build(&[Source::new(&src), Source::new(&src)]).unwrap();

        let numbering = xml_of(&merged, "/word/numbering.xml").root();
        assert_eq!(numbering.elements_named(&w::abstractNum).count(), 1);
        assert_eq!(numbering.elements_named(&w::num).count(), 2);

        let used = attr_values(&merged, MAIN, &w::numId, &w::val);
        assert_eq!(used, vec!["1", "2"]);
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_same_named_style_resolves_to_target_definition() {
        let template = Fixture::body(r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr></w:p>"#)
            .styles(HEADING_STYLES)
            .package();
        let src_styles = r#"<w:style w:type="paragraph" w:styleId="Titre1"><w:name w:val="heading 1"/></w:style>"#;
        let src = Fixture::body(r#"<w:p><w:pPr><w:pStyle w:val="Titre1"/></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#)
            .styles(src_styles)
            .package();

        let merged = builder().build_into(&template, &[Source::new(&src)]).unwrap();
        assert_eq!(attr_values(&merged, MAIN, &w::pStyle, &w::val), vec!["Heading1", "Heading1"]);
        let styles = attr_values(&merged, "/word/styles.xml", &w::style, &w::styleId);
        assert_eq!(styles.iter().filter(|s| *s == "Heading1").count(), 1);
        assert!(!styles.contains(&"Titre1".to_string()));
    }

    #[test]
    fn test_by_id_mode_keeps_source_ids() {
        let src = Fixture::body(r#"<w:p><w:pPr><w:pStyle w:val="Titre1"/></w:pPr></w:p>"#)
            .styles(r#"<w:style w:type="paragraph" w:styleId="Titre1"><w:name w:val="heading 1"/></w:style>"#)
            .package();
        let builder = DocumentBuilder::new(BuilderOptions::new().with_style_merge(StyleMergeMode::ById));
        let merged = builder.build(&[Source::new(&src)]).unwrap();
        assert_eq!(attr_values(&merged, MAIN, &w::pStyle, &w::val), vec!["Titre1"]);
    }

    #[test]
    fn test_ranges_completed_and_ids_fresh() {
        let body = concat!(
            r#"<w:p><w:bookmarkStart w:id="0" w:name="_Top"/><w:r><w:t>a</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>b</w:t></w:r><w:bookmarkEnd w:id="0"/></w:p>"#,
        );
        let src = Fixture::body(body).package();
        let merged = builder()
            .build(&[
                Source::new(&src).with_range(0, 1),
                Source::new(&src).with_range(1, 1),
            ])
            .unwrap();

        let starts = attr_values(&merged, MAIN, &w::bookmarkStart, &w::id);
        let ends = attr_values(&merged, MAIN, &w::bookmarkEnd, &w::id);
        assert_eq!(starts.len(), 2);
        assert_eq!(starts.iter().collect::<HashSet<_>>().len(), 2);
        let mut sorted_ends = ends.clone();
        sorted_ends.sort();
        let mut sorted_starts = starts.clone();
        sorted_starts.sort();
        assert_eq!(sorted_starts, sorted_ends);
    }

    #[test]
    fn test_footnotes_and_comments_carried() {
        let body = r#"<w:p><w:commentRangeStart w:id="0"/><w:r><w:t>a</w:t></w:r><w:commentRangeEnd w:id="0"/><w:r><w:commentReference w:id="0"/></w:r><w:r><w:footnoteReference w:id="1"/></w:r></w:p>"#;
        let src = Fixture::body(body)
            .part(
                "/word/footnotes.xml",
                ct::WML_FOOTNOTES,
                &part_xml("footnotes", r#"<w:footnote w:id="1"><w:p><w:r><w:t>fn</w:t></w:r></w:p></w:footnote>"#),
            )
            .rel("rIdFn", rt::FOOTNOTES, "footnotes.xml")
            .part(
                "/word/comments.xml",
                ct::WML_COMMENTS,
                &part_xml("comments", r#"<w:comment w:id="0" w:author="A"><w:p/></w:comment>"#),
            )
            .rel("rIdCm", rt::COMMENTS, "comments.xml")
            .package();
        let merged = builder().build(&[Source::new(&src), Source::new(&src)]).unwrap();

        assert_eq!(attr_values(&merged, MAIN, &w::footnoteReference, &w::id), vec!["1", "2"]);
        assert_eq!(attr_values(&merged, MAIN, &w::commentReference, &w::id), vec!["0", "1"]);
        assert_eq!(attr_values(&merged, "/word/footnotes.xml", &w::footnote, &w::id), vec!["1", "2"]);
        assert_eq!(attr_values(&merged, "/word/comments.xml", &w::comment, &w::id), vec!["0", "1"]);
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_rejection_at_any_position() {
        let good = Fixture::body(&paragraph("ok")).package();
        let bad = Fixture::body(r#"<w:p><w:subDoc r:id="rId9"/></w:p>"#).package();
        let err = builder()
            .build(&[Source::new(&good), Source::new(&good), Source::new(&bad)])
            .unwrap_err();
        assert_eq!(err.to_string(), "Source 2 is unsupported document - contains sub document");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_kept_section_brings_headers_with_fresh_ids() {
        let header = part_xml("hdr", &paragraph("header text"));
        let body = format!(
            r#"{}<w:sectPr><w:headerReference w:type="default" r:id="rIdH"/><w:pgSz w:w="12240"/></w:sectPr>"#,
            paragraph("body")
        );
        let src = Fixture::body(&body)
            .part("/word/header1.xml", ct::WML_HEADER, &header)
            .rel("rIdH", rt::HEADER, "header1.xml")
            .package();
        let template = Fixture::body(&paragraph("existing"))
            .part("/word/header1.xml", ct::WML_HEADER, &part_xml("hdr", &paragraph("old")))
            .rel("rIdH", rt::HEADER, "header1.xml")
            .package();

        let merged = builder()
            .build_into(&template, &[Source::new(&src).with_keep_sections(true)])
            .unwrap();

        let main = PackURI::new(MAIN).unwrap();
        let opc = merged.opc_package();
        let rels = opc.get_part(&main).unwrap().rels();
        let references = attr_values(&merged, MAIN, &w::headerReference, &r::id);
        assert!(!references.is_empty());
        for r_id in &references {
            assert_ne!(r_id, "rIdH");
            let partname = rels.get(r_id).unwrap().target_partname().unwrap();
            assert_ne!(partname.as_str(), "/word/header1.xml");
            assert!(opc.contains_part(&partname));
        }
        assert!(xml_of(&merged, "/word/header1.xml").root().text().contains("old"));
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_kept_header_styles_and_numbering_are_remapped() {
        let list = r#"<w:abstractNum w:abstractNumId="2"><w:nsid w:val="5E11AB0C"/><w:lvl w:ilvl="0"/></w:abstractNum><w:num w:numId="7"><w:abstractNumId w:val="2"/></w:num>"#;
        let header = part_xml(
            "hdr",
            r#"<w:p><w:pPr><w:pStyle w:val="Titre1"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="7"/></w:numPr></w:pPr><w:r><w:t>running head</w:t></w:r></w:p>"#,
        );
        let body = format!(
            r#"{}<w:sectPr><w:headerReference w:type="default" r:id="rIdH"/></w:sectPr>"#,
            paragraph("body")
        );
        let src = Fixture::body(&body)
            .styles(r#"<w:style w:type="paragraph" w:styleId="Titre1"><w:name w:val="heading 1"/></w:style>"#)
            .numbering(list)
            .part("/word/header1.xml", ct::WML_HEADER, &header)
            .rel("rIdH", rt::HEADER, "header1.xml")
            .package();
        let template = Fixture::body(&paragraph("existing")).styles(HEADING_STYLES).package();

        let merged = builder()
            .build_into(&template, &[Source::new(&src).with_keep_sections(true)])
            .unwrap();

        let main = PackURI::new(MAIN).unwrap();
        let r_id = attr_values(&merged, MAIN, &w::headerReference, &r::id).remove(0);
        let header_part = merged
            .opc_package()
            .get_part(&main)
            .unwrap()
            .rels()
            .get(&r_id)
            .unwrap()
            .target_partname()
            .unwrap();
        let header_part = header_part.as_str();

        assert_eq!(attr_values(&merged, header_part, &w::pStyle, &w::val), vec!["Heading1"]);
        let styles = attr_values(&merged, "/word/styles.xml", &w::style, &w::styleId);
        assert!(!styles.contains(&"Titre1".to_string()));

        let num_id = attr_values(&merged, header_part, &w::numId, &w::val).remove(0);
        let defined = attr_values(&merged, "/word/numbering.xml", &w::num, &w::numId);
        assert!(defined.contains(&num_id));
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_bookmarks_inserted_into_header_stay_unique() {
        let template = Fixture::body(&paragraph("body"))
            .part(
                "/word/header1.xml",
                ct::WML_HEADER,
                &part_xml(
                    "hdr",
                    r#"<w:p><w:bookmarkStart w:id="0" w:name="top"/><w:bookmarkEnd w:id="0"/></w:p><w:p><w:r><pt:Insert Id="x"/></w:r></w:p>"#,
                ),
            )
            .rel("rIdH", rt::HEADER, "header1.xml")
            .package();
        let src = Fixture::body(r#"<w:p><w:bookmarkStart w:id="5" w:name="inner"/><w:r><w:t>t</w:t></w:r><w:bookmarkEnd w:id="5"/></w:p>"#)
            .package();

        let merged = builder()
            .build_into(&template, &[Source::new(&src).with_insert_id("x")])
            .unwrap();

        let starts = attr_values(&merged, "/word/header1.xml", &w::bookmarkStart, &w::id);
        assert_eq!(starts.len(), 2);
        assert_eq!(starts.iter().collect::<HashSet<_>>().len(), 2);
        let mut ends = attr_values(&merged, "/word/header1.xml", &w::bookmarkEnd, &w::id);
        let mut sorted = starts.clone();
        sorted.sort();
        ends.sort();
        assert_eq!(sorted, ends);
    }

    #[test]
    fn test_fresh_build_adopts_first_final_section() {
        let body = format!(r#"{}<w:sectPr><w:pgSz w:w="11906"/></w:sectPr>"#, paragraph("a"));
        let src = Fixture::body(&body).package();
        let merged = builder()
            .build(&[Source::new(&src).with_keep_sections(false)])
            .unwrap();
        let root = merged.main_document().unwrap().root();
        let last = root.child(&w::body).unwrap().elements().last().unwrap();
        assert!(last.is(&w::sectPr));
    }

    #[test]
    fn test_placeholder_insertion() {
        let template = Fixture::body(&format!(
            r#"{}<w:p><w:r><pt:Insert Id="body"/></w:r></w:p>{}"#,
            paragraph("before"),
            paragraph("after")
        ))
        .package();
        let src = Fixture::body(&format!("{}{}", paragraph("x"), paragraph("y"))).package();

        let merged = builder()
            .build_into(&template, &[Source::new(&src).with_insert_id("body")])
            .unwrap();
        assert_eq!(body_texts(&merged), vec!["before", "x", "y", "after"]);

        let err = builder()
            .build_into(&template, &[Source::new(&src).with_insert_id("missing")])
            .unwrap_err();
        assert!(matches!(err, BuilderError::InsertPointNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_placeholder_in_header() {
        let template = Fixture::body(&paragraph("body"))
            .part(
                "/word/header1.xml",
                ct::WML_HEADER,
                &part_xml("hdr", r#"<w:p><w:r><pt:Insert Id="logo"/></w:r></w:p>"#),
            )
            .rel("rIdH", rt::HEADER, "header1.xml")
            .package();
        let src = image_source("logo", PNG_A);

        let merged = builder()
            .build_into(&template, &[Source::new(&src).with_insert_id("logo")])
            .unwrap();
        let header = xml_of(&merged, "/word/header1.xml").root();
        assert!(header.text().contains("logo"));
        assert!(header.descendants().all(|e| !e.is(&pt::Insert)));

        let header_rels = merged
            .opc_package()
            .get_part(&PackURI::new("/word/header1.xml").unwrap())
            .unwrap()
            .rels();
        assert_eq!(header_rels.iter().filter(|r| r.reltype() == rt::IMAGE).count(), 1);
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_glossary_composed() {
        let glossary = r#"<w:glossaryDocument xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docParts><w:docPart><w:docPartBody><w:p><w:bookmarkStart w:id="0" w:name="g"/><w:bookmarkEnd w:id="0"/></w:p></w:docPartBody></w:docPart></w:docParts></w:glossaryDocument>"#;
        let src = Fixture::body(&paragraph("a"))
            .part("/word/glossary/document.xml", ct::WML_DOCUMENT_GLOSSARY, glossary)
            .rel("rIdG", rt::GLOSSARY_DOCUMENT, "glossary/document.xml")
            .package();

        let merged = builder().build(&[Source::new(&src), Source::new(&src)]).unwrap();
        let partname = merged.glossary_partname().unwrap();
        let root = merged.opc_package().xml_part(&partname).unwrap().root();
        assert_eq!(root.child(&w::docParts).unwrap().elements().count(), 2);

        let without = DocumentBuilder::new(BuilderOptions::new().with_glossary(false))
            .build(&[Source::new(&src)])
            .unwrap();
        assert!(without.glossary_partname().is_none());
    }

    #[test]
    fn test_settings_and_properties_from_first_source() {
        let src = Fixture::body(&paragraph("a"))
            .part("/word/settings.xml", ct::WML_SETTINGS, &part_xml("settings", r#"<w:defaultTabStop w:val="720"/>"#))
            .rel("rIdS", rt::SETTINGS, "settings.xml")
            .package();
        let merged = builder().build(&[Source::new(&src)]).unwrap();
        assert_eq!(main_rels_of_type(&merged, rt::SETTINGS), vec!["settings.xml"]);
        assert_referentially_closed(&merged);
    }

    #[test]
    fn test_template_is_not_mutated() {
        let template = Fixture::body(&paragraph("t")).package();
        let src = Fixture::body(&paragraph("s")).package();
        let merged = builder().build_into(&template, &[Source::new(&src)]).unwrap();
        assert_eq!(body_texts(&template), vec!["t"]);
        assert_eq!(body_texts(&merged), vec!["t", "s"]);
    }
}

/// In-memory source packages for builder tests.
use super::options::BuilderOptions;
use super::step::{BuildState, MergeStep};
use crate::ooxml::docx::Package;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part};
use once_cell::sync::Lazy;

pub(crate) const NS: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" "#,
    r#"xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" "#,
    r#"xmlns:v="urn:schemas-microsoft-com:vml" "#,
    r#"xmlns:o="urn:schemas-microsoft-com:office:office" "#,
    r#"xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
    r#"xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml" "#,
    r#"xmlns:pt="http://powertools.codeplex.com/2011""#,
);

pub(crate) static DEFAULT_OPTIONS: Lazy<BuilderOptions> = Lazy::new(BuilderOptions::default);

pub(crate) const MAIN: &str = "/word/document.xml";

/// Wrap body markup in a `w:document`.
pub(crate) fn document_xml(body: &str) -> String {
    format!(r#"<w:document {NS}><w:body>{body}</w:body></w:document>"#)
}

/// Wrap children in an arbitrary WordprocessingML root.
pub(crate) fn part_xml(root: &str, inner: &str) -> String {
    format!(r#"<w:{root} {NS}>{inner}</w:{root}>"#)
}

/// A one-image picture run referring to `r_id`.
pub(crate) fn picture(r_id: &str, doc_pr_id: u32) -> String {
    format!(
        r#"<w:r><w:drawing><wp:inline><wp:docPr id="{doc_pr_id}" name="Picture {doc_pr_id}"/><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{r_id}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
    )
}

/// Builder for source packages.
pub(crate) struct Fixture {
    opc: OpcPackage,
}

impl Fixture {
    /// A package whose main document body is `body`.
    pub(crate) fn body(body: &str) -> Self {
        let mut opc = OpcPackage::new();
        let main = PackURI::new(MAIN).unwrap();
        opc.load_part(main.clone(), ct::WML_DOCUMENT_MAIN, document_xml(body).into_bytes(), None)
            .unwrap();
        opc.rels_mut().add_relationship(
            rt::OFFICE_DOCUMENT.to_string(),
            "word/document.xml".to_string(),
            "rId1".to_string(),
            false,
        );
        Self { opc }
    }

    /// Add an XML part.
    pub(crate) fn part(mut self, partname: &str, content_type: &str, xml: &str) -> Self {
        self.opc
            .load_part(PackURI::new(partname).unwrap(), content_type, xml.as_bytes().to_vec(), None)
            .unwrap();
        self
    }

    /// Add a binary part.
    pub(crate) fn blob(mut self, partname: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.opc
            .load_part(PackURI::new(partname).unwrap(), content_type, bytes.to_vec(), None)
            .unwrap();
        self
    }

    /// Relate the main document to a part.
    pub(crate) fn rel(self, r_id: &str, reltype: &str, target_ref: &str) -> Self {
        self.part_rel(MAIN, r_id, reltype, target_ref)
    }

    /// Add an external relationship to the main document.
    pub(crate) fn external_rel(mut self, r_id: &str, reltype: &str, url: &str) -> Self {
        let main = PackURI::new(MAIN).unwrap();
        self.opc.get_part_mut(&main).unwrap().rels_mut().add_relationship(
            reltype.to_string(),
            url.to_string(),
            r_id.to_string(),
            true,
        );
        self
    }

    /// Relate any part to another.
    pub(crate) fn part_rel(mut self, from: &str, r_id: &str, reltype: &str, target_ref: &str) -> Self {
        let from = PackURI::new(from).unwrap();
        self.opc.get_part_mut(&from).unwrap().rels_mut().add_relationship(
            reltype.to_string(),
            target_ref.to_string(),
            r_id.to_string(),
            false,
        );
        self
    }

    /// Add a styles part holding `inner`.
    pub(crate) fn styles(self, inner: &str) -> Self {
        self.part("/word/styles.xml", ct::WML_STYLES, &part_xml("styles", inner))
            .rel("rIdStyles", rt::STYLES, "styles.xml")
    }

    /// Add a numbering part holding `inner`.
    pub(crate) fn numbering(self, inner: &str) -> Self {
        self.part("/word/numbering.xml", ct::WML_NUMBERING, &part_xml("numbering", inner))
            .rel("rIdNumbering", rt::NUMBERING, "numbering.xml")
    }

    /// Add a PNG image part related from the main document as `r_id`.
    pub(crate) fn image(self, partname: &str, r_id: &str, bytes: &[u8]) -> Self {
        let target_ref = PackURI::new(partname).unwrap().relative_ref("/word");
        self.blob(partname, ct::PNG, bytes).rel(r_id, rt::IMAGE, &target_ref)
    }

    pub(crate) fn package(self) -> Package {
        Package::from_opc(self.opc).unwrap()
    }
}

pub(crate) fn build_state() -> BuildState {
    BuildState::new()
}

/// A merge step from `src`'s main document into `target`'s.
pub(crate) fn step_into<'a>(
    index: usize,
    src: &'a Package,
    target: &'a mut Package,
    state: &'a mut BuildState,
) -> MergeStep<'a> {
    let src_main = src.main_partname().unwrap();
    let dst_main = target.main_partname().unwrap();
    MergeStep::new(
        index,
        src.opc_package(),
        src_main,
        target.opc_package_mut(),
        dst_main,
        state,
        &DEFAULT_OPTIONS,
    )
}

/// Text of every `w:t` in a part, concatenated per top-level body element.
pub(crate) fn body_texts(pkg: &Package) -> Vec<String> {
    let doc = pkg.main_document().unwrap();
    doc.root()
        .elements()
        .next()
        .map(|body| body.elements().map(|e| e.text()).collect())
        .unwrap_or_default()
}

/// Parsed content of a target part.
pub(crate) fn xml_of<'p>(pkg: &'p Package, partname: &str) -> &'p crate::ooxml::xml::XmlDocument {
    pkg.opc_package()
        .xml_part(&PackURI::new(partname).unwrap())
        .unwrap()
}

/// Check that every relationship id referenced from the markup of every XML
/// part resolves, and every internal relationship targets an existing part.
pub(crate) fn assert_referentially_closed(pkg: &Package) {
    let opc = pkg.opc_package();
    for part in opc.iter_parts() {
        for rel in part.rels().iter() {
            if !rel.is_external() {
                let target = rel.target_partname().unwrap();
                assert!(
                    opc.contains_part(&target),
                    "{} relates to missing {}",
                    part.partname(),
                    target
                );
            }
        }
        let Some(doc) = part.xml() else { continue };
        for element in doc.root().descendants_and_self() {
            let Some(attrs) = super::relationships::REL_ATTRIBUTES.get(element.name()) else {
                continue;
            };
            for attr in attrs {
                if let Some(id) = element.attr(attr) {
                    assert!(
                        part.rels().contains(id),
                        "{} refers to unknown relationship {}",
                        part.partname(),
                        id
                    );
                }
            }
        }
    }
}

/// Glossary document (building blocks) composition.
use super::error::{BuilderError, Result};
use super::ids::IdAllocator;
use super::step::new_wml_document;
use crate::ooxml::docx::Package;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part, XmlPart};
use crate::ooxml::xml::Element;
use crate::ooxml::xml::name::w;
use log::debug;

const GLOSSARY_PARTNAME: &str = "/word/glossary/document.xml";

/// A source's glossary document and its `w:docParts`, if it has both.
pub(crate) fn source_glossary(index: usize, package: &Package) -> Result<Option<(PackURI, &Element)>> {
    let Some(partname) = package.glossary_partname() else {
        return Ok(None);
    };
    let doc = package
        .opc_package()
        .xml_part(&partname)
        .map_err(|e| BuilderError::invalid(index, format!("unreadable glossary document: {}", e)))?;
    Ok(doc.root().child(&w::docParts).map(|parts| (partname, parts)))
}

/// The target's glossary document, created empty when missing.
pub(crate) fn ensure_glossary(target: &mut OpcPackage, main: &PackURI, ids: &mut IdAllocator) -> Result<PackURI> {
    if let Some(partname) = target.related_partname(main, rt::GLOSSARY_DOCUMENT) {
        if target.xml_part(&partname)?.root().child(&w::docParts).is_none() {
            target
                .xml_part_mut(&partname)?
                .root_mut()
                .push(Element::new(w::docParts));
        }
        return Ok(partname);
    }

    let mut partname = PackURI::from_static(GLOSSARY_PARTNAME);
    if target.contains_part(&partname) {
        partname = target.next_partname("/word/glossary/document%d.xml")?;
    }
    let root = Element::new(w::glossaryDocument).with_child(Element::new(w::docParts));
    target.add_part(Box::new(XmlPart::new(
        partname.clone(),
        ct::WML_DOCUMENT_GLOSSARY.to_string(),
        new_wml_document(root),
    )));

    let target_ref = partname.relative_ref(main.base_uri());
    let part = target.get_part_mut(main)?;
    let r_id = ids.rel_id(part.rels());
    part.rels_mut()
        .add_relationship(rt::GLOSSARY_DOCUMENT.to_string(), target_ref, r_id, false);
    debug!("created glossary document {}", partname);
    Ok(partname)
}

/// Append merged building blocks to the target glossary.
pub(crate) fn append_doc_parts(target: &mut OpcPackage, glossary: &PackURI, fragment: Vec<Element>) -> Result<()> {
    let doc_parts = target
        .xml_part_mut(glossary)?
        .root_mut()
        .child_mut(&w::docParts)
        .ok_or_else(|| BuilderError::Internal(format!("{} lost its docParts", glossary)))?;
    for doc_part in fragment {
        doc_parts.push(doc_part);
    }
    Ok(())
}

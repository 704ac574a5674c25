/// Up-front rejection of sources the builder cannot merge faithfully.
///
/// Every source is checked before the target is touched, so a bad source at
/// any position fails the whole build.
use super::error::{BuilderError, Result};
use crate::ooxml::docx::Package;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::{OpcPackage, PackURI};
use crate::ooxml::xml::name::w;
use crate::ooxml::xml::{Element, ns};

/// Main document relationship type of ISO strict packages.
const STRICT_OFFICE_DOCUMENT: &str = "http://purl.oclc.org/ooxml/officeDocument/relationships/officeDocument";

/// Parts whose content is scanned for unsupported markup.
const CONTENT_RELTYPES: [&str; 4] = [rt::HEADER, rt::FOOTER, rt::FOOTNOTES, rt::ENDNOTES];

/// Check one source.
pub(crate) fn validate_source(index: usize, package: &Package) -> Result<()> {
    let opc = package.opc_package();
    if opc.rels().first_of_type(STRICT_OFFICE_DOCUMENT).is_some() {
        return Err(BuilderError::unsupported(index, "strict conformance documents are not supported"));
    }

    let main = package
        .main_partname()
        .map_err(|e| BuilderError::invalid(index, format!("no main document part: {}", e)))?;
    let doc = opc
        .xml_part(&main)
        .map_err(|e| BuilderError::invalid(index, format!("unreadable main document: {}", e)))?;
    if doc.root().name().namespace() == ns::STRICT_W {
        return Err(BuilderError::unsupported(index, "strict conformance documents are not supported"));
    }
    if doc.root().child(&w::body).is_none() {
        return Err(BuilderError::invalid(index, "main document has no body"));
    }

    let has_numbering = opc.related_partname(&main, rt::NUMBERING).is_some();
    for partname in content_parts(opc, &main, package.glossary_partname()) {
        let content = opc
            .xml_part(&partname)
            .map_err(|e| BuilderError::invalid(index, format!("unreadable part {}: {}", partname, e)))?;
        check_content(index, content.root(), has_numbering)?;
    }

    if let Some(settings) = opc.related_partname(&main, rt::SETTINGS)
        && let Ok(doc) = opc.xml_part(&settings)
        && doc.root().descendants().any(|e| e.is(&w::mailMerge))
    {
        return Err(BuilderError::unsupported(index, "contains mail merge source"));
    }

    if let Some(web) = opc.related_partname(&main, rt::WEB_SETTINGS)
        && let Ok(doc) = opc.xml_part(&web)
        && doc.root().descendants().any(|e| e.is(&w::frameset))
    {
        return Err(BuilderError::unsupported(index, "contains frameset"));
    }

    Ok(())
}

/// The main document, its headers, footers and notes, and the glossary document.
fn content_parts(opc: &OpcPackage, main: &PackURI, glossary: Option<PackURI>) -> Vec<PackURI> {
    let mut parts = vec![main.clone()];
    if let Ok(part) = opc.get_part(main) {
        for rel in part.rels().iter() {
            if rel.is_external() || !CONTENT_RELTYPES.contains(&rel.reltype()) {
                continue;
            }
            if let Ok(partname) = rel.target_partname()
                && opc.contains_part(&partname)
                && !parts.contains(&partname)
            {
                parts.push(partname);
            }
        }
    }
    parts.extend(glossary);
    parts
}

fn check_content(index: usize, root: &Element, has_numbering: bool) -> Result<()> {
    for element in root.descendants_and_self() {
        let reason = if element.is(&w::sectPrChange) {
            Some("contains section property change")
        } else if element.is(&w::subDoc) {
            Some("contains sub document")
        } else if element.is(&w::control) {
            Some("contains ActiveX controls")
        } else if element.is(&w::altChunk) {
            Some("contains altChunk")
        } else if is_obsolete(element.name().namespace())
            || element.attributes().iter().any(|a| is_obsolete(a.name.namespace()))
        {
            Some("contains obsolete namespace")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(BuilderError::unsupported(index, reason));
        }

        if !has_numbering && element.is(&w::numPr) && element.child(&w::ins).is_none() {
            let num_id = element.child_attr(&w::numId, &w::val);
            if num_id.is_some_and(|id| id != "0") {
                return Err(BuilderError::invalid(index, "numbering reference without numbering part"));
            }
        }
    }
    Ok(())
}

#[inline]
fn is_obsolete(namespace: &str) -> bool {
    ns::OBSOLETE.contains(&namespace)
}

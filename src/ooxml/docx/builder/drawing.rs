/// Drawing object id renumbering.
use super::error::Result;
use super::ids::format_id;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::{OpcPackage, PackURI};
use crate::ooxml::xml::Element;
use crate::ooxml::xml::name::{noname, wp};
use log::debug;

/// Parts related to a container whose content can hold drawings.
const DRAWING_RELTYPES: [&str; 5] = [rt::HEADER, rt::FOOTER, rt::FOOTNOTES, rt::ENDNOTES, rt::COMMENTS];

/// Renumber every `wp:docPr/@id` in `containers` and the parts they relate to,
/// sequentially from 1 across the whole package.
pub(crate) fn renumber_drawing_ids(pkg: &mut OpcPackage, containers: &[PackURI]) -> Result<()> {
    let parts = drawing_parts(pkg, containers);
    let mut next = 1u32;
    for partname in &parts {
        let root = pkg.xml_part_mut(partname)?.root_mut();
        root.visit_mut(&mut |e: &mut Element| {
            if e.is(&wp::docPr) {
                e.set_attr(noname::id, format_id(next));
                next += 1;
            }
        });
    }
    debug!("renumbered {} drawing objects in {} parts", next - 1, parts.len());
    Ok(())
}

fn drawing_parts(pkg: &OpcPackage, containers: &[PackURI]) -> Vec<PackURI> {
    let mut parts: Vec<PackURI> = Vec::new();
    for container in containers {
        if !pkg.contains_part(container) || parts.contains(container) {
            continue;
        }
        parts.push(container.clone());
        let Ok(part) = pkg.get_part(container) else {
            continue;
        };
        for rel in part.rels().iter() {
            if rel.is_external() || !DRAWING_RELTYPES.contains(&rel.reltype()) {
                continue;
            }
            if let Ok(partname) = rel.target_partname()
                && pkg.xml_part(&partname).is_ok()
                && !parts.contains(&partname)
            {
                parts.push(partname);
            }
        }
    }
    parts
}

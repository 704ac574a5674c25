/// Relationships between package parts.
///
/// Every part (and the package itself) owns a `.rels` collection whose entries
/// point either at another part, by a reference relative to the owner's
/// directory, or at an external resource.
use crate::common::xml::escape_attr;
use crate::ooxml::opc::constants::{namespace, target_mode};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// `rId1`, `R5f0c…`
    r_id: String,
    reltype: String,
    /// Relative part reference, or a URL when external
    target_ref: String,
    /// Directory of the owning part
    base_uri: String,
    is_external: bool,
}

impl Relationship {
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// The reference exactly as written in the `.rels` part.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Absolute partname of the target; external relationships have none.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "{} targets an external resource",
                self.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// The relationships owned by one part, keyed and iterated by id.
#[derive(Debug, Clone)]
pub struct Relationships {
    base_uri: String,
    rels: BTreeMap<String, Relationship>,
}

impl Relationships {
    /// Create an empty collection for a part living in `base_uri`.
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: BTreeMap::new(),
        }
    }

    /// Parse the content of a `.rels` part.
    ///
    /// # Arguments
    /// * `base_uri` - Base URI of the source part (its directory)
    /// * `xml` - The `.rels` XML
    pub fn from_xml(base_uri: &str, xml: &[u8]) -> Result<Self> {
        let mut rels = Self::new(base_uri.to_string());
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Relationship" => {
                    let (r_id, reltype, target_ref, is_external) = read_relationship(e)?;
                    rels.add_relationship(reltype, target_ref, r_id, is_external);
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }
        Ok(rels)
    }

    /// Base URI that relative targets resolve against.
    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship, replacing any with the same id.
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target_ref: String,
        r_id: String,
        is_external: bool,
    ) -> &Relationship {
        let rel = Relationship {
            r_id: r_id.clone(),
            reltype,
            target_ref,
            base_uri: self.base_uri.clone(),
            is_external,
        };
        self.rels.insert(r_id.clone(), rel);
        &self.rels[&r_id]
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Check whether a relationship id is in use.
    #[inline]
    pub fn contains(&self, r_id: &str) -> bool {
        self.rels.contains_key(r_id)
    }

    /// The internal relationship of `reltype` to `target_ref`, added with the
    /// lowest free `rIdN` when missing.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> &Relationship {
        let r_id = match self.find(reltype, target_ref, false) {
            Some(r_id) => r_id,
            None => {
                let r_id = self.next_r_id();
                self.add_relationship(reltype.to_string(), target_ref.to_string(), r_id.clone(), false);
                r_id
            },
        };
        &self.rels[&r_id]
    }

    /// Like [`get_or_add`](Self::get_or_add) for an external target; returns the id.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> String {
        if let Some(r_id) = self.find(reltype, target_ref, true) {
            return r_id;
        }
        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), target_ref.to_string(), r_id.clone(), true);
        r_id
    }

    fn find(&self, reltype: &str, target_ref: &str, is_external: bool) -> Option<String> {
        self.rels
            .values()
            .find(|rel| rel.reltype == reltype && rel.target_ref == target_ref && rel.is_external == is_external)
            .map(|rel| rel.r_id.clone())
    }

    /// Lowest `rIdN` not yet taken.
    fn next_r_id(&self) -> String {
        let mut taken: Vec<u32> = self
            .rels
            .keys()
            .filter_map(|r_id| r_id.strip_prefix("rId"))
            .filter_map(|n| atoi_simd::parse::<u32, false, false>(n.as_bytes()).ok())
            .filter(|&n| n > 0)
            .collect();
        taken.sort_unstable();
        taken.dedup();

        let next = taken
            .iter()
            .zip(1u32..)
            .find(|(n, expected)| **n != *expected)
            .map_or(taken.len() as u32 + 1, |(_, expected)| expected);
        let mut buf = itoa::Buffer::new();
        format!("rId{}", buf.format(next))
    }

    /// The single relationship of `reltype`.
    ///
    /// Fails when there is none or more than one.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.values().filter(|rel| rel.reltype == reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// First relationship of a type, in id order.
    pub fn first_of_type(&self, reltype: &str) -> Option<&Relationship> {
        self.iter().find(|rel| rel.reltype == reltype)
    }

    /// All relationships in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Serialize as the content of a `.rels` part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(128 + self.rels.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Relationships xmlns=""#);
        xml.push_str(namespace::OPC_RELATIONSHIPS);
        xml.push_str(r#"">"#);

        for rel in self.iter() {
            xml.push_str(r#"<Relationship Id=""#);
            xml.push_str(&escape_attr(&rel.r_id));
            xml.push_str(r#"" Type=""#);
            xml.push_str(&escape_attr(&rel.reltype));
            xml.push_str(r#"" Target=""#);
            xml.push_str(&escape_attr(&rel.target_ref));
            xml.push('"');
            if rel.is_external {
                xml.push_str(r#" TargetMode=""#);
                xml.push_str(target_mode::EXTERNAL);
                xml.push('"');
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/".to_string())
    }
}

/// Id, type, target and external flag of a `Relationship` element.
fn read_relationship(e: &BytesStart<'_>) -> Result<(String, String, String, bool)> {
    let mut r_id = None;
    let mut reltype = None;
    let mut target_ref = None;
    let mut is_external = false;

    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"Id" => r_id = Some(attr.unescape_value()?.into_owned()),
            b"Type" => reltype = Some(attr.unescape_value()?.into_owned()),
            b"Target" => target_ref = Some(attr.unescape_value()?.into_owned()),
            b"TargetMode" => is_external = attr.unescape_value()? == target_mode::EXTERNAL,
            _ => {},
        }
    }

    match (r_id, reltype, target_ref) {
        (Some(r_id), Some(reltype), Some(target_ref)) => Ok((r_id, reltype, target_ref, is_external)),
        _ => Err(OpcError::InvalidRelationship(
            "Relationship element is missing Id, Type or Target".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as rt;

    #[test]
    fn test_next_r_id_fills_gaps() {
        let mut rels = Relationships::new("/word".to_string());
        assert_eq!(rels.next_r_id(), "rId1");

        rels.add_relationship("t".to_string(), "a.xml".to_string(), "rId1".to_string(), false);
        rels.add_relationship("t".to_string(), "b.xml".to_string(), "rId3".to_string(), false);
        assert_eq!(rels.next_r_id(), "rId2");

        rels.add_relationship("t".to_string(), "c.xml".to_string(), "rId2".to_string(), false);
        rels.add_relationship("t".to_string(), "d.xml".to_string(), "R7".to_string(), false);
        assert_eq!(rels.next_r_id(), "rId4");
    }

    #[test]
    fn test_get_or_add() {
        let mut rels = Relationships::new("/word".to_string());
        assert_eq!(rels.get_or_add(rt::STYLES, "styles.xml").r_id(), "rId1");
        assert_eq!(rels.get_or_add(rt::STYLES, "styles.xml").r_id(), "rId1");
        assert_eq!(rels.get_or_add(rt::NUMBERING, "numbering.xml").r_id(), "rId2");

        let link = rels.get_or_add_ext_rel(rt::HYPERLINK, "styles.xml");
        assert_eq!(link, "rId3");
        assert_eq!(rels.get_or_add_ext_rel(rt::HYPERLINK, "styles.xml"), "rId3");
    }

    #[test]
    fn test_add_relationship_replaces_same_id() {
        let mut rels = Relationships::new("/word".to_string());
        rels.add_relationship(rt::HEADER.to_string(), "header1.xml".to_string(), "rId1".to_string(), false);
        rels.add_relationship(rt::FOOTER.to_string(), "footer1.xml".to_string(), "rId1".to_string(), false);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels.get("rId1").unwrap().reltype(), rt::FOOTER);
    }

    #[test]
    fn test_part_with_reltype() {
        let mut rels = Relationships::default();
        assert!(matches!(rels.part_with_reltype(rt::HEADER), Err(OpcError::RelationshipNotFound(_))));
        rels.get_or_add(rt::HEADER, "word/header1.xml");
        assert!(rels.part_with_reltype(rt::HEADER).is_ok());
        rels.get_or_add(rt::HEADER, "word/header2.xml");
        assert!(matches!(rels.part_with_reltype(rt::HEADER), Err(OpcError::InvalidRelationship(_))));
    }

    #[test]
    fn test_from_xml_and_targets() {
        let xml = br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;
        let rels = Relationships::from_xml("/word", xml).unwrap();
        assert_eq!(rels.len(), 2);

        let image = rels.get("rId2").unwrap();
        assert_eq!(image.target_partname().unwrap().as_str(), "/word/media/image1.png");

        let link = rels.get("rId1").unwrap();
        assert!(link.is_external());
        assert_eq!(link.target_ref(), "https://example.com/?a=1&b=2");
        assert!(link.target_partname().is_err());

        let ids: Vec<&str> = rels.iter().map(|r| r.r_id()).collect();
        assert_eq!(ids, vec!["rId1", "rId2"]);
    }

    #[test]
    fn test_from_xml_rejects_incomplete_entry() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Target="a.xml"/></Relationships>"#;
        assert!(matches!(
            Relationships::from_xml("/word", xml),
            Err(OpcError::InvalidRelationship(_))
        ));
    }

    #[test]
    fn test_to_xml_reparses() {
        let mut rels = Relationships::new("/word".to_string());
        rels.add_relationship(rt::HYPERLINK.to_string(), "http://a/?x=\"1\"".to_string(), "R1".to_string(), true);
        rels.add_relationship(rt::HEADER.to_string(), "header1.xml".to_string(), "R2".to_string(), false);

        let again = Relationships::from_xml("/word", rels.to_xml().as_bytes()).unwrap();
        assert_eq!(again.get("R1"), rels.get("R1"));
        assert_eq!(again.get("R2"), rels.get("R2"));
        assert_eq!(
            again.get("R2").unwrap().target_partname().unwrap().as_str(),
            "/word/header1.xml"
        );
    }
}

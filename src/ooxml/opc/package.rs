/// In-memory OPC packages.
///
/// This module provides the OpcPackage type, which represents an Open Packaging
/// Convention package as a set of parts plus package-level relationships. Reading
/// and writing the physical zip container is the caller's concern: parts are
/// loaded with [`OpcPackage::load_part`] and emitted through [`OpcPackage::iter_parts`],
/// [`Relationships::to_xml`] and [`OpcPackage::content_types_xml`].
use crate::common::xml::escape_attr;
use crate::ooxml::opc::constants::{content_type as ct, namespace, relationship_type};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::{Part, PartFactory};
use crate::ooxml::opc::rel::Relationships;
use crate::ooxml::xml::XmlDocument;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};

/// Main API class for working with OPC packages.
///
/// OpcPackage represents an Open Packaging Convention package in memory,
/// providing access to parts, relationships, and package-level operations.
#[derive(Debug)]
pub struct OpcPackage {
    /// Package-level relationships
    rels: Relationships,

    /// All parts in the package, indexed by partname
    parts: HashMap<String, Box<dyn Part>>,
}

impl OpcPackage {
    /// Create a new empty OPC package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: HashMap::new(),
        }
    }

    /// Load one serialized part into the package.
    ///
    /// # Arguments
    /// * `partname` - The part's name
    /// * `content_type` - Content type resolved from `[Content_Types].xml`
    /// * `blob` - The part content
    /// * `rels_xml` - Content of the part's `.rels` item, if it has one
    pub fn load_part<B: Into<Bytes>>(
        &mut self,
        partname: PackURI,
        content_type: &str,
        blob: B,
        rels_xml: Option<&[u8]>,
    ) -> Result<()> {
        let base_uri = partname.base_uri().to_string();
        let mut part = PartFactory::load(partname, content_type.to_string(), blob)?;
        if let Some(xml) = rels_xml {
            *part.rels_mut() = Relationships::from_xml(&base_uri, xml)?;
        }
        self.add_part(part);
        Ok(())
    }

    /// Get the partname of the main document part.
    pub fn main_partname(&self) -> Result<PackURI> {
        let rel = self.rels.part_with_reltype(relationship_type::OFFICE_DOCUMENT)?;
        rel.target_partname()
    }

    /// Get a reference to the main document part.
    ///
    /// For Word documents, this is the document.xml part.
    pub fn main_document_part(&self) -> Result<&dyn Part> {
        let partname = self.main_partname()?;
        self.get_part(&partname)
    }

    /// Get a part by its partname.
    pub fn get_part(&self, partname: &PackURI) -> Result<&dyn Part> {
        self.part(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Get a mutable reference to a part by its partname.
    pub fn get_part_mut(&mut self, partname: &PackURI) -> Result<&mut dyn Part> {
        self.parts
            .get_mut(partname.as_str())
            .map(|b| &mut **b as &mut dyn Part)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Get a part by its partname, if present.
    pub fn part(&self, partname: &PackURI) -> Option<&dyn Part> {
        self.parts.get(partname.as_str()).map(|b| &**b as &dyn Part)
    }

    /// Parsed content of an XML part.
    pub fn xml_part(&self, partname: &PackURI) -> Result<&XmlDocument> {
        self.get_part(partname)?
            .xml()
            .ok_or_else(|| OpcError::XmlError(format!("{} is not an XML part", partname)))
    }

    /// Mutable parsed content of an XML part.
    pub fn xml_part_mut(&mut self, partname: &PackURI) -> Result<&mut XmlDocument> {
        self.get_part_mut(partname)?
            .xml_mut()
            .ok_or_else(|| OpcError::XmlError(format!("{} is not an XML part", partname)))
    }

    /// Get a part by relationship type from the package level.
    pub fn part_by_reltype(&self, reltype: &str) -> Result<&dyn Part> {
        let rel = self.rels.part_with_reltype(reltype)?;
        let partname = rel.target_partname()?;
        self.get_part(&partname)
    }

    /// Partname of the first part related to `source` by `reltype`.
    ///
    /// `source` may be the package pseudo-partname `/` for package-level relationships.
    /// Dangling relationships (no such part) yield `None`.
    pub fn related_partname(&self, source: &PackURI, reltype: &str) -> Option<PackURI> {
        let rels = if source.as_str() == PACKAGE_URI {
            &self.rels
        } else {
            self.part(source)?.rels()
        };
        rels.iter()
            .filter(|rel| !rel.is_external() && rel.reltype() == reltype)
            .filter_map(|rel| rel.target_partname().ok())
            .find(|partname| self.contains_part(partname))
    }

    /// Add a new part to the package, replacing any part with the same name.
    pub fn add_part(&mut self, part: Box<dyn Part>) {
        let partname = part.partname().to_string();
        self.parts.insert(partname, part);
    }

    /// Remove a part from the package.
    pub fn remove_part(&mut self, partname: &PackURI) -> Option<Box<dyn Part>> {
        self.parts.remove(partname.as_str())
    }

    /// Get an iterator over all parts in the package, ordered by partname.
    pub fn iter_parts(&self) -> impl Iterator<Item = &dyn Part> {
        let mut parts: Vec<&dyn Part> = self.parts.values().map(|b| &**b as &dyn Part).collect();
        parts.sort_by(|a, b| a.partname().cmp(b.partname()));
        parts.into_iter()
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Get a reference to the package-level relationships.
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get a mutable reference to the package-level relationships.
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Relate the package to a part.
    ///
    /// Creates or reuses a relationship from the package to the specified part.
    pub fn relate_to(&mut self, partname: &PackURI, reltype: &str) -> String {
        let rel = self.rels.get_or_add(reltype, &partname.relative_ref(PACKAGE_URI));
        rel.r_id().to_string()
    }

    /// Find the next available partname for a part template.
    ///
    /// Useful for creating new parts with sequential numbering (e.g., image1.png, image2.png).
    ///
    /// # Arguments
    /// * `template` - A format string with a %d placeholder for the number
    ///
    /// # Example
    /// ```no_run
    /// # use litchi_builder::ooxml::opc::package::OpcPackage;
    /// # let pkg = OpcPackage::new();
    /// let next_image = pkg.next_partname("/word/media/image%d.png")?;
    /// # Ok::<(), litchi_builder::ooxml::opc::error::OpcError>(())
    /// ```
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        let mut buf = itoa::Buffer::new();
        for n in 1u32..=100_000 {
            let candidate = template.replace("%d", buf.format(n));
            if !self.parts.contains_key(&candidate) {
                return PackURI::new(candidate).map_err(OpcError::InvalidPackUri);
            }
        }
        Err(OpcError::InvalidPackUri(format!(
            "Too many parts for template '{}'",
            template
        )))
    }

    /// Check if a part exists in the package.
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname.as_str())
    }

    /// Build the `[Content_Types].xml` item for the current set of parts.
    ///
    /// Extensions whose parts all share the conventional content type become
    /// `Default` entries; everything else gets an `Override`.
    pub fn content_types_xml(&self) -> String {
        let mut defaults: BTreeMap<String, &str> = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS);
        defaults.insert("xml".to_string(), ct::XML);
        let mut overrides: Vec<(&str, &str)> = Vec::new();

        for part in self.iter_parts() {
            let ext = part.partname().ext().to_ascii_lowercase();
            let content_type = part.content_type();
            match ct::for_extension(&ext) {
                Some(conventional) if conventional == content_type => {
                    defaults.entry(ext).or_insert(conventional);
                },
                _ => overrides.push((part.partname().as_str(), content_type)),
            }
        }

        let mut xml = String::with_capacity(2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Types xmlns=""#);
        xml.push_str(namespace::OPC_CONTENT_TYPES);
        xml.push_str(r#"">"#);
        for (ext, content_type) in &defaults {
            xml.push_str(r#"<Default Extension=""#);
            xml.push_str(&escape_attr(ext));
            xml.push_str(r#"" ContentType=""#);
            xml.push_str(&escape_attr(content_type));
            xml.push_str(r#""/>"#);
        }
        for (partname, content_type) in overrides {
            xml.push_str(r#"<Override PartName=""#);
            xml.push_str(&escape_attr(partname));
            xml.push_str(r#"" ContentType=""#);
            xml.push_str(&escape_attr(content_type));
            xml.push_str(r#""/>"#);
        }
        xml.push_str("</Types>");
        xml
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for OpcPackage {
    fn clone(&self) -> Self {
        Self {
            rels: self.rels.clone(),
            parts: self
                .parts
                .iter()
                .map(|(name, part)| (name.clone(), part.clone_box()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &[u8] = br#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p/></w:body></w:document>"#;
    const DOCUMENT_RELS: &[u8] = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/></Relationships>"#;

    fn minimal_package() -> OpcPackage {
        let mut pkg = OpcPackage::new();
        pkg.load_part(
            PackURI::new("/word/document.xml").unwrap(),
            ct::WML_DOCUMENT_MAIN,
            DOCUMENT.to_vec(),
            Some(DOCUMENT_RELS),
        )
        .unwrap();
        pkg.load_part(
            PackURI::new("/word/media/image1.png").unwrap(),
            ct::PNG,
            vec![1u8, 2, 3],
            None,
        )
        .unwrap();
        pkg.relate_to(&PackURI::new("/word/document.xml").unwrap(), relationship_type::OFFICE_DOCUMENT);
        pkg
    }

    #[test]
    fn test_main_document_part() {
        let pkg = minimal_package();
        let main = pkg.main_document_part().unwrap();
        assert_eq!(main.partname().as_str(), "/word/document.xml");
        assert_eq!(main.content_type(), ct::WML_DOCUMENT_MAIN);
        assert_eq!(pkg.part_count(), 2);
    }

    #[test]
    fn test_related_partname() {
        let pkg = minimal_package();
        let main = pkg.main_partname().unwrap();
        let image = pkg.related_partname(&main, relationship_type::IMAGE).unwrap();
        assert_eq!(image.as_str(), "/word/media/image1.png");
        assert!(pkg.related_partname(&main, relationship_type::STYLES).is_none());
    }

    #[test]
    fn test_next_partname() {
        let pkg = minimal_package();
        let next = pkg.next_partname("/word/media/image%d.png").unwrap();
        assert_eq!(next.as_str(), "/word/media/image2.png");
    }

    #[test]
    fn test_content_types_xml() {
        let pkg = minimal_package();
        let xml = pkg.content_types_xml();
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/word/document.xml""#));
    }

    #[test]
    fn test_clone_is_deep() {
        let pkg = minimal_package();
        let mut copy = pkg.clone();
        let main = copy.main_partname().unwrap();
        copy.xml_part_mut(&main).unwrap().root_mut().nodes_mut().clear();
        assert_eq!(pkg.xml_part(&main).unwrap().root().nodes().len(), 1);
    }
}

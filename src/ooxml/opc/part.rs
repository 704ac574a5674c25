use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::rel::Relationships;
use crate::ooxml::xml::XmlDocument;
/// Open Packaging Convention (OPC) objects related to package parts.
///
/// This module provides the Part trait with its XmlPart and BlobPart implementations.
/// Parts are the fundamental units of content in an OPC package, each with a unique
/// partname, content type, and optional relationships.
use bytes::Bytes;
use std::borrow::Cow;

/// Trait representing a part in an OPC package.
///
/// Parts are the fundamental units of content in an OPC package. Each part
/// has a unique partname (PackURI), a content type, and may have relationships
/// to other parts.
pub trait Part: std::fmt::Debug {
    /// Get the partname of this part.
    fn partname(&self) -> &PackURI;

    /// Get the content type of this part.
    fn content_type(&self) -> &str;

    /// Get the binary content of this part.
    ///
    /// Binary parts borrow their stored bytes; XML parts serialize their tree.
    fn blob(&self) -> Cow<'_, [u8]>;

    /// Get the relationships for this part.
    fn rels(&self) -> &Relationships;

    /// Get mutable access to the relationships for this part.
    fn rels_mut(&mut self) -> &mut Relationships;

    /// Parsed XML content, if this is an XML part.
    fn xml(&self) -> Option<&XmlDocument> {
        None
    }

    /// Mutable parsed XML content, if this is an XML part.
    fn xml_mut(&mut self) -> Option<&mut XmlDocument> {
        None
    }

    /// Copy this part's content under a new partname, without relationships.
    fn duplicate(&self, partname: PackURI) -> Box<dyn Part>;

    /// Clone this part including its relationships.
    fn clone_box(&self) -> Box<dyn Part>;

    /// Add or get a relationship to another part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns its rId. Otherwise, creates a new relationship and returns
    /// the new rId.
    fn relate_to(&mut self, target: &PackURI, reltype: &str) -> String {
        let target_ref = target.relative_ref(self.partname().base_uri());
        let rel = self.rels_mut().get_or_add(reltype, &target_ref);
        rel.r_id().to_string()
    }

    /// Add or get an external relationship.
    fn relate_to_ext(&mut self, target_url: &str, reltype: &str) -> String {
        self.rels_mut().get_or_add_ext_rel(reltype, target_url)
    }

    /// Get the target reference for a relationship ID.
    fn target_ref(&self, r_id: &str) -> Result<&str> {
        self.rels()
            .get(r_id)
            .map(|rel| rel.target_ref())
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("rId: {}", r_id)))
    }
}

/// A part that stores binary content.
///
/// This is the default part type for non-XML content such as images,
/// embedded fonts and OLE objects. The content is shared via [`Bytes`], so
/// duplicating a part never copies its data.
#[derive(Debug, Clone)]
pub struct BlobPart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The binary content of this part
    blob: Bytes,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl BlobPart {
    /// Create a new BlobPart.
    pub fn new<B: Into<Bytes>>(partname: PackURI, content_type: String, blob: B) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob: blob.into(),
            rels,
        }
    }

    /// The shared content buffer.
    #[inline]
    pub fn bytes(&self) -> &Bytes {
        &self.blob
    }
}

impl Part for BlobPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.blob)
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn duplicate(&self, partname: PackURI) -> Box<dyn Part> {
        Box::new(BlobPart::new(partname, self.content_type.clone(), self.blob.clone()))
    }

    fn clone_box(&self) -> Box<dyn Part> {
        Box::new(self.clone())
    }
}

/// An XML part holding its content as an editable element tree.
///
/// The tree is parsed once on load and serialized only when [`Part::blob`] is
/// requested, so repeated edits during a merge never re-parse.
#[derive(Debug, Clone)]
pub struct XmlPart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The parsed XML content
    document: XmlDocument,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl XmlPart {
    /// Create a new XmlPart from an already-built document.
    pub fn new(partname: PackURI, content_type: String, document: XmlDocument) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            document,
            rels,
        }
    }

    /// Load an XML part from raw data.
    pub fn load(partname: PackURI, content_type: String, xml_bytes: &[u8]) -> Result<Self> {
        let document = XmlDocument::parse(xml_bytes)
            .map_err(|e| OpcError::XmlError(format!("{}: {}", partname, e)))?;
        Ok(Self::new(partname, content_type, document))
    }

    #[inline]
    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    #[inline]
    pub fn document_mut(&mut self) -> &mut XmlDocument {
        &mut self.document
    }
}

impl Part for XmlPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.document.to_xml_bytes())
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn xml(&self) -> Option<&XmlDocument> {
        Some(&self.document)
    }

    fn xml_mut(&mut self) -> Option<&mut XmlDocument> {
        Some(&mut self.document)
    }

    fn duplicate(&self, partname: PackURI) -> Box<dyn Part> {
        Box::new(XmlPart::new(partname, self.content_type.clone(), self.document.clone()))
    }

    fn clone_box(&self) -> Box<dyn Part> {
        Box::new(self.clone())
    }
}

/// Factory for creating Part instances based on content type.
///
/// The factory dispatches on the content type to create the appropriate
/// Part implementation (BlobPart for binary content, XmlPart for XML content).
pub struct PartFactory;

impl PartFactory {
    /// Load a part from raw data, selecting the appropriate Part type based on content type.
    pub fn load<B: Into<Bytes>>(partname: PackURI, content_type: String, blob: B) -> Result<Box<dyn Part>> {
        let blob = blob.into();
        if Self::is_xml_content_type(&content_type) {
            Ok(Box::new(XmlPart::load(partname, content_type, &blob)?))
        } else {
            Ok(Box::new(BlobPart::new(partname, content_type, blob)))
        }
    }

    /// Check if a content type represents XML content.
    ///
    /// Images stay binary even when they are XML (SVG), so their bytes are kept verbatim.
    #[inline]
    fn is_xml_content_type(content_type: &str) -> bool {
        !content_type.starts_with("image/")
            && (content_type.ends_with("+xml") || content_type.ends_with("/xml"))
    }
}

/// Package implementation for Word documents.
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part, XmlPart};
use crate::ooxml::xml::name::w;
use crate::ooxml::xml::{Element, XmlDocument, ns};

/// Partname of the main document in a freshly created package.
pub const MAIN_DOCUMENT_PARTNAME: &str = "/word/document.xml";

/// A Word (.docx) package.
///
/// This wraps an OPC package whose main part is a WordprocessingML document
/// (document, template, or their macro-enabled variants).
///
/// # Examples
///
/// ```rust,no_run
/// use litchi_builder::ooxml::docx::Package;
/// use litchi_builder::ooxml::opc::OpcPackage;
///
/// # fn load() -> OpcPackage { OpcPackage::new() }
/// let pkg = Package::from_opc(load())?;
/// let body = pkg.main_document()?.root().elements().count();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Package {
    /// The underlying OPC package
    opc: OpcPackage,
}

impl Package {
    /// Wrap an OPC package, verifying it's a Word document by checking the
    /// main part's content type.
    pub fn from_opc(opc: OpcPackage) -> Result<Self> {
        let main_part = opc
            .main_document_part()
            .map_err(|e| OoxmlError::PartNotFound(format!("main document part: {}", e)))?;

        let content_type = main_part.content_type();
        if !ct::WML_MAIN_TYPES.contains(&content_type) {
            return Err(OoxmlError::InvalidContentType {
                expected: ct::WML_DOCUMENT_MAIN.to_string(),
                got: content_type.to_string(),
            });
        }

        Ok(Self { opc })
    }

    /// Create a package holding an empty document with an empty body.
    pub fn new_document() -> Self {
        let root = Element::new(w::document).with_child(Element::new(w::body));
        let mut document = XmlDocument::new(root);
        document.declare_namespace("w", ns::W);
        document.declare_namespace("r", ns::R);

        let partname = PackURI::from_static(MAIN_DOCUMENT_PARTNAME);
        let part = XmlPart::new(partname.clone(), ct::WML_DOCUMENT_MAIN.to_string(), document);

        let mut opc = OpcPackage::new();
        opc.add_part(Box::new(part));
        opc.relate_to(&partname, rt::OFFICE_DOCUMENT);
        Self { opc }
    }

    /// Partname of the main document part.
    pub fn main_partname(&self) -> Result<PackURI> {
        Ok(self.opc.main_partname()?)
    }

    /// Parsed main document.
    pub fn main_document(&self) -> Result<&XmlDocument> {
        let partname = self.main_partname()?;
        Ok(self.opc.xml_part(&partname)?)
    }

    /// Partname of the glossary document, if the package has one.
    pub fn glossary_partname(&self) -> Option<PackURI> {
        let main = self.main_partname().ok()?;
        self.opc.related_partname(&main, rt::GLOSSARY_DOCUMENT)
    }

    /// Get the underlying OPC package.
    ///
    /// This provides access to lower-level package operations.
    #[inline]
    pub fn opc_package(&self) -> &OpcPackage {
        &self.opc
    }

    /// Mutable access to the underlying OPC package.
    #[inline]
    pub fn opc_package_mut(&mut self) -> &mut OpcPackage {
        &mut self.opc
    }

    /// Unwrap into the underlying OPC package.
    #[inline]
    pub fn into_opc(self) -> OpcPackage {
        self.opc
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new_document()
    }
}

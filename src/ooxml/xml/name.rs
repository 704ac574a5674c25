/// Namespace-qualified names and the well-known WordprocessingML vocabularies.
use phf::phf_map;
use std::borrow::Cow;
use std::fmt;

/// An expanded XML name: namespace URI plus local name.
///
/// Unqualified attribute names use the empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XName {
    namespace: Cow<'static, str>,
    local: Cow<'static, str>,
}

impl XName {
    /// Create a name from static strings; usable in `const` items.
    pub const fn from_static(namespace: &'static str, local: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            local: Cow::Borrowed(local),
        }
    }

    /// Create a name from owned strings.
    pub fn new<N: Into<String>, L: Into<String>>(namespace: N, local: L) -> Self {
        Self {
            namespace: Cow::Owned(namespace.into()),
            local: Cow::Owned(local.into()),
        }
    }

    /// Create a name in no namespace.
    pub fn unqualified<L: Into<String>>(local: L) -> Self {
        Self {
            namespace: Cow::Borrowed(""),
            local: Cow::Owned(local.into()),
        }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    #[inline]
    pub fn is_qualified(&self) -> bool {
        !self.namespace.is_empty()
    }
}

impl fmt::Display for XName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// Namespace URIs.
pub mod ns {
    pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    pub const PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
    pub const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
    pub const C: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
    pub const DGM: &str = "http://schemas.openxmlformats.org/drawingml/2006/diagram";
    pub const V: &str = "urn:schemas-microsoft-com:vml";
    pub const O: &str = "urn:schemas-microsoft-com:office:office";
    pub const W10: &str = "urn:schemas-microsoft-com:office:word";
    pub const WNE: &str = "http://schemas.microsoft.com/office/word/2006/wordml";
    pub const M: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
    pub const MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
    pub const W14: &str = "http://schemas.microsoft.com/office/word/2010/wordml";
    pub const W15: &str = "http://schemas.microsoft.com/office/word/2012/wordml";
    pub const WP14: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing";
    pub const WPS: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingShape";
    pub const WPG: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingGroup";
    pub const WPC: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas";
    pub const ASVG: &str = "http://schemas.microsoft.com/office/drawing/2016/SVG/main";
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// Placeholder markup recognized by the document builder.
    pub const PT: &str = "http://powertools.codeplex.com/2011";
    /// Root namespace of documents saved in the ISO strict conformance class.
    pub const STRICT_W: &str = "http://purl.oclc.org/ooxml/wordprocessingml/main";

    /// Namespaces of pre-release Word builds that cannot be merged.
    pub const OBSOLETE: [&str; 3] = [
        "http://schemas.microsoft.com/office/word/2007/5/30/wordml",
        "http://schemas.microsoft.com/office/word/2008/9/16/wordprocessingDrawing",
        "http://schemas.microsoft.com/office/word/2009/2/wordml",
    ];
}

static WELL_KNOWN_PREFIXES: phf::Map<&'static str, &'static str> = phf_map! {
    "http://schemas.openxmlformats.org/wordprocessingml/2006/main" => "w",
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships" => "r",
    "http://schemas.openxmlformats.org/drawingml/2006/main" => "a",
    "http://schemas.openxmlformats.org/drawingml/2006/picture" => "pic",
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" => "wp",
    "http://schemas.openxmlformats.org/drawingml/2006/chart" => "c",
    "http://schemas.openxmlformats.org/drawingml/2006/diagram" => "dgm",
    "urn:schemas-microsoft-com:vml" => "v",
    "urn:schemas-microsoft-com:office:office" => "o",
    "urn:schemas-microsoft-com:office:word" => "w10",
    "http://schemas.microsoft.com/office/word/2006/wordml" => "wne",
    "http://schemas.openxmlformats.org/officeDocument/2006/math" => "m",
    "http://schemas.openxmlformats.org/markup-compatibility/2006" => "mc",
    "http://schemas.microsoft.com/office/word/2010/wordml" => "w14",
    "http://schemas.microsoft.com/office/word/2012/wordml" => "w15",
    "http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing" => "wp14",
    "http://schemas.microsoft.com/office/word/2010/wordprocessingShape" => "wps",
    "http://schemas.microsoft.com/office/word/2010/wordprocessingGroup" => "wpg",
    "http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas" => "wpc",
    "http://schemas.microsoft.com/office/drawing/2016/SVG/main" => "asvg",
    "http://powertools.codeplex.com/2011" => "pt",
    "http://schemas.openxmlformats.org/package/2006/relationships" => "rel",
};

/// Conventional prefix for a namespace URI, if it is one Word itself writes.
#[inline]
pub fn well_known_prefix(uri: &str) -> Option<&'static str> {
    WELL_KNOWN_PREFIXES.get(uri).copied()
}

macro_rules! names {
    ($ns:expr; $($ident:ident => $local:literal),* $(,)?) => {
        $(pub const $ident: XName = XName::from_static($ns, $local);)*
    };
}

/// WordprocessingML main namespace.
#[allow(non_upper_case_globals)]
pub mod w {
    use super::{XName, ns};

    names! { ns::W;
        abstractNum => "abstractNum",
        abstractNumId => "abstractNumId",
        altChunk => "altChunk",
        attachedTemplate => "attachedTemplate",
        basedOn => "basedOn",
        body => "body",
        bookmarkEnd => "bookmarkEnd",
        bookmarkStart => "bookmarkStart",
        comment => "comment",
        commentRangeEnd => "commentRangeEnd",
        commentRangeStart => "commentRangeStart",
        commentReference => "commentReference",
        comments => "comments",
        control => "control",
        dataSource => "dataSource",
        docDefaults => "docDefaults",
        docPart => "docPart",
        docParts => "docParts",
        document => "document",
        embedBold => "embedBold",
        embedBoldItalic => "embedBoldItalic",
        embedItalic => "embedItalic",
        embedRegular => "embedRegular",
        endnote => "endnote",
        endnoteReference => "endnoteReference",
        endnotes => "endnotes",
        font => "font",
        fonts => "fonts",
        footerReference => "footerReference",
        footnote => "footnote",
        footnoteReference => "footnoteReference",
        footnotes => "footnotes",
        frameset => "frameset",
        ftr => "ftr",
        glossaryDocument => "glossaryDocument",
        hdr => "hdr",
        headerReference => "headerReference",
        headerSource => "headerSource",
        hyperlink => "hyperlink",
        ilvl => "ilvl",
        ins => "ins",
        latentStyles => "latentStyles",
        link => "link",
        lsdException => "lsdException",
        lvl => "lvl",
        lvlPicBulletId => "lvlPicBulletId",
        mailMerge => "mailMerge",
        moveFromRangeEnd => "moveFromRangeEnd",
        moveFromRangeStart => "moveFromRangeStart",
        moveToRangeEnd => "moveToRangeEnd",
        moveToRangeStart => "moveToRangeStart",
        next => "next",
        nsid => "nsid",
        num => "num",
        numbering => "numbering",
        numId => "numId",
        numIdMacAtCleanup => "numIdMacAtCleanup",
        numPicBullet => "numPicBullet",
        numPicBulletId => "numPicBulletId",
        numPr => "numPr",
        numStyleLink => "numStyleLink",
        p => "p",
        permEnd => "permEnd",
        permStart => "permStart",
        pgSz => "pgSz",
        pPr => "pPr",
        printerSettings => "printerSettings",
        pStyle => "pStyle",
        r => "r",
        recipientData => "recipientData",
        rPr => "rPr",
        rStyle => "rStyle",
        saveThroughXslt => "saveThroughXslt",
        sectPr => "sectPr",
        sectPrChange => "sectPrChange",
        settings => "settings",
        sourceFileName => "sourceFileName",
        src => "src",
        style => "style",
        styleLink => "styleLink",
        styles => "styles",
        subDoc => "subDoc",
        t => "t",
        tbl => "tbl",
        tblStyle => "tblStyle",
        webSettings => "webSettings",
        // attributes
        count => "count",
        customMarkFollows => "customMarkFollows",
        default => "default",
        displacedByCustomXml => "displacedByCustomXml",
        id => "id",
        name => "name",
        styleId => "styleId",
        type_ => "type",
        val => "val",
    }
}

/// Office document relationships namespace.
#[allow(non_upper_case_globals)]
pub mod r {
    use super::{XName, ns};

    names! { ns::R;
        cs => "cs",
        dm => "dm",
        embed => "embed",
        href => "href",
        id => "id",
        link => "link",
        lo => "lo",
        pict => "pict",
        qs => "qs",
    }
}

/// DrawingML main namespace.
#[allow(non_upper_case_globals)]
pub mod a {
    use super::{XName, ns};

    names! { ns::A;
        audioFile => "audioFile",
        blip => "blip",
        hlinkClick => "hlinkClick",
        hlinkHover => "hlinkHover",
        hlinkMouseOver => "hlinkMouseOver",
        quickTimeFile => "quickTimeFile",
        videoFile => "videoFile",
        wavAudioFile => "wavAudioFile",
    }
}

/// WordprocessingML drawing namespace.
#[allow(non_upper_case_globals)]
pub mod wp {
    use super::{XName, ns};

    names! { ns::WP;
        docPr => "docPr",
    }
}

/// DrawingML chart namespace.
#[allow(non_upper_case_globals)]
pub mod c {
    use super::{XName, ns};

    names! { ns::C;
        chart => "chart",
        externalData => "externalData",
        userShapes => "userShapes",
    }
}

/// DrawingML diagram namespace.
#[allow(non_upper_case_globals)]
pub mod dgm {
    use super::{XName, ns};

    names! { ns::DGM;
        relIds => "relIds",
    }
}

/// VML namespace.
#[allow(non_upper_case_globals)]
pub mod v {
    use super::{XName, ns};

    names! { ns::V;
        fill => "fill",
        imagedata => "imagedata",
        stroke => "stroke",
    }
}

/// Office VML extensions namespace.
#[allow(non_upper_case_globals)]
pub mod o {
    use super::{XName, ns};

    names! { ns::O;
        OLEObject => "OLEObject",
        // attributes
        relid => "relid",
    }
}

/// Word 2006 extensions namespace.
#[allow(non_upper_case_globals)]
pub mod wne {
    use super::{XName, ns};

    names! { ns::WNE;
        toolbarData => "toolbarData",
    }
}

/// Markup compatibility namespace.
#[allow(non_upper_case_globals)]
pub mod mc {
    use super::{XName, ns};

    names! { ns::MC;
        Ignorable => "Ignorable",
    }
}

/// SVG extension namespace.
#[allow(non_upper_case_globals)]
pub mod asvg {
    use super::{XName, ns};

    names! { ns::ASVG;
        svgBlip => "svgBlip",
    }
}

/// Document builder placeholder namespace.
#[allow(non_upper_case_globals)]
pub mod pt {
    use super::{XName, ns};

    names! { ns::PT;
        Insert => "Insert",
    }
}

/// Unqualified attribute names.
#[allow(non_upper_case_globals)]
pub mod noname {
    use super::XName;

    names! { "";
        Id => "Id",
        id => "id",
        href => "href",
    }
}

/// A contiguous range of one package's body, with per-source merge settings.
use crate::ooxml::docx::Package;

/// One input to [`DocumentBuilder::build`](super::DocumentBuilder::build).
///
/// By default a source contributes its whole body and keeps its section
/// properties.
///
/// # Examples
///
/// ```rust
/// use litchi_builder::ooxml::docx::{Package, Source};
///
/// let pkg = Package::new_document();
/// let source = Source::new(&pkg)
///     .with_range(2, 5)
///     .with_keep_sections(false);
/// assert_eq!(source.start(), 2);
/// assert_eq!(source.count(), Some(5));
/// ```
#[derive(Debug, Clone)]
pub struct Source<'a> {
    package: &'a Package,
    start: usize,
    count: Option<usize>,
    keep_sections: bool,
    discard_headers_and_footers: bool,
    insert_id: Option<String>,
}

impl<'a> Source<'a> {
    /// Use the whole body of `package`.
    pub fn new(package: &'a Package) -> Self {
        Self {
            package,
            start: 0,
            count: None,
            keep_sections: true,
            discard_headers_and_footers: false,
            insert_id: None,
        }
    }

    /// Take `count` top-level body elements starting at `start`.
    #[inline]
    pub fn with_range(mut self, start: usize, count: usize) -> Self {
        self.start = start;
        self.count = Some(count);
        self
    }

    /// Take every top-level body element from `start` on.
    #[inline]
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self.count = None;
        self
    }

    /// Whether section properties inside the range are carried over.
    #[inline]
    pub fn with_keep_sections(mut self, keep: bool) -> Self {
        self.keep_sections = keep;
        self
    }

    /// Drop header and footer references from carried-over sections.
    #[inline]
    pub fn with_discard_headers_and_footers(mut self, discard: bool) -> Self {
        self.discard_headers_and_footers = discard;
        self
    }

    /// Replace the `pt:Insert` placeholder with this id instead of appending.
    #[inline]
    pub fn with_insert_id<S: Into<String>>(mut self, id: S) -> Self {
        self.insert_id = Some(id.into());
        self
    }

    #[inline]
    pub fn package(&self) -> &'a Package {
        self.package
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn count(&self) -> Option<usize> {
        self.count
    }

    #[inline]
    pub fn keep_sections(&self) -> bool {
        self.keep_sections
    }

    #[inline]
    pub fn discard_headers_and_footers(&self) -> bool {
        self.discard_headers_and_footers
    }

    #[inline]
    pub fn insert_id(&self) -> Option<&str> {
        self.insert_id.as_deref()
    }

    /// Clamp the requested window to a body of `len` elements.
    pub(crate) fn window(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.start.min(len);
        let end = match self.count {
            Some(count) => start.saturating_add(count).min(len),
            None => len,
        };
        start..end
    }
}

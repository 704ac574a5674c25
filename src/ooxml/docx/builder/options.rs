/// Options controlling how sources are merged.
use serde::{Deserialize, Serialize};

/// How a source's styles are matched against the target's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleMergeMode {
    /// Match on the style's display name; content referring to a source style
    /// is rewritten to the id of the same-named target style.
    #[default]
    ByName,
    /// Match on the style id only; a source style whose id already exists in
    /// the target is dropped in favour of the target's definition.
    ById,
}

/// Configuration options for [`DocumentBuilder`](super::DocumentBuilder).
///
/// # Examples
///
/// ```rust
/// use litchi_builder::ooxml::docx::{BuilderOptions, StyleMergeMode};
///
/// let options = BuilderOptions::new()
///     .with_style_merge(StyleMergeMode::ById)
///     .with_glossary(false);
/// assert!(options.renumber_drawing_ids);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Style matching strategy
    pub style_merge: StyleMergeMode,
    /// Whether glossary documents (building blocks) of the sources are merged
    pub include_glossary: bool,
    /// Whether `wp:docPr` ids are renumbered from 1 after all sources are merged
    pub renumber_drawing_ids: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            style_merge: StyleMergeMode::ByName,
            include_glossary: true,
            renumber_drawing_ids: true,
        }
    }
}

impl BuilderOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the style matching strategy.
    #[inline]
    pub fn with_style_merge(mut self, mode: StyleMergeMode) -> Self {
        self.style_merge = mode;
        self
    }

    /// Set whether glossary documents are merged.
    #[inline]
    pub fn with_glossary(mut self, include: bool) -> Self {
        self.include_glossary = include;
        self
    }

    /// Set whether drawing object ids are renumbered.
    ///
    /// Word refuses to open some documents with duplicate `wp:docPr` ids, so
    /// turning this off is only useful when the caller renumbers them itself.
    #[inline]
    pub fn with_drawing_id_renumbering(mut self, renumber: bool) -> Self {
        self.renumber_drawing_ids = renumber;
        self
    }
}

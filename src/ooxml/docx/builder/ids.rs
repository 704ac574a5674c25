/// Fresh-id allocation for the numeric and relationship id spaces of a package.
use crate::common::id::generate_unique_rel_id;
use crate::ooxml::opc::{OpcPackage, PackURI, Relationships};
use crate::ooxml::xml::XName;
use std::collections::{HashMap, HashSet};

/// A family of numeric ids that must stay unique within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum IdSpace {
    /// `w:num/@w:numId`; 0 means "no numbering" and is never allocated
    Numbering,
    AbstractNumbering,
    NumPicBullet,
    Bookmark,
    Comment,
    /// Regular footnotes; -1 and 0 belong to the separator notes
    Footnote,
    Endnote,
    /// Index in `/word/media/image{n}.*`
    Picture,
}

impl IdSpace {
    /// Smallest id ever handed out in this space.
    fn floor(self) -> u32 {
        match self {
            IdSpace::Numbering
            | IdSpace::Footnote
            | IdSpace::Endnote
            | IdSpace::Picture => 1,
            IdSpace::AbstractNumbering | IdSpace::NumPicBullet | IdSpace::Bookmark | IdSpace::Comment => 0,
        }
    }
}

/// Monotonic id counters, one per `(space, scope)`.
///
/// A counter is seeded lazily on first use from the ids already present in
/// the target, and then only moves forward, so an id is never handed out twice
/// even when several sources feed the same scope.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: HashMap<(IdSpace, String), u32>,
    rel_ids: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id in `space` for `scope` (usually a partname).
    ///
    /// `existing` is only called the first time the pair is seen and yields the
    /// ids already taken in the target.
    pub fn next<I, F>(&mut self, space: IdSpace, scope: &str, existing: F) -> u32
    where
        F: FnOnce() -> I,
        I: IntoIterator<Item = u32>,
    {
        let slot = self
            .next
            .entry((space, scope.to_string()))
            .or_insert_with(|| {
                existing()
                    .into_iter()
                    .map(|id| id.saturating_add(1))
                    .max()
                    .unwrap_or(0)
                    .max(space.floor())
            });
        let id = *slot;
        *slot = slot.saturating_add(1);
        id
    }

    /// Allocate a relationship id unused in `rels` and never handed out before.
    pub fn rel_id(&mut self, rels: &Relationships) -> String {
        let issued = &self.rel_ids;
        let id = generate_unique_rel_id(|candidate| rels.contains(candidate) || issued.contains(candidate));
        self.rel_ids.insert(id.clone());
        id
    }
}

/// Parse a non-negative decimal id attribute.
#[inline]
pub(crate) fn parse_id(value: &str) -> Option<u32> {
    atoi_simd::parse::<u32, false, false>(value.as_bytes()).ok()
}

/// Numeric values of `attr` on every `element` in an XML part.
///
/// Used to seed an [`IdAllocator`] counter; a missing part yields nothing.
pub(crate) fn ids_in(pkg: &OpcPackage, partname: &PackURI, element: &XName, attr: &XName) -> Vec<u32> {
    match pkg.xml_part(partname) {
        Ok(doc) => doc
            .root()
            .descendants_and_self()
            .filter(|e| e.is(element))
            .filter_map(|e| e.attr(attr))
            .filter_map(parse_id)
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Format an id for writing back into an attribute.
#[inline]
pub(crate) fn format_id(id: u32) -> String {
    let mut buf = itoa::Buffer::new();
    buf.format(id).to_string()
}

/// Content-addressed image cache.
///
/// Images are keyed by a SHA-256 digest of their bytes and compared in full on
/// a digest hit, so one image referenced by several sources is stored once per
/// destination part.
use super::error::Result;
use super::ids::{IdAllocator, IdSpace};
use super::step::MergeStep;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::{OpcPackage, PackURI, Part};
use log::trace;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Directory new image parts are written to.
const MEDIA_DIR: &str = "/word/media";

type Digest256 = Vec<u8>;

/// Images known to the target, grouped by the part that references them.
#[derive(Debug, Default)]
pub(crate) struct ImageCache {
    scopes: HashMap<PackURI, HashMap<Digest256, Vec<PackURI>>>,
}

impl ImageCache {
    /// Target partname holding the same bytes and content type as `image`,
    /// copying `image` into the target when no such part is known to `owner`.
    ///
    /// The first lookup for an owner registers the images it already references.
    pub(crate) fn resolve(
        &mut self,
        target: &mut OpcPackage,
        ids: &mut IdAllocator,
        owner: &PackURI,
        image: &dyn Part,
    ) -> Result<PackURI> {
        let scope = self
            .scopes
            .entry(owner.clone())
            .or_insert_with(|| existing_images(target, owner));

        let blob = image.blob();
        let digest = Sha256::digest(&blob).to_vec();
        if let Some(candidates) = scope.get(&digest) {
            for partname in candidates {
                if let Some(existing) = target.part(partname)
                    && existing.content_type() == image.content_type()
                    && existing.blob() == blob
                {
                    trace!("reusing {} for {}", partname, image.partname());
                    return Ok(partname.clone());
                }
            }
        }

        let ext = match image.partname().ext() {
            "" => "bin",
            ext => ext,
        };
        let partname = loop {
            let n = ids.next(IdSpace::Picture, MEDIA_DIR, || media_indices(target));
            let candidate = PackURI::new(format!("{}/image{}.{}", MEDIA_DIR, n, ext))
                .map_err(crate::ooxml::opc::error::OpcError::InvalidPackUri)?;
            if !target.contains_part(&candidate) {
                break candidate;
            }
        };

        target.add_part(image.duplicate(partname.clone()));
        scope.entry(digest).or_default().push(partname.clone());
        trace!("copied {} to {}", image.partname(), partname);
        Ok(partname)
    }
}

/// Digests of the images `owner` already references in the target.
fn existing_images(target: &OpcPackage, owner: &PackURI) -> HashMap<Digest256, Vec<PackURI>> {
    let mut known: HashMap<Digest256, Vec<PackURI>> = HashMap::new();
    let Some(part) = target.part(owner) else {
        return known;
    };
    for rel in part.rels().iter() {
        if rel.is_external() || rel.reltype() != rt::IMAGE {
            continue;
        }
        let Ok(partname) = rel.target_partname() else {
            continue;
        };
        if let Some(image) = target.part(&partname) {
            let digest = Sha256::digest(image.blob()).to_vec();
            let entry = known.entry(digest).or_default();
            if !entry.contains(&partname) {
                entry.push(partname);
            }
        }
    }
    known
}

/// Indices of the numbered parts already present in the media directory.
fn media_indices(target: &OpcPackage) -> Vec<u32> {
    target
        .iter_parts()
        .filter(|p| p.partname().base_uri() == MEDIA_DIR)
        .filter_map(|p| p.partname().idx())
        .collect()
}

impl MergeStep<'_> {
    /// Copy (or reuse) the source image `src_image` for a reference held by `owner`.
    pub(crate) fn copy_image(&mut self, src_image: &PackURI, owner: &PackURI) -> Result<PackURI> {
        let source = self.source;
        let image = source.get_part(src_image)?;
        let state = &mut *self.state;
        state.images.resolve(self.target, &mut state.ids, owner, image)
    }
}

/// Style, latent style and font table merging.
use super::error::Result;
use super::ids::{format_id, parse_id};
use super::options::StyleMergeMode;
use super::step::{MergeStep, merge_namespaces};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::xml::name::{ns, w, well_known_prefix};
use crate::ooxml::xml::{Element, Node, XName};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Elements whose `w:val` names a style.
const STYLE_REFERENCES: [XName; 8] = [
    w::pStyle,
    w::rStyle,
    w::tblStyle,
    w::basedOn,
    w::next,
    w::link,
    w::numStyleLink,
    w::styleLink,
];

/// Source styles that need to be added to the target, plus the renames that
/// content referring to source styles has to go through.
#[derive(Debug, Default)]
struct StylePlan {
    clones: Vec<Element>,
    renames: HashMap<String, String>,
}

impl MergeStep<'_> {
    /// Merge the source's styles part into the target's.
    ///
    /// Fills the step's style id map; content is remapped separately through
    /// [`MergeStep::remap_styles`].
    pub(crate) fn merge_styles(&mut self) -> Result<()> {
        let source = self.source;
        let Some(src_part) = self.source_related(rt::STYLES) else {
            return self.merge_fonts();
        };
        let src_doc = source.xml_part(&src_part)?;
        let dst_part = self.ensure_target_part(rt::STYLES, ct::WML_STYLES, "styles.xml", w::styles)?;

        let (plan, defaults_taken) = {
            let dst_root = self.target.xml_part(&dst_part)?.root();
            (
                plan_styles(src_doc.root(), dst_root, self.options.style_merge),
                default_style_types(dst_root),
            )
        };
        self.maps.styles.extend(plan.renames);

        {
            let dst = self.target.xml_part_mut(&dst_part)?;
            merge_doc_defaults(src_doc.root(), dst.root_mut());
            merge_latent_styles(src_doc.root(), dst.root_mut());
            merge_namespaces(src_doc, dst);
        }

        let mut added = Vec::with_capacity(plan.clones.len());
        for mut style in plan.clones {
            strip_foreign_markup(&mut style);
            self.remap_styles(&mut style);
            if let Some(kind) = style.attr(&w::type_)
                && defaults_taken.contains(kind)
            {
                style.remove_attr(&w::default);
            }
            self.apply_numbering(&mut style)?;
            added.push(style);
        }

        if !added.is_empty() {
            debug!("source {}: adding {} styles", self.index, added.len());
            let root = self.target.xml_part_mut(&dst_part)?.root_mut();
            for style in added {
                root.push(style);
            }
        }

        self.merge_fonts()
    }

    /// Rewrite style references in `tree` through the step's style id map.
    pub(crate) fn remap_styles(&self, tree: &mut Element) {
        let renames = &self.maps.styles;
        if renames.is_empty() {
            return;
        }
        tree.visit_mut(&mut |e: &mut Element| {
            if !e.is_any(&STYLE_REFERENCES) {
                return;
            }
            if let Some(new) = e.attr(&w::val).and_then(|v| renames.get(v)).cloned() {
                e.set_attr(w::val, new);
            }
        });
    }

    /// Add the source's fonts missing from the target font table.
    pub(crate) fn merge_fonts(&mut self) -> Result<()> {
        let source = self.source;
        let Some(src_part) = self.source_related(rt::FONT_TABLE) else {
            return Ok(());
        };
        let src_doc = source.xml_part(&src_part)?;
        let dst_part = self.ensure_target_part(rt::FONT_TABLE, ct::WML_FONT_TABLE, "fontTable.xml", w::fonts)?;

        let mut known: HashSet<String> = self
            .target
            .xml_part(&dst_part)?
            .root()
            .elements_named(&w::font)
            .filter_map(|f| f.attr(&w::name))
            .map(str::to_string)
            .collect();

        let mut added = Vec::new();
        for font in src_doc.root().elements_named(&w::font) {
            let Some(name) = font.attr(&w::name) else {
                continue;
            };
            if !known.insert(name.to_string()) {
                continue;
            }
            let mut font = font.clone();
            self.graft(&src_part, &dst_part, &mut font)?;
            added.push(font);
        }

        let dst = self.target.xml_part_mut(&dst_part)?;
        for font in added {
            dst.root_mut().push(font);
        }
        merge_namespaces(src_doc, dst);
        Ok(())
    }
}

/// Display name of a style, falling back to its id.
fn style_name(style: &Element) -> Option<&str> {
    style
        .child_attr(&w::name, &w::val)
        .or_else(|| style.attr(&w::styleId))
}

fn plan_styles(src: &Element, dst: &Element, mode: StyleMergeMode) -> StylePlan {
    let mut taken: HashSet<String> = dst
        .elements_named(&w::style)
        .filter_map(|s| s.attr(&w::styleId))
        .map(str::to_string)
        .collect();
    let mut by_name: HashMap<String, String> = dst
        .elements_named(&w::style)
        .filter_map(|s| Some((style_name(s)?.to_string(), s.attr(&w::styleId)?.to_string())))
        .collect();

    let mut plan = StylePlan::default();
    for style in src.elements_named(&w::style) {
        let Some(id) = style.attr(&w::styleId) else {
            continue;
        };

        let new_id = match mode {
            StyleMergeMode::ById => {
                if taken.contains(id) {
                    continue;
                }
                id.to_string()
            },
            StyleMergeMode::ByName => {
                let name = style_name(style).unwrap_or(id);
                if let Some(existing) = by_name.get(name) {
                    if existing != id {
                        plan.renames.insert(id.to_string(), existing.clone());
                    }
                    continue;
                }
                let new_id = if taken.contains(id) {
                    fresh_style_id(id, &taken)
                } else {
                    id.to_string()
                };
                if new_id != id {
                    plan.renames.insert(id.to_string(), new_id.clone());
                }
                by_name.insert(name.to_string(), new_id.clone());
                new_id
            },
        };

        taken.insert(new_id.clone());
        let mut clone = style.clone();
        clone.set_attr(w::styleId, new_id);
        plan.clones.push(clone);
    }
    plan
}

/// `base` with the smallest numeric suffix not already in use.
fn fresh_style_id(base: &str, taken: &HashSet<String>) -> String {
    let mut n: u32 = 1;
    loop {
        let candidate = format!("{}{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Style types for which the target already has a default style.
fn default_style_types(dst: &Element) -> HashSet<String> {
    dst.elements_named(&w::style)
        .filter(|s| matches!(s.attr(&w::default), Some("1" | "true" | "on")))
        .filter_map(|s| s.attr(&w::type_))
        .map(str::to_string)
        .collect()
}

fn merge_doc_defaults(src: &Element, dst: &mut Element) {
    if dst.child(&w::docDefaults).is_some() {
        return;
    }
    if let Some(defaults) = src.child(&w::docDefaults) {
        dst.insert(0, Node::Element(defaults.clone()));
    }
}

/// Union latent style exceptions by name; the target's settings win.
fn merge_latent_styles(src: &Element, dst: &mut Element) {
    let Some(src_latent) = src.child(&w::latentStyles) else {
        return;
    };

    let Some(latent) = dst.child_mut(&w::latentStyles) else {
        let pos = dst.position_of(&w::docDefaults).map(|p| p + 1).unwrap_or(0);
        dst.insert(pos, Node::Element(src_latent.clone()));
        return;
    };

    let known: HashSet<String> = latent
        .elements_named(&w::lsdException)
        .filter_map(|e| e.attr(&w::name))
        .map(str::to_string)
        .collect();
    for exception in src_latent.elements_named(&w::lsdException) {
        if exception.attr(&w::name).is_some_and(|n| !known.contains(n)) {
            latent.push(exception.clone());
        }
    }
    // w:count is the number of latent styles, never below the exception count
    let exceptions = latent.elements_named(&w::lsdException).count() as u32;
    let known_styles = latent.attr(&w::count).and_then(parse_id).unwrap_or(0);
    latent.set_attr(w::count, format_id(known_styles.max(exceptions)));
}

/// Whether markup in `namespace` is understood by Word itself.
fn is_native(namespace: &str) -> bool {
    namespace.is_empty() || namespace == ns::XML || (namespace != ns::PT && well_known_prefix(namespace).is_some())
}

/// Drop elements and attributes in namespaces Word does not know.
fn strip_foreign_markup(style: &mut Element) {
    style.remove_descendants(&mut |e: &Element| !is_native(e.name().namespace()));
    style.visit_mut(&mut |e: &mut Element| {
        e.attributes_mut().retain(|a| is_native(a.name.namespace()));
    });
}

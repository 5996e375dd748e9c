//! Draw order and batching keys.
//!
//! Every drawable surface gets an [`OrderInfo`]. Surfaces are drawn sorted by
//! `(z_index_class, element_type rank, sequence)`; surfaces whose
//! [`GroupKey`] is equal share one instanced GPU buffer.
//!
//! # z-index classes
//!
//! A surface starts in its parent's class and moves up one class when its
//! element type does not rank above the parent's (a panel inside a panel has
//! to draw over it). `zIndexOffset` shifts the class explicitly and opening a
//! clipping scope adds one more.

use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::layout::ClipRect;
use crate::properties::MergedProperties;
use crate::reactive::{Derived, derived};
use crate::types::{BlendMode, ElementType, Overflow};

/// Material class used when `materialClass` is not set.
pub const DEFAULT_MATERIAL: &str = "basic";

/// Everything besides order that decides whether two surfaces can share a buffer.
///
/// Compared structurally, so independently built dependencies with equal
/// values land in the same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupDependencies {
    pub material: Rc<str>,
    pub texture: Option<u64>,
    pub glyph_atlas: Option<u64>,
    pub blend_mode: BlendMode,
    pub(crate) clipping: Option<[u32; 4]>,
}

impl Default for GroupDependencies {
    fn default() -> Self {
        Self {
            material: Rc::from(DEFAULT_MATERIAL),
            texture: None,
            glyph_atlas: None,
            blend_mode: BlendMode::Normal,
            clipping: None,
        }
    }
}

impl GroupDependencies {
    /// Panel dependencies of an element (tracked reads of `materialClass` and `blendMode`).
    pub fn from_merged(m: &MergedProperties, clipping: Option<ClipRect>) -> Self {
        Self {
            material: m.string("materialClass").unwrap_or_else(|| Rc::from(DEFAULT_MATERIAL)),
            blend_mode: m.keyword("blendMode", BlendMode::parse),
            ..Self::default()
        }
        .with_clipping(clipping)
    }

    pub fn with_texture(mut self, texture: Option<u64>) -> Self {
        self.texture = texture;
        self
    }

    pub fn with_glyph_atlas(mut self, atlas: u64) -> Self {
        self.glyph_atlas = Some(atlas);
        self
    }

    pub fn with_clipping(mut self, clipping: Option<ClipRect>) -> Self {
        self.clipping = clipping.map(ClipRect::to_bits);
        self
    }

    pub fn clipping(&self) -> Option<ClipRect> {
        self.clipping.map(|bits| {
            let [x0, y0, x1, y1] = bits.map(f32::from_bits);
            ClipRect::new(glam::Vec2::new(x0, y0), glam::Vec2::new(x1, y1))
        })
    }
}

/// Equality class of surfaces that share one instanced buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub z_index_class: i32,
    pub element_type: ElementType,
    pub deps: GroupDependencies,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInfo {
    pub z_index_class: i32,
    pub element_type: ElementType,
    /// Creation sequence within the root. Breaks ties inside a class.
    pub sequence: u64,
    pub group_key: GroupKey,
}

impl OrderInfo {
    /// Order of the tree's base layer, below everything an element draws.
    pub fn base() -> Self {
        let element_type = ElementType::Panel;
        Self {
            z_index_class: 0,
            element_type,
            sequence: 0,
            group_key: GroupKey { z_index_class: 0, element_type, deps: GroupDependencies::default() },
        }
    }

    pub fn draw_key(&self) -> (i32, u8, u64) {
        (self.z_index_class, self.element_type.rank(), self.sequence)
    }

    pub fn cmp_draw_order(&self, other: &OrderInfo) -> Ordering {
        self.draw_key().cmp(&other.draw_key())
    }
}

/// Root-wide creation counter.
#[derive(Debug, Clone, Default)]
pub struct OrderSequence {
    next: Rc<Cell<u64>>,
}

impl OrderSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let sequence = self.next.get() + 1;
        self.next.set(sequence);
        sequence
    }
}

fn z_index_class(parent: Option<&OrderInfo>, element_type: ElementType, offset: i32, clips: bool) -> i32 {
    let mut class = match parent {
        Some(parent) => {
            let bump = element_type.rank() <= parent.element_type.rank();
            parent.z_index_class + i32::from(bump)
        }
        None => 0,
    };
    class += offset;
    if clips {
        class += 1;
    }
    class
}

/// Derived order of one surface.
///
/// `merged` is `None` for surfaces layered onto another surface of the same
/// element (selection over background, text over selection); they take no
/// `zIndexOffset` of their own.
pub fn computed_order_info(
    merged: Option<&Derived<MergedProperties>>,
    element_type: ElementType,
    group_deps: &Derived<GroupDependencies>,
    parent_order: Option<&Derived<OrderInfo>>,
    sequence: u64,
) -> Derived<OrderInfo> {
    let merged = merged.cloned();
    let group_deps = group_deps.clone();
    let parent_order = parent_order.cloned();
    derived(move || {
        let (offset, clips) = merged
            .as_ref()
            .map(|m| {
                m.with(|m| {
                    let offset = m.number("zIndexOffset").round() as i32;
                    (offset, m.keyword("overflow", Overflow::parse).clips())
                })
            })
            .unwrap_or((0, false));
        let class = match &parent_order {
            Some(parent) => parent.with(|p| z_index_class(Some(p), element_type, offset, clips)),
            None => z_index_class(None, element_type, offset, clips),
        };
        OrderInfo {
            z_index_class: class,
            element_type,
            sequence,
            group_key: GroupKey { z_index_class: class, element_type, deps: group_deps.get() },
        }
    })
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::properties::{MergeSources, Properties, merge_properties};
    use crate::reactive::{Signal, signal};

    fn merged(style: Properties) -> (Signal<Properties>, Derived<MergedProperties>) {
        let style = signal(style);
        let merged = merge_properties(
            MergeSources {
                properties: signal(Properties::new()),
                style: style.clone(),
                defaults: signal(Properties::new()),
                inherited: None,
            },
            Vec::new(),
            None,
        );
        (style, merged)
    }

    fn deps(clip: &Signal<Option<ClipRect>>) -> Derived<GroupDependencies> {
        let clip = clip.clone();
        derived(move || GroupDependencies::default().with_clipping(clip.get()))
    }

    #[test]
    fn test_same_type_descendant_moves_up_a_class() {
        let (_s, m) = merged(Properties::new());
        let clip = signal(None);
        let base = derived(OrderInfo::base);
        let parent = computed_order_info(Some(&m), ElementType::Panel, &deps(&clip), Some(&base), 1);
        let child_panel = computed_order_info(Some(&m), ElementType::Panel, &deps(&clip), Some(&parent), 2);
        let child_text = computed_order_info(None, ElementType::Text, &deps(&clip), Some(&parent), 3);

        assert_eq!(parent.get().z_index_class, 1);
        assert_eq!(child_panel.get().z_index_class, 2);
        assert_eq!(child_text.get().z_index_class, 1);
        assert_eq!(parent.get().cmp_draw_order(&child_text.get()), Ordering::Less);
    }

    #[test]
    fn test_offset_and_clipping_scope() {
        let (style, m) = merged(Properties::new().with("zIndexOffset", 3));
        let clip = signal(None);
        let order = computed_order_info(Some(&m), ElementType::Panel, &deps(&clip), None, 1);
        assert_eq!(order.get().z_index_class, 3);

        style.set(Properties::new().with("zIndexOffset", 3).with("overflow", "hidden"));
        assert_eq!(order.get().z_index_class, 4);
    }

    #[test]
    fn test_equal_dependencies_share_group_key() {
        let clip_a = signal(Some(ClipRect::new(Vec2::ZERO, Vec2::splat(10.0))));
        let clip_b = signal(Some(ClipRect::new(Vec2::ZERO, Vec2::splat(10.0))));
        let a = computed_order_info(None, ElementType::Panel, &deps(&clip_a), None, 1);
        let b = computed_order_info(None, ElementType::Panel, &deps(&clip_b), None, 2);
        assert_eq!(a.get().group_key, b.get().group_key);
        assert_ne!(a.get().sequence, b.get().sequence);

        clip_b.set(Some(ClipRect::new(Vec2::ZERO, Vec2::splat(20.0))));
        assert_ne!(a.get().group_key, b.get().group_key);
    }

    #[test]
    fn test_clipping_round_trips_through_bits() {
        let rect = ClipRect::new(Vec2::new(-1.5, 2.0), Vec2::new(3.25, 4.0));
        let deps = GroupDependencies::default().with_clipping(Some(rect));
        assert_eq!(deps.clipping(), Some(rect));
    }

    #[test]
    fn test_sequence_counter() {
        let seq = OrderSequence::new();
        let other = seq.clone();
        assert_eq!(seq.next(), 1);
        assert_eq!(other.next(), 2);
    }
}

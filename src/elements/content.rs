//! Content - embedder supplied 3D objects fitted into an element's box.
//!
//! The children's combined bounding box gives the default `aspectRatio`, so
//! the layout reserves a box of the right proportions. Once laid out, every
//! child is placed with `world × fit`, where the fit matrix scales the
//! bounds into the content box (inside border and padding) and aligns them
//! in depth according to `depthAlign`.
//!
//! Children are not layout nodes. Adding or removing one, or reporting new
//! bounds for it, re-measures the box.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ops::Deref;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3};

use super::element::{BodyContext, BodyOutput, Element, ElementBody};
use super::image::aspect_ratio_defaults;
use crate::layout::world_matrix;
use crate::lifecycle::{Subscription, initializer};
use crate::properties::{MergedProperties, Properties};
use crate::reactive::{Derived, Signal, SignalExt, derived, effect, signal};
use crate::scene::SceneObjectId;
use crate::types::{DepthAlign, ElementType, Inset};

/// Axis aligned bounds in the object's own units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min: min.min(max), max: min.max(max) }
    }

    /// Bounds of the given size centered on `center`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self { min: center - half, max: center + half }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn union(&self, other: &Self) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Width over height, when both are positive.
    pub fn aspect_ratio(&self) -> Option<f32> {
        let size = self.size();
        (size.x > 0.0 && size.y > 0.0).then(|| size.x / size.y)
    }
}

/// One embedder object inside a [`Content`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentChild {
    pub object: SceneObjectId,
    pub bounds: Bounds,
}

/// Combined bounds of all children, or `None` without children.
pub fn measure(children: &[ContentChild]) -> Option<Bounds> {
    children.iter().map(|child| child.bounds).reduce(|acc, bounds| acc.union(&bounds))
}

/// How the measured bounds are fitted into the element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub depth_align: DepthAlign,
    /// Uniform scale when set, otherwise x and y stretch independently.
    pub keep_aspect_ratio: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { depth_align: DepthAlign::Back, keep_aspect_ratio: true }
    }
}

impl FitOptions {
    pub fn from_merged(merged: &MergedProperties) -> Self {
        Self {
            depth_align: merged.keyword("depthAlign", DepthAlign::parse),
            keep_aspect_ratio: merged.bool("keepAspectRatio"),
        }
    }
}

/// Matrix from content units into the element's local space.
///
/// The element frame is centered on its box with y up. `inset` is the sum of
/// border and padding. Flat axes of the bounds keep a scale of one on that axis
/// rather than dividing by zero.
pub fn fit_matrix(size: Vec2, inset: Inset, bounds: &Bounds, options: FitOptions) -> Mat4 {
    let inner = Vec2::new((size.x - inset.horizontal()).max(0.0), (size.y - inset.vertical()).max(0.0));
    let extent = bounds.size();
    let ratio = |available: f32, length: f32| if length > 0.0 { Some(available / length) } else { None };
    let (sx, sy) = (ratio(inner.x, extent.x), ratio(inner.y, extent.y));

    let scale = if options.keep_aspect_ratio {
        let uniform = match (sx, sy) {
            (Some(x), Some(y)) => x.min(y),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => 1.0,
        };
        Vec3::splat(uniform)
    } else {
        let x = sx.unwrap_or(1.0);
        let y = sy.unwrap_or(1.0);
        Vec3::new(x, y, x.min(y))
    };

    let depth = extent.z * scale.z;
    let z = match options.depth_align {
        DepthAlign::Back => depth * 0.5,
        DepthAlign::Center => 0.0,
        DepthAlign::Front => -depth * 0.5,
    };
    let offset = Vec3::new((inset.left - inset.right) * 0.5, (inset.bottom - inset.top) * 0.5, z);

    Mat4::from_translation(offset) * Mat4::from_scale(scale) * Mat4::from_translation(-bounds.center())
}

fn combined_inset(border: Inset, padding: Inset) -> Inset {
    Inset::new(
        border.top + padding.top,
        border.right + padding.right,
        border.bottom + padding.bottom,
        border.left + padding.left,
    )
}

struct ContentBody {
    children: Signal<Vec<ContentChild>>,
}

impl ContentBody {
    fn bounds(&self) -> Derived<Option<Bounds>> {
        let children = self.children.clone();
        derived(move || children.with(|children| measure(children)))
    }
}

impl ElementBody for ContentBody {
    fn element_type(&self) -> ElementType {
        ElementType::Object
    }

    fn internal_defaults(&self) -> Option<Derived<Properties>> {
        let bounds = self.bounds();
        Some(aspect_ratio_defaults(derived(move || bounds.get().and_then(|b| b.aspect_ratio()))))
    }

    fn build(&self, cx: &BodyContext<'_>) -> BodyOutput {
        let fit = {
            let (bounds, merged) = (self.bounds(), cx.merged.clone());
            let state = cx.node.state().clone();
            derived(move || {
                let bounds = bounds.get()?;
                let inset = combined_inset(state.border_inset.get(), state.padding_inset.get());
                let options = merged.with(FitOptions::from_merged);
                Some(fit_matrix(state.size.get(), inset, &bounds, options))
            })
        };
        let world = {
            let (root_world, global) = (cx.root.root_world.clone(), cx.geometry.global_matrix.clone());
            let pixel_size = cx.root.config.pixel_size;
            derived(move || world_matrix(&root_world.get(), pixel_size, &global.get()))
        };

        let (children, scene) = (self.children.clone(), cx.root.scene.clone());
        let placement = initializer(move |subscriptions| {
            let placed: Rc<RefCell<BTreeSet<SceneObjectId>>> = Rc::default();
            {
                let (placed, scene) = (placed.clone(), scene.clone());
                subscriptions.push(
                    effect(move || {
                        let current: BTreeSet<SceneObjectId> =
                            children.with(|children| children.iter().map(|child| child.object).collect());
                        let mut placed = placed.borrow_mut();
                        for gone in placed.difference(&current) {
                            scene.remove_object(*gone);
                        }
                        if let Some(fit) = fit.get() {
                            let matrix = world.get() * fit;
                            for object in &current {
                                scene.set_world_matrix(*object, matrix);
                            }
                        }
                        *placed = current;
                    })
                    .into(),
                );
            }
            Some(Subscription::new(move || {
                for object in std::mem::take(&mut *placed.borrow_mut()) {
                    scene.remove_object(object);
                }
            }))
        });

        BodyOutput { initializers: vec![placement], ..BodyOutput::default() }
    }
}

#[derive(Clone, Debug)]
pub struct Content {
    element: Element,
    children: Signal<Vec<ContentChild>>,
}

impl Content {
    pub fn new() -> Self {
        let children = signal(Vec::new());
        let element = Element::with_body(ContentBody { children: children.clone() });
        Self { element, children }
    }

    /// Add an object, or replace the bounds of one already added.
    pub fn add(&self, object: SceneObjectId, bounds: Bounds) {
        self.children.update(|children| match children.iter_mut().find(|child| child.object == object) {
            Some(child) => child.bounds = bounds,
            None => children.push(ContentChild { object, bounds }),
        });
    }

    /// Remove an object. Returns whether it was a child.
    pub fn remove(&self, object: SceneObjectId) -> bool {
        let present = self.children.with_untracked(|children| children.iter().any(|child| child.object == object));
        if present {
            self.children.update(|children| children.retain(|child| child.object != object));
        }
        present
    }

    /// Report changed geometry of a child already added.
    pub fn remeasure(&self, object: SceneObjectId, bounds: Bounds) {
        if self.children.with_untracked(|children| children.iter().any(|child| child.object == object)) {
            self.add(object, bounds);
        } else {
            tracing::warn!(object = object.0, "remeasure of an object that is not a content child");
        }
    }

    pub fn children(&self) -> Vec<ContentChild> {
        self.children.peek()
    }

    /// Current combined bounds of the children.
    pub fn bounds(&self) -> Option<Bounds> {
        self.children.with_untracked(|children| measure(children))
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Content {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

//! Image - a panel with a textured quad on top.
//!
//! The texture's pixel size gives the default `aspectRatio`, so an image
//! with only a width set keeps its proportions. `objectFit` is not applied
//! beyond that.

use std::ops::Deref;
use std::rc::Rc;

use glam::Vec2;

use super::element::{BodyContext, BodyOutput, Element, ElementBody};
use crate::lifecycle::{Initializer, Subscription, initializer};
use crate::order::{GroupDependencies, computed_order_info};
use crate::properties::Properties;
use crate::reactive::{Derived, Signal, SignalExt, derived, signal};
use crate::render::{InstanceData, InstanceList, border_radius};
use crate::types::{Color, ElementType};

/// A loaded texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSource {
    pub texture: u64,
    pub width: u32,
    pub height: u32,
}

impl ImageSource {
    pub fn new(texture: u64, width: u32, height: u32) -> Self {
        Self { texture, width, height }
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.width > 0 && self.height > 0).then(|| self.width as f32 / self.height as f32)
    }
}

/// What a textured surface draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TexturedQuad {
    pub texture: u64,
    pub uv_rect: [f32; 4],
    /// Property the tint is read from; images are untinted.
    pub tint_key: Option<&'static str>,
}

/// Bind a textured quad covering the element to its own render group.
pub(crate) fn textured_surface(
    cx: &BodyContext<'_>,
    element_type: ElementType,
    material: &'static str,
    quad: Derived<Option<TexturedQuad>>,
) -> Initializer {
    let deps = {
        let (quad, clipping) = (quad.clone(), cx.geometry.clipping_rect.clone());
        derived(move || {
            GroupDependencies { material: Rc::from(material), ..GroupDependencies::default() }
                .with_texture(quad.get().map(|q| q.texture))
                .with_clipping(clipping.get())
        })
    };
    let order = computed_order_info(None, element_type, &deps, Some(cx.order), cx.root.sequence.next());

    let (merged, geometry) = (cx.merged.clone(), cx.geometry.clone());
    let (manager, visible, errors) = (cx.root.instances.clone(), cx.visible.clone(), cx.root.errors.clone());
    initializer(move |_| {
        let instances = derived(move || {
            let Some(quad) = quad.get() else {
                return Vec::new();
            };
            let (color, radius) = merged.with(|m| {
                let opacity = m.number_opt("opacity").unwrap_or(1.0);
                let tint = quad.tint_key.and_then(|key| m.color(key)).unwrap_or(Color::WHITE);
                (tint.with_opacity(opacity), border_radius(m))
            });
            let size: Vec2 = geometry.size.get();
            vec![
                InstanceData::quad(&geometry.global_matrix.get(), size)
                    .with_color(color)
                    .with_radius(radius)
                    .with_uv_rect(quad.uv_rect)
                    .with_clipping(geometry.clipping_rect.get()),
            ]
        });
        let list = InstanceList::new(&manager, &order, &visible, instances, &errors);
        Some(Subscription::from(list))
    })
}

/// `aspectRatio` default derived from an optional intrinsic ratio.
pub(crate) fn aspect_ratio_defaults(ratio: Derived<Option<f32>>) -> Derived<Properties> {
    derived(move || match ratio.get() {
        Some(ratio) => Properties::new().with("aspectRatio", ratio),
        None => Properties::new(),
    })
}

struct ImageBody {
    source: Signal<Option<ImageSource>>,
}

impl ElementBody for ImageBody {
    fn internal_defaults(&self) -> Option<Derived<Properties>> {
        let source = self.source.clone();
        Some(aspect_ratio_defaults(derived(move || source.get().and_then(|s| s.aspect_ratio()))))
    }

    fn build(&self, cx: &BodyContext<'_>) -> BodyOutput {
        let quad = {
            let source = self.source.clone();
            derived(move || {
                source.get().map(|source| TexturedQuad {
                    texture: source.texture,
                    uv_rect: [0.0, 0.0, 1.0, 1.0],
                    tint_key: None,
                })
            })
        };
        BodyOutput {
            initializers: vec![textured_surface(cx, ElementType::Image, "image", quad)],
            ..BodyOutput::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct Image {
    element: Element,
    source: Signal<Option<ImageSource>>,
}

impl Image {
    pub fn new(source: Option<ImageSource>) -> Self {
        let source = signal(source);
        let element = Element::with_body(ImageBody { source: source.clone() });
        Self { element, source }
    }

    pub fn set_source(&self, source: Option<ImageSource>) {
        self.source.set(source);
    }

    pub fn source(&self) -> Option<ImageSource> {
        self.source.peek()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Deref for Image {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

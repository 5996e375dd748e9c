//! Icon - one region of an icon atlas, tinted by `color`.

use std::ops::Deref;

use super::element::{BodyContext, BodyOutput, Element, ElementBody};
use super::image::{TexturedQuad, aspect_ratio_defaults, textured_surface};
use crate::properties::Properties;
use crate::reactive::{Derived, Signal, SignalExt, derived, signal};
use crate::types::ElementType;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconSource {
    pub atlas: u64,
    /// `[u0, v0, u1, v1]` in the atlas.
    pub uv_rect: [f32; 4],
    /// Intrinsic size, in layout units.
    pub width: f32,
    pub height: f32,
}

impl IconSource {
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.width > 0.0 && self.height > 0.0).then(|| self.width / self.height)
    }
}

struct IconBody {
    source: Signal<IconSource>,
}

impl ElementBody for IconBody {
    fn internal_defaults(&self) -> Option<Derived<Properties>> {
        let source = self.source.clone();
        Some(aspect_ratio_defaults(derived(move || source.get().aspect_ratio())))
    }

    fn build(&self, cx: &BodyContext<'_>) -> BodyOutput {
        let quad = {
            let source = self.source.clone();
            derived(move || {
                let source = source.get();
                Some(TexturedQuad { texture: source.atlas, uv_rect: source.uv_rect, tint_key: Some("color") })
            })
        };
        BodyOutput {
            initializers: vec![textured_surface(cx, ElementType::Image, "icon", quad)],
            ..BodyOutput::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct Icon {
    element: Element,
    source: Signal<IconSource>,
}

impl Icon {
    pub fn new(source: IconSource) -> Self {
        let source = signal(source);
        let element = Element::with_body(IconBody { source: source.clone() });
        Self { element, source }
    }

    pub fn set_source(&self, source: IconSource) {
        self.source.set(source);
    }

    pub fn source(&self) -> IconSource {
        self.source.peek()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Deref for Icon {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

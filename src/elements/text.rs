//! Text - a panel whose content box is measured from its glyphs.

use std::ops::Deref;

use super::element::{BodyContext, BodyOutput, Element, ElementBody, TextInternals};
use crate::order::computed_order_info;
use crate::reactive::{Signal, SignalExt, derived, signal};
use crate::text::{TextSurface, computed_font, create_instanced_text, glyph_group_dependencies};
use crate::types::ElementType;

struct TextBody {
    text: Signal<String>,
}

impl ElementBody for TextBody {
    fn build(&self, cx: &BodyContext<'_>) -> BodyOutput {
        let font = computed_font(cx.merged);
        let deps = glyph_group_dependencies(&font, &cx.root.shaper, &cx.geometry.clipping_rect);
        let order = computed_order_info(None, ElementType::Text, &deps, Some(cx.order), cx.root.sequence.next());

        let text = {
            let text = self.text.clone();
            derived(move || text.get())
        };
        let instanced = create_instanced_text(TextSurface {
            merged: cx.merged,
            text,
            font: &font,
            node: cx.node,
            geometry: cx.geometry,
            visible: cx.visible,
            order: &order,
            shaper: cx.root.shaper.clone(),
            manager: &cx.root.instances,
            errors: &cx.root.errors,
            word_break: None,
        });

        BodyOutput {
            initializers: instanced.initializers,
            handlers: None,
            text: Some(TextInternals {
                layout: instanced.layout,
                text_box: instanced.text_box,
                order_info: order,
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Text {
    element: Element,
    text: Signal<String>,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        let text = signal(text.into());
        let element = Element::with_body(TextBody { text: text.clone() });
        Self { element, text }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.text.set(text.into());
    }

    pub fn text(&self) -> String {
        self.text.peek()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Deref for Text {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

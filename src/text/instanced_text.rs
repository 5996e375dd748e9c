//! Instanced text - the glyph surface of a text or input element.
//!
//! The element registers a [`TextMeasure`] as its node's custom layout, so
//! the parent's layout pass sizes it from the text. After the pass the final
//! [`GlyphLayout`] is rebuilt for the content width the node received and
//! every non-whitespace glyph is bound to a slot of the text group.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3};

use super::glyph_layout::{GlyphLayout, GlyphLayoutOptions};
use super::selection::TextBox;
use super::shaper::{TextShaper, font_from_merged};
use crate::config::FontSpec;
use crate::error::ErrorSink;
use crate::layout::{ClipRect, CustomLayouting, FlexNode, MeasureSpace};
use crate::lifecycle::{Initializer, Subscription, initializer};
use crate::order::{GroupDependencies, OrderInfo};
use crate::properties::MergedProperties;
use crate::reactive::{Derived, derived, effect};
use crate::render::{InstanceData, InstanceList, InstanceManager, SurfaceGeometry};
use crate::types::{Color, TextAlign, WordBreak};

/// Derived font of an element.
pub fn computed_font(merged: &Derived<MergedProperties>) -> Derived<FontSpec> {
    let merged = merged.clone();
    derived(move || merged.with(font_from_merged))
}

/// Group dependencies of a glyph surface: the panel dependencies plus the atlas.
pub fn glyph_group_dependencies(
    font: &Derived<FontSpec>,
    shaper: &Rc<dyn TextShaper>,
    clipping: &Derived<Option<ClipRect>>,
) -> Derived<GroupDependencies> {
    let (font, shaper, clipping) = (font.clone(), shaper.clone(), clipping.clone());
    derived(move || {
        let atlas = font.with(|font| shaper.atlas_id(font));
        GroupDependencies { material: Rc::from("glyph"), ..GroupDependencies::default() }
            .with_glyph_atlas(atlas)
            .with_clipping(clipping.get())
    })
}

/// Text and options snapshot read by the layout engine.
pub struct TextMeasure {
    shaper: Rc<dyn TextShaper>,
    content: RefCell<(String, GlyphLayoutOptions)>,
}

impl TextMeasure {
    fn new(shaper: Rc<dyn TextShaper>, text: String, options: GlyphLayoutOptions) -> Self {
        Self { shaper, content: RefCell::new((text, options)) }
    }

    /// Replace the snapshot. Returns false when nothing changed.
    fn update(&self, text: String, options: GlyphLayoutOptions) -> bool {
        let mut content = self.content.borrow_mut();
        if content.0 == text && content.1 == options {
            return false;
        }
        *content = (text, options);
        true
    }
}

impl CustomLayouting for TextMeasure {
    fn measure(&self, known: (Option<f32>, Option<f32>), available: (MeasureSpace, MeasureSpace)) -> Vec2 {
        let (text, options) = &*self.content.borrow();
        let max_width = known.0.or(match available.0 {
            MeasureSpace::Definite(width) => Some(width),
            MeasureSpace::MinContent => Some(0.0),
            MeasureSpace::MaxContent => None,
        });
        let options = GlyphLayoutOptions { max_width, ..options.clone() };
        let layout = GlyphLayout::build(text, &options, self.shaper.as_ref());
        Vec2::new(known.0.unwrap_or(layout.width), known.1.unwrap_or(layout.height()))
    }
}

/// Inputs of [`create_instanced_text`].
pub struct TextSurface<'a> {
    pub merged: &'a Derived<MergedProperties>,
    pub text: Derived<String>,
    pub font: &'a Derived<FontSpec>,
    pub node: &'a FlexNode,
    pub geometry: &'a SurfaceGeometry,
    pub visible: &'a Derived<bool>,
    pub order: &'a Derived<OrderInfo>,
    pub shaper: Rc<dyn TextShaper>,
    pub manager: &'a Rc<InstanceManager>,
    pub errors: &'a ErrorSink,
    /// Forces a break strategy (inputs pick it from `multiline`).
    pub word_break: Option<WordBreak>,
}

pub struct InstancedText {
    pub layout: Derived<GlyphLayout>,
    pub text_box: Derived<TextBox>,
    pub measure: Rc<TextMeasure>,
    pub initializers: Vec<Initializer>,
}

fn glyph_instances(
    layout: &GlyphLayout,
    matrix: &Mat4,
    text_box: &TextBox,
    color: Color,
    clipping: Option<ClipRect>,
) -> Vec<InstanceData> {
    layout
        .visible_glyphs()
        .map(|(line, glyph)| {
            let y = line as f32 * layout.line_height;
            let center = text_box.to_local(glyph.x + glyph.width * 0.5, y + layout.line_height * 0.5);
            let placed = *matrix * Mat4::from_translation(Vec3::new(center.x, center.y, 0.0));
            InstanceData::quad(&placed, Vec2::new(glyph.width, layout.line_height))
                .with_color(color)
                .with_uv_rect(glyph.uv_rect)
                .with_clipping(clipping)
        })
        .collect()
}

pub fn create_instanced_text(surface: TextSurface<'_>) -> InstancedText {
    let TextSurface { merged, text, font, node, geometry, visible, order, shaper, manager, errors, word_break } =
        surface;

    let options = {
        let (merged, font) = (merged.clone(), font.clone());
        derived(move || {
            let (word_break, text_align) = merged.with(|m| {
                (
                    word_break.unwrap_or_else(|| m.keyword("wordBreak", WordBreak::parse)),
                    m.keyword("textAlign", TextAlign::parse),
                )
            });
            GlyphLayoutOptions { font: font.get(), max_width: None, word_break, text_align }
        })
    };

    let measure = Rc::new(TextMeasure::new(shaper.clone(), text.peek(), options.peek()));

    let text_box = {
        let state = node.state().clone();
        derived(move || TextBox {
            size: state.size.get(),
            border: state.border_inset.get(),
            padding: state.padding_inset.get(),
        })
    };

    let layout = {
        let (text, options, text_box, shaper) = (text.clone(), options.clone(), text_box.clone(), shaper.clone());
        derived(move || {
            let content_width = text_box.with(|b| (b.size.x - b.border.horizontal() - b.padding.horizontal()).max(0.0));
            let options = GlyphLayoutOptions { max_width: Some(content_width), ..options.get() };
            text.with(|text| GlyphLayout::build(text, &options, shaper.as_ref()))
        })
    };

    let mut initializers = Vec::new();

    {
        let (node, measure) = (node.clone(), measure.clone());
        initializers.push(initializer(move |_| {
            if let Err(err) = node.set_custom_layout(Some(measure.clone())) {
                tracing::warn!(%err, "text node vanished before its measure was registered");
            }
            let on_change = effect(move || {
                let changed = measure.update(text.get(), options.get());
                if changed {
                    node.mark_content_dirty();
                }
            });
            Some(on_change.into())
        }));
    }

    {
        let (manager, order, visible, errors) = (manager.clone(), order.clone(), visible.clone(), errors.clone());
        let (merged, layout, text_box, geometry) = (merged.clone(), layout.clone(), text_box.clone(), geometry.clone());
        initializers.push(initializer(move |_| {
            let instances = derived(move || {
                let color = merged.with(|m| {
                    let opacity = m.number_opt("opacity").unwrap_or(1.0);
                    m.color("color").unwrap_or(Color::WHITE).with_opacity(opacity)
                });
                let matrix = geometry.global_matrix.get();
                let clipping = geometry.clipping_rect.get();
                let text_box = text_box.get();
                layout.with(|layout| glyph_instances(layout, &matrix, &text_box, color, clipping))
            });
            let list = InstanceList::new(&manager, &order, &visible, instances, &errors);
            Some(Subscription::from(list))
        }));
    }

    InstancedText { layout, text_box, measure, initializers }
}

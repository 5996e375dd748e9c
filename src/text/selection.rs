//! Selection, caret and drag selection.

use std::cell::Cell;

use glam::{Mat4, Vec2, Vec3};

use super::glyph_layout::GlyphLayout;
use crate::layout::ClipRect;
use crate::render::InstanceData;
use crate::types::{Color, Inset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionDirection {
    Forward,
    Backward,
    #[default]
    None,
}

/// Selected char range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    pub direction: SelectionDirection,
}

impl Selection {
    pub fn caret(index: usize) -> Self {
        Self { start: index, end: index, direction: SelectionDirection::None }
    }

    /// Range between an anchor and the current boundary, either order.
    pub fn between(anchor: usize, current: usize) -> Self {
        let direction = if anchor < current {
            SelectionDirection::Forward
        } else {
            SelectionDirection::Backward
        };
        Self { start: anchor.min(current), end: anchor.max(current), direction }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Box geometry of a text element, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBox {
    pub size: Vec2,
    pub border: Inset,
    pub padding: Inset,
}

impl TextBox {
    /// Top-left of the content box in element-local coordinates (center origin, y up).
    pub fn content_origin(&self) -> Vec2 {
        Vec2::new(
            -self.size.x * 0.5 + self.border.left + self.padding.left,
            self.size.y * 0.5 - self.border.top - self.padding.top,
        )
    }

    /// Element-local point of a content-box point (x right, y down).
    pub fn to_local(&self, x: f32, y: f32) -> Vec2 {
        self.content_origin() + Vec2::new(x, -y)
    }
}

/// Char boundary under a surface UV (origin bottom-left).
pub fn uv_to_char_index(text_box: &TextBox, uv: Vec2, layout: &GlyphLayout) -> usize {
    let x = uv.x * text_box.size.x - text_box.border.left - text_box.padding.left;
    let y = (1.0 - uv.y) * text_box.size.y - text_box.border.top - text_box.padding.top;
    layout.get_char_index(x, y)
}

fn rect_instance(
    matrix: &Mat4,
    text_box: &TextBox,
    rect: [f32; 4],
    color: Color,
    clipping: Option<ClipRect>,
) -> InstanceData {
    let [x, y, w, h] = rect;
    let center = text_box.to_local(x + w * 0.5, y + h * 0.5);
    let placed = *matrix * Mat4::from_translation(Vec3::new(center.x, center.y, 0.0));
    InstanceData::quad(&placed, Vec2::new(w, h)).with_color(color).with_clipping(clipping)
}

/// Caret instance; only a collapsed selection has one.
pub fn caret_instance(
    selection: Option<Selection>,
    layout: &GlyphLayout,
    matrix: &Mat4,
    text_box: &TextBox,
    caret_width: f32,
    color: Color,
    clipping: Option<ClipRect>,
) -> Option<InstanceData> {
    let selection = selection.filter(Selection::is_collapsed)?;
    let (x, y) = layout.char_position(selection.start);
    let rect = [x - caret_width * 0.5, y, caret_width, layout.line_height];
    Some(rect_instance(matrix, text_box, rect, color, clipping))
}

/// One instance per selected line.
pub fn selection_instances(
    selection: Option<Selection>,
    layout: &GlyphLayout,
    matrix: &Mat4,
    text_box: &TextBox,
    color: Color,
    clipping: Option<ClipRect>,
) -> Vec<InstanceData> {
    let Some(selection) = selection else {
        return Vec::new();
    };
    layout
        .selection_boxes(selection.start, selection.end)
        .into_iter()
        .map(|rect| rect_instance(matrix, text_box, rect, color, clipping))
        .collect()
}

/// Pointer drag state: anchored on pointer down, cleared on up or leave.
#[derive(Debug, Default)]
pub struct DragSelection {
    anchor: Cell<Option<usize>>,
}

impl DragSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, index: usize) -> Selection {
        self.anchor.set(Some(index));
        Selection::caret(index)
    }

    /// Selection for the current boundary while dragging.
    pub fn update(&self, index: usize) -> Option<Selection> {
        self.anchor.get().map(|anchor| Selection::between(anchor, index))
    }

    pub fn end(&self) {
        self.anchor.set(None);
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.get().is_some()
    }
}

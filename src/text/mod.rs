//! # Text
//!
//! Glyph layout, selection geometry and the instanced glyph surface.
//!
//! Measurement goes through a [`TextShaper`]. The crate ships a
//! [`MonospaceShaper`] that needs no font files; atlas-backed shapers plug
//! in through the same trait.

mod glyph_layout;
mod instanced_text;
mod selection;
mod shaper;

pub use glyph_layout::{GlyphLayout, GlyphLayoutOptions, GlyphLine, PositionedGlyph};
pub use instanced_text::{
    InstancedText, TextMeasure, TextSurface, computed_font, create_instanced_text, glyph_group_dependencies,
};
pub use selection::{
    DragSelection, Selection, SelectionDirection, TextBox, caret_instance, selection_instances, uv_to_char_index,
};
pub use shaper::{MONOSPACE_ADVANCE, MonospaceShaper, TextShaper, font_from_merged};

//! Text measurement contract and the monospace shaper.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use unicode_width::UnicodeWidthStr;

use crate::config::FontSpec;
use crate::properties::MergedProperties;

/// Glyph metrics source.
pub trait TextShaper {
    /// Advance of one grapheme cluster, without letter spacing.
    fn advance(&self, grapheme: &str, font: &FontSpec) -> f32;

    /// Identity of the glyph atlas `font` is rendered from.
    fn atlas_id(&self, font: &FontSpec) -> u64;

    /// Region of `grapheme` in its atlas, `[u0, v0, u1, v1]`.
    fn glyph_uv(&self, _grapheme: &str, _font: &FontSpec) -> [f32; 4] {
        [0.0, 0.0, 1.0, 1.0]
    }
}

/// Fixed-pitch metrics: `display width * font size * 0.6`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceShaper;

pub const MONOSPACE_ADVANCE: f32 = 0.6;

impl TextShaper for MonospaceShaper {
    fn advance(&self, grapheme: &str, font: &FontSpec) -> f32 {
        UnicodeWidthStr::width(grapheme) as f32 * font.size * MONOSPACE_ADVANCE
    }

    fn atlas_id(&self, font: &FontSpec) -> u64 {
        let mut hasher = DefaultHasher::new();
        font.family.hash(&mut hasher);
        font.weight.hash(&mut hasher);
        hasher.finish()
    }
}

/// Font of an element from its resolved table (tracked).
pub fn font_from_merged(m: &MergedProperties) -> FontSpec {
    let defaults = FontSpec::default();
    FontSpec {
        family: m.string("fontFamily").map(|s| s.to_string()).unwrap_or(defaults.family),
        size: m.number_opt("fontSize").unwrap_or(defaults.size),
        line_height: m.number_opt("lineHeight").unwrap_or(defaults.line_height),
        weight: font_weight(m),
        letter_spacing: m.number("letterSpacing"),
    }
}

fn font_weight(m: &MergedProperties) -> u16 {
    let value = m.value("fontWeight");
    if let Some(keyword) = value.as_str() {
        match keyword {
            "thin" => return 100,
            "light" => return 300,
            "normal" | "regular" => return 400,
            "medium" => return 500,
            "semi-bold" => return 600,
            "bold" => return 700,
            "extra-bold" => return 800,
            _ => {}
        }
    }
    m.number_opt("fontWeight").map(|w| w.clamp(1.0, 1000.0) as u16).unwrap_or(400)
}

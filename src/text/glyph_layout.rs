//! Glyph layout - line breaking and glyph placement.
//!
//! Coordinates are local to the text content box: x to the right and y down
//! from the top-left corner (after border and padding). Character indices
//! count Unicode scalar values, the unit selections use.

use unicode_segmentation::UnicodeSegmentation;

use super::shaper::TextShaper;
use crate::config::FontSpec;
use crate::types::{TextAlign, WordBreak};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    /// Index of the first char of the grapheme.
    pub char_index: usize,
    pub char_len: usize,
    pub x: f32,
    pub width: f32,
    pub uv_rect: [f32; 4],
    pub whitespace: bool,
}

impl PositionedGlyph {
    pub fn end_x(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphLine {
    /// Char range `[start, end)` covered by the line, hanging whitespace included.
    pub start: usize,
    pub end: usize,
    /// Alignment offset of the line start.
    pub x: f32,
    /// Width without hanging whitespace.
    pub width: f32,
    pub glyphs: Vec<PositionedGlyph>,
}

impl GlyphLine {
    fn new(start: usize) -> Self {
        Self { start, end: start, x: 0.0, width: 0.0, glyphs: Vec::new() }
    }

    fn has_content(&self) -> bool {
        self.glyphs.iter().any(|g| !g.whitespace)
    }

    /// Pen position after the last glyph, hanging whitespace included.
    fn pen(&self) -> f32 {
        self.glyphs.last().map(PositionedGlyph::end_x).unwrap_or(0.0)
    }

    fn push(&mut self, glyph: PositionedGlyph) {
        self.end = glyph.char_index + glyph.char_len;
        if !glyph.whitespace {
            self.width = glyph.end_x();
        }
        self.glyphs.push(glyph);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphLayout {
    pub lines: Vec<GlyphLine>,
    pub line_height: f32,
    pub font_size: f32,
    /// Widest line.
    pub width: f32,
    pub char_count: usize,
}

/// Inputs of one layout run.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphLayoutOptions {
    pub font: FontSpec,
    pub max_width: Option<f32>,
    pub word_break: WordBreak,
    pub text_align: TextAlign,
}

struct Segment {
    glyphs: Vec<PositionedGlyph>,
    width: f32,
    whitespace: bool,
}

fn shape_segment(text: &str, first_char: usize, shaper: &dyn TextShaper, font: &FontSpec) -> Segment {
    let mut glyphs = Vec::new();
    let mut char_index = first_char;
    let mut width = 0.0;
    let mut whitespace = true;
    for grapheme in text.graphemes(true) {
        let char_len = grapheme.chars().count();
        let is_space = grapheme.chars().all(char::is_whitespace);
        whitespace &= is_space;
        let advance = shaper.advance(grapheme, font) + font.letter_spacing;
        glyphs.push(PositionedGlyph {
            char_index,
            char_len,
            x: 0.0,
            width: advance,
            uv_rect: shaper.glyph_uv(grapheme, font),
            whitespace: is_space,
        });
        width += advance;
        char_index += char_len;
    }
    Segment { glyphs, width, whitespace }
}

const FIT_TOLERANCE: f32 = 1e-3;

struct LineBreaker {
    lines: Vec<GlyphLine>,
    current: GlyphLine,
    max_width: f32,
}

impl LineBreaker {
    fn place(&mut self, mut glyph: PositionedGlyph) {
        glyph.x = self.current.pen();
        self.current.push(glyph);
    }

    fn break_before(&mut self, char_index: usize) {
        let line = std::mem::replace(&mut self.current, GlyphLine::new(char_index));
        self.lines.push(line);
    }

    fn fits(&self, width: f32) -> bool {
        self.current.pen() + width <= self.max_width + FIT_TOLERANCE
    }

    /// Place graphemes one by one, breaking whenever the next one overflows.
    fn place_breaking(&mut self, glyphs: Vec<PositionedGlyph>) {
        for glyph in glyphs {
            if self.current.has_content() && !glyph.whitespace && !self.fits(glyph.width) {
                self.break_before(glyph.char_index);
            }
            self.place(glyph);
        }
    }
}

impl GlyphLayout {
    pub fn build(text: &str, options: &GlyphLayoutOptions, shaper: &dyn TextShaper) -> Self {
        let font = &options.font;
        let mut breaker = LineBreaker {
            lines: Vec::new(),
            current: GlyphLine::new(0),
            max_width: options.max_width.unwrap_or(f32::INFINITY),
        };

        let mut char_offset = 0;
        for (i, paragraph) in text.split('\n').enumerate() {
            if i > 0 {
                // the newline belongs to no line
                char_offset += 1;
                breaker.break_before(char_offset);
            }
            for (byte_index, segment) in paragraph.split_word_bound_indices() {
                let first_char = char_offset + paragraph[..byte_index].chars().count();
                let segment = shape_segment(segment, first_char, shaper, font);
                match options.word_break {
                    WordBreak::BreakAll => breaker.place_breaking(segment.glyphs),
                    _ if segment.whitespace => segment.glyphs.into_iter().for_each(|g| breaker.place(g)),
                    word_break => {
                        if breaker.current.has_content() && !breaker.fits(segment.width) {
                            breaker.break_before(first_char);
                        }
                        if word_break == WordBreak::BreakWord && !breaker.fits(segment.width) {
                            breaker.place_breaking(segment.glyphs);
                        } else {
                            segment.glyphs.into_iter().for_each(|g| breaker.place(g));
                        }
                    }
                }
            }
            char_offset += paragraph.chars().count();
        }
        let LineBreaker { mut lines, current, .. } = breaker;
        lines.push(current);

        let width = lines.iter().map(|line| line.width).fold(0.0, f32::max);
        let align_width = options.max_width.filter(|w| w.is_finite()).unwrap_or(width);
        for line in &mut lines {
            line.x = match options.text_align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (align_width - line.width) * 0.5,
                TextAlign::Right => align_width - line.width,
            };
            for glyph in &mut line.glyphs {
                glyph.x += line.x;
            }
        }

        Self {
            lines,
            line_height: font.size * font.line_height,
            font_size: font.size,
            width,
            char_count: char_offset,
        }
    }

    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    fn line_at(&self, y: f32) -> Option<(usize, &GlyphLine)> {
        if self.lines.is_empty() {
            return None;
        }
        let index = if self.line_height > 0.0 { (y / self.line_height).floor() } else { 0.0 };
        let index = index.clamp(0.0, (self.lines.len() - 1) as f32) as usize;
        Some((index, &self.lines[index]))
    }

    /// Nearest character boundary to a point of the content box.
    ///
    /// Past the end of a wrapped line this is the last boundary still on that
    /// line, before any hanging whitespace, so the caret stays on the line the
    /// point is on.
    pub fn get_char_index(&self, x: f32, y: f32) -> usize {
        let Some((line_index, line)) = self.line_at(y) else {
            return 0;
        };
        for glyph in &line.glyphs {
            if x < glyph.x + glyph.width * 0.5 {
                return glyph.char_index;
            }
        }
        match self.lines.get(line_index + 1) {
            // `line.end` is the first boundary of the next line
            Some(next) if next.start == line.end => line.glyphs.last().map_or(line.end, |g| g.char_index),
            _ => line.end,
        }
    }

    fn line_of(&self, index: usize) -> Option<(usize, &GlyphLine)> {
        let index = index.min(self.char_count);
        self.lines
            .iter()
            .enumerate()
            .find(|(_, line)| index >= line.start && index < line.end)
            .or_else(|| self.lines.iter().enumerate().rev().find(|(_, line)| index >= line.start))
    }

    /// Top-left of the boundary before `index`: x of the boundary, y of the line top.
    pub fn char_position(&self, index: usize) -> (f32, f32) {
        let Some((line_index, line)) = self.line_of(index) else {
            return (0.0, 0.0);
        };
        (glyph_x(line, index), line_index as f32 * self.line_height)
    }

    /// Per-line rectangles `(x, y, width, height)` covering `[start, end)`.
    pub fn selection_boxes(&self, start: usize, end: usize) -> Vec<[f32; 4]> {
        if start >= end {
            return Vec::new();
        }
        let mut boxes = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            let from = start.max(line.start);
            let to = end.min(line.end);
            if from >= to {
                continue;
            }
            let x0 = glyph_x(line, from);
            let x1 = glyph_x(line, to);
            if x1 > x0 {
                boxes.push([x0, i as f32 * self.line_height, x1 - x0, self.line_height]);
            }
        }
        boxes
    }

    /// Glyphs that produce an instance (non-whitespace), with their line index.
    pub fn visible_glyphs(&self) -> impl Iterator<Item = (usize, &PositionedGlyph)> {
        self.lines
            .iter()
            .enumerate()
            .flat_map(|(i, line)| line.glyphs.iter().map(move |g| (i, g)))
            .filter(|(_, g)| !g.whitespace)
    }
}

fn glyph_x(line: &GlyphLine, index: usize) -> f32 {
    line.glyphs
        .iter()
        .find(|g| g.char_index >= index)
        .map(|g| g.x)
        .unwrap_or_else(|| line.glyphs.last().map(PositionedGlyph::end_x).unwrap_or(line.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::MonospaceShaper;

    // 10 units per ascii char
    fn options(max_width: Option<f32>, word_break: WordBreak) -> GlyphLayoutOptions {
        GlyphLayoutOptions {
            font: FontSpec { size: 10.0 / 0.6, line_height: 1.2, ..FontSpec::default() },
            max_width,
            word_break,
            text_align: TextAlign::Left,
        }
    }

    fn build(text: &str, max_width: Option<f32>, word_break: WordBreak) -> GlyphLayout {
        GlyphLayout::build(text, &options(max_width, word_break), &MonospaceShaper)
    }

    fn line_ranges(layout: &GlyphLayout) -> Vec<(usize, usize)> {
        layout.lines.iter().map(|l| (l.start, l.end)).collect()
    }

    #[test]
    fn test_single_line() {
        let layout = build("Hi", None, WordBreak::BreakWord);
        assert_eq!(layout.lines.len(), 1);
        assert!((layout.width - 20.0).abs() < 1e-3);
        assert_eq!(layout.char_count, 2);
    }

    #[test]
    fn test_wraps_between_words() {
        let layout = build("aaa bbb ccc", Some(75.0), WordBreak::KeepAll);
        assert_eq!(line_ranges(&layout), vec![(0, 8), (8, 11)]);
        assert!((layout.lines[0].width - 70.0).abs() < 1e-3);
    }

    #[test]
    fn test_keep_all_overflows_long_word() {
        let layout = build("abcdefgh", Some(30.0), WordBreak::KeepAll);
        assert_eq!(layout.lines.len(), 1);
        assert!(layout.width > 30.0);
    }

    #[test]
    fn test_break_word_splits_long_word() {
        let layout = build("abcdefgh", Some(30.0), WordBreak::BreakWord);
        assert_eq!(line_ranges(&layout), vec![(0, 3), (3, 6), (6, 8)]);
    }

    #[test]
    fn test_break_all_fills_lines() {
        let layout = build("ab cdef", Some(40.0), WordBreak::BreakAll);
        assert_eq!(line_ranges(&layout), vec![(0, 4), (4, 7)]);
    }

    #[test]
    fn test_newlines_start_lines() {
        let layout = build("ab\n\ncd", None, WordBreak::BreakWord);
        assert_eq!(line_ranges(&layout), vec![(0, 2), (3, 3), (4, 6)]);
        assert_eq!(layout.char_count, 6);
    }

    #[test]
    fn test_char_index_nearest_boundary() {
        let layout = build("abcd", None, WordBreak::BreakWord);
        assert_eq!(layout.get_char_index(-5.0, 0.0), 0);
        assert_eq!(layout.get_char_index(4.0, 0.0), 0);
        assert_eq!(layout.get_char_index(6.0, 0.0), 1);
        assert_eq!(layout.get_char_index(50.0, 0.0), 2 + 2);
        assert_eq!(layout.get_char_index(500.0, 0.0), 4);
    }

    #[test]
    fn test_char_index_round_trip() {
        let layout = build("hello world again", Some(60.0), WordBreak::BreakWord);
        for index in 0..=layout.char_count {
            let (x, y) = layout.char_position(index);
            let back = layout.get_char_index(x, y + layout.line_height * 0.5);
            let (bx, by) = layout.char_position(back);
            assert!((bx - x).abs() <= 10.0 + 1e-3, "index {index} -> {back}");
            assert!(by == y || back == index, "index {index} -> {back}");
        }
    }

    #[test]
    fn test_point_past_wrapped_line_end_stays_on_line() {
        let layout = build("aaa bbb ccc", Some(80.0), WordBreak::KeepAll);
        assert_eq!(line_ranges(&layout), vec![(0, 8), (8, 11)]);

        let index = layout.get_char_index(78.0, 5.0);
        assert_eq!(index, 7);
        assert_eq!(layout.char_position(index), (70.0, 0.0));

        // The last line still reaches its end.
        assert_eq!(layout.get_char_index(500.0, layout.line_height + 5.0), 11);
    }

    #[test]
    fn test_point_index_position_round_trip() {
        for (text, max_width, word_break) in [
            ("aaa bbb ccc", 80.0, WordBreak::KeepAll),
            ("hello world again", 60.0, WordBreak::BreakWord),
            ("abcdefgh", 30.0, WordBreak::BreakWord),
            ("ab\n\ncd ef", 40.0, WordBreak::BreakAll),
        ] {
            let layout = build(text, Some(max_width), word_break);
            for (line_index, line) in layout.lines.iter().enumerate() {
                let y = line_index as f32 * layout.line_height;
                let line_right = line.glyphs.last().map_or(line.x, PositionedGlyph::end_x);
                let mut x = line.x - 5.0;
                while x <= line_right + 15.0 {
                    let index = layout.get_char_index(x, y + layout.line_height * 0.5);
                    assert!(index >= line.start && index <= line.end, "{text:?} ({x}, {y}) -> {index}");
                    let (px, py) = layout.char_position(index);
                    assert_eq!(py, y, "{text:?} ({x}, {y}) -> {index} drawn on another line");
                    assert!(px >= line.x - 1e-3 && px <= line_right + 1e-3, "{text:?} ({x}, {y}) -> {index}");
                    x += 2.5;
                }
            }
        }
    }

    #[test]
    fn test_center_alignment() {
        let opts = GlyphLayoutOptions { text_align: TextAlign::Center, ..options(Some(100.0), WordBreak::BreakWord) };
        let layout = GlyphLayout::build("ab", &opts, &MonospaceShaper);
        assert!((layout.lines[0].x - 40.0).abs() < 1e-3);
        assert!((layout.char_position(0).0 - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_selection_boxes_per_line() {
        let layout = build("aaa bbb", Some(45.0), WordBreak::KeepAll);
        let boxes = layout.selection_boxes(1, 6);
        assert_eq!(boxes.len(), 2);
        assert!((boxes[0][0] - 10.0).abs() < 1e-3);
        assert!((boxes[1][1] - layout.line_height).abs() < 1e-3);
        assert!((boxes[1][2] - 20.0).abs() < 1e-3);
        assert!(layout.selection_boxes(3, 3).is_empty());
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let layout = build("", Some(30.0), WordBreak::BreakWord);
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.get_char_index(10.0, 10.0), 0);
        assert_eq!(layout.char_position(0), (0.0, 0.0));
    }
}

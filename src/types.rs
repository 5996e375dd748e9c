//! Core types for spark-uikit.
//!
//! Colors, dimensions, insets and the keyword enums that resolved properties
//! are parsed into. Every keyword enum parses from the CSS-style string used
//! in property tables (`"space-between"`, `"row-reverse"`, ...).

// =============================================================================
// Color
// =============================================================================

/// RGBA color with linear `f32` channels (0.0-1.0).
///
/// Alpha 1.0 = fully opaque, 0.0 = fully transparent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Color from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Color from a packed `0xRRGGBB` integer.
    pub fn from_rgb_int(rgb: u32) -> Self {
        Self::from_rgba8(((rgb >> 16) & 0xFF) as u8, ((rgb >> 8) & 0xFF) as u8, (rgb & 0xFF) as u8, 255)
    }

    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    pub const GRAY: Self = Self::rgb(0.5, 0.5, 0.5);

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Multiply alpha by `opacity`.
    #[inline]
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self { a: self.a * opacity.clamp(0.0, 1.0), ..self }
    }

    /// Linear interpolation between two colors.
    #[inline]
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let inv_t = 1.0 - t;
        Self {
            r: a.r * inv_t + b.r * t,
            g: a.g * inv_t + b.g * t,
            b: a.b * inv_t + b.b * t,
            a: a.a * inv_t + b.a * t,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse hex color string (#RGB, #RRGGBB, #RRGGBBAA).
    ///
    /// ```
    /// use spark_uikit::types::Color;
    ///
    /// assert_eq!(Color::from_hex("#ff0000"), Some(Color::RED));
    /// assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
    /// assert!(Color::from_hex("#gg0000").is_none());
    /// ```
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');

        fn hex_digit(c: u8) -> Option<u8> {
            match c {
                b'0'..=b'9' => Some(c - b'0'),
                b'a'..=b'f' => Some(c - b'a' + 10),
                b'A'..=b'F' => Some(c - b'A' + 10),
                _ => None,
            }
        }

        fn hex_byte(s: &[u8], i: usize) -> Option<u8> {
            Some((hex_digit(s[i])? << 4) | hex_digit(s[i + 1])?)
        }

        let bytes = hex.as_bytes();
        match bytes.len() {
            3 => {
                let r = hex_digit(bytes[0])?;
                let g = hex_digit(bytes[1])?;
                let b = hex_digit(bytes[2])?;
                Some(Self::from_rgba8((r << 4) | r, (g << 4) | g, (b << 4) | b, 255))
            }
            6 => Some(Self::from_rgba8(
                hex_byte(bytes, 0)?,
                hex_byte(bytes, 2)?,
                hex_byte(bytes, 4)?,
                255,
            )),
            8 => Some(Self::from_rgba8(
                hex_byte(bytes, 0)?,
                hex_byte(bytes, 2)?,
                hex_byte(bytes, 4)?,
                hex_byte(bytes, 6)?,
            )),
            _ => None,
        }
    }

    /// Parse `rgb(r, g, b)` / `rgba(r, g, b, a)` with 0-255 channels and 0-1 alpha.
    fn from_rgb_fn(s: &str) -> Option<Self> {
        let (name, rest) = s.split_once('(')?;
        let content = rest.strip_suffix(')')?;
        let parts: Vec<f32> = content
            .split(|c: char| c == ',' || c.is_whitespace() || c == '/')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<f32>().ok())
            .collect::<Option<_>>()?;
        match (name.trim(), parts.as_slice()) {
            ("rgb" | "rgba", [r, g, b]) => Some(Self::rgb(r / 255.0, g / 255.0, b / 255.0)),
            ("rgb" | "rgba", [r, g, b, a]) => Some(Self::new(r / 255.0, g / 255.0, b / 255.0, *a)),
            _ => None,
        }
    }

    /// Parse any supported color format: hex, `rgb()`/`rgba()` and a few keywords.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let lower = input.to_lowercase();
        match lower.as_str() {
            "transparent" => return Some(Self::TRANSPARENT),
            "black" => return Some(Self::BLACK),
            "white" => return Some(Self::WHITE),
            "red" => return Some(Self::RED),
            "green" => return Some(Self::GREEN),
            "blue" => return Some(Self::BLUE),
            "gray" | "grey" => return Some(Self::GRAY),
            _ => {}
        }
        if input.starts_with('#') {
            return Self::from_hex(input);
        }
        if lower.starts_with("rgb") {
            return Self::from_rgb_fn(&lower);
        }
        None
    }
}

// =============================================================================
// Dimension - Supports absolute and percentage values
// =============================================================================

/// A size value: auto, absolute layout units, or a percentage of the parent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Points(f32),
    Percent(f32),
}

impl Dimension {
    /// Parse `auto`, `50%` or a plain number.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        if let Some(p) = input.strip_suffix('%') {
            return p.trim().parse().ok().map(Self::Percent);
        }
        input.parse().ok().map(Self::Points)
    }

    /// Resolve against a parent length.
    pub fn resolve(self, parent: f32) -> Option<f32> {
        match self {
            Self::Auto => None,
            Self::Points(v) => Some(v),
            Self::Percent(p) => Some(parent * p / 100.0),
        }
    }
}

impl From<f32> for Dimension {
    fn from(value: f32) -> Self {
        Self::Points(value)
    }
}

// =============================================================================
// Inset - per-side lengths
// =============================================================================

/// Per-side lengths in `top, right, bottom, left` order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Inset {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Inset {
    pub const ZERO: Self = Self::uniform(0.0);

    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self { top, right, bottom, left }
    }

    pub const fn uniform(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    #[inline]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    #[inline]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.top, self.right, self.bottom, self.left]
    }
}

// =============================================================================
// Element Types - draw order rank
// =============================================================================

/// Kind of drawable surface. The discriminant is the draw rank within a z-index class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ElementType {
    #[default]
    Panel = 0,
    Image = 1,
    Object = 2,
    Custom = 3,
    Text = 4,
}

impl ElementType {
    #[inline]
    pub const fn rank(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// Keyword Enums
// =============================================================================

macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $kw:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Parse the CSS-style keyword.
            pub fn parse(input: &str) -> Option<Self> {
                match input.trim() {
                    $( $kw => Some(Self::$variant), )+
                    _ => None,
                }
            }

            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $kw ),+
                }
            }
        }
    };
}

keyword_enum! {
    /// Flex direction. Elements default to column layout.
    pub enum FlexDirection {
        #[default]
        Column => "column",
        Row => "row",
        ColumnReverse => "column-reverse",
        RowReverse => "row-reverse",
    }
}

impl FlexDirection {
    pub const fn is_row(&self) -> bool {
        matches!(self, Self::Row | Self::RowReverse)
    }
}

keyword_enum! {
    pub enum FlexWrap {
        #[default]
        NoWrap => "no-wrap",
        Wrap => "wrap",
        WrapReverse => "wrap-reverse",
    }
}

keyword_enum! {
    /// Main axis alignment.
    pub enum JustifyContent {
        #[default]
        FlexStart => "flex-start",
        Center => "center",
        FlexEnd => "flex-end",
        SpaceBetween => "space-between",
        SpaceAround => "space-around",
        SpaceEvenly => "space-evenly",
    }
}

keyword_enum! {
    /// Cross axis alignment.
    pub enum AlignItems {
        #[default]
        Stretch => "stretch",
        FlexStart => "flex-start",
        Center => "center",
        FlexEnd => "flex-end",
        Baseline => "baseline",
    }
}

keyword_enum! {
    /// Item override of the parent's `alignItems`.
    pub enum AlignSelf {
        #[default]
        Auto => "auto",
        Stretch => "stretch",
        FlexStart => "flex-start",
        Center => "center",
        FlexEnd => "flex-end",
        Baseline => "baseline",
    }
}

keyword_enum! {
    /// Multi-line cross axis alignment.
    pub enum AlignContent {
        #[default]
        Stretch => "stretch",
        FlexStart => "flex-start",
        Center => "center",
        FlexEnd => "flex-end",
        SpaceBetween => "space-between",
        SpaceAround => "space-around",
    }
}

keyword_enum! {
    pub enum Overflow {
        #[default]
        Visible => "visible",
        Hidden => "hidden",
        Scroll => "scroll",
    }
}

impl Overflow {
    /// Whether this overflow opens a clipping scope for descendants.
    pub const fn clips(&self) -> bool {
        matches!(self, Self::Hidden | Self::Scroll)
    }
}

keyword_enum! {
    pub enum PositionType {
        #[default]
        Relative => "relative",
        Absolute => "absolute",
    }
}

keyword_enum! {
    /// Where 3D content sits along the element's normal.
    pub enum DepthAlign {
        /// Back face on the element plane; the content stands out towards the viewer.
        #[default]
        Back => "back",
        Center => "center",
        Front => "front",
    }
}

keyword_enum! {
    pub enum Display {
        #[default]
        Flex => "flex",
        None => "none",
    }
}

keyword_enum! {
    pub enum Visibility {
        #[default]
        Visible => "visible",
        Hidden => "hidden",
    }
}

keyword_enum! {
    pub enum TextAlign {
        #[default]
        Left => "left",
        Center => "center",
        Right => "right",
    }
}

keyword_enum! {
    /// Line breaking strategy for text.
    pub enum WordBreak {
        /// Break between words only; long words overflow.
        #[default]
        KeepAll => "keep-all",
        /// Break between words, splitting words that do not fit on their own line.
        BreakWord => "break-word",
        /// Break anywhere.
        BreakAll => "break-all",
    }
}

keyword_enum! {
    pub enum InputType {
        #[default]
        Text => "text",
        Password => "password",
    }
}

keyword_enum! {
    pub enum BlendMode {
        #[default]
        Normal => "normal",
        Additive => "additive",
        Multiply => "multiply",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#000"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("00ff00"), Some(Color::GREEN));
        let semi = Color::from_hex("#ff000080").unwrap();
        assert!((semi.a - 128.0 / 255.0).abs() < 1e-6);
        assert!(Color::from_hex("#12345").is_none());
    }

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(Color::parse(" White "), Some(Color::WHITE));
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::RED));
        assert_eq!(Color::parse("rgba(0 0 255 / 0.5)"), Some(Color::new(0.0, 0.0, 1.0, 0.5)));
        assert!(Color::parse("not-a-color").is_none());
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!(Dimension::parse("auto"), Some(Dimension::Auto));
        assert_eq!(Dimension::parse("50%"), Some(Dimension::Percent(50.0)));
        assert_eq!(Dimension::parse("12.5"), Some(Dimension::Points(12.5)));
        assert_eq!(Dimension::Percent(50.0).resolve(80.0), Some(40.0));
        assert!(Dimension::parse("wide").is_none());
    }

    #[test]
    fn test_keyword_enums() {
        assert_eq!(FlexDirection::parse("row-reverse"), Some(FlexDirection::RowReverse));
        assert_eq!(FlexDirection::default(), FlexDirection::Column);
        assert_eq!(JustifyContent::parse("space-evenly"), Some(JustifyContent::SpaceEvenly));
        assert_eq!(WordBreak::BreakWord.as_str(), "break-word");
        assert!(Overflow::Hidden.clips());
        assert!(!Overflow::Visible.clips());
        assert!(Display::parse("grid").is_none());
    }

    #[test]
    fn test_element_rank_order() {
        assert!(ElementType::Panel.rank() < ElementType::Image.rank());
        assert!(ElementType::Custom.rank() < ElementType::Text.rank());
    }
}

//! Root configuration.

use glam::Vec2;

/// Configuration for one independent UI tree.
///
/// # Example
///
/// ```
/// use spark_uikit::config::RootConfig;
///
/// let config = RootConfig::default()
///     .with_size(800.0, 600.0)
///     .with_dark_mode(true);
/// assert_eq!(config.pixel_size, 0.01);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RootConfig {
    /// World units per layout unit.
    pub pixel_size: f32,
    /// Available size for the root layout pass, in layout units.
    pub size: Vec2,
    /// Initial value of the dark-mode cell.
    pub dark_mode: bool,
    /// Instance slots allocated when a render group is created.
    pub initial_group_capacity: u32,
    /// Capacity multiplier applied when a render group is full.
    pub group_growth_factor: u32,
    /// Caret width in layout units.
    pub caret_width: f32,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            pixel_size: 0.01,
            size: Vec2::new(1000.0, 1000.0),
            dark_mode: false,
            initial_group_capacity: 16,
            group_growth_factor: 2,
            caret_width: 1.5,
        }
    }
}

impl RootConfig {
    pub fn with_pixel_size(mut self, pixel_size: f32) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    pub fn with_dark_mode(mut self, dark_mode: bool) -> Self {
        self.dark_mode = dark_mode;
        self
    }

    pub fn with_initial_group_capacity(mut self, capacity: u32) -> Self {
        self.initial_group_capacity = capacity.max(1);
        self
    }

    /// Growth factors below 2 are raised to 2.
    pub fn with_group_growth_factor(mut self, factor: u32) -> Self {
        self.group_growth_factor = factor.max(2);
        self
    }

    pub fn with_caret_width(mut self, width: f32) -> Self {
        self.caret_width = width;
        self
    }
}

/// Font defaults for text elements.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    /// Line height as a multiple of `size`.
    pub line_height: f32,
    pub weight: u16,
    pub letter_spacing: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "inter".to_string(),
            size: 16.0,
            line_height: 1.2,
            weight: 400,
            letter_spacing: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_clamp() {
        let config = RootConfig::default()
            .with_group_growth_factor(1)
            .with_initial_group_capacity(0);
        assert_eq!(config.group_growth_factor, 2);
        assert_eq!(config.initial_group_capacity, 1);
    }
}

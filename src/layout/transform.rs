//! Element transforms.
//!
//! Every element's local matrix places its center at the layout position
//! (`relative_center`, y up) and then applies the `transform*` properties
//! around the transform origin:
//!
//! ```text
//! local = T(center + translate) * T(origin) * R(x, y, z) * S * T(-origin)
//! global = parent_children_matrix * local
//! ```
//!
//! Matrices are in layout units. The scene receives
//! `root_world * S(pixel_size) * global`.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::properties::MergedProperties;

/// Horizontal transform origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OriginX {
    Left,
    #[default]
    Center,
    Right,
}

impl OriginX {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    fn fraction(self) -> f32 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

/// Vertical transform origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OriginY {
    Top,
    #[default]
    Center,
    Bottom,
}

impl OriginY {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "top" => Some(Self::Top),
            "center" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    fn fraction(self) -> f32 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// The `transform*` properties of one element. Rotations are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformProperties {
    pub translate: Vec3,
    pub rotate: Vec3,
    pub scale: Vec3,
    pub origin_x: OriginX,
    pub origin_y: OriginY,
}

impl Default for TransformProperties {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            rotate: Vec3::ZERO,
            scale: Vec3::ONE,
            origin_x: OriginX::Center,
            origin_y: OriginY::Center,
        }
    }
}

impl TransformProperties {
    pub fn from_merged(m: &MergedProperties) -> Self {
        Self {
            translate: Vec3::new(
                m.number("transformTranslateX"),
                m.number("transformTranslateY"),
                m.number("transformTranslateZ"),
            ),
            rotate: Vec3::new(
                m.number("transformRotateX"),
                m.number("transformRotateY"),
                m.number("transformRotateZ"),
            ),
            scale: Vec3::new(
                m.number_opt("transformScaleX").unwrap_or(1.0),
                m.number_opt("transformScaleY").unwrap_or(1.0),
                m.number_opt("transformScaleZ").unwrap_or(1.0),
            ),
            origin_x: m.keyword("transformOriginX", OriginX::parse),
            origin_y: m.keyword("transformOriginY", OriginY::parse),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.translate == Vec3::ZERO && self.rotate == Vec3::ZERO && self.scale == Vec3::ONE
    }

    /// Offset of the origin from the element center (y up).
    pub fn origin_offset(&self, size: Vec2) -> Vec3 {
        Vec3::new(
            (self.origin_x.fraction() - 0.5) * size.x,
            (0.5 - self.origin_y.fraction()) * size.y,
            0.0,
        )
    }
}

/// Local matrix of an element relative to its parent's children matrix.
pub fn local_matrix(relative_center: Vec2, size: Vec2, transform: &TransformProperties) -> Mat4 {
    let position = Mat4::from_translation(relative_center.extend(0.0) + transform.translate);
    if transform.rotate == Vec3::ZERO && transform.scale == Vec3::ONE {
        return position;
    }
    let origin = transform.origin_offset(size);
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        transform.rotate.x.to_radians(),
        transform.rotate.y.to_radians(),
        transform.rotate.z.to_radians(),
    );
    position
        * Mat4::from_translation(origin)
        * Mat4::from_scale_rotation_translation(transform.scale, rotation, Vec3::ZERO)
        * Mat4::from_translation(-origin)
}

pub fn global_matrix(parent_children_matrix: &Mat4, local: &Mat4) -> Mat4 {
    *parent_children_matrix * *local
}

/// Matrix handed to the scene graph for an element.
pub fn world_matrix(root_world: &Mat4, pixel_size: f32, global: &Mat4) -> Mat4 {
    *root_world * Mat4::from_scale(Vec3::splat(pixel_size)) * *global
}

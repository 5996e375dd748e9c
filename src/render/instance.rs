//! Per-instance GPU record.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::layout::ClipRect;
use crate::types::{Color, Inset};

/// One instance of a unit quad.
///
/// `transform` maps the unit quad (centered, size 1) into root space.
/// Insets and radii are in layout units, ordered top, right, bottom, left.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub transform: [f32; 16],
    pub color: [f32; 4],
    pub border_color: [f32; 4],
    pub border_sizes: [f32; 4],
    /// top-left, top-right, bottom-right, bottom-left
    pub border_radius: [f32; 4],
    /// `[u0, v0, u1, v1]` inside the bound texture or atlas.
    pub uv_rect: [f32; 4],
    /// `[min.x, min.y, max.x, max.y]`; all zero means unclipped.
    pub clipping_rect: [f32; 4],
    pub size: [f32; 2],
}

pub const INSTANCE_SIZE: usize = std::mem::size_of::<InstanceData>();

impl Default for InstanceData {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY.to_cols_array(),
            uv_rect: [0.0, 0.0, 1.0, 1.0],
            ..<Self as Zeroable>::zeroed()
        }
    }
}

impl InstanceData {
    /// Quad of `size` whose center is placed by `matrix`.
    pub fn quad(matrix: &Mat4, size: Vec2) -> Self {
        let transform = *matrix * Mat4::from_scale(Vec3::new(size.x, size.y, 1.0));
        Self { transform: transform.to_cols_array(), size: size.to_array(), ..Self::default() }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color.to_array();
        self
    }

    pub fn with_border(mut self, sizes: Inset, color: Color) -> Self {
        self.border_sizes = sizes.to_array();
        self.border_color = color.to_array();
        self
    }

    pub fn with_radius(mut self, radius: [f32; 4]) -> Self {
        self.border_radius = radius;
        self
    }

    pub fn with_uv_rect(mut self, uv_rect: [f32; 4]) -> Self {
        self.uv_rect = uv_rect;
        self
    }

    pub fn with_clipping(mut self, clipping: Option<ClipRect>) -> Self {
        self.clipping_rect = clipping.map(ClipRect::to_array).unwrap_or_default();
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array(&self.transform)
    }

    /// Center of the quad in root space.
    pub fn center(&self) -> Vec2 {
        self.matrix().transform_point3(Vec3::ZERO).truncate()
    }
}

//! Clipping rectangles and visibility.
//!
//! Rectangles live in root space: layout units, y up, origin at the root
//! center. An element with `overflow: hidden | scroll` opens a clipping scope;
//! its descendants are clipped by the intersection of every enclosing scope.

use glam::{Mat4, Vec2, Vec3};

use crate::types::{Display, Visibility};

/// Axis-aligned rectangle in root space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl ClipRect {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounding box of a `size` box centered on the origin, transformed by `matrix`.
    pub fn from_matrix(matrix: &Mat4, size: Vec2) -> Self {
        let half = size * 0.5;
        let corners = [
            Vec3::new(-half.x, -half.y, 0.0),
            Vec3::new(half.x, -half.y, 0.0),
            Vec3::new(half.x, half.y, 0.0),
            Vec3::new(-half.x, half.y, 0.0),
        ];
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for corner in corners {
            let p = matrix.transform_point3(corner).truncate();
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    pub fn size(&self) -> Vec2 {
        (self.max - self.min).max(Vec2::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Intersection; empty rectangles keep `min == max`.
    pub fn intersect(&self, other: &ClipRect) -> ClipRect {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max).max(min);
        ClipRect { min, max }
    }

    pub fn intersects(&self, other: &ClipRect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// `[min.x, min.y, max.x, max.y]`
    pub fn to_array(self) -> [f32; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    /// Bit pattern of the rectangle, for structural `Eq + Hash`.
    pub fn to_bits(self) -> [u32; 4] {
        self.to_array().map(f32::to_bits)
    }
}

/// Clipping scope handed to children: the parent scope, narrowed by this
/// element's rectangle when it clips.
pub fn child_clip_rect(parent: Option<ClipRect>, own: ClipRect, clips: bool) -> Option<ClipRect> {
    match (clips, parent) {
        (false, parent) => parent,
        (true, None) => Some(own),
        (true, Some(parent)) => Some(parent.intersect(&own)),
    }
}

/// True when the element lies fully outside its clipping scope.
pub fn is_clipped(own: ClipRect, scope: Option<ClipRect>) -> bool {
    match scope {
        Some(scope) => !own.intersects(&scope),
        None => false,
    }
}

pub fn is_visible(display: Display, visibility: Visibility, size: Vec2, clipped: bool) -> bool {
    display != Display::None
        && visibility == Visibility::Visible
        && size.x > 0.0
        && size.y > 0.0
        && !clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_matrix_translated() {
        let m = Mat4::from_translation(Vec3::new(10.0, 5.0, 0.0));
        let rect = ClipRect::from_matrix(&m, Vec2::new(20.0, 10.0));
        assert_eq!(rect.min, Vec2::new(0.0, 0.0));
        assert_eq!(rect.max, Vec2::new(20.0, 10.0));
    }

    #[test]
    fn test_intersect_and_clipping() {
        let scope = ClipRect::new(Vec2::new(-50.0, -50.0), Vec2::new(50.0, 50.0));
        let inside = ClipRect::new(Vec2::new(40.0, 0.0), Vec2::new(60.0, 10.0));
        let outside = ClipRect::new(Vec2::new(60.0, 0.0), Vec2::new(80.0, 10.0));

        assert_eq!(scope.intersect(&inside).max, Vec2::new(50.0, 10.0));
        assert!(scope.intersect(&outside).is_empty());
        assert!(!is_clipped(inside, Some(scope)));
        assert!(is_clipped(outside, Some(scope)));
        assert!(!is_clipped(outside, None));
    }

    #[test]
    fn test_child_scope_narrows() {
        let parent = ClipRect::new(Vec2::ZERO, Vec2::splat(10.0));
        let own = ClipRect::new(Vec2::splat(5.0), Vec2::splat(20.0));
        assert_eq!(child_clip_rect(Some(parent), own, false), Some(parent));
        assert_eq!(
            child_clip_rect(Some(parent), own, true),
            Some(ClipRect::new(Vec2::splat(5.0), Vec2::splat(10.0)))
        );
        assert_eq!(child_clip_rect(None, own, true), Some(own));
    }

    #[test]
    fn test_visibility() {
        let size = Vec2::new(10.0, 10.0);
        assert!(is_visible(Display::Flex, Visibility::Visible, size, false));
        assert!(!is_visible(Display::None, Visibility::Visible, size, false));
        assert!(!is_visible(Display::Flex, Visibility::Hidden, size, false));
        assert!(!is_visible(Display::Flex, Visibility::Visible, Vec2::new(0.0, 10.0), false));
        assert!(!is_visible(Display::Flex, Visibility::Visible, size, true));
    }
}

//! Panels - the background and border surface of an element.

use std::rc::Rc;

use glam::{Mat4, Vec2};

use super::instance::InstanceData;
use super::list::InstanceList;
use super::manager::InstanceManager;
use crate::error::ErrorSink;
use crate::layout::ClipRect;
use crate::order::OrderInfo;
use crate::properties::MergedProperties;
use crate::reactive::{Derived, Signal, derived};
use crate::types::{Color, Inset};

const CORNER_KEYS: [&str; 4] = [
    "borderTopLeftRadius",
    "borderTopRightRadius",
    "borderBottomRightRadius",
    "borderBottomLeftRadius",
];

/// Corner radii, per-corner keys over `borderRadius`.
pub fn border_radius(m: &MergedProperties) -> [f32; 4] {
    let uniform = m.number("borderRadius");
    CORNER_KEYS.map(|key| m.number_opt(key).unwrap_or(uniform))
}

fn opacity(m: &MergedProperties) -> f32 {
    m.number_opt("opacity").unwrap_or(1.0).clamp(0.0, 1.0)
}

/// Panel instance, or `None` when the element has neither background nor border.
pub fn panel_instance(
    m: &MergedProperties,
    matrix: &Mat4,
    size: Vec2,
    border: Inset,
    clipping: Option<ClipRect>,
) -> Option<InstanceData> {
    let opacity = opacity(m);
    let background = m
        .color("backgroundColor")
        .map(|c| c.with_opacity(m.number_opt("backgroundOpacity").unwrap_or(1.0) * opacity))
        .unwrap_or(Color::TRANSPARENT);
    let has_border = border.to_array().iter().any(|&w| w > 0.0);
    if background.is_transparent() && !has_border {
        return None;
    }
    let border_color = m
        .color("borderColor")
        .unwrap_or(Color::BLACK)
        .with_opacity(m.number_opt("borderOpacity").unwrap_or(1.0) * opacity);
    Some(
        InstanceData::quad(matrix, size)
            .with_color(background)
            .with_border(border, border_color)
            .with_radius(border_radius(m))
            .with_clipping(clipping),
    )
}

/// Geometry a surface is drawn with, shared by every surface of an element.
#[derive(Clone)]
pub struct SurfaceGeometry {
    pub global_matrix: Derived<Mat4>,
    pub size: Signal<Vec2>,
    pub border_inset: Signal<Inset>,
    pub clipping_rect: Derived<Option<ClipRect>>,
}

/// Bind an element's panel to the instance manager.
pub fn instanced_panel(
    manager: &Rc<InstanceManager>,
    merged: &Derived<MergedProperties>,
    order: &Derived<OrderInfo>,
    visible: &Derived<bool>,
    geometry: &SurfaceGeometry,
    errors: &ErrorSink,
) -> InstanceList {
    let merged = merged.clone();
    let geometry = geometry.clone();
    let instances = derived(move || {
        let matrix = geometry.global_matrix.get();
        let size = geometry.size.get();
        let border = geometry.border_inset.get();
        let clipping = geometry.clipping_rect.get();
        merged
            .with(|m| panel_instance(m, &matrix, size, border, clipping))
            .into_iter()
            .collect::<Vec<_>>()
    });
    InstanceList::new(manager, order, visible, instances, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{LayerSource, Properties, merge_layers};

    fn resolve(style: Properties) -> MergedProperties {
        merge_layers(&[LayerSource::Style(&style)], None)
    }

    #[test]
    fn test_no_background_no_panel() {
        let m = resolve(Properties::new());
        assert!(panel_instance(&m, &Mat4::IDENTITY, Vec2::splat(10.0), Inset::ZERO, None).is_none());
        assert!(panel_instance(&m, &Mat4::IDENTITY, Vec2::splat(10.0), Inset::uniform(1.0), None).is_some());
    }

    #[test]
    fn test_background_opacity_multiplies() {
        let m = resolve(
            Properties::new()
                .with("backgroundColor", "#ff0000")
                .with("backgroundOpacity", 0.5)
                .with("opacity", 0.5),
        );
        let panel = panel_instance(&m, &Mat4::IDENTITY, Vec2::splat(10.0), Inset::ZERO, None).unwrap();
        assert_eq!(panel.color, [1.0, 0.0, 0.0, 0.25]);
    }

    #[test]
    fn test_corner_radius_override() {
        let m = resolve(Properties::new().with("borderRadius", 4).with("borderTopLeftRadius", 8));
        assert_eq!(border_radius(&m), [8.0, 4.0, 4.0, 4.0]);
    }
}

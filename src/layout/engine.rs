//! Layout engine contract and the flex property record pushed into it.

use std::rc::Rc;

use glam::Vec2;

use crate::error::LayoutError;
use crate::properties::MergedProperties;
use crate::types::{
    AlignContent, AlignItems, AlignSelf, Dimension, Display, FlexDirection, FlexWrap, Inset,
    JustifyContent, Overflow, PositionType,
};

/// Handle of a node inside a [`LayoutEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutNodeId(pub u64);

/// Placement of a new node under its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeConstraints {
    /// Child index; `None` appends.
    pub index: Option<usize>,
}

/// Space offered to a measured node along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureSpace {
    Definite(f32),
    MinContent,
    MaxContent,
}

/// Element-supplied measurement, used instead of the box model for leaves.
pub trait CustomLayouting {
    /// Measure the content box. `known` holds sizes already fixed by the parent.
    fn measure(&self, known: (Option<f32>, Option<f32>), available: (MeasureSpace, MeasureSpace)) -> Vec2;
}

/// Computed box of one node, relative to its parent's border box (y down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComputedLayout {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub border: Inset,
    pub padding: Inset,
}

impl ComputedLayout {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Size of the content box (inside border and padding).
    pub fn content_size(&self) -> Vec2 {
        Vec2::new(
            (self.width - self.border.horizontal() - self.padding.horizontal()).max(0.0),
            (self.height - self.border.vertical() - self.padding.vertical()).max(0.0),
        )
    }
}

/// Opaque flex layout solver.
pub trait LayoutEngine {
    fn create_node(
        &mut self,
        parent: Option<LayoutNodeId>,
        constraints: NodeConstraints,
    ) -> Result<LayoutNodeId, LayoutError>;

    /// Remove a node and detach it from its parent. Children stay known until removed themselves.
    fn remove_node(&mut self, node: LayoutNodeId) -> Result<(), LayoutError>;

    fn set_properties(&mut self, node: LayoutNodeId, properties: &FlexProperties) -> Result<(), LayoutError>;

    fn set_custom_layout(
        &mut self,
        node: LayoutNodeId,
        layout: Option<Rc<dyn CustomLayouting>>,
    ) -> Result<(), LayoutError>;

    /// Invalidate cached measurements of `node` (content of a custom layout changed).
    fn mark_dirty(&mut self, node: LayoutNodeId) -> Result<(), LayoutError>;

    fn compute(&mut self, root: LayoutNodeId, available: Vec2) -> Result<(), LayoutError>;

    fn computed_layout(&self, node: LayoutNodeId) -> Result<ComputedLayout, LayoutError>;
}

// =============================================================================
// FlexProperties
// =============================================================================

/// Flex-relevant subset of a resolved table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlexProperties {
    pub display: Display,
    pub position_type: PositionType,
    pub position: [Dimension; 4],

    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub align_content: AlignContent,
    pub align_self: AlignSelf,

    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,

    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,
    pub aspect_ratio: Option<f32>,

    pub margin: Inset,
    pub padding: Inset,
    pub border: Inset,
    pub gap_row: f32,
    pub gap_column: f32,

    pub overflow: Overflow,
}

fn inset(m: &MergedProperties, keys: [&str; 4]) -> Inset {
    Inset::new(m.number(keys[0]), m.number(keys[1]), m.number(keys[2]), m.number(keys[3]))
}

impl FlexProperties {
    /// Read the flex subset (tracked).
    pub fn from_merged(m: &MergedProperties) -> Self {
        Self {
            display: m.keyword("display", Display::parse),
            position_type: m.keyword("positionType", PositionType::parse),
            position: [
                m.dimension("positionTop"),
                m.dimension("positionRight"),
                m.dimension("positionBottom"),
                m.dimension("positionLeft"),
            ],
            flex_direction: m.keyword("flexDirection", FlexDirection::parse),
            flex_wrap: m.keyword("flexWrap", FlexWrap::parse),
            justify_content: m.keyword("justifyContent", JustifyContent::parse),
            align_items: m.keyword("alignItems", AlignItems::parse),
            align_content: m.keyword("alignContent", AlignContent::parse),
            align_self: m.keyword("alignSelf", AlignSelf::parse),
            flex_grow: m.number("flexGrow"),
            flex_shrink: m.number("flexShrink"),
            flex_basis: m.dimension("flexBasis"),
            width: m.dimension("width"),
            height: m.dimension("height"),
            min_width: m.dimension("minWidth"),
            min_height: m.dimension("minHeight"),
            max_width: m.dimension("maxWidth"),
            max_height: m.dimension("maxHeight"),
            aspect_ratio: m.number_opt("aspectRatio"),
            margin: inset(m, ["marginTop", "marginRight", "marginBottom", "marginLeft"]),
            padding: inset(m, ["paddingTop", "paddingRight", "paddingBottom", "paddingLeft"]),
            border: inset(
                m,
                ["borderTopWidth", "borderRightWidth", "borderBottomWidth", "borderLeftWidth"],
            ),
            gap_row: m.number("gapRow"),
            gap_column: m.number("gapColumn"),
            overflow: m.keyword("overflow", Overflow::parse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{LayerSource, Properties, merge_layers};

    #[test]
    fn test_from_merged_expands_shorthands() {
        let style = Properties::new()
            .with("width", 100)
            .with("height", "50%")
            .with("padding", 10)
            .with("flexDirection", "row")
            .with("overflow", "hidden");
        let m = merge_layers(&[LayerSource::Style(&style)], None);
        let props = FlexProperties::from_merged(&m);

        assert_eq!(props.width, Dimension::Points(100.0));
        assert_eq!(props.height, Dimension::Percent(50.0));
        assert_eq!(props.padding, Inset::uniform(10.0));
        assert_eq!(props.flex_direction, FlexDirection::Row);
        assert_eq!(props.flex_shrink, 1.0);
        assert_eq!(props.overflow, Overflow::Hidden);
        assert_eq!(props.position, [Dimension::Auto; 4]);
    }

    #[test]
    fn test_content_size() {
        let layout = ComputedLayout {
            width: 100.0,
            height: 50.0,
            padding: Inset::uniform(10.0),
            border: Inset::new(1.0, 0.0, 1.0, 0.0),
            ..Default::default()
        };
        assert_eq!(layout.content_size(), Vec2::new(80.0, 28.0));
    }
}

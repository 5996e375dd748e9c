//! Taffy Bridge - [`LayoutEngine`] backed by the Taffy flexbox solver.
//!
//! Converts [`FlexProperties`] to Taffy styles, keeps one Taffy node per
//! element, and reads results back as [`ComputedLayout`]. Nodes with a custom
//! layout carry it as their Taffy node context and are measured through it.

use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use taffy::{
    AlignContent as TaffyAlignContent, AlignItems as TaffyAlignItems, AlignSelf as TaffyAlignSelf,
    AvailableSpace, Dimension as TaffyDimension, Display as TaffyDisplay,
    FlexDirection as TaffyFlexDirection, FlexWrap as TaffyFlexWrap,
    JustifyContent as TaffyJustifyContent, LengthPercentage, LengthPercentageAuto, NodeId,
    Overflow as TaffyOverflow, Position as TaffyPosition, Rect, Size, Style, TaffyTree,
    TraversePartialTree,
};

use super::engine::{
    ComputedLayout, CustomLayouting, FlexProperties, LayoutEngine, LayoutNodeId, MeasureSpace,
    NodeConstraints,
};
use crate::error::LayoutError;
use crate::types::{
    AlignContent, AlignItems, AlignSelf, Dimension, Display, FlexDirection, FlexWrap, Inset,
    JustifyContent, Overflow, PositionType,
};

// =============================================================================
// DIMENSION CONVERSION
// =============================================================================

fn to_taffy_dimension(dim: Dimension) -> TaffyDimension {
    match dim {
        Dimension::Auto => TaffyDimension::Auto,
        Dimension::Points(n) => TaffyDimension::Length(n),
        Dimension::Percent(p) => TaffyDimension::Percent(p / 100.0),
    }
}

fn to_taffy_lpa(dim: Dimension) -> LengthPercentageAuto {
    match dim {
        Dimension::Auto => LengthPercentageAuto::Auto,
        Dimension::Points(n) => LengthPercentageAuto::Length(n),
        Dimension::Percent(p) => LengthPercentageAuto::Percent(p / 100.0),
    }
}

fn to_taffy_rect_lp(inset: Inset) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(inset.top),
        right: LengthPercentage::Length(inset.right),
        bottom: LengthPercentage::Length(inset.bottom),
        left: LengthPercentage::Length(inset.left),
    }
}

// =============================================================================
// ENUM CONVERSIONS
// =============================================================================

fn to_taffy_flex_direction(dir: FlexDirection) -> TaffyFlexDirection {
    match dir {
        FlexDirection::Column => TaffyFlexDirection::Column,
        FlexDirection::Row => TaffyFlexDirection::Row,
        FlexDirection::ColumnReverse => TaffyFlexDirection::ColumnReverse,
        FlexDirection::RowReverse => TaffyFlexDirection::RowReverse,
    }
}

fn to_taffy_flex_wrap(wrap: FlexWrap) -> TaffyFlexWrap {
    match wrap {
        FlexWrap::NoWrap => TaffyFlexWrap::NoWrap,
        FlexWrap::Wrap => TaffyFlexWrap::Wrap,
        FlexWrap::WrapReverse => TaffyFlexWrap::WrapReverse,
    }
}

fn to_taffy_justify_content(justify: JustifyContent) -> Option<TaffyJustifyContent> {
    Some(match justify {
        JustifyContent::FlexStart => TaffyJustifyContent::FlexStart,
        JustifyContent::Center => TaffyJustifyContent::Center,
        JustifyContent::FlexEnd => TaffyJustifyContent::FlexEnd,
        JustifyContent::SpaceBetween => TaffyJustifyContent::SpaceBetween,
        JustifyContent::SpaceAround => TaffyJustifyContent::SpaceAround,
        JustifyContent::SpaceEvenly => TaffyJustifyContent::SpaceEvenly,
    })
}

fn to_taffy_align_items(align: AlignItems) -> Option<TaffyAlignItems> {
    Some(match align {
        AlignItems::Stretch => TaffyAlignItems::Stretch,
        AlignItems::FlexStart => TaffyAlignItems::FlexStart,
        AlignItems::Center => TaffyAlignItems::Center,
        AlignItems::FlexEnd => TaffyAlignItems::FlexEnd,
        AlignItems::Baseline => TaffyAlignItems::Baseline,
    })
}

fn to_taffy_align_content(align: AlignContent) -> Option<TaffyAlignContent> {
    Some(match align {
        AlignContent::Stretch => TaffyAlignContent::Stretch,
        AlignContent::FlexStart => TaffyAlignContent::FlexStart,
        AlignContent::Center => TaffyAlignContent::Center,
        AlignContent::FlexEnd => TaffyAlignContent::FlexEnd,
        AlignContent::SpaceBetween => TaffyAlignContent::SpaceBetween,
        AlignContent::SpaceAround => TaffyAlignContent::SpaceAround,
    })
}

fn to_taffy_align_self(align: AlignSelf) -> Option<TaffyAlignSelf> {
    match align {
        AlignSelf::Auto => None, // inherit from parent
        AlignSelf::Stretch => Some(TaffyAlignSelf::Stretch),
        AlignSelf::FlexStart => Some(TaffyAlignSelf::FlexStart),
        AlignSelf::Center => Some(TaffyAlignSelf::Center),
        AlignSelf::FlexEnd => Some(TaffyAlignSelf::FlexEnd),
        AlignSelf::Baseline => Some(TaffyAlignSelf::Baseline),
    }
}

fn to_taffy_overflow(overflow: Overflow) -> TaffyOverflow {
    match overflow {
        Overflow::Visible => TaffyOverflow::Visible,
        Overflow::Hidden => TaffyOverflow::Clip,
        Overflow::Scroll => TaffyOverflow::Scroll,
    }
}

fn to_measure_space(space: AvailableSpace) -> MeasureSpace {
    match space {
        AvailableSpace::Definite(v) => MeasureSpace::Definite(v),
        AvailableSpace::MinContent => MeasureSpace::MinContent,
        AvailableSpace::MaxContent => MeasureSpace::MaxContent,
    }
}

// =============================================================================
// STYLE BUILDING
// =============================================================================

/// Build a Taffy style from flex properties.
pub(crate) fn build_style(props: &FlexProperties) -> Style {
    let [top, right, bottom, left] = props.position.map(to_taffy_lpa);
    Style {
        display: match props.display {
            Display::Flex => TaffyDisplay::Flex,
            Display::None => TaffyDisplay::None,
        },
        position: match props.position_type {
            PositionType::Relative => TaffyPosition::Relative,
            PositionType::Absolute => TaffyPosition::Absolute,
        },
        inset: Rect { top, right, bottom, left },

        // Flex container properties
        flex_direction: to_taffy_flex_direction(props.flex_direction),
        flex_wrap: to_taffy_flex_wrap(props.flex_wrap),
        justify_content: to_taffy_justify_content(props.justify_content),
        align_items: to_taffy_align_items(props.align_items),
        align_content: to_taffy_align_content(props.align_content),

        // Flex item properties
        flex_grow: props.flex_grow,
        flex_shrink: props.flex_shrink,
        flex_basis: to_taffy_dimension(props.flex_basis),
        align_self: to_taffy_align_self(props.align_self),

        // Dimensions
        size: Size {
            width: to_taffy_dimension(props.width),
            height: to_taffy_dimension(props.height),
        },
        min_size: Size {
            width: to_taffy_dimension(props.min_width),
            height: to_taffy_dimension(props.min_height),
        },
        max_size: Size {
            width: to_taffy_dimension(props.max_width),
            height: to_taffy_dimension(props.max_height),
        },
        aspect_ratio: props.aspect_ratio,

        margin: Rect {
            top: LengthPercentageAuto::Length(props.margin.top),
            right: LengthPercentageAuto::Length(props.margin.right),
            bottom: LengthPercentageAuto::Length(props.margin.bottom),
            left: LengthPercentageAuto::Length(props.margin.left),
        },
        padding: to_taffy_rect_lp(props.padding),
        border: to_taffy_rect_lp(props.border),
        gap: Size {
            width: LengthPercentage::Length(props.gap_column),
            height: LengthPercentage::Length(props.gap_row),
        },

        overflow: taffy::Point {
            x: to_taffy_overflow(props.overflow),
            y: to_taffy_overflow(props.overflow),
        },

        ..Default::default()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

fn engine_err(err: taffy::TaffyError) -> LayoutError {
    LayoutError::Engine(err.to_string())
}

/// Taffy-backed layout engine. Rounding is disabled; layout units are `f32`.
pub struct TaffyLayoutEngine {
    tree: TaffyTree<Rc<dyn CustomLayouting>>,
    nodes: HashMap<LayoutNodeId, NodeId>,
    next_id: u64,
}

impl Default for TaffyLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TaffyLayoutEngine {
    pub fn new() -> Self {
        let mut tree = TaffyTree::new();
        tree.disable_rounding();
        Self { tree, nodes: HashMap::new(), next_id: 1 }
    }

    fn taffy_node(&self, node: LayoutNodeId) -> Result<NodeId, LayoutError> {
        self.nodes.get(&node).copied().ok_or(LayoutError::UnknownNode(node.0))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl LayoutEngine for TaffyLayoutEngine {
    fn create_node(
        &mut self,
        parent: Option<LayoutNodeId>,
        constraints: NodeConstraints,
    ) -> Result<LayoutNodeId, LayoutError> {
        let parent = parent.map(|p| self.taffy_node(p)).transpose()?;
        let node = self.tree.new_leaf(build_style(&FlexProperties::default())).map_err(engine_err)?;
        if let Some(parent) = parent {
            let count = self.tree.child_count(parent);
            match constraints.index {
                Some(index) if index < count => {
                    self.tree.insert_child_at_index(parent, index, node).map_err(engine_err)?
                }
                _ => self.tree.add_child(parent, node).map_err(engine_err)?,
            }
        }
        let id = LayoutNodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        Ok(id)
    }

    fn remove_node(&mut self, node: LayoutNodeId) -> Result<(), LayoutError> {
        let taffy_node = self.taffy_node(node)?;
        self.tree.remove(taffy_node).map_err(engine_err)?;
        self.nodes.remove(&node);
        Ok(())
    }

    fn set_properties(&mut self, node: LayoutNodeId, properties: &FlexProperties) -> Result<(), LayoutError> {
        let taffy_node = self.taffy_node(node)?;
        self.tree.set_style(taffy_node, build_style(properties)).map_err(engine_err)
    }

    fn set_custom_layout(
        &mut self,
        node: LayoutNodeId,
        layout: Option<Rc<dyn CustomLayouting>>,
    ) -> Result<(), LayoutError> {
        let taffy_node = self.taffy_node(node)?;
        self.tree.set_node_context(taffy_node, layout).map_err(engine_err)
    }

    fn mark_dirty(&mut self, node: LayoutNodeId) -> Result<(), LayoutError> {
        let taffy_node = self.taffy_node(node)?;
        self.tree.mark_dirty(taffy_node).map_err(engine_err)
    }

    fn compute(&mut self, root: LayoutNodeId, available: Vec2) -> Result<(), LayoutError> {
        let root = self.taffy_node(root)?;
        let available = Size {
            width: AvailableSpace::Definite(available.x),
            height: AvailableSpace::Definite(available.y),
        };
        let measure_fn = |known: Size<Option<f32>>,
                          space: Size<AvailableSpace>,
                          _node: NodeId,
                          context: Option<&mut Rc<dyn CustomLayouting>>,
                          _style: &Style| {
            let Some(layout) = context else { return Size::ZERO };
            let measured = layout.measure(
                (known.width, known.height),
                (to_measure_space(space.width), to_measure_space(space.height)),
            );
            Size {
                width: known.width.unwrap_or(measured.x),
                height: known.height.unwrap_or(measured.y),
            }
        };
        self.tree.compute_layout_with_measure(root, available, measure_fn).map_err(engine_err)
    }

    fn computed_layout(&self, node: LayoutNodeId) -> Result<ComputedLayout, LayoutError> {
        let layout = self.tree.layout(self.taffy_node(node)?).map_err(engine_err)?;
        Ok(ComputedLayout {
            x: layout.location.x,
            y: layout.location.y,
            width: layout.size.width,
            height: layout.size.height,
            border: Inset::new(layout.border.top, layout.border.right, layout.border.bottom, layout.border.left),
            padding: Inset::new(
                layout.padding.top,
                layout.padding.right,
                layout.padding.bottom,
                layout.padding.left,
            ),
        })
    }
}

//! # Layout Bridge
//!
//! Flexbox layout for elements using [Taffy](https://github.com/DioxusLabs/taffy)
//! behind the [`LayoutEngine`] contract.
//!
//! # Architecture
//!
//! 1. Each element owns a [`FlexNode`] that derives [`FlexProperties`] from
//!    its resolved table and pushes them into the engine on change
//! 2. The [`LayoutRoot`] runs one pass per frame when dirty
//! 3. Results land in each node's [`FlexNodeState`] cells in one batch
//! 4. Transforms and clipping are derived from those cells per element
//!
//! Text and input elements register a [`CustomLayouting`] that measures
//! their content during the parent's pass.

mod clipping;
mod engine;
mod flex_node;
mod taffy_bridge;
mod transform;

pub use clipping::{ClipRect, child_clip_rect, is_clipped, is_visible};
pub use engine::{
    ComputedLayout, CustomLayouting, FlexProperties, LayoutEngine, LayoutNodeId, MeasureSpace,
    NodeConstraints,
};
pub use flex_node::{FlexNode, FlexNodeState, LayoutRoot};
pub use taffy_bridge::TaffyLayoutEngine;
pub use transform::{
    OriginX, OriginY, TransformProperties, global_matrix, local_matrix, world_matrix,
};

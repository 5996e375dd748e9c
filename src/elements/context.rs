//! Root and parent contexts handed down the element tree.

use std::rc::Rc;

use glam::{Mat4, Vec2};

use crate::config::RootConfig;
use crate::error::ErrorSink;
use crate::events::InteractionRegistry;
use crate::input::{BlurSuppression, TextInputPlatform};
use crate::layout::{ClipRect, LayoutNodeId, LayoutRoot};
use crate::order::{OrderInfo, OrderSequence};
use crate::properties::{MergedProperties, Transformer};
use crate::reactive::{Derived, Signal};
use crate::render::InstanceManager;
use crate::scene::SceneGraph;
use crate::scheduler::DeferredQueue;
use crate::text::TextShaper;

/// Per-root services shared by every element of one tree.
pub struct RootContext {
    pub config: RootConfig,
    pub layout: Rc<LayoutRoot>,
    pub instances: Rc<InstanceManager>,
    pub interaction: Rc<InteractionRegistry>,
    pub scene: Rc<dyn SceneGraph>,
    pub shaper: Rc<dyn TextShaper>,
    pub input_platform: Rc<dyn TextInputPlatform>,
    pub blur_suppression: Rc<BlurSuppression>,
    pub deferred: DeferredQueue,
    pub errors: ErrorSink,
    pub size: Signal<Vec2>,
    pub dark_mode: Signal<bool>,
    pub root_world: Signal<Mat4>,
    pub sequence: OrderSequence,
    /// Dark mode and breakpoint transformers, shared by all elements.
    pub transformers: Vec<Transformer>,
}

/// What a mounted element offers its children.
#[derive(Clone)]
pub struct ParentContext {
    pub root: Rc<RootContext>,
    pub node: LayoutNodeId,
    pub children_matrix: Derived<Mat4>,
    /// Clipping scope for the children.
    pub clipping_rect: Derived<Option<ClipRect>>,
    pub order_info: Derived<OrderInfo>,
    pub merged: Derived<MergedProperties>,
}

impl PartialEq for ParentContext {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.root, &other.root)
            && self.node == other.node
            && self.children_matrix.ptr_eq(&other.children_matrix)
            && self.merged.ptr_eq(&other.merged)
    }
}

impl std::fmt::Debug for ParentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentContext").field("node", &self.node).finish_non_exhaustive()
    }
}

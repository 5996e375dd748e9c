//! FlexNode - one layout node per element, with reactive layout outputs.
//!
//! A [`FlexNode`] pushes the flex subset of its element's resolved table into
//! the layout engine whenever it changes and marks the [`LayoutRoot`] dirty.
//! After each layout pass the root writes every node's [`FlexNodeState`]
//! inside one batch, so effects see a consistent layout.
//!
//! Layout outputs are in layout units. `relative_center` is the offset of the
//! node's center from its parent's center with y pointing up.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use indexmap::IndexMap;

use super::engine::{
    ComputedLayout, CustomLayouting, FlexProperties, LayoutEngine, LayoutNodeId, NodeConstraints,
};
use crate::error::{ErrorSink, LayoutError};
use crate::properties::MergedProperties;
use crate::reactive::{Derived, Effect, Signal, batch, derived, effect, signal};
use crate::types::Inset;

/// Reactive layout outputs of one node.
#[derive(Clone)]
pub struct FlexNodeState {
    pub size: Signal<Vec2>,
    pub border_inset: Signal<Inset>,
    pub padding_inset: Signal<Inset>,
    pub relative_center: Signal<Vec2>,
}

impl FlexNodeState {
    fn new() -> Self {
        Self {
            size: signal(Vec2::ZERO),
            border_inset: signal(Inset::ZERO),
            padding_inset: signal(Inset::ZERO),
            relative_center: signal(Vec2::ZERO),
        }
    }

    fn write(&self, layout: &ComputedLayout, center: Vec2) {
        self.size.set(layout.size());
        self.border_inset.set(layout.border);
        self.padding_inset.set(layout.padding);
        self.relative_center.set(center);
    }
}

struct NodeEntry {
    parent: Option<LayoutNodeId>,
    state: FlexNodeState,
}

/// Layout state shared by all nodes of one UI tree.
pub struct LayoutRoot {
    engine: RefCell<Box<dyn LayoutEngine>>,
    nodes: RefCell<IndexMap<LayoutNodeId, NodeEntry>>,
    root: Cell<Option<LayoutNodeId>>,
    dirty: Cell<bool>,
    passes: Cell<u64>,
    errors: ErrorSink,
}

impl LayoutRoot {
    pub fn new(engine: Box<dyn LayoutEngine>, errors: ErrorSink) -> Rc<Self> {
        Rc::new(Self {
            engine: RefCell::new(engine),
            nodes: RefCell::new(IndexMap::new()),
            root: Cell::new(None),
            dirty: Cell::new(true),
            passes: Cell::new(0),
            errors,
        })
    }

    /// Create a node under `parent`. The first parentless node becomes the layout root.
    pub fn create_node(
        self: &Rc<Self>,
        parent: Option<LayoutNodeId>,
        constraints: NodeConstraints,
    ) -> Result<FlexNode, LayoutError> {
        let id = self.engine.borrow_mut().create_node(parent, constraints)?;
        let state = FlexNodeState::new();
        self.nodes.borrow_mut().insert(id, NodeEntry { parent, state: state.clone() });
        if parent.is_none() && self.root.get().is_none() {
            self.root.set(Some(id));
        }
        self.mark_dirty();
        tracing::trace!(node = id.0, ?parent, "layout node created");
        Ok(FlexNode { id, root: self.clone(), state })
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Number of layout passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes.get()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    fn with_engine<R>(&self, f: impl FnOnce(&mut dyn LayoutEngine) -> Result<R, LayoutError>) -> Result<R, LayoutError> {
        let mut engine = self.engine.borrow_mut();
        f(engine.as_mut())
    }

    /// Run a layout pass if anything changed since the last one.
    ///
    /// Returns whether a pass ran. State cells are written after the engine
    /// is released, inside one batch.
    pub fn compute(&self, available: Vec2) -> Result<bool, LayoutError> {
        if !self.dirty.get() {
            return Ok(false);
        }
        let Some(root) = self.root.get() else {
            self.dirty.set(false);
            return Ok(false);
        };

        let updates = {
            let mut engine = self.engine.borrow_mut();
            engine.compute(root, available)?;

            let nodes = self.nodes.borrow();
            let mut layouts: IndexMap<LayoutNodeId, ComputedLayout> = IndexMap::with_capacity(nodes.len());
            for id in nodes.keys() {
                match engine.computed_layout(*id) {
                    Ok(layout) => {
                        layouts.insert(*id, layout);
                    }
                    Err(LayoutError::UnknownNode(_)) => {}
                    Err(err) => return Err(err),
                }
            }

            let mut updates = Vec::with_capacity(layouts.len());
            for (id, layout) in &layouts {
                let Some(entry) = nodes.get(id) else { continue };
                let center = match entry.parent.and_then(|p| layouts.get(&p)) {
                    Some(parent) => Vec2::new(
                        layout.x + layout.width * 0.5 - parent.width * 0.5,
                        -(layout.y + layout.height * 0.5 - parent.height * 0.5),
                    ),
                    None => Vec2::ZERO,
                };
                updates.push((entry.state.clone(), *layout, center));
            }
            updates
        };

        self.dirty.set(false);
        self.passes.set(self.passes.get() + 1);
        batch(|| {
            for (state, layout, center) in &updates {
                state.write(layout, *center);
            }
        });
        tracing::trace!(nodes = updates.len(), "layout pass");
        Ok(true)
    }

    fn remove(&self, id: LayoutNodeId) {
        if self.nodes.borrow_mut().shift_remove(&id).is_none() {
            return;
        }
        if self.root.get() == Some(id) {
            self.root.set(None);
        }
        match self.engine.borrow_mut().remove_node(id) {
            Ok(()) | Err(LayoutError::UnknownNode(_)) => {}
            Err(err) => self.errors.report(err),
        }
        self.mark_dirty();
    }
}

/// Handle to one element's layout node.
#[derive(Clone)]
pub struct FlexNode {
    id: LayoutNodeId,
    root: Rc<LayoutRoot>,
    state: FlexNodeState,
}

impl FlexNode {
    pub fn id(&self) -> LayoutNodeId {
        self.id
    }

    pub fn state(&self) -> &FlexNodeState {
        &self.state
    }

    pub fn layout_root(&self) -> &Rc<LayoutRoot> {
        &self.root
    }

    /// Push the flex subset of `merged` into the engine whenever it changes.
    pub fn bind_properties(&self, merged: &Derived<MergedProperties>) -> Effect {
        let merged = merged.clone();
        let flex: Derived<FlexProperties> = derived(move || merged.with(FlexProperties::from_merged));
        let node = self.clone();
        effect(move || {
            let props = flex.get();
            let result = node.root.with_engine(|engine| engine.set_properties(node.id, &props));
            match result {
                Ok(()) => node.root.mark_dirty(),
                Err(err) => node.root.errors.report(err),
            }
        })
    }

    pub fn set_custom_layout(&self, layout: Option<Rc<dyn CustomLayouting>>) -> Result<(), LayoutError> {
        self.root.with_engine(|engine| engine.set_custom_layout(self.id, layout))?;
        self.root.mark_dirty();
        Ok(())
    }

    /// Content measured by the custom layout changed.
    pub fn mark_content_dirty(&self) {
        match self.root.with_engine(|engine| engine.mark_dirty(self.id)) {
            Ok(()) => self.root.mark_dirty(),
            Err(err) => self.root.errors.report(err),
        }
    }

    /// Remove the node from the engine.
    pub fn destroy(&self) {
        self.root.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TaffyLayoutEngine;
    use crate::reactive::SignalExt;
    use crate::properties::{MergeSources, Properties, merge_properties};

    fn setup() -> Rc<LayoutRoot> {
        LayoutRoot::new(Box::new(TaffyLayoutEngine::new()), ErrorSink::new())
    }

    fn merged(style: Properties) -> (Signal<Properties>, Derived<MergedProperties>) {
        let style = signal(style);
        let merged = merge_properties(
            MergeSources {
                properties: signal(Properties::new()),
                style: style.clone(),
                defaults: signal(Properties::new()),
                inherited: None,
            },
            Vec::new(),
            None,
        );
        (style, merged)
    }

    #[test]
    fn test_layout_outputs_are_written() {
        let root = setup();
        let parent = root.create_node(None, NodeConstraints::default()).unwrap();
        let (_ps, parent_props) = merged(Properties::new().with("width", 100).with("height", 50).with("padding", 10));
        let _e1 = parent.bind_properties(&parent_props);

        let child = root.create_node(Some(parent.id()), NodeConstraints::default()).unwrap();
        let (_cs, child_props) = merged(Properties::new().with("flexGrow", 1));
        let _e2 = child.bind_properties(&child_props);

        assert!(root.compute(Vec2::new(500.0, 500.0)).unwrap());
        assert_eq!(parent.state().size.peek(), Vec2::new(100.0, 50.0));
        assert_eq!(parent.state().padding_inset.peek(), Inset::uniform(10.0));
        assert_eq!(child.state().size.peek(), Vec2::new(80.0, 30.0));
        assert_eq!(child.state().relative_center.peek(), Vec2::ZERO);

        assert!(!root.compute(Vec2::new(500.0, 500.0)).unwrap());
    }

    #[test]
    fn test_property_change_marks_dirty() {
        let root = setup();
        let node = root.create_node(None, NodeConstraints::default()).unwrap();
        let (style, props) = merged(Properties::new().with("width", 10).with("height", 10));
        let _e = node.bind_properties(&props);
        root.compute(Vec2::splat(100.0)).unwrap();
        assert!(!root.is_dirty());

        style.set(Properties::new().with("width", 20).with("height", 10));
        assert!(root.is_dirty());
        root.compute(Vec2::splat(100.0)).unwrap();
        assert_eq!(node.state().size.peek(), Vec2::new(20.0, 10.0));

        // Non-flex key: same FlexProperties, no push.
        style.set(Properties::new().with("width", 20).with("height", 10).with("color", "red"));
        assert!(!root.is_dirty());
    }

    #[test]
    fn test_relative_center_y_up() {
        let root = setup();
        let parent = root.create_node(None, NodeConstraints::default()).unwrap();
        let (_ps, pp) = merged(Properties::new().with("width", 100).with("height", 100).with("alignItems", "flex-start"));
        let _e1 = parent.bind_properties(&pp);
        let child = root.create_node(Some(parent.id()), NodeConstraints::default()).unwrap();
        let (_cs, cp) = merged(Properties::new().with("width", 20).with("height", 20));
        let _e2 = child.bind_properties(&cp);
        root.compute(Vec2::splat(100.0)).unwrap();

        // top-left child: center at (10, 10) in y-down, parent center (50, 50)
        assert_eq!(child.state().relative_center.peek(), Vec2::new(-40.0, 40.0));
    }

    #[test]
    fn test_destroy_removes_node() {
        let root = setup();
        let parent = root.create_node(None, NodeConstraints::default()).unwrap();
        let child = root.create_node(Some(parent.id()), NodeConstraints::default()).unwrap();
        assert_eq!(root.node_count(), 2);
        child.destroy();
        child.destroy();
        assert_eq!(root.node_count(), 1);
    }
}

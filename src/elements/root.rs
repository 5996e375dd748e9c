//! Root - owns the services of one UI tree and drives its frames.
//!
//! A root creates the layout root node, sized by its `size` cell, and hands
//! its children a context with the tree's shared services. Each call to
//! [`Root::frame`] runs the deferred queue, sweeps blur markers, runs a
//! layout pass when something changed, then uploads and draws the instance
//! groups.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec2};
use spark_signals::PropValue;

use super::context::{ParentContext, RootContext};
use super::element::{ParentHandle, ParentSource};
use crate::config::RootConfig;
use crate::error::{ErrorSink, UiError};
use crate::events::{DispatchOutcome, InteractionRegistry, PointerAction, PointerInput};
use crate::input::{BlurSuppression, TextInputPlatform, VirtualTextInputPlatform};
use crate::layout::{
    ClipRect, FlexNode, LayoutEngine, NodeConstraints, LayoutRoot, TaffyLayoutEngine, TransformProperties,
    child_clip_rect, local_matrix,
};
use crate::lifecycle::{Subscription, Subscriptions, unsubscribe_subscriptions};
use crate::order::{OrderInfo, OrderSequence};
use crate::properties::{
    MergeSources, MergedProperties, Properties, PropertyValue, merge_properties, root_transformers,
};
use crate::reactive::{Derived, Signal, SignalExt, derived, signal};
use crate::render::{GpuBackend, HeadlessGpu, INSTANCE_SIZE, InstanceManager};
use crate::scene::{HeadlessScene, SceneGraph};
use crate::scheduler::DeferredQueue;
use crate::text::{MonospaceShaper, TextShaper};
use crate::types::Overflow;

/// Platform services a root is built on.
pub struct RootServices {
    pub layout_engine: Box<dyn LayoutEngine>,
    pub gpu: Rc<dyn GpuBackend>,
    pub scene: Rc<dyn SceneGraph>,
    pub shaper: Rc<dyn TextShaper>,
    pub input_platform: Rc<dyn TextInputPlatform>,
}

impl RootServices {
    /// Taffy layout with headless GPU, scene and text input.
    pub fn headless() -> Self {
        Self {
            layout_engine: Box::new(TaffyLayoutEngine::new()),
            gpu: Rc::new(HeadlessGpu::new(INSTANCE_SIZE)),
            scene: Rc::new(HeadlessScene::new()),
            shaper: Rc::new(MonospaceShaper),
            input_platform: Rc::new(VirtualTextInputPlatform::new()),
        }
    }

    pub fn with_gpu(mut self, gpu: Rc<dyn GpuBackend>) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn with_scene(mut self, scene: Rc<dyn SceneGraph>) -> Self {
        self.scene = scene;
        self
    }

    pub fn with_shaper(mut self, shaper: Rc<dyn TextShaper>) -> Self {
        self.shaper = shaper;
        self
    }

    pub fn with_input_platform(mut self, platform: Rc<dyn TextInputPlatform>) -> Self {
        self.input_platform = platform;
        self
    }

    pub fn with_layout_engine(mut self, engine: Box<dyn LayoutEngine>) -> Self {
        self.layout_engine = engine;
        self
    }
}

impl Default for RootServices {
    fn default() -> Self {
        Self::headless()
    }
}

/// What one [`Root::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub deferred_tasks: usize,
    pub blur_markers_swept: usize,
    pub layout_ran: bool,
    pub groups_drawn: usize,
}

/// Root of one UI tree.
pub struct Root {
    context: Rc<RootContext>,
    node: FlexNode,
    merged: Derived<MergedProperties>,
    style: Signal<Properties>,
    children: Signal<Option<ParentContext>>,
    subscriptions: RefCell<Subscriptions>,
}

impl Root {
    /// Root on headless services.
    pub fn new(config: RootConfig) -> Result<Self, UiError> {
        Self::with_services(config, RootServices::headless())
    }

    pub fn with_services(config: RootConfig, services: RootServices) -> Result<Self, UiError> {
        let errors = ErrorSink::new();
        let size = signal(config.size);
        let dark_mode = signal(config.dark_mode);
        let transformers = root_transformers(&dark_mode, &size);
        let layout = LayoutRoot::new(services.layout_engine, errors.clone());
        let instances = Rc::new(InstanceManager::new(services.gpu, &config));

        let context = Rc::new(RootContext {
            layout: layout.clone(),
            instances,
            interaction: Rc::new(InteractionRegistry::new()),
            scene: services.scene,
            shaper: services.shaper,
            input_platform: services.input_platform,
            blur_suppression: Rc::new(BlurSuppression::new()),
            deferred: DeferredQueue::new(),
            errors,
            size: size.clone(),
            dark_mode,
            root_world: signal(Mat4::IDENTITY),
            sequence: OrderSequence::new(),
            transformers: transformers.clone(),
            config,
        });

        let defaults = {
            let (width, height) = (size.clone(), size);
            Properties::new()
                .with("width", PropValue::getter(move || PropertyValue::from(width.get().x)))
                .with("height", PropValue::getter(move || PropertyValue::from(height.get().y)))
        };
        let style = signal(Properties::new());
        let merged = merge_properties(
            MergeSources {
                properties: signal(Properties::new()),
                style: style.clone(),
                defaults: signal(defaults),
                inherited: None,
            },
            transformers,
            None,
        );

        let node = layout.create_node(None, NodeConstraints::default())?;
        let mut subscriptions = Subscriptions::new();
        {
            let node = node.clone();
            subscriptions.push(Subscription::new(move || node.destroy()));
        }
        subscriptions.push(node.bind_properties(&merged).into());

        let state = node.state().clone();
        let children_matrix = {
            let (merged, size) = (merged.clone(), state.size.clone());
            let transform = derived(move || merged.with(TransformProperties::from_merged));
            derived(move || local_matrix(Vec2::ZERO, size.get(), &transform.get()))
        };
        let clipping_rect = {
            let (merged, matrix, size) = (merged.clone(), children_matrix.clone(), state.size.clone());
            derived(move || {
                let clips = merged.with(|m| m.keyword("overflow", Overflow::parse).clips());
                child_clip_rect(None, ClipRect::from_matrix(&matrix.get(), size.get()), clips)
            })
        };
        let children = signal(Some(ParentContext {
            root: context.clone(),
            node: node.id(),
            children_matrix,
            clipping_rect,
            order_info: derived(OrderInfo::base),
            merged: merged.clone(),
        }));

        tracing::debug!(node = node.id().0, size = ?context.config.size, "root created");
        Ok(Self { context, node, merged, style, children, subscriptions: RefCell::new(subscriptions) })
    }

    pub fn context(&self) -> &Rc<RootContext> {
        &self.context
    }

    pub fn node(&self) -> &FlexNode {
        &self.node
    }

    pub fn merged_properties(&self) -> &Derived<MergedProperties> {
        &self.merged
    }

    pub fn errors(&self) -> &ErrorSink {
        &self.context.errors
    }

    pub fn instances(&self) -> &Rc<InstanceManager> {
        &self.context.instances
    }

    pub fn interaction(&self) -> &Rc<InteractionRegistry> {
        &self.context.interaction
    }

    pub fn layout(&self) -> &Rc<LayoutRoot> {
        &self.context.layout
    }

    /// Merge `style` into the root's style, or replace it.
    pub fn set_style(&self, style: Properties, replace: bool) {
        if replace {
            self.style.set(style);
        } else {
            self.style.update(|current| current.extend(&style));
        }
    }

    pub fn size(&self) -> Vec2 {
        self.context.size.peek()
    }

    pub fn set_size(&self, size: Vec2) {
        self.context.size.set(size);
    }

    pub fn set_dark_mode(&self, dark_mode: bool) {
        self.context.dark_mode.set(dark_mode);
    }

    /// World transform of the tree in the host scene.
    pub fn set_world_matrix(&self, matrix: Mat4) {
        self.context.root_world.set(matrix);
    }

    /// Run every task deferred so far. Tasks deferred while running wait for the next call.
    pub fn run_deferred(&self) -> usize {
        self.context.deferred.run()
    }

    /// Dispatch pointer input to the interaction panels.
    ///
    /// A pointer-down that no input claimed blurs the focused text input.
    pub fn dispatch_pointer(&self, input: PointerInput) -> DispatchOutcome {
        let outcome = self.context.interaction.dispatch(input);
        if input.action == PointerAction::Down && !self.context.blur_suppression.take(outcome.event_id) {
            self.context.input_platform.blur_active();
        }
        outcome
    }

    /// One frame: deferred tasks, blur sweep, layout, upload, draw.
    pub fn frame(&self) -> Result<FrameStats, UiError> {
        let deferred_tasks = self.run_deferred();
        let blur_markers_swept = self.context.blur_suppression.sweep();
        if let Some(err) = self.context.errors.take_first() {
            return Err(err);
        }

        let layout_ran = self.context.layout.compute(self.context.size.peek())?;
        if let Some(err) = self.context.errors.take_first() {
            return Err(err);
        }

        self.context.instances.flush()?;
        let groups_drawn = self.context.instances.draw()?;
        Ok(FrameStats { deferred_tasks, blur_markers_swept, layout_ran, groups_drawn })
    }

    /// Unmount all children and release the root node.
    pub fn destroy(&self) {
        self.children.set(None);
        let failures = unsubscribe_subscriptions(&mut self.subscriptions.borrow_mut());
        if failures > 0 {
            tracing::warn!(failures, "root teardown had failures");
        }
    }
}

impl ParentHandle for Root {
    fn as_parent(&self) -> ParentSource {
        ParentSource(self.children.clone())
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Container;
    use crate::types::Dimension;

    fn setup() -> Root {
        let config = RootConfig::default().with_size(200.0, 100.0);
        match Root::new(config) {
            Ok(root) => root,
            Err(err) => panic!("root: {err}"),
        }
    }

    #[test]
    fn test_root_node_follows_size() {
        let root = setup();
        let stats = root.frame().unwrap();
        assert!(stats.layout_ran);
        assert_eq!(root.node().state().size.peek(), Vec2::new(200.0, 100.0));

        root.set_size(Vec2::new(300.0, 120.0));
        let stats = root.frame().unwrap();
        assert!(stats.layout_ran);
        assert_eq!(root.node().state().size.peek(), Vec2::new(300.0, 120.0));
        assert!(!root.frame().unwrap().layout_ran);
    }

    #[test]
    fn test_children_mount_and_unmount_with_root() {
        let root = setup();
        let child = Container::with_style(
            Properties::new().with("width", Dimension::Points(50.0)).with("height", Dimension::Points(20.0)),
        );
        child.set_parent(Some(root.as_parent()));
        assert!(child.is_mounted());
        assert_eq!(root.layout().node_count(), 2);

        root.frame().unwrap();
        let internals = child.internals().unwrap();
        assert_eq!(internals.node.state().size.peek(), Vec2::new(50.0, 20.0));

        root.destroy();
        assert!(!child.is_mounted());
        assert_eq!(root.layout().node_count(), 0);
    }
}

//! Element - the mount lifecycle shared by every element kind.
//!
//! An element owns its property sources and listeners from creation on, but
//! only builds its internals (merged table, layout node, transforms, order,
//! surfaces, interaction panel) while it has a mounted parent. The mount runs
//! inside one effect that reads the parent's children context: when the
//! parent changes or unmounts, the previous mount is torn down completely
//! before the next one starts.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::{Mat4, Vec2};

use super::context::{ParentContext, RootContext};
use crate::events::{EventHandlers, InteractionPanel, InteractionState, PanelId};
use crate::layout::{
    ClipRect, FlexNode, NodeConstraints, TransformProperties, child_clip_rect, global_matrix, is_clipped,
    is_visible, local_matrix, world_matrix,
};
use crate::lifecycle::{Initializer, Subscription, Subscriptions, initialize, initializer, unsubscribe_subscriptions};
use crate::order::{GroupDependencies, OrderInfo, computed_order_info};
use crate::properties::{
    ExtraVisitor, MergeSources, MergedProperties, Properties, PropertyValue, get_computed_property,
    interaction_transformers, merge_properties,
};
use crate::reactive::{Derived, Effect, Signal, SignalExt, derived, effect, on_cleanup, signal, untrack};
use crate::render::{SurfaceGeometry, instanced_panel};
use crate::scene::SceneObjectId;
use crate::text::{GlyphLayout, TextBox};
use crate::types::{Display, ElementType, Overflow, Visibility};

// =============================================================================
// LISTENERS
// =============================================================================

/// Callbacks of one element.
#[derive(Clone, Default)]
pub struct Listeners {
    pub handlers: EventHandlers,
    pub on_size_change: Option<Rc<dyn Fn(Vec2)>>,
    pub on_is_clipped_change: Option<Rc<dyn Fn(bool)>>,
    /// Inputs only.
    pub on_value_change: Option<Rc<dyn Fn(&str)>>,
    /// Inputs only.
    pub on_focus_change: Option<Rc<dyn Fn(bool)>>,
}

fn same_callback<T: ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for Listeners {
    fn eq(&self, other: &Self) -> bool {
        self.handlers == other.handlers
            && same_callback(&self.on_size_change, &other.on_size_change)
            && same_callback(&self.on_is_clipped_change, &other.on_is_clipped_change)
            && same_callback(&self.on_value_change, &other.on_value_change)
            && same_callback(&self.on_focus_change, &other.on_focus_change)
    }
}

// =============================================================================
// INTERNALS
// =============================================================================

/// Glyph surface state of text and input elements.
#[derive(Clone)]
pub struct TextInternals {
    pub layout: Derived<GlyphLayout>,
    pub text_box: Derived<TextBox>,
    pub order_info: Derived<OrderInfo>,
}

/// Everything an element builds while mounted.
#[derive(Clone)]
pub struct ElementInternals {
    pub element_type: ElementType,
    pub merged_properties: Derived<MergedProperties>,
    pub node: FlexNode,
    pub global_matrix: Derived<Mat4>,
    pub world_matrix: Derived<Mat4>,
    pub is_clipped: Derived<bool>,
    pub is_visible: Derived<bool>,
    /// Scope the element's own surfaces are clipped by.
    pub clipping_rect: Derived<Option<ClipRect>>,
    /// Order of the background panel.
    pub order_info: Derived<OrderInfo>,
    pub interaction_panel: PanelId,
    pub interaction: InteractionState,
    pub handlers: Derived<EventHandlers>,
    pub text: Option<TextInternals>,
}

// =============================================================================
// BODY
// =============================================================================

/// Shared state a body builds its surfaces from.
pub(crate) struct BodyContext<'a> {
    pub root: &'a Rc<RootContext>,
    pub merged: &'a Derived<MergedProperties>,
    pub node: &'a FlexNode,
    pub geometry: &'a SurfaceGeometry,
    pub visible: &'a Derived<bool>,
    pub order: &'a Derived<OrderInfo>,
    pub listeners: &'a Signal<Listeners>,
}

#[derive(Default)]
pub(crate) struct BodyOutput {
    pub initializers: Vec<Initializer>,
    pub handlers: Option<Derived<EventHandlers>>,
    pub text: Option<TextInternals>,
}

/// Kind specific part of an element.
pub(crate) trait ElementBody {
    fn element_type(&self) -> ElementType {
        ElementType::Panel
    }

    fn extra_visitor(&self) -> Option<ExtraVisitor> {
        None
    }

    /// Defaults the element supplies itself; user defaults win over them.
    fn internal_defaults(&self) -> Option<Derived<Properties>> {
        None
    }

    fn focus_condition(&self) -> Option<Derived<bool>> {
        None
    }

    fn build(&self, cx: &BodyContext<'_>) -> BodyOutput;
}

// =============================================================================
// PARENT SOURCES
// =============================================================================

/// Children context cell of a mounted (or not yet mounted) parent.
#[derive(Clone)]
pub struct ParentSource(pub(crate) Signal<Option<ParentContext>>);

impl PartialEq for ParentSource {
    fn eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

/// Anything elements can be attached to.
pub trait ParentHandle {
    fn as_parent(&self) -> ParentSource;
}

// =============================================================================
// ELEMENT
// =============================================================================

struct ElementInner {
    body: Box<dyn ElementBody>,
    properties: Signal<Properties>,
    style: Signal<Properties>,
    defaults: Signal<Properties>,
    listeners: Signal<Listeners>,
    parent: Signal<Option<ParentSource>>,
    children_context: Signal<Option<ParentContext>>,
    internals: RefCell<Option<ElementInternals>>,
    mount: RefCell<Option<Effect>>,
}

impl Drop for ElementInner {
    fn drop(&mut self) {
        if let Some(mount) = self.mount.get_mut().take() {
            mount.dispose();
        }
    }
}

/// A node of the element tree. Cloning shares the element.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl Element {
    pub(crate) fn with_body(body: impl ElementBody + 'static) -> Self {
        let inner = Rc::new(ElementInner {
            body: Box::new(body),
            properties: signal(Properties::new()),
            style: signal(Properties::new()),
            defaults: signal(Properties::new()),
            listeners: signal(Listeners::default()),
            parent: signal(None),
            children_context: signal(None),
            internals: RefCell::new(None),
            mount: RefCell::new(None),
        });
        let weak = Rc::downgrade(&inner);
        let mount = effect(move || mount_effect(&weak));
        *inner.mount.borrow_mut() = Some(mount);
        Self { inner }
    }

    /// Internals of the current mount.
    pub fn internals(&self) -> Option<ElementInternals> {
        self.inner.internals.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.internals.borrow().is_some()
    }

    /// Resolved value of `key`, untracked. `Null` while unmounted.
    pub fn get_computed_property(&self, key: &str) -> PropertyValue {
        match self.internals() {
            Some(internals) => get_computed_property(&internals.merged_properties, key, |m, key| m.value(key)),
            None => PropertyValue::Null,
        }
    }

    pub fn get_style(&self) -> Properties {
        self.inner.style.peek()
    }

    /// Merge `style` into the current style, or replace it.
    pub fn set_style(&self, style: Properties, replace: bool) {
        if replace {
            self.inner.style.set(style);
        } else {
            self.inner.style.update(|current| current.extend(&style));
        }
    }

    pub fn set_properties(&self, properties: Properties) {
        self.inner.properties.set(properties);
    }

    pub fn set_default_properties(&self, defaults: Properties) {
        self.inner.defaults.set(defaults);
    }

    pub fn set_listeners(&self, listeners: Listeners) {
        self.inner.listeners.set(listeners);
    }

    /// Attach to a parent, or detach with `None`. Re-parenting remounts.
    pub fn set_parent(&self, parent: Option<ParentSource>) {
        self.inner.parent.set(parent);
    }

    /// Unmount for good. Further calls are no-ops.
    pub fn destroy(&self) {
        let mount = self.inner.mount.borrow_mut().take();
        if let Some(mount) = mount {
            mount.dispose();
        }
        self.inner.parent.set(None);
    }

    pub(crate) fn children_context(&self) -> &Signal<Option<ParentContext>> {
        &self.inner.children_context
    }
}

impl ParentHandle for Element {
    fn as_parent(&self) -> ParentSource {
        ParentSource(self.inner.children_context.clone())
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("element_type", &self.inner.body.element_type())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

// =============================================================================
// MOUNT
// =============================================================================

fn mount_effect(weak: &Weak<ElementInner>) {
    let Some(inner) = weak.upgrade() else { return };
    let Some(source) = inner.parent.get() else { return };
    let Some(parent) = source.0.get() else { return };

    let Some((internals, children, mut subscriptions)) = untrack(|| mount(&inner, &parent)) else {
        return;
    };
    *inner.internals.borrow_mut() = Some(internals);
    inner.children_context.set(Some(children));

    let weak = weak.clone();
    on_cleanup(move || {
        if let Some(inner) = weak.upgrade() {
            inner.children_context.set(None);
            inner.internals.borrow_mut().take();
        }
        let failures = unsubscribe_subscriptions(&mut subscriptions);
        tracing::trace!(failures, "element unmounted");
    });
}

fn listener_effect<T: Clone + PartialEq + 'static>(
    value: Derived<T>,
    listeners: Signal<Listeners>,
    pick: fn(&Listeners) -> Option<Rc<dyn Fn(T)>>,
) -> Effect {
    let first = Cell::new(true);
    effect(move || {
        let value = value.get();
        if first.replace(false) {
            return;
        }
        if let Some(callback) = listeners.with_untracked(pick) {
            untrack(|| callback(value));
        }
    })
}

fn mount(inner: &ElementInner, parent: &ParentContext) -> Option<(ElementInternals, ParentContext, Subscriptions)> {
    let root = &parent.root;
    let body = inner.body.as_ref();
    let mut subscriptions = Subscriptions::new();

    let defaults = match body.internal_defaults() {
        Some(internal) => {
            let combined = signal(Properties::new());
            let (user, target) = (inner.defaults.clone(), combined.clone());
            let combine = effect(move || {
                let mut defaults = internal.get();
                user.with(|user| defaults.extend(user));
                target.set(defaults);
            });
            subscriptions.push(combine.into());
            combined
        }
        None => inner.defaults.clone(),
    };

    let interaction = InteractionState::new();
    let mut transformers = root.transformers.clone();
    transformers.extend(interaction_transformers(
        interaction.is_hovered(),
        interaction.is_active(),
        body.focus_condition(),
    ));
    let merged = merge_properties(
        MergeSources {
            properties: inner.properties.clone(),
            style: inner.style.clone(),
            defaults,
            inherited: Some(parent.merged.clone()),
        },
        transformers,
        body.extra_visitor(),
    );

    let node = match root.layout.create_node(Some(parent.node), NodeConstraints::default()) {
        Ok(node) => node,
        Err(err) => {
            root.errors.report(err);
            unsubscribe_subscriptions(&mut subscriptions);
            return None;
        }
    };
    {
        let node = node.clone();
        subscriptions.push(Subscription::new(move || node.destroy()));
    }
    subscriptions.push(node.bind_properties(&merged).into());

    let state = node.state().clone();
    let global = {
        let (merged, state, parent_matrix) = (merged.clone(), state.clone(), parent.children_matrix.clone());
        let transform = derived(move || merged.with(TransformProperties::from_merged));
        derived(move || {
            let local = local_matrix(state.relative_center.get(), state.size.get(), &transform.get());
            global_matrix(&parent_matrix.get(), &local)
        })
    };
    let world = {
        let (root_world, global) = (root.root_world.clone(), global.clone());
        let pixel_size = root.config.pixel_size;
        derived(move || world_matrix(&root_world.get(), pixel_size, &global.get()))
    };
    let own_rect = {
        let (global, size) = (global.clone(), state.size.clone());
        derived(move || ClipRect::from_matrix(&global.get(), size.get()))
    };
    let parent_clip = parent.clipping_rect.clone();
    let clipped = {
        let (own_rect, parent_clip) = (own_rect.clone(), parent_clip.clone());
        derived(move || is_clipped(own_rect.get(), parent_clip.get()))
    };
    let children_clip = {
        let (merged, own_rect, parent_clip) = (merged.clone(), own_rect.clone(), parent_clip.clone());
        derived(move || {
            let clips = merged.with(|m| m.keyword("overflow", Overflow::parse).clips());
            child_clip_rect(parent_clip.get(), own_rect.get(), clips)
        })
    };
    let visible = {
        let (merged, size, clipped) = (merged.clone(), state.size.clone(), clipped.clone());
        derived(move || {
            let (display, visibility) =
                merged.with(|m| (m.keyword("display", Display::parse), m.keyword("visibility", Visibility::parse)));
            is_visible(display, visibility, size.get(), clipped.get())
        })
    };

    let group_deps = {
        let (merged, parent_clip) = (merged.clone(), parent_clip.clone());
        derived(move || {
            let clip = parent_clip.get();
            merged.with(|m| GroupDependencies::from_merged(m, clip))
        })
    };
    let order = computed_order_info(
        Some(&merged),
        body.element_type(),
        &group_deps,
        Some(&parent.order_info),
        root.sequence.next(),
    );

    let geometry = SurfaceGeometry {
        global_matrix: global.clone(),
        size: state.size.clone(),
        border_inset: state.border_inset.clone(),
        clipping_rect: parent_clip.clone(),
    };

    let mut initializers: Vec<Initializer> = Vec::new();
    {
        let (instances, merged, order, visible, geometry, errors) = (
            root.instances.clone(),
            merged.clone(),
            order.clone(),
            visible.clone(),
            geometry.clone(),
            root.errors.clone(),
        );
        initializers.push(initializer(move |_| {
            Some(instanced_panel(&instances, &merged, &order, &visible, &geometry, &errors).into())
        }));
    }

    let output = body.build(&BodyContext {
        root,
        merged: &merged,
        node: &node,
        geometry: &geometry,
        visible: &visible,
        order: &order,
        listeners: &inner.listeners,
    });
    initializers.extend(output.initializers);

    let handlers = {
        let listeners = inner.listeners.clone();
        let body_handlers = output.handlers;
        derived(move || {
            let user = listeners.with(|l| l.handlers.clone());
            match &body_handlers {
                Some(body) => user.merge(&body.get()),
                None => user,
            }
        })
    };

    let panel_id = root.interaction.register(InteractionPanel {
        global_matrix: global.clone(),
        size: state.size.clone(),
        clipping_rect: parent_clip.clone(),
        visible: visible.clone(),
        order: order.clone(),
        handlers: handlers.clone(),
        state: interaction.clone(),
    });
    {
        let registry = root.interaction.clone();
        subscriptions.push(Subscription::new(move || registry.unregister(panel_id)));
    }

    {
        let (scene, world) = (root.scene.clone(), world.clone());
        let object = SceneObjectId(node.id().0);
        initializers.push(initializer(move |subscriptions| {
            let scene_for_removal = scene.clone();
            subscriptions.push(effect(move || scene.set_world_matrix(object, world.get())).into());
            Some(Subscription::new(move || scene_for_removal.remove_object(object)))
        }));
    }

    {
        let listeners = inner.listeners.clone();
        let size = {
            let size = state.size.clone();
            derived(move || size.get())
        };
        let clipped = clipped.clone();
        initializers.push(initializer(move |subscriptions| {
            subscriptions.push(listener_effect(size, listeners.clone(), |l| l.on_size_change.clone()).into());
            Some(listener_effect(clipped, listeners, |l| l.on_is_clipped_change.clone()).into())
        }));
    }

    initialize(initializers, &mut subscriptions);

    let internals = ElementInternals {
        element_type: body.element_type(),
        merged_properties: merged.clone(),
        node: node.clone(),
        global_matrix: global.clone(),
        world_matrix: world,
        is_clipped: clipped,
        is_visible: visible,
        clipping_rect: parent_clip,
        order_info: order.clone(),
        interaction_panel: panel_id,
        interaction,
        handlers,
        text: output.text,
    };
    let children = ParentContext {
        root: root.clone(),
        node: node.id(),
        children_matrix: global,
        clipping_rect: children_clip,
        order_info: order,
        merged,
    };
    tracing::trace!(node = node.id().0, element_type = ?body.element_type(), "element mounted");
    Some((internals, children, subscriptions))
}

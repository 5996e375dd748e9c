//! Pointer events, interaction panels and hit testing.
//!
//! Every element registers one interaction panel with its root. A pointer
//! dispatch hit tests all panels in root layout space, then:
//!
//! - emits leave/enter for the panels the pointer stopped/started covering
//! - invokes the action's handler on every hit panel, topmost first, until
//!   a handler stops propagation
//! - tracks hovered and active pointer ids per panel, which drive the
//!   `hover` and `active` property transformers
//!
//! # Example
//!
//! ```ignore
//! let handlers = EventHandlers {
//!     on_click: Some(Rc::new(|event: &PointerEvent| println!("clicked at {:?}", event.uv))),
//!     ..Default::default()
//! };
//! element.set_listeners(Listeners { handlers, ..Default::default() });
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use bitflags::bitflags;
use glam::{Mat4, Vec2};
use slotmap::{SlotMap, new_key_type};

use crate::layout::ClipRect;
use crate::order::OrderInfo;
use crate::reactive::{Derived, Signal, SignalExt, batch, derived, signal};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Up,
    Move,
    /// Pointer left the whole surface.
    Cancel,
}

/// Raw pointer input, in root layout space (origin at the root center, y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub pointer_id: u32,
    pub action: PointerAction,
    pub point: Vec2,
}

impl PointerInput {
    pub fn down(pointer_id: u32, point: Vec2) -> Self {
        Self { pointer_id, action: PointerAction::Down, point }
    }

    pub fn up(pointer_id: u32, point: Vec2) -> Self {
        Self { pointer_id, action: PointerAction::Up, point }
    }

    pub fn move_to(pointer_id: u32, point: Vec2) -> Self {
        Self { pointer_id, action: PointerAction::Move, point }
    }

    pub fn cancel(pointer_id: u32) -> Self {
        Self { pointer_id, action: PointerAction::Cancel, point: Vec2::ZERO }
    }
}

bitflags! {
    /// Propagation state shared by all deliveries of one event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventFlags: u8 {
        const STOPPED = 1 << 0;
        const DEFAULT_PREVENTED = 1 << 1;
    }
}

/// One delivery of a pointer event to a panel.
#[derive(Debug, Clone)]
pub struct PointerEvent {
    /// Identity of the dispatch; equal for every panel it reaches.
    pub id: u64,
    pub pointer_id: u32,
    pub action: PointerAction,
    /// Root layout space.
    pub point: Vec2,
    /// Panel-local point, center origin, y up.
    pub local: Vec2,
    /// Surface UV, origin bottom-left.
    pub uv: Vec2,
    flags: Rc<Cell<EventFlags>>,
}

impl PointerEvent {
    pub fn stop_propagation(&self) {
        self.flags.set(self.flags.get() | EventFlags::STOPPED);
    }

    /// Prevent the default reaction; also stops propagation.
    pub fn prevent_default(&self) {
        self.flags.set(self.flags.get() | EventFlags::DEFAULT_PREVENTED | EventFlags::STOPPED);
    }

    pub fn flags(&self) -> EventFlags {
        self.flags.get()
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.get().contains(EventFlags::STOPPED)
    }
}

pub type PointerHandler = Rc<dyn Fn(&PointerEvent)>;

/// Pointer handlers of one element.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub on_pointer_down: Option<PointerHandler>,
    pub on_pointer_up: Option<PointerHandler>,
    pub on_pointer_move: Option<PointerHandler>,
    pub on_pointer_enter: Option<PointerHandler>,
    pub on_pointer_leave: Option<PointerHandler>,
    pub on_click: Option<PointerHandler>,
}

fn same_handler(a: &Option<PointerHandler>, b: &Option<PointerHandler>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn chain(first: &Option<PointerHandler>, second: &Option<PointerHandler>) -> Option<PointerHandler> {
    match (first, second) {
        (Some(a), Some(b)) => {
            let (a, b) = (a.clone(), b.clone());
            Some(Rc::new(move |event: &PointerEvent| {
                a(event);
                b(event);
            }))
        }
        (Some(handler), None) | (None, Some(handler)) => Some(handler.clone()),
        (None, None) => None,
    }
}

impl PartialEq for EventHandlers {
    fn eq(&self, other: &Self) -> bool {
        same_handler(&self.on_pointer_down, &other.on_pointer_down)
            && same_handler(&self.on_pointer_up, &other.on_pointer_up)
            && same_handler(&self.on_pointer_move, &other.on_pointer_move)
            && same_handler(&self.on_pointer_enter, &other.on_pointer_enter)
            && same_handler(&self.on_pointer_leave, &other.on_pointer_leave)
            && same_handler(&self.on_click, &other.on_click)
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_pointer_down", &self.on_pointer_down.is_some())
            .field("on_pointer_up", &self.on_pointer_up.is_some())
            .field("on_pointer_move", &self.on_pointer_move.is_some())
            .field("on_click", &self.on_click.is_some())
            .finish_non_exhaustive()
    }
}

impl EventHandlers {
    /// Handlers calling `self` first, then `other`.
    pub fn merge(&self, other: &EventHandlers) -> EventHandlers {
        EventHandlers {
            on_pointer_down: chain(&self.on_pointer_down, &other.on_pointer_down),
            on_pointer_up: chain(&self.on_pointer_up, &other.on_pointer_up),
            on_pointer_move: chain(&self.on_pointer_move, &other.on_pointer_move),
            on_pointer_enter: chain(&self.on_pointer_enter, &other.on_pointer_enter),
            on_pointer_leave: chain(&self.on_pointer_leave, &other.on_pointer_leave),
            on_click: chain(&self.on_click, &other.on_click),
        }
    }

    fn for_action(&self, action: PointerAction) -> Option<&PointerHandler> {
        match action {
            PointerAction::Down => self.on_pointer_down.as_ref(),
            PointerAction::Up => self.on_pointer_up.as_ref(),
            PointerAction::Move => self.on_pointer_move.as_ref(),
            PointerAction::Cancel => None,
        }
    }
}

// =============================================================================
// INTERACTION STATE
// =============================================================================

/// Pointer ids currently hovering and pressing one element.
#[derive(Clone)]
pub struct InteractionState {
    pub hovered: Signal<Vec<u32>>,
    pub active: Signal<Vec<u32>>,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self { hovered: signal(Vec::new()), active: signal(Vec::new()) }
    }
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hovered(&self) -> Derived<bool> {
        let hovered = self.hovered.clone();
        derived(move || hovered.with(|ids| !ids.is_empty()))
    }

    pub fn is_active(&self) -> Derived<bool> {
        let active = self.active.clone();
        derived(move || active.with(|ids| !ids.is_empty()))
    }
}

fn add_pointer(ids: &Signal<Vec<u32>>, pointer_id: u32) {
    if !ids.with_untracked(|ids| ids.contains(&pointer_id)) {
        ids.update(|ids| ids.push(pointer_id));
    }
}

fn remove_pointer(ids: &Signal<Vec<u32>>, pointer_id: u32) {
    if ids.with_untracked(|ids| ids.contains(&pointer_id)) {
        ids.update(|ids| ids.retain(|id| *id != pointer_id));
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

new_key_type! {
    pub struct PanelId;
}

/// Hit-testable surface of one element.
#[derive(Clone)]
pub struct InteractionPanel {
    pub global_matrix: Derived<Mat4>,
    pub size: Signal<Vec2>,
    pub clipping_rect: Derived<Option<ClipRect>>,
    pub visible: Derived<bool>,
    pub order: Derived<OrderInfo>,
    pub handlers: Derived<EventHandlers>,
    pub state: InteractionState,
}

/// Local point and UV where `point` hits `panel`.
fn hit(panel: &InteractionPanel, point: Vec2) -> Option<(Vec2, Vec2)> {
    if !panel.visible.with_untracked(|v| *v) {
        return None;
    }
    let size = panel.size.peek();
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    if panel.clipping_rect.with_untracked(|clip| clip.is_some_and(|clip| !clip.contains(point))) {
        return None;
    }
    let matrix = panel.global_matrix.with_untracked(|m| *m);
    if matrix.determinant().abs() <= f32::EPSILON {
        return None;
    }
    let local = matrix.inverse().transform_point3(point.extend(0.0)).truncate();
    let half = size * 0.5;
    if local.x.abs() > half.x || local.y.abs() > half.y {
        return None;
    }
    Some((local, local / size + Vec2::splat(0.5)))
}

struct Hit {
    id: PanelId,
    local: Vec2,
    uv: Vec2,
    order: OrderInfo,
    handlers: EventHandlers,
    state: InteractionState,
}

#[derive(Default)]
struct PointerState {
    hovered: Vec<PanelId>,
    pressed: Vec<PanelId>,
}

/// What a dispatch reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub event_id: u64,
    /// Hit panels, topmost first.
    pub hits: Vec<PanelId>,
    pub flags: EventFlags,
}

impl DispatchOutcome {
    pub fn target(&self) -> Option<PanelId> {
        self.hits.first().copied()
    }
}

#[derive(Default)]
pub struct InteractionRegistry {
    panels: RefCell<SlotMap<PanelId, InteractionPanel>>,
    pointers: RefCell<HashMap<u32, PointerState>>,
    next_event_id: Cell<u64>,
}

impl InteractionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, panel: InteractionPanel) -> PanelId {
        self.panels.borrow_mut().insert(panel)
    }

    /// Remove a panel, clearing its pointer state.
    pub fn unregister(&self, id: PanelId) {
        let removed = self.panels.borrow_mut().remove(id);
        for state in self.pointers.borrow_mut().values_mut() {
            state.hovered.retain(|p| *p != id);
            state.pressed.retain(|p| *p != id);
        }
        if let Some(panel) = removed {
            panel.state.hovered.set(Vec::new());
            panel.state.active.set(Vec::new());
        }
    }

    pub fn len(&self) -> usize {
        self.panels.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.borrow().is_empty()
    }

    pub fn contains(&self, id: PanelId) -> bool {
        self.panels.borrow().contains_key(id)
    }

    /// Panels under `point`, topmost first.
    pub fn hit_test(&self, point: Vec2) -> Vec<PanelId> {
        self.collect_hits(point).into_iter().map(|hit| hit.id).collect()
    }

    fn collect_hits(&self, point: Vec2) -> Vec<Hit> {
        let panels = self.panels.borrow();
        let mut hits: Vec<Hit> = panels
            .iter()
            .filter_map(|(id, panel)| {
                hit(panel, point).map(|(local, uv)| Hit {
                    id,
                    local,
                    uv,
                    order: panel.order.with_untracked(Clone::clone),
                    handlers: panel.handlers.with_untracked(Clone::clone),
                    state: panel.state.clone(),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.order.cmp_draw_order(&a.order));
        hits
    }

    fn snapshot(&self, id: PanelId, point: Vec2) -> Option<Hit> {
        let panels = self.panels.borrow();
        let panel = panels.get(id)?;
        let matrix = panel.global_matrix.with_untracked(|m| *m);
        let size = panel.size.peek();
        let local = if matrix.determinant().abs() > f32::EPSILON {
            matrix.inverse().transform_point3(point.extend(0.0)).truncate()
        } else {
            Vec2::ZERO
        };
        let uv = if size.x > 0.0 && size.y > 0.0 { local / size + Vec2::splat(0.5) } else { Vec2::ZERO };
        Some(Hit {
            id,
            local,
            uv,
            order: panel.order.with_untracked(Clone::clone),
            handlers: panel.handlers.with_untracked(Clone::clone),
            state: panel.state.clone(),
        })
    }

    pub fn dispatch(&self, input: PointerInput) -> DispatchOutcome {
        let event_id = self.next_event_id.get() + 1;
        self.next_event_id.set(event_id);
        let flags = Rc::new(Cell::new(EventFlags::empty()));
        let event_for = |hit: &Hit, action: PointerAction| PointerEvent {
            id: event_id,
            pointer_id: input.pointer_id,
            action,
            point: input.point,
            local: hit.local,
            uv: hit.uv,
            flags: flags.clone(),
        };

        let hits = match input.action {
            PointerAction::Cancel => Vec::new(),
            _ => self.collect_hits(input.point),
        };
        let hit_ids: Vec<PanelId> = hits.iter().map(|hit| hit.id).collect();

        let (left, pressed) = {
            let mut pointers = self.pointers.borrow_mut();
            let state = pointers.entry(input.pointer_id).or_default();
            let previous = std::mem::replace(&mut state.hovered, hit_ids.clone());
            let left: Vec<PanelId> = previous.into_iter().filter(|id| !hit_ids.contains(id)).collect();
            let pressed = match input.action {
                PointerAction::Down => {
                    state.pressed = hit_ids.clone();
                    Vec::new()
                }
                PointerAction::Up | PointerAction::Cancel => std::mem::take(&mut state.pressed),
                PointerAction::Move => Vec::new(),
            };
            if input.action == PointerAction::Cancel {
                pointers.remove(&input.pointer_id);
            }
            (left, pressed)
        };
        tracing::trace!(event_id, hits = hit_ids.len(), left = left.len(), "pointer dispatch");

        // state writes land in one batch so transformers re-merge once
        let (left_hits, entered_hits, released_hits) = batch(|| {
            let left_hits: Vec<Hit> = left.iter().filter_map(|id| self.snapshot(*id, input.point)).collect();
            for hit in &left_hits {
                remove_pointer(&hit.state.hovered, input.pointer_id);
            }
            let mut entered_hits = Vec::new();
            for hit in &hits {
                if !hit.state.hovered.with_untracked(|ids| ids.contains(&input.pointer_id)) {
                    entered_hits.push(hit.id);
                }
                add_pointer(&hit.state.hovered, input.pointer_id);
                if input.action == PointerAction::Down {
                    add_pointer(&hit.state.active, input.pointer_id);
                }
            }
            let released_hits: Vec<Hit> =
                pressed.iter().filter_map(|id| self.snapshot(*id, input.point)).collect();
            for hit in &released_hits {
                remove_pointer(&hit.state.active, input.pointer_id);
            }
            (left_hits, entered_hits, released_hits)
        });

        for hit in &left_hits {
            if let Some(handler) = &hit.handlers.on_pointer_leave {
                handler(&event_for(hit, input.action));
            }
        }
        for hit in hits.iter().filter(|hit| entered_hits.contains(&hit.id)) {
            if let Some(handler) = &hit.handlers.on_pointer_enter {
                handler(&event_for(hit, input.action));
            }
        }

        for hit in &hits {
            if flags.get().contains(EventFlags::STOPPED) {
                break;
            }
            if let Some(handler) = hit.handlers.for_action(input.action) {
                handler(&event_for(hit, input.action));
            }
        }

        if input.action == PointerAction::Up {
            // click: pressed and released on the same panel
            let click_flags = Rc::new(Cell::new(EventFlags::empty()));
            for hit in hits.iter().filter(|hit| released_hits.iter().any(|r| r.id == hit.id)) {
                if click_flags.get().contains(EventFlags::STOPPED) {
                    break;
                }
                if let Some(handler) = &hit.handlers.on_click {
                    handler(&PointerEvent { flags: click_flags.clone(), ..event_for(hit, input.action) });
                }
            }
        }

        DispatchOutcome { event_id, hits: hit_ids, flags: flags.get() }
    }
}

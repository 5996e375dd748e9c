//! Input - editable text backed by a platform text-input surface.
//!
//! The value is either bound (`value` set in properties or style) or held in
//! an internal write cell seeded from `defaultValue`. Edits arrive from the
//! surface through `on_input`; the element draws glyphs, caret and
//! selection from the surface's state and forwards `onValueChange` and
//! `onFocusChange`.
//!
//! Pointer selection works on the glyph layout: pointer-down anchors a drag at
//! the char boundary under the pointer, moves extend it, and the focus write
//! is deferred to the next tick so the root's blur-on-pointer-down sees the
//! suppression marker first.

use std::cell::RefCell;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use super::element::{BodyContext, BodyOutput, Element, ElementBody, Listeners, TextInternals};
use crate::events::{EventHandlers, PointerEvent, PointerHandler};
use crate::input::{BlurSuppression, SurfaceListener, TextInputBridge, TextInputSurface};
use crate::lifecycle::{Subscription, initializer};
use crate::order::{GroupDependencies, computed_order_info};
use crate::properties::{CARET_ALIASES, ExtraVisitor, MergedProperties, alias_visitor, get_computed_property};
use crate::reactive::{Derived, Signal, SignalExt, derived, effect, signal, untrack};
use crate::render::InstanceList;
use crate::scheduler::DeferScope;
use crate::text::{
    DragSelection, GlyphLayout, Selection, SelectionDirection, TextBox, TextSurface, caret_instance,
    computed_font, create_instanced_text, glyph_group_dependencies, selection_instances, uv_to_char_index,
};
use crate::types::{Color, ElementType, InputType, WordBreak};

const DEFAULT_SELECTION_COLOR: Color = Color::new(0.1, 0.45, 0.91, 1.0);

/// State shared by the element body and the [`Input`] handle.
struct InputShared {
    bridge: TextInputBridge,
    /// Internal value; `None` until seeded.
    write: Signal<Option<String>>,
    focused: Signal<bool>,
    /// Selection while focused.
    selection: Signal<Option<Selection>>,
    drag: DragSelection,
    value: RefCell<Option<Derived<String>>>,
}

impl InputShared {
    fn focus(&self, selection: Option<Selection>) {
        self.bridge.focus(selection);
        if self.bridge.has_focus() {
            self.selection.set(self.bridge.selection());
        }
    }

    fn blur(&self) {
        self.bridge.blur();
    }

    fn on_focus_change(&self, focused: bool, listeners: &Signal<Listeners>) {
        self.focused.set(focused);
        if !focused {
            self.selection.set(None);
            self.drag.end();
        }
        if let Some(callback) = listeners.with_untracked(|l| l.on_focus_change.clone()) {
            untrack(|| callback(focused));
        }
    }
}

fn is_bound(m: &MergedProperties) -> bool {
    m.contains_key("value")
}

/// Text drawn for `value`: password inputs show one `*` per char.
pub fn display_text(value: &str, input_type: InputType) -> String {
    match input_type {
        InputType::Text => value.to_string(),
        InputType::Password => "*".repeat(value.chars().count()),
    }
}

fn selection_handlers(
    shared: Weak<InputShared>,
    layout: Derived<GlyphLayout>,
    text_box: Derived<TextBox>,
    blur_suppression: Rc<BlurSuppression>,
    scope: DeferScope,
) -> EventHandlers {
    let char_index = {
        let (layout, text_box) = (layout.clone(), text_box.clone());
        Rc::new(move |event: &PointerEvent| {
            layout.with_untracked(|layout| text_box.with_untracked(|b| uv_to_char_index(b, event.uv, layout)))
        })
    };
    let defer_focus = {
        let (shared, scope) = (shared.clone(), scope.clone());
        Rc::new(move |selection: Selection| {
            let shared = shared.clone();
            scope.defer(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.focus(Some(selection));
                }
            });
        })
    };

    let on_pointer_down: PointerHandler = {
        let (shared, char_index, defer_focus) = (shared.clone(), char_index.clone(), defer_focus.clone());
        Rc::new(move |event: &PointerEvent| {
            let Some(shared) = shared.upgrade() else { return };
            blur_suppression.suppress(event.id);
            event.stop_propagation();
            let selection = shared.drag.begin(char_index(event));
            defer_focus(selection);
        })
    };
    let on_pointer_move: PointerHandler = {
        let shared = shared.clone();
        Rc::new(move |event: &PointerEvent| {
            let Some(shared) = shared.upgrade() else { return };
            if let Some(selection) = shared.drag.update(char_index(event)) {
                defer_focus(selection);
            }
        })
    };
    let end_drag: PointerHandler = Rc::new(move |_: &PointerEvent| {
        if let Some(shared) = shared.upgrade() {
            shared.drag.end();
        }
    });

    EventHandlers {
        on_pointer_down: Some(on_pointer_down),
        on_pointer_move: Some(on_pointer_move),
        on_pointer_up: Some(end_drag.clone()),
        on_pointer_leave: Some(end_drag),
        ..EventHandlers::default()
    }
}

struct InputBody {
    shared: Rc<InputShared>,
}

impl ElementBody for InputBody {
    fn extra_visitor(&self) -> Option<ExtraVisitor> {
        Some(alias_visitor(CARET_ALIASES))
    }

    fn focus_condition(&self) -> Option<Derived<bool>> {
        let focused = self.shared.focused.clone();
        Some(derived(move || focused.get()))
    }

    fn build(&self, cx: &BodyContext<'_>) -> BodyOutput {
        let shared = &self.shared;
        let merged = cx.merged.clone();

        if shared.write.peek().is_none() && !get_computed_property(&merged, "value", |m, _| is_bound(m)) {
            let seed = get_computed_property(&merged, "defaultValue", |m, key| m.string(key));
            shared.write.set(Some(seed.map(|s| s.to_string()).unwrap_or_default()));
        }

        let value = {
            let (merged, write) = (merged.clone(), shared.write.clone());
            derived(move || {
                let bound = merged.with(|m| is_bound(m).then(|| m.string("value").map(|s| s.to_string())));
                match bound {
                    Some(value) => value.unwrap_or_default(),
                    None => write.get().unwrap_or_default(),
                }
            })
        };
        *shared.value.borrow_mut() = Some(value.clone());

        let input_type = {
            let merged = merged.clone();
            derived(move || merged.with(|m| m.keyword("type", InputType::parse)))
        };
        let disabled = {
            let merged = merged.clone();
            derived(move || merged.with(|m| m.bool("disabled")))
        };
        let text = {
            let (value, input_type) = (value.clone(), input_type.clone());
            derived(move || {
                let input_type = input_type.get();
                value.with(|value| display_text(value, input_type))
            })
        };
        let word_break = if get_computed_property(&merged, "multiline", |m, key| m.bool(key)) {
            WordBreak::BreakWord
        } else {
            WordBreak::KeepAll
        };

        // selection boxes sit between the background and the glyphs, the caret above the glyphs
        let panel_deps = {
            let clipping = cx.geometry.clipping_rect.clone();
            derived(move || GroupDependencies::default().with_clipping(clipping.get()))
        };
        let sequence = &cx.root.sequence;
        let selection_order = computed_order_info(None, ElementType::Panel, &panel_deps, Some(cx.order), sequence.next());
        let font = computed_font(&merged);
        let glyph_deps = glyph_group_dependencies(&font, &cx.root.shaper, &cx.geometry.clipping_rect);
        let glyph_order =
            computed_order_info(None, ElementType::Text, &glyph_deps, Some(&selection_order), sequence.next());
        let caret_order = computed_order_info(None, ElementType::Panel, &panel_deps, Some(&glyph_order), sequence.next());

        let instanced = create_instanced_text(TextSurface {
            merged: cx.merged,
            text,
            font: &font,
            node: cx.node,
            geometry: cx.geometry,
            visible: cx.visible,
            order: &glyph_order,
            shaper: cx.root.shaper.clone(),
            manager: &cx.root.instances,
            errors: &cx.root.errors,
            word_break: Some(word_break),
        });
        let mut initializers = instanced.initializers;
        let (layout, text_box) = (instanced.layout.clone(), instanced.text_box.clone());

        {
            let (manager, errors, visible) = (cx.root.instances.clone(), cx.root.errors.clone(), cx.visible.clone());
            let (merged, geometry, layout, text_box) =
                (merged.clone(), cx.geometry.clone(), layout.clone(), text_box.clone());
            let selection = shared.selection.clone();
            let caret_width = cx.root.config.caret_width;
            initializers.push(initializer(move |subscriptions| {
                let caret = {
                    let (merged, geometry, layout, text_box, selection) =
                        (merged.clone(), geometry.clone(), layout.clone(), text_box.clone(), selection.clone());
                    derived(move || {
                        let color = merged.with(|m| {
                            let opacity = m.number_opt("caretOpacity").unwrap_or(1.0);
                            m.color("caretColor").unwrap_or(Color::WHITE).with_opacity(opacity)
                        });
                        let (matrix, clip, text_box) =
                            (geometry.global_matrix.get(), geometry.clipping_rect.get(), text_box.get());
                        let selection = selection.get();
                        layout
                            .with(|l| caret_instance(selection, l, &matrix, &text_box, caret_width, color, clip))
                            .into_iter()
                            .collect::<Vec<_>>()
                    })
                };
                subscriptions.push(InstanceList::new(&manager, &caret_order, &visible, caret, &errors).into());

                let boxes = derived(move || {
                    let color = merged.with(|m| {
                        let opacity = m.number_opt("opacity").unwrap_or(1.0);
                        m.color("selectionColor").unwrap_or(DEFAULT_SELECTION_COLOR).with_opacity(opacity)
                    });
                    let (matrix, clip, text_box) =
                        (geometry.global_matrix.get(), geometry.clipping_rect.get(), text_box.get());
                    let selection = selection.get();
                    layout.with(|l| selection_instances(selection, l, &matrix, &text_box, color, clip))
                });
                Some(InstanceList::new(&manager, &selection_order, &visible, boxes, &errors).into())
            }));
        }

        {
            let (shared, listeners, merged) = (Rc::downgrade(shared), cx.listeners.clone(), merged.clone());
            let platform = cx.root.input_platform.clone();
            let (value, disabled, input_type) = (value.clone(), disabled.clone(), input_type.clone());
            initializers.push(initializer(move |subscriptions| {
                let strong = shared.upgrade()?;
                let surface = platform.create_surface();
                surface.set_value(&value.peek());
                strong.bridge.attach(surface.clone());

                let on_input = {
                    let (shared, listeners, merged, value) =
                        (shared.clone(), listeners.clone(), merged.clone(), value.clone());
                    Rc::new(move |edited: String| {
                        let Some(shared) = shared.upgrade() else { return };
                        let bound = merged.with_untracked(is_bound);
                        if !bound {
                            shared.write.set(Some(edited.clone()));
                        }
                        if let Some(callback) = listeners.with_untracked(|l| l.on_value_change.clone()) {
                            untrack(|| callback(&edited));
                        }
                        if bound {
                            shared.bridge.set_value(&value.peek());
                        }
                    })
                };
                let on_focus_change = {
                    let (shared, listeners) = (shared.clone(), listeners.clone());
                    Rc::new(move |focused: bool| {
                        if let Some(shared) = shared.upgrade() {
                            shared.on_focus_change(focused, &listeners);
                        }
                    })
                };
                let on_selection_change = {
                    let shared = shared.clone();
                    Rc::new(move |selection: Selection| {
                        if let Some(shared) = shared.upgrade() {
                            shared.selection.set(Some(selection));
                        }
                    })
                };
                surface.set_listener(Some(SurfaceListener { on_input, on_focus_change, on_selection_change }));

                let bridge = strong.bridge.clone();
                subscriptions.push(
                    effect({
                        let bridge = bridge.clone();
                        move || bridge.set_value(&value.get())
                    })
                    .into(),
                );
                subscriptions.push(
                    effect({
                        let bridge = bridge.clone();
                        move || bridge.set_disabled(disabled.get())
                    })
                    .into(),
                );
                subscriptions.push(
                    effect({
                        let (bridge, merged) = (bridge.clone(), merged.clone());
                        move || bridge.set_tab_index(merged.with(|m| m.number("tabIndex")) as i32)
                    })
                    .into(),
                );
                subscriptions.push(
                    effect({
                        let bridge = bridge.clone();
                        move || bridge.set_input_type(input_type.get())
                    })
                    .into(),
                );

                Some(Subscription::new(move || {
                    if bridge.has_focus() {
                        bridge.blur();
                    }
                    bridge.detach();
                }))
            }));
        }

        let scope = DeferScope::new(&cx.root.deferred);
        {
            let scope = scope.clone();
            initializers.push(initializer(move |_| Some(scope.into_subscription())));
        }
        let handlers = {
            let handlers = selection_handlers(
                Rc::downgrade(shared),
                layout.clone(),
                text_box.clone(),
                cx.root.blur_suppression.clone(),
                scope,
            );
            derived(move || if disabled.get() { EventHandlers::default() } else { handlers.clone() })
        };

        BodyOutput {
            initializers,
            handlers: Some(handlers),
            text: Some(TextInternals { layout, text_box, order_info: glyph_order }),
        }
    }
}

/// Editable text element.
#[derive(Clone)]
pub struct Input {
    element: Element,
    shared: Rc<InputShared>,
}

impl Input {
    pub fn new() -> Self {
        let shared = Rc::new(InputShared {
            bridge: TextInputBridge::new(),
            write: signal(None),
            focused: signal(false),
            selection: signal(None),
            drag: DragSelection::new(),
            value: RefCell::new(None),
        });
        let element = Element::with_body(InputBody { shared: shared.clone() });
        Self { element, shared }
    }

    /// Current value: the bound `value` or the internal write cell.
    pub fn value(&self) -> String {
        let value = self.shared.value.borrow().clone();
        match value {
            Some(value) if self.element.is_mounted() => value.peek(),
            _ => self.shared.write.peek().unwrap_or_default(),
        }
    }

    /// Focus and select `[start, end)`.
    pub fn focus(&self, start: usize, end: usize, direction: SelectionDirection) {
        self.shared.focus(Some(Selection { start: start.min(end), end: start.max(end), direction }));
    }

    pub fn blur(&self) {
        self.shared.blur();
    }

    pub fn has_focus(&self) -> bool {
        self.shared.focused.peek()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.shared.selection.peek()
    }

    /// The platform surface while mounted.
    pub fn surface(&self) -> Option<Rc<dyn TextInputSurface>> {
        self.shared.bridge.surface()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Input").field("element", &self.element).field("focused", &self.has_focus()).finish()
    }
}

impl Deref for Input {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

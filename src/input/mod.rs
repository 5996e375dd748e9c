//! # Text Input Bridge
//!
//! Editing is delegated to a platform text-input surface: a native text
//! field, a terminal line editor, or the [`VirtualTextInputPlatform`] used
//! headless. The toolkit only draws the text, caret and selection and keeps
//! them in sync with the surface.
//!
//! - [`TextInputPlatform`] creates surfaces and knows which one has focus
//! - [`TextInputSurface`] is one editable buffer
//! - [`TextInputBridge`] is the element side handle; every call is a no-op
//!   while no surface is attached
//! - [`BlurSuppression`] marks pointer events that must not blur the focused input

mod blur;
mod virtual_input;

use std::cell::RefCell;
use std::rc::Rc;

pub use blur::BlurSuppression;
pub use virtual_input::{VirtualSurface, VirtualTextInputPlatform};

use crate::text::Selection;
use crate::types::InputType;

// =============================================================================
// CONTRACTS
// =============================================================================

/// Callbacks a surface reports edits through.
#[derive(Clone)]
pub struct SurfaceListener {
    pub on_input: Rc<dyn Fn(String)>,
    pub on_focus_change: Rc<dyn Fn(bool)>,
    pub on_selection_change: Rc<dyn Fn(Selection)>,
}

impl SurfaceListener {
    pub fn noop() -> Self {
        Self {
            on_input: Rc::new(|_| {}),
            on_focus_change: Rc::new(|_| {}),
            on_selection_change: Rc::new(|_| {}),
        }
    }
}

/// One editable buffer of the platform.
///
/// Programmatic writes (`set_value`, `set_selection`) never call back into
/// the listener's `on_input`.
pub trait TextInputSurface {
    fn focus(&self);
    fn blur(&self);
    fn has_focus(&self) -> bool;
    fn set_selection(&self, selection: Selection);
    fn selection(&self) -> Selection;
    fn set_value(&self, value: &str);
    fn value(&self) -> String;
    fn set_disabled(&self, disabled: bool);
    fn set_tab_index(&self, tab_index: i32);
    fn set_input_type(&self, input_type: InputType);
    fn set_listener(&self, listener: Option<SurfaceListener>);
}

pub trait TextInputPlatform {
    fn create_surface(&self) -> Rc<dyn TextInputSurface>;

    /// Blur whichever surface has focus.
    fn blur_active(&self);
}

// =============================================================================
// BRIDGE
// =============================================================================

/// Element side handle to an optional surface.
#[derive(Clone, Default)]
pub struct TextInputBridge {
    surface: Rc<RefCell<Option<Rc<dyn TextInputSurface>>>>,
}

impl TextInputBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, surface: Rc<dyn TextInputSurface>) {
        *self.surface.borrow_mut() = Some(surface);
    }

    /// Detach and return the surface, clearing its listener.
    pub fn detach(&self) -> Option<Rc<dyn TextInputSurface>> {
        let surface = self.surface.borrow_mut().take();
        if let Some(surface) = &surface {
            surface.set_listener(None);
        }
        surface
    }

    pub fn surface(&self) -> Option<Rc<dyn TextInputSurface>> {
        self.surface.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.surface.borrow().is_some()
    }

    fn with_surface(&self, op: &'static str, f: impl FnOnce(&dyn TextInputSurface)) {
        // clone out so no borrow is held while the surface fires callbacks
        let surface = self.surface();
        match surface {
            Some(surface) => f(surface.as_ref()),
            None => tracing::debug!(op, "no text input surface attached"),
        }
    }

    pub fn focus(&self, selection: Option<Selection>) {
        self.with_surface("focus", |surface| {
            surface.focus();
            if let Some(selection) = selection {
                surface.set_selection(selection);
            }
        });
    }

    pub fn blur(&self) {
        self.with_surface("blur", |surface| surface.blur());
    }

    pub fn set_selection(&self, selection: Selection) {
        self.with_surface("set_selection", |surface| surface.set_selection(selection));
    }

    pub fn set_value(&self, value: &str) {
        self.with_surface("set_value", |surface| {
            if surface.value() != value {
                surface.set_value(value);
            }
        });
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.with_surface("set_disabled", |surface| surface.set_disabled(disabled));
    }

    pub fn set_tab_index(&self, tab_index: i32) {
        self.with_surface("set_tab_index", |surface| surface.set_tab_index(tab_index));
    }

    pub fn set_input_type(&self, input_type: InputType) {
        self.with_surface("set_input_type", |surface| surface.set_input_type(input_type));
    }

    pub fn has_focus(&self) -> bool {
        self.surface().is_some_and(|surface| surface.has_focus())
    }

    pub fn selection(&self) -> Option<Selection> {
        self.surface().map(|surface| surface.selection())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_missing_surface_is_noop() {
        let bridge = TextInputBridge::new();
        bridge.focus(Some(Selection::caret(1)));
        bridge.set_value("x");
        bridge.blur();
        assert!(!bridge.has_focus());
        assert_eq!(bridge.selection(), None);
        assert!(bridge.detach().is_none());
    }

    #[test]
    fn test_attached_surface_receives_calls() {
        let platform = VirtualTextInputPlatform::new();
        let bridge = TextInputBridge::new();
        bridge.attach(platform.create_surface());

        let focus_changes = Rc::new(Cell::new(0));
        let counter = focus_changes.clone();
        if let Some(surface) = bridge.surface() {
            surface.set_listener(Some(SurfaceListener {
                on_focus_change: Rc::new(move |_| counter.set(counter.get() + 1)),
                ..SurfaceListener::noop()
            }));
        }

        bridge.set_value("hello");
        bridge.focus(Some(Selection::between(1, 3)));
        assert!(bridge.has_focus());
        assert_eq!(bridge.selection(), Some(Selection::between(1, 3)));

        bridge.blur();
        assert!(!bridge.has_focus());
        assert_eq!(focus_changes.get(), 2);

        assert!(bridge.detach().is_some());
        assert!(!bridge.is_attached());
    }
}

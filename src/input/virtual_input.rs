//! Virtual text input platform: an in-memory edit buffer per surface.
//!
//! Drives headless embeddings and tests. `type_text` and `backspace` play
//! the role of the keyboard and edit the focused surface.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{SurfaceListener, TextInputPlatform, TextInputSurface};
use crate::text::{Selection, SelectionDirection};
use crate::types::InputType;

#[derive(Default)]
struct PlatformState {
    focused: RefCell<Option<Weak<VirtualSurface>>>,
}

impl PlatformState {
    fn focused(&self) -> Option<Rc<VirtualSurface>> {
        self.focused.borrow().as_ref().and_then(Weak::upgrade)
    }
}

pub struct VirtualSurface {
    this: Weak<VirtualSurface>,
    platform: Weak<PlatformState>,
    value: RefCell<String>,
    selection: Cell<Selection>,
    focused: Cell<bool>,
    disabled: Cell<bool>,
    tab_index: Cell<i32>,
    input_type: Cell<InputType>,
    listener: RefCell<Option<SurfaceListener>>,
}

impl VirtualSurface {
    fn listener(&self) -> Option<SurfaceListener> {
        self.listener.borrow().clone()
    }

    fn char_count(&self) -> usize {
        self.value.borrow().chars().count()
    }

    fn clamp(&self, selection: Selection) -> Selection {
        let len = self.char_count();
        Selection { start: selection.start.min(len), end: selection.end.min(len), ..selection }
    }

    fn set_focused(&self, focused: bool) {
        if self.focused.replace(focused) == focused {
            return;
        }
        if let Some(listener) = self.listener() {
            (listener.on_focus_change)(focused);
        }
    }

    pub fn tab_index(&self) -> i32 {
        self.tab_index.get()
    }

    pub fn input_type(&self) -> InputType {
        self.input_type.get()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    /// Replace the selected range with `text`, as a user edit.
    fn replace_selection(&self, text: &str, delete_before: bool) {
        if self.disabled.get() {
            return;
        }
        let Selection { mut start, end, .. } = self.selection.get();
        if delete_before && start == end {
            if start == 0 {
                return;
            }
            start -= 1;
        }
        let value = {
            let mut value = self.value.borrow_mut();
            let head: String = value.chars().take(start).collect();
            let tail: String = value.chars().skip(end).collect();
            *value = format!("{head}{text}{tail}");
            value.clone()
        };
        let caret = Selection::caret(start + text.chars().count());
        self.selection.set(caret);
        if let Some(listener) = self.listener() {
            (listener.on_input)(value);
            (listener.on_selection_change)(caret);
        }
    }
}

impl TextInputSurface for VirtualSurface {
    fn focus(&self) {
        if self.disabled.get() {
            tracing::debug!("focus ignored on disabled surface");
            return;
        }
        let Some(platform) = self.platform.upgrade() else {
            return;
        };
        let previous = platform.focused.replace(Some(self.this.clone()));
        if let Some(previous) = previous.and_then(|weak| weak.upgrade()) {
            if !std::ptr::eq(previous.as_ref(), self) {
                previous.set_focused(false);
            }
        }
        self.set_focused(true);
    }

    fn blur(&self) {
        if let Some(platform) = self.platform.upgrade() {
            let mut focused = platform.focused.borrow_mut();
            if focused.as_ref().is_some_and(|weak| std::ptr::eq(weak.as_ptr(), self)) {
                *focused = None;
            }
        }
        self.set_focused(false);
    }

    fn has_focus(&self) -> bool {
        self.focused.get()
    }

    fn set_selection(&self, selection: Selection) {
        self.selection.set(self.clamp(selection));
    }

    fn selection(&self) -> Selection {
        self.selection.get()
    }

    fn set_value(&self, value: &str) {
        *self.value.borrow_mut() = value.to_string();
        let selection = self.clamp(self.selection.get());
        self.selection.set(selection);
    }

    fn value(&self) -> String {
        self.value.borrow().clone()
    }

    fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
        if disabled && self.focused.get() {
            self.blur();
        }
    }

    fn set_tab_index(&self, tab_index: i32) {
        self.tab_index.set(tab_index);
    }

    fn set_input_type(&self, input_type: InputType) {
        self.input_type.set(input_type);
    }

    fn set_listener(&self, listener: Option<SurfaceListener>) {
        *self.listener.borrow_mut() = listener;
    }
}

/// In-memory platform. Cloning shares the platform.
#[derive(Clone, Default)]
pub struct VirtualTextInputPlatform {
    state: Rc<PlatformState>,
}

impl VirtualTextInputPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_virtual_surface(&self) -> Rc<VirtualSurface> {
        let platform = Rc::downgrade(&self.state);
        Rc::new_cyclic(|this| VirtualSurface {
            this: this.clone(),
            platform,
            value: RefCell::new(String::new()),
            selection: Cell::new(Selection::caret(0)),
            focused: Cell::new(false),
            disabled: Cell::new(false),
            tab_index: Cell::new(0),
            input_type: Cell::new(InputType::Text),
            listener: RefCell::new(None),
        })
    }

    pub fn focused(&self) -> Option<Rc<VirtualSurface>> {
        self.state.focused()
    }

    /// Type into the focused surface, replacing its selection.
    pub fn type_text(&self, text: &str) -> bool {
        match self.focused() {
            Some(surface) => {
                surface.replace_selection(text, false);
                true
            }
            None => false,
        }
    }

    /// Delete the selection, or the char before the caret.
    pub fn backspace(&self) -> bool {
        match self.focused() {
            Some(surface) => {
                surface.replace_selection("", true);
                true
            }
            None => false,
        }
    }

    /// Select the whole value of the focused surface.
    pub fn select_all(&self) {
        if let Some(surface) = self.focused() {
            let selection =
                Selection { start: 0, end: surface.char_count(), direction: SelectionDirection::Forward };
            surface.set_selection(selection);
            if let Some(listener) = surface.listener() {
                (listener.on_selection_change)(selection);
            }
        }
    }
}

impl TextInputPlatform for VirtualTextInputPlatform {
    fn create_surface(&self) -> Rc<dyn TextInputSurface> {
        self.create_virtual_surface()
    }

    fn blur_active(&self) {
        if let Some(surface) = self.focused() {
            surface.blur();
        }
    }
}

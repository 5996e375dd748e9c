//! Property values.

use std::fmt;
use std::rc::Rc;

use spark_signals::PropValue;

use crate::reactive::{Derived, Signal, SignalExt};
use crate::types::{Color, Dimension};

/// A single resolved property value.
///
/// `Null` is an explicit value: a layer that sets a key to `Null` still wins
/// over lower layers. Consumers treat `Null` as "use the built-in default".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(f32),
    /// Percentage, 0-100.
    Percent(f32),
    Auto,
    Str(Rc<str>),
    Color(Color),
}

impl PropertyValue {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Percent(_) => "percent",
            Self::Auto => "auto",
            Self::Str(_) => "string",
            Self::Color(_) => "color",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Colors, hex strings and `0xRRGGBB` numbers.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            Self::Str(s) => Color::parse(s),
            Self::Number(n) if *n >= 0.0 => Some(Color::from_rgb_int(*n as u32)),
            _ => None,
        }
    }

    pub fn as_dimension(&self) -> Option<Dimension> {
        match self {
            Self::Number(n) => Some(Dimension::Points(*n)),
            Self::Percent(p) => Some(Dimension::Percent(*p)),
            Self::Auto => Some(Dimension::Auto),
            Self::Str(s) => Dimension::parse(s),
            _ => None,
        }
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value as f32)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f32)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl From<Color> for PropertyValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<Dimension> for PropertyValue {
    fn from(value: Dimension) -> Self {
        match value {
            Dimension::Auto => Self::Auto,
            Dimension::Points(n) => Self::Number(n),
            Dimension::Percent(p) => Self::Percent(p),
        }
    }
}

// =============================================================================
// PropCell - static, signal or getter
// =============================================================================

/// A property cell held by a [`Properties`](super::Properties) layer: a static
/// value, a signal, a getter or a derived cell.
///
/// Callers usually hand in a [`spark_signals::PropValue`], which converts into
/// the matching variant.
///
/// Reactive variants compare by identity, so swapping in the same signal does
/// not change the merged table while a different signal does.
#[derive(Clone)]
pub enum PropCell {
    /// Static value (not reactive).
    Static(PropertyValue),
    /// Reactive signal (changes propagate to readers of this key only).
    Signal(Signal<PropertyValue>),
    /// Getter function, called on every read and tracked like any other read.
    Getter(Rc<dyn Fn() -> PropertyValue>),
    /// Derived cell.
    Derived(Derived<PropertyValue>),
}

impl PropCell {
    /// Current value, tracked.
    pub fn get(&self) -> PropertyValue {
        match self {
            PropCell::Static(v) => v.clone(),
            PropCell::Signal(s) => s.get(),
            PropCell::Getter(f) => f(),
            PropCell::Derived(d) => d.get(),
        }
    }

    pub fn getter(f: impl Fn() -> PropertyValue + 'static) -> Self {
        PropCell::Getter(Rc::new(f))
    }

    pub fn is_static(&self) -> bool {
        matches!(self, PropCell::Static(_))
    }
}

impl PartialEq for PropCell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropCell::Static(a), PropCell::Static(b)) => a == b,
            (PropCell::Signal(a), PropCell::Signal(b)) => a.ptr_eq(b),
            (PropCell::Getter(a), PropCell::Getter(b)) => Rc::ptr_eq(a, b),
            (PropCell::Derived(a), PropCell::Derived(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropCell::Static(v) => f.debug_tuple("Static").field(v).finish(),
            PropCell::Signal(s) => f.debug_tuple("Signal").field(&s.peek()).finish(),
            PropCell::Getter(_) => f.write_str("Getter(..)"),
            PropCell::Derived(d) => f.debug_tuple("Derived").field(&d.id()).finish(),
        }
    }
}

impl Default for PropCell {
    fn default() -> Self {
        PropCell::Static(PropertyValue::Null)
    }
}

macro_rules! static_prop_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for PropCell {
                fn from(value: $ty) -> Self {
                    PropCell::Static(value.into())
                }
            }
        )+
    };
}

static_prop_from!(PropertyValue, f32, f64, i32, bool, &str, String, Color, Dimension);

impl From<Signal<PropertyValue>> for PropCell {
    fn from(signal: Signal<PropertyValue>) -> Self {
        PropCell::Signal(signal)
    }
}

impl From<Derived<PropertyValue>> for PropCell {
    fn from(cell: Derived<PropertyValue>) -> Self {
        PropCell::Derived(cell)
    }
}

impl From<PropValue<PropertyValue>> for PropCell {
    fn from(prop: PropValue<PropertyValue>) -> Self {
        match prop {
            PropValue::Static(value) => PropCell::Static(value),
            PropValue::Signal(signal) => PropCell::Signal(signal),
            PropValue::Getter(getter) => PropCell::Getter(Rc::from(getter)),
        }
    }
}

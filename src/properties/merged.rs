//! Resolved property table.

use std::rc::Rc;

use indexmap::IndexMap;

use super::defaults::builtin_default;
use super::value::{PropCell, PropertyValue};
use crate::error::PropertyError;
use crate::types::{Color, Dimension};

/// Flat resolved table: one [`PropCell`] per key, taken from the highest
/// precedence layer that defined it.
///
/// Values are stored unevaluated. Reading a value through the typed accessors
/// tracks the value cell, so a signal change only reaches readers of that key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedProperties {
    values: IndexMap<String, PropCell>,
}

fn warn(error: PropertyError) {
    tracing::warn!(%error, "invalid property value, using default");
}

impl MergedProperties {
    pub(crate) fn from_values(values: IndexMap<String, PropCell>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&PropCell> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropCell)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current value of `key`: the merged value, else the built-in default, else `Null`.
    ///
    /// An explicit `Null` also resolves to the built-in default.
    pub fn value(&self, key: &str) -> PropertyValue {
        match self.values.get(key).map(PropCell::get) {
            Some(v) if !v.is_null() => v,
            _ => builtin_default(key).unwrap_or_default(),
        }
    }

    fn typed<T>(
        &self,
        key: &str,
        expected: &'static str,
        convert: impl Fn(&PropertyValue) -> Option<T>,
    ) -> Option<T> {
        let value = self.value(key);
        if value.is_null() {
            return None;
        }
        if let Some(v) = convert(&value) {
            return Some(v);
        }
        warn(PropertyError::UnexpectedType {
            key: key.to_string(),
            expected,
            found: value.type_name(),
        });
        builtin_default(key).as_ref().and_then(convert)
    }

    pub fn number_opt(&self, key: &str) -> Option<f32> {
        self.typed(key, "number", PropertyValue::as_number)
    }

    /// Number, or `0.0` when unset.
    pub fn number(&self, key: &str) -> f32 {
        self.number_opt(key).unwrap_or(0.0)
    }

    pub fn bool(&self, key: &str) -> bool {
        self.typed(key, "bool", PropertyValue::as_bool).unwrap_or(false)
    }

    pub fn string(&self, key: &str) -> Option<Rc<str>> {
        self.typed(key, "string", |v| match v {
            PropertyValue::Str(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn color(&self, key: &str) -> Option<Color> {
        self.typed(key, "color", PropertyValue::as_color)
    }

    pub fn dimension(&self, key: &str) -> Dimension {
        self.typed(key, "dimension", PropertyValue::as_dimension).unwrap_or_default()
    }

    /// Keyword read: unknown keywords warn and fall back to `T::default()`.
    pub fn keyword<T: Default>(&self, key: &str, parse: fn(&str) -> Option<T>) -> T {
        let value = self.value(key);
        match &value {
            PropertyValue::Null => T::default(),
            PropertyValue::Str(s) => parse(s).unwrap_or_else(|| {
                warn(PropertyError::Unparsable { key: key.to_string(), value: s.to_string() });
                T::default()
            }),
            other => {
                warn(PropertyError::UnexpectedType {
                    key: key.to_string(),
                    expected: "keyword",
                    found: other.type_name(),
                });
                T::default()
            }
        }
    }
}

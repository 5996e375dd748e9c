//! Partial property objects as supplied by callers.

use indexmap::IndexMap;

use super::value::PropCell;

/// One entry of a partial property object.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEntry {
    Value(PropCell),
    /// Nested object contributed while a transformer (`hover`, `md`, ...) is active.
    Conditional(Properties),
}

/// Ordered partial property object.
///
/// A key that is absent is "not set"; a key set to [`PropertyValue::Null`]
/// is an explicit value.
///
/// [`PropertyValue::Null`]: super::PropertyValue::Null
///
/// # Example
///
/// ```
/// use spark_uikit::properties::Properties;
///
/// let style = Properties::new()
///     .with("width", 100)
///     .with("padding", 10)
///     .with_conditional("hover", Properties::new().with("backgroundColor", "#ff0000"));
/// assert!(style.contains_key("width"));
/// assert!(style.conditional("hover").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    entries: IndexMap<String, PropertyEntry>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropCell>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_conditional(mut self, key: impl Into<String>, properties: Properties) -> Self {
        self.set_conditional(key, properties);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropCell>) {
        self.entries.insert(key.into(), PropertyEntry::Value(value.into()));
    }

    pub fn set_conditional(&mut self, key: impl Into<String>, properties: Properties) {
        self.entries.insert(key.into(), PropertyEntry::Conditional(properties));
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyEntry> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PropertyEntry> {
        self.entries.get(key)
    }

    /// The plain value under `key`, if it is not a conditional object.
    pub fn value(&self, key: &str) -> Option<&PropCell> {
        match self.entries.get(key) {
            Some(PropertyEntry::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn conditional(&self, key: &str) -> Option<&Properties> {
        match self.entries.get(key) {
            Some(PropertyEntry::Conditional(p)) => Some(p),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` onto `self`; keys in `other` replace existing ones.
    pub fn extend(&mut self, other: &Properties) {
        for (key, entry) in &other.entries {
            self.entries.insert(key.clone(), entry.clone());
        }
    }
}

impl<K: Into<String>, V: Into<PropCell>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.set(key, value);
        }
        properties
    }
}

//! Conditional transformers.
//!
//! A transformer contributes the nested object stored under its key
//! (`hover: { ... }`) while its condition cell is true. Higher priority
//! transformers win over lower ones; all of them sit below style and explicit
//! properties and above defaults.
//!
//! | Key      | Priority | Condition                      |
//! |----------|----------|--------------------------------|
//! | `dark`   | 1        | root dark mode                 |
//! | `sm`     | 2        | root width >= 640              |
//! | `md`     | 3        | root width >= 768              |
//! | `lg`     | 4        | root width >= 1024             |
//! | `xl`     | 5        | root width >= 1280             |
//! | `2xl`    | 6        | root width >= 1536             |
//! | `hover`  | 7        | a pointer is over the element  |
//! | `active` | 8        | a pointer is pressed on it     |
//! | `focus`  | 9        | the input has focus            |

use glam::Vec2;

use crate::reactive::{Derived, Signal, derived};

/// Responsive breakpoints in layout units.
pub const BREAKPOINTS: &[(&str, f32, u8)] = &[
    ("sm", 640.0, 2),
    ("md", 768.0, 3),
    ("lg", 1024.0, 4),
    ("xl", 1280.0, 5),
    ("2xl", 1536.0, 6),
];

#[derive(Clone)]
pub struct Transformer {
    pub key: &'static str,
    pub priority: u8,
    pub condition: Derived<bool>,
}

impl Transformer {
    pub fn new(key: &'static str, priority: u8, condition: Derived<bool>) -> Self {
        Self { key, priority, condition }
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("key", &self.key)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Root-wide transformers: dark mode and breakpoints.
pub fn root_transformers(dark_mode: &Signal<bool>, size: &Signal<Vec2>) -> Vec<Transformer> {
    let mut transformers = Vec::with_capacity(1 + BREAKPOINTS.len());
    let dark = dark_mode.clone();
    transformers.push(Transformer::new("dark", 1, derived(move || dark.get())));
    for &(key, min_width, priority) in BREAKPOINTS {
        let size = size.clone();
        let condition = derived(move || size.get().x >= min_width);
        transformers.push(Transformer::new(key, priority, condition));
    }
    transformers
}

/// Element transformers for pointer and focus state.
pub fn interaction_transformers(
    hovered: Derived<bool>,
    active: Derived<bool>,
    focused: Option<Derived<bool>>,
) -> Vec<Transformer> {
    let mut transformers = vec![
        Transformer::new("hover", 7, hovered),
        Transformer::new("active", 8, active),
    ];
    if let Some(focused) = focused {
        transformers.push(Transformer::new("focus", 9, focused));
    }
    transformers
}

/// Sort by priority, highest first. Stable for equal priorities.
pub fn sort_by_priority(transformers: &mut [Transformer]) {
    transformers.sort_by(|a, b| b.priority.cmp(&a.priority));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::signal;

    #[test]
    fn test_breakpoints_follow_root_width() {
        let size = signal(Vec2::new(700.0, 100.0));
        let transformers = root_transformers(&signal(false), &size);
        let active = |ts: &[Transformer]| {
            ts.iter().filter(|t| t.condition.get()).map(|t| t.key).collect::<Vec<_>>()
        };
        assert_eq!(active(&transformers), vec!["sm"]);
        size.set(Vec2::new(1300.0, 100.0));
        assert_eq!(active(&transformers), vec!["sm", "md", "lg", "xl"]);
    }

    #[test]
    fn test_sort_by_priority() {
        let mut ts = root_transformers(&signal(false), &signal(Vec2::ZERO));
        ts.extend(interaction_transformers(derived(|| false), derived(|| false), None));
        sort_by_priority(&mut ts);
        let keys: Vec<_> = ts.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec!["active", "hover", "2xl", "xl", "lg", "md", "sm", "dark"]);
    }
}

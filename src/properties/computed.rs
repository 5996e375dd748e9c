//! Per-key derived reads of a resolved table.

use super::merged::MergedProperties;
use crate::reactive::{Derived, derived, untrack};

/// Derived cell for one key of a resolved table.
///
/// Re-runs when the table changes or when the value cell behind `key` changes,
/// and only notifies dependents when the read result differs.
pub fn computed_property<T: Clone + PartialEq + 'static>(
    merged: &Derived<MergedProperties>,
    key: &'static str,
    read: impl Fn(&MergedProperties, &str) -> T + 'static,
) -> Derived<T> {
    let merged = merged.clone();
    derived(move || merged.with(|m| read(m, key)))
}

/// Imperative untracked read of one key.
pub fn get_computed_property<T: PartialEq + 'static>(
    merged: &Derived<MergedProperties>,
    key: &str,
    read: impl FnOnce(&MergedProperties, &str) -> T,
) -> T {
    untrack(|| merged.with(|m| read(m, key)))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::properties::{MergeSources, Properties, PropertyValue, merge_properties};
    use crate::reactive::{effect, signal};

    #[test]
    fn test_computed_property_tracks_value_cell() {
        let opacity = signal(PropertyValue::Number(0.5));
        let explicit = signal(Properties::new().with("opacity", opacity.clone()));
        let merged = merge_properties(
            MergeSources {
                properties: explicit.clone(),
                style: signal(Properties::new()),
                defaults: signal(Properties::new()),
                inherited: None,
            },
            Vec::new(),
            None,
        );
        let op = computed_property(&merged, "opacity", MergedProperties::number);
        let runs = Rc::new(Cell::new(0));
        let (o, r) = (op.clone(), runs.clone());
        let e = effect(move || {
            o.get();
            r.set(r.get() + 1);
        });

        opacity.set(PropertyValue::Number(0.25));
        assert_eq!(op.get(), 0.25);
        assert_eq!(runs.get(), 2);

        // Unrelated key change re-merges but leaves opacity untouched.
        explicit.update(|p| p.set("width", 10));
        assert_eq!(runs.get(), 2);

        assert_eq!(get_computed_property(&merged, "width", MergedProperties::number), 10.0);
        e.dispose();
    }
}

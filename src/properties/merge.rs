//! Layered merge of property sources.
//!
//! # Precedence
//!
//! ```text
//! explicit properties
//!   > style
//!   > active transformers, highest priority first
//!       (each: explicit[key] > style[key] > defaults[key])
//!   > default properties
//!   > inherited parent values (inheritable keys only)
//!   > built-in default (applied on read)
//! ```
//!
//! The first layer that *contains* a key wins. Key presence, not the value,
//! decides: an explicit `Null` in the explicit layer still shadows the style.

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::aliases::{ExtraVisitor, Shorthand, shorthand};
use super::defaults::is_inheritable;
use super::merged::MergedProperties;
use super::source::{Properties, PropertyEntry};
use super::transformers::{Transformer, sort_by_priority};
use super::value::PropCell;
use crate::reactive::{Derived, Signal, derived};

/// One contribution to a merge, in precedence order.
#[derive(Debug, Clone, Copy)]
pub enum LayerSource<'a> {
    Explicit(&'a Properties),
    Style(&'a Properties),
    Transformer { key: &'static str, layer: &'a Properties },
    Defaults(&'a Properties),
    Inherited(&'a MergedProperties),
}

/// Accumulates layers with first-defined-wins semantics.
pub struct MergeBuilder<'v> {
    values: IndexMap<String, PropCell>,
    visitor: Option<&'v ExtraVisitor>,
}

impl<'v> MergeBuilder<'v> {
    pub fn new(visitor: Option<&'v ExtraVisitor>) -> Self {
        Self { values: IndexMap::new(), visitor }
    }

    /// Add a single key. Returns false when a higher layer already set it.
    pub fn add(&mut self, key: &str, value: &PropCell) -> bool {
        if self.values.contains_key(key) {
            return false;
        }
        self.values.insert(key.to_string(), value.clone());
        true
    }

    pub fn add_layer(&mut self, source: LayerSource<'_>) {
        let mut layer: IndexMap<String, PropCell> = IndexMap::new();
        match source {
            LayerSource::Explicit(p)
            | LayerSource::Style(p)
            | LayerSource::Defaults(p)
            | LayerSource::Transformer { layer: p, .. } => expand_layer(p, &mut layer),
            LayerSource::Inherited(parent) => {
                for (key, value) in parent.iter().filter(|(k, _)| is_inheritable(k)) {
                    layer.insert(key.to_string(), value.clone());
                }
            }
        }

        if let Some(visitor) = self.visitor {
            let visited: Vec<(String, PropCell)> =
                layer.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (key, value) in &visited {
                visitor(key, value, &mut |alias, aliased| {
                    layer.entry(alias.to_string()).or_insert(aliased);
                });
            }
        }

        for (key, value) in layer {
            self.values.entry(key).or_insert(value);
        }
    }

    pub fn finish(self) -> MergedProperties {
        MergedProperties::from_values(self.values)
    }
}

/// Plain values of one layer with shorthands expanded below the layer's own per-side keys.
fn expand_layer(properties: &Properties, out: &mut IndexMap<String, PropCell>) {
    let mut shorthands: SmallVec<[(&'static Shorthand, &PropCell); 4]> = SmallVec::new();
    for (key, entry) in properties.iter() {
        // Conditional objects are contributed by their transformer.
        let PropertyEntry::Value(value) = entry else { continue };
        match shorthand(key) {
            Some(sh) => shorthands.push((sh, value)),
            None => {
                out.insert(key.to_string(), value.clone());
            }
        }
    }
    shorthands.sort_by_key(|(sh, _)| sh.specificity);
    for (sh, value) in shorthands {
        for target in sh.targets {
            out.entry(target.to_string()).or_insert_with(|| value.clone());
        }
    }
}

/// Merge layers given in precedence order.
pub fn merge_layers(layers: &[LayerSource<'_>], visitor: Option<&ExtraVisitor>) -> MergedProperties {
    let mut builder = MergeBuilder::new(visitor);
    for layer in layers {
        builder.add_layer(*layer);
    }
    builder.finish()
}

/// The reactive inputs of one element's merge.
#[derive(Clone)]
pub struct MergeSources {
    pub properties: Signal<Properties>,
    pub style: Signal<Properties>,
    pub defaults: Signal<Properties>,
    pub inherited: Option<Derived<MergedProperties>>,
}

/// Build the derived resolved table of one element.
///
/// Transformer conditions are only read while some layer holds a conditional
/// object for that transformer, so unrelated state changes never re-run the merge.
pub fn merge_properties(
    sources: MergeSources,
    transformers: Vec<Transformer>,
    extra_visitor: Option<ExtraVisitor>,
) -> Derived<MergedProperties> {
    let mut transformers = transformers;
    sort_by_priority(&mut transformers);

    derived(move || {
        let MergeSources { properties, style, defaults, inherited } = &sources;
        properties.with(|explicit| {
            style.with(|style| {
                defaults.with(|defaults| {
                    let mut layers = vec![LayerSource::Explicit(explicit), LayerSource::Style(style)];
                    for transformer in &transformers {
                        let conditional = [
                            explicit.conditional(transformer.key),
                            style.conditional(transformer.key),
                            defaults.conditional(transformer.key),
                        ];
                        if conditional.iter().all(Option::is_none) || !transformer.condition.get() {
                            continue;
                        }
                        layers.extend(conditional.into_iter().flatten().map(|layer| {
                            LayerSource::Transformer { key: transformer.key, layer }
                        }));
                    }
                    layers.push(LayerSource::Defaults(defaults));

                    match inherited {
                        Some(parent) => parent.with(|parent| {
                            let all: Vec<LayerSource<'_>> = layers
                                .iter()
                                .copied()
                                .chain(std::iter::once(LayerSource::Inherited(parent)))
                                .collect();
                            merge_layers(&all, extra_visitor.as_ref())
                        }),
                        None => merge_layers(&layers, extra_visitor.as_ref()),
                    }
                })
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::properties::{PropertyValue, alias_visitor, CARET_ALIASES};
    use crate::reactive::signal;

    fn sources(explicit: Properties, style: Properties, defaults: Properties) -> MergeSources {
        MergeSources {
            properties: signal(explicit),
            style: signal(style),
            defaults: signal(defaults),
            inherited: None,
        }
    }

    #[test]
    fn test_precedence_explicit_style_defaults() {
        let explicit = Properties::new().with("a", 1);
        let style = Properties::new().with("a", 2).with("b", 2);
        let defaults = Properties::new().with("a", 3).with("b", 3).with("c", 3);
        let m = merge_layers(
            &[
                LayerSource::Explicit(&explicit),
                LayerSource::Style(&style),
                LayerSource::Defaults(&defaults),
            ],
            None,
        );
        assert_eq!(m.number("a"), 1.0);
        assert_eq!(m.number("b"), 2.0);
        assert_eq!(m.number("c"), 3.0);
    }

    #[test]
    fn test_explicit_null_shadows_lower_layers() {
        let explicit = Properties::new().with("width", PropertyValue::Null);
        let style = Properties::new().with("width", 50);
        let m = merge_layers(&[LayerSource::Explicit(&explicit), LayerSource::Style(&style)], None);
        assert_eq!(m.get("width"), Some(&PropCell::from(PropertyValue::Null)));
    }

    #[test]
    fn test_per_side_beats_shorthand_in_same_layer() {
        let style = Properties::new().with("padding", 10).with("paddingX", 5).with("paddingLeft", 1);
        let m = merge_layers(&[LayerSource::Style(&style)], None);
        assert_eq!(m.number("paddingTop"), 10.0);
        assert_eq!(m.number("paddingRight"), 5.0);
        assert_eq!(m.number("paddingLeft"), 1.0);
    }

    #[test]
    fn test_shorthand_in_higher_layer_beats_lower_per_side() {
        let explicit = Properties::new().with("padding", 4);
        let style = Properties::new().with("paddingTop", 9);
        let m = merge_layers(&[LayerSource::Explicit(&explicit), LayerSource::Style(&style)], None);
        assert_eq!(m.number("paddingTop"), 4.0);
    }

    #[test]
    fn test_transformer_priority() {
        let hovered = signal(false);
        let focused = signal(false);
        let (h, f) = (hovered.clone(), focused.clone());
        let style = Properties::new()
            .with("color", "red")
            .with_conditional("hover", Properties::new().with("color", "green").with("opacity", 0.5))
            .with_conditional("focus", Properties::new().with("color", "blue"));
        let defaults = Properties::new()
            .with("opacity", 0.9)
            .with_conditional("hover", Properties::new().with("opacity", 0.7).with("borderRadius", 3));
        let transformers = vec![
            Transformer::new("hover", 7, derived(move || h.get())),
            Transformer::new("focus", 9, derived(move || f.get())),
        ];
        let merged = merge_properties(sources(Properties::new(), style, defaults), transformers, None);

        assert_eq!(merged.get().value("color").as_str(), Some("red"));
        assert_eq!(merged.get().number("opacity"), 0.9);

        hovered.set(true);
        // style keys still beat transformer keys
        assert_eq!(merged.get().value("color").as_str(), Some("red"));
        // transformer (style conditional) beats defaults conditional and defaults
        assert_eq!(merged.get().number("opacity"), 0.5);
        assert_eq!(merged.get().number("borderRadius"), 3.0);

        focused.set(true);
        hovered.set(false);
        assert_eq!(merged.get().number("opacity"), 0.9);
        assert!(!merged.get().contains_key("borderRadius"));
    }

    #[test]
    fn test_transformer_beats_defaults() {
        let active = signal(true);
        let a = active.clone();
        let defaults = Properties::new()
            .with("backgroundColor", "#000")
            .with_conditional("active", Properties::new().with("backgroundColor", "#fff"));
        let merged = merge_properties(
            sources(Properties::new(), Properties::new(), defaults),
            vec![Transformer::new("active", 8, derived(move || a.get()))],
            None,
        );
        assert_eq!(merged.get().value("backgroundColor").as_str(), Some("#fff"));
        active.set(false);
        assert_eq!(merged.get().value("backgroundColor").as_str(), Some("#000"));
    }

    #[test]
    fn test_unused_transformer_condition_is_not_read() {
        let reads = Rc::new(Cell::new(0));
        let r = reads.clone();
        let merged = merge_properties(
            sources(Properties::new().with("width", 10), Properties::new(), Properties::new()),
            vec![Transformer::new("hover", 7, derived(move || {
                r.set(r.get() + 1);
                true
            }))],
            None,
        );
        assert_eq!(merged.get().number("width"), 10.0);
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let s = sources(Properties::new().with("width", 10), Properties::new().with("height", 5), Properties::new());
        let style = s.style.clone();
        let merged = merge_properties(s, Vec::new(), None);
        let first = merged.get();

        style.update(|props| *props = Properties::new().with("height", 5));
        assert_eq!(merged.get(), first);
    }

    #[test]
    fn test_value_cell_change_does_not_remerge() {
        let width = signal(PropertyValue::Number(10.0));
        let s = sources(Properties::new().with("width", width.clone()), Properties::new(), Properties::new());
        let merged = merge_properties(s, Vec::new(), None);
        let before = merged.get();
        width.set(PropertyValue::Number(20.0));
        assert_eq!(merged.get(), before);
        assert_eq!(merged.get().number("width"), 20.0);
    }

    #[test]
    fn test_inherited_respects_non_inheritable() {
        let parent = merge_properties(
            sources(Properties::new().with("color", "red").with("width", 50), Properties::new(), Properties::new()),
            Vec::new(),
            None,
        );
        let child = merge_properties(
            MergeSources {
                properties: signal(Properties::new()),
                style: signal(Properties::new()),
                defaults: signal(Properties::new().with("fontSize", 12)),
                inherited: Some(parent),
            },
            Vec::new(),
            None,
        );
        let m = child.get();
        assert_eq!(m.value("color").as_str(), Some("red"));
        assert!(!m.contains_key("width"));
        assert_eq!(m.number("fontSize"), 12.0);
    }

    #[test]
    fn test_extra_visitor_alias_uses_layer_precedence() {
        let style = Properties::new().with("opacity", 0.5);
        let defaults = Properties::new().with("caretOpacity", 0.2);
        let visitor = alias_visitor(CARET_ALIASES);
        let m = merge_layers(
            &[LayerSource::Style(&style), LayerSource::Defaults(&defaults)],
            Some(&visitor),
        );
        assert_eq!(m.number("caretOpacity"), 0.5);

        let explicit = Properties::new().with("caretOpacity", 1.0);
        let m = merge_layers(&[LayerSource::Explicit(&explicit), LayerSource::Style(&style)], Some(&visitor));
        assert_eq!(m.number("caretOpacity"), 1.0);
    }
}

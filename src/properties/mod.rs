//! # Property Merge Engine
//!
//! Layers an element's explicit properties, style, default properties,
//! conditional transformer objects and inherited parent values into one
//! resolved table ([`MergedProperties`]).
//!
//! ## Modules
//!
//! - [`value`] - `PropertyValue` and the static/signal/getter `PropCell`
//! - [`source`] - partial property objects (`Properties`)
//! - [`merge`] - layer precedence and the derived merge
//! - [`transformers`] - hover/active/focus/dark/breakpoint conditions
//! - [`aliases`] - shorthand expansion and alias visitors
//! - [`defaults`] - built-in defaults and non-inheritable keys

pub mod aliases;
pub mod computed;
pub mod defaults;
pub mod merge;
pub mod merged;
pub mod source;
pub mod transformers;
pub mod value;

pub use aliases::{CARET_ALIASES, ExtraVisitor, alias_visitor};
pub use computed::{computed_property, get_computed_property};
pub use defaults::{NON_INHERITABLE, builtin_default, is_inheritable};
pub use merge::{LayerSource, MergeBuilder, MergeSources, merge_layers, merge_properties};
pub use merged::MergedProperties;
pub use source::{Properties, PropertyEntry};
pub use transformers::{Transformer, interaction_transformers, root_transformers};
pub use value::{PropCell, PropertyValue};

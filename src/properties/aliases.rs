//! Shorthand expansion and alias visitors.

use std::rc::Rc;

use super::value::PropCell;

/// A shorthand key that expands to per-side keys while its layer is merged.
#[derive(Debug)]
pub struct Shorthand {
    pub key: &'static str,
    /// Lower expands first, so `paddingX` beats `padding` inside one layer.
    pub specificity: u8,
    pub targets: &'static [&'static str],
}

pub const SHORTHANDS: &[Shorthand] = &[
    Shorthand {
        key: "padding",
        specificity: 1,
        targets: &["paddingTop", "paddingRight", "paddingBottom", "paddingLeft"],
    },
    Shorthand { key: "paddingX", specificity: 0, targets: &["paddingLeft", "paddingRight"] },
    Shorthand { key: "paddingY", specificity: 0, targets: &["paddingTop", "paddingBottom"] },
    Shorthand {
        key: "margin",
        specificity: 1,
        targets: &["marginTop", "marginRight", "marginBottom", "marginLeft"],
    },
    Shorthand { key: "marginX", specificity: 0, targets: &["marginLeft", "marginRight"] },
    Shorthand { key: "marginY", specificity: 0, targets: &["marginTop", "marginBottom"] },
    Shorthand {
        key: "borderWidth",
        specificity: 1,
        targets: &["borderTopWidth", "borderRightWidth", "borderBottomWidth", "borderLeftWidth"],
    },
    Shorthand { key: "borderX", specificity: 0, targets: &["borderLeftWidth", "borderRightWidth"] },
    Shorthand { key: "borderY", specificity: 0, targets: &["borderTopWidth", "borderBottomWidth"] },
    Shorthand { key: "gap", specificity: 1, targets: &["gapRow", "gapColumn"] },
    Shorthand {
        key: "inset",
        specificity: 1,
        targets: &["positionTop", "positionRight", "positionBottom", "positionLeft"],
    },
];

pub fn shorthand(key: &str) -> Option<&'static Shorthand> {
    SHORTHANDS.iter().find(|s| s.key == key)
}

/// Called once per layered key; may emit alias keys at the same layer's precedence.
pub type ExtraVisitor = Rc<dyn Fn(&str, &PropCell, &mut dyn FnMut(&str, PropCell))>;

/// `(source, alias)` pairs for input elements: the caret follows the text color and opacity.
pub const CARET_ALIASES: &[(&str, &str)] = &[("color", "caretColor"), ("opacity", "caretOpacity")];

/// Visitor that copies every `source` key to its `alias`.
pub fn alias_visitor(aliases: &'static [(&'static str, &'static str)]) -> ExtraVisitor {
    Rc::new(move |key: &str, value: &PropCell, emit: &mut dyn FnMut(&str, PropCell)| {
        for (source, alias) in aliases {
            if *source == key {
                emit(alias, value.clone());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_lookup() {
        assert_eq!(shorthand("paddingX").map(|s| s.targets.len()), Some(2));
        assert!(shorthand("paddingTop").is_none());
    }

    #[test]
    fn test_alias_visitor_emits() {
        let visitor = alias_visitor(CARET_ALIASES);
        let mut emitted = Vec::new();
        visitor("opacity", &PropCell::from(0.5), &mut |k, v| emitted.push((k.to_string(), v)));
        visitor("width", &PropCell::from(1), &mut |k, v| emitted.push((k.to_string(), v)));
        assert_eq!(emitted, vec![("caretOpacity".to_string(), PropCell::from(0.5))]);
    }
}

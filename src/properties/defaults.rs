//! Built-in defaults and inheritance rules.

use super::value::PropertyValue;
use crate::types::Color;

/// Keys a child never inherits from its parent's resolved table.
///
/// Layout, box decoration and identity keys stay with the element that set them.
pub const NON_INHERITABLE: &[&str] = &[
    // Identity and content
    "id",
    "text",
    "src",
    "value",
    "defaultValue",
    "placeholder",
    "type",
    "disabled",
    "multiline",
    "tabIndex",
    "autocomplete",
    "aspectRatio",
    "depthAlign",
    "keepAspectRatio",
    // Box
    "width",
    "height",
    "minWidth",
    "minHeight",
    "maxWidth",
    "maxHeight",
    "paddingTop",
    "paddingRight",
    "paddingBottom",
    "paddingLeft",
    "marginTop",
    "marginRight",
    "marginBottom",
    "marginLeft",
    "borderTopWidth",
    "borderRightWidth",
    "borderBottomWidth",
    "borderLeftWidth",
    "borderColor",
    "borderOpacity",
    "borderRadius",
    "backgroundColor",
    "backgroundOpacity",
    // Flex
    "display",
    "visibility",
    "overflow",
    "positionType",
    "positionTop",
    "positionRight",
    "positionBottom",
    "positionLeft",
    "flexDirection",
    "flexWrap",
    "flexGrow",
    "flexShrink",
    "flexBasis",
    "justifyContent",
    "alignItems",
    "alignSelf",
    "alignContent",
    "gapRow",
    "gapColumn",
    // Ordering and transforms
    "zIndexOffset",
    "transformTranslateX",
    "transformTranslateY",
    "transformTranslateZ",
    "transformRotateZ",
    "transformScaleX",
    "transformScaleY",
    "transformOriginX",
    "transformOriginY",
];

pub fn is_inheritable(key: &str) -> bool {
    !NON_INHERITABLE.contains(&key)
}

/// The value used when no layer defines `key`.
pub fn builtin_default(key: &str) -> Option<PropertyValue> {
    let value = match key {
        "opacity" | "backgroundOpacity" | "borderOpacity" | "transformScaleX"
        | "transformScaleY" | "flexShrink" => PropertyValue::Number(1.0),
        "lineHeight" => PropertyValue::Number(1.2),
        "fontSize" => PropertyValue::Number(16.0),
        "fontWeight" => PropertyValue::Number(400.0),
        "fontFamily" => PropertyValue::from("inter"),
        "color" => PropertyValue::Color(Color::WHITE),
        "borderColor" => PropertyValue::Color(Color::BLACK),
        "selectionColor" => PropertyValue::from("#1a73e8"),
        "wordBreak" => PropertyValue::from("break-word"),
        "textAlign" => PropertyValue::from("left"),
        "flexDirection" => PropertyValue::from("column"),
        "display" => PropertyValue::from("flex"),
        "visibility" => PropertyValue::from("visible"),
        "keepAspectRatio" => PropertyValue::Bool(true),
        "depthAlign" => PropertyValue::from("back"),
        "overflow" => PropertyValue::from("visible"),
        "positionType" => PropertyValue::from("relative"),
        "transformOriginX" | "transformOriginY" => PropertyValue::from("center"),
        "width" | "height" | "flexBasis" => PropertyValue::Auto,
        "disabled" | "multiline" => PropertyValue::Bool(false),
        "type" => PropertyValue::from("text"),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inheritable() {
        assert!(is_inheritable("color"));
        assert!(is_inheritable("fontSize"));
        assert!(!is_inheritable("width"));
        assert!(!is_inheritable("backgroundColor"));
    }

    #[test]
    fn test_builtin_defaults() {
        assert_eq!(builtin_default("opacity"), Some(PropertyValue::Number(1.0)));
        assert_eq!(builtin_default("lineHeight"), Some(PropertyValue::Number(1.2)));
        assert_eq!(builtin_default("nope"), None);
    }
}

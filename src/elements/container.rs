//! Container - a flex box with a background panel and children.

use std::ops::Deref;

use super::element::{BodyContext, BodyOutput, Element, ElementBody};
use crate::properties::Properties;

struct ContainerBody;

impl ElementBody for ContainerBody {
    fn build(&self, _cx: &BodyContext<'_>) -> BodyOutput {
        BodyOutput::default()
    }
}

#[derive(Clone, Debug)]
pub struct Container {
    element: Element,
}

impl Container {
    pub fn new() -> Self {
        Self { element: Element::with_body(ContainerBody) }
    }

    /// Container with an initial style.
    pub fn with_style(style: Properties) -> Self {
        let container = Self::new();
        container.set_style(style, true);
        container
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Container {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

//! # Elements
//!
//! The element kinds of a tree and the mount lifecycle they share.
//!
//! Every element is a thin wrapper around [`Element`], which owns the
//! property sources and listeners and builds the mounted internals. Kinds
//! differ only in the surfaces they add on top of the background panel:
//!
//! - [`Container`] - background panel only
//! - [`Text`] - glyphs measured into the layout
//! - [`Image`] / [`Icon`] - textured quads with an intrinsic aspect ratio
//! - [`Input`] - editable text with caret and selection
//! - [`Content`] - embedder 3D objects scaled into the box
//!
//! A [`Root`] owns the services of one tree and is the parent of its top-level
//! elements.

mod container;
mod content;
mod context;
mod element;
mod icon;
mod image;
mod input;
mod root;
mod text;

pub use container::Container;
pub use content::{Bounds, Content, ContentChild, FitOptions, fit_matrix, measure};
pub use context::{ParentContext, RootContext};
pub use element::{Element, ElementInternals, Listeners, ParentHandle, ParentSource, TextInternals};
pub use icon::{Icon, IconSource};
pub use image::{Image, ImageSource};
pub use input::{Input, display_text};
pub use root::{FrameStats, Root, RootServices};
pub use text::Text;

//! # spark-uikit
//!
//! Reactive flexbox UI toolkit for 3D scenes with GPU-instanced rendering.
//!
//! ## Architecture
//!
//! Every element resolves its properties through a fine-grained reactive
//! graph, lays out with Taffy and draws its surfaces as instances of shared
//! GPU buffers:
//! ```text
//! Properties/Style/Defaults → MergedProperties → FlexNode → matrices/clipping
//!                                             ↘ OrderInfo → InstanceList → InstancedGroup
//! ```
//!
//! Nothing is recomputed unless a cell it read changed: a color change
//! rewrites one instance slot, a width change reruns layout and rewrites the
//! slots whose matrices moved.
//!
//! ## Modules
//!
//! - [`reactive`] - signals, derived cells, effects and batching
//! - [`properties`] - layered property merge with conditional transformers
//! - [`layout`] - Taffy bridge, transforms and clipping
//! - [`order`] - draw order classes and group keys
//! - [`render`] - instanced render groups and the GPU contract
//! - [`text`] - glyph layout, caret and selection
//! - [`input`] - platform text-input bridge
//! - [`events`] - pointer hit testing and dispatch
//! - [`lifecycle`] - initializers and subscriptions
//! - [`elements`] - container, text, image, icon, input and root
//!
//! ## Example
//!
//! ```
//! use spark_uikit::{Container, Properties, Root, RootConfig, Text, ParentHandle};
//!
//! let root = Root::new(RootConfig::default().with_size(400.0, 300.0)).unwrap();
//! let panel = Container::with_style(Properties::new().with("padding", 10.0));
//! panel.set_parent(Some(root.as_parent()));
//!
//! let label = Text::new("Hello");
//! label.set_parent(Some(panel.as_parent()));
//!
//! let stats = root.frame().unwrap();
//! assert!(stats.layout_ran);
//! ```

pub mod config;
pub mod elements;
pub mod error;
pub mod events;
pub mod input;
pub mod layout;
pub mod lifecycle;
pub mod order;
pub mod properties;
pub mod reactive;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod text;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{FontSpec, RootConfig};

pub use error::{ErrorSink, GpuError, LayoutError, LifecycleError, PropertyError, ReactiveError, UiError};

pub use reactive::{Derived, Effect, Signal, SignalExt, batch, derived, effect, on_cleanup, signal, untrack};

pub use properties::{MergedProperties, PropCell, Properties, PropertyValue};

pub use spark_signals::PropValue;

pub use elements::{
    Bounds, Container, Content, Element, ElementInternals, FrameStats, Icon, IconSource, Image, ImageSource, Input,
    Listeners, ParentHandle, ParentSource, Root, RootServices, Text,
};

pub use events::{EventHandlers, PointerEvent, PointerInput};

pub use layout::{ClipRect, LayoutEngine, TaffyLayoutEngine};

pub use render::{GpuBackend, HeadlessGpu, InstanceData};

pub use input::{TextInputPlatform, TextInputSurface, VirtualTextInputPlatform};

pub use text::{Selection, SelectionDirection, TextShaper};

pub use lifecycle::{Initializer, Subscription};

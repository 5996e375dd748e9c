//! # Instanced Render Groups
//!
//! Surfaces with equal [`GroupKey`](crate::order::GroupKey)s share one GPU
//! instance buffer. The [`InstanceManager`] owns all groups of a root:
//!
//! - slots are handed out lowest-free-first, buffers grow by the configured factor
//! - writes are staged on the CPU and uploaded as one dirty range per group
//! - groups are drawn in `(z_index_class, element_type, creation)` order, and
//!   instances inside a group in element sequence order
//! - a group is destroyed when its last slot is released
//!
//! Elements bind their surfaces through [`InstanceList`], which follows the
//! surface's order, visibility and instance data reactively.

mod gpu;
mod group;
mod instance;
mod list;
mod manager;
mod panel;

pub use gpu::{GpuBackend, GroupId, HeadlessBuffer, HeadlessGpu};
pub use group::{InstancedGroup, SlotOrder};
pub use instance::{INSTANCE_SIZE, InstanceData};
pub use list::InstanceList;
pub use manager::{InstanceManager, SlotHandle};
pub use panel::{SurfaceGeometry, border_radius, instanced_panel, panel_instance};

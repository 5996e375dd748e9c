//! Scene graph placement contract.
//!
//! Every mounted element owns one scene object whose world matrix is
//! `root_world × scale(pixel_size) × global_matrix`. Embedders attach their
//! own 3D content to those objects.

use std::cell::RefCell;
use std::collections::HashMap;

use glam::Mat4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneObjectId(pub u64);

pub trait SceneGraph {
    fn set_world_matrix(&self, object: SceneObjectId, world: Mat4);
    fn remove_object(&self, object: SceneObjectId);
}

/// Records the last world matrix of every object.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    objects: RefCell<HashMap<SceneObjectId, Mat4>>,
    writes: RefCell<u64>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world_matrix(&self, object: SceneObjectId) -> Option<Mat4> {
        self.objects.borrow().get(&object).copied()
    }

    pub fn object_count(&self) -> usize {
        self.objects.borrow().len()
    }

    /// Total matrix writes so far.
    pub fn writes(&self) -> u64 {
        *self.writes.borrow()
    }
}

impl SceneGraph for HeadlessScene {
    fn set_world_matrix(&self, object: SceneObjectId, world: Mat4) {
        self.objects.borrow_mut().insert(object, world);
        *self.writes.borrow_mut() += 1;
    }

    fn remove_object(&self, object: SceneObjectId) {
        self.objects.borrow_mut().remove(&object);
    }
}

//! GPU buffer contract and the headless backend.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::GpuError;

/// Identifier of one instanced group on the backend.
pub type GroupId = u64;

/// Instanced-mesh capabilities the render manager needs.
///
/// Implementations use interior mutability; the manager only holds shared handles.
pub trait GpuBackend {
    /// (Re)allocate the instance buffer of `group` with room for `capacity` instances.
    /// Previous contents are discarded; the manager re-uploads them.
    fn allocate_instances(&self, group: GroupId, capacity: u32) -> Result<(), GpuError>;

    /// Upload instances starting at `first_slot`.
    fn write_instance_data(&self, group: GroupId, first_slot: u32, bytes: &[u8]) -> Result<(), GpuError>;

    /// Draw the first `count` instances of `group`.
    fn draw(&self, group: GroupId, count: u32) -> Result<(), GpuError>;

    fn release(&self, group: GroupId);
}

#[derive(Debug, Default, Clone)]
pub struct HeadlessBuffer {
    pub capacity: u32,
    pub bytes: Vec<u8>,
    pub uploads: usize,
}

/// CPU-side backend: buffers are byte vectors, draws are logged.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    instance_size: usize,
    max_capacity: Option<u32>,
    buffers: RefCell<HashMap<GroupId, HeadlessBuffer>>,
    draws: RefCell<Vec<(GroupId, u32)>>,
}

impl HeadlessGpu {
    pub fn new(instance_size: usize) -> Self {
        Self { instance_size, ..Self::default() }
    }

    /// Fail allocations above `max` instances.
    pub fn with_max_capacity(mut self, max: u32) -> Self {
        self.max_capacity = Some(max);
        self
    }

    pub fn buffer(&self, group: GroupId) -> Option<HeadlessBuffer> {
        self.buffers.borrow().get(&group).cloned()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.borrow().len()
    }

    /// Draw calls since the last call, in submission order.
    pub fn take_draws(&self) -> Vec<(GroupId, u32)> {
        std::mem::take(&mut *self.draws.borrow_mut())
    }
}

impl GpuBackend for HeadlessGpu {
    fn allocate_instances(&self, group: GroupId, capacity: u32) -> Result<(), GpuError> {
        if self.max_capacity.is_some_and(|max| capacity > max) {
            return Err(GpuError::AllocationFailed { group, requested: capacity });
        }
        let bytes = vec![0; capacity as usize * self.instance_size];
        self.buffers.borrow_mut().insert(group, HeadlessBuffer { capacity, bytes, uploads: 0 });
        Ok(())
    }

    fn write_instance_data(&self, group: GroupId, first_slot: u32, bytes: &[u8]) -> Result<(), GpuError> {
        let mut buffers = self.buffers.borrow_mut();
        let buffer = buffers.get_mut(&group).ok_or(GpuError::UnknownGroup(group))?;
        let start = first_slot as usize * self.instance_size;
        let end = start + bytes.len();
        if end > buffer.bytes.len() {
            return Err(GpuError::SlotOutOfRange { group, slot: first_slot, capacity: buffer.capacity });
        }
        buffer.bytes[start..end].copy_from_slice(bytes);
        buffer.uploads += 1;
        Ok(())
    }

    fn draw(&self, group: GroupId, count: u32) -> Result<(), GpuError> {
        if !self.buffers.borrow().contains_key(&group) {
            return Err(GpuError::UnknownGroup(group));
        }
        self.draws.borrow_mut().push((group, count));
        Ok(())
    }

    fn release(&self, group: GroupId) {
        self.buffers.borrow_mut().remove(&group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_limit() {
        let gpu = HeadlessGpu::new(4).with_max_capacity(8);
        assert!(gpu.allocate_instances(1, 8).is_ok());
        assert!(matches!(
            gpu.allocate_instances(1, 16),
            Err(GpuError::AllocationFailed { group: 1, requested: 16 })
        ));
    }

    #[test]
    fn test_write_bounds() {
        let gpu = HeadlessGpu::new(4);
        gpu.allocate_instances(7, 2).unwrap();
        gpu.write_instance_data(7, 1, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&gpu.buffer(7).unwrap().bytes[4..8], &[1, 2, 3, 4]);
        assert!(gpu.write_instance_data(7, 2, &[0; 4]).is_err());
        assert!(matches!(gpu.write_instance_data(9, 0, &[]), Err(GpuError::UnknownGroup(9))));
    }
}

//! Instance manager - owns every instanced group of one root.
//!
//! Elements never touch buffers. They hold a [`SlotHandle`] and go through
//! [`InstanceManager::write_instance`]; writes are staged and reach the GPU
//! in [`InstanceManager::flush`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::gpu::{GpuBackend, GroupId};
use super::group::{InstancedGroup, SlotOrder};
use super::instance::InstanceData;
use crate::config::RootConfig;
use crate::error::GpuError;
use crate::order::GroupKey;

/// A slot inside the group selected by `key`. Released through
/// [`InstanceManager::release_slot`], which consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct SlotHandle {
    key: GroupKey,
    group: GroupId,
    slot: u32,
}

impl SlotHandle {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }
}

pub struct InstanceManager {
    backend: Rc<dyn GpuBackend>,
    groups: RefCell<IndexMap<GroupKey, InstancedGroup>>,
    next_group: Cell<GroupId>,
    initial_capacity: u32,
    growth_factor: u32,
}

impl InstanceManager {
    pub fn new(backend: Rc<dyn GpuBackend>, config: &RootConfig) -> Self {
        Self {
            backend,
            groups: RefCell::new(IndexMap::new()),
            next_group: Cell::new(1),
            initial_capacity: config.initial_group_capacity,
            growth_factor: config.group_growth_factor,
        }
    }

    /// Take a slot in the group of `key`, drawn at `order` among its neighbours.
    pub fn acquire_slot(&self, key: &GroupKey, order: SlotOrder) -> Result<SlotHandle, GpuError> {
        let mut groups = self.groups.borrow_mut();
        if !groups.contains_key(key) {
            let id = self.next_group.get();
            self.next_group.set(id + 1);
            let group = InstancedGroup::new(
                self.backend.as_ref(),
                id,
                key.clone(),
                id,
                self.initial_capacity,
                self.growth_factor,
            )?;
            tracing::debug!(group = id, z = key.z_index_class, element_type = ?key.element_type, "instanced group created");
            groups.insert(key.clone(), group);
        }
        let group = groups.get_mut(key).ok_or(GpuError::UnknownGroup(0))?;
        let slot = group.acquire(self.backend.as_ref(), order)?;
        Ok(SlotHandle { key: key.clone(), group: group.id(), slot })
    }

    /// Release a slot. The group is destroyed when its last slot goes.
    pub fn release_slot(&self, handle: SlotHandle) {
        let mut groups = self.groups.borrow_mut();
        let Some(group) = groups.get_mut(&handle.key) else {
            return;
        };
        group.release(handle.slot);
        if group.is_empty() {
            let id = group.id();
            groups.shift_remove(&handle.key);
            self.backend.release(id);
            tracing::debug!(group = id, "instanced group destroyed");
        }
    }

    pub fn write_instance(&self, handle: &SlotHandle, data: InstanceData) -> Result<(), GpuError> {
        let mut groups = self.groups.borrow_mut();
        let group = groups.get_mut(&handle.key).ok_or(GpuError::UnknownGroup(handle.group))?;
        group.write(handle.slot, data)
    }

    pub fn set_slot_order(&self, handle: &SlotHandle, order: SlotOrder) -> Result<(), GpuError> {
        let mut groups = self.groups.borrow_mut();
        let group = groups.get_mut(&handle.key).ok_or(GpuError::UnknownGroup(handle.group))?;
        group.set_order(handle.slot, order)
    }

    pub fn instance(&self, handle: &SlotHandle) -> Option<InstanceData> {
        self.groups.borrow().get(&handle.key).and_then(|group| group.instance(handle.slot).copied())
    }

    /// Upload staged writes, one contiguous range per group.
    pub fn flush(&self) -> Result<(), GpuError> {
        let mut groups = self.groups.borrow_mut();
        for group in groups.values_mut() {
            group.flush(self.backend.as_ref())?;
        }
        Ok(())
    }

    /// Draw every group in `(z_index_class, element_type, creation)` order.
    ///
    /// Returns the number of groups drawn.
    pub fn draw(&self) -> Result<usize, GpuError> {
        let groups = self.groups.borrow();
        let mut ordered: Vec<&InstancedGroup> = groups.values().collect();
        ordered.sort_by_key(|group| {
            let key = group.key();
            (key.z_index_class, key.element_type.rank(), group.sequence())
        });
        for group in &ordered {
            group.draw(self.backend.as_ref())?;
        }
        Ok(ordered.len())
    }

    pub fn group_count(&self) -> usize {
        self.groups.borrow().len()
    }

    pub fn group_capacity(&self, key: &GroupKey) -> Option<u32> {
        self.groups.borrow().get(key).map(InstancedGroup::capacity)
    }

    /// Occupied slots in the group of `key`.
    pub fn group_len(&self, key: &GroupKey) -> Option<u32> {
        self.groups.borrow().get(key).map(InstancedGroup::len)
    }

    pub fn group_id(&self, key: &GroupKey) -> Option<GroupId> {
        self.groups.borrow().get(key).map(InstancedGroup::id)
    }

    /// Instances of the group of `key` in the order they are drawn.
    pub fn drawn_instances(&self, key: &GroupKey) -> Vec<InstanceData> {
        let mut groups = self.groups.borrow_mut();
        let Some(group) = groups.get_mut(key) else {
            return Vec::new();
        };
        let slots = group.draw_slots().to_vec();
        slots.iter().filter_map(|&slot| group.instance(slot).copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{GroupDependencies, OrderInfo};
    use crate::render::gpu::HeadlessGpu;
    use crate::render::instance::INSTANCE_SIZE;
    use crate::types::ElementType;

    fn setup(config: RootConfig) -> (Rc<HeadlessGpu>, InstanceManager) {
        let gpu = Rc::new(HeadlessGpu::new(INSTANCE_SIZE));
        let manager = InstanceManager::new(gpu.clone(), &config);
        (gpu, manager)
    }

    fn key(z: i32, element_type: ElementType) -> GroupKey {
        GroupKey { z_index_class: z, element_type, deps: GroupDependencies::default() }
    }

    #[test]
    fn test_reacquire_reuses_before_growth() {
        let (_gpu, manager) = setup(RootConfig::default().with_initial_group_capacity(4));
        let k = OrderInfo::base().group_key;
        let mut handles: Vec<SlotHandle> = (0..4).map(|i| manager.acquire_slot(&k, SlotOrder::new(i, 0)).unwrap()).collect();

        let released: Vec<u32> = handles.drain(1..3).map(|h| {
            let slot = h.slot();
            manager.release_slot(h);
            slot
        }).collect();
        let reacquired: Vec<u32> = (0..2).map(|_| manager.acquire_slot(&k, SlotOrder::default()).unwrap().slot()).collect();

        assert_eq!(reacquired, released);
        assert_eq!(manager.group_capacity(&k), Some(4));
    }

    #[test]
    fn test_group_destroyed_when_empty() {
        let (gpu, manager) = setup(RootConfig::default());
        let k = key(0, ElementType::Panel);
        let a = manager.acquire_slot(&k, SlotOrder::default()).unwrap();
        let b = manager.acquire_slot(&k, SlotOrder::default()).unwrap();
        assert_eq!(manager.group_count(), 1);

        manager.release_slot(a);
        assert_eq!(manager.group_count(), 1);
        manager.release_slot(b);
        assert_eq!(manager.group_count(), 0);
        assert_eq!(gpu.buffer_count(), 0);
    }

    #[test]
    fn test_draw_order() {
        let (gpu, manager) = setup(RootConfig::default());
        let text = manager.acquire_slot(&key(0, ElementType::Text), SlotOrder::default()).unwrap();
        let upper = manager.acquire_slot(&key(1, ElementType::Panel), SlotOrder::default()).unwrap();
        let panel = manager.acquire_slot(&key(0, ElementType::Panel), SlotOrder::default()).unwrap();

        assert_eq!(manager.draw().unwrap(), 3);
        let order: Vec<GroupId> = gpu.take_draws().into_iter().map(|(group, _)| group).collect();
        assert_eq!(order, vec![panel.group(), text.group(), upper.group()]);
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let gpu = Rc::new(HeadlessGpu::new(INSTANCE_SIZE).with_max_capacity(2));
        let manager = InstanceManager::new(gpu, &RootConfig::default().with_initial_group_capacity(2));
        let k = key(0, ElementType::Panel);
        let _a = manager.acquire_slot(&k, SlotOrder::default()).unwrap();
        let _b = manager.acquire_slot(&k, SlotOrder::default()).unwrap();
        assert!(matches!(manager.acquire_slot(&k, SlotOrder::default()), Err(GpuError::AllocationFailed { requested: 4, .. })));
    }

    #[test]
    fn test_write_then_flush() {
        let (gpu, manager) = setup(RootConfig::default());
        let k = key(0, ElementType::Panel);
        let handle = manager.acquire_slot(&k, SlotOrder::default()).unwrap();
        let data = InstanceData::default().with_color(crate::types::Color::RED);
        manager.write_instance(&handle, data).unwrap();
        assert_eq!(gpu.buffer(handle.group()).unwrap().uploads, 0);
        manager.flush().unwrap();
        assert_eq!(gpu.buffer(handle.group()).unwrap().uploads, 1);
        assert_eq!(manager.instance(&handle), Some(data));
    }

    #[test]
    fn test_drawn_instances_follow_slot_order() {
        let (_gpu, manager) = setup(RootConfig::default());
        let k = key(0, ElementType::Panel);
        let red = InstanceData::default().with_color(crate::types::Color::RED);
        let blue = InstanceData::default().with_color(crate::types::Color::BLUE);

        let second = manager.acquire_slot(&k, SlotOrder::new(2, 0)).unwrap();
        let first = manager.acquire_slot(&k, SlotOrder::new(1, 0)).unwrap();
        manager.write_instance(&second, blue).unwrap();
        manager.write_instance(&first, red).unwrap();
        assert_eq!(manager.drawn_instances(&k), vec![red, blue]);

        manager.set_slot_order(&first, SlotOrder::new(3, 0)).unwrap();
        assert_eq!(manager.drawn_instances(&k), vec![blue, red]);
    }
}

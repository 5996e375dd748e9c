//! One instanced buffer and its slot allocator.

use std::collections::BTreeSet;

use super::gpu::{GpuBackend, GroupId};
use super::instance::InstanceData;
use crate::error::GpuError;
use crate::order::GroupKey;

/// Draw position of an instance inside its group: the owning element's
/// sequence, then the instance's index in that element's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SlotOrder {
    pub sequence: u64,
    pub index: u32,
}

impl SlotOrder {
    pub const fn new(sequence: u64, index: u32) -> Self {
        Self { sequence, index }
    }
}

/// Slots `[0, high_water)` have been handed out at least once; released slots
/// inside that range sit in `free` and are reused lowest first.
///
/// Slots are stable handles into `staging`. The uploaded buffer holds only the
/// occupied slots, packed in [`SlotOrder`], so instances draw in element order
/// regardless of which slot each one landed in.
pub struct InstancedGroup {
    id: GroupId,
    key: GroupKey,
    sequence: u64,
    capacity: u32,
    growth_factor: u32,
    high_water: u32,
    free: BTreeSet<u32>,
    staging: Vec<InstanceData>,
    orders: Vec<SlotOrder>,
    /// Occupied slots in draw order.
    draw_slots: Vec<u32>,
    /// Buffer position of each slot in `draw_slots`.
    positions: Vec<u32>,
    /// Membership or order changed; the next flush repacks everything.
    repack: bool,
    /// Dirty buffer positions.
    dirty: Option<(u32, u32)>,
}

impl InstancedGroup {
    pub fn new(
        backend: &dyn GpuBackend,
        id: GroupId,
        key: GroupKey,
        sequence: u64,
        capacity: u32,
        growth_factor: u32,
    ) -> Result<Self, GpuError> {
        let capacity = capacity.max(1);
        backend.allocate_instances(id, capacity)?;
        Ok(Self {
            id,
            key,
            sequence,
            capacity,
            growth_factor: growth_factor.max(2),
            high_water: 0,
            free: BTreeSet::new(),
            staging: vec![hidden(); capacity as usize],
            orders: vec![SlotOrder::default(); capacity as usize],
            draw_slots: Vec::new(),
            positions: vec![0; capacity as usize],
            repack: false,
            dirty: None,
        })
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of occupied slots.
    pub fn len(&self) -> u32 {
        self.high_water - self.free.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_occupied(&self, slot: u32) -> bool {
        slot < self.high_water && !self.free.contains(&slot)
    }

    pub fn acquire(&mut self, backend: &dyn GpuBackend, order: SlotOrder) -> Result<u32, GpuError> {
        let slot = match self.free.pop_first() {
            Some(slot) => slot,
            None => {
                if self.high_water == self.capacity {
                    self.grow(backend)?;
                }
                self.high_water += 1;
                self.high_water - 1
            }
        };
        self.orders[slot as usize] = order;
        self.repack = true;
        Ok(slot)
    }

    fn grow(&mut self, backend: &dyn GpuBackend) -> Result<(), GpuError> {
        let capacity = self.capacity.saturating_mul(self.growth_factor);
        backend.allocate_instances(self.id, capacity)?;
        tracing::debug!(group = self.id, from = self.capacity, to = capacity, "instanced group grew");
        self.capacity = capacity;
        self.staging.resize(capacity as usize, hidden());
        self.orders.resize(capacity as usize, SlotOrder::default());
        self.positions.resize(capacity as usize, 0);
        // the new buffer starts empty
        self.repack = true;
        Ok(())
    }

    /// Hide and free `slot`.
    pub fn release(&mut self, slot: u32) {
        if !self.is_occupied(slot) {
            return;
        }
        self.staging[slot as usize] = hidden();
        self.repack = true;
        if slot + 1 == self.high_water {
            self.high_water -= 1;
            // trailing free slots shrink the slot range
            while self.high_water > 0 && self.free.remove(&(self.high_water - 1)) {
                self.high_water -= 1;
            }
        } else {
            self.free.insert(slot);
        }
    }

    /// Move `slot` to a new draw position.
    pub fn set_order(&mut self, slot: u32, order: SlotOrder) -> Result<(), GpuError> {
        if !self.is_occupied(slot) {
            return Err(GpuError::SlotOutOfRange { group: self.id, slot, capacity: self.capacity });
        }
        if self.orders[slot as usize] != order {
            self.orders[slot as usize] = order;
            self.repack = true;
        }
        Ok(())
    }

    pub fn write(&mut self, slot: u32, data: InstanceData) -> Result<(), GpuError> {
        if !self.is_occupied(slot) {
            return Err(GpuError::SlotOutOfRange { group: self.id, slot, capacity: self.capacity });
        }
        if self.staging[slot as usize] != data {
            self.staging[slot as usize] = data;
            if !self.repack {
                let position = self.positions[slot as usize];
                self.mark_dirty(position, position + 1);
            }
        }
        Ok(())
    }

    pub fn instance(&self, slot: u32) -> Option<&InstanceData> {
        self.is_occupied(slot).then(|| &self.staging[slot as usize])
    }

    fn mark_dirty(&mut self, start: u32, end: u32) {
        self.dirty = Some(match self.dirty {
            Some((s, e)) => (s.min(start), e.max(end)),
            None => (start, end),
        });
    }

    pub fn has_pending_upload(&self) -> bool {
        self.repack || self.dirty.is_some()
    }

    fn rebuild_draw_order(&mut self) {
        let mut slots: Vec<u32> = (0..self.high_water).filter(|slot| !self.free.contains(slot)).collect();
        slots.sort_by_key(|&slot| (self.orders[slot as usize], slot));
        for (position, &slot) in slots.iter().enumerate() {
            self.positions[slot as usize] = position as u32;
        }
        self.draw_slots = slots;
        self.repack = false;
        self.dirty = (!self.draw_slots.is_empty()).then_some((0, self.draw_slots.len() as u32));
    }

    /// Slots in the order they are drawn.
    pub fn draw_slots(&mut self) -> &[u32] {
        if self.repack {
            self.rebuild_draw_order();
        }
        &self.draw_slots
    }

    /// Upload the dirty range as one contiguous write.
    pub fn flush(&mut self, backend: &dyn GpuBackend) -> Result<(), GpuError> {
        if self.repack {
            self.rebuild_draw_order();
        }
        let Some((start, end)) = self.dirty.take() else {
            return Ok(());
        };
        let range: Vec<InstanceData> = self.draw_slots[start as usize..end as usize]
            .iter()
            .map(|&slot| self.staging[slot as usize])
            .collect();
        backend.write_instance_data(self.id, start, bytemuck::cast_slice(&range))
    }

    pub fn draw(&self, backend: &dyn GpuBackend) -> Result<(), GpuError> {
        backend.draw(self.id, self.len())
    }
}

/// Zero-scale instance for unused slots.
fn hidden() -> InstanceData {
    InstanceData { transform: [0.0; 16], ..InstanceData::default() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderInfo;
    use crate::render::gpu::HeadlessGpu;
    use crate::render::instance::INSTANCE_SIZE;

    fn setup(capacity: u32) -> (HeadlessGpu, InstancedGroup) {
        let gpu = HeadlessGpu::new(INSTANCE_SIZE);
        let group = InstancedGroup::new(&gpu, 1, OrderInfo::base().group_key, 0, capacity, 2).unwrap();
        (gpu, group)
    }

    fn marked(tag: f32) -> InstanceData {
        InstanceData { size: [tag, tag], ..InstanceData::default() }
    }

    fn read(gpu: &HeadlessGpu, position: usize) -> InstanceData {
        let buffer = gpu.buffer(1).unwrap();
        bytemuck::pod_read_unaligned(&buffer.bytes[position * INSTANCE_SIZE..(position + 1) * INSTANCE_SIZE])
    }

    #[test]
    fn test_released_slots_reused_lowest_first() {
        let (gpu, mut group) = setup(4);
        let slots: Vec<u32> = (0..4).map(|i| group.acquire(&gpu, SlotOrder::new(i, 0)).unwrap()).collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);

        group.release(2);
        group.release(0);
        assert_eq!(group.acquire(&gpu, SlotOrder::default()).unwrap(), 0);
        assert_eq!(group.acquire(&gpu, SlotOrder::default()).unwrap(), 2);
        assert_eq!(group.capacity(), 4);

        assert_eq!(group.acquire(&gpu, SlotOrder::default()).unwrap(), 4);
        assert_eq!(group.capacity(), 8);
    }

    #[test]
    fn test_trailing_release_shrinks_range() {
        let (gpu, mut group) = setup(4);
        for i in 0..3 {
            group.acquire(&gpu, SlotOrder::new(i, 0)).unwrap();
        }
        group.release(1);
        group.release(2);
        assert_eq!(group.len(), 1);
        group.draw(&gpu).unwrap();
        assert_eq!(gpu.take_draws(), vec![(1, 1)]);
        assert_eq!(group.acquire(&gpu, SlotOrder::default()).unwrap(), 1);
    }

    #[test]
    fn test_flush_uploads_one_contiguous_range() {
        let (gpu, mut group) = setup(4);
        for i in 0..4 {
            group.acquire(&gpu, SlotOrder::new(i, 0)).unwrap();
        }
        group.flush(&gpu).unwrap();
        assert_eq!(gpu.buffer(1).unwrap().uploads, 1);

        group.write(1, marked(1.0)).unwrap();
        group.write(3, marked(3.0)).unwrap();
        group.flush(&gpu).unwrap();

        assert_eq!(gpu.buffer(1).unwrap().uploads, 2);
        assert_eq!(read(&gpu, 1), marked(1.0));
        assert_eq!(read(&gpu, 3), marked(3.0));
        assert!(!group.has_pending_upload());
    }

    #[test]
    fn test_growth_reuploads_existing_instances() {
        let (gpu, mut group) = setup(1);
        let first = group.acquire(&gpu, SlotOrder::new(0, 0)).unwrap();
        group.write(first, marked(1.0)).unwrap();
        group.flush(&gpu).unwrap();
        group.acquire(&gpu, SlotOrder::new(1, 0)).unwrap();
        assert_eq!(group.capacity(), 2);
        assert!(group.has_pending_upload());
        group.flush(&gpu).unwrap();
        assert_eq!(read(&gpu, 0), marked(1.0));
    }

    #[test]
    fn test_write_to_free_slot_fails() {
        let (gpu, mut group) = setup(2);
        group.acquire(&gpu, SlotOrder::default()).unwrap();
        group.acquire(&gpu, SlotOrder::default()).unwrap();
        group.release(0);
        assert!(group.write(0, InstanceData::default()).is_err());
    }

    #[test]
    fn test_buffer_is_packed_in_slot_order() {
        let (gpu, mut group) = setup(4);
        // later element lands in the lower slot
        let late = group.acquire(&gpu, SlotOrder::new(2, 0)).unwrap();
        let early = group.acquire(&gpu, SlotOrder::new(1, 0)).unwrap();
        group.write(late, marked(2.0)).unwrap();
        group.write(early, marked(1.0)).unwrap();
        group.flush(&gpu).unwrap();

        assert_eq!((late, early), (0, 1));
        assert_eq!(group.draw_slots(), &[early, late]);
        assert_eq!(read(&gpu, 0), marked(1.0));
        assert_eq!(read(&gpu, 1), marked(2.0));
    }

    #[test]
    fn test_release_compacts_drawn_range() {
        let (gpu, mut group) = setup(4);
        let slots: Vec<u32> = (0..3).map(|i| group.acquire(&gpu, SlotOrder::new(i, 0)).unwrap()).collect();
        for &slot in &slots {
            group.write(slot, marked(slot as f32 + 1.0)).unwrap();
        }
        group.flush(&gpu).unwrap();

        group.release(slots[0]);
        group.flush(&gpu).unwrap();
        group.draw(&gpu).unwrap();
        assert_eq!(gpu.take_draws(), vec![(1, 2)]);
        assert_eq!(read(&gpu, 0), marked(2.0));
        assert_eq!(read(&gpu, 1), marked(3.0));
    }

    #[test]
    fn test_set_order_moves_instance() {
        let (gpu, mut group) = setup(2);
        let a = group.acquire(&gpu, SlotOrder::new(1, 0)).unwrap();
        let b = group.acquire(&gpu, SlotOrder::new(2, 0)).unwrap();
        assert_eq!(group.draw_slots(), &[a, b]);
        group.set_order(a, SlotOrder::new(3, 0)).unwrap();
        assert_eq!(group.draw_slots(), &[b, a]);
    }
}

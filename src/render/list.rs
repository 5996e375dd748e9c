//! Reactive binding of a surface's instances to slots.
//!
//! An [`InstanceList`] keeps one slot per instance of a derived list, inside
//! the group its order selects. While the surface is invisible it holds no
//! slots. When the group key changes every old slot is released before any
//! new one is acquired. Each slot carries the surface's sequence, so the
//! group draws surfaces in element order whatever slots they hold.

use std::cell::RefCell;
use std::rc::Rc;

use super::group::SlotOrder;
use super::instance::InstanceData;
use super::manager::{InstanceManager, SlotHandle};
use crate::error::ErrorSink;
use crate::lifecycle::Subscription;
use crate::order::OrderInfo;
use crate::reactive::{Derived, Effect, effect};

type Slots = Rc<RefCell<Vec<SlotHandle>>>;

pub struct InstanceList {
    effect: Effect,
    slots: Slots,
    manager: Rc<InstanceManager>,
}

fn release_all(manager: &InstanceManager, slots: &mut Vec<SlotHandle>) {
    for handle in slots.drain(..).rev() {
        manager.release_slot(handle);
    }
}

impl InstanceList {
    pub fn new(
        manager: &Rc<InstanceManager>,
        order: &Derived<OrderInfo>,
        visible: &Derived<bool>,
        instances: Derived<Vec<InstanceData>>,
        errors: &ErrorSink,
    ) -> Self {
        let slots: Slots = Rc::default();
        let effect = {
            let (manager, order, visible) = (manager.clone(), order.clone(), visible.clone());
            let (slots, errors) = (slots.clone(), errors.clone());
            effect(move || {
                let data = if visible.get() { instances.get() } else { Vec::new() };
                let (key, sequence) = order.with(|o| (o.group_key.clone(), o.sequence));
                let mut slots = slots.borrow_mut();

                if slots.first().is_some_and(|handle| handle.key() != &key) {
                    release_all(&manager, &mut slots);
                }
                while slots.len() > data.len() {
                    if let Some(handle) = slots.pop() {
                        manager.release_slot(handle);
                    }
                }
                while slots.len() < data.len() {
                    match manager.acquire_slot(&key, SlotOrder::new(sequence, slots.len() as u32)) {
                        Ok(handle) => slots.push(handle),
                        Err(err) => {
                            errors.report(err);
                            return;
                        }
                    }
                }
                for (index, (handle, instance)) in slots.iter().zip(data).enumerate() {
                    let placed = manager
                        .set_slot_order(handle, SlotOrder::new(sequence, index as u32))
                        .and_then(|()| manager.write_instance(handle, instance));
                    if let Err(err) = placed {
                        errors.report(err);
                        return;
                    }
                }
            })
        };
        Self { effect, slots, manager: manager.clone() }
    }

    /// Number of slots currently held.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current contents of the held slots, in list order.
    pub fn instances(&self) -> Vec<InstanceData> {
        self.slots.borrow().iter().filter_map(|handle| self.manager.instance(handle)).collect()
    }

    pub fn group_ids(&self) -> Vec<u64> {
        self.slots.borrow().iter().map(SlotHandle::group).collect()
    }

    /// Stop updating and release every slot.
    pub fn dispose(&self) {
        self.effect.dispose();
        release_all(&self.manager, &mut self.slots.borrow_mut());
    }
}

impl From<InstanceList> for Subscription {
    fn from(list: InstanceList) -> Self {
        Subscription::new(move || list.dispose())
    }
}

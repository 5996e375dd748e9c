//! Deferred tasks - the next-tick queue of a root.
//!
//! Pointer handlers that would otherwise re-enter focus/selection writes in
//! the same event push a task here instead. The root runs the queue at the
//! start of every frame (or on demand through `Root::run_deferred`).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::lifecycle::Subscription;
use crate::reactive::batch;

new_key_type! {
    pub struct TaskKey;
}

#[derive(Default)]
struct QueueState {
    tasks: SlotMap<TaskKey, Box<dyn FnOnce()>>,
    order: VecDeque<TaskKey>,
}

/// FIFO queue of deferred tasks.
#[derive(Clone, Default)]
pub struct DeferredQueue {
    state: Rc<RefCell<QueueState>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&self, task: impl FnOnce() + 'static) -> TaskKey {
        let mut state = self.state.borrow_mut();
        let key = state.tasks.insert(Box::new(task));
        state.order.push_back(key);
        key
    }

    /// Cancel a pending task. Returns false when it already ran or was cancelled.
    pub fn cancel(&self, key: TaskKey) -> bool {
        self.state.borrow_mut().tasks.remove(key).is_some()
    }

    pub fn is_pending(&self, key: TaskKey) -> bool {
        self.state.borrow().tasks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the tasks that were pending when called. Tasks deferred while
    /// running wait for the next call. Returns the number of tasks run.
    pub fn run(&self) -> usize {
        let pending = self.state.borrow().order.len();
        let mut ran = 0;
        batch(|| {
            for _ in 0..pending {
                let task = {
                    let mut state = self.state.borrow_mut();
                    let Some(key) = state.order.pop_front() else { break };
                    state.tasks.remove(key)
                };
                if let Some(task) = task {
                    task();
                    ran += 1;
                }
            }
        });
        ran
    }
}

/// Tracks the tasks one owner deferred, so disposing the owner cancels them.
#[derive(Clone)]
pub struct DeferScope {
    queue: DeferredQueue,
    keys: Rc<RefCell<Vec<TaskKey>>>,
}

impl DeferScope {
    pub fn new(queue: &DeferredQueue) -> Self {
        Self { queue: queue.clone(), keys: Rc::default() }
    }

    pub fn defer(&self, task: impl FnOnce() + 'static) {
        let queue = self.queue.clone();
        let mut keys = self.keys.borrow_mut();
        keys.retain(|key| queue.is_pending(*key));
        keys.push(self.queue.defer(task));
    }

    /// Cancel every pending task of this scope.
    pub fn cancel_all(&self) -> usize {
        let keys = std::mem::take(&mut *self.keys.borrow_mut());
        keys.into_iter().filter(|key| self.queue.cancel(*key)).count()
    }

    pub fn into_subscription(self) -> Subscription {
        Subscription::new(move || {
            let cancelled = self.cancel_all();
            if cancelled > 0 {
                tracing::trace!(cancelled, "cancelled deferred tasks");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_fifo_and_next_tick() {
        let queue = DeferredQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, q) = (log.clone(), log.clone(), queue.clone());
        queue.defer(move || l1.borrow_mut().push(1));
        queue.defer(move || {
            l2.borrow_mut().push(2);
            let l3 = l2.clone();
            q.defer(move || l3.borrow_mut().push(3));
        });

        assert_eq!(queue.run(), 2);
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(queue.run(), 1);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_scope_cancellation() {
        let queue = DeferredQueue::new();
        let ran = Rc::new(Cell::new(false));
        let scope = DeferScope::new(&queue);
        let r = ran.clone();
        scope.defer(move || r.set(true));

        let subscription = scope.into_subscription();
        let mut subs = vec![subscription];
        crate::lifecycle::unsubscribe_subscriptions(&mut subs);

        assert_eq!(queue.run(), 0);
        assert!(!ran.get());
    }
}

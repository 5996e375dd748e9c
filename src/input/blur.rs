//! Blur suppression markers.
//!
//! A pointer-down on an input focuses it; the same event reaching the root
//! would blur the focused surface again. The input marks the event id, the
//! root takes the mark before deciding to blur. Unconsumed marks are dropped
//! by the next frame's sweep.

use std::cell::RefCell;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct BlurSuppression {
    marked: RefCell<HashSet<u64>>,
}

impl BlurSuppression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress(&self, event_id: u64) {
        self.marked.borrow_mut().insert(event_id);
    }

    /// Whether `event_id` was marked. Clears the mark.
    pub fn take(&self, event_id: u64) -> bool {
        self.marked.borrow_mut().remove(&event_id)
    }

    pub fn len(&self) -> usize {
        self.marked.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.borrow().is_empty()
    }

    /// Drop every mark left over from the last frame.
    pub fn sweep(&self) -> usize {
        let mut marked = self.marked.borrow_mut();
        let dropped = marked.len();
        marked.clear();
        if dropped > 0 {
            tracing::trace!(dropped, "swept unconsumed blur markers");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_on_read() {
        let blur = BlurSuppression::new();
        blur.suppress(7);
        assert!(blur.take(7));
        assert!(!blur.take(7));
        assert!(!blur.take(8));
    }

    #[test]
    fn test_sweep_drops_unconsumed() {
        let blur = BlurSuppression::new();
        blur.suppress(1);
        blur.suppress(2);
        assert_eq!(blur.sweep(), 2);
        assert!(blur.is_empty());
        assert!(!blur.take(1));
    }
}

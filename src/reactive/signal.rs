//! Source cells.
//!
//! [`Signal`] is `spark_signals::Signal`; [`SignalExt`] adds the untracked
//! reads and identity checks the element tree relies on.

use std::rc::Rc;

pub use spark_signals::{Signal, signal};

/// Untracked access and identity for [`Signal`].
pub trait SignalExt<T> {
    /// Untracked read.
    fn peek(&self) -> T
    where
        T: Clone;

    /// Untracked read, borrowing the value.
    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// Whether both handles point at the same cell.
    fn ptr_eq(&self, other: &Self) -> bool;
}

impl<T: 'static> SignalExt<T> for Signal<T> {
    fn peek(&self) -> T
    where
        T: Clone,
    {
        spark_signals::untrack(|| self.get())
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        spark_signals::untrack(|| self.with(f))
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self.inner(), other.inner())
    }
}

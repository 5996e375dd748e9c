//! Derived cells - lazy, memoized pure functions of other cells.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{self, ContextSnapshot, NodeId};
use crate::error::ReactiveError;

/// Read-only reactive cell computed from other cells.
///
/// There is no setter; a derived value can only change through its inputs.
/// Reading a derived cell from inside its own computation is a
/// [`ReactiveError::DerivedCycle`].
pub struct Derived<T> {
    cell: spark_signals::Derived<T>,
    computing: Rc<Cell<bool>>,
    id: NodeId,
}

impl<T: Clone> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            computing: self.computing.clone(),
            id: self.id,
        }
    }
}

struct Computing<'a>(&'a Cell<bool>);

impl Drop for Computing<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Create a derived cell. `f` runs lazily on the first read.
pub fn derived<T: Clone + PartialEq + 'static>(f: impl Fn() -> T + 'static) -> Derived<T> {
    let computing = Rc::new(Cell::new(false));
    let flag = computing.clone();
    let cell = spark_signals::derived(move || {
        flag.set(true);
        let _computing = Computing(&flag);
        runtime::tracked(&f)
    });
    Derived {
        cell,
        computing,
        id: runtime::next_node_id(),
    }
}

/// Restores the tracking context if a computation unwinds through a read.
struct Unwind(Option<ContextSnapshot>);

impl Drop for Unwind {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Some(snapshot) = self.0.take() {
                snapshot.restore();
            }
        }
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Tracked read.
    ///
    /// # Panics
    ///
    /// Panics with a [`ReactiveError`] payload on a derived cycle. Effects contain
    /// the panic and stop.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => std::panic::panic_any(err),
        }
    }

    pub fn try_get(&self) -> Result<T, ReactiveError> {
        if self.computing.get() {
            tracing::error!(derived = self.id, "derived cell read itself while computing");
            return Err(ReactiveError::DerivedCycle(self.id));
        }
        let _unwind = Unwind(Some(ContextSnapshot::take()));
        Ok(self.cell.get())
    }

    /// Untracked read.
    pub fn peek(&self) -> T {
        spark_signals::untrack(|| self.get())
    }

    /// Tracked read by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }

    /// Untracked read by reference.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.peek())
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self.cell.inner(), other.cell.inner())
    }
}

impl<T: fmt::Debug + Clone + PartialEq + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.id)
            .field("computing", &self.computing.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::reactive::{effect, signal, untrack};

    #[test]
    fn test_derived_is_lazy() {
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();
        let s = signal(2);
        let s2 = s.clone();
        let d = derived(move || {
            r.set(r.get() + 1);
            s2.get() * 10
        });
        assert_eq!(runs.get(), 0);
        assert_eq!(d.get(), 20);
        assert_eq!(d.get(), 20);
        assert_eq!(runs.get(), 1);

        s.set(3);
        assert_eq!(runs.get(), 1);
        assert_eq!(d.get(), 30);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_derived_memoizes_unchanged_results() {
        let s = signal(4);
        let s2 = s.clone();
        let parity = derived(move || s2.get() % 2);

        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();
        let p = parity.clone();
        let label = derived(move || {
            r.set(r.get() + 1);
            if p.get() == 0 { "even" } else { "odd" }
        });

        assert_eq!(label.get(), "even");
        s.set(6);
        assert_eq!(label.get(), "even");
        assert_eq!(runs.get(), 1);
        s.set(7);
        assert_eq!(label.get(), "odd");
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_derived_drops_stale_dependencies() {
        let flag = signal(true);
        let a = signal(1);
        let b = signal(2);
        let (f, a2, b2) = (flag.clone(), a.clone(), b.clone());
        let d = derived(move || if f.get() { a2.get() } else { b2.get() });

        let runs = Rc::new(Cell::new(0));
        let (d2, r) = (d.clone(), runs.clone());
        let e = effect(move || {
            d2.get();
            r.set(r.get() + 1);
        });

        flag.set(false);
        assert_eq!(d.get(), 2);
        assert_eq!(runs.get(), 2);

        // `a` is no longer read, so writing it reaches nobody.
        a.set(10);
        assert_eq!(runs.get(), 2);
        b.set(20);
        assert_eq!(runs.get(), 3);
        e.dispose();
    }

    #[test]
    fn test_derived_first_read_untracked_still_updates() {
        let s = signal(1);
        let s2 = s.clone();
        let d = derived(move || s2.get() + 1);
        assert_eq!(untrack(|| d.get()), 2);
        s.set(5);
        assert_eq!(d.peek(), 6);
    }

    #[test]
    fn test_derived_self_read_is_cycle() {
        let slot: Rc<RefCell<Option<Derived<i32>>>> = Rc::new(RefCell::new(None));
        let s = slot.clone();
        let d = derived(move || {
            let me = s.borrow().clone();
            match me {
                Some(me) => me.try_get().unwrap_or(-1),
                None => 0,
            }
        });
        *slot.borrow_mut() = Some(d.clone());
        assert_eq!(d.get(), -1);
    }

    #[test]
    fn test_derived_self_read_stops_reading_effect() {
        let slot: Rc<RefCell<Option<Derived<i32>>>> = Rc::new(RefCell::new(None));
        let s = slot.clone();
        let d = derived(move || match s.borrow().clone() {
            Some(me) => me.get() + 1,
            None => 0,
        });
        *slot.borrow_mut() = Some(d.clone());

        let d2 = d.clone();
        let e = effect(move || {
            d2.get();
        });
        assert_eq!(e.error(), Some(ReactiveError::DerivedCycle(d.id())));
        assert!(e.is_disposed());

        // Tracking still works for effects created afterwards.
        let other = signal(0);
        let seen = Rc::new(Cell::new(0));
        let (o, seen2) = (other.clone(), seen.clone());
        let watcher = effect(move || seen2.set(o.get()));
        other.set(7);
        assert_eq!(seen.get(), 7);
        watcher.dispose();
    }
}

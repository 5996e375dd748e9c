//! Effects - side-effecting observers that re-run when their inputs change.
//!
//! Each effect is a `spark_signals` effect under its own root, so its lifetime
//! follows its [`Effect`] handle rather than whichever effect created it.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use spark_signals::{CleanupFn, effect_root, effect_sync_with_cleanup};

use super::runtime::{self, ContextSnapshot, MAX_EFFECT_REENTRY, NodeId};
use crate::error::{ReactiveError, panic_message};

struct EffectState {
    id: NodeId,
    stopped: Cell<bool>,
    running: Cell<bool>,
    epoch: Cell<u64>,
    runs: Cell<usize>,
    error: RefCell<Option<ReactiveError>>,
}

struct Running<'a>(&'a Cell<bool>);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl EffectState {
    fn run(&self, f: &mut dyn FnMut()) -> Option<CleanupFn> {
        if self.stopped.get() {
            return None;
        }

        let epoch = runtime::settle_epoch();
        if self.epoch.replace(epoch) != epoch {
            self.runs.set(0);
        }
        let runs = self.runs.get() + 1;
        self.runs.set(runs);
        if runs > MAX_EFFECT_REENTRY {
            tracing::error!(effect = self.id, runs, "effect re-entry limit exceeded");
            self.fail(ReactiveError::Cycle { effect: self.id, runs });
            return None;
        }

        self.running.set(true);
        let running = Running(&self.running);
        let snapshot = ContextSnapshot::take();
        runtime::push_cleanup_scope();
        let result = catch_unwind(AssertUnwindSafe(|| runtime::tracked(|| f())));
        let cleanups = runtime::pop_cleanup_scope();
        drop(running);

        if let Err(payload) = result {
            snapshot.restore();
            let error = match payload.downcast_ref::<ReactiveError>() {
                Some(err) => err.clone(),
                None => ReactiveError::EffectPanicked {
                    effect: self.id,
                    message: panic_message(payload.as_ref()),
                },
            };
            tracing::error!(effect = self.id, %error, "effect stopped");
            self.fail(error);
            run_cleanups(self.id, cleanups);
            return None;
        }

        if self.stopped.get() {
            // Disposed by its own run: drop what it just read.
            ContextSnapshot::take().restore();
            run_cleanups(self.id, cleanups);
            return None;
        }

        runtime::mark_settled_if_idle();
        if cleanups.is_empty() {
            return None;
        }
        let id = self.id;
        Some(Box::new(move || run_cleanups(id, cleanups)))
    }

    fn fail(&self, error: ReactiveError) {
        *self.error.borrow_mut() = Some(error);
        self.stopped.set(true);
    }
}

fn run_cleanups(effect: NodeId, cleanups: Vec<Box<dyn FnOnce()>>) {
    for cleanup in cleanups.into_iter().rev() {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(cleanup)) {
            tracing::error!(
                effect,
                message = %panic_message(payload.as_ref()),
                "effect cleanup panicked"
            );
        }
    }
}

struct EffectHandle {
    state: Rc<EffectState>,
    dispose: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl EffectHandle {
    fn dispose(&self) {
        self.state.stopped.set(true);
        let Some(dispose) = self.dispose.borrow_mut().take() else { return };
        if self.state.running.get() {
            // The run in progress sees `stopped` and tears itself down.
            drop(dispose);
        } else {
            dispose();
        }
    }
}

impl Drop for EffectHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Handle to a running effect.
///
/// The effect stops when [`Effect::dispose`] is called or the last handle is
/// dropped.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectHandle>,
}

/// Run `f` now and again whenever a cell it read changes.
pub fn effect(f: impl FnMut() + 'static) -> Effect {
    let state = Rc::new(EffectState {
        id: runtime::next_node_id(),
        stopped: Cell::new(false),
        running: Cell::new(false),
        epoch: Cell::new(runtime::settle_epoch()),
        runs: Cell::new(0),
        error: RefCell::new(None),
    });

    let run_state = state.clone();
    let mut f = f;
    let dispose = effect_root(move || {
        // The root keeps the effect alive; its dispose handle is not needed.
        let _ = effect_sync_with_cleanup(move || run_state.run(&mut f));
    });

    Effect {
        inner: Rc::new(EffectHandle {
            state,
            dispose: RefCell::new(Some(Box::new(dispose))),
        }),
    }
}

impl Effect {
    pub fn id(&self) -> NodeId {
        self.inner.state.id
    }

    /// Stop the effect, run its cleanups and detach it from its sources.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.stopped.get()
    }

    /// The error that stopped this effect, if any.
    pub fn error(&self) -> Option<ReactiveError> {
        self.inner.state.error.borrow().clone()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.state.id)
            .field("disposed", &self.inner.state.stopped.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{SignalExt, batch, derived, on_cleanup, signal, untrack};

    #[test]
    fn test_effect_runs_immediately_and_on_change() {
        let s = signal(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (s2, seen2) = (s.clone(), seen.clone());
        let e = effect(move || seen2.borrow_mut().push(s2.get()));

        s.set(2);
        s.set(2);
        s.set(3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        e.dispose();
        s.set(4);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dropping_last_handle_stops_effect() {
        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let (s2, r) = (s.clone(), runs.clone());
        let e = effect(move || {
            s2.get();
            r.set(r.get() + 1);
        });
        let copy = e.clone();
        drop(e);
        s.set(1);
        assert_eq!(runs.get(), 2);
        drop(copy);
        s.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_batch_defers_effects() {
        let a = signal(0);
        let b = signal(0);
        let runs = Rc::new(Cell::new(0));
        let (a2, b2, r) = (a.clone(), b.clone(), runs.clone());
        let e = effect(move || {
            a2.get();
            b2.get();
            r.set(r.get() + 1);
        });

        batch(|| {
            a.set(1);
            b.set(1);
            assert_eq!(runs.get(), 1);
        });
        assert_eq!(runs.get(), 2);
        e.dispose();
    }

    #[test]
    fn test_batch_inside_effect_self_write_does_not_reenter() {
        let s = signal(0);
        let s2 = s.clone();
        let e = effect(move || {
            let v = s2.get();
            if v > 0 && v < 3 {
                batch(|| {
                    s2.set(v + 1);
                });
            }
        });
        s.set(1);
        assert_eq!(s.peek(), 3);
        assert!(e.error().is_none());
    }

    #[test]
    fn test_untrack_does_not_subscribe() {
        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let (s2, r) = (s.clone(), runs.clone());
        let e = effect(move || {
            untrack(|| s2.get());
            r.set(r.get() + 1);
        });
        s.set(1);
        assert_eq!(runs.get(), 1);
        e.dispose();
    }

    #[test]
    fn test_effect_created_under_untrack_still_tracks() {
        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let (s2, r) = (s.clone(), runs.clone());
        let e = untrack(|| {
            effect(move || {
                s2.get();
                r.set(r.get() + 1);
            })
        });
        s.set(1);
        assert_eq!(runs.get(), 2);
        e.dispose();
    }

    #[test]
    fn test_cleanup_runs_before_rerun_and_on_dispose() {
        let s = signal(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let (s2, l) = (s.clone(), log.clone());
        let e = effect(move || {
            let v = s2.get();
            l.borrow_mut().push(format!("run {v}"));
            let l = l.clone();
            on_cleanup(move || l.borrow_mut().push(format!("clean {v}")));
        });
        s.set(1);
        e.dispose();
        assert_eq!(*log.borrow(), vec!["run 0", "clean 0", "run 1", "clean 1"]);
    }

    #[test]
    fn test_cleanups_run_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let e = effect(move || {
            for name in ["first", "second"] {
                let l = l.clone();
                on_cleanup(move || l.borrow_mut().push(name));
            }
        });
        e.dispose();
        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn test_inner_effect_outlives_outer_rerun() {
        let outer_trigger = signal(0);
        let inner_source = signal(0);
        let inner_runs = Rc::new(Cell::new(0));
        let held: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));

        let (t, src, r, h) = (outer_trigger.clone(), inner_source.clone(), inner_runs.clone(), held.clone());
        let outer = effect(move || {
            t.get();
            if h.borrow().is_none() {
                let (src, r) = (src.clone(), r.clone());
                let inner = effect(move || {
                    src.get();
                    r.set(r.get() + 1);
                });
                *h.borrow_mut() = Some(inner);
            }
        });

        outer_trigger.set(1);
        inner_source.set(1);
        assert_eq!(inner_runs.get(), 2);
        outer.dispose();
    }

    #[test]
    fn test_effect_disposing_itself_runs_cleanups() {
        let s = signal(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));
        let (s2, l, me) = (s.clone(), log.clone(), slot.clone());
        let e = effect(move || {
            let v = s2.get();
            let l2 = l.clone();
            on_cleanup(move || l2.borrow_mut().push(format!("clean {v}")));
            if v == 1 {
                if let Some(me) = me.borrow().as_ref() {
                    me.dispose();
                }
            }
        });
        *slot.borrow_mut() = Some(e.clone());

        s.set(1);
        assert!(e.is_disposed());
        assert_eq!(*log.borrow(), vec!["clean 0", "clean 1"]);
        s.set(2);
        assert_eq!(log.borrow().len(), 2);
        slot.borrow_mut().take();
    }

    #[test]
    fn test_reentrant_write_requeues() {
        let s = signal(0);
        let s2 = s.clone();
        let e = effect(move || {
            let v = s2.get();
            if v > 0 && v < 5 {
                s2.set(v + 1);
            }
        });
        s.set(1);
        assert_eq!(s.peek(), 5);
        assert!(e.error().is_none());
        e.dispose();
    }

    #[test]
    fn test_unbounded_reentry_is_cycle() {
        let s = signal(0u32);
        let s2 = s.clone();
        let e = effect(move || {
            let v = s2.get();
            if v > 0 {
                s2.set(v + 1);
            }
        });
        s.set(1);
        assert!(matches!(
            e.error(),
            Some(ReactiveError::Cycle { runs, .. }) if runs == MAX_EFFECT_REENTRY + 1
        ));
        assert!(e.is_disposed());

        // Other effects keep working.
        let seen = Rc::new(Cell::new(0));
        let (s3, seen2) = (s.clone(), seen.clone());
        let other = effect(move || seen2.set(s3.get()));
        s.set(1000);
        assert_eq!(seen.get(), 1000);
        other.dispose();
    }

    #[test]
    fn test_bounded_reentry_across_flushes_is_not_cycle() {
        let s = signal(0u32);
        let s2 = s.clone();
        let e = effect(move || {
            let v = s2.get();
            if v % 2 == 1 {
                s2.set(v + 1);
            }
        });
        for i in 0..(MAX_EFFECT_REENTRY as u32) {
            s.set(i * 2 + 1);
        }
        assert!(e.error().is_none());
        e.dispose();
    }

    #[test]
    fn test_panic_is_contained() {
        let s = signal(0);
        let s2 = s.clone();
        let e = effect(move || {
            if s2.get() == 1 {
                panic!("boom");
            }
        });
        s.set(1);
        assert!(matches!(
            e.error(),
            Some(ReactiveError::EffectPanicked { ref message, .. }) if message == "boom"
        ));
        s.set(2);
        assert!(e.is_disposed());
    }

    #[test]
    fn test_effect_over_derived_skips_equal_results() {
        let s = signal(1);
        let s2 = s.clone();
        let positive = derived(move || s2.get() > 0);
        let runs = Rc::new(Cell::new(0));
        let (p, r) = (positive.clone(), runs.clone());
        let e = effect(move || {
            p.get();
            r.set(r.get() + 1);
        });
        s.set(2);
        s.set(3);
        assert_eq!(runs.get(), 1);
        s.set(-1);
        assert_eq!(runs.get(), 2);
        e.dispose();
    }
}

//! Runtime glue over `spark_signals`: batching, flushing, cleanup scopes.
//!
//! All state is thread-local. The graph is single-threaded: handles are
//! `!Send` and never shared across roots running on different threads.

use std::cell::{Cell, RefCell};
use std::rc::Weak;

use spark_signals::{AnyReaction, with_context};

/// Effect re-runs allowed within a single flush before it is treated as a cycle.
pub const MAX_EFFECT_REENTRY: usize = 100;

/// Identity of an effect or derived cell, used in errors and logs.
pub type NodeId = u64;

type Cleanup = Box<dyn FnOnce()>;

thread_local! {
    static NEXT_ID: Cell<NodeId> = const { Cell::new(1) };

    /// One frame per running effect; `on_cleanup` pushes into the innermost.
    static CLEANUP_SCOPES: RefCell<Vec<Vec<Cleanup>>> = const { RefCell::new(Vec::new()) };

    /// Bumped whenever an effect run leaves no reactions pending.
    static SETTLE_EPOCH: Cell<u64> = const { Cell::new(0) };
}

pub(crate) fn next_node_id() -> NodeId {
    NEXT_ID.with(|id| {
        let next = id.get();
        id.set(next + 1);
        next
    })
}

// =============================================================================
// Cleanup scopes
// =============================================================================

pub(crate) fn push_cleanup_scope() {
    CLEANUP_SCOPES.with(|scopes| scopes.borrow_mut().push(Vec::new()));
}

pub(crate) fn pop_cleanup_scope() -> Vec<Cleanup> {
    CLEANUP_SCOPES.with(|scopes| scopes.borrow_mut().pop().unwrap_or_default())
}

/// Register a cleanup for the current effect run.
///
/// Runs before the effect re-runs and when it is disposed, in reverse
/// registration order. Outside an effect the cleanup is dropped with a warning.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) {
    let registered = CLEANUP_SCOPES.with(|scopes| match scopes.borrow_mut().last_mut() {
        Some(frame) => {
            frame.push(Box::new(cleanup));
            true
        }
        None => false,
    });
    if !registered {
        tracing::warn!("on_cleanup called outside of an effect; ignored");
    }
}

// =============================================================================
// Flush epochs
// =============================================================================

pub(crate) fn settle_epoch() -> u64 {
    SETTLE_EPOCH.with(Cell::get)
}

/// Start a new epoch if nothing is left to run.
///
/// An effect caught in a write cycle always leaves itself pending, so its
/// per-epoch run count keeps growing until it trips [`MAX_EFFECT_REENTRY`].
pub(crate) fn mark_settled_if_idle() {
    let idle = with_context(|ctx| {
        let pending = ctx.take_pending_reactions();
        let idle = pending
            .iter()
            .all(|reaction| reaction.upgrade().is_none_or(|reaction| reaction.is_clean()));
        for reaction in pending {
            ctx.add_pending_reaction(reaction);
        }
        idle
    });
    if idle {
        SETTLE_EPOCH.with(|epoch| epoch.set(epoch.get() + 1));
    }
}

// =============================================================================
// Context snapshots
// =============================================================================

/// Tracking state captured before user code runs, restored if it unwinds.
pub(crate) struct ContextSnapshot {
    reaction: Option<Weak<dyn AnyReaction>>,
    effect: Option<Weak<dyn AnyReaction>>,
    untracking: bool,
}

impl ContextSnapshot {
    pub(crate) fn take() -> Self {
        with_context(|ctx| Self {
            reaction: ctx.get_active_reaction(),
            effect: ctx.get_active_effect(),
            untracking: ctx.is_untracking(),
        })
    }

    /// Put the tracking state back and drop reads collected since the snapshot.
    pub(crate) fn restore(self) {
        with_context(|ctx| {
            ctx.set_active_reaction(self.reaction);
            ctx.set_active_effect(self.effect);
            ctx.set_untracking(self.untracking);
            ctx.swap_new_deps(Vec::new());
            ctx.set_skipped_deps(0);
        });
    }
}

/// Run `f` with tracking enabled, even when called under [`untrack`](spark_signals::untrack).
pub(crate) fn tracked<R>(f: impl FnOnce() -> R) -> R {
    struct Restore(bool);

    impl Drop for Restore {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_untracking(self.0));
        }
    }

    let _restore = Restore(with_context(|ctx| ctx.set_untracking(false)));
    f()
}

// =============================================================================
// Batching
// =============================================================================

/// Group writes so dependent effects run once, after `f` returns.
///
/// Nested batches, and batches opened while effects are flushing, defer to
/// the enclosing flush.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    struct Hold(bool);

    impl Drop for Hold {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_flushing_sync(self.0));
        }
    }

    let hold = Hold(with_context(|ctx| ctx.set_flushing_sync(true)));
    if hold.0 {
        return f();
    }
    // Effects released at the end of the batch run under the hold, so their
    // own writes queue instead of re-entering.
    let result = spark_signals::batch(f);
    drop(hold);
    flush();
    result
}

/// Run every pending effect now.
pub fn flush() {
    if with_context(|ctx| ctx.is_batching() || ctx.is_flushing_sync()) {
        return;
    }
    spark_signals::flush_sync();
}

/// Whether a read right now would be tracked.
pub fn is_tracking() -> bool {
    spark_signals::is_tracking()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_cleanup_outside_effect_is_ignored() {
        on_cleanup(|| panic!("must not run"));
        assert!(pop_cleanup_scope().is_empty());
    }

    #[test]
    fn test_cleanup_scopes_nest() {
        push_cleanup_scope();
        on_cleanup(|| {});
        push_cleanup_scope();
        on_cleanup(|| {});
        on_cleanup(|| {});
        assert_eq!(pop_cleanup_scope().len(), 2);
        assert_eq!(pop_cleanup_scope().len(), 1);
    }

    #[test]
    fn test_tracked_restores_untracking() {
        spark_signals::untrack(|| {
            tracked(|| assert!(!spark_signals::is_untracking()));
            assert!(spark_signals::is_untracking());
        });
    }
}

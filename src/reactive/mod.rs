//! # Reactive Cell Graph
//!
//! Fine-grained reactivity for element state, built on `spark_signals`:
//! source cells ([`Signal`]), lazy memoized cells ([`Derived`]) and side
//! effects ([`Effect`]).
//!
//! On top of the signal graph this module adds the rules the element tree
//! needs: an effect that re-runs more than [`MAX_EFFECT_REENTRY`] times in one
//! flush stops with [`ReactiveError::Cycle`](crate::error::ReactiveError),
//! panics stop only the offending effect, and [`on_cleanup`] scopes teardown
//! to the effect run that registered it.
//!
//! ```ignore
//! let width = signal(100.0);
//! let w = width.clone();
//! let inner = derived(move || w.get() - 20.0);
//! let e = effect(move || println!("inner width {}", inner.get()));
//! width.set(120.0); // prints "inner width 100"
//! e.dispose();
//! ```

mod derived;
mod effect;
mod runtime;
mod signal;

pub use derived::{Derived, derived};
pub use effect::{Effect, effect};
pub use runtime::{MAX_EFFECT_REENTRY, NodeId, batch, flush, is_tracking, on_cleanup};
pub use signal::{Signal, SignalExt, signal};
pub use spark_signals::untrack;

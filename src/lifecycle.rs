//! Lifecycle - initializers and subscriptions.
//!
//! Every resource an element acquires while mounting (effects, GPU slots,
//! input surfaces, deferred tasks) is paired with one [`Subscription`] that
//! releases it. Initializers run in registration order; teardown runs in
//! reverse.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::{LifecycleError, panic_message};
use crate::reactive::Effect;

type Teardown = Box<dyn FnOnce() -> Result<(), LifecycleError>>;

/// A teardown handle.
pub struct Subscription {
    teardown: Teardown,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self::fallible(move || {
            teardown();
            Ok(())
        })
    }

    pub fn fallible(teardown: impl FnOnce() -> Result<(), LifecycleError> + 'static) -> Self {
        Self { teardown: Box::new(teardown) }
    }

    fn run(self) -> Result<(), LifecycleError> {
        match catch_unwind(AssertUnwindSafe(self.teardown)) {
            Ok(result) => result,
            Err(payload) => Err(LifecycleError::TeardownPanicked(panic_message(payload.as_ref()))),
        }
    }
}

impl From<Effect> for Subscription {
    fn from(effect: Effect) -> Self {
        Subscription::new(move || effect.dispose())
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription(..)")
    }
}

pub type Subscriptions = Vec<Subscription>;

/// Setup step. May push its own teardowns and return one more.
pub type Initializer = Box<dyn FnOnce(&mut Subscriptions) -> Option<Subscription>>;

/// Box a closure as an [`Initializer`].
pub fn initializer(f: impl FnOnce(&mut Subscriptions) -> Option<Subscription> + 'static) -> Initializer {
    Box::new(f)
}

/// Run initializers in order.
///
/// The handle an initializer returns lands after the handles it pushed itself.
pub fn initialize(initializers: Vec<Initializer>, subscriptions: &mut Subscriptions) {
    for init in initializers {
        if let Some(subscription) = init(subscriptions) {
            subscriptions.push(subscription);
        }
    }
}

/// Run every teardown in reverse order, emptying `subscriptions`.
///
/// Failing teardowns are logged and counted; the rest still run.
pub fn unsubscribe_subscriptions(subscriptions: &mut Subscriptions) -> usize {
    let mut failures = 0;
    while let Some(subscription) = subscriptions.pop() {
        if let Err(error) = subscription.run() {
            failures += 1;
            tracing::warn!(%error, "teardown failed");
        }
    }
    failures
}

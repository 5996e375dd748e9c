//! Error types.
//!
//! One error enum per subsystem, aggregated by [`UiError`]:
//!
//! - [`PropertyError`] - invalid property values (never fatal, logged and defaulted)
//! - [`GpuError`] - instance buffer failures (fatal, returned to the caller)
//! - [`ReactiveError`] - cycles in the cell graph (fatal to the offending effect)
//! - [`LifecycleError`] - teardown failures (logged, remaining teardowns still run)
//! - [`LayoutError`] - layout engine failures

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

/// A property value had a type the consumer cannot use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("property `{key}` expected {expected}, got {found}")]
    UnexpectedType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("property `{key}` has unparsable value `{value}`")]
    Unparsable { key: String, value: String },
}

/// GPU instance buffer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("failed to allocate {requested} instances for group {group}")]
    AllocationFailed { group: u64, requested: u32 },
    #[error("instance group {0} does not exist")]
    UnknownGroup(u64),
    #[error("slot {slot} is out of range for group {group} (capacity {capacity})")]
    SlotOutOfRange { group: u64, slot: u32, capacity: u32 },
}

/// Reactive graph failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    #[error("effect {effect} re-ran {runs} times in one flush (cycle)")]
    Cycle { effect: u64, runs: usize },
    #[error("derived cell {0} was read while computing itself")]
    DerivedCycle(u64),
    #[error("effect {effect} panicked: {message}")]
    EffectPanicked { effect: u64, message: String },
}

/// Teardown failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("teardown failed: {0}")]
    Teardown(String),
    #[error("teardown panicked: {0}")]
    TeardownPanicked(String),
}

/// Layout engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout node {0} does not exist")]
    UnknownNode(u64),
    #[error("layout engine error: {0}")]
    Engine(String),
}

/// Top-level error for fallible toolkit operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UiError {
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Reactive(#[from] ReactiveError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Collects fatal errors raised inside effects, where they cannot be returned.
///
/// The root drains it at the start of every frame.
#[derive(Clone, Default)]
pub struct ErrorSink {
    errors: Rc<RefCell<Vec<UiError>>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, error: impl Into<UiError>) {
        let error = error.into();
        tracing::error!(%error, "fatal error reported from effect");
        self.errors.borrow_mut().push(error);
    }

    /// Take the first reported error, discarding the rest.
    pub fn take_first(&self) -> Option<UiError> {
        let mut errors = self.errors.borrow_mut();
        if errors.is_empty() {
            return None;
        }
        let first = errors.remove(0);
        errors.clear();
        Some(first)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty()
    }
}

/// Render a panic payload as a message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

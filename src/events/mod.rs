//! Event types for generation execution.
//!
//! Events are emitted while a generation runs to notify the UI
//! collaborator about state changes, completions and failures.

mod generation;

pub use generation::*;

use crate::graph::NodeId;

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Event message containing the output node context.
#[derive(Debug, Clone)]
pub struct Message {
    /// Output node the generation runs against.
    pub nid: NodeId,
    /// The actual event data.
    pub event: GenerationEvent,
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

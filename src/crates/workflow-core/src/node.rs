//! Stage handlers

use crate::error::Result;
use crate::state::GraphState;
use async_trait::async_trait;
use std::marker::PhantomData;

/// One stage of a workflow.
///
/// `execute` receives the current snapshot and returns the next one. It must
/// be safe to call again with the same input: crash recovery always re-enters
/// the node the last checkpoint points at.
#[async_trait]
pub trait Node<S>: Send + Sync {
    async fn execute(&self, state: &S) -> Result<S>;

    /// Interrupt nodes halt the engine until an external update arrives
    fn is_interrupt(&self) -> bool {
        false
    }
}

/// Human-in-the-loop pause point. Performs no work.
pub struct Interrupt<S> {
    _state: PhantomData<fn() -> S>,
}

impl<S> Interrupt<S> {
    pub fn new() -> Self {
        Self {
            _state: PhantomData,
        }
    }
}

impl<S> Default for Interrupt<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: GraphState> Node<S> for Interrupt<S> {
    async fn execute(&self, state: &S) -> Result<S> {
        Ok(state.clone())
    }

    fn is_interrupt(&self) -> bool {
        true
    }
}

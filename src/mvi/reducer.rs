//! Reducer trait for MVI architecture.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::container::{Emitter, InputHandler};
use super::intent::Intent;
use super::state::MviState;

/// Reducer transforms state based on intents.
///
/// It must be a pure function: (State, Intent) -> State
pub trait Reducer {
    /// The state type this reducer operates on.
    type State: MviState;

    /// The intent type this reducer handles.
    type Intent: Intent;

    /// Process an intent and return the new state.
    ///
    /// This should be a pure function with no side effects.
    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State;
}

/// Hosts a pure [`Reducer`] in a state container: one state per input.
pub struct ReducerHandler<R> {
    _reducer: PhantomData<fn() -> R>,
}

impl<R> ReducerHandler<R> {
    pub fn new() -> Self {
        Self {
            _reducer: PhantomData,
        }
    }
}

impl<R> Default for ReducerHandler<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Reducer + 'static> InputHandler for ReducerHandler<R> {
    type Input = R::Intent;
    type State = R::State;

    async fn handle_input(
        &mut self,
        input: Self::Input,
        emitter: &mut Emitter<'_, Self::Input, Self::State>,
    ) -> anyhow::Result<()> {
        let next = R::reduce(emitter.state(), input);
        emitter.emit(next);
        Ok(())
    }
}

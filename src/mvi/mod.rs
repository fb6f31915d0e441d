//! Model-View-Intent (MVI) architecture primitives.
//!
//! This module provides a serialized state container and the traits used
//! to plug behaviour into it.
//!
//! # Architecture
//!
//! ```text
//! submit(Intent) ──→ queue ──→ InputHandler ──→ State* ──→ subscribers
//!                     ↑              │
//!                     └── unique jobs┘
//! ```
//!
//! - **State**: Immutable value, replaced wholesale on every transition
//! - **Intent**: Caller commands or results fed back by background jobs
//! - **InputHandler**: Async handler that turns one intent into zero or more states
//! - **Reducer**: Pure special case of a handler, one state per intent

mod container;
mod intent;
mod jobs;
mod reducer;
mod state;
mod subject;

pub use container::{ContainerHandle, Emitter, InputHandler, JobScope, StateContainer};
pub use intent::Intent;
pub use jobs::JobKey;
pub use reducer::{Reducer, ReducerHandler};
pub use state::MviState;
pub use subject::StateSubscription;

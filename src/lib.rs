//! Serialized MVI state containers and a pagination engine built on them.
//!
//! - [`mvi`]: the single-writer [`StateContainer`](mvi::StateContainer) with
//!   replay-latest state streams and cancellable unique jobs.
//! - [`paging`]: refresh / load-more pagination and concatenation of several
//!   paginated sources.

pub mod config;
pub mod logging;
pub mod mvi;
pub mod paging;

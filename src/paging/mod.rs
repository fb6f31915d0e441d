//! Pagination engine built on the MVI state container.
//!
//! # State machine
//!
//! ```text
//! Idle ─refresh→ Refreshing ─→ Loaded | LoadedLastPage | Empty | Failed
//! Loaded | LoadedNextPage | FailedNextPage ─load_next_page→ LoadingNextPage
//! LoadingNextPage ─→ LoadedNextPage | LoadedLastPage | FailedNextPage
//! any ─refresh→ Refreshing (next-page work in flight is cancelled)
//! ```

mod concat;
mod container;
mod edit;
mod source;
mod state;

pub use concat::{
    ChildPager, ChildStates, ConcatError, ConcatPagingBuilder, ConcatPagingContainer, MappedPager,
};
pub use container::PagingContainer;
pub use edit::ItemsEdit;
pub use source::PageSource;
pub use state::{PageError, PagingState, PagingStateKind, RequestType};

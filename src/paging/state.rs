//! Paging state machine values.

use std::fmt;
use std::sync::Arc;

use crate::mvi::MviState;

/// Which fetch a request is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Refresh,
    NextPage,
}

/// Cloneable failure cause carried by `Failed` / `FailedNextPage`.
///
/// Two `PageError`s are equal only if they share the same underlying error.
#[derive(Clone)]
pub struct PageError(Arc<anyhow::Error>);

impl PageError {
    pub fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for PageError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}

impl PartialEq for PageError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

/// State of a paginated list. Every variant carries the items shown so far.
#[derive(Debug, Clone, PartialEq)]
pub enum PagingState<T> {
    Idle { items: Vec<T> },
    Refreshing { items: Vec<T> },
    Loaded { items: Vec<T> },
    Empty { items: Vec<T> },
    Failed { items: Vec<T>, cause: PageError },
    LoadingNextPage { items: Vec<T> },
    LoadedNextPage { items: Vec<T>, page: Vec<T> },
    LoadedLastPage { items: Vec<T>, page: Vec<T> },
    FailedNextPage { items: Vec<T>, cause: PageError },
}

/// Variant of a [`PagingState`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagingStateKind {
    Idle,
    Refreshing,
    Loaded,
    Empty,
    Failed,
    LoadingNextPage,
    LoadedNextPage,
    LoadedLastPage,
    FailedNextPage,
}

impl<T: Clone + Send + Sync + 'static> MviState for PagingState<T> {}

impl<T> Default for PagingState<T> {
    fn default() -> Self {
        PagingState::Idle { items: Vec::new() }
    }
}

impl<T> PagingState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            PagingState::Idle { items }
            | PagingState::Refreshing { items }
            | PagingState::Loaded { items }
            | PagingState::Empty { items }
            | PagingState::Failed { items, .. }
            | PagingState::LoadingNextPage { items }
            | PagingState::LoadedNextPage { items, .. }
            | PagingState::LoadedLastPage { items, .. }
            | PagingState::FailedNextPage { items, .. } => items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            PagingState::Idle { items }
            | PagingState::Refreshing { items }
            | PagingState::Loaded { items }
            | PagingState::Empty { items }
            | PagingState::Failed { items, .. }
            | PagingState::LoadingNextPage { items }
            | PagingState::LoadedNextPage { items, .. }
            | PagingState::LoadedLastPage { items, .. }
            | PagingState::FailedNextPage { items, .. } => items,
        }
    }

    pub fn kind(&self) -> PagingStateKind {
        match self {
            PagingState::Idle { .. } => PagingStateKind::Idle,
            PagingState::Refreshing { .. } => PagingStateKind::Refreshing,
            PagingState::Loaded { .. } => PagingStateKind::Loaded,
            PagingState::Empty { .. } => PagingStateKind::Empty,
            PagingState::Failed { .. } => PagingStateKind::Failed,
            PagingState::LoadingNextPage { .. } => PagingStateKind::LoadingNextPage,
            PagingState::LoadedNextPage { .. } => PagingStateKind::LoadedNextPage,
            PagingState::LoadedLastPage { .. } => PagingStateKind::LoadedLastPage,
            PagingState::FailedNextPage { .. } => PagingStateKind::FailedNextPage,
        }
    }

    /// Next-page loading is offered only after a successful fetch, while
    /// nothing is in flight and the source is not exhausted.
    pub fn can_load_next_page(&self) -> bool {
        match self {
            PagingState::Idle { .. } => false,
            PagingState::Refreshing { .. } => false,
            PagingState::Loaded { .. } => true,
            PagingState::Empty { .. } => false,
            PagingState::Failed { .. } => false,
            PagingState::LoadingNextPage { .. } => false,
            PagingState::LoadedNextPage { .. } => true,
            PagingState::LoadedLastPage { .. } => false,
            PagingState::FailedNextPage { .. } => true,
        }
    }

    /// Same variant, items replaced. Other fields are kept as they are.
    pub fn with_items(self, items: Vec<T>) -> Self {
        match self {
            PagingState::Idle { .. } => PagingState::Idle { items },
            PagingState::Refreshing { .. } => PagingState::Refreshing { items },
            PagingState::Loaded { .. } => PagingState::Loaded { items },
            PagingState::Empty { .. } => PagingState::Empty { items },
            PagingState::Failed { cause, .. } => PagingState::Failed { items, cause },
            PagingState::LoadingNextPage { .. } => PagingState::LoadingNextPage { items },
            PagingState::LoadedNextPage { page, .. } => PagingState::LoadedNextPage { items, page },
            PagingState::LoadedLastPage { page, .. } => PagingState::LoadedLastPage { items, page },
            PagingState::FailedNextPage { cause, .. } => {
                PagingState::FailedNextPage { items, cause }
            }
        }
    }

    /// Same variant with every item (including `page`) passed through `map`.
    pub fn map_items<U>(&self, map: impl Fn(&T) -> U) -> PagingState<U> {
        let convert = |items: &[T]| items.iter().map(&map).collect::<Vec<U>>();
        match self {
            PagingState::Idle { items } => PagingState::Idle {
                items: convert(items),
            },
            PagingState::Refreshing { items } => PagingState::Refreshing {
                items: convert(items),
            },
            PagingState::Loaded { items } => PagingState::Loaded {
                items: convert(items),
            },
            PagingState::Empty { items } => PagingState::Empty {
                items: convert(items),
            },
            PagingState::Failed { items, cause } => PagingState::Failed {
                items: convert(items),
                cause: cause.clone(),
            },
            PagingState::LoadingNextPage { items } => PagingState::LoadingNextPage {
                items: convert(items),
            },
            PagingState::LoadedNextPage { items, page } => PagingState::LoadedNextPage {
                items: convert(items),
                page: convert(page),
            },
            PagingState::LoadedLastPage { items, page } => PagingState::LoadedLastPage {
                items: convert(items),
                page: convert(page),
            },
            PagingState::FailedNextPage { items, cause } => PagingState::FailedNextPage {
                items: convert(items),
                cause: cause.clone(),
            },
        }
    }
}

impl fmt::Display for PagingStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

//! Several paginated sources presented as one continuous feed.
//!
//! Children are consumed in order. Only a prefix of them is active; when the
//! last active child runs out (`Empty` or `LoadedLastPage`) the next one is
//! activated and refreshed, and its pages show up as further pages of the
//! aggregate.

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_core::Stream;
use thiserror::Error;
use tokio::runtime::Handle;

use super::container::PagingContainer;
use super::source::PageSource;
use super::state::PagingState;
use crate::config::ContainerConfig;
use crate::mvi::{Emitter, InputHandler, Intent, StateContainer, StateSubscription};

/// Boxed stream of child states, already mapped to the aggregate item type.
pub type ChildStates<U> = Pin<Box<dyn Stream<Item = PagingState<U>> + Send>>;

/// A child of a [`ConcatPagingContainer`].
pub trait ChildPager<U>: Send + Sync + 'static {
    fn refresh(&self) -> bool;
    fn load_next_page(&self, force: bool) -> bool;
    /// Current state first, then every later state.
    fn states(&self) -> ChildStates<U>;
    fn close(&self);
}

impl<S: PageSource> ChildPager<S::Item> for PagingContainer<S> {
    fn refresh(&self) -> bool {
        PagingContainer::refresh(self)
    }

    fn load_next_page(&self, force: bool) -> bool {
        PagingContainer::load_next_page(self, force)
    }

    fn states(&self) -> ChildStates<S::Item> {
        Box::pin(PagingContainer::states(self))
    }

    fn close(&self) {
        PagingContainer::close(self);
    }
}

type ItemMap<T, U> = Arc<dyn Fn(&T) -> U + Send + Sync>;

/// A paging container whose items are converted into the aggregate type.
pub struct MappedPager<S: PageSource, U> {
    pager: PagingContainer<S>,
    map: ItemMap<S::Item, U>,
}

impl<S: PageSource, U> MappedPager<S, U> {
    pub fn new(pager: PagingContainer<S>, map: impl Fn(&S::Item) -> U + Send + Sync + 'static) -> Self {
        Self {
            pager,
            map: Arc::new(map),
        }
    }
}

impl<S: PageSource, U: Send + 'static> ChildPager<U> for MappedPager<S, U> {
    fn refresh(&self) -> bool {
        self.pager.refresh()
    }

    fn load_next_page(&self, force: bool) -> bool {
        self.pager.load_next_page(force)
    }

    fn states(&self) -> ChildStates<U> {
        Box::pin(MappedStates {
            inner: self.pager.states(),
            map: Arc::clone(&self.map),
        })
    }

    fn close(&self) {
        self.pager.close();
    }
}

struct MappedStates<T, U> {
    inner: StateSubscription<PagingState<T>>,
    map: ItemMap<T, U>,
}

impl<T, U> Stream for MappedStates<T, U> {
    type Item = PagingState<U>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<PagingState<U>>> {
        let this = self.get_mut();
        let polled = this.inner.poll_recv(cx);
        let map = &this.map;
        polled.map(|next| next.map(|state| state.map_items(|item| (**map)(item))))
    }
}

/// Errors raised while assembling a concat container.
#[derive(Debug, Error)]
pub enum ConcatError {
    #[error("Concat paging needs at least one child pager")]
    NoChildren,
}

enum ConcatInput<U> {
    Refresh,
    LoadNextPage { force: bool },
    ChildChanged { index: usize, state: PagingState<U> },
}

impl<U: Send + 'static> Intent for ConcatInput<U> {}

struct ConcatHandler<U> {
    children: Vec<Arc<dyn ChildPager<U>>>,
    /// Always a prefix: `true` up to the current child, `false` after it.
    active: Vec<bool>,
    /// Last items reported by each child, already mapped.
    child_items: Vec<Vec<U>>,
    refresh_pending: Arc<AtomicBool>,
}

impl<U: Clone + Send + Sync + 'static> ConcatHandler<U> {
    fn current_index(&self) -> usize {
        self.active.iter().rposition(|active| *active).unwrap_or(0)
    }

    fn next_index(&self) -> Option<usize> {
        self.active.iter().position(|active| !*active)
    }

    fn aggregate_items(&self) -> Vec<U> {
        self.active
            .iter()
            .zip(&self.child_items)
            .take_while(|(active, _)| **active)
            .flat_map(|(_, items)| items.iter().cloned())
            .collect()
    }

    fn activate_next(&mut self, container: &str) {
        let Some(next) = self.next_index() else {
            return;
        };
        self.active[next] = true;
        tracing::debug!(container = %container, child = next, "Advancing to next child pager");
        self.children[next].refresh();
    }

    fn reset(&mut self) {
        for (index, active) in self.active.iter_mut().enumerate() {
            *active = index == 0;
        }
    }
}

#[async_trait]
impl<U: Clone + Send + Sync + 'static> InputHandler for ConcatHandler<U> {
    type Input = ConcatInput<U>;
    type State = PagingState<U>;

    async fn handle_input(
        &mut self,
        input: Self::Input,
        emitter: &mut Emitter<'_, Self::Input, Self::State>,
    ) -> anyhow::Result<()> {
        let (index, state) = match input {
            ConcatInput::Refresh => {
                self.reset();
                self.children[0].refresh();
                self.refresh_pending.store(false, Ordering::SeqCst);
                return Ok(());
            }
            ConcatInput::LoadNextPage { force } => {
                self.children[self.current_index()].load_next_page(force);
                return Ok(());
            }
            ConcatInput::ChildChanged { index, state } => (index, state),
        };

        self.child_items[index] = state.items().to_vec();
        let items = self.aggregate_items();

        if index != self.current_index() {
            let kept = emitter.state().with_items(items);
            emitter.emit(kept);
            return Ok(());
        }

        let first = index == 0;
        let last = index + 1 == self.children.len();
        let next = match state {
            PagingState::Idle { .. } if first => PagingState::Idle { items },
            PagingState::Idle { .. } => emitter.state().with_items(items),
            PagingState::Refreshing { .. } if first => PagingState::Refreshing { items },
            PagingState::Refreshing { .. } => PagingState::LoadingNextPage { items },
            PagingState::Loaded { .. } if first => PagingState::Loaded { items },
            PagingState::Loaded { items: page } => PagingState::LoadedNextPage { items, page },
            PagingState::Failed { cause, .. } if first => PagingState::Failed { items, cause },
            PagingState::Failed { cause, .. } | PagingState::FailedNextPage { cause, .. } => {
                PagingState::FailedNextPage { items, cause }
            }
            PagingState::Empty { .. } if !last => {
                self.activate_next(emitter.handle().name());
                return Ok(());
            }
            PagingState::Empty { .. } if items.is_empty() => PagingState::Empty { items },
            PagingState::Empty { .. } => PagingState::LoadedLastPage {
                items,
                page: Vec::new(),
            },
            PagingState::LoadingNextPage { .. } => PagingState::LoadingNextPage { items },
            PagingState::LoadedNextPage { page, .. } => PagingState::LoadedNextPage { items, page },
            PagingState::LoadedLastPage { page, .. } if last => {
                PagingState::LoadedLastPage { items, page }
            }
            PagingState::LoadedLastPage { .. } => {
                self.activate_next(emitter.handle().name());
                return Ok(());
            }
        };
        emitter.emit(next);
        Ok(())
    }
}

/// Assembles a [`ConcatPagingContainer`] from child pagers, in feed order.
pub struct ConcatPagingBuilder<U> {
    children: Vec<Arc<dyn ChildPager<U>>>,
    config: ContainerConfig,
}

impl<U: Clone + Send + Sync + 'static> ConcatPagingBuilder<U> {
    /// Append a paging container whose items are converted with `map`.
    pub fn child<S: PageSource>(
        self,
        pager: PagingContainer<S>,
        map: impl Fn(&S::Item) -> U + Send + Sync + 'static,
    ) -> Self {
        self.child_pager(MappedPager::new(pager, map))
    }

    pub fn child_pager(mut self, child: impl ChildPager<U>) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the container on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn build(self) -> Result<ConcatPagingContainer<U>, ConcatError> {
        self.build_on(&Handle::current())
    }

    pub fn build_on(self, runtime: &Handle) -> Result<ConcatPagingContainer<U>, ConcatError> {
        if self.children.is_empty() {
            return Err(ConcatError::NoChildren);
        }

        let count = self.children.len();
        let refresh_pending = Arc::new(AtomicBool::new(false));
        let handler = ConcatHandler {
            children: self.children.clone(),
            active: (0..count).map(|index| index == 0).collect(),
            child_items: vec![Vec::new(); count],
            refresh_pending: Arc::clone(&refresh_pending),
        };
        let container =
            StateContainer::spawn_with(PagingState::default(), handler, self.config, runtime);

        for (index, child) in self.children.iter().enumerate() {
            let child = Arc::clone(child);
            container
                .handle()
                .run_unique(format!("child-{index}"), move |job| async move {
                    let mut states = child.states();
                    while let Some(state) = poll_fn(|cx| states.as_mut().poll_next(cx)).await {
                        if !job.submit(ConcatInput::ChildChanged { index, state }) {
                            break;
                        }
                    }
                });
        }

        Ok(ConcatPagingContainer {
            container,
            children: self.children,
            refresh_pending,
        })
    }
}

/// Child pagers chained into one paginated sequence.
pub struct ConcatPagingContainer<U: Clone + Send + Sync + 'static> {
    container: StateContainer<ConcatInput<U>, PagingState<U>>,
    children: Vec<Arc<dyn ChildPager<U>>>,
    refresh_pending: Arc<AtomicBool>,
}

impl<U: Clone + Send + Sync + 'static> ConcatPagingContainer<U> {
    pub fn builder() -> ConcatPagingBuilder<U> {
        ConcatPagingBuilder {
            children: Vec::new(),
            config: ContainerConfig::default().named("concat-paging"),
        }
    }

    /// Restart from the first child. No-op while already refreshing or while
    /// an earlier restart is still queued.
    pub fn refresh(&self) -> bool {
        if matches!(self.state(), PagingState::Refreshing { .. }) {
            return false;
        }
        if self.refresh_pending.swap(true, Ordering::SeqCst) {
            return false;
        }
        let accepted = self.container.submit(ConcatInput::Refresh);
        if !accepted {
            self.refresh_pending.store(false, Ordering::SeqCst);
        }
        accepted
    }

    /// Load the next page of the current child. Same gating as
    /// [`PagingContainer::load_next_page`].
    pub fn load_next_page(&self, force: bool) -> bool {
        let busy = matches!(
            self.state(),
            PagingState::Refreshing { .. }
                | PagingState::LoadingNextPage { .. }
                | PagingState::LoadedLastPage { .. }
        );
        if busy && !force {
            return false;
        }
        self.container.submit(ConcatInput::LoadNextPage { force })
    }

    pub fn state(&self) -> PagingState<U> {
        self.container.state()
    }

    pub fn states(&self) -> StateSubscription<PagingState<U>> {
        self.container.states()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Close this container and every child. Idempotent.
    pub fn close(&self) {
        self.container.close();
        for child in &self.children {
            child.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.container.is_closed()
    }
}

impl<U: Clone + Send + Sync + 'static> Drop for ConcatPagingContainer<U> {
    fn drop(&mut self) {
        self.close();
    }
}

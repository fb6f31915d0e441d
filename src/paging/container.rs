//! Refresh / load-more pagination on top of [`StateContainer`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;

use super::edit::{apply_edits, ItemsEdit};
use super::source::{fetch_page, FetchedPage, PageSource};
use super::state::{PageError, PagingState, RequestType};
use crate::config::ContainerConfig;
use crate::mvi::{Emitter, InputHandler, Intent, StateContainer, StateSubscription};

const NEXT_PAGE_JOB: &str = "next_page";

/// Inputs of the paging loop. Next-page results carry the refresh
/// generation that was current when their job started.
pub(crate) enum PagingInput<T> {
    Refresh,
    LoadNextPage,
    SetLoadingNextPage { generation: u64 },
    SetLoadedNextPage { generation: u64, page: Vec<T> },
    SetLoadedLastPage { generation: u64, page: Vec<T> },
    SetFailedNextPage { generation: u64, cause: PageError },
    EditItems(Vec<ItemsEdit<T>>),
}

impl<T: Send + Sync + 'static> Intent for PagingInput<T> {}

struct PagingHandler<S> {
    source: Arc<S>,
    generation: u64,
    /// Set by `PagingContainer::refresh`, cleared before the refresh outcome is published.
    refresh_pending: Arc<AtomicBool>,
}

type PagingEmitter<'a, T> = Emitter<'a, PagingInput<T>, PagingState<T>>;

impl<S: PageSource> PagingHandler<S> {
    async fn refresh(&mut self, emitter: &mut PagingEmitter<'_, S::Item>) {
        emitter.handle().cancel_unique(NEXT_PAGE_JOB);
        self.generation += 1;

        let previous = emitter.state().into_items();
        emitter.emit(PagingState::Refreshing {
            items: previous.clone(),
        });

        let next = match fetch_page(&*self.source, RequestType::Refresh).await {
            Ok(FetchedPage { items, .. }) if items.is_empty() => PagingState::Empty { items },
            Ok(FetchedPage {
                items,
                is_last: true,
            }) => PagingState::LoadedLastPage {
                page: items.clone(),
                items,
            },
            Ok(FetchedPage { items, .. }) => PagingState::Loaded { items },
            Err(error) => {
                tracing::debug!(container = %emitter.handle().name(), error = %error, "Refresh failed");
                PagingState::Failed {
                    items: previous,
                    cause: PageError::new(error),
                }
            }
        };
        self.refresh_pending.store(false, Ordering::SeqCst);
        emitter.emit(next);
    }

    fn load_next_page(&self, emitter: &mut PagingEmitter<'_, S::Item>) {
        if !self.source.can_load_next_page(&emitter.state()) {
            return;
        }

        let source = Arc::clone(&self.source);
        let generation = self.generation;
        emitter
            .handle()
            .run_unique_if_absent(NEXT_PAGE_JOB, move |job| async move {
                job.submit(PagingInput::SetLoadingNextPage { generation });

                let result = match fetch_page(&*source, RequestType::NextPage).await {
                    Ok(FetchedPage {
                        items,
                        is_last: true,
                    }) => PagingInput::SetLoadedLastPage {
                        generation,
                        page: items,
                    },
                    Ok(FetchedPage { items, .. }) => PagingInput::SetLoadedNextPage {
                        generation,
                        page: items,
                    },
                    Err(error) => PagingInput::SetFailedNextPage {
                        generation,
                        cause: PageError::new(error),
                    },
                };
                job.submit(result);
            });
    }

    fn is_stale(&self, generation: u64, emitter: &PagingEmitter<'_, S::Item>) -> bool {
        let stale = generation != self.generation;
        if stale {
            tracing::debug!(
                container = %emitter.handle().name(),
                generation,
                current = self.generation,
                "Dropping next-page result superseded by a refresh"
            );
        }
        stale
    }
}

#[async_trait]
impl<S: PageSource> InputHandler for PagingHandler<S> {
    type Input = PagingInput<S::Item>;
    type State = PagingState<S::Item>;

    async fn handle_input(
        &mut self,
        input: Self::Input,
        emitter: &mut Emitter<'_, Self::Input, Self::State>,
    ) -> anyhow::Result<()> {
        match input {
            PagingInput::Refresh => self.refresh(emitter).await,
            PagingInput::LoadNextPage => self.load_next_page(emitter),
            PagingInput::SetLoadingNextPage { generation } => {
                if !self.is_stale(generation, emitter) {
                    let items = emitter.state().into_items();
                    emitter.emit(PagingState::LoadingNextPage { items });
                }
            }
            PagingInput::SetLoadedNextPage { generation, page } => {
                if !self.is_stale(generation, emitter) {
                    let mut items = emitter.state().into_items();
                    items.extend(page.iter().cloned());
                    emitter.emit(PagingState::LoadedNextPage { items, page });
                }
            }
            PagingInput::SetLoadedLastPage { generation, page } => {
                if !self.is_stale(generation, emitter) {
                    let mut items = emitter.state().into_items();
                    items.extend(page.iter().cloned());
                    emitter.emit(PagingState::LoadedLastPage { items, page });
                }
            }
            PagingInput::SetFailedNextPage { generation, cause } => {
                if !self.is_stale(generation, emitter) {
                    let items = emitter.state().into_items();
                    emitter.emit(PagingState::FailedNextPage { items, cause });
                }
            }
            PagingInput::EditItems(edits) => {
                let state = emitter.state();
                let items = apply_edits(state.items().to_vec(), edits);
                emitter.emit(state.with_items(items));
            }
        }
        Ok(())
    }
}

/// A paginated list backed by a [`PageSource`].
///
/// All commands return immediately; their effects are observed through
/// [`states`](Self::states).
pub struct PagingContainer<S: PageSource> {
    container: StateContainer<PagingInput<S::Item>, PagingState<S::Item>>,
    source: Arc<S>,
    refresh_pending: Arc<AtomicBool>,
}

impl<S: PageSource> PagingContainer<S> {
    /// Start an idle paging container on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new(source: S) -> Self {
        Self::with_config(source, ContainerConfig::default().named("paging"), &Handle::current())
    }

    pub fn with_config(source: S, config: ContainerConfig, runtime: &Handle) -> Self {
        let source = Arc::new(source);
        let refresh_pending = Arc::new(AtomicBool::new(false));
        let handler = PagingHandler {
            source: Arc::clone(&source),
            generation: 0,
            refresh_pending: Arc::clone(&refresh_pending),
        };
        let container =
            StateContainer::spawn_with(PagingState::default(), handler, config, runtime);
        Self {
            container,
            source,
            refresh_pending,
        }
    }

    /// Reload from the first page. No-op while a refresh is queued or running,
    /// so a burst of calls fetches once.
    ///
    /// Cancels any next-page fetch in flight.
    pub fn refresh(&self) -> bool {
        if matches!(self.state(), PagingState::Refreshing { .. }) {
            return false;
        }
        if self.refresh_pending.swap(true, Ordering::SeqCst) {
            return false;
        }
        let accepted = self.container.submit(PagingInput::Refresh);
        if !accepted {
            self.refresh_pending.store(false, Ordering::SeqCst);
        }
        accepted
    }

    /// Fetch and append the next page.
    ///
    /// Unless `force` is set, does nothing while refreshing, while a page is
    /// loading, or after the last page. Even when forced, the source's
    /// `can_load_next_page` must allow it, and only one next-page fetch runs
    /// at a time.
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
        self.container.submit(PagingInput::LoadNextPage)
    }

    /// Apply `edits` to the current items, keeping the state variant.
    pub fn edit(&self, edits: impl IntoIterator<Item = ItemsEdit<S::Item>>) -> bool {
        self.container
            .submit(PagingInput::EditItems(edits.into_iter().collect()))
    }

    pub fn state(&self) -> PagingState<S::Item> {
        self.container.state()
    }

    pub fn states(&self) -> StateSubscription<PagingState<S::Item>> {
        self.container.states()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn close(&self) {
        self.container.close();
    }

    pub fn is_closed(&self) -> bool {
        self.container.is_closed()
    }
}

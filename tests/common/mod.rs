//! Shared test utilities: a scripted page source and state-stream helpers.

#![allow(dead_code, unused_imports)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use mvi_paging::mvi::StateSubscription;
use mvi_paging::paging::{PageSource, PagingState, PagingStateKind, RequestType};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const STATE_TIMEOUT: Duration = Duration::from_secs(2);

pub type Response = Result<Vec<u32>, String>;

/// Page source answering from per-request-type scripts.
///
/// An exhausted script answers with an empty page. A gate, when set, holds
/// every fetch of that type until a permit is added.
#[derive(Default)]
pub struct ScriptedSource {
    refreshes: Mutex<VecDeque<Response>>,
    next_pages: Mutex<VecDeque<Response>>,
    refresh_gate: Option<Arc<Semaphore>>,
    next_page_gate: Option<Arc<Semaphore>>,
    refresh_fetches: AtomicUsize,
    next_page_fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_with(mut self, response: Response) -> Self {
        self.refreshes.get_mut().push_back(response);
        self
    }

    pub fn next_page_with(mut self, response: Response) -> Self {
        self.next_pages.get_mut().push_back(response);
        self
    }

    pub fn gate_refresh(mut self, gate: &Arc<Semaphore>) -> Self {
        self.refresh_gate = Some(Arc::clone(gate));
        self
    }

    pub fn gate_next_page(mut self, gate: &Arc<Semaphore>) -> Self {
        self.next_page_gate = Some(Arc::clone(gate));
        self
    }

    pub fn refresh_fetches(&self) -> usize {
        self.refresh_fetches.load(Ordering::SeqCst)
    }

    pub fn next_page_fetches(&self) -> usize {
        self.next_page_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    type Item = u32;
    type Request = RequestType;
    type Page = Vec<u32>;

    async fn get_request(&self, request_type: RequestType) -> anyhow::Result<RequestType> {
        Ok(request_type)
    }

    async fn get_items(&self, request: &RequestType) -> anyhow::Result<Vec<u32>> {
        let (script, gate, fetches) = match request {
            RequestType::Refresh => (&self.refreshes, &self.refresh_gate, &self.refresh_fetches),
            RequestType::NextPage => (
                &self.next_pages,
                &self.next_page_gate,
                &self.next_page_fetches,
            ),
        };
        fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            gate.acquire().await?.forget();
        }
        match script.lock().pop_front() {
            Some(Ok(items)) => Ok(items),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn page_to_items(&self, _request: &RequestType, page: &Vec<u32>) -> anyhow::Result<Vec<u32>> {
        Ok(page.clone())
    }
}

/// Next state from `states`, failing the test after [`STATE_TIMEOUT`].
pub async fn next_state<S>(states: &mut StateSubscription<S>) -> S {
    tokio::time::timeout(STATE_TIMEOUT, states.recv())
        .await
        .expect("timed out waiting for a state")
        .expect("state stream ended")
}

/// Collect states up to and including the first one matching `done`.
pub async fn collect_until<S>(
    states: &mut StateSubscription<S>,
    mut done: impl FnMut(&S) -> bool,
) -> Vec<S> {
    let mut seen = Vec::new();
    loop {
        let state = next_state(states).await;
        let stop = done(&state);
        seen.push(state);
        if stop {
            return seen;
        }
    }
}

/// Collect paging states up to and including the first of kind `kind`.
pub async fn collect_until_kind<T>(
    states: &mut StateSubscription<PagingState<T>>,
    kind: PagingStateKind,
) -> Vec<PagingState<T>> {
    collect_until(states, |state| state.kind() == kind).await
}

pub fn kinds<T>(states: &[PagingState<T>]) -> Vec<PagingStateKind> {
    states.iter().map(PagingState::kind).collect()
}

/// Wait until the stream ends, failing the test after [`STATE_TIMEOUT`].
pub async fn wait_closed<S>(states: &mut StateSubscription<S>) {
    tokio::time::timeout(STATE_TIMEOUT, async {
        while states.recv().await.is_some() {}
    })
    .await
    .expect("state stream did not end");
}

/// Poll `condition` until it holds, failing the test after [`STATE_TIMEOUT`].
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(STATE_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

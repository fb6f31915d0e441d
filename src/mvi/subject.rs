//! Replay-latest state stream.
//!
//! A [`StateSubject`] holds the current state plus a list of subscribers.
//! New subscribers immediately receive the current value, then every value
//! published afterwards, in publication order.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use parking_lot::RwLock;
use tokio::sync::mpsc;

pub(crate) struct StateSubject<S> {
    inner: RwLock<SubjectInner<S>>,
}

struct SubjectInner<S> {
    current: S,
    subscribers: Vec<mpsc::UnboundedSender<S>>,
    closed: bool,
}

impl<S: Clone> StateSubject<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            inner: RwLock::new(SubjectInner {
                current: initial,
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Snapshot of the current value.
    pub(crate) fn current(&self) -> S {
        self.inner.read().current.clone()
    }

    /// Replace the current value and fan it out to live subscribers.
    ///
    /// Returns `false` once the subject is closed; the value is dropped.
    pub(crate) fn publish(&self, state: S) -> bool {
        let mut inner = self.inner.write();
        if inner.closed {
            return false;
        }
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(state.clone()).is_ok());
        inner.current = state;
        true
    }

    pub(crate) fn subscribe(&self) -> StateSubscription<S> {
        let mut inner = self.inner.write();
        let (sender, receiver) = mpsc::unbounded_channel();
        // Seeded under the write lock so no publish can slip in between.
        let _ = sender.send(inner.current.clone());
        if !inner.closed {
            inner.subscribers.push(sender);
        }
        StateSubscription { receiver }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }

    /// Ends every subscription. Idempotent.
    pub(crate) fn close(&self) {
        let mut inner = self.inner.write();
        inner.closed = true;
        inner.subscribers.clear();
    }
}

/// A live view of a container's states.
///
/// Yields the state current at subscription time first, then every later
/// state. Ends once the container is closed and all buffered states have
/// been read.
///
/// States are never conflated, so the buffer is unbounded: a subscription
/// that is kept but not drained grows with every publish. Drop it when it is
/// no longer read.
pub struct StateSubscription<S> {
    receiver: mpsc::UnboundedReceiver<S>,
}

impl<S> StateSubscription<S> {
    /// Wait for the next state. `None` once the container is closed.
    pub async fn recv(&mut self) -> Option<S> {
        self.receiver.recv().await
    }

    /// Take the next buffered state without waiting.
    pub fn try_recv(&mut self) -> Option<S> {
        self.receiver.try_recv().ok()
    }

    pub(crate) fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<S>> {
        self.receiver.poll_recv(cx)
    }
}

impl<S> Stream for StateSubscription<S> {
    type Item = S;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> {
        self.get_mut().poll_recv(cx)
    }
}

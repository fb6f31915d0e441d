//! Serialized, single-writer state container.
//!
//! One loop task drains the input queue in FIFO order. Each input is handed
//! to the [`InputHandler`] together with an [`Emitter`]; every state the
//! handler emits is published before the next input is taken. Unique jobs
//! run beside the loop and talk back to it only by submitting inputs.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::intent::Intent;
use super::jobs::{JobEntry, JobId, JobKey, UniqueJobs};
use super::state::MviState;
use super::subject::{StateSubject, StateSubscription};
use crate::config::ContainerConfig;

/// Turns one input into zero or more states.
///
/// The handler is owned by the processing loop, so `&mut self` is never
/// shared. Foreseeable failures should become error states; an `Err` return
/// only drops the states this input had not emitted yet.
#[async_trait]
pub trait InputHandler: Send + 'static {
    type Input: Intent;
    type State: MviState;

    async fn handle_input(
        &mut self,
        input: Self::Input,
        emitter: &mut Emitter<'_, Self::Input, Self::State>,
    ) -> anyhow::Result<()>;
}

/// Publishing side of the container, lent to the handler for one input.
pub struct Emitter<'a, I, S> {
    handle: &'a ContainerHandle<I, S>,
    emitted: usize,
}

impl<I: Intent, S: MviState> Emitter<'_, I, S> {
    /// Publish `state` as the new current state.
    ///
    /// Returns `false` if the container was closed meanwhile; nothing is published.
    pub fn emit(&mut self, state: S) -> bool {
        let published = self.handle.shared.publish(state);
        if published {
            self.emitted += 1;
        }
        published
    }

    /// Current state, including anything emitted earlier for this input.
    pub fn state(&self) -> S {
        self.handle.state()
    }

    pub fn handle(&self) -> &ContainerHandle<I, S> {
        self.handle
    }
}

struct Shared<I, S> {
    config: ContainerConfig,
    runtime: Handle,
    subject: StateSubject<S>,
    inputs: Mutex<Option<mpsc::UnboundedSender<I>>>,
    pending: AtomicUsize,
    jobs: Mutex<UniqueJobs>,
    closed: AtomicBool,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl<I: Intent, S: MviState> Shared<I, S> {
    fn enqueue(&self, input: I) -> bool {
        let inputs = self.inputs.lock();
        let Some(sender) = inputs.as_ref() else {
            return false;
        };

        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if sender.send(input).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }

        if pending == self.config.queue_warn_threshold {
            tracing::warn!(
                container = %self.config.name,
                pending,
                "Input queue is backing up"
            );
        }
        true
    }

    fn publish(&self, state: S) -> bool {
        let published = self.subject.publish(state);
        if published && self.config.trace_states {
            tracing::trace!(
                container = %self.config.name,
                subscribers = self.subject.subscriber_count(),
                "State published"
            );
        }
        published
    }

    fn finish_job(&self, key: &JobKey, id: JobId) {
        if self.jobs.lock().remove_if_current(key, id) {
            tracing::debug!(container = %self.config.name, key = %key, job = id, "Unique job finished");
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inputs.lock().take();
        let jobs = self.jobs.lock().drain();
        let cancelled_jobs = jobs.len();
        for job in jobs {
            job.abort();
        }
        if let Some(task) = self.loop_task.lock().take() {
            task.abort();
        }
        self.subject.close();

        tracing::debug!(
            container = %self.config.name,
            cancelled_jobs,
            "Container closed"
        );
    }
}

/// Cloneable access to a running container.
///
/// A handle does not keep the container open: closing or dropping the owning
/// [`StateContainer`] turns every handle operation into a no-op.
pub struct ContainerHandle<I, S> {
    shared: Arc<Shared<I, S>>,
}

impl<I, S> Clone for ContainerHandle<I, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<I: Intent, S: MviState> ContainerHandle<I, S> {
    /// Queue `input` for the processing loop. Never blocks.
    ///
    /// Returns `false` if the container is closed.
    pub fn submit(&self, input: I) -> bool {
        let accepted = self.shared.enqueue(input);
        if !accepted {
            tracing::debug!(container = %self.shared.config.name, "Input rejected: container closed");
        }
        accepted
    }

    pub fn state(&self) -> S {
        self.shared.subject.current()
    }

    /// Subscribe to the current state followed by every later state.
    pub fn states(&self) -> StateSubscription<S> {
        self.shared.subject.subscribe()
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Stop the loop, cancel every unique job and end all subscriptions.
    /// Idempotent; safe from any task, including the loop itself.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Inputs queued but not yet picked up by the loop.
    pub fn pending_inputs(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subject.subscriber_count()
    }

    pub fn unique_job_count(&self) -> usize {
        self.shared.jobs.lock().len()
    }

    pub fn has_unique(&self, key: impl Into<JobKey>) -> bool {
        self.shared.jobs.lock().contains(&key.into())
    }

    /// Start `task` under `key`, cancelling whatever job held the key before.
    ///
    /// Returns `false` if the container is closed.
    pub fn run_unique<F, Fut>(&self, key: impl Into<JobKey>, task: F) -> bool
    where
        F: FnOnce(JobScope<I, S>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.start_job(key.into(), task, true)
    }

    /// Start `task` under `key` only if no job currently holds the key.
    pub fn run_unique_if_absent<F, Fut>(&self, key: impl Into<JobKey>, task: F) -> bool
    where
        F: FnOnce(JobScope<I, S>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.start_job(key.into(), task, false)
    }

    /// Cancel and unregister the job under `key`, if any.
    pub fn cancel_unique(&self, key: impl Into<JobKey>) -> bool {
        let key = key.into();
        let removed = self.shared.jobs.lock().remove(&key);
        match removed {
            Some(job) => {
                job.abort();
                tracing::debug!(container = %self.shared.config.name, key = %key, "Unique job cancelled");
                true
            }
            None => false,
        }
    }

    fn start_job<F, Fut>(&self, key: JobKey, task: F, replace: bool) -> bool
    where
        F: FnOnce(JobScope<I, S>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let body = task(JobScope {
            handle: self.clone(),
            cancelled: Arc::clone(&cancelled),
        });

        let mut jobs = self.shared.jobs.lock();
        if self.is_closed() {
            return false;
        }

        let replaced = if replace {
            jobs.remove(&key)
        } else if jobs.contains(&key) {
            return false;
        } else {
            None
        };

        let id = jobs.allocate_id();
        let shared = Arc::clone(&self.shared);
        let task_key = key.clone();
        let task = self.shared.runtime.spawn(async move {
            // Created on first poll, so a future dropped unpolled never
            // touches the registry.
            let _finish = scopeguard::guard((), move |()| shared.finish_job(&task_key, id));
            body.await;
        });
        jobs.insert(key.clone(), JobEntry::new(id, cancelled, task));
        drop(jobs);

        if let Some(previous) = replaced {
            previous.abort();
        }
        tracing::debug!(
            container = %self.shared.config.name,
            key = %key,
            job = id,
            replaced = replace,
            "Unique job started"
        );
        true
    }
}

/// Context handed to a unique job body.
///
/// Has no access to the [`ContainerHandle`]: every input a job produces goes
/// through [`JobScope::submit`], which rejects it once the job is superseded
/// or the container is closed.
pub struct JobScope<I, S> {
    handle: ContainerHandle<I, S>,
    cancelled: Arc<AtomicBool>,
}

impl<I: Intent, S: MviState> JobScope<I, S> {
    /// Queue `input` unless this job has been cancelled.
    ///
    /// The check and the enqueue happen under the job registry lock, so once
    /// `cancel_unique`, `run_unique` or `close` has returned, a superseded job
    /// can no longer reach the loop.
    pub fn submit(&self, input: I) -> bool {
        let _jobs = self.handle.shared.jobs.lock();
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        self.handle.shared.enqueue(input)
    }

    pub fn state(&self) -> S {
        self.handle.state()
    }

}

/// Owner of a running container. Dropping it closes the container.
pub struct StateContainer<I: Intent, S: MviState> {
    handle: ContainerHandle<I, S>,
}

impl<I: Intent, S: MviState> StateContainer<I, S> {
    /// Start a container on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn spawn<H>(initial: S, handler: H) -> Self
    where
        H: InputHandler<Input = I, State = S>,
    {
        Self::spawn_with(
            initial,
            handler,
            ContainerConfig::default(),
            &Handle::current(),
        )
    }

    /// Start a container whose loop and unique jobs run on `runtime`.
    pub fn spawn_with<H>(initial: S, handler: H, config: ContainerConfig, runtime: &Handle) -> Self
    where
        H: InputHandler<Input = I, State = S>,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = ContainerHandle {
            shared: Arc::new(Shared {
                config,
                runtime: runtime.clone(),
                subject: StateSubject::new(initial),
                inputs: Mutex::new(Some(sender)),
                pending: AtomicUsize::new(0),
                jobs: Mutex::new(UniqueJobs::default()),
                closed: AtomicBool::new(false),
                loop_task: Mutex::new(None),
            }),
        };

        let task = runtime.spawn(run_loop(handler, receiver, handle.clone()));
        *handle.shared.loop_task.lock() = Some(task);
        tracing::debug!(container = %handle.name(), "Container started");

        Self { handle }
    }

    pub fn submit(&self, input: I) -> bool {
        self.handle.submit(input)
    }

    pub fn state(&self) -> S {
        self.handle.state()
    }

    pub fn states(&self) -> StateSubscription<S> {
        self.handle.states()
    }

    pub fn close(&self) {
        self.handle.close();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn pending_inputs(&self) -> usize {
        self.handle.pending_inputs()
    }

    pub fn handle(&self) -> &ContainerHandle<I, S> {
        &self.handle
    }
}

impl<I: Intent, S: MviState> Drop for StateContainer<I, S> {
    fn drop(&mut self) {
        self.handle.close();
    }
}

async fn run_loop<H: InputHandler>(
    mut handler: H,
    mut inputs: mpsc::UnboundedReceiver<H::Input>,
    handle: ContainerHandle<H::Input, H::State>,
) {
    // A panic here means a handler broke its contract; surface it loudly and
    // shut the container so callers see `submit` fail instead of a dead queue.
    let guard = scopeguard::guard_on_unwind(handle, |handle| {
        tracing::error!(container = %handle.name(), "Input handler panicked; closing container");
        handle.close();
    });
    let handle: &ContainerHandle<H::Input, H::State> = &guard;

    while let Some(input) = inputs.recv().await {
        handle.shared.pending.fetch_sub(1, Ordering::SeqCst);
        if handle.is_closed() {
            break;
        }

        let mut emitter = Emitter { handle, emitted: 0 };
        if let Err(error) = handler.handle_input(input, &mut emitter).await {
            tracing::warn!(
                container = %handle.name(),
                emitted = emitter.emitted,
                error = %error,
                "Input handling failed; remaining states dropped"
            );
        }
    }
}

//! Registry of named, single-flight background jobs.
//!
//! At most one job is registered per [`JobKey`]. Removing an entry marks it
//! cancelled while the registry lock is held; callers abort the task after
//! releasing the lock.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

/// Name of a unique job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey(Cow<'static, str>);

impl From<&'static str> for JobKey {
    fn from(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }
}

impl From<String> for JobKey {
    fn from(key: String) -> Self {
        Self(Cow::Owned(key))
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one started job, used to guard stale removals.
pub(crate) type JobId = u64;

pub(crate) struct JobEntry {
    id: JobId,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl JobEntry {
    pub(crate) fn new(id: JobId, cancelled: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self {
            id,
            cancelled,
            task,
        }
    }

    fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Stop the task at its next suspension point.
    pub(crate) fn abort(self) {
        self.task.abort();
    }
}

#[derive(Default)]
pub(crate) struct UniqueJobs {
    next_id: JobId,
    entries: HashMap<JobKey, JobEntry>,
}

impl UniqueJobs {
    pub(crate) fn contains(&self, key: &JobKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn allocate_id(&mut self) -> JobId {
        self.next_id += 1;
        self.next_id
    }

    /// Register `entry` under `key`. Panics in debug builds if the slot is taken;
    /// callers remove the previous job first.
    pub(crate) fn insert(&mut self, key: JobKey, entry: JobEntry) {
        let previous = self.entries.insert(key, entry);
        debug_assert!(previous.is_none(), "unique job slot was not vacated");
    }

    /// Unregister the job under `key`, marking it cancelled.
    pub(crate) fn remove(&mut self, key: &JobKey) -> Option<JobEntry> {
        let entry = self.entries.remove(key)?;
        entry.mark_cancelled();
        Some(entry)
    }

    /// Completion path: only unregister if `key` still maps to job `id`.
    pub(crate) fn remove_if_current(&mut self, key: &JobKey, id: JobId) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.id == id => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Unregister every job, marking each cancelled.
    pub(crate) fn drain(&mut self) -> Vec<JobEntry> {
        self.entries
            .drain()
            .map(|(_, entry)| {
                entry.mark_cancelled();
                entry
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(jobs: &mut UniqueJobs) -> (JobEntry, Arc<AtomicBool>) {
        let id = jobs.allocate_id();
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(async {});
        (JobEntry::new(id, Arc::clone(&cancelled), task), cancelled)
    }

    #[tokio::test]
    async fn stale_completion_does_not_remove_newer_job() {
        let mut jobs = UniqueJobs::default();
        let key = JobKey::from("next_page");

        let (first, first_cancelled) = entry(&mut jobs);
        let first_id = first.id;
        jobs.insert(key.clone(), first);

        let replaced = jobs.remove(&key).expect("first job registered");
        assert!(first_cancelled.load(Ordering::SeqCst));
        replaced.abort();

        let (second, second_cancelled) = entry(&mut jobs);
        let second_id = second.id;
        jobs.insert(key.clone(), second);

        assert!(!jobs.remove_if_current(&key, first_id));
        assert!(jobs.contains(&key));
        assert!(!second_cancelled.load(Ordering::SeqCst));

        assert!(jobs.remove_if_current(&key, second_id));
        assert!(!jobs.contains(&key));
    }

    #[tokio::test]
    async fn drain_cancels_everything() {
        let mut jobs = UniqueJobs::default();
        let (a, a_cancelled) = entry(&mut jobs);
        let (b, b_cancelled) = entry(&mut jobs);
        jobs.insert("a".into(), a);
        jobs.insert(String::from("b").into(), b);
        assert_eq!(jobs.len(), 2);

        for entry in jobs.drain() {
            entry.abort();
        }
        assert_eq!(jobs.len(), 0);
        assert!(a_cancelled.load(Ordering::SeqCst));
        assert!(b_cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn job_keys_compare_by_content() {
        assert_eq!(JobKey::from("child-1"), JobKey::from(format!("child-{}", 1)));
        assert_eq!(JobKey::from("next_page").to_string(), "next_page");
    }
}

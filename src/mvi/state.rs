//! Base trait for container state in MVI architecture.

/// Marker trait for state objects.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Self-contained (all data an observer needs)
/// - Shareable across threads, since snapshots are read from any task
pub trait MviState: Clone + Send + Sync + 'static {}

//! Base trait for intents (inputs) in MVI architecture.

/// Marker trait for input objects submitted to a container.
///
/// Intents represent:
/// - Caller commands (refresh, load more, edits)
/// - Results of background work fed back into the loop
///
/// Intents are processed one at a time by an input handler.
pub trait Intent: Send + 'static {}

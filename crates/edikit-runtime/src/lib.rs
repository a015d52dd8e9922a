#![forbid(unsafe_code)]

//! edikit runtime
//!
//! This crate provides the stateful components that tie the pure machine in
//! `edikit-core` to the outside world: the [`Editable`] controller and the
//! [`CancelableTask`] it uses for commits in flight.
//!
//! # Key Components
//!
//! - [`Editable`] - Controller owning one editable value's lifecycle
//! - [`Commit`] - Outcome of a commit callback (synchronous or pending)
//! - [`CancelableTask`] - Background job with cooperative cancellation
//!
//! # Role in edikit
//! `edikit-runtime` is the orchestrator. Consumers call the controller's
//! operations, render from its `(status, value)` read surface, and pump
//! settlements with `settle`/`settle_blocking` from their own event loop.
//! The controller never mutates state from a background thread.

pub mod cancelable;
pub mod controller;

pub use cancelable::{CancelableTask, TaskState};
pub use controller::{
    Commit, CommitError, CommitJob, CommitKind, CommitPanicked, CommitResult, Editable,
};

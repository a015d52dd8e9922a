#![forbid(unsafe_code)]

//! edikit public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports the common types from the internal crates and offers a
//! lightweight prelude for day-to-day usage.
//!
//! ```
//! use edikit::prelude::*;
//!
//! let mut title = Editable::new("Untitled".to_owned())
//!     .on_submit(|_| Commit::done());
//!
//! title.start();
//! title.change("Draft proposal".to_owned());
//! assert_eq!(title.status(), Status::Editing);
//!
//! title.submit();
//! assert_eq!(title.status(), Status::Presenting);
//! assert_eq!(title.value(), "Untitled");
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use edikit_core::machine::{Action, EditState, Status};

// --- Runtime re-exports ----------------------------------------------------

pub use edikit_runtime::cancelable::{CancelableTask, TaskState};
pub use edikit_runtime::controller::{
    Commit, CommitError, CommitJob, CommitKind, CommitPanicked, CommitResult, Editable,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for edikit consumers.
#[derive(Debug)]
pub enum Error {
    /// A commit operation failed.
    Commit(CommitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Commit(err) => Some(err.as_ref()),
        }
    }
}

impl From<CommitError> for Error {
    fn from(err: CommitError) -> Self {
        Self::Commit(err)
    }
}

/// Standard result type for edikit APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Action, Commit, CommitKind, CommitResult, EditState, Editable, Error, Result, Status,
    };

    pub use crate::{core, runtime};
}

pub use edikit_core as core;
pub use edikit_runtime as runtime;

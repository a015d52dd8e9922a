#![forbid(unsafe_code)]

//! Edit-lifecycle state machine.
//!
//! A value under edit is always in exactly one of three statuses:
//! presenting (the external value is shown as-is), editing (a local draft
//! exists), or committing (a save operation is in flight). Status changes
//! are driven exclusively through [`EditState::apply`], a pure and total
//! transition function, which makes the whole machine enumerable in tests.
//!
//! The legal transitions:
//!
//! | Status     | Start      | Change     | Cancel     | Commit     | Success    | Fail       |
//! |------------|------------|------------|------------|------------|------------|------------|
//! | Presenting | Editing(p) | Editing(p) | .          | .          | .          | .          |
//! | Editing    | .          | Editing(p) | Presenting | Committing | .          | .          |
//! | Committing | .          | .          | .          | .          | Presenting | Editing    |
//!
//! `p` is the action payload (the new draft). A dot means the action is a
//! no-op in that status: the state is kept and the payload is dropped.
//! `Commit` and `Fail` leave the draft untouched so a failed save can be
//! retried without losing the user's edit; `Success` and `Cancel` discard
//! it.

use core::fmt;

/// Lifecycle status of an editable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// No local draft; the externally supplied value is authoritative.
    Presenting,
    /// A local draft exists and is authoritative; no commit in flight.
    Editing,
    /// A commit operation is in flight; the draft under commit is shown.
    Committing,
}

impl Status {
    /// Return a stable name for telemetry and tracing.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Presenting => "Presenting",
            Self::Editing => "Editing",
            Self::Committing => "Committing",
        }
    }

    /// All statuses, in lifecycle order.
    pub const ALL: [Status; 3] = [Self::Presenting, Self::Editing, Self::Committing];
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input to the state machine.
///
/// `Start` and `Change` carry the new draft. The settlement actions
/// (`Success`, `Fail`) are fed back by the runtime when a commit resolves;
/// the rest come from the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<T> {
    /// Begin editing with the given draft (usually the external value).
    Start(T),
    /// Replace the draft.
    Change(T),
    /// Abandon the draft.
    Cancel,
    /// Begin committing the current draft.
    Commit,
    /// The in-flight commit resolved.
    Success,
    /// The in-flight commit failed; the draft is kept for retry.
    Fail,
}

impl<T> Action<T> {
    /// Return a stable name for telemetry and tracing.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "Start",
            Self::Change(_) => "Change",
            Self::Cancel => "Cancel",
            Self::Commit => "Commit",
            Self::Success => "Success",
            Self::Fail => "Fail",
        }
    }
}

/// The machine state: a status plus the local draft, if any.
///
/// The draft is only meaningful while editing or committing. States are
/// built through the constructors, which keep the pair consistent: a
/// presenting state never carries a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EditState<T> {
    status: Status,
    draft: Option<T>,
}

impl<T> EditState<T> {
    /// The initial state: presenting, no draft.
    #[inline]
    pub fn presenting() -> Self {
        Self {
            status: Status::Presenting,
            draft: None,
        }
    }

    /// An editing state holding the given draft.
    #[inline]
    pub fn editing(draft: T) -> Self {
        Self {
            status: Status::Editing,
            draft: Some(draft),
        }
    }

    /// A committing state holding the draft under commit.
    #[inline]
    pub fn committing(draft: T) -> Self {
        Self {
            status: Status::Committing,
            draft: Some(draft),
        }
    }

    /// Current status.
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// The local draft, if one is held.
    #[inline]
    pub fn draft(&self) -> Option<&T> {
        self.draft.as_ref()
    }

    /// Apply an action, producing the next state.
    ///
    /// Pure and total: every `(status, action)` pair maps to a next state,
    /// and pairs outside the transition table keep the current state and
    /// drop the payload.
    #[must_use]
    pub fn apply(self, action: Action<T>) -> Self {
        match (self.status, action) {
            // Starting to edit and the first keystroke are the same
            // transition; both seed the draft from the payload.
            (Status::Presenting, Action::Start(draft) | Action::Change(draft)) => {
                Self::editing(draft)
            }
            (Status::Editing, Action::Change(draft)) => Self::editing(draft),
            (Status::Editing, Action::Cancel) => Self::presenting(),
            (Status::Editing, Action::Commit) => Self {
                status: Status::Committing,
                draft: self.draft,
            },
            (Status::Committing, Action::Success) => Self::presenting(),
            (Status::Committing, Action::Fail) => Self {
                status: Status::Editing,
                draft: self.draft,
            },
            // Everything else is a no-op, not an error. Cancel during a
            // commit and commit outside of editing stay silent; callers
            // rely on the no-op.
            (_, _) => self,
        }
    }

    /// Resolve the authoritative value: the external value while
    /// presenting, the draft otherwise.
    ///
    /// Pure; safe to call on every read. A stale draft held by a
    /// presenting state is never exposed.
    #[inline]
    pub fn resolve<'a>(&'a self, external: &'a T) -> &'a T {
        match self.status {
            Status::Presenting => external,
            Status::Editing | Status::Committing => self.draft.as_ref().unwrap_or(external),
        }
    }
}

impl<T> Default for EditState<T> {
    fn default() -> Self {
        Self::presenting()
    }
}

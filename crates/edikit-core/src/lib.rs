#![forbid(unsafe_code)]

//! edikit core
//!
//! The pure layer of edikit: the edit-lifecycle state machine and value
//! resolution. Nothing here performs I/O, spawns threads, or holds
//! callbacks; that is the job of `edikit-runtime`, which drives this
//! machine on every operation.
//!
//! # Key Components
//!
//! - [`Status`] - The three lifecycle statuses of an editable value
//! - [`Action`] - Inputs that drive the machine
//! - [`EditState`] - Status plus draft, advanced via [`EditState::apply`]
//!
//! # Role in edikit
//! `edikit-core` is inert. Every legal state change is a pure
//! function of `(state, action)`, so the full transition table can be
//! enumerated and property-tested without a runtime.

pub mod machine;

pub use machine::{Action, EditState, Status};

#![forbid(unsafe_code)]

//! The editable-value controller.
//!
//! [`Editable`] owns one piece of user-editable data as it moves between
//! being displayed, being edited, and being committed. Every operation is
//! funneled through the pure transition machine in `edikit-core`; the
//! controller adds the stateful parts: the external value, the registered
//! callbacks, and the single outstanding [`CancelableTask`] for a commit in
//! flight.
//!
//! The controller has a single logical owner. Commit jobs run on a worker
//! thread, but their settlements are only applied when the owner calls
//! [`Editable::settle`] or [`Editable::settle_blocking`], so state is never
//! mutated from two places. Teardown via [`Editable::dispose`] cancels the
//! outstanding task before any late settlement can be observed.

use core::fmt;

use edikit_core::{Action, EditState, Status};

use crate::cancelable::{CancelableTask, TaskState};

/// Error produced by a failed commit job.
pub type CommitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Settlement of a commit job.
pub type CommitResult = Result<(), CommitError>;

/// A commit operation that continues on a background thread.
pub type CommitJob = Box<dyn FnOnce() -> CommitResult + Send + 'static>;

/// Outcome of invoking a commit callback.
///
/// A callback either finishes its work synchronously ([`Commit::Done`]) or
/// hands back a job to run in the background ([`Commit::Pending`]). The
/// synchronous form drives `Success` immediately; the pending form puts the
/// controller into `Committing` until the job settles.
#[derive(Default)]
pub enum Commit {
    /// The operation finished synchronously.
    #[default]
    Done,
    /// The operation continues on a background thread.
    Pending(CommitJob),
}

impl Commit {
    /// A synchronously finished commit.
    #[inline]
    pub fn done() -> Self {
        Self::Done
    }

    /// A commit that continues as a background job.
    pub fn pending<F>(job: F) -> Self
    where
        F: FnOnce() -> CommitResult + Send + 'static,
    {
        Self::Pending(Box::new(job))
    }
}

impl fmt::Debug for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "Done"),
            Self::Pending(_) => write!(f, "Pending(..)"),
        }
    }
}

/// The built-in commit triggers.
///
/// Mirrors the classic create/update/delete form actions; arbitrary
/// operations go through [`Editable::commit_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitKind {
    /// Persist a new value.
    Submit,
    /// Persist a change to an existing value.
    Update,
    /// Remove the value.
    Delete,
}

impl CommitKind {
    /// Return a stable name for telemetry and tracing.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "Submit",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded when a commit job dies without settling.
#[derive(Debug)]
pub struct CommitPanicked {
    message: String,
}

impl fmt::Display for CommitPanicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit job panicked: {}", self.message)
    }
}

impl std::error::Error for CommitPanicked {}

type CancelFn<T> = Box<dyn FnMut(&T)>;
type CommitFn<T> = Box<dyn FnMut(&T) -> Commit>;

struct Callbacks<T> {
    on_cancel: Option<CancelFn<T>>,
    on_submit: Option<CommitFn<T>>,
    on_update: Option<CommitFn<T>>,
    on_delete: Option<CommitFn<T>>,
}

impl<T> Callbacks<T> {
    fn empty() -> Self {
        Self {
            on_cancel: None,
            on_submit: None,
            on_update: None,
            on_delete: None,
        }
    }

    fn commit_for(&mut self, kind: CommitKind) -> Option<&mut CommitFn<T>> {
        match kind {
            CommitKind::Submit => self.on_submit.as_mut(),
            CommitKind::Update => self.on_update.as_mut(),
            CommitKind::Delete => self.on_delete.as_mut(),
        }
    }
}

/// Controller for a single editable value.
///
/// Construct with [`Editable::new`], register callbacks with the builder
/// methods, then drive it through `start`/`change`/`cancel` and the commit
/// triggers. Read the render surface back with [`Editable::status`] and
/// [`Editable::value`] after every operation.
///
/// ```
/// use edikit_runtime::{Commit, Editable};
///
/// let mut name = Editable::new("Ada".to_owned())
///     .on_submit(|_| Commit::done());
/// name.change("Ada L.".to_owned());
/// assert_eq!(name.value(), "Ada L.");
/// name.submit();
/// assert_eq!(name.value(), "Ada");
/// ```
pub struct Editable<T> {
    external: T,
    state: EditState<T>,
    callbacks: Callbacks<T>,
    pending: Option<CancelableTask<CommitResult>>,
    last_error: Option<CommitError>,
    disposed: bool,
}

impl<T: Clone> Editable<T> {
    /// Create a controller presenting the given external value.
    pub fn new(external: T) -> Self {
        Self {
            external,
            state: EditState::presenting(),
            callbacks: Callbacks::empty(),
            pending: None,
            last_error: None,
            disposed: false,
        }
    }

    // --- Builder methods ---

    /// Register the cancel callback (builder).
    ///
    /// Called with the abandoned draft, and only when `cancel` is invoked
    /// while editing.
    pub fn on_cancel<F>(mut self, f: F) -> Self
    where
        F: FnMut(&T) + 'static,
    {
        self.callbacks.on_cancel = Some(Box::new(f));
        self
    }

    /// Register the submit commit callback (builder).
    pub fn on_submit<F>(mut self, f: F) -> Self
    where
        F: FnMut(&T) -> Commit + 'static,
    {
        self.callbacks.on_submit = Some(Box::new(f));
        self
    }

    /// Register the update commit callback (builder).
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(&T) -> Commit + 'static,
    {
        self.callbacks.on_update = Some(Box::new(f));
        self
    }

    /// Register the delete commit callback (builder).
    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: FnMut(&T) -> Commit + 'static,
    {
        self.callbacks.on_delete = Some(Box::new(f));
        self
    }

    // --- Read surface ---

    /// Current lifecycle status.
    #[inline]
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// The authoritative value: the external value while presenting, the
    /// draft otherwise.
    #[inline]
    pub fn value(&self) -> &T {
        self.state.resolve(&self.external)
    }

    /// The externally supplied value.
    #[inline]
    pub fn external(&self) -> &T {
        &self.external
    }

    /// Whether a commit is in flight.
    #[inline]
    pub fn is_committing(&self) -> bool {
        self.state.status() == Status::Committing
    }

    /// The most recent commit failure, kept for display until the next
    /// commit starts.
    pub fn last_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.last_error.as_deref()
    }

    /// Replace the external value.
    ///
    /// Collaborators call this after a successful commit, once the store
    /// they committed to reflects the new value.
    pub fn set_external(&mut self, value: T) {
        self.external = value;
    }

    // --- Operations ---

    /// Begin editing, seeding the draft from the external value.
    pub fn start(&mut self) {
        if self.disposed {
            return;
        }
        self.drive(Action::Start(self.external.clone()));
    }

    /// Replace the draft.
    ///
    /// From `Presenting` this also begins editing. While `Committing` the
    /// change is dropped, not queued.
    pub fn change(&mut self, value: T) {
        if self.disposed {
            return;
        }
        self.drive(Action::Change(value));
    }

    /// Abandon the draft.
    ///
    /// Notifies the cancel callback with the draft, but only when invoked
    /// while `Editing`; from `Presenting` or `Committing` this is a no-op
    /// and nothing is notified.
    pub fn cancel(&mut self) {
        if self.disposed {
            return;
        }
        if self.state.status() == Status::Editing
            && let Some(notify) = self.callbacks.on_cancel.as_mut()
            && let Some(draft) = self.state.draft()
        {
            notify(draft);
        }
        self.drive(Action::Cancel);
    }

    /// Commit via the submit callback.
    ///
    /// # Panics
    ///
    /// Panics if a commit is already in flight.
    pub fn submit(&mut self) {
        self.commit(CommitKind::Submit);
    }

    /// Commit via the update callback.
    ///
    /// # Panics
    ///
    /// Panics if a commit is already in flight.
    pub fn update(&mut self) {
        self.commit(CommitKind::Update);
    }

    /// Commit via the delete callback.
    ///
    /// # Panics
    ///
    /// Panics if a commit is already in flight.
    pub fn delete(&mut self) {
        self.commit(CommitKind::Delete);
    }

    /// Commit via the callback registered for `kind`.
    ///
    /// An unregistered callback behaves as a synchronous no-op operation:
    /// the commit succeeds immediately.
    ///
    /// # Panics
    ///
    /// Panics if a commit is already in flight.
    pub fn commit(&mut self, kind: CommitKind) {
        if self.disposed {
            return;
        }
        self.begin_commit();
        #[cfg(feature = "tracing")]
        tracing::debug!(kind = kind.as_str(), "commit requested");
        let value = self.value().clone();
        self.drive(Action::Commit);
        let outcome = match self.callbacks.commit_for(kind) {
            Some(run) => run(&value),
            None => Commit::Done,
        };
        self.finish_commit(outcome);
    }

    /// Commit via an arbitrary operation.
    ///
    /// The operation receives the authoritative value resolved at call
    /// time. This is the generic entry point behind the named triggers;
    /// use it for commit kinds beyond submit/update/delete.
    ///
    /// # Panics
    ///
    /// Panics if a commit is already in flight.
    pub fn commit_with<F>(&mut self, op: F)
    where
        F: FnOnce(&T) -> Commit,
    {
        if self.disposed {
            return;
        }
        self.begin_commit();
        let value = self.value().clone();
        self.drive(Action::Commit);
        self.finish_commit(op(&value));
    }

    /// Apply an available settlement without blocking.
    ///
    /// Call this from the owner's event loop while `is_committing`. Does
    /// nothing when no commit is outstanding or the settlement has not
    /// arrived yet.
    pub fn settle(&mut self) {
        if self.disposed {
            return;
        }
        let Some(task) = self.pending.as_mut() else {
            return;
        };
        let observed = task.poll();
        self.apply_settlement(observed);
    }

    /// Block until the outstanding commit settles, then apply it.
    pub fn settle_blocking(&mut self) {
        if self.disposed {
            return;
        }
        let Some(task) = self.pending.as_mut() else {
            return;
        };
        let observed = task.wait();
        self.apply_settlement(observed);
    }

    /// Tear the controller down.
    ///
    /// Cancels any outstanding commit task so its settlement can never
    /// drive a transition on a dead controller. Idempotent; every
    /// operation after the first call is ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(task) = self.pending.take() {
            task.cancel();
            #[cfg(feature = "tracing")]
            tracing::debug!("outstanding commit canceled on dispose");
        }
    }

    // --- Internal ---

    /// Fault on commit-while-committing and reset the displayed error.
    fn begin_commit(&mut self) {
        assert!(
            self.pending.is_none() && self.state.status() != Status::Committing,
            "edikit: commit requested while a commit is already in flight"
        );
        self.last_error = None;
    }

    fn finish_commit(&mut self, outcome: Commit) {
        match outcome {
            Commit::Done => self.drive(Action::Success),
            Commit::Pending(job) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("commit job spawned");
                self.pending = Some(CancelableTask::spawn(job));
            }
        }
    }

    fn apply_settlement(&mut self, observed: TaskState<CommitResult>) {
        match observed {
            TaskState::Pending => {}
            TaskState::Canceled => {
                self.pending = None;
            }
            TaskState::Settled(Ok(())) => {
                self.pending = None;
                self.drive(Action::Success);
            }
            TaskState::Settled(Err(err)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "commit failed");
                self.pending = None;
                self.last_error = Some(err);
                self.drive(Action::Fail);
            }
            TaskState::Panicked(message) => {
                #[cfg(feature = "tracing")]
                tracing::error!("commit job panicked: {message}");
                #[cfg(not(feature = "tracing"))]
                eprintln!("edikit: commit job panicked: {message}");
                self.pending = None;
                self.last_error = Some(Box::new(CommitPanicked { message }));
                self.drive(Action::Fail);
            }
        }
    }

    fn drive(&mut self, action: Action<T>) {
        #[cfg(feature = "tracing")]
        let (from, name) = (self.state.status(), action.name());
        let state = std::mem::take(&mut self.state);
        self.state = state.apply(action);
        #[cfg(feature = "tracing")]
        tracing::trace!(
            from = from.as_str(),
            to = self.state.status().as_str(),
            action = name,
            "transition"
        );
    }
}

impl<T> Drop for Editable<T> {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Editable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editable")
            .field("status", &self.status())
            .field("value", self.value())
            .field("pending", &self.pending.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc::{Sender, channel};

    fn controller() -> Editable<String> {
        Editable::new("INITIAL".to_owned())
    }

    /// A commit job that blocks until the test releases it, then settles
    /// with the given result.
    fn gated_job(result: CommitResult) -> (Commit, Sender<()>) {
        let (release_tx, release_rx) = channel();
        let commit = Commit::pending(move || {
            release_rx.recv().ok();
            result
        });
        (commit, release_tx)
    }

    #[test]
    fn starts_presenting_the_external_value() {
        let ed = controller();
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(ed.value(), "INITIAL");
        assert!(ed.last_error().is_none());
    }

    #[test]
    fn start_seeds_draft_from_external() {
        let mut ed = controller();
        ed.start();
        assert_eq!(ed.status(), Status::Editing);
        assert_eq!(ed.value(), "INITIAL");
    }

    #[test]
    fn change_enters_editing_with_new_value() {
        let mut ed = controller();
        ed.change("NEW".to_owned());
        assert_eq!(ed.status(), Status::Editing);
        assert_eq!(ed.value(), "NEW");
    }

    #[test]
    fn sync_commit_returns_to_presenting() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut ed = Editable::new("INITIAL".to_owned()).on_submit(move |v: &String| {
            log.borrow_mut().push(v.clone());
            Commit::done()
        });
        ed.change("NEW".to_owned());
        ed.submit();
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(ed.value(), "INITIAL");
        assert_eq!(*seen.borrow(), vec!["NEW".to_owned()]);
    }

    #[test]
    fn unregistered_commit_kind_succeeds_synchronously() {
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.delete();
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(ed.value(), "INITIAL");
    }

    #[test]
    fn commit_kinds_dispatch_to_their_callbacks() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let (submit_log, update_log, delete_log) =
            (Rc::clone(&calls), Rc::clone(&calls), Rc::clone(&calls));
        let mut ed = Editable::new(0u32)
            .on_submit(move |_| {
                submit_log.borrow_mut().push("submit");
                Commit::done()
            })
            .on_update(move |_| {
                update_log.borrow_mut().push("update");
                Commit::done()
            })
            .on_delete(move |_| {
                delete_log.borrow_mut().push("delete");
                Commit::done()
            });
        ed.submit();
        ed.update();
        ed.delete();
        assert_eq!(*calls.borrow(), vec!["submit", "update", "delete"]);
    }

    #[test]
    fn cancel_notifies_with_draft_only_while_editing() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut ed = Editable::new("INITIAL".to_owned())
            .on_cancel(move |v: &String| log.borrow_mut().push(v.clone()));

        // Presenting: no notification.
        ed.cancel();
        assert!(seen.borrow().is_empty());

        // Editing: notified with the draft, then back to presenting.
        ed.change("NEW".to_owned());
        ed.cancel();
        assert_eq!(*seen.borrow(), vec!["NEW".to_owned()]);
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(ed.value(), "INITIAL");
    }

    #[test]
    fn cancel_during_commit_is_ignored() {
        let (commit, release) = gated_job(Ok(()));
        let notified = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&notified);
        let mut ed = Editable::new("INITIAL".to_owned()).on_cancel(move |_| {
            *flag.borrow_mut() = true;
        });
        ed.change("NEW".to_owned());
        ed.commit_with(move |_| commit);
        ed.cancel();
        assert_eq!(ed.status(), Status::Committing);
        assert!(!*notified.borrow());
        release.send(()).unwrap();
        ed.settle_blocking();
        assert_eq!(ed.status(), Status::Presenting);
    }

    #[test]
    fn change_during_commit_is_dropped() {
        let (commit, release) = gated_job(Ok(()));
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(move |_| commit);
        ed.change("IGNORED".to_owned());
        assert_eq!(ed.value(), "NEW");
        release.send(()).unwrap();
        ed.settle_blocking();
        assert_eq!(ed.value(), "INITIAL");
    }

    #[test]
    fn async_commit_success_resets_to_presenting() {
        let (commit, release) = gated_job(Ok(()));
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(move |_| commit);
        assert_eq!(ed.status(), Status::Committing);
        assert_eq!(ed.value(), "NEW");
        // Not settled yet: polling leaves the commit in flight.
        ed.settle();
        assert_eq!(ed.status(), Status::Committing);
        release.send(()).unwrap();
        ed.settle_blocking();
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(ed.value(), "INITIAL");
        assert!(ed.last_error().is_none());
    }

    #[test]
    fn async_commit_failure_preserves_draft() {
        let (commit, release) = gated_job(Err("store unavailable".into()));
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(move |_| commit);
        release.send(()).unwrap();
        ed.settle_blocking();
        assert_eq!(ed.status(), Status::Editing);
        assert_eq!(ed.value(), "NEW");
        let err = ed.last_error().expect("failure should be recorded");
        assert_eq!(err.to_string(), "store unavailable");
    }

    #[test]
    fn commit_operation_receives_authoritative_value() {
        let mut ed = controller();
        ed.change("NEW".to_owned());
        let mut seen = None;
        ed.commit_with(|v| {
            seen = Some(v.clone());
            Commit::done()
        });
        assert_eq!(seen.as_deref(), Some("NEW"));
    }

    #[test]
    fn commit_from_presenting_stays_presenting() {
        // The table no-ops Commit outside Editing, but the operation still
        // runs with the external value.
        let mut ed = controller();
        let mut seen = None;
        ed.commit_with(|v| {
            seen = Some(v.clone());
            Commit::done()
        });
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(seen.as_deref(), Some("INITIAL"));
    }

    #[test]
    #[should_panic(expected = "commit requested while a commit is already in flight")]
    fn double_commit_panics() {
        let (commit, _release) = gated_job(Ok(()));
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(move |_| commit);
        ed.submit();
    }

    #[test]
    fn dispose_suppresses_late_settlement() {
        let (release_tx, release_rx) = channel();
        let (done_tx, done_rx) = channel();
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(move |_| {
            Commit::pending(move || {
                release_rx.recv().ok();
                done_tx.send(()).unwrap();
                Ok(())
            })
        });
        ed.dispose();
        release_tx.send(()).unwrap();
        // The job runs to completion after teardown without any effect.
        done_rx.recv().unwrap();
        ed.settle();
        ed.settle_blocking();
    }

    #[test]
    fn dispose_is_idempotent_and_ignores_operations() {
        let mut ed = controller();
        ed.dispose();
        ed.dispose();
        ed.start();
        ed.change("NEW".to_owned());
        ed.submit();
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(ed.value(), "INITIAL");
    }

    #[test]
    fn drop_during_commit_does_not_fault() {
        let (release_tx, release_rx) = channel();
        let (done_tx, done_rx) = channel();
        {
            let mut ed = controller();
            ed.change("NEW".to_owned());
            ed.commit_with(move |_| {
                Commit::pending(move || {
                    release_rx.recv().ok();
                    done_tx.send(()).unwrap();
                    Ok(())
                })
            });
        }
        release_tx.send(()).unwrap();
        done_rx.recv().unwrap();
    }

    #[test]
    fn panicked_commit_job_fails_the_commit() {
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(|_| Commit::pending(|| panic!("boom")));
        ed.settle_blocking();
        assert_eq!(ed.status(), Status::Editing);
        assert_eq!(ed.value(), "NEW");
        let err = ed.last_error().expect("panic should be recorded");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn set_external_updates_presented_value() {
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(|_| Commit::done());
        ed.set_external("NEW".to_owned());
        assert_eq!(ed.status(), Status::Presenting);
        assert_eq!(ed.value(), "NEW");
    }

    #[test]
    fn next_commit_clears_last_error() {
        let mut ed = controller();
        ed.change("NEW".to_owned());
        ed.commit_with(|_| Commit::pending(|| Err("first failure".into())));
        ed.settle_blocking();
        assert!(ed.last_error().is_some());
        ed.commit_with(|_| Commit::done());
        assert!(ed.last_error().is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Start,
            Change(String),
            Cancel,
            SyncCommit,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Start),
                "[a-z]{0,8}".prop_map(Op::Change),
                Just(Op::Cancel),
                Just(Op::SyncCommit),
            ]
        }

        proptest! {
            #[test]
            fn synchronous_operations_never_leave_presenting_dirty(
                ops in proptest::collection::vec(op_strategy(), 0..40),
            ) {
                let mut ed = Editable::new("EXTERNAL".to_owned());
                for op in ops {
                    match op {
                        Op::Start => ed.start(),
                        Op::Change(v) => ed.change(v),
                        Op::Cancel => ed.cancel(),
                        Op::SyncCommit => ed.commit_with(|_| Commit::done()),
                    }
                    if ed.status() == Status::Presenting {
                        prop_assert_eq!(ed.value(), "EXTERNAL");
                    }
                }
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Cancelable background tasks.
//!
//! A [`CancelableTask`] runs a job on a spawned thread and delivers its
//! result over a channel, gated by a cooperative cancellation flag.
//! Cancellation never aborts the job; the job runs to completion, but once
//! the flag is set its settlement is suppressed at both the send and the
//! receive boundary, so a canceled task can never deliver a result.
//!
//! The canceled outcome is structurally distinct from a settlement
//! ([`TaskState::Canceled`] vs [`TaskState::Settled`]) so owners can tell
//! "suppress this" apart from "the job genuinely failed".

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

/// Observed state of a [`CancelableTask`].
#[derive(Debug, PartialEq, Eq)]
pub enum TaskState<R> {
    /// The job has not settled yet.
    Pending,
    /// The task was canceled; any settlement is suppressed.
    Canceled,
    /// The job completed with this result.
    Settled(R),
    /// The worker thread died without settling (the job panicked).
    Panicked(String),
}

/// A background job with cooperative cancellation.
///
/// At most one of these exists per controller; the owner polls it for a
/// settlement and cancels it on teardown.
#[derive(Debug)]
pub struct CancelableTask<R> {
    canceled: Arc<AtomicBool>,
    settlement: Receiver<R>,
    worker: Option<JoinHandle<()>>,
}

impl<R: Send + 'static> CancelableTask<R> {
    /// Run `job` on a background thread.
    ///
    /// The worker checks the cancellation flag after the job completes and
    /// only then sends the settlement, so a task canceled mid-flight stays
    /// silent.
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let canceled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&canceled);
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::spawn(move || {
            let outcome = job();
            if !flag.load(Ordering::SeqCst) {
                let _ = tx.send(outcome);
            }
        });
        Self {
            canceled,
            settlement: rx,
            worker: Some(worker),
        }
    }

    /// Cancel the task.
    ///
    /// Cooperative: the job keeps running, but its settlement will never be
    /// observed. Takes effect synchronously; a `poll` or `wait` issued after
    /// this call returns [`TaskState::Canceled`] even if the job already
    /// settled.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Whether the task has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Check for a settlement without blocking.
    pub fn poll(&mut self) -> TaskState<R> {
        if self.is_canceled() {
            return TaskState::Canceled;
        }
        match self.settlement.try_recv() {
            Ok(outcome) => {
                self.reap();
                TaskState::Settled(outcome)
            }
            Err(TryRecvError::Empty) => TaskState::Pending,
            // The sender was dropped without sending: the worker died
            // before reaching its settlement check.
            Err(TryRecvError::Disconnected) => self.worker_died(),
        }
    }

    /// Block until the task settles, is canceled, or dies.
    ///
    /// Never returns [`TaskState::Pending`].
    pub fn wait(&mut self) -> TaskState<R> {
        if self.is_canceled() {
            return TaskState::Canceled;
        }
        match self.settlement.recv() {
            Ok(outcome) => {
                self.reap();
                TaskState::Settled(outcome)
            }
            Err(_) => {
                if self.is_canceled() {
                    TaskState::Canceled
                } else {
                    self.worker_died()
                }
            }
        }
    }

    fn worker_died(&mut self) -> TaskState<R> {
        let message = self
            .reap()
            .unwrap_or_else(|| "unknown panic payload".to_owned());
        TaskState::Panicked(message)
    }

    /// Join the finished worker, recovering a panic message if it died.
    fn reap(&mut self) -> Option<String> {
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(()) => None,
            Err(payload) => Some(panic_message(payload)),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

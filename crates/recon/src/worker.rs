//! Background jobs with an optional deadline.
//!
//! A job runs on its own named thread and reports through an `mpsc` channel.
//! Waiting past the deadline abandons the job: the thread keeps running
//! detached and its result is dropped when it finally arrives.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    TimedOut(Duration),
    /// The job panicked before reporting.
    Panicked,
    Spawn(String),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut(after) => write!(f, "timed out after {:.1}s", after.as_secs_f64()),
            Self::Panicked => write!(f, "worker panicked"),
            Self::Spawn(msg) => write!(f, "cannot start worker: {msg}"),
        }
    }
}

impl std::error::Error for JobError {}

/// A job started by [`spawn`], not yet waited on.
#[derive(Debug)]
pub struct PendingJob<T> {
    rx: mpsc::Receiver<T>,
    started: Instant,
}

/// Start `job` on a thread called `name`.
pub fn spawn<T, F>(name: String, job: F) -> Result<PendingJob<T>, JobError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            // The receiver is gone once the caller gave up waiting.
            let _ = tx.send(job());
        })
        .map_err(|e| JobError::Spawn(e.to_string()))?;
    Ok(PendingJob {
        rx,
        started: Instant::now(),
    })
}

impl<T> PendingJob<T> {
    /// Block until the job reports, or until `timeout` has passed since it was
    /// started. `None` waits indefinitely.
    pub fn wait(self, timeout: Option<Duration>) -> Result<T, JobError> {
        let Some(timeout) = timeout else {
            return self.rx.recv().map_err(|_| JobError::Panicked);
        };
        let remaining = timeout.saturating_sub(self.started.elapsed());
        match self.rx.recv_timeout(remaining) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(JobError::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(JobError::Panicked),
        }
    }
}

/// Run `job` on a worker thread and wait at most `timeout` for it.
pub fn run_with_timeout<T, F>(name: String, timeout: Option<Duration>, job: F) -> Result<T, JobError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    spawn(name, job)?.wait(timeout)
}

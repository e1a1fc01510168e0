use std::result;

use crate::ring::TaskId;

/// Errors reported by the coroutine runtime
///
/// Every variant describes a misuse of the wait/yield protocol, the
/// runtime itself never fails softly: running out of stack memory aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// a coroutine API was called outside `Scheduler::run`
    #[error("no coroutine scheduler is running on this thread")]
    NoScheduler,
    /// `Scheduler::run` was entered while a scheduler is already installed
    #[error("a coroutine scheduler is already running on this thread")]
    AlreadyRunning,
    /// the handle refers to a coroutine that was already reclaimed
    #[error("coroutine {0} was already reclaimed")]
    StaleHandle(TaskId),
    /// a coroutine tried to wait for its own completion
    #[error("a coroutine can't wait on itself")]
    WaitOnSelf,
    /// another coroutine is already waiting on the target
    #[error("coroutine {0} already has a waiter")]
    AlreadyWaited(TaskId),
    /// reclaim was requested before the coroutine finished
    #[error("coroutine {0} has not finished yet")]
    NotFinished(TaskId),
    /// the wait would close a cycle of coroutines waiting on each other
    #[error("deadlock: the wait would close a cycle of waiting coroutines")]
    Deadlock,
}

pub type Result<T> = result::Result<T, Error>;

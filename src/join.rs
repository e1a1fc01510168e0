use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::coroutine_impl::Status;
use crate::error::{Error, Result};
use crate::ring::TaskId;
use crate::scheduler::{with_scheduler, Core};

// the join protocol: `join` suspends until the target finished,
// `reclaim` releases a finished target
impl Core {
    pub(crate) fn join(&self, id: TaskId) -> Result<()> {
        let me = self.current();
        {
            let mut ring = self.ring().borrow_mut();
            let target = ring.get(id).ok_or(Error::StaleHandle(id))?;
            if id == me {
                return Err(Error::WaitOnSelf);
            }
            if target.status == Status::Finished {
                return Ok(());
            }

            // follow the chain of waits starting at the target, reaching
            // the caller means nobody in it could ever be woken
            let mut next = Some(id);
            for _ in 0..ring.len() {
                match next {
                    Some(co) if co == me => {
                        warn!("coroutine {} waiting on {} would deadlock", me, id);
                        return Err(Error::Deadlock);
                    }
                    Some(co) => next = ring.get(co).and_then(|co| co.waiting_on),
                    None => break,
                }
            }

            let target = &mut ring[id];
            if matches!(target.waiter, Some(waiter) if waiter != me) {
                return Err(Error::AlreadyWaited(id));
            }
            target.waiter = Some(me);
            let waiter = &mut ring[me];
            waiter.status = Status::Waiting;
            waiter.waiting_on = Some(id);
        }

        if let Err(err) = self.schedule() {
            // nothing left to run, back out of the wait
            let mut ring = self.ring().borrow_mut();
            let waiter = &mut ring[me];
            waiter.status = Status::Runnable;
            waiter.waiting_on = None;
            if let Some(target) = ring.get_mut(id) {
                target.waiter = None;
            }
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn reclaim(&self, id: TaskId) -> Result<Box<dyn Any>> {
        let mut co = {
            let mut ring = self.ring().borrow_mut();
            match ring.get(id) {
                None => return Err(Error::StaleHandle(id)),
                Some(co) if co.status != Status::Finished => return Err(Error::NotFinished(id)),
                Some(_) => {}
            }
            ring.remove(id).ok_or(Error::StaleHandle(id))?
        };
        trace_lifecycle!("reclaim coroutine {} {:?}", id, co.name);
        co.output.take().ok_or(Error::StaleHandle(id))
    }
}

/// A join handle to a coroutine
///
/// The handle is a plain copyable id. Using it after the coroutine was
/// reclaimed is detected and reported as [`Error::StaleHandle`].
///
/// [`Error::StaleHandle`]: ../enum.Error.html#variant.StaleHandle
pub struct JoinHandle<T> {
    id: TaskId,
    _output: PhantomData<fn() -> T>,
}

impl<T> Clone for JoinHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for JoinHandle<T> {}

impl<T> PartialEq for JoinHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for JoinHandle<T> {}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("JoinHandle").field(&self.id).finish()
    }
}

impl<T: 'static> JoinHandle<T> {
    pub(crate) fn new(id: TaskId) -> Self {
        JoinHandle {
            id,
            _output: PhantomData,
        }
    }

    /// Extracts the id of the underlying coroutine
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Block the current coroutine until the coroutine finishes,
    /// without releasing it.
    pub fn join(&self) -> Result<()> {
        with_scheduler(|core| core.join(self.id))?
    }

    /// Release a finished coroutine and take the value it returned.
    ///
    /// Fails with `NotFinished` instead of blocking.
    pub fn reclaim(self) -> Result<T> {
        let output = with_scheduler(|core| core.reclaim(self.id))??;
        match output.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("coroutine {} output type mismatch", self.id),
        }
    }

    /// Join then reclaim the coroutine, returning the result it produced.
    pub fn wait(self) -> Result<T> {
        self.join()?;
        self.reclaim()
    }

    /// Current status, `StaleHandle` once reclaimed
    pub fn status(&self) -> Result<Status> {
        with_scheduler(|core| core.status(self.id))?.ok_or(Error::StaleHandle(self.id))
    }

    /// if the coroutine already returned from its entry function
    pub fn is_finished(&self) -> Result<bool> {
        self.status().map(|status| status == Status::Finished)
    }
}

/// Wait for a coroutine to finish, release it and return its result.
///
/// Returns at once when the coroutine already finished, otherwise the
/// caller is suspended until the coroutine's entry function returns.
/// A handle can be waited on only once, a second wait reports
/// [`Error::StaleHandle`]. A wait that would close a cycle of coroutines
/// waiting on each other reports [`Error::Deadlock`] instead of blocking.
///
/// [`Error::StaleHandle`]: ../enum.Error.html#variant.StaleHandle
/// [`Error::Deadlock`]: ../enum.Error.html#variant.Deadlock
pub fn wait<T: 'static>(handle: JoinHandle<T>) -> Result<T> {
    handle.wait()
}

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::process;
use std::ptr;

use crate::config::Config;
use crate::context::{self, Continuation};
use crate::coroutine_impl::{trampoline, CoroutineImpl, EntryFn, Status};
use crate::error::{Error, Result};
use crate::ring::{Ring, TaskId};
use crate::stack::Stack;

// the scheduler installed on this thread by `Scheduler::run`
thread_local! { static SCHED: Cell<*const Core> = const { Cell::new(ptr::null()) }; }

/// run `f` against the scheduler installed on this thread
#[inline]
pub(crate) fn with_scheduler<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&Core) -> R,
{
    let sched = SCHED.with(Cell::get);
    if sched.is_null() {
        return Err(Error::NoScheduler);
    }
    // the pointer is only set while `Scheduler::run` borrows the owner
    Ok(f(unsafe { &*sched }))
}

/// uninstalls the scheduler when `run` returns or unwinds
struct Installed;

impl Installed {
    fn enter(core: &Core) -> Result<Installed> {
        SCHED.with(|sched| {
            if !sched.get().is_null() {
                return Err(Error::AlreadyRunning);
            }
            sched.set(core);
            Ok(Installed)
        })
    }
}

impl Drop for Installed {
    fn drop(&mut self) {
        SCHED.with(|sched| sched.set(ptr::null()));
    }
}

enum Transfer {
    Activate(*mut Continuation, *mut u8),
    Resume(*mut Continuation, Continuation),
}

/// the scheduler state shared by every coroutine of one `Scheduler`
///
/// no `RefCell` borrow is ever held across a context transfer
pub(crate) struct Core {
    config: Config,
    ring: RefCell<Ring<CoroutineImpl>>,
    current: Cell<TaskId>,
    main: TaskId,
    // coroutine state lives on this thread only
    _not_send: PhantomData<*const ()>,
}

impl Core {
    fn new(config: Config) -> Core {
        let mut ring = Ring::new();
        let main = ring.insert(CoroutineImpl::main());
        trace_lifecycle!("scheduler init, main coroutine {}", main);
        Core {
            config,
            ring: RefCell::new(ring),
            current: Cell::new(main),
            main,
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn ring(&self) -> &RefCell<Ring<CoroutineImpl>> {
        &self.ring
    }

    /// the coroutine executing right now
    #[inline]
    pub fn current(&self) -> TaskId {
        self.current.get()
    }

    /// register a new coroutine, it first runs when a later yield picks it
    pub fn spawn(&self, name: Option<String>, stack_size: Option<usize>, entry: EntryFn) -> TaskId {
        let size = match stack_size {
            Some(size) if size > 0 => size,
            _ => self.config.get_stack_size(),
        };
        let stack = Stack::new(size);
        let id = self
            .ring
            .borrow_mut()
            .insert(CoroutineImpl::new(name, stack, entry));
        trace_lifecycle!("spawn coroutine {}, stack size={}", id, size);
        id
    }

    /// suspend the current coroutine and run the next eligible one
    ///
    /// returns once the caller is picked again, or at once when the caller
    /// is the only eligible coroutine. Fails with `Deadlock` when nothing
    /// resident is eligible, the caller then simply keeps running.
    pub fn schedule(&self) -> Result<()> {
        let from = self.current.get();
        let to = self.pick_next().ok_or(Error::Deadlock)?;
        unsafe { self.switch(from, to) };
        Ok(())
    }

    // walk at most one lap from the cursor looking for a New/Runnable coroutine
    fn pick_next(&self) -> Option<TaskId> {
        let mut ring = self.ring.borrow_mut();
        for _ in 0..ring.len() {
            let id = ring.advance()?;
            if ring[id].status.is_eligible() {
                return Some(id);
            }
        }
        None
    }

    unsafe fn switch(&self, from: TaskId, to: TaskId) {
        if from == to {
            return;
        }

        let transfer = {
            let mut ring = self.ring.borrow_mut();
            debug_assert!(ring.cursor() == Some(to), "cursor must rest on the current coroutine");
            let save: *mut Continuation = &mut ring[from].continuation;
            let next = &mut ring[to];
            match next.status {
                Status::New => {
                    next.status = Status::Runnable;
                    let top = match &next.stack {
                        Some(stack) => stack.top(),
                        None => unreachable!("coroutine {} has no stack", to),
                    };
                    trace_lifecycle!("activate coroutine {} {:?}", to, next.name);
                    Transfer::Activate(save, top)
                }
                Status::Runnable => Transfer::Resume(save, next.continuation),
                status => unreachable!("switch to coroutine {} in state {:?}", to, status),
            }
        };

        self.current.set(to);
        match transfer {
            Transfer::Activate(save, top) => {
                let arg = self as *const Core as *mut u8;
                context::activate(save, top, trampoline, arg)
            }
            Transfer::Resume(save, target) => context::resume(save, target),
        }
    }

    /// mark `id` finished, store its output and wake its waiter
    pub fn finish(&self, id: TaskId, output: Box<dyn std::any::Any>) {
        let mut ring = self.ring.borrow_mut();
        let co = &mut ring[id];
        co.status = Status::Finished;
        co.output = Some(output);
        trace_lifecycle!("coroutine {} {:?} finished", id, co.name);
        if let Some(waiter) = co.waiter.take() {
            if let Some(waiter) = ring.get_mut(waiter) {
                waiter.status = Status::Runnable;
                waiter.waiting_on = None;
            }
        }
    }

    /// leave a finished coroutine for good
    ///
    /// `join` refuses every wait that would close a cycle, so some waiting
    /// chain always ends in an eligible coroutine
    pub fn exit(&self) -> ! {
        let from = self.current.get();
        match self.pick_next() {
            Some(to) => unsafe { self.switch(from, to) },
            None => error!("no eligible coroutine left after {} finished", from),
        }
        error!("finished coroutine {} was resumed", from);
        process::abort();
    }

    pub fn len(&self) -> usize {
        self.ring.borrow().len()
    }

    pub fn status(&self, id: TaskId) -> Option<Status> {
        self.ring.borrow().get(id).map(|co| co.status)
    }
}

/// A single-threaded cooperative coroutine scheduler
///
/// The scheduler owns every coroutine spawned inside [`run`]. The code
/// passed to [`run`] is itself the *main* coroutine: it takes part in the
/// round-robin like any other coroutine.
///
/// Dropping the scheduler releases every coroutine still resident,
/// finished or not, without running any more of their code.
///
/// ```
/// use co_ring::{coroutine, Scheduler};
///
/// let sched = Scheduler::new();
/// sched
///     .run(|| {
///         let h = co_ring::go!(|| coroutine::yield_now()).unwrap();
///         assert_eq!(sched.len(), 2);
///         coroutine::wait(h).unwrap();
///         assert_eq!(sched.len(), 1);
///     })
///     .unwrap();
/// ```
///
/// [`run`]: #method.run
pub struct Scheduler {
    core: Box<Core>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new()
    }
}

impl Scheduler {
    /// create a scheduler with the default config
    pub fn new() -> Scheduler {
        Scheduler::with_config(Config::new())
    }

    /// create a scheduler with the given config
    pub fn with_config(config: Config) -> Scheduler {
        Scheduler {
            core: Box::new(Core::new(config)),
        }
    }

    /// the config the scheduler was created with
    pub fn config(&self) -> &Config {
        &self.core.config
    }

    /// install the scheduler on this thread and run `f` as the main coroutine
    ///
    /// coroutines still resident when `f` returns stay suspended, a later
    /// `run` continues where this one left off.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`] when a scheduler is already running on this
    /// thread, including from inside one of its coroutines.
    ///
    /// [`Error::AlreadyRunning`]: enum.Error.html#variant.AlreadyRunning
    pub fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        let _installed = Installed::enter(&self.core)?;
        debug_assert_eq!(self.core.current(), self.core.main);
        Ok(f())
    }

    /// number of resident coroutines, the main coroutine included
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// always false, the main coroutine is resident for the scheduler's life
    pub fn is_empty(&self) -> bool {
        self.core.ring.borrow().is_empty()
    }

    /// status of a resident coroutine, `None` once it was reclaimed
    pub fn status(&self, id: TaskId) -> Option<Status> {
        self.core.status(id)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ring = self.core.ring.borrow();
        f.debug_struct("Scheduler")
            .field("current", &self.core.current())
            .field("coroutines", &ring.iter().map(|(id, _)| id).collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let mut released = Vec::new();
        {
            let mut ring = self.core.ring.borrow_mut();
            while let Some((id, co)) = ring.remove_current() {
                trace_lifecycle!("teardown: release coroutine {} {:?} ({:?})", id, co.name, co.status);
                released.push(co);
            }
        }
        // closures of never started coroutines are dropped here, outside the borrow
        drop(released);
    }
}

/// run `f` as the main coroutine of a fresh scheduler, then tear it down
///
/// ```
/// let v = co_ring::run(|| 1 + 1).unwrap();
/// assert_eq!(v, 2);
/// ```
pub fn run<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    Scheduler::new().run(f)
}

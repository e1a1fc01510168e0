use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::process;

use crate::context::Continuation;
use crate::error::Result;
use crate::join::JoinHandle;
use crate::ring::TaskId;
use crate::scheduler::{with_scheduler, Core};
use crate::stack::Stack;

/// /////////////////////////////////////////////////////////////////////////////
/// Coroutine control block
/// /////////////////////////////////////////////////////////////////////////////

/// Scheduling state of a coroutine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// spawned but never scheduled
    New,
    /// eligible to run, including the one running right now
    Runnable,
    /// suspended until the coroutine it waits on finishes
    Waiting,
    /// entry function returned, resources not yet reclaimed
    Finished,
}

impl Status {
    #[inline]
    pub(crate) fn is_eligible(self) -> bool {
        matches!(self, Status::New | Status::Runnable)
    }
}

pub(crate) type EntryFn = Box<dyn FnOnce() -> Box<dyn Any>>;

/// the control block of one coroutine, owned by the scheduler ring
pub(crate) struct CoroutineImpl {
    pub name: Option<String>,
    pub status: Status,
    pub entry: Option<EntryFn>,
    pub output: Option<Box<dyn Any>>,
    // read once by the trampoline when this coroutine finishes
    pub waiter: Option<TaskId>,
    // the coroutine this one is blocked on while `Waiting`
    pub waiting_on: Option<TaskId>,
    pub continuation: Continuation,
    // the main coroutine runs on the host stack and has none
    pub stack: Option<Stack>,
}

impl CoroutineImpl {
    pub fn new(name: Option<String>, stack: Stack, entry: EntryFn) -> Self {
        CoroutineImpl {
            name,
            status: Status::New,
            entry: Some(entry),
            output: None,
            waiter: None,
            waiting_on: None,
            continuation: Continuation::empty(),
            stack: Some(stack),
        }
    }

    /// the coroutine standing for the host control flow
    pub fn main() -> Self {
        CoroutineImpl {
            name: Some("main".to_owned()),
            status: Status::Runnable,
            entry: None,
            output: None,
            waiter: None,
            waiting_on: None,
            continuation: Continuation::empty(),
            stack: None,
        }
    }
}

impl fmt::Debug for CoroutineImpl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CoroutineImpl")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("waiter", &self.waiter)
            .field("waiting_on", &self.waiting_on)
            .field("stack_size", &self.stack.as_ref().map(Stack::size))
            .finish()
    }
}

/// first code that runs on a fresh coroutine stack
///
/// runs the entry function, publishes its output, wakes the waiter and
/// leaves for good, the stack stays abandoned until the coroutine is
/// reclaimed
pub(crate) unsafe extern "C" fn trampoline(arg: *mut u8) -> ! {
    let core = &*(arg as *const Core);
    let id = core.current();
    let entry = core.ring().borrow_mut()[id].entry.take();

    let output = match entry {
        Some(entry) => match panic::catch_unwind(AssertUnwindSafe(entry)) {
            Ok(output) => output,
            Err(_) => {
                let name = core.ring().borrow()[id].name.clone();
                error!("coroutine {} {:?} panicked, abort", id, name);
                process::abort();
            }
        },
        None => unreachable!("coroutine {} activated twice", id),
    };

    core.finish(id, output);
    core.exit()
}

/// /////////////////////////////////////////////////////////////////////////////
/// Coroutine
/// /////////////////////////////////////////////////////////////////////////////

/// A handle describing a coroutine
#[derive(Clone, PartialEq, Eq)]
pub struct Coroutine {
    id: TaskId,
    name: Option<String>,
}

impl Coroutine {
    /// Gets the coroutine id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Gets the coroutine name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(name) = &self.name {
            write!(f, " {:?}", name)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Builder
////////////////////////////////////////////////////////////////////////////////

/// Coroutine factory, which can be used in order to configure the properties of
/// a new coroutine.
///
/// Methods can be chained on it in order to configure it.
///
/// - [`name`]: specifies an associated display name for the coroutine
/// - [`stack_size`]: overrides the scheduler's default stack size
///
/// # Examples
///
/// ```
/// use co_ring::coroutine::{self, Builder};
/// use co_ring::Scheduler;
///
/// let sched = Scheduler::new();
/// let answer = sched.run(|| {
///     let builder = Builder::new().name("worker".to_owned()).stack_size(0x8000);
///     let h = unsafe { builder.spawn(|| 6 * 7) }.unwrap();
///     coroutine::wait(h).unwrap()
/// });
/// assert_eq!(answer, Ok(42));
/// ```
///
/// [`stack_size`]: struct.Builder.html#method.stack_size
/// [`name`]: struct.Builder.html#method.name
#[derive(Default)]
pub struct Builder {
    // A name for the coroutine-to-be, for identification in logs
    name: Option<String>,
    // The size of the stack for the spawned coroutine
    stack_size: Option<usize>,
}

impl Builder {
    /// Generates the base configuration for spawning a coroutine, from which
    /// configuration methods can be chained.
    pub fn new() -> Builder {
        Builder {
            name: None,
            stack_size: None,
        }
    }

    /// Names the coroutine-to-be.
    pub fn name(mut self, name: String) -> Builder {
        self.name = Some(name);
        self
    }

    /// Sets the size of the stack for the new coroutine.
    pub fn stack_size(mut self, size: usize) -> Builder {
        self.stack_size = Some(size);
        self
    }

    /// Registers a new coroutine and returns a join handle for it.
    ///
    /// The coroutine does not start running here, it is appended to the
    /// scheduler ring in the `New` state and first runs when a later
    /// [`yield_now`] or [`wait`] selects it.
    ///
    /// # Errors
    ///
    /// [`Error::NoScheduler`] if called outside [`Scheduler::run`].
    ///
    /// # Safety
    ///
    /// The coroutine stack has a fixed size and no guard page, overflowing
    /// it corrupts memory silently.
    ///
    /// [`yield_now`]: fn.yield_now.html
    /// [`wait`]: fn.wait.html
    /// [`Error::NoScheduler`]: ../enum.Error.html#variant.NoScheduler
    /// [`Scheduler::run`]: ../struct.Scheduler.html#method.run
    pub unsafe fn spawn<F, T>(self, f: F) -> Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + 'static,
        T: 'static,
    {
        let Builder { name, stack_size } = self;
        let entry: EntryFn = Box::new(move || Box::new(f()) as Box<dyn Any>);
        let id = with_scheduler(|core| core.spawn(name, stack_size, entry))?;
        Ok(JoinHandle::new(id))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Free functions
////////////////////////////////////////////////////////////////////////////////

/// Spawns a new named coroutine, returning a [`JoinHandle`] for it.
///
/// This will create a coroutine using the scheduler's default stack size,
/// use [`Builder`] to pick a different one.
///
/// # Safety
///
/// The coroutine stack has a fixed size and no guard page, overflowing it
/// corrupts memory silently. Use the [`go!`] macro to avoid writing the
/// `unsafe` block.
///
/// # Examples
///
/// ```
/// use co_ring::coroutine;
///
/// co_ring::run(|| {
///     let h = unsafe { coroutine::spawn("hello", || println!("hello, coroutine")) }.unwrap();
///     coroutine::wait(h).unwrap();
/// })
/// .unwrap();
/// ```
///
/// [`JoinHandle`]: struct.JoinHandle.html
/// [`Builder`]: struct.Builder.html
/// [`go!`]: ../macro.go.html
pub unsafe fn spawn<F, T>(name: &str, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + 'static,
    T: 'static,
{
    Builder::new().name(name.to_owned()).spawn(f)
}

/// Gets a handle to the coroutine that invokes it.
///
/// Inside [`Scheduler::run`] but outside any spawned coroutine this is the
/// main coroutine.
///
/// [`Scheduler::run`]: ../struct.Scheduler.html#method.run
pub fn current() -> Result<Coroutine> {
    with_scheduler(|core| {
        let id = core.current();
        let name = core.ring().borrow()[id].name.clone();
        Coroutine { id, name }
    })
}

/// if current thread is running a coroutine scheduler
#[inline]
pub fn is_coroutine() -> bool {
    with_scheduler(|_| ()).is_ok()
}

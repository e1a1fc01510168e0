//! Execution context capture and transfer
//!
//! This is the only architecture dependent part of the runtime. It exposes
//! two transfers over an opaque [`Continuation`]:
//!
//! * [`resume`] captures the caller and restores a previously captured
//!   continuation. It returns once some later transfer restores the capture.
//! * [`activate`] captures the caller and starts a function on a fresh stack.
//!   The started function must never return.
//!
//! A capture saves the callee-saved registers on the caller's own stack and
//! records the resulting stack pointer, so a suspended stack must not be
//! touched by anyone until it is resumed.

use std::ptr;

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple")))] {
        mod x86_64;
    } else if #[cfg(all(target_arch = "aarch64", not(windows), not(target_vendor = "apple")))] {
        mod aarch64;
    } else {
        compile_error!("co_ring supports x86_64 and aarch64 ELF targets only");
    }
}

/// A captured execution state, the stack pointer of a suspended context
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Continuation(*mut u8);

impl Continuation {
    /// a continuation that has not captured anything yet
    pub const fn empty() -> Self {
        Continuation(ptr::null_mut())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }
}

/// Function started by [`activate`], receives the opaque argument
pub(crate) type Entry = unsafe extern "C" fn(arg: *mut u8) -> !;

extern "C" {
    fn co_ring_context_resume(save: *mut Continuation, target: Continuation);

    fn co_ring_context_activate(
        save: *mut Continuation,
        stack_top: *mut u8,
        entry: Entry,
        arg: *mut u8,
    );
}

/// Capture the caller into `save` and continue at `target`
///
/// # Safety
///
/// `save` must stay valid for the duration of the capture and `target` must
/// be a continuation captured earlier whose stack is still alive and has not
/// been resumed since.
#[inline]
pub(crate) unsafe fn resume(save: *mut Continuation, target: Continuation) {
    debug_assert!(!target.is_empty(), "resume of an empty continuation");
    co_ring_context_resume(save, target);
}

/// Capture the caller into `save` and call `entry(arg)` on a new stack
///
/// # Safety
///
/// `stack_top` must be the upper end of a writable region that nobody else
/// uses, large enough for `entry`. `entry` must leave by resuming another
/// continuation, never by returning or unwinding.
#[inline]
pub(crate) unsafe fn activate(save: *mut Continuation, stack_top: *mut u8, entry: Entry, arg: *mut u8) {
    co_ring_context_activate(save, stack_top, entry, arg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Stack;
    use std::ptr::addr_of_mut;

    struct Pair {
        host: Continuation,
        guest: Continuation,
        hits: usize,
    }

    unsafe extern "C" fn count_and_return(arg: *mut u8) -> ! {
        let pair = arg as *mut Pair;
        loop {
            (*pair).hits += 1;
            // locals on the guest stack survive a round trip
            let marker = (*pair).hits * 7;
            resume(addr_of_mut!((*pair).guest), (*pair).host);
            assert_eq!(marker, (*pair).hits * 7);
        }
    }

    #[test]
    fn activate_then_resume_round_trip() {
        let stack = Stack::new(0x8000);
        let mut pair = Pair {
            host: Continuation::empty(),
            guest: Continuation::empty(),
            hits: 0,
        };
        let p = addr_of_mut!(pair);
        let host_local = [1u64, 2, 3, 4];

        unsafe {
            activate(addr_of_mut!((*p).host), stack.top(), count_and_return, p as *mut u8);
            assert_eq!((*p).hits, 1);
            assert!(!(*p).guest.is_empty());

            for round in 2..10 {
                resume(addr_of_mut!((*p).host), (*p).guest);
                assert_eq!((*p).hits, round);
            }
        }
        assert_eq!(host_local, [1, 2, 3, 4]);
    }
}

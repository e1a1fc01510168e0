use std::thread;

use crate::scheduler::with_scheduler;

/// Voluntarily give up the CPU to the next eligible coroutine
///
/// returns once the scheduler picks the caller again. Outside a running
/// scheduler this falls back to [`std::thread::yield_now`].
#[inline]
pub fn yield_now() {
    match with_scheduler(|core| core.schedule()) {
        // the caller is eligible itself, so the search always ends
        Ok(res) => debug_assert!(res.is_ok(), "yield from a blocked coroutine"),
        Err(_) => thread::yield_now(),
    }
}

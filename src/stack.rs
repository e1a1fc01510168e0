//! Fixed-size coroutine execution stacks
//!

use std::io;
use std::process;
use std::ptr::{self, NonNull};

/// an anonymous mapping used as one coroutine's stack
///
/// the stack is never resized, the mapping is released on drop
pub(crate) struct Stack {
    base: NonNull<u8>,
    size: usize,
}

fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        4096
    } else {
        size as usize
    }
}

// whole pages holding at least `size` bytes, `None` when that overflows
fn round_to_pages(size: usize, page: usize) -> Option<usize> {
    size.max(page).checked_next_multiple_of(page)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_STACK;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

impl Stack {
    /// map a stack of at least `size` bytes, rounded up to whole pages
    ///
    /// running out of memory here is fatal: the process aborts
    pub fn new(size: usize) -> Stack {
        let size = match round_to_pages(size, page_size()) {
            Some(size) => size,
            None => {
                error!("coroutine stack size {} is too large", size);
                process::abort();
            }
        };

        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                MAP_FLAGS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            error!(
                "failed to map coroutine stack, size={}, err={}",
                size,
                io::Error::last_os_error()
            );
            process::abort();
        }

        match NonNull::new(ptr as *mut u8) {
            Some(base) => Stack { base, size },
            None => process::abort(),
        }
    }

    /// one past the highest usable address, stacks grow down from here
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(self.size) }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        let ret = unsafe { libc::munmap(self.base.as_ptr() as *mut libc::c_void, self.size) };
        if ret != 0 {
            warn!(
                "failed to unmap coroutine stack, err={}",
                io::Error::last_os_error()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_page_rounded() {
        let page = page_size();
        let stack = Stack::new(page + 1);
        assert_eq!(stack.size(), 2 * page);
        assert_eq!(stack.top() as usize % 16, 0);

        let tiny = Stack::new(1);
        assert_eq!(tiny.size(), page);
    }

    #[test]
    fn oversized_request_does_not_wrap() {
        assert_eq!(round_to_pages(usize::MAX, 4096), None);
        assert_eq!(round_to_pages(usize::MAX - 4095, 4096), Some(usize::MAX - 4095));
        assert_eq!(round_to_pages(0, 4096), Some(4096));
        assert_eq!(round_to_pages(4097, 4096), Some(8192));
    }

    #[test]
    fn stack_memory_is_writable() {
        let stack = Stack::new(0x4000);
        unsafe {
            let last = stack.top().sub(1);
            *last = 0xa5;
            *stack.base.as_ptr() = 0x5a;
            assert_eq!(*last, 0xa5);
        }
    }
}

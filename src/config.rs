//! Scheduler configuration
//!

// default stack size in bytes, rounded up to the page size when allocated
pub(crate) const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Configuration for a [`Scheduler`](crate::Scheduler)
///
/// ```
/// use co_ring::{Config, Scheduler};
///
/// let mut config = Config::new();
/// config.set_stack_size(128 * 1024);
/// let sched = Scheduler::with_config(config);
/// assert_eq!(sched.config().get_stack_size(), 128 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// the default configuration
    pub fn new() -> Config {
        Config {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// set default coroutine stack size in bytes
    ///
    /// if you pass 0 to it, will use internal default
    pub fn set_stack_size(&mut self, size: usize) -> &mut Self {
        info!("set stack size={:?}", size);
        self.stack_size = if size == 0 { DEFAULT_STACK_SIZE } else { size };
        self
    }

    /// get the default coroutine stack size
    pub fn get_stack_size(&self) -> usize {
        self.stack_size
    }
}

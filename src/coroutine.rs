//! Coroutine interface: spawn, yield and wait
//!
pub use crate::coroutine_impl::{current, is_coroutine, spawn, Builder, Coroutine, Status};
pub use crate::join::{wait, JoinHandle};
pub use crate::ring::TaskId;
pub use crate::yield_now::yield_now;

//! # Cooperative Stackful Coroutine Runtime
//!
//! `co_ring` multiplexes many coroutines on the thread that runs the
//! scheduler. Every coroutine owns a fixed-size stack and gives up the CPU
//! only at explicit points: [`coroutine::yield_now`], [`coroutine::wait`] on
//! an unfinished coroutine, or returning from its entry function.
//!
//! ## Features
//!
//! * Stackful coroutines switched by a small assembly context transfer
//! * Strict round-robin over a ring of resident coroutines
//! * Join handles returning the coroutine's result
//! * Stale handles, self waits and deadlocks reported as errors
//! * Independent schedulers on independent threads
//!
//! ```
//! use co_ring::{coroutine, go};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! co_ring::run(|| {
//!     let l = log.clone();
//!     let b = go!(move || l.borrow_mut().push("B")).unwrap();
//!     coroutine::wait(b).unwrap();
//!     log.borrow_mut().push("A");
//! })
//! .unwrap();
//! assert_eq!(*log.borrow(), ["B", "A"]);
//! ```

#[macro_use]
extern crate log;

#[macro_use]
mod macros;
mod config;
mod context;
mod coroutine_impl;
mod error;
mod join;
mod ring;
mod scheduler;
mod stack;
mod yield_now;

pub mod coroutine;
pub use config::Config;
pub use error::{Error, Result};
pub use scheduler::{run, Scheduler};

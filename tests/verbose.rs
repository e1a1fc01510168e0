#![cfg(feature = "verbose")]
//! run with `cargo test --features verbose`

#[macro_use]
extern crate co_ring;

use std::sync::Mutex;

use co_ring::coroutine;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Capture(Mutex<Vec<String>>);

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.0.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: Capture = Capture(Mutex::new(Vec::new()));

#[test]
fn lifecycle_events_are_logged() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Debug);

    let sched = co_ring::Scheduler::new();
    sched
        .run(|| {
            let h = go!(coroutine::Builder::new().name("traced".to_owned()), || 3).unwrap();
            assert_eq!(coroutine::wait(h), Ok(3));
            // left behind for the teardown
            go!(|| ()).unwrap();
        })
        .unwrap();
    drop(sched);

    let lines = LOGGER.0.lock().unwrap();
    for event in ["scheduler init", "spawn coroutine", "activate coroutine", "finished", "reclaim coroutine", "teardown"] {
        assert!(
            lines.iter().any(|line| line.contains(event)),
            "no {:?} event in {:?}",
            event,
            *lines
        );
    }
}

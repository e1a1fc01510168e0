/// log a scheduler lifecycle event, compiled in with the `verbose` feature
macro_rules! trace_lifecycle {
    ($($arg:tt)*) => {
        if cfg!(feature = "verbose") {
            debug!($($arg)*);
        }
    };
}

/// macro used to spawn a coroutine
///
/// this macro is just a convenient wrapper for [`spawn`].
/// However the supplied coroutine block is not wrapped in `unsafe` block
///
/// ```
/// use co_ring::{coroutine, go};
///
/// co_ring::run(|| {
///     let a = go!(|| 1).unwrap();
///     let b = go!(coroutine::Builder::new().name("b".to_owned()), || 2).unwrap();
///     assert_eq!(coroutine::wait(a).unwrap() + coroutine::wait(b).unwrap(), 3);
/// })
/// .unwrap();
/// ```
///
/// [`spawn`]: coroutine/struct.Builder.html#method.spawn
#[macro_export]
macro_rules! go {
    // for free spawn
    ($func:expr) => {{
        fn _go_check<F, T>(f: F) -> F
        where
            F: FnOnce() -> T + 'static,
            T: 'static,
        {
            f
        }
        let f = _go_check($func);
        unsafe { $crate::coroutine::Builder::new().spawn(f) }
    }};

    // for builder spawn
    ($builder:expr, $func:expr) => {{
        fn _go_check<F, T>(f: F) -> F
        where
            F: FnOnce() -> T + 'static,
            T: 'static,
        {
            f
        }
        let f = _go_check($func);
        unsafe { $builder.spawn(f) }
    }};
}

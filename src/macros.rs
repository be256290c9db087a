//! Crate-internal logging shims.
//!
//! With the `log` feature these forward to the [`log`](https://docs.rs/log) facade
//! under the `tourney` target; without it they type-check their arguments and
//! compile to nothing.

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        macro_rules! alloc_trace {
            ($($arg:tt)+) => {
                ::log::trace!(target: "tourney", $($arg)+)
            };
        }

        macro_rules! alloc_debug {
            ($($arg:tt)+) => {
                ::log::debug!(target: "tourney", $($arg)+)
            };
        }
    } else {
        macro_rules! alloc_trace {
            ($($arg:tt)+) => {
                if false {
                    let _ = ::core::format_args!($($arg)+);
                }
            };
        }

        macro_rules! alloc_debug {
            ($($arg:tt)+) => {
                if false {
                    let _ = ::core::format_args!($($arg)+);
                }
            };
        }
    }
}

#![deny(missing_docs)]
//! Shared logging utilities for the dashboard workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line is tagged
//! with the poll cycle of the calling thread so that overlapping fetch cycles
//! can be told apart in the log. Work handed to another thread carries its
//! cycle along through [`in_poll_cycle`].

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

#[doc(hidden)]
pub use log;

thread_local! {
    /// Poll cycle currently being processed on this thread.
    static POLL_CYCLE: Cell<u64> = const { Cell::new(0) };
}

/// Records the poll cycle for the current thread.
/// The app loop calls this each time it handles a poll tick.
pub fn set_poll_cycle(cycle: u64) {
    POLL_CYCLE.with(|v| v.set(cycle));
}

/// Returns the poll cycle for the current thread, 0 before the first tick.
pub fn poll_cycle() -> u64 {
    POLL_CYCLE.with(|v| v.get())
}

/// Future that runs with a fixed poll cycle on whichever thread polls it.
#[derive(Debug)]
pub struct InPollCycle<F> {
    cycle: u64,
    inner: F,
}

/// Tags every log line emitted while `future` is polled with `cycle`. The
/// polling thread's own cycle is restored after each poll.
pub fn in_poll_cycle<F>(cycle: u64, future: F) -> InPollCycle<F>
where
    F: Future + Unpin,
{
    InPollCycle {
        cycle,
        inner: future,
    }
}

impl<F: Future + Unpin> Future for InPollCycle<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let previous = POLL_CYCLE.with(|v| v.replace(this.cycle));
        let output = Pin::new(&mut this.inner).poll(cx);
        POLL_CYCLE.with(|v| v.set(previous));
        output
    }
}

/// Logs a trace-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may already own the global logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

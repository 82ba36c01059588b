//! Log capture for unit tests.
//!
//! Records are kept per thread, so parallel tests only see their own output.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let line = record.args().to_string();
        CAPTURED.with(|captured| captured.borrow_mut().push((record.level(), line)));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Run `f` and return what it logged at `level`.
pub(crate) fn capture<T>(level: Level, f: impl FnOnce() -> T) -> (T, Vec<String>) {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    CAPTURED.with(|captured| captured.borrow_mut().clear());
    let result = f();
    let lines = CAPTURED.with(|captured| {
        captured
            .borrow_mut()
            .drain(..)
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line)
            .collect()
    });
    (result, lines)
}

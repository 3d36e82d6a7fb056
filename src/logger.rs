use log::{Level, Log, Metadata, Record};

use crate::error::scrub_error_message;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console logger (idempotent) and set the level. Safe to call
/// again when the page reconfigures the worker.
pub fn init(level: Level) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level.to_level_filter());
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Log lines end up in the page console; never let key material through.
        let message = scrub_error_message(&format!("[{}] {}", record.level(), record.args()));
        match record.level() {
            Level::Error => console::error(&message),
            Level::Warn => console::warn(&message),
            _ => console::log(&message),
        }
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
mod console {
    use wasm_bindgen::JsValue;

    pub fn log(s: &str) {
        web_sys::console::log_1(&JsValue::from_str(s));
    }

    pub fn warn(s: &str) {
        web_sys::console::warn_1(&JsValue::from_str(s));
    }

    pub fn error(s: &str) {
        web_sys::console::error_1(&JsValue::from_str(s));
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod console {
    pub fn log(s: &str) {
        println!("{s}");
    }

    pub fn warn(s: &str) {
        eprintln!("{s}");
    }

    pub fn error(s: &str) {
        eprintln!("{s}");
    }
}

//! Helper utilities.

use std::sync::Once;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use web_time::{SystemTime, UNIX_EPOCH};

/// Initialize [`log`] logging, if not already initialized. Logs go to the worker console on wasm
/// and to stderr natively.
pub fn init_logging(level: log::LevelFilter) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        #[cfg(target_arch = "wasm32")]
        {
            fn hook(info: &std::panic::PanicInfo) {
                worker::console_error!("{}", info);
            }
            std::panic::set_hook(Box::new(hook));
        }

        struct Logger;
        static LOGGER: Logger = Logger;
        impl log::Log for Logger {
            fn enabled(&self, metadata: &log::Metadata) -> bool {
                metadata.level() <= log::max_level()
            }

            fn log(&self, record: &log::Record) {
                if !self.enabled(record.metadata()) {
                    return;
                }
                let line = format!(
                    "[{} {}] {}",
                    record.level(),
                    record.module_path().unwrap_or("?"),
                    record.args()
                );
                write_line(record.level(), line);
            }

            fn flush(&self) {}
        }
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
        log::info!("logger set ({})", level);
    });
}

#[cfg(target_arch = "wasm32")]
fn write_line(level: log::Level, line: String) {
    use web_sys::console;
    let method = match level {
        log::Level::Error => console::error_1,
        log::Level::Warn => console::warn_1,
        log::Level::Info => console::info_1,
        log::Level::Debug => console::debug_1,
        log::Level::Trace => console::trace_1,
    };
    (method)(&line.into());
}

#[cfg(not(target_arch = "wasm32"))]
fn write_line(_level: log::Level, line: String) {
    eprintln!("{}", line);
}

/// Wall clock via [`web_time`]; [`Utc::now`] is unavailable on wasm.
fn now() -> DateTime<Utc> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    DateTime::from_timestamp(elapsed.as_secs() as i64, elapsed.subsec_nanos()).unwrap_or_default()
}

/// Current UTC date.
pub fn today_utc() -> NaiveDate {
    now().date_naive()
}

/// Current UTC time, RFC 3339.
pub fn now_rfc3339() -> String {
    now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// A tiny logger for the `log` crate. Messages go to stderr, prefixed with a
// timestamp, the level and the source location. Filtering is left entirely to
// `log::set_max_level`.

use std::{
    path::{Path, PathBuf},
    sync::{LazyLock, OnceLock},
};

use {jiff::tz::TimeZone, log::Log};

use crate::style::Theme;

/// A logger that writes every record it receives to stderr.
#[derive(Debug)]
pub struct Logger {
    tz: OnceLock<TimeZone>,
}

impl Logger {
    /// Create a new logger and install it as the global logger.
    ///
    /// Until `Logger::set_time_zone` is called, timestamps are printed in
    /// UTC.
    pub fn init() -> Result<&'static Logger, log::SetLoggerError> {
        let logger = Box::leak(Box::new(Logger { tz: OnceLock::new() }));
        log::set_logger(logger)?;
        Ok(logger)
    }

    /// Render timestamps in the given time zone from now on.
    ///
    /// Only the first call has any effect.
    pub fn set_time_zone(&self, tz: TimeZone) {
        if self.tz.set(tz).is_err() {
            log::debug!("logger time zone was already set, ignoring");
        }
    }
}

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        // Not `Zoned::now()`, since finding the system time zone can log,
        // and logging from inside the logger would recurse.
        let ts = jiff::Timestamp::now();
        let now = match self.tz.get() {
            Some(tz) => ts.to_zoned(tz.clone()).to_string(),
            None => ts.to_string(),
        };
        let now = Theme::stderr().highlight(now);
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => {
                eprintln!(
                    "{now}|{level}|{file}:{line}: {args}",
                    level = record.level(),
                    file = relative(file),
                    args = record.args(),
                );
            }
            (Some(file), None) => {
                eprintln!(
                    "{now}|{level}|{file}: {args}",
                    level = record.level(),
                    file = relative(file),
                    args = record.args(),
                );
            }
            _ => {
                eprintln!("{now}|{}: {}", record.level(), record.args());
            }
        }
    }

    fn flush(&self) {}
}

fn relative(path: &str) -> &str {
    let Some(cwd) = cwd() else { return path };
    let Ok(relative) = Path::new(path).strip_prefix(cwd) else { return path };
    relative.to_str().unwrap_or(path)
}

fn cwd() -> Option<&'static Path> {
    static CWD: LazyLock<Option<PathBuf>> =
        LazyLock::new(|| std::env::current_dir().ok());
    CWD.as_deref()
}

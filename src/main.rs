use std::{env, io::Write, process::ExitCode, sync::LazyLock};

use {
    anyhow::Context,
    jiff::{Timestamp, Zoned, tz::TimeZone},
};

mod args;
mod calendar;
mod chunk;
mod cmd;
mod datetime;
mod generator;
mod kind;
mod logger;
mod materialize;
mod parse;
mod schedule;
mod style;
mod timetable;

static TZ: LazyLock<TimeZone> = LazyLock::new(TimeZone::system);

static NOW: LazyLock<Zoned> = LazyLock::new(|| {
    let ts = match read_env_timetable_now() {
        Ok(Some(ts)) => {
            log::trace!(
                "setting current time to `{ts}` from `TIMETABLE_NOW` \
                 environment variable",
            );
            ts
        }
        Ok(None) => {
            let now = Timestamp::now();
            log::trace!(
                "`TIMETABLE_NOW` environment variable not set, using \
                 current time `{now}`",
            );
            now
        }
        Err(err) => {
            let now = Timestamp::now();
            log::warn!(
                "reading `TIMETABLE_NOW` failed, using current time \
                 `{now}`: {err:#}",
            );
            now
        }
    };
    ts.to_zoned(TZ.clone())
});

fn main() -> ExitCode {
    let err = match run() {
        Ok(code) => return code,
        Err(err) => err,
    };
    for cause in err.chain() {
        if let Some(help) = cause.downcast_ref::<args::Help>() {
            // Nothing sensible to do if stdout is gone.
            let _ = writeln!(&mut std::io::stdout(), "{help}");
            return ExitCode::SUCCESS;
        }
        if let Some(version) = cause.downcast_ref::<args::Version>() {
            let _ = writeln!(&mut std::io::stdout(), "{version}");
            return ExitCode::SUCCESS;
        }
    }
    // Look for a broken pipe error. In this case, we generally want
    // to exit "gracefully" with a success exit code. This matches
    // existing Unix convention. We need to handle this explicitly
    // since the Rust runtime doesn't ask for PIPE signals, and thus
    // we get an I/O error instead.
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<std::io::Error>() {
            if err.kind() == std::io::ErrorKind::BrokenPipe {
                return ExitCode::from(0);
            }
        }
        // `serde_json` wraps any `std::io::Error` it hits while writing.
        if let Some(err) = cause.downcast_ref::<serde_json::Error>() {
            if err.io_error_kind() == Some(std::io::ErrorKind::BrokenPipe) {
                return ExitCode::from(0);
            }
        }
    }
    let _ = if std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1")
        && std::env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        writeln!(&mut std::io::stderr(), "{:?}", err)
    } else {
        writeln!(&mut std::io::stderr(), "{:#}", err)
    };
    ExitCode::from(1)
}

fn run() -> anyhow::Result<ExitCode> {
    let rustlog = env::var("TIMETABLE_LOG").unwrap_or_else(|_| String::new());
    let level = match &*rustlog {
        "" | "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        unk => anyhow::bail!("unrecognized log level '{}'", unk),
    };
    log::set_max_level(level);
    // `TimeZone::system()` logs, so the logger has to exist before the time
    // zone is known. Early messages are therefore stamped in UTC.
    let logger = logger::Logger::init()?;
    logger.set_time_zone(TZ.clone());
    cmd::run(&mut lexopt::Parser::from_env())?;
    Ok(ExitCode::SUCCESS)
}

fn read_env_timetable_now() -> anyhow::Result<Option<Timestamp>> {
    let Some(val) = std::env::var_os("TIMETABLE_NOW") else {
        return Ok(None);
    };
    let Some(val) = val.to_str() else {
        anyhow::bail!(
            "`TIMETABLE_NOW` environment variable is not valid UTF-8: {val:?}"
        )
    };
    val.parse::<Timestamp>()
        .context(
            "`TIMETABLE_NOW` environment variable is not a valid \
             RFC 3339 timestamp",
        )
        .map(Some)
}

//! Chatter-aware logging setup.
//!
//! The library itself only logs through the `log` facade. Tools call
//! [`init`] once at startup to install an `env_logger` backend whose verbosity
//! follows the chatter level in [`Settings`].

use std::io::Write;

use log::{Level, LevelFilter};

use crate::config::Settings;

/// Maximum log level for a chatter setting. Debug mode shows everything.
pub fn level_for(settings: &Settings) -> LevelFilter {
    if settings.debug() {
        return LevelFilter::Trace;
    }
    match settings.chatter() {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn tag(level: Level) -> &'static str {
    match level {
        Level::Error => "Error: ",
        Level::Warn => "Warning: ",
        Level::Info => "",
        Level::Debug | Level::Trace => "Debug: ",
    }
}

/// Logger builder for `settings`, not yet installed. `RUST_LOG` takes
/// precedence over the chatter level.
pub fn builder(settings: &Settings) -> env_logger::Builder {
    let exec = settings.exec_name().to_string();
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for(settings))
        .parse_default_env()
        .format(move |buf, record| {
            if exec.is_empty() {
                writeln!(buf, "{}{}", tag(record.level()), record.args())
            } else {
                writeln!(buf, "{}: {}{}", exec, tag(record.level()), record.args())
            }
        });
    builder
}

/// Install the logger. Fails if a logger is already installed.
pub fn init(settings: &Settings) -> Result<(), log::SetLoggerError> {
    builder(settings).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chatter_levels() {
        let at = |c| level_for(&Settings::builder().chatter(c).build());
        assert_eq!(at(0), LevelFilter::Error);
        assert_eq!(at(1), LevelFilter::Warn);
        assert_eq!(at(2), LevelFilter::Info);
        assert_eq!(at(3), LevelFilter::Debug);
        assert_eq!(at(5), LevelFilter::Trace);
    }

    #[test]
    fn debug_forces_trace() {
        let s = Settings::builder().chatter(0).debug(true).build();
        assert_eq!(level_for(&s), LevelFilter::Trace);
    }

    #[test]
    fn severity_tags() {
        assert_eq!(tag(Level::Warn), "Warning: ");
        assert_eq!(tag(Level::Info), "");
        assert_eq!(tag(Level::Trace), "Debug: ");
    }
}

//!
//! Logger initialization and logging macros.
//!
//! The macros forward to the `log` facade so that every crate in the
//! workspace logs through `cat_core::{trace, debug, info, warn, error}`.
//!

mod appender;
mod consts;
mod logger;

pub use consts::*;
pub use logger::LogError;

use appender::AppenderSpec;
use log::LevelFilter;
use log4rs::{Config, config::Root};
use logger::Builder as LoggersBuilder;
use std::iter::once;

#[doc(hidden)]
pub use log as __log;

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => ($crate::log::__log::trace!($($t)*));
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => ($crate::log::__log::debug!($($t)*));
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => ($crate::log::__log::info!($($t)*));
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => ($crate::log::__log::warn!($($t)*));
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => ($crate::log::__log::error!($($t)*));
}

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Installs the global logger. `filters` follows the `RUST_LOG` syntax and is
/// applied on top of the `RUST_LOG` environment variable. When `log_dir` is
/// provided, rolling log files (all levels, and warnings and above) are written
/// there as well.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let mut stdout_appender = AppenderSpec::console(CONSOLE_APPENDER, None);
    let mut file_appender = log_dir.map(|dir| AppenderSpec::roller(LOG_FILE_APPENDER, None, dir, LOG_FILE_NAME)).transpose()?;
    let mut err_file_appender = log_dir
        .map(|dir| AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), dir, ERR_LOG_FILE_NAME))
        .transpose()?;

    let appender_names =
        once(&stdout_appender).chain(file_appender.as_ref()).chain(err_file_appender.as_ref()).map(|x| x.name).collect::<Vec<_>>();

    let loggers = LoggersBuilder::new()
        .root_level(LevelFilter::Info)
        .appenders(appender_names.iter().copied())
        .parse_env(DEFAULT_LOGGER_ENV)
        .parse_expression(filters)
        .build();

    let appenders = once(stdout_appender.appender())
        .chain(once(file_appender.as_mut().and_then(|x| x.appender())))
        .chain(once(err_file_appender.as_mut().and_then(|x| x.appender())))
        .flatten();

    let config = Config::builder()
        .appenders(appenders)
        .loggers(loggers.items())
        .build(Root::builder().appenders(appender_names.iter().map(|x| x.to_string())).build(loggers.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| LogError::Config(err.to_string()))?;

    for rejected in loggers.rejected() {
        log::warn!("ignoring invalid logging spec: {rejected}");
    }
    Ok(())
}

use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::BTreeMap, env, mem, str::FromStr};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("logger spec parsing error: {0}")]
    ParseLoggerSpec(String),

    #[error("log appender error: {0}")]
    AppenderError(String),

    #[error("log configuration error: {0}")]
    Config(String),
}

/// A named logger (usually a crate or module path) and its level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct LoggerSpec {
    pub name: String,
    pub level: LevelFilter,
}

impl LoggerSpec {
    pub fn logger(&self, appenders: &[&'static str]) -> Logger {
        Logger::builder().appenders(appenders.iter().map(|x| x.to_string())).additive(false).build(self.name.clone(), self.level)
    }
}

pub(super) struct Loggers {
    loggers: Vec<LoggerSpec>,
    appenders: Vec<&'static str>,
    root_level: LevelFilter,
    rejected: Vec<LogError>,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn items(&self) -> impl Iterator<Item = Logger> + '_ {
        self.loggers.iter().map(|x| x.logger(&self.appenders))
    }

    /// Spec fragments that could not be parsed and were skipped.
    pub fn rejected(&self) -> &[LogError] {
        &self.rejected
    }

    #[cfg(test)]
    pub fn level_of(&self, name: &str) -> Option<LevelFilter> {
        self.loggers.iter().find(|x| x.name == name).map(|x| x.level)
    }
}

/// Builds logger specs out of `RUST_LOG`-like expressions such as
/// `info,cat_wallet_core=debug,cat_covenants=trace`.
pub(super) struct Builder {
    appenders: Vec<&'static str>,
    loggers: BTreeMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
    rejected: Vec<LogError>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { appenders: vec![], loggers: BTreeMap::new(), root_level: None, rejected: vec![] }
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
            match Self::parse_spec(spec) {
                Ok((None, level)) => {
                    self.root_level = Some(level);
                }
                Ok((Some(name), level)) => {
                    self.loggers.insert(name.to_string(), level);
                }
                Err(err) => self.rejected.push(err),
            }
        }
        self
    }

    fn parse_spec(spec: &str) -> Result<(Option<&str>, LevelFilter), LogError> {
        let mut parts = spec.split('=').map(|x| x.trim());
        match (parts.next(), parts.next(), parts.next()) {
            // a lone level defines the root level, a lone name enables everything for that target
            (Some(part0), None, None) => match part0.parse() {
                Ok(level) => Ok((None, level)),
                Err(_) => Ok((Some(part0), LevelFilter::max())),
            },
            (Some(part0), Some(""), None) => Ok((Some(part0), LevelFilter::max())),
            (Some(part0), Some(part1), None) => {
                let level = part1.parse().map_err(|_| LogError::ParseLoggerSpec(part1.to_string()))?;
                Ok((Some(part0), level))
            }
            _ => Err(LogError::ParseLoggerSpec(spec.to_string())),
        }
    }

    pub fn appenders(&mut self, appenders: impl Iterator<Item = &'static str>) -> &mut Self {
        self.appenders = appenders.collect();
        self
    }

    pub fn root_level(&mut self, root_level: LevelFilter) -> &mut Self {
        self.root_level.replace(root_level);
        self
    }

    pub fn build(&mut self) -> Loggers {
        let loggers = mem::take(&mut self.loggers).into_iter().map(|(name, level)| LoggerSpec { name, level }).collect();
        Loggers {
            loggers,
            appenders: mem::take(&mut self.appenders),
            root_level: self.root_level.take().unwrap_or(LevelFilter::Error),
            rejected: mem::take(&mut self.rejected),
        }
    }
}

impl FromStr for Builder {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut builder = Self::new();
        builder.parse_expression(s);
        Ok(builder)
    }
}

//! Verbosity gate over the `log` facade.
//!
//! The host decides where records go; this module only decides which ones
//! are emitted at all, based on the four-level setting operators pick.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Target attached to every record this crate emits.
pub const LOG_TARGET: &str = "deadline";

/// Operator-facing verbosity, ordered from quietest to loudest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Nothing is logged.
    Silent = 0,
    /// Errors only.
    Error = 1,
    /// Errors and deadline changes.
    #[default]
    Important = 2,
    /// Everything, including per-task traces.
    Debug = 3,
}

impl LogLevel {
    /// Whether a message of `message_level` passes this gate.
    pub fn allows(self, message_level: LogLevel) -> bool {
        message_level != LogLevel::Silent && message_level <= self
    }

    fn as_log_level(self) -> Option<log::Level> {
        match self {
            LogLevel::Silent => None,
            LogLevel::Error => Some(log::Level::Error),
            LogLevel::Important => Some(log::Level::Info),
            LogLevel::Debug => Some(log::Level::Debug),
        }
    }
}

/// Emits records through `log` when the configured level allows them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
    level: LogLevel,
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, message_level: LogLevel) -> bool {
        self.level.allows(message_level)
    }

    pub fn log(&self, message_level: LogLevel, args: fmt::Arguments<'_>) {
        if !self.enabled(message_level) {
            return;
        }
        if let Some(level) = message_level.as_log_level() {
            log::log!(target: LOG_TARGET, level, "{}", args);
        }
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }

    pub fn important(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Important, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }
}

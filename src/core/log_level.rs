//! Log level definitions
//!
//! Levels are ordered by severity: a lower numeric value is more severe and
//! is always shown before quieter levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    /// Numeric severity, `error=0 < warn=1 < info=2 < debug=3`
    #[inline]
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    /// Returns true when `level` is at least as severe as `configured`
    ///
    /// # Example
    ///
    /// ```
    /// use log_pipeline::LogLevel;
    ///
    /// assert!(LogLevel::should_log(LogLevel::Error, LogLevel::Info));
    /// assert!(!LogLevel::should_log(LogLevel::Debug, LogLevel::Info));
    /// ```
    #[inline]
    pub fn should_log(level: LogLevel, configured: LogLevel) -> bool {
        level.severity() <= configured.severity()
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Upper-case label used by human-oriented console output
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Error => Red,
            LogLevel::Warn => Yellow,
            LogLevel::Info => Green,
            LogLevel::Debug => Blue,
        }
    }

    /// Whether console output for this level belongs on stderr
    pub fn is_stderr(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Warn)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

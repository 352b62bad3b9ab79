//! Log entry structure

use super::log_context::{FieldValue, LogContext};
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Keys owned by the entry itself; metadata can never shadow them
pub const RESERVED_KEYS: [&str; 3] = ["timestamp", "level", "message"];

/// A single log record
///
/// Built once per log call and never mutated after it is handed to the
/// transports. Transports derive their own optimised copies.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub fields: LogContext,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            timestamp: Utc::now(),
            level,
            message: Self::sanitize_message(&message),
            fields: LogContext::new(),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: LogContext) -> Self {
        for key in RESERVED_KEYS {
            if fields.contains_key(key) {
                eprintln!(
                    "[LOGGER WARNING] Metadata key '{}' is reserved and was ignored",
                    key
                );
            }
        }
        self.fields = fields;
        for key in RESERVED_KEYS {
            self.fields.remove(key);
        }
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// ISO-8601 timestamp with millisecond precision
    pub fn timestamp_iso(&self) -> String {
        TimestampFormat::Iso8601.format(&self.timestamp)
    }

    /// Flat JSON object: `timestamp`, `level`, `message`, then metadata
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.fields.len() + 3);
        map.insert("timestamp".into(), self.timestamp_iso().into());
        map.insert("level".into(), self.level.to_str().into());
        map.insert("message".into(), self.message.clone().into());
        for (key, value) in self.fields.iter() {
            map.insert(key.clone(), value.to_json_value());
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

//! Per-sink entry optimisation
//!
//! Every size-sensitive sink derives its own copy of an entry. In minimal
//! scope only correlation-critical fields survive; stack traces are kept only
//! in full scope or in development.

use crate::core::{FieldValue, LogEntry};
use serde_json::{Map, Value};

/// Fields kept in minimal scope, besides timestamp, level and message
pub const ESSENTIAL_FIELDS: [&str; 16] = [
    "component",
    "requestId",
    "request_id",
    "userId",
    "user_id",
    "traceId",
    "trace_id",
    "spanId",
    "correlationId",
    "sessionId",
    "error",
    "errorCode",
    "statusCode",
    "method",
    "url",
    "duration",
];

const STACK_KEYS: [&str; 2] = ["stack", "stackTrace"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub minimal: bool,
    pub include_stack: bool,
}

impl OptimizeOptions {
    /// Options for file and HTTP sinks
    pub fn for_scope(minimal: bool, development: bool) -> Self {
        Self {
            minimal,
            include_stack: !minimal || development,
        }
    }

    /// Alert sinks never carry stack traces
    pub fn alert(minimal: bool) -> Self {
        Self {
            minimal,
            include_stack: false,
        }
    }
}

/// Derive the JSON document a sink should ship for `entry`
///
/// The result under `minimal = true` never holds a key the
/// `minimal = false` result lacks.
pub fn optimize_entry(entry: &LogEntry, options: OptimizeOptions) -> Value {
    let mut map = Map::new();
    map.insert("timestamp".into(), entry.timestamp_iso().into());
    map.insert("level".into(), entry.level.to_str().into());
    map.insert("message".into(), entry.message.clone().into());

    for (key, value) in entry.fields.iter() {
        if STACK_KEYS.contains(&key.as_str()) {
            if options.include_stack {
                map.insert(key.clone(), value.to_json_value());
            }
            continue;
        }
        if options.minimal && !ESSENTIAL_FIELDS.contains(&key.as_str()) {
            continue;
        }
        map.insert(key.clone(), shape_value(key, value, options));
    }
    Value::Object(map)
}

/// Nested error objects get the same stack and scope treatment as the top level
fn shape_value(key: &str, value: &FieldValue, options: OptimizeOptions) -> Value {
    match (key, value) {
        ("error", FieldValue::Map(inner)) => {
            let mut out = Map::new();
            for (k, v) in inner {
                if STACK_KEYS.contains(&k.as_str()) && !options.include_stack {
                    continue;
                }
                if options.minimal
                    && !matches!(k.as_str(), "message" | "code" | "name")
                    && !STACK_KEYS.contains(&k.as_str())
                {
                    continue;
                }
                out.insert(k.clone(), v.to_json_value());
            }
            Value::Object(out)
        }
        _ => value.to_json_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogContext, LogLevel};

    fn sample() -> LogEntry {
        let error = LogContext::new()
            .with_field("message", "connection refused")
            .with_field("code", "ECONNREFUSED")
            .with_field("stack", "at connect (db.rs:10)")
            .with_field("host", "10.0.0.1");
        LogEntry::new(LogLevel::Error, "DB down").with_fields(
            LogContext::new()
                .with_field("component", "db")
                .with_field("requestId", "req-1")
                .with_field("poolSize", 10)
                .with_field("stack", "at main (main.rs:1)")
                .with_field("error", error),
        )
    }

    fn keys(value: &Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_full_scope_keeps_everything() {
        let full = optimize_entry(&sample(), OptimizeOptions::for_scope(false, false));
        assert_eq!(full["poolSize"], 10);
        assert_eq!(full["stack"], "at main (main.rs:1)");
        assert_eq!(full["error"]["host"], "10.0.0.1");
    }

    #[test]
    fn test_minimal_scope_keeps_essentials_only() {
        let minimal = optimize_entry(&sample(), OptimizeOptions::for_scope(true, false));
        assert_eq!(minimal["component"], "db");
        assert_eq!(minimal["requestId"], "req-1");
        assert!(minimal.get("poolSize").is_none());
        assert!(minimal.get("stack").is_none());
        assert!(minimal["error"].get("stack").is_none());
        assert!(minimal["error"].get("host").is_none());
        assert_eq!(minimal["error"]["code"], "ECONNREFUSED");
    }

    #[test]
    fn test_minimal_is_subset_of_full() {
        let full = optimize_entry(&sample(), OptimizeOptions::for_scope(false, false));
        let minimal = optimize_entry(&sample(), OptimizeOptions::for_scope(true, false));
        let full_keys = keys(&full);
        for key in keys(&minimal) {
            assert!(full_keys.contains(&key), "{} missing from full", key);
        }
        assert!(keys(&minimal).len() < full_keys.len());
    }

    #[test]
    fn test_development_keeps_stack_in_minimal() {
        let minimal_dev = optimize_entry(&sample(), OptimizeOptions::for_scope(true, true));
        assert_eq!(minimal_dev["stack"], "at main (main.rs:1)");
        assert!(minimal_dev["error"].get("stack").is_some());
        assert!(minimal_dev.get("poolSize").is_none());
    }

    #[test]
    fn test_alert_options_never_carry_stack() {
        let alert = optimize_entry(&sample(), OptimizeOptions::alert(false));
        assert!(alert.get("stack").is_none());
        assert!(alert["error"].get("stack").is_none());
        assert_eq!(alert["error"]["host"], "10.0.0.1");
    }
}

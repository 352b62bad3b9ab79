//! Console rendering modes
//!
//! - Minimal: short human line, only errors, warnings and lifecycle events
//! - Pretty: header line plus an indented JSON block of the metadata
//! - Standard: single line with a compact JSON tail

use super::log_entry::LogEntry;
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use colored::Colorize;
use std::str::FromStr;

/// Message keywords that mark an info/debug entry as worth showing in minimal mode
pub const IMPORTANT_KEYWORDS: [&str; 12] = [
    "start",
    "started",
    "listening",
    "ready",
    "shutdown",
    "shutting down",
    "stopped",
    "connected",
    "disconnected",
    "migrat",
    "initialized",
    "deployed",
];

/// Components whose info entries are always shown in minimal mode
pub const IMPORTANT_COMPONENTS: [&str; 5] = ["server", "startup", "database", "app", "lifecycle"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleFormat {
    /// `10:30:45 ERROR DB down (db)`
    Minimal,

    /// `[2025-01-08 10:30:45.123] ERROR DB down` followed by pretty JSON metadata
    Pretty,

    /// `[2025-01-08 10:30:45.123] ERROR DB down {"component":"db"}`
    #[default]
    Standard,
}

impl FromStr for ConsoleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minimal" => Ok(ConsoleFormat::Minimal),
            "pretty" => Ok(ConsoleFormat::Pretty),
            "standard" | "json" => Ok(ConsoleFormat::Standard),
            _ => Err(format!("Invalid console format: '{}'", s)),
        }
    }
}

impl ConsoleFormat {
    /// Render an entry, or `None` when minimal mode filters it out
    pub fn format(&self, entry: &LogEntry, use_colors: bool) -> Option<String> {
        match self {
            ConsoleFormat::Minimal => {
                Self::is_important(entry).then(|| Self::format_minimal(entry, use_colors))
            }
            ConsoleFormat::Pretty => Some(Self::format_pretty(entry, use_colors)),
            ConsoleFormat::Standard => Some(Self::format_standard(entry, use_colors)),
        }
    }

    /// Minimal mode keeps errors, warnings and lifecycle events
    pub fn is_important(entry: &LogEntry) -> bool {
        if matches!(entry.level, LogLevel::Error | LogLevel::Warn) {
            return true;
        }
        let component_listed = entry
            .field("component")
            .and_then(|v| v.as_str())
            .map(|c| IMPORTANT_COMPONENTS.contains(&c.to_lowercase().as_str()))
            .unwrap_or(false);
        if component_listed {
            return true;
        }
        let message = entry.message.to_lowercase();
        IMPORTANT_KEYWORDS.iter().any(|kw| message.contains(kw))
    }

    fn level_label(level: LogLevel, use_colors: bool) -> String {
        let label = format!("{:5}", level.label());
        if use_colors {
            label.color(level.color_code()).bold().to_string()
        } else {
            label
        }
    }

    fn format_minimal(entry: &LogEntry, use_colors: bool) -> String {
        let time = TimestampFormat::ClockLocal.format(&entry.timestamp);
        let time = if use_colors {
            time.dimmed().to_string()
        } else {
            time
        };
        let mut line = format!(
            "{} {} {}",
            time,
            Self::level_label(entry.level, use_colors),
            entry.message
        );
        if let Some(component) = entry.field("component") {
            line.push_str(&format!(" ({})", component));
        }
        line
    }

    fn format_pretty(entry: &LogEntry, use_colors: bool) -> String {
        let header = format!(
            "[{}] {} {}",
            TimestampFormat::DateTimeLocal.format(&entry.timestamp),
            Self::level_label(entry.level, use_colors),
            entry.message
        );
        if entry.fields.is_empty() {
            return header;
        }
        let body = serde_json::to_string_pretty(&entry.fields.to_json_map())
            .unwrap_or_else(|_| entry.fields.format_fields());
        let body = body
            .lines()
            .map(|line| format!("  {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        let body = if use_colors {
            body.dimmed().to_string()
        } else {
            body
        };
        format!("{}\n{}", header, body)
    }

    fn format_standard(entry: &LogEntry, use_colors: bool) -> String {
        let base = format!(
            "[{}] {} {}",
            TimestampFormat::DateTimeLocal.format(&entry.timestamp),
            Self::level_label(entry.level, use_colors),
            entry.message
        );
        if entry.fields.is_empty() {
            return base;
        }
        let tail = serde_json::Value::Object(entry.fields.to_json_map()).to_string();
        format!("{} {}", base, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogContext;

    fn entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry::new(level, message)
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!("pretty".parse::<ConsoleFormat>(), Ok(ConsoleFormat::Pretty));
        assert_eq!("MINIMAL".parse::<ConsoleFormat>(), Ok(ConsoleFormat::Minimal));
        assert!("xml".parse::<ConsoleFormat>().is_err());
    }

    #[test]
    fn test_minimal_filters_chatter() {
        let fmt = ConsoleFormat::Minimal;
        assert!(fmt.format(&entry(LogLevel::Info, "cache miss"), false).is_none());
        assert!(fmt.format(&entry(LogLevel::Debug, "tick"), false).is_none());
        assert!(fmt.format(&entry(LogLevel::Warn, "slow query"), false).is_some());
        assert!(fmt
            .format(&entry(LogLevel::Info, "Server listening on :8080"), false)
            .is_some());
    }

    #[test]
    fn test_minimal_allows_listed_components() {
        let e = entry(LogLevel::Info, "pool size 10")
            .with_fields(LogContext::new().with_field("component", "database"));
        let line = ConsoleFormat::Minimal.format(&e, false).unwrap();
        assert!(line.ends_with("pool size 10 (database)"));
        assert!(line.contains("INFO"));
    }

    #[test]
    fn test_standard_single_line_json_tail() {
        let e = entry(LogLevel::Error, "DB down")
            .with_fields(LogContext::new().with_field("component", "db"));
        let line = ConsoleFormat::Standard.format(&e, false).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("ERROR DB down {\"component\":\"db\"}"));
    }

    #[test]
    fn test_pretty_multiline_block() {
        let e = entry(LogLevel::Info, "request")
            .with_fields(LogContext::new().with_field("a", 1).with_field("b", "x"));
        let out = ConsoleFormat::Pretty.format(&e, false).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.len() > 2);
        assert!(lines[0].ends_with("INFO  request"));
        assert!(out.contains("\"a\": 1"));
    }

    #[test]
    fn test_no_metadata_no_tail() {
        let out = ConsoleFormat::Standard
            .format(&entry(LogLevel::Info, "plain"), false)
            .unwrap();
        assert!(out.ends_with("INFO  plain"));
    }
}

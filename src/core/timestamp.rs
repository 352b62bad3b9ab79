//! Timestamp formatting utilities
//!
//! One place for every timestamp rendering the transports need: ISO 8601
//! for JSON lines and payloads, short clock forms for the console, and the
//! numeric forms external services expect.

use chrono::{DateTime, Local, Utc};

/// Timestamp format options
///
/// # Examples
///
/// ```
/// use log_pipeline::core::TimestampFormat;
/// use chrono::Utc;
///
/// let stamp = TimestampFormat::Iso8601.format(&Utc::now());
/// assert!(stamp.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// Local wall-clock time: `10:30:45`
    ClockLocal,

    /// Local date and time with milliseconds: `2025-01-08 10:30:45.123`
    DateTimeLocal,

    /// UTC date and time with milliseconds, no zone marker: `2025-01-08 10:30:45.123`
    ///
    /// Accepted by SQL `DATETIME` columns.
    SqlDateTime,

    /// Unix timestamp in whole seconds: `1736332245`
    Unix,

    /// Unix timestamp in seconds with millisecond fraction: `1736332245.123`
    UnixFractional,

    /// Custom strftime format applied in UTC
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::ClockLocal => {
                datetime.with_timezone(&Local).format("%H:%M:%S").to_string()
            }
            TimestampFormat::DateTimeLocal => datetime
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            TimestampFormat::SqlDateTime => datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixFractional => {
                format!("{:.3}", Self::unix_seconds(datetime))
            }
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }

    /// Seconds since the epoch as a float, millisecond resolution
    #[must_use]
    pub fn unix_seconds(datetime: &DateTime<Utc>) -> f64 {
        datetime.timestamp_millis() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_iso8601_format() {
        let result = TimestampFormat::Iso8601.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123Z");
    }

    #[test]
    fn test_sql_datetime_format() {
        let result = TimestampFormat::SqlDateTime.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08 10:30:45.123");
    }

    #[test]
    fn test_unix_formats() {
        assert_eq!(TimestampFormat::Unix.format(&fixed_datetime()), "1736332245");
        assert_eq!(
            TimestampFormat::UnixFractional.format(&fixed_datetime()),
            "1736332245.123"
        );
        let secs = TimestampFormat::unix_seconds(&fixed_datetime());
        assert!((secs - 1736332245.123).abs() < 1e-6);
    }

    #[test]
    fn test_clock_local_shape() {
        let result = TimestampFormat::ClockLocal.format(&fixed_datetime());
        assert_eq!(result.len(), 8);
        assert_eq!(result.matches(':').count(), 2);
    }

    #[test]
    fn test_custom_format() {
        let format = TimestampFormat::Custom("%Y/%m/%d %H:%M".to_string());
        assert_eq!(format.format(&fixed_datetime()), "2025/01/08 10:30");
    }

    #[test]
    fn test_default_is_iso8601() {
        assert_eq!(TimestampFormat::default(), TimestampFormat::Iso8601);
    }
}

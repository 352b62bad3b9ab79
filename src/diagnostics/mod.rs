//! Human-oriented error diagnostics for interactive terminals
//!
//! A [`DiagnosticProvider`] turns an error message into a [`Diagnosis`];
//! [`render`] formats it as a terminal block. The default provider,
//! [`PatternDiagnostics`], recognises a handful of common failure categories
//! by message substring and falls back to a generic hint otherwise.

mod render;

pub use render::{render, strip_ansi, visible_width, wrap, WRAP_WIDTH};

use crate::core::LogContext;
use regex::Regex;
use std::sync::LazyLock;

static MISSING_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(cannot find (?:module|crate|package)|unresolved import|module not found|no such (?:module|crate)|failed to load)\s*[`'\x22]?([\w:./@-]+)?",
    )
    .expect("Invalid missing-module regex")
});

static SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(syntax ?error|unexpected token|unexpected end of|parse error|expected .+ found)")
        .expect("Invalid syntax regex")
});

static PORT_IN_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(address already in use|eaddrinuse|port\s+(\d+)\s+(?:is\s+)?(?:already\s+)?in use)(?:.*?:(\d{2,5}))?")
        .expect("Invalid port regex")
});

static ROUTE_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(no route (?:for|matches)|route not found|is not exported|does not provide an export|export .+ (?:was )?not found|no matching handler)",
    )
    .expect("Invalid route regex")
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\w./\\-]+\.[A-Za-z]{1,4}):(\d+)(?::(\d+))?").expect("Invalid location regex")
});

/// One recognised problem and what to do about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub problem: String,
    pub fix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub title: String,
    /// `file:line[:col]` hint, when one could be found
    pub location: Option<String>,
    pub findings: Vec<Finding>,
    /// Final one-line recommendation
    pub suggestion: String,
}

impl Diagnosis {
    /// Nothing recognised: point the reader back at the error itself
    pub fn generic(message: &str, location: Option<String>) -> Self {
        Self {
            title: first_line(message),
            location,
            findings: Vec::new(),
            suggestion: "Review the error message and stack trace above for details.".to_string(),
        }
    }

    pub fn is_generic(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Swappable source of diagnoses for the error renderer
pub trait DiagnosticProvider: Send + Sync {
    fn diagnose(&self, message: &str, context: &LogContext) -> Diagnosis;
}

/// Heuristic matcher over English error-message substrings
#[derive(Debug, Clone)]
pub struct PatternDiagnostics {
    max_findings: usize,
}

impl PatternDiagnostics {
    pub const DEFAULT_MAX_FINDINGS: usize = 3;

    pub fn new() -> Self {
        Self {
            max_findings: Self::DEFAULT_MAX_FINDINGS,
        }
    }

    #[must_use]
    pub fn with_max_findings(mut self, max: usize) -> Self {
        self.max_findings = max;
        self
    }

    fn locate(message: &str, context: &LogContext) -> Option<String> {
        for key in ["location", "file"] {
            if let Some(value) = context.get(key) {
                return Some(value.to_plain_string());
            }
        }
        let stack = context.get("stack").map(|v| v.to_plain_string());
        let sources = stack.iter().map(String::as_str).chain(std::iter::once(message));
        for source in sources {
            if let Some(caps) = LOCATION.captures(source) {
                return Some(caps[0].to_string());
            }
        }
        None
    }
}

impl Default for PatternDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticProvider for PatternDiagnostics {
    fn diagnose(&self, message: &str, context: &LogContext) -> Diagnosis {
        let location = Self::locate(message, context);
        let mut findings = Vec::new();
        let mut title = None;

        if let Some(caps) = MISSING_MODULE.captures(message) {
            let name = caps.get(2).map(|m| m.as_str()).unwrap_or("the module");
            title.get_or_insert_with(|| "Missing module".to_string());
            findings.push(Finding {
                problem: format!("'{}' could not be resolved", name),
                fix: format!(
                    "Check the spelling and path of '{}', and that the dependency is declared and installed",
                    name
                ),
            });
        }
        if SYNTAX.is_match(message) {
            title.get_or_insert_with(|| "Syntax error".to_string());
            findings.push(Finding {
                problem: "The source could not be parsed".to_string(),
                fix: match &location {
                    Some(at) => format!("Look for an unbalanced bracket, quote or separator near {}", at),
                    None => "Look for an unbalanced bracket, quote or separator near the reported line".to_string(),
                },
            });
        }
        if let Some(caps) = PORT_IN_USE.captures(message) {
            let port = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
                .or_else(|| context.get("port").map(|v| v.to_plain_string()));
            title.get_or_insert_with(|| "Port already in use".to_string());
            findings.push(Finding {
                problem: match &port {
                    Some(port) => format!("Another process is listening on port {}", port),
                    None => "Another process is listening on the requested port".to_string(),
                },
                fix: "Stop the other process or configure a different port".to_string(),
            });
        }
        if ROUTE_EXPORT.is_match(message) {
            title.get_or_insert_with(|| "Route or export not found".to_string());
            findings.push(Finding {
                problem: "A handler or exported symbol referenced by name does not exist".to_string(),
                fix: "Check that the route is registered and the symbol is public under that exact name".to_string(),
            });
        }

        let Some(title) = title else {
            return Diagnosis::generic(message, location);
        };
        findings.truncate(self.max_findings.max(1));
        let suggestion = findings
            .first()
            .map(|f| f.fix.clone())
            .unwrap_or_default();

        Diagnosis {
            title,
            location,
            findings,
            suggestion,
        }
    }
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnose(message: &str) -> Diagnosis {
        PatternDiagnostics::new().diagnose(message, &LogContext::new())
    }

    #[test]
    fn test_missing_module() {
        let d = diagnose("error[E0432]: unresolved import `serde_yaml`");
        assert_eq!(d.title, "Missing module");
        assert!(d.findings[0].problem.contains("serde_yaml"));
        assert!(!d.is_generic());
    }

    #[test]
    fn test_port_in_use() {
        let d = diagnose("listen EADDRINUSE: address already in use :::3000");
        assert_eq!(d.title, "Port already in use");
        assert!(d.findings[0].problem.contains("3000"));
    }

    #[test]
    fn test_syntax_with_location() {
        let d = diagnose("SyntaxError: Unexpected token '}' at src/routes/user.rs:42:7");
        assert_eq!(d.title, "Syntax error");
        assert_eq!(d.location.as_deref(), Some("src/routes/user.rs:42:7"));
        assert!(d.findings[0].fix.contains("src/routes/user.rs:42:7"));
    }

    #[test]
    fn test_route_export() {
        let d = diagnose("The requested module does not provide an export named 'handler'");
        assert_eq!(d.title, "Route or export not found");
    }

    #[test]
    fn test_location_from_stack_field() {
        let ctx = LogContext::new().with_field("stack", "at connect (src/db/pool.rs:88:12)");
        let d = PatternDiagnostics::new().diagnose("Cannot find module 'pg'", &ctx);
        assert_eq!(d.location.as_deref(), Some("src/db/pool.rs:88:12"));
    }

    #[test]
    fn test_unmatched_is_generic() {
        let d = diagnose("Payment declined by issuer");
        assert!(d.is_generic());
        assert_eq!(d.title, "Payment declined by issuer");
        assert!(d.suggestion.starts_with("Review the error"));
    }

    #[test]
    fn test_findings_are_capped() {
        let d = PatternDiagnostics::new()
            .with_max_findings(1)
            .diagnose("syntax error: cannot find module 'x' and address already in use", &LogContext::new());
        assert_eq!(d.findings.len(), 1);
    }
}

use super::Diagnosis;
use colored::{ColoredString, Colorize};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Column budget for rendered diagnostics
pub const WRAP_WIDTH: usize = 80;

const MIN_TEXT_WIDTH: usize = 20;

static ANSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("Invalid ANSI regex"));

pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    ANSI.replace_all(s, "")
}

/// Printed width of `s`, ignoring colour escapes
pub fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/// Word-wrap `text` behind `prefix`, indenting continuation lines to match
///
/// Words longer than the available width are kept whole on their own line.
pub fn wrap(text: &str, prefix: &str, width: usize) -> Vec<String> {
    let indent = visible_width(prefix);
    let available = width.saturating_sub(indent).max(MIN_TEXT_WIDTH);
    let pad = " ".repeat(indent);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > available {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{}{}", prefix, line)
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect()
}

fn paint(text: &str, use_colors: bool, style: fn(&str) -> ColoredString) -> String {
    if use_colors {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

/// Terminal block for a diagnosis
pub fn render(diagnosis: &Diagnosis, use_colors: bool) -> String {
    let mut out: Vec<String> = Vec::new();
    out.push(String::new());
    let badge = paint(" ERROR ", use_colors, |s| s.white().on_red().bold());
    out.extend(wrap(&diagnosis.title, &format!("{} ", badge), WRAP_WIDTH));

    if let Some(location) = &diagnosis.location {
        let at = paint("at", use_colors, |s| s.dimmed());
        out.extend(wrap(location, &format!("  {} ", at), WRAP_WIDTH));
    }

    for (i, finding) in diagnosis.findings.iter().enumerate() {
        out.push(String::new());
        let number = paint(&format!("{}.", i + 1), use_colors, |s| s.yellow().bold());
        out.extend(wrap(&finding.problem, &format!("  {} ", number), WRAP_WIDTH));
        let fix = paint("Fix:", use_colors, |s| s.green());
        out.extend(wrap(&finding.fix, &format!("     {} ", fix), WRAP_WIDTH));
    }

    out.push(String::new());
    let label = if diagnosis.is_generic() {
        paint("Hint:", use_colors, |s| s.cyan().bold())
    } else {
        paint("Suggested fix:", use_colors, |s| s.green().bold())
    };
    out.extend(wrap(&diagnosis.suggestion, &format!("  {} ", label), WRAP_WIDTH));
    out.push(String::new());

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Finding;

    #[test]
    fn test_strip_ansi() {
        let painted = "\x1b[1;31mERROR\x1b[0m done";
        assert_eq!(strip_ansi(painted), "ERROR done");
        assert_eq!(visible_width(painted), 10);
    }

    #[test]
    fn test_wrap_honours_colored_prefix() {
        let prefix = "\x1b[32mFix:\x1b[0m ";
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let lines = wrap(text, prefix, 30);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(visible_width(line) <= 30, "too wide: {:?}", line);
        }
        assert!(lines[1].starts_with("     "));
    }

    #[test]
    fn test_wrap_keeps_long_words_whole() {
        let long = "x".repeat(120);
        let lines = wrap(&long, "> ", 40);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(&long));
    }

    #[test]
    fn test_wrap_empty_text() {
        assert_eq!(wrap("", "- ", 80), vec!["- ".to_string()]);
    }

    #[test]
    fn test_render_plain() {
        let diagnosis = Diagnosis {
            title: "Port already in use".to_string(),
            location: Some("src/main.rs:10".to_string()),
            findings: vec![Finding {
                problem: "Another process is listening on port 3000".to_string(),
                fix: "Stop the other process".to_string(),
            }],
            suggestion: "Stop the other process".to_string(),
        };
        let out = render(&diagnosis, false);
        assert!(out.contains(" ERROR  Port already in use"));
        assert!(out.contains("  at src/main.rs:10"));
        assert!(out.contains("  1. Another process is listening on port 3000"));
        assert!(out.contains("Suggested fix: Stop the other process"));
        for line in out.lines() {
            assert!(visible_width(line) <= WRAP_WIDTH);
        }
    }

    #[test]
    fn test_render_generic_has_no_findings() {
        let out = render(&Diagnosis::generic("Something odd", None), true);
        let plain = strip_ansi(&out);
        assert!(plain.contains("Hint: Review the error"));
        assert!(!plain.contains("1."));
    }
}

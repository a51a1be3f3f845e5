//! Reconciliation of the `yaml-language-server` schema directive.
//!
//! The directive lives in the leading comment block of a document:
//!
//! ```yaml
//! # yaml-language-server: $schema=https://example.com/apps/deployment_v1.json
//! apiVersion: apps/v1
//! kind: Deployment
//! ```

use std::sync::OnceLock;

use regex::Regex;

/// Prefix of a directive line as written by this tool.
pub const DIRECTIVE_PREFIX: &str = "# yaml-language-server: $schema=";

fn directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*#\s*yaml-language-server:\s*\$schema=(?P<url>\S+)\s*$")
            .expect("directive pattern is valid")
    })
}

/// Format a directive line (without line terminator).
pub fn directive_line(url: &str) -> String {
    format!("{DIRECTIVE_PREFIX}{url}")
}

/// Extract the schema URL if `line` is a directive line.
pub fn parse_directive(line: &str) -> Option<&str> {
    directive_regex()
        .captures(line)
        .and_then(|c| c.name("url"))
        .map(|m| m.as_str())
}

/// Split a line into content and terminator (`"\n"`, `"\r\n"` or `""`).
fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Ensure `body` starts with a directive pointing at `expected_url`.
///
/// Scans the leading run of blank and comment lines. An existing directive
/// there is rewritten in place when its URL differs; otherwise a new
/// directive is inserted before the first non-blank line. Returns the new
/// body and whether it changed.
pub fn reconcile(body: &str, expected_url: &str) -> (String, bool) {
    let lines: Vec<&str> = body.split_inclusive('\n').collect();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.starts_with('#') {
            break;
        }

        let (content, terminator) = split_terminator(line);
        let Some(current) = parse_directive(content) else {
            continue;
        };
        if current == expected_url {
            return (body.to_string(), false);
        }

        let mut out = String::with_capacity(body.len() + expected_url.len());
        lines[..i].iter().for_each(|l| out.push_str(l));
        out.push_str(&directive_line(expected_url));
        out.push_str(terminator);
        lines[i + 1..].iter().for_each(|l| out.push_str(l));
        return (out, true);
    }

    let insert_at = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let newline = if body.contains("\r\n") { "\r\n" } else { "\n" };

    let mut out = String::with_capacity(body.len() + expected_url.len() + DIRECTIVE_PREFIX.len() + 2);
    lines[..insert_at].iter().for_each(|l| out.push_str(l));
    out.push_str(&directive_line(expected_url));
    out.push_str(newline);
    lines[insert_at..].iter().for_each(|l| out.push_str(l));
    (out, true)
}

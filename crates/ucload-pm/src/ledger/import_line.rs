use regex::Regex;
use std::sync::OnceLock;

fn import_path_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"@import\s+(?:url\(\s*['"]?|['"])([^'")\s;]+)"#).unwrap())
}

/// One `@import` line of the master stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    /// Position among import lines, zero-based
    pub index: usize,
    /// Position in the file, zero-based
    pub line_number: usize,
    pub raw: String,
    /// Referenced path, relative to the chrome directory
    pub path: Option<String>,
    pub enabled: bool,
}

impl ImportLine {
    pub fn parse(index: usize, line_number: usize, raw: &str) -> Self {
        Self {
            index,
            line_number,
            raw: raw.to_string(),
            path: referenced_path(raw),
            enabled: !is_comment_wrapped(raw),
        }
    }

    /// The line as shown to a user: trimmed, without comment markers
    pub fn display_text(&self) -> String {
        unwrap_comment(self.raw.trim())
    }

    pub fn normalized(&self) -> String {
        normalize(&self.raw)
    }
}

pub fn is_import_line(line: &str) -> bool {
    line.contains("@import")
}

/// Comparison key for duplicate detection: comment markers and all whitespace removed
pub fn normalize(line: &str) -> String {
    line.replace("/*", "")
        .replace("*/", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Split a trimmed line into the body of its leading `/* ... */` comment and the text after it
fn leading_comment(trimmed: &str) -> Option<(&str, &str)> {
    let body = trimmed.strip_prefix("/*")?;
    let close = body.find("*/")?;
    Some((&body[..close], &body[close + 2..]))
}

/// Whether the line is disabled: its `@import` sits inside the leading block comment
pub fn is_comment_wrapped(line: &str) -> bool {
    leading_comment(line.trim()).is_some_and(|(body, _)| body.contains("@import"))
}

pub fn referenced_path(line: &str) -> Option<String> {
    import_path_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Drop the comment markers of a disabled line, keeping whatever follows the comment
fn unwrap_comment(trimmed: &str) -> String {
    match leading_comment(trimmed) {
        Some((body, rest)) if body.contains("@import") => format!("{}{}", body.trim(), rest),
        _ => trimmed.to_string(),
    }
}

/// Rewrite `line` into the requested state, keeping its surrounding whitespace.
///
/// Disabling comments out the `@import` statement only; a trailing comment stays outside
/// the wrapper. Returns `None` when the line is already in that state, or when the
/// statement itself holds a comment and cannot be wrapped.
pub fn set_enabled(line: &str, enable: bool) -> Option<String> {
    if is_comment_wrapped(line) != enable {
        return None;
    }

    let start = line.len() - line.trim_start().len();
    let end = line.trim_end().len();
    let (indent, core, trail) = (&line[..start], &line[start..end], &line[end..]);

    let core = if enable {
        unwrap_comment(core)
    } else {
        let split = core.find(';').map(|i| i + 1).unwrap_or(core.len());
        let (statement, rest) = core.split_at(split);
        if statement.contains("/*") || statement.contains("*/") {
            log::warn!("Cannot comment out {}: the statement contains a comment", core);
            return None;
        }
        format!("/* {} */{}", statement, rest)
    };
    Some(format!("{}{}{}", indent, core, trail))
}

/// Path comparison key: forward slashes, no leading `./`
pub fn normalize_reference(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tolerant audit-log (JSONL) reader and atomic appender.
//!
//! `read_log_entries` accepts three historic shapes of `todo-log.jsonl`:
//! a pure JSON object `{"entries": [...]}`, pure JSONL (one JSON value per
//! line), and a hybrid of an initial `{"entries": [...]}` object followed
//! by loose JSONL lines appended later. The brace-matching scanner used to
//! find the extent of the leading object skips over string contents and
//! escape sequences so braces inside quoted strings don't confuse it.

use cleo_core::error::{CleoError, Result};
use serde_json::Value;

/// Finds the byte offset just past the balanced `{...}` object starting at
/// `start` (which must point at `{`), or `None` if the braces never close.
fn scan_balanced_object(content: &str, start: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    debug_assert_eq!(bytes.get(start), Some(&b'{'));

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Parses `content` into a flat list of log-entry values, tolerating the
/// three historic shapes described above.
pub fn read_log_entries(content: &str) -> Result<Vec<Value>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if !trimmed.starts_with('{') {
        return parse_jsonl_lines(trimmed);
    }

    let start = content.len() - trimmed.len();
    let Some(end) = scan_balanced_object(content, start) else {
        return Err(CleoError::Validation("audit log: unterminated leading object".into()));
    };

    let head = &content[start..end];
    let head_value: Value = serde_json::from_str(head)
        .map_err(|e| CleoError::Validation(format!("audit log: malformed leading object: {e}")))?;

    let mut entries: Vec<Value> = head_value
        .get("entries")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let rest = content[end..].trim_start();
    if !rest.is_empty() {
        entries.extend(parse_jsonl_lines(rest)?);
    }
    Ok(entries)
}

fn parse_jsonl_lines(content: &str) -> Result<Vec<Value>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| CleoError::Validation(format!("audit log: malformed JSONL line: {e}")))
        })
        .collect()
}

/// Renders `entries` back to the canonical pure-JSONL shape used for every
/// fresh append; readers must keep tolerating the legacy shapes above.
pub fn render_jsonl(entries: &[Value]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_pure_jsonl() {
        let content = "{\"op\":\"a\"}\n{\"op\":\"b\"}\n";
        let entries = read_log_entries(content).unwrap();
        assert_eq!(entries, vec![json!({"op": "a"}), json!({"op": "b"})]);
    }

    #[test]
    fn reads_pure_object_with_entries_array() {
        let content = r#"{"entries": [{"op": "a"}, {"op": "b"}]}"#;
        let entries = read_log_entries(content).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn reads_hybrid_shape_with_braces_inside_strings() {
        let content = "{\"entries\": [{\"op\": \"a {not a brace}\"}]}\n{\"op\":\"b\"}\n";
        let entries = read_log_entries(content).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["op"], "a {not a brace}");
        assert_eq!(entries[1]["op"], "b");
    }

    #[test]
    fn empty_content_is_no_entries() {
        assert!(read_log_entries("").unwrap().is_empty());
    }

    #[test]
    fn render_then_read_round_trips() {
        let entries = vec![json!({"op": "a"}), json!({"op": "b"})];
        let rendered = render_jsonl(&entries);
        assert_eq!(read_log_entries(&rendered).unwrap(), entries);
    }
}

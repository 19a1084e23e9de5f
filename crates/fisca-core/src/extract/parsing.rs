//! JSON parsing helpers for extraction service responses
//!
//! Model responses often wrap the JSON payload in markdown fences or prose.
//! These helpers locate and parse the payload without trusting the rest of
//! the response text.

use crate::error::{Error, Result};

use super::types::ExtractedItem;

/// Parse the items from an extraction response.
///
/// Accepts either a JSON array of items or a single object (proposal files
/// yield exactly one item). Surrounding text and ``` fences are ignored.
pub fn parse_extraction_response(response: &str) -> Result<Vec<ExtractedItem>> {
    let response = strip_fences(response.trim());

    let array_start = response.find('[');
    let object_start = response.find('{');

    // Prefer the array form when a '[' appears before the first '{'
    let json_str = match (array_start, object_start) {
        (Some(a), Some(o)) if a < o => delimited(response, a, '[', ']'),
        (_, Some(o)) => delimited(response, o, '{', '}'),
        (Some(a), None) => delimited(response, a, '[', ']'),
        (None, None) => None,
    };

    let json_str = json_str.ok_or_else(|| {
        Error::Extraction(format!(
            "No JSON found in extraction response | Raw: {}",
            truncate(response, 200)
        ))
    })?;

    if json_str.starts_with('[') {
        serde_json::from_str::<Vec<ExtractedItem>>(json_str).map_err(|e| {
            Error::Extraction(format!(
                "Invalid JSON from extraction service: {} | Raw: {}",
                e,
                truncate(json_str, 200)
            ))
        })
    } else {
        let item: ExtractedItem = serde_json::from_str(json_str).map_err(|e| {
            Error::Extraction(format!(
                "Invalid JSON from extraction service: {} | Raw: {}",
                e,
                truncate(json_str, 200)
            ))
        })?;
        Ok(vec![item])
    }
}

/// Remove markdown code fences, keeping the fenced body.
fn strip_fences(response: &str) -> &str {
    let trimmed = response.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // skip an optional language tag on the fence line
        let body = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => rest,
        };
        return body.trim_end().trim_end_matches("```").trim();
    }
    trimmed
}

/// Slice out a balanced `open`..`close` region starting at `start`.
fn delimited(s: &str, start: usize, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}

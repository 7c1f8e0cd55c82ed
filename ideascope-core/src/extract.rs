//! Defensive extraction of JSON values from free-form model output.
//!
//! Models wrap JSON in markdown fences, prepend commentary, or append notes.
//! Extraction tries, in order:
//! 1. Strip a leading/trailing fenced code block marker
//! 2. Direct parse of what remains
//! 3. The first balanced `{...}` or `[...]` span (per the expected shape) that parses
//!
//! Nothing here performs I/O, and "could not parse" is never an error: callers
//! supply a default and get back an [`Extraction`] saying which one they got.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// The kind of top-level JSON value a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn open(self) -> char {
        match self {
            JsonShape::Object => '{',
            JsonShape::Array => '[',
        }
    }

    fn close(self) -> char {
        match self {
            JsonShape::Object => '}',
            JsonShape::Array => ']',
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Object => value.is_object(),
            JsonShape::Array => value.is_array(),
        }
    }
}

/// Outcome of an extraction: the parsed value, or the caller's default.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Parsed(T),
    Fallback(T),
}

impl<T> Extraction<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Extraction::Parsed(v) | Extraction::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Extraction::Parsed(v) | Extraction::Fallback(v) => v,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extraction<U> {
        match self {
            Extraction::Parsed(v) => Extraction::Parsed(f(v)),
            Extraction::Fallback(v) => Extraction::Fallback(f(v)),
        }
    }
}

/// Remove a markdown code fence wrapping the text, if present.
///
/// Handles an opening marker with or without a language tag (```` ```json ````)
/// and a closing marker at the very end. Text without fences is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // Only the info string ("json", "JSON", ...) goes with the marker;
        // a payload may follow on the same line.
        body = rest
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim_start();
    }

    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Find the first balanced span opening with `open` and closing with `close`
/// at or after byte offset `from`, ignoring brackets inside JSON strings.
///
/// Returns `(start, end)` byte offsets with `end` exclusive. `open` and
/// `close` are ASCII, so the offsets always fall on char boundaries.
fn balanced_span(text: &str, open: char, close: char, from: usize) -> Option<(usize, usize)> {
    let start = from + text[from..].find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + i + c.len_utf8()));
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract a JSON value of the given shape from model output.
pub fn extract_json(text: &str, shape: JsonShape) -> Option<Value> {
    let body = strip_code_fence(text);

    if let Ok(value) = serde_json::from_str::<Value>(body)
        && shape.matches(&value)
    {
        return Some(value);
    }

    // Walk candidate spans left to right; prose like "[note]" may precede the payload.
    let mut from = 0;
    while from < body.len() {
        let Some((start, end)) = balanced_span(body, shape.open(), shape.close(), from) else {
            break;
        };
        if let Ok(value) = serde_json::from_str::<Value>(&body[start..end])
            && shape.matches(&value)
        {
            return Some(value);
        }
        from = start + 1;
    }

    None
}

/// Extract and deserialize a value, falling back to `default`.
pub fn extract_or<T: DeserializeOwned>(text: &str, shape: JsonShape, default: T) -> Extraction<T> {
    match extract_json(text, shape).and_then(|v| serde_json::from_value::<T>(v).ok()) {
        Some(value) => Extraction::Parsed(value),
        None => Extraction::Fallback(default),
    }
}

/// Extract an array, keeping only the elements that deserialize as `T`.
///
/// Falls back to `default` when no array is found or when none of its
/// elements are usable.
pub fn extract_items<T: DeserializeOwned>(text: &str, default: Vec<T>) -> Extraction<Vec<T>> {
    let Some(Value::Array(items)) = extract_json(text, JsonShape::Array) else {
        return Extraction::Fallback(default);
    };

    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if parsed.is_empty() {
        Extraction::Fallback(default)
    } else {
        Extraction::Parsed(parsed)
    }
}

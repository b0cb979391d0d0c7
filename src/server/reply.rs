//! The canned tutor reply.

use serde_json::{Number, Value};

/// Longest message the tutor echoes back.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Reply when the question is empty.
pub const EMPTY_PROMPT_REPLY: &str = "Please ask a question to begin.";

/// Turn a loosely typed `message` field into text.
///
/// Missing or `null` becomes empty and strings pass through. Other values
/// are stringified the way a browser would: arrays join their elements with
/// `,` and objects read `[object Object]`. The result is capped at
/// [`MAX_MESSAGE_CHARS`].
#[must_use]
pub fn message_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => truncate_chars(&loose_string(value), MAX_MESSAGE_CHARS),
    }
}

fn loose_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => loose_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Integral floats print without a fractional part (`1.0` reads `1`).
fn number_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

/// Cap `text` at `max` characters.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Socratic prompt echoing the question back.
#[must_use]
pub fn socratic_reply(message: &str) -> String {
    if message.is_empty() {
        EMPTY_PROMPT_REPLY.to_string()
    } else {
        format!(
            "Let's think this through. What key principle from your materials relates to: \"{message}\"?"
        )
    }
}

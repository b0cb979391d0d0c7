//! Input cleanup applied before user text leaves the composer.

use std::sync::LazyLock;

use regex::Regex;

static MARKUP: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^<>]*>").ok());

/// Strip markup tags, stray angle brackets and control characters.
///
/// Newlines and tabs survive. The result is not trimmed.
#[must_use]
pub fn sanitize_input(raw: &str) -> String {
    let without_tags = match MARKUP.as_ref() {
        Some(re) => re.replace_all(raw, ""),
        None => raw.into(),
    };

    without_tags
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

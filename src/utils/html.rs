// src/utils/html.rs

use std::{collections::HashSet, sync::LazyLock};

use ammonia::Builder;
use regex::{Captures, Regex};

/// Entities the sanitizer writes back when it serializes plain text.
static SERIALIZED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt|quot|nbsp);").expect("entity pattern is valid"));

/// Strips every HTML tag from free-text input, keeping the text content.
///
/// Script and style bodies are dropped with their tags. The sanitizer returns
/// HTML, so its entities are decoded again: the result is plain text, and
/// characters like `&` or `<` in ordinary prose survive unchanged.
pub fn clean_text(input: &str) -> String {
    let sanitized = Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string();

    SERIALIZED_ENTITY
        .replace_all(&sanitized, |caps: &Captures| match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            _ => "\u{a0}",
        })
        .trim()
        .to_string()
}

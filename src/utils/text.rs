//! Text helpers used by the normalizers.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]{1,6})|#([0-9]{1,7})|(lt|gt|quot|apos|nbsp|amp));")
        .expect("entity pattern is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Split a display name into `(given, surname)`.
///
/// The last whitespace-separated token is the surname; the remaining tokens
/// are the given name. A single token is returned as the given name with an
/// empty surname.
pub fn split_display_name(display_name: &str) -> (String, String) {
    let tokens: Vec<&str> = display_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => (String::new(), String::new()),
        [single] => (single.to_string(), String::new()),
        [given @ .., surname] => (given.join(" "), surname.to_string()),
    }
}

/// Flatten JATS/HTML markup into plain text.
///
/// Tags are dropped, numeric and common named entities decoded in a single
/// pass and whitespace collapsed. Entities that do not decode are kept as is.
pub fn strip_markup(markup: &str) -> String {
    let without_tags = TAG_RE.replace_all(markup, " ");
    let decoded = ENTITY_RE.replace_all(&without_tags, |caps: &Captures<'_>| {
        decode_entity(caps).unwrap_or_else(|| caps[0].to_string())
    });
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entity(caps: &Captures<'_>) -> Option<String> {
    let code = if let Some(hex) = caps.get(1) {
        u32::from_str_radix(hex.as_str(), 16).ok()?
    } else if let Some(dec) = caps.get(2) {
        dec.as_str().parse().ok()?
    } else {
        let named = match caps.get(3)?.as_str() {
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            "apos" => "'",
            "nbsp" => " ",
            _ => "&",
        };
        return Some(named.to_string());
    };
    char::from_u32(code).map(String::from)
}

/// Rebuild an abstract from an OpenAlex-style inverted index
/// (`word -> [positions]`).
pub fn rebuild_inverted_index(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positioned: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |&p| (p, word.as_str())))
        .collect();
    positioned.sort_by_key(|&(position, _)| position);

    positioned
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

//! Literal label scanning.
//!
//! Finds `Label: value` / `Label = value` occurrences in raw text. The label
//! must be the whole label, so a scan for `Revenue` skips `Total Revenue:`
//! and `Revenue Growth:`.

use regex::Regex;

use crate::formatting::parse_number;

/// Values written directly after `keyword` used as a label, in text order.
pub fn label_values(text: &str, keyword: &str) -> Vec<f64> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Vec::new();
    }
    let words: Vec<String> = keyword.split_whitespace().map(regex::escape).collect();
    let pattern = format!(
        r"(?im)(?:^|[^\w \t])[ \t]*{}[ \t]*[:=][ \t]*(-?\$?(?:\d{{1,3}}(?:,\d{{3}})+|\d+)(?:\.\d+)?)",
        words.join(r"[ \t]+")
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter(|m| ends_number(&text[m.end()..]))
        .filter_map(|m| parse_number(m.as_str()))
        .collect()
}

/// Whether a number captured just before `rest` is the whole token, not the
/// head of something like `1,2345` or `12.5.3`.
fn ends_number(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_ascii_digit() => false,
        Some(',' | '.') => !chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => true,
    }
}

/// The value under `keyword` when the text gives it exactly one distinct
/// value.
pub fn exact_label_value(text: &str, keyword: &str) -> Option<f64> {
    let values = label_values(text, keyword);
    let first = *values.first()?;
    values
        .iter()
        .all(|v| (v - first).abs() < f64::EPSILON)
        .then_some(first)
}

/// Case-insensitive occurrence check.
pub fn mentions(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim();
    !keyword.is_empty() && text.to_lowercase().contains(&keyword.to_lowercase())
}

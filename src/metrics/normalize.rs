//! Mapping of raw names, attribute keys and attribute values onto identifiers
//! the line protocol accepts.
//!
//! Metric keys are dot-separated sections of `[A-Za-z0-9_:-]`; the first
//! section must begin with a letter or underscore. Dimension keys follow the
//! same shape but are lower-cased. Dimension values are free text with the
//! protocol's special characters backslash-escaped.

use crate::metrics::types::Dimension;
use once_cell::sync::Lazy;
use regex::Regex;

const METRIC_KEY_MAX_LENGTH: usize = 250;
const DIMENSION_KEY_MAX_LENGTH: usize = 100;
const DIMENSION_VALUE_MAX_LENGTH: usize = 250;

static RE_MK_FIRST_SECTION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^a-zA-Z_]+").expect("valid regex"));
static RE_MK_SECTION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^a-zA-Z0-9_:-]+").expect("valid regex"));
static RE_MK_SECTION_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_:-]+$").expect("valid regex"));
static RE_MK_INVALID_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_:-]+").expect("valid regex"));

static RE_DK_SECTION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^a-z_]+").expect("valid regex"));
static RE_DK_SECTION_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_:-]+$").expect("valid regex"));
static RE_DK_INVALID_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_:-]+").expect("valid regex"));

static RE_DV_CONTROL_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1f]+").expect("valid regex"));

/// Normalize a metric name into a metric key.
///
/// Returns `None` when nothing usable is left of the first section.
pub fn normalize_metric_key(name: &str) -> Option<String> {
    let mut sections = truncate_chars(name, METRIC_KEY_MAX_LENGTH).split('.');

    let mut key = sections
        .next()
        .map(normalize_metric_key_first_section)
        .filter(|section| !section.is_empty())?;

    for section in sections
        .map(normalize_metric_key_section)
        .filter(|section| !section.is_empty())
    {
        key.push('.');
        key.push_str(&section);
    }

    Some(key)
}

/// Normalize an attribute key into a dimension key.
pub fn normalize_dimension_key(key: &str) -> Option<String> {
    let sections: Vec<String> = truncate_chars(key, DIMENSION_KEY_MAX_LENGTH)
        .split('.')
        .map(normalize_dimension_key_section)
        .filter(|section| !section.is_empty())
        .collect();

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("."))
    }
}

/// Normalize and escape an attribute value into a dimension value.
///
/// Control characters are dropped at the ends and collapsed into `_`
/// elsewhere. Escaping never pushes the result past the length limit: an
/// escaped pair that would not fit is cut off together with everything
/// after it.
pub fn normalize_dimension_value(value: &str) -> Option<String> {
    let truncated = truncate_chars(value, DIMENSION_VALUE_MAX_LENGTH);
    let trimmed = truncated.trim_matches(is_control_character);
    let cleaned = RE_DV_CONTROL_CHARACTERS.replace_all(trimmed, "_");

    let mut escaped = String::with_capacity(cleaned.len());
    let mut length = 0usize;
    for c in cleaned.chars() {
        let needs_escape = matches!(c, '=' | ' ' | ',' | '\\' | '"');
        let width = if needs_escape { 2 } else { 1 };
        if length + width > DIMENSION_VALUE_MAX_LENGTH {
            break;
        }
        length += width;

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    if escaped.is_empty() {
        None
    } else {
        Some(escaped)
    }
}

/// Normalize one dimension; `None` if either key or value is invalid.
pub fn normalize_dimension(dimension: &Dimension) -> Option<Dimension> {
    let key = normalize_dimension_key(&dimension.key)?;
    let value = normalize_dimension_value(&dimension.value)?;
    Some(Dimension { key, value })
}

/// Normalize a list of dimensions, dropping the invalid ones.
pub fn normalize_dimensions(dimensions: &[Dimension]) -> Vec<Dimension> {
    dimensions.iter().filter_map(normalize_dimension).collect()
}

fn normalize_metric_key_first_section(section: &str) -> String {
    normalize_metric_key_section(&RE_MK_FIRST_SECTION_START.replace(section, ""))
}

fn normalize_metric_key_section(section: &str) -> String {
    let section = RE_MK_SECTION_START.replace(section, "");
    let section = RE_MK_SECTION_END.replace(&section, "");
    RE_MK_INVALID_CHARACTERS.replace_all(&section, "_").into_owned()
}

fn normalize_dimension_key_section(section: &str) -> String {
    let section = section.to_lowercase();
    let section = RE_DK_SECTION_START.replace(&section, "");
    let section = RE_DK_SECTION_END.replace(&section, "");
    RE_DK_INVALID_CHARACTERS.replace_all(&section, "_").into_owned()
}

fn is_control_character(c: char) -> bool {
    c <= '\u{1f}'
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

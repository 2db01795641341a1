//! The sole text sanitizer. Every text field passes through `clean_text`
//! before length caps are applied.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref ENTITY_RE: Regex =
        Regex::new(r"&(#[0-9]{1,7}|#x[0-9A-Fa-f]{1,6}|[A-Za-z][A-Za-z0-9]{1,30});").unwrap();
}

/// Strip XML tags, drop NUL and control characters (newline and tab
/// excepted), decode HTML entities, collapse whitespace runs to a single
/// space, and trim.
pub fn clean_text(raw: &str) -> String {
    let stripped = strip_tags(raw);
    let mut filtered = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        if ch == '\0' || (ch.is_control() && ch != '\n' && ch != '\t') {
            continue;
        }
        filtered.push(ch);
    }
    let decoded = decode_entities(&filtered);
    let collapsed = WS_RE.replace_all(&decoded, " ");
    collapsed.trim().to_string()
}

/// Replace every XML tag with a space so adjacent words do not fuse.
pub fn strip_tags(raw: &str) -> Cow<'_, str> {
    TAG_RE.replace_all(raw, " ")
}

/// Decode numeric character references and the common named entities found
/// in USPTO text. Unknown entities are left untouched.
pub fn decode_entities(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &regex::Captures| {
            let body = &caps[1];
            if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                return u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default();
            }
            if let Some(dec) = body.strip_prefix('#') {
                return dec
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default();
            }
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                "ndash" => "\u{2013}".to_string(),
                "mdash" => "\u{2014}".to_string(),
                "deg" => "\u{b0}".to_string(),
                "plusmn" => "\u{b1}".to_string(),
                "times" => "\u{d7}".to_string(),
                "divide" => "\u{f7}".to_string(),
                "micro" => "\u{b5}".to_string(),
                "middot" => "\u{b7}".to_string(),
                "sect" => "\u{a7}".to_string(),
                "prime" => "\u{2032}".to_string(),
                "Prime" => "\u{2033}".to_string(),
                other => format!("&{};", other),
            }
        })
        .into_owned()
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
pub fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Accepts the four date spellings seen across schema generations. A bare
/// year resolves to January 1st.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let v = raw.trim();
    if v.is_empty() {
        return None;
    }
    for fmt in ["%Y%m%d", "%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(v, fmt) {
            return Some(d);
        }
    }
    if v.len() == 4 && v.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(v.parse().ok()?, 1, 1);
    }
    None
}

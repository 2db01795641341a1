//! Paragraph-numbered description synthesis.
//!
//! Every generation of the corpus is normalized into text of the form
//! `[0001] …\n\n[0002] …`, regardless of whether the source tagged its
//! paragraphs, numbered them, or did neither.

use lazy_static::lazy_static;
use regex::Regex;

use crate::text;

lazy_static! {
    static ref SUBDOC_DESC_RE: Regex = Regex::new(
        r"(?is)<(?:[a-z][a-z0-9_-]*:)?subdoc-description(?:\s[^>]*)?>(.*?)</(?:[a-z][a-z0-9_-]*:)?subdoc-description\s*>"
    )
    .unwrap();
    static ref DESC_RE: Regex = Regex::new(
        r"(?is)<(?:[a-z][a-z0-9_-]*:)?description(?:\s[^>]*)?>(.*?)</(?:[a-z][a-z0-9_-]*:)?description\s*>"
    )
    .unwrap();
    static ref PARAGRAPH_RE: Regex = Regex::new(
        r"(?is)<(?:[a-z][a-z0-9_-]*:)?paragraph((?:\s[^>]*)?)>(.*?)</(?:[a-z][a-z0-9_-]*:)?paragraph\s*>"
    )
    .unwrap();
    static ref P_RE: Regex = Regex::new(
        r"(?is)<(?:[a-z][a-z0-9_-]*:)?p\b((?:\s[^>]*)?)>(.*?)</(?:[a-z][a-z0-9_-]*:)?p\s*>"
    )
    .unwrap();
    static ref PARA_RE: Regex = Regex::new(
        r"(?is)<(?:[a-z][a-z0-9_-]*:)?para\b((?:\s[^>]*)?)>(.*?)</(?:[a-z][a-z0-9_-]*:)?para\s*>"
    )
    .unwrap();
    // The trailing digits of an id attribute, e.g. id="P-00012".
    static ref ID_ATTR_RE: Regex = Regex::new(r#"(?i)id="[^"]*?(\d{3,5})""#).unwrap();
    static ref NUM_ATTR_RE: Regex = Regex::new(r#"(?i)num="(\d{3,5})""#).unwrap();
    // <number>/<num> children duplicate the bracket tag we synthesize.
    static ref EMBEDDED_NUM_RE: Regex =
        Regex::new(r"(?is)<(?:number|num)(?:\s[^>]*)?>.*?</(?:number|num)\s*>").unwrap();
    static ref CLOSING_PARA_RE: Regex =
        Regex::new(r"(?i)</(?:paragraph|para|p)\s*>").unwrap();
    // A sentence terminator followed by whitespace and an uppercase letter
    // or digit. Used only when no tagged paragraphs exist.
    static ref SENTENCE_SPLIT_RE: Regex = Regex::new(r"([.!?])\s+([A-Z0-9])").unwrap();
    static ref BREAK_RE: Regex = Regex::new(r"\n{2,}").unwrap();
}

/// Locate the description block, `<…subdoc-description>` first.
pub fn extract_block(xml: &str) -> Option<String> {
    SUBDOC_DESC_RE
        .captures(xml)
        .or_else(|| DESC_RE.captures(xml))
        .map(|c| c[1].to_string())
}

/// Produce the paragraph-numbered description for a block, or an empty
/// string when the block carries no text.
pub fn synthesize(block: &str) -> String {
    let paragraphs = segment(block);
    if paragraphs.is_empty() {
        let whole = text::clean_text(block);
        if whole.is_empty() {
            return String::new();
        }
        return format!("[0001] {}", whole);
    }

    let mut next = 1u32;
    let mut out = Vec::with_capacity(paragraphs.len());
    for (explicit, body) in paragraphs {
        let n = explicit.unwrap_or(next);
        next = n + 1;
        out.push(format!("[{:04}] {}", n, body));
    }
    out.join("\n\n")
}

/// Split a block into `(explicit number, cleaned text)` segments. Tagged
/// paragraph elements win; the sentence-boundary heuristic is the last
/// resort for untagged 2001-vintage text.
fn segment(block: &str) -> Vec<(Option<u32>, String)> {
    for re in [&*PARAGRAPH_RE, &*P_RE, &*PARA_RE] {
        let mut found = Vec::new();
        for caps in re.captures_iter(block) {
            let attrs = &caps[1];
            let inner = EMBEDDED_NUM_RE.replace_all(&caps[2], " ");
            let cleaned = text::clean_text(&inner);
            if cleaned.is_empty() {
                continue;
            }
            found.push((paragraph_number(attrs), cleaned));
        }
        if !found.is_empty() {
            return found;
        }
    }
    heuristic_segment(block)
}

fn paragraph_number(attrs: &str) -> Option<u32> {
    ID_ATTR_RE
        .captures(attrs)
        .or_else(|| NUM_ATTR_RE.captures(attrs))
        .and_then(|c| c[1].parse().ok())
}

fn heuristic_segment(block: &str) -> Vec<(Option<u32>, String)> {
    let broken = CLOSING_PARA_RE.replace_all(block, "\n\n");
    let stripped = text::strip_tags(&broken);
    let split = SENTENCE_SPLIT_RE.replace_all(&stripped, "$1\n\n$2");
    BREAK_RE
        .split(&split)
        .map(text::clean_text)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| (None, chunk))
        .collect()
}

const CLAIMS_MARK: &str = "CLAIMS:\n";
const DESC_MARK: &str = "DESCRIPTION:\n";
const DESC_SEP: &str = "\n\nDESCRIPTION:\n";

/// `"CLAIMS:\n" + first-10-claims + "\n\nDESCRIPTION:\n" + numbered text`.
/// Either half may be absent; both absent yields the empty string.
pub fn combine(claims: &[String], numbered_description: &str) -> String {
    let mut out = String::new();
    if !claims.is_empty() {
        out.push_str(CLAIMS_MARK);
        let shown: Vec<&str> = claims
            .iter()
            .take(crate::record::CLAIMS_IN_COMBINED)
            .map(String::as_str)
            .collect();
        out.push_str(&shown.join("\n\n"));
    }
    if !numbered_description.is_empty() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(DESC_MARK);
        out.push_str(numbered_description);
    }
    out
}

/// Split a combined block back into `(claims_text, description_body)` for
/// storage. Without any marker the whole text is the description body.
pub fn split_combined(combined: &str) -> (String, String) {
    if let Some(rest) = combined.strip_prefix(CLAIMS_MARK) {
        return match rest.find(DESC_SEP) {
            Some(i) => (
                rest[..i].to_string(),
                rest[i + DESC_SEP.len()..].to_string(),
            ),
            None => (rest.to_string(), String::new()),
        };
    }
    if let Some(rest) = combined.strip_prefix(DESC_MARK) {
        return (String::new(), rest.to_string());
    }
    (String::new(), combined.to_string())
}

//! Tolerant regex parser. The DTDs drifted enough over 25 years that a
//! single structured binding leaks; anything the structured decoder cannot
//! handle lands here. All patterns are namespace-agnostic, case-insensitive
//! and multi-line.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::record::{Party, MAX_CLAIMS, MAX_PARTIES};
use crate::text;

const NS: &str = r"(?:[a-zA-Z][a-zA-Z0-9_-]*:)?";

fn block_re(tag: &str) -> Regex {
    Regex::new(&format!(
        r"(?is)<{ns}{tag}(?:\s[^>]*)?>(.*?)</{ns}{tag}\s*>",
        ns = NS,
        tag = tag
    ))
    .unwrap()
}

lazy_static! {
    static ref DOC_NUMBER_RE: Regex = block_re("doc-number");
    static ref PUB_REF_RE: Regex = block_re("publication-reference");
    static ref APP_REF_RE: Regex = block_re("application-reference");
    static ref DOMESTIC_FILING_RE: Regex = block_re("domestic-filing-data");
    static ref APP_NUMBER_RE: Regex = block_re("application-number");
    static ref TITLE_RE: Regex = block_re("invention-title");
    static ref LEGACY_TITLE_RE: Regex = block_re("title-of-invention");
    static ref ABSTRACT_RE: Regex = block_re("abstract");
    static ref LEGACY_ABSTRACT_RE: Regex = block_re("subdoc-abstract");
    static ref KIND_RE: Regex = block_re("kind");
    static ref LEGACY_KIND_RE: Regex = block_re("kind-code");
    static ref DATE_RE: Regex = block_re("date");
    static ref DOCUMENT_DATE_RE: Regex = block_re("document-date");
    static ref FILING_DATE_RE: Regex = block_re("filing-date");
    static ref CLAIM_TEXT_RE: Regex = block_re("claim-text");
    static ref CLAIMS_BLOCK_RE: Regex = block_re("claims");
    static ref CLAIM_RE: Regex = block_re("claim");
    static ref INVENTOR_RE: Regex = block_re("(?:first-named-)?inventor");
    static ref APPLICANT_RE: Regex = block_re("applicant");
    static ref ASSIGNEE_RE: Regex = block_re("assignee");
    static ref GIVEN_RE: Regex = block_re("given-name");
    static ref FAMILY_RE: Regex = block_re("family-name");
    static ref ORGNAME_RE: Regex = block_re("orgname");
    static ref CITY_RE: Regex = block_re("city");
    static ref COUNTRY_RE: Regex = block_re("country");
    static ref NAME_1_RE: Regex = block_re("name-1");
    static ref NAME_2_RE: Regex = block_re("name-2");
    static ref PATH_PUB_ID_RE: Regex = Regex::new(r"US(\d+)").unwrap();
    static ref PATH_KIND_RE: Regex = Regex::new(r"(?i)US\d+([A-Z]\d?)[-.]").unwrap();
    static ref DOC_KIND_SUFFIX_RE: Regex = Regex::new(r"[A-Z]\d?$").unwrap();
}

fn first_inner<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    re.captures(haystack).map(|c| c.get(1).unwrap().as_str())
}

/// `US(\d+)` in a synthetic path, the highest-priority pub-id source.
pub fn pub_id_from_path(path: &str) -> Option<String> {
    PATH_PUB_ID_RE
        .captures(path)
        .map(|c| c[1].to_string())
        .filter(|id| !id.is_empty())
}

pub fn kind_from_path(path: &str) -> Option<String> {
    PATH_KIND_RE.captures(path).map(|c| c[1].to_string())
}

/// Any `<doc-number>` in the document, preferring one scoped to the
/// publication reference. Legacy doc-numbers carry the country prefix and
/// kind-code suffix inline (`US20030050000A1`); both are stripped so every
/// pub-id tier converges on the same identifier for the same document.
pub fn extract_pub_id(xml: &str) -> Option<String> {
    let scoped = first_inner(&PUB_REF_RE, xml).and_then(|b| first_inner(&DOC_NUMBER_RE, b));
    let raw = scoped.or_else(|| first_inner(&DOC_NUMBER_RE, xml))?;
    let trimmed = raw.trim().trim_start_matches("US");
    let id = DOC_KIND_SUFFIX_RE.replace(trimmed, "").into_owned();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

pub fn extract_kind(xml: &str) -> String {
    first_inner(&KIND_RE, xml)
        .or_else(|| first_inner(&LEGACY_KIND_RE, xml))
        .map(|k| k.trim().to_string())
        .unwrap_or_default()
}

pub fn extract_title(xml: &str) -> String {
    first_inner(&TITLE_RE, xml)
        .or_else(|| first_inner(&LEGACY_TITLE_RE, xml))
        .map(text::clean_text)
        .unwrap_or_default()
}

pub fn extract_abstract(xml: &str) -> String {
    first_inner(&ABSTRACT_RE, xml)
        .or_else(|| first_inner(&LEGACY_ABSTRACT_RE, xml))
        .map(text::clean_text)
        .unwrap_or_default()
}

/// Cross-schema application number, digits only. Tried in order:
/// `<application-reference>` first `<doc-number>`, then
/// `<domestic-filing-data>` first `<application-number>…<doc-number>`.
pub fn extract_application_number(xml: &str) -> String {
    if let Some(block) = first_inner(&APP_REF_RE, xml) {
        if let Some(num) = first_inner(&DOC_NUMBER_RE, block) {
            let digits = text::digits_only(num);
            if !digits.is_empty() {
                return digits;
            }
        }
    }
    if let Some(block) = first_inner(&DOMESTIC_FILING_RE, xml) {
        if let Some(app) = first_inner(&APP_NUMBER_RE, block) {
            if let Some(num) = first_inner(&DOC_NUMBER_RE, app) {
                let digits = text::digits_only(num);
                if !digits.is_empty() {
                    return digits;
                }
            }
        }
    }
    String::new()
}

pub fn extract_pub_date(xml: &str) -> Option<NaiveDate> {
    first_inner(&PUB_REF_RE, xml)
        .and_then(|b| first_inner(&DATE_RE, b))
        .or_else(|| first_inner(&DOCUMENT_DATE_RE, xml))
        .and_then(text::parse_date)
}

pub fn extract_filing_date(xml: &str) -> Option<NaiveDate> {
    first_inner(&APP_REF_RE, xml)
        .and_then(|b| first_inner(&DATE_RE, b))
        .or_else(|| first_inner(&FILING_DATE_RE, xml))
        .and_then(text::parse_date)
}

/// All `<claim-text>` elements, else `<claims><claim>` blocks. Capped.
pub fn extract_claims(xml: &str) -> Vec<String> {
    let mut claims: Vec<String> = CLAIM_TEXT_RE
        .captures_iter(xml)
        .map(|c| text::clean_text(c.get(1).unwrap().as_str()))
        .filter(|c| !c.is_empty())
        .collect();
    if claims.is_empty() {
        if let Some(block) = first_inner(&CLAIMS_BLOCK_RE, xml) {
            claims = CLAIM_RE
                .captures_iter(block)
                .map(|c| text::clean_text(c.get(1).unwrap().as_str()))
                .filter(|c| !c.is_empty())
                .collect();
        }
    }
    claims.truncate(MAX_CLAIMS);
    claims
}

fn party_from_block(block: &str) -> Option<Party> {
    let given = first_inner(&GIVEN_RE, block).map(text::clean_text);
    let family = first_inner(&FAMILY_RE, block).map(text::clean_text);
    let name = match (given, family) {
        (Some(g), Some(f)) => format!("{} {}", g, f).trim().to_string(),
        (Some(g), None) => g,
        (None, Some(f)) => f,
        (None, None) => {
            let first = first_inner(&NAME_1_RE, block).map(text::clean_text);
            let last = first_inner(&NAME_2_RE, block).map(text::clean_text);
            format!(
                "{} {}",
                first.unwrap_or_default(),
                last.unwrap_or_default()
            )
            .trim()
            .to_string()
        }
    };
    if name.is_empty() {
        return None;
    }
    let mut party = Party::individual(name);
    fill_address(&mut party, block);
    Some(party)
}

fn fill_address(party: &mut Party, block: &str) {
    if let Some(city) = first_inner(&CITY_RE, block).map(text::clean_text) {
        if !city.is_empty() {
            party.city = Some(city);
        }
    }
    if let Some(country) = first_inner(&COUNTRY_RE, block).map(text::clean_text) {
        if !country.is_empty() {
            party.country = Some(country);
        }
    }
}

pub fn extract_inventors(xml: &str) -> Vec<Party> {
    let mut out: Vec<Party> = INVENTOR_RE
        .captures_iter(xml)
        .filter_map(|c| party_from_block(c.get(1).unwrap().as_str()))
        .collect();
    if out.is_empty() {
        out = APPLICANT_RE
            .captures_iter(xml)
            .filter_map(|c| party_from_block(c.get(1).unwrap().as_str()))
            .collect();
    }
    out.truncate(MAX_PARTIES);
    out
}

/// Assignees prefer `<orgname>`; individual-name fallbacks keep the
/// `individual` type.
pub fn extract_assignees(xml: &str) -> Vec<Party> {
    let mut out: Vec<Party> = ASSIGNEE_RE
        .captures_iter(xml)
        .filter_map(|c| {
            let block = c.get(1).unwrap().as_str();
            if let Some(org) = first_inner(&ORGNAME_RE, block).map(text::clean_text) {
                if !org.is_empty() {
                    let mut party = Party::organization(org);
                    fill_address(&mut party, block);
                    return Some(party);
                }
            }
            party_from_block(block)
        })
        .collect();
    out.truncate(MAX_PARTIES);
    out
}

//! Structured decoder for the post-2004 schema generations. Walks the
//! document as a quick-xml event stream, matching on local element names so
//! namespace prefixes are irrelevant. Legacy generations fail here (no
//! `publication-reference`) and flow to the regex fallback.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;

use crate::record::Party;
use crate::text;
use crate::ParseError;

#[derive(Debug, Default)]
pub struct StructuredDoc {
    pub pub_id: String,
    pub kind: String,
    pub pub_date_raw: String,
    pub filing_date_raw: String,
    pub title: String,
    pub abstract_text: String,
    pub inventors: Vec<Party>,
    pub assignees: Vec<Party>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PartyCtx {
    Inventor,
    Applicant,
    Assignee,
}

#[derive(Debug, Default)]
struct PartyBuilder {
    given: String,
    family: String,
    orgname: String,
    city: String,
    country: String,
}

impl PartyBuilder {
    fn person_name(&self) -> String {
        let name = format!("{} {}", self.given.trim(), self.family.trim());
        name.trim().to_string()
    }

    fn finish(self, ctx: PartyCtx) -> Option<Party> {
        let mut party = match ctx {
            PartyCtx::Assignee if !self.orgname.trim().is_empty() => {
                Party::organization(text::clean_text(&self.orgname))
            }
            _ => {
                let name = self.person_name();
                if name.is_empty() && !self.orgname.trim().is_empty() {
                    // Some assignee records carry only an orgname even in
                    // inventor position; treat the orgname as the name.
                    Party::organization(text::clean_text(&self.orgname))
                } else {
                    Party::individual(text::clean_text(&name))
                }
            }
        };
        if party.name.is_empty() {
            return None;
        }
        let city = text::clean_text(&self.city);
        let country = text::clean_text(&self.country);
        if !city.is_empty() {
            party.city = Some(city);
        }
        if !country.is_empty() {
            party.country = Some(country);
        }
        Some(party)
    }
}

fn local_start(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

fn local_end(e: &BytesEnd) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

/// Decode one document. Returns `ParseError::MissingPubId` when the walk
/// finds no `publication-reference/document-id/doc-number`, which is the
/// signal to try the tolerant fallback parser.
pub fn decode(xml: &str) -> Result<StructuredDoc, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut doc = StructuredDoc::default();
    let mut stack: Vec<String> = Vec::new();
    let mut party: Option<(PartyCtx, PartyBuilder)> = None;
    let mut applicants: Vec<Party> = Vec::new();

    loop {
        match reader.read_event() {
            Err(err) => return Err(ParseError::Xml(err)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = local_start(&e);
                match name.as_str() {
                    "inventor" => party = Some((PartyCtx::Inventor, PartyBuilder::default())),
                    "applicant" => party = Some((PartyCtx::Applicant, PartyBuilder::default())),
                    "assignee" => party = Some((PartyCtx::Assignee, PartyBuilder::default())),
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::End(e)) => {
                let name = local_end(&e);
                // Pop through any unclosed children left on the stack.
                while let Some(top) = stack.pop() {
                    if top == name {
                        break;
                    }
                }
                match name.as_str() {
                    "inventor" | "applicant" | "assignee" => {
                        if let Some((ctx, builder)) = party.take() {
                            if let Some(p) = builder.finish(ctx) {
                                match ctx {
                                    PartyCtx::Inventor => doc.inventors.push(p),
                                    PartyCtx::Applicant => applicants.push(p),
                                    PartyCtx::Assignee => doc.assignees.push(p),
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                absorb(&mut doc, &mut party, &stack, &raw);
            }
            Ok(Event::CData(t)) => {
                let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                absorb(&mut doc, &mut party, &stack, &raw);
            }
            Ok(_) => {}
        }
    }

    // 2005-2010 publications list inventors only as applicants.
    if doc.inventors.is_empty() {
        doc.inventors = applicants;
    }

    if doc.pub_id.is_empty() {
        return Err(ParseError::MissingPubId);
    }
    Ok(doc)
}

fn absorb(
    doc: &mut StructuredDoc,
    party: &mut Option<(PartyCtx, PartyBuilder)>,
    stack: &[String],
    raw: &str,
) {
    if raw.trim().is_empty() {
        return;
    }
    let within = |name: &str| stack.iter().any(|s| s == name);
    let leaf = match stack.last() {
        Some(l) => l.as_str(),
        None => return,
    };

    if let Some((_, builder)) = party.as_mut() {
        match leaf {
            "given-name" | "first-name" => builder.given.push_str(raw),
            "family-name" | "last-name" => builder.family.push_str(raw),
            "orgname" | "organization-name" => builder.orgname.push_str(raw),
            "city" => builder.city.push_str(raw),
            "country" => builder.country.push_str(raw),
            _ => {}
        }
        return;
    }

    match leaf {
        "doc-number" if within("publication-reference") => {
            if doc.pub_id.is_empty() {
                doc.pub_id = raw.trim().trim_start_matches("US").to_string();
            }
        }
        "kind" if within("publication-reference") => {
            if doc.kind.is_empty() {
                doc.kind = raw.trim().to_string();
            }
        }
        "date" if within("publication-reference") => {
            if doc.pub_date_raw.is_empty() {
                doc.pub_date_raw = raw.trim().to_string();
            }
        }
        "date" if within("application-reference") => {
            if doc.filing_date_raw.is_empty() {
                doc.filing_date_raw = raw.trim().to_string();
            }
        }
        _ => {}
    }

    if within("invention-title") {
        doc.title.push_str(raw);
    } else if within("abstract") || within("subdoc-abstract") {
        doc.abstract_text.push_str(raw);
        doc.abstract_text.push(' ');
    }
}

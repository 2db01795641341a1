use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Byte ceilings for bounded text fields. Truncation is silent and always
/// lands on a UTF-8 character boundary at or below the ceiling.
pub const MAX_TITLE_BYTES: usize = 500;
pub const MAX_ABSTRACT_BYTES: usize = 5_000;
pub const MAX_COMBINED_BYTES: usize = 150_000;

/// Caps on repeated elements.
pub const MAX_CLAIMS: usize = 50;
pub const CLAIMS_IN_COMBINED: usize = 10;
pub const MAX_PARTIES: usize = 50;

/// Which USPTO corpus a document belongs to. Publications and grants have
/// disjoint number spaces and are stored in separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Publication,
    Grant,
}

impl DocKind {
    pub fn table(&self) -> &'static str {
        match self {
            DocKind::Publication => "patent_data_unified",
            DocKind::Grant => "patent_grants",
        }
    }
}

impl Default for DocKind {
    fn default() -> Self {
        DocKind::Publication
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyType {
    Individual,
    Organization,
}

/// An inventor or assignee. Serialized into the JSONB `inventors` /
/// `assignees` columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    #[serde(rename = "type")]
    pub party_type: PartyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Party {
    pub fn individual(name: String) -> Self {
        Party {
            name,
            party_type: PartyType::Individual,
            city: None,
            country: None,
        }
    }

    pub fn organization(name: String) -> Self {
        Party {
            name,
            party_type: PartyType::Organization,
            city: None,
            country: None,
        }
    }
}

/// The one shape every schema generation normalizes into. A record is only
/// emitted when `pub_id` is non-empty; every other field is best-effort.
#[derive(Debug, Clone, Default)]
pub struct CanonicalRecord {
    pub pub_id: String,
    pub doc_kind: DocKind,
    /// Kind code, e.g. A1/B2/D/S.
    pub kind: String,
    pub title: String,
    pub abstract_text: String,
    /// Individual claim texts. Retained in memory for the combined block;
    /// the store keeps only the derived `claims_text` split.
    pub claims: Vec<String>,
    pub description_combined: String,
    pub claims_text: String,
    pub description_body: String,
    pub filing_date: Option<NaiveDate>,
    pub pub_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub application_number: String,
    pub inventors: Vec<Party>,
    pub assignees: Vec<Party>,
    /// Synthetic locator, `<archive-basename>/<path-inside-archive>`. The
    /// round-trip identifier back into the original bulk archive.
    pub raw_xml_path: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn party_json_shape_matches_the_stored_columns() {
        let mut party = Party::individual("Jane Doe".to_string());
        party.city = Some("Austin".to_string());
        assert_eq!(
            serde_json::json!({"name": "Jane Doe", "type": "individual", "city": "Austin"}),
            serde_json::to_value(&party).unwrap()
        );

        let org = Party::organization("Acme Corp".to_string());
        assert_eq!(
            serde_json::json!({"name": "Acme Corp", "type": "organization"}),
            serde_json::to_value(&org).unwrap()
        );
    }

    #[test]
    fn doc_kinds_map_to_their_tables() {
        assert_eq!("patent_data_unified", DocKind::Publication.table());
        assert_eq!("patent_grants", DocKind::Grant.table());
    }
}

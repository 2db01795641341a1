mod description;
mod fallback;
mod parse;
mod record;
mod structured;
mod text;

pub use self::parse::parse_document;
pub use self::record::{
    CanonicalRecord, DocKind, Party, PartyType, CLAIMS_IN_COMBINED, MAX_ABSTRACT_BYTES,
    MAX_CLAIMS, MAX_COMBINED_BYTES, MAX_PARTIES, MAX_TITLE_BYTES,
};
pub use self::text::clean_text;

/// Error type for the structured decode attempt. A failure here is not a
/// record failure; it routes the document to the fallback parser.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("no publication identifier in document")]
    MissingPubId,
}

//! Batched UPSERTs with content-preserving merge semantics.
//!
//! Fill-only: a stored column is replaced only when it is null (or blank,
//! for text). Force-overwrite lifts that restriction for exactly the three
//! derived description fields so a parser improvement can refresh bulk text
//! without touching metadata.

use std::fmt;

use patent_xml::{CanonicalRecord, Party};
use sqlx::postgres::PgPool;
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Duplicate,
    InvalidJson,
    ValueTooLong,
    ForeignKey,
    Other,
}

impl ErrorClass {
    /// Substring classification of the store's error message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("duplicate key") {
            ErrorClass::Duplicate
        } else if lower.contains("invalid input syntax for type json")
            || lower.contains("invalid json")
        {
            ErrorClass::InvalidJson
        } else if lower.contains("value too long") {
            ErrorClass::ValueTooLong
        } else if lower.contains("foreign key") {
            ErrorClass::ForeignKey
        } else {
            ErrorClass::Other
        }
    }

    pub fn all() -> [ErrorClass; 5] {
        [
            ErrorClass::Duplicate,
            ErrorClass::InvalidJson,
            ErrorClass::ValueTooLong,
            ErrorClass::ForeignKey,
            ErrorClass::Other,
        ]
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Duplicate => "duplicate",
            ErrorClass::InvalidJson => "invalid-json",
            ErrorClass::ValueTooLong => "value-too-long",
            ErrorClass::ForeignKey => "foreign-key",
            ErrorClass::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct RecordFailure {
    pub pub_id: String,
    pub class: ErrorClass,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: u64,
    pub failures: Vec<RecordFailure>,
}

/// One transaction for the whole batch. Record-level failures are skipped
/// and reported in the outcome; a commit failure fails the batch.
pub async fn upsert_batch(
    pool: &PgPool,
    records: &[CanonicalRecord],
    force: bool,
) -> sqlx::Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    if records.is_empty() {
        return Ok(outcome);
    }

    let mut txn = pool.begin().await?;
    for record in records {
        let sql = upsert_sql(record.doc_kind.table(), force);
        let result = bind_record(sqlx::query(&sql), record)
            .execute(&mut *txn)
            .await;
        match result {
            Ok(_) => outcome.inserted += 1,
            Err(err) => {
                let message = err.to_string();
                let class = ErrorClass::classify(&message);
                tracing::warn!(pub_id = %record.pub_id, %class, error = %message, "record upsert failed");
                outcome.failures.push(RecordFailure {
                    pub_id: record.pub_id.clone(),
                    class,
                    message,
                });
            }
        }
    }
    txn.commit().await?;
    Ok(outcome)
}

type PgQuery<'q> =
    sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

fn bind_record<'q>(query: PgQuery<'q>, record: &'q CanonicalRecord) -> PgQuery<'q> {
    query
        .bind(record.pub_id.as_str())
        .bind(blank_to_null(&record.kind))
        .bind(blank_to_null(&record.title))
        .bind(blank_to_null(&record.abstract_text))
        .bind(record.description_combined.as_str())
        .bind(record.claims_text.as_str())
        .bind(record.description_body.as_str())
        .bind(record.filing_date)
        .bind(record.pub_date)
        .bind(record.year)
        .bind(blank_to_null(&record.application_number))
        .bind(parties_to_null(&record.inventors))
        .bind(parties_to_null(&record.assignees))
        .bind(record.raw_xml_path.as_str())
}

/// Blank strings insert as NULL so fill-only coalescing stays symmetric.
fn blank_to_null(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parties_to_null(parties: &[Party]) -> Option<Json<&[Party]>> {
    if parties.is_empty() {
        None
    } else {
        Some(Json(parties))
    }
}

fn upsert_sql(table: &str, force: bool) -> String {
    let description_merge = if force {
        "description_combined = excluded.description_combined,
             claims_text = excluded.claims_text,
             description_body = excluded.description_body"
            .to_string()
    } else {
        format!(
            "description_combined = coalesce(nullif({t}.description_combined, ''), excluded.description_combined),
             claims_text = coalesce(nullif({t}.claims_text, ''), excluded.claims_text),
             description_body = coalesce(nullif({t}.description_body, ''), excluded.description_body)",
            t = table
        )
    };
    format!(
        "insert into {t} (
            pub_id, kind, title, abstract,
            description_combined, claims_text, description_body,
            filing_date, pub_date, year, application_number,
            inventors, assignees, raw_xml_path
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        on conflict (pub_id) do update set
            kind = coalesce(nullif({t}.kind, ''), excluded.kind),
            title = coalesce(nullif({t}.title, ''), excluded.title),
            abstract = coalesce(nullif({t}.abstract, ''), excluded.abstract),
            {description_merge},
            filing_date = coalesce({t}.filing_date, excluded.filing_date),
            pub_date = coalesce({t}.pub_date, excluded.pub_date),
            year = coalesce({t}.year, excluded.year),
            application_number = coalesce(nullif({t}.application_number, ''), excluded.application_number),
            inventors = coalesce({t}.inventors, excluded.inventors),
            assignees = coalesce({t}.assignees, excluded.assignees),
            raw_xml_path = coalesce({t}.raw_xml_path, excluded.raw_xml_path)",
        t = table,
        description_merge = description_merge,
    )
}

//! Extraction-record repository — one write-once row per uploaded image.

use chrono::Utc;
use rusqlite::{params, Row};
use serde::Serialize;

use super::{Database, DatabaseError};

/// A raw extraction record. Immutable once written; superseding an
/// extraction requires a new image.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRow {
    pub id: i64,
    pub image_id: i64,
    pub extracted_text: String,
    pub confidence: f64,
    pub language: String,
    pub extraction_date: String,
}

impl ExtractionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            image_id: row.get("image_id")?,
            extracted_text: row.get("extracted_text")?,
            confidence: row.get("confidence")?,
            language: row.get("language")?,
            extraction_date: row.get("extraction_date")?,
        })
    }
}

/// Inserts the extraction record for an image. Returns the assigned id.
/// The UNIQUE constraint on `image_id` enforces at most one record per image.
pub fn insert(
    db: &Database,
    image_id: i64,
    extracted_text: &str,
    confidence: f64,
    language: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO extraction_records (image_id, extracted_text, confidence, language, extraction_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                image_id,
                extracted_text,
                confidence,
                language,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds the extraction record for an image.
pub fn find_by_image(db: &Database, image_id: i64) -> Result<Option<ExtractionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM extraction_records WHERE image_id = ?1")?;
        let mut rows = stmt.query_map(params![image_id], ExtractionRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

//! Uploaded-image repository — CRUD for the `uploaded_images` table.

use chrono::Utc;
use rusqlite::{params, Row};
use serde::Serialize;

use super::{Database, DatabaseError};

/// Lifecycle states of an uploaded image. Only the upload flow mutates
/// them; listings and the verification UI never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str, image_id: i64) -> Self {
        match s {
            "pending" => ProcessingStatus::Pending,
            "processing" => ProcessingStatus::Processing,
            "completed" => ProcessingStatus::Completed,
            "failed" => ProcessingStatus::Failed,
            other => {
                log::warn!(
                    "Unknown processing status '{}' for image {}, defaulting to pending",
                    other,
                    image_id
                );
                ProcessingStatus::Pending
            }
        }
    }
}

/// A raw uploaded-image row.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRow {
    pub id: i64,
    pub filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub processing_status: String,
    pub error_message: Option<String>,
    pub upload_date: String,
}

impl ImageRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            file_size: row.get("file_size")?,
            mime_type: row.get("mime_type")?,
            processing_status: row.get("processing_status")?,
            error_message: row.get("error_message")?,
            upload_date: row.get("upload_date")?,
        })
    }
}

/// One row of the image listing, joined with its extraction record.
#[derive(Debug, Clone, Serialize)]
pub struct ImageListing {
    pub id: i64,
    pub filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub upload_date: String,
    pub processing_status: String,
    pub error_message: Option<String>,
    pub extracted_text: Option<String>,
    pub confidence: Option<f64>,
    pub language: Option<String>,
    pub extraction_date: Option<String>,
}

impl ImageListing {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            file_size: row.get("file_size")?,
            mime_type: row.get("mime_type")?,
            upload_date: row.get("upload_date")?,
            processing_status: row.get("processing_status")?,
            error_message: row.get("error_message")?,
            extracted_text: row.get("extracted_text")?,
            confidence: row.get("confidence")?,
            language: row.get("language")?,
            extraction_date: row.get("extraction_date")?,
        })
    }
}

/// One hit of a search over extracted text.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub filename: String,
    pub upload_date: String,
    pub extracted_text: String,
    pub confidence: f64,
}

/// Inserts a new image in the `pending` state. Returns the assigned id.
pub fn insert(
    db: &Database,
    filename: &str,
    file_size: i64,
    mime_type: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO uploaded_images (filename, file_size, mime_type, processing_status, upload_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                filename,
                file_size,
                mime_type,
                ProcessingStatus::Pending.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Updates the processing status, replacing any previous error message.
pub fn update_status(
    db: &Database,
    id: i64,
    status: ProcessingStatus,
    error_message: Option<&str>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE uploaded_images SET processing_status = ?2, error_message = ?3 WHERE id = ?1",
            params![id, status.as_str(), error_message],
        )?;
        Ok(())
    })
}

/// Finds an image by its id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<ImageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM uploaded_images WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], ImageRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all images newest first, joined with their extraction records.
pub fn list_with_extraction(db: &Database) -> Result<Vec<ImageListing>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT
                ui.id, ui.filename, ui.file_size, ui.mime_type, ui.upload_date,
                ui.processing_status, ui.error_message,
                er.extracted_text, er.confidence, er.language, er.extraction_date
             FROM uploaded_images ui
             LEFT JOIN extraction_records er ON ui.id = er.image_id
             ORDER BY ui.upload_date DESC",
        )?;
        let rows: Vec<ImageListing> = stmt
            .query_map([], ImageListing::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Case-insensitive substring search over extracted text, newest first.
pub fn search(db: &Database, query: &str) -> Result<Vec<SearchHit>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT ui.id, ui.filename, ui.upload_date, er.extracted_text, er.confidence
             FROM uploaded_images ui
             INNER JOIN extraction_records er ON ui.id = er.image_id
             WHERE er.extracted_text LIKE ?1
             ORDER BY ui.upload_date DESC",
        )?;
        let pattern = format!("%{}%", query);
        let rows: Vec<SearchHit> = stmt
            .query_map(params![pattern], |row| {
                Ok(SearchHit {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    upload_date: row.get(2)?,
                    extracted_text: row.get(3)?,
                    confidence: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes an image. Extraction records and printing forms cascade.
/// Returns whether a row was removed.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM uploaded_images WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}

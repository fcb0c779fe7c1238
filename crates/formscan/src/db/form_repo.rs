//! Printing-form repository — verified form rows, immutable after creation.

use chrono::Utc;
use rusqlite::{params, Row};
use serde::Serialize;

use super::{Database, DatabaseError};
use crate::fields::FieldSet;

fn fields_from_row(row: &Row<'_>) -> Result<FieldSet, rusqlite::Error> {
    Ok(FieldSet {
        class: row.get("class")?,
        subject: row.get("subject")?,
        teacher_in_charge: row.get("teacher_in_charge")?,
        pages_original_copy: row.get("no_of_pages_original_copy")?,
        copies: row.get("no_of_copies")?,
        total_printed_pages: row.get("total_no_of_printed_pages")?,
        ricoh: row.get("ricoh")?,
        toshiba: row.get("toshiba")?,
    })
}

/// A printing form joined with its source image metadata.
#[derive(Debug, Clone, Serialize)]
pub struct FormListing {
    pub id: i64,
    pub image_id: i64,
    #[serde(flatten)]
    pub fields: FieldSet,
    pub created_at: String,
    pub filename: String,
    pub upload_date: String,
}

impl FormListing {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            image_id: row.get("image_id")?,
            fields: fields_from_row(row)?,
            created_at: row.get("created_at")?,
            filename: row.get("filename")?,
            upload_date: row.get("upload_date")?,
        })
    }
}

/// A single printing form with its raw extracted text attached.
#[derive(Debug, Clone, Serialize)]
pub struct FormDetail {
    #[serde(flatten)]
    pub listing: FormListing,
    pub extracted_text: Option<String>,
}

/// Inserts one verified printing form. Returns the assigned id.
pub fn insert(db: &Database, image_id: i64, fields: &FieldSet) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO printing_forms (
                image_id, class, subject, teacher_in_charge,
                no_of_pages_original_copy, no_of_copies, total_no_of_printed_pages,
                ricoh, toshiba, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                image_id,
                fields.class,
                fields.subject,
                fields.teacher_in_charge,
                fields.pages_original_copy,
                fields.copies,
                fields.total_printed_pages,
                fields.ricoh,
                fields.toshiba,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Lists all printing forms newest first, joined with image metadata.
pub fn list_with_images(db: &Database) -> Result<Vec<FormListing>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT pf.*, ui.filename, ui.upload_date
             FROM printing_forms pf
             INNER JOIN uploaded_images ui ON pf.image_id = ui.id
             ORDER BY pf.created_at DESC",
        )?;
        let rows: Vec<FormListing> = stmt
            .query_map([], FormListing::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds one printing form with its source image and extracted text.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<FormDetail>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT pf.*, ui.filename, ui.upload_date, er.extracted_text
             FROM printing_forms pf
             INNER JOIN uploaded_images ui ON pf.image_id = ui.id
             LEFT JOIN extraction_records er ON pf.image_id = er.image_id
             WHERE pf.id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], |row| {
            Ok(FormDetail {
                listing: FormListing::from_row(row)?,
                extracted_text: row.get("extracted_text")?,
            })
        })?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

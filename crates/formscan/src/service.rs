//! The surface consumed by the HTTP layer: batch upload with per-file
//! isolation, image listings and search, staged verification and the
//! printing-form views.

use std::path::Path;

use log::warn;
use serde::Serialize;

use crate::config::Config;
use crate::db::image_repo::{ImageListing, ImageRow, ProcessingStatus, SearchHit};
use crate::db::{extraction_repo, form_repo, image_repo, Database};
use crate::error::{ExtractError, FormscanError};
use crate::fields::FieldSet;
use crate::pipeline::ExtractionPipeline;
use crate::staging::{PendingVerification, StagingArea, VerifiedRecord};

/// Stored on every extraction record. Extraction provenance is
/// informational; the ensemble's heuristic score only picks between
/// engines and is never persisted.
const STORED_CONFIDENCE: f64 = 0.95;
const STORED_LANGUAGE: &str = "en";

/// One file of an upload batch.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: &str, media_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            media_type: media_type.to_string(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing the media type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        Ok(Self {
            filename,
            media_type,
            bytes,
        })
    }
}

/// Per-file outcome of an upload batch.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub filename: String,
    #[serde(flatten)]
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadStatus {
    Success {
        image_id: i64,
        extracted_text: String,
        fields: FieldSet,
        method: String,
    },
    Failed {
        error: String,
    },
}

/// One image with its extraction records.
#[derive(Debug, Clone, Serialize)]
pub struct ImageDetail {
    pub image: ImageRow,
    pub extraction: Option<extraction_repo::ExtractionRow>,
}

pub struct FormService {
    db: Database,
    pipeline: ExtractionPipeline,
    staging: StagingArea,
}

impl FormService {
    pub fn new(db: Database, config: &Config) -> Result<Self, FormscanError> {
        let pipeline = ExtractionPipeline::from_config(config)?;
        Ok(Self::with_pipeline(db, pipeline))
    }

    /// Builds a service around a prepared pipeline, mainly for tests.
    pub fn with_pipeline(db: Database, pipeline: ExtractionPipeline) -> Self {
        let staging = StagingArea::new();
        log::info!("Form service started (staging session {})", staging.session_id());
        Self {
            db,
            pipeline,
            staging,
        }
    }

    /// The verification staging area for this service instance.
    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Processes an upload batch, one file at a time. A failing file never
    /// aborts its siblings; every file gets its own result.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Vec<UploadResult> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.process_one(file).await);
        }
        results
    }

    async fn process_one(&self, file: UploadFile) -> UploadResult {
        // The media-type check happens before any row is written or any
        // provider is called.
        if !file.media_type.starts_with("image/") {
            return UploadResult {
                filename: file.filename,
                status: UploadStatus::Failed {
                    error: ExtractError::InvalidFileType.to_string(),
                },
            };
        }

        let image_id = match image_repo::insert(
            &self.db,
            &file.filename,
            file.bytes.len() as i64,
            &file.media_type,
        ) {
            Ok(id) => id,
            Err(e) => {
                return UploadResult {
                    filename: file.filename,
                    status: UploadStatus::Failed {
                        error: e.to_string(),
                    },
                }
            }
        };

        if let Err(e) =
            image_repo::update_status(&self.db, image_id, ProcessingStatus::Processing, None)
        {
            warn!("Failed to mark image {} processing: {}", image_id, e);
        }

        let outcome = match self.pipeline.extract(&file.bytes, &file.media_type).await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail_image(image_id, file.filename, &e.to_string()),
        };

        if let Err(e) = extraction_repo::insert(
            &self.db,
            image_id,
            &outcome.raw_text,
            STORED_CONFIDENCE,
            STORED_LANGUAGE,
        ) {
            return self.fail_image(image_id, file.filename, &e.to_string());
        }

        if let Err(e) =
            image_repo::update_status(&self.db, image_id, ProcessingStatus::Completed, None)
        {
            warn!("Failed to mark image {} completed: {}", image_id, e);
        }

        self.staging.stage(PendingVerification {
            image_id,
            filename: file.filename.clone(),
            method: outcome.method.to_string(),
            fields: outcome.fields.clone(),
        });

        UploadResult {
            filename: file.filename,
            status: UploadStatus::Success {
                image_id,
                extracted_text: outcome.raw_text,
                fields: outcome.fields,
                method: outcome.method.to_string(),
            },
        }
    }

    fn fail_image(&self, image_id: i64, filename: String, message: &str) -> UploadResult {
        if let Err(e) =
            image_repo::update_status(&self.db, image_id, ProcessingStatus::Failed, Some(message))
        {
            warn!("Failed to mark image {} failed: {}", image_id, e);
        }

        UploadResult {
            filename,
            status: UploadStatus::Failed {
                error: message.to_string(),
            },
        }
    }

    /// All uploaded images newest first, joined with extraction records.
    pub fn list_images(&self) -> Result<Vec<ImageListing>, FormscanError> {
        Ok(image_repo::list_with_extraction(&self.db)?)
    }

    /// One image with its extraction record, if any.
    pub fn get_image(&self, id: i64) -> Result<Option<ImageDetail>, FormscanError> {
        let image = match image_repo::find_by_id(&self.db, id)? {
            Some(image) => image,
            None => return Ok(None),
        };
        let extraction = extraction_repo::find_by_image(&self.db, id)?;
        Ok(Some(ImageDetail { image, extraction }))
    }

    /// Substring search over extracted text.
    pub fn search_images(&self, query: &str) -> Result<Vec<SearchHit>, FormscanError> {
        Ok(image_repo::search(&self.db, query)?)
    }

    /// Deletes an image; extraction records and printing forms cascade.
    pub fn delete_image(&self, id: i64) -> Result<bool, FormscanError> {
        Ok(image_repo::delete(&self.db, id)?)
    }

    /// Commits caller-verified records to the printing-forms table and
    /// returns the number of rows written.
    pub fn save_verified(&self, records: &[VerifiedRecord]) -> usize {
        self.staging.commit(&self.db, records)
    }

    /// All printing forms newest first, joined with image metadata.
    pub fn list_forms(&self) -> Result<Vec<form_repo::FormListing>, FormscanError> {
        Ok(form_repo::list_with_images(&self.db)?)
    }

    /// One printing form with its source image and extracted text.
    pub fn get_form(&self, id: i64) -> Result<Option<form_repo::FormDetail>, FormscanError> {
        Ok(form_repo::find_by_id(&self.db, id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured_service() -> FormService {
        let db = Database::open_in_memory().unwrap();
        // No strategies at all: extraction always reports "not configured".
        let pipeline = ExtractionPipeline::with_strategies(vec![]);
        FormService::with_pipeline(db, pipeline)
    }

    #[tokio::test]
    async fn test_non_image_rejected_without_image_row() {
        let service = unconfigured_service();
        let files = vec![UploadFile::new("notes.pdf", "application/pdf", vec![1, 2])];

        let results = service.upload(files).await;
        assert_eq!(results.len(), 1);
        match &results[0].status {
            UploadStatus::Failed { error } => {
                assert!(error.contains("Invalid file type"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }

        // Rejected before ingestion: no uploaded_images row exists.
        assert!(service.list_images().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_extraction_marks_image_failed() {
        let service = unconfigured_service();
        let files = vec![UploadFile::new("form.jpg", "image/jpeg", vec![1, 2, 3])];

        let results = service.upload(files).await;
        match &results[0].status {
            UploadStatus::Failed { error } => {
                assert!(error.contains("No extraction provider configured"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }

        let images = service.list_images().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].processing_status, "failed");
        assert!(images[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("No extraction provider configured"));
    }

    #[tokio::test]
    async fn test_batch_isolation() {
        let service = unconfigured_service();
        let files = vec![
            UploadFile::new("bad.txt", "text/plain", vec![]),
            UploadFile::new("form.jpg", "image/jpeg", vec![1]),
        ];

        let results = service.upload(files).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].filename, "bad.txt");
        assert_eq!(results[1].filename, "form.jpg");
        // Both failed for different reasons; neither aborted the batch.
        assert!(matches!(results[0].status, UploadStatus::Failed { .. }));
        assert!(matches!(results[1].status, UploadStatus::Failed { .. }));
    }

    #[test]
    fn test_upload_file_from_path_guesses_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"fake image bytes").unwrap();

        let file = UploadFile::from_path(&path).unwrap();
        assert_eq!(file.filename, "scan.png");
        assert_eq!(file.media_type, "image/png");
        assert_eq!(file.bytes, b"fake image bytes");
    }

    #[test]
    fn test_get_image_missing_is_none() {
        let service = unconfigured_service();
        assert!(service.get_image(1).unwrap().is_none());
    }
}

//! Holds extraction results awaiting human verification.
//!
//! Extracted fields are not written to the printing-forms table until a
//! caller confirms them. The staging area is session-scoped — one per
//! service instance — and nothing in it survives a restart. It is not a
//! transactional structure: concurrent editors of the same entries can
//! interleave, last writer wins.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{form_repo, Database};
use crate::fields::FieldSet;
use crate::sanitize;

/// One extraction result awaiting confirmation. Every field is editable
/// before commit; edits are opaque caller-supplied values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVerification {
    pub image_id: i64,
    pub filename: String,
    pub method: String,
    pub fields: FieldSet,
}

/// A caller-confirmed record to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedRecord {
    pub image_id: i64,
    pub fields: FieldSet,
}

pub struct StagingArea {
    session_id: Uuid,
    entries: RwLock<Vec<PendingVerification>>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Identifies this staging session in logs.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Enters one extraction result into the pending state.
    pub fn stage(&self, entry: PendingVerification) {
        self.write_entries().push(entry);
    }

    /// Snapshot of all pending entries, oldest first.
    pub fn entries(&self) -> Vec<PendingVerification> {
        self.read_entries().clone()
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Overwrites the staged fields for an image. Returns whether an entry
    /// was found.
    pub fn update_fields(&self, image_id: i64, fields: FieldSet) -> bool {
        let mut entries = self.write_entries();
        match entries.iter_mut().find(|e| e.image_id == image_id) {
            Some(entry) => {
                entry.fields = fields;
                true
            }
            None => false,
        }
    }

    /// Removes one staged entry by position. No storage effect.
    pub fn remove(&self, index: usize) -> Option<PendingVerification> {
        let mut entries = self.write_entries();
        if index < entries.len() {
            Some(entries.remove(index))
        } else {
            None
        }
    }

    /// Clears all staged entries. No storage effect. Returns the count
    /// discarded.
    pub fn discard_all(&self) -> usize {
        let mut entries = self.write_entries();
        let discarded = entries.len();
        entries.clear();
        discarded
    }

    /// Writes one printing-form row per confirmed record, sequentially.
    ///
    /// Text fields are sanitized again before insert — staged values may
    /// have been hand-edited. A failing row is logged and skipped; rows
    /// already written stay written (no cross-row atomicity). Returns the
    /// number of rows inserted and clears only the staged entries that were
    /// committed.
    pub fn commit(&self, db: &Database, records: &[VerifiedRecord]) -> usize {
        let mut saved = 0usize;
        let mut committed_ids: Vec<i64> = Vec::new();

        for record in records {
            let fields = sanitize::sanitize(record.fields.clone());
            match form_repo::insert(db, record.image_id, &fields) {
                Ok(_) => {
                    saved += 1;
                    committed_ids.push(record.image_id);
                }
                Err(e) => {
                    warn!(
                        "Failed to save verified form for image {} (session {}): {}",
                        record.image_id, self.session_id, e
                    );
                }
            }
        }

        if !committed_ids.is_empty() {
            self.write_entries()
                .retain(|entry| !committed_ids.contains(&entry.image_id));
        }

        saved
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, Vec<PendingVerification>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Staging lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Vec<PendingVerification>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Staging lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for StagingArea {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::image_repo;

    fn entry(image_id: i64, class: &str) -> PendingVerification {
        PendingVerification {
            image_id,
            filename: format!("form-{}.jpg", image_id),
            method: "AI Vision (Gemini)".to_string(),
            fields: FieldSet {
                class: class.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_stage_and_list() {
        let staging = StagingArea::new();
        assert!(staging.is_empty());

        staging.stage(entry(1, "5A"));
        staging.stage(entry(2, "6B"));

        let entries = staging.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image_id, 1);
        assert_eq!(entries[1].fields.class, "6B");
    }

    #[test]
    fn test_update_fields() {
        let staging = StagingArea::new();
        staging.stage(entry(1, "5A"));

        let edited = FieldSet {
            class: "5B".to_string(),
            copies: Some(20),
            ..Default::default()
        };
        assert!(staging.update_fields(1, edited));
        assert!(!staging.update_fields(99, FieldSet::default()));

        let entries = staging.entries();
        assert_eq!(entries[0].fields.class, "5B");
        assert_eq!(entries[0].fields.copies, Some(20));
    }

    #[test]
    fn test_remove_by_index() {
        let staging = StagingArea::new();
        staging.stage(entry(1, "5A"));
        staging.stage(entry(2, "6B"));

        let removed = staging.remove(0).unwrap();
        assert_eq!(removed.image_id, 1);
        assert_eq!(staging.len(), 1);

        assert!(staging.remove(5).is_none());
    }

    #[test]
    fn test_discard_all() {
        let staging = StagingArea::new();
        staging.stage(entry(1, "5A"));
        staging.stage(entry(2, "6B"));

        assert_eq!(staging.discard_all(), 2);
        assert!(staging.is_empty());
        assert_eq!(staging.discard_all(), 0);
    }

    #[test]
    fn test_commit_writes_and_clears() {
        let db = Database::open_in_memory().unwrap();
        let image_id = image_repo::insert(&db, "form.jpg", 10, "image/jpeg").unwrap();

        let staging = StagingArea::new();
        staging.stage(entry(image_id, "5A"));

        let records = vec![VerifiedRecord {
            image_id,
            fields: FieldSet {
                class: "#5A ".to_string(),
                ..Default::default()
            },
        }];

        assert_eq!(staging.commit(&db, &records), 1);
        assert!(staging.is_empty());

        let forms = crate::db::form_repo::list_with_images(&db).unwrap();
        assert_eq!(forms.len(), 1);
        // Sanitized again on the way in.
        assert_eq!(forms[0].fields.class, "5A");
    }

    #[test]
    fn test_commit_partial_failure_keeps_failed_entry() {
        let db = Database::open_in_memory().unwrap();
        let good = image_repo::insert(&db, "good.jpg", 10, "image/jpeg").unwrap();
        let missing_image = good + 1000;

        let staging = StagingArea::new();
        staging.stage(entry(good, "5A"));
        staging.stage(entry(missing_image, "6B"));

        let records = vec![
            VerifiedRecord {
                image_id: good,
                fields: FieldSet::default(),
            },
            // Violates the foreign key — this row fails, the first stays.
            VerifiedRecord {
                image_id: missing_image,
                fields: FieldSet::default(),
            },
        ];

        assert_eq!(staging.commit(&db, &records), 1);

        let remaining = staging.entries();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].image_id, missing_image);

        let forms = crate::db::form_repo::list_with_images(&db).unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].image_id, good);
    }

    #[test]
    fn test_commit_empty_batch() {
        let db = Database::open_in_memory().unwrap();
        let staging = StagingArea::new();
        assert_eq!(staging.commit(&db, &[]), 0);
    }

    #[test]
    fn test_session_ids_differ() {
        assert_ne!(StagingArea::new().session_id(), StagingArea::new().session_id());
    }
}

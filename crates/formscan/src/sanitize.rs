//! Cleans extracted field values before staging and storage.
//!
//! The physical forms carry a `#` marker that OCR and vision output pick up
//! as noise; it is stripped from every text field together with surrounding
//! whitespace. Numeric fields pass through unchanged and the field shape is
//! preserved.

use crate::fields::FieldSet;

/// Strips `#` characters and trims surrounding whitespace.
pub fn clean_text(value: &str) -> String {
    value.replace('#', "").trim().to_string()
}

/// Sanitizes every text field of a `FieldSet`. Idempotent.
pub fn sanitize(fields: FieldSet) -> FieldSet {
    FieldSet {
        class: clean_text(&fields.class),
        subject: clean_text(&fields.subject),
        teacher_in_charge: clean_text(&fields.teacher_in_charge),
        ricoh: clean_text(&fields.ricoh),
        toshiba: clean_text(&fields.toshiba),
        ..fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_markers() {
        assert_eq!(clean_text("#5A#"), "5A");
        assert_eq!(clean_text("  Mathematics  "), "Mathematics");
        assert_eq!(clean_text(" #Mr. #Smith "), "Mr. Smith");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("###"), "");
    }

    #[test]
    fn test_sanitize_cleans_all_text_fields() {
        let fields = FieldSet {
            class: "#5A".to_string(),
            subject: " Math ".to_string(),
            teacher_in_charge: "#Jane Doe#".to_string(),
            pages_original_copy: Some(5),
            copies: Some(30),
            total_printed_pages: Some(150),
            ricoh: " 150# ".to_string(),
            toshiba: String::new(),
        };

        let cleaned = sanitize(fields);
        assert_eq!(cleaned.class, "5A");
        assert_eq!(cleaned.subject, "Math");
        assert_eq!(cleaned.teacher_in_charge, "Jane Doe");
        assert_eq!(cleaned.ricoh, "150");
        assert_eq!(cleaned.pages_original_copy, Some(5));
        assert_eq!(cleaned.copies, Some(30));
        assert_eq!(cleaned.total_printed_pages, Some(150));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let fields = FieldSet {
            class: "#5A ".to_string(),
            subject: "Science#".to_string(),
            ..Default::default()
        };

        let once = sanitize(fields);
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_preserves_numeric_nulls() {
        let fields = FieldSet::default();
        let cleaned = sanitize(fields.clone());
        assert_eq!(cleaned, fields);
    }
}

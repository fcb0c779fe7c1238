//! The 8-field schema extracted from one printing-request form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The named data points extracted from one form image.
///
/// The serialized key names match the physical form schema exactly — they
/// are the wire contract shared by the vision-model prompts, the
/// verification UI and the stored printing-form rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    #[serde(rename = "Class", default)]
    pub class: String,

    #[serde(rename = "Subject", default)]
    pub subject: String,

    #[serde(rename = "Teacher_in_charge", default)]
    pub teacher_in_charge: String,

    #[serde(rename = "No_of_pages_original_copy", default)]
    pub pages_original_copy: Option<i64>,

    #[serde(rename = "No_of_copies", default)]
    pub copies: Option<i64>,

    #[serde(rename = "Total_No_of_printed_pages", default)]
    pub total_printed_pages: Option<i64>,

    /// Total printed pages as a string when the Ricoh marker was detected,
    /// empty otherwise. Both printer fields may carry the same value when
    /// both markers are present; mutual exclusion is not enforced here.
    #[serde(rename = "Ricoh", default)]
    pub ricoh: String,

    #[serde(rename = "Toshiba", default)]
    pub toshiba: String,
}

impl FieldSet {
    /// Reduces an arbitrary provider response object to the 8-field schema.
    ///
    /// Vision providers may return a superset of fields or loosely typed
    /// values (numbers quoted as strings). Missing or unusable values fall
    /// back to the schema defaults: empty string for text, null for numbers.
    pub fn from_value(value: &Value) -> Self {
        Self {
            class: text_field(value, "Class"),
            subject: text_field(value, "Subject"),
            teacher_in_charge: text_field(value, "Teacher_in_charge"),
            pages_original_copy: int_field(value, "No_of_pages_original_copy"),
            copies: int_field(value, "No_of_copies"),
            total_printed_pages: int_field(value, "Total_No_of_printed_pages"),
            ricoh: text_field(value, "Ricoh"),
            toshiba: text_field(value, "Toshiba"),
        }
    }
}

fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

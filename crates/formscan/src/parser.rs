//! Derives a `FieldSet` from raw OCR text.
//!
//! Matching is driven by declarative label-synonym tables consumed by one
//! generic routine, so new form wordings are data changes rather than new
//! regexes. Parsing is deterministic and side-effect free; identical input
//! always yields identical output.

use std::collections::HashMap;

use regex::Regex;

use crate::fields::FieldSet;
use crate::sanitize::clean_text;

/// Label synonyms per field, tried in order; the first match wins.
/// Longer labels come first so "No. of pages (original copy)" is consumed
/// before the bare "No. of pages" can capture the parenthetical.
const CLASS_LABELS: &[&str] = &["Class", "Grade"];
const SUBJECT_LABELS: &[&str] = &["Subject"];
const TEACHER_LABELS: &[&str] = &["Teacher in charge", "Teacher-in-charge", "Teacher"];
const PAGES_ORIGINAL_LABELS: &[&str] = &[
    "No. of pages (original copy)",
    "No. of pages",
    "No of pages",
    "Pages original",
];
const COPIES_LABELS: &[&str] = &["No. of copies", "No of copies", "Copies"];
const TOTAL_PRINTED_LABELS: &[&str] = &[
    "Total No. of printed pages",
    "Total No of printed pages",
    "Total pages",
    "Total printed",
];

/// Printer names whose circled/checked state is detected rather than read.
const PRINTER_LABELS: &[&str] = &["Ricoh", "Toshiba"];

pub struct FormParser {
    /// Label -> line-remainder capture pattern.
    label_patterns: HashMap<&'static str, Regex>,
    /// Printer label -> circle/checkbox markup patterns.
    marker_patterns: HashMap<&'static str, Vec<Regex>>,
}

impl FormParser {
    pub fn new() -> Self {
        let mut label_patterns = HashMap::new();
        for labels in [
            CLASS_LABELS,
            SUBJECT_LABELS,
            TEACHER_LABELS,
            PAGES_ORIGINAL_LABELS,
            COPIES_LABELS,
            TOTAL_PRINTED_LABELS,
        ] {
            for label in labels {
                if !label_patterns.contains_key(label) {
                    let pattern = format!(r"(?i){}\s*:?\s*([^\n\r]+)", regex::escape(label));
                    if let Ok(regex) = Regex::new(&pattern) {
                        label_patterns.insert(*label, regex);
                    }
                }
            }
        }

        let mut marker_patterns = HashMap::new();
        for label in PRINTER_LABELS {
            marker_patterns.insert(*label, compile_marker_patterns(label));
        }

        Self {
            label_patterns,
            marker_patterns,
        }
    }

    /// Parses raw OCR text into the 8-field schema.
    pub fn parse(&self, text: &str) -> FieldSet {
        let _span = tracing::debug_span!("parser.parse").entered();

        let total_printed = self.extract_int(text, TOTAL_PRINTED_LABELS);
        // A zero total is treated as absent for the printer copy.
        let copy_value = total_printed.filter(|n| *n != 0);

        let printer_field = |marked: bool| match (marked, copy_value) {
            (true, Some(n)) => n.to_string(),
            _ => String::new(),
        };

        FieldSet {
            class: self.extract_text(text, CLASS_LABELS),
            subject: self.extract_text(text, SUBJECT_LABELS),
            teacher_in_charge: self.extract_text(text, TEACHER_LABELS),
            pages_original_copy: self.extract_int(text, PAGES_ORIGINAL_LABELS),
            copies: self.extract_int(text, COPIES_LABELS),
            total_printed_pages: total_printed,
            ricoh: printer_field(self.is_marked(text, "Ricoh")),
            toshiba: printer_field(self.is_marked(text, "Toshiba")),
        }
    }

    /// Returns the cleaned remainder of the first line matching any label.
    fn extract_text(&self, text: &str, labels: &[&'static str]) -> String {
        for label in labels {
            if let Some(regex) = self.label_patterns.get(label) {
                if let Some(captures) = regex.captures(text) {
                    if let Some(value) = captures.get(1) {
                        return clean_text(value.as_str());
                    }
                }
            }
        }
        String::new()
    }

    /// Parses the leading digits of a matched value; anything else is null.
    fn extract_int(&self, text: &str, labels: &[&'static str]) -> Option<i64> {
        parse_leading_int(&self.extract_text(text, labels))
    }

    /// Whether a circle/checkbox marker appears adjacent to the label.
    fn is_marked(&self, text: &str, label: &str) -> bool {
        self.marker_patterns
            .get(label)
            .map(|patterns| patterns.iter().any(|p| p.is_match(text)))
            .unwrap_or(false)
    }
}

impl Default for FormParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Markup shapes meaning "this label is circled or checked":
/// `(x) Label`, `Label (x)`, `[Label]`, `<Label>`, `Label ✓`.
fn compile_marker_patterns(label: &str) -> Vec<Regex> {
    let escaped = regex::escape(label);
    [
        format!(r"(?i)\([xX✓√]\)\s*{escaped}"),
        format!(r"(?i){escaped}\s*\([xX✓√]\)"),
        format!(r"(?i)\[{escaped}\]"),
        format!(r"(?i)<{escaped}>"),
        format!(r"(?i){escaped}\s*[*✓√✔✗xX]"),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
}

fn parse_leading_int(value: &str) -> Option<i64> {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

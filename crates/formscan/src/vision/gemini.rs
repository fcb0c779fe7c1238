//! Structured field extraction via the Google Gemini generateContent API.
//!
//! Carries an ordered model-version fallback chain: the newest model is
//! tried first and each failure falls through to the next version.
//! Exhausting the chain surfaces the last error encountered.

use log::{debug, warn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::error::ExtractError;
use crate::vision::{create_http_client, parse_json_object, truncate_body};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const PROVIDER: &str = "Gemini";

/// Targets handwriting only: printed form labels are explicitly excluded so
/// the model does not echo the form structure back as field values.
const EXTRACTION_PROMPT: &str = r#"You are an expert in data extraction from handwritten documents, with a meticulous eye for detail and accuracy. Your task is to extract ONLY HANDWRITTEN TEXT from the provided printing request form image.

CRITICAL: Extract ONLY handwritten text, NOT printed labels or form structure.

Look for HANDWRITTEN entries in these 8 fields:
1. Class - HANDWRITTEN class/grade only (e.g., "5A", "Primary 3")
2. Subject - HANDWRITTEN subject/topic only
3. Teacher_in_charge - HANDWRITTEN teacher's name only
4. No_of_pages_original_copy - HANDWRITTEN number only (numeric value)
5. No_of_copies - HANDWRITTEN number only (numeric value)
6. Total_No_of_printed_pages - HANDWRITTEN total number only (numeric value)
7. Ricoh - If "Ricoh" is circled/checked with pen/pencil, put the HANDWRITTEN total pages value here
8. Toshiba - If "Toshiba" is circled/checked with pen/pencil, put the HANDWRITTEN total pages value here

CRITICAL EXTRACTION RULES:
- IGNORE all printed text on the form (labels, instructions, form fields)
- ONLY extract handwritten pen/pencil text
- Look for filled-in boxes, circled items, or written text
- Remove ALL "#" symbols from handwritten text
- For Ricoh: Only if you see a handwritten circle/check around "Ricoh", copy the handwritten total pages
- For Toshiba: Only if you see a handwritten circle/check around "Toshiba", copy the handwritten total pages
- For missing handwritten text fields, use empty string ""
- For missing handwritten numbers, use null
- Return ONLY a valid JSON object with these exact 8 field names

Example output (when Ricoh is circled by hand):
{
  "Class": "5A",
  "Subject": "Mathematics",
  "Teacher_in_charge": "John Doe",
  "No_of_pages_original_copy": 5,
  "No_of_copies": 30,
  "Total_No_of_printed_pages": 150,
  "Ricoh": "150",
  "Toshiba": ""
}

Example output (when Toshiba is circled by hand):
{
  "Class": "Primary 3",
  "Subject": "Science",
  "Teacher_in_charge": "Jane Smith",
  "No_of_pages_original_copy": 3,
  "No_of_copies": 25,
  "Total_No_of_printed_pages": 75,
  "Ricoh": "",
  "Toshiba": "75"
}"#;

pub struct GeminiExtractor {
    client: Client,
    api_key: Option<SecretString>,
    api_base: String,
    models: Vec<String>,
}

impl GeminiExtractor {
    pub fn new(api_key: Option<SecretString>, models: &[String]) -> Result<Self, ExtractError> {
        Ok(Self {
            client: create_http_client(PROVIDER)?,
            api_key,
            api_base: API_BASE.to_string(),
            models: models.to_vec(),
        })
    }

    /// Overrides the API base URL, mainly for tests.
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Tries each model version in order; the last error surfaces when the
    /// chain is exhausted.
    pub async fn extract(
        &self,
        image_base64: &str,
        media_type: &str,
    ) -> Result<serde_json::Value, ExtractError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ExtractError::NotConfigured("GEMINI_API_KEY not configured".to_string())
        })?;

        let mut last_error: Option<ExtractError> = None;

        for model in &self.models {
            match self
                .try_model(api_key, model, image_base64, media_type)
                .await
            {
                Ok(value) => {
                    debug!("Gemini model {} produced a structured object", model);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Gemini model {} failed: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ExtractError::Provider {
            provider: PROVIDER,
            message: "no models configured".to_string(),
        }))
    }

    async fn try_model(
        &self,
        api_key: &SecretString,
        model: &str,
        image_base64: &str,
        media_type: &str,
    ) -> Result<serde_json::Value, ExtractError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.api_base,
            model,
            api_key.expose_secret()
        );

        let payload = json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACTION_PROMPT },
                    {
                        "inline_data": {
                            "mime_type": media_type,
                            "data": image_base64
                        }
                    }
                ]
            }],
            "generationConfig": {
                "temperature": 0.1,
                "maxOutputTokens": 2048,
                "topP": 0.95,
                "topK": 40
            },
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_ONLY_HIGH" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_ONLY_HIGH" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_ONLY_HIGH" },
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_ONLY_HIGH" }
            ]
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExtractError::Provider {
                provider: PROVIDER,
                message: format!("{}: request failed: {}", model, e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Provider {
                provider: PROVIDER,
                message: format!("{}: HTTP {}: {}", model, status, truncate_body(&body)),
            });
        }

        let body: GenerateResponse =
            response.json().await.map_err(|e| ExtractError::Provider {
                provider: PROVIDER,
                message: format!("{}: invalid response body: {}", model, e),
            })?;

        let content = body
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.as_str())
            .unwrap_or("");

        parse_json_object(content, PROVIDER)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

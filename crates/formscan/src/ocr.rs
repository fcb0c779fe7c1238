//! OCR engine ensemble over the OCR.space HTTP API.
//!
//! Every configured engine variant is called independently and scored with a
//! length/keyword heuristic; the best result wins. An image in which no
//! engine finds text is a successful empty scan, answered with guidance
//! text, not an error.

use std::time::Duration;

use log::{debug, warn};
use reqwest::multipart::Form;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ExtractError;

const DEFAULT_ENDPOINT: &str = "https://api.ocr.space/parse/image";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Form-domain keywords that raise an engine result's score.
const SCORE_KEYWORDS: &[&str] = &[
    "date",
    "class",
    "teacher",
    "subject",
    "received",
    "submission",
    "collection",
];

/// Returned in place of text when every engine comes back empty.
pub const NO_TEXT_GUIDANCE: &str = "No text detected in the image. Try:\n\
    - Higher resolution scan (300+ DPI)\n\
    - Better lighting\n\
    - Straighten the image\n\
    - Increase contrast";

/// One scored engine result.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,
    pub engine: String,
}

/// Heuristic quality score for one OCR result: text length contributes up
/// to 1.0, keyword coverage up to 0.5 more. Used only to pick among
/// competing engine outputs, not a calibrated probability.
pub fn score_text(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }

    let length_score = (text.len() as f64 / 100.0).min(1.0);
    let lower = text.to_lowercase();
    let found = SCORE_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count();

    length_score + (found as f64 / SCORE_KEYWORDS.len() as f64) * 0.5
}

pub struct OcrClient {
    client: Client,
    api_key: Option<SecretString>,
    endpoint: String,
    language: String,
    engines: Vec<String>,
}

impl OcrClient {
    pub fn new(
        api_key: Option<SecretString>,
        language: &str,
        engines: &[String],
    ) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExtractError::OcrFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language: language.to_string(),
            engines: engines.to_vec(),
        })
    }

    /// Overrides the API endpoint, mainly for tests.
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Runs every configured engine and keeps the best-scoring result.
    ///
    /// A failing engine is logged and swallowed; only all engines failing
    /// surfaces an error (the last one encountered). Best-but-empty text
    /// yields [`NO_TEXT_GUIDANCE`] as a successful result.
    pub async fn recognize(
        &self,
        image_base64: &str,
        media_type: &str,
    ) -> Result<OcrResult, ExtractError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ExtractError::NotConfigured(
                "OCR_API_KEY not configured. Set the environment variable or the ocr.api_key config value.".to_string(),
            )
        })?;

        let mut best: Option<OcrResult> = None;
        let mut last_error: Option<ExtractError> = None;

        for engine in &self.engines {
            match self
                .try_engine(api_key, image_base64, media_type, engine)
                .await
            {
                Ok(result) => {
                    debug!("OCR engine {} scored {:.2}", engine, result.confidence);
                    keep_best(&mut best, result);
                }
                Err(e) => {
                    warn!("OCR engine {} failed: {}", engine, e);
                    last_error = Some(e);
                }
            }
        }

        match best {
            Some(result) if !result.text.trim().is_empty() => Ok(OcrResult {
                text: result.text.trim().to_string(),
                ..result
            }),
            Some(result) => Ok(OcrResult {
                text: NO_TEXT_GUIDANCE.to_string(),
                confidence: 0.0,
                engine: result.engine,
            }),
            None => Err(last_error
                .unwrap_or_else(|| ExtractError::OcrFailed("no OCR engines configured".to_string()))),
        }
    }

    async fn try_engine(
        &self,
        api_key: &SecretString,
        image_base64: &str,
        media_type: &str,
        engine: &str,
    ) -> Result<OcrResult, ExtractError> {
        let data_uri = format!("data:{};base64,{}", media_type, image_base64);
        let form = Form::new()
            .text("base64Image", data_uri)
            .text("language", self.language.clone())
            .text("isOverlayRequired", "false")
            .text("detectOrientation", "true")
            .text("scale", "true")
            .text("OCREngine", engine.to_string())
            .text("isTable", "true")
            .text("detectCheckbox", "true");

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractError::OcrFailed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ExtractError::OcrFailed(format!(
                "OCR API request failed: {}",
                response.status()
            )));
        }

        let body: ParseResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::OcrFailed(format!("invalid response body: {}", e)))?;

        if body.is_errored_on_processing {
            let message = body
                .error_message
                .as_ref()
                .map(ErrorMessage::first)
                .filter(|m| !m.is_empty())
                .unwrap_or("OCR processing failed");
            return Err(ExtractError::OcrFailed(message.to_string()));
        }

        let text = body
            .parsed_results
            .first()
            .map(|r| r.parsed_text.clone())
            .unwrap_or_default();
        let confidence = score_text(&text);

        Ok(OcrResult {
            text,
            confidence,
            engine: engine.to_string(),
        })
    }
}

/// Keeps the candidate only when it strictly beats the current best, so the
/// first-evaluated engine wins ties.
fn keep_best(best: &mut Option<OcrResult>, candidate: OcrResult) {
    if best
        .as_ref()
        .map_or(true, |b| candidate.confidence > b.confidence)
    {
        *best = Some(candidate);
    }
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<ParsedResult>,

    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored_on_processing: bool,

    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}

/// OCR.space reports errors as either a single string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn first(&self) -> &str {
        match self {
            ErrorMessage::One(message) => message,
            ErrorMessage::Many(messages) => messages.first().map(String::as_str).unwrap_or(""),
        }
    }
}

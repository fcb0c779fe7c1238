//! Uniform capability for anything that can turn an image into fields.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::ExtractError;
use crate::fields::FieldSet;
use crate::ocr::OcrClient;
use crate::parser::FormParser;
use crate::vision::{GeminiExtractor, OpenAiExtractor};

/// One image ready for provider calls: base64 payload plus declared type.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub base64: String,
    pub media_type: String,
}

impl ImagePayload {
    pub fn new(bytes: &[u8], media_type: &str) -> Self {
        Self {
            base64: STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }
}

/// Raw output of one successful strategy attempt, before sanitization.
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    pub fields: FieldSet,
    pub raw_text: String,
}

/// One concrete way of producing a `FieldSet` from an image.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Method tag recorded on results produced by this strategy.
    fn method(&self) -> &'static str;

    /// Whether the strategy has the credential it needs. Unconfigured
    /// strategies are skipped without a network call.
    fn is_configured(&self) -> bool;

    async fn attempt(&self, image: &ImagePayload) -> Result<StrategyOutput, ExtractError>;
}

pub struct OpenAiVision {
    extractor: OpenAiExtractor,
}

impl OpenAiVision {
    pub fn new(extractor: OpenAiExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl ExtractionStrategy for OpenAiVision {
    fn method(&self) -> &'static str {
        "AI Vision (OpenAI)"
    }

    fn is_configured(&self) -> bool {
        self.extractor.is_configured()
    }

    async fn attempt(&self, image: &ImagePayload) -> Result<StrategyOutput, ExtractError> {
        let value = self
            .extractor
            .extract(&image.base64, &image.media_type)
            .await?;
        Ok(structured_output(&value))
    }
}

pub struct GeminiVision {
    extractor: GeminiExtractor,
}

impl GeminiVision {
    pub fn new(extractor: GeminiExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl ExtractionStrategy for GeminiVision {
    fn method(&self) -> &'static str {
        "AI Vision (Gemini)"
    }

    fn is_configured(&self) -> bool {
        self.extractor.is_configured()
    }

    async fn attempt(&self, image: &ImagePayload) -> Result<StrategyOutput, ExtractError> {
        let value = self
            .extractor
            .extract(&image.base64, &image.media_type)
            .await?;
        Ok(structured_output(&value))
    }
}

/// OCR ensemble followed by label parsing — the fallback when no vision
/// provider is available or all of them fail.
pub struct OcrWithParsing {
    client: OcrClient,
    parser: FormParser,
}

impl OcrWithParsing {
    pub fn new(client: OcrClient, parser: FormParser) -> Self {
        Self { client, parser }
    }
}

#[async_trait]
impl ExtractionStrategy for OcrWithParsing {
    fn method(&self) -> &'static str {
        "OCR + Parsing"
    }

    /// Always participates: as the last resort, a missing OCR credential
    /// must surface as an error rather than a silent skip.
    fn is_configured(&self) -> bool {
        true
    }

    async fn attempt(&self, image: &ImagePayload) -> Result<StrategyOutput, ExtractError> {
        let result = self
            .client
            .recognize(&image.base64, &image.media_type)
            .await?;
        let fields = self.parser.parse(&result.text);
        Ok(StrategyOutput {
            fields,
            raw_text: result.text,
        })
    }
}

/// The structured object is kept verbatim as the raw record; the fields are
/// the schema reduction of it.
fn structured_output(value: &serde_json::Value) -> StrategyOutput {
    StrategyOutput {
        fields: FieldSet::from_value(value),
        raw_text: serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_payload_encodes_base64() {
        let payload = ImagePayload::new(b"hello", "image/png");
        assert_eq!(payload.base64, "aGVsbG8=");
        assert_eq!(payload.media_type, "image/png");
    }

    #[test]
    fn test_structured_output_reduces_fields() {
        let value = json!({
            "Class": "5A",
            "Remarks": "ignored",
            "No_of_copies": 30
        });

        let output = structured_output(&value);
        assert_eq!(output.fields.class, "5A");
        assert_eq!(output.fields.copies, Some(30));
        assert!(output.raw_text.contains("\"Remarks\""));
    }

    #[test]
    fn test_ocr_strategy_always_participates() {
        let client = OcrClient::new(None, "eng", &[]).unwrap();
        let strategy = OcrWithParsing::new(client, FormParser::new());
        assert!(strategy.is_configured());
        assert_eq!(strategy.method(), "OCR + Parsing");
    }
}

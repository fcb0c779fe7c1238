//! The extraction pipeline: an ordered list of strategies tried until one
//! succeeds.
//!
//! Vision providers come first (they read handwriting far better), the OCR
//! ensemble with label parsing is the fallback. Whatever wins, the fields
//! pass through the sanitizer and carry the winning strategy's method tag.

use log::{debug, info, warn};

use crate::config::Config;
use crate::error::ExtractError;
use crate::fields::FieldSet;
use crate::ocr::OcrClient;
use crate::parser::FormParser;
use crate::pipeline::strategy::{
    ExtractionStrategy, GeminiVision, ImagePayload, OcrWithParsing, OpenAiVision,
};
use crate::sanitize;
use crate::vision::{GeminiExtractor, OpenAiExtractor};

/// A successful extraction: sanitized fields, the raw text behind them and
/// the method that produced them.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub fields: FieldSet,
    pub raw_text: String,
    pub method: &'static str,
}

pub struct ExtractionPipeline {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionPipeline {
    /// Builds the standard strategy order from configuration:
    /// OpenAI, then Gemini, then the OCR fallback.
    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let openai = OpenAiExtractor::new(
            config.vision.resolved_openai_key(),
            &config.vision.openai_model,
        )?;
        let gemini = GeminiExtractor::new(
            config.vision.resolved_gemini_key(),
            &config.vision.gemini_models,
        )?;
        let ocr = OcrClient::new(
            config.ocr.resolved_api_key(),
            &config.ocr.language,
            &config.ocr.engines,
        )?;

        Ok(Self::with_strategies(vec![
            Box::new(OpenAiVision::new(openai)),
            Box::new(GeminiVision::new(gemini)),
            Box::new(OcrWithParsing::new(ocr, FormParser::new())),
        ]))
    }

    /// Custom strategy order, mainly for tests.
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extracts a `FieldSet` from one image.
    ///
    /// A non-image declared media type fails immediately — no strategy is
    /// consulted and no network call is made. Otherwise strategies run in
    /// order; the first success wins and the last error surfaces when every
    /// strategy is exhausted.
    pub async fn extract(
        &self,
        bytes: &[u8],
        media_type: &str,
    ) -> Result<ExtractionOutcome, ExtractError> {
        if !media_type.starts_with("image/") {
            return Err(ExtractError::InvalidFileType);
        }

        let image = ImagePayload::new(bytes, media_type);
        let mut last_error: Option<ExtractError> = None;

        for strategy in &self.strategies {
            if !strategy.is_configured() {
                debug!("Skipping {} (no credential configured)", strategy.method());
                continue;
            }

            match strategy.attempt(&image).await {
                Ok(output) => {
                    info!("Extraction succeeded via {}", strategy.method());
                    return Ok(ExtractionOutcome {
                        fields: sanitize::sanitize(output.fields),
                        raw_text: output.raw_text,
                        method: strategy.method(),
                    });
                }
                Err(e) => {
                    warn!("{} failed: {}", strategy.method(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ExtractError::NotConfigured("No extraction provider configured".to_string())
        }))
    }
}

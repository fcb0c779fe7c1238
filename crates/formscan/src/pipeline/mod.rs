pub mod extractor;
pub mod strategy;

pub use extractor::{ExtractionOutcome, ExtractionPipeline};
pub use strategy::{
    ExtractionStrategy, GeminiVision, ImagePayload, OcrWithParsing, OpenAiVision, StrategyOutput,
};

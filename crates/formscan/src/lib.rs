pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod logging;
pub mod ocr;
pub mod parser;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod staging;
pub mod vision;

pub use config::{load_config, Config};
pub use error::{ConfigError, ExtractError, FormscanError, Result};
pub use fields::FieldSet;
pub use parser::FormParser;
pub use pipeline::{ExtractionOutcome, ExtractionPipeline, ExtractionStrategy};
pub use service::{FormService, UploadFile, UploadResult, UploadStatus};
pub use staging::{PendingVerification, StagingArea, VerifiedRecord};

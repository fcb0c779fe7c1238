//! Runtime configuration: provider credentials, engine lists and model
//! fallback chains.
//!
//! Everything has a serde default so an empty `{}` config is valid; API keys
//! left out of the file are resolved from the environment
//! (`OCR_API_KEY`, `OPENAI_API_KEY`, `GEMINI_API_KEY`).

use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secrets::resolve_secret_optional;

pub const OCR_API_KEY_VAR: &str = "OCR_API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub vision: VisionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Direct API key value; falls back to the `OCR_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    /// Engine variants tried in order. Engine 2 handles handwriting best,
    /// engine 1 is kept for comparison.
    #[serde(default = "default_engines")]
    pub engines: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: default_language(),
            engines: default_engines(),
        }
    }
}

impl OcrConfig {
    pub fn resolved_api_key(&self) -> Option<SecretString> {
        resolve_secret_optional(self.api_key.as_deref(), Some(OCR_API_KEY_VAR))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Direct API key value; falls back to the `OPENAI_API_KEY` env var.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Direct API key value; falls back to the `GEMINI_API_KEY` env var.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Model versions tried in order, newest first. Exhausting the list
    /// surfaces the last error.
    #[serde(default = "default_gemini_models")]
    pub gemini_models: Vec<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            openai_model: default_openai_model(),
            gemini_models: default_gemini_models(),
        }
    }
}

impl VisionConfig {
    pub fn resolved_openai_key(&self) -> Option<SecretString> {
        resolve_secret_optional(self.openai_api_key.as_deref(), Some(OPENAI_API_KEY_VAR))
    }

    pub fn resolved_gemini_key(&self) -> Option<SecretString> {
        resolve_secret_optional(self.gemini_api_key.as_deref(), Some(GEMINI_API_KEY_VAR))
    }
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_engines() -> Vec<String> {
    vec!["2".to_string(), "1".to_string()]
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_gemini_models() -> Vec<String> {
    vec![
        "gemini-2.0-flash-exp".to_string(),
        "gemini-1.5-flash".to_string(),
    ]
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.engines, vec!["2", "1"]);
        assert_eq!(config.vision.openai_model, "gpt-4o");
        assert_eq!(
            config.vision.gemini_models,
            vec!["gemini-2.0-flash-exp", "gemini-1.5-flash"]
        );
    }

    #[test]
    fn test_load_config_with_keys() {
        let config = load_config_from_str(
            r#"{
                "ocr": { "api_key": "ocr-key", "language": "deu", "engines": ["1"] },
                "vision": { "openai_api_key": "oa-key", "gemini_models": ["gemini-1.5-flash"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.ocr.api_key.as_deref(), Some("ocr-key"));
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.engines, vec!["1"]);
        assert_eq!(config.vision.openai_api_key.as_deref(), Some("oa-key"));
        assert_eq!(config.vision.gemini_models, vec!["gemini-1.5-flash"]);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(load_config_from_str("{ not json").is_err());
    }

    #[test]
    #[serial]
    fn test_resolved_key_prefers_direct_value() {
        std::env::set_var(OCR_API_KEY_VAR, "env-key");
        let config = Config {
            ocr: OcrConfig {
                api_key: Some("direct-key".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.ocr.resolved_api_key().unwrap().expose_secret(),
            "direct-key"
        );
        std::env::remove_var(OCR_API_KEY_VAR);
    }

    #[test]
    #[serial]
    fn test_resolved_key_from_env() {
        std::env::set_var(GEMINI_API_KEY_VAR, "env-gemini");
        let config = Config::default();
        assert_eq!(
            config.vision.resolved_gemini_key().unwrap().expose_secret(),
            "env-gemini"
        );
        std::env::remove_var(GEMINI_API_KEY_VAR);
    }

    #[test]
    #[serial]
    fn test_missing_key_is_none() {
        std::env::remove_var(OPENAI_API_KEY_VAR);
        let config = Config::default();
        assert!(config.vision.resolved_openai_key().is_none());
    }
}

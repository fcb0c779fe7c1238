//! Vision-language-model extraction providers.
//!
//! Each provider sends one structured-extraction request carrying the image
//! and a fixed prompt, then pulls the first balanced JSON object out of the
//! free-form response text.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiExtractor;
pub use openai::OpenAiExtractor;

use std::time::Duration;

use reqwest::Client;

use crate::error::ExtractError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum length for provider error bodies quoted into error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

pub(crate) fn create_http_client(provider: &'static str) -> Result<Client, ExtractError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ExtractError::Provider {
            provider,
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Truncates an error response body so provider errors stay loggable.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated)", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Locates the first balanced JSON object in free-form model output.
///
/// Providers wrap the object in prose or code fences; brace matching with
/// string and escape awareness finds the object without a full parse.
pub(crate) fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extracts and parses the first JSON object in a provider response.
pub(crate) fn parse_json_object(
    content: &str,
    provider: &'static str,
) -> Result<serde_json::Value, ExtractError> {
    let object = first_json_object(content).ok_or(ExtractError::NoJsonFound { provider })?;
    serde_json::from_str(object).map_err(|e| ExtractError::Provider {
        provider,
        message: format!("malformed JSON in response: {}", e),
    })
}

//! Structured field extraction via the OpenAI chat completions API.

use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::error::ExtractError;
use crate::vision::{create_http_client, parse_json_object, truncate_body};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const PROVIDER: &str = "OpenAI";

/// Requests the full form superset; downstream reduction keeps the eight
/// schema fields. The worked examples and typing rules anchor the model to
/// strings-default-empty, numbers-default-null, booleans-default-false.
const EXTRACTION_PROMPT: &str = r#"You are an expert in data extraction from handwritten documents, with a meticulous eye for detail and accuracy. Your task is to extract specific data points from the provided handwritten printing request form image.

Extract the following fields:
1. RECEIVED_DATE - Date when form was received
2. Class - Student class/grade
3. Subject - Subject or topic
4. Teacher_in_charge - Teacher's name
5. Date_of_submission - When submitted
6. Date_of_collection - When to collect
7. Received_by - Person who received
8. No_of_pages_original_copy - Number of pages in original (numeric)
9. No_of_copies - Number of copies needed (numeric)
10. Total_No_of_printed_pages - Total pages to print (numeric)
11. Other_request_Single_sided - Is "Single sided" checked? (true/false)
12. Other_request_Double_sided - Is "Double sided" checked? (true/false)
13. Other_request_Stapling - Is "Stapling" checked? (true/false)
14. Other_request_No_stapling_required - Is "No stapling" checked? (true/false)
15. Other_request_White_paper - Is "White paper" checked? (true/false)
16. Other_request_Newsprint_paper - Is "Newsprint" checked? (true/false)
17. Remarks - Any remarks or notes
18. Signed_by - Signature/name
19. Ricoh - If "Ricoh" is circled/checked, put the total printed pages value here
20. Toshiba - If "Toshiba" is circled/checked, put the total printed pages value here

Return ONLY a valid JSON object with these exact field names. If a field is not visible or empty, use empty string "" for text fields, null for numbers, and false for booleans.

Example format:
{
  "RECEIVED_DATE": "2025-11-15",
  "Class": "5A",
  "Subject": "Mathematics",
  "Teacher_in_charge": "Mr. Smith",
  "No_of_pages_original_copy": 10,
  "No_of_copies": 30,
  "Total_No_of_printed_pages": 300,
  "Ricoh": "300",
  "Toshiba": ""
}"#;

pub struct OpenAiExtractor {
    client: Client,
    api_key: Option<SecretString>,
    api_url: String,
    model: String,
}

impl OpenAiExtractor {
    pub fn new(api_key: Option<SecretString>, model: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            client: create_http_client(PROVIDER)?,
            api_key,
            api_url: API_URL.to_string(),
            model: model.to_string(),
        })
    }

    /// Overrides the API endpoint, mainly for tests.
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends one extraction request and returns the structured object the
    /// model produced.
    pub async fn extract(
        &self,
        image_base64: &str,
        media_type: &str,
    ) -> Result<serde_json::Value, ExtractError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ExtractError::NotConfigured("OPENAI_API_KEY not configured".to_string())
        })?;

        let payload = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACTION_PROMPT },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:{};base64,{}", media_type, image_base64)
                        }
                    }
                ]
            }],
            "max_tokens": 1000,
            "temperature": 0.1
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExtractError::Provider {
                provider: PROVIDER,
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Provider {
                provider: PROVIDER,
                message: format!("HTTP {}: {}", status, truncate_body(&body)),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| ExtractError::Provider {
            provider: PROVIDER,
            message: format!("invalid response body: {}", e),
        })?;

        let content = body
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or("");

        debug!("OpenAI returned {} bytes of content", content.len());
        parse_json_object(content, PROVIDER)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_reporting() {
        let unconfigured = OpenAiExtractor::new(None, "gpt-4o").unwrap();
        assert!(!unconfigured.is_configured());

        let configured =
            OpenAiExtractor::new(Some(SecretString::from("key".to_string())), "gpt-4o").unwrap();
        assert!(configured.is_configured());
    }

    #[tokio::test]
    async fn test_extract_without_key_is_not_configured() {
        let extractor = OpenAiExtractor::new(None, "gpt-4o").unwrap();
        let result = extractor.extract("aGVsbG8=", "image/png").await;

        assert!(matches!(result, Err(ExtractError::NotConfigured(_))));
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{
            "choices": [
                { "message": { "role": "assistant", "content": "{\"Class\": \"5A\"}" } }
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, r#"{"Class": "5A"}"#);
    }

    #[test]
    fn test_prompt_names_schema_fields() {
        for field in [
            "Class",
            "Subject",
            "Teacher_in_charge",
            "No_of_pages_original_copy",
            "No_of_copies",
            "Total_No_of_printed_pages",
            "Ricoh",
            "Toshiba",
        ] {
            assert!(EXTRACTION_PROMPT.contains(field), "missing {}", field);
        }
    }
}

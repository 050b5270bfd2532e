use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::ImageAttachment;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        if !config.is_ai_configured() {
            return Err(anyhow!("GEMINI_API_KEY is not configured"));
        }

        Ok(Self {
            http_client: Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_body(system_prompt: &str, prompt: &str, image: Option<&ImageAttachment>) -> Value {
        let mut parts = vec![json!({ "text": prompt })];

        if let Some(image) = image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": BASE64.encode(&image.data)
                }
            }));
        }

        json!({
            "systemInstruction": {
                "parts": [{ "text": system_prompt }]
            },
            "contents": [{
                "role": "user",
                "parts": parts
            }]
        })
    }

    fn extract_text(response: &Value) -> Result<String> {
        let parts = response["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| anyhow!("no response generated"))?;

        let text: String = parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect();

        if text.is_empty() {
            return Err(anyhow!("unexpected response format"));
        }

        Ok(text)
    }

    pub async fn generate_response(
        &self,
        system_prompt: &str,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String> {
        debug!("Requesting completion from {} (image: {})", self.model, image.is_some());

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        // The key travels in a header; reqwest errors are stripped of the URL.
        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&Self::request_body(system_prompt, prompt, image))
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Gemini request failed: {}", e);
                anyhow!("Gemini request failed: {}", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .map_err(|e| anyhow!("Gemini API error ({}): {}", status, e.without_url()))?;
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        let ai_response: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Invalid Gemini response: {}", e.without_url()))?;
        Self::extract_text(&ai_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, api_key: &str) -> AppConfig {
        AppConfig {
            port: 0,
            database_url: String::new(),
            database_api_key: String::new(),
            database_name: "public".to_string(),
            jwt_secret: "secret".to_string(),
            gemini_api_key: api_key.to_string(),
            gemini_model: "gemini-test".to_string(),
            gemini_base_url: base_url.to_string(),
            aws_region: "us-east-1".to_string(),
            aws_access_key: String::new(),
            aws_secret_key: String::new(),
            s3_bucket: String::new(),
            s3_endpoint: None,
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_error_omits_api_key() {
        let key = "SUPER-SECRET-GEMINI-KEY";
        let client = GeminiClient::new(&config("http://127.0.0.1:9/v1beta", key)).unwrap();

        let err = client.generate_response("persona", "hello", None).await.unwrap_err();

        assert!(err.to_string().starts_with("Gemini request failed"));
        assert!(!err.to_string().contains(key));
        assert!(!format!("{:?}", err).contains(key));
    }

    #[tokio::test]
    async fn test_api_key_is_sent_as_header_not_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header_is("x-goog-api-key", "SUPER-SECRET-GEMINI-KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(
            &format!("{}/v1beta", server.uri()),
            "SUPER-SECRET-GEMINI-KEY",
        ))
        .unwrap();
        assert_eq!(client.generate_response("persona", "hello", None).await.unwrap(), "ok");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
    }

    #[test]
    fn test_request_body_carries_system_instruction_and_image() {
        let image = ImageAttachment {
            url: "https://bucket.s3.amazonaws.com/chat-images/x.png".to_string(),
            mime_type: "image/png".to_string(),
            data: vec![1, 2, 3],
        };

        let body = GeminiClient::request_body("persona", "prompt", Some(&image));

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "AQID");
    }

    #[test]
    fn test_text_only_body_has_one_part() {
        let body = GeminiClient::request_body("persona", "prompt", None);
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Drink " }, { "text": "water." }] } }]
        });
        assert_eq!(GeminiClient::extract_text(&response).unwrap(), "Drink water.");
    }

    #[test]
    fn test_extract_text_rejects_empty_candidates() {
        assert!(GeminiClient::extract_text(&json!({ "candidates": [] })).is_err());
        assert!(GeminiClient::extract_text(&json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": {} }] } }]
        }))
        .is_err());
    }
}

//! Google Gemini generateContent API client.
//!
//! Key differences from OpenAI-style APIs:
//! - Uses `contents` instead of `messages`, with `parts` instead of `content`.
//! - `generationConfig` wraps temperature, max_tokens (→ `maxOutputTokens`), etc.
//! - Response text lives at `candidates[0].content.parts[*].text`.
//! - API key goes in the `x-goog-api-key` header, never the URL.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use super::TextGenerator;
use crate::transport::send_json;
use crate::{Error, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PROVIDER: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Sampling knobs sent as `generationConfig`.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    /// Ask for `application/json` output where the model supports it.
    pub json_response: bool,
}

pub struct GeminiClient {
    base_url: String,
    api_key: SecretString,
    generation: GenerationConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, http: Client) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            generation: GenerationConfig::default(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
        });

        let mut gen_config = json!({});
        if let Some(t) = self.generation.temperature {
            gen_config["temperature"] = json!(t);
        }
        if let Some(mt) = self.generation.max_output_tokens {
            gen_config["maxOutputTokens"] = json!(mt);
        }
        if self.generation.json_response {
            gen_config["responseMimeType"] = json!("application/json");
        }
        if gen_config != json!({}) {
            body["generationConfig"] = gen_config;
        }
        body
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_text(body: &Value) -> Result<String> {
        // { candidates: [{ content: { parts: [{text: "..."}] }, finishReason }], promptFeedback }
        let text: String = body
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        if !text.trim().is_empty() {
            return Ok(text);
        }

        let reason = body
            .pointer("/promptFeedback/blockReason")
            .or_else(|| body.pointer("/candidates/0/finishReason"))
            .and_then(|v| v.as_str())
            .unwrap_or("no candidates");
        Err(Error::provider(
            PROVIDER,
            None,
            format!("empty response ({})", reason),
        ))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let request = self
            .http
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, self.api_key.expose_secret().as_str())
            .json(&self.build_body(prompt));
        let body = send_json(PROVIDER, request).await?;
        Self::parse_text(&body)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(SecretString::new("test-key".to_string()), Client::new())
            .with_base_url(base_url)
    }

    #[test]
    fn test_build_body_generation_config() {
        let c = client("http://unused").with_generation_config(GenerationConfig {
            temperature: Some(0.5),
            max_output_tokens: Some(2048),
            json_response: true,
        });
        let body = c.build_body("Hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");

        let plain = client("http://unused").build_body("Hello");
        assert!(plain.get("generationConfig").is_none());
    }

    #[test]
    fn test_parse_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{"text": "{\"q1\":"}, {"text": "\"x\"}"}], "role": "model" },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(GeminiClient::parse_text(&body).unwrap(), "{\"q1\":\"x\"}");
    }

    #[test]
    fn test_parse_text_blocked_prompt() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiClient::parse_text(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_generate_against_mock() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::Regex(r#""text":"Say hi""#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Hi!"}],"role":"model"},"finishReason":"STOP"}]}"#)
            .create_async()
            .await;

        let text = client(&server.url())
            .generate("gemini-2.0-flash", "Say hi")
            .await
            .unwrap();
        assert_eq!(text, "Hi!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_surfaces_api_error_message() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1beta/models/gemini-1.5-pro:generateContent")
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"models/gemini-1.5-pro is not found","status":"NOT_FOUND"}}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .generate("gemini-1.5-pro", "x")
            .await
            .unwrap_err();
        match err {
            Error::Provider { status, message, .. } => {
                assert_eq!(status, Some(404));
                assert!(message.contains("is not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

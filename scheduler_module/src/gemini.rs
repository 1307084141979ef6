//! Blocking client for a Gemini-style `generateContent` endpoint.

use std::time::Duration;

use content_module::{GeneratorError, TextGenerator};
use serde_json::{json, Value};
use tracing::debug;

pub struct GeminiClient {
    api_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(format!("{}?key={}", self.api_url, self.api_key))
            .json(&payload)
            .send()
            .map_err(|err| GeneratorError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeneratorError::Transport(format!(
                "status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: Value = response
            .json()
            .map_err(|err| GeneratorError::Transport(err.to_string()))?;
        let text = extract_text(&body);
        debug!("gemini returned {} chars", text.len());
        if text.trim().is_empty() {
            return Err(GeneratorError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Concatenate every text part of the first candidate.
fn extract_text(body: &Value) -> String {
    body.get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<&str>>()
                .join("")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> GeminiClient {
        GeminiClient::new(
            format!("{}/v1beta/models/gemini:generateContent", server.url()),
            "test-key",
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[test]
    fn sends_prompt_and_joins_text_parts() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1beta/models/gemini:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "parts": [{ "text": "hello" }] }]
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"Topic: "},{"text":"Bees"}]}}]}"#,
            )
            .create();

        let text = client_for(&server).generate("hello").expect("generate");
        assert_eq!(text, "Topic: Bees");
        mock.assert();
    }

    #[test]
    fn non_success_status_is_a_transport_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1beta/models/gemini:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("quota exceeded")
            .create();

        let err = client_for(&server).generate("x").expect_err("should fail");
        match err {
            GeneratorError::Transport(message) => {
                assert!(message.contains("429"));
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1beta/models/gemini:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create();

        let err = client_for(&server).generate("x").expect_err("should fail");
        assert!(matches!(err, GeneratorError::EmptyResponse));
    }
}

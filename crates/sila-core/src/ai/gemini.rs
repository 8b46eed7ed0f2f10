//! Google Gemini `generateContent` client.

use super::TextGenerator;
use crate::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Longest slice of a raw error body carried into a user-visible message.
const MAX_DETAIL_CHARS: usize = 200;

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiApiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiApiError {
    message: Option<String>,
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<SecretString>,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        tracing::debug!(
            api_key_present = api_key.is_some(),
            api_key_len = api_key.as_ref().map(|k| k.expose_secret().len()).unwrap_or(0),
            "Creating Gemini client"
        );
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_ref().ok_or(GenerationError::Configuration)?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Dispatching generateContent"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Network {
                status: e.status().map(|s| s.as_u16()),
                detail: e.without_url().to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Network {
                status: Some(status),
                detail: e.without_url().to_string(),
            })?;

        classify_response(status, &body)
    }
}

/// Maps an HTTP status and raw body onto a reply or a classified failure.
pub(crate) fn classify_response(status: u16, body: &str) -> Result<String, GenerationError> {
    let parsed = serde_json::from_str::<GeminiResponse>(body);

    if !(200..300).contains(&status) {
        let detail = parsed
            .ok()
            .and_then(|r| r.error)
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| truncate_detail(body));
        return Err(GenerationError::Network {
            status: Some(status),
            detail,
        });
    }

    let response = parsed.map_err(|_| GenerationError::Protocol {
        detail: String::new(),
    })?;

    let reply = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.trim().is_empty());

    match (reply, response.error) {
        (Some(text), _) => Ok(text),
        (None, Some(GeminiApiError { message: Some(message) })) => {
            Err(GenerationError::Protocol { detail: message })
        }
        (None, _) => Err(GenerationError::Protocol {
            detail: String::new(),
        }),
    }
}

fn truncate_detail(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_DETAIL_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_DETAIL_CHARS).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hi"},{"text":"ignored"}]}}]}"#;
        assert_eq!(classify_response(200, body), Ok("hi".to_string()));
    }

    #[test]
    fn test_empty_object_is_protocol_error() {
        let err = classify_response(200, "{}").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Protocol);
    }

    #[test]
    fn test_blank_reply_is_protocol_error() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#;
        assert!(matches!(
            classify_response(200, body),
            Err(GenerationError::Protocol { .. })
        ));
    }

    #[test]
    fn test_success_status_with_error_field_keeps_message() {
        let body = r#"{"error":{"message":"model overloaded"}}"#;
        assert_eq!(
            classify_response(200, body),
            Err(GenerationError::Protocol {
                detail: "model overloaded".to_string()
            })
        );
    }

    #[test]
    fn test_error_status_prefers_service_message() {
        let body = r#"{"error":{"code":500,"message":"quota exceeded"}}"#;
        assert_eq!(
            classify_response(500, body),
            Err(GenerationError::Network {
                status: Some(500),
                detail: "quota exceeded".to_string()
            })
        );
    }

    #[test]
    fn test_error_status_with_plain_body_is_truncated() {
        let body = "x".repeat(500);
        match classify_response(502, &body) {
            Err(GenerationError::Network { status, detail }) => {
                assert_eq!(status, Some(502));
                assert_eq!(detail.chars().count(), MAX_DETAIL_CHARS + 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = GeminiClient::new(Some("secret-value".to_string()));
        let printed = format!("{client:?}");
        assert!(!printed.contains("secret-value"));
        assert!(printed.contains("<REDACTED>"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = GeminiClient::new(None).with_base_url("http://127.0.0.1:9");
        assert_eq!(
            client.generate("hello").await,
            Err(GenerationError::Configuration)
        );
    }
}

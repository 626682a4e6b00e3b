use async_trait::async_trait;
use reqwest::Client;
use serde::{de::IgnoredAny, Deserialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::{preview, GenerationError, TextGenerator};

pub const DEMO_KEY: &str = "DEMO_KEY";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn redact(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.api_key, "***")
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key == DEMO_KEY {
            info!("Using demo mode - no model call made");
            return Err(GenerationError::NotConfigured("GEMINI_API_KEY is not set".into()));
        }

        let url = self.endpoint();
        info!("🔗 Calling {} with prompt of {} chars", self.redact(&url), prompt.chars().count());

        let payload = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 8192
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::Http(self.redact(&e.to_string())))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Http(self.redact(&e.to_string())))?;

        if !status.is_success() {
            error!(
                "❌ Gemini API failed with status {}: {}",
                status,
                preview(&response_text, 500)
            );
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: response_text,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
            GenerationError::Parse(format!("{}: {}", e, preview(&response_text, 200)))
        })?;

        let block_reason = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        if let Some(reason) = block_reason {
            warn!("⚠️ Prompt was blocked by the model: {}", reason);
        }

        let text = first_text(&parsed).ok_or(GenerationError::Empty)?;
        info!("📥 Gemini response received ({} chars)", text.chars().count());
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Non-text parts (inline data, function calls) are skipped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(IgnoredAny),
}

fn first_text(resp: &GeminiResponse) -> Option<String> {
    resp.candidates
        .iter()
        .flat_map(|c| &c.content.parts)
        .find_map(|p| match p {
            Part::Text { text } if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    fn client(server: &mockito::ServerGuard) -> GeminiClient {
        GeminiClient::new("secret".into(), server.url(), "gemini-test".into())
    }

    fn generate_path() -> Matcher {
        Matcher::Regex(r"^/models/gemini-test:generateContent".to_string())
    }

    #[tokio::test]
    async fn returns_first_text_part() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", generate_path())
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"inlineData":{}},{"text":"  {\"days\":[]}\n"}]}}]}"#)
            .create_async()
            .await;

        let text = client(&server).generate("plan a trip").await.unwrap();
        assert_eq!(text, "{\"days\":[]}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_error_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", generate_path())
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        match client(&server).generate("plan").await {
            Err(GenerationError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", generate_path())
            .with_status(200)
            .with_body(r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        assert!(matches!(client(&server).generate("plan").await, Err(GenerationError::Empty)));
    }

    #[tokio::test]
    async fn demo_key_never_calls_out() {
        let client = GeminiClient::new(DEMO_KEY.into(), "http://127.0.0.1:9".into(), "gemini-test".into());
        assert!(matches!(client.generate("plan").await, Err(GenerationError::NotConfigured(_))));
    }

    #[test]
    fn redacts_api_key() {
        let client = GeminiClient::new("secret".into(), "https://example.test/v1beta/".into(), "m".into());
        assert_eq!(
            client.redact(&client.endpoint()),
            "https://example.test/v1beta/models/m:generateContent?key=***"
        );
    }
}

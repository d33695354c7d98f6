//! Minimal client for OpenAI-compatible `chat/completions` endpoints (xAI Grok, OpenAI).

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{LlmConfig, LlmError, error::truncate_body};

/// Which hosted model family a handler talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Grok,
    OpenAi,
}

impl Backend {
    pub fn label(&self) -> &'static str {
        match self {
            Backend::Grok => "Grok AI",
            Backend::OpenAi => "OpenAI GPT-4",
        }
    }

    fn endpoint<'a>(&self, llm: &'a LlmConfig) -> (&'a str, &'a str) {
        match self {
            Backend::Grok => (llm.xai_base_url.as_str(), llm.grok_model.as_str()),
            Backend::OpenAi => (llm.openai_base_url.as_str(), llm.openai_model.as_str()),
        }
    }
}

/// One system + user exchange.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(http: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn for_backend(http: Client, backend: Backend, llm: &LlmConfig, api_key: &str) -> Self {
        let (base_url, model) = backend.endpoint(llm);
        Self::new(http, base_url, api_key, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the prompt and returns the first choice's text.
    pub async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        debug!(%url, model = %self.model, "sending chat completion");

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            warn!(%status, model = %self.model, "chat completion rejected");
            return Err(LlmError::Upstream {
                status,
                body: truncate_body(&text),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::MalformedPayload(format!("invalid completion envelope: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedPayload("completion contained no message".into()))
    }

    /// Like [`complete`](Self::complete), but validates the reply against `T`.
    pub async fn complete_json<T: DeserializeOwned>(&self, prompt: &Prompt) -> Result<T, LlmError> {
        let text = self.complete(prompt).await?;
        parse_json_reply(&text)
    }
}

/// Parses the outermost JSON object of a model reply, tolerating prose or code fences around it.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let json = extract_json_object(text)
        .ok_or_else(|| LlmError::MalformedPayload("reply contains no JSON object".into()))?;

    serde_json::from_str(json).map_err(|e| {
        LlmError::MalformedPayload(format!("{e} in reply: {}", truncate_body(json)))
    })
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        ok: bool,
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "system".into(),
            user: "user".into(),
            max_tokens: 50,
            temperature: 0.3,
        }
    }

    fn client(server: &MockServer) -> ChatClient {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let base_url = format!("{}/v1/", server.uri());
        ChatClient::new(http, &base_url, "secret", "grok-4-latest")
    }

    #[test]
    fn json_is_found_inside_code_fences() {
        let verdict: Verdict = parse_json_reply("```json\n{\"ok\": true}\n```").unwrap();
        assert_eq!(verdict, Verdict { ok: true });
    }

    #[test]
    fn reply_without_json_is_malformed() {
        let err = parse_json_reply::<Verdict>("Ich kann das nicht beantworten.").unwrap_err();
        assert!(matches!(err, LlmError::MalformedPayload(_)));
    }

    #[test]
    fn schema_mismatch_is_malformed() {
        let err = parse_json_reply::<Verdict>("{\"ok\": \"vielleicht\"}").unwrap_err();
        assert!(matches!(err, LlmError::MalformedPayload(_)));
    }

    #[test]
    fn backends_pick_their_endpoint() {
        let llm = LlmConfig::default();
        let http = Client::new();
        let grok = ChatClient::for_backend(http.clone(), Backend::Grok, &llm, "k");
        let openai = ChatClient::for_backend(http, Backend::OpenAi, &llm, "k");

        assert_eq!(grok.model(), "grok-4-latest");
        assert_eq!(openai.model(), "gpt-4");
    }

    #[tokio::test]
    async fn complete_sends_bearer_and_messages() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "model": "grok-4-latest",
                "max_tokens": 50,
                "messages": [
                    {"role": "system", "content": "system"},
                    {"role": "user", "content": "user"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let verdict: Verdict = client(&server).complete_json(&prompt()).await.unwrap();
        assert_eq!(verdict, Verdict { ok: true });
    }

    #[tokio::test]
    async fn non_success_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(&server).complete(&prompt()).await.unwrap_err();
        match err {
            LlmError::Upstream { status, body } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = client(&server).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedPayload(_)));
    }
}

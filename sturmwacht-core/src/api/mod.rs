//! Framework-independent handlers for the AI-backed endpoints.
//!
//! Only a wrong method yields a non-200 status (405). Missing credentials,
//! upstream failures, malformed model replies and malformed request bodies all
//! produce HTTP 200 with deterministic fallback content and an `error` field.

pub mod content;
pub mod permit;
pub mod seo;

use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::{
    Config, LlmConfig, LlmError,
    config::llm_api_key_from_env,
    llm::{Backend, ChatClient},
};

/// Shared state for the handlers: credentials, endpoints and one HTTP client.
#[derive(Debug, Clone)]
pub struct ApiContext {
    api_key: Option<String>,
    llm: LlmConfig,
    http: Client,
}

impl ApiContext {
    pub fn new(
        api_key: Option<String>,
        llm: LlmConfig,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { api_key, llm, http })
    }

    /// Reads the key from `OPENAI_API_KEY`; without it every handler serves fallbacks.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let ctx = Self::new(
            llm_api_key_from_env(),
            config.llm.clone(),
            config.http_timeout(),
        )?;
        if !ctx.is_live() {
            warn!("OPENAI_API_KEY not set, AI endpoints will serve fallback content");
        }
        Ok(ctx)
    }

    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn chat(&self, backend: Backend) -> Result<ChatClient, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        Ok(ChatClient::for_backend(self.http.clone(), backend, &self.llm, api_key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    TreePermit,
    SeoOptimize,
    GenerateContent,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::TreePermit => "check-tree-permit",
            Route::SeoOptimize => "seo-optimize",
            Route::GenerateContent => "generate-content",
        }
    }

    pub const fn all() -> &'static [Route] {
        &[Route::TreePermit, Route::SeoOptimize, Route::GenerateContent]
    }

    pub fn from_path(segment: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|route| route.as_str() == segment)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self { status: 200, body },
            Err(err) => {
                error!(error = %err, "failed to serialize handler response");
                let message = format!("Antwort konnte nicht erstellt werden: {err}");
                Self {
                    status: 200,
                    body: json!({ "error": message }),
                }
            }
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: 405,
            body: json!({ "error": "Method not allowed" }),
        }
    }
}

/// Dispatches one request. `method` is the raw HTTP method name.
pub async fn handle(route: Route, method: &str, body: &[u8], ctx: &ApiContext) -> ApiResponse {
    if !method.eq_ignore_ascii_case("POST") {
        debug!(route = route.as_str(), method, "rejecting non-POST request");
        return ApiResponse::method_not_allowed();
    }

    match route {
        Route::TreePermit => permit::handle(body, ctx).await,
        Route::SeoOptimize => seo::handle(body, ctx).await,
        Route::GenerateContent => content::handle(body, ctx).await,
    }
}

/// Decodes a JSON body; malformed input degrades to `T::default()` plus a note.
pub(crate) fn decode_body<T: DeserializeOwned + Default>(body: &[u8]) -> (T, Option<String>) {
    if body.iter().all(u8::is_ascii_whitespace) {
        return (T::default(), None);
    }

    match serde_json::from_slice(body) {
        Ok(request) => (request, None),
        Err(err) => {
            warn!(error = %err, "malformed request body");
            (T::default(), Some(format!("Ungültige Anfrage: {err}")))
        }
    }
}

pub(crate) fn failure_note(err: &LlmError) -> String {
    match err {
        LlmError::MissingApiKey => err.to_string(),
        other => format!("API-Fehler: {other}"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use wiremock::ResponseTemplate;

    pub fn offline() -> ApiContext {
        ApiContext::new(None, LlmConfig::default(), Duration::from_secs(5)).unwrap()
    }

    pub fn against(base_url: &str) -> ApiContext {
        against_with_timeout(base_url, Duration::from_secs(5))
    }

    pub fn against_with_timeout(base_url: &str, timeout: Duration) -> ApiContext {
        let llm = LlmConfig {
            xai_base_url: base_url.to_string(),
            openai_base_url: base_url.to_string(),
            ..LlmConfig::default()
        };
        ApiContext::new(Some("test-key".into()), llm, timeout).unwrap()
    }

    pub fn completion(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    /// A 200 chat completion whose first message is `content`.
    pub fn answer(content: &str) -> ResponseTemplate {
        let body = completion(content);
        ResponseTemplate::new(200).set_body_json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_resolve_from_path_segments() {
        for route in Route::all() {
            assert_eq!(Route::from_path(route.as_str()), Some(*route));
        }
        assert_eq!(Route::from_path("seo-monitor"), None);
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected_on_every_route() {
        let ctx = testing::offline();
        for route in Route::all() {
            for method in ["GET", "PUT", "DELETE", "OPTIONS"] {
                let res = handle(*route, method, b"{}", &ctx).await;
                assert_eq!(res.status, 405, "{method} {}", route.as_str());
                assert_eq!(res.body["error"], "Method not allowed");
            }
        }
    }

    #[tokio::test]
    async fn every_post_without_key_is_200_with_error() {
        let ctx = testing::offline();
        for route in Route::all() {
            let res = handle(*route, "post", b"{}", &ctx).await;
            assert_eq!(res.status, 200, "{}", route.as_str());
            assert!(res.body.get("error").is_some(), "{}", route.as_str());
        }
    }

    #[test]
    fn blank_body_decodes_to_defaults_without_note() {
        let (value, note): (std::collections::HashMap<String, String>, _) = decode_body(b"  \n");
        assert!(value.is_empty());
        assert!(note.is_none());
    }

    #[test]
    fn broken_body_decodes_to_defaults_with_note() {
        let (_, note): (std::collections::HashMap<String, String>, _) = decode_body(b"{ nope");
        assert!(note.unwrap().starts_with("Ungültige Anfrage"));
    }

    #[test]
    fn failure_notes_distinguish_missing_key() {
        assert_eq!(failure_note(&LlmError::MissingApiKey), "API-Key nicht konfiguriert");
        let note = failure_note(&LlmError::MalformedPayload("x".into()));
        assert!(note.starts_with("API-Fehler: "));
    }
}

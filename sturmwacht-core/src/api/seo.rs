//! `seo-optimize`: local-search metadata and recommendations for the business site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ApiContext, ApiResponse, decode_body, failure_note};
use crate::{
    LlmError,
    llm::{Backend, Prompt},
};

const PHONE: &str = "030 65 94 00 49";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeoRequest {
    pub business: String,
    pub location: String,
    pub services: Vec<String>,
    pub competitors: Vec<String>,
    pub current_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationKind {
    Meta,
    Content,
    Technical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    #[serde(rename = "type")]
    pub kind: OptimizationKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub impact: Impact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoOptimization {
    pub meta_title: String,
    pub meta_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub optimizations: Vec<Optimization>,
    #[serde(default)]
    pub structured_data: Value,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub optimization: SeoOptimization,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn handle(body: &[u8], ctx: &ApiContext) -> ApiResponse {
    let (request, decode_error) = decode_body::<SeoRequest>(body);
    if let Some(note) = decode_error {
        return ApiResponse::ok(&fallback_response(&request, note));
    }

    match optimize(&request, ctx).await {
        Ok(mut optimization) => {
            if optimization.structured_data.is_null() {
                optimization.structured_data = local_business_schema(&request);
            }
            info!(keywords = optimization.keywords.len(), "seo optimization answered");
            ApiResponse::ok(&SeoResponse {
                status: "success",
                optimization,
                timestamp: Utc::now(),
                source: Backend::OpenAi.label().to_string(),
                error: None,
            })
        }
        Err(err) => {
            warn!(error = %err, "seo optimization degraded to fallback");
            ApiResponse::ok(&fallback_response(&request, failure_note(&err)))
        }
    }
}

async fn optimize(request: &SeoRequest, ctx: &ApiContext) -> Result<SeoOptimization, LlmError> {
    let chat = ctx.chat(Backend::OpenAi)?;
    chat.complete_json(&prompt(request)).await
}

fn prompt(request: &SeoRequest) -> Prompt {
    let system = format!(
        "Du bist SEO-Experte für lokale Dienstleister in Deutschland. Erstelle konkrete \
         Optimierungen für lokale Rankings in {}. Antworte ausschließlich als JSON mit den \
         Feldern metaTitle (max. 60 Zeichen), metaDescription (max. 160 Zeichen), keywords, \
         optimizations (Liste aus type meta|content|technical, title, description, impact \
         high|medium|low), structuredData (schema.org LocalBusiness) und recommendations.",
        request.location
    );

    let user = format!(
        "Unternehmen: {}\nStandort: {}\nServices: {}\nKonkurrenten: {}\n\nAktueller Content: {}",
        request.business,
        request.location,
        request.services.join(", "),
        request.competitors.join(", "),
        request.current_content,
    );

    Prompt {
        system,
        user,
        max_tokens: 2000,
        temperature: 0.7,
    }
}

/// schema.org `LocalBusiness` JSON-LD for the request's business.
pub fn local_business_schema(request: &SeoRequest) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "LocalBusiness",
        "name": request.business,
        "description": "Professionelle Baumarbeiten, Baumfällung und Baufeldräumung",
        "address": {
            "@type": "PostalAddress",
            "addressLocality": request.location,
            "addressCountry": "DE"
        },
        "telephone": PHONE,
        "serviceArea": request.location,
        "services": request.services
    })
}

fn fallback_response(request: &SeoRequest, error: String) -> SeoResponse {
    SeoResponse {
        status: "fallback",
        optimization: fallback_optimization(request),
        timestamp: Utc::now(),
        source: "Fallback System".to_string(),
        error: Some(error),
    }
}

pub fn fallback_optimization(request: &SeoRequest) -> SeoOptimization {
    let optimization = |kind, title: &str, description: &str, impact| Optimization {
        kind,
        title: title.to_string(),
        description: description.to_string(),
        impact,
    };

    SeoOptimization {
        meta_title: "Baumfäller24 - Professionelle Baumarbeiten Berlin Brandenburg".to_string(),
        meta_description: format!(
            "Professionelle Baumfällung, Baufeldräumung und Rodung in Berlin & Brandenburg. \
             Hebebühne bis 40m, Seilklettertechnik. ☎ {PHONE}"
        ),
        keywords: [
            "Baumfällung Berlin",
            "Baufeldräumung Brandenburg",
            "Stubbenfräsung",
            "Seilklettertechnik",
        ]
        .map(String::from)
        .to_vec(),
        optimizations: vec![
            optimization(
                OptimizationKind::Meta,
                "Meta-Tags optimiert",
                "Titel und Beschreibung für lokale Suche angepasst",
                Impact::High,
            ),
            optimization(
                OptimizationKind::Content,
                "Lokale Keywords integriert",
                "Suchbegriffe für Berlin & Brandenburg hinzugefügt",
                Impact::High,
            ),
            optimization(
                OptimizationKind::Technical,
                "Strukturierte Daten",
                "Schema.org LocalBusiness Markup implementiert",
                Impact::Medium,
            ),
        ],
        structured_data: local_business_schema(request),
        recommendations: [
            "Google My Business Profil optimieren",
            "Lokale Backlinks von Berlin/Brandenburg Websites aufbauen",
            "Kundenbewertungen aktiv sammeln",
            "Regelmäßige Blog-Artikel zu Baumarbeiten veröffentlichen",
        ]
        .map(String::from)
        .to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Route, handle as dispatch, testing};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer};

    async fn post(ctx: &ApiContext) -> ApiResponse {
        dispatch(Route::SeoOptimize, "POST", &body(), ctx).await
    }

    fn body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "business": "Baumfäller24",
            "location": "Berlin",
            "services": ["Baumfällung", "Stubbenfräsung"],
            "competitors": ["Baumdienst Nord"],
            "currentContent": "Wir fällen Bäume."
        }))
        .unwrap()
    }

    #[test]
    fn structured_data_reflects_request() {
        let request = SeoRequest {
            business: "Baumfäller24".into(),
            location: "Potsdam".into(),
            services: vec!["Rodung".into()],
            ..SeoRequest::default()
        };
        let schema = local_business_schema(&request);

        assert_eq!(schema["@type"], "LocalBusiness");
        assert_eq!(schema["address"]["addressLocality"], "Potsdam");
        assert_eq!(schema["services"][0], "Rodung");
    }

    #[tokio::test]
    async fn without_key_serves_static_fallback() {
        let res = post(&testing::offline()).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "fallback");
        assert_eq!(res.body["error"], "API-Key nicht konfiguriert");
        assert_eq!(res.body["optimizations"].as_array().unwrap().len(), 3);
        assert_eq!(res.body["optimizations"][2]["type"], "technical");
        assert_eq!(res.body["structuredData"]["name"], "Baumfäller24");
    }

    #[tokio::test]
    async fn live_answer_gets_status_and_source() {
        let server = MockServer::start().await;
        let reply = json!({
            "metaTitle": "Baumfällung Berlin | Baumfäller24",
            "metaDescription": "Sicher und schnell.",
            "keywords": ["Baumfällung Berlin"],
            "optimizations": [
                {"type": "content", "title": "FAQ ergänzen", "description": "", "impact": "medium"}
            ],
            "recommendations": ["Bewertungen sammeln"]
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-4" })))
            .respond_with(testing::answer(&reply.to_string()))
            .mount(&server)
            .await;

        let res = post(&testing::against(&server.uri())).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "success");
        assert_eq!(res.body["source"], "OpenAI GPT-4");
        assert_eq!(res.body["metaTitle"], "Baumfällung Berlin | Baumfäller24");
        assert_eq!(res.body["structuredData"]["address"]["addressLocality"], "Berlin");
        assert!(res.body.get("error").is_none());
    }

    #[tokio::test]
    async fn prose_reply_degrades_to_fallback() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(testing::answer("Gerne helfe ich!"))
            .mount(&server)
            .await;

        let res = post(&testing::against(&server.uri())).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "fallback");
        let error = res.body["error"].as_str().unwrap();
        assert!(error.starts_with("API-Fehler"));
    }
}

//! `generate-content`: SEO copy (blog posts, FAQ entries, service pages) with on-page metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{ApiContext, ApiResponse, decode_body, failure_note};
use crate::{
    LlmError,
    llm::{Backend, Prompt},
};

const PHONE: &str = "030 65 94 00 49";
const DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    BlogPost,
    FaqEntry,
    ServiceDescription,
    LocalContent,
}

impl ContentType {
    /// Unknown names map to `ServiceDescription`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "blog_post" => ContentType::BlogPost,
            "faq_entry" => ContentType::FaqEntry,
            "local_content" => ContentType::LocalContent,
            _ => ContentType::ServiceDescription,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentRequest {
    pub content_type: String,
    pub location: String,
    pub service: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub headings: Vec<String>,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub status: &'static str,
    pub content_id: String,
    pub content: String,
    pub metadata: SeoMetadata,
    pub word_count: usize,
    pub keyword_density: BTreeMap<String, f64>,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackContent {
    pub status: &'static str,
    pub content: String,
    pub message: String,
    pub error: String,
}

pub async fn handle(body: &[u8], ctx: &ApiContext) -> ApiResponse {
    let (request, decode_error) = decode_body::<ContentRequest>(body);
    let kind = ContentType::from_name(&request.content_type);
    if let Some(note) = decode_error {
        return ApiResponse::ok(&fallback(kind, &request, note));
    }

    match generate(kind, &request, ctx).await {
        Ok(content) => {
            let generated = analyze(content, &request.keywords, Utc::now());
            info!(
                content_id = %generated.content_id,
                words = generated.word_count,
                "content generated"
            );
            ApiResponse::ok(&generated)
        }
        Err(err) => {
            warn!(error = %err, "content generation degraded to fallback");
            ApiResponse::ok(&fallback(kind, &request, failure_note(&err)))
        }
    }
}

async fn generate(
    kind: ContentType,
    request: &ContentRequest,
    ctx: &ApiContext,
) -> Result<String, LlmError> {
    let chat = ctx.chat(Backend::Grok)?;
    let content = chat.complete(&prompt(kind, request)).await?;
    if content.trim().is_empty() {
        return Err(LlmError::MalformedPayload("model returned empty content".into()));
    }
    Ok(content)
}

fn prompt(kind: ContentType, request: &ContentRequest) -> Prompt {
    let system = "Du bist SEO-Content-Experte für Baumarbeiten in Deutschland. Schreibe \
fachlich korrekten, vertrauenswürdigen Content mit natürlicher Keyword-Integration, lokalem \
Bezug und Handlungsaufforderung zu Baumfäller24. Formatiere mit h2, h3, p, ul und li Tags."
        .to_string();

    let keywords = request.keywords.join(", ");
    let (service, location) = (&request.service, &request.location);
    let user = match kind {
        ContentType::BlogPost => format!(
            "Schreibe einen SEO-optimierten Blog-Artikel (ca. 800 Wörter) über \"{service}\" in \
             \"{location}\". Zielkeywords: {keywords}. Gliederung: Einleitung mit lokalem Bezug, \
             praktische Tipps, rechtliche Hinweise zu Genehmigungen, warum Profis, Fazit mit CTA."
        ),
        ContentType::FaqEntry => format!(
            "Erstelle eine FAQ-Antwort (200-300 Wörter) auf die Frage \"{service}\" zu \
             Baumarbeiten in {location}. Keywords: {keywords}. Rechtliche Aspekte und \
             Handlungsschritte nennen."
        ),
        ContentType::ServiceDescription => format!(
            "Schreibe eine Service-Beschreibung (ca. 400 Wörter) für \"{service}\" in \
             \"{location}\". Zielkeywords: {keywords}. Was, wann nötig, Vorgehen, Technik, \
             lokale Expertise, Preis-Transparenz, CTA."
        ),
        ContentType::LocalContent => format!(
            "Erstelle lokalen Content (ca. 500 Wörter) über Baumarbeiten in \"{location}\" zum \
             Thema {service}. Keywords: {keywords}. Lokale Baumarten, Wetter und Saison, \
             Vorschriften, Referenzen."
        ),
    };

    Prompt {
        system,
        user,
        max_tokens: 2000,
        temperature: 0.7,
    }
}

fn fallback(kind: ContentType, request: &ContentRequest, error: String) -> FallbackContent {
    FallbackContent {
        status: "fallback",
        content: fallback_template(kind, &request.location, &request.service),
        message: "Grok AI nicht verfügbar - Fallback Content verwendet".to_string(),
        error,
    }
}

/// Static copy per content type; local content reuses the service template.
pub fn fallback_template(kind: ContentType, location: &str, service: &str) -> String {
    match kind {
        ContentType::BlogPost => format!(
            "<h1>Professionelle {service} in {location}</h1>\n\
             <p>Als erfahrener Anbieter für Baumarbeiten in {location} bieten wir Ihnen professionelle \
             {service} mit modernster Technik und höchsten Sicherheitsstandards.</p>\n\
             <h2>Warum professionelle {service}?</h2>\n\
             <p>Baumarbeiten erfordern Fachwissen und die richtige Ausrüstung. Unser Team verfügt über \
             12 Jahre Erfahrung in {location} und Umgebung.</p>\n\
             <h2>Unser Service</h2>\n\
             <ul>\n<li>Kostenlose Beratung vor Ort</li>\n<li>Moderne Technik und Sicherheitsausrüstung</li>\n\
             <li>Vollversicherte Arbeiten</li>\n<li>Faire und transparente Preise</li>\n</ul>\n\
             <p>Kontaktieren Sie uns für ein kostenloses Angebot: {PHONE}</p>"
        ),
        ContentType::FaqEntry => format!(
            "<p>Bei {service} in {location} sind verschiedene Faktoren zu beachten. Als professioneller \
             Anbieter beraten wir Sie gerne zu allen Aspekten.</p>\n\
             <p>Wichtige Punkte: Genehmigungen prüfen, Sicherheit gewährleisten, fachgerechte \
             Durchführung. Kontaktieren Sie uns für eine individuelle Beratung.</p>"
        ),
        ContentType::ServiceDescription | ContentType::LocalContent => format!(
            "<h2>{service} in {location}</h2>\n\
             <p>Professionelle {service} mit 12 Jahren Erfahrung. Moderne Technik, vollversichert, \
             faire Preise.</p>\n\
             <p>Rufen Sie uns an: {PHONE}</p>"
        ),
    }
}

/// Wraps generated copy with SEO metadata, keyword density and editorial suggestions.
pub fn analyze(content: String, keywords: &[String], now: DateTime<Utc>) -> GeneratedContent {
    let word_count = word_count(&content);
    let keyword_density = keyword_density(&content, keywords);
    let suggestions = suggestions(&content, word_count, &keyword_density);
    let metadata = SeoMetadata {
        title: extract_title(&content).unwrap_or_else(|| "Professionelle Baumarbeiten".to_string()),
        description: summarize(&content),
        keywords: keywords.to_vec(),
        headings: extract_headings(&content),
        word_count,
    };

    GeneratedContent {
        status: "success",
        content_id: format!("content_{}", now.timestamp_millis()),
        content,
        metadata,
        word_count,
        keyword_density,
        suggestions,
        timestamp: now,
    }
}

fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Percentage of case-insensitive keyword occurrences per word, two decimals.
fn keyword_density(content: &str, keywords: &[String]) -> BTreeMap<String, f64> {
    let haystack = content.to_lowercase();
    let words = word_count(content).max(1) as f64;

    keywords
        .iter()
        .filter(|keyword| !keyword.trim().is_empty())
        .map(|keyword| {
            let hits = haystack.matches(&keyword.to_lowercase()).count() as f64;
            let density = (hits / words * 100.0 * 100.0).round() / 100.0;
            (keyword.clone(), density)
        })
        .collect()
}

fn suggestions(content: &str, word_count: usize, density: &BTreeMap<String, f64>) -> Vec<String> {
    let mut out = Vec::new();

    for (keyword, &value) in density {
        if value < 0.5 {
            out.push(format!(
                "Keyword \"{keyword}\" könnte häufiger verwendet werden (aktuell {value:.2}%)"
            ));
        }
        if value > 3.0 {
            out.push(format!(
                "Keyword \"{keyword}\" wird zu oft verwendet ({value:.2}%) - Keyword Stuffing vermeiden"
            ));
        }
    }

    if word_count < 300 {
        out.push(
            "Content könnte länger sein für bessere SEO-Performance (mindestens 300 Wörter)".to_string(),
        );
    }

    if !content.contains("<h2>") {
        out.push("H2-Überschriften hinzufügen für bessere Struktur".to_string());
    }

    out
}

fn extract_title(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        let title = if let Some(start) = line.find("<h1>") {
            let rest = &line[start + "<h1>".len()..];
            rest.split("</h1>").next().unwrap_or(rest)
        } else if line.starts_with('#') && !line.starts_with("##") {
            line.trim_start_matches('#')
        } else {
            return None;
        };
        let title = strip_tags(title).trim().to_string();
        (!title.is_empty()).then_some(title)
    })
}

/// Text of every `<h2>`..`<h6>` element, in document order.
fn extract_headings(content: &str) -> Vec<String> {
    let mut headings = Vec::new();
    let mut rest = content;

    while let Some(open) = rest.find("<h") {
        let after = &rest[open + 2..];
        let level = after.chars().next().filter(|c| ('2'..='6').contains(c));
        match level {
            Some(level) if after[1..].starts_with('>') => {
                let body = &after[2..];
                let close = format!("</h{level}>");
                match body.find(&close) {
                    Some(end) => {
                        headings.push(body[..end].to_string());
                        rest = &body[end + close.len()..];
                    }
                    None => break,
                }
            }
            _ => rest = after,
        }
    }

    headings
}

fn summarize(content: &str) -> String {
    let plain = strip_tags(content);
    let text: String = plain.chars().take(DESCRIPTION_CHARS).collect();
    format!("{}...", text.trim())
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

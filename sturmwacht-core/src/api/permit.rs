//! `check-tree-permit`: does felling this tree need a permit in Berlin/Brandenburg?

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiContext, ApiResponse, decode_body, failure_note};
use crate::{
    LlmError,
    llm::{Backend, Prompt},
};

const PUBLIC_PROPERTY: &str = "Öffentlicher Raum/Straße";
const AI_DISCLAIMER: &str =
    "Diese Einschätzung dient nur zur Orientierung und ersetzt keine rechtliche Beratung.";
const FALLBACK_DISCLAIMER: &str =
    "Diese Grundeinschätzung ersetzt keine fachliche Beratung oder behördliche Auskunft.";
const FALLBACK_DETAILS: &str =
    "Aufgrund technischer Probleme kann keine detaillierte KI-Analyse durchgeführt werden.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermitRequest {
    pub location: String,
    pub tree_type: String,
    /// Diameter bucket slug, e.g. `"20-40cm"` or `"ueber-80cm"`.
    pub diameter: String,
    pub height: String,
    pub reason: String,
    pub property: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitRequirement {
    Yes,
    No,
    Maybe,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Shape the model must answer with; anything else is rejected as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitAssessment {
    pub requires_permit: PermitRequirement,
    pub confidence: Confidence,
    pub summary: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub authority: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub costs: String,
    #[serde(default)]
    pub legal_basis: String,
    #[serde(default)]
    pub exceptions: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitResponse {
    #[serde(flatten)]
    pub assessment: PermitAssessment,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub disclaimer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

pub async fn handle(body: &[u8], ctx: &ApiContext) -> ApiResponse {
    let (request, decode_error) = decode_body::<PermitRequest>(body);
    if let Some(note) = decode_error {
        return ApiResponse::ok(&fallback_response(&request, note, None));
    }

    match check(&request, ctx).await {
        Ok(assessment) => {
            info!(requires_permit = ?assessment.requires_permit, "tree permit check answered");
            ApiResponse::ok(&PermitResponse {
                assessment,
                timestamp: Utc::now(),
                source: Backend::Grok.label().to_string(),
                disclaimer: AI_DISCLAIMER.to_string(),
                error: None,
                debug: None,
            })
        }
        Err(err) => {
            warn!(error = %err, "tree permit check degraded to fallback");
            let debug = (!matches!(err, LlmError::MissingApiKey))
                .then(|| "Fallback-System aktiviert".to_string());
            ApiResponse::ok(&fallback_response(&request, failure_note(&err), debug))
        }
    }
}

async fn check(request: &PermitRequest, ctx: &ApiContext) -> Result<PermitAssessment, LlmError> {
    let chat = ctx.chat(Backend::Grok)?;
    chat.complete_json(&prompt(request)).await
}

fn prompt(request: &PermitRequest) -> Prompt {
    let system = "Du bist Experte für die Berliner Baumschutzverordnung und das \
Brandenburgische Naturschutzgesetz. Beurteile, ob für ein Fällvorhaben eine Genehmigung \
erforderlich ist, welche Behörde zuständig ist und welche Schritte nötig sind. \
Antworte ausschließlich als JSON mit den Feldern requiresPermit (yes|no|maybe|unknown), \
confidence (high|medium|low), summary, details, nextSteps (Liste), authority, \
estimatedTime, costs, legalBasis, exceptions."
        .to_string();

    let user = format!(
        "Standort: {}\nBaumart: {}\nStammdurchmesser: {}\nBaumhöhe: {}\n\
         Grund der Fällung: {}\nEigentumsart: {}",
        request.location,
        request.tree_type,
        request.diameter,
        request.height,
        request.reason,
        request.property,
    );

    Prompt {
        system,
        user,
        max_tokens: 1500,
        temperature: 0.3,
    }
}

fn fallback_response(
    request: &PermitRequest,
    error: String,
    debug: Option<String>,
) -> PermitResponse {
    PermitResponse {
        assessment: fallback_assessment(request),
        timestamp: Utc::now(),
        source: "Fallback System".to_string(),
        disclaimer: FALLBACK_DISCLAIMER.to_string(),
        error: Some(error),
        debug,
    }
}

/// Representative trunk diameter in cm for a form bucket; unknown buckets count as 30.
fn diameter_cm(bucket: &str) -> u32 {
    const BUCKETS: [(&str, u32); 6] = [
        ("unter-10", 5),
        ("10-20", 15),
        ("20-40", 30),
        ("40-60", 50),
        ("60-80", 70),
        ("ueber-80", 90),
    ];

    BUCKETS
        .iter()
        .find(|(slug, _)| bucket.contains(slug))
        .map_or(30, |(_, cm)| *cm)
}

/// Rule-of-thumb verdict used when the model is unavailable.
pub fn fallback_assessment(request: &PermitRequest) -> PermitAssessment {
    let is_berlin = request.location.to_lowercase().contains("berlin");
    let diameter = diameter_cm(&request.diameter);
    let reason = request.reason.to_lowercase();

    let (requires_permit, confidence, summary) = if request.property == PUBLIC_PROPERTY {
        (
            PermitRequirement::Yes,
            Confidence::High,
            "Bäume im öffentlichen Raum benötigen grundsätzlich eine Genehmigung.",
        )
    } else if diameter >= 80 {
        (
            PermitRequirement::Yes,
            Confidence::High,
            "Große Bäume (über 80cm Durchmesser) sind meist genehmigungspflichtig.",
        )
    } else if diameter < 10 {
        (
            PermitRequirement::No,
            Confidence::Medium,
            "Sehr kleine Bäume (unter 10cm) sind meist nicht genehmigungspflichtig.",
        )
    } else if reason.contains("krank") || reason.contains("sturmschäden") {
        (
            PermitRequirement::Maybe,
            Confidence::Medium,
            "Bei kranken oder sturmgeschädigten Bäumen gibt es oft Ausnahmeregelungen.",
        )
    } else {
        (
            PermitRequirement::Maybe,
            Confidence::Low,
            "Genehmigungsprüfung nicht verfügbar - Grundeinschätzung basierend auf häufigen Regeln.",
        )
    };

    let (authority, legal_basis) = if is_berlin {
        ("Bezirksamt (Umwelt- und Naturschutzamt)", "Berliner Baumschutzverordnung")
    } else {
        ("Untere Naturschutzbehörde des Landkreises", "Brandenburgisches Naturschutzgesetz")
    };

    PermitAssessment {
        requires_permit,
        confidence,
        summary: summary.to_string(),
        details: FALLBACK_DETAILS.to_string(),
        next_steps: vec![
            "Kontaktieren Sie die zuständige Behörde für eine verbindliche Auskunft".to_string(),
            "Lassen Sie sich von Baumfäller24 beraten".to_string(),
            "Bei Genehmigungspflicht: Antrag stellen vor der Fällung".to_string(),
        ],
        authority: authority.to_string(),
        estimated_time: "2-6 Wochen".to_string(),
        costs: "Je nach Behörde 25-200 EUR".to_string(),
        legal_basis: legal_basis.to_string(),
        exceptions: "Ausnahmen möglich bei Gefahr, Krankheit oder besonderen Umständen".to_string(),
    }
}

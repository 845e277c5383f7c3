// riskwatch/src/handler.rs
//
// Invocation contract.
//
// Request:
//   { "user_id": "user123", "events": [...], "user_profile": {...} }
//
// Responses:
//   200 { user_id, fraud_analysis, message }                         scored
//   200 { user_id, message, risk_level: "LOW", composite_score: 0.0 } no events
//   400 { error, message }                                           bad request
//   500 { error, message }                                           store failure
//
// Flow: validate → score → persist (fatal on failure) → alert (best effort).
// An empty event batch short-circuits before scoring; nothing is persisted
// or published for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::engine::{dispatcher::Dispatcher, fusion::RiskEngine};
use crate::error::ScoringError;
use crate::events::{Event, FraudAnalysis, RiskLevel, UserProfile};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<Event>>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ScoringOutcome {
    Analyzed {
        user_id: String,
        fraud_analysis: FraudAnalysis,
        message: String,
    },
    NoEvents {
        user_id: String,
        message: String,
        risk_level: RiskLevel,
        composite_score: f64,
    },
}

impl ScoringOutcome {
    pub fn user_id(&self) -> &str {
        match self {
            Self::Analyzed { user_id, .. } | Self::NoEvents { user_id, .. } => user_id,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self {
            Self::Analyzed { fraud_analysis, .. } => fraud_analysis.risk_level,
            Self::NoEvents { risk_level, .. } => *risk_level,
        }
    }

    pub fn composite_score(&self) -> f64 {
        match self {
            Self::Analyzed { fraud_analysis, .. } => fraud_analysis.composite_score,
            Self::NoEvents { composite_score, .. } => *composite_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Response {
    pub status_code: u16,
    pub body: Value,
}

pub struct FraudHandler {
    engine:     RiskEngine,
    dispatcher: Dispatcher,
}

impl FraudHandler {
    pub fn new(engine: RiskEngine, dispatcher: Dispatcher) -> Self {
        Self { engine, dispatcher }
    }

    pub async fn handle(&self, request: ScoringRequest) -> Result<ScoringOutcome, ScoringError> {
        self.handle_at(request, Utc::now()).await
    }

    /// Same as `handle` with an explicit evaluation clock.
    pub async fn handle_at(
        &self,
        request: ScoringRequest,
        now: DateTime<Utc>,
    ) -> Result<ScoringOutcome, ScoringError> {
        let user_id = request
            .user_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ScoringError::Validation("user_id is required".into()))?;
        let events  = request.events.unwrap_or_default();
        let profile = request.user_profile.unwrap_or_default();

        debug!(user_id = %user_id, events = events.len(), "Processing fraud detection request");

        if events.is_empty() {
            warn!("No events provided for user {}", user_id);
            return Ok(ScoringOutcome::NoEvents {
                user_id,
                message: "No events to analyze".into(),
                risk_level: RiskLevel::Low,
                composite_score: 0.0,
            });
        }

        let analysis = self.engine.analyze(&user_id, &events, &profile, now);

        self.dispatcher.persist(&analysis).await?;
        let top = self.engine.top_factors(&analysis.risk_factors);
        self.dispatcher.alert(&analysis, top).await;

        Ok(ScoringOutcome::Analyzed {
            user_id,
            fraud_analysis: analysis,
            message: "Fraud analysis completed successfully".into(),
        })
    }

    /// Decode a raw JSON request and score it.
    pub async fn handle_json(&self, raw: &str) -> Result<ScoringOutcome, ScoringError> {
        let request = serde_json::from_str::<ScoringRequest>(raw)
            .map_err(|e| ScoringError::Validation(format!("malformed request: {}", e)))?;
        self.handle(request).await
    }
}

pub fn render(result: Result<ScoringOutcome, ScoringError>) -> Response {
    let rendered = result.and_then(|outcome| Ok(serde_json::to_value(&outcome)?));
    match rendered {
        Ok(body) => Response { status_code: 200, body },
        Err(e) => {
            let status_code = e.status_code();
            let label = if status_code == 400 { "Invalid request" } else { "Fraud detection failed" };
            if status_code >= 500 {
                error!("Fraud detection failed: {}", e);
            }
            Response {
                status_code,
                body: json!({ "error": label, "message": e.to_string() }),
            }
        }
    }
}

// riskwatch/src/events.rs
//
// Shared domain types flowing through riskwatch: inbound user events and
// profiles, per-factor scores, the final analysis record and the outbound
// persistence / alert payloads.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ── Inbound ───────────────────────────────────────────────────────────────────

/// One user action as delivered by the upstream event source.
/// Unknown fields are carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Event {
    #[serde(default)]
    pub timestamp: String, // ISO-8601, parsed lazily by the scorers that need it
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Event {
    pub fn kind(&self) -> &str {
        self.event_type.as_deref().unwrap_or("unknown")
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Historical aggregate for one user, maintained by an external process.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub common_locations: HashSet<String>,
    #[serde(default)]
    pub known_devices: HashSet<String>,
    /// "<event_type>_avg" → historical average count per batch.
    #[serde(default)]
    pub behavioral_patterns: HashMap<String, f64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserProfile {
    pub fn average_for(&self, event_type: &str) -> f64 {
        self.behavioral_patterns
            .get(&format!("{}_avg", event_type))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Parse an ISO-8601 timestamp. Offsets are honoured; naive values and bare
/// dates are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ── Risk factors ──────────────────────────────────────────────────────────────

/// The six scoring factors, in factor-table order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FactorKind {
    #[serde(rename = "velocity_score")]
    Velocity, // rapid successive actions
    #[serde(rename = "location_score")]
    Location, // new / multiple geographic origins
    #[serde(rename = "device_score")]
    Device, // new / multiple device fingerprints
    #[serde(rename = "behavioral_score")]
    Behavioral, // frequency deviation + repetitive sequences
    #[serde(rename = "account_age_score")]
    AccountAge, // young accounts
    #[serde(rename = "network_score")]
    Network, // invalid / loopback / multiple network origins
}

impl FactorKind {
    pub const ALL: [FactorKind; 6] = [
        Self::Velocity,
        Self::Location,
        Self::Device,
        Self::Behavioral,
        Self::AccountAge,
        Self::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Velocity => "velocity_score",
            Self::Location => "location_score",
            Self::Device => "device_score",
            Self::Behavioral => "behavioral_score",
            Self::AccountAge => "account_age_score",
            Self::Network => "network_score",
        }
    }
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One score per factor. Every factor is always present.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskFactorScores {
    pub velocity_score: f64,
    pub location_score: f64,
    pub device_score: f64,
    pub behavioral_score: f64,
    pub account_age_score: f64,
    pub network_score: f64,
}

impl RiskFactorScores {
    pub fn get(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::Velocity => self.velocity_score,
            FactorKind::Location => self.location_score,
            FactorKind::Device => self.device_score,
            FactorKind::Behavioral => self.behavioral_score,
            FactorKind::AccountAge => self.account_age_score,
            FactorKind::Network => self.network_score,
        }
    }

    pub fn set(&mut self, kind: FactorKind, score: f64) {
        let slot = match kind {
            FactorKind::Velocity => &mut self.velocity_score,
            FactorKind::Location => &mut self.location_score,
            FactorKind::Device => &mut self.device_score,
            FactorKind::Behavioral => &mut self.behavioral_score,
            FactorKind::AccountAge => &mut self.account_age_score,
            FactorKind::Network => &mut self.network_score,
        };
        *slot = score;
    }

    /// (factor, score) pairs in factor-table order.
    pub fn iter(&self) -> impl Iterator<Item = (FactorKind, f64)> + '_ {
        FactorKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    pub fn rounded(&self) -> Self {
        let mut out = *self;
        for kind in FactorKind::ALL {
            out.set(kind, round3(self.get(kind)));
        }
        out
    }
}

/// Three decimals, exact halves to even (0.0625 → 0.062).
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round_ties_even() / 1000.0
}

// ── Analysis ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// MEDIUM and HIGH results are pushed to the alert channel.
    pub fn is_alertable(&self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudAnalysis {
    pub composite_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: RiskFactorScores,
    pub analysis_timestamp: DateTime<Utc>,
    pub events_analyzed: usize,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopFactor {
    pub factor: FactorKind,
    pub score: f64,
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Row written to the scores table, keyed by (user_id, timestamp).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub composite_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: RiskFactorScores,
    pub events_analyzed: usize,
    pub ttl: i64, // unix seconds after which the row may be expired
}

impl ScoreRecord {
    pub fn from_analysis(analysis: &FraudAnalysis, retention_days: i64) -> Self {
        Self {
            user_id: analysis.user_id.clone(),
            timestamp: analysis.analysis_timestamp,
            composite_score: analysis.composite_score,
            risk_level: analysis.risk_level,
            risk_factors: analysis.risk_factors,
            events_analyzed: analysis.events_analyzed,
            ttl: (analysis.analysis_timestamp + chrono::Duration::days(retention_days)).timestamp(),
        }
    }
}

pub const ALERT_TYPE: &str = "FRAUD_DETECTION";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudAlert {
    pub alert_type: String,
    pub user_id: String,
    pub risk_level: RiskLevel,
    pub composite_score: f64,
    pub top_risk_factors: Vec<TopFactor>,
    pub timestamp: DateTime<Utc>,
}

impl FraudAlert {
    pub fn new(analysis: &FraudAnalysis, top_risk_factors: Vec<TopFactor>) -> Self {
        Self {
            alert_type: ALERT_TYPE.to_string(),
            user_id: analysis.user_id.clone(),
            risk_level: analysis.risk_level,
            composite_score: analysis.composite_score,
            top_risk_factors,
            timestamp: analysis.analysis_timestamp,
        }
    }

    pub fn subject(&self) -> String {
        format!("Fraud Alert: {} Risk User {}", self.risk_level, self.user_id)
    }
}

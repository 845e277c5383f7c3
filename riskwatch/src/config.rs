// riskwatch/src/config.rs
//
// Engine configuration — built once at process start, shared read-only.
//
// Default weight distribution across the 6 workers (sum = 1.00):
//   Velocity    0.25  — rapid successive actions
//   Location    0.20  — unusual location patterns
//   Behavioral  0.20  — unusual behavior patterns
//   Device      0.15  — new or suspicious devices
//   AccountAge  0.10  — account age risk
//   Network     0.10  — network-based risks

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{FactorKind, RiskFactorScores, RiskLevel};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("weight for {factor} must be within [0, 1], got {weight}")]
    WeightOutOfRange { factor: FactorKind, weight: f64 },
    #[error("factor weights must sum to 1.0, got {0:.6}")]
    WeightSum(f64),
    #[error("thresholds must satisfy 0 <= medium ({medium}) <= high ({high}) <= 1")]
    Thresholds { medium: f64, high: f64 },
    #[error("top_factors must be at least 1")]
    TopFactors,
}

// ── Weights ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FactorWeights([(FactorKind, f64); 6]);

impl Default for FactorWeights {
    fn default() -> Self {
        Self([
            (FactorKind::Velocity,   0.25),
            (FactorKind::Location,   0.20),
            (FactorKind::Device,     0.15),
            (FactorKind::Behavioral, 0.20),
            (FactorKind::AccountAge, 0.10),
            (FactorKind::Network,    0.10),
        ])
    }
}

impl FactorWeights {
    pub fn weight(&self, kind: FactorKind) -> f64 {
        self.0
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    /// Weighted sum of the six factor scores.
    pub fn combine(&self, scores: &RiskFactorScores) -> f64 {
        self.0.iter().map(|(kind, w)| scores.get(*kind) * w).sum()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for kind in FactorKind::ALL {
            let weight = self.weight(kind);
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::WeightOutOfRange { factor: kind, weight });
            }
        }
        let sum: f64 = FactorKind::ALL.iter().map(|k| self.weight(*k)).sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightSum(sum));
        }
        Ok(())
    }
}

// ── Thresholds ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { high: 0.8, medium: 0.5 }
    }
}

impl RiskThresholds {
    /// Inclusive lower bounds: a score equal to a threshold lands in that level.
    pub fn classify(&self, composite: f64) -> RiskLevel {
        if composite >= self.high {
            RiskLevel::High
        } else if composite >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

// ── Engine config ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub weights: FactorWeights,
    pub thresholds: RiskThresholds,
    /// Number of factors listed in alert payloads.
    pub top_factors: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            thresholds: RiskThresholds::default(),
            top_factors: 3,
        }
    }
}

impl EngineConfig {
    pub fn with_thresholds(mut self, high: f64, medium: f64) -> Self {
        self.thresholds = RiskThresholds { high, medium };
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        let RiskThresholds { high, medium } = self.thresholds;
        if !(0.0 <= medium && medium <= high && high <= 1.0) {
            return Err(ConfigError::Thresholds { medium, high });
        }
        if self.top_factors == 0 {
            return Err(ConfigError::TopFactors);
        }
        Ok(())
    }
}

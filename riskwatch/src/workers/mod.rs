pub mod account_age;
pub mod behavioral;
pub mod device;
pub mod location;
pub mod network;
pub mod velocity;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::events::{Event, FactorKind, RiskFactorScores, UserProfile};
use crate::fingerprint::Fingerprinter;

/// Everything a worker may look at. Shared read-only across all six.
pub struct ScoringInput<'a> {
    pub events:       &'a [Event],
    pub profile:      &'a UserProfile,
    pub fingerprints: &'a dyn Fingerprinter,
    /// Evaluation clock; fixed by callers that need reproducible output.
    pub now:          DateTime<Utc>,
}

pub type Worker = fn(&ScoringInput<'_>) -> f64;

/// Worker table in factor-table order. Workers are independent of each other.
pub const WORKERS: [(FactorKind, Worker); 6] = [
    (FactorKind::Velocity,   velocity::analyze),
    (FactorKind::Location,   location::analyze),
    (FactorKind::Device,     device::analyze),
    (FactorKind::Behavioral, behavioral::analyze),
    (FactorKind::AccountAge, account_age::analyze),
    (FactorKind::Network,    network::analyze),
];

/// Run every worker and collect one score per factor, clamped to [0, 1].
pub fn run_all(input: &ScoringInput<'_>) -> RiskFactorScores {
    let mut scores = RiskFactorScores::default();
    for (kind, worker) in WORKERS {
        let score = worker(input).clamp(0.0, 1.0);
        debug!(factor = %kind, score, "worker scored");
        scores.set(kind, score);
    }
    scores
}

/// Scores for comparing the identifiers seen in a batch against history.
pub(crate) struct NoveltyTiers {
    pub no_history: f64, // profile has never recorded any
    pub many_new:   f64, // two or more unseen
    pub one_new:    f64,
    pub all_known:  f64,
}

/// 0.0 when the batch carried no identifiers at all.
pub(crate) fn score_novelty(
    current: &HashSet<String>,
    history: &HashSet<String>,
    tiers:   &NoveltyTiers,
) -> f64 {
    if current.is_empty() {
        return 0.0;
    }
    if history.is_empty() {
        return tiers.no_history;
    }
    match current.difference(history).count() {
        0 => tiers.all_known,
        1 => tiers.one_new,
        _ => tiers.many_new,
    }
}

/// Arithmetic mean of collected indicators, `fallback` when none fired.
pub(crate) fn mean_or(indicators: &[f64], fallback: f64) -> f64 {
    if indicators.is_empty() {
        fallback
    } else {
        indicators.iter().sum::<f64>() / indicators.len() as f64
    }
}

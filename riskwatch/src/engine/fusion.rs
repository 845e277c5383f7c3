// riskwatch/src/engine/fusion.rs
//
// Composite risk engine — weighted fusion of the six worker scores.
//
//   composite = Σ weight(factor) × score(factor)      (weights sum to 1.0)
//
// Every worker score is clamped to [0, 1], so the composite is a convex
// combination and stays within [0, 1] as well.  Classification runs on the
// unrounded composite; the stored record keeps 3-decimal values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::EngineConfig;
use crate::events::{round3, Event, FraudAnalysis, RiskFactorScores, TopFactor, UserProfile};
use crate::fingerprint::{Fingerprinter, HashFingerprinter};
use crate::workers::{self, ScoringInput};

pub struct RiskEngine {
    config:       Arc<EngineConfig>,
    fingerprints: Arc<dyn Fingerprinter>,
}

impl RiskEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self::with_fingerprinter(config, Arc::new(HashFingerprinter))
    }

    pub fn with_fingerprinter(config: Arc<EngineConfig>, fingerprints: Arc<dyn Fingerprinter>) -> Self {
        Self { config, fingerprints }
    }

    /// Score one batch. Pure in (events, profile, now).
    pub fn analyze(
        &self,
        user_id: &str,
        events:  &[Event],
        profile: &UserProfile,
        now:     DateTime<Utc>,
    ) -> FraudAnalysis {
        info!("Calculating fraud score for {} events", events.len());

        let factors = workers::run_all(&ScoringInput {
            events,
            profile,
            fingerprints: self.fingerprints.as_ref(),
            now,
        });

        let composite = self.config.weights.combine(&factors);
        let level     = self.config.thresholds.classify(composite);

        info!(user_id, "Fraud analysis complete: {} risk (score: {:.3})", level, composite);

        FraudAnalysis {
            composite_score:    round3(composite),
            risk_level:         level,
            risk_factors:       factors.rounded(),
            analysis_timestamp: now,
            events_analyzed:    events.len(),
            user_id:            user_id.to_string(),
        }
    }

    /// Highest-scoring factors first; ties keep factor-table order.
    pub fn top_factors(&self, factors: &RiskFactorScores) -> Vec<TopFactor> {
        let mut ranked: Vec<TopFactor> = factors
            .iter()
            .map(|(factor, score)| TopFactor { factor, score })
            .collect();
        // stable sort preserves table order among equal scores
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(self.config.top_factors);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FactorKind, RiskLevel};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn engine() -> RiskEngine {
        RiskEngine::new(Arc::new(EngineConfig::default()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn ev(offset_ms: i64, kind: &str, ip: &str, ua: &str) -> Event {
        Event {
            timestamp: (now() - chrono::Duration::minutes(10) + chrono::Duration::milliseconds(offset_ms)).to_rfc3339(),
            event_type: Some(kind.into()),
            ip_address: Some(ip.into()),
            user_agent: Some(ua.into()),
            ..Event::default()
        }
    }

    fn factors(values: [f64; 6]) -> RiskFactorScores {
        let mut f = RiskFactorScores::default();
        for (kind, v) in FactorKind::ALL.into_iter().zip(values) {
            f.set(kind, v);
        }
        f
    }

    #[test]
    fn settled_user_scores_low() {
        let ip = "81.2.69.142";
        let ua = "Mozilla/5.0 (Macintosh) Safari/17.0";
        let profile = UserProfile {
            common_locations: [HashFingerprinter.location_code(ip)].into(),
            known_devices:    [HashFingerprinter.device_fingerprint(ua)].into(),
            created_at:       Some((now() - chrono::Duration::days(200)).to_rfc3339()),
            ..UserProfile::default()
        };
        let a = engine().analyze("u-settled", &[ev(0, "login", ip, ua)], &profile, now());

        assert_eq!(a.risk_factors.velocity_score, 0.0);
        assert_eq!(a.risk_factors.location_score, 0.1);
        assert_eq!(a.risk_factors.device_score, 0.1);
        assert_eq!(a.risk_factors.behavioral_score, 0.1);
        assert_eq!(a.risk_factors.account_age_score, 0.1);
        assert_eq!(a.risk_factors.network_score, 0.1);
        // 0.20·0.1 + 0.15·0.1 + 0.20·0.1 + 0.10·0.1 + 0.10·0.1
        assert_eq!(a.composite_score, 0.075);
        assert_eq!(a.risk_level, RiskLevel::Low);
        assert_eq!(a.events_analyzed, 1);
        assert_eq!(a.user_id, "u-settled");
    }

    #[test]
    fn burst_from_new_infrastructure_is_flagged() {
        let profile = UserProfile {
            common_locations: ["zz".to_string()].into(),
            known_devices:    ["0000000000000000".to_string()].into(),
            created_at:       Some(now().to_rfc3339()),
            ..UserProfile::default()
        };
        let events = vec![
            ev(0,     "login",    "8.8.8.8",        "agent-a"),
            ev(500,   "view",     "1.1.1.1",        "agent-b"),
            ev(1_000, "cart",     "9.9.9.9",        "agent-c"),
            ev(1_500, "checkout", "208.67.222.222", "agent-a"),
            ev(2_000, "logout",   "8.8.8.8",        "agent-b"),
        ];
        let a = engine().analyze("u-burst", &events, &profile, now());

        assert_eq!(a.risk_factors.velocity_score, 0.9);
        assert_eq!(a.risk_factors.location_score, 0.8);
        assert_eq!(a.risk_factors.device_score, 0.7);
        assert_eq!(a.risk_factors.account_age_score, 0.8);
        assert!(a.risk_factors.network_score >= 0.6);
        assert!(a.composite_score >= 0.5);
        assert!(a.risk_level >= RiskLevel::Medium);
        // behavioral 0.1, network 0.6 → 0.225+0.16+0.105+0.02+0.08+0.06
        assert_eq!(a.composite_score, 0.65);
        assert_eq!(a.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn lowered_high_threshold_promotes_burst() {
        let cfg = EngineConfig::default().with_thresholds(0.6, 0.4);
        let engine = RiskEngine::new(Arc::new(cfg));
        let events: Vec<Event> = (0..5).map(|i| ev(i * 200, "view", "bogus", "bot")).collect();
        let profile = UserProfile { created_at: Some(now().to_rfc3339()), ..UserProfile::default() };
        // velocity 0.9, location 0.3, device 0.2, behavioral 0.8, age 0.8, network 0.7
        let a = engine.analyze("u-bot", &events, &profile, now());
        assert_eq!(a.composite_score, 0.625);
        assert_eq!(a.risk_level, RiskLevel::High);
    }

    struct FixedCountry;

    impl Fingerprinter for FixedCountry {
        fn location_code(&self, _ip: &str) -> String { "GB".into() }
        fn device_fingerprint(&self, ua: &str) -> String { ua.to_lowercase() }
    }

    #[test]
    fn custom_fingerprinter_drives_location_and_device() {
        let engine = RiskEngine::with_fingerprinter(Arc::new(EngineConfig::default()), Arc::new(FixedCountry));
        let profile = UserProfile {
            common_locations: ["GB".to_string()].into(),
            known_devices:    ["safari".to_string()].into(),
            ..UserProfile::default()
        };
        let events = vec![ev(0, "login", "81.2.69.142", "Safari"), ev(90_000, "view", "81.2.69.160", "SAFARI")];
        let a = engine.analyze("u-gb", &events, &profile, now());
        assert_eq!(a.risk_factors.location_score, 0.1);
        assert_eq!(a.risk_factors.device_score, 0.1);
    }

    #[test]
    fn identical_inputs_identical_output() {
        let events = vec![ev(0, "login", "8.8.8.8", "a"), ev(3_000, "view", "10.0.0.4", "b")];
        let profile = UserProfile::default();
        let e = engine();
        let first  = e.analyze("u", &events, &profile, now());
        let second = e.analyze("u", &events, &profile, now());
        assert_eq!(first, second);
    }

    #[test]
    fn top_factors_rank_and_break_ties_in_table_order() {
        let f = factors([0.4, 0.8, 0.4, 0.1, 0.8, 0.4]);
        let top = engine().top_factors(&f);
        let names: Vec<FactorKind> = top.iter().map(|t| t.factor).collect();
        assert_eq!(names, vec![FactorKind::Location, FactorKind::AccountAge, FactorKind::Velocity]);
        assert_eq!(top[0].score, 0.8);
    }

    #[test]
    fn top_factors_respects_configured_count() {
        let cfg = EngineConfig { top_factors: 10, ..EngineConfig::default() };
        let top = RiskEngine::new(Arc::new(cfg)).top_factors(&RiskFactorScores::default());
        assert_eq!(top.len(), 6);
    }

    proptest! {
        #[test]
        fn composite_is_convex(values in prop::array::uniform6(0.0f64..=1.0)) {
            let c = EngineConfig::default().weights.combine(&factors(values));
            prop_assert!((0.0..=1.0 + 1e-12).contains(&c));
        }

        #[test]
        fn composite_is_linear_per_factor(
            values in prop::array::uniform6(0.0f64..=1.0),
            idx in 0usize..6,
            replacement in 0.0f64..=1.0,
        ) {
            let weights = EngineConfig::default().weights;
            let before = factors(values);
            let mut after = before;
            let kind = FactorKind::ALL[idx];
            after.set(kind, replacement);

            let delta = replacement - values[idx];
            let moved = weights.combine(&after) - weights.combine(&before);
            prop_assert!((moved - weights.weight(kind) * delta).abs() < 1e-12);
        }
    }
}

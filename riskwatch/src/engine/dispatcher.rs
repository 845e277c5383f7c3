// riskwatch/src/engine/dispatcher.rs
//
// Hands finished analyses to the external collaborators.
//
//   persist — always (when a store is configured); failure is fatal
//   alert   — MEDIUM / HIGH only (when a channel is configured); failure is
//             logged and swallowed
//
// Neither collaborator is retried here.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::alert::AlertPublisher;
use crate::error::ScoringError;
use crate::events::{FraudAlert, FraudAnalysis, ScoreRecord, TopFactor};
use crate::store::ScoreStore;

pub const DEFAULT_RETENTION_DAYS: i64 = 90;

pub struct Dispatcher {
    store:          Option<Arc<dyn ScoreStore>>,
    alerts:         Option<Arc<dyn AlertPublisher>>,
    retention_days: i64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { store: None, alerts: None, retention_days: DEFAULT_RETENTION_DAYS }
    }

    pub fn with_store(mut self, store: Arc<dyn ScoreStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertPublisher>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub async fn persist(&self, analysis: &FraudAnalysis) -> Result<(), ScoringError> {
        let Some(store) = &self.store else { return Ok(()) };
        let record = ScoreRecord::from_analysis(analysis, self.retention_days);

        match store.put(&record).await {
            Ok(()) => {
                info!("Fraud score saved for user: {}", analysis.user_id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to save fraud score: {:#}", e);
                Err(ScoringError::Persistence { user_id: analysis.user_id.clone(), source: e.into() })
            }
        }
    }

    /// Returns true when an alert was actually published.
    pub async fn alert(&self, analysis: &FraudAnalysis, top: Vec<TopFactor>) -> bool {
        if !analysis.risk_level.is_alertable() {
            return false;
        }
        let Some(alerts) = &self.alerts else { return false };

        let alert = FraudAlert::new(analysis, top);
        match alerts.publish(&alert).await {
            Ok(()) => {
                info!(
                    topic = alerts.topic(),
                    "Security alert sent for user {} - {} risk", analysis.user_id, analysis.risk_level
                );
                true
            }
            Err(e) => {
                warn!(topic = alerts.topic(), "Failed to send security alert: {:#}", e);
                false
            }
        }
    }
}

impl Default for Dispatcher { fn default() -> Self { Self::new() } }

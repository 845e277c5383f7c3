// riskwatch/src/alert.rs
//
// Security alert publishing — MEDIUM / HIGH analyses only.
//
// Message body (JSON):
//   { alert_type: "FRAUD_DETECTION", user_id, risk_level, composite_score,
//     top_risk_factors: [{factor, score}], timestamp }
// Subject: "Fraud Alert: <LEVEL> Risk User <user_id>"
//
// `JsonlTopicPublisher` appends one envelope per alert to
// `<output>/<topic>.jsonl` for downstream SIEM / pager pickup.  A broker
// client (SNS, Kafka, NATS) implements the same trait.  Publishing is
// best-effort; callers log failures and carry on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::events::FraudAlert;

#[async_trait]
pub trait AlertPublisher: Send + Sync {
    /// Channel name, for logs.
    fn topic(&self) -> &str;
    async fn publish(&self, alert: &FraudAlert) -> Result<()>;
}

// ── Topic envelope ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEnvelope {
    pub topic: String,
    pub subject: String,
    pub message: String, // JSON-encoded FraudAlert
    pub published_at: DateTime<Utc>,
}

// ── JSONL publisher ───────────────────────────────────────────────────────────

pub struct JsonlTopicPublisher {
    topic: String,
    path: PathBuf,
    pub published: AtomicU64,
}

impl JsonlTopicPublisher {
    pub fn new(output_dir: impl AsRef<Path>, topic: &str) -> Result<Self> {
        let dir = output_dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self {
            topic: topic.to_string(),
            path: dir.join(format!("{}.jsonl", topic)),
            published: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AlertPublisher for JsonlTopicPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish(&self, alert: &FraudAlert) -> Result<()> {
        let envelope = AlertEnvelope {
            topic: self.topic.clone(),
            subject: alert.subject(),
            message: serde_json::to_string(alert)?,
            published_at: Utc::now(),
        };
        let line = serde_json::to_string(&envelope)? + "\n";

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;

        self.published.fetch_add(1, Ordering::Relaxed);
        debug!(topic = %self.topic, "alert_publish payload_bytes={}", envelope.message.len());
        Ok(())
    }
}

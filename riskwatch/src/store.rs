// riskwatch/src/store.rs
//
// Score persistence — one row per analysis, keyed by (user_id, timestamp).
//
// Row layout (JSON):
//   { user_id, timestamp, composite_score, risk_level, risk_factors,
//     events_analyzed, ttl }
//
// `ttl` is the unix timestamp after which the backing table may expire the
// row (90 days by default).  Writes are not deduplicated: scoring the same
// batch twice stores two rows.
//
// `JsonlScoreStore` appends rows to `<output>/<table>.jsonl`.  A key-value
// backend (DynamoDB, Redis with EXPIREAT on ttl) implements the same trait.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::events::ScoreRecord;

#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn put(&self, record: &ScoreRecord) -> Result<()>;
}

pub struct JsonlScoreStore {
    path: PathBuf,
}

impl JsonlScoreStore {
    pub fn new(output_dir: impl AsRef<Path>, table: &str) -> Result<Self> {
        let dir = output_dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self { path: dir.join(format!("{}.jsonl", table)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ScoreStore for JsonlScoreStore {
    async fn put(&self, record: &ScoreRecord) -> Result<()> {
        let line = serde_json::to_string(record)? + "\n";
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        debug!("SCORE PUT user={} ts={} ttl={}", record.user_id, record.timestamp, record.ttl);
        Ok(())
    }
}

// riskwatch/src/main.rs
//
// riskwatch — explainable rule-based fraud risk scoring
//
// Reads scoring requests (one JSON object per line), scores each user's event
// batch against their profile, persists the result and publishes alerts for
// MEDIUM / HIGH risk users.  One JSON response per request goes to stdout.
//
// Two operational modes:
//   batch — score every request in a JSONL file, then exit
//   tail  — follow a JSONL file and score requests as they are appended
//
// Usage:
//   riskwatch --mode batch --path requests.jsonl
//   riskwatch --mode tail  --path /var/log/riskwatch/requests.jsonl \
//             --alerts-topic security-alerts --high-risk-threshold 0.75

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod alert;
mod config;
mod engine;
mod error;
mod events;
mod fingerprint;
mod handler;
mod store;
mod workers;

use alert::JsonlTopicPublisher;
use config::EngineConfig;
use engine::{dispatcher::Dispatcher, fusion::RiskEngine};
use error::ScoringError;
use events::RiskLevel;
use handler::{render, FraudHandler, Response, ScoringOutcome};
use store::JsonlScoreStore;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "riskwatch",
    about   = "Explainable rule-based fraud risk scoring",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, value_enum, default_value = "batch")]
    mode: Mode,

    #[arg(long, default_value = "/tmp/riskwatch_requests.jsonl",
          help = "JSONL file of scoring requests")]
    path: PathBuf,

    #[arg(long, default_value = "/tmp/riskwatch_output",
          help = "Directory for the scores table and alert topic files")]
    output: PathBuf,

    #[arg(long, env = "FRAUD_SCORES_TABLE", default_value = "fraud-detection-scores")]
    scores_table: String,

    #[arg(long, env = "SECURITY_ALERTS_TOPIC",
          help = "Alert channel name; alerting is disabled when unset")]
    alerts_topic: Option<String>,

    #[arg(long, env = "HIGH_RISK_THRESHOLD", default_value = "0.8")]
    high_risk_threshold: f64,

    #[arg(long, env = "MEDIUM_RISK_THRESHOLD", default_value = "0.5")]
    medium_risk_threshold: f64,

    #[arg(long, default_value = "3", help = "Factors listed in each alert")]
    top_factors: usize,

    #[arg(long, default_value = "90", help = "Days before stored scores expire")]
    retention_days: i64,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    Batch, // score a static file and exit
    Tail,  // follow a live file
}

fn build_handler(cli: &Cli) -> Result<FraudHandler> {
    let mut config = EngineConfig::default()
        .with_thresholds(cli.high_risk_threshold, cli.medium_risk_threshold);
    config.top_factors = cli.top_factors;
    config.validate().context("invalid engine configuration")?;

    let store = JsonlScoreStore::new(&cli.output, &cli.scores_table)?;
    info!("Scores table: {}", store.path().display());
    let mut dispatcher = Dispatcher::new()
        .with_store(Arc::new(store))
        .with_retention_days(cli.retention_days);

    match &cli.alerts_topic {
        Some(topic) => {
            let publisher = JsonlTopicPublisher::new(&cli.output, topic)?;
            info!("Alert topic: {}", publisher.path().display());
            dispatcher = dispatcher.with_alerts(Arc::new(publisher));
        }
        None => warn!("SECURITY_ALERTS_TOPIC not set; alerting disabled"),
    }

    Ok(FraudHandler::new(RiskEngine::new(Arc::new(config)), dispatcher))
}

// ── Terminal output ───────────────────────────────────────────────────────────

/// Where rendered responses go: stdout in production.
type Sink = Arc<dyn Fn(Response) + Send + Sync>;

fn emit(resp: Response) {
    println!("{}", serde_json::to_string(&resp).unwrap_or_default());
}

fn print_alert(outcome: &ScoringOutcome) {
    let color = match outcome.risk_level() {
        RiskLevel::High   => "\x1b[91;1m",
        RiskLevel::Medium => "\x1b[93;1m",
        RiskLevel::Low    => return,
    };
    let reset = "\x1b[0m";
    eprintln!(
        "{}{} risk{}  user={}  score={:.3}",
        color, outcome.risk_level(), reset, outcome.user_id(), outcome.composite_score(),
    );
}

/// One request line in, one response out. Blank lines are skipped; bytes
/// that are not UTF-8 get the same 400 as malformed JSON.
async fn respond(handler: &FraudHandler, line: &[u8]) -> Option<Response> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    let result = match std::str::from_utf8(line) {
        Ok(raw) => handler.handle_json(raw).await,
        Err(e)  => Err(ScoringError::Validation(format!("malformed request: {}", e))),
    };
    if let Ok(outcome) = &result {
        print_alert(outcome);
    }
    Some(render(result))
}

// ── Request sources ───────────────────────────────────────────────────────────

const TAIL_POLL: tokio::time::Duration = tokio::time::Duration::from_millis(50);

async fn run_batch(path: &Path, handler: &FraudHandler, sink: &Sink) -> Result<usize> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).split(b'\n');

    let mut n = 0usize;
    while let Some(line) = lines
        .next_segment()
        .await
        .with_context(|| format!("reading {}", path.display()))?
    {
        if let Some(resp) = respond(handler, &line).await {
            sink(resp);
            n += 1;
        }
    }
    info!("Scored {} requests from {}", n, path.display());
    Ok(n)
}

/// Follow `path`, forwarding each newline-terminated line appended after
/// startup. A line still being written stays buffered until its newline lands.
async fn tail_jsonl(path: PathBuf, tx: mpsc::Sender<Vec<u8>>) -> Result<()> {
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let mut reader  = BufReader::new(file);
    let mut pending = Vec::new();

    // skip what is already there, keeping an unterminated last line
    loop {
        pending.clear();
        let n = reader.read_until(b'\n', &mut pending).await
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 || !pending.ends_with(b"\n") { break; }
    }

    info!("Tailing {}", path.display());
    loop {
        reader.read_until(b'\n', &mut pending).await
            .with_context(|| format!("reading {}", path.display()))?;
        if pending.ends_with(b"\n") {
            if tx.send(std::mem::take(&mut pending)).await.is_err() { break; }
        } else {
            tokio::time::sleep(TAIL_POLL).await;
        }
    }
    Ok(())
}

fn reap(res: Result<(), JoinError>) {
    if let Err(e) = res {
        warn!("Request task failed: {}", e);
    }
}

/// Score lines until the sender goes away, then wait for every request
/// still in flight so its record is written before returning.
async fn serve(mut rx: mpsc::Receiver<Vec<u8>>, handler: Arc<FraudHandler>, sink: Sink) -> usize {
    let mut inflight = JoinSet::new();
    let mut n = 0usize;

    // one task per request; users are scored independently
    while let Some(line) = rx.recv().await {
        let (h, sink) = (Arc::clone(&handler), Arc::clone(&sink));
        inflight.spawn(async move {
            if let Some(resp) = respond(&h, &line).await {
                sink(resp);
            }
        });
        n += 1;
        while let Some(res) = inflight.try_join_next() { reap(res); }
    }
    while let Some(res) = inflight.join_next().await { reap(res); }
    n
}

async fn run_tail(path: PathBuf, handler: Arc<FraudHandler>, sink: Sink) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>(4096);
    let tail = tokio::spawn(tail_jsonl(path, tx));

    let n = serve(rx, handler, sink).await;
    info!("Tail stopped after {} requests", n);
    tail.await.context("tail task failed")?
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("riskwatch=info".parse()?))
        .with_writer(std::io::stderr)
        .compact().init();

    let cli     = Cli::parse();
    let handler = Arc::new(build_handler(&cli)?);

    let sink: Sink = Arc::new(emit);

    match cli.mode {
        Mode::Batch => { run_batch(&cli.path, &handler, &sink).await?; }
        Mode::Tail  => run_tail(cli.path, handler, sink).await?,
    }

    Ok(())
}

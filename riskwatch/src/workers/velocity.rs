// riskwatch/src/workers/velocity.rs
//
// Velocity worker — inter-event timing within the batch.
// Near-instant repeated actions are the strongest automation signal.
//
// Tiers (first match wins):
//   min interval  < 1s   → 0.9
//   mean interval < 5s   → 0.7
//   mean interval < 30s  → 0.4
//   otherwise            → 0.1
//
// Fewer than two events → 0.0.  Otherwise any unparseable timestamp degrades the whole
// worker to UNPARSEABLE_SCORE rather than failing the request.

use tracing::debug;

use super::ScoringInput;

pub const UNPARSEABLE_SCORE: f64 = 0.5;

pub fn analyze(input: &ScoringInput<'_>) -> f64 {
    if input.events.len() < 2 {
        return 0.0;
    }
    let mut stamps = Vec::with_capacity(input.events.len());
    for event in input.events {
        match event.parsed_timestamp() {
            Some(ts) => stamps.push(ts),
            None => {
                debug!(timestamp = %event.timestamp, "velocity: unparseable timestamp");
                return UNPARSEABLE_SCORE;
            }
        }
    }
    stamps.sort();

    let intervals: Vec<f64> = stamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
        .collect();
    score_intervals(&intervals)
}

/// Tier a list of consecutive inter-event gaps (seconds).
pub fn score_intervals(intervals: &[f64]) -> f64 {
    if intervals.is_empty() {
        return 0.0;
    }
    let min  = intervals.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;

    if min < 1.0 {
        0.9
    } else if mean < 5.0 {
        0.7
    } else if mean < 30.0 {
        0.4
    } else {
        0.1
    }
}

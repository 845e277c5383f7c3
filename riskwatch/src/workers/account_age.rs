// riskwatch/src/workers/account_age.rs
//
// Account age worker — new accounts are inherently riskier.
// Profile-only; whole days from created_at to the evaluation clock.
//
//   < 1d   0.8
//   < 7d   0.6
//   < 30d  0.4
//   < 90d  0.2
//   else   0.1
//
// Missing / empty / unparseable created_at → 0.5 (uncertain).

use tracing::debug;

use super::ScoringInput;
use crate::events::parse_timestamp;

pub const UNKNOWN_AGE_SCORE: f64 = 0.5;

pub fn analyze(input: &ScoringInput<'_>) -> f64 {
    let Some(raw) = input.profile.created_at.as_deref().filter(|s| !s.is_empty()) else {
        return UNKNOWN_AGE_SCORE;
    };
    let Some(created) = parse_timestamp(raw) else {
        debug!(created_at = %raw, "account_age: unparseable created_at");
        return UNKNOWN_AGE_SCORE;
    };
    score_days((input.now - created).num_days())
}

pub fn score_days(age_days: i64) -> f64 {
    match age_days {
        d if d < 1 => 0.8,
        d if d < 7 => 0.6,
        d if d < 30 => 0.4,
        d if d < 90 => 0.2,
        _ => 0.1,
    }
}

// riskwatch/src/workers/location.rs
//
// Location worker — coarse origin codes vs. the profile's common locations.
//
//   no ip_address in batch        → 0.0
//   profile has no locations      → 0.3  (new account, moderate)
//   ≥2 unseen locations           → 0.8
//   exactly 1 unseen location     → 0.5
//   all locations known           → 0.1

use std::collections::HashSet;

use super::{score_novelty, NoveltyTiers, ScoringInput};

const TIERS: NoveltyTiers = NoveltyTiers {
    no_history: 0.3,
    many_new:   0.8,
    one_new:    0.5,
    all_known:  0.1,
};

pub fn analyze(input: &ScoringInput<'_>) -> f64 {
    let current: HashSet<String> = input
        .events
        .iter()
        .filter_map(|e| e.ip_address.as_deref())
        .map(|ip| input.fingerprints.location_code(ip))
        .collect();

    score_novelty(&current, &input.profile.common_locations, &TIERS)
}

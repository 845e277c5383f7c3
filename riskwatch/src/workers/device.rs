// riskwatch/src/workers/device.rs
//
// Device worker — user-agent fingerprints vs. the profile's known devices.
// Same novelty shape as the location worker, lower weights:
//   none seen 0.0 | no history 0.2 | ≥2 new 0.7 | 1 new 0.4 | all known 0.1

use std::collections::HashSet;

use super::{score_novelty, NoveltyTiers, ScoringInput};

const TIERS: NoveltyTiers = NoveltyTiers {
    no_history: 0.2,
    many_new:   0.7,
    one_new:    0.4,
    all_known:  0.1,
};

pub fn analyze(input: &ScoringInput<'_>) -> f64 {
    let current: HashSet<String> = input
        .events
        .iter()
        .filter_map(|e| e.user_agent.as_deref())
        .map(|ua| input.fingerprints.device_fingerprint(ua))
        .collect();

    score_novelty(&current, &input.profile.known_devices, &TIERS)
}

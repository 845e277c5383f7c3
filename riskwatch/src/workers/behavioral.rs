// riskwatch/src/workers/behavioral.rs
//
// Behavioral worker — two independent indicator families:
//
//  1. FREQUENCY DEVIATION — per event type with a positive historical
//     average in the profile ("<type>_avg"):
//        |count - avg| / avg  > 2.0  → 0.6
//                             > 1.0  → 0.3
//
//  2. REPETITIVE SEQUENCE — consecutive event-type transitions in arrival
//     order ("login->view", ...).  When the most frequent transition makes up
//     more than 70% of all transitions → 0.8 (scripted client signal).
//
// Score = mean of fired indicators, 0.1 if none fired, 0.0 for an empty batch.

use std::collections::{BTreeMap, HashMap};

use super::{mean_or, ScoringInput};
use crate::events::UserProfile;

const SEQUENCE_DOMINANCE: f64 = 0.70;

pub fn analyze(input: &ScoringInput<'_>) -> f64 {
    if input.events.is_empty() {
        return 0.0;
    }
    let kinds: Vec<&str> = input.events.iter().map(|e| e.kind()).collect();

    let mut indicators = frequency_indicators(&kinds, input.profile);
    if let Some(ind) = sequence_indicator(&kinds) {
        indicators.push(ind);
    }
    mean_or(&indicators, 0.1)
}

fn frequency_indicators(kinds: &[&str], profile: &UserProfile) -> Vec<f64> {
    // ordered so indicators are summed in the same order on every call
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for kind in kinds {
        *counts.entry(*kind).or_default() += 1;
    }

    counts
        .into_iter()
        .filter_map(|(kind, count)| {
            let avg = profile.average_for(kind);
            if avg <= 0.0 {
                return None;
            }
            let deviation = (count as f64 - avg).abs() / avg;
            if deviation > 2.0 {
                Some(0.6)
            } else if deviation > 1.0 {
                Some(0.3)
            } else {
                None
            }
        })
        .collect()
}

fn sequence_indicator(kinds: &[&str]) -> Option<f64> {
    if kinds.len() < 2 {
        return None;
    }
    let mut transitions: HashMap<(&str, &str), usize> = HashMap::new();
    for pair in kinds.windows(2) {
        *transitions.entry((pair[0], pair[1])).or_default() += 1;
    }
    let total = kinds.len() - 1;
    let max_repeat = transitions.values().copied().max().unwrap_or(0);

    (max_repeat as f64 > total as f64 * SEQUENCE_DOMINANCE).then_some(0.8)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use crate::events::Event;

    fn batch(kinds: &[&str]) -> Vec<Event> {
        kinds.iter().map(|k| event("2024-06-01T11:00:00Z", k)).collect()
    }

    fn profile(avgs: &[(&str, f64)]) -> UserProfile {
        UserProfile {
            behavioral_patterns: avgs.iter().map(|(k, v)| (format!("{}_avg", k), *v)).collect(),
            ..UserProfile::default()
        }
    }

    #[test]
    fn empty_batch_is_zero() {
        assert_eq!(analyze(&input(&[], &UserProfile::default())), 0.0);
    }

    #[test]
    fn varied_batch_without_history_is_baseline() {
        let events = batch(&["login", "view", "cart", "checkout", "logout"]);
        assert_eq!(analyze(&input(&events, &UserProfile::default())), 0.1);
    }

    #[test]
    fn single_event_has_no_transitions() {
        let events = batch(&["login"]);
        assert_eq!(analyze(&input(&events, &UserProfile::default())), 0.1);
    }

    #[test]
    fn identical_events_trip_sequence_indicator() {
        // view->view ×3 of 3 transitions
        let events = batch(&["view", "view", "view", "view"]);
        assert_eq!(analyze(&input(&events, &UserProfile::default())), 0.8);
    }

    #[test]
    fn dominance_must_exceed_seventy_percent() {
        let kinds = ["a", "a", "a", "a", "a", "a", "a", "a", "b", "c", "d"];
        // a->a ×7, a->b, b->c, c->d
        assert_eq!(sequence_indicator(&kinds), None);
        let kinds = ["a", "a", "a", "a", "a", "a", "a", "a", "a", "b", "c"];
        // a->a ×8 of 10
        assert_eq!(sequence_indicator(&kinds), Some(0.8));
    }

    #[test]
    fn frequency_deviation_tiers() {
        let events = batch(&["login", "view", "view", "view", "view", "view", "view", "view"]);
        // view: 7 vs avg 2 → 2.5 → 0.6 ; login: 1 vs avg 1 → 0
        let p = profile(&[("view", 2.0), ("login", 1.0)]);
        assert_eq!(frequency_indicators(&events.iter().map(|e| e.kind()).collect::<Vec<_>>(), &p), vec![0.6]);

        // view: 5 vs avg 2 → 1.5 → 0.3
        let kinds = ["view", "view", "view", "view", "view"];
        assert_eq!(frequency_indicators(&kinds, &profile(&[("view", 2.0)])), vec![0.3]);

        // view: 3 vs avg 2 → 0.5 → none
        let kinds = ["view", "view", "view"];
        assert!(frequency_indicators(&kinds, &profile(&[("view", 2.0)])).is_empty());
    }

    #[test]
    fn zero_average_is_ignored() {
        let kinds = ["view", "view", "view"];
        assert!(frequency_indicators(&kinds, &profile(&[("view", 0.0)])).is_empty());
    }

    #[test]
    fn indicators_are_averaged() {
        // view ×6 vs avg 1 → deviation 5 → 0.6 ; view->view 5/5 → 0.8
        let events = batch(&["view"; 6]);
        let score = analyze(&input(&events, &profile(&[("view", 1.0)])));
        assert!((score - 0.7).abs() < 1e-12);
    }

    #[test]
    fn frequency_indicators_follow_event_type_order() {
        let kinds = ["zeta", "alpha", "zeta", "zeta", "zeta", "mid", "alpha", "alpha", "alpha", "alpha"];
        // alpha 5 vs 1 → 0.6 ; mid 1 vs 0.4 → 1.5 → 0.3 ; zeta 4 vs 1.5 → 1.67 → 0.3
        let p = profile(&[("zeta", 1.5), ("alpha", 1.0), ("mid", 0.4)]);
        for _ in 0..8 {
            assert_eq!(frequency_indicators(&kinds, &p), vec![0.6, 0.3, 0.3]);
        }
    }

    #[test]
    fn missing_event_type_counts_as_unknown() {
        let mut events = batch(&["x", "x"]);
        events.iter_mut().for_each(|e| e.event_type = None);
        // unknown ×2 vs avg 6 → deviation 0.67 → none ; unknown->unknown 1/1 → 0.8
        let score = analyze(&input(&events, &profile(&[("unknown", 6.0)])));
        assert_eq!(score, 0.8);
    }
}

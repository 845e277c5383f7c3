// riskwatch/src/workers/network.rs
//
// Network worker — distinct source addresses seen in the batch.
//
// Per address (indicators accumulate, one address may fire several):
//   unparseable                               0.7
//   private / special-purpose, >1 addresses   0.3
//   loopback                                  0.9
//   watch-listed prefix (10.0.0.* / 192.168.1.*) 0.2
//
// Per batch:
//   > 3 distinct addresses   0.6
//   > 1 distinct address     0.3
//
// Score = mean of indicators, 0.1 if none fired, 0.0 with no addresses.
// Threat-intel reputation is out of scope; the prefix list stands in for it.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::debug;

use super::{mean_or, ScoringInput};

const WATCHED_PREFIXES: &[&str] = &["10.0.0.", "192.168.1."];

pub fn analyze(input: &ScoringInput<'_>) -> f64 {
    // ordered so indicators are summed in the same order on every call
    let addresses: BTreeSet<&str> = input
        .events
        .iter()
        .filter_map(|e| e.ip_address.as_deref())
        .collect();
    score_addresses(&addresses)
}

pub fn score_addresses(addresses: &BTreeSet<&str>) -> f64 {
    if addresses.is_empty() {
        return 0.0;
    }
    let multiple = addresses.len() > 1;
    let mut indicators = Vec::new();

    for raw in addresses {
        let ip: IpAddr = match raw.parse() {
            Ok(ip) => ip,
            Err(_) => {
                debug!(ip = %raw, "network: unparseable address");
                indicators.push(0.7);
                continue;
            }
        };
        if multiple && is_private(&ip) {
            indicators.push(0.3);
        }
        if ip.is_loopback() {
            indicators.push(0.9);
        }
        if WATCHED_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            indicators.push(0.2);
        }
    }

    if addresses.len() > 3 {
        indicators.push(0.6);
    } else if multiple {
        indicators.push(0.3);
    }

    mean_or(&indicators, 0.1)
}

/// Special-purpose (non-globally-routable) ranges: RFC 1918, loopback,
/// link-local, documentation, benchmarking, reserved and their IPv6
/// counterparts. Loopback is included.
pub fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

fn is_private_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, c, d] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_documentation()
        || ip.is_broadcast()
        || a == 0                                   // 0.0.0.0/8
        || (a == 192 && b == 0 && c == 0 && (d < 8 || d == 170 || d == 171)) // 192.0.0.0/29, /31
        || (a == 198 && (b & 0xfe) == 18)           // 198.18.0.0/15
        || a >= 240                                 // 240.0.0.0/4
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(&v4);
    }
    let seg = ip.segments();
    ip.is_loopback()
        || ip.is_unspecified()
        || (seg[0] & 0xfe00) == 0xfc00                   // fc00::/7 unique local
        || (seg[0] & 0xffc0) == 0xfe80                   // fe80::/10 link-local
        || (seg[0] == 0x2001 && seg[1] == 0x0db8)        // 2001:db8::/32 documentation
        || (seg[0] == 0x0100 && seg[1..4] == [0, 0, 0])  // 100::/64 discard
        || (seg[0] == 0x0064 && seg[1] == 0xff9b && seg[2] == 0x0001) // 64:ff9b:1::/48 local translation
        || (seg[0] == 0x2001 && seg[1] < 0x0200 && !is_reachable_ietf_v6(&seg))
}

/// 2001::/23 IETF protocol assignments (TEREDO, benchmarking 2001:2::/48,
/// ORCHID 2001:10::/28 ...) minus the globally reachable carve-outs.
fn is_reachable_ietf_v6(seg: &[u16; 8]) -> bool {
    (seg[1] == 0x0001 && seg[2..7] == [0, 0, 0, 0, 0] && (seg[7] == 1 || seg[7] == 2)) // PCP / TURN anycast
        || seg[1] == 0x0003                          // AMT
        || (seg[1] == 0x0004 && seg[2] == 0x0112)    // AS112-v6
        || (seg[1] & 0xfff0) == 0x0020               // ORCHIDv2
        || (seg[1] & 0xfff0) == 0x0030               // drone remote ID
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use crate::events::UserProfile;

    fn score(ips: &[&str]) -> f64 {
        score_addresses(&ips.iter().copied().collect())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn no_addresses_scores_zero() {
        assert_eq!(score(&[]), 0.0);
        let events = vec![event("2024-06-01T11:00:00Z", "login")];
        assert_eq!(analyze(&input(&events, &UserProfile::default())), 0.0);
    }

    #[test]
    fn single_public_address_is_baseline() {
        assert_eq!(score(&["8.8.8.8"]), 0.1);
    }

    #[test]
    fn single_private_address_alone_does_not_fire() {
        assert_eq!(score(&["172.16.4.2"]), 0.1);
    }

    #[test]
    fn invalid_address() {
        assert_eq!(score(&["999.1.1.1"]), 0.7);
        assert_eq!(score(&["not-an-ip"]), 0.7);
    }

    #[test]
    fn lone_loopback() {
        assert_eq!(score(&["127.0.0.1"]), 0.9);
        assert_eq!(score(&["::1"]), 0.9);
    }

    #[test]
    fn watched_prefix_stacks_on_private() {
        // lone: only the prefix rule fires
        assert_eq!(score(&["192.168.1.20"]), 0.2);
        // with a second address: private 0.3 + prefix 0.2 + multi 0.3
        assert!(close(score(&["192.168.1.20", "8.8.8.8"]), (0.3 + 0.2 + 0.3) / 3.0));
    }

    #[test]
    fn loopback_with_public_peer() {
        // private 0.3 + loopback 0.9 + multi 0.3
        assert!(close(score(&["127.0.0.1", "8.8.8.8"]), 0.5));
    }

    #[test]
    fn many_public_addresses() {
        assert_eq!(score(&["8.8.8.8", "1.1.1.1", "9.9.9.9", "208.67.222.222"]), 0.6);
        assert_eq!(score(&["8.8.8.8", "1.1.1.1"]), 0.3);
    }

    #[test]
    fn duplicates_collapse_before_scoring() {
        let events = vec![from_ip("8.8.8.8"), from_ip("8.8.8.8"), from_ip("8.8.8.8")];
        assert_eq!(analyze(&input(&events, &UserProfile::default())), 0.1);
    }

    #[test]
    fn special_purpose_ranges() {
        for ip in ["10.1.2.3", "172.31.0.1", "192.168.0.1", "169.254.1.1", "0.1.2.3",
                   "192.0.2.5", "198.18.0.1", "240.0.0.1", "fd00::1", "fe80::1",
                   "2001:db8::1", "::ffff:10.0.0.1", "2001::1", "2001:2::5", "2001:10::1",
                   "2001:1ff::1", "64:ff9b:1::a"] {
            assert!(is_private(&ip.parse().unwrap()), "{} should be private", ip);
        }
        for ip in ["8.8.8.8", "100.64.0.1", "2606:4700::1111", "::ffff:8.8.8.8", "2001:1::1",
                   "2001:3::1", "2001:4:112::1", "2001:20::1", "2001:200::1", "64:ff9b::808:808"] {
            assert!(!is_private(&ip.parse().unwrap()), "{} should be public", ip);
        }
    }

    #[test]
    fn always_within_unit_interval() {
        let sets: [&[&str]; 4] = [
            &["127.0.0.1", "::1", "10.0.0.1", "bogus", "192.168.1.1"],
            &["bogus"],
            &["10.0.0.5"],
            &["8.8.8.8", "8.8.4.4"],
        ];
        for ips in sets {
            let s = score(ips);
            assert!((0.0..=1.0).contains(&s), "{:?} → {}", ips, s);
        }
    }
}

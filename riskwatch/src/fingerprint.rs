// riskwatch/src/fingerprint.rs
//
// Origin enrichment — turns raw identifiers into the coarse codes the
// location and device workers compare against the user's profile.
//
// In production the location code comes from an IP geolocation database
// (MaxMind GeoIP2, ip2location, ...) and the device fingerprint from a device
// intelligence service.  The default `HashFingerprinter` stands in for both
// with deterministic MD5-derived pseudo-codes:
//
//   location_code(ip)        = md5(ip)[..2]   (hex)
//   device_fingerprint(ua)   = md5(ua)[..16]  (hex)
//
// Profiles written by the upstream profile-maintenance job use the same
// scheme, so codes compare equal across processes.

/// Maps raw network / client identifiers to coarse comparable codes.
pub trait Fingerprinter: Send + Sync {
    fn location_code(&self, ip_address: &str) -> String;
    fn device_fingerprint(&self, user_agent: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HashFingerprinter;

fn md5_hex(raw: &str) -> String {
    hex::encode(md5::compute(raw.as_bytes()).0)
}

impl Fingerprinter for HashFingerprinter {
    fn location_code(&self, ip_address: &str) -> String {
        md5_hex(ip_address)[..2].to_string()
    }

    fn device_fingerprint(&self, user_agent: &str) -> String {
        md5_hex(user_agent)[..16].to_string()
    }
}

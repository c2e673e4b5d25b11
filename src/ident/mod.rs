//! Content-derived observation identifiers.
//!
//! An observation that arrives without an explicit identifier gets one
//! generated from its content: SHA-256 over the canonical JSON form of
//! the fields that make the observation what it is. Structurally
//! identical observations therefore receive identical identifiers, and
//! re-ingestion of the same data is detectable downstream by identifier
//! equality.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::{Observation, ParameterHolder, TimeSpan, Value};

/// How many digest bytes end up in the identifier (as hex).
const DIGEST_BYTES: usize = 16;

#[derive(Debug, Serialize)]
struct Content<'a> {
    phenomenon_time: &'a TimeSpan,
    result_time: &'a Option<DateTime<Utc>>,
    kind: &'static str,
    value: &'a Value,
    parameters: &'a ParameterHolder,
}

/// Deterministic identifier generator.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
}

impl IdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn generate(&self, observation: &Observation) -> String {
        let content = Content {
            phenomenon_time: &observation.phenomenon_time,
            result_time: &observation.result_time,
            kind: observation.value.kind().name(),
            value: &observation.value,
            parameters: &observation.parameters,
        };
        // Non-finite floats have no JSON form; the Debug rendering is an
        // equally deterministic fallback.
        let bytes = serde_json::to_vec(&content)
            .unwrap_or_else(|_| format!("{content:?}").into_bytes());
        let digest = Sha256::digest(&bytes);
        let mut out = String::with_capacity(self.prefix.len() + DIGEST_BYTES * 2);
        out.push_str(&self.prefix);
        for byte in &digest[..DIGEST_BYTES] {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("obs_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn observation(value: f64) -> Observation {
        let at = Utc.with_ymd_and_hms(2024, 5, 14, 10, 30, 0).unwrap();
        Observation::new(TimeSpan::instant(at), value)
    }

    #[test]
    fn test_identical_content_identical_id() {
        let generator = IdGenerator::default();
        assert_eq!(generator.generate(&observation(21.5)), generator.generate(&observation(21.5)));
    }

    #[test]
    fn test_different_content_different_id() {
        let generator = IdGenerator::default();
        assert_ne!(generator.generate(&observation(21.5)), generator.generate(&observation(21.6)));
    }

    #[test]
    fn test_prefix_applied() {
        let generator = IdGenerator::new("row_");
        assert!(generator.generate(&observation(1.0)).starts_with("row_"));
    }
}

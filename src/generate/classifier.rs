//! Backend failure classification.
//!
//! Decides whether a raw failure message looks like a quota/rate-limit
//! condition and, independently, whether it carries a retry-after hint.

use regex::Regex;

/// Substrings marking a failure as quota/rate-limit classified.
const QUOTA_MARKERS: [&str; 4] = ["quota", "resource_exhausted", "rate limit", "429"];
/// Pattern of a "retry in <seconds>s" hint, seconds possibly fractional.
const RETRY_HINT_PATTERN: &str = r"(?i)retry in\s+([0-9.]+)s";

/// Structured verdict over a raw backend failure message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorVerdict {
    /// The message matches one of the quota/rate-limit markers.
    pub is_quota_exceeded: bool,
    /// Parsed retry hint, ceiled to an integer of at least one second.
    pub retry_after_seconds: Option<u64>,
}

/// Classify a raw failure message.
///
/// Quota classification and retry-hint extraction are independent: a
/// message may carry a hint without matching the markers, or vice versa.
/// This is a pure function and never fails.
pub fn classify(message: &str) -> ErrorVerdict {
    let lowered = message.to_lowercase();
    let is_quota_exceeded = QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker));

    let re = Regex::new(RETRY_HINT_PATTERN).unwrap();
    let retry_after_seconds = re
        .captures(message)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite())
        .map(|seconds| (seconds.ceil() as u64).max(1));

    ErrorVerdict {
        is_quota_exceeded,
        retry_after_seconds,
    }
}

//! HTTP cache control module
//!
//! Provides `ETag` generation and conditional request handling.
//!
//! `ETag`s are `<path>-<seed>`, where the seed is the process start time.
//! They stay stable for the lifetime of one process and change on every
//! restart, so a deploy invalidates every client cache at once. File content
//! is not hashed: an in-place edit is only picked up after a restart.

use hyper::header::{HeaderMap, HeaderValue, CACHE_CONTROL, ETAG};
use std::fmt;

/// `Cache-Control` sent with every validated response (30 days)
pub const CACHE_CONTROL_VALUE: &str = "max-age=2592000";

/// Generation marker mixed into every `ETag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtagSeed(String);

impl EtagSeed {
    /// Seed from the current Unix time in seconds
    pub fn from_process_start() -> Self {
        Self(chrono::Utc::now().timestamp().to_string())
    }

    pub fn new(seed: impl Into<String>) -> Self {
        Self(seed.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EtagSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of checking a request against its `ETag`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Continue to file serving
    ServeFresh,
    /// Answer 304 without touching the filesystem
    NotModified,
}

/// Result of validating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub etag: String,
    pub decision: CacheDecision,
}

/// Seed-based `ETag` validator
#[derive(Debug, Clone)]
pub struct CacheValidator {
    seed: EtagSeed,
    enabled: bool,
}

impl CacheValidator {
    pub const fn new(seed: EtagSeed, enabled: bool) -> Self {
        Self { seed, enabled }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn seed(&self) -> &EtagSeed {
        &self.seed
    }

    /// `ETag` for a request path
    pub fn etag_for(&self, path: &str) -> String {
        format!("{path}-{}", self.seed)
    }

    /// Validate a request path against the client's `If-None-Match`
    ///
    /// Returns `None` when caching is disabled: no headers are produced and
    /// conditional headers are ignored.
    pub fn validate(&self, path: &str, if_none_match: Option<&str>) -> Option<Validation> {
        if !self.enabled {
            return None;
        }

        let etag = self.etag_for(path);
        let decision = if check_etag_match(if_none_match, &etag) {
            CacheDecision::NotModified
        } else {
            CacheDecision::ServeFresh
        };

        Some(Validation { etag, decision })
    }
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Matching is a plain substring test, so quoted values, weak validators
/// (`W/"..."`) and comma-separated candidate lists all match.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| !client_etag.is_empty() && client_etag.contains(etag))
}

/// Attach `ETag` and `Cache-Control` to a response
///
/// An `ETag` that is not a valid header value is skipped (the path decoder
/// already rejects control characters, so this should not happen).
pub fn attach_headers(headers: &mut HeaderMap, etag: &str) {
    match HeaderValue::from_str(etag) {
        Ok(value) => {
            headers.insert(ETAG, value);
            headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
        }
        Err(e) => {
            crate::logger::log_warning(&format!("Skipping cache headers for '{etag}': {e}"));
        }
    }
}

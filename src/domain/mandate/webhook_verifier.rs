//! Processor webhook signature verification.
//!
//! Deliveries carry a timestamp header and a signature header. The signature
//! is `base64(HMAC-SHA256(secret, "{timestamp}.{raw_body}"))`, where the
//! timestamp is the header value exactly as sent. A delivery is only trusted
//! when the timestamp falls inside the tolerance window (both directions)
//! and the signature matches in constant time.

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::webhook_errors::WebhookError;

/// Default replay window in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Signature header names, current name first.
pub const SIGNATURE_HEADERS: [&str; 2] = ["x-webhook-signature", "x-cashfree-signature"];

/// Timestamp header names, current name first.
pub const TIMESTAMP_HEADERS: [&str; 2] = ["x-webhook-timestamp", "x-cashfree-timestamp"];

/// Values with more than ten integer digits are milliseconds.
const MILLISECONDS_FROM: f64 = 1e10;

/// Signature and timestamp as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
}

impl SignatureHeaders {
    pub fn new(signature: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            signature: Some(signature.into()),
            timestamp: Some(timestamp.into()),
        }
    }

    /// Extracts the headers, accepting either name variant.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        Self {
            signature: first_header(headers, &SIGNATURE_HEADERS),
            timestamp: first_header(headers, &TIMESTAMP_HEADERS),
        }
    }
}

fn first_header(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Verifier for processor webhook signatures.
pub struct SignatureVerifier {
    secret: Option<SecretString>,
    tolerance_secs: i64,
}

impl SignatureVerifier {
    /// Creates a verifier. A missing or empty secret rejects every delivery.
    pub fn new(secret: Option<SecretString>, tolerance_secs: i64) -> Self {
        let secret = secret.filter(|s| !s.expose_secret().is_empty());
        if secret.is_none() {
            tracing::error!("Webhook signing secret not configured, all deliveries will be rejected");
        }
        Self {
            secret,
            tolerance_secs: tolerance_secs.abs(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Verifies a delivery against the current clock.
    pub fn verify(&self, headers: &SignatureHeaders, raw_body: Option<&[u8]>) -> bool {
        self.verify_at(headers, raw_body, chrono::Utc::now().timestamp())
    }

    /// Verifies a delivery against `now_secs`.
    ///
    /// Never panics and never returns an error; every failure is `false`.
    pub fn verify_at(&self, headers: &SignatureHeaders, raw_body: Option<&[u8]>, now_secs: i64) -> bool {
        match self.check(headers, raw_body, now_secs) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(reason = %reason, "Webhook signature rejected");
                false
            }
        }
    }

    /// Runs every check and reports the first failure.
    ///
    /// # Errors
    ///
    /// - `SecretNotConfigured` - no signing secret
    /// - `MissingHeader` / `MissingBody` - a required piece is absent
    /// - `InvalidTimestamp` - timestamp is not a finite number
    /// - `TimestampOutOfRange` - outside the tolerance window
    /// - `InvalidSignature` - signature mismatch
    pub fn check(
        &self,
        headers: &SignatureHeaders,
        raw_body: Option<&[u8]>,
        now_secs: i64,
    ) -> Result<(), WebhookError> {
        let secret = self.secret.as_ref().ok_or(WebhookError::SecretNotConfigured)?;
        let signature = headers
            .signature
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::MissingHeader(SIGNATURE_HEADERS[0]))?;
        let timestamp = headers
            .timestamp
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::MissingHeader(TIMESTAMP_HEADERS[0]))?;
        let body = raw_body
            .filter(|b| !b.is_empty())
            .ok_or(WebhookError::MissingBody)?;

        let sent_at = normalize_timestamp(timestamp)?;
        if now_secs.abs_diff(sent_at) > self.tolerance_secs.unsigned_abs() {
            return Err(WebhookError::TimestampOutOfRange);
        }

        let expected = compute_signature(secret.expose_secret(), timestamp, body);
        if !constant_time_compare(expected.as_bytes(), signature.as_bytes()) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }
}

/// Parses a timestamp header into Unix seconds.
///
/// Any finite number is accepted, fractions included, and floored to whole
/// seconds. More than ten integer digits means milliseconds.
pub fn normalize_timestamp(raw: &str) -> Result<i64, WebhookError> {
    let value: f64 = raw.trim().parse().map_err(|_| WebhookError::InvalidTimestamp)?;
    if !value.is_finite() {
        return Err(WebhookError::InvalidTimestamp);
    }
    let secs = if value.abs() >= MILLISECONDS_FROM {
        value / 1000.0
    } else {
        value
    };
    Ok(secs.floor() as i64)
}

/// Computes the base64 signature the processor would send.
pub fn compute_signature(secret: &str, timestamp: &str, raw_body: &[u8]) -> String {
    // HMAC accepts keys of any length, so new_from_slice cannot fail here.
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Length check first, then a constant-time byte comparison.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    const SECRET: &str = "partner_key_test_12345";
    const NOW: i64 = 1_717_000_000;
    const BODY: &[u8] = br#"{"type":"SUBSCRIPTION_STATUS_CHANGED","event_time":"2024-05-29T10:00:00+05:30"}"#;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(Some(SecretString::new(SECRET.to_string())), DEFAULT_TOLERANCE_SECS)
    }

    fn signed(ts: &str, body: &[u8]) -> SignatureHeaders {
        SignatureHeaders::new(compute_signature(SECRET, ts, body), ts)
    }

    // ══════════════════════════════════════════════════════════════
    // Header extraction
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn reads_current_header_names() {
        let mut map = HeaderMap::new();
        map.insert("x-webhook-signature", HeaderValue::from_static("sig"));
        map.insert("x-webhook-timestamp", HeaderValue::from_static("1717000000"));

        let headers = SignatureHeaders::from_header_map(&map);

        assert_eq!(headers, SignatureHeaders::new("sig", "1717000000"));
    }

    #[test]
    fn falls_back_to_legacy_header_names() {
        let mut map = HeaderMap::new();
        map.insert("x-cashfree-signature", HeaderValue::from_static("legacy"));
        map.insert("x-cashfree-timestamp", HeaderValue::from_static("1717000000"));

        let headers = SignatureHeaders::from_header_map(&map);

        assert_eq!(headers.signature.as_deref(), Some("legacy"));
        assert_eq!(headers.timestamp.as_deref(), Some("1717000000"));
    }

    #[test]
    fn current_name_wins_when_both_present() {
        let mut map = HeaderMap::new();
        map.insert("x-webhook-signature", HeaderValue::from_static("current"));
        map.insert("x-cashfree-signature", HeaderValue::from_static("legacy"));

        let headers = SignatureHeaders::from_header_map(&map);

        assert_eq!(headers.signature.as_deref(), Some("current"));
        assert!(headers.timestamp.is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Rejections
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_valid_signature() {
        let ts = NOW.to_string();
        assert!(verifier().verify_at(&signed(&ts, BODY), Some(BODY), NOW));
    }

    #[test]
    fn unconfigured_secret_rejects_everything() {
        let verifier = SignatureVerifier::new(None, DEFAULT_TOLERANCE_SECS);
        let ts = NOW.to_string();

        assert!(!verifier.is_configured());
        assert_eq!(
            verifier.check(&signed(&ts, BODY), Some(BODY), NOW),
            Err(WebhookError::SecretNotConfigured)
        );
    }

    #[test]
    fn empty_secret_counts_as_unconfigured() {
        let verifier = SignatureVerifier::new(Some(SecretString::new(String::new())), 300);
        assert!(!verifier.is_configured());
    }

    #[test]
    fn missing_pieces_reject() {
        let ts = NOW.to_string();
        let headers = signed(&ts, BODY);

        let no_sig = SignatureHeaders { signature: None, ..headers.clone() };
        assert!(matches!(
            verifier().check(&no_sig, Some(BODY), NOW),
            Err(WebhookError::MissingHeader(_))
        ));

        let no_ts = SignatureHeaders { timestamp: None, ..headers.clone() };
        assert!(matches!(
            verifier().check(&no_ts, Some(BODY), NOW),
            Err(WebhookError::MissingHeader(_))
        ));

        assert_eq!(verifier().check(&headers, None, NOW), Err(WebhookError::MissingBody));
        assert_eq!(verifier().check(&headers, Some(b""), NOW), Err(WebhookError::MissingBody));
    }

    #[test]
    fn non_numeric_timestamp_rejects() {
        let headers = signed("yesterday", BODY);
        assert_eq!(
            verifier().check(&headers, Some(BODY), NOW),
            Err(WebhookError::InvalidTimestamp)
        );
    }

    #[test]
    fn window_is_inclusive_at_the_boundary() {
        let ts = (NOW - 300).to_string();
        assert!(verifier().verify_at(&signed(&ts, BODY), Some(BODY), NOW));

        let ts = (NOW - 301).to_string();
        assert_eq!(
            verifier().check(&signed(&ts, BODY), Some(BODY), NOW),
            Err(WebhookError::TimestampOutOfRange)
        );
    }

    #[test]
    fn future_timestamps_beyond_window_reject() {
        let ts = (NOW + 301).to_string();
        assert_eq!(
            verifier().check(&signed(&ts, BODY), Some(BODY), NOW),
            Err(WebhookError::TimestampOutOfRange)
        );
    }

    #[test]
    fn tampered_body_rejects() {
        let ts = NOW.to_string();
        let headers = signed(&ts, BODY);
        assert_eq!(
            verifier().check(&headers, Some(br#"{"type":"forged"}"#), NOW),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn truncated_signature_rejects_without_panicking() {
        let ts = NOW.to_string();
        let mut headers = signed(&ts, BODY);
        headers.signature = headers.signature.map(|s| s[..10].to_string());

        assert_eq!(
            verifier().check(&headers, Some(BODY), NOW),
            Err(WebhookError::InvalidSignature)
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp normalization
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn ten_digit_timestamps_are_seconds() {
        assert_eq!(normalize_timestamp("1717000000").unwrap(), 1_717_000_000);
    }

    #[test]
    fn longer_timestamps_are_milliseconds() {
        assert_eq!(normalize_timestamp("1717000000999").unwrap(), 1_717_000_000);
    }

    #[test]
    fn fractional_timestamps_are_floored() {
        assert_eq!(normalize_timestamp("1717000000.5").unwrap(), 1_717_000_000);
        assert_eq!(normalize_timestamp("1717000000999.9").unwrap(), 1_717_000_000);
    }

    #[test]
    fn non_finite_timestamps_are_invalid() {
        for raw in ["NaN", "inf", "-infinity"] {
            assert_eq!(normalize_timestamp(raw), Err(WebhookError::InvalidTimestamp));
        }
    }

    #[test]
    fn fractional_header_signs_over_the_raw_value() {
        let ts = format!("{NOW}.5");
        assert!(verifier().verify_at(&signed(&ts, BODY), Some(BODY), NOW));
    }

    #[test]
    fn millisecond_header_signs_over_the_raw_value() {
        let ts = (NOW * 1000 + 250).to_string();
        assert!(verifier().verify_at(&signed(&ts, BODY), Some(BODY), NOW));
    }

    #[test]
    fn signature_is_standard_base64_of_sha256() {
        let sig = compute_signature(SECRET, "1", b"x");
        assert_eq!(sig.len(), 44);
        assert!(sig.ends_with('='));
    }

    // ══════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn correctly_signed_deliveries_verify(
            body in proptest::collection::vec(any::<u8>(), 1..512),
            skew in -300i64..=300,
            secret in "[a-zA-Z0-9_]{1,40}",
        ) {
            let verifier = SignatureVerifier::new(Some(SecretString::new(secret.clone())), 300);
            let ts = (NOW + skew).to_string();
            let headers = SignatureHeaders::new(compute_signature(&secret, &ts, &body), ts);

            prop_assert!(verifier.verify_at(&headers, Some(&body), NOW));
        }

        #[test]
        fn flipping_any_signature_byte_rejects(
            body in proptest::collection::vec(any::<u8>(), 1..256),
            index in 0usize..44,
            mask in 1u8..0x80,
        ) {
            let ts = NOW.to_string();
            let mut sig = compute_signature(SECRET, &ts, &body).into_bytes();
            sig[index] ^= mask;
            let sig = String::from_utf8(sig).unwrap();
            let headers = SignatureHeaders::new(sig, ts);

            prop_assert!(!verifier().verify_at(&headers, Some(&body), NOW));
        }

        #[test]
        fn stale_or_future_deliveries_reject(
            offset in 301i64..1_000_000,
            future in any::<bool>(),
        ) {
            let sent = if future { NOW + offset } else { NOW - offset };
            let ts = sent.to_string();

            prop_assert!(!verifier().verify_at(&signed(&ts, BODY), Some(BODY), NOW));
        }

        #[test]
        fn milliseconds_and_seconds_agree(
            skew in -1_000i64..1_000,
            millis in 0i64..1000,
        ) {
            let secs = NOW + skew;
            let as_secs = secs.to_string();
            let as_millis = (secs * 1000 + millis).to_string();

            let by_secs = verifier().verify_at(&signed(&as_secs, BODY), Some(BODY), NOW);
            let by_millis = verifier().verify_at(&signed(&as_millis, BODY), Some(BODY), NOW);

            prop_assert_eq!(by_secs, by_millis);
        }
    }
}

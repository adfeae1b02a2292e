//! `Stripe-Signature` verification: `t=<unix>,v1=<hex hmac-sha256>[,v1=...]`
//! over `"{t}.{raw body}"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
}

pub fn verify(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    let issued_at: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
    let skew = now.checked_sub(issued_at).map(i64::unsigned_abs);
    if skew.is_none_or(|skew| skew > tolerance_secs.unsigned_abs()) {
        return Err(SignatureError::Expired);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Produce a header value the way the provider does. Used by tests and local
/// tooling that replays events.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";
    const NOW: i64 = 1_750_000_000;

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, SECRET, NOW).unwrap();
        assert_eq!(verify(payload, Some(&header), SECRET, NOW + 10, 300), Ok(()));
    }

    #[test]
    fn rejects_modified_payload() {
        let header = sign(br#"{"type":"a"}"#, SECRET, NOW).unwrap();
        assert_eq!(
            verify(br#"{"type":"b"}"#, Some(&header), SECRET, NOW, 300),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = b"{}";
        let header = sign(payload, "other", NOW).unwrap();
        assert_eq!(
            verify(payload, Some(&header), SECRET, NOW, 300),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let header = sign(payload, SECRET, NOW - 600).unwrap();
        assert_eq!(
            verify(payload, Some(&header), SECRET, NOW, 300),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert_eq!(
            verify(b"{}", None, SECRET, NOW, 300),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify(b"{}", Some("v1=abcd"), SECRET, NOW, 300),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify(b"{}", Some("t=123"), SECRET, NOW, 300),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify(b"{}", Some("t=-9223372036854775808,v1=00"), SECRET, NOW, 300),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify(b"{}", Some("t=9223372036854775807,v1=00"), SECRET, -NOW, 300),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn accepts_any_of_several_v1_entries() {
        let payload = b"{}";
        let good = sign(payload, SECRET, NOW).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={good_sig}");
        assert_eq!(verify(payload, Some(&header), SECRET, NOW, 300), Ok(()));
    }
}

use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature headers")]
    MissingHeaders,
    #[error("malformed signature timestamp")]
    MalformedTimestamp,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("invalid webhook secret")]
    InvalidKey,
    #[error("signature mismatch")]
    Mismatch,
}

/// Hex HMAC-SHA256 over `"<timestamp>.<body>"`.
pub fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the `x-timestamp`/`x-signature` pair against `payload`.
pub fn verify_signature(
    headers: &HeaderMap,
    payload: &[u8],
    secret: &str,
    tolerance_secs: u64,
    now: i64,
) -> Result<(), SignatureError> {
    let (Some(ts), Some(sig)) = (
        headers.get(TIMESTAMP_HEADER).and_then(|h| h.to_str().ok()),
        headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok()),
    ) else {
        return Err(SignatureError::MissingHeaders);
    };

    let ts = ts.trim();
    let sent_at = ts
        .parse::<i64>()
        .map_err(|_| SignatureError::MalformedTimestamp)?;
    if now.abs_diff(sent_at) > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    let expected = sign(secret, ts, payload)?;
    if constant_time_eq(&expected, sig.trim()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

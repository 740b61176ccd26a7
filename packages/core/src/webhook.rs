//! HMAC-SHA256 webhook signatures.
//!
//! The service signs every webhook delivery with the recipient agent's
//! secret token and sends the result in the [`SIGNATURE_HEADER`] header as
//! `sha256=<lowercase hex>`. The agent recomputes the MAC over the raw body
//! and compares the two in constant time before trusting anything in the
//! payload.
//!
//! Verification is a plain `bool`: a mismatch is an expected outcome that
//! callers branch on, not an error. The typed helper
//! [`parse_verified_event`] layers payload decoding on top and only ever
//! decodes bytes that have already passed verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::event::WebhookEvent;

type HmacSha256 = Hmac<Sha256>;

/// Header the service uses to carry the webhook signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Optional algorithm prefix on the signature value. Matched case-sensitively.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Length of a SHA-256 MAC in bytes.
const MAC_LEN: usize = 32;

/// Errors returned by [`parse_verified_event`].
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signature does not match payload")]
    SignatureMismatch,
    #[error("webhook payload is not a valid event: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Compute the HMAC-SHA256 of `payload` keyed by `secret`, as lowercase hex.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> String {
    hex::encode(new_mac(secret, payload).finalize().into_bytes())
}

/// The full header value the service sends: `sha256=<hex>`.
pub fn signature_header_value(payload: &[u8], secret: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", compute_signature(payload, secret))
}

/// Verify that `signature` is the HMAC-SHA256 of `payload` under `secret_token`.
///
/// Accepts `sha256=<hex>` or bare `<hex>`. Returns `false` for any mismatch,
/// including a signature that is not 64 lowercase hex characters. The MAC is
/// always computed in full, even for empty inputs or a malformed signature,
/// and the final byte comparison runs in constant time.
pub fn verify_webhook_signature(payload: &str, signature: &str, secret_token: &str) -> bool {
    verify_bytes(payload.as_bytes(), signature, secret_token.as_bytes())
}

/// Byte-oriented form of [`verify_webhook_signature`] for raw request bodies
/// that have not been decoded as UTF-8.
pub fn verify_bytes(payload: &[u8], signature: &str, secret: &[u8]) -> bool {
    let supplied = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);
    let mac = new_mac(secret, payload);

    match decode_signature(supplied) {
        // `verify_slice` compares with `subtle::ConstantTimeEq`.
        Some(bytes) => mac.verify_slice(&bytes).is_ok(),
        None => {
            let _ = mac.finalize();
            false
        }
    }
}

/// Verify `raw_body` and, only if the signature matches, decode it as a
/// [`WebhookEvent`].
pub fn parse_verified_event(
    raw_body: &[u8],
    signature: &str,
    secret_token: &str,
) -> Result<WebhookEvent, WebhookError> {
    if !verify_bytes(raw_body, signature, secret_token.as_bytes()) {
        return Err(WebhookError::SignatureMismatch);
    }
    Ok(serde_json::from_slice(raw_body)?)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn new_mac(secret: &[u8], payload: &[u8]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(payload);
    mac
}

/// Decode a signature into MAC bytes. Only canonical lowercase hex of the
/// exact MAC length is accepted; the service never emits anything else, and
/// accepting other spellings would let a flipped case bit verify.
fn decode_signature(hex_sig: &str) -> Option<[u8; MAC_LEN]> {
    if hex_sig.len() != MAC_LEN * 2 {
        return None;
    }
    if !hex_sig
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return None;
    }
    let mut out = [0u8; MAC_LEN];
    hex::decode_to_slice(hex_sig, &mut out).ok()?;
    Some(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

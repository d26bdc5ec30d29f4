//! GitHub webhook signature verification (`X-Hub-Signature-256`)

use std::fmt;

use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Prefix GitHub puts in front of the hex digest
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Shared secret configured on the GitHub webhook.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Verifies a GitHub webhook signature header against the raw request body.
///
/// Returns `false` for a missing header, a header without the `sha256=`
/// prefix, non-hex (or uppercase hex) content or a digest of the wrong
/// length. The digest comparison itself is constant time
/// (`Mac::verify_slice`).
pub fn verify(payload: &[u8], signature_header: Option<&str>, secret: &WebhookSecret) -> bool {
    let Some(signature_header) = signature_header else {
        debug!("No signature header supplied");
        return false;
    };

    let Some(git_signature) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        debug!("Signature header is missing the '{}' prefix", SIGNATURE_PREFIX);
        return false;
    };

    // GitHub always sends lowercase hex; the expected header is compared as a whole
    if git_signature.bytes().any(|b| b.is_ascii_uppercase()) {
        debug!("Signature contains uppercase hex digits");
        return false;
    }

    let git_signature_bytes = match hex_decode(git_signature) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Signature is not valid hex: {}", e);
            return false;
        }
    };

    let mut mac = mac_for(secret);
    mac.update(payload);

    // Length mismatch is reported as an error by verify_slice, not a panic
    mac.verify_slice(&git_signature_bytes).is_ok()
}

// HMAC pads or hashes the key, so every key length is accepted
fn mac_for(secret: &WebhookSecret) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Computes the `X-Hub-Signature-256` header value for a payload.
pub fn sign(payload: &[u8], secret: &WebhookSecret) -> String {
    let mut mac = mac_for(secret);
    mac.update(payload);
    format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    )
}

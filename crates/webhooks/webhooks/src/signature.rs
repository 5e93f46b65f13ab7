//! HMAC signature generation and verification.
//!
//! Signatures follow the `X-Hub-Signature-256` convention:
//! `sha256=<hex HMAC-SHA256 of the raw body>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Webhook signer for generating and verifying signatures.
pub struct WebhookSigner {
    secret: String,
}

impl WebhookSigner {
    /// Creates a new signer with the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates the hex signature of `payload`.
    pub fn sign(&self, payload: &[u8]) -> Result<String, SignatureError> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Generates a full signature header value.
    pub fn sign_header(&self, payload: &[u8]) -> Result<String, SignatureError> {
        Ok(format!("{}{}", SIGNATURE_PREFIX, self.sign(payload)?))
    }

    /// Parses and verifies a signature header.
    pub fn verify_header(&self, header: &str, payload: &[u8]) -> Result<(), SignatureError> {
        let signature = header
            .trim()
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(SignatureError::InvalidFormat)?;
        let expected = hex::decode(signature).map_err(|_| SignatureError::InvalidFormat)?;

        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(&expected).map_err(|_| SignatureError::Invalid)
    }

    fn mac(&self) -> Result<HmacSha256, SignatureError> {
        HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)
    }
}

/// Signature verification errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Invalid signature format.
    InvalidFormat,
    /// Signature is invalid.
    Invalid,
    /// The secret cannot be used as an HMAC key.
    InvalidKey,
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::InvalidFormat => write!(f, "Invalid signature format"),
            SignatureError::Invalid => write!(f, "Invalid signature"),
            SignatureError::InvalidKey => write!(f, "Invalid signing key"),
        }
    }
}

impl std::error::Error for SignatureError {}

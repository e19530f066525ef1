use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignerError;

pub const DEFAULT_SIGNATURE_KEY: &str = "hookwire-webhook-key";

/// Derives the value of the signature header from a subscriber secret.
///
/// Implementations must be deterministic for a given secret, otherwise
/// receivers cannot verify deliveries.
pub trait Signer: Send + Sync {
    fn sign(&self, secret: &str) -> Result<String, SignerError>;
}

impl<F> Signer for F
where
    F: Fn(&str) -> Result<String, SignerError> + Send + Sync,
{
    fn sign(&self, secret: &str) -> Result<String, SignerError> {
        self(secret)
    }
}

/// HMAC-SHA256 keyed with an application-level key, hex encoded.
#[derive(Debug, Clone)]
pub struct HmacSigner {
    key: String,
}

impl HmacSigner {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for HmacSigner {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNATURE_KEY)
    }
}

impl Signer for HmacSigner {
    fn sign(&self, secret: &str) -> Result<String, SignerError> {
        hmac_signature(&self.key, secret)
    }
}

pub fn hmac_signature(key: &str, data: &str) -> Result<String, SignerError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| SignerError(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Receiver-side check of a signature header, constant time.
pub fn verify_signature(key: &str, secret: &str, signature: &str) -> bool {
    match hmac_signature(key, secret) {
        Ok(expected) => subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), signature.as_bytes()).into(),
        Err(_) => false,
    }
}

/// LINE webhook signature: base64(HMAC-SHA256(channel_secret, body))
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature (header names are case-insensitive)
pub const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha256,
}

impl SignatureVerifier {
    pub fn new(channel_secret: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(channel_secret)?,
        })
    }

    /// Compute the signature the platform would send for `body`
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a received signature
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = STANDARD.decode(signature.trim()) else {
            return false;
        };

        let mut mac = self.mac.clone();
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

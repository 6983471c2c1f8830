use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use catraca_domain::event_day::EventDay;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("credential signing secret is missing")]
pub struct MissingSecret;

/// HMAC-SHA-256 signer for credential tuples, keyed once at startup.
#[derive(Clone)]
pub struct SignatureEngine {
    mac: HmacSha256,
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine").finish_non_exhaustive()
    }
}

/// The exact signed message: `recordId-participantIndex-day`.
fn message(record_id: Uuid, participant_index: u32, day: &EventDay) -> String {
    format!("{record_id}-{participant_index}-{day}")
}

impl SignatureEngine {
    /// Fails on an empty or whitespace-only secret; there is no unkeyed fallback.
    pub fn new(secret: &str) -> Result<Self, MissingSecret> {
        if secret.trim().is_empty() {
            return Err(MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| MissingSecret)?;
        Ok(Self { mac })
    }

    pub fn sign(&self, record_id: Uuid, participant_index: u32, day: &EventDay) -> String {
        let mut mac = self.mac.clone();
        mac.update(message(record_id, participant_index, day).as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Recompute and compare in constant time.
    pub fn verify(
        &self,
        record_id: Uuid,
        participant_index: u32,
        day: &EventDay,
        signature: &str,
    ) -> bool {
        let Ok(provided) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(message(record_id, participant_index, day).as_bytes());
        mac.verify_slice(&provided).is_ok()
    }
}

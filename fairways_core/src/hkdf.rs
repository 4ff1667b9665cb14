use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::chain::SeedMaterial;
use crate::error::{CoreError, CoreResult};
use crate::source::{rejection_threshold, MAX_REJECTION_ATTEMPTS};

// Deterministic RNG using an HKDF (RFC 5869) extract-then-expand construction
// prk        = HMAC-SHA256(server_seed, prev_spin_hash || client_seed || nonce)
// master_key = Expand(prk, "spin-master-v1", 32)
// sub-key    = Expand(master_key, domain, len)

pub type HmacSha256 = Hmac<Sha256>;

const HASH_LEN: usize = 32;

/// HKDF-Expand can produce at most 255 blocks.
pub const MAX_DERIVED_LEN: usize = 255 * HASH_LEN;

pub const MASTER_KEY_INFO: &str = "spin-master-v1";

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> CoreResult<[u8; HASH_LEN]> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|_| CoreError::InvalidKeyLength(key.len()))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

pub fn hkdf_expand(prk: &[u8], info: &[u8], len: usize) -> CoreResult<Vec<u8>> {
    if len == 0 || len > MAX_DERIVED_LEN {
        return Err(CoreError::InvalidKeyLength(len));
    }
    let mut okm = Vec::with_capacity(len);
    let mut block: Vec<u8> = Vec::new();
    let mut counter = 1u8;
    while okm.len() < len {
        let t = hmac_sha256(prk, &[block.as_slice(), info, &[counter]])?;
        block = t.to_vec();
        okm.extend_from_slice(&t);
        counter = counter.wrapping_add(1);
    }
    okm.truncate(len);
    Ok(okm)
}

/// Unbiased draw in `[0, n)`. `draw` receives `"<domain>:<attempt>"` and must
/// be deterministic, so a rejected value is retried reproducibly.
pub(crate) fn rejection_sample<F>(domain: &str, n: u64, mut draw: F) -> CoreResult<u64>
where
    F: FnMut(&str) -> CoreResult<u64>,
{
    if n == 0 {
        return Err(CoreError::InvalidMax);
    }
    let threshold = rejection_threshold(n);
    for attempt in 0..MAX_REJECTION_ATTEMPTS {
        let v = draw(&format!("{domain}:{attempt}"))?;
        if v >= threshold {
            return Ok(v % n);
        }
        debug!(domain, attempt, "rejected biased draw");
    }
    Err(CoreError::RejectionExhausted {
        domain: domain.to_string(),
        attempts: MAX_REJECTION_ATTEMPTS,
    })
}

/// Per-round fair RNG. Owns the round's master key; drop it when the round ends.
pub struct FairRng {
    master_key: [u8; HASH_LEN],
}

impl fmt::Debug for FairRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FairRng")
            .field("master_key", &"<redacted>")
            .finish()
    }
}

impl FairRng {
    pub fn new(seed: &SeedMaterial) -> CoreResult<Self> {
        let nonce = seed.nonce.to_string();
        let prk = hmac_sha256(
            seed.server_seed.as_bytes(),
            &[
                seed.prev_spin_hash.as_bytes(),
                seed.client_seed.as_bytes(),
                nonce.as_bytes(),
            ],
        )?;
        let okm = hkdf_expand(&prk, MASTER_KEY_INFO.as_bytes(), HASH_LEN)?;
        let mut master_key = [0u8; HASH_LEN];
        master_key.copy_from_slice(&okm);
        Ok(Self { master_key })
    }

    /// Hex of the master key, for the audit log only.
    pub fn master_key_hex(&self) -> String {
        hex::encode(self.master_key)
    }

    pub fn derive_key(&self, domain: &str, len: usize) -> CoreResult<Vec<u8>> {
        hkdf_expand(&self.master_key, domain.as_bytes(), len)
    }

    fn derive_u64(&self, domain: &str) -> CoreResult<u64> {
        let bytes = self.derive_key(domain, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes);
        Ok(u64::from_be_bytes(raw))
    }

    /// Uniform integer in `[0, n)` for `domain`.
    pub fn int(&self, domain: &str, n: u64) -> CoreResult<u64> {
        rejection_sample(domain, n, |d| self.derive_u64(d))
    }

    pub fn float64(&self, domain: &str) -> CoreResult<f64> {
        const MANTISSA: u64 = 1 << 53;
        let v = self.derive_u64(domain)?;
        Ok((v % MANTISSA) as f64 / MANTISSA as f64)
    }

    pub fn reel_position(&self, reel_index: usize, reel_length: usize) -> CoreResult<usize> {
        if reel_length == 0 {
            return Err(CoreError::InvalidReelLength);
        }
        let pos = self.int(&format!("reel:{reel_index}"), reel_length as u64)?;
        Ok(pos as usize)
    }

    pub fn reel_positions(&self, reel_lengths: &[usize]) -> CoreResult<Vec<usize>> {
        reel_lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| self.reel_position(i, len))
            .collect()
    }
}

/// Re-derives a single reel position from scratch and compares.
pub fn verify_reel_position(
    seed: &SeedMaterial,
    reel_index: usize,
    reel_length: usize,
    claimed: usize,
) -> CoreResult<bool> {
    let rng = FairRng::new(seed)?;
    Ok(rng.reel_position(reel_index, reel_length)? == claimed)
}

pub fn verify_all_reel_positions(
    seed: &SeedMaterial,
    reel_lengths: &[usize],
    claimed: &[usize],
) -> CoreResult<bool> {
    if reel_lengths.len() != claimed.len() {
        return Err(CoreError::LengthMismatch {
            expected: reel_lengths.len(),
            actual: claimed.len(),
        });
    }
    let rng = FairRng::new(seed)?;
    Ok(rng.reel_positions(reel_lengths)? == claimed)
}

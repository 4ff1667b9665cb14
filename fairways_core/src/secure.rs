use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::{CoreError, CoreResult};
use crate::source::{private, rejection_threshold, CryptoGrade, RandomSource, MAX_REJECTION_ATTEMPTS};

/// OS-entropy source. Mints seeds and keys, never decides a round.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureRng;

impl SecureRng {
    pub fn new() -> Self {
        Self
    }

    fn next_u64(&mut self) -> CoreResult<u64> {
        OsRng
            .try_next_u64()
            .map_err(|e| CoreError::Entropy(e.to_string()))
    }

    /// Fresh 32-byte server seed, hex encoded.
    pub fn generate_server_seed(&mut self) -> CoreResult<String> {
        self.hex_secret(32)
    }

    /// Fresh 16-byte client seed, hex encoded.
    pub fn generate_client_seed(&mut self) -> CoreResult<String> {
        self.hex_secret(16)
    }

    fn hex_secret(&mut self, len: usize) -> CoreResult<String> {
        let mut buf = vec![0u8; len];
        self.fill_bytes(&mut buf)?;
        Ok(hex::encode(buf))
    }
}

impl RandomSource for SecureRng {
    fn int(&mut self, max: u64) -> CoreResult<u64> {
        if max == 0 {
            return Err(CoreError::InvalidMax);
        }
        let threshold = rejection_threshold(max);
        for _ in 0..MAX_REJECTION_ATTEMPTS {
            let v = self.next_u64()?;
            if v >= threshold {
                return Ok(v % max);
            }
        }
        Err(CoreError::RejectionExhausted {
            domain: "os".to_string(),
            attempts: MAX_REJECTION_ATTEMPTS,
        })
    }

    fn float64(&mut self) -> CoreResult<f64> {
        let v = self.next_u64()?;
        Ok((v >> 11) as f64 / (1u64 << 53) as f64)
    }

    fn fill_bytes(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| CoreError::Entropy(e.to_string()))
    }
}

impl private::Sealed for SecureRng {}
impl CryptoGrade for SecureRng {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_stays_in_bounds() {
        let mut rng = SecureRng::new();
        for _ in 0..500 {
            assert!(rng.int(7).unwrap() < 7);
        }
        assert!(matches!(rng.int(0), Err(CoreError::InvalidMax)));
    }

    #[test]
    fn float_in_unit_interval() {
        let mut rng = SecureRng::new();
        for _ in 0..500 {
            let f = rng.float64().unwrap();
            assert!((0.0..1.0).contains(&f));
        }
    }

    #[test]
    fn seeds_are_hex_and_distinct() {
        let mut rng = SecureRng::new();
        let a = rng.generate_server_seed().unwrap();
        let b = rng.generate_server_seed().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(rng.generate_client_seed().unwrap().len(), 32);
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = SecureRng::new();
        let mut items: Vec<u32> = (0..50).collect();
        rng.shuffle(&mut items).unwrap();
        items.sort_unstable();
        assert_eq!(items, (0..50).collect::<Vec<_>>());
    }
}

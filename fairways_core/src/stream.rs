use crate::chain::SeedMaterial;
use crate::error::{CoreError, CoreResult};
use crate::hkdf::FairRng;
use crate::source::{private, CryptoGrade, RandomSource};

/// Call-ordered view over a round's `FairRng`.
///
/// Each call consumes the domain `stream:<counter>` and bumps the counter, so
/// two streams built from the same seed material agree only while their calls
/// come in the same order. One stream per round, owned by that round.
#[derive(Debug)]
pub struct StreamRng {
    rng: FairRng,
    counter: u64,
}

impl StreamRng {
    pub fn new(seed: &SeedMaterial) -> CoreResult<Self> {
        Ok(Self::from_fair(FairRng::new(seed)?))
    }

    pub fn from_fair(rng: FairRng) -> Self {
        Self { rng, counter: 0 }
    }

    /// Number of calls consumed so far.
    pub fn position(&self) -> u64 {
        self.counter
    }

    pub fn fair(&self) -> &FairRng {
        &self.rng
    }

    fn next_domain(&mut self) -> String {
        let domain = format!("stream:{}", self.counter);
        self.counter += 1;
        domain
    }
}

impl RandomSource for StreamRng {
    fn int(&mut self, max: u64) -> CoreResult<u64> {
        let domain = self.next_domain();
        self.rng.int(&domain, max)
    }

    fn float64(&mut self) -> CoreResult<f64> {
        let domain = self.next_domain();
        self.rng.float64(&domain)
    }

    fn fill_bytes(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        let domain = self.next_domain();
        let bytes = self.rng.derive_key(&domain, buf.len())?;
        if bytes.len() != buf.len() {
            return Err(CoreError::LengthMismatch {
                expected: buf.len(),
                actual: bytes.len(),
            });
        }
        buf.copy_from_slice(&bytes);
        Ok(())
    }
}

impl private::Sealed for StreamRng {}
impl CryptoGrade for StreamRng {}

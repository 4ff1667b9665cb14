use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{CoreError, CoreResult};

// Hash chain linking every round to the one before it.
//
// round 1:  prev = root = H(server_seed) or H(H(server_seed) || theta_commitment)
// round n:  spin_hash_n = H(prev_n || server_seed || client_seed_n || nonce_n)
//           prev_{n+1} = spin_hash_n

pub fn derive_hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

pub fn server_seed_hash(server_seed: &str) -> String {
    derive_hash_hex(server_seed.as_bytes())
}

/// Plain concatenation with no delimiters. Kept byte-for-byte so already
/// published chains keep verifying.
pub fn spin_hash(prev_hash: &str, server_seed: &str, client_seed: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(server_seed.as_bytes());
    hasher.update(client_seed.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// `prev_spin_hash` for the first round of a session.
pub fn chain_root(server_seed_hash: &str, theta_commitment: Option<&str>) -> String {
    match theta_commitment {
        Some(theta) => {
            let mut hasher = Sha256::new();
            hasher.update(server_seed_hash.as_bytes());
            hasher.update(theta.as_bytes());
            hex::encode(hasher.finalize())
        }
        None => server_seed_hash.to_string(),
    }
}

/// Everything a round's randomness is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMaterial {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
    pub prev_spin_hash: String,
}

impl SeedMaterial {
    pub fn new(
        server_seed: impl Into<String>,
        client_seed: impl Into<String>,
        nonce: u64,
        prev_spin_hash: impl Into<String>,
    ) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
            prev_spin_hash: prev_spin_hash.into(),
        }
    }

    pub fn spin_hash(&self) -> String {
        spin_hash(&self.prev_spin_hash, &self.server_seed, &self.client_seed, self.nonce)
    }
}

/// Pre-round commitments published before any secret is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    server_seed_hash: String,
    theta_commitment: Option<String>,
    #[serde(skip)]
    theta_verified: bool,
}

impl Commitment {
    pub fn new(server_seed_hash: impl Into<String>) -> Self {
        Self {
            server_seed_hash: server_seed_hash.into(),
            theta_commitment: None,
            theta_verified: false,
        }
    }

    pub fn for_server_seed(server_seed: &str) -> Self {
        Self::new(server_seed_hash(server_seed))
    }

    /// Dual commitment: the client publishes `H(theta_seed)` up front.
    /// A sealed commitment cannot be replaced.
    pub fn with_theta(mut self, theta_commitment: impl Into<String>) -> CoreResult<Self> {
        if self.theta_verified {
            return Err(CoreError::ThetaAlreadyVerified);
        }
        self.theta_commitment = Some(theta_commitment.into());
        Ok(self)
    }

    pub fn server_seed_hash(&self) -> &str {
        &self.server_seed_hash
    }

    pub fn theta_commitment(&self) -> Option<&str> {
        self.theta_commitment.as_deref()
    }

    pub fn theta_verified(&self) -> bool {
        self.theta_verified
    }

    pub fn root(&self) -> String {
        chain_root(&self.server_seed_hash, self.theta_commitment.as_deref())
    }

    pub fn verify_server_seed(&self, server_seed: &str) -> bool {
        server_seed_hash(server_seed) == self.server_seed_hash
    }

    /// Checks a revealed theta seed. A match seals the commitment for good.
    pub fn reveal_theta(&mut self, theta_seed: &str) -> CoreResult<bool> {
        if self.theta_verified {
            return Err(CoreError::ThetaAlreadyVerified);
        }
        let expected = self
            .theta_commitment
            .as_deref()
            .ok_or(CoreError::NoThetaCommitment)?;
        let matches = derive_hash_hex(theta_seed.as_bytes()) == expected;
        if matches {
            self.theta_verified = true;
        } else {
            warn!("theta seed does not match its commitment");
        }
        Ok(matches)
    }
}

/// One published round as it appears in an audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinLink {
    pub client_seed: String,
    pub nonce: u64,
    pub prev_spin_hash: String,
    pub spin_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainVerdict {
    Valid,
    ServerSeedMismatch,
    /// `prev_spin_hash` of the spin at `index` does not point at the previous round.
    BrokenLink { index: usize },
    /// Recomputed hash of the spin at `index` differs from the published one.
    HashMismatch { index: usize },
}

impl ChainVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainVerdict::Valid)
    }

    pub fn failed_index(&self) -> Option<usize> {
        match self {
            ChainVerdict::BrokenLink { index } | ChainVerdict::HashMismatch { index } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

/// Replays the whole chain from its root. Stops at the first bad round.
pub fn verify_chain(
    server_seed: &str,
    server_seed_hash_claimed: &str,
    theta_commitment: Option<&str>,
    spins: &[SpinLink],
) -> ChainVerdict {
    if server_seed_hash(server_seed) != server_seed_hash_claimed {
        warn!("server seed does not match its published hash");
        return ChainVerdict::ServerSeedMismatch;
    }
    let mut running = chain_root(server_seed_hash_claimed, theta_commitment);
    for (index, spin) in spins.iter().enumerate() {
        if spin.prev_spin_hash != running {
            warn!(index, "chain link broken");
            return ChainVerdict::BrokenLink { index };
        }
        let recomputed = spin_hash(&running, server_seed, &spin.client_seed, spin.nonce);
        if recomputed != spin.spin_hash {
            warn!(index, "spin hash mismatch");
            return ChainVerdict::HashMismatch { index };
        }
        running = recomputed;
    }
    ChainVerdict::Valid
}

/// Server-side session chain: hands out seed material and records links.
#[derive(Debug, Clone)]
pub struct HashChain {
    server_seed: String,
    commitment: Commitment,
    running: String,
    last_nonce: Option<u64>,
    links: Vec<SpinLink>,
}

impl HashChain {
    pub fn new(server_seed: impl Into<String>, theta_commitment: Option<String>) -> Self {
        let server_seed = server_seed.into();
        let commitment = Commitment {
            server_seed_hash: server_seed_hash(&server_seed),
            theta_commitment,
            theta_verified: false,
        };
        let running = commitment.root();
        Self {
            server_seed,
            commitment,
            running,
            last_nonce: None,
            links: Vec::new(),
        }
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    /// Checks the client's revealed theta seed against the session commitment.
    pub fn reveal_theta(&mut self, theta_seed: &str) -> CoreResult<bool> {
        self.commitment.reveal_theta(theta_seed)
    }

    pub fn head(&self) -> &str {
        &self.running
    }

    pub fn links(&self) -> &[SpinLink] {
        &self.links
    }

    pub fn next_round(&self, client_seed: &str, nonce: u64) -> CoreResult<SeedMaterial> {
        if let Some(previous) = self.last_nonce {
            if nonce <= previous {
                return Err(CoreError::NonceNotIncreasing { previous, got: nonce });
            }
        }
        Ok(SeedMaterial::new(
            self.server_seed.clone(),
            client_seed,
            nonce,
            self.running.clone(),
        ))
    }

    /// Appends a played round. The seed must have come from `next_round` on
    /// the current head.
    pub fn record(&mut self, seed: &SeedMaterial) -> CoreResult<SpinLink> {
        if let Some(previous) = self.last_nonce {
            if seed.nonce <= previous {
                return Err(CoreError::NonceNotIncreasing { previous, got: seed.nonce });
            }
        }
        if seed.prev_spin_hash != self.running || seed.server_seed != self.server_seed {
            return Err(CoreError::StaleSeed);
        }
        let link = SpinLink {
            client_seed: seed.client_seed.clone(),
            nonce: seed.nonce,
            prev_spin_hash: seed.prev_spin_hash.clone(),
            spin_hash: seed.spin_hash(),
        };
        self.running = link.spin_hash.clone();
        self.last_nonce = Some(seed.nonce);
        self.links.push(link.clone());
        Ok(link)
    }
}

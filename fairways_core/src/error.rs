#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("invalid bound: max must be positive")]
    InvalidMax,
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: i64, max: i64 },
    #[error("weights must not be empty")]
    EmptyWeights,
    #[error("total weight must be positive")]
    ZeroTotalWeight,
    #[error("reel length must be positive")]
    InvalidReelLength,
    #[error("reel {reel} position {position} is outside a strip of length {length}")]
    InvalidPosition {
        reel: usize,
        position: usize,
        length: usize,
    },
    #[error("derived key length {0} is outside 1..=8160")]
    InvalidKeyLength(usize),
    #[error("bet must be a positive finite amount, got {0}")]
    InvalidBet(f64),
    #[error("invalid reel weights: {0}")]
    InvalidWeights(String),
    #[error("entropy source failed: {0}")]
    Entropy(String),
    #[error("rejection sampling exhausted {attempts} attempts for domain {domain:?}")]
    RejectionExhausted { domain: String, attempts: u32 },
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("nonce must strictly increase: previous {previous}, got {got}")]
    NonceNotIncreasing { previous: u64, got: u64 },
    #[error("seed material does not extend the current chain head")]
    StaleSeed,
    #[error("theta commitment already verified")]
    ThetaAlreadyVerified,
    #[error("no theta commitment to verify against")]
    NoThetaCommitment,
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

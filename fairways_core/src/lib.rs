pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod hkdf;
pub mod paytable;
pub mod secure;
#[cfg(feature = "simulation")]
pub mod sim;
pub mod source;
pub mod stream;
pub mod strips;
pub mod symbols;
pub mod ways;

pub use crate::chain::{
    chain_root, derive_hash_hex, server_seed_hash, spin_hash, verify_chain, ChainVerdict,
    Commitment, HashChain, SeedMaterial, SpinLink,
};
pub use crate::config::{GameConfig, GameMode, GridConfig, WaysRules};
pub use crate::engine::{play_round, resolve_round, verify_round, RoundOutcome};
pub use crate::error::{CoreError, CoreResult};
pub use crate::grid::{Grid, Position};
pub use crate::hkdf::{verify_all_reel_positions, verify_reel_position, FairRng};
pub use crate::paytable::{
    apply_max_win_cap, calculate_cascade, cascade_multiplier, is_capped, CascadeResult,
    CascadeWinDetail, Paytable, PaytableEntry,
};
pub use crate::secure::SecureRng;
pub use crate::source::{CryptoGrade, RandomSource};
pub use crate::stream::StreamRng;
pub use crate::strips::{build_reel_set, materialize, ReelSet, ReelStrip, ReelWeights};
pub use crate::symbols::{Symbol, SymbolSet};
pub use crate::ways::{find_ways_wins, SymbolWin};

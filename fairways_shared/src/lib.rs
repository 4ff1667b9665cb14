use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One published round, as handed to a player or auditor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoundAudit {
    pub ts: DateTime<Utc>,
    pub mode: String,
    pub client_seed: String,
    pub nonce: u64,
    pub server_seed_hash: String,
    pub prev_spin_hash: String,
    pub spin_hash: String,
    pub reel_positions: Vec<usize>,
    pub strip_checksums: Vec<String>,
    pub bet: f64,
    pub cascades: usize,
    pub total_win: f64,
    pub capped: bool,
    pub free_spins_awarded: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinRecord {
    pub client_seed: String,
    pub nonce: u64,
    pub prev_spin_hash: String,
    pub spin_hash: String,
}

/// Chain published after the server seed is revealed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChainExport {
    pub server_seed: String,
    pub server_seed_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta_commitment: Option<String>,
    pub spins: Vec<SpinRecord>,
}

impl ChainExport {
    pub fn head(&self) -> Option<&str> {
        self.spins.last().map(|s| s.spin_hash.as_str())
    }
}

/// Pre-round commitment published before any client seed is accepted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommitmentNotice {
    pub ts: DateTime<Utc>,
    pub server_seed_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta_commitment: Option<String>,
    pub chain_root: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_export_without_theta_omits_the_field() {
        let export = ChainExport {
            server_seed: "s".into(),
            server_seed_hash: "h".into(),
            theta_commitment: None,
            spins: vec![SpinRecord {
                client_seed: "c".into(),
                nonce: 1,
                prev_spin_hash: "h".into(),
                spin_hash: "x".into(),
            }],
        };
        let json = serde_json::to_string(&export).unwrap();
        assert!(!json.contains("theta_commitment"));
        let back: ChainExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, export);
        assert_eq!(back.head(), Some("x"));
    }

    #[test]
    fn empty_chain_has_no_head() {
        let json = r#"{"server_seed":"s","server_seed_hash":"h","spins":[]}"#;
        let export: ChainExport = serde_json::from_str(json).unwrap();
        assert!(export.theta_commitment.is_none());
        assert_eq!(export.head(), None);
    }
}

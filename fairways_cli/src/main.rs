use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use fairways_core::{
    build_reel_set, chain_root, play_round, server_seed_hash, spin_hash, verify_chain,
    verify_round, ChainVerdict, Commitment, FairRng, GameConfig, GameMode, SecureRng,
    SeedMaterial, SpinLink,
};
use fairways_shared::{ChainExport, CommitmentNotice, RoundAudit};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fairways", about = "Operator and auditor CLI for the fairways engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Game config JSON, built-in defaults when absent
    #[arg(long, global = true, value_parser, env = "FAIRWAYS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Base,
    FreeSpins,
}

impl From<ModeArg> for GameMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Base => GameMode::Base,
            ModeArg::FreeSpins => GameMode::FreeSpins,
        }
    }
}

#[derive(clap::Args)]
struct SeedArgs {
    #[arg(long)]
    server_seed: String,
    #[arg(long)]
    client_seed: String,
    #[arg(long)]
    nonce: u64,
    /// Previous spin hash, or the chain root for the first round
    #[arg(long)]
    prev_spin_hash: String,
}

impl SeedArgs {
    fn material(&self) -> SeedMaterial {
        SeedMaterial::new(
            self.server_seed.as_str(),
            self.client_seed.as_str(),
            self.nonce,
            self.prev_spin_hash.as_str(),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a server seed and print its public commitment
    Commit {
        /// Theta commitment for dual-commitment chains
        #[arg(long)]
        theta: Option<String>,
    },
    /// Compute the spin hash of one round
    SpinHash {
        #[command(flatten)]
        seed: SeedArgs,
    },
    /// Derive reel positions for one round
    Positions {
        #[command(flatten)]
        seed: SeedArgs,
        #[arg(long, value_enum, default_value_t = ModeArg::Base)]
        mode: ModeArg,
    },
    /// Play one round and print its audit record
    Play {
        #[command(flatten)]
        seed: SeedArgs,
        #[arg(long, default_value_t = 1.0)]
        bet: f64,
        #[arg(long, value_enum, default_value_t = ModeArg::Base)]
        mode: ModeArg,
        /// Print the full outcome instead of the audit record
        #[arg(long)]
        full: bool,
    },
    /// Replay a round and compare against published positions and total
    VerifyRound {
        #[command(flatten)]
        seed: SeedArgs,
        #[arg(long, default_value_t = 1.0)]
        bet: f64,
        #[arg(long, value_enum, default_value_t = ModeArg::Base)]
        mode: ModeArg,
        #[arg(long, value_delimiter = ',', required = true)]
        positions: Vec<usize>,
        #[arg(long)]
        total: f64,
    },
    /// Verify an exported chain JSON file
    VerifyChain { path: PathBuf },
    /// Print strip lengths and checksums for a mode
    Strips {
        #[arg(long, value_enum, default_value_t = ModeArg::Base)]
        mode: ModeArg,
    },
    /// Estimate RTP with the fast non-cryptographic backend
    #[cfg(feature = "simulation")]
    Simulate {
        #[arg(long, default_value_t = 100_000)]
        spins: u64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = ModeArg::Base)]
        mode: ModeArg,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GameConfig> {
    let config = match path {
        Some(path) => GameConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Commit { theta } => {
            let server_seed = SecureRng::new().generate_server_seed()?;
            let ssh = server_seed_hash(&server_seed);
            let notice = CommitmentNotice {
                ts: Utc::now(),
                chain_root: chain_root(&ssh, theta.as_deref()),
                server_seed_hash: ssh,
                theta_commitment: theta,
            };
            info!(server_seed_hash = %notice.server_seed_hash, "minted server seed");
            // The seed goes to stderr so stdout carries only the public notice.
            eprintln!("server_seed={}", server_seed);
            println!("{}", serde_json::to_string_pretty(&notice)?);
        }
        Commands::SpinHash { seed } => {
            println!(
                "{}",
                spin_hash(&seed.prev_spin_hash, &seed.server_seed, &seed.client_seed, seed.nonce)
            );
        }
        Commands::Positions { seed, mode } => {
            let reels = build_reel_set(&config, mode.into())?;
            let rng = FairRng::new(&seed.material())?;
            let positions = rng.reel_positions(&reels.lengths())?;
            println!("{}", serde_json::to_string(&positions)?);
        }
        Commands::Play {
            seed,
            bet,
            mode,
            full,
        } => {
            let reels = build_reel_set(&config, mode.into())?;
            let material = seed.material();
            let outcome = play_round(&config, &reels, &material, bet)?;
            if full {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                let audit = RoundAudit {
                    ts: Utc::now(),
                    mode: outcome.mode.to_string(),
                    client_seed: material.client_seed.clone(),
                    nonce: material.nonce,
                    server_seed_hash: server_seed_hash(&material.server_seed),
                    prev_spin_hash: material.prev_spin_hash.clone(),
                    spin_hash: material.spin_hash(),
                    reel_positions: outcome.reel_positions.clone(),
                    strip_checksums: reels.checksums().into_iter().map(String::from).collect(),
                    bet,
                    cascades: outcome.cascades.len(),
                    total_win: outcome.total_win,
                    capped: outcome.capped,
                    free_spins_awarded: outcome.free_spins_awarded,
                };
                println!("{}", serde_json::to_string_pretty(&audit)?);
            }
        }
        Commands::VerifyRound {
            seed,
            bet,
            mode,
            positions,
            total,
        } => {
            let reels = build_reel_set(&config, mode.into())?;
            if verify_round(&config, &reels, &seed.material(), bet, &positions, total)? {
                println!("round verified");
            } else {
                bail!("round does not match the published positions or total");
            }
        }
        Commands::VerifyChain { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let export: ChainExport = serde_json::from_str(&raw)?;
            let commitment = Commitment::new(export.server_seed_hash.as_str());
            if !commitment.verify_server_seed(&export.server_seed) {
                bail!("server seed does not match the committed hash");
            }
            let links: Vec<SpinLink> = export
                .spins
                .iter()
                .map(|s| SpinLink {
                    client_seed: s.client_seed.clone(),
                    nonce: s.nonce,
                    prev_spin_hash: s.prev_spin_hash.clone(),
                    spin_hash: s.spin_hash.clone(),
                })
                .collect();
            let verdict = verify_chain(
                &export.server_seed,
                &export.server_seed_hash,
                export.theta_commitment.as_deref(),
                &links,
            );
            match verdict {
                ChainVerdict::Valid => println!("chain valid: {} spins", links.len()),
                ChainVerdict::ServerSeedMismatch => {
                    bail!("server seed does not match the committed hash")
                }
                ChainVerdict::BrokenLink { index } => bail!("chain broken at spin {}", index),
                ChainVerdict::HashMismatch { index } => {
                    bail!("spin hash mismatch at spin {}", index)
                }
            }
        }
        Commands::Strips { mode } => {
            let reels = build_reel_set(&config, mode.into())?;
            for (i, strip) in reels.strips.iter().enumerate() {
                println!("reel {} len={} checksum={}", i, strip.len(), strip.checksum);
            }
        }
        #[cfg(feature = "simulation")]
        Commands::Simulate { spins, seed, mode } => {
            let reels = build_reel_set(&config, mode.into())?;
            let report = fairways_core::sim::simulate_rtp(&config, &reels, spins, seed)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

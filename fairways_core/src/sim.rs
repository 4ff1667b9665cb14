use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::config::GameConfig;
use crate::engine::resolve_round;
use crate::error::{CoreError, CoreResult};
use crate::source::{rejection_threshold, RandomSource, MAX_REJECTION_ATTEMPTS};
use crate::strips::ReelSet;

// Fast non-cryptographic backend for RTP simulation.
//
// Compiled only with the `simulation` feature. `SimulationRng` does not
// implement `CryptoGrade`, so it cannot shuffle strips or mint seeds.

#[derive(Debug, Clone)]
pub struct SimulationRng(SmallRng);

impl SimulationRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

impl RandomSource for SimulationRng {
    fn int(&mut self, max: u64) -> CoreResult<u64> {
        if max == 0 {
            return Err(CoreError::InvalidMax);
        }
        let threshold = rejection_threshold(max);
        for _ in 0..MAX_REJECTION_ATTEMPTS {
            let v = self.0.next_u64();
            if v >= threshold {
                return Ok(v % max);
            }
        }
        Err(CoreError::RejectionExhausted {
            domain: "simulation".to_string(),
            attempts: MAX_REJECTION_ATTEMPTS,
        })
    }

    fn float64(&mut self) -> CoreResult<f64> {
        Ok((self.0.next_u64() >> 11) as f64 / (1u64 << 53) as f64)
    }

    fn fill_bytes(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        self.0.fill_bytes(buf);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RtpReport {
    pub spins: u64,
    pub total_bet: f64,
    pub total_win: f64,
    pub rtp: f64,
    pub hit_rate: f64,
    pub capped_rounds: u64,
    pub free_spin_triggers: u64,
    pub max_win: f64,
}

/// Plays `spins` rounds from uniformly drawn reel positions at bet 1.
pub fn simulate_rtp(
    config: &GameConfig,
    reels: &ReelSet,
    spins: u64,
    seed: u64,
) -> CoreResult<RtpReport> {
    let mut rng = SimulationRng::seed_from_u64(seed);
    let lengths = reels.lengths();
    let mut report = RtpReport {
        spins,
        ..RtpReport::default()
    };
    let mut hits = 0u64;
    for _ in 0..spins {
        let positions = lengths
            .iter()
            .map(|&len| rng.int(len as u64).map(|p| p as usize))
            .collect::<CoreResult<Vec<_>>>()?;
        let outcome = resolve_round(config, reels, &positions, 1.0)?;
        report.total_bet += 1.0;
        report.total_win += outcome.total_win;
        report.max_win = report.max_win.max(outcome.total_win);
        if outcome.total_win > 0.0 {
            hits += 1;
        }
        if outcome.capped {
            report.capped_rounds += 1;
        }
        if outcome.free_spins_awarded > 0 {
            report.free_spin_triggers += 1;
        }
    }
    if report.total_bet > 0.0 {
        report.rtp = report.total_win / report.total_bet;
        report.hit_rate = hits as f64 / spins as f64;
    }
    info!(spins, rtp = report.rtp, hit_rate = report.hit_rate, "simulation finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameMode;
    use crate::strips::build_reel_set;

    #[test]
    fn simulation_is_reproducible() {
        let config = GameConfig::default();
        let reels = build_reel_set(&config, GameMode::Base).unwrap();
        let a = simulate_rtp(&config, &reels, 200, 7).unwrap();
        let b = simulate_rtp(&config, &reels, 200, 7).unwrap();
        assert_eq!(a.total_win, b.total_win);
        assert!(a.rtp >= 0.0);
        assert!(a.hit_rate <= 1.0);
    }
}

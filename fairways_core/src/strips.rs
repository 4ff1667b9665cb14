use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{derive_hash_hex, server_seed_hash, SeedMaterial};
use crate::config::{GameConfig, GameMode, StripTable};
use crate::error::{CoreError, CoreResult};
use crate::source::CryptoGrade;
use crate::stream::StreamRng;
use crate::symbols::{Symbol, SymbolSet};

// Weighted reel strips: declarative rates -> integer weights -> shuffled strip.

/// Symbol -> integer weight for one reel of one mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReelWeights(pub BTreeMap<Symbol, u64>);

impl ReelWeights {
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn get(&self, symbol: &Symbol) -> u64 {
        self.0.get(symbol).copied().unwrap_or(0)
    }
}

/// Only interior reels carry gold variants.
pub fn supports_gold(reel_index: usize, reel_count: usize) -> bool {
    reel_index > 0 && reel_index + 1 < reel_count
}

fn percent_of(rate: f64, amount: u64) -> CoreResult<u64> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(CoreError::InvalidWeights(format!("rate {rate} must be a non-negative percentage")));
    }
    Ok((rate / 100.0 * amount as f64).round() as u64)
}

/// Integer weights for one reel, summing exactly to `table.strip_length`.
pub fn reel_weights(
    table: &StripTable,
    symbols: &SymbolSet,
    reel_index: usize,
    reel_count: usize,
) -> CoreResult<ReelWeights> {
    let rates = table.reels.get(reel_index).ok_or_else(|| {
        CoreError::InvalidWeights(format!("no rates for reel {reel_index}"))
    })?;
    let length = u64::from(table.strip_length);
    if length == 0 {
        return Err(CoreError::InvalidReelLength);
    }
    let bonus = percent_of(table.bonus_rate, length)?;
    if bonus > length {
        return Err(CoreError::InvalidWeights(format!("bonus rate {} exceeds the strip", table.bonus_rate)));
    }
    let remainder = length - bonus;
    let gold_reel = supports_gold(reel_index, reel_count);

    let mut weights = BTreeMap::new();
    weights.insert(symbols.bonus.clone(), bonus);
    for (symbol, &rate) in rates {
        if symbols.is_bonus(symbol) {
            continue;
        }
        let weight = percent_of(rate, remainder)?;
        if symbols.is_paying(symbol) {
            let gold = if gold_reel {
                percent_of(table.gold_rate, weight)?.min(weight)
            } else {
                0
            };
            weights.insert(symbol.clone(), weight - gold);
            weights.insert(symbol.gold(), gold);
        } else {
            weights.insert(symbol.clone(), weight);
        }
    }

    let total: u64 = weights.values().sum();
    if total != length {
        // Rounding drift lands on the heaviest plain entry.
        let drift = length as i64 - total as i64;
        if drift.unsigned_abs() > weights.len() as u64 {
            return Err(CoreError::InvalidWeights(format!(
                "reel {reel_index} rates sum to {total} of {length}"
            )));
        }
        let heaviest = weights
            .iter()
            .filter(|(s, _)| !s.is_gold() && !symbols.is_bonus(s))
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(s, _)| s.clone())
            .ok_or_else(|| CoreError::InvalidWeights(format!("reel {reel_index} has no symbols")))?;
        let entry = weights.entry(heaviest).or_insert(0);
        let adjusted = *entry as i64 + drift;
        if adjusted < 0 {
            return Err(CoreError::InvalidWeights(format!(
                "reel {reel_index} cannot absorb rounding drift {drift}"
            )));
        }
        *entry = adjusted as u64;
        debug!(reel_index, drift, "absorbed rounding drift");
    }
    Ok(ReelWeights(weights))
}

/// Weights for every reel of a mode. All reels share the same total.
pub fn mode_weights(config: &GameConfig, mode: GameMode) -> CoreResult<Vec<ReelWeights>> {
    let table = config.strips.for_mode(mode);
    let reel_count = config.grid.reels;
    if table.reels.len() != reel_count {
        return Err(CoreError::LengthMismatch {
            expected: reel_count,
            actual: table.reels.len(),
        });
    }
    let weights = (0..reel_count)
        .map(|i| reel_weights(table, &config.symbols, i, reel_count))
        .collect::<CoreResult<Vec<_>>>()?;
    if let Some(bad) = weights.iter().position(|w| w.total() != u64::from(table.strip_length)) {
        return Err(CoreError::InvalidWeights(format!("reel {bad} does not sum to the strip length")));
    }
    Ok(weights)
}

/// A materialized strip plus its integrity checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelStrip {
    pub symbols: Vec<Symbol>,
    pub checksum: String,
}

/// `hex(SHA256(json(sequence)))` over the compact JSON array of symbol ids.
pub fn strip_checksum(symbols: &[Symbol]) -> CoreResult<String> {
    let canonical = serde_json::to_string(symbols)?;
    Ok(derive_hash_hex(canonical.as_bytes()))
}

impl ReelStrip {
    pub fn new(symbols: Vec<Symbol>) -> CoreResult<Self> {
        if symbols.is_empty() {
            return Err(CoreError::InvalidReelLength);
        }
        let checksum = strip_checksum(&symbols)?;
        Ok(Self { symbols, checksum })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// `rows` symbols from `start` downwards, wrapping past the strip end.
    pub fn window(&self, start: usize, rows: usize) -> CoreResult<Vec<Symbol>> {
        let len = self.symbols.len();
        if len == 0 {
            return Err(CoreError::InvalidReelLength);
        }
        let start = start % len;
        Ok((0..rows)
            .map(|r| self.symbols[(start + r % len) % len].clone())
            .collect())
    }

    pub fn verify_checksum(&self) -> CoreResult<bool> {
        Ok(strip_checksum(&self.symbols)? == self.checksum)
    }
}

/// Expands weights in sorted symbol order, then shuffles.
pub fn materialize<R: CryptoGrade>(weights: &ReelWeights, rng: &mut R) -> CoreResult<ReelStrip> {
    let mut sequence = Vec::with_capacity(weights.total() as usize);
    for (symbol, &weight) in &weights.0 {
        sequence.extend(std::iter::repeat(symbol.clone()).take(weight as usize));
    }
    rng.shuffle(&mut sequence)?;
    ReelStrip::new(sequence)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelSet {
    pub mode: GameMode,
    pub strips: Vec<ReelStrip>,
}

impl ReelSet {
    pub fn lengths(&self) -> Vec<usize> {
        self.strips.iter().map(ReelStrip::len).collect()
    }

    pub fn checksums(&self) -> Vec<&str> {
        self.strips.iter().map(|s| s.checksum.as_str()).collect()
    }
}

/// Seed material the strips of `mode` are shuffled from. Public, so anyone can
/// rebuild the strips and compare checksums.
pub fn strip_seed_material(config: &GameConfig, mode: GameMode) -> SeedMaterial {
    SeedMaterial::new(
        config.strip_seed.clone(),
        format!("strips:{mode}"),
        0,
        server_seed_hash(&config.strip_seed),
    )
}

pub fn build_reel_set(config: &GameConfig, mode: GameMode) -> CoreResult<ReelSet> {
    let weights = mode_weights(config, mode)?;
    let mut rng = StreamRng::new(&strip_seed_material(config, mode))?;
    let strips = weights
        .iter()
        .map(|w| materialize(w, &mut rng))
        .collect::<CoreResult<Vec<_>>>()?;
    debug!(%mode, reels = strips.len(), "built reel set");
    Ok(ReelSet { mode, strips })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights_for(mode: GameMode, reel: usize) -> ReelWeights {
        let config = GameConfig::default();
        reel_weights(config.strips.for_mode(mode), &config.symbols, reel, config.grid.reels).unwrap()
    }

    #[test]
    fn outer_reel_weights() {
        let w = weights_for(GameMode::Base, 0);
        assert_eq!(w.total(), 200);
        assert_eq!(w.get(&Symbol::new("bonus")), 4);
        assert_eq!(w.get(&Symbol::new("fa")), 12);
        assert_eq!(w.get(&Symbol::new("ertiao")), 35);
        assert_eq!(w.0.get(&Symbol::new("fa_gold")), Some(&0));
        assert_eq!(w.get(&Symbol::new("wild")), 0);
    }

    #[test]
    fn interior_reels_split_gold() {
        let w = weights_for(GameMode::Base, 2);
        assert_eq!(w.total(), 200);
        // fa: round(6% of 196) = 12, gold round(10% of 12) = 1
        assert_eq!(w.get(&Symbol::new("fa_gold")), 1);
        assert_eq!(w.get(&Symbol::new("fa")), 11);
        assert_eq!(w.get(&Symbol::new("wild")), 8);
        assert!(!w.0.contains_key(&Symbol::new("wild_gold")));
    }

    #[test]
    fn every_mode_sums_to_strip_length() {
        let config = GameConfig::default();
        for mode in [GameMode::Base, GameMode::FreeSpins] {
            for w in mode_weights(&config, mode).unwrap() {
                assert_eq!(w.total(), 200);
            }
        }
    }

    #[test]
    fn drift_is_absorbed() {
        let mut config = GameConfig::default();
        config.strips.base.strip_length = 37;
        for w in mode_weights(&config, GameMode::Base).unwrap() {
            assert_eq!(w.total(), 37);
        }
    }

    #[test]
    fn wildly_wrong_rates_rejected() {
        let mut config = GameConfig::default();
        config.strips.base.reels[0].insert(Symbol::new("fa"), 60.0);
        assert!(matches!(
            mode_weights(&config, GameMode::Base),
            Err(CoreError::InvalidWeights(_))
        ));
        config.strips.base.reels[0].insert(Symbol::new("fa"), -1.0);
        assert!(mode_weights(&config, GameMode::Base).is_err());
    }

    #[test]
    fn materialized_strip_matches_weights() {
        let config = GameConfig::default();
        let set = build_reel_set(&config, GameMode::Base).unwrap();
        let weights = mode_weights(&config, GameMode::Base).unwrap();
        for (strip, w) in set.strips.iter().zip(&weights) {
            assert_eq!(strip.len(), 200);
            for (symbol, &count) in &w.0 {
                let seen = strip.symbols.iter().filter(|s| *s == symbol).count() as u64;
                assert_eq!(seen, count, "{symbol}");
            }
            assert!(strip.verify_checksum().unwrap());
        }
    }

    #[test]
    fn strips_are_reproducible() {
        let config = GameConfig::default();
        let a = build_reel_set(&config, GameMode::FreeSpins).unwrap();
        let b = build_reel_set(&config, GameMode::FreeSpins).unwrap();
        assert_eq!(a, b);
        let base = build_reel_set(&config, GameMode::Base).unwrap();
        assert_ne!(a.checksums(), base.checksums());
    }

    #[test]
    fn window_wraps_without_overflow() {
        let strip = ReelStrip::new(vec![Symbol::new("a"), Symbol::new("b"), Symbol::new("c")]).unwrap();
        assert_eq!(
            strip.window(2, 4).unwrap(),
            vec![Symbol::new("c"), Symbol::new("a"), Symbol::new("b"), Symbol::new("c")]
        );
        // usize::MAX % 3 == 0
        assert_eq!(
            strip.window(usize::MAX, 2).unwrap(),
            vec![Symbol::new("a"), Symbol::new("b")]
        );
    }

    #[test]
    fn checksum_is_sha256_of_compact_json() {
        let strip = ReelStrip::new(vec![Symbol::new("fa"), Symbol::new("wild")]).unwrap();
        assert_eq!(strip.checksum, derive_hash_hex(br#"["fa","wild"]"#));
        let mut tampered = strip.clone();
        tampered.symbols.swap(0, 1);
        assert!(!tampered.verify_checksum().unwrap());
    }
}

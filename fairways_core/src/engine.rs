use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chain::SeedMaterial;
use crate::config::{GameConfig, GameMode};
use crate::error::{CoreError, CoreResult};
use crate::grid::{Grid, Position};
use crate::hkdf::FairRng;
use crate::paytable::{calculate_cascade, total_spin_win, CascadeResult};
use crate::strips::ReelSet;
use crate::symbols::Symbol;
use crate::ways::find_ways_wins;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub mode: GameMode,
    pub bet: f64,
    pub reel_positions: Vec<usize>,
    pub cascades: Vec<CascadeResult>,
    pub final_grid: Grid,
    pub raw_total: f64,
    pub total_win: f64,
    pub capped: bool,
    pub bonus_count: usize,
    pub free_spins_awarded: u32,
    /// Set by `play_round`; `None` when resolved from raw positions.
    pub spin_hash: Option<String>,
    pub master_key_hex: Option<String>,
}

/// Per-reel strip cursor. The window on screen is `strip[cursor..cursor + rows]`.
struct ReelCursor {
    cursor: usize,
}

/// Removes winning cells, turns winning gold cells wild, drops survivors and
/// refills each reel from above by walking its strip backwards.
fn cascade_grid(
    grid: &Grid,
    reels: &ReelSet,
    cursors: &mut [ReelCursor],
    winning: &[Position],
    wild: &Symbol,
) -> CoreResult<Grid> {
    let mut next = grid.clone();
    for (reel, strip) in reels.strips.iter().enumerate() {
        let Some(column) = grid.reel(reel) else {
            continue;
        };
        let mut survivors = Vec::with_capacity(column.len());
        let mut removed = 0usize;
        for (row, cell) in column.iter().enumerate() {
            if winning.contains(&Position::new(reel, row)) {
                if cell.is_gold() {
                    survivors.push(wild.clone());
                } else {
                    removed += 1;
                }
            } else {
                survivors.push(cell.clone());
            }
        }
        if removed == 0 && survivors.as_slice() == column {
            continue;
        }
        let cursor = cursors.get_mut(reel).ok_or(CoreError::LengthMismatch {
            expected: reels.strips.len(),
            actual: reel,
        })?;
        cursor.cursor = (cursor.cursor + strip.len() - removed % strip.len()) % strip.len();
        let mut refilled = strip.window(cursor.cursor, removed)?;
        refilled.extend(survivors);
        next.replace_reel(reel, refilled);
    }
    Ok(next)
}

fn validate_bet(bet: f64) -> CoreResult<()> {
    if !bet.is_finite() || bet <= 0.0 {
        return Err(CoreError::InvalidBet(bet));
    }
    Ok(())
}

/// Resolves a round from known reel positions. Pure: same inputs, same outcome.
pub fn resolve_round(
    config: &GameConfig,
    reels: &ReelSet,
    positions: &[usize],
    bet: f64,
) -> CoreResult<RoundOutcome> {
    validate_bet(bet)?;
    let mode = reels.mode;
    let free = mode.is_free_spin();
    let rows = config.grid.win_rows();
    let mut grid = Grid::from_positions(reels, positions, config.grid.total_rows())?;
    let mut cursors: Vec<ReelCursor> = positions
        .iter()
        .map(|&cursor| ReelCursor { cursor })
        .collect();

    let mut cascades = Vec::new();
    loop {
        if cascades.len() as u32 >= config.max_cascades {
            warn!(max = config.max_cascades, "cascade limit reached");
            break;
        }
        let wins = find_ways_wins(&grid, rows.clone(), &config.symbols, &config.ways);
        let result = calculate_cascade(config, &grid, &wins, bet, cascades.len(), free);
        if result.wins.is_empty() {
            break;
        }
        let mut winning: Vec<Position> = result
            .wins
            .iter()
            .flat_map(|w| w.positions.iter().copied())
            .collect();
        winning.sort_unstable();
        winning.dedup();
        debug!(
            cascade = result.index,
            wins = result.wins.len(),
            total = result.total,
            "cascade resolved"
        );
        let next = cascade_grid(&grid, reels, &mut cursors, &winning, &config.symbols.wild)?;
        cascades.push(result);
        grid = next;
    }

    let total = total_spin_win(&cascades, bet, config.max_win_multiplier);
    let bonus_count = grid.count_in_rows(rows, |s| config.symbols.is_bonus(s));
    let free_spins_awarded = config.free_spins.award(bonus_count);
    info!(
        %mode,
        cascades = cascades.len(),
        total_win = total.capped,
        free_spins_awarded,
        "round resolved"
    );
    Ok(RoundOutcome {
        mode,
        bet,
        reel_positions: positions.to_vec(),
        cascades,
        final_grid: grid,
        raw_total: total.raw,
        total_win: total.capped,
        capped: total.was_capped,
        bonus_count,
        free_spins_awarded,
        spin_hash: None,
        master_key_hex: None,
    })
}

/// Derives the reel positions from `seed` and resolves the round.
pub fn play_round(
    config: &GameConfig,
    reels: &ReelSet,
    seed: &SeedMaterial,
    bet: f64,
) -> CoreResult<RoundOutcome> {
    validate_bet(bet)?;
    let rng = FairRng::new(seed)?;
    let positions = rng.reel_positions(&reels.lengths())?;
    let mut outcome = resolve_round(config, reels, &positions, bet)?;
    outcome.spin_hash = Some(seed.spin_hash());
    outcome.master_key_hex = Some(rng.master_key_hex());
    Ok(outcome)
}

/// Replays the round and checks the published positions and total.
pub fn verify_round(
    config: &GameConfig,
    reels: &ReelSet,
    seed: &SeedMaterial,
    bet: f64,
    claimed_positions: &[usize],
    claimed_total: f64,
) -> CoreResult<bool> {
    if claimed_positions.len() != reels.strips.len() {
        return Err(CoreError::LengthMismatch {
            expected: reels.strips.len(),
            actual: claimed_positions.len(),
        });
    }
    let replay = play_round(config, reels, seed, bet)?;
    Ok(replay.reel_positions == claimed_positions && replay.total_win == claimed_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strips::{build_reel_set, ReelStrip};

    fn strip(ids: &[&str]) -> ReelStrip {
        ReelStrip::new(ids.iter().map(|s| Symbol::new(*s)).collect()).unwrap()
    }

    fn small_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.grid.reels = 3;
        config.grid.buffer_rows = 1;
        config.grid.visible_rows = 2;
        config.grid.win_check_start_row = 1;
        config.grid.win_check_end_row = 2;
        config
    }

    #[test]
    fn cascade_pays_then_refills() {
        let config = small_config();
        // Window at position 0: rows [top, mid, low].
        let reels = ReelSet {
            mode: GameMode::Base,
            strips: vec![
                strip(&["a", "fa", "b", "c", "d", "e"]),
                strip(&["a", "fa", "b", "c", "d", "e"]),
                strip(&["a", "fa", "b", "c", "d", "e"]),
            ],
        };
        let outcome = resolve_round(&config, &reels, &[0, 0, 0], 20.0).unwrap();
        // fa x3, 1 way, pay 15 at x1, bet per way 1. "b" has no pay entry.
        assert_eq!(outcome.cascades[0].total, 15.0);
        // Refill pulls "e" from above the window; a/b never pay.
        assert_eq!(outcome.cascades.len(), 1);
        assert_eq!(
            outcome.final_grid.reel(0).unwrap(),
            &[Symbol::new("e"), Symbol::new("a"), Symbol::new("b")]
        );
        assert_eq!(outcome.total_win, 15.0);
        assert!(!outcome.capped);
    }

    #[test]
    fn gold_turns_wild_instead_of_dropping() {
        let config = small_config();
        let reels = ReelSet {
            mode: GameMode::Base,
            strips: vec![
                strip(&["x", "fa", "y", "q"]),
                strip(&["x", "fa_gold", "y", "q"]),
                strip(&["x", "fa", "z", "q"]),
            ],
        };
        let outcome = resolve_round(&config, &reels, &[0, 0, 0], 20.0).unwrap();
        let first = &outcome.cascades[0];
        assert_eq!(first.wins[0].gold_to_wild, vec![false, true, false]);
        let second_grid = outcome
            .cascades
            .get(1)
            .map(|c| c.grid.clone())
            .unwrap_or_else(|| outcome.final_grid.clone());
        assert_eq!(second_grid.reel(1).unwrap()[1], Symbol::new("wild"));
        assert_eq!(second_grid.reel(0).unwrap()[0], Symbol::new("q"));
    }

    #[test]
    fn rejects_bad_bets() {
        let config = GameConfig::default();
        let reels = build_reel_set(&config, GameMode::Base).unwrap();
        for bet in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resolve_round(&config, &reels, &[0; 5], bet),
                Err(CoreError::InvalidBet(_))
            ));
        }
    }

    #[test]
    fn out_of_range_positions_are_errors() {
        let config = GameConfig::default();
        let reels = build_reel_set(&config, GameMode::Base).unwrap();
        assert!(matches!(
            resolve_round(&config, &reels, &[250, 0, 0, 0, 0], 1.0),
            Err(CoreError::InvalidPosition { reel: 0, position: 250, length: 200 })
        ));
        assert!(matches!(
            resolve_round(&config, &reels, &[0, 0, 0, 0, usize::MAX], 1.0),
            Err(CoreError::InvalidPosition { reel: 4, .. })
        ));
        let outcome = resolve_round(&config, &reels, &[199, 0, 0, 0, 0], 1.0).unwrap();
        assert_eq!(outcome.reel_positions, vec![199, 0, 0, 0, 0]);
    }

    #[test]
    fn played_round_verifies() {
        let config = GameConfig::default();
        let reels = build_reel_set(&config, GameMode::Base).unwrap();
        let seed = SeedMaterial::new("server", "client", 4, "prev");
        let outcome = play_round(&config, &reels, &seed, 1.0).unwrap();
        assert_eq!(outcome.spin_hash, Some(seed.spin_hash()));
        assert_eq!(outcome.master_key_hex.as_deref().map(str::len), Some(64));
        assert!(verify_round(&config, &reels, &seed, 1.0, &outcome.reel_positions, outcome.total_win).unwrap());
        let mut moved = outcome.reel_positions.clone();
        moved[0] = (moved[0] + 1) % 200;
        assert!(!verify_round(&config, &reels, &seed, 1.0, &moved, outcome.total_win).unwrap());
        assert!(verify_round(&config, &reels, &seed, 1.0, &moved[..2], outcome.total_win).is_err());
    }

    #[test]
    fn bonus_symbols_award_free_spins() {
        let config = small_config();
        let reels = ReelSet {
            mode: GameMode::Base,
            strips: vec![
                strip(&["x", "bonus", "a"]),
                strip(&["x", "bonus", "b"]),
                strip(&["x", "bonus", "c"]),
            ],
        };
        let outcome = resolve_round(&config, &reels, &[0, 0, 0], 1.0).unwrap();
        assert!(outcome.cascades.is_empty());
        assert_eq!(outcome.bonus_count, 3);
        assert_eq!(outcome.free_spins_awarded, 12);
    }

    #[test]
    fn cascade_limit_stops_the_loop() {
        let mut config = small_config();
        config.max_cascades = 2;
        let reels = ReelSet {
            mode: GameMode::FreeSpins,
            strips: vec![strip(&["fa"; 3]), strip(&["fa"; 3]), strip(&["fa"; 3])],
        };
        let outcome = resolve_round(&config, &reels, &[0, 0, 0], 20.0).unwrap();
        assert_eq!(outcome.cascades.len(), 2);
        // 2 rows per reel -> 8 ways; 15 * 8 * (2 + 4) at 1 per way
        assert_eq!(outcome.raw_total, 720.0);
    }
}

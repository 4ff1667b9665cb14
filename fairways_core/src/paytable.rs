use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{CascadeLadders, GameConfig};
use crate::grid::{Grid, Position};
use crate::symbols::Symbol;
use crate::ways::SymbolWin;

/// Counts a paytable may define.
pub const PAY_COUNTS: std::ops::RangeInclusive<u8> = 3..=5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaytableEntry {
    pub symbol: Symbol,
    pub count: u8,
    pub payout_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paytable(pub Vec<PaytableEntry>);

impl Default for Paytable {
    fn default() -> Self {
        Self::standard()
    }
}

impl Paytable {
    pub fn standard() -> Self {
        let rows: [(&str, [f64; 3]); 8] = [
            ("fa", [15.0, 60.0, 100.0]),
            ("zhong", [10.0, 40.0, 80.0]),
            ("bai", [8.0, 20.0, 60.0]),
            ("bawan", [6.0, 15.0, 40.0]),
            ("wutong", [6.0, 15.0, 40.0]),
            ("wutiao", [4.0, 10.0, 20.0]),
            ("santong", [4.0, 10.0, 20.0]),
            ("ertiao", [2.0, 5.0, 10.0]),
        ];
        let mut entries = Vec::with_capacity(rows.len() * 3);
        for (symbol, pays) in rows {
            for (count, payout_multiplier) in PAY_COUNTS.zip(pays) {
                entries.push(PaytableEntry {
                    symbol: Symbol::new(symbol),
                    count,
                    payout_multiplier,
                });
            }
        }
        Self(entries)
    }

    /// `None` for unknown symbols or counts outside 3..=5. Gold variants pay as their base.
    pub fn multiplier(&self, symbol: &Symbol, count: usize) -> Option<f64> {
        let count = u8::try_from(count).ok().filter(|c| PAY_COUNTS.contains(c))?;
        let base = symbol.base();
        self.0
            .iter()
            .find(|e| e.symbol.as_str() == base && e.count == count)
            .map(|e| e.payout_multiplier)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = Vec::new();
        for entry in &self.0 {
            if !out.contains(&entry.symbol) {
                out.push(entry.symbol.clone());
            }
        }
        out
    }
}

pub fn cascade_multiplier(ladders: &CascadeLadders, cascade_index: usize, is_free_spin: bool) -> f64 {
    let ladder = if is_free_spin {
        &ladders.free_spins
    } else {
        &ladders.base
    };
    ladder
        .get(cascade_index)
        .or_else(|| ladder.last())
        .copied()
        .unwrap_or(1.0)
}

/// One symbol win priced for one cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeWinDetail {
    pub cascade_index: usize,
    pub symbol: Symbol,
    pub count: usize,
    pub ways: u64,
    /// Paytable multiplier for `symbol` x `count`.
    pub payout_multiplier: f64,
    pub cascade_multiplier: f64,
    pub win_amount: f64,
    pub positions: Vec<Position>,
    /// Parallel to `positions`: the cell is a gold variant and turns wild.
    pub gold_to_wild: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeResult {
    pub index: usize,
    pub multiplier: f64,
    pub grid: Grid,
    pub wins: Vec<CascadeWinDetail>,
    pub total: f64,
}

/// Prices the wins of one cascade. Wins the paytable does not cover are dropped.
pub fn calculate_cascade(
    config: &GameConfig,
    grid: &Grid,
    wins: &[SymbolWin],
    bet: f64,
    cascade_index: usize,
    is_free_spin: bool,
) -> CascadeResult {
    let multiplier = cascade_multiplier(&config.cascade, cascade_index, is_free_spin);
    let bet_per_way = bet / config.ways_denominator;
    let mut details = Vec::with_capacity(wins.len());
    for win in wins {
        let Some(payout_multiplier) = config.paytable.multiplier(&win.symbol, win.count) else {
            continue;
        };
        let win_amount = payout_multiplier * win.ways as f64 * multiplier * bet_per_way;
        let gold_to_wild = win
            .positions
            .iter()
            .map(|p| grid.cell(*p).is_some_and(Symbol::is_gold))
            .collect();
        details.push(CascadeWinDetail {
            cascade_index,
            symbol: win.symbol.clone(),
            count: win.count,
            ways: win.ways,
            payout_multiplier,
            cascade_multiplier: multiplier,
            win_amount,
            positions: win.positions.clone(),
            gold_to_wild,
        });
    }
    let total = details.iter().map(|d| d.win_amount).sum();
    CascadeResult {
        index: cascade_index,
        multiplier,
        grid: grid.clone(),
        wins: details,
        total,
    }
}

pub fn max_win(bet: f64, max_win_multiplier: f64) -> f64 {
    bet * max_win_multiplier
}

pub fn apply_max_win_cap(win_amount: f64, bet: f64, max_win_multiplier: f64) -> f64 {
    win_amount.min(max_win(bet, max_win_multiplier))
}

pub fn is_capped(win_amount: f64, bet: f64, max_win_multiplier: f64) -> bool {
    win_amount > max_win(bet, max_win_multiplier)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinTotal {
    pub raw: f64,
    pub capped: f64,
    pub was_capped: bool,
}

/// Sums every cascade first, then caps once.
pub fn total_spin_win(cascades: &[CascadeResult], bet: f64, max_win_multiplier: f64) -> SpinTotal {
    let raw: f64 = cascades.iter().map(|c| c.total).sum();
    let was_capped = is_capped(raw, bet, max_win_multiplier);
    if was_capped {
        warn!(raw, bet, "round win capped");
    }
    SpinTotal {
        raw,
        capped: apply_max_win_cap(raw, bet, max_win_multiplier),
        was_capped,
    }
}

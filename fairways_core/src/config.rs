use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::paytable::Paytable;
use crate::symbols::{Symbol, SymbolSet};

// Game configuration, built once at startup and passed by reference.
//
// Every section has a default, so a JSON file only needs the fields it
// overrides.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Base,
    FreeSpins,
}

impl GameMode {
    pub fn is_free_spin(self) -> bool {
        matches!(self, GameMode::FreeSpins)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Base => "base",
            GameMode::FreeSpins => "free_spins",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reels x rows. Row 0 is the top buffer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub reels: usize,
    pub buffer_rows: usize,
    pub visible_rows: usize,
    /// First row (inclusive) eligible for wins.
    pub win_check_start_row: usize,
    /// Last row (inclusive) eligible for wins.
    pub win_check_end_row: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            reels: 5,
            buffer_rows: 1,
            visible_rows: 4,
            win_check_start_row: 1,
            win_check_end_row: 4,
        }
    }
}

impl GridConfig {
    pub fn total_rows(&self) -> usize {
        self.buffer_rows + self.visible_rows
    }

    pub fn win_rows(&self) -> RangeInclusive<usize> {
        self.win_check_start_row..=self.win_check_end_row
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaysRules {
    pub min_count: usize,
    /// Defaults to the reel count.
    pub max_count: Option<usize>,
}

impl Default for WaysRules {
    fn default() -> Self {
        Self {
            min_count: 3,
            max_count: None,
        }
    }
}

/// Multiplier per cascade index; indices past the end reuse the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeLadders {
    pub base: Vec<f64>,
    pub free_spins: Vec<f64>,
}

impl Default for CascadeLadders {
    fn default() -> Self {
        Self {
            base: vec![1.0, 2.0, 3.0, 5.0],
            free_spins: vec![2.0, 4.0, 6.0, 10.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeSpinRules {
    pub trigger_count: usize,
    pub base_award: u32,
    pub extra_per_symbol: u32,
}

impl Default for FreeSpinRules {
    fn default() -> Self {
        Self {
            trigger_count: 3,
            base_award: 12,
            extra_per_symbol: 2,
        }
    }
}

impl FreeSpinRules {
    pub fn award(&self, bonus_count: usize) -> u32 {
        if bonus_count < self.trigger_count {
            return 0;
        }
        let extra = (bonus_count - self.trigger_count) as u32;
        self.base_award + self.extra_per_symbol * extra
    }
}

/// Declarative weights for one mode. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripTable {
    pub strip_length: u32,
    /// Share of the strip taken by the bonus symbol.
    pub bonus_rate: f64,
    /// Share of a paying symbol's weight moved to its gold variant (interior reels).
    pub gold_rate: f64,
    /// Per reel: symbol -> share of the non-bonus remainder.
    pub reels: Vec<BTreeMap<Symbol, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripTables {
    pub base: StripTable,
    pub free_spins: StripTable,
}

impl StripTables {
    pub fn for_mode(&self, mode: GameMode) -> &StripTable {
        match mode {
            GameMode::Base => &self.base,
            GameMode::FreeSpins => &self.free_spins,
        }
    }
}

fn rates(entries: &[(&str, f64)]) -> BTreeMap<Symbol, f64> {
    entries.iter().map(|(s, r)| (Symbol::new(*s), *r)).collect()
}

fn outer_reel() -> BTreeMap<Symbol, f64> {
    rates(&[
        ("fa", 6.0),
        ("zhong", 8.0),
        ("bai", 10.0),
        ("bawan", 12.0),
        ("wutong", 14.0),
        ("wutiao", 15.0),
        ("santong", 17.0),
        ("ertiao", 18.0),
    ])
}

fn interior_reel(wild: f64, ertiao: f64) -> BTreeMap<Symbol, f64> {
    rates(&[
        ("wild", wild),
        ("fa", 6.0),
        ("zhong", 8.0),
        ("bai", 10.0),
        ("bawan", 12.0),
        ("wutong", 13.0),
        ("wutiao", 14.0),
        ("santong", 16.0),
        ("ertiao", ertiao),
    ])
}

impl Default for StripTables {
    fn default() -> Self {
        let base_interior = interior_reel(4.0, 17.0);
        let free_interior = interior_reel(6.0, 15.0);
        Self {
            base: StripTable {
                strip_length: 200,
                bonus_rate: 2.0,
                gold_rate: 10.0,
                reels: vec![
                    outer_reel(),
                    base_interior.clone(),
                    base_interior.clone(),
                    base_interior,
                    outer_reel(),
                ],
            },
            free_spins: StripTable {
                strip_length: 200,
                bonus_rate: 1.5,
                gold_rate: 15.0,
                reels: vec![
                    outer_reel(),
                    free_interior.clone(),
                    free_interior.clone(),
                    free_interior,
                    outer_reel(),
                ],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub grid: GridConfig,
    pub symbols: SymbolSet,
    pub ways: WaysRules,
    pub paytable: Paytable,
    pub cascade: CascadeLadders,
    pub free_spins: FreeSpinRules,
    pub strips: StripTables,
    /// The game's declared ways count; bet per way = bet / denominator.
    pub ways_denominator: f64,
    /// Regulatory cap on a round's total win, in multiples of the bet.
    pub max_win_multiplier: f64,
    pub max_cascades: u32,
    /// Public seed the reel strips are shuffled from.
    pub strip_seed: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            symbols: SymbolSet::default(),
            ways: WaysRules::default(),
            paytable: Paytable::standard(),
            cascade: CascadeLadders::default(),
            free_spins: FreeSpinRules::default(),
            strips: StripTables::default(),
            ways_denominator: 20.0,
            max_win_multiplier: 25_000.0,
            max_cascades: 50,
            strip_seed: "fairways-strips-v1".to_string(),
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn max_ways_count(&self) -> usize {
        self.ways.max_count.unwrap_or(self.grid.reels)
    }

    pub fn validate(&self) -> CoreResult<()> {
        let grid = &self.grid;
        if grid.reels == 0 || grid.visible_rows == 0 {
            return Err(CoreError::Config("grid needs at least one reel and one visible row".into()));
        }
        if grid.win_check_start_row > grid.win_check_end_row
            || grid.win_check_end_row >= grid.total_rows()
        {
            return Err(CoreError::Config(format!(
                "win rows {}..={} outside a {}-row grid",
                grid.win_check_start_row,
                grid.win_check_end_row,
                grid.total_rows()
            )));
        }
        if self.ways.min_count == 0 || self.ways.min_count > self.max_ways_count() {
            return Err(CoreError::Config(format!(
                "ways count range {}..={} is empty",
                self.ways.min_count,
                self.max_ways_count()
            )));
        }
        if self.max_ways_count() > grid.reels {
            return Err(CoreError::Config("ways max count exceeds reel count".into()));
        }
        if self.cascade.base.is_empty() || self.cascade.free_spins.is_empty() {
            return Err(CoreError::Config("cascade ladders must not be empty".into()));
        }
        if self.max_cascades == 0 {
            return Err(CoreError::Config(
                "max cascades must allow at least one cascade".into(),
            ));
        }
        if !(self.ways_denominator > 0.0) || !(self.max_win_multiplier > 0.0) {
            return Err(CoreError::Config(
                "ways denominator and max win multiplier must be positive".into(),
            ));
        }
        for mode in [GameMode::Base, GameMode::FreeSpins] {
            let table = self.strips.for_mode(mode);
            if table.reels.len() != grid.reels {
                return Err(CoreError::Config(format!(
                    "{mode} strips define {} reels, grid has {}",
                    table.reels.len(),
                    grid.reels
                )));
            }
            if (table.strip_length as usize) < grid.total_rows() {
                return Err(CoreError::Config(format!(
                    "{mode} strip length {} is shorter than the grid",
                    table.strip_length
                )));
            }
        }
        Ok(())
    }
}

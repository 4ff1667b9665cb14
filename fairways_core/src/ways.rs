use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::config::WaysRules;
use crate::grid::{Grid, Position};
use crate::symbols::{Symbol, SymbolSet};

// Ways-to-win evaluation over the win rows of a grid.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolWin {
    /// Base symbol, gold suffix stripped.
    pub symbol: Symbol,
    /// Consecutive matching reels from reel 0.
    pub count: usize,
    /// Product of the per-reel match counts.
    pub ways: u64,
    /// Every matching cell across the run.
    pub positions: Vec<Position>,
}

/// Rows of `reel` within `rows` holding `target` (any skin) or a wild.
fn matching_rows(
    grid: &Grid,
    reel: usize,
    rows: &RangeInclusive<usize>,
    target: &str,
    symbols: &SymbolSet,
) -> Vec<Position> {
    let Some(column) = grid.reel(reel) else {
        return Vec::new();
    };
    column
        .iter()
        .enumerate()
        .filter(|(row, cell)| {
            rows.contains(row) && (cell.base() == target || symbols.is_wild(cell))
        })
        .map(|(row, _)| Position::new(reel, row))
        .collect()
}

pub fn find_ways_wins(
    grid: &Grid,
    rows: RangeInclusive<usize>,
    symbols: &SymbolSet,
    rules: &WaysRules,
) -> Vec<SymbolWin> {
    let max_count = rules.max_count.unwrap_or(grid.reels()).min(grid.reels());
    let Some(first_reel) = grid.reel(0) else {
        return Vec::new();
    };

    let mut targets: Vec<Symbol> = Vec::new();
    for (row, cell) in first_reel.iter().enumerate() {
        if rows.contains(&row) && symbols.is_paying(cell) {
            let base = cell.base_symbol();
            if !targets.contains(&base) {
                targets.push(base);
            }
        }
    }

    let mut wins = Vec::new();
    for target in targets {
        let mut count = 0usize;
        let mut ways = 1u64;
        let mut positions = Vec::new();
        for reel in 0..max_count {
            let matches = matching_rows(grid, reel, &rows, target.as_str(), symbols);
            if matches.is_empty() {
                break;
            }
            count += 1;
            ways = ways.saturating_mul(matches.len() as u64);
            positions.extend(matches);
        }
        if count >= rules.min_count {
            wins.push(SymbolWin {
                symbol: target,
                count,
                ways,
                positions,
            });
        }
    }
    wins
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(reels: &[&[&str]]) -> Grid {
        Grid::from_cells(
            reels
                .iter()
                .map(|reel| reel.iter().map(|s| Symbol::new(*s)).collect())
                .collect(),
        )
    }

    fn eval(g: &Grid) -> Vec<SymbolWin> {
        find_ways_wins(g, 1..=4, &SymbolSet::default(), &WaysRules::default())
    }

    #[test]
    fn two_rows_on_three_reels_is_eight_ways() {
        let g = grid(&[
            &["x", "s", "s", "a", "b"],
            &["x", "s", "c", "s", "d"],
            &["x", "e", "s", "f", "s"],
            &["x", "a", "b", "c", "d"],
            &["x", "s", "s", "s", "s"],
        ]);
        let wins = eval(&g);
        let s = wins.iter().find(|w| w.symbol.as_str() == "s").unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.ways, 8);
        assert_eq!(s.positions.len(), 6);
        assert!(!s.positions.iter().any(|p| p.reel == 4));
    }

    #[test]
    fn wild_substitutes_and_gold_matches_base() {
        let g = grid(&[
            &["x", "fa", "a", "b", "c"],
            &["x", "wild", "fa_gold", "b", "c"],
            &["x", "a", "b", "fa", "c"],
            &["x", "a", "b", "c", "d"],
            &["x", "a", "b", "c", "d"],
        ]);
        let wins = eval(&g);
        let fa = wins.iter().find(|w| w.symbol.as_str() == "fa").unwrap();
        assert_eq!(fa.count, 3);
        assert_eq!(fa.ways, 2);
        assert!(fa.positions.contains(&Position::new(1, 1)));
        assert!(fa.positions.contains(&Position::new(1, 2)));
    }

    #[test]
    fn buffer_row_is_ignored() {
        let g = grid(&[
            &["fa", "a", "b", "c", "d"],
            &["fa", "a", "b", "c", "d"],
            &["fa", "e", "b", "c", "d"],
            &["fa", "e", "b", "c", "d"],
            &["fa", "e", "b", "c", "d"],
        ]);
        let wins = eval(&g);
        assert!(wins.iter().all(|w| w.symbol.as_str() != "fa"));
        let b = wins.iter().find(|w| w.symbol.as_str() == "b").unwrap();
        assert_eq!((b.count, b.ways), (5, 1));
    }

    #[test]
    fn two_reels_is_not_a_win() {
        let g = grid(&[
            &["x", "fa", "a", "b", "c"],
            &["x", "fa", "d", "e", "g"],
            &["x", "h", "i", "j", "k"],
        ]);
        assert!(eval(&g).is_empty());
    }

    #[test]
    fn wild_never_pays_for_bonus_or_as_target() {
        let g = grid(&[
            &["x", "bonus", "wild", "bonus", "wild"],
            &["x", "wild", "bonus", "e", "g"],
            &["x", "bonus", "wild", "j", "k"],
        ]);
        assert!(eval(&g).is_empty());
    }

    #[test]
    fn max_count_truncates_the_run() {
        let g = grid(&[
            &["x", "fa"],
            &["x", "fa"],
            &["x", "fa"],
            &["x", "fa"],
        ]);
        let rules = WaysRules {
            min_count: 3,
            max_count: Some(3),
        };
        let wins = find_ways_wins(&g, 1..=1, &SymbolSet::default(), &rules);
        assert_eq!(wins[0].count, 3);
        assert_eq!(wins[0].positions.len(), 3);
    }

    #[test]
    fn targets_follow_first_reel_order() {
        let g = grid(&[
            &["x", "b", "a", "b_gold"],
            &["x", "a", "b", "x"],
            &["x", "a", "b", "x"],
        ]);
        let wins = find_ways_wins(&g, 1..=3, &SymbolSet::default(), &WaysRules::default());
        let order: Vec<&str> = wins.iter().map(|w| w.symbol.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(wins[0].ways, 2);
    }
}

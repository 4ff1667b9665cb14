use std::fmt;

use serde::{Deserialize, Serialize};

pub const GOLD_SUFFIX: &str = "_gold";

/// Symbol identifier as it appears on strips and grids, e.g. `"fa"` or `"fa_gold"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_gold(&self) -> bool {
        self.0.ends_with(GOLD_SUFFIX) && self.0.len() > GOLD_SUFFIX.len()
    }

    /// Gold is a skin: `fa_gold` and `fa` share the base `fa`.
    pub fn base(&self) -> &str {
        if self.is_gold() {
            &self.0[..self.0.len() - GOLD_SUFFIX.len()]
        } else {
            &self.0
        }
    }

    pub fn base_symbol(&self) -> Symbol {
        Symbol::new(self.base())
    }

    pub fn gold(&self) -> Symbol {
        Symbol(format!("{}{}", self.base(), GOLD_SUFFIX))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(id: &str) -> Self {
        Symbol::new(id)
    }
}

/// Symbol categories that never pay on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolSet {
    pub wild: Symbol,
    /// Scatter that triggers free spins. Wild never substitutes for it.
    pub bonus: Symbol,
    /// Other non-paying categories such as mystery symbols.
    pub non_paying: Vec<Symbol>,
}

impl Default for SymbolSet {
    fn default() -> Self {
        Self {
            wild: Symbol::new("wild"),
            bonus: Symbol::new("bonus"),
            non_paying: vec![Symbol::new("mystery")],
        }
    }
}

impl SymbolSet {
    pub fn is_wild(&self, symbol: &Symbol) -> bool {
        symbol.base() == self.wild.as_str()
    }

    pub fn is_bonus(&self, symbol: &Symbol) -> bool {
        symbol.base() == self.bonus.as_str()
    }

    pub fn is_paying(&self, symbol: &Symbol) -> bool {
        let base = symbol.base();
        base != self.wild.as_str()
            && base != self.bonus.as_str()
            && !self.non_paying.iter().any(|s| s.as_str() == base)
    }
}

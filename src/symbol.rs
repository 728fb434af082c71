use crate::fingerprint::OriginKey;
use indexmap::IndexSet;
use std::collections::HashMap;

const SEPARATOR: &str = "::";

/// Pull a `Left::Right` symbol out of a line: the last token before the first `::`
/// joined to the first token after it.
pub fn extract_symbol(line: &str) -> Option<String> {
    let (before, after) = line.split_once(SEPARATOR)?;
    let left = before.split_whitespace().last()?;
    // Only the text up to a second separator belongs to the right-hand side
    let right = after.split(SEPARATOR).next()?.split_whitespace().next()?;
    Some(format!("{}{}{}", left, SEPARATOR, right))
}

/// Symbols already reported, per origin.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    seen: HashMap<OriginKey, IndexSet<String>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `symbol` for `origin`. Returns `true` only the first time this
    /// exact pair is seen.
    pub fn record_if_new(&mut self, origin: &OriginKey, symbol: &str) -> bool {
        match self.seen.get_mut(origin) {
            Some(symbols) => symbols.insert(symbol.to_owned()),
            None => {
                self.seen.insert(origin.clone(), IndexSet::from([symbol.to_owned()]));
                true
            }
        }
    }

    pub fn symbols(&self, origin: &OriginKey) -> Option<&IndexSet<String>> {
        self.seen.get(origin)
    }

    /// Total number of distinct (origin, symbol) pairs.
    pub fn len(&self) -> usize {
        self.seen.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

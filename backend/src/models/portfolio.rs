//! Portfolio - insertion-ordered mapping from security code to holding
//!
//! Iteration order is the insertion order, which is what makes priority
//! ties deterministic: the allocator sorts by priority with a stable sort,
//! so securities inserted earlier win ties. A plain `HashMap` would not give
//! reproducible simulations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::holding::Holding;

/// One (code, holding) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    /// Security code, unique within a portfolio.
    pub code: String,

    #[serde(flatten)]
    pub holding: Holding,
}

/// Iteration direction over pledge priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityOrder {
    /// Highest priority first (pledging order).
    Descending,
    /// Lowest priority first (the `reverse_return_order` return direction).
    Ascending,
}

/// Insertion-ordered security→holding map.
///
/// Codes are unique; `insert` replaces an existing holding in place without
/// disturbing its position. Serialized as a plain array of entries so the
/// order survives the round trip.
///
/// # Example
///
/// ```
/// use collateral_simulator_core_rs::{Holding, Portfolio};
/// use rust_decimal::Decimal;
///
/// let mut portfolio = Portfolio::new();
/// portfolio.insert("8306.T", Holding::new(100, Decimal::from(10), false).with_priority(2));
/// portfolio.insert("4689.T", Holding::new(100, Decimal::from(5), false).with_priority(1));
///
/// assert_eq!(portfolio.total_value(), Decimal::from(1500));
/// assert_eq!(
///     portfolio.eligible_codes_by_priority(collateral_simulator_core_rs::PriorityOrder::Descending),
///     vec!["8306.T".to_string(), "4689.T".to_string()],
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portfolio {
    entries: Vec<PortfolioEntry>,
}

impl Portfolio {
    /// Create an empty portfolio.
    pub fn new() -> Self {
        Portfolio {
            entries: Vec::new(),
        }
    }

    /// Insert or replace the holding for `code`, keeping its position when
    /// it already exists.
    pub fn insert(&mut self, code: impl Into<String>, holding: Holding) {
        let code = code.into();
        match self.get_mut(&code) {
            Some(existing) => *existing = holding,
            None => self.entries.push(PortfolioEntry { code, holding }),
        }
    }

    /// Holding for `code`, if present.
    pub fn get(&self, code: &str) -> Option<&Holding> {
        self.entries
            .iter()
            .find(|e| e.code == code)
            .map(|e| &e.holding)
    }

    /// Mutable holding for `code`, if present.
    pub fn get_mut(&mut self, code: &str) -> Option<&mut Holding> {
        self.entries
            .iter_mut()
            .find(|e| e.code == code)
            .map(|e| &mut e.holding)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[PortfolioEntry] {
        &self.entries
    }

    /// Mutable (code, holding) pairs in insertion order. Codes stay fixed;
    /// only holdings may be rewritten (the valuator refreshes prices here).
    pub fn holdings_mut(&mut self) -> impl Iterator<Item = (&str, &mut Holding)> {
        self.entries
            .iter_mut()
            .map(|e| (e.code.as_str(), &mut e.holding))
    }

    /// Sum of `unit_price * quantity` over all holdings at their currently
    /// stored prices.
    pub fn total_value(&self) -> Decimal {
        self.entries
            .iter()
            .map(|e| e.holding.market_value())
            .sum()
    }

    /// Codes of collateral-eligible holdings ordered by priority.
    ///
    /// The sort is stable, so holdings with equal priority keep their
    /// insertion order in either direction.
    pub fn eligible_codes_by_priority(&self, order: PriorityOrder) -> Vec<String> {
        let mut ranked: Vec<(&str, u32)> = self
            .entries
            .iter()
            .filter_map(|e| e.holding.priority.map(|p| (e.code.as_str(), p)))
            .collect();
        match order {
            PriorityOrder::Descending => ranked.sort_by(|a, b| b.1.cmp(&a.1)),
            PriorityOrder::Ascending => ranked.sort_by(|a, b| a.1.cmp(&b.1)),
        }
        ranked.into_iter().map(|(code, _)| code.to_string()).collect()
    }

    /// Add `quantity` units of `code`, creating the entry from `like` (same
    /// price, FX flag, and priority) when it does not exist yet.
    pub fn credit(&mut self, code: &str, quantity: u64, like: &Holding) {
        match self.get_mut(code) {
            Some(holding) => holding.quantity += quantity,
            None => self.entries.push(PortfolioEntry {
                code: code.to_string(),
                holding: like.with_quantity(quantity),
            }),
        }
    }
}

impl FromIterator<(String, Holding)> for Portfolio {
    fn from_iter<I: IntoIterator<Item = (String, Holding)>>(iter: I) -> Self {
        let mut portfolio = Portfolio::new();
        for (code, holding) in iter {
            portfolio.insert(code, holding);
        }
        portfolio
    }
}

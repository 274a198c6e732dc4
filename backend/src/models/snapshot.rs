//! Daily snapshots and the append-only simulation log
//!
//! One `DailySnapshot` is recorded per processed date, day zero included.
//! Entries are deep copies taken after the date's processing and are never
//! mutated afterwards; downstream charting/export reads them as-is.
//!
//! # Critical Invariants
//!
//! - **Append-only**: entries are pushed in strictly ascending date order
//!   and never removed or rewritten
//! - **Self-contained**: every entry embeds full portfolio copies, so a log
//!   is inspectable without replaying the simulation
//! - **Fingerprintable**: the SHA-256 of the canonical JSON form is stable
//!   across runs of the same scenario (determinism check)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::holding::Party;
use super::portfolio::Portfolio;

/// Token-ledger state recorded by the floating/pegged strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Unit price used for this date's arithmetic (always 1 for pegged).
    pub unit_price: Decimal,

    /// Units held by the lender after the day's movement.
    pub lender_units: i64,

    /// Units held by the borrower after the day's movement.
    pub borrower_units: i64,

    /// Total supply after the day's movement.
    pub total_units: i64,

    /// Signed unit movement decided this date (positive toward the lender).
    pub unit_diff: i64,

    /// True when the borrower's shortfall was covered by an automatic cash
    /// deposit into the source portfolio.
    pub auto_deposited: bool,
}

impl TokenSnapshot {
    /// Value of the lender's units at this snapshot's unit price.
    pub fn lender_value(&self) -> Decimal {
        Decimal::from(self.lender_units) * self.unit_price
    }
}

/// Immutable record of one simulated date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    /// Valuation date this entry describes.
    pub date: NaiveDate,

    /// Reference (ST) portfolio total after revaluation.
    pub st_total_value: Decimal,

    /// Source (JCT) portfolio total after revaluation, measured before any
    /// movement or automatic deposit on this date.
    pub jct_total_value: Decimal,

    /// Coverage value the collateral must track: `st_total_value *
    /// lender_ratio / borrower_ratio`.
    pub required_collateral_value: Decimal,

    /// Value of the pledge after the day's movement (collateral portfolio
    /// total, or the lender's token value in token modes).
    pub collateral_total_value: Decimal,

    /// Source portfolio after the day's movement.
    pub source_portfolio: Portfolio,

    /// Pledged collateral after the day's movement (empty in token modes).
    pub collateral_portfolio: Portfolio,

    /// The day-zero collateral basket revalued at this entry's date, kept
    /// for comparing "what the original pledge would be worth today".
    pub initial_collateral_portfolio: Portfolio,

    /// False when the margin call was suppressed by the threshold rule.
    /// Day zero records true: the initial allocation is itself an executed
    /// adjustment.
    pub margin_call_executed: bool,

    /// True when part of the day's movement was minted rather than
    /// physically transferred.
    pub additional_issue: bool,

    /// Which side minted, when `additional_issue` is true.
    pub issued_by: Option<Party>,

    /// Token-ledger state, present only for the token-mode strategies.
    pub token: Option<TokenSnapshot>,
}

/// Append-only sequence of daily snapshots.
///
/// # Example
///
/// ```no_run
/// use collateral_simulator_core_rs::SimulationLog;
///
/// let log = SimulationLog::new();
/// assert!(log.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationLog {
    entries: Vec<DailySnapshot>,
}

impl SimulationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        SimulationLog {
            entries: Vec::new(),
        }
    }

    /// Append one finished date.
    pub fn append(&mut self, entry: DailySnapshot) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in date order.
    pub fn entries(&self) -> &[DailySnapshot] {
        &self.entries
    }

    /// Entry recorded for `date`, if that date has been processed.
    pub fn entry_for_date(&self, date: NaiveDate) -> Option<&DailySnapshot> {
        self.entries.iter().find(|e| e.date == date)
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&DailySnapshot> {
        self.entries.last()
    }

    /// Dates on which part of the movement was minted.
    pub fn issuance_dates(&self) -> Vec<NaiveDate> {
        self.entries
            .iter()
            .filter(|e| e.additional_issue)
            .map(|e| e.date)
            .collect()
    }

    /// Number of dates on which a margin call actually moved (or minted)
    /// anything, day zero included.
    pub fn executed_margin_calls(&self) -> usize {
        self.entries.iter().filter(|e| e.margin_call_executed).count()
    }

    /// SHA-256 over the canonical (sorted-key) JSON form of the log.
    ///
    /// Two runs of the same scenario against the same oracle produce the
    /// same fingerprint; any divergence in prices, movements, or flags
    /// changes it.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        let canonical = serde_json::to_string(&canonicalize(value))?;

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Recursively sort object keys so hashing is independent of map iteration
/// order.
fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    use std::collections::BTreeMap;

    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

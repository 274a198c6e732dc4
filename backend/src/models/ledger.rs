//! Token ledger for the floating/pegged strategies
//!
//! In the token modes the whole source basket is tokenized instead of moving
//! individual securities: the lender holds exactly the units that cover the
//! requirement, the borrower holds the rest of the supply, and margin calls
//! move units between the two balances.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::snapshot::TokenSnapshot;

/// Unit balances of a tokenized source basket.
///
/// Balances are `i64` so the initial split can surface a deficit (negative
/// borrower side) for the caller to reject; after a successful split every
/// mutation keeps both balances non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    pub lender_units: i64,
    pub borrower_units: i64,
    pub total_units: i64,
}

impl TokenLedger {
    /// Initial split at transaction start: the lender receives
    /// `ceil(required_value)` units of a supply worth `floor(source value)`
    /// units, and the borrower keeps the remainder.
    ///
    /// The remainder may come out negative when the source basket cannot
    /// cover the requirement; callers must treat that as insufficient
    /// collateral rather than proceed.
    pub fn split_initial(required_value: Decimal, source_total_value: Decimal) -> Self {
        let lender_units = required_value.ceil().to_i64().unwrap_or(i64::MAX);
        let total_units = source_total_value.floor().to_i64().unwrap_or(i64::MAX);
        TokenLedger {
            lender_units,
            borrower_units: total_units - lender_units,
            total_units,
        }
    }

    /// True when the initial split could not fund the borrower side.
    pub fn is_underfunded(&self) -> bool {
        self.borrower_units < 0
    }

    /// Value of the lender's balance at `unit_price`.
    pub fn lender_value(&self, unit_price: Decimal) -> Decimal {
        Decimal::from(self.lender_units) * unit_price
    }

    /// Log form of the current balances.
    pub fn snapshot(&self, unit_price: Decimal, unit_diff: i64, auto_deposited: bool) -> TokenSnapshot {
        TokenSnapshot {
            unit_price,
            lender_units: self.lender_units,
            borrower_units: self.borrower_units,
            total_units: self.total_units,
            unit_diff,
            auto_deposited,
        }
    }
}

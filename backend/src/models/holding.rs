//! Holding - a position in one security
//!
//! A holding carries the unit count, the latest observed unit price, an FX
//! flag for foreign-currency denomination, and an optional pledge priority.
//! Only holdings with a priority are eligible to be pledged as collateral;
//! everything else is valued but never moved.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position in a single security.
///
/// `unit_price` is refreshed in place by the portfolio valuator each
/// simulated date; constructors take the price observed so far (zero is fine
/// for never-valued holdings).
///
/// # Example
///
/// ```
/// use collateral_simulator_core_rs::Holding;
/// use rust_decimal::Decimal;
///
/// let h = Holding::new(100, Decimal::from(10), false).with_priority(2);
/// assert!(h.is_collateral_eligible());
/// assert_eq!(h.market_value(), Decimal::from(1000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Units held. Never negative; issuance is flagged in the log instead of
    /// driving a quantity below zero.
    pub quantity: u64,

    /// Latest observed unit price, in base currency after FX conversion.
    pub unit_price: Decimal,

    /// True when the security is denominated in a foreign currency and must
    /// be converted with the FX rate during revaluation.
    #[serde(default)]
    pub is_foreign_currency: bool,

    /// Pledge priority. Higher is pledged (and returned) first; `None` means
    /// the holding is not collateral-eligible.
    #[serde(default)]
    pub priority: Option<u32>,
}

impl Holding {
    /// Create a holding with no pledge priority.
    pub fn new(quantity: u64, unit_price: Decimal, is_foreign_currency: bool) -> Self {
        Holding {
            quantity,
            unit_price,
            is_foreign_currency,
            priority: None,
        }
    }

    /// Set the pledge priority (builder style).
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Current market value: `unit_price * quantity`.
    pub fn market_value(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Whether this holding may be pledged or returned by an allocator.
    pub fn is_collateral_eligible(&self) -> bool {
        self.priority.is_some()
    }

    /// Copy of this holding with a different quantity, used when quantity is
    /// carved out into another portfolio.
    pub fn with_quantity(&self, quantity: u64) -> Self {
        Holding {
            quantity,
            ..self.clone()
        }
    }
}

/// Which side of the transaction an issuance event is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// The side pledging collateral (adds when the requirement grows).
    Borrower,
    /// The side holding pledged collateral (returns when it shrinks).
    Lender,
}

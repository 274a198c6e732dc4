//! Collateral waterfall
//!
//! Moves value between two portfolios along the pledge-priority order. The
//! same walk is used for the initial carve-out from the source portfolio,
//! for topping collateral up on a margin call, and for returning excess
//! collateral (where only the iteration direction differs).
//!
//! # Critical Invariants
//!
//! - Units move in whole numbers only. The unit count for a final partial
//!   take is `ceil(remaining / price)`, so a covered target is always met or
//!   slightly exceeded, never undershot.
//! - A holding whose ceiling take would exceed its own quantity is passed
//!   over entirely rather than drained partially. The shortfall stays with
//!   the remaining holdings in priority order.
//! - Transfers conserve quantity per code: whatever leaves the giver is
//!   credited to the receiver at the giver's current price and metadata.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{Portfolio, PriorityOrder};

/// Whole units needed to cover `value` at `unit_price`, rounding up.
///
/// Zero when there is nothing to cover or no meaningful price to cover it
/// at; saturates at `u64::MAX` if the quotient leaves the u64 range.
pub fn units_needed(value: Decimal, unit_price: Decimal) -> u64 {
    if value <= Decimal::ZERO || unit_price <= Decimal::ZERO {
        return 0;
    }
    (value / unit_price).ceil().to_u64().unwrap_or(u64::MAX)
}

/// Walks `giver`'s collateral-eligible holdings in `order` and transfers
/// units to `receiver` until `target` value is covered or the giver is
/// exhausted. Returns the uncovered remainder (zero when fully covered).
///
/// Holdings without a pledge priority are invisible to the walk. Drained
/// holdings stay in the giver at quantity zero so their priority slot
/// survives for later rebalancing in the opposite direction.
pub fn waterfall_transfer(
    giver: &mut Portfolio,
    receiver: &mut Portfolio,
    target: Decimal,
    order: PriorityOrder,
) -> Decimal {
    let mut remaining = target;

    for code in giver.eligible_codes_by_priority(order) {
        if remaining <= Decimal::ZERO {
            break;
        }
        let holding = match giver.get(&code) {
            Some(holding) => holding.clone(),
            None => continue,
        };
        let value = holding.market_value();

        if value >= remaining {
            let needed = units_needed(remaining, holding.unit_price);
            if needed > holding.quantity {
                // Just-barely-insufficient position: the ceiling take would
                // overdraw it, so leave it untouched for the return leg and
                // let a lower-priority holding absorb the shortfall.
                continue;
            }
            receiver.credit(&code, needed, &holding);
            if let Some(remainder) = giver.get_mut(&code) {
                remainder.quantity -= needed;
            }
            remaining = Decimal::ZERO;
            break;
        }

        receiver.credit(&code, holding.quantity, &holding);
        if let Some(drained) = giver.get_mut(&code) {
            drained.quantity = 0;
        }
        remaining -= value;
    }

    remaining.max(Decimal::ZERO)
}

/// Carves the initial collateral portfolio out of `source`.
///
/// Returns the collateral portfolio and the uncovered remainder; a nonzero
/// remainder means the source cannot secure the loan and the transaction
/// must not be created.
pub fn allocate_initial(source: &mut Portfolio, required: Decimal) -> (Portfolio, Decimal) {
    let mut collateral = Portfolio::new();
    let uncovered =
        waterfall_transfer(source, &mut collateral, required, PriorityOrder::Descending);
    (collateral, uncovered)
}

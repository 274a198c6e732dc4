//! Daily portfolio revaluation
//!
//! Marks every holding of a portfolio to the oracle's closing price for a
//! given date and returns the portfolio's total market value.
//!
//! # Critical Invariants
//!
//! - Foreign-currency holdings are converted with the date's FX rate before
//!   anything else; the rate is fetched at most once per revaluation, and
//!   only if some holding actually needs it.
//! - Every stored unit price is floored to one decimal place after
//!   conversion. All downstream arithmetic (required value, unit counts,
//!   token splits) sees only floored prices.
//! - Quantities are never touched here. Revaluation changes prices, margin
//!   calls change quantities.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Portfolio;
use crate::oracle::{PriceError, PriceOracle};

/// Floors a price to one decimal place, the resolution all valuations are
/// carried at.
pub fn floor_to_tenth(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::ToZero)
}

/// Reprices every holding in `portfolio` at `date` and returns the summed
/// market value.
///
/// Holding prices are updated in place, so a portfolio revalued for day N
/// keeps those prices until the next call. Fails on the first holding whose
/// price (or required FX rate) the oracle cannot supply, leaving any earlier
/// holdings already repriced.
pub fn revalue(
    portfolio: &mut Portfolio,
    oracle: &dyn PriceOracle,
    date: NaiveDate,
) -> Result<Decimal, PriceError> {
    let mut fx: Option<Decimal> = None;
    let mut total = Decimal::ZERO;

    for (code, holding) in portfolio.holdings_mut() {
        let mut price = oracle.unit_price(code, date)?;
        if holding.is_foreign_currency {
            let rate = match fx {
                Some(rate) => rate,
                None => {
                    let rate = oracle.fx_rate(date)?;
                    fx = Some(rate);
                    rate
                }
            };
            price *= rate;
        }
        holding.unit_price = floor_to_tenth(price);
        total += holding.market_value();
    }

    Ok(total)
}

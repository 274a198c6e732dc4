//! Floating-value token strategy
//!
//! Tokenizes the whole source basket instead of pledging securities: the
//! supply is split at transaction start (one unit per yen of basket value),
//! and afterwards the unit price floats with the basket, recomputed every
//! date as `source_total / total_units` truncated to six decimal places.
//! Margin calls move whole units between the borrower and lender balances.
//!
//! When the borrower's balance cannot cover a call, the shortfall is
//! covered by minting fresh units against an automatic cash deposit into
//! the source basket, so the token never becomes under-backed.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Holding, Party, TokenLedger, TokenSnapshot};
use crate::oracle::CASH_CODE;
use crate::orchestrator::SimulationError;

use super::{DayContext, MarginCallOutcome, RebalanceStrategy, TransactionBooks};

/// Resolution of the floating unit price.
fn floor_to_millionth(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(6, RoundingStrategy::ToZero)
}

/// Signed whole-unit count covering `value` at `unit_price`, rounding
/// toward positive infinity (a negative value rounds toward zero).
/// A quotient outside the i64 range saturates at the bound on its own
/// side of zero.
fn signed_units(value: Decimal, unit_price: Decimal) -> i64 {
    let units = (value / unit_price).ceil();
    units.to_i64().unwrap_or(if units.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Tokenized source basket with a floating unit price.
#[derive(Debug, Clone)]
pub struct FloatingTokenStrategy {
    auto_deposit: bool,
    ledger: TokenLedger,
}

impl FloatingTokenStrategy {
    pub fn new(auto_deposit: bool) -> Self {
        FloatingTokenStrategy {
            auto_deposit,
            ledger: TokenLedger::default(),
        }
    }

    /// The date's unit price. Zero when the supply is empty, which the
    /// margin call treats as unresolvable.
    fn day_price(&self, ctx: &DayContext) -> Decimal {
        if self.ledger.total_units <= 0 {
            return Decimal::ZERO;
        }
        floor_to_millionth(ctx.source_total / Decimal::from(self.ledger.total_units))
    }
}

impl RebalanceStrategy for FloatingTokenStrategy {
    fn initialize(
        &mut self,
        _books: &mut TransactionBooks,
        ctx: &DayContext,
    ) -> Result<Option<TokenSnapshot>, SimulationError> {
        self.ledger = TokenLedger::split_initial(ctx.required, ctx.source_total);
        if self.ledger.is_underfunded() {
            return Err(SimulationError::InsufficientCollateral {
                shortfall: Decimal::from(-self.ledger.borrower_units),
            });
        }
        // Units are carved one-per-yen, so the opening price is 1.
        Ok(Some(self.ledger.snapshot(Decimal::ONE, 0, false)))
    }

    fn coverage_value(&self, _books: &TransactionBooks, ctx: &DayContext) -> Decimal {
        self.ledger.lender_value(self.day_price(ctx))
    }

    fn margin_call(
        &mut self,
        books: &mut TransactionBooks,
        ctx: &DayContext,
        diff: Decimal,
    ) -> Result<MarginCallOutcome, SimulationError> {
        let price = self.day_price(ctx);
        if price <= Decimal::ZERO {
            return Err(SimulationError::MarginCallUnresolved {
                date: ctx.date,
                shortfall: diff.abs(),
            });
        }

        let unit_diff = signed_units(diff, price);
        let shortage = unit_diff > 0 && unit_diff > self.ledger.borrower_units;

        if shortage {
            let minted = unit_diff - self.ledger.borrower_units;
            if !self.auto_deposit {
                return Err(SimulationError::MarginCallUnresolved {
                    date: ctx.date,
                    shortfall: Decimal::from(minted) * price,
                });
            }

            // Cover the gap with cash: the deposit lands in the source
            // basket (becoming token backing) and the matching units are
            // minted straight to the lender.
            let deposit = (Decimal::from(minted) * price).ceil();
            books.source.credit(
                CASH_CODE,
                deposit.to_u64().unwrap_or(u64::MAX),
                &Holding::new(0, Decimal::ONE, false),
            );
            self.ledger.total_units += minted;
            self.ledger.lender_units += unit_diff;
            self.ledger.borrower_units = 0;

            return Ok(MarginCallOutcome {
                issued_by: Some(Party::Borrower),
                token: Some(self.ledger.snapshot(price, unit_diff, true)),
            });
        }

        self.ledger.lender_units += unit_diff;
        self.ledger.borrower_units -= unit_diff;
        Ok(MarginCallOutcome {
            issued_by: None,
            token: Some(self.ledger.snapshot(price, unit_diff, false)),
        })
    }

    fn token_state(&self, ctx: &DayContext) -> Option<TokenSnapshot> {
        Some(self.ledger.snapshot(self.day_price(ctx), 0, false))
    }
}

//! Pegged-value token strategy
//!
//! Like the floating token, but the unit price is fixed at 1 yen forever.
//! Instead of letting the price drift with the source basket, the supply is
//! rebased every date: units are minted or burned on the borrower's balance
//! until `total_units` equals the basket's floored market value, keeping
//! one unit worth exactly one yen of backing.
//!
//! A deep burn can push the borrower's balance below zero between the
//! rebase and the margin call; the shortage path then settles the debt with
//! the automatic cash deposit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{Holding, Party, TokenLedger, TokenSnapshot};
use crate::oracle::CASH_CODE;
use crate::orchestrator::SimulationError;

use super::{DayContext, MarginCallOutcome, RebalanceStrategy, TransactionBooks};

/// Tokenized source basket pegged at 1 unit = 1 yen.
#[derive(Debug, Clone)]
pub struct PeggedTokenStrategy {
    auto_deposit: bool,
    ledger: TokenLedger,
}

impl PeggedTokenStrategy {
    pub fn new(auto_deposit: bool) -> Self {
        PeggedTokenStrategy {
            auto_deposit,
            ledger: TokenLedger::default(),
        }
    }
}

impl RebalanceStrategy for PeggedTokenStrategy {
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
        Ok(Some(self.ledger.snapshot(Decimal::ONE, 0, false)))
    }

    fn rebase(&mut self, ctx: &DayContext) {
        // Supply tracks the marked backing value; the delta is the
        // borrower's to absorb.
        let target = ctx.source_total.floor().to_i64().unwrap_or(i64::MAX);
        let change = target - self.ledger.total_units;
        self.ledger.total_units = target;
        self.ledger.borrower_units += change;
    }

    fn coverage_value(&self, _books: &TransactionBooks, _ctx: &DayContext) -> Decimal {
        self.ledger.lender_value(Decimal::ONE)
    }

    fn margin_call(
        &mut self,
        books: &mut TransactionBooks,
        ctx: &DayContext,
        diff: Decimal,
    ) -> Result<MarginCallOutcome, SimulationError> {
        let unit_diff = diff.ceil().to_i64().unwrap_or(i64::MAX);
        let shortage = unit_diff > 0 && unit_diff > self.ledger.borrower_units;

        if shortage {
            let minted = unit_diff - self.ledger.borrower_units;
            if !self.auto_deposit {
                return Err(SimulationError::MarginCallUnresolved {
                    date: ctx.date,
                    shortfall: Decimal::from(minted),
                });
            }

            // At the peg, one minted unit is one yen of deposit.
            books.source.credit(
                CASH_CODE,
                minted as u64,
                &Holding::new(0, Decimal::ONE, false),
            );
            self.ledger.total_units += minted;
            self.ledger.lender_units += unit_diff;
            self.ledger.borrower_units = 0;

            return Ok(MarginCallOutcome {
                issued_by: Some(Party::Borrower),
                token: Some(self.ledger.snapshot(Decimal::ONE, unit_diff, true)),
            });
        }

        self.ledger.lender_units += unit_diff;
        self.ledger.borrower_units -= unit_diff;
        Ok(MarginCallOutcome {
            issued_by: None,
            token: Some(self.ledger.snapshot(Decimal::ONE, unit_diff, false)),
        })
    }

    fn token_state(&self, _ctx: &DayContext) -> Option<TokenSnapshot> {
        Some(self.ledger.snapshot(Decimal::ONE, 0, false))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;

    fn ctx(required: Decimal, source_total: Decimal) -> DayContext {
        DayContext {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            reference_total: required,
            source_total,
            required,
        }
    }

    fn split(required: Decimal, source_total: Decimal) -> (PeggedTokenStrategy, TransactionBooks) {
        let mut strategy = PeggedTokenStrategy::new(true);
        let mut books = TransactionBooks::default();
        strategy
            .initialize(&mut books, &ctx(required, source_total))
            .unwrap();
        (strategy, books)
    }

    #[test]
    fn test_rebase_mints_to_the_borrower_when_backing_grows() {
        let (mut strategy, _) = split(dec!(900), dec!(1500));

        strategy.rebase(&ctx(dec!(900), dec!(1700.9)));

        assert_eq!(strategy.ledger.total_units, 1700);
        assert_eq!(strategy.ledger.borrower_units, 800);
        assert_eq!(strategy.ledger.lender_units, 900);
    }

    #[test]
    fn test_rebase_burn_can_overdraw_the_borrower() {
        let (mut strategy, _) = split(dec!(900), dec!(1500));

        strategy.rebase(&ctx(dec!(900), dec!(850)));

        assert_eq!(strategy.ledger.total_units, 850);
        assert_eq!(strategy.ledger.borrower_units, -50);
    }

    #[test]
    fn test_call_moves_the_ceiled_difference() {
        let (mut strategy, mut books) = split(dec!(900), dec!(1500));

        let outcome = strategy
            .margin_call(&mut books, &ctx(dec!(950.3), dec!(1500)), dec!(50.3))
            .unwrap();

        let token = outcome.token.unwrap();
        assert_eq!(token.unit_diff, 51);
        assert_eq!(token.lender_units, 951);
        assert_eq!(token.borrower_units, 549);
        assert_eq!(token.unit_price, dec!(1));
    }

    #[test]
    fn test_overdrawn_borrower_is_settled_by_the_deposit() {
        let (mut strategy, mut books) = split(dec!(900), dec!(1500));
        strategy.rebase(&ctx(dec!(940), dec!(850)));

        // The burn left the borrower at -50; covering a diff of 40 means
        // minting 90: the debt plus the day's call.
        let outcome = strategy
            .margin_call(&mut books, &ctx(dec!(940), dec!(850)), dec!(40))
            .unwrap();

        assert_eq!(outcome.issued_by, Some(Party::Borrower));
        let token = outcome.token.unwrap();
        assert!(token.auto_deposited);
        assert_eq!(token.lender_units, 940);
        assert_eq!(token.borrower_units, 0);
        assert_eq!(token.total_units, 940);
        assert_eq!(books.source.get(CASH_CODE).map(|h| h.quantity), Some(90));
    }

    #[test]
    fn test_shortage_without_auto_deposit_is_fatal() {
        let (_, mut books) = split(dec!(900), dec!(1500));
        let mut strict = PeggedTokenStrategy::new(false);
        strict.ledger = TokenLedger {
            lender_units: 900,
            borrower_units: 10,
            total_units: 910,
        };

        let err = strict
            .margin_call(&mut books, &ctx(dec!(950), dec!(910)), dec!(50))
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::MarginCallUnresolved { shortfall, .. } if shortfall == dec!(40)
        ));
    }
}

//! Multi-security strategy
//!
//! Closes the daily difference with the same waterfall the initial
//! allocation uses. Additional pledges always walk the source portfolio
//! from the highest priority down; returns walk the collateral book in a
//! configurable direction, so a transaction can choose whether the lender
//! gives back its least-preferred or most-preferred collateral first.

use rust_decimal::Decimal;

use crate::allocation::{allocate_initial, waterfall_transfer};
use crate::models::{Party, PriorityOrder, TokenSnapshot};
use crate::orchestrator::SimulationError;

use super::{DayContext, MarginCallOutcome, RebalanceStrategy, TransactionBooks};

/// Adjusts with as many securities as the waterfall needs.
#[derive(Debug, Clone)]
pub struct MultiSecurityStrategy {
    auto_deposit: bool,
    return_order: PriorityOrder,
}

impl MultiSecurityStrategy {
    pub fn new(auto_deposit: bool, reverse_return_order: bool) -> Self {
        MultiSecurityStrategy {
            auto_deposit,
            return_order: if reverse_return_order {
                PriorityOrder::Ascending
            } else {
                PriorityOrder::Descending
            },
        }
    }
}

impl RebalanceStrategy for MultiSecurityStrategy {
    fn initialize(
        &mut self,
        books: &mut TransactionBooks,
        ctx: &DayContext,
    ) -> Result<Option<TokenSnapshot>, SimulationError> {
        let (collateral, uncovered) = allocate_initial(&mut books.source, ctx.required);
        books.collateral = collateral;
        if uncovered > Decimal::ZERO {
            return Err(SimulationError::InsufficientCollateral {
                shortfall: uncovered,
            });
        }
        Ok(None)
    }

    fn coverage_value(&self, books: &TransactionBooks, _ctx: &DayContext) -> Decimal {
        books.collateral.total_value()
    }

    fn margin_call(
        &mut self,
        books: &mut TransactionBooks,
        ctx: &DayContext,
        diff: Decimal,
    ) -> Result<MarginCallOutcome, SimulationError> {
        let (uncovered, issuer) = if diff > Decimal::ZERO {
            let uncovered = waterfall_transfer(
                &mut books.source,
                &mut books.collateral,
                diff,
                PriorityOrder::Descending,
            );
            (uncovered, Party::Borrower)
        } else {
            let uncovered = waterfall_transfer(
                &mut books.collateral,
                &mut books.source,
                diff.abs(),
                self.return_order,
            );
            (uncovered, Party::Lender)
        };

        if uncovered > Decimal::ZERO {
            if !self.auto_deposit {
                return Err(SimulationError::MarginCallUnresolved {
                    date: ctx.date,
                    shortfall: uncovered,
                });
            }
            // Everything transferable has moved; the rest of the gap is
            // absorbed by issuance on the giving side.
            return Ok(MarginCallOutcome {
                issued_by: Some(issuer),
                token: None,
            });
        }

        Ok(MarginCallOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{Holding, Portfolio};

    fn ctx(required: Decimal) -> DayContext {
        DayContext {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            reference_total: required,
            source_total: dec!(0),
            required,
        }
    }

    fn initialized(
        required: Decimal,
        reverse_return_order: bool,
    ) -> (MultiSecurityStrategy, TransactionBooks) {
        let mut strategy = MultiSecurityStrategy::new(true, reverse_return_order);
        let source: Portfolio = [
            (
                "A".to_string(),
                Holding::new(100, dec!(10), false).with_priority(2),
            ),
            (
                "B".to_string(),
                Holding::new(100, dec!(5), false).with_priority(1),
            ),
        ]
        .into_iter()
        .collect();
        let mut books = TransactionBooks {
            source,
            collateral: Portfolio::new(),
        };
        strategy.initialize(&mut books, &ctx(required)).unwrap();
        (strategy, books)
    }

    #[test]
    fn test_pledge_cascades_over_priorities() {
        // Initial 900 takes 90 A; a further 150 drains A (100) then dips
        // into B for the remaining 50.
        let (mut strategy, mut books) = initialized(dec!(900), false);

        let outcome = strategy
            .margin_call(&mut books, &ctx(dec!(1050)), dec!(150))
            .unwrap();

        assert_eq!(outcome, MarginCallOutcome::default());
        assert_eq!(books.collateral.get("A").map(|h| h.quantity), Some(100));
        assert_eq!(books.collateral.get("B").map(|h| h.quantity), Some(10));
        assert_eq!(books.source.get("A").map(|h| h.quantity), Some(0));
        assert_eq!(books.source.get("B").map(|h| h.quantity), Some(90));
    }

    #[test]
    fn test_default_return_gives_back_high_priority_first() {
        let (mut strategy, mut books) = initialized(dec!(900), false);
        // Put some B into the pledge as well.
        strategy
            .margin_call(&mut books, &ctx(dec!(1050)), dec!(150))
            .unwrap();

        strategy
            .margin_call(&mut books, &ctx(dec!(950)), dec!(-100))
            .unwrap();

        // A (priority 2) is returned first: ceil(100 / 10) = 10 units.
        assert_eq!(books.collateral.get("A").map(|h| h.quantity), Some(90));
        assert_eq!(books.collateral.get("B").map(|h| h.quantity), Some(10));
        assert_eq!(books.source.get("A").map(|h| h.quantity), Some(10));
    }

    #[test]
    fn test_reverse_return_gives_back_low_priority_first() {
        let (mut strategy, mut books) = initialized(dec!(900), true);
        strategy
            .margin_call(&mut books, &ctx(dec!(1050)), dec!(150))
            .unwrap();

        strategy
            .margin_call(&mut books, &ctx(dec!(1000)), dec!(-50))
            .unwrap();

        // B (priority 1) is drained before touching A: all 10 B units
        // cover the 50 exactly.
        assert_eq!(books.collateral.get("A").map(|h| h.quantity), Some(100));
        assert_eq!(books.collateral.get("B").map(|h| h.quantity), Some(0));
        assert_eq!(books.source.get("B").map(|h| h.quantity), Some(100));
    }

    #[test]
    fn test_exhausted_pledge_flags_borrower_issuance() {
        let (mut strategy, mut books) = initialized(dec!(900), false);

        // Source holds 100 (A) + 500 (B) = 600 of movable value; ask for
        // more than that.
        let outcome = strategy
            .margin_call(&mut books, &ctx(dec!(1700)), dec!(800))
            .unwrap();

        assert_eq!(outcome.issued_by, Some(Party::Borrower));
        assert_eq!(books.source.get("A").map(|h| h.quantity), Some(0));
        assert_eq!(books.source.get("B").map(|h| h.quantity), Some(0));
        assert_eq!(books.collateral.get("B").map(|h| h.quantity), Some(100));
    }

    #[test]
    fn test_exhaustion_without_auto_deposit_is_fatal() {
        let (_, mut books) = initialized(dec!(900), false);
        let mut strict = MultiSecurityStrategy::new(false, false);

        let err = strict
            .margin_call(&mut books, &ctx(dec!(1700)), dec!(800))
            .unwrap_err();

        // 800 requested, 600 movable.
        assert!(matches!(
            err,
            SimulationError::MarginCallUnresolved { shortfall, .. } if shortfall == dec!(200)
        ));
    }
}

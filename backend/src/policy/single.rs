//! Single-security strategy
//!
//! Closes the whole daily difference with one instrument: the
//! highest-priority holding of the source portfolio. Pledging and returning
//! both use that security, so the collateral book never grows past the
//! securities the initial allocation selected plus this one.
//!
//! The adjustment security is re-picked every date rather than fixed at
//! construction; drained holdings keep their priority slot at quantity
//! zero, so in practice the pick is stable unless priorities differ.

use rust_decimal::Decimal;

use crate::allocation::{allocate_initial, units_needed};
use crate::models::{Holding, Party, Portfolio, PriorityOrder, TokenSnapshot};
use crate::orchestrator::SimulationError;

use super::{DayContext, MarginCallOutcome, RebalanceStrategy, TransactionBooks};

/// Adjusts with the top-priority source security only.
#[derive(Debug, Clone)]
pub struct SingleSecurityStrategy {
    auto_deposit: bool,
}

impl SingleSecurityStrategy {
    pub fn new(auto_deposit: bool) -> Self {
        SingleSecurityStrategy { auto_deposit }
    }
}

/// Highest-priority eligible holding of `portfolio`.
fn top_eligible(portfolio: &Portfolio) -> Option<(String, Holding)> {
    let code = portfolio
        .eligible_codes_by_priority(PriorityOrder::Descending)
        .into_iter()
        .next()?;
    let holding = portfolio.get(&code)?.clone();
    Some((code, holding))
}

impl RebalanceStrategy for SingleSecurityStrategy {
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
        let (code, template) = match top_eligible(&books.source) {
            Some(top) => top,
            None => {
                return Err(SimulationError::MarginCallUnresolved {
                    date: ctx.date,
                    shortfall: diff.abs(),
                })
            }
        };

        // A zero-priced pick cannot quantify the move in units, and issued
        // units of it would carry no value.
        if template.unit_price <= Decimal::ZERO {
            return Err(SimulationError::MarginCallUnresolved {
                date: ctx.date,
                shortfall: diff.abs(),
            });
        }

        if diff > Decimal::ZERO {
            // Pledge more: source -> collateral.
            let needed = units_needed(diff, template.unit_price);
            let available = template.quantity;

            if needed <= available {
                books.collateral.credit(&code, needed, &template);
                if let Some(source) = books.source.get_mut(&code) {
                    source.quantity -= needed;
                }
                return Ok(MarginCallOutcome::default());
            }

            if !self.auto_deposit {
                return Err(SimulationError::MarginCallUnresolved {
                    date: ctx.date,
                    shortfall: Decimal::from(needed - available) * template.unit_price,
                });
            }

            // The pledge is credited in full; units beyond the source's
            // balance are freshly issued by the borrower.
            books.collateral.credit(&code, needed, &template);
            if let Some(source) = books.source.get_mut(&code) {
                source.quantity = 0;
            }
            return Ok(MarginCallOutcome {
                issued_by: Some(Party::Borrower),
                token: None,
            });
        }

        // Return excess: collateral -> source.
        let excess = diff.abs();
        let needed = units_needed(excess, template.unit_price);
        let held = books
            .collateral
            .get(&code)
            .map(|holding| holding.quantity)
            .unwrap_or(0);

        if needed <= held {
            books.source.credit(&code, needed, &template);
            if let Some(collateral) = books.collateral.get_mut(&code) {
                collateral.quantity -= needed;
            }
            return Ok(MarginCallOutcome::default());
        }

        if !self.auto_deposit {
            return Err(SimulationError::MarginCallUnresolved {
                date: ctx.date,
                shortfall: Decimal::from(needed - held) * template.unit_price,
            });
        }

        books.source.credit(&code, needed, &template);
        if let Some(collateral) = books.collateral.get_mut(&code) {
            collateral.quantity = 0;
        }
        Ok(MarginCallOutcome {
            issued_by: Some(Party::Lender),
            token: None,
        })
    }
}

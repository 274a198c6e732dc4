//! Rebalancing Strategy Module
//!
//! This module defines the strategy interface for the daily collateral
//! adjustment decision: once the engine has revalued all portfolios and
//! measured the gap between required and pledged value, a strategy decides
//! **what actually moves** to close it.
//!
//! # Overview
//!
//! All four shipped strategies share the engine's daily plumbing (pricing,
//! the required-value formula, threshold suppression, logging) and differ
//! only in the instrument they adjust:
//!
//! 1. **SingleSecurity**: moves one security, the highest-priority holding
//!    of the source portfolio, in both directions
//! 2. **MultiSecurity**: runs the allocation waterfall over all eligible
//!    holdings, with a configurable return direction
//! 3. **FloatingToken**: tokenizes the source basket; units float with the
//!    basket's marked value
//! 4. **PeggedToken**: tokenizes at a fixed unit value of 1, rebasing supply
//!    to the basket's marked value every date
//!
//! # Strategy Interface
//!
//! All strategies implement the `RebalanceStrategy` trait:
//! ```rust
//! use collateral_simulator_core_rs::policy::{
//!     DayContext, MarginCallOutcome, RebalanceStrategy, TransactionBooks,
//! };
//! use collateral_simulator_core_rs::{SimulationError, TokenSnapshot};
//! use rust_decimal::Decimal;
//!
//! struct DoNothing;
//!
//! impl RebalanceStrategy for DoNothing {
//!     fn initialize(
//!         &mut self,
//!         _books: &mut TransactionBooks,
//!         _ctx: &DayContext,
//!     ) -> Result<Option<TokenSnapshot>, SimulationError> {
//!         Ok(None)
//!     }
//!
//!     fn coverage_value(&self, _books: &TransactionBooks, ctx: &DayContext) -> Decimal {
//!         ctx.required // always claims perfect coverage
//!     }
//!
//!     fn margin_call(
//!         &mut self,
//!         _books: &mut TransactionBooks,
//!         _ctx: &DayContext,
//!         _diff: Decimal,
//!     ) -> Result<MarginCallOutcome, SimulationError> {
//!         Ok(MarginCallOutcome::default())
//!     }
//! }
//! ```
//!
//! Strategies are selected at transaction construction via the
//! `StrategyKind` field of the configuration; see the orchestrator module.
//!
//! # Shortfall Handling
//!
//! Every strategy obeys the same contract when a movement cannot be fully
//! satisfied from available quantity: with `auto_deposit` enabled the gap is
//! minted (securities modes) or covered by a cash deposit (token modes) and
//! the day is flagged as an additional issue; with it disabled the strategy
//! fails the simulation with `MarginCallUnresolved`.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Party, Portfolio, TokenSnapshot};
use crate::orchestrator::SimulationError;

pub mod floating;
pub mod multi;
pub mod pegged;
pub mod single;

pub use floating::FloatingTokenStrategy;
pub use multi::MultiSecurityStrategy;
pub use pegged::PeggedTokenStrategy;
pub use single::SingleSecurityStrategy;

/// The two security books a strategy may rearrange: the borrower's source
/// pool and the slice of it currently pledged to the lender.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionBooks {
    pub source: Portfolio,
    pub collateral: Portfolio,
}

/// Everything already measured for one simulated date before the strategy
/// is consulted. All values are post-revaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayContext {
    /// Date being processed.
    pub date: NaiveDate,

    /// Reference (lent-out) portfolio total.
    pub reference_total: Decimal,

    /// Source portfolio total, before any movement on this date.
    pub source_total: Decimal,

    /// Collateral value the pledge must reach:
    /// `reference_total * lender_loan_ratio / borrower_loan_ratio`.
    pub required: Decimal,
}

/// What an executed margin call did beyond moving quantities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarginCallOutcome {
    /// Side that minted value when the movement could not be covered by
    /// physical transfer; `None` for an ordinary fully-covered movement.
    pub issued_by: Option<Party>,

    /// Token balances after the movement, for the token strategies.
    pub token: Option<TokenSnapshot>,
}

/// Daily collateral adjustment behavior, selected per transaction.
///
/// The engine calls `initialize` exactly once (transaction start date),
/// then for every later date in order: `rebase`, `coverage_value`, and,
/// unless the day's difference is suppressed by the threshold rule, one
/// `margin_call`.
pub trait RebalanceStrategy: Send + Sync {
    /// Set up the initial pledge: carve the collateral book out of the
    /// source, or split the token supply. Returns the opening token
    /// balances for the token strategies.
    fn initialize(
        &mut self,
        books: &mut TransactionBooks,
        ctx: &DayContext,
    ) -> Result<Option<TokenSnapshot>, SimulationError>;

    /// Adjust internal supply to the day's valuations before coverage is
    /// measured. Only the pegged token does anything here.
    fn rebase(&mut self, _ctx: &DayContext) {}

    /// Value currently credited to the lender, compared against
    /// `ctx.required` to decide the day's difference.
    fn coverage_value(&self, books: &TransactionBooks, ctx: &DayContext) -> Decimal;

    /// Close the day's difference. `diff` is `required - coverage`:
    /// positive means the lender is under-collateralized and value flows
    /// from source to pledge, negative means excess flows back.
    fn margin_call(
        &mut self,
        books: &mut TransactionBooks,
        ctx: &DayContext,
        diff: Decimal,
    ) -> Result<MarginCallOutcome, SimulationError>;

    /// Token balances to record on a suppressed day. Securities strategies
    /// have no token state and keep the default.
    fn token_state(&self, _ctx: &DayContext) -> Option<TokenSnapshot> {
        None
    }
}

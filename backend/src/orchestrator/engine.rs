//! Simulation Engine
//!
//! Drives one collateralized lending transaction through its date range:
//! - Portfolio revaluation (reference, source, collateral)
//! - Required-value computation (loan-ratio formula)
//! - Threshold suppression of immaterial differences
//! - Strategy dispatch (what actually moves)
//! - Daily logging (complete simulation history)
//!
//! # Architecture
//!
//! The engine runs the same loop for every strategy:
//!
//! ```text
//! For each date d in (start_date, end_date):
//! 1. Revalue the reference portfolio -> required value
//! 2. Revalue the source and collateral portfolios
//! 3. Rebase token supply (pegged strategy only)
//! 4. Measure coverage and the difference to the requirement
//! 5. Suppress the call if |diff| < required * threshold
//! 6. Otherwise let the strategy execute the margin call
//! 7. Revalue the day-zero pledge for reporting
//! 8. Append the daily snapshot to the log
//! ```
//!
//! Day zero (the start date) is processed inside `new`: the initial
//! allocation or token split happens there and is logged as an executed
//! adjustment, so the first `rebalance` call is for the following date.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use collateral_simulator_core_rs::oracle::FixedPriceOracle;
//! use collateral_simulator_core_rs::orchestrator::{
//!     LendingTransaction, StrategyKind, TransactionConfig,
//! };
//!
//! let config = TransactionConfig {
//!     borrower: "Borrower(A)".to_string(),
//!     lender: "Lender(B)".to_string(),
//!     strategy: StrategyKind::MultiSecurity,
//!     source_portfolio: source,
//!     reference_portfolio: reference,
//!     start_date: "2024-04-01".parse().unwrap(),
//!     end_date: "2024-04-30".parse().unwrap(),
//!     borrower_loan_ratio: Decimal::ONE,
//!     lender_loan_ratio: Decimal::ONE,
//!     margin_call_threshold: Decimal::ZERO,
//!     auto_deposit: true,
//!     reverse_return_order: false,
//! };
//!
//! let mut transaction =
//!     LendingTransaction::new(config, Arc::new(FixedPriceOracle::default()))?;
//! transaction.run()?;
//! println!(
//!     "{} executed margin calls, fingerprint {}",
//!     transaction.log().executed_margin_calls(),
//!     transaction.log().fingerprint()?,
//! );
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::calendar::{is_final_valuation_date, DateRange};
use crate::models::{DailySnapshot, Portfolio, PriorityOrder, SimulationLog};
use crate::oracle::{PriceError, PriceOracle, PriceTable};
use crate::policy::{
    DayContext, FloatingTokenStrategy, MarginCallOutcome, MultiSecurityStrategy,
    PeggedTokenStrategy, RebalanceStrategy, SingleSecurityStrategy, TransactionBooks,
};
use crate::valuation::revalue;

// ============================================================================
// Configuration Types
// ============================================================================

/// Rebalancing strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Move one security (the top-priority source holding) both ways.
    SingleSecurity,

    /// Run the allocation waterfall over all eligible holdings.
    MultiSecurity,

    /// Tokenize the source basket; the unit price floats with its value.
    FloatingToken,

    /// Tokenize the source basket at a fixed unit price of 1.
    PeggedToken,
}

/// Complete configuration of one lending transaction.
///
/// The transaction clones the two portfolios at construction, so the
/// caller's `TransactionConfig` is never mutated by the simulation and can
/// be reused to build further runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Borrower identifier (pledges collateral).
    pub borrower: String,

    /// Lender identifier (lends the reference securities).
    pub lender: String,

    /// Which strategy closes the daily difference.
    pub strategy: StrategyKind,

    /// The borrower's pool of securities to pledge from.
    pub source_portfolio: Portfolio,

    /// The lent-out securities whose value must stay covered.
    pub reference_portfolio: Portfolio,

    /// First simulated date; day-zero allocation happens here.
    pub start_date: NaiveDate,

    /// End of the simulated range. The last processed date is the day
    /// before; the securities are assumed returned on `end_date` itself.
    pub end_date: NaiveDate,

    /// Borrower-side haircut divisor of the required-value formula.
    #[serde(default = "default_loan_ratio")]
    pub borrower_loan_ratio: Decimal,

    /// Lender-side haircut multiplier of the required-value formula.
    #[serde(default = "default_loan_ratio")]
    pub lender_loan_ratio: Decimal,

    /// Suppress the day's margin call when `|diff|` stays under this
    /// fraction of the required value. Zero (the default) executes daily.
    #[serde(default)]
    pub margin_call_threshold: Decimal,

    /// Allow issuance/cash-deposit fallbacks when a movement cannot be
    /// covered from available quantity. Disabled, such a day fails the
    /// simulation instead.
    #[serde(default = "default_auto_deposit")]
    pub auto_deposit: bool,

    /// Return excess collateral lowest-priority-first instead of
    /// highest-priority-first (multi-security strategy only).
    #[serde(default)]
    pub reverse_return_order: bool,
}

fn default_loan_ratio() -> Decimal {
    Decimal::ONE
}

fn default_auto_deposit() -> bool {
    true
}

/// On-disk scenario: a batch of independent transactions plus the market
/// data they are priced against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub transactions: Vec<TransactionConfig>,

    #[serde(default)]
    pub market_data: PriceTable,
}

// ============================================================================
// Lifecycle & Errors
// ============================================================================

/// Why a transaction moved to `TransactionPhase::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A shortfall could not be covered and `auto_deposit` was disabled.
    MarginCallUnresolved,

    /// The oracle had no price or FX rate for a simulated date.
    PriceUnavailable,
}

/// Lifecycle phase of a transaction.
///
/// `Created` (day zero logged) moves to `Active` on the first successful
/// `rebalance`, then to `Completed` once the final valuation date is
/// processed. A failed rebalance moves to `Failed` and freezes the
/// transaction; the log keeps everything appended before the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPhase {
    Created,
    Active,
    Completed,
    Failed { reason: FailureReason },
}

/// Simulation error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// Configuration validation error
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The initial allocation or token split could not cover the
    /// requirement; the transaction was never created.
    #[error("initial collateral is insufficient ({shortfall} short)")]
    InsufficientCollateral { shortfall: Decimal },

    /// A rebalance shortfall with the issuance fallback disabled.
    #[error("margin call on {date} left {shortfall} uncovered")]
    MarginCallUnresolved { date: NaiveDate, shortfall: Decimal },

    /// `rebalance` called out of order, past the end date, or on a
    /// finished transaction.
    #[error("{date} is not processable for this transaction")]
    DateOutOfRange { date: NaiveDate },

    /// Market data lookup failure.
    #[error(transparent)]
    Price(#[from] PriceError),
}

// ============================================================================
// Transaction
// ============================================================================

/// One collateralized lending transaction simulated over a date range.
///
/// Owns private copies of all three portfolios (source, reference, and the
/// derived collateral book), the strategy instance, and the append-only
/// log. Independent transactions share nothing but the oracle, which is
/// read-only, so they may be simulated on separate threads.
pub struct LendingTransaction {
    id: Uuid,
    config: TransactionConfig,
    oracle: Arc<dyn PriceOracle>,
    strategy: Box<dyn RebalanceStrategy>,
    books: TransactionBooks,
    reference: Portfolio,
    initial_collateral: Portfolio,
    log: SimulationLog,
    phase: TransactionPhase,
    last_processed: NaiveDate,
}

impl std::fmt::Debug for LendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LendingTransaction")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("last_processed", &self.last_processed)
            .finish_non_exhaustive()
    }
}

impl LendingTransaction {
    /// Create the transaction and process day zero: revalue everything at
    /// `start_date`, run the strategy's initial allocation or token split,
    /// and log the opening entry.
    ///
    /// Fails with `InvalidConfig` on nonsensical parameters and with
    /// `InsufficientCollateral` when the source cannot secure the loan; in
    /// both cases nothing is created.
    pub fn new(
        config: TransactionConfig,
        oracle: Arc<dyn PriceOracle>,
    ) -> Result<Self, SimulationError> {
        validate(&config)?;

        let mut books = TransactionBooks {
            source: config.source_portfolio.clone(),
            collateral: Portfolio::new(),
        };
        let mut reference = config.reference_portfolio.clone();
        let mut strategy = build_strategy(&config);

        let start = config.start_date;
        let reference_total = revalue(&mut reference, oracle.as_ref(), start)?;
        let required = required_value(&config, reference_total);
        let source_total = revalue(&mut books.source, oracle.as_ref(), start)?;
        let ctx = DayContext {
            date: start,
            reference_total,
            source_total,
            required,
        };

        let token = strategy.initialize(&mut books, &ctx)?;
        let initial_collateral = books.collateral.clone();

        let collateral_total_value = token
            .as_ref()
            .map(|token| token.lender_value())
            .unwrap_or_else(|| books.collateral.total_value());

        let mut log = SimulationLog::new();
        log.append(DailySnapshot {
            date: start,
            st_total_value: reference_total,
            jct_total_value: source_total,
            required_collateral_value: required,
            collateral_total_value,
            source_portfolio: books.source.clone(),
            collateral_portfolio: books.collateral.clone(),
            initial_collateral_portfolio: initial_collateral.clone(),
            margin_call_executed: true,
            additional_issue: false,
            issued_by: None,
            token,
        });

        // A one-day range has no interior dates: day zero is already the
        // final valuation.
        let phase = if is_final_valuation_date(start, config.end_date) {
            TransactionPhase::Completed
        } else {
            TransactionPhase::Created
        };

        Ok(LendingTransaction {
            id: Uuid::new_v4(),
            config,
            oracle,
            strategy,
            books,
            reference,
            initial_collateral,
            log,
            phase,
            last_processed: start,
        })
    }

    /// Process one date: revalue, measure the difference, and adjust the
    /// pledge (unless suppressed by the threshold rule).
    ///
    /// Dates must arrive in strictly ascending order within the open
    /// interval `(start_date, end_date)`; anything else is rejected with
    /// `DateOutOfRange` without touching any state. A strategy or pricing
    /// failure freezes the transaction in `Failed` with the log intact.
    pub fn rebalance(&mut self, date: NaiveDate) -> Result<(), SimulationError> {
        match self.phase {
            TransactionPhase::Created | TransactionPhase::Active => {}
            _ => return Err(SimulationError::DateOutOfRange { date }),
        }
        if date <= self.last_processed || date >= self.config.end_date {
            return Err(SimulationError::DateOutOfRange { date });
        }

        match self.process_date(date) {
            Ok(entry) => {
                self.log.append(entry);
                self.last_processed = date;
                self.phase = if is_final_valuation_date(date, self.config.end_date) {
                    TransactionPhase::Completed
                } else {
                    TransactionPhase::Active
                };
                Ok(())
            }
            Err(error) => {
                self.phase = TransactionPhase::Failed {
                    reason: failure_reason(&error),
                };
                Err(error)
            }
        }
    }

    /// Run every remaining date of the range in order.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        for date in DateRange::interior(self.last_processed, self.config.end_date) {
            self.rebalance(date)?;
        }
        Ok(())
    }

    fn process_date(&mut self, date: NaiveDate) -> Result<DailySnapshot, SimulationError> {
        let reference_total = revalue(&mut self.reference, self.oracle.as_ref(), date)?;
        let required = required_value(&self.config, reference_total);
        let source_total = revalue(&mut self.books.source, self.oracle.as_ref(), date)?;
        revalue(&mut self.books.collateral, self.oracle.as_ref(), date)?;

        let ctx = DayContext {
            date,
            reference_total,
            source_total,
            required,
        };
        self.strategy.rebase(&ctx);

        let coverage = self.strategy.coverage_value(&self.books, &ctx);
        let diff = required - coverage;
        let executed = diff.abs() >= required * self.config.margin_call_threshold;

        let outcome = if executed {
            self.strategy.margin_call(&mut self.books, &ctx, diff)?
        } else {
            MarginCallOutcome {
                issued_by: None,
                token: self.strategy.token_state(&ctx),
            }
        };

        revalue(&mut self.initial_collateral, self.oracle.as_ref(), date)?;

        let collateral_total_value = outcome
            .token
            .as_ref()
            .map(|token| token.lender_value())
            .unwrap_or_else(|| self.books.collateral.total_value());

        Ok(DailySnapshot {
            date,
            st_total_value: reference_total,
            jct_total_value: source_total,
            required_collateral_value: required,
            collateral_total_value,
            source_portfolio: self.books.source.clone(),
            collateral_portfolio: self.books.collateral.clone(),
            initial_collateral_portfolio: self.initial_collateral.clone(),
            margin_call_executed: executed,
            additional_issue: outcome.issued_by.is_some(),
            issued_by: outcome.issued_by,
            token: outcome.token,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    /// Daily history so far, day zero included.
    pub fn log(&self) -> &SimulationLog {
        &self.log
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// The borrower's pool after all processed dates.
    pub fn source_portfolio(&self) -> &Portfolio {
        &self.books.source
    }

    /// The pledge after all processed dates (empty in token modes).
    pub fn collateral_portfolio(&self) -> &Portfolio {
        &self.books.collateral
    }
}

/// `reference_total * lender_loan_ratio / borrower_loan_ratio`.
fn required_value(config: &TransactionConfig, reference_total: Decimal) -> Decimal {
    reference_total * config.lender_loan_ratio / config.borrower_loan_ratio
}

fn failure_reason(error: &SimulationError) -> FailureReason {
    match error {
        SimulationError::Price(_) => FailureReason::PriceUnavailable,
        _ => FailureReason::MarginCallUnresolved,
    }
}

fn validate(config: &TransactionConfig) -> Result<(), SimulationError> {
    if config.borrower_loan_ratio <= Decimal::ZERO || config.lender_loan_ratio <= Decimal::ZERO {
        return Err(SimulationError::InvalidConfig(
            "loan ratios must be positive".to_string(),
        ));
    }
    if config.margin_call_threshold < Decimal::ZERO {
        return Err(SimulationError::InvalidConfig(
            "margin_call_threshold must not be negative".to_string(),
        ));
    }
    if config.end_date <= config.start_date {
        return Err(SimulationError::InvalidConfig(
            "end_date must be after start_date".to_string(),
        ));
    }
    if config.reference_portfolio.is_empty() {
        return Err(SimulationError::InvalidConfig(
            "reference portfolio must not be empty".to_string(),
        ));
    }
    if matches!(
        config.strategy,
        StrategyKind::SingleSecurity | StrategyKind::MultiSecurity
    ) && config
        .source_portfolio
        .eligible_codes_by_priority(PriorityOrder::Descending)
        .is_empty()
    {
        return Err(SimulationError::InvalidConfig(
            "source portfolio has no collateral-eligible holding".to_string(),
        ));
    }
    Ok(())
}

/// Instantiate the configured strategy.
fn build_strategy(config: &TransactionConfig) -> Box<dyn RebalanceStrategy> {
    match config.strategy {
        StrategyKind::SingleSecurity => Box::new(SingleSecurityStrategy::new(config.auto_deposit)),
        StrategyKind::MultiSecurity => Box::new(MultiSecurityStrategy::new(
            config.auto_deposit,
            config.reverse_return_order,
        )),
        StrategyKind::FloatingToken => Box::new(FloatingTokenStrategy::new(config.auto_deposit)),
        StrategyKind::PeggedToken => Box::new(PeggedTokenStrategy::new(config.auto_deposit)),
    }
}

//! Collateral Simulator Core - Rust Engine
//!
//! Securities-lending collateral simulator with deterministic daily
//! rebalancing.
//!
//! # Architecture
//!
//! - **core**: Simulation calendar (date ranges, final-date detection)
//! - **models**: Domain types (Holding, Portfolio, TokenLedger, log)
//! - **oracle**: Injected market data source (prices, FX)
//! - **valuation**: Daily mark-to-market of portfolios
//! - **allocation**: Priority-ordered collateral waterfall
//! - **policy**: Rebalancing strategies (securities and token modes)
//! - **orchestrator**: Transaction lifecycle and daily loop
//!
//! # Critical Invariants
//!
//! 1. All prices are `Decimal`, floored to one decimal place at valuation
//! 2. Security quantities are whole units (u64); movements round up
//! 3. A simulation is fully determined by its config and oracle data
//!    (the log fingerprint is reproducible)

// Module declarations
pub mod allocation;
pub mod core;
pub mod models;
pub mod oracle;
pub mod orchestrator;
pub mod policy;
pub mod valuation;

// Re-exports for convenience
pub use crate::allocation::{allocate_initial, units_needed, waterfall_transfer};
pub use crate::core::calendar::{is_final_valuation_date, DateRange};
pub use crate::models::{
    DailySnapshot, Holding, Party, Portfolio, PortfolioEntry, PriorityOrder, SimulationLog,
    TokenLedger, TokenSnapshot,
};
pub use crate::oracle::{
    FixedPriceOracle, FxRatePoint, PriceError, PriceOracle, PricePoint, PriceTable,
    TablePriceOracle, CASH_CODE,
};
pub use crate::orchestrator::{
    FailureReason, LendingTransaction, ScenarioFile, SimulationError, StrategyKind,
    TransactionConfig, TransactionPhase,
};
pub use crate::valuation::{floor_to_tenth, revalue};

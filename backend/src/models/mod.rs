//! Domain models for the collateral simulator

pub mod holding;
pub mod ledger;
pub mod portfolio;
pub mod snapshot;

// Re-exports
pub use holding::{Holding, Party};
pub use ledger::TokenLedger;
pub use portfolio::{Portfolio, PortfolioEntry, PriorityOrder};
pub use snapshot::{DailySnapshot, SimulationLog, TokenSnapshot};

//! Orchestrator - transaction lifecycle and daily loop
//!
//! Construction runs day zero (validation, initial allocation, opening log
//! entry); `rebalance`/`run` drive the remaining dates.
//!
//! See `engine.rs` for full implementation.

pub mod engine;

// Re-export main types for convenience
pub use engine::{
    FailureReason, LendingTransaction, ScenarioFile, SimulationError, StrategyKind,
    TransactionConfig, TransactionPhase,
};

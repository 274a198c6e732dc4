//! Core utilities: date sequencing for the simulation loop

pub mod calendar;

pub use calendar::{is_final_valuation_date, DateRange};

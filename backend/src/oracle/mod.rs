//! Price oracle - injected market data source
//!
//! The engine never fetches prices itself: every transaction is constructed
//! with an `Arc<dyn PriceOracle>` and all lookups go through it. Oracles must
//! be deterministic for a given date (the engine retries nothing) and safe
//! for concurrent read-only use, since independent transactions may be
//! simulated in parallel against the same oracle.
//!
//! Two implementations ship with the crate: [`FixedPriceOracle`] for offline
//! runs and tests, and [`TablePriceOracle`] backed by scenario data.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code of the domestic cash pseudo-security. Always priced at 1.0 by the
/// provided oracles, and the sink for automatic deposits in the token modes.
pub const CASH_CODE: &str = "JPY";

/// Market data lookup failures. Absence of data for a requested date is a
/// hard failure for that simulation step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("no price for {code} on {date}")]
    MissingPrice { code: String, date: NaiveDate },

    #[error("no FX rate on {date}")]
    MissingFxRate { date: NaiveDate },
}

/// Deterministic market data source for a simulation run.
pub trait PriceOracle: Send + Sync {
    /// Unit price of `code` on `date`, in the security's own currency.
    fn unit_price(&self, code: &str, date: NaiveDate) -> Result<Decimal, PriceError>;

    /// Conversion rate from the foreign currency to the base currency on
    /// `date`.
    fn fx_rate(&self, date: NaiveDate) -> Result<Decimal, PriceError>;
}

/// Flat-price oracle: every security costs the same on every date.
///
/// The defaults (securities at 500.0, FX at 150.0, cash at 1.0) make
/// hand-computed expectations easy in tests and offline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPriceOracle {
    pub security_price: Decimal,
    pub fx: Decimal,
}

impl FixedPriceOracle {
    pub fn new(security_price: Decimal, fx: Decimal) -> Self {
        FixedPriceOracle { security_price, fx }
    }
}

impl Default for FixedPriceOracle {
    fn default() -> Self {
        FixedPriceOracle {
            security_price: Decimal::from(500),
            fx: Decimal::from(150),
        }
    }
}

impl PriceOracle for FixedPriceOracle {
    fn unit_price(&self, code: &str, _date: NaiveDate) -> Result<Decimal, PriceError> {
        if code == CASH_CODE {
            return Ok(Decimal::ONE);
        }
        Ok(self.security_price)
    }

    fn fx_rate(&self, _date: NaiveDate) -> Result<Decimal, PriceError> {
        Ok(self.fx)
    }
}

/// One observed closing price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub code: String,
    pub date: NaiveDate,
    pub price: Decimal,
}

/// One observed FX rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRatePoint {
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// Serializable market data carried by a scenario file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default)]
    pub prices: Vec<PricePoint>,

    #[serde(default)]
    pub fx_rates: Vec<FxRatePoint>,
}

/// Oracle backed by a fixed table of (code, date) → price observations.
///
/// Lookups that miss the table fail with [`PriceError`]; the cash code is the
/// only synthetic answer (cash is always worth one unit of itself).
#[derive(Debug, Clone, Default)]
pub struct TablePriceOracle {
    prices: HashMap<String, HashMap<NaiveDate, Decimal>>,
    fx_rates: HashMap<NaiveDate, Decimal>,
}

impl TablePriceOracle {
    pub fn new(table: PriceTable) -> Self {
        let mut prices: HashMap<String, HashMap<NaiveDate, Decimal>> = HashMap::new();
        for point in table.prices {
            prices
                .entry(point.code)
                .or_default()
                .insert(point.date, point.price);
        }
        let fx_rates = table
            .fx_rates
            .into_iter()
            .map(|point| (point.date, point.rate))
            .collect();
        TablePriceOracle { prices, fx_rates }
    }
}

impl From<PriceTable> for TablePriceOracle {
    fn from(table: PriceTable) -> Self {
        TablePriceOracle::new(table)
    }
}

impl PriceOracle for TablePriceOracle {
    fn unit_price(&self, code: &str, date: NaiveDate) -> Result<Decimal, PriceError> {
        if code == CASH_CODE {
            return Ok(Decimal::ONE);
        }
        self.prices
            .get(code)
            .and_then(|by_date| by_date.get(&date))
            .copied()
            .ok_or_else(|| PriceError::MissingPrice {
                code: code.to_string(),
                date,
            })
    }

    fn fx_rate(&self, date: NaiveDate) -> Result<Decimal, PriceError> {
        self.fx_rates
            .get(&date)
            .copied()
            .ok_or(PriceError::MissingFxRate { date })
    }
}

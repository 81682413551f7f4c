//! Derivation of the published sensor values
//!
//! `derive` is a pure function of the series store and a point in time, so
//! hour and day boundary behaviour can be unit tested with fixed clocks.

use crate::ostrom::types::hour_floor;
use crate::series::PriceSeriesStore;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// The six published values plus bookkeeping.
///
/// Fields are individually optional: a missing next-hour price (tomorrow not
/// yet published) or missing today-bounds (right after midnight) leaves the
/// other fields valid instead of failing the snapshot as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedSnapshot {
    /// Gross price of the hour containing `as_of`, EUR/kWh
    pub current_price: Option<f64>,

    /// Gross price of the following hour, EUR/kWh
    pub next_hour_price: Option<f64>,

    /// Lowest gross price of the contract-local day, EUR/kWh
    pub today_low: Option<f64>,

    /// Highest gross price of the contract-local day, EUR/kWh
    pub today_high: Option<f64>,

    /// Monthly base fee, EUR
    pub base_fee: Option<f64>,

    /// Monthly grid fee, EUR
    pub grid_fee: Option<f64>,

    /// Time the snapshot was computed for
    pub as_of: DateTime<Utc>,

    /// Set once refreshes have failed often enough that these values can no
    /// longer be trusted to be current
    pub stale: bool,
}

impl DerivedSnapshot {
    /// Snapshot with no derived values, used before the first refresh
    pub fn empty(as_of: DateTime<Utc>) -> Self {
        Self {
            current_price: None,
            next_hour_price: None,
            today_low: None,
            today_high: None,
            base_fee: None,
            grid_fee: None,
            as_of,
            stale: false,
        }
    }

    /// Whether any derived value is present
    pub fn has_data(&self) -> bool {
        self.current_price.is_some()
            || self.next_hour_price.is_some()
            || self.today_low.is_some()
            || self.base_fee.is_some()
    }
}

/// Compute the published values from the series contents at `at`
pub fn derive(store: &PriceSeriesStore, at: DateTime<Utc>) -> DerivedSnapshot {
    let bounds = store.today_bounds(at);
    let fees = store.fees();
    DerivedSnapshot {
        current_price: store.lookup(at).map(|p| p.price),
        next_hour_price: store
            .lookup(hour_floor(at) + TimeDelta::hours(1))
            .map(|p| p.price),
        today_low: bounds.map(|(low, _)| low),
        today_high: bounds.map(|(_, high)| high),
        base_fee: fees.map(|f| f.base_fee),
        grid_fee: fees.map(|f| f.grid_fee),
        as_of: at,
        stale: false,
    }
}

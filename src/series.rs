//! In-memory, time-indexed cache of fetched price points
//!
//! The store is the single owner of the rolling price window. Ingest merges
//! remote data (remote always wins over a cached value for the same hour)
//! and evicts anything older than the start of the contract-local
//! "yesterday", which is the minimum history needed for day-boundary
//! queries. Nothing downstream mutates the series directly.

use crate::ostrom::types::{FeeSnapshot, PricePoint, hour_floor};
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Time-indexed price series plus the latest fee snapshot
#[derive(Debug, Clone)]
pub struct PriceSeriesStore {
    points: BTreeMap<DateTime<Utc>, PricePoint>,
    fees: Option<FeeSnapshot>,
    tz: Tz,
}

impl PriceSeriesStore {
    /// Create an empty store using the given contract-local timezone
    pub fn new(tz: Tz) -> Self {
        Self {
            points: BTreeMap::new(),
            fees: None,
            tz,
        }
    }

    /// The contract-local timezone used for calendar-day queries
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Calendar day of `at` in the contract-local timezone
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    /// UTC instant of local midnight on `date`
    pub fn local_midnight_utc(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        self.tz
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Merge new points and fees into the store.
    ///
    /// Points overwrite any existing entry with the same start time, the fee
    /// snapshot is replaced wholesale when present, and points older than
    /// local midnight of yesterday (relative to `now`) are evicted.
    pub fn ingest(
        &mut self,
        points: Vec<PricePoint>,
        fees: Option<FeeSnapshot>,
        now: DateTime<Utc>,
    ) {
        for point in points {
            self.points.insert(point.start_time, point);
        }
        if let Some(fees) = fees {
            self.fees = Some(fees);
        }

        if let Some(cutoff) = self.local_midnight_utc(self.local_day(now) - TimeDelta::days(1)) {
            self.points.retain(|start_time, _| *start_time >= cutoff);
        }
    }

    /// The point whose hour interval contains `at`, if present
    pub fn lookup(&self, at: DateTime<Utc>) -> Option<&PricePoint> {
        self.points.get(&hour_floor(at))
    }

    /// Min/max gross price over the contract-local calendar day of `at`.
    ///
    /// `None` is a legitimate outcome (e.g. right after midnight before new
    /// data arrived), not an error.
    pub fn today_bounds(&self, at: DateTime<Utc>) -> Option<(f64, f64)> {
        let day = self.local_day(at);
        let mut bounds: Option<(f64, f64)> = None;
        for point in self.points.values() {
            if self.local_day(point.start_time) != day {
                continue;
            }
            bounds = Some(match bounds {
                None => (point.price, point.price),
                Some((low, high)) => (low.min(point.price), high.max(point.price)),
            });
        }
        bounds
    }

    /// All points on the given contract-local calendar day, in time order
    pub fn day_prices(&self, date: NaiveDate) -> Vec<PricePoint> {
        self.points
            .values()
            .filter(|p| self.local_day(p.start_time) == date)
            .copied()
            .collect()
    }

    /// Hour-aligned start times missing between the first and last stored
    /// point. Gaps are reported, never bridged by extrapolation.
    pub fn missing_hours(&self) -> Vec<DateTime<Utc>> {
        let (Some(first), Some(last)) = (
            self.points.keys().next().copied(),
            self.points.keys().next_back().copied(),
        ) else {
            return Vec::new();
        };

        let mut missing = Vec::new();
        let mut cursor = first;
        while cursor <= last {
            if !self.points.contains_key(&cursor) {
                missing.push(cursor);
            }
            cursor += TimeDelta::hours(1);
        }
        missing
    }

    /// Latest fee snapshot, if any fetch has delivered one
    pub fn fees(&self) -> Option<&FeeSnapshot> {
        self.fees.as_ref()
    }

    /// Number of cached points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

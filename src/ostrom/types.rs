//! Wire payload shapes for the Ostrom API and their normalization
//!
//! The provider payload is loosely typed; everything downstream of this
//! module only ever sees the strict [`PricePoint`] and [`FeeSnapshot`]
//! shapes produced here.

use crate::error::{ElektraError, Result};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Resolution requested from the spot-price endpoint
pub const SPOT_PRICE_RESOLUTION: &str = "HOUR";

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Envelope around the spot-price array
#[derive(Debug, Clone, Deserialize)]
pub struct SpotPriceEnvelope {
    #[serde(default)]
    pub data: Vec<RawSpotPrice>,
}

/// One loosely-typed spot-price entry as returned by the provider.
///
/// Every field is optional so a single malformed entry can be dropped
/// without aborting deserialization of the whole payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSpotPrice {
    pub date: Option<String>,
    pub gross_kwh_price: Option<f64>,
    pub net_kwh_price: Option<f64>,
    pub gross_monthly_ostrom_base_fee: Option<f64>,
    pub gross_monthly_grid_fees: Option<f64>,
}

/// A single normalized hourly price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    /// Hour-aligned start of the interval, UTC
    pub start_time: DateTime<Utc>,

    /// Gross price in EUR/kWh
    pub price: f64,

    /// Net price in EUR/kWh when the provider supplies it
    pub net_price: Option<f64>,
}

/// Monthly fees, replaced wholesale on each successful fetch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeSnapshot {
    /// Monthly base fee in EUR
    pub base_fee: f64,

    /// Monthly grid fee in EUR
    pub grid_fee: f64,
}

/// Floor a timestamp to the start of its hour
pub fn hour_floor(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::hours(1)).unwrap_or(at)
}

fn normalize_entry(raw: &RawSpotPrice) -> Option<PricePoint> {
    let date = raw.date.as_deref()?;
    let parsed = DateTime::parse_from_rfc3339(date).ok()?;
    let price = raw.gross_kwh_price?;
    if !price.is_finite() || price < 0.0 {
        return None;
    }
    let net_price = raw.net_kwh_price.filter(|v| v.is_finite());
    Some(PricePoint {
        start_time: hour_floor(parsed.with_timezone(&Utc)),
        price,
        net_price,
    })
}

fn extract_fees(raw: &[RawSpotPrice]) -> Option<FeeSnapshot> {
    raw.iter().find_map(|entry| {
        match (
            entry.gross_monthly_ostrom_base_fee,
            entry.gross_monthly_grid_fees,
        ) {
            (Some(base_fee), Some(grid_fee)) if base_fee.is_finite() && grid_fee.is_finite() => {
                Some(FeeSnapshot { base_fee, grid_fee })
            }
            _ => None,
        }
    })
}

/// Normalize a raw spot-price payload into strict domain values.
///
/// Malformed entries (missing or unparseable timestamp, missing, negative
/// or non-finite price) are dropped with a warning. A non-empty payload
/// that yields no usable point at all is a data error: the provider sent
/// something, but nothing we can work with.
pub fn normalize_payload(raw: &[RawSpotPrice]) -> Result<(Vec<PricePoint>, Option<FeeSnapshot>)> {
    let mut points = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for entry in raw {
        match normalize_entry(entry) {
            Some(point) => points.push(point),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::warn!(
            "Dropped {} malformed spot-price entries out of {}",
            dropped,
            raw.len()
        );
    }

    if points.is_empty() && !raw.is_empty() {
        return Err(ElektraError::data(format!(
            "All {} spot-price entries were malformed",
            raw.len()
        )));
    }

    let fees = extract_fees(raw);
    Ok((points, fees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(date: &str, price: f64) -> RawSpotPrice {
        RawSpotPrice {
            date: Some(date.to_string()),
            gross_kwh_price: Some(price),
            net_kwh_price: None,
            gross_monthly_ostrom_base_fee: None,
            gross_monthly_grid_fees: None,
        }
    }

    #[test]
    fn normalizes_and_converts_to_utc() {
        let entries = [raw("2024-05-01T14:00:00+02:00", 0.31)];
        let (points, fees) = normalize_payload(&entries).unwrap();
        assert_eq!(points.len(), 1);
        assert!(fees.is_none());
        assert_eq!(
            points[0].start_time,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert!((points[0].price - 0.31).abs() < 1e-9);
    }

    #[test]
    fn drops_malformed_entries_keeps_rest() {
        let entries = [
            raw("2024-05-01T00:00:00Z", 0.25),
            raw("not-a-date", 0.25),
            raw("2024-05-01T01:00:00Z", -0.1),
            RawSpotPrice {
                date: Some("2024-05-01T02:00:00Z".to_string()),
                gross_kwh_price: None,
                net_kwh_price: None,
                gross_monthly_ostrom_base_fee: None,
                gross_monthly_grid_fees: None,
            },
            raw("2024-05-01T03:00:00Z", 0.29),
        ];
        let (points, _) = normalize_payload(&entries).unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[1].price - 0.29).abs() < 1e-9);
    }

    #[test]
    fn entirely_malformed_payload_is_a_data_error() {
        let entries = [raw("garbage", 0.25), raw("2024-05-01T00:00:00Z", f64::NAN)];
        let err = normalize_payload(&entries).unwrap_err();
        assert!(matches!(err, ElektraError::Data { .. }));
    }

    #[test]
    fn empty_payload_is_not_an_error() {
        let (points, fees) = normalize_payload(&[]).unwrap();
        assert!(points.is_empty());
        assert!(fees.is_none());
    }

    #[test]
    fn fees_taken_from_first_entry_that_carries_them() {
        let mut first = raw("2024-05-01T00:00:00Z", 0.25);
        first.gross_monthly_ostrom_base_fee = Some(9.99);
        // Missing grid fee on the first entry: skip it
        let mut second = raw("2024-05-01T01:00:00Z", 0.26);
        second.gross_monthly_ostrom_base_fee = Some(9.99);
        second.gross_monthly_grid_fees = Some(7.50);
        let (_, fees) = normalize_payload(&[first, second]).unwrap();
        let fees = fees.unwrap();
        assert!((fees.base_fee - 9.99).abs() < 1e-9);
        assert!((fees.grid_fee - 7.50).abs() < 1e-9);
    }

    #[test]
    fn hour_floor_truncates_minutes_and_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 59).unwrap();
        assert_eq!(
            hour_floor(at),
            Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap()
        );
    }
}

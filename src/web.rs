//! Read-only HTTP API exposing the published sensor values
//!
//! Thin adapter over the coordinator's published snapshot and the price
//! series store; it contains no derivation logic of its own and offers no
//! mutating routes.

use crate::config::Config;
use crate::derive::DerivedSnapshot;
use crate::error::Result;
use crate::series::PriceSeriesStore;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub snapshot_rx: watch::Receiver<Arc<DerivedSnapshot>>,
    pub store: Arc<RwLock<PriceSeriesStore>>,
    pub config: Arc<Config>,
}

#[derive(Deserialize)]
pub struct PricesQuery {
    /// Contract-local calendar day, defaults to today
    pub date: Option<NaiveDate>,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn sensor_value(key: &str, name: &str, unit: &str, value: Option<f64>) -> serde_json::Value {
    serde_json::json!({
        "key": key,
        "name": name,
        "unit": unit,
        "value": value,
        "valid": value.is_some(),
    })
}

/// The six published sensor values with units and staleness flags
async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.snapshot_rx.borrow().clone();
    Json(serde_json::json!({
        "as_of": snap.as_of.to_rfc3339(),
        "stale": snap.stale,
        "sensors": [
            sensor_value("current_price", "Current Price", "EUR/kWh", snap.current_price),
            sensor_value("next_hour_price", "Next Hour Price", "EUR/kWh", snap.next_hour_price),
            sensor_value("lowest_price_today", "Lowest Price Today", "EUR/kWh", snap.today_low),
            sensor_value("highest_price_today", "Highest Price Today", "EUR/kWh", snap.today_high),
            sensor_value("base_fee", "Monthly Base Fee", "EUR", snap.base_fee),
            sensor_value("grid_fee", "Monthly Grid Fee", "EUR", snap.grid_fee),
        ],
    }))
}

/// Hourly prices for a contract-local calendar day
async fn prices(
    State(state): State<AppState>,
    Query(query): Query<PricesQuery>,
) -> impl IntoResponse {
    let store = state.store.read().await;
    let date = query.date.unwrap_or_else(|| store.local_day(Utc::now()));
    let day_prices = store.day_prices(date);
    Json(serde_json::json!({
        "date": date.to_string(),
        "prices": day_prices,
    }))
}

/// Current configuration with the client secret redacted
async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let mut config = (*state.config).clone();
    if !config.ostrom.client_secret.is_empty() {
        config.ostrom.client_secret = "***".to_string();
    }
    let json =
        serde_json::to_value(&config).unwrap_or(serde_json::json!({"error": "serialization"}));
    Json(json)
}

/// Build the router over the given state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/snapshot", get(snapshot))
        .route("/api/prices", get(prices))
        .route("/api/config", get(get_config))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the API on the given address until the process stops
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .unwrap_or(([127, 0, 0, 1], port).into());
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ostrom::types::{FeeSnapshot, PricePoint};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::TimeZone;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let mut store = PriceSeriesStore::new(chrono_tz::UTC);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.ingest(
            vec![PricePoint {
                start_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                price: 0.30,
                net_price: Some(0.22),
            }],
            Some(FeeSnapshot {
                base_fee: 9.99,
                grid_fee: 7.50,
            }),
            now,
        );

        let mut snapshot = DerivedSnapshot::empty(now);
        snapshot.current_price = Some(0.30);
        snapshot.base_fee = Some(9.99);
        snapshot.grid_fee = Some(7.50);
        // The receiver keeps serving the last value after the sender drops
        let (_tx, rx) = watch::channel(Arc::new(snapshot));

        let mut config = Config::default();
        config.ostrom.client_secret = "super-secret".to_string();

        AppState {
            snapshot_rx: rx,
            store: Arc::new(RwLock::new(store)),
            config: Arc::new(config),
        }
    }

    async fn get_json(state: AppState, uri: &str) -> serde_json::Value {
        let response = build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_ok() {
        let response = build_router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn snapshot_lists_six_sensors_with_units() {
        let body = get_json(test_state(), "/api/snapshot").await;
        let sensors = body["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 6);
        assert_eq!(sensors[0]["key"], "current_price");
        assert_eq!(sensors[0]["unit"], "EUR/kWh");
        assert_eq!(sensors[0]["valid"], true);
        // Next-hour price was not derivable
        assert_eq!(sensors[1]["valid"], false);
        assert_eq!(body["stale"], false);
    }

    #[tokio::test]
    async fn prices_filters_by_date() {
        let body = get_json(test_state(), "/api/prices?date=2024-05-01").await;
        assert_eq!(body["prices"].as_array().unwrap().len(), 1);

        let body = get_json(test_state(), "/api/prices?date=2024-05-02").await;
        assert!(body["prices"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn config_redacts_client_secret() {
        let body = get_json(test_state(), "/api/config").await;
        assert_eq!(body["ostrom"]["client_secret"], "***");
    }
}

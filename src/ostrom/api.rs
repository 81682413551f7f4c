//! Spot-price retrieval from the Ostrom API

use crate::error::{ElektraError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::ostrom::auth::{Credentials, TokenManager};
use crate::ostrom::types::{
    FeeSnapshot, PricePoint, SPOT_PRICE_RESOLUTION, SpotPriceEnvelope, normalize_payload,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use std::time::Duration;

/// Source of normalized price data for a bounded time window.
///
/// The coordinator only depends on this trait, so tests can drive it with a
/// fake provider instead of the real API.
#[async_trait]
pub trait PriceSource: Send {
    /// Fetch all hourly prices with `window_start <= start_time < window_end`
    /// plus the current fee snapshot when the provider supplies one.
    async fn fetch(
        &mut self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<(Vec<PricePoint>, Option<FeeSnapshot>)>;
}

/// Ostrom API client
pub struct OstromClient {
    token_manager: TokenManager,
    base_url: String,
    zip_code: String,
    http: reqwest::Client,
    logger: StructuredLogger,
}

impl OstromClient {
    /// Create a new client for the given credentials and endpoints
    pub fn new(
        credentials: Credentials,
        base_url: String,
        auth_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let zip_code = credentials.zip_code.clone();
        let token_manager = TokenManager::new(credentials, auth_url, timeout)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let logger =
            get_logger_with_context(LogContext::new("ostrom").with_zip_code(zip_code.clone()));
        Ok(Self {
            token_manager,
            base_url,
            zip_code,
            http,
            logger,
        })
    }

    fn format_window_bound(at: DateTime<Utc>) -> String {
        at.format("%Y-%m-%dT%H:00:00.000Z").to_string()
    }

    async fn request_spot_prices(
        &self,
        bearer: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<(Vec<PricePoint>, Option<FeeSnapshot>)> {
        let url = format!("{}/spot-prices", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(bearer)
            .header(ACCEPT, "application/json")
            .query(&[
                ("startDate", Self::format_window_bound(window_start)),
                ("endDate", Self::format_window_bound(window_end)),
                ("resolution", SPOT_PRICE_RESOLUTION.to_string()),
                ("zip", self.zip_code.clone()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ElektraError::auth(format!(
                "Spot-price request rejected with status {}",
                status
            )));
        }
        if status.is_server_error() {
            return Err(ElektraError::network(format!(
                "Spot-price request failed with status {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(ElektraError::data(format!(
                "Spot-price request failed with status {}",
                status
            )));
        }

        let envelope: SpotPriceEnvelope = resp
            .json()
            .await
            .map_err(|e| ElektraError::data(format!("Invalid spot-price response: {}", e)))?;

        if envelope.data.is_empty() {
            return Err(ElektraError::data("No price data received from Ostrom API"));
        }

        self.logger.debug(&format!(
            "Received {} spot prices from API",
            envelope.data.len()
        ));

        normalize_payload(&envelope.data)
    }

    async fn fetch_window(
        &mut self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<(Vec<PricePoint>, Option<FeeSnapshot>)> {
        let bearer = self.token_manager.get_valid_token().await?;
        match self
            .request_spot_prices(&bearer, window_start, window_end)
            .await
        {
            Err(ElektraError::Auth { message }) => {
                // The provider rejected a locally-fresh token. Refresh it
                // once and retry; a second rejection surfaces as-is.
                self.logger
                    .warn(&format!("Retrying with fresh token: {}", message));
                self.token_manager.invalidate();
                let bearer = self.token_manager.get_valid_token().await?;
                self.request_spot_prices(&bearer, window_start, window_end)
                    .await
            }
            other => other,
        }
    }
}

#[async_trait]
impl PriceSource for OstromClient {
    async fn fetch(
        &mut self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<(Vec<PricePoint>, Option<FeeSnapshot>)> {
        self.fetch_window(window_start, window_end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_bounds_are_hour_aligned_utc() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 59).unwrap();
        assert_eq!(
            OstromClient::format_window_bound(at),
            "2024-05-01T18:00:00.000Z"
        );
    }
}

//! OAuth2 client-credentials token lifecycle
//!
//! The token manager owns the single in-process token cache and shields the
//! rest of the application from auth concerns: callers ask for a valid
//! bearer value and never see the exchange itself.

use crate::error::{ElektraError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::ostrom::types::TokenResponse;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use std::time::Duration;

/// Margin in seconds subtracted from the token lifetime so a token never
/// expires mid-request.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

/// User-supplied Ostrom identifiers, immutable after configuration
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub zip_code: String,
}

/// Cached bearer token with expiry bookkeeping
#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub bearer: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Whether the token is still usable at `now`, honouring the safety margin
    pub(crate) fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - TimeDelta::seconds(TOKEN_SAFETY_MARGIN_SECS)
    }
}

/// Obtains and refreshes the OAuth2 bearer token
pub struct TokenManager {
    credentials: Credentials,
    auth_url: String,
    http: reqwest::Client,
    cached: Option<CachedToken>,
    logger: StructuredLogger,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(credentials: Credentials, auth_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            credentials,
            auth_url,
            http,
            cached: None,
            logger: get_logger("auth"),
        })
    }

    /// Drop the cached token so the next call performs a fresh exchange.
    ///
    /// Used after the provider rejects a request with 401/403 even though
    /// the token looked fresh locally.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Return a valid bearer value, exchanging credentials if needed
    pub async fn get_valid_token(&mut self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.cached.as_ref()
            && token.is_fresh(now)
        {
            return Ok(token.bearer.clone());
        }

        let token = self.exchange(now).await?;
        let bearer = token.bearer.clone();
        self.cached = Some(token);
        Ok(bearer)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let resp = self
            .http
            .post(&self.auth_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        // The Ostrom token endpoint answers 201 on success
        if resp.status() != StatusCode::CREATED {
            self.logger.error(&format!(
                "Token exchange rejected with status {}",
                resp.status()
            ));
            return Err(ElektraError::auth(format!(
                "Token exchange rejected with status {}",
                resp.status()
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ElektraError::auth(format!("Invalid token response: {}", e)))?;

        if token.token_type != "Bearer" {
            return Err(ElektraError::auth(format!(
                "Unexpected token type '{}'",
                token.token_type
            )));
        }

        self.logger.debug(&format!(
            "Obtained new access token, expires in {} seconds",
            token.expires_in
        ));

        Ok(CachedToken {
            bearer: token.access_token,
            expires_at: now + TimeDelta::seconds(token.expires_in.max(0)),
        })
    }

    #[cfg(test)]
    pub(crate) fn seed_token(&mut self, bearer: &str, expires_at: DateTime<Utc>) {
        self.cached = Some(CachedToken {
            bearer: bearer.to_string(),
            expires_at,
        });
    }

    #[cfg(test)]
    pub(crate) fn cached_is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.cached.as_ref().is_some_and(|t| t.is_fresh(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expiring_inside_safety_margin_is_not_fresh() {
        let now = Utc::now();
        let token = CachedToken {
            bearer: "abc".to_string(),
            expires_at: now + TimeDelta::seconds(30),
        };
        assert!(!token.is_fresh(now));
    }

    #[test]
    fn token_with_ample_lifetime_is_fresh() {
        let now = Utc::now();
        let token = CachedToken {
            bearer: "abc".to_string(),
            expires_at: now + TimeDelta::minutes(10),
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn invalidate_clears_cache() {
        let credentials = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            zip_code: "10115".to_string(),
        };
        let mut manager = TokenManager::new(
            credentials,
            "http://localhost/oauth2/token".to_string(),
            Duration::from_secs(10),
        )
        .unwrap();

        let now = Utc::now();
        manager.seed_token("abc", now + TimeDelta::minutes(10));
        assert!(manager.cached_is_fresh(now));

        manager.invalidate();
        assert!(!manager.cached_is_fresh(now));
    }
}

//! Ostrom API integration for dynamic electricity pricing
//!
//! This module is split across smaller files: `types` holds the wire payload
//! shapes and their normalization into strict domain values, `auth` manages
//! the OAuth2 client-credentials token lifecycle, and `api` performs the
//! spot-price requests.

pub mod api;
pub mod auth;
pub mod types;

// Re-exports for the public API surface
pub use api::{OstromClient, PriceSource};
pub use auth::{Credentials, TokenManager};
pub use types::{FeeSnapshot, PricePoint, normalize_payload};

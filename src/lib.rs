//! # Elektra - Ostrom dynamic electricity price monitor
//!
//! A Rust daemon that authenticates against the Ostrom electricity-pricing
//! API, retrieves hourly spot prices and monthly fees for a subscriber's
//! ZIP code, and publishes six derived sensor values (current price,
//! next-hour price, today's low/high, base fee, grid fee) for
//! home-automation consumers.
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of
//! concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `ostrom`: Token lifecycle and spot-price retrieval from the Ostrom API
//! - `series`: Time-indexed in-memory price cache with eviction
//! - `derive`: Pure derivation of the published sensor values
//! - `coordinator`: Refresh cadence, backoff, and snapshot publication
//! - `web`: Read-only HTTP API over the published values

pub mod config;
pub mod coordinator;
pub mod derive;
pub mod error;
pub mod logging;
pub mod ostrom;
pub mod series;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::PollCoordinator;
pub use derive::DerivedSnapshot;
pub use error::{ElektraError, Result};
pub use series::PriceSeriesStore;

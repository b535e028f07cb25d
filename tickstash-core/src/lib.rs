//! tickstash core — daily OHLCV retrieval with a synthetic fallback.
//!
//! - Domain types (bars, tagged series, summaries)
//! - Seeded random-walk generator used when live data is unavailable
//! - Alpha Vantage daily time-series client
//! - CSV snapshot store
//! - Fetch orchestrator with fixed-interval pacing for shared keys

pub mod config;
pub mod data;
pub mod domain;
pub mod rng;
pub mod synthetic;

pub use config::{ConfigError, ProviderConfig, TickstashConfig};
pub use data::{FetchError, FetchOrchestrator, FetchRequest, SnapshotStore};
pub use domain::{DataSource, PriceBar, PriceSeries, SeriesSummary};
pub use synthetic::{SyntheticConfig, SyntheticGenerator, DEFAULT_SYNTHETIC_DAYS};

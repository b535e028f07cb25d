//! Live data retrieval, pacing, snapshots and the fetch-or-fallback driver.

pub mod alphavantage;
pub mod orchestrator;
pub mod provider;
pub mod rate_limit;
pub mod snapshot;

pub use alphavantage::{parse_daily_payload, AlphaVantageClient};
pub use orchestrator::{FetchError, FetchOrchestrator, FetchRequest, FetchSummary};
pub use provider::{ClientError, FetchProgress, Lookback, MarketDataClient, StdoutProgress};
pub use rate_limit::{Pacer, RateLimit, RecordingSleeper, Sleeper, ThreadSleeper};
pub use snapshot::{check_symbol, SnapshotError, SnapshotStore};

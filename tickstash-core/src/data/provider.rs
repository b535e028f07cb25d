//! Market data client trait and structured error types.
//!
//! The MarketDataClient trait abstracts over live data sources so the
//! orchestrator can be driven by stub clients in tests. Clients never
//! propagate failures: every error is logged and reported as "no data",
//! which is the single trigger for the synthetic fallback.

use crate::domain::PriceSeries;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default calendar lookback for live fetches: one year.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

/// Errors raised inside a client before they are normalised to "no data".
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} for {symbol}")]
    Http { symbol: String, status: u16 },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("no data for symbol '{symbol}'")]
    EmptyResult { symbol: String },
}

/// How much history to keep from a live response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookback {
    /// Keep bars on or after `today - n` calendar days.
    Days(u32),
    /// Keep bars on or after a fixed date.
    Since(NaiveDate),
    /// Keep everything the provider returns.
    Full,
}

impl Default for Lookback {
    fn default() -> Self {
        Self::Days(DEFAULT_LOOKBACK_DAYS)
    }
}

impl Lookback {
    /// First date retained relative to `today`, if the window is bounded.
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Days(n) => Some(today - Duration::days(i64::from(*n))),
            Self::Since(date) => Some(*date),
            Self::Full => None,
        }
    }

    /// Pin a relative window to `today` so the client needs no clock.
    pub fn anchored(self, today: NaiveDate) -> Self {
        match self.cutoff(today) {
            Some(date) => Self::Since(date),
            None => Self::Full,
        }
    }
}

/// Trait for live daily time-series sources.
pub trait MarketDataClient: Send + Sync {
    /// Human-readable name of this client.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol, or `None` if nothing usable came back.
    ///
    /// Implementations log the reason for a `None` and must not panic.
    fn fetch_daily(&self, symbol: &str, lookback: Lookback) -> Option<PriceSeries>;
}

/// Progress callback for multi-symbol runs.
pub trait FetchProgress: Send {
    /// Called when starting on a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called once a symbol has a series (or definitively has none).
    fn on_complete(&self, symbol: &str, index: usize, total: usize, series: Option<&PriceSeries>);

    /// Called when the whole batch is done.
    fn on_batch_complete(&self, real: usize, synthetic: usize, missing: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Processing {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        series: Option<&PriceSeries>,
    ) {
        match series {
            Some(s) => println!("  OK: {symbol} ({} bars, {})", s.len(), s.source),
            None => println!("  SKIP: {symbol}: no data"),
        }
    }

    fn on_batch_complete(&self, real: usize, synthetic: usize, missing: usize) {
        println!("\nFetch complete: {real} real, {synthetic} synthetic, {missing} missing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lookback_is_one_year() {
        assert_eq!(Lookback::default(), Lookback::Days(365));
    }

    #[test]
    fn cutoff_subtracts_calendar_days() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            Lookback::Days(365).cutoff(today),
            NaiveDate::from_ymd_opt(2023, 6, 2)
        );
        assert_eq!(Lookback::Full.cutoff(today), None);
    }

    #[test]
    fn anchored_window_ignores_later_today() {
        let pinned = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let later = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let since = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();

        let anchored = Lookback::Days(30).anchored(pinned);
        assert_eq!(anchored, Lookback::Since(since));
        assert_eq!(anchored.cutoff(later), Some(since));
        assert_eq!(Lookback::Full.anchored(pinned), Lookback::Full);
    }

    #[test]
    fn errors_display_cleanly() {
        let err = ClientError::Http {
            symbol: "SPY".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 for SPY");
    }
}

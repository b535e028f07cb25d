//! Fetch orchestrator — live fetch, synthetic fallback, snapshot.
//!
//! Resolution order for each symbol:
//! 1. Ask the client for live data
//! 2. If nothing came back and fallback is allowed → generate synthetic bars
//! 3. Otherwise → `EmptyResult`
//!
//! Whatever series results is written as that day's snapshot before it is
//! returned. Symbols are processed one at a time; a shared-key quota makes
//! parallel fetches pointless.

use super::alphavantage::AlphaVantageClient;
use super::provider::{ClientError, FetchProgress, Lookback, MarketDataClient};
use super::rate_limit::{Pacer, RateLimit};
use super::snapshot::{check_symbol, SnapshotError, SnapshotStore};
use crate::config::{ConfigError, TickstashConfig};
use crate::domain::{DataSource, PriceSeries};
use crate::synthetic::SyntheticGenerator;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no data for '{symbol}' and synthetic fallback is disabled")]
    EmptyResult { symbol: String },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("client setup failed: {0}")]
    ClientSetup(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One symbol's worth of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    /// Calendar days of history.
    pub lookback_days: u32,
    pub allow_fallback: bool,
}

impl FetchRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            lookback_days: super::provider::DEFAULT_LOOKBACK_DAYS,
            allow_fallback: true,
        }
    }

    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }
}

/// Source counts for a multi-symbol run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub real: usize,
    pub synthetic: usize,
    pub missing: usize,
}

impl FetchSummary {
    fn record(&mut self, series: Option<&PriceSeries>) {
        match series.map(|s| s.source) {
            Some(DataSource::Real) => self.real += 1,
            Some(DataSource::Synthetic) => self.synthetic += 1,
            None => self.missing += 1,
        }
    }
}

/// Drives client → generator → store for one or many symbols.
pub struct FetchOrchestrator {
    client: Box<dyn MarketDataClient>,
    generator: SyntheticGenerator,
    store: SnapshotStore,
    pacer: Pacer,
    fallback: bool,
    as_of: Option<NaiveDate>,
}

impl FetchOrchestrator {
    /// Orchestrator with the default generator, no pacing and fallback on.
    pub fn new(client: Box<dyn MarketDataClient>, store: SnapshotStore) -> Self {
        Self {
            client,
            generator: SyntheticGenerator::default(),
            store,
            pacer: Pacer::blocking(RateLimit::disabled()),
            fallback: true,
            as_of: None,
        }
    }

    /// Alpha Vantage-backed orchestrator built from configuration.
    /// Invalid configuration is rejected here rather than at generation time.
    pub fn from_config(config: &TickstashConfig) -> Result<Self, FetchError> {
        config.validate()?;
        let provider = &config.provider;
        let generator = SyntheticGenerator::new(config.synthetic.clone())?;
        let client =
            AlphaVantageClient::new(&provider.base_url, provider.api_key(), provider.timeout())?;
        Ok(Self::new(Box::new(client), SnapshotStore::new(&config.data_dir))
            .with_generator(generator)
            .with_pacer(Pacer::blocking(provider.rate_limit()))
            .with_fallback(config.fallback))
    }

    pub fn with_generator(mut self, generator: SyntheticGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Default fallback flag used by [`fetch_many`](Self::fetch_many).
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Pin "today" (snapshot date and synthetic window end).
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    fn today(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Fetch one symbol, falling back to synthetic data if allowed, and
    /// snapshot the result.
    pub fn fetch_one(&self, req: &FetchRequest) -> Result<PriceSeries, FetchError> {
        let today = self.today();
        let symbol = req.symbol.as_str();
        check_symbol(symbol)?;

        self.pacer.wait_turn();
        let lookback = Lookback::Days(req.lookback_days).anchored(today);
        let live = self.client.fetch_daily(symbol, lookback);

        let series = match live {
            Some(series) => series,
            None if req.allow_fallback => {
                warn!(symbol, client = self.client.name(), "falling back to synthetic data");
                let series = self
                    .generator
                    .generate_until(symbol, req.lookback_days, today);
                info!(symbol, bars = series.len(), "generated synthetic data");
                series
            }
            None => {
                warn!(symbol, "no data and fallback disabled");
                return Err(FetchError::EmptyResult {
                    symbol: symbol.to_string(),
                });
            }
        };

        self.store.save(symbol, &series, today)?;
        Ok(series)
    }

    /// Fetch several symbols sequentially. Symbols with no data are left
    /// out of the result; snapshot failures abort the run.
    pub fn fetch_many<S: AsRef<str>>(
        &self,
        symbols: &[S],
        lookback_days: u32,
    ) -> Result<BTreeMap<String, PriceSeries>, FetchError> {
        self.fetch_many_with_progress(symbols, lookback_days, None)
            .map(|(data, _)| data)
    }

    /// [`fetch_many`](Self::fetch_many) with progress callbacks and a
    /// per-source summary.
    pub fn fetch_many_with_progress<S: AsRef<str>>(
        &self,
        symbols: &[S],
        lookback_days: u32,
        progress: Option<&dyn FetchProgress>,
    ) -> Result<(BTreeMap<String, PriceSeries>, FetchSummary), FetchError> {
        let total = symbols.len();
        let mut data = BTreeMap::new();
        let mut summary = FetchSummary::default();

        for (i, symbol) in symbols.iter().enumerate() {
            let symbol = symbol.as_ref();
            if let Some(p) = progress {
                p.on_start(symbol, i, total);
            }

            let req = FetchRequest::new(symbol)
                .lookback_days(lookback_days)
                .allow_fallback(self.fallback);

            let series = match self.fetch_one(&req) {
                Ok(series) => Some(series),
                Err(FetchError::EmptyResult { .. }) => None,
                Err(e) => return Err(e),
            };

            summary.record(series.as_ref());
            if let Some(p) = progress {
                p.on_complete(symbol, i, total, series.as_ref());
            }
            if let Some(series) = series {
                data.insert(symbol.to_string(), series);
            }
        }

        info!(
            real = summary.real,
            synthetic = summary.synthetic,
            missing = summary.missing,
            "batch complete"
        );
        if let Some(p) = progress {
            p.on_batch_complete(summary.real, summary.synthetic, summary.missing);
        }

        Ok((data, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rate_limit::RecordingSleeper;
    use crate::domain::PriceBar;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct NullClient {
        calls: Arc<AtomicUsize>,
    }

    /// Records the lookback each request carried.
    #[derive(Clone, Default)]
    struct RecordingClient {
        lookbacks: Arc<std::sync::Mutex<Vec<Lookback>>>,
    }

    impl MarketDataClient for RecordingClient {
        fn name(&self) -> &str {
            "recording"
        }

        fn fetch_daily(&self, _symbol: &str, lookback: Lookback) -> Option<PriceSeries> {
            self.lookbacks.lock().unwrap().push(lookback);
            None
        }
    }

    impl MarketDataClient for NullClient {
        fn name(&self) -> &str {
            "null"
        }

        fn fetch_daily(&self, _symbol: &str, _lookback: Lookback) -> Option<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    /// Serves a fixed two-bar series for "LIVE", nothing otherwise.
    struct SelectiveClient;

    impl MarketDataClient for SelectiveClient {
        fn name(&self) -> &str {
            "selective"
        }

        fn fetch_daily(&self, symbol: &str, _lookback: Lookback) -> Option<PriceSeries> {
            (symbol == "LIVE").then(|| {
                let bar = |d: u32, close: f64| PriceBar {
                    date: NaiveDate::from_ymd_opt(2024, 5, d).unwrap(),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000,
                };
                PriceSeries::new(symbol, DataSource::Real, vec![bar(30, 10.0), bar(31, 11.0)])
            })
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn orchestrator(client: Box<dyn MarketDataClient>, dir: &std::path::Path) -> FetchOrchestrator {
        FetchOrchestrator::new(client, SnapshotStore::new(dir)).with_as_of(as_of())
    }

    #[test]
    fn null_client_with_fallback_yields_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(Box::new(NullClient { calls: calls.clone() }), dir.path());

        let series = orch.fetch_one(&FetchRequest::new("XYZ")).unwrap();

        assert_eq!(series.source, DataSource::Synthetic);
        assert!(!series.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(dir.path().join("XYZ_sample_20240603.csv").exists());
    }

    #[test]
    fn null_client_without_fallback_is_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(Box::new(NullClient { calls }), dir.path());

        let err = orch
            .fetch_one(&FetchRequest::new("XYZ").allow_fallback(false))
            .unwrap_err();

        assert!(matches!(err, FetchError::EmptyResult { ref symbol } if symbol == "XYZ"));
        assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[test]
    fn live_data_is_saved_without_sample_marker() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(Box::new(SelectiveClient), dir.path());

        let series = orch.fetch_one(&FetchRequest::new("LIVE")).unwrap();

        assert_eq!(series.source, DataSource::Real);
        assert_eq!(series.len(), 2);
        assert!(dir.path().join("LIVE_20240603.csv").exists());
    }

    #[test]
    fn pacing_waits_between_attempts_only() {
        let dir = tempfile::tempdir().unwrap();
        let sleeper = RecordingSleeper::new();
        let orch = orchestrator(Box::new(SelectiveClient), dir.path())
            .with_pacer(Pacer::new(RateLimit::shared_key(), Box::new(sleeper.clone())));

        orch.fetch_many(&["LIVE", "DEAD"], 30).unwrap();
        assert_eq!(sleeper.pauses(), vec![Duration::from_secs(12)]);

        orch.fetch_one(&FetchRequest::new("LIVE")).unwrap();
        assert_eq!(sleeper.pauses(), vec![Duration::from_secs(12); 2]);
    }

    #[test]
    fn single_paced_fetch_does_not_wait() {
        let dir = tempfile::tempdir().unwrap();
        let sleeper = RecordingSleeper::new();
        let orch = orchestrator(Box::new(SelectiveClient), dir.path())
            .with_pacer(Pacer::new(RateLimit::shared_key(), Box::new(sleeper.clone())));

        orch.fetch_many(&["LIVE"], 30).unwrap();
        assert!(sleeper.pauses().is_empty());
    }

    #[test]
    fn unsafe_symbol_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(Box::new(NullClient { calls: calls.clone() }), dir.path());

        let err = orch.fetch_one(&FetchRequest::new("../XYZ")).unwrap_err();

        assert!(matches!(
            err,
            FetchError::Snapshot(SnapshotError::InvalidSymbol { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn live_cutoff_follows_pinned_date() {
        let dir = tempfile::tempdir().unwrap();
        let client = RecordingClient::default();
        let orch = orchestrator(Box::new(client.clone()), dir.path());

        orch.fetch_one(&FetchRequest::new("XYZ").lookback_days(30)).unwrap();

        let since = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        assert_eq!(*client.lookbacks.lock().unwrap(), vec![Lookback::Since(since)]);
    }

    #[test]
    fn from_config_rejects_invalid_synthetic_settings() {
        let mut config = TickstashConfig::default();
        config.synthetic.min_volume = 5;
        config.synthetic.max_volume = 5;

        let err = FetchOrchestrator::from_config(&config).err().unwrap();
        assert!(matches!(err, FetchError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn fetch_many_skips_missing_when_fallback_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(Box::new(SelectiveClient), dir.path()).with_fallback(false);

        let (data, summary) = orch
            .fetch_many_with_progress(&["LIVE", "DEAD"], 30, None)
            .unwrap();

        assert_eq!(data.len(), 1);
        assert!(data.contains_key("LIVE"));
        assert_eq!(
            summary,
            FetchSummary {
                real: 1,
                synthetic: 0,
                missing: 1
            }
        );
    }

    #[test]
    fn fetch_many_mixes_real_and_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(Box::new(SelectiveClient), dir.path());

        let (data, summary) = orch
            .fetch_many_with_progress(&["LIVE", "DEAD"], 30, None)
            .unwrap();

        assert_eq!(data["LIVE"].source, DataSource::Real);
        assert_eq!(data["DEAD"].source, DataSource::Synthetic);
        assert_eq!(summary.real, 1);
        assert_eq!(summary.synthetic, 1);
    }

    #[test]
    fn snapshot_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let orch = orchestrator(Box::new(SelectiveClient), &blocker);

        let err = orch.fetch_one(&FetchRequest::new("LIVE")).unwrap_err();
        assert!(matches!(err, FetchError::Snapshot(_)));
    }
}

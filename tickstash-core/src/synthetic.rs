//! Synthetic OHLCV generator.
//!
//! Produces a geometric random walk of closing prices with intraday bounds
//! derived from each close. Used as the fallback whenever live data is not
//! available, so every consumer always receives a usable series.
//!
//! Output is a pure function of `(config, symbol, lookback_days, end)`: the
//! RNG is seeded from the symbol, or supplied explicitly by the caller.

use crate::config::ConfigError;
use crate::domain::{is_weekday, round_cents, DataSource, PriceBar, PriceSeries};
use crate::rng::{rng_for_symbol, sample_normal};
use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of calendar days covered by a synthetic series.
pub const DEFAULT_SYNTHETIC_DAYS: u32 = 252;

/// Closing prices never fall below one cent.
pub const PRICE_FLOOR: f64 = 0.01;

/// Parameters of the random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Starting close for symbols without an override.
    pub default_base_price: f64,
    /// Per-symbol starting closes (the benchmark ETF starts lower).
    pub base_prices: BTreeMap<String, f64>,
    /// Mean daily return.
    pub drift: f64,
    /// Standard deviation of daily returns.
    pub volatility: f64,
    /// Half-width of the high/low band as a fraction of the close.
    pub intraday_range: f64,
    /// Inclusive lower bound on daily volume.
    pub min_volume: u64,
    /// Exclusive upper bound on daily volume.
    pub max_volume: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        let mut base_prices = BTreeMap::new();
        base_prices.insert("SPY".to_string(), 100.0);
        Self {
            default_base_price: 150.0,
            base_prices,
            drift: 0.0005,
            volatility: 0.02,
            intraday_range: 0.02,
            min_volume: 1_000_000,
            max_volume: 10_000_000,
        }
    }
}

impl SyntheticConfig {
    /// Starting close for `symbol`.
    pub fn base_price(&self, symbol: &str) -> f64 {
        self.base_prices
            .get(symbol)
            .copied()
            .unwrap_or(self.default_base_price)
    }

    /// Check the parameters can drive the walk.
    pub fn validate(&self) -> Result<(), String> {
        let positive = |p: f64| p.is_finite() && p > 0.0;
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;

        if !positive(self.default_base_price) {
            return Err(format!(
                "default_base_price must be positive and finite, got {}",
                self.default_base_price
            ));
        }
        if let Some((sym, price)) = self.base_prices.iter().find(|(_, p)| !positive(**p)) {
            return Err(format!(
                "base price for {sym} must be positive and finite, got {price}"
            ));
        }
        if !self.drift.is_finite() || !non_negative(self.volatility) {
            return Err(format!(
                "drift must be finite and volatility non-negative, got {} / {}",
                self.drift, self.volatility
            ));
        }
        if !non_negative(self.intraday_range) {
            return Err(format!(
                "intraday_range must be non-negative, got {}",
                self.intraday_range
            ));
        }
        if self.min_volume >= self.max_volume {
            return Err(format!(
                "volume range is empty: [{}, {})",
                self.min_volume, self.max_volume
            ));
        }
        Ok(())
    }
}

/// Weekdays in the calendar window `[end - lookback_days, end]`.
///
/// A window holding only weekend days (lookback 0 or 1 ending on a
/// weekend) yields the preceding Friday instead, so the result is never
/// empty.
pub fn weekday_window(lookback_days: u32, end: NaiveDate) -> Vec<NaiveDate> {
    let start = end - Duration::days(i64::from(lookback_days));
    let days: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_weekday(*d))
        .collect();
    if !days.is_empty() {
        return days;
    }

    let mut friday = start;
    while !is_weekday(friday) {
        friday -= Duration::days(1);
    }
    vec![friday]
}

/// Seeded random-walk series generator.
///
/// Only built from a validated config, so generation itself cannot fail.
#[derive(Debug, Clone, Default)]
pub struct SyntheticGenerator {
    config: SyntheticConfig,
}

impl SyntheticGenerator {
    /// Generator for `config`, rejected if [`SyntheticConfig::validate`] fails.
    pub fn new(config: SyntheticConfig) -> Result<Self, ConfigError> {
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("synthetic: {e}")))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Generate a series ending today.
    pub fn generate(&self, symbol: &str, lookback_days: u32) -> PriceSeries {
        let today = chrono::Local::now().date_naive();
        self.generate_until(symbol, lookback_days, today)
    }

    /// Generate a series ending at `end`, seeded from the symbol.
    pub fn generate_until(&self, symbol: &str, lookback_days: u32, end: NaiveDate) -> PriceSeries {
        let mut rng = rng_for_symbol(symbol);
        self.generate_with_rng(symbol, lookback_days, end, &mut rng)
    }

    /// Generate a series ending at `end` from a caller-supplied RNG.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        symbol: &str,
        lookback_days: u32,
        end: NaiveDate,
        rng: &mut R,
    ) -> PriceSeries {
        let cfg = &self.config;
        let dates = weekday_window(lookback_days, end);

        // All returns are drawn up front; the first one is unused because
        // day 0 closes at the base price.
        let returns: Vec<f64> = dates
            .iter()
            .map(|_| sample_normal(&mut *rng, cfg.drift, cfg.volatility))
            .collect();

        let mut closes = Vec::with_capacity(dates.len());
        let mut price = cfg.base_price(symbol);
        for (i, ret) in returns.iter().enumerate() {
            if i > 0 {
                price = (price * (1.0 + ret)).max(PRICE_FLOOR);
            }
            closes.push(price);
        }

        let bars = dates
            .iter()
            .zip(&closes)
            .enumerate()
            .map(|(i, (&date, &close))| {
                let band = close * cfg.intraday_range;
                let high = close + rng.gen::<f64>() * band;
                let low = close - rng.gen::<f64>() * band;
                let open = if i > 0 { closes[i - 1] } else { close };
                let volume = rng.gen_range(cfg.min_volume..cfg.max_volume);

                PriceBar {
                    date,
                    open: round_cents(open),
                    high: round_cents(high.max(open).max(close)),
                    low: round_cents(low.min(open).min(close)),
                    close: round_cents(close),
                    volume,
                }
            })
            .collect();

        PriceSeries::new(symbol, DataSource::Synthetic, bars)
    }
}

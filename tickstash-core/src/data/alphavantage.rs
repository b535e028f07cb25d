//! Alpha Vantage daily time-series client.
//!
//! Issues a single `TIME_SERIES_DAILY` request with `outputsize=full` and
//! converts the date-keyed payload into a sorted series. Provider notices,
//! HTTP failures and malformed payloads are all logged and reported as
//! "no data"; there are no retries.

use super::provider::{ClientError, Lookback, MarketDataClient};
use crate::domain::{DataSource, PriceBar, PriceSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// The public key shared by every anonymous caller. Subject to a global
/// 5-requests-per-minute limit.
pub const DEMO_API_KEY: &str = "demo";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// True for keys whose quota is shared with other callers.
pub fn is_shared_key(api_key: &str) -> bool {
    api_key.is_empty() || api_key.eq_ignore_ascii_case(DEMO_API_KEY)
}

/// Top-level `TIME_SERIES_DAILY` response. Every field is optional because
/// the provider answers failures with HTTP 200 and a notice field instead.
#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, DailyFields>>,
}

#[derive(Debug, Deserialize)]
struct DailyFields {
    #[serde(rename = "1. open")]
    open: Option<Value>,
    #[serde(rename = "2. high")]
    high: Option<Value>,
    #[serde(rename = "3. low")]
    low: Option<Value>,
    #[serde(rename = "4. close")]
    close: Option<Value>,
    #[serde(rename = "5. volume")]
    volume: Option<Value>,
}

fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    let v = match value? {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn coerce_volume(value: Option<&Value>) -> Option<u64> {
    let v = coerce_f64(value)?;
    (v >= 0.0).then_some(v.round() as u64)
}

impl DailyFields {
    fn into_bar(self, date: NaiveDate) -> Option<PriceBar> {
        Some(PriceBar {
            date,
            open: coerce_f64(self.open.as_ref())?,
            high: coerce_f64(self.high.as_ref())?,
            low: coerce_f64(self.low.as_ref())?,
            close: coerce_f64(self.close.as_ref())?,
            volume: coerce_volume(self.volume.as_ref())?,
        })
    }
}

/// Parse a `TIME_SERIES_DAILY` body into a series.
///
/// Entries whose date or fields cannot be coerced are dropped. When
/// `cutoff` is set, bars before it are discarded. An empty result is an
/// error so callers see a single "no data" condition.
pub fn parse_daily_payload(
    symbol: &str,
    body: &str,
    cutoff: Option<NaiveDate>,
) -> Result<PriceSeries, ClientError> {
    let resp: DailyResponse = serde_json::from_str(body).map_err(|e| {
        ClientError::ResponseFormat(format!("failed to parse response for {symbol}: {e}"))
    })?;

    if let Some(msg) = resp.error_message {
        return Err(ClientError::Provider(msg));
    }
    if let Some(msg) = resp.note.or(resp.information) {
        return Err(ClientError::Provider(msg));
    }

    let time_series = resp.time_series.unwrap_or_default();
    let total = time_series.len();

    let bars: Vec<PriceBar> = time_series
        .into_iter()
        .filter_map(|(key, fields)| {
            let date = NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").ok()?;
            fields.into_bar(date)
        })
        .collect();

    let dropped = total - bars.len();
    if dropped > 0 {
        debug!(symbol, dropped, "dropped malformed daily entries");
    }

    let mut series = PriceSeries::new(symbol, DataSource::Real, bars);
    if let Some(cutoff) = cutoff {
        series.retain_since(cutoff);
    }

    if series.is_empty() {
        return Err(ClientError::EmptyResult {
            symbol: symbol.to_string(),
        });
    }
    Ok(series)
}

/// Alpha Vantage client.
pub struct AlphaVantageClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Client against the public endpoint with the shared demo key.
    pub fn demo() -> Result<Self, ClientError> {
        Self::new(DEFAULT_BASE_URL, DEMO_API_KEY, DEFAULT_TIMEOUT)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn uses_shared_key(&self) -> bool {
        is_shared_key(&self.api_key)
    }

    fn try_fetch(&self, symbol: &str, lookback: Lookback) -> Result<PriceSeries, ClientError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| ClientError::Network(format!("failed to read body for {symbol}: {e}")))?;

        let today = chrono::Local::now().date_naive();
        parse_daily_payload(symbol, &body, lookback.cutoff(today))
    }
}

impl MarketDataClient for AlphaVantageClient {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch_daily(&self, symbol: &str, lookback: Lookback) -> Option<PriceSeries> {
        info!(symbol, "attempting to fetch real data");
        match self.try_fetch(symbol, lookback) {
            Ok(series) => {
                info!(symbol, bars = series.len(), "fetched real data");
                Some(series)
            }
            Err(e) => {
                warn!(symbol, error = %e, "no real data");
                None
            }
        }
    }
}

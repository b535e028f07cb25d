//! PriceSeries — an ordered run of daily bars for one symbol, tagged with
//! where it came from.

use super::bar::PriceBar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Live provider response.
    Real,
    /// Generated fallback data.
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Daily bars for one symbol, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub source: DataSource,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from bars in any order.
    ///
    /// Bars are sorted by date; on duplicate dates the first occurrence in
    /// sorted order wins.
    pub fn new(symbol: impl Into<String>, source: DataSource, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self {
            symbol: symbol.into(),
            source,
            bars,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Keep only bars on or after `cutoff`.
    pub fn retain_since(&mut self, cutoff: NaiveDate) {
        self.bars.retain(|b| b.date >= cutoff);
    }

    /// Headline statistics, or `None` for an empty series.
    pub fn summary(&self) -> Option<SeriesSummary> {
        let first = self.bars.first()?;
        let last = self.bars.last()?;

        let (min_close, max_close) = self
            .bars
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
                (lo.min(b.close), hi.max(b.close))
            });
        let total_volume: u128 = self.bars.iter().map(|b| b.volume as u128).sum();
        let average_volume = total_volume as f64 / self.bars.len() as f64;
        let total_return_pct = if first.close > 0.0 {
            (last.close / first.close - 1.0) * 100.0
        } else {
            0.0
        };

        Some(SeriesSummary {
            symbol: self.symbol.clone(),
            source: self.source,
            bar_count: self.bars.len(),
            start_date: first.date,
            end_date: last.date,
            min_close,
            max_close,
            first_close: first.close,
            last_close: last.close,
            total_return_pct,
            average_volume,
        })
    }
}

/// Summary statistics printed after each fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub symbol: String,
    pub source: DataSource,
    pub bar_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub min_close: f64,
    pub max_close: f64,
    pub first_close: f64,
    pub last_close: f64,
    pub total_return_pct: f64,
    pub average_volume: f64,
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}): {} days of data",
            self.symbol, self.source, self.bar_count
        )?;
        writeln!(f, "  Date Range:     {} to {}", self.start_date, self.end_date)?;
        writeln!(
            f,
            "  Price Range:    ${:.2} - ${:.2}",
            self.min_close, self.max_close
        )?;
        writeln!(
            f,
            "  Start / End:    ${:.2} -> ${:.2} ({:+.2}%)",
            self.first_close, self.last_close, self.total_return_pct
        )?;
        write!(f, "  Average Volume: {:.0}", self.average_volume)
    }
}

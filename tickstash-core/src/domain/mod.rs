//! Domain types: bars and series.

pub mod bar;
pub mod series;

pub use bar::{is_weekday, round_cents, PriceBar};
pub use series::{DataSource, PriceSeries, SeriesSummary};

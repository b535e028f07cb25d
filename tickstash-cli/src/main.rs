//! tickstash CLI — fetch, sample and inspect daily price snapshots.
//!
//! Commands:
//! - `fetch` — live daily data with synthetic fallback, saved as CSV
//! - `sample` — synthetic data only (no network)
//! - `show` — summarise an existing snapshot file
//! - `demo` — smoke run over SPY, AAPL and MSFT

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tickstash_core::data::StdoutProgress;
use tickstash_core::{
    FetchOrchestrator, PriceSeries, SnapshotStore, SyntheticGenerator, TickstashConfig,
    DEFAULT_SYNTHETIC_DAYS,
};
use tracing_subscriber::EnvFilter;

const DEMO_SYMBOLS: [&str; 3] = ["SPY", "AAPL", "MSFT"];

#[derive(Parser)]
#[command(
    name = "tickstash",
    about = "tickstash CLI — daily OHLCV snapshots with synthetic fallback"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily data, falling back to synthetic data when unavailable.
    Fetch {
        /// Symbols to fetch (e.g., SPY AAPL MSFT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Calendar days of history. Defaults to the config value (365).
        #[arg(long)]
        lookback_days: Option<u32>,

        /// Skip symbols with no live data instead of generating synthetic data.
        #[arg(long, default_value_t = false)]
        no_fallback: bool,

        /// Snapshot directory. Defaults to the config value (./data).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// API key. Overrides the config file and TICKSTASH_API_KEY.
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Generate synthetic data only, without touching the network.
    Sample {
        /// Symbols to generate.
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Calendar days covered by each series.
        #[arg(long, default_value_t = DEFAULT_SYNTHETIC_DAYS)]
        days: u32,

        /// Last day of the window (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Snapshot directory. Defaults to the config value (./data).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print summary statistics for a snapshot file.
    Show {
        /// Path to a snapshot CSV.
        file: PathBuf,
    },
    /// Fetch SPY, AAPL and MSFT with fallback and print their summaries.
    Demo {
        /// Snapshot directory. Defaults to the config value (./data).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            symbols,
            lookback_days,
            no_fallback,
            data_dir,
            api_key,
        } => {
            let mut config = config;
            if let Some(days) = lookback_days {
                config.lookback_days = days;
            }
            if no_fallback {
                config.fallback = false;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(key) = api_key {
                config.provider.api_key = Some(key);
            }
            run_fetch(&config, &symbols)
        }
        Commands::Sample {
            symbols,
            days,
            end,
            data_dir,
        } => {
            let dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            run_sample(&config, &symbols, days, end.as_deref(), &dir)
        }
        Commands::Show { file } => run_show(&file),
        Commands::Demo { data_dir } => {
            let mut config = config;
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            let symbols: Vec<String> = DEMO_SYMBOLS.iter().map(|s| s.to_string()).collect();
            run_fetch(&config, &symbols)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "tickstash_core=info",
        1 => "tickstash_core=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<TickstashConfig> {
    let config = match path {
        Some(p) => TickstashConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display()))?,
        None => TickstashConfig::default(),
    };
    let config = config.with_env_overrides();
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        lookback_days = config.lookback_days,
        fallback = config.fallback,
        "configuration resolved"
    );
    Ok(config)
}

fn run_fetch(config: &TickstashConfig, symbols: &[String]) -> Result<()> {
    let orchestrator = FetchOrchestrator::from_config(config)?;

    let (data, summary) = orchestrator.fetch_many_with_progress(
        symbols,
        config.lookback_days,
        Some(&StdoutProgress),
    )?;

    for series in data.values() {
        print_summary(series);
    }

    if summary.missing > 0 {
        let missing: Vec<&str> = symbols
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !data.contains_key(*s))
            .collect();
        anyhow::bail!("no data for: {}", missing.join(", "));
    }
    Ok(())
}

fn run_sample(
    config: &TickstashConfig,
    symbols: &[String],
    days: u32,
    end: Option<&str>,
    data_dir: &Path,
) -> Result<()> {
    let end_date = end
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--end must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let today = chrono::Local::now().date_naive();

    let generator = SyntheticGenerator::new(config.synthetic.clone())?;
    let store = SnapshotStore::new(data_dir);

    for symbol in symbols {
        let series = generator.generate_until(symbol, days, end_date);
        let path = store.save(symbol, &series, today)?;
        print_summary(&series);
        println!("  Saved to:       {}", path.display());
    }
    Ok(())
}

fn run_show(file: &Path) -> Result<()> {
    let series = SnapshotStore::load(file)
        .with_context(|| format!("reading snapshot {}", file.display()))?;
    print_summary(&series);
    Ok(())
}

fn print_summary(series: &PriceSeries) {
    match series.summary() {
        Some(summary) => println!("\n{summary}"),
        None => println!("\n{}: no bars", series.symbol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_parses_overrides() {
        let cli = Cli::parse_from([
            "tickstash",
            "fetch",
            "SPY",
            "AAPL",
            "--lookback-days",
            "30",
            "--no-fallback",
            "--api-key",
            "secret",
        ]);
        match cli.command {
            Commands::Fetch {
                symbols,
                lookback_days,
                no_fallback,
                data_dir,
                api_key,
            } => {
                assert_eq!(symbols, vec!["SPY", "AAPL"]);
                assert_eq!(lookback_days, Some(30));
                assert!(no_fallback);
                assert!(data_dir.is_none());
                assert_eq!(api_key.as_deref(), Some("secret"));
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn fetch_requires_a_symbol() {
        assert!(Cli::try_parse_from(["tickstash", "fetch"]).is_err());
    }

    #[test]
    fn sample_defaults_to_a_trading_year() {
        let cli = Cli::parse_from(["tickstash", "-v", "sample", "MSFT"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Sample { days, end, .. } => {
                assert_eq!(days, DEFAULT_SYNTHETIC_DAYS);
                assert!(end.is_none());
            }
            _ => panic!("expected sample"),
        }
    }

    #[test]
    fn sample_writes_snapshots_and_show_reads_them() {
        let dir = tempfile::tempdir().unwrap();
        let config = TickstashConfig::default();
        run_sample(
            &config,
            &["AAPL".to_string()],
            30,
            Some("2024-06-03"),
            dir.path(),
        )
        .unwrap();

        let files: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("AAPL_sample_"), "{name}");
        run_show(&files[0]).unwrap();
    }

    #[test]
    fn sample_rejects_bad_end_date() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_sample(
            &TickstashConfig::default(),
            &["AAPL".to_string()],
            30,
            Some("06/03/2024"),
            dir.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }
}

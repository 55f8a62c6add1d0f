//! Command-line driver for the riskcore engine.
//!
//! Reads a portfolio from a JSON file, runs one of the five analysis
//! kinds against it through a [`riskcore_engine::RiskEngine`], and
//! prints either a human-readable report or a JSON envelope.
//!
//! There is no real market data source in this workspace, so every
//! invocation runs against [`riskcore_engine::FixturePriceProvider`]'s
//! deterministic synthetic series.

mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use riskcore_core::result::OptimizationKind;
use riskcore_core::types::{AssetClass, Date, DateRange, Portfolio, ProxySet, Ticker};
use riskcore_engine::{FixturePriceProvider, RiskEngine, RiskEngineBuilder};
use riskcore_scenario::ScenarioSpec;
use riskcore_traits::reference::StaticReferenceMappings;
use riskcore_traits::EngineConfig;
use tokio_util::sync::CancellationToken;

use config::CliConfig;

/// Portfolio risk and factor analysis, from the command line.
#[derive(Parser, Debug)]
#[command(name = "riskcore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (cache backend, default exchange).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Emit the raw JSON envelope instead of the text report.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run full risk analysis (metrics, decomposition, limit checks).
    Analyze(PortfolioArgs),
    /// Apply a weight or factor-shock scenario and compare before/after.
    Scenario(ScenarioArgs),
    /// Solve a convex optimization program over the portfolio's tickers.
    Optimize(OptimizeArgs),
    /// Compute the composite risk score.
    Score(PortfolioArgs),
    /// Fit a standalone single-ticker factor model.
    Stock(StockArgs),
}

#[derive(Args, Debug)]
struct PortfolioArgs {
    /// Path to a JSON file holding a serialized `Portfolio`.
    #[arg(long)]
    portfolio: PathBuf,
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    #[command(flatten)]
    portfolio: PortfolioArgs,

    /// Comma-separated `<ticker>:<delta>` entries, e.g.
    /// `NVDA:-200bp,V:+200bp` or `NVDA:1.5%`.
    #[arg(long)]
    delta: String,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    #[command(flatten)]
    portfolio: PortfolioArgs,

    /// Which program to solve.
    #[arg(long, value_enum)]
    kind: OptimizeKind,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OptimizeKind {
    MinVar,
    MaxRet,
}

impl From<OptimizeKind> for OptimizationKind {
    fn from(kind: OptimizeKind) -> Self {
        match kind {
            OptimizeKind::MinVar => OptimizationKind::MinVar,
            OptimizeKind::MaxRet => OptimizationKind::MaxRet,
        }
    }
}

#[derive(Args, Debug)]
struct StockArgs {
    /// Ticker to fit a standalone factor model for.
    #[arg(long)]
    ticker: String,

    /// Market factor proxy ticker.
    #[arg(long, default_value = "SPY")]
    market_proxy: String,

    /// Momentum factor proxy ticker.
    #[arg(long, default_value = "MTUM")]
    momentum_proxy: String,

    /// Value factor proxy ticker.
    #[arg(long, default_value = "VTV")]
    value_proxy: String,

    /// Industry factor proxy ticker.
    #[arg(long)]
    industry_proxy: String,

    /// Start of the analysis window, `YYYY-MM-DD`.
    #[arg(long)]
    range_start: String,

    /// End of the analysis window, `YYYY-MM-DD`.
    #[arg(long)]
    range_end: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("riskcore=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("riskcore=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli_config = match &cli.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    match cli.command {
        Command::Analyze(args) => {
            let portfolio = load_portfolio(&args.portfolio)?;
            let engine = build_engine(&cli_config, portfolio.range.clone()).await?;
            let token = CancellationToken::new();
            let result = engine.analyze(&portfolio, &token).await?;
            print_result(&result, cli.json)?;
        }
        Command::Scenario(args) => {
            let portfolio = load_portfolio(&args.portfolio.portfolio)?;
            let engine = build_engine(&cli_config, portfolio.range.clone()).await?;
            let spec = ScenarioSpec::parse_delta(&args.delta)?;
            let token = CancellationToken::new();
            let result = engine.run_scenario(&portfolio, &spec, &token).await?;
            print_result(&result, cli.json)?;
        }
        Command::Optimize(args) => {
            let portfolio = load_portfolio(&args.portfolio.portfolio)?;
            let engine = build_engine(&cli_config, portfolio.range.clone()).await?;
            let token = CancellationToken::new();
            let result = engine.optimize(&portfolio, args.kind.into(), &token).await?;
            print_result(&result, cli.json)?;
        }
        Command::Score(args) => {
            let portfolio = load_portfolio(&args.portfolio)?;
            let engine = build_engine(&cli_config, portfolio.range.clone()).await?;
            let token = CancellationToken::new();
            let result = engine.risk_score(&portfolio, &token).await?;
            print_result(&result, cli.json)?;
        }
        Command::Stock(args) => {
            let range = parse_range(&args.range_start, &args.range_end)?;
            let engine = build_engine(&cli_config, range.clone()).await?;
            let ticker = Ticker::new(args.ticker);
            let proxies = ProxySet {
                market: Some(Ticker::new(args.market_proxy)),
                momentum: Some(Ticker::new(args.momentum_proxy)),
                value: Some(Ticker::new(args.value_proxy)),
                industry: Some(Ticker::new(args.industry_proxy)),
                subindustry_peers: Vec::new(),
                asset_class: Some(AssetClass::Equity),
            };
            let token = CancellationToken::new();
            let result = engine.analyze_stock(&ticker, proxies, range, &token).await?;
            print_result(&result, cli.json)?;
        }
    }

    Ok(())
}

fn load_portfolio(path: &std::path::Path) -> anyhow::Result<Portfolio> {
    let content = std::fs::read_to_string(path)?;
    let portfolio: Portfolio = serde_json::from_str(&content)?;
    Ok(portfolio)
}

fn parse_range(start: &str, end: &str) -> anyhow::Result<DateRange> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    Ok(DateRange::new(start, end)?)
}

fn parse_date(s: &str) -> anyhow::Result<Date> {
    let parts: Vec<&str> = s.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        anyhow::bail!("expected YYYY-MM-DD, got {s:?}");
    };
    Ok(Date::from_ymd(year.parse()?, month.parse()?, day.parse()?)?)
}

async fn build_engine(cli_config: &CliConfig, range: DateRange) -> anyhow::Result<RiskEngine> {
    let mut engine_config = EngineConfig::with_defaults(range);
    cli_config.engine.apply(&mut engine_config);
    let mut builder = RiskEngineBuilder::new()
        .with_config(engine_config)
        .with_price_provider(FixturePriceProvider::new())
        .with_reference_mappings(StaticReferenceMappings::with_defaults())
        .with_default_exchange(cli_config.default_exchange.clone());

    if let Some(redb_path) = &cli_config.redb_path {
        let store = riskcore_ext_redb::RedbBlobStore::open(redb_path)?;
        builder = builder.with_blob_store(store);
    } else if let Some(cache_dir) = &cli_config.cache_dir {
        let store = riskcore_ext_file::FileBlobStore::open(cache_dir).await?;
        builder = builder.with_blob_store(store);
    }

    Ok(builder.build()?)
}

fn print_result(result: &riskcore_core::result::AnalysisResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_api()?)?);
    } else {
        print!("{}", result.to_report());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_iso_form() {
        let date = parse_date("2024-03-31").unwrap();
        assert_eq!(date.to_string(), "2024-03-31");
    }

    #[test]
    fn test_parse_date_rejects_malformed_input() {
        assert!(parse_date("2024/03/31").is_err());
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn test_parse_range_orders_start_before_end() {
        let range = parse_range("2019-01-31", "2024-03-31").unwrap();
        assert_eq!(range.start(), Date::from_ymd(2019, 1, 31).unwrap());
        assert_eq!(range.end(), Date::from_ymd(2024, 3, 31).unwrap());
    }
}

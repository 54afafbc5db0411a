//! CLI argument definitions for ferroquote.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Latest quote for one symbol |
//! | `quotes` | Latest quotes for several symbols, fetched concurrently |
//! | `history` | Daily (or coarser) close series for a period |
//! | `search` | Symbol/name search |
//! | `indices` | S&P 500, NASDAQ, and Dow Jones proxies |
//! | `news` | General market headlines, or company headlines with `SYMBOL` |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--offline` | `false` | Never touch the network; serve synthetic data |
//! | `--timeout-ms` | `8000` | Per-provider request timeout |
//!
//! # Examples
//!
//! ```bash
//! ferroquote quote AAPL
//! ferroquote quotes AAPL MSFT NVDA --pretty
//! ferroquote history TSLA --period 6M
//! ferroquote search "micro"
//! ferroquote news AAPL --from 2024-05-01 --to 2024-05-31
//! ```

use clap::{Args, Parser, Subcommand};

/// Resilient multi-provider market data from the command line.
///
/// Every command prints JSON. When all providers fail, results are
/// synthetic and flagged as such rather than reported as errors.
#[derive(Debug, Parser)]
#[command(
    name = "ferroquote",
    author,
    version,
    about = "Resilient multi-provider market data CLI",
    long_about = "ferroquote fetches quotes, price history, and symbol search results from \
Finnhub, Yahoo Finance, and Alpha Vantage, falling back provider by provider.\n\
\n\
Credentials are read from FERROQUOTE_FINNHUB_API_KEY / FINNHUB_API_KEY and \
FERROQUOTE_ALPHAVANTAGE_API_KEY / ALPHAVANTAGE_API_KEY; demo keys are used otherwise."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Do not contact any provider; every result is synthetic.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Per-provider request timeout in milliseconds. Defaults to
    /// FERROQUOTE_TIMEOUT_MS or 8000.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the latest quote for a symbol.
    ///
    /// # Examples
    ///
    ///   ferroquote quote AAPL
    ///   ferroquote quote AAPL --no-cache
    Quote(QuoteArgs),

    /// Fetch quotes for several symbols concurrently, in input order.
    Quotes(QuotesArgs),

    /// Fetch a historical close-price series.
    ///
    /// # Examples
    ///
    ///   ferroquote history AAPL
    ///   ferroquote history MSFT --period ytd
    History(HistoryArgs),

    /// Search for symbols by ticker or company name.
    Search(SearchArgs),

    /// Show the major US market index proxies.
    Indices,

    /// Fetch market headlines, or headlines about one company.
    ///
    /// # Examples
    ///
    ///   ferroquote news
    ///   ferroquote news TSLA --from 2024-05-01 --limit 5
    News(NewsArgs),
}

/// Arguments for the `quote` command.
#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Market symbol (e.g., AAPL).
    pub symbol: String,

    /// Skip the quote cache for this lookup.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
}

/// Arguments for the `quotes` command.
#[derive(Debug, Args)]
pub struct QuotesArgs {
    /// One or more market symbols.
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Market symbol to fetch history for.
    pub symbol: String,

    /// Period token: 1W, 1M, 3M, 6M, 1Y, YTD, 3Y, 5Y, 10Y.
    ///
    /// Aliases such as `1wk`, `12m`, or `1yr` are accepted; unknown tokens
    /// mean one month.
    #[arg(long, default_value = "1M")]
    pub period: String,
}

/// Arguments for the `search` command.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-form search query (symbol or company name).
    pub query: String,
}

/// Arguments for the `news` command.
#[derive(Debug, Args)]
pub struct NewsArgs {
    /// Company symbol; omit for general market news.
    pub symbol: Option<String>,

    /// First day of the company news window (YYYY-MM-DD). Defaults to a
    /// week before `--to`.
    #[arg(long)]
    pub from: Option<String>,

    /// Last day of the company news window (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub to: Option<String>,

    /// Maximum number of headlines (30 general, 20 company by default).
    #[arg(long)]
    pub limit: Option<usize>,
}

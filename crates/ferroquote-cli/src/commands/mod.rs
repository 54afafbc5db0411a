mod history;
mod indices;
mod news;
mod quote;
mod quotes;
mod search;

use std::time::Instant;

use ferroquote_core::{MarketData, MarketDataConfig, Symbol};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub command: &'static str,
    pub data: Value,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

impl CommandResult {
    pub fn ok(command: &'static str, data: Value) -> Self {
        Self {
            command,
            data,
            warnings: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let market = MarketData::builder().with_config(config_for(cli)).build();
    let started = Instant::now();

    let result = match &cli.command {
        Command::Quote(args) => quote::run(args, &market).await?,
        Command::Quotes(args) => quotes::run(args, &market).await?,
        Command::History(args) => history::run(args, &market).await?,
        Command::Search(args) => search::run(args, &market).await?,
        Command::Indices => indices::run(&market).await?,
        Command::News(args) => news::run(args, &market).await?,
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(result.with_latency(latency_ms))
}

fn config_for(cli: &Cli) -> MarketDataConfig {
    let mut config = MarketDataConfig::from_env().with_offline(cli.offline);
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    config
}

fn parse_symbol(raw: &str) -> Result<Symbol, CliError> {
    Symbol::parse(raw).map_err(CliError::from)
}

fn synthetic_warning(what: &str, symbol: &Symbol) -> String {
    format!("{what} for {symbol} is synthetic: every provider failed")
}

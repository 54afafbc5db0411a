use ferroquote_core::{MarketData, Quote};
use serde::Serialize;

use crate::cli::QuotesArgs;
use crate::error::CliError;

use super::{parse_symbol, synthetic_warning, CommandResult};

#[derive(Debug, Serialize)]
struct QuotesResponseData {
    quotes: Vec<Quote>,
}

pub async fn run(args: &QuotesArgs, market: &MarketData) -> Result<CommandResult, CliError> {
    let symbols = args
        .symbols
        .iter()
        .map(|raw| parse_symbol(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let quotes = market.get_multiple_quotes(&symbols).await;
    let warnings = quotes
        .iter()
        .filter(|quote| quote.is_fallback)
        .map(|quote| synthetic_warning("quote", &quote.symbol))
        .collect::<Vec<_>>();

    let data = serde_json::to_value(QuotesResponseData { quotes })?;
    Ok(CommandResult::ok("quotes", data).with_warnings(warnings))
}

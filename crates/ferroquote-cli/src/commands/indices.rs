use ferroquote_core::{IndexSnapshot, MarketData};
use serde::Serialize;

use crate::error::CliError;

use super::{synthetic_warning, CommandResult};

#[derive(Debug, Serialize)]
struct IndicesResponseData {
    indices: Vec<IndexSnapshot>,
}

pub async fn run(market: &MarketData) -> Result<CommandResult, CliError> {
    let indices = market.get_market_indices().await;
    let warnings = indices
        .iter()
        .filter(|index| index.is_fallback)
        .map(|index| synthetic_warning("index", &index.symbol))
        .collect::<Vec<_>>();

    let data = serde_json::to_value(IndicesResponseData { indices })?;
    Ok(CommandResult::ok("indices", data).with_warnings(warnings))
}

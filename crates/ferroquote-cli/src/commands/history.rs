use ferroquote_core::{HistoricalPoint, MarketData, Period, Symbol};
use serde::Serialize;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::{parse_symbol, CommandResult};

#[derive(Debug, Serialize)]
struct HistoryResponseData {
    symbol: Symbol,
    period: Period,
    points: Vec<HistoricalPoint>,
}

pub async fn run(args: &HistoryArgs, market: &MarketData) -> Result<CommandResult, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    let period = match Period::parse_known(&args.period) {
        Some(period) => period,
        None => {
            tracing::warn!(token = %args.period, "unknown period token; using 1M");
            Period::default()
        }
    };

    let points = market.get_historical_data(&symbol, period).await;
    let data = serde_json::to_value(HistoryResponseData {
        symbol,
        period,
        points,
    })?;
    Ok(CommandResult::ok("history", data))
}

use serde::Serialize;

use ferroquote_core::{MarketData, SearchResult};

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SearchResponseData {
    query: String,
    results: Vec<SearchResult>,
}

pub async fn run(args: &SearchArgs, market: &MarketData) -> Result<CommandResult, CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let results = market.search(query).await;
    let data = serde_json::to_value(SearchResponseData {
        query: query.to_owned(),
        results,
    })?;
    Ok(CommandResult::ok("search", data))
}

use ferroquote_core::{
    Clock, MarketData, NewsItem, NewsRequest, Symbol, SystemClock, DEFAULT_COMPANY_NEWS_LIMIT,
    DEFAULT_GENERAL_NEWS_LIMIT,
};
use serde::Serialize;
use time::macros::format_description;
use time::{Date, Duration};

use crate::cli::NewsArgs;
use crate::error::CliError;

use super::{parse_symbol, CommandResult};

/// Window used for company news when `--from` is omitted.
const DEFAULT_COMPANY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
struct NewsResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<Symbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    items: Vec<NewsItem>,
}

pub async fn run(args: &NewsArgs, market: &MarketData) -> Result<CommandResult, CliError> {
    run_at(args, market, SystemClock.today()).await
}

async fn run_at(
    args: &NewsArgs,
    market: &MarketData,
    today: Date,
) -> Result<CommandResult, CliError> {
    let data = match &args.symbol {
        Some(raw) => {
            let symbol = parse_symbol(raw)?;
            let to = args.to.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let from = match args.from.as_deref() {
                Some(raw) => parse_date(raw)?,
                None => to - Duration::days(DEFAULT_COMPANY_WINDOW_DAYS),
            };
            let limit = args.limit.unwrap_or(DEFAULT_COMPANY_NEWS_LIMIT);
            // Rejects an inverted range before any request is made.
            NewsRequest::company(symbol.clone(), from, to, limit)?;

            let items = market.get_company_news(&symbol, from, to, limit).await;
            NewsResponseData {
                symbol: Some(symbol),
                from: Some(from.to_string()),
                to: Some(to.to_string()),
                items,
            }
        }
        None => {
            if args.from.is_some() || args.to.is_some() {
                return Err(CliError::Command(String::from("--from and --to require a symbol")));
            }
            let limit = args.limit.unwrap_or(DEFAULT_GENERAL_NEWS_LIMIT);
            NewsResponseData {
                symbol: None,
                from: None,
                to: None,
                items: market.get_general_news(limit).await,
            }
        }
    };

    let empty = data.items.is_empty();
    let result = CommandResult::ok("news", serde_json::to_value(data)?);
    Ok(if empty {
        result.with_warning("no headlines: the news feed returned nothing or was unavailable")
    } else {
        result
    })
}

fn parse_date(raw: &str) -> Result<Date, CliError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).map_err(|error| {
        CliError::Command(format!("invalid date `{raw}` (expected YYYY-MM-DD): {error}"))
    })
}

use ferroquote_core::{MarketData, QuoteOptions};

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::{parse_symbol, synthetic_warning, CommandResult};

pub async fn run(args: &QuoteArgs, market: &MarketData) -> Result<CommandResult, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    let options = QuoteOptions {
        bypass_cache: args.no_cache,
    };

    let quote = market.get_quote(&symbol, options).await;
    let mut result = CommandResult::ok("quote", serde_json::to_value(&quote)?);
    if quote.is_fallback {
        result = result.with_warning(synthetic_warning("quote", &symbol));
    }
    Ok(result)
}

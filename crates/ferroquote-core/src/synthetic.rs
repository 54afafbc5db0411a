//! Degraded data used only after every live provider has failed.
//!
//! Quotes are fully derived from a small base price/change table. History is
//! a 31-day trailing window of prices jittered within ±5% of the base price;
//! the jitter is seeded from the symbol and the current day, so repeated calls
//! on the same day return the same series.

use time::{Date, Duration};

use crate::{HistoricalPoint, Quote, QuoteValues, SearchResult, Symbol, UtcDateTime};

/// Base price and absolute change for well-known symbols.
const FALLBACK_PRICES: [(&str, f64, f64); 6] = [
    ("AAPL", 175.43, 1.23),
    ("MSFT", 338.11, -0.87),
    ("GOOGL", 125.37, 2.15),
    ("TSLA", 245.67, -3.21),
    ("AMZN", 142.83, 0.95),
    ("NVDA", 456.78, 4.32),
];

const DEFAULT_PRICE: f64 = 100.0;

pub const SYNTHETIC_VOLUME: u64 = 1_000_000;

/// Days before today covered by a synthetic series; the series has one more
/// point than this because today is included.
pub const SYNTHETIC_HISTORY_DAYS: i64 = 30;

const MAX_VARIATION: f64 = 0.05;

/// Curated list served when symbol search is unavailable.
const STATIC_SEARCH: [(&str, &str); 6] = [
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("GOOGL", "Alphabet Inc."),
    ("TSLA", "Tesla, Inc."),
    ("AMZN", "Amazon.com, Inc."),
    ("NVDA", "NVIDIA Corporation"),
];

/// `(price, change)` for `symbol`, or `(100, 0)` when it is not in the table.
pub fn fallback_base(symbol: &Symbol) -> (f64, f64) {
    FALLBACK_PRICES
        .iter()
        .find(|(ticker, _, _)| *ticker == symbol.as_str())
        .map(|(_, price, change)| (*price, *change))
        .unwrap_or((DEFAULT_PRICE, 0.0))
}

pub fn synthetic_quote(symbol: &Symbol, as_of: UtcDateTime) -> Quote {
    let (price, change) = fallback_base(symbol);
    let values = QuoteValues {
        price,
        change,
        change_percent: change / price * 100.0,
        volume: SYNTHETIC_VOLUME,
        previous_close: price - change,
        open: price - change * 0.5,
        high: price + change.abs(),
        low: price - change.abs(),
    };
    Quote::synthetic(symbol.clone(), values, as_of)
}

pub fn synthetic_history(symbol: &Symbol, today: Date) -> Vec<HistoricalPoint> {
    let (base_price, _) = fallback_base(symbol);
    let mut rng = fastrand::Rng::with_seed(history_seed(symbol, today));

    (0..=SYNTHETIC_HISTORY_DAYS)
        .rev()
        .filter_map(|days_back| {
            let date = today.checked_sub(Duration::days(days_back))?;
            let variation = (rng.f64() - 0.5) * 2.0 * MAX_VARIATION;
            HistoricalPoint::new(date, base_price * (1.0 + variation)).ok()
        })
        .collect()
}

/// Static entries whose symbol or name contains `query`, case-insensitively.
pub fn fallback_search(query: &str) -> Vec<SearchResult> {
    STATIC_SEARCH
        .iter()
        .map(|(ticker, name)| {
            SearchResult::new(
                Symbol::parse(ticker).expect("static search symbols are valid"),
                *name,
                "Equity",
                "United States",
            )
        })
        .filter(|result| result.matches(query))
        .collect()
}

fn history_seed(symbol: &Symbol, today: Date) -> u64 {
    let symbol_seed = symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    });
    symbol_seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ today.to_julian_day() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[test]
    fn known_symbol_quote_is_derived_from_table() {
        let quote = synthetic_quote(&symbol("TSLA"), UtcDateTime::now());

        assert!(quote.is_fallback);
        assert_eq!(quote.source, None);
        assert_eq!(quote.price, 245.67);
        assert_eq!(quote.change, -3.21);
        assert!((quote.change_percent - (-3.21 / 245.67 * 100.0)).abs() < 1e-12);
        assert!((quote.previous_close - 248.88).abs() < 1e-9);
        assert!((quote.open - 247.275).abs() < 1e-9);
        assert!((quote.high - 248.88).abs() < 1e-9);
        assert!((quote.low - 242.46).abs() < 1e-9);
        assert_eq!(quote.volume, SYNTHETIC_VOLUME);
    }

    #[test]
    fn unknown_symbol_quote_uses_default_base() {
        let quote = synthetic_quote(&symbol("UNKNOWN_TICKER"), UtcDateTime::now());

        assert_eq!(quote.price, 100.0);
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_percent, 0.0);
        assert_eq!(quote.previous_close, 100.0);
        assert_eq!(quote.open, 100.0);
        assert_eq!(quote.high, 100.0);
        assert_eq!(quote.low, 100.0);
    }

    #[test]
    fn history_is_thirty_one_ascending_days_ending_today_within_band() {
        let today = date!(2024 - 03 - 01);
        let series = synthetic_history(&symbol("AAPL"), today);

        assert_eq!(series.len(), 31);
        assert_eq!(series[0].date, date!(2024 - 01 - 31));
        assert_eq!(series[30].date, today);
        assert!(series.windows(2).all(|pair| pair[0].date < pair[1].date));
        for point in &series {
            assert!(point.price >= 175.43 * 0.95 && point.price <= 175.43 * 1.05);
        }
    }

    #[test]
    fn history_is_reproducible_within_a_day() {
        let today = date!(2024 - 03 - 01);
        let first = synthetic_history(&symbol("MSFT"), today);
        let second = synthetic_history(&symbol("MSFT"), today);
        assert_eq!(first, second);

        let other_symbol = synthetic_history(&symbol("NVDA"), today);
        assert_ne!(
            first.iter().map(|p| p.price / 338.11).collect::<Vec<_>>(),
            other_symbol.iter().map(|p| p.price / 456.78).collect::<Vec<_>>()
        );
    }

    #[test]
    fn fallback_search_filters_by_symbol_or_name() {
        let by_name = fallback_search("corp");
        assert_eq!(
            by_name
                .iter()
                .map(|result| result.symbol.as_str())
                .collect::<Vec<_>>(),
            vec!["MSFT", "NVDA"]
        );

        let by_symbol = fallback_search("goog");
        assert_eq!(by_symbol.len(), 1);
        assert_eq!(by_symbol[0].name, "Alphabet Inc.");
        assert_eq!(by_symbol[0].region, "United States");

        assert!(fallback_search("zzz").is_empty());
    }
}

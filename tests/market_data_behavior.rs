//! Behavior tests for the `MarketData` facade: caching, provider fallback,
//! batching, history, search, and news, all against scripted upstreams.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use ferroquote_core::{
    MarketData, MarketDataConfig, Period, ProviderId, QuoteOptions, DEFAULT_GENERAL_NEWS_LIMIT,
    MAX_SEARCH_RESULTS,
};
use support::{
    clock, finnhub_quote, market, symbol, yahoo_chart, ScriptedHttpClient, NOW,
};
use time::macros::date;

// =============================================================================
// Quote cache
// =============================================================================

#[tokio::test]
async fn when_quote_is_requested_twice_within_ttl_only_one_network_call_is_made() {
    // Given: a working primary provider
    let client = Arc::new(
        ScriptedHttpClient::new().respond("quote?symbol=AAPL", &finnhub_quote(190.0, 188.0)),
    );
    let clock = clock();
    let market = market(client.clone(), clock.clone());

    // When: the same symbol is requested twice, ten minutes apart
    let first = market.get_quote(&symbol("AAPL"), QuoteOptions::default()).await;
    clock.advance(Duration::from_secs(10 * 60));
    let second = market.get_quote(&symbol("AAPL"), QuoteOptions::default()).await;

    // Then: the second call is served from the cache
    assert_eq!(first, second);
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn when_ttl_elapses_the_next_quote_hits_the_network_again() {
    let client = Arc::new(
        ScriptedHttpClient::new().respond("quote?symbol=AAPL", &finnhub_quote(190.0, 188.0)),
    );
    let clock = clock();
    let market = market(client.clone(), clock.clone());

    market.get_quote(&symbol("AAPL"), QuoteOptions::default()).await;
    clock.advance(Duration::from_secs(31 * 60));
    market.get_quote(&symbol("AAPL"), QuoteOptions::default()).await;

    assert_eq!(client.calls_matching("quote?symbol=AAPL"), 2);
}

#[tokio::test]
async fn when_cache_is_bypassed_the_fresh_quote_replaces_the_cached_one() {
    let client = Arc::new(
        ScriptedHttpClient::new().respond("quote?symbol=AAPL", &finnhub_quote(190.0, 188.0)),
    );
    let market = market(client.clone(), clock());

    market.get_quote(&symbol("AAPL"), QuoteOptions::default()).await;
    market.get_quote(&symbol("AAPL"), QuoteOptions::bypass_cache()).await;
    market.get_quote(&symbol("AAPL"), QuoteOptions::default()).await;

    assert_eq!(client.calls().len(), 2);
    assert_eq!(market.cache().len().await, 1);
}

// =============================================================================
// Provider fallback
// =============================================================================

#[tokio::test]
async fn when_primary_provider_fails_the_secondary_quote_is_returned() {
    // Given: Finnhub is down, Yahoo answers
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond_status("finnhub.io", 502, "bad gateway")
            .respond("chart/MSFT", &yahoo_chart(415.0, 410.0, &[], &[])),
    );
    let market = market(client.clone(), clock());

    // When
    let quote = market.get_quote(&symbol("MSFT"), QuoteOptions::default()).await;

    // Then: Yahoo's data, not a synthetic quote, and Alpha Vantage is never contacted
    assert!(!quote.is_fallback);
    assert_eq!(quote.source, Some(ProviderId::Yahoo));
    assert_eq!(quote.price, 415.0);
    assert_eq!(quote.change, 5.0);
    assert_eq!(client.calls_matching("alphavantage.co"), 0);
}

#[tokio::test]
async fn when_every_provider_fails_a_flagged_synthetic_quote_is_returned() {
    let client = Arc::new(ScriptedHttpClient::new());
    let market = market(client.clone(), clock());

    let quote = market.get_quote(&symbol("AAPL"), QuoteOptions::default()).await;

    assert!(quote.is_fallback);
    assert_eq!(quote.source, None);
    assert_eq!(quote.price, 175.43);
    assert_eq!(quote.change, 1.23);
    assert!((quote.previous_close - (175.43 - 1.23)).abs() < 1e-9);
    assert!((quote.open - (175.43 - 0.615)).abs() < 1e-9);
    assert!((quote.high - (175.43 + 1.23)).abs() < 1e-9);
    assert!((quote.low - (175.43 - 1.23)).abs() < 1e-9);
    assert_eq!(client.calls().len(), 3, "each provider is tried exactly once");
}

// =============================================================================
// Batch quotes
// =============================================================================

#[tokio::test]
async fn when_batch_is_requested_results_follow_input_order_even_if_middle_is_slowest() {
    // Given: MSFT's upstream answers last
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("quote?symbol=AAPL", &finnhub_quote(190.0, 188.0))
            .respond_after(
                "quote?symbol=MSFT",
                Duration::from_millis(300),
                &finnhub_quote(415.0, 410.0),
            )
            .respond("quote?symbol=NVDA", &finnhub_quote(900.0, 880.0)),
    );
    let market = market(client.clone(), clock());
    let symbols = [symbol("AAPL"), symbol("MSFT"), symbol("NVDA")];

    // When
    let started = Instant::now();
    let quotes = market.get_multiple_quotes(&symbols).await;
    let elapsed = started.elapsed();

    // Then: input order, live data, and roughly one round trip of latency
    assert_eq!(
        quotes.iter().map(|quote| quote.symbol.as_str()).collect::<Vec<_>>(),
        vec!["AAPL", "MSFT", "NVDA"]
    );
    assert!(quotes.iter().all(|quote| !quote.is_fallback));
    assert_eq!(quotes[1].price, 415.0);
    assert!(elapsed < Duration::from_millis(900), "batch ran sequentially: {elapsed:?}");
}

#[tokio::test]
async fn when_one_symbol_exhausts_every_provider_the_rest_of_the_batch_is_unaffected() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("quote?symbol=AAPL", &finnhub_quote(190.0, 188.0))
            .respond("quote?symbol=NVDA", &finnhub_quote(900.0, 880.0)),
    );
    let market = market(client, clock());

    let quotes = market
        .get_multiple_quotes(&[symbol("AAPL"), symbol("UNKNOWN_TICKER"), symbol("NVDA")])
        .await;

    assert_eq!(quotes.len(), 3);
    assert!(!quotes[0].is_fallback);
    assert!(quotes[1].is_fallback);
    assert_eq!(quotes[1].symbol.as_str(), "UNKNOWN_TICKER");
    assert!(!quotes[2].is_fallback);
}

#[tokio::test]
async fn when_batch_is_empty_no_quotes_are_returned() {
    let market = market(Arc::new(ScriptedHttpClient::new()), clock());

    assert!(market.get_multiple_quotes(&[]).await.is_empty());
}

// =============================================================================
// Historical data
// =============================================================================

#[tokio::test]
async fn when_history_is_fetched_the_series_is_ascending_and_backfilled_to_today() {
    // Given: Yahoo candles through last Friday, out of order, plus a live quote
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond(
                "chart/AAPL?range=1mo&interval=1d",
                &yahoo_chart(
                    191.0,
                    190.0,
                    &[1717165800, 1716993000, 1717079400],
                    &[190.0, 188.5, 189.25],
                ),
            )
            .respond("quote?symbol=AAPL", &finnhub_quote(192.0, 190.0)),
    );
    let market = market(client.clone(), clock());

    // When
    let history = market.get_historical_data(&symbol("AAPL"), Period::OneMonth).await;

    // Then
    assert_eq!(
        history
            .iter()
            .map(|point| (point.date, point.price))
            .collect::<Vec<_>>(),
        vec![
            (date!(2024 - 05 - 29), 188.5),
            (date!(2024 - 05 - 30), 189.25),
            (date!(2024 - 05 - 31), 190.0),
            (date!(2024 - 06 - 03), 192.0),
        ]
    );
    assert_eq!(client.calls_matching("stock/candle"), 0, "secondary tier untouched");
}

#[tokio::test]
async fn when_primary_history_fails_the_secondary_window_is_used() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond(
                "chart/AAPL?range",
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
            )
            .respond(
                "stock/candle?symbol=AAPL&resolution=D",
                r#"{"s":"ok","t":[1716993000,1717079400,1717165800],"c":[188.5,189.25,190.0]}"#,
            ),
    );
    let market = market(client.clone(), clock());

    let history = market.get_historical_data(&symbol("AAPL"), Period::OneWeek).await;

    // No live quote scripted, so the backfill is skipped and the series ends Friday.
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].date, date!(2024 - 05 - 31));
    assert!(history.windows(2).all(|pair| pair[0].date < pair[1].date));
}

#[tokio::test]
async fn when_every_history_provider_fails_aapl_gets_a_synthetic_month() {
    let market = market(Arc::new(ScriptedHttpClient::new()), clock());

    let history = market
        .get_historical_data(&symbol("AAPL"), Period::from_token("1M"))
        .await;

    assert_eq!(history.len(), 31);
    assert_eq!(history[30].date, NOW.date());
    assert!(history.windows(2).all(|pair| pair[0].date < pair[1].date));
    for point in &history {
        assert!(point.price > 0.0);
        assert!((point.price - 175.43).abs() <= 175.43 * 0.05 + 1e-9);
    }
}

#[tokio::test]
async fn when_unknown_symbol_history_fails_the_series_is_anchored_at_default_price() {
    let market = market(Arc::new(ScriptedHttpClient::new()), clock());

    let history = market
        .get_historical_data(&symbol("UNKNOWN_TICKER"), Period::TenYears)
        .await;

    assert_eq!(history.len(), 31);
    assert!(history
        .iter()
        .all(|point| point.price >= 95.0 - 1e-9 && point.price <= 105.0 + 1e-9));
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn when_search_provider_returns_many_matches_results_are_capped() {
    let matches = (0..40)
        .map(|index| {
            format!(
                r#"{{"1. symbol":"T{index}","2. name":"Test {index}","3. type":"Equity","4. region":"United States"}}"#
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("SYMBOL_SEARCH", &format!(r#"{{"bestMatches":[{matches}]}}"#)),
    );
    let market = market(client, clock());

    let results = market.search("test").await;

    assert_eq!(results.len(), MAX_SEARCH_RESULTS);
    assert_eq!(results[0].symbol.as_str(), "T0");
}

#[tokio::test]
async fn when_search_provider_fails_the_static_list_is_filtered() {
    let client = Arc::new(ScriptedHttpClient::new().fail("SYMBOL_SEARCH"));
    let market = market(client, clock());

    let results = market.search("Micro").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].symbol.as_str(), "MSFT");
    assert!(market.search("no such company").await.is_empty());
}

// =============================================================================
// Market indices and offline mode
// =============================================================================

#[tokio::test]
async fn when_indices_are_requested_each_benchmark_is_fetched_fresh() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("quote?symbol=SPY", &finnhub_quote(530.0, 520.0))
            .respond("quote?symbol=QQQ", &finnhub_quote(450.0, 450.0))
            .respond("quote?symbol=DIA", &finnhub_quote(390.0, 400.0)),
    );
    let market = market(client.clone(), clock());

    market.get_market_indices().await;
    let indices = market.get_market_indices().await;

    assert_eq!(client.calls().len(), 6, "indices bypass the cache");
    assert_eq!(indices[0].name, "S&P 500");
    assert!((indices[0].change - 10.0 / 520.0 * 100.0).abs() < 1e-9);
    assert_eq!(indices[1].change, 0.0);
    assert!(indices[2].change < 0.0);
}

#[tokio::test]
async fn when_offline_no_request_leaves_the_process_and_results_are_synthetic() {
    let client = Arc::new(ScriptedHttpClient::new());
    let market = MarketData::builder()
        .with_config(MarketDataConfig::default().with_offline(true))
        .with_http_client(client.clone())
        .with_clock(clock())
        .build();

    let quote = market.get_quote(&symbol("NVDA"), QuoteOptions::default()).await;
    let history = market.get_historical_data(&symbol("NVDA"), Period::OneYear).await;
    let results = market.search("nvidia").await;

    assert!(quote.is_fallback);
    assert_eq!(quote.price, 456.78);
    assert_eq!(history.len(), 31);
    assert_eq!(results[0].symbol.as_str(), "NVDA");
    assert!(client.calls().is_empty());
}

// =============================================================================
// Rejected requests do not poison a provider
// =============================================================================

const YAHOO_NOT_FOUND: &str =
    r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

#[tokio::test]
async fn when_yahoo_rejects_unknown_tickers_later_history_still_comes_from_yahoo() {
    // Given: Yahoo answers 404 for three unknown tickers and real candles for AAPL
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond_status("chart/BAD", 404, YAHOO_NOT_FOUND)
            .respond(
                "chart/AAPL?range=1mo&interval=1d",
                &yahoo_chart(
                    191.0,
                    190.0,
                    &[1717165800, 1716993000, 1717079400],
                    &[190.0, 188.5, 189.25],
                ),
            )
            .respond("quote?symbol=AAPL", &finnhub_quote(192.0, 190.0)),
    );
    let market = market(client.clone(), clock());

    for ticker in ["BAD1", "BAD2", "BAD3"] {
        let history = market.get_historical_data(&symbol(ticker), Period::OneMonth).await;
        assert_eq!(history.len(), 31, "{ticker} falls back to a synthetic month");
    }

    // When
    let history = market
        .get_historical_data(&symbol("AAPL"), Period::from_token("1M"))
        .await;

    // Then
    assert_eq!(client.calls_matching("chart/AAPL?range=1mo"), 1);
    assert_eq!(
        history.iter().map(|point| point.price).collect::<Vec<_>>(),
        vec![188.5, 189.25, 190.0, 192.0]
    );
}

#[tokio::test]
async fn when_finnhub_refuses_candles_its_quotes_are_still_used() {
    // Given: Finnhub forbids candles but serves quotes
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond_status(
                "stock/candle",
                403,
                r#"{"error":"You don't have access to this resource."}"#,
            )
            .respond("quote?symbol=MSFT", &finnhub_quote(415.0, 410.0)),
    );
    let market = market(client.clone(), clock());

    for _ in 0..3 {
        market.get_historical_data(&symbol("MSFT"), Period::OneWeek).await;
    }
    assert_eq!(client.calls_matching("stock/candle"), 3, "refusals never skip the endpoint");

    // When
    let quote = market.get_quote(&symbol("MSFT"), QuoteOptions::default()).await;

    // Then
    assert!(!quote.is_fallback);
    assert_eq!(quote.source, Some(ProviderId::Finnhub));
    assert_eq!(quote.price, 415.0);
}

#[tokio::test]
async fn when_a_batch_mixes_unknown_and_valid_tickers_the_valid_one_is_live() {
    // Given: Yahoo rejects three unknown tickers and serves AAPL; nothing else answers
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond_status("chart/NOPE", 404, YAHOO_NOT_FOUND)
            .respond("chart/AAPL", &yahoo_chart(190.0, 188.0, &[], &[])),
    );
    let market = market(client, clock());

    // When
    let quotes = market
        .get_multiple_quotes(&[
            symbol("NOPE1"),
            symbol("NOPE2"),
            symbol("NOPE3"),
            symbol("AAPL"),
        ])
        .await;

    // Then
    assert_eq!(quotes.len(), 4);
    assert!(quotes[..3].iter().all(|quote| quote.is_fallback));
    assert!(!quotes[3].is_fallback);
    assert_eq!(quotes[3].source, Some(ProviderId::Yahoo));
    assert_eq!(quotes[3].price, 190.0);
}

// =============================================================================
// News
// =============================================================================

#[tokio::test]
async fn when_general_news_is_requested_incomplete_items_are_dropped_and_the_feed_is_capped() {
    let items = (1..=40)
        .map(|id| {
            let headline = if id % 10 == 0 {
                String::new()
            } else {
                format!("Story {id}")
            };
            format!(
                r#"{{"id":{id},"headline":"{headline}","source":"Wire","url":"https://news.test/{id}","datetime":{}}}"#,
                1_717_400_000 + id
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    let client = Arc::new(
        ScriptedHttpClient::new().respond("news?category=general", &format!("[{items}]")),
    );
    let market = market(client.clone(), clock());

    let news = market.get_general_news(DEFAULT_GENERAL_NEWS_LIMIT).await;

    assert_eq!(news.len(), DEFAULT_GENERAL_NEWS_LIMIT);
    assert!(news.iter().all(|item| !item.title.is_empty()));
    assert_eq!(news[8].id, 9);
    assert_eq!(news[9].id, 11, "item 10 has no headline");
    assert_eq!(client.calls_matching("finnhub.io"), 1);
}

#[tokio::test]
async fn when_company_news_is_requested_the_range_is_sent_and_items_name_the_symbol() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "company-news?symbol=AAPL&from=2024-05-27&to=2024-06-03",
        r#"[{"id":7,"headline":"Apple event","source":"Bloomberg","url":"https://news.test/7","datetime":1717400000,"related":""}]"#,
    ));
    let market = market(client, clock());

    let news = market
        .get_company_news(&symbol("AAPL"), date!(2024 - 05 - 27), NOW.date(), 20)
        .await;

    assert_eq!(news.len(), 1);
    assert_eq!(news[0].related, "AAPL");
    assert_eq!(news[0].source, "Bloomberg");
}

#[tokio::test]
async fn when_the_news_feed_fails_an_empty_list_is_returned() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond_status("news?category=general", 500, "")
            .respond("company-news", "<html>maintenance</html>"),
    );
    let market = market(client, clock());

    assert!(market.get_general_news(10).await.is_empty());
    assert!(market
        .get_company_news(&symbol("TSLA"), date!(2024 - 05 - 01), NOW.date(), 10)
        .await
        .is_empty());
}


//! # Market Data Facade
//!
//! The public retrieval operations. None of them fail: when every live
//! provider is exhausted the caller receives clearly flagged synthetic data
//! (`is_fallback == true` for quotes), the static search list, or an empty
//! news feed.
//!
//! | Operation | Chain | Degradation |
//! |-----------|-------|-------------|
//! | [`MarketData::get_quote`] | cache, then Finnhub → Yahoo → Alpha Vantage | synthetic quote |
//! | [`MarketData::get_multiple_quotes`] | one task per symbol | synthetic quote per failed symbol |
//! | [`MarketData::get_historical_data`] | Yahoo → Finnhub → Alpha Vantage, plus live backfill | synthetic 31-day series |
//! | [`MarketData::search`] | Alpha Vantage | filtered static list |
//! | [`MarketData::get_market_indices`] | quotes for SPY, QQQ, DIA | synthetic quote per index |
//! | [`MarketData::get_general_news`] | Finnhub | empty list |
//! | [`MarketData::get_company_news`] | Finnhub | empty list |

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use time::Date;
use tracing::{debug, info, warn};

use crate::adapters::{AlphaVantageAdapter, FinnhubAdapter, YahooAdapter};
use crate::cache::QuoteCache;
use crate::clock::{Clock, SystemClock};
use crate::config::MarketDataConfig;
use crate::data_source::{DataSource, NewsRequest, SearchRequest, MAX_SEARCH_RESULTS};
use crate::http_client::{HttpClient, NoopHttpClient, ReqwestHttpClient};
use crate::routing::{SourceRouter, SourceStrategy};
use crate::synthetic::{fallback_search, synthetic_history, synthetic_quote};
use crate::{HistoricalPoint, NewsItem, Period, Quote, SearchResult, Symbol};

/// Benchmarks reported by [`MarketData::get_market_indices`], as `(ticker, display name)`.
pub const MARKET_INDICES: [(&str, &str); 3] = [
    ("SPY", "S&P 500"),
    ("QQQ", "NASDAQ"),
    ("DIA", "Dow Jones"),
];

/// Per-call quote options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteOptions {
    /// Skip the cache lookup. A successful fetch is still written back.
    pub bypass_cache: bool,
}

impl QuoteOptions {
    pub const fn bypass_cache() -> Self {
        Self { bypass_cache: true }
    }
}

/// Headline number for one market benchmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSnapshot {
    pub name: String,
    pub symbol: Symbol,
    pub value: f64,
    /// Percent change, copied from the quote's `change_percent`.
    pub change: f64,
    pub is_fallback: bool,
}

struct Inner {
    router: SourceRouter,
    cache: QuoteCache,
    clock: Arc<dyn Clock>,
}

/// Resilient quote, history, and search retrieval.
///
/// Cloning is cheap; clones share the router, adapters, and cache.
#[derive(Clone)]
pub struct MarketData {
    inner: Arc<Inner>,
}

impl MarketData {
    pub fn builder() -> MarketDataBuilder {
        MarketDataBuilder::default()
    }

    /// Facade over the live providers configured from the environment.
    pub fn from_env() -> Self {
        Self::builder()
            .with_config(MarketDataConfig::from_env())
            .build()
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.inner.cache
    }

    pub fn router(&self) -> &SourceRouter {
        &self.inner.router
    }

    /// Current quote for `symbol`; synthetic when every provider fails.
    pub async fn get_quote(&self, symbol: &Symbol, options: QuoteOptions) -> Quote {
        if !options.bypass_cache {
            if let Some(quote) = self.inner.cache.get(symbol).await {
                return quote;
            }
        }

        match self
            .inner
            .router
            .route_quote(symbol, &SourceStrategy::Default)
            .await
        {
            Ok(success) => {
                debug!(
                    symbol = %symbol,
                    source = %success.selected_source,
                    latency_ms = success.latency_ms,
                    "quote fetched"
                );
                self.inner
                    .cache
                    .put(symbol.clone(), success.data.clone())
                    .await;
                success.data
            }
            Err(failure) => {
                warn!(
                    symbol = %symbol,
                    attempts = failure.errors.len(),
                    "all quote sources failed; serving synthetic quote"
                );
                synthetic_quote(symbol, self.inner.clock.now_utc())
            }
        }
    }

    /// Quotes for every symbol, fetched concurrently and returned in input order.
    pub async fn get_multiple_quotes(&self, symbols: &[Symbol]) -> Vec<Quote> {
        let tasks = symbols
            .iter()
            .cloned()
            .map(|symbol| {
                let this = self.clone();
                tokio::spawn(
                    async move { this.get_quote(&symbol, QuoteOptions::default()).await },
                )
            })
            .collect::<Vec<_>>();

        join_all(tasks)
            .await
            .into_iter()
            .zip(symbols)
            .map(|(outcome, symbol)| match outcome {
                Ok(quote) => quote,
                Err(error) => {
                    warn!(symbol = %symbol, %error, "quote task aborted; serving synthetic quote");
                    synthetic_quote(symbol, self.inner.clock.now_utc())
                }
            })
            .collect()
    }

    /// Ascending close-price series for `period`, ending today when a live
    /// price is available. Falls back to a synthetic trailing month.
    pub async fn get_historical_data(
        &self,
        symbol: &Symbol,
        period: Period,
    ) -> Vec<HistoricalPoint> {
        let now = self.inner.clock.now();
        match self
            .inner
            .router
            .route_candles(symbol, period, now, &SourceStrategy::Default)
            .await
        {
            Ok(success) => {
                debug!(
                    symbol = %symbol,
                    %period,
                    source = %success.selected_source,
                    points = success.data.len(),
                    "history fetched"
                );
                self.backfill_today(symbol, success.data).await
            }
            Err(failure) => {
                warn!(
                    symbol = %symbol,
                    %period,
                    attempts = failure.errors.len(),
                    "all history sources failed; serving synthetic series"
                );
                synthetic_history(symbol, self.inner.clock.today())
            }
        }
    }

    /// Appends today's live price when the provider's last candle is older.
    /// Best effort: a synthetic live quote leaves the series untouched.
    async fn backfill_today(
        &self,
        symbol: &Symbol,
        mut series: Vec<HistoricalPoint>,
    ) -> Vec<HistoricalPoint> {
        let today = self.inner.clock.today();
        let stale = series.last().is_some_and(|last| last.date < today);
        if !stale {
            return series;
        }

        let live = self.get_quote(symbol, QuoteOptions::bypass_cache()).await;
        if live.is_fallback {
            debug!(symbol = %symbol, "no live quote for backfill");
            return series;
        }

        match HistoricalPoint::new(today, live.price) {
            Ok(point) => series.push(point),
            Err(error) => debug!(symbol = %symbol, %error, "live price unusable for backfill"),
        }
        series
    }

    /// Ticker/name matches, at most [`MAX_SEARCH_RESULTS`]. A blank query
    /// yields no results.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let request = match SearchRequest::new(query) {
            Ok(request) => request,
            Err(_) => return Vec::new(),
        };

        let mut results = match self
            .inner
            .router
            .route_search(&request, &SourceStrategy::Default)
            .await
        {
            Ok(success) => success.data,
            Err(failure) => {
                warn!(
                    query = %request.query,
                    attempts = failure.errors.len(),
                    "search sources failed; filtering static list"
                );
                fallback_search(&request.query)
            }
        };
        results.truncate(MAX_SEARCH_RESULTS);
        results
    }

    /// SPY, QQQ, and DIA fetched concurrently, bypassing the cache.
    pub async fn get_market_indices(&self) -> Vec<IndexSnapshot> {
        let lookups = MARKET_INDICES
            .iter()
            .copied()
            .filter_map(|(ticker, name)| {
                let symbol = Symbol::parse(ticker).ok()?;
                Some(async move {
                    let quote = self.get_quote(&symbol, QuoteOptions::bypass_cache()).await;
                    IndexSnapshot {
                        name: name.to_owned(),
                        symbol,
                        value: quote.price,
                        change: quote.change_percent,
                        is_fallback: quote.is_fallback,
                    }
                })
            })
            .collect::<Vec<_>>();

        join_all(lookups).await
    }

    /// Latest general market headlines, at most `limit`. Empty when the feed
    /// is unavailable.
    pub async fn get_general_news(&self, limit: usize) -> Vec<NewsItem> {
        self.fetch_news(NewsRequest::general(limit)).await
    }

    /// Headlines about `symbol` published between `from` and `to` inclusive,
    /// at most `limit`. An inverted range or an unavailable feed yields an
    /// empty list.
    pub async fn get_company_news(
        &self,
        symbol: &Symbol,
        from: Date,
        to: Date,
        limit: usize,
    ) -> Vec<NewsItem> {
        match NewsRequest::company(symbol.clone(), from, to, limit) {
            Ok(request) => self.fetch_news(request).await,
            Err(error) => {
                warn!(symbol = %symbol, %error, "company news request rejected");
                Vec::new()
            }
        }
    }

    async fn fetch_news(&self, request: NewsRequest) -> Vec<NewsItem> {
        match self
            .inner
            .router
            .route_news(&request, &SourceStrategy::Default)
            .await
        {
            Ok(success) => {
                debug!(
                    source = %success.selected_source,
                    items = success.data.len(),
                    "news fetched"
                );
                success.data
            }
            Err(failure) => {
                warn!(attempts = failure.errors.len(), "news sources failed; returning no items");
                Vec::new()
            }
        }
    }
}

/// Assembles a [`MarketData`] from configuration or from explicit sources.
#[derive(Default)]
pub struct MarketDataBuilder {
    config: Option<MarketDataConfig>,
    clock: Option<Arc<dyn Clock>>,
    http_client: Option<Arc<dyn HttpClient>>,
    sources: Option<Vec<Arc<dyn DataSource>>>,
}

impl MarketDataBuilder {
    pub fn with_config(mut self, config: MarketDataConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Transport shared by the default adapters. Ignored in offline mode.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Replaces the default adapters entirely.
    pub fn with_sources(mut self, sources: Vec<Arc<dyn DataSource>>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn build(self) -> MarketData {
        let config = self.config.unwrap_or_default();
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let sources = match self.sources {
            Some(sources) => sources,
            None => default_sources(&config, self.http_client, Arc::clone(&clock)),
        };

        info!(
            sources = sources.len(),
            offline = config.offline,
            demo_keys = config.uses_demo_keys(),
            "market data ready"
        );

        MarketData {
            inner: Arc::new(Inner {
                router: SourceRouter::new(sources),
                cache: QuoteCache::with_clock(config.cache_ttl, Arc::clone(&clock)),
                clock,
            }),
        }
    }
}

fn default_sources(
    config: &MarketDataConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Arc<dyn Clock>,
) -> Vec<Arc<dyn DataSource>> {
    let http_client: Arc<dyn HttpClient> = match http_client {
        _ if config.offline => Arc::new(NoopHttpClient),
        Some(client) => client,
        None => Arc::new(ReqwestHttpClient::new()),
    };

    vec![
        Arc::new(
            FinnhubAdapter::new(Arc::clone(&http_client), config.finnhub_api_key.clone())
                .with_timeout_ms(config.timeout_ms)
                .with_clock(Arc::clone(&clock)),
        ),
        Arc::new(
            YahooAdapter::new(Arc::clone(&http_client))
                .with_timeout_ms(config.timeout_ms)
                .with_clock(Arc::clone(&clock)),
        ),
        Arc::new(
            AlphaVantageAdapter::new(http_client, config.alphavantage_api_key.clone())
                .with_timeout_ms(config.timeout_ms)
                .with_clock(clock),
        ),
    ]
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use super::{empty_series, parse_json, unix_date, Upstream};
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::clock::Clock;
use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, HealthStatus, NewsRequest, NewsScope, SearchRequest,
    SourceError, SourceFuture,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::normalizer::{NativeSpan, PeriodMapping};
use crate::throttling::QuotaGuard;
use crate::{
    normalize_series, HistoricalPoint, NewsItem, ProviderId, Quote, QuoteValues, SearchResult,
    Symbol, UtcDateTime,
};

const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub adapter: primary quote source, secondary candle source, sole news
/// source.
///
/// The API key travels in the `X-Finnhub-Token` header so it never appears in
/// request URLs.
#[derive(Clone)]
pub struct FinnhubAdapter {
    upstream: Upstream,
    auth: HttpAuth,
}

impl FinnhubAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Finnhub, http_client),
            auth: HttpAuth::header("X-Finnhub-Token", api_key),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.upstream.set_timeout_ms(timeout_ms);
        self
    }

    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.upstream.set_breaker_config(config);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.upstream.set_clock(clock);
        self
    }

    pub fn with_quota(mut self, quota: Option<QuotaGuard>) -> Self {
        self.upstream.set_quota(quota);
        self
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, SourceError> {
        let url = format!(
            "{FINNHUB_BASE_URL}/quote?symbol={}",
            urlencoding::encode(symbol.as_str())
        );
        let body = self
            .upstream
            .fetch(Endpoint::Quote, HttpRequest::get(url).with_auth(&self.auth))
            .await?;
        let payload: FinnhubQuote = parse_json(ProviderId::Finnhub, &body)?;
        normalize_quote(symbol, payload, self.upstream.now_utc())
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        window: PeriodMapping,
    ) -> Result<Vec<HistoricalPoint>, SourceError> {
        let (from, to) = match (window.provider, window.span) {
            (ProviderId::Finnhub, NativeSpan::Window { from, to }) => (from, to),
            _ => {
                return Err(SourceError::invalid_request(format!(
                    "finnhub cannot serve a {} mapping",
                    window.provider
                )))
            }
        };

        let url = format!(
            "{FINNHUB_BASE_URL}/stock/candle?symbol={}&resolution={}&from={from}&to={to}",
            urlencoding::encode(symbol.as_str()),
            window.resolution,
        );
        let body = self
            .upstream
            .fetch(Endpoint::Candles, HttpRequest::get(url).with_auth(&self.auth))
            .await?;
        let payload: FinnhubCandles = parse_json(ProviderId::Finnhub, &body)?;
        normalize_candles(payload)
    }

    async fn fetch_news(&self, req: &NewsRequest) -> Result<Vec<NewsItem>, SourceError> {
        let (url, related) = match &req.scope {
            NewsScope::General => (format!("{FINNHUB_BASE_URL}/news?category=general"), None),
            NewsScope::Company { symbol, from, to } => (
                format!(
                    "{FINNHUB_BASE_URL}/company-news?symbol={}&from={from}&to={to}",
                    urlencoding::encode(symbol.as_str())
                ),
                Some(symbol.as_str()),
            ),
        };

        let body = self
            .upstream
            .fetch(Endpoint::News, HttpRequest::get(url).with_auth(&self.auth))
            .await?;
        let payload: FinnhubNews = parse_json(ProviderId::Finnhub, &body)?;
        normalize_news(payload, req.limit, related, self.upstream.now_utc())
    }
}

impl DataSource for FinnhubAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false).with_news()
    }

    fn quote<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Quote> {
        Box::pin(self.fetch_quote(symbol))
    }

    fn candles<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: PeriodMapping,
    ) -> SourceFuture<'a, Vec<HistoricalPoint>> {
        Box::pin(self.fetch_candles(symbol, window))
    }

    fn search<'a>(&'a self, _req: &'a SearchRequest) -> SourceFuture<'a, Vec<SearchResult>> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Search)) })
    }

    fn news<'a>(&'a self, req: &'a NewsRequest) -> SourceFuture<'a, Vec<NewsItem>> {
        Box::pin(self.fetch_news(req))
    }

    fn health<'a>(
        &'a self,
        endpoint: Endpoint,
    ) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.upstream.health(endpoint) })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FinnhubQuote {
    #[serde(default)]
    error: Option<String>,
    c: Option<f64>,
    d: Option<f64>,
    dp: Option<f64>,
    pc: Option<f64>,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct FinnhubCandles {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    c: Vec<Option<f64>>,
}

/// `/news` and `/company-news` answer with a bare array, or an object with
/// an `error` key when the token is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FinnhubNews {
    Items(Vec<FinnhubNewsItem>),
    Error { error: String },
}

#[derive(Debug, Clone, Deserialize)]
struct FinnhubNewsItem {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    datetime: Option<i64>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    related: Option<String>,
}

fn normalize_quote(
    symbol: &Symbol,
    payload: FinnhubQuote,
    as_of: UtcDateTime,
) -> Result<Quote, SourceError> {
    if let Some(error) = payload.error {
        return Err(SourceError::unavailable(format!("finnhub API error: {error}")));
    }

    // Unknown tickers come back as an all-zero body rather than an error.
    let price = payload.c.filter(|price| *price > 0.0).ok_or_else(|| {
        SourceError::invalid_request(format!("finnhub has no quote for '{symbol}'"))
    })?;
    let missing =
        |field: &str| SourceError::internal(format!("finnhub quote is missing '{field}'"));

    let values = QuoteValues {
        price,
        change: payload.d.ok_or_else(|| missing("d"))?,
        change_percent: payload.dp.ok_or_else(|| missing("dp"))?,
        volume: 0,
        previous_close: payload.pc.ok_or_else(|| missing("pc"))?,
        open: payload.o.ok_or_else(|| missing("o"))?,
        high: payload.h.ok_or_else(|| missing("h"))?,
        low: payload.l.ok_or_else(|| missing("l"))?,
    };

    Quote::from_provider(ProviderId::Finnhub, symbol.clone(), values, as_of)
        .map_err(SourceError::from)
}

/// Drops headline-less or link-less items and caps the feed at `limit`.
/// Items without a publish time are stamped with `fetched_at`.
fn normalize_news(
    payload: FinnhubNews,
    limit: usize,
    related: Option<&str>,
    fetched_at: UtcDateTime,
) -> Result<Vec<NewsItem>, SourceError> {
    let items = match payload {
        FinnhubNews::Items(items) => items,
        FinnhubNews::Error { error } => {
            return Err(SourceError::unavailable(format!("finnhub API error: {error}")))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|raw| {
            let datetime = raw
                .datetime
                .filter(|seconds| *seconds > 0)
                .and_then(|seconds| UtcDateTime::from_unix_timestamp(seconds).ok())
                .unwrap_or(fetched_at);
            let mut item = NewsItem::new(
                raw.id.unwrap_or_default(),
                raw.headline?,
                raw.url?,
                datetime,
            )?;
            item.source = raw.source.unwrap_or_default();
            item.image = raw.image.unwrap_or_default();
            item.summary = raw.summary.unwrap_or_default();
            item.related = match related {
                Some(symbol) => symbol.to_owned(),
                None => raw.related.unwrap_or_default(),
            };
            Some(item)
        })
        .take(limit)
        .collect())
}

fn normalize_candles(payload: FinnhubCandles) -> Result<Vec<HistoricalPoint>, SourceError> {
    if let Some(error) = payload.error {
        return Err(SourceError::unavailable(format!("finnhub API error: {error}")));
    }

    let status = payload.s.as_deref().unwrap_or("unknown");
    if status != "ok" {
        return Err(SourceError::unavailable(format!(
            "finnhub candle status '{status}'"
        )));
    }

    let points = payload
        .t
        .iter()
        .zip(payload.c.iter())
        .filter_map(|(ts, close)| {
            let date = unix_date(*ts)?;
            HistoricalPoint::new(date, (*close)?).ok()
        })
        .collect::<Vec<_>>();

    let series = normalize_series(points);
    if series.is_empty() {
        return Err(empty_series(ProviderId::Finnhub));
    }
    Ok(series)
}

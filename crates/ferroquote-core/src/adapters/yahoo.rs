use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use super::{empty_series, parse_json, unix_date, Upstream};
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::clock::Clock;
use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, HealthStatus, NewsRequest, SearchRequest, SourceError,
    SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalizer::{NativeSpan, PeriodMapping};
use crate::{
    normalize_series, HistoricalPoint, NewsItem, ProviderId, Quote, QuoteValues, SearchResult,
    Symbol, UtcDateTime,
};

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart adapter. Anonymous access; no credentials.
#[derive(Clone)]
pub struct YahooAdapter {
    upstream: Upstream,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Yahoo, http_client),
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

    async fn fetch_chart(
        &self,
        endpoint: Endpoint,
        url: String,
    ) -> Result<YahooChartResult, SourceError> {
        let request = HttpRequest::get(url).with_header("referer", "https://finance.yahoo.com/");
        let body = self.upstream.fetch(endpoint, request).await?;
        let response: YahooChartResponse = parse_json(ProviderId::Yahoo, &body)?;

        if let Some(error) = response.chart.error {
            return Err(SourceError::unavailable(format!(
                "yahoo chart API error: {}",
                error.description()
            )));
        }

        response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| SourceError::internal("no chart data in yahoo response"))
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, SourceError> {
        let url = format!(
            "{YAHOO_CHART_URL}/{}",
            urlencoding::encode(symbol.as_str())
        );
        let result = self.fetch_chart(Endpoint::Quote, url).await?;
        normalize_quote(symbol, result, self.upstream.now_utc())
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        window: PeriodMapping,
    ) -> Result<Vec<HistoricalPoint>, SourceError> {
        let range = match (window.provider, window.span) {
            (ProviderId::Yahoo, NativeSpan::Range(range)) => range,
            _ => {
                return Err(SourceError::invalid_request(format!(
                    "yahoo cannot serve a {} mapping",
                    window.provider
                )))
            }
        };

        let url = format!(
            "{YAHOO_CHART_URL}/{}?range={range}&interval={}",
            urlencoding::encode(symbol.as_str()),
            window.resolution,
        );
        let result = self.fetch_chart(Endpoint::Candles, url).await?;
        normalize_candles(result)
    }
}

impl DataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false)
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

    fn news<'a>(&'a self, _req: &'a NewsRequest) -> SourceFuture<'a, Vec<NewsItem>> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::News)) })
    }

    fn health<'a>(
        &'a self,
        endpoint: Endpoint,
    ) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.upstream.health(endpoint) })
    }
}

// Yahoo Finance chart response structures
#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChart {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl YahooChartError {
    fn description(&self) -> &str {
        self.description
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or("unknown error")
    }
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: YahooIndicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_volume: Option<u64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooIndicators {
    #[serde(default)]
    quote: Vec<YahooIndicatorQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooIndicatorQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn normalize_quote(
    symbol: &Symbol,
    result: YahooChartResult,
    as_of: UtcDateTime,
) -> Result<Quote, SourceError> {
    let meta = result
        .meta
        .ok_or_else(|| SourceError::internal("yahoo chart has no meta block"))?;

    let price = meta
        .regular_market_price
        .filter(|price| *price > 0.0)
        .ok_or_else(|| SourceError::invalid_request(format!("yahoo has no price for '{symbol}'")))?;
    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .filter(|close| *close > 0.0)
        .ok_or_else(|| SourceError::internal("yahoo meta is missing a previous close"))?;

    let open = result
        .indicators
        .quote
        .first()
        .and_then(|quote| quote.open.iter().rev().find_map(|open| *open))
        .unwrap_or(price);

    let change = price - previous_close;
    let values = QuoteValues {
        price,
        change,
        change_percent: change / previous_close * 100.0,
        volume: meta.regular_market_volume.unwrap_or(0),
        previous_close,
        open,
        high: meta.regular_market_day_high.unwrap_or(price),
        low: meta.regular_market_day_low.unwrap_or(price),
    };

    Quote::from_provider(ProviderId::Yahoo, symbol.clone(), values, as_of)
        .map_err(SourceError::from)
}

fn normalize_candles(result: YahooChartResult) -> Result<Vec<HistoricalPoint>, SourceError> {
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.close)
        .ok_or_else(|| SourceError::internal("yahoo chart has no quote indicators"))?;

    let points = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let date = unix_date(*ts)?;
            HistoricalPoint::new(date, close?).ok()
        })
        .collect::<Vec<_>>();

    let series = normalize_series(points);
    if series.is_empty() {
        return Err(empty_series(ProviderId::Yahoo));
    }
    Ok(series)
}

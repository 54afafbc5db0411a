use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;
use time::Date;

use super::{empty_series, parse_json, Upstream};
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::clock::Clock;
use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, HealthStatus, NewsRequest, SearchRequest, SourceError,
    SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalizer::{NativeSpan, PeriodMapping};
use crate::throttling::QuotaGuard;
use crate::{
    normalize_series, HistoricalPoint, NewsItem, ProviderId, Quote, QuoteValues, SearchResult,
    Symbol, UtcDateTime,
};

const ALPHAVANTAGE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage adapter: last-resort quote and candle source, sole search source.
///
/// The free tier signals throttling in-band (`Note`/`Information` keys on a
/// 200 response), so those are mapped to rate-limit errors here.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    upstream: Upstream,
    api_key: String,
}

impl AlphaVantageAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Alphavantage, http_client),
            api_key: api_key.into(),
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

    fn query_url(&self, params: &[(&str, &str)]) -> String {
        let mut url = String::from(ALPHAVANTAGE_URL);
        for (index, (name, value)) in params.iter().enumerate() {
            url.push(if index == 0 { '?' } else { '&' });
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url.push_str("&apikey=");
        url.push_str(&urlencoding::encode(&self.api_key));
        url
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, SourceError> {
        let url = self.query_url(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol.as_str())]);
        let body = self
            .upstream
            .fetch(Endpoint::Quote, HttpRequest::get(url))
            .await?;
        let payload: AvGlobalQuoteResponse = parse_json(ProviderId::Alphavantage, &body)?;
        payload.notices.check()?;

        let quote = payload
            .global_quote
            .filter(|quote| quote.price.is_some())
            .ok_or_else(|| {
                SourceError::invalid_request(format!("alphavantage has no quote for '{symbol}'"))
            })?;
        normalize_quote(symbol, quote, self.upstream.now_utc())
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        window: PeriodMapping,
    ) -> Result<Vec<HistoricalPoint>, SourceError> {
        let (size, trim) = match (window.provider, window.span) {
            (ProviderId::Alphavantage, NativeSpan::OutputSize { size, trim }) => (size, trim),
            _ => {
                return Err(SourceError::invalid_request(format!(
                    "alphavantage cannot serve a {} mapping",
                    window.provider
                )))
            }
        };

        let url = self.query_url(&[
            ("function", "TIME_SERIES_DAILY_ADJUSTED"),
            ("symbol", symbol.as_str()),
            ("outputsize", size),
        ]);
        let body = self
            .upstream
            .fetch(Endpoint::Candles, HttpRequest::get(url))
            .await?;
        let payload: AvDailyResponse = parse_json(ProviderId::Alphavantage, &body)?;
        payload.notices.check()?;

        let series = payload
            .series
            .ok_or_else(|| SourceError::unavailable("alphavantage daily series unavailable"))?;

        // ISO keys sort chronologically, so BTreeMap order is already ascending.
        let entries = series
            .into_iter()
            .filter_map(|(day, bar)| {
                let date = Date::parse(&day, format_description!("[year]-[month]-[day]")).ok()?;
                Some((date, bar.close()))
            })
            .collect::<Vec<_>>();

        let points = trim
            .apply(entries, |(date, _)| *date)
            .into_iter()
            .filter_map(|(date, price)| HistoricalPoint::new(date, price?).ok())
            .collect::<Vec<_>>();

        let series = normalize_series(points);
        if series.is_empty() {
            return Err(empty_series(ProviderId::Alphavantage));
        }
        Ok(series)
    }

    async fn fetch_search(&self, req: &SearchRequest) -> Result<Vec<SearchResult>, SourceError> {
        let url = self.query_url(&[("function", "SYMBOL_SEARCH"), ("keywords", &req.query)]);
        let body = self
            .upstream
            .fetch(Endpoint::Search, HttpRequest::get(url))
            .await?;
        let payload: AvSearchResponse = parse_json(ProviderId::Alphavantage, &body)?;
        payload.notices.check()?;

        Ok(payload
            .best_matches
            .unwrap_or_default()
            .into_iter()
            .filter_map(AvMatch::into_result)
            .take(req.limit)
            .collect())
    }
}

impl DataSource for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, true)
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

    fn search<'a>(&'a self, req: &'a SearchRequest) -> SourceFuture<'a, Vec<SearchResult>> {
        Box::pin(self.fetch_search(req))
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

/// In-band status keys that may accompany any Alpha Vantage response.
#[derive(Debug, Clone, Default, Deserialize)]
struct AvNotices {
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
}

impl AvNotices {
    fn check(&self) -> Result<(), SourceError> {
        if let Some(message) = &self.error_message {
            return Err(SourceError::invalid_request(format!(
                "alphavantage error: {message}"
            )));
        }
        if let Some(message) = self.note.as_ref().or(self.information.as_ref()) {
            return Err(SourceError::rate_limited(format!(
                "alphavantage throttled: {message}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AvGlobalQuoteResponse {
    #[serde(flatten)]
    notices: AvNotices,
    #[serde(rename = "Global Quote", default)]
    global_quote: Option<AvGlobalQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct AvGlobalQuote {
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AvDailyResponse {
    #[serde(flatten)]
    notices: AvNotices,
    #[serde(rename = "Time Series (Daily)", default)]
    series: Option<BTreeMap<String, AvDailyBar>>,
}

#[derive(Debug, Clone, Deserialize)]
struct AvDailyBar {
    #[serde(rename = "5. adjusted close", default)]
    adjusted_close: Option<String>,
    #[serde(rename = "4. close", default)]
    close: Option<String>,
}

impl AvDailyBar {
    fn close(&self) -> Option<f64> {
        self.adjusted_close
            .as_deref()
            .or(self.close.as_deref())
            .and_then(|raw| raw.trim().parse::<f64>().ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AvSearchResponse {
    #[serde(flatten)]
    notices: AvNotices,
    #[serde(rename = "bestMatches", default)]
    best_matches: Option<Vec<AvMatch>>,
}

#[derive(Debug, Clone, Deserialize)]
struct AvMatch {
    #[serde(rename = "1. symbol")]
    symbol: Option<String>,
    #[serde(rename = "2. name")]
    name: Option<String>,
    #[serde(rename = "3. type")]
    instrument_type: Option<String>,
    #[serde(rename = "4. region")]
    region: Option<String>,
}

impl AvMatch {
    fn into_result(self) -> Option<SearchResult> {
        let symbol = Symbol::parse(self.symbol.as_deref()?).ok()?;
        Some(SearchResult::new(
            symbol,
            self.name.unwrap_or_default(),
            self.instrument_type.unwrap_or_default(),
            self.region.unwrap_or_default(),
        ))
    }
}

fn parse_number(field: &'static str, raw: Option<&str>) -> Result<f64, SourceError> {
    raw.map(|value| value.trim().trim_end_matches('%'))
        .and_then(|value| value.parse::<f64>().ok())
        .ok_or_else(|| {
            SourceError::internal(format!("alphavantage field '{field}' is not numeric"))
        })
}

fn normalize_quote(
    symbol: &Symbol,
    quote: AvGlobalQuote,
    as_of: UtcDateTime,
) -> Result<Quote, SourceError> {
    let values = QuoteValues {
        price: parse_number("05. price", quote.price.as_deref())?,
        change: parse_number("09. change", quote.change.as_deref())?,
        change_percent: parse_number("10. change percent", quote.change_percent.as_deref())?,
        volume: quote
            .volume
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(0),
        previous_close: parse_number("08. previous close", quote.previous_close.as_deref())?,
        open: parse_number("02. open", quote.open.as_deref())?,
        high: parse_number("03. high", quote.high.as_deref())?,
        low: parse_number("04. low", quote.low.as_deref())?,
    };

    if values.price <= 0.0 {
        return Err(SourceError::invalid_request(format!(
            "alphavantage returned a non-positive price for '{symbol}'"
        )));
    }

    Quote::from_provider(ProviderId::Alphavantage, symbol.clone(), values, as_of)
        .map_err(SourceError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{block_on, RecordingHttpClient};
    use crate::data_source::SourceErrorKind;
    use crate::normalizer::normalize;
    use crate::Period;
    use time::macros::{date, datetime};

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[test]
    fn global_quote_parses_string_fields_and_percent_suffix() {
        let client = Arc::new(RecordingHttpClient::json(
            r#"{"Global Quote":{"01. symbol":"IBM","02. open":"168.0000","03. high":"170.1000","04. low":"167.5000","05. price":"169.2000","06. volume":"3567000","07. latest trading day":"2024-06-14","08. previous close":"167.9000","09. change":"1.3000","10. change percent":"0.7743%"}}"#,
        ));
        let adapter = AlphaVantageAdapter::new(client.clone(), "demo");

        let quote = block_on(adapter.quote(&symbol("IBM"))).expect("quote should parse");

        assert_eq!(quote.price, 169.2);
        assert_eq!(quote.change_percent, 0.7743);
        assert_eq!(quote.volume, 3_567_000);
        assert_eq!(quote.previous_close, 167.9);
        assert_eq!(quote.source, Some(ProviderId::Alphavantage));
        assert!(client.recorded_requests()[0]
            .url
            .contains("?function=GLOBAL_QUOTE&symbol=IBM&apikey=demo"));
    }

    #[test]
    fn note_is_a_rate_limit_and_error_message_is_invalid() {
        let throttled = AlphaVantageAdapter::new(
            Arc::new(RecordingHttpClient::json(
                r#"{"Note":"Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}"#,
            )),
            "demo",
        );
        let error = block_on(throttled.quote(&symbol("IBM"))).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::RateLimited);

        let invalid = AlphaVantageAdapter::new(
            Arc::new(RecordingHttpClient::json(
                r#"{"Error Message":"Invalid API call."}"#,
            )),
            "demo",
        );
        let error = block_on(invalid.quote(&symbol("IBM"))).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    }

    #[test]
    fn empty_global_quote_is_a_provider_error() {
        let adapter = AlphaVantageAdapter::new(
            Arc::new(RecordingHttpClient::json(r#"{"Global Quote":{}}"#)),
            "demo",
        );
        let error = block_on(adapter.quote(&symbol("UNKNOWN_TICKER"))).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    }

    #[test]
    fn daily_series_is_sorted_then_trimmed_to_last_points() {
        let client = Arc::new(RecordingHttpClient::json(
            r#"{
                "Meta Data": {"2. Symbol": "IBM"},
                "Time Series (Daily)": {
                    "2024-01-05": {"4. close": "160.00", "5. adjusted close": "159.16"},
                    "2024-01-02": {"4. close": "158.00", "5. adjusted close": "157.12"},
                    "2024-01-04": {"4. close": "161.00", "5. adjusted close": "0"},
                    "2024-01-03": {"4. close": "157.00", "5. adjusted close": "156.33"}
                }
            }"#,
        ));
        let adapter = AlphaVantageAdapter::new(client.clone(), "demo");
        let mut window = normalize(
            ProviderId::Alphavantage,
            Period::OneWeek,
            datetime!(2024-01-05 18:00 UTC),
        );
        window.span = NativeSpan::OutputSize {
            size: "compact",
            trim: crate::normalizer::Trim::LastPoints(3),
        };

        let series = block_on(adapter.candles(&symbol("IBM"), window)).expect("series");

        assert_eq!(
            series
                .iter()
                .map(|point| (point.date, point.price))
                .collect::<Vec<_>>(),
            vec![(date!(2024 - 01 - 03), 156.33), (date!(2024 - 01 - 05), 159.16)]
        );
        assert!(client.recorded_requests()[0]
            .url
            .contains("function=TIME_SERIES_DAILY_ADJUSTED&symbol=IBM&outputsize=compact"));
    }

    #[test]
    fn year_to_date_keeps_current_calendar_year() {
        let client = Arc::new(RecordingHttpClient::json(
            r#"{"Time Series (Daily)": {
                "2023-12-29": {"5. adjusted close": "150.00"},
                "2024-01-02": {"5. adjusted close": "151.00"}
            }}"#,
        ));
        let adapter = AlphaVantageAdapter::new(client, "demo");
        let window = normalize(
            ProviderId::Alphavantage,
            Period::YearToDate,
            datetime!(2024-01-03 12:00 UTC),
        );

        let series = block_on(adapter.candles(&symbol("IBM"), window)).expect("series");
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, date!(2024 - 01 - 02));
    }

    #[test]
    fn search_maps_best_matches_and_caps_results() {
        let matches = (0..30)
            .map(|i| {
                format!(
                    r#"{{"1. symbol":"TST{i}","2. name":"Test {i} Corp","3. type":"Equity","4. region":"United States"}}"#
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        let client = Arc::new(RecordingHttpClient::json(&format!(
            r#"{{"bestMatches":[{matches}]}}"#
        )));
        let adapter = AlphaVantageAdapter::new(client.clone(), "demo");
        let request = SearchRequest::new("test corp").expect("valid query");

        let results = block_on(adapter.search(&request)).expect("search");

        assert_eq!(results.len(), 25);
        assert_eq!(results[0].symbol.as_str(), "TST0");
        assert_eq!(results[0].region, "United States");
        assert!(client.recorded_requests()[0]
            .url
            .contains("function=SYMBOL_SEARCH&keywords=test%20corp"));
    }

    #[test]
    fn search_without_matches_is_an_empty_success() {
        let adapter =
            AlphaVantageAdapter::new(Arc::new(RecordingHttpClient::json("{}")), "demo");
        let request = SearchRequest::new("zzzz").expect("valid query");
        assert!(block_on(adapter.search(&request)).expect("search").is_empty());
    }
}

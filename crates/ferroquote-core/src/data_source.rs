//! Data source trait and request/response types.
//!
//! This module defines the adapter contract (`DataSource`) that every provider
//! implements, along with the structured error used to advance a fallback chain.
//!
//! # Endpoints
//!
//! | Endpoint | Input | Output | Default chain |
//! |----------|-------|--------|---------------|
//! | Quote | [`Symbol`] | [`Quote`] | finnhub → yahoo → alphavantage |
//! | Candles | [`Symbol`] + [`PeriodMapping`] | `Vec<HistoricalPoint>` | yahoo → finnhub → alphavantage |
//! | Search | [`SearchRequest`] | `Vec<SearchResult>` | alphavantage |
//! | News | [`NewsRequest`] | `Vec<NewsItem>` | finnhub |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::normalizer::PeriodMapping;
use crate::{HistoricalPoint, NewsItem, ProviderId, Quote, SearchResult, Symbol, ValidationError};

/// Maximum number of search results returned to callers.
pub const MAX_SEARCH_RESULTS: usize = 25;

/// Default headline count for the general market feed.
pub const DEFAULT_GENERAL_NEWS_LIMIT: usize = 30;

/// Default headline count for one company's feed.
pub const DEFAULT_COMPANY_NEWS_LIMIT: usize = 20;

/// Data endpoint type used for routing and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Quote,
    Candles,
    Search,
    News,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Candles => "candles",
            Self::Search => "search",
            Self::News => "news",
        }
    }

    /// Fixed provider priority for this endpoint, chosen by reliability rather
    /// than name.
    pub fn default_chain(self) -> Vec<ProviderId> {
        match self {
            Self::Quote => vec![
                ProviderId::Finnhub,
                ProviderId::Yahoo,
                ProviderId::Alphavantage,
            ],
            Self::Candles => vec![
                ProviderId::Yahoo,
                ProviderId::Finnhub,
                ProviderId::Alphavantage,
            ],
            Self::Search => vec![ProviderId::Alphavantage],
            Self::News => vec![ProviderId::Finnhub],
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub quote: bool,
    pub candles: bool,
    pub search: bool,
    pub news: bool,
}

impl CapabilitySet {
    /// Quote/candle/search matrix; news is opted into with [`with_news`](Self::with_news).
    pub const fn new(quote: bool, candles: bool, search: bool) -> Self {
        Self {
            quote,
            candles,
            search,
            news: false,
        }
    }

    pub const fn full() -> Self {
        Self::new(true, true, true).with_news()
    }

    pub const fn with_news(mut self) -> Self {
        self.news = true;
        self
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Quote => self.quote,
            Endpoint::Candles => self.candles,
            Endpoint::Search => self.search,
            Endpoint::News => self.news,
        }
    }
}

/// Health state reported by an adapter; unhealthy sources are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime source health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    UnsupportedEndpoint,
    Unavailable,
    RateLimited,
    InvalidRequest,
    AdapterNotRegistered,
    Internal,
}

/// Structured single-provider failure. Every kind is recovered the same way:
/// the router advances to the next provider in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by this source"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::AdapterNotRegistered,
            message: format!("source adapter '{provider}' is not registered"),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::internal(error.to_string())
    }
}

/// Request payload for search endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Result<Self, ValidationError> {
        let query = query.into().trim().to_owned();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(Self {
            query,
            limit: MAX_SEARCH_RESULTS,
        })
    }
}

/// Which news feed to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsScope {
    General,
    /// One company's headlines published between `from` and `to`, inclusive.
    Company { symbol: Symbol, from: Date, to: Date },
}

/// Request payload for news endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRequest {
    pub scope: NewsScope,
    pub limit: usize,
}

impl NewsRequest {
    pub fn general(limit: usize) -> Self {
        Self {
            scope: NewsScope::General,
            limit,
        }
    }

    pub fn company(
        symbol: Symbol,
        from: Date,
        to: Date,
        limit: usize,
    ) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvalidDateRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self {
            scope: NewsScope::Company { symbol, from, to },
            limit,
        })
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Source adapter contract.
///
/// Each method performs at most one network call and either returns fully
/// normalized data or a [`SourceError`]; partial results are never returned.
///
/// # Required Methods
///
/// | Method | Description |
/// |--------|-------------|
/// | [`id`](DataSource::id) | Unique provider identifier |
/// | [`capabilities`](DataSource::capabilities) | Supported endpoints |
/// | [`quote`](DataSource::quote) | Current quote for one symbol |
/// | [`candles`](DataSource::candles) | Close-price series for a provider-native window |
/// | [`search`](DataSource::search) | Ticker/name search |
/// | [`news`](DataSource::news) | General or company headlines |
/// | [`health`](DataSource::health) | Circuit health of one endpoint |
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    fn quote<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Quote>;

    /// Fetches a close-price series. `window` is this provider's entry from the
    /// period normalizer; adapters reject mappings meant for another provider.
    fn candles<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: PeriodMapping,
    ) -> SourceFuture<'a, Vec<HistoricalPoint>>;

    fn search<'a>(&'a self, req: &'a SearchRequest) -> SourceFuture<'a, Vec<SearchResult>>;

    fn news<'a>(&'a self, req: &'a NewsRequest) -> SourceFuture<'a, Vec<NewsItem>>;

    /// Health of a single endpoint. Endpoints keep separate circuits, so one
    /// failing endpoint never takes the others down.
    fn health<'a>(
        &'a self,
        endpoint: Endpoint,
    ) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}

//! # Ferroquote Core
//!
//! Resilient market-data retrieval: quotes, historical close series, symbol
//! search, and news headlines for stock/ETF tickers from several unreliable upstream
//! providers, behind one normalized contract.
//!
//! ## Overview
//!
//! - **Canonical domain models** for quotes, historical points, and search results
//! - **Provider adapters** for Finnhub, Yahoo Finance, and Alpha Vantage
//! - **Routing** that walks a fixed provider order and stops at the first success
//! - **Period normalization** from caller tokens (`1W` ... `10Y`) to each provider's vocabulary
//! - **TTL quote cache** with an injectable clock
//! - **Synthetic fallback** so public operations never fail
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Finnhub, Yahoo, Alpha Vantage) |
//! | [`cache`] | TTL quote cache |
//! | [`circuit_breaker`] | Per-endpoint circuit breakers |
//! | [`clock`] | System and manual clocks |
//! | [`config`] | Environment-driven configuration |
//! | [`data_source`] | Data source trait and request/error types |
//! | [`domain`] | Domain models (Quote, HistoricalPoint, SearchResult, NewsItem, Period) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`market_data`] | The public retrieval facade |
//! | [`normalizer`] | Period → provider-native window mapping |
//! | [`provider_policy`] | Free-tier request budgets |
//! | [`routing`] | Sequential source fallback |
//! | [`source`] | Provider identifiers |
//! | [`synthetic`] | Degraded quotes, series, and search list |
//! | [`throttling`] | Local quota enforcement |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferroquote_core::{MarketData, Period, QuoteOptions, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let market = MarketData::from_env();
//!     let symbol = Symbol::parse("AAPL")?;
//!
//!     let quote = market.get_quote(&symbol, QuoteOptions::default()).await;
//!     println!("AAPL {:.2} (fallback: {})", quote.price, quote.is_fallback);
//!
//!     let history = market.get_historical_data(&symbol, Period::OneMonth).await;
//!     println!("{} daily closes", history.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  MarketData     │────▶│ Quote Cache      │
//! └────────┬────────┘     └──────────────────┘
//!          │        └────▶ Synthetic Fallback
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Source Router  │────▶│ Period Normalizer│
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Data Source     │────▶│ Circuit Breaker  │
//! │ (Adapter Trait) │     │ Quota Guard      │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ HTTP Client     │
//! │ (reqwest/none)  │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Adapter failures are structured [`SourceError`]s. The router absorbs them
//! by moving to the next provider; the facade absorbs a fully exhausted chain
//! by serving synthetic data:
//!
//! ```rust
//! use ferroquote_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => "over quota",
//!         SourceErrorKind::Unavailable => "upstream down",
//!         SourceErrorKind::InvalidRequest => "unknown symbol or bad request",
//!         _ => "other",
//!     }
//! }
//!
//! assert_eq!(describe(&SourceError::rate_limited("429")), "over quota");
//! ```
//!
//! ## Security
//!
//! - API keys are read from the environment and never logged
//! - Finnhub credentials travel in a header; Alpha Vantage query strings are redacted in logs
//! - All HTTP requests use TLS via rustls

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod market_data;
pub mod normalizer;
pub mod provider_policy;
pub mod routing;
pub mod source;
pub mod synthetic;
pub mod throttling;

// Adapter implementations
pub use adapters::{AlphaVantageAdapter, FinnhubAdapter, YahooAdapter};

// Caching and time
pub use cache::{QuoteCache, DEFAULT_QUOTE_TTL};
pub use clock::{Clock, ManualClock, SystemClock};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, EndpointBreakers};

// Configuration
pub use config::MarketDataConfig;

// Data source trait and types
pub use data_source::{
    CapabilitySet, DataSource, Endpoint, HealthState, HealthStatus, NewsRequest, NewsScope,
    SearchRequest, SourceError, SourceErrorKind, SourceFuture, DEFAULT_COMPANY_NEWS_LIMIT,
    DEFAULT_GENERAL_NEWS_LIMIT, MAX_SEARCH_RESULTS,
};

// Domain models
pub use domain::{
    normalize_series, AssetClass, HistoricalPoint, NewsItem, Period, Quote, QuoteValues,
    SearchResult, Symbol, UtcDateTime,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Facade
pub use market_data::{IndexSnapshot, MarketData, MarketDataBuilder, QuoteOptions};

// Period normalization
pub use normalizer::{normalize, normalize_token, NativeSpan, PeriodMapping, Trim};

// Provider policies and quotas
pub use provider_policy::ProviderPolicy;
pub use throttling::QuotaGuard;

// Routing types
pub use routing::{
    AttemptError, RouteFailure, RouteResult, RouteSuccess, SourceRouter, SourceSnapshot,
    SourceStrategy,
};

// Source identifiers
pub use source::ProviderId;

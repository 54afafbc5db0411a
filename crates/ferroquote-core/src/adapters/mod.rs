//! Provider adapters.
//!
//! Each adapter translates one upstream's payloads into the normalized domain
//! types. Transport concerns shared by all of them (circuit breakers, local
//! quota, timeout, status handling, the clock stamping fetched data) live in
//! [`Upstream`].

mod alphavantage;
mod finnhub;
mod yahoo;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState, EndpointBreakers};
use crate::clock::{Clock, SystemClock};
use crate::data_source::{Endpoint, HealthState, HealthStatus, SourceError};
use crate::http_client::{redact_query, HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::QuotaGuard;
use crate::{ProviderId, UtcDateTime};

pub use alphavantage::AlphaVantageAdapter;
pub use finnhub::FinnhubAdapter;
pub use yahoo::YahooAdapter;

#[derive(Clone)]
pub(crate) struct Upstream {
    provider: ProviderId,
    http_client: Arc<dyn HttpClient>,
    breakers: EndpointBreakers,
    quota: Option<QuotaGuard>,
    clock: Arc<dyn Clock>,
    timeout_ms: u64,
}

impl Upstream {
    pub(crate) fn new(provider: ProviderId, http_client: Arc<dyn HttpClient>) -> Self {
        let quota =
            ProviderPolicy::default_for(provider).map(|policy| QuotaGuard::from_policy(&policy));
        Self {
            provider,
            http_client,
            breakers: EndpointBreakers::for_provider(provider),
            quota,
            clock: Arc::new(SystemClock),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub(crate) fn set_timeout_ms(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }

    pub(crate) fn set_breaker_config(&mut self, config: CircuitBreakerConfig) {
        self.breakers = EndpointBreakers::new(self.provider, config);
    }

    pub(crate) fn set_quota(&mut self, quota: Option<QuotaGuard>) {
        self.quota = quota;
    }

    pub(crate) fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Fetch time stamped onto provider data.
    pub(crate) fn now_utc(&self) -> UtcDateTime {
        self.clock.now_utc()
    }

    /// Performs one GET for `endpoint` and returns the body of a 2xx response.
    ///
    /// Transport errors, 429, and 5xx count against the endpoint's breaker.
    /// Other 4xx answers describe the request (unknown ticker, plan
    /// entitlement) and leave the breaker untouched.
    pub(crate) async fn fetch(
        &self,
        endpoint: Endpoint,
        request: HttpRequest,
    ) -> Result<String, SourceError> {
        let provider = self.provider;
        let breaker = self.breakers.get(endpoint);
        if !breaker.allow_request() {
            return Err(SourceError::unavailable(format!(
                "{provider} {endpoint} circuit breaker is open; skipping upstream call"
            )));
        }

        if let Some(quota) = &self.quota {
            if let Err(wait) = quota.try_acquire() {
                return Err(SourceError::rate_limited(format!(
                    "{provider} local request quota exhausted; next slot in {} ms",
                    wait.as_millis()
                )));
            }
        }

        debug!(%provider, %endpoint, url = redact_query(&request.url), "upstream request");
        let request = request.with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|error| {
            breaker.record_failure();
            let message = format!("{provider} transport error: {}", error.message());
            if error.retryable() {
                SourceError::unavailable(message)
            } else {
                SourceError::internal(message)
            }
        })?;

        match response.status {
            429 => {
                breaker.record_failure();
                Err(SourceError::rate_limited(format!(
                    "{provider} upstream rejected the request with status 429"
                )))
            }
            status if status >= 500 => {
                breaker.record_failure();
                Err(SourceError::unavailable(format!(
                    "{provider} upstream returned status {status}"
                )))
            }
            status if !response.is_success() => Err(SourceError::invalid_request(format!(
                "{provider} upstream refused the request with status {status}"
            ))),
            _ => {
                breaker.record_success();
                Ok(response.body)
            }
        }
    }

    pub(crate) fn health(&self, endpoint: Endpoint) -> HealthStatus {
        let breaker = self.breakers.get(endpoint);
        if breaker.rejects_requests() {
            return HealthStatus::new(HealthState::Unhealthy, false);
        }

        match breaker.state() {
            CircuitState::Closed => HealthStatus::healthy(),
            // Open with an elapsed cool-down is about to allow a trial call.
            CircuitState::HalfOpen | CircuitState::Open => {
                HealthStatus::new(HealthState::Degraded, true)
            }
        }
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: ProviderId,
    body: &str,
) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|error| {
        SourceError::internal(format!("failed to parse {provider} response: {error}"))
    })
}

/// Calendar day (UTC) of a unix timestamp in seconds.
pub(crate) fn unix_date(seconds: i64) -> Option<Date> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .map(OffsetDateTime::date)
}

pub(crate) fn empty_series(provider: ProviderId) -> SourceError {
    SourceError::unavailable(format!("{provider} returned no usable price points"))
}

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::data_source::Endpoint;
use crate::ProviderId;

/// Runtime circuit state for one provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

/// Thread-safe circuit breaker guarding one endpoint of one provider.
///
/// While open, the endpoint reports itself unhealthy and the router skips it
/// without spending a network call; after `open_timeout` one trial call is allowed.
/// Only provider-side failures (transport errors, 5xx, 429) should be recorded;
/// a rejected symbol says nothing about the provider's health.
#[derive(Debug)]
pub struct CircuitBreaker {
    provider: ProviderId,
    endpoint: Endpoint,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    pub fn new(provider: ProviderId, endpoint: Endpoint, config: CircuitBreakerConfig) -> Self {
        Self {
            provider,
            endpoint,
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    pub fn for_endpoint(provider: ProviderId, endpoint: Endpoint) -> Self {
        Self::new(provider, endpoint, CircuitBreakerConfig::default())
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn allow_request(&self) -> bool {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let can_trial = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.config.open_timeout)
                    .unwrap_or(false);

                if can_trial {
                    inner.state = CircuitState::HalfOpen;
                    inner.opened_at = None;
                    info!(
                        provider = %self.provider,
                        endpoint = %self.endpoint,
                        "circuit half-open; probing provider"
                    );
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        if inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold
        {
            if inner.state != CircuitState::Open {
                warn!(
                    provider = %self.provider,
                    endpoint = %self.endpoint,
                    failures = inner.consecutive_failures,
                    "circuit opened; provider will be skipped"
                );
            }
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    /// True while the circuit is open and its cool-down has not elapsed yet.
    /// Unlike [`allow_request`](Self::allow_request) this never transitions state.
    pub fn rejects_requests(&self) -> bool {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.state == CircuitState::Open
            && inner
                .opened_at
                .map(|opened_at| opened_at.elapsed() < self.config.open_timeout)
                .unwrap_or(true)
    }

    pub fn state(&self) -> CircuitState {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.consecutive_failures
    }
}

/// Independent breakers for every endpoint of one provider, so a failing
/// candle endpoint never blocks quotes.
#[derive(Debug, Clone)]
pub struct EndpointBreakers {
    quote: Arc<CircuitBreaker>,
    candles: Arc<CircuitBreaker>,
    search: Arc<CircuitBreaker>,
    news: Arc<CircuitBreaker>,
}

impl EndpointBreakers {
    pub fn new(provider: ProviderId, config: CircuitBreakerConfig) -> Self {
        let breaker = |endpoint| Arc::new(CircuitBreaker::new(provider, endpoint, config));
        Self {
            quote: breaker(Endpoint::Quote),
            candles: breaker(Endpoint::Candles),
            search: breaker(Endpoint::Search),
            news: breaker(Endpoint::News),
        }
    }

    pub fn for_provider(provider: ProviderId) -> Self {
        Self::new(provider, CircuitBreakerConfig::default())
    }

    pub fn get(&self, endpoint: Endpoint) -> &CircuitBreaker {
        match endpoint {
            Endpoint::Quote => &self.quote,
            Endpoint::Candles => &self.candles,
            Endpoint::Search => &self.search,
            Endpoint::News => &self.news,
        }
    }
}

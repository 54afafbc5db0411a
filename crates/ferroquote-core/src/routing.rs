use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, HealthState, HealthStatus, NewsRequest, SearchRequest,
    SourceError, SourceFuture,
};
use crate::normalizer::normalize;
use crate::{HistoricalPoint, NewsItem, Period, ProviderId, Quote, SearchResult, Symbol};

/// Source selection strategy for routing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceStrategy {
    /// The endpoint's fixed default chain.
    #[default]
    Default,
    Priority(Vec<ProviderId>),
    Strict(ProviderId),
}

impl SourceStrategy {
    fn is_strict(&self) -> bool {
        matches!(self, Self::Strict(_))
    }
}

/// One failed attempt within a routed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError {
    pub provider: ProviderId,
    pub error: SourceError,
}

impl Display for AttemptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Successful routed call.
#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    pub selected_source: ProviderId,
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<AttemptError>,
    pub latency_ms: u64,
}

/// Failed routed call after exhausting candidates.
#[derive(Debug, Clone)]
pub struct RouteFailure {
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<AttemptError>,
    pub latency_ms: u64,
}

impl Display for RouteFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "all {} source(s) failed", self.source_chain.len())?;
        for attempt in &self.errors {
            write!(f, "; {attempt}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RouteFailure {}

pub type RouteResult<T> = Result<RouteSuccess<T>, RouteFailure>;

/// Point-in-time view of one endpoint of a registered source.
#[derive(Debug, Clone, Copy)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub endpoint: Endpoint,
    pub capabilities: CapabilitySet,
    pub health: HealthStatus,
}

impl SourceSnapshot {
    pub fn available(self) -> bool {
        self.health.state != HealthState::Unhealthy
    }
}

/// Adapter registry and sequential fallback engine.
///
/// Providers are tried strictly one after another; the first success wins and
/// later providers are never contacted, so no quota is spent on them.
#[derive(Clone, Default)]
pub struct SourceRouter {
    adapters: HashMap<ProviderId, Arc<dyn DataSource>>,
}

impl SourceRouter {
    pub fn new(adapters: Vec<Arc<dyn DataSource>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self { adapters }
    }

    pub fn registered(&self) -> Vec<ProviderId> {
        let mut providers = self.adapters.keys().copied().collect::<Vec<_>>();
        providers.sort_by_key(|provider| provider.as_str());
        providers
    }

    pub fn source_chain_for_strategy(
        &self,
        endpoint: Endpoint,
        strategy: &SourceStrategy,
    ) -> Vec<ProviderId> {
        match strategy {
            SourceStrategy::Default => endpoint.default_chain(),
            SourceStrategy::Priority(priority) => dedupe_chain(priority),
            SourceStrategy::Strict(provider) => vec![*provider],
        }
    }

    pub async fn snapshot(
        &self,
        provider: ProviderId,
        endpoint: Endpoint,
    ) -> Option<SourceSnapshot> {
        let adapter = self.adapters.get(&provider)?;
        Some(SourceSnapshot {
            id: provider,
            endpoint,
            capabilities: adapter.capabilities(),
            health: adapter.health(endpoint).await,
        })
    }

    pub async fn route_quote<'r>(
        &'r self,
        symbol: &'r Symbol,
        strategy: &SourceStrategy,
    ) -> RouteResult<Quote> {
        self.route_endpoint(Endpoint::Quote, strategy, move |source| {
            source.quote(symbol)
        })
        .await
    }

    /// Routes a candle request, giving each provider its own normalized window.
    pub async fn route_candles<'r>(
        &'r self,
        symbol: &'r Symbol,
        period: Period,
        now: OffsetDateTime,
        strategy: &SourceStrategy,
    ) -> RouteResult<Vec<HistoricalPoint>> {
        self.route_endpoint(Endpoint::Candles, strategy, move |source| {
            source.candles(symbol, normalize(source.id(), period, now))
        })
        .await
    }

    pub async fn route_search<'r>(
        &'r self,
        req: &'r SearchRequest,
        strategy: &SourceStrategy,
    ) -> RouteResult<Vec<SearchResult>> {
        self.route_endpoint(Endpoint::Search, strategy, move |source| {
            source.search(req)
        })
        .await
    }

    pub async fn route_news<'r>(
        &'r self,
        req: &'r NewsRequest,
        strategy: &SourceStrategy,
    ) -> RouteResult<Vec<NewsItem>> {
        self.route_endpoint(Endpoint::News, strategy, move |source| source.news(req))
            .await
    }

    async fn route_endpoint<'r, T, F>(
        &'r self,
        endpoint: Endpoint,
        strategy: &SourceStrategy,
        mut invoke: F,
    ) -> RouteResult<T>
    where
        F: FnMut(&'r dyn DataSource) -> SourceFuture<'r, T>,
    {
        let started = Instant::now();
        let planned_chain = self.source_chain_for_strategy(endpoint, strategy);
        let mut source_chain = Vec::with_capacity(planned_chain.len());
        let mut errors = Vec::new();

        for provider in planned_chain {
            source_chain.push(provider);

            let outcome = match self.adapters.get(&provider) {
                None => Err(SourceError::adapter_not_registered(provider)),
                Some(adapter) => {
                    let adapter: &'r dyn DataSource = adapter.as_ref();
                    match precheck(adapter, endpoint).await {
                        Err(error) => Err(error),
                        Ok(()) => invoke(adapter).await,
                    }
                }
            };

            match outcome {
                Ok(data) => {
                    if !errors.is_empty() {
                        debug!(
                            %endpoint,
                            %provider,
                            failed_attempts = errors.len(),
                            "source fallback succeeded"
                        );
                    }
                    return Ok(RouteSuccess {
                        data,
                        selected_source: provider,
                        source_chain,
                        errors,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(error) => {
                    warn!(
                        %endpoint,
                        %provider,
                        code = error.code(),
                        reason = error.message(),
                        "source attempt failed; trying next"
                    );
                    errors.push(AttemptError { provider, error });
                    if strategy.is_strict() {
                        break;
                    }
                }
            }
        }

        Err(RouteFailure {
            source_chain,
            errors,
            latency_ms: elapsed_ms(started),
        })
    }
}

async fn precheck(adapter: &dyn DataSource, endpoint: Endpoint) -> Result<(), SourceError> {
    if !adapter.capabilities().supports(endpoint) {
        return Err(SourceError::unsupported_endpoint(endpoint));
    }

    let health = adapter.health(endpoint).await;
    if health.state == HealthState::Unhealthy {
        return Err(SourceError::unavailable(
            "source health check reported unhealthy",
        ));
    }
    if !health.rate_available {
        return Err(SourceError::rate_limited(
            "source has no rate budget available",
        ));
    }
    Ok(())
}

fn dedupe_chain(chain: &[ProviderId]) -> Vec<ProviderId> {
    let mut seen = HashSet::new();
    let mut output = Vec::with_capacity(chain.len());

    for provider in chain {
        if seen.insert(*provider) {
            output.push(*provider);
        }
    }

    output
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

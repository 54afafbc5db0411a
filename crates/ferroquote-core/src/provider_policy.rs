use std::time::Duration;

use crate::ProviderId;

/// Static request budget for a provider's free tier.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ProviderPolicy {
    /// Alpha Vantage free tier: 5 requests per minute.
    pub fn alphavantage_default() -> Self {
        Self {
            provider_id: ProviderId::Alphavantage,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
        }
    }

    /// Finnhub free tier: 60 requests per minute.
    pub fn finnhub_default() -> Self {
        Self {
            provider_id: ProviderId::Finnhub,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
        }
    }

    /// Yahoo publishes no quota; it is only guarded by its circuit breaker.
    pub fn default_for(provider_id: ProviderId) -> Option<Self> {
        match provider_id {
            ProviderId::Alphavantage => Some(Self::alphavantage_default()),
            ProviderId::Finnhub => Some(Self::finnhub_default()),
            ProviderId::Yahoo => None,
        }
    }
}

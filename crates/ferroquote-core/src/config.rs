//! Runtime configuration resolved from the environment.
//!
//! Credentials fall back to the providers' public demo tiers, so an
//! unconfigured process still works (slowly, and mostly rate-limited).

use std::env;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

use tracing::warn;

use crate::cache::DEFAULT_QUOTE_TTL;
use crate::http_client::DEFAULT_TIMEOUT_MS;

/// Finnhub's published sandbox key.
pub const DEMO_FINNHUB_API_KEY: &str = "d2fp7opr01qkv5ne8hi0d2fp7opr01qkv5ne8hig";
pub const DEMO_ALPHAVANTAGE_API_KEY: &str = "demo";

#[derive(Clone, PartialEq, Eq)]
pub struct MarketDataConfig {
    pub finnhub_api_key: String,
    pub alphavantage_api_key: String,
    /// Per-provider request timeout.
    pub timeout_ms: u64,
    pub cache_ttl: Duration,
    /// Build every adapter over a client that never touches the network.
    pub offline: bool,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: String::from(DEMO_FINNHUB_API_KEY),
            alphavantage_api_key: String::from(DEMO_ALPHAVANTAGE_API_KEY),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_ttl: DEFAULT_QUOTE_TTL,
            offline: false,
        }
    }
}

impl MarketDataConfig {
    /// Reads `FERROQUOTE_*` variables, falling back to the providers' conventional names.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`MarketDataConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let first_set = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        };

        let finnhub_api_key = first_set(&["FERROQUOTE_FINNHUB_API_KEY", "FINNHUB_API_KEY"])
            .unwrap_or(defaults.finnhub_api_key);
        let alphavantage_api_key =
            first_set(&["FERROQUOTE_ALPHAVANTAGE_API_KEY", "ALPHAVANTAGE_API_KEY"])
                .unwrap_or(defaults.alphavantage_api_key);
        let timeout_ms = parse_or_default(
            "FERROQUOTE_TIMEOUT_MS",
            first_set(&["FERROQUOTE_TIMEOUT_MS"]),
            defaults.timeout_ms,
        );
        let cache_ttl_secs = parse_or_default(
            "FERROQUOTE_CACHE_TTL_SECS",
            first_set(&["FERROQUOTE_CACHE_TTL_SECS"]),
            defaults.cache_ttl.as_secs(),
        );

        Self {
            finnhub_api_key,
            alphavantage_api_key,
            timeout_ms,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            offline: false,
        }
    }

    pub fn with_finnhub_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = key.into();
        self
    }

    pub fn with_alphavantage_key(mut self, key: impl Into<String>) -> Self {
        self.alphavantage_api_key = key.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn uses_demo_keys(&self) -> bool {
        self.finnhub_api_key == DEMO_FINNHUB_API_KEY
            || self.alphavantage_api_key == DEMO_ALPHAVANTAGE_API_KEY
    }
}

impl Debug for MarketDataConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataConfig")
            .field("finnhub_api_key", &"<redacted>")
            .field("alphavantage_api_key", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("cache_ttl", &self.cache_ttl)
            .field("offline", &self.offline)
            .finish()
    }
}

fn parse_or_default(name: &str, raw: Option<String>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => {
            warn!(variable = name, value = %raw, default, "ignoring malformed setting");
            default
        }
    }
}

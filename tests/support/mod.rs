//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferroquote_core::{
    HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse, ManualClock, MarketData,
    MarketDataConfig, Symbol,
};
use time::macros::datetime;
use time::OffsetDateTime;

/// 2024-06-03 is a Monday; the last scripted candles are the previous week.
pub const NOW: OffsetDateTime = datetime!(2024-06-03 15:00 UTC);

#[derive(Debug, Clone)]
enum Reply {
    Status(u16, String),
    TransportError,
}

#[derive(Debug, Clone)]
struct Rule {
    fragment: String,
    reply: Reply,
    delay: Option<Duration>,
}

/// `HttpClient` that answers by URL fragment. The first matching rule wins;
/// unmatched URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    rules: Vec<Rule>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, fragment: &str, body: &str) -> Self {
        self.respond_status(fragment, 200, body)
    }

    pub fn respond_status(mut self, fragment: &str, status: u16, body: &str) -> Self {
        self.rules.push(Rule {
            fragment: fragment.to_owned(),
            reply: Reply::Status(status, body.to_owned()),
            delay: None,
        });
        self
    }

    pub fn respond_after(mut self, fragment: &str, delay: Duration, body: &str) -> Self {
        self.rules.push(Rule {
            fragment: fragment.to_owned(),
            reply: Reply::Status(200, body.to_owned()),
            delay: Some(delay),
        });
        self
    }

    pub fn fail(mut self, fragment: &str) -> Self {
        self.rules.push(Rule {
            fragment: fragment.to_owned(),
            reply: Reply::TransportError,
            delay: None,
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(request.url.clone());
        let rule = self
            .rules
            .iter()
            .find(|rule| request.url.contains(&rule.fragment))
            .cloned();

        Box::pin(async move {
            let Some(rule) = rule else {
                return Err(HttpError::new(format!("unreachable host: {}", request.url)));
            };
            if let Some(delay) = rule.delay {
                tokio::time::sleep(delay).await;
            }
            match rule.reply {
                Reply::Status(status, body) => Ok(HttpResponse::with_status(status, body)),
                Reply::TransportError => Err(HttpError::new("connection reset by peer")),
            }
        })
    }
}

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(NOW))
}

/// Facade over the three real adapters, talking to `client`.
pub fn market(client: Arc<ScriptedHttpClient>, clock: Arc<ManualClock>) -> MarketData {
    MarketData::builder()
        .with_config(MarketDataConfig::default().with_timeout_ms(2_000))
        .with_http_client(client)
        .with_clock(clock)
        .build()
}

pub fn finnhub_quote(price: f64, previous_close: f64) -> String {
    let change = price - previous_close;
    format!(
        r#"{{"c":{price},"d":{change},"dp":{},"h":{price},"l":{previous_close},"o":{previous_close},"pc":{previous_close},"t":1717426800}}"#,
        change / previous_close * 100.0
    )
}

pub fn yahoo_chart(price: f64, previous_close: f64, timestamps: &[i64], closes: &[f64]) -> String {
    let timestamps = timestamps
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let closes = closes
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"{{"chart":{{"result":[{{"meta":{{"regularMarketPrice":{price},"chartPreviousClose":{previous_close},"regularMarketVolume":1200}},"timestamp":[{timestamps}],"indicators":{{"quote":[{{"open":[],"close":[{closes}]}}]}}}}],"error":null}}}}"#
    )
}

pub fn alphavantage_quote(symbol: &str, price: f64, previous_close: f64) -> String {
    let change = price - previous_close;
    format!(
        r#"{{"Global Quote":{{"01. symbol":"{symbol}","02. open":"{previous_close:.4}","03. high":"{price:.4}","04. low":"{previous_close:.4}","05. price":"{price:.4}","06. volume":"5000","07. latest trading day":"2024-05-31","08. previous close":"{previous_close:.4}","09. change":"{change:.4}","10. change percent":"{:.4}%"}}}}"#,
        change / previous_close * 100.0
    )
}

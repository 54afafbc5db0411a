use serde::{Deserialize, Serialize};
use time::Date;

use crate::{ProviderId, Symbol, UtcDateTime, ValidationError};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Canonical instrument class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Etf,
    Index,
    Crypto,
    Forex,
    Fund,
    Other,
}

impl AssetClass {
    /// Classifies a provider's free-form instrument type label.
    pub fn from_instrument_type(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "equity" | "common stock" | "stock" => Self::Equity,
            "etf" | "exchange traded fund" | "etp" => Self::Etf,
            "fund" | "mutual fund" | "mutualfund" => Self::Fund,
            "index" => Self::Index,
            "crypto" | "cryptocurrency" => Self::Crypto,
            "currency" | "forex" => Self::Forex,
            _ => Self::Other,
        }
    }
}

/// Numeric body of a quote, shared by provider-sourced and synthetic quotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteValues {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
}

/// Normalized point-in-time snapshot for a symbol.
///
/// A quote is either entirely provider-reported (`is_fallback == false`,
/// `source` set) or entirely synthetic (`is_fallback == true`, `source` empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub change: f64,
    /// Percentage units, e.g. `1.5` for +1.5%.
    pub change_percent: f64,
    pub volume: u64,
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub is_fallback: bool,
    pub source: Option<ProviderId>,
    pub as_of: UtcDateTime,
}

impl Quote {
    pub fn from_provider(
        source: ProviderId,
        symbol: Symbol,
        values: QuoteValues,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", values.price)?;
        validate_finite("change", values.change)?;
        validate_finite("change_percent", values.change_percent)?;
        validate_finite("previous_close", values.previous_close)?;
        validate_finite("open", values.open)?;
        validate_finite("high", values.high)?;
        validate_finite("low", values.low)?;

        Ok(Self::assemble(symbol, values, false, Some(source), as_of))
    }

    pub fn synthetic(symbol: Symbol, values: QuoteValues, as_of: UtcDateTime) -> Self {
        Self::assemble(symbol, values, true, None, as_of)
    }

    fn assemble(
        symbol: Symbol,
        values: QuoteValues,
        is_fallback: bool,
        source: Option<ProviderId>,
        as_of: UtcDateTime,
    ) -> Self {
        Self {
            symbol,
            price: values.price,
            change: values.change,
            change_percent: values.change_percent,
            volume: values.volume,
            previous_close: values.previous_close,
            open: values.open,
            high: values.high,
            low: values.low,
            is_fallback,
            source,
            as_of,
        }
    }
}

/// One sample in a daily (or coarser) price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub price: f64,
}

impl HistoricalPoint {
    pub fn new(date: Date, price: f64) -> Result<Self, ValidationError> {
        validate_finite("price", price)?;
        if price <= 0.0 {
            return Err(ValidationError::NonPositiveValue { field: "price" });
        }
        Ok(Self { date, price })
    }
}

/// Orders a raw provider series: ascending dates, one point per date (the
/// latest sample for a date wins), and no non-positive or non-finite prices.
pub fn normalize_series(mut points: Vec<HistoricalPoint>) -> Vec<HistoricalPoint> {
    points.retain(|point| point.price.is_finite() && point.price > 0.0);
    points.sort_by_key(|point| point.date);

    let mut output: Vec<HistoricalPoint> = Vec::with_capacity(points.len());
    for point in points {
        match output.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => output.push(point),
        }
    }
    output
}

/// One ticker/name match returned by symbol search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: Symbol,
    pub name: String,
    pub instrument_type: String,
    pub region: String,
    pub asset_class: AssetClass,
}

impl SearchResult {
    pub fn new(
        symbol: Symbol,
        name: impl Into<String>,
        instrument_type: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        let instrument_type = instrument_type.into();
        Self {
            symbol,
            name: name.into(),
            asset_class: AssetClass::from_instrument_type(&instrument_type),
            instrument_type,
            region: region.into(),
        }
    }

    /// Case-insensitive substring match against symbol and name.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        self.symbol.as_str().to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
    }
}

/// One headline from a provider news feed.
///
/// Items without a title or link are never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub url: String,
    pub datetime: UtcDateTime,
    pub image: String,
    pub summary: String,
    /// Tickers the provider tagged; for a company feed, the requested symbol.
    pub related: String,
}

impl NewsItem {
    /// Returns `None` when the headline or link is blank.
    pub fn new(
        id: i64,
        title: impl Into<String>,
        url: impl Into<String>,
        datetime: UtcDateTime,
    ) -> Option<Self> {
        let title = title.into();
        let url = url.into();
        if title.trim().is_empty() || url.trim().is_empty() {
            return None;
        }
        Some(Self {
            id,
            title,
            source: String::new(),
            url,
            datetime,
            image: String::new(),
            summary: String::new(),
            related: String::new(),
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

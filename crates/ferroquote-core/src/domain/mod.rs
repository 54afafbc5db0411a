//! # Domain Models
//!
//! Canonical domain types shared by every provider adapter and by callers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Quote`] | Normalized point-in-time snapshot, provider-sourced or synthetic |
//! | [`HistoricalPoint`] | One dated close price in a series |
//! | [`SearchResult`] | Ticker/name match from symbol search |
//! | [`NewsItem`] | Headline from a news feed |
//! | [`Period`] | Caller-facing history window token (1W ... 10Y) |
//! | [`Symbol`] | Validated ticker |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Provider adapters construct quotes through [`Quote::from_provider`], which
//! rejects non-finite values; the synthetic generator uses [`Quote::synthetic`].
//! Series returned to callers always pass through [`normalize_series`].

mod models;
mod period;
mod symbol;
mod timestamp;

pub use models::{
    normalize_series, AssetClass, HistoricalPoint, NewsItem, Quote, QuoteValues, SearchResult,
};
pub use period::Period;
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;

//! Period normalization.
//!
//! Translates a caller-facing [`Period`] into each provider's native
//! span/resolution vocabulary. This is the only place that knows those
//! vocabularies; adapters consume the resulting [`PeriodMapping`] as-is.
//!
//! | Period | Yahoo | Finnhub | Alpha Vantage |
//! |--------|-------|---------|---------------|
//! | 1W | `5d` / `1d` | now-7d / `D` | last 7 / daily |
//! | 1M | `1mo` / `1d` | now-30d / `D` | last 30 / daily |
//! | 3M | `3mo` / `1d` | now-90d / `D` | last 90 / daily |
//! | 6M | `6mo` / `1d` | now-180d / `D` | last 180 / daily |
//! | 1Y | `1y` / `1d` | now-365d / `D` | last 365 / daily |
//! | YTD | `ytd` / `1d` | Jan 1 / `D` | current year / daily |
//! | 3Y | `3y` / `1wk` | now-1095d / `W` | last 1095 / daily |
//! | 5Y | `5y` / `1mo` | now-1825d / `M` | last 1825 / daily |
//! | 10Y | `10y` / `1mo` | now-3650d / `M` | last 3650 / daily |

use serde::Serialize;
use time::{Date, Month, OffsetDateTime, Time};

use crate::{Period, ProviderId};

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Client-side trimming applied to a provider that cannot window server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Trim {
    /// Keep the most recent `n` entries of the ascending series.
    LastPoints(usize),
    /// Keep entries dated within this calendar year.
    CalendarYear(i32),
}

impl Trim {
    /// Applies the trim to an ascending series.
    pub fn apply<T>(self, mut entries: Vec<T>, date_of: impl Fn(&T) -> Date) -> Vec<T> {
        match self {
            Self::LastPoints(n) => {
                let skip = entries.len().saturating_sub(n);
                entries.drain(..skip);
                entries
            }
            Self::CalendarYear(year) => {
                entries.retain(|entry| date_of(entry).year() == year);
                entries
            }
        }
    }
}

/// Provider-native description of a time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeSpan {
    /// Calendar-range string such as `1mo` or `ytd`.
    Range(&'static str),
    /// Epoch-second window, inclusive on both ends.
    Window { from: i64, to: i64 },
    /// Output-size flag plus the client-side trim that narrows it.
    OutputSize { size: &'static str, trim: Trim },
}

/// One provider's (span, resolution) pair for a logical period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodMapping {
    pub provider: ProviderId,
    pub period: Period,
    pub span: NativeSpan,
    pub resolution: &'static str,
}

/// Maps `period` into `provider`'s vocabulary. `now` anchors epoch windows
/// and the year-to-date boundary.
pub fn normalize(provider: ProviderId, period: Period, now: OffsetDateTime) -> PeriodMapping {
    let (span, resolution) = match provider {
        ProviderId::Yahoo => yahoo(period),
        ProviderId::Finnhub => finnhub(period, now),
        ProviderId::Alphavantage => alphavantage(period, now),
    };

    PeriodMapping {
        provider,
        period,
        span,
        resolution,
    }
}

/// Token-level entry point; aliases collapse to one [`Period`] before mapping,
/// so `1y`, `12m` and `1yr` yield identical results.
pub fn normalize_token(provider: ProviderId, token: &str, now: OffsetDateTime) -> PeriodMapping {
    normalize(provider, Period::from_token(token), now)
}

fn yahoo(period: Period) -> (NativeSpan, &'static str) {
    let range = match period {
        Period::OneWeek => "5d",
        Period::OneMonth => "1mo",
        Period::ThreeMonths => "3mo",
        Period::SixMonths => "6mo",
        Period::OneYear => "1y",
        Period::YearToDate => "ytd",
        Period::ThreeYears => "3y",
        Period::FiveYears => "5y",
        Period::TenYears => "10y",
    };
    let interval = match period {
        Period::ThreeYears => "1wk",
        Period::FiveYears | Period::TenYears => "1mo",
        _ => "1d",
    };
    (NativeSpan::Range(range), interval)
}

fn finnhub(period: Period, now: OffsetDateTime) -> (NativeSpan, &'static str) {
    let to = now.unix_timestamp();
    let from = match period.trailing_days() {
        Some(days) => to - i64::from(days) * SECONDS_PER_DAY,
        None => start_of_year(now).unix_timestamp(),
    };
    let resolution = match period {
        Period::ThreeYears => "W",
        Period::FiveYears | Period::TenYears => "M",
        _ => "D",
    };
    (NativeSpan::Window { from, to }, resolution)
}

fn alphavantage(period: Period, now: OffsetDateTime) -> (NativeSpan, &'static str) {
    let trim = match period.trailing_days() {
        Some(days) => Trim::LastPoints(days as usize),
        None => Trim::CalendarYear(now.year()),
    };
    (
        NativeSpan::OutputSize {
            size: "compact",
            trim,
        },
        "daily",
    )
}

fn start_of_year(now: OffsetDateTime) -> OffsetDateTime {
    let now = now.to_offset(time::UtcOffset::UTC);
    match Date::from_calendar_date(now.year(), Month::January, 1) {
        Ok(jan_first) => jan_first.with_time(Time::MIDNIGHT).assume_utc(),
        Err(_) => now,
    }
}

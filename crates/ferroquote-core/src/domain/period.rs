use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller-facing logical time window for historical series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "3Y")]
    ThreeYears,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "10Y")]
    TenYears,
}

impl Period {
    pub const ALL: [Self; 9] = [
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::YearToDate,
        Self::ThreeYears,
        Self::FiveYears,
        Self::TenYears,
    ];

    /// Parses a period token, accepting common aliases. Unknown tokens map to
    /// [`Period::OneMonth`].
    pub fn from_token(token: &str) -> Self {
        Self::parse_known(token).unwrap_or_default()
    }

    /// Parses a period token, returning `None` for unrecognized input.
    pub fn parse_known(token: &str) -> Option<Self> {
        let normalized = token.trim().to_ascii_lowercase();
        let period = match normalized.as_str() {
            "1w" | "1wk" | "week" | "1week" => Self::OneWeek,
            "1m" | "1mo" | "1month" | "month" => Self::OneMonth,
            "3m" | "3mo" | "3month" => Self::ThreeMonths,
            "6m" | "6mo" | "6month" => Self::SixMonths,
            "1y" | "12m" | "1yr" | "year" => Self::OneYear,
            "ytd" => Self::YearToDate,
            "3y" | "3yr" => Self::ThreeYears,
            "5y" | "5yr" => Self::FiveYears,
            "10y" | "10yr" => Self::TenYears,
            _ => return None,
        };
        Some(period)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::YearToDate => "YTD",
            Self::ThreeYears => "3Y",
            Self::FiveYears => "5Y",
            Self::TenYears => "10Y",
        }
    }

    /// Trailing calendar-day length of the window. `None` for year-to-date,
    /// whose length depends on the current date.
    pub const fn trailing_days(self) -> Option<u32> {
        match self {
            Self::OneWeek => Some(7),
            Self::OneMonth => Some(30),
            Self::ThreeMonths => Some(90),
            Self::SixMonths => Some(180),
            Self::OneYear => Some(365),
            Self::YearToDate => None,
            Self::ThreeYears => Some(3 * 365),
            Self::FiveYears => Some(5 * 365),
            Self::TenYears => Some(10 * 365),
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::OneMonth
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_token(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!(Period::from_token("1WK"), Period::OneWeek);
        assert_eq!(Period::from_token("week"), Period::OneWeek);
        assert_eq!(Period::from_token(" 12m "), Period::OneYear);
        assert_eq!(Period::from_token("YTD"), Period::YearToDate);
        assert_eq!(Period::from_token("10yr"), Period::TenYears);
    }

    #[test]
    fn unknown_token_defaults_to_one_month() {
        assert_eq!(Period::from_token("forever"), Period::OneMonth);
        assert_eq!(Period::from_token(""), Period::OneMonth);
        assert_eq!(Period::parse_known("forever"), None);
    }

    #[test]
    fn canonical_tokens_round_trip() {
        for period in Period::ALL {
            assert_eq!(Period::from_token(period.as_str()), period);
        }
    }
}

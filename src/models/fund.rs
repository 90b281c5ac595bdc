use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::NavSeries;

/// Which lookup produced the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundKind {
    /// Open-end (over-the-counter) fund with a published daily NAV
    #[serde(rename = "open_end")]
    OpenEnd,
    /// Exchange-traded fund; daily close is used as the NAV
    #[serde(rename = "exchange_traded")]
    ExchangeTraded,
}

impl std::fmt::Display for FundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundKind::OpenEnd => write!(f, "open-end fund"),
            FundKind::ExchangeTraded => write!(f, "ETF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FundMetadata {
    pub name: Option<String>,
    pub category: Option<String>,
    pub inception_date: Option<NaiveDate>,
    pub manager: Option<String>,
    pub size: Option<String>,
}

impl FundMetadata {
    /// Fills every missing field from `other`.
    pub fn or(self, other: FundMetadata) -> FundMetadata {
        FundMetadata {
            name: self.name.or(other.name),
            category: self.category.or(other.category),
            inception_date: self.inception_date.or(other.inception_date),
            manager: self.manager.or(other.manager),
            size: self.size.or(other.size),
        }
    }
}

/// Raw history of one fund as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundHistory {
    pub code: String,
    pub kind: FundKind,
    pub metadata: FundMetadata,
    pub series: NavSeries,
}

/// Headline numbers shown next to the fund name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FundSnapshot {
    pub current_nav: f64,
    pub today_change_pct: Option<f64>,
    pub one_year_change_pct: Option<f64>,
}

impl FundSnapshot {
    /// `full_history` is consulted for the one-year reference when `series`
    /// does not reach back far enough.
    pub fn compute(series: &NavSeries, full_history: Option<&NavSeries>, today: NaiveDate) -> Option<Self> {
        let last = series.last()?;
        let today_change_pct = series
            .daily_change_pct()
            .last()
            .copied()
            .flatten();

        let one_year_ago = today - Duration::days(365);
        let reference = series
            .value_on_or_before(one_year_ago)
            .or_else(|| full_history.and_then(|h| h.value_on_or_before(one_year_ago)));

        Some(Self {
            current_nav: last.value,
            today_change_pct,
            one_year_change_pct: reference.map(|r| (last.value - r) / r * 100.0),
        })
    }

    pub fn needs_full_history(series: &NavSeries, today: NaiveDate) -> bool {
        series
            .value_on_or_before(today - Duration::days(365))
            .is_none()
    }
}

/// Canned date ranges offered next to the explicit start/end pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuickRange {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "3y")]
    ThreeYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "all")]
    SinceInception,
}

impl QuickRange {
    pub fn start_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            QuickRange::OneMonth => today - Duration::days(30),
            QuickRange::ThreeMonths => today - Duration::days(90),
            QuickRange::SixMonths => today - Duration::days(180),
            QuickRange::OneYear => today - Duration::days(365),
            QuickRange::YearToDate => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            QuickRange::ThreeYears => today - Duration::days(1095),
            QuickRange::FiveYears => today - Duration::days(1825),
            QuickRange::SinceInception => NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(today),
        }
    }
}

impl std::str::FromStr for QuickRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(QuickRange::OneMonth),
            "3m" => Ok(QuickRange::ThreeMonths),
            "6m" => Ok(QuickRange::SixMonths),
            "1y" => Ok(QuickRange::OneYear),
            "ytd" => Ok(QuickRange::YearToDate),
            "3y" => Ok(QuickRange::ThreeYears),
            "5y" => Ok(QuickRange::FiveYears),
            "all" => Ok(QuickRange::SinceInception),
            other => Err(format!(
                "Invalid range '{}'. Must be one of 1m, 3m, 6m, 1y, ytd, 3y, 5y, all",
                other
            )),
        }
    }
}

/// Cache key and fetch parameters for one history lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryRequest {
    pub code: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl HistoryRequest {
    pub fn new(code: impl Into<String>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            code: code.into(),
            start,
            end,
        }
    }

    pub fn unbounded(code: impl Into<String>) -> Self {
        Self::new(code, None, None)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

use thiserror::Error;
use tracing::info;

use crate::models::{AdviceReport, NavPoint, NavSeries, SeriesError};
use crate::services::analysis_service::{analyze, AnalysisError};
use crate::services::scoring_service::ScoringMode;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    #[error("Please enter a percentage change")]
    Empty,

    #[error("'{0}' is not a valid percentage change")]
    NotANumber(String),

    #[error("Percentage change must be greater than -100%, got {0}%")]
    OutOfRange(f64),

    #[error("No NAV data to project from")]
    NoData,

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Parses user input such as `"1.5"`, `" -2% "` or `"+0.8%"`.
///
/// Malformed input is rejected instead of being read as zero.
pub fn parse_change_pct(text: &str) -> Result<f64, ValuationError> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if number.is_empty() {
        return Err(ValuationError::Empty);
    }

    let pct: f64 = number
        .parse()
        .map_err(|_| ValuationError::NotANumber(trimmed.to_string()))?;

    if !pct.is_finite() {
        return Err(ValuationError::NotANumber(trimmed.to_string()));
    }
    if pct <= -100.0 {
        return Err(ValuationError::OutOfRange(pct));
    }

    Ok(pct)
}

/// A what-if NAV appended one day after the last observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub change_pct: f64,
    pub point: NavPoint,
    pub series: NavSeries,
}

impl Projection {
    pub fn from_series(original: &NavSeries, change_pct: f64) -> Result<Self, ValuationError> {
        let last = original.last().ok_or(ValuationError::NoData)?;
        let date = last
            .date
            .succ_opt()
            .ok_or(SeriesError::DateOverflow(last.date))?;
        let point = NavPoint::new(date, last.value * (1.0 + change_pct / 100.0));
        let series = original.with_appended(point)?;

        Ok(Self {
            change_pct,
            point,
            series,
        })
    }
}

/// Immutable state of one fund analysis: the fetched series, at most one
/// active projection and the report computed for whichever series is current.
///
/// Every transition returns a new session. Projections are always derived
/// from the original series, so applying a second one replaces the first.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    original: NavSeries,
    projection: Option<Projection>,
    mode: ScoringMode,
    report: Result<AdviceReport, AnalysisError>,
}

impl AnalysisSession {
    pub fn new(original: NavSeries, mode: ScoringMode) -> Self {
        let report = analyze(&original, mode);
        Self {
            original,
            projection: None,
            mode,
            report,
        }
    }

    pub fn original(&self) -> &NavSeries {
        &self.original
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Series the report was computed from.
    pub fn current_series(&self) -> &NavSeries {
        self.projection
            .as_ref()
            .map_or(&self.original, |p| &p.series)
    }

    pub fn report(&self) -> Result<&AdviceReport, &AnalysisError> {
        self.report.as_ref()
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn project(&self, change_pct: f64) -> Result<Self, ValuationError> {
        let projection = Projection::from_series(&self.original, change_pct)?;
        let report = analyze(&projection.series, self.mode);

        info!(
            "Projected {:+.2}% → {:.4} on {}",
            change_pct, projection.point.value, projection.point.date
        );

        Ok(Self {
            original: self.original.clone(),
            projection: Some(projection),
            mode: self.mode,
            report,
        })
    }

    /// Parses the user's text and projects it.
    pub fn project_text(&self, text: &str) -> Result<Self, ValuationError> {
        self.project(parse_change_pct(text)?)
    }

    /// Drops the active projection. A session without one is returned as is.
    pub fn revert(&self) -> Self {
        if self.projection.is_none() {
            return self.clone();
        }
        Self::new(self.original.clone(), self.mode)
    }
}

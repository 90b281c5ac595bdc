use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One published net asset value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl NavPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("NAV on {date} must be a positive number, got {value}")]
    NonPositiveValue { date: NaiveDate, value: f64 },

    #[error("dates must be strictly increasing: {previous} is followed by {next}")]
    OutOfOrder { previous: NaiveDate, next: NaiveDate },

    #[error("no calendar day follows {0}")]
    DateOverflow(NaiveDate),
}

/// Time-ordered NAV history of one fund.
///
/// Dates are strictly increasing and every value is a finite positive number.
/// Both invariants are checked once, at construction, so every consumer
/// (indicators, scoring, export) can index the series by position.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct NavSeries {
    points: Vec<NavPoint>,
}

impl NavSeries {
    pub fn new(points: Vec<NavPoint>) -> Result<Self, SeriesError> {
        for point in &points {
            if !point.value.is_finite() || point.value <= 0.0 {
                return Err(SeriesError::NonPositiveValue {
                    date: point.date,
                    value: point.value,
                });
            }
        }

        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::OutOfOrder {
                previous: w[0].date,
                next: w[1].date,
            });
        }

        Ok(Self { points })
    }

    /// Builds a series from provider output: sorts by date, keeps the last
    /// value published for a duplicated date and drops unusable values.
    pub fn from_unordered(mut points: Vec<NavPoint>) -> Result<Self, SeriesError> {
        points.retain(|p| p.value.is_finite() && p.value > 0.0);
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<NavPoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self::new(deduped)
    }

    pub fn points(&self) -> &[NavPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&NavPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&NavPoint> {
        self.points.last()
    }

    /// Same-day percentage change against the previous point; `None` for the first.
    pub fn daily_change_pct(&self) -> Vec<Option<f64>> {
        std::iter::once(None)
            .chain(
                self.points
                    .windows(2)
                    .map(|w| Some((w[1].value - w[0].value) / w[0].value * 100.0)),
            )
            .take(self.points.len())
            .collect()
    }

    /// Returns a new series with `point` appended. The receiver is left untouched.
    pub fn with_appended(&self, point: NavPoint) -> Result<Self, SeriesError> {
        let mut points = self.points.clone();
        points.push(point);
        Self::new(points)
    }

    /// Inclusive date filter. Either bound may be open.
    pub fn filter_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let points = self
            .points
            .iter()
            .filter(|p| start.map_or(true, |s| p.date >= s))
            .filter(|p| end.map_or(true, |e| p.date <= e))
            .copied()
            .collect();
        Self { points }
    }

    /// Last value published on or before `date`.
    pub fn value_on_or_before(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .iter()
            .take_while(|p| p.date <= date)
            .last()
            .map(|p| p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_new_rejects_duplicate_dates() {
        let err = NavSeries::new(vec![NavPoint::new(d(1), 1.0), NavPoint::new(d(1), 1.1)]).unwrap_err();
        assert_eq!(err, SeriesError::OutOfOrder { previous: d(1), next: d(1) });
    }

    #[test]
    fn test_new_rejects_non_positive_values() {
        assert!(NavSeries::new(vec![NavPoint::new(d(1), 0.0)]).is_err());
        assert!(NavSeries::new(vec![NavPoint::new(d(1), f64::NAN)]).is_err());
    }

    #[test]
    fn test_from_unordered_sorts_and_keeps_last_duplicate() {
        let series = NavSeries::from_unordered(vec![
            NavPoint::new(d(3), 1.3),
            NavPoint::new(d(1), 1.0),
            NavPoint::new(d(3), 1.35),
            NavPoint::new(d(2), -1.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].date, d(1));
        assert_eq!(series.points()[1].value, 1.35);
    }

    #[test]
    fn test_daily_change_pct_is_aligned() {
        let series = NavSeries::new(vec![NavPoint::new(d(1), 1.0), NavPoint::new(d(2), 1.1)]).unwrap();
        let changes = series.daily_change_pct();

        assert_eq!(changes.len(), 2);
        assert!(changes[0].is_none());
        assert!((changes[1].unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_filter_range_is_inclusive() {
        let series = NavSeries::new((1..=5).map(|i| NavPoint::new(d(i), 1.0 + i as f64 / 10.0)).collect()).unwrap();
        let filtered = series.filter_range(Some(d(2)), Some(d(4)));

        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered.first().unwrap().date, d(2));
        assert_eq!(filtered.last().unwrap().date, d(4));
    }

    #[test]
    fn test_with_appended_leaves_original_untouched() {
        let series = NavSeries::new(vec![NavPoint::new(d(1), 1.0)]).unwrap();
        let extended = series.with_appended(NavPoint::new(d(2), 1.2)).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(extended.len(), 2);
    }
}

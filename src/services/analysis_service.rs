use thiserror::Error;
use tracing::debug;

use crate::models::{AdviceLevel, AdviceReport, NavSeries};
use crate::services::indicators::{compute_indicator_set, drawdown_recoveries, max_drawdown};
use crate::services::scoring_service::{
    assess_band_trend, assess_drawdown, assess_reversal, assessment_consensus, band_signal_markers,
    composite_score, rationale, ScoringMode,
};
use crate::services::streak_service::{analyze_streaks, reversal_curve};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

/// Runs the full pipeline over one series: indicators and streaks, the three
/// assessments, the composite score and the rationale text.
///
/// Pure and re-entrant. A single point is enough and yields a neutral
/// report; an empty series is reported as insufficient data.
pub fn analyze(series: &NavSeries, mode: ScoringMode) -> Result<AdviceReport, AnalysisError> {
    let values = series.values();
    let latest = *values
        .last()
        .ok_or_else(|| AnalysisError::InsufficientData("the NAV series is empty".to_string()))?;

    let indicators = compute_indicator_set(&values);
    let streaks = analyze_streaks(&values);
    let recoveries = drawdown_recoveries(&indicators.drawdown_pct);
    let reversals = streaks.reversals();
    let max_drawdown_pct = max_drawdown(&values);

    let snapshot = indicators
        .snapshot(latest)
        .ok_or_else(|| AnalysisError::InsufficientData("no indicator values".to_string()))?;

    let band = assess_band_trend(&snapshot);
    let drawdown = assess_drawdown(&snapshot, max_drawdown_pct, &recoveries, mode);
    let reversal = assess_reversal(streaks.current(), &snapshot, &reversals, mode);

    let composite = composite_score(&snapshot, &band, streaks.current());
    let advice_level = AdviceLevel::from_score(composite.total);

    let assessments = vec![band, drawdown, reversal];
    let consensus_level = AdviceLevel::from_consensus_score(assessment_consensus(&assessments));

    let rationale = rationale(&snapshot, &composite, advice_level, streaks.current());
    let markers = band_signal_markers(&values, &indicators);
    let reversal_curve = reversal_curve(streaks.longest(), snapshot.volatility, &reversals);

    debug!(
        "Analyzed {} points: score {} → {}, consensus {}",
        values.len(),
        composite.total,
        advice_level,
        consensus_level
    );

    Ok(AdviceReport {
        indicators,
        streaks,
        reversal_curve,
        recoveries,
        max_drawdown_pct,
        markers,
        assessments,
        composite,
        advice_level,
        consensus_level,
        rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NavPoint, Recommendation, SignalKind};
    use chrono::{Duration, NaiveDate};

    fn series(values: &[f64]) -> NavSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        NavSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| NavPoint::new(start + Duration::days(i as i64), v))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_series_is_insufficient_data() {
        let err = analyze(&NavSeries::default(), ScoringMode::Base).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    #[test]
    fn test_single_point_is_neutral() {
        let report = analyze(&series(&[1.0]), ScoringMode::Base).unwrap();

        assert_eq!(report.advice_level, AdviceLevel::Neutral);
        assert_eq!(report.assessments.len(), 3);
        assert!(report.streaks.current().is_none());
    }

    #[test]
    fn test_report_vectors_are_aligned() {
        let values: Vec<f64> = (0..80).map(|i| 1.0 + 0.05 * (i as f64 / 7.0).sin()).collect();
        let report = analyze(&series(&values), ScoringMode::Enhanced).unwrap();

        assert_eq!(report.indicators.len(), 80);
        assert_eq!(report.indicators.ma60.len(), 80);
        assert!(report.markers.iter().all(|m| m.index >= 14));
        assert!(report.assessment(SignalKind::Reversal).is_some());
        assert!(!report.rationale.is_empty());
    }

    #[test]
    fn test_report_carries_max_drawdown_and_reversal_curve() {
        let report = analyze(&series(&[1.0, 2.0, 1.5, 1.0, 3.0, 2.7]), ScoringMode::Base).unwrap();

        assert!((report.max_drawdown_pct + 50.0).abs() < 1e-9);
        let drawdown = report.assessment(SignalKind::Drawdown).unwrap();
        assert!(drawdown.status.contains("max drawdown -50.00%"));

        // Longest streak is the two-day fall 2.0 → 1.5 → 1.0
        assert_eq!(report.streaks.longest(), 2);
        let lengths: Vec<u32> = report.reversal_curve.iter().map(|p| p.length_days).collect();
        assert_eq!(lengths, vec![1, 2]);
    }

    #[test]
    fn test_rsi_warmup_keeps_short_rising_series_out_of_the_high_zone() {
        let values: Vec<f64> = (0..14).map(|i| 1.0 + i as f64 * 0.01).collect();
        let report = analyze(&series(&values), ScoringMode::Base).unwrap();

        assert!(report.indicators.rsi14.iter().all(Option::is_none));
        let band = report.assessment(SignalKind::BandTrend).unwrap();
        assert_eq!(band.recommendation, Recommendation::Hold);
        assert_eq!(band.metric_value, 50.0);
        // MACD above signal +2, thirteen up days in a row -1
        assert_eq!(report.composite.total, 1);
    }
}

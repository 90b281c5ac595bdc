use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{
    AdviceLevel, AdviceReport, BandMarker, CompositeScore, DrawdownRecovery, FundKind,
    FundMetadata, FundSnapshot, IndicatorSet, NavSeries, ReversalCurvePoint, SignalAssessment, Streak,
};

/// One chart row: the NAV of a day plus every indicator at that index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub date: NaiveDate,
    pub nav: f64,
    pub daily_change_pct: Option<f64>,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub rsi14: Option<f64>,
    pub bollinger_mid: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub drawdown_pct: Option<f64>,
    pub drawdown_duration_days: Option<u32>,
    pub volatility: Option<f64>,
    /// True for the synthetic point added by a valuation projection
    pub projected: bool,
}

impl ChartRow {
    /// Zips the series with its indicators. Without indicators (analysis
    /// failed) only the NAV columns are filled.
    pub fn rows(series: &NavSeries, indicators: Option<&IndicatorSet>, projected_date: Option<NaiveDate>) -> Vec<ChartRow> {
        let changes = series.daily_change_pct();

        series
            .points()
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let ind = indicators.filter(|set| set.len() == series.len());
                let pick = |col: fn(&IndicatorSet) -> &Vec<Option<f64>>| ind.and_then(|set| col(set)[i]);

                ChartRow {
                    date: point.date,
                    nav: point.value,
                    daily_change_pct: changes[i],
                    ma5: pick(|s| &s.ma5),
                    ma20: pick(|s| &s.ma20),
                    ma60: pick(|s| &s.ma60),
                    rsi14: pick(|s| &s.rsi14),
                    bollinger_mid: pick(|s| &s.bollinger_mid),
                    bollinger_upper: pick(|s| &s.bollinger_upper),
                    bollinger_lower: pick(|s| &s.bollinger_lower),
                    macd: pick(|s| &s.macd_line),
                    macd_signal: pick(|s| &s.macd_signal),
                    macd_histogram: pick(|s| &s.macd_histogram),
                    drawdown_pct: ind.map(|set| set.drawdown_pct[i]),
                    drawdown_duration_days: ind.map(|set| set.drawdown_duration_days[i]),
                    volatility: pick(|s| &s.volatility),
                    projected: projected_date == Some(point.date),
                }
            })
            .collect()
    }
}

/// Advice block of the analysis view. Analysis failures degrade to
/// `unavailable` instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdviceView {
    Available {
        advice_level: AdviceLevel,
        summary: String,
        consensus_level: AdviceLevel,
        assessments: Vec<SignalAssessment>,
        composite: CompositeScore,
        streaks: Vec<Streak>,
        current_streak: Option<Streak>,
        longest_streak: u32,
        reversal_curve: Vec<ReversalCurvePoint>,
        recoveries: Vec<DrawdownRecovery>,
        max_drawdown_pct: f64,
        markers: Vec<BandMarker>,
        rationale: String,
    },
    Unavailable {
        reason: String,
    },
}

impl From<&AdviceReport> for AdviceView {
    fn from(report: &AdviceReport) -> Self {
        AdviceView::Available {
            advice_level: report.advice_level,
            summary: report.advice_level.summary().to_string(),
            consensus_level: report.consensus_level,
            assessments: report.assessments.clone(),
            composite: report.composite.clone(),
            streaks: report.streaks.streaks.clone(),
            current_streak: report.streaks.current().copied(),
            longest_streak: report.streaks.longest(),
            reversal_curve: report.reversal_curve.clone(),
            recoveries: report.recoveries.clone(),
            max_drawdown_pct: report.max_drawdown_pct,
            markers: report.markers.clone(),
            rationale: report.rationale.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionView {
    pub date: NaiveDate,
    pub value: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub code: String,
    pub kind: FundKind,
    pub metadata: FundMetadata,
    pub snapshot: Option<FundSnapshot>,
    pub rows: Vec<ChartRow>,
    pub advice: AdviceView,
    /// Present while a what-if valuation is applied
    pub projection: Option<ProjectionView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValuationRequest {
    /// Percentage change as typed by the user, e.g. "1.5" or "-2%"
    pub change: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_advice_serializes_with_status_tag() {
        let view = AdviceView::Unavailable {
            reason: "no data".to_string(),
        };
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "no data");
    }

    #[test]
    fn test_rows_without_indicators_only_carry_nav() {
        use crate::models::NavPoint;

        let d1 = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let series = NavSeries::new(vec![NavPoint::new(d1, 1.0), NavPoint::new(d2, 1.02)]).unwrap();

        let rows = ChartRow::rows(&series, None, Some(d2));

        assert_eq!(rows.len(), 2);
        assert!(rows[0].ma5.is_none() && rows[0].drawdown_pct.is_none());
        assert!(!rows[0].projected);
        assert!(rows[1].projected);
        assert!((rows[1].daily_change_pct.unwrap() - 2.0).abs() < 1e-9);
    }
}

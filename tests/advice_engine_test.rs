use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fundscope_backend::models::{
    AdviceLevel, Direction, NavPoint, NavSeries, Recommendation, SignalAssessment, SignalKind,
};
use fundscope_backend::services::analysis_service::analyze;
use fundscope_backend::services::indicators::{bollinger_bands, drawdown, rsi, BOLLINGER_NUM_STD, BOLLINGER_WINDOW, RSI_WINDOW};
use fundscope_backend::services::scoring_service::{composite_score, ScoringMode};
use fundscope_backend::services::streak_service::analyze_streaks;
use fundscope_backend::services::valuation_service::AnalysisSession;

fn series(values: &[f64]) -> NavSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    NavSeries::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| NavPoint::new(start + Duration::days(i as i64), *v))
            .collect(),
    )
    .unwrap()
}

fn random_walk(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut current = 1.0_f64;
    (0..len)
        .map(|i| {
            // Occasional flat days so zero changes are exercised too
            if i > 0 && rng.random::<f64>() < 0.1 {
                return current;
            }
            current *= 1.0 + (rng.random::<f64>() - 0.5) * 0.04;
            current
        })
        .collect()
}

#[test]
fn rsi_and_bands_stay_in_range_for_random_walks() {
    for seed in 0..20 {
        let values = random_walk(seed, 60 + seed as usize * 7);

        for value in rsi(&values, RSI_WINDOW).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "seed {}: rsi {}", seed, value);
        }

        let (mid, upper, lower) = bollinger_bands(&values, BOLLINGER_WINDOW, BOLLINGER_NUM_STD);
        for i in 0..values.len() {
            if let (Some(m), Some(u), Some(l)) = (mid[i], upper[i], lower[i]) {
                assert!(l <= m && m <= u, "seed {} index {}: {} {} {}", seed, i, l, m, u);
            }
        }
    }
}

#[test]
fn drawdown_is_non_positive_and_zero_at_peaks() {
    for seed in 0..20 {
        let values = random_walk(seed, 120);
        let dd = drawdown(&values);

        let mut running_max = f64::MIN;
        for (i, value) in values.iter().enumerate() {
            running_max = running_max.max(*value);
            assert!(dd[i] <= 0.0);
            if *value == running_max {
                assert_eq!(dd[i], 0.0);
            }
        }
    }
}

#[test]
fn streaks_cover_every_non_zero_change_and_alternate() {
    for seed in 0..20 {
        let values = random_walk(seed, 90);
        let history = analyze_streaks(&values);

        let non_zero = values.windows(2).filter(|w| w[1] != w[0]).count();
        let covered: u32 = history.streaks.iter().map(|s| s.length_days).sum();
        assert_eq!(covered as usize, non_zero);

        for pair in history.streaks.windows(2) {
            assert_eq!(pair[0].direction.opposite(), pair[1].direction);
        }
    }
}

#[test]
fn projection_then_revert_restores_original() {
    for mode in [ScoringMode::Base, ScoringMode::Enhanced] {
        let original = series(&random_walk(7, 80));
        let session = AnalysisSession::new(original.clone(), mode);
        let level = session.report().unwrap().advice_level;

        let projected = session.project_text("-8.5%").unwrap();
        assert_eq!(projected.current_series().len(), original.len() + 1);

        let reverted = projected.revert();
        assert_eq!(reverted.current_series(), &original);
        assert!(reverted.projection().is_none());
        assert_eq!(reverted.report().unwrap().advice_level, level);
        assert_eq!(reverted.report().unwrap(), session.report().unwrap());
    }
}

#[test]
fn buy_band_never_scores_below_sell_band() {
    let band = |recommendation| SignalAssessment {
        kind: SignalKind::BandTrend,
        status: String::new(),
        metric_value: 50.0,
        recommendation,
    };

    for seed in 0..20 {
        let values = random_walk(seed, 100);
        let report = analyze(&series(&values), ScoringMode::Base).unwrap();
        let snapshot = report.indicators.snapshot(*values.last().unwrap()).unwrap();
        let streak = report.streaks.current();

        let sell = composite_score(&snapshot, &band(Recommendation::Sell), streak).total;
        let hold = composite_score(&snapshot, &band(Recommendation::Hold), streak).total;
        let buy = composite_score(&snapshot, &band(Recommendation::Buy), streak).total;

        assert!(sell <= hold && hold <= buy, "seed {}: {} {} {}", seed, sell, hold, buy);
    }
}

#[test]
fn falling_series_is_a_medium_drawdown_buy() {
    let values = [1.000, 1.010, 1.020, 0.950, 0.900];
    let report = analyze(&series(&values), ScoringMode::Base).unwrap();

    let current = report.streaks.current().unwrap();
    assert_eq!(current.direction, Direction::Down);
    assert_eq!(current.length_days, 2);
    assert!(current.cumulative_pct < -11.0 && current.cumulative_pct > -13.0);

    let last_dd = *report.indicators.drawdown_pct.last().unwrap();
    assert!((last_dd - (0.900 - 1.020) / 1.020 * 100.0).abs() < 1e-9);
    assert!((last_dd + 11.76).abs() < 0.01);

    let dd = report.assessment(SignalKind::Drawdown).unwrap();
    assert!((dd.metric_value - 0.45).abs() < 1e-12);
    assert_eq!(dd.recommendation, Recommendation::Buy);
}

#[test]
fn flat_series_is_neutral() {
    let report = analyze(&series(&[1.0; 30]), ScoringMode::Base).unwrap();

    assert!(report.indicators.rsi14.iter().all(Option::is_none));
    let upper = report.indicators.bollinger_upper.last().unwrap().unwrap();
    let lower = report.indicators.bollinger_lower.last().unwrap().unwrap();
    assert!((upper - 1.0).abs() < 1e-12 && (lower - 1.0).abs() < 1e-12);

    assert_eq!(report.composite.total, 0);
    assert_eq!(report.advice_level, AdviceLevel::Neutral);
    assert!(report.streaks.streaks.is_empty());
}

#[test]
fn empty_series_is_insufficient_data() {
    let result = analyze(&NavSeries::default(), ScoringMode::Base);
    assert!(result.is_err());
}

#[test]
fn malformed_valuation_input_is_rejected() {
    let session = AnalysisSession::new(series(&[1.0, 1.1, 1.2]), ScoringMode::Base);

    assert!(session.project_text("abc").is_err());
    assert!(session.project_text("").is_err());
    assert!(session.project_text("-100").is_err());
    assert!(session.projection().is_none());
}

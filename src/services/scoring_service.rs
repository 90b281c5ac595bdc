//! Rule-based scoring of the latest indicator values.
//!
//! Win rates and reversal probabilities produced here are heuristic scores
//! built from fixed breakpoints (0.15 per streak day, drawdown tiers at
//! -5/-10/-15/-20%). They are not calibrated probabilities and must not be
//! presented as predictions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{
    AdviceLevel, BandMarker, BandZone, CompositeScore, Direction, DrawdownRecovery, IndicatorSet,
    IndicatorSnapshot, Recommendation, Reversal, SignalAssessment, SignalKind, Streak,
};

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;
/// Minimum index at which historical band markers are emitted
pub const MARKER_WARMUP: usize = 14;
pub const LONG_STREAK_DAYS: u32 = 3;

const MIN_ADJUSTED: f64 = 0.05;
const MAX_ADJUSTED: f64 = 0.95;
const HIGH_VOLATILITY: f64 = 30.0;
const LOW_VOLATILITY: f64 = 15.0;

/// Whether the multiplicative adjustment layer is applied on top of the
/// base drawdown tiers and streak-length reversal rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    #[default]
    Base,
    Enhanced,
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "base" => Ok(ScoringMode::Base),
            "enhanced" => Ok(ScoringMode::Enhanced),
            other => Err(format!("Invalid scoring mode '{}'. Must be 'base' or 'enhanced'", other)),
        }
    }
}

fn clamp_adjusted(value: f64) -> f64 {
    value.clamp(MIN_ADJUSTED, MAX_ADJUSTED)
}

/// Relative comparison that treats rounding noise as equality.
fn compare(a: f64, b: f64) -> std::cmp::Ordering {
    let tolerance = 1e-12 * a.abs().max(b.abs()).max(1.0);
    if (a - b).abs() <= tolerance {
        std::cmp::Ordering::Equal
    } else if a > b {
        std::cmp::Ordering::Greater
    } else {
        std::cmp::Ordering::Less
    }
}

fn macd_ordering(snapshot: &IndicatorSnapshot) -> Option<std::cmp::Ordering> {
    Some(compare(snapshot.macd?, snapshot.macd_signal?))
}

fn short_cross_ordering(snapshot: &IndicatorSnapshot) -> Option<std::cmp::Ordering> {
    Some(compare(snapshot.ma5?, snapshot.ma20?))
}

/// Extreme zone only: `High`/`Low` when a band is touched or RSI is extreme.
fn extreme_zone(snapshot: &IndicatorSnapshot) -> Option<BandZone> {
    if snapshot.touches_upper_band() || snapshot.rsi >= RSI_OVERBOUGHT {
        Some(BandZone::High)
    } else if snapshot.touches_lower_band() || snapshot.rsi <= RSI_OVERSOLD {
        Some(BandZone::Low)
    } else {
        None
    }
}

pub fn band_zone(snapshot: &IndicatorSnapshot) -> BandZone {
    use std::cmp::Ordering::{Greater, Less};

    if let Some(zone) = extreme_zone(snapshot) {
        return zone;
    }

    match (macd_ordering(snapshot), short_cross_ordering(snapshot)) {
        (Some(Greater), Some(Greater)) => BandZone::Uptrend,
        (Some(Less), Some(Less)) => BandZone::Downtrend,
        _ => BandZone::Range,
    }
}

/// Band/trend signal. `metric_value` carries the RSI used for the decision.
pub fn assess_band_trend(snapshot: &IndicatorSnapshot) -> SignalAssessment {
    let zone = band_zone(snapshot);

    SignalAssessment {
        kind: SignalKind::BandTrend,
        status: zone.label().to_string(),
        metric_value: snapshot.rsi,
        recommendation: zone.recommendation(),
    }
}

/// Base win rate of buying at the given drawdown (percent, `<= 0`).
pub fn base_win_rate(drawdown_pct: f64) -> f64 {
    if drawdown_pct < -20.0 {
        0.80
    } else if drawdown_pct < -15.0 {
        0.65
    } else if drawdown_pct < -10.0 {
        0.45
    } else if drawdown_pct < -5.0 {
        0.30
    } else {
        0.10
    }
}

pub fn drawdown_win_rate(snapshot: &IndicatorSnapshot, recoveries: &[DrawdownRecovery], mode: ScoringMode) -> f64 {
    let base = base_win_rate(snapshot.drawdown_pct);
    if mode == ScoringMode::Base {
        return base;
    }

    // Longer time under water raises the rate, capped at +50%
    let duration_factor = (1.0 + snapshot.drawdown_duration_days as f64 / 30.0).min(1.5);

    let volatility_factor = match snapshot.volatility {
        Some(v) if v > HIGH_VOLATILITY => 0.8,
        Some(v) if v < LOW_VOLATILITY => 1.2,
        _ => 1.0,
    };

    let recovery_factor = if recoveries.is_empty() {
        1.0
    } else {
        let avg_duration = recoveries.iter().map(|r| r.duration as f64).sum::<f64>() / recoveries.len() as f64;
        if avg_duration < 20.0 {
            1.3
        } else if avg_duration > 60.0 {
            0.8
        } else {
            1.0
        }
    };

    clamp_adjusted(base * duration_factor * volatility_factor * recovery_factor)
}

/// Drawdown ("bottom fishing") signal. `metric_value` is the win rate;
/// `max_drawdown_pct` is the deepest drawdown of the whole series.
pub fn assess_drawdown(
    snapshot: &IndicatorSnapshot,
    max_drawdown_pct: f64,
    recoveries: &[DrawdownRecovery],
    mode: ScoringMode,
) -> SignalAssessment {
    let win_rate = drawdown_win_rate(snapshot, recoveries, mode);

    let (tier, recommendation) = if win_rate >= 0.7 {
        ("high win rate - strong buy", Recommendation::Buy)
    } else if win_rate >= 0.4 {
        ("medium win rate - buy", Recommendation::Buy)
    } else {
        ("low win rate - hold", Recommendation::Hold)
    };

    SignalAssessment {
        kind: SignalKind::Drawdown,
        status: format!(
            "{} (drawdown {:.2}%, max drawdown {:.2}%, win rate {:.2})",
            tier, snapshot.drawdown_pct, max_drawdown_pct, win_rate
        ),
        metric_value: win_rate,
        recommendation,
    }
}

/// Reversal probability of the given streak.
///
/// Base: `min(0.9, 0.15 × length)`. Enhanced mode multiplies by magnitude,
/// volatility, RSI alignment and history factors and clamps to `[0.05, 0.95]`.
pub fn reversal_probability(
    streak: &Streak,
    rsi: f64,
    volatility: Option<f64>,
    reversals: &[Reversal],
    mode: ScoringMode,
) -> f64 {
    let base = (streak.length_days as f64 * 0.15).min(0.9);
    if mode == ScoringMode::Base {
        return base;
    }

    let magnitude = streak.cumulative_pct.abs();
    let magnitude_factor = if magnitude > 10.0 {
        1.3
    } else if magnitude < 2.0 {
        0.7
    } else {
        1.0
    };

    let volatility_factor = match volatility {
        Some(v) if v > HIGH_VOLATILITY => 1.2,
        Some(v) if v < LOW_VOLATILITY => 0.8,
        _ => 1.0,
    };

    let rsi_aligned = match streak.direction {
        Direction::Up => rsi > RSI_OVERBOUGHT,
        Direction::Down => rsi < RSI_OVERSOLD,
    };
    let rsi_factor = if rsi_aligned { 1.4 } else { 1.0 };

    // Past reversals that ended a streak of similar length
    let similar: Vec<u32> = reversals
        .iter()
        .map(|r| r.previous.length_days)
        .filter(|&prev| prev.abs_diff(streak.length_days) <= 2)
        .collect();
    let history_factor = if similar.is_empty() {
        1.0
    } else {
        let avg_prev = similar.iter().map(|&l| l as f64).sum::<f64>() / similar.len() as f64;
        if avg_prev > streak.length_days as f64 {
            1.2
        } else {
            0.9
        }
    };

    clamp_adjusted(base * magnitude_factor * volatility_factor * rsi_factor * history_factor)
}

/// Reversal signal from the current streak. `metric_value` is the probability.
pub fn assess_reversal(
    current: Option<&Streak>,
    snapshot: &IndicatorSnapshot,
    reversals: &[Reversal],
    mode: ScoringMode,
) -> SignalAssessment {
    let Some(streak) = current else {
        return SignalAssessment {
            kind: SignalKind::Reversal,
            status: "no clear trend".to_string(),
            metric_value: 0.5,
            recommendation: Recommendation::Hold,
        };
    };

    let probability = reversal_probability(streak, snapshot.rsi, snapshot.volatility, reversals, mode);
    let recommendation = if probability >= 0.7 {
        match streak.direction {
            Direction::Up => Recommendation::Sell,
            Direction::Down => Recommendation::Buy,
        }
    } else {
        Recommendation::Hold
    };
    let action = if recommendation == Recommendation::Hold { "hold" } else { "counter-trend" };

    SignalAssessment {
        kind: SignalKind::Reversal,
        status: format!(
            "{} {} day(s), {:+.2}% - {}",
            streak.direction, streak.length_days, streak.cumulative_pct, action
        ),
        metric_value: probability,
        recommendation,
    }
}

/// Weighted integer score behind [`AdviceLevel::from_score`].
pub fn composite_score(
    snapshot: &IndicatorSnapshot,
    band: &SignalAssessment,
    current_streak: Option<&Streak>,
) -> CompositeScore {
    use std::cmp::Ordering::{Equal, Greater, Less};

    let mut score = CompositeScore::default();

    match band.recommendation {
        Recommendation::Buy if snapshot.touches_lower_band() => {
            score.push("band", 3, "touching the lower Bollinger band")
        }
        Recommendation::Buy => score.push("band", 2, format!("oversold, RSI {:.1}", snapshot.rsi)),
        Recommendation::Sell if snapshot.touches_upper_band() => {
            score.push("band", -3, "touching the upper Bollinger band")
        }
        Recommendation::Sell => score.push("band", -2, format!("overbought, RSI {:.1}", snapshot.rsi)),
        Recommendation::Hold => {}
    }

    let dd = snapshot.drawdown_pct;
    if dd < -20.0 {
        score.push("drawdown", 4, format!("deep drawdown {:.2}%", dd));
    } else if dd < -10.0 {
        score.push("drawdown", 2, format!("medium drawdown {:.2}%", dd));
    } else if dd < -5.0 {
        score.push("drawdown", 1, format!("light drawdown {:.2}%", dd));
    }

    if let (Some(ma5), Some(ma20), Some(ma60)) = (snapshot.ma5, snapshot.ma20, snapshot.ma60) {
        match (compare(ma5, ma20), compare(ma20, ma60)) {
            (Greater, Greater) => score.push("moving_averages", 2, "bullish alignment ma5 > ma20 > ma60"),
            (Less, Less) => score.push("moving_averages", -2, "bearish alignment ma5 < ma20 < ma60"),
            _ => {}
        }
    }

    match macd_ordering(snapshot) {
        Some(Greater) => score.push("macd", 2, "MACD above signal line"),
        Some(Less) => score.push("macd", -2, "MACD below signal line"),
        Some(Equal) | None => {}
    }

    if let Some(streak) = current_streak.filter(|s| s.length_days >= LONG_STREAK_DAYS) {
        match streak.direction {
            Direction::Up => score.push("streak", -1, format!("up {} days in a row, pullback risk", streak.length_days)),
            Direction::Down => score.push("streak", 1, format!("down {} days in a row, rebound chance", streak.length_days)),
        }
    }

    score
}

/// Coarser summary score over the three assessments alone.
pub fn assessment_consensus(assessments: &[SignalAssessment]) -> i32 {
    assessments
        .iter()
        .map(|a| match (a.kind, a.recommendation) {
            (SignalKind::BandTrend, Recommendation::Buy) => 2,
            (SignalKind::BandTrend, Recommendation::Sell) => -2,
            (SignalKind::Drawdown, _) if a.metric_value >= 0.7 => 3,
            (SignalKind::Drawdown, _) if a.metric_value >= 0.4 => 1,
            (SignalKind::Drawdown, _) => -1,
            (SignalKind::Reversal, Recommendation::Buy) => 2,
            (SignalKind::Reversal, Recommendation::Sell) => -2,
            _ => 0,
        })
        .sum()
}

/// Historical high/low zone markers for the NAV chart.
pub fn band_signal_markers(values: &[f64], indicators: &IndicatorSet) -> Vec<BandMarker> {
    values
        .iter()
        .enumerate()
        .skip(MARKER_WARMUP)
        .filter_map(|(index, &value)| {
            let snapshot = indicators.snapshot_at(index, value)?;
            extreme_zone(&snapshot).map(|zone| BandMarker { index, value, zone })
        })
        .collect()
}

/// Human-readable explanation of a composite score.
pub fn rationale(
    snapshot: &IndicatorSnapshot,
    composite: &CompositeScore,
    level: AdviceLevel,
    current_streak: Option<&Streak>,
) -> String {
    let mut lines: Vec<String> = if composite.contributions.is_empty() {
        vec!["No indicator is giving a directional signal.".to_string()]
    } else {
        composite
            .contributions
            .iter()
            .map(|c| format!("{:+} {}: {}", c.points, c.factor, c.interpretation))
            .collect()
    };

    lines.push(String::new());
    lines.push(level.summary().to_string());
    lines.push(String::new());
    lines.push(format!("RSI: {:.1}", snapshot.rsi));
    lines.push(format!("Drawdown: {:.1}%", snapshot.drawdown_pct));

    if let Some(streak) = current_streak {
        lines.push(format!("Streak: {} {} day(s)", streak.direction, streak.length_days));
        if streak.cumulative_pct != 0.0 {
            lines.push(format!("Cumulative change: {:.2}%", streak.cumulative_pct));
        }
    }
    lines.push(format!("Score: {} ({})", composite.total, level));

    lines.join("\n")
}

use serde::{Deserialize, Serialize};

use crate::models::{DrawdownRecovery, IndicatorSet, ReversalCurvePoint, StreakHistory};

/// Analysis dimension an assessment belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Bollinger position, RSI extremes, MACD and short MA cross
    #[serde(rename = "band_trend")]
    BandTrend,

    /// Depth of the current drawdown ("bottom fishing")
    #[serde(rename = "drawdown")]
    Drawdown,

    /// Mean reversion after a long streak
    #[serde(rename = "reversal")]
    Reversal,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::BandTrend => write!(f, "band/trend"),
            SignalKind::Drawdown => write!(f, "drawdown"),
            SignalKind::Reversal => write!(f, "reversal"),
        }
    }
}

/// What an assessment suggests doing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Recommendation {
    #[serde(rename = "buy")]
    Buy,
    #[serde(rename = "sell")]
    Sell,
    #[serde(rename = "hold")]
    Hold,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "buy"),
            Recommendation::Sell => write!(f, "sell"),
            Recommendation::Hold => write!(f, "hold"),
        }
    }
}

/// Zone the latest NAV sits in, as judged by the band/trend signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BandZone {
    High,
    Low,
    Uptrend,
    Downtrend,
    Range,
}

impl BandZone {
    pub fn label(self) -> &'static str {
        match self {
            BandZone::High => "high zone - caution",
            BandZone::Low => "low zone - watch for entry",
            BandZone::Uptrend => "uptrend - hold",
            BandZone::Downtrend => "downtrend - watch",
            BandZone::Range => "range - watch",
        }
    }

    pub fn recommendation(self) -> Recommendation {
        match self {
            BandZone::Low => Recommendation::Buy,
            BandZone::High => Recommendation::Sell,
            _ => Recommendation::Hold,
        }
    }
}

/// One analysis dimension's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalAssessment {
    pub kind: SignalKind,
    /// Human-readable status label
    pub status: String,
    /// RSI for band/trend, win rate for drawdown, probability for reversal
    pub metric_value: f64,
    pub recommendation: Recommendation,
}

/// Final advice, ordered from most bearish to most bullish.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AdviceLevel {
    StrongSell,
    Sell,
    Neutral,
    Buy,
    StrongBuy,
}

impl AdviceLevel {
    /// Thresholds of the indicator composite score.
    pub fn from_score(score: i32) -> Self {
        if score >= 6 {
            AdviceLevel::StrongBuy
        } else if score >= 3 {
            AdviceLevel::Buy
        } else if score >= -2 {
            AdviceLevel::Neutral
        } else if score >= -4 {
            AdviceLevel::Sell
        } else {
            AdviceLevel::StrongSell
        }
    }

    /// Thresholds of the coarser three-assessment consensus.
    pub fn from_consensus_score(score: i32) -> Self {
        if score >= 5 {
            AdviceLevel::StrongBuy
        } else if score >= 2 {
            AdviceLevel::Buy
        } else if score >= -2 {
            AdviceLevel::Neutral
        } else if score >= -5 {
            AdviceLevel::Sell
        } else {
            AdviceLevel::StrongSell
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            AdviceLevel::StrongBuy => {
                "Strong buy: most indicators point to an attractive entry, consider building a position."
            }
            AdviceLevel::Buy => "Buy: the fund sits in a reasonable buying range, consider a moderate allocation.",
            AdviceLevel::Neutral => "Neutral: the market is ranging, wait or test with a small position.",
            AdviceLevel::Sell => "Not recommended: the trend is weak, wait for a better entry.",
            AdviceLevel::StrongSell => "Strongly not recommended: several indicators flag elevated risk.",
        }
    }
}

impl std::fmt::Display for AdviceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceLevel::StrongSell => write!(f, "strong_sell"),
            AdviceLevel::Sell => write!(f, "sell"),
            AdviceLevel::Neutral => write!(f, "neutral"),
            AdviceLevel::Buy => write!(f, "buy"),
            AdviceLevel::StrongBuy => write!(f, "strong_buy"),
        }
    }
}

/// Points one factor added to (or removed from) the composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub factor: String,
    pub points: i32,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeScore {
    pub contributions: Vec<ScoreContribution>,
    pub total: i32,
}

impl CompositeScore {
    pub fn push(&mut self, factor: &str, points: i32, interpretation: impl Into<String>) {
        self.total += points;
        self.contributions.push(ScoreContribution {
            factor: factor.to_string(),
            points,
            interpretation: interpretation.into(),
        });
    }
}

/// Historical high/low zone marker for the NAV chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandMarker {
    pub index: usize,
    pub value: f64,
    pub zone: BandZone,
}

/// Everything one analysis call produces for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdviceReport {
    pub indicators: IndicatorSet,
    pub streaks: StreakHistory,
    /// Heuristic reversal score per streak length, `1..=longest streak`
    pub reversal_curve: Vec<ReversalCurvePoint>,
    pub recoveries: Vec<DrawdownRecovery>,
    /// Deepest drawdown of the series, in percent
    pub max_drawdown_pct: f64,
    pub markers: Vec<BandMarker>,
    pub assessments: Vec<SignalAssessment>,
    pub composite: CompositeScore,
    pub advice_level: AdviceLevel,
    pub consensus_level: AdviceLevel,
    pub rationale: String,
}

impl AdviceReport {
    pub fn assessment(&self, kind: SignalKind) -> Option<&SignalAssessment> {
        self.assessments.iter().find(|a| a.kind == kind)
    }
}

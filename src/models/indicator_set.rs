use serde::{Deserialize, Serialize};

/// Every derived series computed for one NAV series.
///
/// All vectors have the length of the input series and are index-aligned
/// with it. `None` marks positions where the indicator window has not filled
/// yet; value at index `i` only depends on NAV values at indices `<= i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorSet {
    pub ma5: Vec<Option<f64>>,
    pub ma20: Vec<Option<f64>>,
    pub ma60: Vec<Option<f64>>,
    pub rsi14: Vec<Option<f64>>,
    pub bollinger_mid: Vec<Option<f64>>,
    pub bollinger_upper: Vec<Option<f64>>,
    pub bollinger_lower: Vec<Option<f64>>,
    pub macd_line: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub macd_histogram: Vec<Option<f64>>,
    pub drawdown_pct: Vec<f64>,
    pub drawdown_duration_days: Vec<u32>,
    /// Annualised volatility of daily returns, in percent.
    pub volatility: Vec<Option<f64>>,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.drawdown_pct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawdown_pct.is_empty()
    }

    /// Latest values with neutral defaults substituted for undefined entries:
    /// RSI falls back to 50 and both bands fall back to the latest NAV.
    /// Moving averages and MACD stay optional; scoring treats them as "no opinion".
    pub fn snapshot(&self, latest_value: f64) -> Option<IndicatorSnapshot> {
        self.snapshot_at(self.len().checked_sub(1)?, latest_value)
    }

    /// Same as [`IndicatorSet::snapshot`] for an arbitrary index.
    pub fn snapshot_at(&self, i: usize, value: f64) -> Option<IndicatorSnapshot> {
        if i >= self.len() {
            return None;
        }

        Some(IndicatorSnapshot {
            value,
            rsi: self.rsi14[i].unwrap_or(NEUTRAL_RSI),
            upper_band: self.bollinger_upper[i].unwrap_or(value),
            lower_band: self.bollinger_lower[i].unwrap_or(value),
            ma5: self.ma5[i],
            ma20: self.ma20[i],
            ma60: self.ma60[i],
            macd: self.macd_line[i],
            macd_signal: self.macd_signal[i],
            drawdown_pct: self.drawdown_pct[i],
            drawdown_duration_days: self.drawdown_duration_days[i],
            volatility: self.volatility[i],
        })
    }
}

pub const NEUTRAL_RSI: f64 = 50.0;

/// Indicator values at the most recent index, ready for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub value: f64,
    pub rsi: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub drawdown_pct: f64,
    pub drawdown_duration_days: u32,
    pub volatility: Option<f64>,
}

impl IndicatorSnapshot {
    /// Bands that have zero width (flat history, or the neutral fallback)
    /// carry no information and never count as touched.
    pub fn bands_collapsed(&self) -> bool {
        (self.upper_band - self.lower_band).abs() <= f64::EPSILON * self.value.abs().max(1.0) * 16.0
    }

    pub fn touches_upper_band(&self) -> bool {
        !self.bands_collapsed() && self.value >= self.upper_band
    }

    pub fn touches_lower_band(&self) -> bool {
        !self.bands_collapsed() && self.value <= self.lower_band
    }
}

/// A continuous stretch below the running peak that later recovered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownRecovery {
    pub start: usize,
    /// First index where the drawdown is back at zero.
    pub end: usize,
    pub duration: usize,
    /// Most negative drawdown reached inside the segment, in percent.
    pub max_drawdown: f64,
}

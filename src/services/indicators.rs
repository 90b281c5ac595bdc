use crate::models::{DrawdownRecovery, IndicatorSet};

pub const MA_SHORT: usize = 5;
pub const MA_MEDIUM: usize = 20;
pub const MA_LONG: usize = 60;
pub const RSI_WINDOW: usize = 14;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_NUM_STD: f64 = 2.0;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const VOLATILITY_WINDOW: usize = 20;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Simple Moving Average
/// Returns a vector aligned with `values`:
/// - `None` until `window` values exist
/// - `Some(mean)` of the trailing `window` values afterwards
///
/// Each window is summed directly so long series do not accumulate
/// floating point drift from a running sum.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 >= window {
                let slice = &values[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            } else {
                None
            }
        })
        .collect()
}

/// Exponential Moving Average with smoothing factor `2 / (span + 1)`.
///
/// Seeded with the first value and defined at every index, so an EMA of a
/// constant series is that constant.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let alpha = 2.0 / (span as f64 + 1.0);

    values
        .iter()
        .scan(first, move |prev, &v| {
            let next = alpha * v + (1.0 - alpha) * *prev;
            *prev = next;
            Some(next)
        })
        .collect()
}

/// Relative Strength Index
///
/// Gains and losses are per-step changes averaged over the last `window`
/// changes, so the first value is at index `window`. RS = avg gain / avg loss and
/// RSI = 100 - 100 / (1 + RS).
///
/// - Below 30: oversold
/// - Above 70: overbought
///
/// A window with losses of zero and positive gains is 100. A window with no
/// movement at all has no defined RSI and stays `None`.
pub fn rsi(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    // changes[k] is the move from values[k] to values[k + 1]
    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    (0..values.len())
        .map(|i| {
            if i < window {
                return None;
            }
            let slice = &changes[i - window..i];
            let avg_gain = slice.iter().map(|&c| c.max(0.0)).sum::<f64>() / window as f64;
            let avg_loss = slice.iter().map(|&c| (-c).max(0.0)).sum::<f64>() / window as f64;

            if avg_loss == 0.0 {
                return (avg_gain > 0.0).then_some(100.0);
            }

            let rs = avg_gain / avg_loss;
            Some(100.0 - 100.0 / (1.0 + rs))
        })
        .collect()
}

/// Moving Average Convergence Divergence
///
/// - MACD line: EMA(fast) - EMA(slow)
/// - Signal line: EMA(signal) of the MACD line
/// - Histogram: MACD line - signal line
///
/// Returns `(macd_line, signal_line, histogram)`.
pub fn macd(
    values: &[f64],
    fast_span: usize,
    slow_span: usize,
    signal_span: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let fast = ema(values, fast_span);
    let slow = ema(values, slow_span);

    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, signal_span);
    let histogram = line.iter().zip(&signal).map(|(m, s)| Some(m - s)).collect();

    (
        line.into_iter().map(Some).collect(),
        signal.into_iter().map(Some).collect(),
        histogram,
    )
}

/// Bollinger Bands
///
/// - Middle band: moving average over `window`
/// - Upper/lower: middle ± `num_std` population standard deviations of the same window
///
/// Returns `(middle_band, upper_band, lower_band)`.
pub fn bollinger_bands(
    values: &[f64],
    window: usize,
    num_std: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle = moving_average(values, window);

    let (upper, lower) = middle
        .iter()
        .enumerate()
        .map(|(i, mid)| match mid {
            Some(mean) => {
                let slice = &values[i + 1 - window..=i];
                let variance = slice.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / window as f64;
                let std_dev = variance.sqrt();
                (Some(mean + num_std * std_dev), Some(mean - num_std * std_dev))
            }
            None => (None, None),
        })
        .unzip();

    (middle, upper, lower)
}

/// Percentage below the running peak at each index (always `<= 0`).
pub fn drawdown(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(f64::NEG_INFINITY, |peak, &v| {
            *peak = peak.max(v);
            Some((v - *peak) / *peak * 100.0)
        })
        .collect()
}

/// Number of consecutive indices spent under water, reset on every new peak.
pub fn drawdown_duration(drawdown: &[f64]) -> Vec<u32> {
    drawdown
        .iter()
        .scan(0u32, |days, &dd| {
            *days = if dd < 0.0 { *days + 1 } else { 0 };
            Some(*days)
        })
        .collect()
}

/// Rolling annualised volatility of daily returns, in percent.
///
/// Sample standard deviation of the last `window` returns scaled by √252.
/// First defined at index `window` (the first index with `window` returns).
pub fn annualized_volatility(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    let returns: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();

    (0..values.len())
        .map(|i| {
            if i < window {
                return None;
            }
            // returns[j] is the change into values[j + 1]
            let slice = &returns[i - window..i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance = slice.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
        })
        .collect()
}

/// Closed under-water segments. A drawdown still open at the end of the
/// series has not recovered and is not reported.
pub fn drawdown_recoveries(drawdown: &[f64]) -> Vec<DrawdownRecovery> {
    let mut recoveries = Vec::new();
    let mut open: Option<(usize, f64)> = None;

    for (i, &dd) in drawdown.iter().enumerate() {
        match open {
            None if dd < 0.0 => open = Some((i, dd)),
            Some((start, deepest)) if dd < 0.0 => open = Some((start, deepest.min(dd))),
            Some((start, deepest)) => {
                recoveries.push(DrawdownRecovery {
                    start,
                    end: i,
                    duration: i - start,
                    max_drawdown: deepest,
                });
                open = None;
            }
            None => {}
        }
    }

    recoveries
}

/// Deepest drawdown of the series, in percent (0 for an empty series).
pub fn max_drawdown(values: &[f64]) -> f64 {
    drawdown(values).into_iter().fold(0.0, f64::min)
}

/// Computes every indicator for one NAV value column.
pub fn compute_indicator_set(values: &[f64]) -> IndicatorSet {
    let (bollinger_mid, bollinger_upper, bollinger_lower) =
        bollinger_bands(values, BOLLINGER_WINDOW, BOLLINGER_NUM_STD);
    let (macd_line, macd_signal, macd_histogram) = macd(values, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let drawdown_pct = drawdown(values);
    let drawdown_duration_days = drawdown_duration(&drawdown_pct);

    IndicatorSet {
        ma5: moving_average(values, MA_SHORT),
        ma20: moving_average(values, MA_MEDIUM),
        ma60: moving_average(values, MA_LONG),
        rsi14: rsi(values, RSI_WINDOW),
        bollinger_mid,
        bollinger_upper,
        bollinger_lower,
        macd_line,
        macd_signal,
        macd_histogram,
        drawdown_pct,
        drawdown_duration_days,
        volatility: annualized_volatility(values, VOLATILITY_WINDOW),
    }
}

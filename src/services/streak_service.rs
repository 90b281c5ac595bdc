use crate::models::{Direction, Reversal, ReversalCurvePoint, Streak, StreakHistory};
use crate::services::scoring_service::{reversal_probability, ScoringMode};

/// Splits a value series into maximal runs of same-direction daily moves.
///
/// Days without any change are skipped: they neither extend the open streak
/// nor close it. Only a sign flip closes a streak and starts the next one.
pub fn analyze_streaks(values: &[f64]) -> StreakHistory {
    let mut streaks = Vec::new();
    let mut open: Option<Streak> = None;

    for w in values.windows(2) {
        let direction = if w[1] > w[0] {
            Direction::Up
        } else if w[1] < w[0] {
            Direction::Down
        } else {
            continue;
        };
        let change_pct = (w[1] - w[0]) / w[0] * 100.0;

        match open.as_mut() {
            Some(streak) if streak.direction == direction => {
                streak.length_days += 1;
                streak.cumulative_pct += change_pct;
            }
            _ => {
                if let Some(closed) = open.take() {
                    streaks.push(closed);
                }
                open = Some(Streak {
                    length_days: 1,
                    direction,
                    cumulative_pct: change_pct,
                });
            }
        }
    }

    streaks.extend(open);
    StreakHistory { streaks }
}

/// Number of streaks shown on the reversal chart when the history is empty.
const MIN_CURVE_LENGTH: u32 = 1;
const CURVE_ASSUMED_RSI: f64 = 70.0;
const CURVE_PCT_PER_DAY: f64 = 0.5;

/// Reversal probability for every streak length `1..=max_streak`, assuming an
/// up streak gaining 0.5% a day with RSI at the overbought line.
pub fn reversal_curve(max_streak: u32, volatility: Option<f64>, reversals: &[Reversal]) -> Vec<ReversalCurvePoint> {
    (1..=max_streak.max(MIN_CURVE_LENGTH))
        .map(|len| {
            let hypothetical = Streak {
                length_days: len,
                direction: Direction::Up,
                cumulative_pct: len as f64 * CURVE_PCT_PER_DAY,
            };
            let probability = reversal_probability(
                &hypothetical,
                CURVE_ASSUMED_RSI,
                volatility,
                reversals,
                ScoringMode::Enhanced,
            );
            ReversalCurvePoint {
                length_days: len,
                probability,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_series_ends_in_two_day_down_streak() {
        let history = analyze_streaks(&[1.000, 1.010, 1.020, 0.950, 0.900]);

        assert_eq!(history.streaks.len(), 2);
        let current = history.current().unwrap();
        assert_eq!(current.direction, Direction::Down);
        assert_eq!(current.length_days, 2);

        let expected = (0.95 - 1.02) / 1.02 * 100.0 + (0.90 - 0.95) / 0.95 * 100.0;
        assert!((current.cumulative_pct - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_change_days_neither_extend_nor_close() {
        let history = analyze_streaks(&[1.0, 1.1, 1.1, 1.2, 1.2, 1.1]);

        assert_eq!(history.streaks.len(), 2);
        assert_eq!(history.streaks[0].length_days, 2);
        assert_eq!(history.streaks[0].direction, Direction::Up);
        assert_eq!(history.streaks[1].length_days, 1);
    }

    #[test]
    fn test_flat_and_tiny_series_have_no_streaks() {
        assert!(analyze_streaks(&[1.0; 10]).streaks.is_empty());
        assert!(analyze_streaks(&[1.0]).current().is_none());
        assert!(analyze_streaks(&[]).streaks.is_empty());
    }

    #[test]
    fn test_streaks_alternate_and_cover_every_move() {
        let values = [1.0, 1.1, 1.2, 1.15, 1.15, 1.1, 1.3, 1.31, 1.32, 1.32, 1.0];
        let history = analyze_streaks(&values);

        let non_zero = values.windows(2).filter(|w| w[0] != w[1]).count() as u32;
        let total: u32 = history.streaks.iter().map(|s| s.length_days).sum();
        assert_eq!(total, non_zero);

        for pair in history.streaks.windows(2) {
            assert_eq!(pair[0].direction.opposite(), pair[1].direction);
        }
        assert_eq!(history.reversals().len(), history.streaks.len() - 1);
    }

    #[test]
    fn test_reversal_curve_shape() {
        let curve = reversal_curve(10, Some(20.0), &[]);

        assert_eq!(curve.len(), 10);
        assert_eq!(curve[0].length_days, 1);
        assert!(curve.iter().all(|p| (0.05..=0.95).contains(&p.probability)));
        assert!(curve.windows(2).all(|w| w[0].probability <= w[1].probability));
        assert_eq!(reversal_curve(0, None, &[]).len(), 1);
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "down")]
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A maximal run of same-direction daily moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub length_days: u32,
    pub direction: Direction,
    /// Sum of the daily percentage changes inside the run.
    pub cumulative_pct: f64,
}

/// Two consecutive streaks: the one that ended and the one that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reversal {
    pub previous: Streak,
    pub current: Streak,
}

/// One bar of the reversal chart: the heuristic reversal score of a
/// hypothetical up streak of `length_days`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReversalCurvePoint {
    pub length_days: u32,
    pub probability: f64,
}

/// Chronological streak history. Each streak runs opposite to its successor.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StreakHistory {
    pub streaks: Vec<Streak>,
}

impl StreakHistory {
    /// The most recent (still open) streak.
    pub fn current(&self) -> Option<&Streak> {
        self.streaks.last()
    }

    pub fn longest(&self) -> u32 {
        self.streaks.iter().map(|s| s.length_days).max().unwrap_or(0)
    }

    pub fn reversals(&self) -> Vec<Reversal> {
        self.streaks
            .windows(2)
            .map(|w| Reversal {
                previous: w[0],
                current: w[1],
            })
            .collect()
    }
}

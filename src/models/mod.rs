mod nav_point;
mod indicator_set;
mod streak;
mod signal;
mod fund;
mod analysis_view;

pub use nav_point::{NavPoint, NavSeries, SeriesError};
pub use indicator_set::{DrawdownRecovery, IndicatorSet, IndicatorSnapshot, NEUTRAL_RSI};
pub use streak::{Direction, Reversal, ReversalCurvePoint, Streak, StreakHistory};
pub use signal::{
    AdviceLevel, AdviceReport, BandMarker, BandZone, CompositeScore, Recommendation,
    ScoreContribution, SignalAssessment, SignalKind,
};
pub use fund::{FundHistory, FundKind, FundMetadata, FundSnapshot, HistoryRequest, QuickRange};
pub use analysis_view::{AdviceView, AnalysisView, ChartRow, ProjectionView, ValuationRequest};

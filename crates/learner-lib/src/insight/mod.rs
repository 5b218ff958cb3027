//! Weekly insight generation
//!
//! - Scoring capability (`InsightScorer`) and the rule-based artifact
//! - Aggregation of current and previous periods into an `InsightReport`
//! - Narrative templates

mod aggregator;
mod narrative;
mod scorer;

pub use aggregator::{improvement_rate, InsightAggregator, InsightReport, InsightRequest};
pub use narrative::{extended_message, performance_levels, summary, LevelDescriptor};
pub use scorer::{InsightScorer, MetricRule, RecommendationRule, RuleBasedScorer, ScoreCard};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named numeric counters for one period, as received from the caller
pub type MetricsSnapshot = serde_json::Map<String, serde_json::Value>;

/// Engagement tier derived from a score in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceLevel {
    /// Best to worst
    pub const ALL: [PerformanceLevel; 4] = [
        PerformanceLevel::Excellent,
        PerformanceLevel::Good,
        PerformanceLevel::Average,
        PerformanceLevel::NeedsImprovement,
    ];

    /// Tier for `score`, clamped into `[0, 100]` first
    pub fn from_score(score: f64) -> Self {
        let score = clamp_score(score);
        if score >= 85.0 {
            PerformanceLevel::Excellent
        } else if score >= 70.0 {
            PerformanceLevel::Good
        } else if score >= 50.0 {
            PerformanceLevel::Average
        } else {
            PerformanceLevel::NeedsImprovement
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::Average => "average",
            PerformanceLevel::NeedsImprovement => "needs_improvement",
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp into `[0, 100]`; NaN counts as 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(PerformanceLevel::from_score(49.999), PerformanceLevel::NeedsImprovement);
        assert_eq!(PerformanceLevel::from_score(50.0), PerformanceLevel::Average);
        assert_eq!(PerformanceLevel::from_score(69.99), PerformanceLevel::Average);
        assert_eq!(PerformanceLevel::from_score(70.0), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_score(84.999), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_score(85.0), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_score(100.0), PerformanceLevel::Excellent);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        assert_eq!(PerformanceLevel::from_score(-5.0), PerformanceLevel::NeedsImprovement);
        assert_eq!(PerformanceLevel::from_score(240.0), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_score(f64::NAN), PerformanceLevel::NeedsImprovement);
        assert_eq!(clamp_score(101.5), 100.0);
    }

    #[test]
    fn test_level_serializes_snake_case() {
        let json = serde_json::to_string(&PerformanceLevel::NeedsImprovement).unwrap();
        assert_eq!(json, "\"needs_improvement\"");
    }
}

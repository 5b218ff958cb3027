//! Engagement scoring capability and the rule-based insight generator artifact

use super::narrative::persona_key;
use super::{clamp_score, round_to, MetricsSnapshot, PerformanceLevel};
use crate::error::Result;
use crate::features::coerce_numeric;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Scores one period of activity for a persona
pub trait InsightScorer: Send + Sync {
    fn generate(&self, snapshot: &MetricsSnapshot, persona: &str) -> Result<ScoreCard>;

    fn version(&self) -> &str;
}

/// Output of a single scoring call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub engagement_score: f64,
    pub performance_level: PerformanceLevel,
    pub recommendations: Vec<String>,
    /// Raw counter values under their canonical names
    pub metrics: BTreeMap<String, f64>,
}

/// A weighted counter contributing to the engagement score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRule {
    /// Canonical name reported in the breakdown
    pub name: String,
    /// Accepted input keys, first present wins
    pub sources: Vec<String>,
    /// Value at which the metric saturates
    pub target: f64,
    pub weight: f64,
}

/// Emitted when a metric's progress ratio is below `below`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRule {
    pub metric: String,
    pub below: f64,
    pub message: String,
}

/// Insight generator loaded from a JSON rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBasedScorer {
    version: String,
    metrics: Vec<MetricRule>,
    #[serde(default)]
    recommendations: Vec<RecommendationRule>,
    #[serde(default)]
    persona_recommendations: HashMap<String, String>,
    default_recommendation: String,
}

impl RuleBasedScorer {
    /// Parse and validate a rule set
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let scorer: RuleBasedScorer = serde_json::from_slice(bytes)?;
        scorer.validate()?;
        Ok(scorer)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.metrics.is_empty() {
            anyhow::bail!("Rule set defines no metrics");
        }
        for metric in &self.metrics {
            if !(metric.target.is_finite() && metric.target > 0.0) {
                anyhow::bail!("Metric '{}' needs a positive target", metric.name);
            }
            if !(metric.weight.is_finite() && metric.weight >= 0.0) {
                anyhow::bail!("Metric '{}' has an invalid weight", metric.name);
            }
            if metric.sources.is_empty() {
                anyhow::bail!("Metric '{}' has no input sources", metric.name);
            }
        }
        if self.metrics.iter().map(|m| m.weight).sum::<f64>() <= 0.0 {
            anyhow::bail!("Metric weights sum to zero");
        }
        for rule in &self.recommendations {
            if !self.metrics.iter().any(|m| m.name == rule.metric) {
                anyhow::bail!("Recommendation refers to unknown metric '{}'", rule.metric);
            }
        }
        Ok(())
    }

    /// Counter value for `rule`; absent counters are 0
    fn read_metric(rule: &MetricRule, snapshot: &MetricsSnapshot) -> Result<f64> {
        match rule
            .sources
            .iter()
            .find_map(|key| snapshot.get(key).map(|v| (key, v)))
        {
            Some((key, value)) => coerce_numeric(key, value),
            None => Ok(0.0),
        }
    }
}

impl InsightScorer for RuleBasedScorer {
    fn generate(&self, snapshot: &MetricsSnapshot, persona: &str) -> Result<ScoreCard> {
        let mut metrics = BTreeMap::new();
        let mut ratios = HashMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for rule in &self.metrics {
            let value = Self::read_metric(rule, snapshot)?;
            let ratio = (value.max(0.0) / rule.target).min(1.0);
            weighted += rule.weight * ratio;
            total_weight += rule.weight;
            ratios.insert(rule.name.as_str(), ratio);
            metrics.insert(rule.name.clone(), value);
        }

        let engagement_score = round_to(clamp_score(100.0 * weighted / total_weight), 2);

        let mut recommendations: Vec<String> = self
            .recommendations
            .iter()
            .filter(|rule| ratios.get(rule.metric.as_str()).is_some_and(|r| *r < rule.below))
            .map(|rule| rule.message.clone())
            .collect();
        if let Some(message) = self.persona_recommendations.get(&persona_key(persona)) {
            recommendations.push(message.clone());
        }
        if recommendations.is_empty() {
            recommendations.push(self.default_recommendation.clone());
        }

        Ok(ScoreCard {
            engagement_score,
            performance_level: PerformanceLevel::from_score(engagement_score),
            recommendations,
            metrics,
        })
    }

    fn version(&self) -> &str {
        &self.version
    }
}

impl Default for RuleBasedScorer {
    /// Weekly rule set matching the bundled `insight_generator.json`
    fn default() -> Self {
        let metric = |name: &str, alias: &str, target: f64, weight: f64| MetricRule {
            name: name.to_string(),
            sources: vec![name.to_string(), alias.to_string()],
            target,
            weight,
        };
        let advice = |metric: &str, below: f64, message: &str| RecommendationRule {
            metric: metric.to_string(),
            below,
            message: message.to_string(),
        };

        Self {
            version: "1.0.0".to_string(),
            metrics: vec![
                metric("study_time", "total_study_time_hours", 10.0, 0.35),
                metric("pomodoro", "pomodoro_sessions", 15.0, 0.25),
                metric("quizzes", "quizzes_completed", 5.0, 0.2),
                metric("modules", "modules_finished", 3.0, 0.2),
            ],
            recommendations: vec![
                advice("study_time", 0.5, "Increase your weekly study time, aim for at least 5 hours."),
                advice("pomodoro", 0.5, "Use the Pomodoro technique to keep your sessions focused."),
                advice("quizzes", 0.5, "Take more quizzes to check your understanding."),
                advice("modules", 0.5, "Try to finish at least one more module next week."),
            ],
            persona_recommendations: [
                ("fast_learner", "Challenge yourself with advanced material while your momentum is high."),
                ("consistent_learner", "Keep your regular schedule, it is your biggest strength."),
                ("reflective_learner", "Set aside time to review your notes and connect new ideas."),
                ("new_learner", "Start with short daily sessions to build a steady habit."),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            default_recommendation: "Keep up the great work and stay consistent!".to_string(),
        }
    }
}

//! Canned summary and "say more" text for weekly insights

use super::PerformanceLevel;
use serde::Serialize;
use std::collections::BTreeMap;

/// Entry of the performance level catalog
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LevelDescriptor {
    pub level: PerformanceLevel,
    pub score_range: &'static str,
    pub description: &'static str,
    pub badge: &'static str,
}

const LEVELS: [LevelDescriptor; 4] = [
    LevelDescriptor {
        level: PerformanceLevel::Excellent,
        score_range: "85-100",
        description: "Outstanding engagement and progress",
        badge: "🌟",
    },
    LevelDescriptor {
        level: PerformanceLevel::Good,
        score_range: "70-84",
        description: "Solid performance with consistent progress",
        badge: "👍",
    },
    LevelDescriptor {
        level: PerformanceLevel::Average,
        score_range: "50-69",
        description: "Moderate engagement with room for growth",
        badge: "📈",
    },
    LevelDescriptor {
        level: PerformanceLevel::NeedsImprovement,
        score_range: "0-49",
        description: "Low engagement, needs focus on building habits",
        badge: "💪",
    },
];

pub fn performance_levels() -> &'static [LevelDescriptor] {
    &LEVELS
}

/// Lowercase, spaces to underscores; blank means a new learner
pub(crate) fn persona_key(persona: &str) -> String {
    let trimmed = persona.trim();
    if trimmed.is_empty() {
        return "new_learner".to_string();
    }
    trimmed.to_lowercase().replace(' ', "_")
}

/// One-line summary of the week
pub fn summary(level: PerformanceLevel, score: f64) -> String {
    match level {
        PerformanceLevel::Excellent => format!(
            "Outstanding performance this week! Your engagement score of {:.1}/100 shows exceptional dedication.",
            score
        ),
        PerformanceLevel::Good => format!(
            "Great work this week! Your engagement score of {:.1}/100 demonstrates solid progress.",
            score
        ),
        PerformanceLevel::Average => format!(
            "You're making progress with an engagement score of {:.1}/100. Let's aim higher next week!",
            score
        ),
        PerformanceLevel::NeedsImprovement => format!(
            "Your engagement score of {:.1}/100 shows room for improvement. Let's build better habits together!",
            score
        ),
    }
}

/// Three sentences: learning style, this week's progress, and a tip
pub fn extended_message(persona: &str, level: PerformanceLevel, metrics: &BTreeMap<String, f64>) -> String {
    let key = persona_key(persona);
    format!(
        "{} {} {}",
        persona_sentence(&key),
        progress_sentence(level, metrics),
        tip(&key, level)
    )
}

fn persona_sentence(key: &str) -> &'static str {
    match key {
        "fast_learner" => "As a Fast Learner, you thrive on quick absorption of new concepts and enjoy tackling challenges head-on.",
        "consistent_learner" => "As a Consistent Learner, your steady and disciplined approach helps you build strong foundations over time.",
        "reflective_learner" => "As a Reflective Learner, you excel at deep thinking and connecting ideas in meaningful ways.",
        "new_learner" => "As a New Learner, you're just beginning your journey and every step forward is a valuable achievement.",
        _ => "Your unique learning style is shaping your educational journey in interesting ways.",
    }
}

fn progress_sentence(level: PerformanceLevel, metrics: &BTreeMap<String, f64>) -> String {
    let value = |name: &str| metrics.get(name).copied().unwrap_or(0.0);
    let mut parts = Vec::new();

    let study_time = value("study_time");
    if study_time > 0.0 {
        parts.push(format!("logged {:.1} hours of study time", study_time));
    }
    let pomodoro = value("pomodoro");
    if pomodoro > 0.0 {
        parts.push(format!("completed {} Pomodoro {}", count(pomodoro), plural(pomodoro, "session", "sessions")));
    }
    let quizzes = value("quizzes");
    if quizzes > 0.0 {
        parts.push(format!("finished {} {}", count(quizzes), plural(quizzes, "quiz", "quizzes")));
    }
    let modules = value("modules");
    if modules > 0.0 {
        parts.push(format!("progressed through {} {}", count(modules), plural(modules, "module", "modules")));
    }

    if parts.is_empty() {
        return "This week is a fresh start, so begin with small steps and watch your progress grow.".to_string();
    }

    let detail = join_oxford(&parts);
    match level {
        PerformanceLevel::Excellent => format!(
            "This week you've {}, an outstanding achievement that puts you ahead of the curve!",
            detail
        ),
        PerformanceLevel::Good => format!(
            "This week you've {}, showing solid commitment to your learning goals.",
            detail
        ),
        PerformanceLevel::Average => format!(
            "This week you've {}, which is a good foundation to build upon.",
            detail
        ),
        PerformanceLevel::NeedsImprovement => format!(
            "This week you've {}, and every bit of progress counts toward your success.",
            detail
        ),
    }
}

fn tip(key: &str, level: PerformanceLevel) -> &'static str {
    use PerformanceLevel::*;
    match (key, level) {
        ("fast_learner", Excellent) => "Keep pushing your limits by exploring advanced topics or setting stretch goals for next week!",
        ("fast_learner", Good) => "Consider challenging yourself with more complex materials to maintain your momentum.",
        ("fast_learner", Average) => "Try breaking larger goals into smaller sprints to reignite your fast-paced learning style.",
        ("fast_learner", NeedsImprovement) => "Start with quick wins: short, focused sessions can help you regain your learning rhythm.",

        ("consistent_learner", Excellent) => "Your consistency is paying off, so consider mentoring others or tackling a passion project!",
        ("consistent_learner", Good) => "Maintain your steady pace and perhaps add one new learning technique to your routine.",
        ("consistent_learner", Average) => "Try scheduling your study sessions at the same time each day to strengthen your habits.",
        ("consistent_learner", NeedsImprovement) => "Focus on rebuilding your routine, since even 15 minutes daily can restart your consistent progress.",

        ("reflective_learner", Excellent) => "Your deep understanding is impressive, so share your insights through notes or discussions to solidify learning!",
        ("reflective_learner", Good) => "Take time to review and connect this week's concepts with what you've learned before.",
        ("reflective_learner", Average) => "Try journaling about what you learn, it aligns perfectly with your reflective nature.",
        ("reflective_learner", NeedsImprovement) => "Start with revisiting previous materials, because your strength lies in making deep connections.",

        ("new_learner", Excellent) => "Amazing start! You're building great habits, so keep exploring and stay curious!",
        ("new_learner", Good) => "You're making wonderful progress as a beginner, celebrate these early wins!",
        ("new_learner", Average) => "Every expert was once a beginner, so keep experimenting to find what works best for you.",
        ("new_learner", NeedsImprovement) => "Take it one step at a time and focus on understanding rather than speed, you'll get there.",

        _ => "Keep up the effort and stay committed to your learning journey!",
    }
}

/// Whole counts print without a fractional part
fn count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn plural(value: f64, one: &'static str, many: &'static str) -> &'static str {
    if value > 1.0 {
        many
    } else {
        one
    }
}

fn join_oxford(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_persona_key_normalization() {
        assert_eq!(persona_key("Fast Learner"), "fast_learner");
        assert_eq!(persona_key("  "), "new_learner");
        assert_eq!(persona_key("reflective_learner"), "reflective_learner");
    }

    #[test]
    fn test_summary_formats_one_decimal() {
        assert_eq!(
            summary(PerformanceLevel::Good, 72.456),
            "Great work this week! Your engagement score of 72.5/100 demonstrates solid progress."
        );
    }

    #[test]
    fn test_extended_message_lists_progress() {
        let message = extended_message(
            "Fast Learner",
            PerformanceLevel::Good,
            &metrics(&[("study_time", 7.5), ("pomodoro", 1.0), ("quizzes", 3.0)]),
        );
        assert_eq!(
            message,
            "As a Fast Learner, you thrive on quick absorption of new concepts and enjoy tackling challenges head-on. \
             This week you've logged 7.5 hours of study time, completed 1 Pomodoro session, and finished 3 quizzes, \
             showing solid commitment to your learning goals. \
             Consider challenging yourself with more complex materials to maintain your momentum."
        );
    }

    #[test]
    fn test_extended_message_without_activity() {
        let message = extended_message("", PerformanceLevel::NeedsImprovement, &BTreeMap::new());
        assert!(message.starts_with("As a New Learner"));
        assert!(message.contains("This week is a fresh start"));
        assert!(message.ends_with("you'll get there."));
    }

    #[test]
    fn test_unknown_persona_uses_generic_text() {
        let message = extended_message(
            "explorer",
            PerformanceLevel::Average,
            &metrics(&[("modules", 2.0)]),
        );
        assert!(message.starts_with("Your unique learning style"));
        assert!(message.contains("progressed through 2 modules"));
        assert!(message.ends_with("stay committed to your learning journey!"));
    }

    #[test]
    fn test_narrative_is_deterministic() {
        let m = metrics(&[("study_time", 3.0), ("modules", 1.0)]);
        assert_eq!(
            extended_message("new_learner", PerformanceLevel::Average, &m),
            extended_message("new_learner", PerformanceLevel::Average, &m)
        );
    }

    #[test]
    fn test_level_catalog_order() {
        let levels: Vec<_> = performance_levels().iter().map(|l| l.level).collect();
        assert_eq!(levels, PerformanceLevel::ALL.to_vec());
        assert_eq!(performance_levels()[3].score_range, "0-49");
    }
}

//! Learner persona labels and prediction pipeline

mod pipeline;


pub use pipeline::{PersonaClassifier, PersonaPrediction};

use crate::predictor::RawLabel;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Canonical persona labels, plus the `unknown` sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaLabel {
    ConsistentLearner,
    FastLearner,
    NewLearner,
    ReflectiveLearner,
    Unknown,
}

/// Class index table the persona classifier was trained with
pub const PERSONA_CLASSES: [PersonaLabel; 4] = [
    PersonaLabel::ConsistentLearner,
    PersonaLabel::FastLearner,
    PersonaLabel::NewLearner,
    PersonaLabel::ReflectiveLearner,
];

impl PersonaLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaLabel::ConsistentLearner => "consistent_learner",
            PersonaLabel::FastLearner => "fast_learner",
            PersonaLabel::NewLearner => "new_learner",
            PersonaLabel::ReflectiveLearner => "reflective_learner",
            PersonaLabel::Unknown => "unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PersonaLabel::ConsistentLearner => "Regular study habits, steady progress",
            PersonaLabel::FastLearner => "Quick completion, high engagement",
            PersonaLabel::NewLearner => "Just started, building habits",
            PersonaLabel::ReflectiveLearner => "Deep thinking, thorough learning",
            PersonaLabel::Unknown => "Prediction could not be mapped to a known persona",
        }
    }

    /// Look up a class index; unmapped indices are `Unknown`
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| PERSONA_CLASSES.get(i).copied())
            .unwrap_or(PersonaLabel::Unknown)
    }

    /// Accept only exact canonical names; anything else is `Unknown`
    pub fn from_name(name: &str) -> Self {
        PERSONA_CLASSES
            .iter()
            .copied()
            .find(|p| p.as_str() == name)
            .unwrap_or(PersonaLabel::Unknown)
    }

    pub fn is_known(&self) -> bool {
        *self != PersonaLabel::Unknown
    }
}

impl fmt::Display for PersonaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw classifier label.
///
/// Never fails: unmapped labels resolve to `Unknown` and are logged so the
/// gap stays visible.
pub fn resolve_label(raw: &RawLabel) -> PersonaLabel {
    let persona = match raw {
        RawLabel::Index(i) => PersonaLabel::from_index(*i),
        RawLabel::Name(name) => PersonaLabel::from_name(name),
    };
    if !persona.is_known() {
        warn!(raw_label = %raw, "Prediction did not map to a known persona");
    }
    persona
}

//! Persona domain state: mood, relations and plans of an agent.
//!
//! This is kept apart from [`AgentDescriptor`](super::descriptor::AgentDescriptor)
//! and associated by name through a [`PersonaBook`]. Code that needs both
//! takes both as explicit parameters.

use super::value_objects::AgentName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Basic emotions (Plutchik's wheel).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Trust,
    Fear,
    Surprise,
    Sadness,
    Disgust,
    Anger,
    Anticipation,
    #[default]
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Trust => "trust",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Sadness => "sadness",
            Emotion::Disgust => "disgust",
            Emotion::Anger => "anger",
            Emotion::Anticipation => "anticipation",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            Emotion::Joy | Emotion::Trust | Emotion::Anticipation | Emotion::Surprise
        )
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joy" => Ok(Emotion::Joy),
            "trust" => Ok(Emotion::Trust),
            "fear" => Ok(Emotion::Fear),
            "surprise" => Ok(Emotion::Surprise),
            "sadness" => Ok(Emotion::Sadness),
            "disgust" => Ok(Emotion::Disgust),
            "anger" => Ok(Emotion::Anger),
            "anticipation" => Ok(Emotion::Anticipation),
            "neutral" => Ok(Emotion::Neutral),
            other => Err(format!("unknown emotion: {other}")),
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dominant emotion plus its intensity on a 0..=10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub emotion: Emotion,
    pub intensity: f64,
}

impl Mood {
    pub fn new(emotion: Emotion, intensity: f64) -> Self {
        Self {
            emotion,
            intensity: intensity.clamp(0.0, 10.0),
        }
    }

    pub fn is_positive(&self) -> bool {
        self.emotion.is_positive()
    }
}

/// Mutable per-agent state that is not part of the agent's descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaState {
    pub mood: Mood,
    /// Free-form impression of other agents, keyed by their name
    #[serde(default)]
    pub relations: BTreeMap<AgentName, String>,
    /// Current plans, most important first
    #[serde(default)]
    pub plans: Vec<String>,
}

impl PersonaState {
    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = mood;
        self
    }

    pub fn with_relation(mut self, other: impl Into<AgentName>, impression: impl Into<String>) -> Self {
        self.relations.insert(other.into(), impression.into());
        self
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plans.push(plan.into());
        self
    }
}

/// Persona states keyed by agent name.
#[derive(Debug, Clone, Default)]
pub struct PersonaBook {
    states: HashMap<AgentName, PersonaState>,
}

impl PersonaBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, agent: impl Into<AgentName>, state: PersonaState) {
        self.states.insert(agent.into(), state);
    }

    pub fn get(&self, agent: &str) -> Option<&PersonaState> {
        self.states.get(agent)
    }

    pub fn get_mut(&mut self, agent: &str) -> Option<&mut PersonaState> {
        self.states.get_mut(agent)
    }

    /// Mood of `agent`, neutral when unknown.
    pub fn mood_of(&self, agent: &str) -> Mood {
        self.get(agent).map(|s| s.mood).unwrap_or_default()
    }
}

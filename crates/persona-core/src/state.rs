//! Semantic states, clip roles and the business context descriptor
//!
//! Semantic states are what the conversation layer talks about. Clip roles
//! are what the animation layer plays. The mapping between the two is
//! many-to-one and total: anything without a dedicated role falls back to
//! [`ClipRole::Professional`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally meaningful conversational state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticState {
    #[default]
    Idle,
    Talking,
    Listening,
    Thinking,
    Happy,
    Sad,
    Excited,
}

impl SemanticState {
    /// All semantic states in declaration order
    pub fn all() -> &'static [SemanticState] {
        &[
            SemanticState::Idle,
            SemanticState::Talking,
            SemanticState::Listening,
            SemanticState::Thinking,
            SemanticState::Happy,
            SemanticState::Sad,
            SemanticState::Excited,
        ]
    }

    /// Parse the lower-case name used by the conversation layer
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "idle" => Some(SemanticState::Idle),
            "talking" => Some(SemanticState::Talking),
            "listening" => Some(SemanticState::Listening),
            "thinking" => Some(SemanticState::Thinking),
            "happy" => Some(SemanticState::Happy),
            "sad" => Some(SemanticState::Sad),
            "excited" => Some(SemanticState::Excited),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SemanticState::Idle => "idle",
            SemanticState::Talking => "talking",
            SemanticState::Listening => "listening",
            SemanticState::Thinking => "thinking",
            SemanticState::Happy => "happy",
            SemanticState::Sad => "sad",
            SemanticState::Excited => "excited",
        }
    }

    /// Internal clip role this state plays
    pub fn clip_role(self) -> ClipRole {
        match self {
            SemanticState::Idle => ClipRole::Professional,
            SemanticState::Talking => ClipRole::Presenting,
            SemanticState::Listening => ClipRole::Attentive,
            SemanticState::Thinking => ClipRole::Analyzing,
            SemanticState::Happy => ClipRole::Confident,
            _ => ClipRole::Professional,
        }
    }
}

impl fmt::Display for SemanticState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal animation clip role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipRole {
    #[default]
    Professional,
    Presenting,
    Attentive,
    Analyzing,
    Confident,
}

impl ClipRole {
    pub fn all() -> &'static [ClipRole] {
        &[
            ClipRole::Professional,
            ClipRole::Presenting,
            ClipRole::Attentive,
            ClipRole::Analyzing,
            ClipRole::Confident,
        ]
    }

    /// Name under which the role's action is registered
    pub fn name(self) -> &'static str {
        match self {
            ClipRole::Professional => "professional",
            ClipRole::Presenting => "presenting",
            ClipRole::Attentive => "attentive",
            ClipRole::Analyzing => "analyzing",
            ClipRole::Confident => "confident",
        }
    }

    /// Guess a role from a free-form clip name found in an asset
    pub fn from_clip_name(clip_name: &str) -> Option<Self> {
        let name = clip_name.to_lowercase();
        if name.contains("idle") || name.contains("standing") {
            Some(ClipRole::Professional)
        } else if name.contains("talk") || name.contains("speak") {
            Some(ClipRole::Presenting)
        } else if name.contains("listen") {
            Some(ClipRole::Attentive)
        } else if name.contains("think") {
            Some(ClipRole::Analyzing)
        } else {
            None
        }
    }
}

impl fmt::Display for ClipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Overall mood the avatar projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Professional,
    Confident,
    Focused,
    Thoughtful,
}

/// Body posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    #[default]
    Upright,
    Leaning,
    Relaxed,
}

/// Conversational engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engagement {
    #[default]
    Ready,
    Active,
    Listening,
    Thinking,
}

/// Business context descriptor, updated together with every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BusinessContext {
    pub mood: Mood,
    pub posture: Posture,
    pub engagement: Engagement,
}

impl BusinessContext {
    /// Descriptor for a clip role
    pub fn for_role(role: ClipRole) -> Self {
        match role {
            ClipRole::Presenting => BusinessContext {
                mood: Mood::Confident,
                posture: Posture::Upright,
                engagement: Engagement::Active,
            },
            ClipRole::Attentive => BusinessContext {
                mood: Mood::Focused,
                posture: Posture::Leaning,
                engagement: Engagement::Listening,
            },
            ClipRole::Analyzing => BusinessContext {
                mood: Mood::Thoughtful,
                posture: Posture::Relaxed,
                engagement: Engagement::Thinking,
            },
            _ => BusinessContext::default(),
        }
    }
}

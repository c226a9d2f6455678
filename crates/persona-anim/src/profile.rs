//! Style profiles
//!
//! One avatar type, two looks. A profile carries everything that used to
//! differ between the business and the generic character: clip names,
//! expressions, fallback colors, per-state tints and posture.

use std::collections::HashMap;
use std::fmt;

use persona_core::{ClipRole, SemanticState};
use persona_scene::{Color, FallbackTheme};
use serde::{Deserialize, Serialize};

use crate::ExpressionTable;

/// Built-in profile kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Business,
    Generic,
}

impl ProfileKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "business" => Some(ProfileKind::Business),
            "generic" => Some(ProfileKind::Generic),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProfileKind::Business => "business",
            ProfileKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behavior and look of an avatar
#[derive(Debug, Clone)]
pub struct StyleProfile {
    kind: ProfileKind,
    expressions: ExpressionTable,
    theme: FallbackTheme,
    tints: HashMap<SemanticState, Color>,
    default_tint: Option<Color>,
    postures: bool,
}

impl StyleProfile {
    pub fn business() -> Self {
        Self {
            kind: ProfileKind::Business,
            expressions: ExpressionTable::business(),
            theme: FallbackTheme::business(),
            tints: HashMap::new(),
            default_tint: None,
            postures: true,
        }
    }

    pub fn generic() -> Self {
        let tints = [
            (SemanticState::Talking, 0xff6b6b),
            (SemanticState::Listening, 0x4ecdc4),
            (SemanticState::Thinking, 0xfeca57),
        ]
        .into_iter()
        .map(|(s, hex)| (s, Color::from_hex(hex)))
        .collect();

        Self {
            kind: ProfileKind::Generic,
            expressions: ExpressionTable::generic(),
            theme: FallbackTheme::generic(),
            tints,
            default_tint: Some(Color::from_hex(0xffdbac)),
            postures: false,
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Business => Self::business(),
            ProfileKind::Generic => Self::generic(),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    pub fn expressions(&self) -> &ExpressionTable {
        &self.expressions
    }

    pub fn theme(&self) -> &FallbackTheme {
        &self.theme
    }

    /// Name procedural clips for a role are registered under
    pub fn clip_name(&self, role: ClipRole) -> &'static str {
        match self.kind {
            ProfileKind::Business => role.name(),
            ProfileKind::Generic => match role {
                ClipRole::Professional => "idle",
                ClipRole::Presenting => "talking",
                ClipRole::Attentive => "listening",
                ClipRole::Analyzing => "thinking",
                ClipRole::Confident => "happy",
            },
        }
    }

    /// Head tint for a state, if this profile tints
    pub fn tint(&self, state: SemanticState) -> Option<Color> {
        self.tints.get(&state).copied().or(self.default_tint)
    }

    /// Spine pitch for a role, if this profile poses the spine
    pub fn posture_pitch(&self, role: ClipRole) -> Option<f32> {
        if !self.postures {
            return None;
        }
        Some(match role {
            ClipRole::Presenting => -0.05,
            ClipRole::Attentive => 0.03,
            _ => 0.0,
        })
    }
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self::business()
    }
}

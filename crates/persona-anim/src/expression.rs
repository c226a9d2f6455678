//! Facial expressions
//!
//! An expression is a small set of blend-shape targets with intensities.
//! Selection is a pure lookup from the semantic state. Applying one first
//! zeroes every influence on the mesh so expressions never pile up.

use std::collections::HashMap;

use persona_core::SemanticState;
use persona_scene::MorphTargets;

/// Blend-shape targets and their intensities
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    targets: Vec<(String, f32)>,
}

impl Expression {
    pub fn new(targets: &[(&str, f32)]) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    pub fn targets(&self) -> &[(String, f32)] {
        &self.targets
    }

    pub fn intensity(&self, name: &str) -> Option<f32> {
        self.targets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Reset `morph` and apply this expression. Targets the mesh does not
    /// have are skipped. Returns how many were applied.
    pub fn apply(&self, morph: &mut MorphTargets) -> usize {
        morph.reset();
        self.targets
            .iter()
            .filter(|(name, value)| morph.set(name, *value))
            .count()
    }
}

/// Expression per semantic state, with a neutral fallback
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionTable {
    by_state: HashMap<SemanticState, Expression>,
    neutral: Expression,
}

impl ExpressionTable {
    pub fn new(neutral: Expression) -> Self {
        Self {
            by_state: HashMap::new(),
            neutral,
        }
    }

    pub fn with(mut self, state: SemanticState, expression: Expression) -> Self {
        self.by_state.insert(state, expression);
        self
    }

    /// Restrained business expressions
    pub fn business() -> Self {
        Self::new(Expression::new(&[
            ("mouthProfessional", 0.2),
            ("eyesAlert", 0.3),
            ("browNeutral", 0.1),
        ]))
        .with(
            SemanticState::Talking,
            Expression::new(&[
                ("mouthSmile", 0.3),
                ("eyesConfident", 0.4),
                ("browSlightUp", 0.2),
            ]),
        )
        .with(
            SemanticState::Listening,
            Expression::new(&[
                ("eyesAttentive", 0.5),
                ("browInterested", 0.3),
                ("mouthNeutral", 0.2),
            ]),
        )
        .with(
            SemanticState::Thinking,
            Expression::new(&[
                ("eyesFocused", 0.4),
                ("browConcentrated", 0.3),
                ("mouthThinking", 0.2),
            ]),
        )
        .with(
            SemanticState::Happy,
            Expression::new(&[("mouthSmile", 0.6), ("eyesConfident", 0.3)]),
        )
    }

    /// Plainer set for generic avatars
    pub fn generic() -> Self {
        Self::new(Expression::default())
            .with(SemanticState::Talking, Expression::new(&[("mouthSmile", 0.2)]))
            .with(SemanticState::Happy, Expression::new(&[("mouthSmile", 0.7)]))
            .with(SemanticState::Sad, Expression::new(&[("mouthFrown", 0.5)]))
    }

    /// Expression for a state; the neutral one when none is listed
    pub fn select(&self, state: SemanticState) -> &Expression {
        self.by_state.get(&state).unwrap_or(&self.neutral)
    }

    pub fn neutral(&self) -> &Expression {
        &self.neutral
    }
}

impl Default for ExpressionTable {
    fn default() -> Self {
        Self::business()
    }
}

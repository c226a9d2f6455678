//! Blend-shape (morph target) storage and name resolution
//!
//! Assets name their blend shapes inconsistently (`mouthOpen`,
//! `mouthopen`, `mouth_open`, `mouth-open`). Lookups try those spellings
//! in order and silently give up when none is present.

use std::collections::HashMap;

/// Blend shapes of one mesh: name dictionary plus influence array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTargets {
    dictionary: HashMap<String, usize>,
    influences: Vec<f32>,
}

impl MorphTargets {
    /// Build from target names in index order, all influences at zero
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dictionary = HashMap::new();
        let mut count = 0;
        for (i, name) in names.into_iter().enumerate() {
            dictionary.insert(name.into(), i);
            count = i + 1;
        }
        Self {
            dictionary,
            influences: vec![0.0; count],
        }
    }

    /// Unnamed targets (`target_0`, `target_1`, ...)
    pub fn anonymous(count: usize) -> Self {
        Self::from_names((0..count).map(|i| format!("target_{}", i)))
    }

    pub fn len(&self) -> usize {
        self.influences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.influences.is_empty()
    }

    pub fn dictionary(&self) -> &HashMap<String, usize> {
        &self.dictionary
    }

    pub fn influences(&self) -> &[f32] {
        &self.influences
    }

    /// Index of a target, trying the tolerant spellings
    pub fn resolve(&self, name: &str) -> Option<usize> {
        resolve_morph_index(&self.dictionary, name).filter(|&i| i < self.influences.len())
    }

    pub fn influence(&self, name: &str) -> Option<f32> {
        self.resolve(name).map(|i| self.influences[i])
    }

    pub fn influence_at(&self, index: usize) -> Option<f32> {
        self.influences.get(index).copied()
    }

    /// Set a target by name. Returns false when no spelling matches.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        match self.resolve(name) {
            Some(i) => {
                self.influences[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn set_at(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.influences.get_mut(index) {
            *slot = value;
        }
    }

    /// Zero every influence
    pub fn reset(&mut self) {
        self.influences.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Spellings tried for a requested target name, in lookup order
pub fn morph_name_candidates(name: &str) -> [String; 4] {
    [
        name.to_string(),
        name.to_lowercase(),
        delimit_capitals(name, '_'),
        delimit_capitals(name, '-'),
    ]
}

/// Look a target up in a name→index table
pub fn resolve_morph_index(dictionary: &HashMap<String, usize>, name: &str) -> Option<usize> {
    morph_name_candidates(name)
        .iter()
        .find_map(|candidate| dictionary.get(candidate).copied())
}

/// `mouthOpen` → `mouth_open`
fn delimit_capitals(name: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push(delimiter);
            out.push(c.to_ascii_lowercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_order() {
        let c = morph_name_candidates("mouthOpen");
        assert_eq!(c[0], "mouthOpen");
        assert_eq!(c[1], "mouthopen");
        assert_eq!(c[2], "mouth_open");
        assert_eq!(c[3], "mouth-open");
    }

    #[test]
    fn test_resolve_variants() {
        let m = MorphTargets::from_names(["mouth_smile", "eyes-confident", "browneutral"]);
        assert_eq!(m.resolve("mouthSmile"), Some(0));
        assert_eq!(m.resolve("eyesConfident"), Some(1));
        assert_eq!(m.resolve("browNeutral"), Some(2));
        assert_eq!(m.resolve("jawOpen"), None);
    }

    #[test]
    fn test_exact_wins_over_variants() {
        let m = MorphTargets::from_names(["mouth_open", "mouthOpen"]);
        assert_eq!(m.resolve("mouthOpen"), Some(1));
    }

    #[test]
    fn test_set_missing_is_noop() {
        let mut m = MorphTargets::from_names(["mouthOpen"]);
        assert!(!m.set("eyesAlert", 0.5));
        assert_eq!(m.influences(), &[0.0]);
        assert!(m.set("mouthOpen", 0.4));
        assert_eq!(m.influence("mouthOpen"), Some(0.4));
    }

    #[test]
    fn test_reset() {
        let mut m = MorphTargets::from_names(["a", "b"]);
        m.set_at(0, 1.0);
        m.set_at(1, 0.5);
        m.set_at(9, 0.5);
        m.reset();
        assert_eq!(m.influences(), &[0.0, 0.0]);
    }

    #[test]
    fn test_leading_capital() {
        let m = MorphTargets::from_names(["_mouth_open"]);
        assert_eq!(m.resolve("MouthOpen"), Some(0));
    }
}

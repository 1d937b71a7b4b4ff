//! Cue content pack: every text the engine can speak.
//!
//! The built-in pack is English. A TOML file can override any subset of
//! it; missing fields keep their built-in values.

use crate::{BlockKind, Exercise, Result, TechniqueCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Fixed words spoken around phase transitions
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Labels {
    pub rest: String,
    pub round: String,
    pub exercise: String,
    pub training_complete: String,
    pub double: String,
    pub triple: String,
    pub speed_up: String,
    pub normal_pace: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            rest: "Rest".into(),
            round: "Round".into(),
            exercise: "Exercise".into(),
            training_complete: "Training complete!".into(),
            double: "Double".into(),
            triple: "Triple".into(),
            speed_up: "Speed up!".into(),
            normal_pace: "Normal pace".into(),
        }
    }
}

/// Heavy-bag technique pools, one list per category
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TechniquePools {
    pub punches: Vec<String>,
    pub kicks: Vec<String>,
    pub knees: Vec<String>,
    pub elbows: Vec<String>,
    pub combos: Vec<String>,
}

impl Default for TechniquePools {
    fn default() -> Self {
        Self {
            punches: strings(&["Jab", "Cross", "Hook", "Uppercut", "Overhand"]),
            kicks: strings(&[
                "Low kick",
                "Middle kick",
                "High kick",
                "Front kick",
                "Side kick",
                "Roundhouse kick",
            ]),
            knees: strings(&["Straight knee", "Circular knee", "Flying knee"]),
            elbows: strings(&[
                "Horizontal elbow",
                "Downward elbow",
                "Uppercut elbow",
                "Spinning elbow",
            ]),
            combos: strings(&[
                "Jab - Cross - Hook",
                "Jab - Cross - Low kick",
                "Cross - Hook - Middle kick",
                "Jab - Cross - Uppercut - Hook",
                "Low kick - Cross - Hook",
                "Hook - Uppercut - High kick",
            ]),
        }
    }
}

impl TechniquePools {
    pub fn get(&self, category: TechniqueCategory) -> &[String] {
        match category {
            TechniqueCategory::Punches => &self.punches,
            TechniqueCategory::Kicks => &self.kicks,
            TechniqueCategory::Knees => &self.knees,
            TechniqueCategory::Elbows => &self.elbows,
            TechniqueCategory::Combos => &self.combos,
        }
    }
}

/// A technique drawn from the pool, tagged with whether it is a combo
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Technique<'a> {
    pub text: &'a str,
    pub is_combo: bool,
}

/// All texts the engine speaks
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContentPack {
    pub labels: Labels,
    /// Keyed by `BlockKind::key()`
    pub block_names: BTreeMap<String, String>,
    /// Keyed by `Exercise::key()`
    pub exercise_names: BTreeMap<String, String>,
    pub techniques: TechniquePools,
    pub motivation: Vec<String>,
}

impl Default for ContentPack {
    fn default() -> Self {
        let block_names = [
            (BlockKind::Warmup, "Warm-up"),
            (BlockKind::JumpRope, "Jump rope"),
            (BlockKind::Strength, "Strength"),
            (BlockKind::HeavyBag, "Heavy bag"),
            (BlockKind::ShadowBoxing, "Shadow boxing"),
            (BlockKind::Sparring, "Sparring"),
            (BlockKind::Cooldown, "Cool-down/Recovery"),
        ]
        .into_iter()
        .map(|(k, v)| (k.key().to_string(), v.to_string()))
        .collect();

        let exercise_names = [
            (Exercise::Plank, "Dynamic plank"),
            (Exercise::Abs, "Crunches"),
            (Exercise::Pushups, "Push-ups"),
            (Exercise::Burpees, "Burpees"),
            (Exercise::Squats, "Squats"),
            (Exercise::JumpingJacks, "Jumping jacks"),
        ]
        .into_iter()
        .map(|(k, v)| (k.key().to_string(), v.to_string()))
        .collect();

        Self {
            labels: Labels::default(),
            block_names,
            exercise_names,
            techniques: TechniquePools::default(),
            motivation: strings(&["Keep your guard up!", "Move!", "Counter!", "Breathe!"]),
        }
    }
}

impl ContentPack {
    /// Load a content pack from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let pack: ContentPack = toml::from_str(&contents)?;
        tracing::info!("Loaded cue content from {:?}", path);
        Ok(pack)
    }

    /// Load the pack named by the config, falling back to the built-in
    /// English pack when none is configured
    pub fn from_config(config: &crate::Config) -> Result<Self> {
        match config.cues.content_path {
            Some(ref path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    pub fn block_name(&self, kind: BlockKind) -> &str {
        self.block_names
            .get(kind.key())
            .map(String::as_str)
            .unwrap_or_else(|| kind.key())
    }

    pub fn exercise_name(&self, exercise: Exercise) -> &str {
        self.exercise_names
            .get(exercise.key())
            .map(String::as_str)
            .unwrap_or_else(|| exercise.key())
    }

    /// Flattened pool of techniques for the selected categories, in
    /// selection order
    pub fn technique_pool(&self, categories: &[TechniqueCategory]) -> Vec<Technique<'_>> {
        categories
            .iter()
            .flat_map(|&category| {
                self.techniques.get(category).iter().map(move |text| Technique {
                    text: text.as_str(),
                    is_combo: category.is_combo(),
                })
            })
            .collect()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_and_exercise_has_a_name() {
        let pack = ContentPack::default();
        for kind in BlockKind::ALL {
            assert_ne!(pack.block_name(kind), kind.key(), "{:?}", kind);
        }
        assert_eq!(pack.exercise_name(Exercise::Pushups), "Push-ups");
        assert_eq!(pack.exercise_name(Exercise::JumpingJacks), "Jumping jacks");
    }

    #[test]
    fn test_technique_pool_follows_selection() {
        let pack = ContentPack::default();
        let pool = pack.technique_pool(&[TechniqueCategory::Knees, TechniqueCategory::Combos]);
        assert_eq!(pool.len(), 3 + 6);
        assert_eq!(pool[0].text, "Straight knee");
        assert!(!pool[0].is_combo);
        assert!(pool[3].is_combo);
        assert!(pack.technique_pool(&[]).is_empty());
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
motivation = ["Hands up!"]

[labels]
rest = "Repos"

[block_names]
heavy_bag = "Sac de frappe"
"#;
        let pack: ContentPack = toml::from_str(toml_str).unwrap();
        assert_eq!(pack.labels.rest, "Repos");
        assert_eq!(pack.labels.round, "Round"); // default
        assert_eq!(pack.motivation, vec!["Hands up!".to_string()]);
        assert_eq!(pack.block_name(BlockKind::HeavyBag), "Sac de frappe");
        // A replaced map loses the other entries and falls back to the key
        assert_eq!(pack.block_name(BlockKind::Warmup), "warmup");
        assert_eq!(pack.techniques.punches.len(), 5);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("content.toml");
        std::fs::write(&path, "[labels]\ndouble = \"Doble\"\n").unwrap();

        let pack = ContentPack::load_from(&path).unwrap();
        assert_eq!(pack.labels.double, "Doble");
    }
}

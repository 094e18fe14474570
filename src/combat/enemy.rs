//! Enemy templates, instances and the enemy catalog
//!
//! The catalog is an explicit value handed to the engine. It can come from
//! the backend, a JSON file, or the built-in table below.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::dice::DicePool;

/// Errors loading a catalog from disk
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog has no enemies")]
    Empty,
}

/// Rough challenge rating shown in enemy lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Deadly,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Deadly => "deadly",
        };
        write!(f, "{}", s)
    }
}

/// One loot table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub name: String,
    #[serde(default = "default_loot_kind")]
    pub kind: String,
    /// Relative drop weight, carried for display
    #[serde(default = "default_loot_weight")]
    pub weight: u32,
}

fn default_loot_kind() -> String {
    "material".to_string()
}

fn default_loot_weight() -> u32 {
    1
}

impl LootEntry {
    pub fn new(name: &str, kind: &str, weight: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            weight,
        }
    }
}

/// A dropped item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootItem {
    pub name: String,
    pub kind: String,
    pub quantity: u32,
}

impl fmt::Display for LootItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.name, self.quantity)
    }
}

/// Static catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    /// Catalog key
    #[serde(alias = "type")]
    pub enemy_id: String,
    pub name: String,
    #[serde(default = "default_enemy_level")]
    pub level: u32,
    pub max_hp: u32,
    #[serde(default)]
    pub dice_pool: String,
    #[serde(default)]
    pub xp_reward: u32,
    #[serde(default)]
    pub loot_table: Vec<LootEntry>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

fn default_enemy_level() -> u32 {
    1
}

impl EnemyTemplate {
    pub fn new(enemy_id: &str, name: &str, level: u32, max_hp: u32, dice_pool: &str) -> Self {
        Self {
            enemy_id: enemy_id.to_string(),
            name: name.to_string(),
            level,
            max_hp,
            dice_pool: dice_pool.to_string(),
            xp_reward: 0,
            loot_table: Vec::new(),
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_xp(mut self, xp_reward: u32) -> Self {
        self.xp_reward = xp_reward;
        self
    }

    pub fn with_loot(mut self, loot: LootEntry) -> Self {
        self.loot_table.push(loot);
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

/// A live enemy for one encounter
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyInstance {
    pub id: Uuid,
    pub template: EnemyTemplate,
    /// Parsed once from the template's notation
    pub pool: DicePool,
    pub current_hp: u32,
}

impl EnemyInstance {
    /// Fresh instance at full HP with a new id
    pub fn spawn(template: &EnemyTemplate) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool: DicePool::parse(&template.dice_pool),
            current_hp: template.max_hp,
            template: template.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn max_hp(&self) -> u32 {
        self.template.max_hp
    }

    pub fn xp_reward(&self) -> u32 {
        self.template.xp_reward
    }

    pub fn is_defeated(&self) -> bool {
        self.current_hp == 0
    }
}

/// Enemy templates by key
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyCatalog {
    templates: BTreeMap<String, EnemyTemplate>,
}

impl Default for EnemyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EnemyCatalog {
    /// Catalog from records; later records replace earlier ones with the same key
    pub fn from_templates(templates: impl IntoIterator<Item = EnemyTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.enemy_id.clone(), t))
                .collect(),
        }
    }

    /// Parse a JSON array of enemy records
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let templates: Vec<EnemyTemplate> = serde_json::from_str(json)?;
        if templates.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self::from_templates(templates))
    }

    /// Load a JSON catalog file
    pub fn load_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), enemies = catalog.len(), "loaded enemy catalog file");
        Ok(catalog)
    }

    /// Use a loaded catalog, or the built-in table if loading failed
    pub fn or_builtin<E: fmt::Display>(loaded: Result<Self, E>) -> Self {
        match loaded {
            Ok(catalog) if !catalog.is_empty() => catalog,
            Ok(_) => {
                warn!("enemy catalog empty; using built-in catalog");
                Self::builtin()
            }
            Err(e) => {
                warn!(error = %e, "enemy catalog unavailable; using built-in catalog");
                Self::builtin()
            }
        }
    }

    /// The built-in default catalog
    pub fn builtin() -> Self {
        Self::from_templates([
            EnemyTemplate::new("goblin", "Goblin", 1, 7, "2d4")
                .with_xp(25)
                .with_difficulty(Difficulty::Easy)
                .with_loot(LootEntry::new("Goblin Ear", "material", 5))
                .with_loot(LootEntry::new("Rusty Dagger", "weapon", 2)),
            EnemyTemplate::new("wolf", "Wolf", 2, 11, "2d6")
                .with_xp(50)
                .with_difficulty(Difficulty::Easy)
                .with_loot(LootEntry::new("Wolf Pelt", "material", 5))
                .with_loot(LootEntry::new("Wolf Fang", "material", 3)),
            EnemyTemplate::new("skeleton", "Skeleton", 3, 13, "1d8+1d6")
                .with_xp(75)
                .with_loot(LootEntry::new("Bone Dust", "material", 5))
                .with_loot(LootEntry::new("Old Shield", "armor", 1)),
            EnemyTemplate::new("orc", "Orc Warrior", 4, 18, "2d8+2")
                .with_xp(120)
                .with_loot(LootEntry::new("Orcish Axe", "weapon", 2))
                .with_loot(LootEntry::new("Healing Draught", "consumable", 3)),
            EnemyTemplate::new("troll", "Cave Troll", 7, 34, "2d12+1d6")
                .with_xp(300)
                .with_difficulty(Difficulty::Hard)
                .with_loot(LootEntry::new("Troll Hide", "material", 4))
                .with_loot(LootEntry::new("Gold Coins", "currency", 6)),
            EnemyTemplate::new("wyrmling", "Dragon Wyrmling", 10, 52, "3d12+1d8+2")
                .with_xp(700)
                .with_difficulty(Difficulty::Deadly)
                .with_loot(LootEntry::new("Dragon Scale", "material", 3))
                .with_loot(LootEntry::new("Gold Coins", "currency", 8))
                .with_loot(LootEntry::new("Ember Gem", "treasure", 1)),
        ])
    }

    pub fn get(&self, key: &str) -> Option<&EnemyTemplate> {
        self.templates.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnemyTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = EnemyCatalog::builtin();
        let goblin = catalog.get("goblin").unwrap();
        assert_eq!(goblin.max_hp, 7);
        assert_eq!(goblin.dice_pool, "2d4");
        assert!(catalog.len() >= 6);

        // Every built-in pool parses cleanly
        for template in catalog.iter() {
            assert!(!DicePool::parse(&template.dice_pool).dice.is_empty());
        }
    }

    #[test]
    fn test_spawn_fresh_instances() {
        let catalog = EnemyCatalog::builtin();
        let template = catalog.get("wolf").unwrap();
        let a = EnemyInstance::spawn(template);
        let b = EnemyInstance::spawn(template);

        assert_ne!(a.id, b.id);
        assert_eq!(a.current_hp, 11);
        assert_eq!(a.pool.to_string(), "2d6");
        assert!(!a.is_defeated());
    }

    #[test]
    fn test_from_json_accepts_type_alias() {
        let json = r#"[
            {"type": "slime", "name": "Slime", "level": 1, "max_hp": 5,
             "dice_pool": "1d4", "xp_reward": 10, "difficulty": "easy",
             "loot_table": [{"name": "Goo"}]},
            {"enemy_id": "bat", "name": "Bat", "max_hp": 3, "dice_pool": "1d6"}
        ]"#;
        let catalog = EnemyCatalog::from_json(json).unwrap();

        let slime = catalog.get("slime").unwrap();
        assert_eq!(slime.difficulty, Difficulty::Easy);
        assert_eq!(slime.loot_table[0].kind, "material");
        assert_eq!(slime.loot_table[0].weight, 1);

        let bat = catalog.get("bat").unwrap();
        assert_eq!(bat.level, 1);
        assert_eq!(bat.difficulty, Difficulty::Medium);
        assert!(bat.loot_table.is_empty());
    }

    #[test]
    fn test_from_json_rejects_empty() {
        assert!(matches!(EnemyCatalog::from_json("[]"), Err(CatalogError::Empty)));
        assert!(matches!(EnemyCatalog::from_json("{"), Err(CatalogError::Json(_))));
    }

    #[test]
    fn test_or_builtin_fallback() {
        let failed: Result<EnemyCatalog, String> = Err("connection refused".to_string());
        assert_eq!(EnemyCatalog::or_builtin(failed), EnemyCatalog::builtin());

        let empty: Result<EnemyCatalog, String> = Ok(EnemyCatalog::from_templates([]));
        assert_eq!(EnemyCatalog::or_builtin(empty), EnemyCatalog::builtin());

        let custom = EnemyCatalog::from_templates([EnemyTemplate::new("rat", "Rat", 1, 2, "1d4")]);
        assert_eq!(EnemyCatalog::or_builtin::<String>(Ok(custom.clone())), custom);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enemies.json");
        std::fs::write(
            &path,
            r#"[{"enemy_id": "rat", "name": "Rat", "max_hp": 2, "dice_pool": "1d4"}]"#,
        )
        .unwrap();

        let catalog = EnemyCatalog::load_file(&path).unwrap();
        assert!(catalog.contains("rat"));
        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["rat"]);

        let missing = EnemyCatalog::load_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(CatalogError::Io(_))));
    }
}

//! Character combat view
//!
//! Decodes the backend's character snapshot and derives combat-relevant
//! values (max HP, attribute dice). The engine only reads characters.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use super::attributes::{AttributeName, Attributes};
use super::dice::DicePool;

/// HP every character starts from before constitution and level
pub const BASE_HP: u32 = 20;

/// Extra max HP per character level above 1
pub const HP_PER_LEVEL: u32 = 5;

/// Character record as served by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    /// Missing means full health
    #[serde(default)]
    pub current_hp: Option<u32>,
    #[serde(default)]
    pub max_hp: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub current_xp: u32,
}

fn default_level() -> u32 {
    1
}

/// Backend ids may arrive as numbers or strings
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// A character as the combat engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
    /// Character level, distinct from attribute levels
    pub level: u32,
    current_hp: u32,
    pub current_xp: u32,
}

impl Character {
    /// Create a level 1 character with default attributes at full HP
    pub fn new(id: &str, name: &str) -> Self {
        Self::with_attributes(id, name, Attributes::default(), 1)
    }

    /// Create a character at full HP
    pub fn with_attributes(id: &str, name: &str, attributes: Attributes, level: u32) -> Self {
        let mut character = Self {
            id: id.to_string(),
            name: name.to_string(),
            attributes,
            level: level.max(1),
            current_hp: 0,
            current_xp: 0,
        };
        character.current_hp = character.max_hp();
        character
    }

    /// Build from a backend snapshot, clamping current HP to the derived max
    pub fn from_snapshot(snapshot: CharacterSnapshot) -> Self {
        let mut character = Self {
            id: snapshot.id,
            name: snapshot.name,
            attributes: snapshot.attributes,
            level: snapshot.level.max(1),
            current_hp: 0,
            current_xp: snapshot.current_xp,
        };

        let max_hp = character.max_hp();
        if snapshot.max_hp != 0 && snapshot.max_hp != max_hp {
            debug!(
                character = %character.id,
                reported = snapshot.max_hp,
                derived = max_hp,
                "snapshot max_hp differs from derived value"
            );
        }
        let current_hp = snapshot.current_hp.unwrap_or(max_hp);
        if current_hp > max_hp {
            warn!(
                character = %character.id,
                current_hp,
                max_hp,
                "snapshot current_hp above max; clamping"
            );
        }
        character.current_hp = current_hp.min(max_hp);
        character
    }

    /// 20 + highest constitution roll + 5 per level above 1
    pub fn max_hp(&self) -> u32 {
        let vitality = self.attributes.get(AttributeName::VITALITY).dice_pool();
        let levels = HP_PER_LEVEL.saturating_mul(self.level.max(1) - 1);
        BASE_HP
            .saturating_add(vitality.analyze().max)
            .saturating_add(levels)
    }

    /// Current HP, always within `[0, max_hp]`
    pub fn current_hp(&self) -> u32 {
        self.current_hp
    }

    pub fn set_current_hp(&mut self, hp: u32) {
        self.current_hp = hp.min(self.max_hp());
    }

    /// Credit habit points to an attribute; its level and dice follow.
    ///
    /// Returns the attribute's new level.
    pub fn record_habit(&mut self, attribute: AttributeName, points: u32) -> u32 {
        let attr = self.attributes.get_mut(attribute);
        attr.habit_points = attr.habit_points.saturating_add(points);
        let level = attr.level();
        self.current_hp = self.current_hp.min(self.max_hp());
        level
    }

    /// Dice for one attribute at its current level
    pub fn attribute_pool(&self, attribute: AttributeName) -> DicePool {
        self.attributes.get(attribute).dice_pool()
    }

    pub fn is_defeated(&self) -> bool {
        self.current_hp == 0
    }
}

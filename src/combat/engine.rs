//! Combat engine
//!
//! Builds combat dice pools, spawns enemies from the catalog, resolves
//! single rounds and rolls loot. Rounds are stateless: everything a round
//! needs is passed in.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::attributes::AttributeName;
use super::character::Character;
use super::dice::{DicePool, DiceSource};
use super::enemy::{EnemyCatalog, EnemyInstance, LootItem};

/// Each loot table entry drops independently with probability
/// `LOOT_DROP_NUMERATOR / LOOT_DROP_DENOMINATOR` (0.3)
pub const LOOT_DROP_NUMERATOR: u32 = 3;
pub const LOOT_DROP_DENOMINATOR: u32 = 10;

/// Largest stack of a single dropped item
pub const MAX_LOOT_QUANTITY: u32 = 3;

/// Combat engine errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("unknown enemy: {0}")]
    UnknownEnemy(String),
}

/// Who won a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundWinner {
    Character,
    Enemy,
    Tie,
}

impl fmt::Display for RoundWinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundWinner::Character => "character",
            RoundWinner::Enemy => "enemy",
            RoundWinner::Tie => "tie",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one round. Never modified once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRoundResult {
    pub character_roll: u32,
    pub enemy_roll: u32,
    pub damage: u32,
    pub winner: RoundWinner,
    pub character_hp: u32,
    pub enemy_hp: u32,
    pub combat_ended: bool,
    pub victory: bool,
    pub defeat: bool,
}

impl fmt::Display for CombatRoundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.winner {
            RoundWinner::Tie => write!(
                f,
                "{} vs {}: tie, no damage",
                self.character_roll, self.enemy_roll
            ),
            RoundWinner::Character => write!(
                f,
                "{} vs {}: you hit for {} (enemy HP {})",
                self.character_roll, self.enemy_roll, self.damage, self.enemy_hp
            ),
            RoundWinner::Enemy => write!(
                f,
                "{} vs {}: enemy hits for {} (your HP {})",
                self.character_roll, self.enemy_roll, self.damage, self.character_hp
            ),
        }
    }
}

/// Dice contributed by one combat attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDice {
    pub attribute: AttributeName,
    pub level: u32,
    pub notation: String,
}

/// A character's consolidated combat pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDicePool {
    pub pool: DicePool,
    pub notation: String,
    pub total_dice_count: u32,
    pub breakdown: Vec<AttributeDice>,
}

/// Combat engine over an enemy catalog
#[derive(Debug, Clone, Default)]
pub struct CombatEngine {
    catalog: EnemyCatalog,
}

impl CombatEngine {
    /// Create an engine over a catalog
    pub fn new(catalog: EnemyCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &EnemyCatalog {
        &self.catalog
    }

    /// Union of the combat attributes' dice, merged by die size
    pub fn character_dice_pool(&self, character: &Character) -> CharacterDicePool {
        let mut combined = DicePool::default();
        let mut breakdown = Vec::new();

        for name in AttributeName::combat() {
            let attribute = character.attributes.get(name);
            let pool = attribute.dice_pool();
            breakdown.push(AttributeDice {
                attribute: name,
                level: attribute.level(),
                notation: pool.to_string(),
            });
            combined.extend(&pool);
        }

        let pool = combined.consolidate();
        CharacterDicePool {
            notation: pool.to_string(),
            total_dice_count: pool.dice_count(),
            pool,
            breakdown,
        }
    }

    /// Spawn a fresh enemy from the catalog
    pub fn create_enemy_instance(&self, key: &str) -> Result<EnemyInstance, CombatError> {
        let template = self
            .catalog
            .get(key)
            .ok_or_else(|| CombatError::UnknownEnemy(key.to_string()))?;
        Ok(EnemyInstance::spawn(template))
    }

    /// Roll both pools and apply the difference to the loser.
    ///
    /// Equal rolls are a tie with no damage. A character at 0 HP is a
    /// defeat even if the enemy is also at 0.
    pub fn resolve_round<D: DiceSource + ?Sized>(
        &self,
        character_pool: &DicePool,
        enemy_pool: &DicePool,
        character_hp: u32,
        enemy_hp: u32,
        dice: &mut D,
    ) -> CombatRoundResult {
        let character_roll = character_pool.roll(dice).total;
        let enemy_roll = enemy_pool.roll(dice).total;
        let damage = character_roll.abs_diff(enemy_roll);

        let (winner, character_hp, enemy_hp) = if character_roll > enemy_roll {
            (
                RoundWinner::Character,
                character_hp,
                enemy_hp.saturating_sub(damage),
            )
        } else if enemy_roll > character_roll {
            (
                RoundWinner::Enemy,
                character_hp.saturating_sub(damage),
                enemy_hp,
            )
        } else {
            (RoundWinner::Tie, character_hp, enemy_hp)
        };

        let defeat = character_hp == 0;
        let victory = !defeat && enemy_hp == 0;

        debug!(
            character_roll,
            enemy_roll,
            damage,
            %winner,
            character_hp,
            enemy_hp,
            "resolved round"
        );

        CombatRoundResult {
            character_roll,
            enemy_roll,
            damage,
            winner,
            character_hp,
            enemy_hp,
            combat_ended: victory || defeat,
            victory,
            defeat,
        }
    }

    /// Each loot entry drops independently at 30% with quantity 1-3
    pub fn generate_loot<D: DiceSource + ?Sized>(
        &self,
        enemy: &EnemyInstance,
        dice: &mut D,
    ) -> Vec<LootItem> {
        enemy
            .template
            .loot_table
            .iter()
            .filter_map(|entry| {
                if dice.roll_die(LOOT_DROP_DENOMINATOR) > LOOT_DROP_NUMERATOR {
                    return None;
                }
                Some(LootItem {
                    name: entry.name.clone(),
                    kind: entry.kind.clone(),
                    quantity: dice.roll_die(MAX_LOOT_QUANTITY),
                })
            })
            .collect()
    }
}

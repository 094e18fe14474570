//! Combat system module
//!
//! Implements the Habits & Adventure combat loop:
//! - Dice notation (e.g., "3d4+2d6+1")
//! - Attribute levels and the dice they grant
//! - Enemy catalog, loot, and round resolution
//! - Encounter state machine (selection, active, victory, defeat)

pub mod attributes;
pub mod character;
pub mod dice;
pub mod enemy;
pub mod engine;
pub mod state;

pub use attributes::{level_for, progression_for, Attribute, AttributeName, Attributes};
pub use character::{Character, CharacterSnapshot};
pub use dice::{
    analyze, analyze_or_default, combine, evaluate, DicePool, DiceSource, DiceTerm, ScriptedDice,
};
pub use enemy::{
    CatalogError, Difficulty, EnemyCatalog, EnemyInstance, EnemyTemplate, LootEntry, LootItem,
};
pub use engine::{CharacterDicePool, CombatEngine, CombatError, CombatRoundResult, RoundWinner};
pub use state::{CombatPhase, CombatSession, CombatSummary, WorkingCombatState};

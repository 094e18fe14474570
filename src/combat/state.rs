//! Combat session state
//!
//! Drives one encounter at a time:
//! - selection: no enemy, waiting for `start_combat`
//! - active: rounds resolve until one side reaches 0 HP
//! - victory / defeat: terminal until `reset`
//!
//! HP changes live in a working overlay. The canonical character is never
//! touched; callers persist the terminal [`CombatSummary`] instead.

use std::fmt;
use std::sync::Arc;

use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::character::Character;
use super::dice::{DicePool, DiceSource};
use super::engine::{CombatEngine, CombatError, CombatRoundResult};
use super::enemy::{EnemyInstance, LootItem};

/// Encounter phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatPhase {
    #[default]
    Selection,
    Active,
    Victory,
    Defeat,
}

impl CombatPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CombatPhase::Victory | CombatPhase::Defeat)
    }
}

impl fmt::Display for CombatPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CombatPhase::Selection => "selection",
            CombatPhase::Active => "active",
            CombatPhase::Victory => "victory",
            CombatPhase::Defeat => "defeat",
        };
        write!(f, "{}", s)
    }
}

/// Encounter-scoped HP overlay
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCombatState {
    pub enemy: EnemyInstance,
    pub character_hp: u32,
    /// Character HP when the encounter started
    pub starting_hp: u32,
}

/// Result handed to the persistence collaborator when an encounter ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatSummary {
    pub character_id: String,
    pub hp_change: i64,
    pub xp_gained: u32,
    pub loot: Vec<LootItem>,
    pub victory: bool,
}

/// One character's encounter state machine
pub struct CombatSession<D: DiceSource = ThreadRng> {
    engine: Arc<CombatEngine>,
    character: Character,
    character_pool: DicePool,
    dice: D,
    phase: CombatPhase,
    working: Option<WorkingCombatState>,
    combat_log: Vec<CombatRoundResult>,
    total_xp_gained: u32,
    total_loot: Vec<LootItem>,
}

impl CombatSession<ThreadRng> {
    /// Create a session rolling with the thread-local generator
    pub fn new(engine: Arc<CombatEngine>, character: Character) -> Self {
        Self::with_dice(engine, character, rand::rng())
    }
}

impl<D: DiceSource> CombatSession<D> {
    /// Create a session with an explicit dice source
    pub fn with_dice(engine: Arc<CombatEngine>, character: Character, dice: D) -> Self {
        let character_pool = engine.character_dice_pool(&character).pool;
        Self {
            engine,
            character,
            character_pool,
            dice,
            phase: CombatPhase::Selection,
            working: None,
            combat_log: Vec::new(),
            total_xp_gained: 0,
            total_loot: Vec::new(),
        }
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    /// Consolidated combat pool for the current character
    pub fn character_pool(&self) -> &DicePool {
        &self.character_pool
    }

    pub fn enemy(&self) -> Option<&EnemyInstance> {
        self.working.as_ref().map(|w| &w.enemy)
    }

    /// Working HP during an encounter, canonical HP otherwise
    pub fn character_hp(&self) -> u32 {
        self.working
            .as_ref()
            .map_or(self.character.current_hp(), |w| w.character_hp)
    }

    pub fn working_state(&self) -> Option<&WorkingCombatState> {
        self.working.as_ref()
    }

    pub fn combat_log(&self) -> &[CombatRoundResult] {
        &self.combat_log
    }

    /// Rounds resolved so far in this encounter
    pub fn round(&self) -> usize {
        self.combat_log.len()
    }

    pub fn total_xp_gained(&self) -> u32 {
        self.total_xp_gained
    }

    pub fn total_loot(&self) -> &[LootItem] {
        &self.total_loot
    }

    /// selection -> active.
    ///
    /// Returns `Ok(false)` without changing anything when not in selection
    /// or when the character has no HP left.
    pub fn start_combat(&mut self, enemy_key: &str) -> Result<bool, CombatError> {
        if self.phase != CombatPhase::Selection {
            debug!(phase = %self.phase, enemy_key, "ignoring start_combat");
            return Ok(false);
        }
        let hp = self.character.current_hp();
        if hp == 0 {
            debug!(character = %self.character.id, enemy_key, "ignoring start_combat at 0 HP");
            return Ok(false);
        }

        let enemy = self.engine.create_enemy_instance(enemy_key)?;
        info!(
            character = %self.character.id,
            enemy = enemy.name(),
            enemy_id = %enemy.id,
            character_hp = hp,
            pool = %self.character_pool,
            "combat started"
        );

        self.combat_log.clear();
        self.working = Some(WorkingCombatState {
            enemy,
            character_hp: hp,
            starting_hp: hp,
        });
        self.phase = CombatPhase::Active;
        Ok(true)
    }

    /// Resolve one round while active.
    ///
    /// Returns `None` (and changes nothing) outside the active phase.
    pub fn execute_round(&mut self) -> Option<&CombatRoundResult> {
        if self.phase != CombatPhase::Active {
            debug!(phase = %self.phase, "ignoring execute_round");
            return None;
        }
        let working = self.working.as_mut()?;

        let result = self.engine.resolve_round(
            &self.character_pool,
            &working.enemy.pool,
            working.character_hp,
            working.enemy.current_hp,
            &mut self.dice,
        );
        working.character_hp = result.character_hp;
        working.enemy.current_hp = result.enemy_hp;

        if result.defeat {
            self.phase = CombatPhase::Defeat;
            info!(
                character = %self.character.id,
                enemy = working.enemy.name(),
                rounds = self.combat_log.len() + 1,
                "combat lost"
            );
        } else if result.victory {
            self.phase = CombatPhase::Victory;
            self.total_xp_gained = self.total_xp_gained.saturating_add(working.enemy.xp_reward());
            let loot = self.engine.generate_loot(&working.enemy, &mut self.dice);
            info!(
                character = %self.character.id,
                enemy = working.enemy.name(),
                rounds = self.combat_log.len() + 1,
                xp = working.enemy.xp_reward(),
                loot = loot.len(),
                "combat won"
            );
            self.total_loot.extend(loot);
        }

        self.combat_log.push(result);
        self.combat_log.last()
    }

    /// Any phase -> selection, clearing the enemy, log and rewards
    pub fn reset(&mut self) {
        debug!(phase = %self.phase, "combat reset");
        self.phase = CombatPhase::Selection;
        self.working = None;
        self.combat_log.clear();
        self.total_xp_gained = 0;
        self.total_loot.clear();
    }

    /// Completion record, available only in a terminal phase
    pub fn summary(&self) -> Option<CombatSummary> {
        if !self.phase.is_terminal() {
            return None;
        }
        let working = self.working.as_ref()?;
        Some(CombatSummary {
            character_id: self.character.id.clone(),
            hp_change: i64::from(working.character_hp) - i64::from(working.starting_hp),
            xp_gained: self.total_xp_gained,
            loot: self.total_loot.clone(),
            victory: self.phase == CombatPhase::Victory,
        })
    }

    /// Log lines numbered by round
    pub fn log_lines(&self) -> Vec<String> {
        self.combat_log
            .iter()
            .enumerate()
            .map(|(i, round)| format!("Round {}: {}", i + 1, round))
            .collect()
    }
}

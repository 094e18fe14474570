//! Attributes and attribute dice
//!
//! Each of the six attributes has a base score and habit points earned from
//! completed habits. Level and dice are always derived from those two inputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dice::{DicePool, DiceTerm};

/// Habit points needed for +1 effective score
pub const HABIT_POINTS_PER_SCORE: u32 = 5;

/// Base score for an attribute with no data
pub const DEFAULT_BASE_SCORE: i32 = 10;

/// Highest attribute level
pub const MAX_ATTRIBUTE_LEVEL: u32 = 20;

/// Effective score at which levels 2..=20 begin
const LEVEL_BREAKPOINTS: [i32; 19] = [
    12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 32, 34, 36, 38, 40, 42, 44, 46, 48,
];

/// The six attribute slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeName {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl AttributeName {
    /// All attributes in sheet order
    pub const ALL: [AttributeName; 6] = [
        AttributeName::Strength,
        AttributeName::Dexterity,
        AttributeName::Constitution,
        AttributeName::Intelligence,
        AttributeName::Wisdom,
        AttributeName::Charisma,
    ];

    /// The vitality attribute governs HP and is left out of combat dice
    pub const VITALITY: AttributeName = AttributeName::Constitution;

    /// Whether this attribute contributes to the combat dice pool
    pub fn is_combat(&self) -> bool {
        *self != Self::VITALITY
    }

    /// Attributes that feed the combat dice pool
    pub fn combat() -> impl Iterator<Item = AttributeName> {
        Self::ALL.into_iter().filter(AttributeName::is_combat)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeName::Strength => "strength",
            AttributeName::Dexterity => "dexterity",
            AttributeName::Constitution => "constitution",
            AttributeName::Intelligence => "intelligence",
            AttributeName::Wisdom => "wisdom",
            AttributeName::Charisma => "charisma",
        }
    }
}

impl FromStr for AttributeName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strength" | "str" => Ok(AttributeName::Strength),
            "dexterity" | "dex" => Ok(AttributeName::Dexterity),
            "constitution" | "con" => Ok(AttributeName::Constitution),
            "intelligence" | "int" => Ok(AttributeName::Intelligence),
            "wisdom" | "wis" => Ok(AttributeName::Wisdom),
            "charisma" | "cha" => Ok(AttributeName::Charisma),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attribute level for an effective score, from the fixed breakpoint table
pub fn level_for(effective_score: i32) -> u32 {
    1 + LEVEL_BREAKPOINTS
        .iter()
        .take_while(|&&breakpoint| effective_score >= breakpoint)
        .count() as u32
}

/// Dice granted at an attribute level.
///
/// One d12 per four levels, plus d4/d6/d8 for a remainder of 1/2/3.
/// Levels outside 1..=20 are clamped.
pub fn progression_for(level: u32) -> Vec<DiceTerm> {
    let level = level.clamp(1, MAX_ATTRIBUTE_LEVEL);
    let mut dice = Vec::with_capacity(2);

    let full_d12 = level / 4;
    if full_d12 > 0 {
        dice.push(DiceTerm::new(full_d12, 12));
    }
    match level % 4 {
        1 => dice.push(DiceTerm::new(1, 4)),
        2 => dice.push(DiceTerm::new(1, 6)),
        3 => dice.push(DiceTerm::new(1, 8)),
        _ => {}
    }

    dice
}

/// One attribute's raw inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default = "default_base")]
    pub base: i32,
    #[serde(default)]
    pub habit_points: u32,
}

fn default_base() -> i32 {
    DEFAULT_BASE_SCORE
}

impl Default for Attribute {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_SCORE,
            habit_points: 0,
        }
    }
}

impl Attribute {
    pub fn new(base: i32, habit_points: u32) -> Self {
        Self { base, habit_points }
    }

    /// Base plus one point per five habit points
    pub fn effective_score(&self) -> i32 {
        let bonus = (self.habit_points / HABIT_POINTS_PER_SCORE).min(i32::MAX as u32) as i32;
        self.base.saturating_add(bonus)
    }

    pub fn level(&self) -> u32 {
        level_for(self.effective_score())
    }

    pub fn dice_progression(&self) -> Vec<DiceTerm> {
        progression_for(self.level())
    }

    pub fn dice_pool(&self) -> DicePool {
        DicePool::from_terms(self.dice_progression())
    }

    /// e.g. "1d12+1d4"
    pub fn dice_notation(&self) -> String {
        self.dice_pool().to_string()
    }
}

/// All six attributes; missing entries deserialize to the default attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default)]
    pub strength: Attribute,
    #[serde(default)]
    pub dexterity: Attribute,
    #[serde(default)]
    pub constitution: Attribute,
    #[serde(default)]
    pub intelligence: Attribute,
    #[serde(default)]
    pub wisdom: Attribute,
    #[serde(default)]
    pub charisma: Attribute,
}

impl Attributes {
    pub fn get(&self, name: AttributeName) -> &Attribute {
        match name {
            AttributeName::Strength => &self.strength,
            AttributeName::Dexterity => &self.dexterity,
            AttributeName::Constitution => &self.constitution,
            AttributeName::Intelligence => &self.intelligence,
            AttributeName::Wisdom => &self.wisdom,
            AttributeName::Charisma => &self.charisma,
        }
    }

    pub fn get_mut(&mut self, name: AttributeName) -> &mut Attribute {
        match name {
            AttributeName::Strength => &mut self.strength,
            AttributeName::Dexterity => &mut self.dexterity,
            AttributeName::Constitution => &mut self.constitution,
            AttributeName::Intelligence => &mut self.intelligence,
            AttributeName::Wisdom => &mut self.wisdom,
            AttributeName::Charisma => &mut self.charisma,
        }
    }

    /// Iterate in sheet order
    pub fn iter(&self) -> impl Iterator<Item = (AttributeName, &Attribute)> {
        AttributeName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }
}

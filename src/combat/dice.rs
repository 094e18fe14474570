//! Dice notation
//!
//! Parses and evaluates dice pools like "3d4+2d6+1". Notation is usually
//! derived data (attribute levels, enemy records), so malformed terms are
//! skipped with a warning instead of failing the whole pool.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upper bound on dice in a single term; larger terms are treated as malformed
pub const MAX_DICE_PER_TERM: u32 = 1000;

/// Upper bound on faces per die
pub const MAX_DIE_SIDES: u32 = 1000;

static DICE_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)d(\d+)$").expect("dice term regex is valid"));

static FLAT_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("flat term regex is valid"));

/// Source of die faces.
///
/// Every `rand::Rng` is a dice source; tests use [`ScriptedDice`] or a
/// seeded `StdRng` to make rounds reproducible.
pub trait DiceSource {
    /// Roll one die, returning a face in `[1, sides]`
    fn roll_die(&mut self, sides: u32) -> u32;
}

impl<R: Rng> DiceSource for R {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.random_range(1..=sides.max(1))
    }
}

/// Replays a fixed sequence of faces, cycling when exhausted.
///
/// Faces are clamped into `[1, sides]` for the die being rolled.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
    played: Vec<u32>,
}

impl ScriptedDice {
    /// Create a source that yields `faces` in order
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            played: Vec::new(),
        }
    }

    /// Number of faces left before the sequence starts over
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if self.faces.is_empty() {
            if self.played.is_empty() {
                return 1;
            }
            self.faces.extend(self.played.drain(..));
        }
        let face = self.faces.pop_front().unwrap_or(1);
        self.played.push(face);
        face.clamp(1, sides.max(1))
    }
}

/// A `<count>d<sides>` term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceTerm {
    /// Number of dice
    pub count: u32,
    /// Faces per die
    pub sides: u32,
}

impl DiceTerm {
    pub fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    /// Lowest possible sum
    pub fn min(&self) -> u32 {
        self.count
    }

    /// Highest possible sum
    pub fn max(&self) -> u32 {
        self.count.saturating_mul(self.sides)
    }

    /// Expected sum
    pub fn average(&self) -> f64 {
        self.count as f64 * (self.sides as f64 + 1.0) / 2.0
    }
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

/// A parsed dice pool: dice terms in notation order plus a flat bonus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicePool {
    pub dice: Vec<DiceTerm>,
    pub bonus: u32,
}

impl DicePool {
    /// Build a pool from dice terms with no bonus
    pub fn from_terms(terms: impl IntoIterator<Item = DiceTerm>) -> Self {
        Self {
            dice: terms.into_iter().collect(),
            bonus: 0,
        }
    }

    /// Parse notation, skipping terms that don't match `N` or `NdM`.
    ///
    /// Never fails: empty notation yields an empty pool.
    pub fn parse(notation: &str) -> Self {
        let mut pool = DicePool::default();
        let trimmed = notation.trim();
        if trimmed.is_empty() {
            return pool;
        }

        for raw in trimmed.split('+') {
            let term = raw.trim().to_lowercase();

            if FLAT_TERM.is_match(&term) {
                match term.parse::<u32>() {
                    Ok(value) => pool.bonus = pool.bonus.saturating_add(value),
                    Err(_) => warn!(notation, term = %term, "flat bonus out of range; ignoring"),
                }
                continue;
            }

            let Some(caps) = DICE_TERM.captures(&term) else {
                warn!(notation, term = %term, "malformed dice term; treating as zero");
                continue;
            };

            let count = caps[1].parse::<u32>().ok();
            let sides = caps[2].parse::<u32>().ok();
            match (count, sides) {
                (Some(0), Some(_)) => debug!(notation, term = %term, "zero-count dice term"),
                (Some(count), Some(sides))
                    if count <= MAX_DICE_PER_TERM && (1..=MAX_DIE_SIDES).contains(&sides) =>
                {
                    pool.dice.push(DiceTerm::new(count, sides));
                }
                _ => warn!(notation, term = %term, "unusable dice term; treating as zero"),
            }
        }

        pool
    }

    /// True if the pool has no dice and no bonus
    pub fn is_empty(&self) -> bool {
        self.dice.is_empty() && self.bonus == 0
    }

    /// Total number of dice across all terms
    pub fn dice_count(&self) -> u32 {
        self.dice
            .iter()
            .fold(0, |acc: u32, t| acc.saturating_add(t.count))
    }

    /// Append another pool's terms and bonus
    pub fn extend(&mut self, other: &DicePool) {
        self.dice.extend_from_slice(&other.dice);
        self.bonus = self.bonus.saturating_add(other.bonus);
    }

    /// Merge dice with equal sides into one term, largest dice first
    pub fn consolidate(&self) -> DicePool {
        let mut by_sides: BTreeMap<u32, u32> = BTreeMap::new();
        for term in &self.dice {
            if term.count > 0 {
                let count = by_sides.entry(term.sides).or_default();
                *count = count.saturating_add(term.count);
            }
        }

        DicePool {
            dice: by_sides
                .into_iter()
                .rev()
                .map(|(sides, count)| DiceTerm::new(count, sides))
                .collect(),
            bonus: self.bonus,
        }
    }

    /// Roll every die and add the bonus
    pub fn roll<D: DiceSource + ?Sized>(&self, dice: &mut D) -> RollOutcome {
        let term_rolls: Vec<TermRoll> = self
            .dice
            .iter()
            .map(|term| {
                let rolls: Vec<u32> = (0..term.count)
                    .map(|_| dice.roll_die(term.sides))
                    .collect();
                TermRoll {
                    term: *term,
                    subtotal: saturating_sum(rolls.iter().copied()),
                    rolls,
                }
            })
            .collect();

        let total =
            saturating_sum(term_rolls.iter().map(|t| t.subtotal)).saturating_add(self.bonus);
        debug!(pool = %self, total, "rolled dice pool");

        RollOutcome {
            total,
            term_rolls,
            bonus: self.bonus,
        }
    }

    /// Closed-form bounds and expectation
    pub fn analyze(&self) -> PoolStats {
        PoolStats {
            min: saturating_sum(self.dice.iter().map(DiceTerm::min)).saturating_add(self.bonus),
            max: saturating_sum(self.dice.iter().map(DiceTerm::max)).saturating_add(self.bonus),
            average: self.dice.iter().map(DiceTerm::average).sum::<f64>() + self.bonus as f64,
        }
    }
}

/// Totals clamp at `u32::MAX` instead of wrapping
fn saturating_sum(values: impl Iterator<Item = u32>) -> u32 {
    values.fold(0, u32::saturating_add)
}

impl fmt::Display for DicePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        let mut parts: Vec<String> = self.dice.iter().map(|t| t.to_string()).collect();
        if self.bonus > 0 {
            parts.push(self.bonus.to_string());
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// Rolls for a single dice term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRoll {
    pub term: DiceTerm,
    pub rolls: Vec<u32>,
    pub subtotal: u32,
}

/// Result of evaluating a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub total: u32,
    pub term_rolls: Vec<TermRoll>,
    pub bonus: u32,
}

impl RollOutcome {
    /// Format the individual dice for display, e.g. "[3, 2] + [5] + 1"
    pub fn dice_display(&self) -> String {
        let mut parts: Vec<String> = self
            .term_rolls
            .iter()
            .map(|t| {
                let faces: Vec<String> = t.rolls.iter().map(|r| r.to_string()).collect();
                format!("[{}]", faces.join(", "))
            })
            .collect();
        if self.bonus > 0 {
            parts.push(self.bonus.to_string());
        }
        parts.join(" + ")
    }
}

impl fmt::Display for RollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), self.total)
    }
}

/// Minimum, maximum and average of a pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub min: u32,
    pub max: u32,
    pub average: f64,
}

/// Parse and roll notation in one step
pub fn evaluate<D: DiceSource + ?Sized>(notation: &str, dice: &mut D) -> RollOutcome {
    DicePool::parse(notation).roll(dice)
}

/// Parse and analyze notation in one step
pub fn analyze(notation: &str) -> PoolStats {
    DicePool::parse(notation).analyze()
}

/// Like [`analyze`], but a pool with no usable dice is analyzed as "1d4"
pub fn analyze_or_default(notation: &str) -> PoolStats {
    let pool = DicePool::parse(notation);
    if pool.dice.is_empty() {
        return DicePool::from_terms([DiceTerm::new(1, 4)]).analyze();
    }
    pool.analyze()
}

/// Combine several notations into one consolidated notation string
pub fn combine<'a>(notations: impl IntoIterator<Item = &'a str>) -> String {
    let mut pool = DicePool::default();
    for notation in notations {
        pool.extend(&DicePool::parse(notation));
    }
    pool.consolidate().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_mixed_terms() {
        let pool = DicePool::parse("3d4+2d6+1");
        assert_eq!(pool.dice, vec![DiceTerm::new(3, 4), DiceTerm::new(2, 6)]);
        assert_eq!(pool.bonus, 1);
    }

    #[test]
    fn test_parse_any_order() {
        let pool = DicePool::parse("2 + 1d8 + 3 + 1d4");
        assert_eq!(pool.dice, vec![DiceTerm::new(1, 8), DiceTerm::new(1, 4)]);
        assert_eq!(pool.bonus, 5);
    }

    #[test]
    fn test_parse_case_insensitive() {
        let pool = DicePool::parse("2D6");
        assert_eq!(pool.dice, vec![DiceTerm::new(2, 6)]);
    }

    #[test]
    fn test_parse_malformed_terms_contribute_zero() {
        let pool = DicePool::parse("2d6+abc+d8+1d0+3x+4");
        assert_eq!(pool.dice, vec![DiceTerm::new(2, 6)]);
        assert_eq!(pool.bonus, 4);

        let pool = DicePool::parse("2d6-1");
        assert!(pool.dice.is_empty());
        assert_eq!(pool.bonus, 0);
    }

    #[test]
    fn test_parse_oversized_term_skipped() {
        let pool = DicePool::parse("5000d6+1d4+1d5000");
        assert_eq!(pool.dice, vec![DiceTerm::new(1, 4)]);
    }

    #[test]
    fn test_parse_empty() {
        let pool = DicePool::parse("   ");
        assert!(pool.is_empty());
        assert_eq!(pool.to_string(), "0");

        let outcome = evaluate("", &mut ScriptedDice::new([6]));
        assert_eq!(outcome.total, 0);
        assert!(outcome.term_rolls.is_empty());
    }

    #[test]
    fn test_evaluate_with_scripted_dice() {
        let mut dice = ScriptedDice::new([3, 2, 1, 5, 6]);
        let outcome = evaluate("3d4+2d6+1", &mut dice);

        assert_eq!(outcome.term_rolls.len(), 2);
        assert_eq!(outcome.term_rolls[0].rolls, vec![3, 2, 1]);
        assert_eq!(outcome.term_rolls[1].rolls, vec![5, 6]);
        assert_eq!(outcome.total, 18);
        assert_eq!(outcome.to_string(), "[3, 2, 1] + [5, 6] + 1 = 18");
    }

    #[test]
    fn test_scripted_dice_clamps_and_cycles() {
        let mut dice = ScriptedDice::new([9, 0]);
        assert_eq!(dice.roll_die(4), 4);
        assert_eq!(dice.roll_die(4), 1);
        assert_eq!(dice.remaining(), 0);
        assert_eq!(dice.roll_die(6), 6);
        assert_eq!(dice.roll_die(6), 1);
    }

    #[test]
    fn test_roll_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let outcome = evaluate("2d6+3", &mut rng);
            assert!(outcome.total >= 5 && outcome.total <= 15);
        }
    }

    #[test]
    fn test_analyze() {
        let stats = analyze("2d6+1d4+3");
        assert_eq!(stats.min, 6);
        assert_eq!(stats.max, 19);
        assert_eq!(stats.average, 12.5);
    }

    #[test]
    fn test_analyze_or_default() {
        let stats = analyze_or_default("nonsense");
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 4);
        assert_eq!(stats.average, 2.5);

        assert_eq!(analyze_or_default("1d12").max, 12);
    }

    #[test]
    fn test_huge_bonus_clamps_instead_of_overflowing() {
        let outcome = evaluate("1d4+4294967295", &mut ScriptedDice::new([2]));
        assert_eq!(outcome.total, u32::MAX);

        let stats = analyze("1d4+4294967295");
        assert_eq!(stats.min, u32::MAX);
        assert_eq!(stats.max, u32::MAX);

        let stats = analyze("4294967295+4294967295");
        assert_eq!(stats.max, u32::MAX);
    }

    #[test]
    fn test_many_terms_total_clamps() {
        let notation = vec!["1000d1000"; 5000].join("+");
        let stats = analyze(&notation);
        assert_eq!(stats.min, 5_000_000);
        assert_eq!(stats.max, u32::MAX);
        assert_eq!(DicePool::parse(&notation).consolidate().dice_count(), 5_000_000);
    }

    #[test]
    fn test_consolidate_merges_and_orders() {
        let pool = DicePool::parse("1d4+1d12+1d4+2d12+1d8");
        assert_eq!(pool.consolidate().to_string(), "3d12+1d8+2d4");
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(["1d4", "1d4", "1d6"]), "1d6+2d4");
        assert_eq!(combine(["1d4", "1d4", "1d4", "1d4"]), "4d4");
        assert_eq!(combine(["1d6+2", "1d6+1"]), "2d6+3");
    }

    #[test]
    fn test_dice_count() {
        assert_eq!(DicePool::parse("2d12+1d4+5").dice_count(), 3);
    }
}

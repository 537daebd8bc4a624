//! The trainee record carried through a career.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::numbers::clamp_percent;

pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 100;
pub const ENERGY_MAX: i32 = 100;
pub const STARTING_STAT: i32 = 20;
pub const NAME_MAX_CHARS: usize = 24;
pub const FIRST_TURN: u32 = 1;

/// Qualitative condition that scales training gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Form {
    Poor,
    #[default]
    Average,
    Good,
    Peak,
}

impl Form {
    pub const ALL: [Self; 4] = [Self::Poor, Self::Average, Self::Good, Self::Peak];

    /// Training gain multiplier for this form level.
    #[must_use]
    pub const fn multiplier(self) -> f32 {
        match self {
            Self::Poor => 0.8,
            Self::Average => 1.0,
            Self::Good => 1.1,
            Self::Peak => 1.2,
        }
    }

    /// The form reached by a single improvement step, if any.
    #[must_use]
    pub const fn improved(self) -> Option<Self> {
        match self {
            Self::Poor => Some(Self::Average),
            Self::Average => Some(Self::Good),
            Self::Good => Some(Self::Peak),
            Self::Peak => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Average => "average",
            Self::Good => "good",
            Self::Peak => "peak",
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one of the three trainable stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Speed,
    Stamina,
    Power,
}

impl StatKind {
    pub const ALL: [Self; 3] = [Self::Speed, Self::Stamina, Self::Power];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Stamina => "stamina",
            Self::Power => "power",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "speed" => Ok(Self::Speed),
            "stamina" => Ok(Self::Stamina),
            "power" => Ok(Self::Power),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub speed: i32,
    pub stamina: i32,
    pub power: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            speed: STARTING_STAT,
            stamina: STARTING_STAT,
            power: STARTING_STAT,
        }
    }
}

impl Stats {
    #[must_use]
    pub const fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Speed => self.speed,
            StatKind::Stamina => self.stamina,
            StatKind::Power => self.power,
        }
    }

    /// Write a stat, clamped into `[STAT_MIN, STAT_MAX]`.
    pub const fn set(&mut self, kind: StatKind, value: i32) {
        let value = clamp_percent(value);
        match kind {
            StatKind::Speed => self.speed = value,
            StatKind::Stamina => self.stamina = value,
            StatKind::Power => self.power = value,
        }
    }

    #[must_use]
    pub const fn total(&self) -> i32 {
        self.speed + self.stamina + self.power
    }

    pub const fn clamp(&mut self) {
        self.speed = clamp_percent(self.speed);
        self.stamina = clamp_percent(self.stamina);
        self.power = clamp_percent(self.power);
    }
}

/// Career clock and race tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Career {
    pub turn: u32,
    #[serde(default)]
    pub races_run: u32,
    #[serde(default)]
    pub races_won: u32,
    #[serde(default)]
    pub best_placement: Option<u8>,
}

impl Default for Career {
    fn default() -> Self {
        Self {
            turn: FIRST_TURN,
            races_run: 0,
            races_won: 0,
            best_placement: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharacterError {
    #[error("character name must not be empty")]
    EmptyName,
    #[error("character name exceeds {max} characters (got {len})")]
    NameTooLong { len: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    name: String,
    created_at: DateTime<Utc>,
    pub stats: Stats,
    pub energy: i32,
    #[serde(default)]
    pub form: Form,
    #[serde(default)]
    pub career: Career,
}

impl Character {
    /// Create a fresh trainee with starting stats, full energy and average form.
    ///
    /// # Errors
    ///
    /// Returns `CharacterError` when the trimmed name is empty or too long.
    pub fn new(name: &str, created_at: DateTime<Utc>) -> Result<Self, CharacterError> {
        let name = validated_name(name)?;
        Ok(Self {
            name: name.to_string(),
            created_at,
            stats: Stats::default(),
            energy: ENERGY_MAX,
            form: Form::default(),
            career: Career::default(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.career.turn
    }

    /// Pull every bounded field back into range after deserializing a save.
    ///
    /// The clock is held within `[FIRST_TURN, final_turn + 1]` and wins never
    /// exceed races run.
    ///
    /// # Errors
    ///
    /// Returns `CharacterError` when the stored name breaks the rules `new` applies.
    pub fn restore(&mut self, final_turn: u32) -> Result<(), CharacterError> {
        self.name = validated_name(&self.name)?.to_string();
        self.stats.clamp();
        self.energy = clamp_percent(self.energy);
        self.career.turn = self
            .career
            .turn
            .clamp(FIRST_TURN, final_turn.saturating_add(1).max(FIRST_TURN));
        self.career.races_won = self.career.races_won.min(self.career.races_run);
        Ok(())
    }
}

fn validated_name(name: &str) -> Result<&str, CharacterError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CharacterError::EmptyName);
    }
    let len = name.chars().count();
    if len > NAME_MAX_CHARS {
        return Err(CharacterError::NameTooLong {
            len,
            max: NAME_MAX_CHARS,
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(0, 0).unwrap()
    }

    #[test]
    fn new_character_starts_with_baseline_record() {
        let character = Character::new("  Thunder ", epoch()).unwrap();
        assert_eq!(character.name(), "Thunder");
        assert_eq!(character.stats, Stats::default());
        assert_eq!(character.stats.speed, 20);
        assert_eq!(character.energy, 100);
        assert_eq!(character.form, Form::Average);
        assert_eq!(character.turn(), 1);
        assert_eq!(character.career.races_run, 0);
    }

    #[test]
    fn names_are_validated() {
        assert_eq!(Character::new("   ", epoch()), Err(CharacterError::EmptyName));
        let long = "x".repeat(NAME_MAX_CHARS + 1);
        assert!(matches!(
            Character::new(&long, epoch()),
            Err(CharacterError::NameTooLong { len: 25, max: 24 })
        ));
    }

    #[test]
    fn form_table_is_ordered_and_steps_once() {
        let multipliers: Vec<f32> = Form::ALL.iter().map(|f| f.multiplier()).collect();
        assert!(multipliers.windows(2).all(|w| w[0] < w[1]));
        assert!(Form::Poor.multiplier() < 1.0);
        assert!(Form::Peak.multiplier() > 1.0);
        assert_eq!(Form::Poor.improved(), Some(Form::Average));
        assert_eq!(Form::Peak.improved(), None);
    }

    #[test]
    fn stats_setter_and_clamp_hold_bounds() {
        let mut stats = Stats::default();
        stats.set(StatKind::Power, 140);
        assert_eq!(stats.power, 100);
        stats.set(StatKind::Speed, -3);
        assert_eq!(stats.speed, 0);
        stats.stamina = 250;
        stats.clamp();
        assert_eq!(stats.stamina, 100);
        assert_eq!(stats.total(), 200);
        assert_eq!("Stamina".parse::<StatKind>(), Ok(StatKind::Stamina));
    }

    #[test]
    fn restore_repairs_loaded_records() {
        let mut character = Character::new("Rook", epoch()).unwrap();
        character.energy = 400;
        character.career.turn = 0;
        character.restore(12).unwrap();
        assert_eq!(character.energy, 100);
        assert_eq!(character.turn(), 1);

        character.career.turn = u32::MAX;
        character.career.races_run = 2;
        character.career.races_won = 9;
        character.restore(12).unwrap();
        assert_eq!(character.turn(), 13);
        assert_eq!(character.career.races_won, 2);
    }

    #[test]
    fn restore_rejects_names_new_would_refuse() {
        let mut character = Character::new("Rook", epoch()).unwrap();
        character.name = "y".repeat(NAME_MAX_CHARS + 6);
        assert!(matches!(
            character.restore(12),
            Err(CharacterError::NameTooLong { len: 30, max: 24 })
        ));
        character.name = String::from("  ");
        assert_eq!(character.restore(12), Err(CharacterError::EmptyName));
    }
}

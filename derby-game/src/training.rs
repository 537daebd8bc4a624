//! Training gain calculation and application.
//!
//! The engine is a calculator over a static action table. `calculate_gains`
//! never touches the character; `apply_training` validates first and commits
//! every field at the end, so a rejected action leaves the record untouched.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::character::{Character, Form, STAT_MAX, StatKind};
use crate::numbers::{clamp_percent, i32_to_f64, round_f64_to_i32};

const MIN_STAT_GAIN: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingKind {
    Speed,
    Stamina,
    Power,
    Rest,
}

impl TrainingKind {
    pub const ALL: [Self; 4] = [Self::Speed, Self::Stamina, Self::Power, Self::Rest];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Stamina => "stamina",
            Self::Power => "power",
            Self::Rest => "rest",
        }
    }
}

impl fmt::Display for TrainingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingKind {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "speed" => Ok(Self::Speed),
            "stamina" => Ok(Self::Stamina),
            "power" => Ok(Self::Power),
            "rest" => Ok(Self::Rest),
            other => Err(TrainingError::InvalidActionKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainingError {
    #[error("unknown training action '{0}'")]
    InvalidActionKind(String),
    #[error("not enough energy for {kind} training (requires {required}, have {available})")]
    InsufficientEnergy {
        kind: TrainingKind,
        required: i32,
        available: i32,
    },
}

/// Static cost/gain entry for a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionProfile {
    pub energy_cost: i32,
    #[serde(default)]
    pub base_gain: i32,
    #[serde(default)]
    pub target: Option<StatKind>,
    #[serde(default)]
    pub recovery: i32,
}

impl ActionProfile {
    /// Net energy change before clamping.
    #[must_use]
    pub const fn energy_delta(&self) -> i32 {
        self.recovery - self.energy_cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "TrainingConfig::default_actions")]
    pub actions: HashMap<TrainingKind, ActionProfile>,
    #[serde(default = "TrainingConfig::default_jitter")]
    pub jitter: i32,
    #[serde(default = "TrainingConfig::default_form_improve_chance")]
    pub form_improve_chance: f32,
}

impl TrainingConfig {
    fn default_actions() -> HashMap<TrainingKind, ActionProfile> {
        let train = |cost, gain, stat| ActionProfile {
            energy_cost: cost,
            base_gain: gain,
            target: Some(stat),
            recovery: 0,
        };
        HashMap::from([
            (TrainingKind::Speed, train(15, 10, StatKind::Speed)),
            (TrainingKind::Stamina, train(10, 8, StatKind::Stamina)),
            (TrainingKind::Power, train(15, 10, StatKind::Power)),
            (
                TrainingKind::Rest,
                ActionProfile {
                    energy_cost: 0,
                    base_gain: 0,
                    target: None,
                    recovery: 30,
                },
            ),
        ])
    }

    const fn default_jitter() -> i32 {
        1
    }

    const fn default_form_improve_chance() -> f32 {
        0.3
    }

    /// Validate table bounds.
    ///
    /// # Errors
    ///
    /// Returns `TrainingConfigError` for the first out-of-range value found.
    pub fn validate(&self) -> Result<(), TrainingConfigError> {
        if !(0..=5).contains(&self.jitter) {
            return Err(TrainingConfigError::RangeViolation {
                field: String::from("jitter"),
                min: 0,
                max: 5,
                value: self.jitter,
            });
        }
        if !(0.0..=1.0).contains(&self.form_improve_chance) {
            return Err(TrainingConfigError::Chance(self.form_improve_chance));
        }
        for kind in TrainingKind::ALL {
            let Some(profile) = self.actions.get(&kind) else {
                continue;
            };
            let bounds = [
                ("energy_cost", profile.energy_cost, 0, 100),
                ("base_gain", profile.base_gain, 0, 50),
                ("recovery", profile.recovery, 0, 100),
            ];
            for (name, value, min, max) in bounds {
                if !(min..=max).contains(&value) {
                    return Err(TrainingConfigError::RangeViolation {
                        field: format!("{kind}.{name}"),
                        min,
                        max,
                        value,
                    });
                }
            }
            if profile.target.is_none() && profile.recovery == 0 {
                return Err(TrainingConfigError::InertAction(kind));
            }
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            actions: Self::default_actions(),
            jitter: Self::default_jitter(),
            form_improve_chance: Self::default_form_improve_chance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingConfigError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: String,
        min: i32,
        max: i32,
        value: i32,
    },
    #[error("form_improve_chance must be between 0 and 1 (got {0:.2})")]
    Chance(f32),
    #[error("action {0} neither trains a stat nor recovers energy")]
    InertAction(TrainingKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrainingOptions {
    /// Suppress jitter and the form roll so results are exact.
    pub deterministic: bool,
}

impl TrainingOptions {
    #[must_use]
    pub const fn deterministic() -> Self {
        Self {
            deterministic: true,
        }
    }
}

/// Deltas an action would produce, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrainingGains {
    pub kind: TrainingKind,
    pub stat: Option<StatKind>,
    pub stat_delta: i32,
    pub energy_delta: i32,
}

/// What `apply_training` actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppliedTraining {
    pub gains: TrainingGains,
    pub stat_delta: i32,
    pub energy_delta: i32,
    pub form_before: Form,
    pub form_after: Form,
}

impl AppliedTraining {
    #[must_use]
    pub fn form_improved(&self) -> bool {
        self.form_after > self.form_before
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainingEngine {
    cfg: TrainingConfig,
}

impl TrainingEngine {
    #[must_use]
    pub const fn new(cfg: TrainingConfig) -> Self {
        Self { cfg }
    }

    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.cfg
    }

    /// Cost and gain entry for `kind`, if the table defines one.
    #[must_use]
    pub fn profile(&self, kind: TrainingKind) -> Option<&ActionProfile> {
        self.cfg.actions.get(&kind)
    }

    pub fn profiles(&self) -> impl Iterator<Item = (TrainingKind, &ActionProfile)> + '_ {
        TrainingKind::ALL
            .into_iter()
            .filter_map(|kind| self.profile(kind).map(|profile| (kind, profile)))
    }

    fn require_profile(&self, kind: TrainingKind) -> Result<&ActionProfile, TrainingError> {
        self.profile(kind)
            .ok_or_else(|| TrainingError::InvalidActionKind(kind.to_string()))
    }

    /// Whether the character has the energy `kind` costs.
    #[must_use]
    pub fn can_train(&self, character: &Character, kind: TrainingKind) -> bool {
        self.profile(kind)
            .is_some_and(|profile| character.energy >= profile.energy_cost)
    }

    /// Compute the gains `kind` would yield for `character` without mutating it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidActionKind` when the action table has no entry for `kind`.
    pub fn calculate_gains<R: Rng + ?Sized>(
        &self,
        character: &Character,
        kind: TrainingKind,
        options: TrainingOptions,
        rng: &mut R,
    ) -> Result<TrainingGains, TrainingError> {
        let profile = self.require_profile(kind)?;
        let stat_delta = match profile.target {
            Some(_) => {
                let jitter = if options.deterministic || self.cfg.jitter <= 0 {
                    0
                } else {
                    rng.gen_range(-self.cfg.jitter..=self.cfg.jitter)
                };
                let scaled =
                    i32_to_f64(profile.base_gain) * f64::from(character.form.multiplier());
                round_f64_to_i32(scaled + i32_to_f64(jitter)).max(MIN_STAT_GAIN)
            }
            None => 0,
        };
        Ok(TrainingGains {
            kind,
            stat: profile.target,
            stat_delta,
            energy_delta: profile.energy_delta(),
        })
    }

    /// Validate, then apply `kind` to `character`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidActionKind` for actions missing from the table and
    /// `InsufficientEnergy` when the character cannot pay the cost. The
    /// character is unchanged in both cases.
    pub fn apply_training<R: Rng + ?Sized>(
        &self,
        character: &mut Character,
        kind: TrainingKind,
        options: TrainingOptions,
        rng: &mut R,
    ) -> Result<AppliedTraining, TrainingError> {
        let profile = self.require_profile(kind)?;
        if character.energy < profile.energy_cost {
            return Err(TrainingError::InsufficientEnergy {
                kind,
                required: profile.energy_cost,
                available: character.energy,
            });
        }
        let gains = self.calculate_gains(character, kind, options, rng)?;

        let stat_change = gains.stat.map(|stat| {
            let before = character.stats.get(stat);
            (stat, clamp_percent(before + gains.stat_delta) - before)
        });
        let energy_after = clamp_percent(character.energy + gains.energy_delta);
        let form_before = character.form;
        let form_after = if options.deterministic {
            form_before
        } else {
            let chance = f64::from(self.cfg.form_improve_chance).clamp(0.0, 1.0);
            if rng.gen_bool(chance) {
                form_before.improved().unwrap_or(form_before)
            } else {
                form_before
            }
        };

        let energy_delta = energy_after - character.energy;
        let mut stat_delta = 0;
        if let Some((stat, delta)) = stat_change {
            character.stats.set(stat, character.stats.get(stat) + delta);
            stat_delta = delta;
        }
        character.energy = energy_after;
        character.form = form_after;

        Ok(AppliedTraining {
            gains,
            stat_delta,
            energy_delta,
            form_before,
            form_after,
        })
    }

    /// Suggest the next action: rest when nothing useful is affordable,
    /// otherwise train the lowest stat that is not capped.
    #[must_use]
    pub fn recommend(&self, character: &Character) -> TrainingKind {
        self.profiles()
            .filter_map(|(kind, profile)| profile.target.map(|stat| (kind, stat)))
            .filter(|&(kind, stat)| {
                character.stats.get(stat) < STAT_MAX && self.can_train(character, kind)
            })
            .min_by_key(|&(_, stat)| character.stats.get(stat))
            .map_or(TrainingKind::Rest, |(kind, _)| kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn trainee() -> Character {
        Character::new("Thunder", DateTime::<Utc>::from_timestamp(0, 0).unwrap()).unwrap()
    }

    fn exact() -> TrainingOptions {
        TrainingOptions::deterministic()
    }

    #[test]
    fn gains_scale_with_form() {
        let engine = TrainingEngine::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut character = trainee();
        let average = engine
            .calculate_gains(&character, TrainingKind::Speed, exact(), &mut rng)
            .unwrap();
        assert_eq!(average.stat, Some(StatKind::Speed));
        assert_eq!(average.stat_delta, 10);
        assert_eq!(average.energy_delta, -15);

        character.form = Form::Peak;
        let peak = engine
            .calculate_gains(&character, TrainingKind::Speed, exact(), &mut rng)
            .unwrap();
        assert_eq!(peak.stat_delta, 12);

        character.form = Form::Poor;
        let poor = engine
            .calculate_gains(&character, TrainingKind::Stamina, exact(), &mut rng)
            .unwrap();
        // 8 * 0.8 = 6.4 rounds to 6
        assert_eq!(poor.stat_delta, 6);
    }

    #[test]
    fn calculate_gains_never_mutates() {
        let engine = TrainingEngine::default();
        let character = trainee();
        let before = character.clone();
        let mut rng = SmallRng::seed_from_u64(9);
        let _ = engine.calculate_gains(&character, TrainingKind::Power, TrainingOptions::default(), &mut rng);
        assert_eq!(character, before);
    }

    #[test]
    fn jitter_stays_within_one_point() {
        let engine = TrainingEngine::default();
        let character = trainee();
        let mut rng = SmallRng::seed_from_u64(77);
        for _ in 0..200 {
            let gains = engine
                .calculate_gains(&character, TrainingKind::Speed, TrainingOptions::default(), &mut rng)
                .unwrap();
            assert!((9..=11).contains(&gains.stat_delta), "{}", gains.stat_delta);
        }
    }

    #[test]
    fn gains_floor_at_one() {
        let mut cfg = TrainingConfig::default();
        cfg.actions.get_mut(&TrainingKind::Speed).unwrap().base_gain = 0;
        let engine = TrainingEngine::new(cfg);
        let mut rng = SmallRng::seed_from_u64(3);
        let gains = engine
            .calculate_gains(&trainee(), TrainingKind::Speed, exact(), &mut rng)
            .unwrap();
        assert_eq!(gains.stat_delta, 1);
    }

    #[test]
    fn rest_only_recovers_energy() {
        let engine = TrainingEngine::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut character = trainee();
        character.energy = 40;
        let applied = engine
            .apply_training(&mut character, TrainingKind::Rest, exact(), &mut rng)
            .unwrap();
        assert_eq!(applied.gains.stat, None);
        assert_eq!(applied.stat_delta, 0);
        assert_eq!(applied.energy_delta, 30);
        assert_eq!(character.energy, 70);
        assert_eq!(character.stats, crate::character::Stats::default());
    }

    #[test]
    fn energy_is_capped_on_rest() {
        let engine = TrainingEngine::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut character = trainee();
        let applied = engine
            .apply_training(&mut character, TrainingKind::Rest, exact(), &mut rng)
            .unwrap();
        assert_eq!(character.energy, 100);
        assert_eq!(applied.energy_delta, 0);
        assert_eq!(applied.gains.energy_delta, 30);
    }

    #[test]
    fn insufficient_energy_leaves_character_untouched() {
        let engine = TrainingEngine::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut character = trainee();
        character.energy = 10;
        let before = character.clone();
        let err = engine
            .apply_training(&mut character, TrainingKind::Speed, TrainingOptions::default(), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            TrainingError::InsufficientEnergy {
                kind: TrainingKind::Speed,
                required: 15,
                available: 10
            }
        );
        assert_eq!(character, before);
        assert!(!engine.can_train(&character, TrainingKind::Speed));
        assert!(engine.can_train(&character, TrainingKind::Stamina));
    }

    #[test]
    fn stats_clamp_at_cap() {
        let engine = TrainingEngine::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut character = trainee();
        character.stats.speed = 95;
        let applied = engine
            .apply_training(&mut character, TrainingKind::Speed, exact(), &mut rng)
            .unwrap();
        assert_eq!(character.stats.speed, 100);
        assert_eq!(applied.gains.stat_delta, 10);
        assert_eq!(applied.stat_delta, 5);
        assert_eq!(character.energy, 85);
    }

    #[test]
    fn missing_profile_is_invalid_action() {
        let mut cfg = TrainingConfig::default();
        cfg.actions.remove(&TrainingKind::Power);
        let engine = TrainingEngine::new(cfg);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut character = trainee();
        let err = engine
            .apply_training(&mut character, TrainingKind::Power, exact(), &mut rng)
            .unwrap_err();
        assert_eq!(err, TrainingError::InvalidActionKind(String::from("power")));
        assert!("swim".parse::<TrainingKind>().is_err());
        assert_eq!(" Rest ".parse::<TrainingKind>(), Ok(TrainingKind::Rest));
    }

    #[test]
    fn form_roll_uses_configured_chance() {
        let mut cfg = TrainingConfig::default();
        cfg.form_improve_chance = 1.0;
        let engine = TrainingEngine::new(cfg);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut character = trainee();
        let applied = engine
            .apply_training(&mut character, TrainingKind::Stamina, TrainingOptions::default(), &mut rng)
            .unwrap();
        assert!(applied.form_improved());
        assert_eq!(character.form, Form::Good);

        character.form = Form::Peak;
        let applied = engine
            .apply_training(&mut character, TrainingKind::Stamina, TrainingOptions::default(), &mut rng)
            .unwrap();
        assert_eq!(applied.form_after, Form::Peak);

        character.form = Form::Poor;
        let applied = engine
            .apply_training(&mut character, TrainingKind::Rest, exact(), &mut rng)
            .unwrap();
        assert!(!applied.form_improved());
    }

    #[test]
    fn recommend_prefers_lowest_affordable_stat() {
        let engine = TrainingEngine::default();
        let mut character = trainee();
        character.stats.speed = 40;
        character.stats.power = 30;
        assert_eq!(engine.recommend(&character), TrainingKind::Stamina);

        character.stats.stamina = 60;
        assert_eq!(engine.recommend(&character), TrainingKind::Power);

        character.energy = 12;
        assert_eq!(engine.recommend(&character), TrainingKind::Stamina);

        character.energy = 5;
        assert_eq!(engine.recommend(&character), TrainingKind::Rest);
    }

    #[test]
    fn config_validation_flags_bad_tables() {
        assert!(TrainingConfig::default().validate().is_ok());

        let mut cfg = TrainingConfig::default();
        cfg.actions.get_mut(&TrainingKind::Speed).unwrap().energy_cost = 120;
        assert!(matches!(
            cfg.validate(),
            Err(TrainingConfigError::RangeViolation { ref field, .. }) if field == "speed.energy_cost"
        ));

        let mut cfg = TrainingConfig::default();
        cfg.form_improve_chance = 1.5;
        assert_eq!(cfg.validate(), Err(TrainingConfigError::Chance(1.5)));

        let mut cfg = TrainingConfig::default();
        cfg.actions.get_mut(&TrainingKind::Rest).unwrap().recovery = 0;
        assert_eq!(
            cfg.validate(),
            Err(TrainingConfigError::InertAction(TrainingKind::Rest))
        );
    }
}

//! Stat-banded race resolution used by scripted runs and console play.
use derby_game::numbers::i32_to_f64;
use derby_game::{Character, RaceKind, RaceOutcome, RaceSimulator, ScheduledRace, Surface};
use log::debug;
use rand::{Rng, RngCore};

/// Stat weights `(speed, stamina, power)` per race kind.
const fn weights(kind: RaceKind) -> (f64, f64, f64) {
    match kind {
        RaceKind::Sprint => (0.6, 0.1, 0.3),
        RaceKind::Mile => (0.4, 0.35, 0.25),
        RaceKind::Dirt => (0.25, 0.3, 0.45),
        RaceKind::Final => (0.35, 0.45, 0.2),
    }
}

fn noise(rng: &mut dyn RngCore, spread: f64) -> f64 {
    if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    }
}

/// Scores the trainee against a field of rivals whose strength rises with
/// each race kind. Placement is one plus the number of rivals that beat it.
#[derive(Debug, Clone, Copy)]
pub struct StatRaceSimulator {
    pub rival_base: f64,
    pub rival_step: f64,
    pub spread: f64,
}

impl Default for StatRaceSimulator {
    fn default() -> Self {
        Self {
            rival_base: 30.0,
            rival_step: 8.0,
            spread: 12.0,
        }
    }
}

impl StatRaceSimulator {
    #[must_use]
    pub fn rating(character: &Character, race: &ScheduledRace) -> f64 {
        let (speed, stamina, power) = weights(race.meta.kind);
        let stats = &character.stats;
        let mut rating = i32_to_f64(stats.speed) * speed
            + i32_to_f64(stats.stamina) * stamina
            + i32_to_f64(stats.power) * power;
        if race.meta.surface == Surface::Dirt {
            rating += i32_to_f64(stats.power) * 0.05;
        }
        rating * f64::from(character.form.multiplier())
    }

    fn rival_mean(&self, kind: RaceKind) -> f64 {
        let tier = match kind {
            RaceKind::Sprint => 0.0,
            RaceKind::Mile => 1.0,
            RaceKind::Dirt => 2.0,
            RaceKind::Final => 3.0,
        };
        self.rival_base + self.rival_step * tier
    }
}

impl RaceSimulator for StatRaceSimulator {
    fn run_race(
        &mut self,
        race: &ScheduledRace,
        character: &Character,
        rng: &mut dyn RngCore,
    ) -> RaceOutcome {
        let field_size = race.meta.field_size.max(1);
        let spread = self.spread.max(0.0);
        let ours = Self::rating(character, race) + noise(rng, spread);
        let mean = self.rival_mean(race.meta.kind);
        let beaten_by = (1..field_size)
            .filter(|_| mean + noise(rng, spread) > ours)
            .count();
        let placement = u8::try_from(beaten_by + 1).unwrap_or(field_size);
        debug!(
            "{}: rating {ours:.1} vs rival mean {mean:.1}, placed {placement}/{field_size}",
            race.name
        );
        RaceOutcome {
            placement,
            field_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use derby_game::Timeline;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn race(index: usize) -> ScheduledRace {
        Timeline::standard().entries()[index].clone()
    }

    #[test]
    fn strong_trainee_wins_without_noise() {
        let mut sim = StatRaceSimulator {
            spread: 0.0,
            ..StatRaceSimulator::default()
        };
        let mut character = Character::new("Ace", Utc::now()).unwrap();
        character.stats.speed = 100;
        character.stats.stamina = 100;
        character.stats.power = 100;
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for index in 0..4 {
            let outcome = sim.run_race(&race(index), &character, &mut rng);
            assert_eq!(outcome.placement, 1);
            assert_eq!(outcome.field_size, 8);
        }
    }

    #[test]
    fn weak_trainee_finishes_last_without_noise() {
        let mut sim = StatRaceSimulator {
            spread: 0.0,
            ..StatRaceSimulator::default()
        };
        let mut character = Character::new("Slow", Utc::now()).unwrap();
        character.stats.speed = 0;
        character.stats.stamina = 0;
        character.stats.power = 0;
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let outcome = sim.run_race(&race(3), &character, &mut rng);
        assert_eq!(outcome.placement, 8);
    }

    #[test]
    fn placement_stays_within_field() {
        let mut sim = StatRaceSimulator::default();
        let character = Character::new("Mid", Utc::now()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(77);
        for _ in 0..200 {
            let outcome = sim.run_race(&race(1), &character, &mut rng);
            assert!((1..=outcome.field_size).contains(&outcome.placement));
        }
    }
}

//! One-turn orchestration: validate, train, advance the clock, detect races.
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::timeline::{ScheduledRace, Timeline, UpcomingRace};
use crate::training::{
    AppliedTraining, TrainingEngine, TrainingError, TrainingKind, TrainingOptions,
};

/// A race that starts on the turn just entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceCall {
    pub race: ScheduledRace,
    /// 1-based position of the race within the schedule.
    pub sequence: usize,
    pub is_first: bool,
    pub is_last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnResult {
    pub success: bool,
    pub kind: TrainingKind,
    pub applied: AppliedTraining,
    pub previous_turn: u32,
    pub turn: u32,
    pub race: Option<RaceCall>,
}

impl TurnResult {
    #[must_use]
    pub const fn race_ready(&self) -> bool {
        self.race.is_some()
    }
}

/// Finishing position handed back by the race simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    pub placement: u8,
    pub field_size: u8,
}

impl RaceOutcome {
    #[must_use]
    pub const fn won(&self) -> bool {
        self.placement == 1
    }
}

/// Why a batch simulation stopped before exhausting its action list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStop {
    Failed { index: usize, error: TrainingError },
    CareerFinished { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub results: Vec<TurnResult>,
    pub stopped: Option<BatchStop>,
}

impl BatchOutcome {
    pub fn races(&self) -> impl Iterator<Item = &RaceCall> + '_ {
        self.results.iter().filter_map(|result| result.race.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TurnController {
    engine: TrainingEngine,
    timeline: Timeline,
}

impl TurnController {
    #[must_use]
    pub const fn new(engine: TrainingEngine, timeline: Timeline) -> Self {
        Self { engine, timeline }
    }

    #[must_use]
    pub const fn engine(&self) -> &TrainingEngine {
        &self.engine
    }

    #[must_use]
    pub const fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Run exactly one turn for `character`.
    ///
    /// # Errors
    ///
    /// Propagates `TrainingError` from the engine. On error neither the turn
    /// counter nor any other field of `character` has changed.
    pub fn process_turn<R: Rng + ?Sized>(
        &self,
        character: &mut Character,
        kind: TrainingKind,
        options: TrainingOptions,
        rng: &mut R,
    ) -> Result<TurnResult, TrainingError> {
        let applied = self
            .engine
            .apply_training(character, kind, options, rng)
            .inspect_err(|err| debug!("turn {} rejected: {err}", character.turn()))?;

        let previous_turn = character.career.turn;
        character.career.turn = previous_turn.saturating_add(1);
        let turn = character.career.turn;
        let race = self.race_call(turn);
        match &race {
            Some(call) => info!(
                "turn {previous_turn} -> {turn}: {kind} training, race '{}' ({} of {})",
                call.race.name,
                call.sequence,
                self.timeline.len()
            ),
            None => debug!("turn {previous_turn} -> {turn}: {kind} training"),
        }

        Ok(TurnResult {
            success: true,
            kind,
            applied,
            previous_turn,
            turn,
            race,
        })
    }

    /// Like [`process_turn`](Self::process_turn) but for an action named by
    /// untrusted input.
    ///
    /// # Errors
    ///
    /// Returns `InvalidActionKind` for unknown names, otherwise as `process_turn`.
    pub fn process_named_turn<R: Rng + ?Sized>(
        &self,
        character: &mut Character,
        action: &str,
        options: TrainingOptions,
        rng: &mut R,
    ) -> Result<TurnResult, TrainingError> {
        let kind = action.parse::<TrainingKind>()?;
        self.process_turn(character, kind, options, rng)
    }

    fn race_call(&self, turn: u32) -> Option<RaceCall> {
        let race = self.timeline.event_at(turn)?;
        let index = self.timeline.position_of(turn)?;
        Some(RaceCall {
            race: race.clone(),
            sequence: index + 1,
            is_first: index == 0,
            is_last: index + 1 == self.timeline.len(),
        })
    }

    /// Apply `actions` in order, stopping on the first failure or once the
    /// career clock has passed the final scheduled turn.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        character: &mut Character,
        actions: &[TrainingKind],
        options: TrainingOptions,
        rng: &mut R,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let final_turn = self.timeline.final_turn();
        for (index, &kind) in actions.iter().enumerate() {
            if character.turn() > final_turn {
                outcome.stopped = Some(BatchStop::CareerFinished { index });
                break;
            }
            match self.process_turn(character, kind, options, rng) {
                Ok(result) => outcome.results.push(result),
                Err(error) => {
                    outcome.stopped = Some(BatchStop::Failed { index, error });
                    break;
                }
            }
        }
        outcome
    }

    /// Record a finished race against the character's career tallies.
    pub fn record_race(&self, character: &mut Character, outcome: &RaceOutcome) {
        let career = &mut character.career;
        career.races_run = career.races_run.saturating_add(1);
        if outcome.won() {
            career.races_won = career.races_won.saturating_add(1);
        }
        career.best_placement = Some(
            career
                .best_placement
                .map_or(outcome.placement, |best| best.min(outcome.placement)),
        );
        info!(
            "{} finished {} of {} (career {}/{} wins)",
            character.name(),
            outcome.placement,
            outcome.field_size,
            character.career.races_won,
            character.career.races_run
        );
    }

    #[must_use]
    pub fn upcoming<'a>(&'a self, character: &Character) -> Option<UpcomingRace<'a>> {
        self.timeline.next_event(character.turn())
    }

    /// True once every scheduled race has been run or the clock passed the last one.
    #[must_use]
    pub fn is_career_complete(&self, character: &Character) -> bool {
        let scheduled = u32::try_from(self.timeline.len()).unwrap_or(u32::MAX);
        character.career.races_run >= scheduled || character.turn() > self.timeline.final_turn()
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

    #[test]
    fn valid_turn_advances_by_exactly_one() {
        let controller = TurnController::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut character = trainee();
        let result = controller
            .process_turn(&mut character, TrainingKind::Stamina, TrainingOptions::default(), &mut rng)
            .unwrap();
        assert!(result.success);
        assert_eq!(result.previous_turn, 1);
        assert_eq!(result.turn, 2);
        assert_eq!(character.turn(), 2);
        assert!(!result.race_ready());
    }

    #[test]
    fn failed_turn_is_atomic() {
        let controller = TurnController::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut character = trainee();
        character.energy = 10;
        let before = character.clone();

        let err = controller
            .process_turn(&mut character, TrainingKind::Power, TrainingOptions::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, TrainingError::InsufficientEnergy { .. }));
        assert_eq!(character, before);

        let err = controller
            .process_named_turn(&mut character, "swim", TrainingOptions::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err, TrainingError::InvalidActionKind(String::from("swim")));
        assert_eq!(character, before);
    }

    #[test]
    fn race_is_detected_on_the_turn_entered() {
        let controller = TurnController::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut character = trainee();
        character.career.turn = 3;
        let result = controller
            .process_turn(&mut character, TrainingKind::Rest, TrainingOptions::default(), &mut rng)
            .unwrap();
        let call = result.race.expect("race on turn 4");
        assert_eq!(call.race.name, "Maiden Sprint");
        assert_eq!(call.sequence, 1);
        assert!(call.is_first);
        assert!(!call.is_last);

        // Turn 4 itself is already entered; training from it lands on 5.
        let result = controller
            .process_turn(&mut character, TrainingKind::Rest, TrainingOptions::default(), &mut rng)
            .unwrap();
        assert!(result.race.is_none());
    }

    #[test]
    fn final_race_is_flagged_last() {
        let controller = TurnController::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut character = trainee();
        character.career.turn = 11;
        let result = controller
            .process_turn(&mut character, TrainingKind::Rest, TrainingOptions::default(), &mut rng)
            .unwrap();
        let call = result.race.unwrap();
        assert_eq!(call.sequence, 4);
        assert!(call.is_last);
        assert!(!call.is_first);
    }

    #[test]
    fn simulate_stops_on_failure() {
        let controller = TurnController::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut character = trainee();
        let plan = [TrainingKind::Speed; 10];
        let outcome = controller.simulate(&mut character, &plan, TrainingOptions::deterministic(), &mut rng);
        // 100 energy pays for six 15-cost sessions.
        assert_eq!(outcome.results.len(), 6);
        assert!(matches!(
            outcome.stopped,
            Some(BatchStop::Failed { index: 6, error: TrainingError::InsufficientEnergy { .. } })
        ));
        assert_eq!(character.turn(), 7);
        assert_eq!(character.energy, 10);
    }

    #[test]
    fn simulate_stops_after_final_turn() {
        let controller = TurnController::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut character = trainee();
        let plan = [TrainingKind::Rest; 20];
        let outcome = controller.simulate(&mut character, &plan, TrainingOptions::default(), &mut rng);
        assert_eq!(outcome.results.len(), 12);
        assert_eq!(outcome.stopped, Some(BatchStop::CareerFinished { index: 12 }));
        let turns: Vec<u32> = outcome.races().map(|call| call.race.turn).collect();
        assert_eq!(turns, vec![4, 7, 10, 12]);
    }

    #[test]
    fn record_race_tracks_career() {
        let controller = TurnController::default();
        let mut character = trainee();
        controller.record_race(&mut character, &RaceOutcome { placement: 3, field_size: 8 });
        controller.record_race(&mut character, &RaceOutcome { placement: 1, field_size: 8 });
        controller.record_race(&mut character, &RaceOutcome { placement: 5, field_size: 8 });
        assert_eq!(character.career.races_run, 3);
        assert_eq!(character.career.races_won, 1);
        assert_eq!(character.career.best_placement, Some(1));
        assert!(!controller.is_career_complete(&character));
        controller.record_race(&mut character, &RaceOutcome { placement: 2, field_size: 8 });
        assert!(controller.is_career_complete(&character));
    }

    #[test]
    fn counters_saturate_instead_of_wrapping() {
        let controller = TurnController::default();
        let mut character = trainee();
        character.career.turn = u32::MAX;
        character.career.races_run = u32::MAX;
        character.career.races_won = u32::MAX;
        let mut rng = SmallRng::seed_from_u64(3);
        let result = controller
            .process_turn(&mut character, TrainingKind::Rest, TrainingOptions::default(), &mut rng)
            .unwrap();
        assert_eq!(result.turn, u32::MAX);
        assert!(result.race.is_none());
        controller.record_race(&mut character, &RaceOutcome { placement: 1, field_size: 8 });
        assert_eq!(character.career.races_run, u32::MAX);
        assert_eq!(character.career.races_won, u32::MAX);
    }

    #[test]
    fn upcoming_tracks_character_clock() {
        let controller = TurnController::default();
        let mut character = trainee();
        character.career.turn = 6;
        let upcoming = controller.upcoming(&character).unwrap();
        assert_eq!(upcoming.race.name, "Mile Championship");
        assert!(upcoming.is_immediately_next);
    }
}

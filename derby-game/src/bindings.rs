//! Action bindings between the navigator and the career simulation.
//!
//! Input maps name actions by string so they can live in config data. Those
//! names parse into the closed [`ActionId`] set and are executed by a single
//! exhaustive match. Every handler reports through [`ActionResult`]; the
//! result flags then decide which follow-up transition, if any, is issued.
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

use crate::character::{Character, CharacterError};
use crate::config::{ConfigReport, GameConfig, GameOptions};
use crate::navigation::{
    Dispatch, NavigationError, Navigator, Screen, StateObserver, TransitionOutcome,
};
use crate::rng::RngStreams;
use crate::storage::SaveSnapshot;
use crate::timeline::UpcomingRace;
use crate::training::{TrainingEngine, TrainingError, TrainingKind, TrainingOptions};
use crate::turn::{RaceCall, RaceOutcome, TurnController, TurnResult};
use crate::{RaceSimulator, SaveStore};

const TUTORIAL_TRAINEE: &str = "Rookie";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    CreateCharacter,
    LoadGame,
    SaveGame,
    TrainSpeed,
    TrainStamina,
    TrainPower,
    Rest,
    Hint,
    StartRace,
    RunRace,
    FinishRace,
    TutorialTrain,
    Quit,
}

impl ActionId {
    pub const ALL: [Self; 13] = [
        Self::CreateCharacter,
        Self::LoadGame,
        Self::SaveGame,
        Self::TrainSpeed,
        Self::TrainStamina,
        Self::TrainPower,
        Self::Rest,
        Self::Hint,
        Self::StartRace,
        Self::RunRace,
        Self::FinishRace,
        Self::TutorialTrain,
        Self::Quit,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateCharacter => "create_character",
            Self::LoadGame => "load_game",
            Self::SaveGame => "save_game",
            Self::TrainSpeed => "train_speed",
            Self::TrainStamina => "train_stamina",
            Self::TrainPower => "train_power",
            Self::Rest => "rest",
            Self::Hint => "hint",
            Self::StartRace => "start_race",
            Self::RunRace => "run_race",
            Self::FinishRace => "finish_race",
            Self::TutorialTrain => "tutorial_train",
            Self::Quit => "quit",
        }
    }

    #[must_use]
    pub const fn training_kind(self) -> Option<TrainingKind> {
        match self {
            Self::TrainSpeed => Some(TrainingKind::Speed),
            Self::TrainStamina => Some(TrainingKind::Stamina),
            Self::TrainPower => Some(TrainingKind::Power),
            Self::Rest => Some(TrainingKind::Rest),
            _ => None,
        }
    }

    #[must_use]
    pub const fn for_training(kind: TrainingKind) -> Self {
        match kind {
            TrainingKind::Speed => Self::TrainSpeed,
            TrainingKind::Stamina => Self::TrainStamina,
            TrainingKind::Power => Self::TrainPower,
            TrainingKind::Rest => Self::Rest,
        }
    }

    /// Screen the action must be issued from; `None` means any screen.
    #[must_use]
    pub const fn home_screen(self) -> Option<Screen> {
        match self {
            Self::CreateCharacter => Some(Screen::Setup),
            Self::LoadGame => Some(Screen::Load),
            Self::SaveGame
            | Self::TrainSpeed
            | Self::TrainStamina
            | Self::TrainPower
            | Self::Rest
            | Self::Hint => Some(Screen::Training),
            Self::StartRace => Some(Screen::Lineup),
            Self::RunRace => Some(Screen::Racing),
            Self::FinishRace => Some(Screen::Results),
            Self::TutorialTrain => Some(Screen::TutorialTraining),
            Self::Quit => None,
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionId {
    type Err = ActionFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ActionFailure::UnknownAction(s.to_string()))
    }
}

/// Every way an action can fail, normalized for the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionFailure {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("{action} is not available on {screen}")]
    NotAvailable { action: ActionId, screen: Screen },
    #[error(transparent)]
    Training(#[from] TrainingError),
    #[error(transparent)]
    Character(#[from] CharacterError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("no trainee in this session")]
    NoCharacter,
    #[error("no race is pending")]
    NoPendingRace,
    #[error("save slot '{0}' is empty")]
    EmptySlot(String),
    #[error("storage failed: {0}")]
    Storage(String),
}

/// Outcome of one action. `success` is false exactly when `error` is set; a
/// handler whose follow-up transition is refused reports failure even though
/// its own effects were kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionResult {
    pub action: Option<ActionId>,
    pub success: bool,
    pub error: Option<ActionFailure>,
    pub race_ready: bool,
    pub career_complete: bool,
    pub turn: Option<TurnResult>,
    pub message: Option<String>,
}

impl ActionResult {
    fn ok(action: ActionId) -> Self {
        Self {
            action: Some(action),
            success: true,
            ..Self::default()
        }
    }

    fn failed(action: Option<ActionId>, error: ActionFailure) -> Self {
        Self {
            action,
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }

    fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

/// A race that has been run, kept for the results screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceReport {
    pub call: RaceCall,
    pub outcome: RaceOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOutcome {
    pub screen: Screen,
    pub dispatch: Dispatch,
    pub action: Option<ActionResult>,
}

/// Read-only snapshot handed to renderers.
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    pub screen: Screen,
    pub character: Option<&'a Character>,
    pub tutorial: Option<&'a Character>,
    pub name_buffer: &'a str,
    pub pending_race: Option<&'a RaceCall>,
    pub last_race: Option<&'a RaceReport>,
    pub upcoming: Option<UpcomingRace<'a>>,
    pub message: Option<&'a str>,
}

pub struct Game<S, R> {
    navigator: Navigator,
    controller: TurnController,
    store: S,
    simulator: R,
    rng: RngStreams,
    options: GameOptions,
    report: ConfigReport,
    character: Option<Character>,
    tutorial: Option<Character>,
    name_buffer: String,
    pending_race: Option<RaceCall>,
    last_race: Option<RaceReport>,
    message: Option<String>,
    idle_ms: u64,
    quit_requested: bool,
}

impl<S, R> fmt::Debug for Game<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("navigator", &self.navigator)
            .field("character", &self.character)
            .field("pending_race", &self.pending_race)
            .finish_non_exhaustive()
    }
}

impl<S, R> Game<S, R>
where
    S: SaveStore,
    R: RaceSimulator,
{
    /// Build a session. The config integrity check runs once here and its
    /// findings are logged and kept, never raised.
    pub fn new(
        config: GameConfig,
        options: GameOptions,
        store: S,
        simulator: R,
        observer: impl StateObserver + 'static,
    ) -> Self {
        let report = config.validate();
        report.log();
        let GameConfig {
            navigation,
            training,
            timeline,
        } = config;
        let controller = TurnController::new(TrainingEngine::new(training), timeline);
        Self {
            navigator: Navigator::new(Rc::new(navigation), observer),
            controller,
            store,
            simulator,
            rng: RngStreams::from_seed(options.seed),
            options,
            report,
            character: None,
            tutorial: None,
            name_buffer: String::new(),
            pending_race: None,
            last_race: None,
            message: None,
            idle_ms: 0,
            quit_requested: false,
        }
    }

    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.navigator.current()
    }

    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub const fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    #[must_use]
    pub const fn controller(&self) -> &TurnController {
        &self.controller
    }

    #[must_use]
    pub const fn config_report(&self) -> &ConfigReport {
        &self.report
    }

    #[must_use]
    pub const fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    /// Apply a closure to the trainee, if one exists.
    pub fn with_character_mut<T>(&mut self, f: impl FnOnce(&mut Character) -> T) -> Option<T> {
        self.character.as_mut().map(f)
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    #[must_use]
    pub fn view(&self) -> GameView<'_> {
        GameView {
            screen: self.navigator.current(),
            character: self.character.as_ref(),
            tutorial: self.tutorial.as_ref(),
            name_buffer: &self.name_buffer,
            pending_race: self.pending_race.as_ref(),
            last_race: self.last_race.as_ref(),
            upcoming: self
                .character
                .as_ref()
                .and_then(|character| self.controller.upcoming(character)),
            message: self.message.as_deref(),
        }
    }

    /// Run one input token through dispatch, action execution and follow-up
    /// transitions.
    ///
    /// # Errors
    ///
    /// Returns the navigator's error when the token is rejected or maps to an
    /// illegal transition. Action failures are reported inside the outcome.
    pub fn handle_input(&mut self, token: &str) -> Result<InputOutcome, NavigationError> {
        self.idle_ms = 0;
        let dispatch = self.navigator.dispatch(token)?;
        let action = match &dispatch {
            Dispatch::Transition(_) => None,
            Dispatch::Text(text) => {
                if !self.name_buffer.is_empty() {
                    self.name_buffer.push(' ');
                }
                self.name_buffer.push_str(text);
                self.navigator.refresh();
                None
            }
            Dispatch::Action(request) => Some(self.execute_named(&request.action)),
        };
        Ok(InputOutcome {
            screen: self.navigator.current(),
            dispatch,
            action,
        })
    }

    /// Type `name` into the setup screen and confirm it.
    ///
    /// # Errors
    ///
    /// Returns the navigator's error if the current screen does not take text.
    pub fn submit_name(&mut self, name: &str) -> Result<InputOutcome, NavigationError> {
        self.name_buffer.clear();
        self.handle_input(name)?;
        self.handle_input("")
    }

    /// Advance the idle clock and fire the current screen's auto-progress
    /// once its delay has elapsed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when the configured target is not allowed.
    pub fn tick(&mut self, elapsed_ms: u64) -> Result<Option<TransitionOutcome>, NavigationError> {
        let Some(auto) = self.navigator.pending_auto_progress() else {
            self.idle_ms = 0;
            return Ok(None);
        };
        self.idle_ms = self.idle_ms.saturating_add(elapsed_ms);
        if self.idle_ms < auto.delay_ms {
            return Ok(None);
        }
        self.idle_ms = 0;
        self.navigator.auto_progress()
    }

    /// Execute an action named by config data. Unknown names fail softly.
    pub fn execute_named(&mut self, name: &str) -> ActionResult {
        match name.parse::<ActionId>() {
            Ok(action) => self.execute(action),
            Err(err) => {
                warn!("ignoring unbound action '{name}' on {}", self.screen());
                ActionResult::failed(None, err)
            }
        }
    }

    /// Execute `action` and issue whatever transition its result calls for.
    pub fn execute(&mut self, action: ActionId) -> ActionResult {
        let screen = self.navigator.current();
        if let Some(home) = action.home_screen()
            && home != screen
        {
            return ActionResult::failed(
                Some(action),
                ActionFailure::NotAvailable { action, screen },
            );
        }

        let outcome = match action {
            ActionId::CreateCharacter => self.create_character(),
            ActionId::LoadGame => self.load_game(),
            ActionId::SaveGame => self.save_game(),
            ActionId::TrainSpeed => self.train(TrainingKind::Speed),
            ActionId::TrainStamina => self.train(TrainingKind::Stamina),
            ActionId::TrainPower => self.train(TrainingKind::Power),
            ActionId::Rest => self.train(TrainingKind::Rest),
            ActionId::Hint => self.hint(),
            ActionId::StartRace => self.start_race(),
            ActionId::RunRace => self.run_race(),
            ActionId::FinishRace => self.finish_race(),
            ActionId::TutorialTrain => self.tutorial_train(),
            ActionId::Quit => Ok(self.quit()),
        };

        let mut result = match outcome {
            Ok(result) => result,
            Err(error) => {
                debug!("{action} failed on {screen}: {error}");
                self.message = Some(error.to_string());
                return ActionResult::failed(Some(action), error);
            }
        };
        self.message.clone_from(&result.message);

        match Self::follow_up(action, &result) {
            Some(target) => {
                if let Err(err) = self.navigator.attempt_transition(target) {
                    warn!("{action} succeeded but follow-up transition failed: {err}");
                    result.success = false;
                    result.error = Some(err.into());
                }
            }
            None => self.navigator.refresh(),
        }
        result
    }

    fn follow_up(action: ActionId, result: &ActionResult) -> Option<Screen> {
        match action {
            ActionId::CreateCharacter | ActionId::LoadGame => Some(Screen::Training),
            ActionId::TrainSpeed | ActionId::TrainStamina | ActionId::TrainPower | ActionId::Rest => {
                if result.career_complete {
                    Some(Screen::CareerComplete)
                } else if result.race_ready {
                    Some(Screen::PreRace)
                } else {
                    None
                }
            }
            ActionId::StartRace => Some(Screen::Racing),
            ActionId::RunRace => Some(Screen::Results),
            ActionId::FinishRace => Some(if result.career_complete {
                Screen::CareerComplete
            } else {
                Screen::Training
            }),
            ActionId::TutorialTrain => Some(Screen::TutorialRace),
            ActionId::SaveGame | ActionId::Hint | ActionId::Quit => None,
        }
    }

    fn create_character(&mut self) -> Result<ActionResult, ActionFailure> {
        let character = Character::new(&self.name_buffer, Utc::now())?;
        self.name_buffer.clear();
        info!("new career for {}", character.name());
        let message = format!("{} joins the stable.", character.name());
        self.character = Some(character);
        self.pending_race = None;
        self.last_race = None;
        Ok(ActionResult::ok(ActionId::CreateCharacter).with_message(message))
    }

    fn load_game(&mut self) -> Result<ActionResult, ActionFailure> {
        let slot = self.options.save_slot.clone();
        let snapshot = self
            .store
            .load_game(&slot)
            .map_err(|err| ActionFailure::Storage(err.to_string()))?
            .ok_or_else(|| ActionFailure::EmptySlot(slot.clone()))?;
        let character = snapshot.into_character(self.controller.timeline().final_turn())?;
        info!("loaded {} at turn {} from '{slot}'", character.name(), character.turn());
        let message = format!("Welcome back, {}.", character.name());
        self.character = Some(character);
        self.pending_race = None;
        self.last_race = None;
        Ok(ActionResult::ok(ActionId::LoadGame).with_message(message))
    }

    fn save_game(&mut self) -> Result<ActionResult, ActionFailure> {
        let character = self.character.as_ref().ok_or(ActionFailure::NoCharacter)?;
        let snapshot = SaveSnapshot::new(character, Utc::now());
        self.store
            .save_game(&self.options.save_slot, &snapshot)
            .map_err(|err| ActionFailure::Storage(err.to_string()))?;
        info!("saved turn {} to '{}'", character.turn(), self.options.save_slot);
        Ok(ActionResult::ok(ActionId::SaveGame)
            .with_message(format!("Saved to slot '{}'.", self.options.save_slot)))
    }

    fn train(&mut self, kind: TrainingKind) -> Result<ActionResult, ActionFailure> {
        let action = ActionId::for_training(kind);
        let character = self.character.as_mut().ok_or(ActionFailure::NoCharacter)?;
        let turn = self.controller.process_turn(
            character,
            kind,
            self.options.training(),
            self.rng.training(),
        )?;
        let race_ready = turn.race_ready();
        let career_complete = !race_ready && self.controller.is_career_complete(character);
        let message = match &turn.race {
            Some(call) => format!("Race day: {} on turn {}!", call.race.name, turn.turn),
            None => training_message(&turn),
        };
        self.pending_race.clone_from(&turn.race);
        Ok(ActionResult {
            race_ready,
            career_complete,
            turn: Some(turn),
            ..ActionResult::ok(action)
        }
        .with_message(message))
    }

    fn hint(&mut self) -> Result<ActionResult, ActionFailure> {
        let character = self.character.as_ref().ok_or(ActionFailure::NoCharacter)?;
        let engine = self.controller.engine();
        let kind = engine.recommend(character);
        let cost = engine.profile(kind).map_or(0, |profile| profile.energy_cost);
        let mut message = format!("Coach suggests {kind} (costs {cost} energy)");
        if let Some(upcoming) = self.controller.upcoming(character) {
            let _ = write!(
                message,
                "; {} in {} turn(s)",
                upcoming.race.name, upcoming.turns_remaining
            );
        }
        Ok(ActionResult::ok(ActionId::Hint).with_message(message))
    }

    fn start_race(&mut self) -> Result<ActionResult, ActionFailure> {
        let call = self.pending_race.as_ref().ok_or(ActionFailure::NoPendingRace)?;
        let message = format!(
            "{} runners line up for the {} ({}m).",
            call.race.meta.field_size, call.race.name, call.race.meta.distance_m
        );
        Ok(ActionResult::ok(ActionId::StartRace).with_message(message))
    }

    fn run_race(&mut self) -> Result<ActionResult, ActionFailure> {
        let call = self.pending_race.clone().ok_or(ActionFailure::NoPendingRace)?;
        let character = self.character.as_mut().ok_or(ActionFailure::NoCharacter)?;
        let outcome = self
            .simulator
            .run_race(&call.race, character, self.rng.race());
        self.controller.record_race(character, &outcome);
        let message = format!(
            "{} finished {} of {} in the {}.",
            character.name(),
            ordinal(outcome.placement),
            outcome.field_size,
            call.race.name
        );
        self.last_race = Some(RaceReport { call, outcome });
        Ok(ActionResult::ok(ActionId::RunRace).with_message(message))
    }

    fn finish_race(&mut self) -> Result<ActionResult, ActionFailure> {
        let character = self.character.as_ref().ok_or(ActionFailure::NoCharacter)?;
        let call = self.pending_race.take().ok_or(ActionFailure::NoPendingRace)?;
        let career_complete = call.is_last || self.controller.is_career_complete(character);
        if career_complete {
            info!(
                "{} completes the career: {}/{} wins",
                character.name(),
                character.career.races_won,
                character.career.races_run
            );
        }
        Ok(ActionResult {
            career_complete,
            ..ActionResult::ok(ActionId::FinishRace)
        })
    }

    fn tutorial_train(&mut self) -> Result<ActionResult, ActionFailure> {
        let mut trainee = Character::new(TUTORIAL_TRAINEE, Utc::now())?;
        let turn = self.controller.process_turn(
            &mut trainee,
            TrainingKind::Speed,
            TrainingOptions::deterministic(),
            self.rng.training(),
        )?;
        let message = training_message(&turn);
        self.tutorial = Some(trainee);
        Ok(ActionResult {
            turn: Some(turn),
            ..ActionResult::ok(ActionId::TutorialTrain)
        }
        .with_message(message))
    }

    fn quit(&mut self) -> ActionResult {
        self.quit_requested = true;
        ActionResult::ok(ActionId::Quit)
    }
}

fn training_message(turn: &TurnResult) -> String {
    let applied = &turn.applied;
    let mut message = match applied.gains.stat {
        Some(stat) => format!(
            "{} +{} ({} energy)",
            stat, applied.stat_delta, applied.energy_delta
        ),
        None => format!("Rested: +{} energy", applied.energy_delta),
    };
    if applied.form_improved() {
        let _ = write!(message, ", form now {}", applied.form_after);
    }
    message
}

fn ordinal(placement: u8) -> String {
    let suffix = match (placement % 10, placement % 100) {
        (1, n) if n != 11 => "st",
        (2, n) if n != 12 => "nd",
        (3, n) if n != 13 => "rd",
        _ => "th",
    };
    format!("{placement}{suffix}")
}

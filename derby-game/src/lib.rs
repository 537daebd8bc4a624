//! Derby Career Engine
//!
//! Platform-agnostic core for a single-player trainee career: a screen
//! navigation state machine, a training engine, a turn controller with a fixed
//! race schedule, and the bindings that connect them. Rendering, persistence
//! formats and race physics are supplied by the embedding application.

pub mod bindings;
pub mod character;
pub mod config;
pub mod navigation;
pub mod numbers;
pub mod rng;
pub mod storage;
pub mod timeline;
pub mod training;
pub mod turn;

use rand::RngCore;

// Re-export commonly used types
pub use bindings::{ActionFailure, ActionId, ActionResult, Game, GameView, InputOutcome, RaceReport};
pub use character::{Career, Character, CharacterError, Form, STAT_MAX, StatKind, Stats};
pub use config::{ConfigReport, GameConfig, GameOptions};
pub use navigation::{
    ActionRequest, ChangeCause, ConfigIssue, Dispatch, InputBinding, NavigationConfig, NavigationError,
    Navigator, NoopObserver, Screen, StateChange, StateObserver, TransitionOutcome,
};
pub use rng::RngStreams;
pub use storage::{MemoryStore, SaveSnapshot};
pub use timeline::{RaceKind, RaceMeta, ScheduledRace, Surface, Timeline, TimelineIssue, UpcomingRace};
pub use training::{
    ActionProfile, AppliedTraining, TrainingConfig, TrainingEngine, TrainingError, TrainingGains,
    TrainingKind, TrainingOptions,
};
pub use turn::{BatchOutcome, BatchStop, RaceCall, RaceOutcome, TurnController, TurnResult};

/// Trait for abstracting save/load operations.
/// Platform-specific implementations should provide this
pub trait SaveStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a career snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_game(&self, save_name: &str, snapshot: &SaveSnapshot) -> Result<(), Self::Error>;

    /// Load a career snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<SaveSnapshot>, Self::Error>;

    /// Delete a saved career
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Resolves a scheduled race into a finishing position.
pub trait RaceSimulator {
    fn run_race(
        &mut self,
        race: &ScheduledRace,
        character: &Character,
        rng: &mut dyn RngCore,
    ) -> RaceOutcome;
}

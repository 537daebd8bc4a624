//! Drives a headless `Game` through a scripted plan and summarizes the run.
use anyhow::Result;
use colored::Colorize;
use derby_game::{
    ActionId, Character, Game, GameConfig, GameOptions, InputBinding, MemoryStore, RaceReport,
    Screen, StateChange,
};
use log::debug;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::race::StatRaceSimulator;

pub const DEFAULT_MAX_STEPS: usize = 200;

type TestGame = Game<MemoryStore, StatRaceSimulator>;

/// One scripted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Feed a raw input token.
    Input(String),
    /// Advance the idle clock.
    Tick(u64),
    /// Top the trainee's energy back up to full.
    RefillEnergy,
    /// Play training and races with the coach's advice until the career ends.
    AutoCareer,
    /// Start a fresh session that shares the same save slots.
    Restart,
}

#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub steps: Vec<Step>,
    pub max_steps: usize,
    pub deterministic: bool,
    pub expectations: Vec<ScenarioExpectation>,
}

impl Default for ScenarioPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioPlan {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            steps: Vec::new(),
            max_steps: DEFAULT_MAX_STEPS,
            deterministic: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn input(mut self, token: &str) -> Self {
        self.steps.push(Step::Input(token.to_string()));
        self
    }

    #[must_use]
    pub fn inputs(mut self, tokens: &[&str]) -> Self {
        self.steps
            .extend(tokens.iter().map(|token| Step::Input((*token).to_string())));
        self
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Menu to training with a freshly named trainee.
    #[must_use]
    pub fn new_career(self, name: &str) -> Self {
        self.inputs(&["1", name, ""])
    }

    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub const fn deterministic(mut self) -> Self {
        self.deterministic = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<ScenarioExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a plan completes.
type ScenarioExpectationFn = Arc<dyn Fn(&ScenarioSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct ScenarioExpectation(ScenarioExpectationFn);

impl fmt::Debug for ScenarioExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioExpectation").finish()
    }
}

impl ScenarioExpectation {
    pub fn evaluate(&self, summary: &ScenarioSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for ScenarioExpectation
where
    F: Fn(&ScenarioSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Everything a run left behind for expectations and reports.
#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub seed: u64,
    pub final_screen: Screen,
    pub character: Option<Character>,
    pub pending_race: Option<String>,
    pub races: Vec<RaceReport>,
    pub visited: Vec<Screen>,
    pub rejected_inputs: usize,
    pub failed_actions: Vec<String>,
    pub steps: usize,
    pub step_limit_hit: bool,
}

impl ScenarioSummary {
    #[must_use]
    pub fn turn(&self) -> Option<u32> {
        self.character.as_ref().map(Character::turn)
    }

    #[must_use]
    pub fn visited_screen(&self, screen: Screen) -> bool {
        self.visited.contains(&screen)
    }

    #[must_use]
    pub fn wins(&self) -> usize {
        self.races.iter().filter(|race| race.outcome.won()).count()
    }
}

pub struct GameTester {
    config: GameConfig,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(config: GameConfig, verbose: bool) -> Self {
        Self { config, verbose }
    }

    /// Tester over the bundled configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a bundled asset fails to parse.
    pub fn try_default(verbose: bool) -> Result<Self> {
        Ok(Self::new(GameConfig::load_from_static()?, verbose))
    }

    fn new_game(
        &self,
        plan: &ScenarioPlan,
        seed: u64,
        store: &MemoryStore,
        visited: &Rc<RefCell<Vec<Screen>>>,
    ) -> TestGame {
        let mut options = GameOptions::with_seed(seed);
        options.deterministic = plan.deterministic;
        let sink = Rc::clone(visited);
        Game::new(
            self.config.clone(),
            options,
            store.clone(),
            StatRaceSimulator::default(),
            move |change: &StateChange| {
                if change.from != change.to {
                    sink.borrow_mut().push(change.to);
                }
            },
        )
    }

    #[must_use]
    pub fn run_plan(&self, plan: &ScenarioPlan, seed: u64) -> ScenarioSummary {
        let store = MemoryStore::default();
        let visited = Rc::new(RefCell::new(Vec::new()));
        let mut game = self.new_game(plan, seed, &store, &visited);
        visited.borrow_mut().push(game.screen());

        let mut run = RunState::default();
        for step in &plan.steps {
            if run.steps >= plan.max_steps {
                run.step_limit_hit = true;
                break;
            }
            match step {
                Step::Input(token) => self.feed(&mut game, token, &mut run),
                Step::Tick(ms) => {
                    if let Err(err) = game.tick(*ms) {
                        run.failed_actions.push(format!("tick: {err}"));
                    }
                }
                Step::RefillEnergy => {
                    game.with_character_mut(|c| c.energy = derby_game::character::ENERGY_MAX);
                }
                Step::AutoCareer => self.auto_career(&mut game, plan.max_steps, &mut run),
                Step::Restart => {
                    game = self.new_game(plan, seed, &store, &visited);
                    visited.borrow_mut().push(game.screen());
                }
            }
        }

        let view = game.view();
        let summary = ScenarioSummary {
            seed,
            final_screen: view.screen,
            character: view.character.cloned(),
            pending_race: view.pending_race.map(|call| call.race.name.clone()),
            races: run.races,
            visited: visited.borrow().clone(),
            rejected_inputs: run.rejected_inputs,
            failed_actions: run.failed_actions,
            steps: run.steps,
            step_limit_hit: run.step_limit_hit,
        };
        if self.verbose {
            println!(
                "    {} seed {} ended on {} after {} steps",
                "↳".dimmed(),
                seed,
                summary.final_screen,
                summary.steps
            );
        }
        summary
    }

    fn feed(&self, game: &mut TestGame, token: &str, run: &mut RunState) {
        run.steps += 1;
        match game.handle_input(token) {
            Ok(outcome) => {
                let Some(result) = outcome.action else {
                    return;
                };
                if !result.success {
                    let action = result.action.map_or("?", ActionId::as_str);
                    let reason = result
                        .error
                        .map_or_else(|| String::from("unknown"), |err| err.to_string());
                    run.failed_actions.push(format!("{action}: {reason}"));
                } else if result.action == Some(ActionId::RunRace)
                    && let Some(report) = game.view().last_race
                {
                    run.races.push(report.clone());
                }
            }
            Err(err) => {
                debug!("rejected '{token}': {err}");
                if self.verbose {
                    println!("    {} {err}", "✗".yellow());
                }
                run.rejected_inputs += 1;
            }
        }
    }

    fn auto_career(&self, game: &mut TestGame, max_steps: usize, run: &mut RunState) {
        loop {
            if run.steps >= max_steps {
                run.step_limit_hit = true;
                return;
            }
            let token = match game.screen() {
                Screen::Training => {
                    let Some(character) = game.character() else {
                        return;
                    };
                    let kind = game.controller().engine().recommend(character);
                    match token_for(game, ActionId::for_training(kind)) {
                        Some(token) => token,
                        None => return,
                    }
                }
                Screen::PreRace | Screen::Lineup | Screen::Racing | Screen::Results => {
                    String::new()
                }
                _ => return,
            };
            self.feed(game, &token, run);
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    races: Vec<RaceReport>,
    rejected_inputs: usize,
    failed_actions: Vec<String>,
    steps: usize,
    step_limit_hit: bool,
}

/// Input on the current screen bound to `action`, if any.
fn token_for(game: &TestGame, action: ActionId) -> Option<String> {
    game.navigator()
        .current_config()?
        .inputs
        .iter()
        .find(|(_, binding)| matches!(binding, InputBinding::Action(name) if name == action.as_str()))
        .map(|(token, _)| token.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> GameTester {
        GameTester::try_default(false).unwrap()
    }

    #[test]
    fn new_career_lands_on_training() {
        let summary = tester().run_plan(&ScenarioPlan::new().new_career("Thunder"), 1);
        assert_eq!(summary.final_screen, Screen::Training);
        assert_eq!(summary.turn(), Some(1));
        assert_eq!(
            summary.visited,
            vec![Screen::Menu, Screen::Setup, Screen::Training]
        );
        assert_eq!(summary.rejected_inputs, 0);
    }

    #[test]
    fn auto_career_finishes_every_race() {
        let summary = tester().run_plan(
            &ScenarioPlan::new()
                .new_career("Comet")
                .step(Step::AutoCareer),
            42,
        );
        assert_eq!(summary.final_screen, Screen::CareerComplete);
        assert_eq!(summary.races.len(), 4);
        assert_eq!(summary.turn(), Some(12));
        assert!(!summary.step_limit_hit);
        assert!(summary.failed_actions.is_empty(), "{:?}", summary.failed_actions);
    }

    #[test]
    fn step_limit_stops_runaway_plans() {
        let summary = tester().run_plan(
            &ScenarioPlan::new()
                .new_career("Comet")
                .step(Step::AutoCareer)
                .with_max_steps(5),
            7,
        );
        assert!(summary.step_limit_hit);
        assert_eq!(summary.steps, 5);
    }

    #[test]
    fn restart_shares_save_slots() {
        let summary = tester().run_plan(
            &ScenarioPlan::new()
                .new_career("Comet")
                .inputs(&["3", "s"])
                .step(Step::Restart)
                .inputs(&["2", ""]),
            3,
        );
        assert_eq!(summary.final_screen, Screen::Training);
        assert_eq!(summary.turn(), Some(2));
    }

    #[test]
    fn same_seed_same_summary() {
        let plan = ScenarioPlan::new()
            .new_career("Comet")
            .step(Step::AutoCareer);
        let a = tester().run_plan(&plan, 99);
        let b = tester().run_plan(&plan, 99);
        assert_eq!(a.races, b.races);
        assert_eq!(a.character.map(|c| c.stats), b.character.map(|c| c.stats));
    }
}

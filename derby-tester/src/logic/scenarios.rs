//! Named scenarios available to `derby-tester run`.
use anyhow::{Result, ensure};
use derby_game::Screen;

use super::game_tester::{ScenarioPlan, ScenarioSummary, Step};

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: ScenarioPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, plan: ScenarioPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

const CATALOG: [(&str, &str); 6] = [
    ("smoke", "Create a trainee and run one training turn"),
    ("maiden-sprint", "Three speed sessions reach the first race on turn 4"),
    ("full-career", "Coach-driven play through all four races"),
    ("tutorial", "Tutorial walkthrough with timed auto-advance"),
    ("invalid-input", "Unmapped and illegal inputs change nothing"),
    ("save-load", "Save mid-career, restart, and resume from the slot"),
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    CATALOG.into_iter()
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let plan = match name {
        "smoke" => smoke(),
        "maiden-sprint" => maiden_sprint(),
        "full-career" => full_career(),
        "tutorial" => tutorial(),
        "invalid-input" => invalid_input(),
        "save-load" => save_load(),
        _ => return None,
    };
    Some(TestScenario::new(name, plan))
}

/// Expand `all` into every catalog entry, keeping other names in order.
pub fn expand_scenarios(names: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();
    for name in names {
        if name == "all" {
            expanded.extend(CATALOG.iter().map(|(key, _)| (*key).to_string()));
        } else {
            expanded.push(name.clone());
        }
    }
    expanded
}

fn smoke() -> ScenarioPlan {
    ScenarioPlan::new()
        .new_career("Thunder")
        .input("1")
        .with_expectation(|summary: &ScenarioSummary| {
            ensure!(
                summary.final_screen == Screen::Training,
                "expected training screen, ended on {}",
                summary.final_screen
            );
            ensure!(summary.turn() == Some(2), "turn should be 2, got {:?}", summary.turn());
            let speed = summary.character.as_ref().map_or(0, |c| c.stats.speed);
            ensure!(speed > 20, "speed did not improve ({speed})");
            Ok(())
        })
}

fn maiden_sprint() -> ScenarioPlan {
    let mut plan = ScenarioPlan::new().deterministic().new_career("Thunder");
    for _ in 0..3 {
        plan = plan.step(Step::RefillEnergy).input("1");
    }
    plan.with_expectation(|summary: &ScenarioSummary| {
        ensure!(summary.turn() == Some(4), "turn should be 4, got {:?}", summary.turn());
        ensure!(
            summary.final_screen == Screen::PreRace,
            "expected pre-race screen, ended on {}",
            summary.final_screen
        );
        ensure!(
            summary.pending_race.as_deref() == Some("Maiden Sprint"),
            "pending race was {:?}",
            summary.pending_race
        );
        let speed = summary.character.as_ref().map_or(0, |c| c.stats.speed);
        ensure!(speed == 50, "speed should be 50, got {speed}");
        Ok(())
    })
}

fn full_career() -> ScenarioPlan {
    ScenarioPlan::new()
        .new_career("Comet")
        .step(Step::AutoCareer)
        .with_expectation(|summary: &ScenarioSummary| {
            ensure!(!summary.step_limit_hit, "step limit hit after {} steps", summary.steps);
            ensure!(
                summary.final_screen == Screen::CareerComplete,
                "career did not complete, ended on {}",
                summary.final_screen
            );
            ensure!(summary.races.len() == 4, "ran {} races", summary.races.len());
            Ok(())
        })
        .with_expectation(|summary: &ScenarioSummary| {
            let turns: Vec<u32> = summary.races.iter().map(|r| r.call.race.turn).collect();
            ensure!(turns == [4, 7, 10, 12], "races ran on turns {turns:?}");
            let last = summary.races.last().map(|r| r.call.is_last);
            ensure!(last == Some(true), "final race not flagged as last");
            ensure!(
                summary.failed_actions.is_empty(),
                "actions failed: {:?}",
                summary.failed_actions
            );
            Ok(())
        })
}

fn tutorial() -> ScenarioPlan {
    ScenarioPlan::new()
        .inputs(&["3", "", "1"])
        .step(Step::Tick(1_000))
        .step(Step::Tick(500))
        .input("")
        .with_expectation(|summary: &ScenarioSummary| {
            ensure!(
                summary.visited_screen(Screen::TutorialResults),
                "tutorial results never shown: {:?}",
                summary.visited
            );
            ensure!(
                summary.final_screen == Screen::Menu,
                "expected menu, ended on {}",
                summary.final_screen
            );
            ensure!(summary.character.is_none(), "tutorial created a career trainee");
            Ok(())
        })
}

fn invalid_input() -> ScenarioPlan {
    ScenarioPlan::new()
        .input("7")
        .new_career("Thunder")
        .inputs(&["9", "x", "", "pre_race"])
        .with_expectation(|summary: &ScenarioSummary| {
            ensure!(
                summary.rejected_inputs == 5,
                "expected 5 rejected inputs, saw {}",
                summary.rejected_inputs
            );
            ensure!(summary.turn() == Some(1), "turn moved to {:?}", summary.turn());
            ensure!(
                summary.final_screen == Screen::Training,
                "ended on {}",
                summary.final_screen
            );
            ensure!(
                !summary.visited_screen(Screen::PreRace),
                "reached pre-race without a race"
            );
            Ok(())
        })
}

fn save_load() -> ScenarioPlan {
    ScenarioPlan::new()
        .deterministic()
        .new_career("Comet")
        .inputs(&["2", "3", "s"])
        .step(Step::Restart)
        .inputs(&["2", ""])
        .with_expectation(|summary: &ScenarioSummary| {
            ensure!(
                summary.final_screen == Screen::Training,
                "ended on {}",
                summary.final_screen
            );
            let character = summary
                .character
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("no trainee after load"))?;
            ensure!(character.name() == "Comet", "loaded {}", character.name());
            ensure!(character.turn() == 3, "loaded turn {}", character.turn());
            ensure!(
                character.stats.stamina == 28 && character.stats.power == 30,
                "loaded stats {:?}",
                character.stats
            );
            Ok(())
        })
}

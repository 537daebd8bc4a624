pub mod game_tester;
pub mod reports;
pub mod scenarios;
pub mod tester;

pub use game_tester::{GameTester, ScenarioPlan, ScenarioSummary, Step};
pub use scenarios::{TestScenario, expand_scenarios, get_scenario, list_scenarios};
pub use tester::*;

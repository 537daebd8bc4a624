use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::game_tester::{GameTester, ScenarioSummary};
use crate::logic::scenarios::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester<'a> {
    tester: &'a GameTester,
    verbose: bool,
}

impl<'a> LogicTester<'a> {
    pub const fn new(tester: &'a GameTester, verbose: bool) -> Self {
        Self { tester, verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (seed: {seed})",
                    scenario.name.bright_white()
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let summary = self.tester.run_plan(&scenario.plan, iteration_seed);

            if let Some(err) = evaluate_expectations(scenario, &summary) {
                failures.push(format!(
                    "Iteration {} (seed {}, screen {}, turn {}, steps {}): {} | {}",
                    i + 1,
                    summary.seed,
                    summary.final_screen,
                    summary
                        .turn()
                        .map_or_else(|| String::from("-"), |turn| turn.to_string()),
                    summary.steps,
                    err,
                    summarize_races(&summary)
                ));
                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);
                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) races:{} wins:{}",
                        i + 1,
                        iterations,
                        summary.races.len(),
                        summary.wins()
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
        }
    }
}

fn evaluate_expectations(scenario: &TestScenario, summary: &ScenarioSummary) -> Option<String> {
    for expectation in &scenario.plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_races(summary: &ScenarioSummary) -> String {
    if summary.races.is_empty() {
        return "no races run".to_string();
    }
    summary
        .races
        .iter()
        .map(|report| {
            format!(
                "{} {}/{}",
                report.call.race.name, report.outcome.placement, report.outcome.field_size
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scenarios::{get_scenario, list_scenarios};

    #[test]
    fn catalog_passes_on_a_few_seeds() {
        let tester = GameTester::try_default(false).unwrap();
        let logic = LogicTester::new(&tester, false);
        for (name, _) in list_scenarios() {
            let scenario = get_scenario(name).unwrap();
            for result in logic.run_scenario(&scenario, &[1, 1337], 3) {
                assert!(result.passed, "{name}: {:?}", result.failures);
                assert_eq!(result.successful_iterations, 3);
            }
        }
    }

    #[test]
    fn failing_expectation_is_reported() {
        let tester = GameTester::try_default(false).unwrap();
        let logic = LogicTester::new(&tester, false);
        let scenario = TestScenario::new(
            "always-fails",
            crate::logic::ScenarioPlan::new()
                .with_expectation(|_: &ScenarioSummary| -> anyhow::Result<()> {
                    anyhow::bail!("nope")
                }),
        );
        let results = logic.run_scenario(&scenario, &[5], 2);
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert_eq!(results[0].failures.len(), 2);
        assert!(results[0].failures[0].contains("nope"));
    }

    #[test]
    fn result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: String::from("smoke"),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"][0], 12);
    }
}

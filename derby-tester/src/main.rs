mod common;
mod logic;
mod play;
mod race;
mod storage;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use derby_game::{Game, GameConfig, GameOptions, StateChange};
use log::{info, trace};
use std::io::{Write, stdin};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::{OutputTarget, resolve_seeds, split_csv};
use logic::reports::{generate_console_report, generate_json_report};
use logic::{GameTester, LogicTester, ScenarioResult, expand_scenarios, get_scenario, list_scenarios};
use play::{Pacing, run_session};
use race::StatRaceSimulator;
use storage::JsonFileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "derby-tester", version)]
#[command(about = "Headless launcher and QA driver for the Derby career engine")]
struct Args {
    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Optional path to write report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Combined game config JSON to use instead of the bundled assets
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run scripted scenarios against the headless engine
    Run(RunArgs),
    /// Play interactively on the console
    Play(PlayArgs),
    /// Validate the configuration and report every issue
    CheckConfig,
}

#[derive(Debug, Clone, ClapArgs)]
struct RunArgs {
    /// Scenarios to run (comma-separated, `all` for the whole catalog)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            scenarios: String::from("smoke"),
            seeds: String::from("1337"),
            iterations: 10,
            report: ReportFormat::Console,
        }
    }
}

#[derive(Debug, Clone, ClapArgs)]
struct PlayArgs {
    /// Session seed; defaults to the clock
    #[arg(long)]
    seed: Option<u64>,

    /// Directory holding JSON save slots
    #[arg(long, default_value = "target/derby-saves")]
    save_dir: PathBuf,

    /// Save slot name
    #[arg(long, default_value = "career")]
    slot: String,

    /// Disable training jitter and form rolls
    #[arg(long)]
    deterministic: bool,

    /// Skip real-time waits on auto-advancing screens
    #[arg(long)]
    instant: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let command = args
        .command
        .clone()
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(run) => {
            announce_banner();
            let start_time = Instant::now();
            let results = run_scenarios(&run, config, args.verbose)?;
            let mut output_target = OutputTarget::new(args.output.clone())?;
            write_reports(
                output_target.writer(),
                run.report,
                &results,
                start_time.elapsed(),
            )?;
            output_target.flush_inner()?;
            if results.iter().any(|r| !r.passed) {
                std::process::exit(1);
            }
        }
        Command::Play(play) => play_console(&play, config)?,
        Command::CheckConfig => {
            let mut output_target = OutputTarget::new(args.output.clone())?;
            let clean = check_config(output_target.writer(), &config)?;
            output_target.flush_inner()?;
            if !clean {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:16} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🏇 Derby Career Tester".bright_cyan().bold());
    println!("{}", "======================".cyan());
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load_from_path(path),
        None => GameConfig::load_from_static(),
    }
}

fn run_scenarios(run: &RunArgs, config: GameConfig, verbose: bool) -> Result<Vec<ScenarioResult>> {
    let seeds = resolve_seeds(&split_csv(&run.seeds))?;
    let tester = GameTester::new(config, verbose);
    let logic = LogicTester::new(&tester, verbose);

    let mut results = Vec::new();
    for name in expand_scenarios(&split_csv(&run.scenarios)) {
        let Some(scenario) = get_scenario(&name) else {
            eprintln!("{} unknown scenario '{name}'", "⚠️".yellow());
            continue;
        };
        info!("running {name} over {} seed(s)", seeds.len());
        results.extend(logic.run_scenario(&scenario, &seeds, run.iterations));
    }
    Ok(results)
}

fn write_reports(
    out: &mut dyn Write,
    format: ReportFormat,
    results: &[ScenarioResult],
    total_duration: std::time::Duration,
) -> Result<()> {
    match format {
        ReportFormat::Console => generate_console_report(out, results, total_duration),
        ReportFormat::Json => generate_json_report(out, results),
    }
}

fn check_config(out: &mut dyn Write, config: &GameConfig) -> Result<bool> {
    let report = config.validate();
    if report.is_clean() {
        writeln!(out, "{}", "✅ configuration is clean".green())?;
        writeln!(
            out,
            "   {} screens, {} races, final turn {}",
            config.navigation.screens.len(),
            config.timeline.len(),
            config.timeline.final_turn()
        )?;
        return Ok(true);
    }
    writeln!(out, "{}", "❌ configuration has issues".red().bold())?;
    for message in report.messages() {
        writeln!(out, "   • {message}")?;
    }
    Ok(false)
}

fn play_console(play: &PlayArgs, config: GameConfig) -> Result<()> {
    announce_banner();
    let seed = play
        .seed
        .unwrap_or_else(|| u64::try_from(Utc::now().timestamp_micros()).unwrap_or_default());
    let mut options = GameOptions::with_seed(seed);
    options.deterministic = play.deterministic;
    options.save_slot.clone_from(&play.slot);
    info!("console session seed {seed}, saves in {}", play.save_dir.display());

    let mut game = Game::new(
        config,
        options,
        JsonFileStore::new(&play.save_dir),
        StatRaceSimulator::default(),
        |change: &StateChange| trace!("{} -> {} ({:?})", change.from, change.to, change.cause),
    );
    let pacing = if play.instant {
        Pacing::Instant
    } else {
        Pacing::RealTime
    };
    let stdin = stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    run_session(&mut game, &mut input, &mut out, pacing).context("console session failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(scenarios: &str) -> RunArgs {
        RunArgs {
            scenarios: scenarios.to_string(),
            seeds: String::from("1,2"),
            iterations: 1,
            report: ReportFormat::Json,
        }
    }

    #[test]
    fn no_subcommand_parses() {
        let args = Args::try_parse_from(["derby-tester"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.list_scenarios);
    }

    #[test]
    fn run_subcommand_parses_flags() {
        let args = Args::try_parse_from([
            "derby-tester",
            "run",
            "--scenarios",
            "all",
            "--report",
            "json",
            "--iterations",
            "2",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Some(Command::Run(run)) => {
                assert_eq!(run.scenarios, "all");
                assert_eq!(run.report, ReportFormat::Json);
                assert_eq!(run.iterations, 2);
                assert_eq!(run.seeds, "1337");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn play_subcommand_defaults() {
        let args = Args::try_parse_from(["derby-tester", "play", "--instant"]).unwrap();
        match args.command {
            Some(Command::Play(play)) => {
                assert!(play.instant);
                assert_eq!(play.slot, "career");
                assert!(play.seed.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_scenarios_skips_unknown_names() {
        let config = GameConfig::load_from_static().unwrap();
        let results = run_scenarios(&run_args("smoke,bogus"), config, false).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.scenario_name == "smoke" && r.passed));
    }

    #[test]
    fn run_scenarios_rejects_bad_seeds() {
        let config = GameConfig::load_from_static().unwrap();
        let mut run = run_args("smoke");
        run.seeds = String::from("abc");
        assert!(run_scenarios(&run, config, false).is_err());
    }

    #[test]
    fn write_reports_emits_json() {
        let config = GameConfig::load_from_static().unwrap();
        let results = run_scenarios(&run_args("tutorial"), config, false).unwrap();
        let mut buf = Vec::new();
        write_reports(&mut buf, ReportFormat::Json, &results, std::time::Duration::ZERO).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn check_config_reports_clean_bundle() {
        colored::control::set_override(false);
        let config = GameConfig::load_from_static().unwrap();
        let mut buf = Vec::new();
        assert!(check_config(&mut buf, &config).unwrap());
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("14 screens, 4 races, final turn 12"));
    }

    #[test]
    fn check_config_lists_problems() {
        let mut config = GameConfig::load_from_static().unwrap();
        config.navigation.screens.remove(&derby_game::Screen::Help);
        let mut buf = Vec::new();
        assert!(!check_config(&mut buf, &config).unwrap());
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("navigation:"));
    }
}

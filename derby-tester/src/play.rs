//! Line-based console play over any `BufRead`/`Write` pair.
use anyhow::Result;
use colored::Colorize;
use derby_game::{Game, GameView, InputOutcome, RaceSimulator, SaveStore, Screen};
use std::io::{BufRead, Write};
use std::thread;
use std::time::Duration;

/// How long the loop actually sleeps on auto-advancing screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    RealTime,
    Instant,
}

pub fn render(out: &mut dyn Write, view: &GameView<'_>) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", format!("== {} ==", title(view.screen)).bright_cyan().bold())?;
    match view.screen {
        Screen::Menu => {
            writeln!(out, "  1) New career   2) Load   3) Tutorial   4) Help   q) Quit")?;
        }
        Screen::Help => {
            writeln!(out, "  Train across twelve turns and four scheduled races.")?;
            writeln!(out, "  Each session costs energy; rest restores it.")?;
            writeln!(out, "  [enter] back")?;
        }
        Screen::Load => writeln!(out, "  [enter] load saved career   b) back")?,
        Screen::Setup => {
            writeln!(out, "  Type a name, then press enter to confirm.")?;
            if !view.name_buffer.is_empty() {
                writeln!(out, "  Name: {}", view.name_buffer.bold())?;
            }
        }
        Screen::Training => {
            render_trainee(out, view)?;
            if let Some(upcoming) = view.upcoming {
                writeln!(
                    out,
                    "  Next: {} ({}m) in {} turn(s)",
                    upcoming.race.name.yellow(),
                    upcoming.race.meta.distance_m,
                    upcoming.turns_remaining
                )?;
            }
            writeln!(
                out,
                "  1) Speed  2) Stamina  3) Power  4) Rest  h) Hint  s) Save"
            )?;
        }
        Screen::PreRace | Screen::Lineup | Screen::Racing => {
            if let Some(call) = view.pending_race {
                writeln!(
                    out,
                    "  Race {}: {} ({}m, {} runners)",
                    call.sequence,
                    call.race.name.yellow().bold(),
                    call.race.meta.distance_m,
                    call.race.meta.field_size
                )?;
            }
            writeln!(out, "  [enter] continue")?;
        }
        Screen::Results => {
            if let Some(report) = view.last_race {
                let line = format!(
                    "  {}: finished {} of {}",
                    report.call.race.name, report.outcome.placement, report.outcome.field_size
                );
                if report.outcome.won() {
                    writeln!(out, "{}", line.green().bold())?;
                } else {
                    writeln!(out, "{line}")?;
                }
            }
            writeln!(out, "  [enter] continue")?;
        }
        Screen::CareerComplete => {
            render_trainee(out, view)?;
            if let Some(character) = view.character {
                let career = &character.career;
                writeln!(
                    out,
                    "  Career over: {} wins from {} races",
                    career.races_won, career.races_run
                )?;
            }
            writeln!(out, "  [enter] main menu")?;
        }
        Screen::Tutorial => {
            writeln!(out, "  Training raises one stat and spends energy.")?;
            writeln!(out, "  [enter] try it   b) back")?;
        }
        Screen::TutorialTraining => writeln!(out, "  1) Train speed")?,
        Screen::TutorialRace => {
            if let Some(trainee) = view.tutorial {
                writeln!(out, "  {} is off and running...", trainee.name())?;
            }
        }
        Screen::TutorialResults => writeln!(out, "  Practice over. [enter] main menu")?,
    }
    if let Some(message) = view.message {
        writeln!(out, "  {}", message.italic())?;
    }
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn render_trainee(out: &mut dyn Write, view: &GameView<'_>) -> Result<()> {
    let Some(character) = view.character else {
        return Ok(());
    };
    writeln!(
        out,
        "  {}  turn {}  energy {}  form {}",
        character.name().bold(),
        character.turn(),
        character.energy,
        character.form
    )?;
    writeln!(
        out,
        "  SPD {:>3}  STA {:>3}  POW {:>3}",
        character.stats.speed, character.stats.stamina, character.stats.power
    )?;
    Ok(())
}

const fn title(screen: Screen) -> &'static str {
    match screen {
        Screen::Menu => "Derby",
        Screen::Help => "Help",
        Screen::Load => "Load Career",
        Screen::Setup => "New Trainee",
        Screen::Training => "Training",
        Screen::PreRace => "Race Day",
        Screen::Lineup => "Lineup",
        Screen::Racing => "Racing",
        Screen::Results => "Results",
        Screen::CareerComplete => "Career Complete",
        Screen::Tutorial => "Tutorial",
        Screen::TutorialTraining => "Tutorial: Training",
        Screen::TutorialRace => "Tutorial: Race",
        Screen::TutorialResults => "Tutorial: Results",
    }
}

/// Feed lines from `input` until quit or end of input.
pub fn run_session<S, R>(
    game: &mut Game<S, R>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    pacing: Pacing,
) -> Result<()>
where
    S: SaveStore,
    R: RaceSimulator,
{
    loop {
        settle_auto_progress(game, out, pacing)?;
        render(out, &game.view())?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }
        let token = line.trim_end_matches(['\r', '\n']);
        match game.handle_input(token) {
            Ok(InputOutcome {
                action: Some(result),
                ..
            }) if !result.success => {
                if let Some(error) = result.error {
                    writeln!(out, "  {}", error.to_string().red())?;
                }
            }
            Ok(_) => {}
            Err(err) => writeln!(out, "  {}", err.to_string().yellow())?,
        }
        if game.quit_requested() {
            writeln!(out, "Goodbye.")?;
            return Ok(());
        }
    }
}

fn settle_auto_progress<S, R>(
    game: &mut Game<S, R>,
    out: &mut dyn Write,
    pacing: Pacing,
) -> Result<()>
where
    S: SaveStore,
    R: RaceSimulator,
{
    while let Some(auto) = game.navigator().pending_auto_progress() {
        render(out, &game.view())?;
        writeln!(out)?;
        if pacing == Pacing::RealTime {
            thread::sleep(Duration::from_millis(auto.delay_ms));
        }
        if game.tick(auto.delay_ms)?.is_none() {
            break;
        }
    }
    Ok(())
}

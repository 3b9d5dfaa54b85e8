use std::time::{Duration, Instant};

use clap::Subcommand;
use pulserhythm_core::achievements::PersistentAchievements;
use pulserhythm_core::catalog::TechniqueCatalog;
use pulserhythm_core::session::{BreathingSession, SessionState};
use pulserhythm_core::storage::{Config, Database};
use pulserhythm_core::Event;

/// Tick cadence for the driving loop. The engine itself performs no
/// scheduling; this loop is its scheduler.
const TICK_MS: u64 = 100;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session to completion, printing phase cues
    Run {
        /// Technique name or id
        technique: String,
        /// Session duration in seconds (default from config)
        #[arg(long)]
        duration: Option<u64>,
        /// Target cycle count (default from config)
        #[arg(long)]
        cycles: Option<u32>,
        /// Emit events as JSON lines instead of human-readable cues
        #[arg(long)]
        json: bool,
        /// Do not record the result to history or achievements
        #[arg(long)]
        no_save: bool,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            technique,
            duration,
            cycles,
            json,
            no_save,
        } => run_session(&technique, duration, cycles, json, no_save),
    }
}

fn run_session(
    query: &str,
    duration: Option<u64>,
    cycles: Option<u32>,
    json: bool,
    no_save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let duration_secs = duration.unwrap_or(config.session.default_duration_secs);
    let target_cycles = cycles.unwrap_or(config.session.default_cycles);

    let db = Database::open()?;
    let catalog = TechniqueCatalog::load(&db)?;
    let technique = catalog.find(query)?.clone();

    let mut session = BreathingSession::new(technique, duration_secs, target_cycles)?;
    if !no_save {
        // Separate connections: history writes and achievement state are
        // independent collaborators.
        session = session
            .with_history(Box::new(db))
            .with_achievements(Box::new(PersistentAchievements::new(Database::open()?)));
    }

    for event in session.start()? {
        render(&event, json, &config);
    }

    let mut last = Instant::now();
    while session.state() != SessionState::Finished {
        std::thread::sleep(Duration::from_millis(TICK_MS));
        let now = Instant::now();
        let delta_ms = now.duration_since(last).as_millis() as u64;
        last = now;
        for event in session.tick(delta_ms) {
            render(&event, json, &config);
        }
    }

    let result = session.finish()?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn render(event: &Event, json: bool, config: &Config) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
        return;
    }
    match event {
        Event::SessionStarted {
            technique,
            session_duration_secs,
            target_cycles,
            ..
        } => {
            println!("{technique}: {session_duration_secs}s, up to {target_cycles} cycles");
        }
        Event::PhaseChanged {
            phase,
            duration_secs,
            ..
        } => {
            let bell = if config.cues.sound { "\x07" } else { "" };
            println!("{bell}-> {phase} ({duration_secs}s)");
        }
        Event::CycleCompleted {
            completed_cycles,
            target_cycles,
            ..
        } => {
            println!("   cycle {completed_cycles}/{target_cycles}");
        }
        Event::SessionFinished {
            completed_cycles,
            total_time_secs,
            rhythm_stability,
            ..
        } => {
            println!(
                "done: {completed_cycles} cycles in {total_time_secs:.1}s, stability {rhythm_stability:.0}%"
            );
        }
        _ => {}
    }
}

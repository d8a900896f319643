//! Headless Skirmish Runner
//!
//! Runs scripted squad vs scripted squad and prints the outcome as JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use sibyl::battle::{
    Action, CombatEvent, Commander, EndReason, Engine, EventLog, EventSink, ScriptedCommander,
    TracingSink, UnitClass,
};
use sibyl::core::error::{Rejection, Result, SibylError};
use sibyl::core::{load_rules, Direction, Position, RulesConfig, Side};

/// Rounds allowed when the rules set no limit
const FALLBACK_ROUND_LIMIT: u32 = 100;

/// Headless Skirmish Runner - scripted squads for balance checks
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run a scripted 3v3 skirmish and print the outcome")]
struct Args {
    /// Rules file (TOML); built-in defaults when omitted
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Blue squad classes, comma separated
    #[arg(long, default_value = "sentinel,striker,medic")]
    blue: String,

    /// Red squad classes, comma separated
    #[arg(long, default_value = "specter,oracle,vector")]
    red: String,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Override the round limit
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Write every event as one JSON line to this file
    #[arg(long)]
    events: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Enable debug logging of every action
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Records events and mirrors them to the log
#[derive(Default)]
struct Recorder {
    log: EventLog,
    tracing: TracingSink,
}

impl EventSink for Recorder {
    fn emit(&mut self, event: CombatEvent) {
        self.tracing.emit(event.clone());
        self.log.emit(event);
    }
}

#[derive(Serialize)]
struct Survivor {
    name: String,
    class: UnitClass,
    side: Side,
    hp: u32,
    max_hp: u32,
}

/// JSON output structure
#[derive(Serialize)]
struct SkirmishResult {
    seed: u64,
    winner: Option<Side>,
    reason: Option<EndReason>,
    rounds: u32,
    survivors: Vec<Survivor>,
    rejected_actions: usize,
    events: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "sibyl=debug"
    } else {
        "sibyl=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let seed = args.seed.unwrap_or_else(rand::random);

    let mut rules = match &args.rules {
        Some(path) => load_rules(path)?,
        None => RulesConfig::default(),
    };
    if let Some(limit) = args.max_rounds {
        rules.turns.max_rounds = Some(limit);
    }
    rules.turns.max_rounds.get_or_insert(FALLBACK_ROUND_LIMIT);
    rules.validate()?;

    let mut engine = Engine::with_sink(rules, seed, Recorder::default());
    deploy(&mut engine, Side::Blue, &parse_squad(&args.blue)?)?;
    deploy(&mut engine, Side::Red, &parse_squad(&args.red)?)?;
    engine.start_play()?;

    let mut blue = ScriptedCommander::new();
    let mut red = ScriptedCommander::new();
    tracing::info!(seed, blue = blue.name(), red = red.name(), "skirmish started");

    while !engine.is_over() {
        while let Some(unit) = engine.next_unit() {
            let side = engine
                .unit(unit)
                .map(|u| u.side)
                .ok_or(Rejection::UnitNotFound(unit))?;
            let commander: &mut dyn Commander = match side {
                Side::Blue => &mut blue,
                Side::Red => &mut red,
            };
            play_turn(&mut engine, commander, unit)?;

            if engine.is_over() {
                break;
            }
            engine.end_turn()?;
        }
        if !engine.is_over() {
            engine.advance_round()?;
        }
    }

    let state = engine.state();
    let result = SkirmishResult {
        seed,
        winner: state.winner,
        reason: state.end_reason,
        rounds: state.round,
        survivors: state
            .survivors()
            .into_iter()
            .map(|u| Survivor {
                name: u.name,
                class: u.class,
                side: u.side,
                hp: u.hp,
                max_hp: u.max_hp,
            })
            .collect(),
        rejected_actions: state
            .previous_action_log
            .iter()
            .chain(state.action_log.iter())
            .filter(|record| !record.success)
            .count(),
        events: engine.sink().log.len(),
    };

    if let Some(path) = &args.events {
        let mut out = BufWriter::new(File::create(path)?);
        for event in engine.sink().log.iter() {
            serde_json::to_writer(&mut out, event)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let winner = result
            .winner
            .map_or_else(|| "nobody".to_string(), |side| side.to_string());
        println!(
            "Winner: {} ({:?}) after {} rounds, seed {}",
            winner, result.reason, result.rounds, result.seed
        );
        for survivor in &result.survivors {
            println!(
                "  {} {} [{}] {}/{}",
                survivor.side, survivor.name, survivor.class, survivor.hp, survivor.max_hp
            );
        }
    }

    Ok(())
}

fn parse_squad(list: &str) -> Result<Vec<UnitClass>> {
    let squad = list
        .split(',')
        .map(str::parse)
        .collect::<Result<Vec<UnitClass>>>()?;
    if squad.is_empty() {
        return Err(SibylError::Config("squad must not be empty".into()));
    }
    Ok(squad)
}

/// Blue lines up on the south edge facing north, Red on the north edge
fn deploy<S: EventSink>(engine: &mut Engine<S>, side: Side, squad: &[UnitClass]) -> Result<()> {
    let grid = engine.rules().grid;
    let (row, facing, offset) = match side {
        Side::Blue => (0, Direction::North, 0),
        Side::Red => (grid.height - 1, Direction::South, 1),
    };

    for (i, class) in squad.iter().enumerate() {
        let x = (i as i32 * 2 + offset) % grid.width;
        let id = engine.create_unit(format!("{side}-{class}-{i}"), *class, side)?;
        engine.place_unit(id, Position::new(x, row), facing)?;
    }
    Ok(())
}

/// Spend the unit's slots; rejected choices become a wait
fn play_turn<S: EventSink>(
    engine: &mut Engine<S>,
    commander: &mut dyn Commander,
    unit: sibyl::core::UnitId,
) -> Result<()> {
    while engine.slots_left() > 0 && !engine.is_over() {
        let view = engine.view_for(unit)?;
        let action = commander.choose(&view);
        match engine.submit(unit, action) {
            Ok(_) => {}
            Err(Rejection::UnitDead(_)) => break,
            Err(reason) => {
                tracing::debug!(%unit, %reason, "substituting wait");
                if engine.submit(unit, Action::Wait).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

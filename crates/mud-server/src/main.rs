//! Headless MUD pulse driver
//!
//! Loads the engine configuration and spell catalog, builds the demo arena
//! and runs the pulse loop. Player-visible text is written to the log.

mod arena;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use mud_core::character::{CharId, Character};
use mud_core::magic::{SpellCatalog, Voice};
use mud_core::world::{CombatWorld, EngineConfig, EngineError, Messenger};
use mud_core::{GameRng, PULSE_MILLIS, PULSE_VIOLENCE};

use arena::Arena;

/// Pulse driver for the combat and magic engine
#[derive(Parser, Debug)]
#[command(name = "mud-server")]
#[command(author, version, about = "Run the combat engine against a demo arena", long_about = None)]
struct Args {
    /// Spell catalog (JSON)
    #[arg(long, default_value = "crates/mud-server/data/catalog.json")]
    catalog: PathBuf,

    /// Engine configuration (JSON); defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of pulses to run
    #[arg(short, long, default_value_t = 3000)]
    pulses: u64,

    /// Sleep between pulses like a live server
    #[arg(long)]
    realtime: bool,
}

/// Sends every line to the log instead of a socket
struct LogMessenger;

impl Messenger for LogMessenger {
    fn deliver(&mut self, to: CharId, text: &str) {
        info!(target: "mud_server::output", %to, "{text}");
    }
}

/// What the party does between pulses, standing in for typed commands
fn party_commands(world: &mut CombatWorld, party: &Arena) {
    let ghost = world
        .char(party.warrior)
        .and_then(Character::player_data)
        .is_some_and(|p| p.ghost);
    if ghost {
        match world.respawn_player(party.warrior) {
            Ok(room) => info!(%room, "warrior respawned"),
            Err(err) => warn!(%err, "respawn failed"),
        }
        return;
    }

    let Some(warrior) = world.char(party.warrior) else {
        return;
    };
    let target = warrior.fighting();
    let wounded = warrior.room.is_some() && warrior.hit_percent() < 50;

    if wounded {
        let _ = world.do_cast(party.cleric, "'cure light' brand", Voice::Normal);
    }
    if let Some(enemy) = target {
        let keyword = world
            .char(enemy)
            .and_then(|e| e.name.split_whitespace().next().map(str::to_string));
        if let Some(keyword) = keyword {
            let _ = world.do_cast(party.mage, &format!("'magic missile' {keyword}"), Voice::Normal);
        }
    } else if let Some(room) = world.char(party.warrior).and_then(|c| c.room) {
        let prey = world
            .chars_in_room(room)
            .into_iter()
            .find(|&id| world.char(id).is_some_and(Character::is_npc));
        if let Some(prey) = prey {
            debug!(%prey, "party picks a fight");
            world.hit(party.warrior, prey, None);
        }
    }
}

fn run(args: &Args) -> Result<(), EngineError> {
    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    let catalog = SpellCatalog::load_from_file(&args.catalog)?;
    let seed = args.seed.unwrap_or_else(|| GameRng::from_entropy().seed());
    info!(seed, spells = catalog.len(), "engine starting");

    let mut world = CombatWorld::with_parts(config, catalog, seed);
    world.set_messenger(Box::new(LogMessenger));
    let party = arena::populate(&mut world)?;

    for _ in 0..args.pulses {
        world.pulse();
        if world.pulses() % (PULSE_VIOLENCE as u64 * 2) == 0 {
            party_commands(&mut world, &party);
        }
        if args.realtime {
            thread::sleep(Duration::from_millis(PULSE_MILLIS));
        }
    }

    let npcs_left = world.characters().filter(|c| c.is_npc()).count();
    let exp = world.char(party.warrior).map_or(0, |c| c.exp);
    info!(pulses = world.pulses(), npcs_left, warrior_exp = exp, "engine stopped");
    Ok(())
}

fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    run(&args)
}

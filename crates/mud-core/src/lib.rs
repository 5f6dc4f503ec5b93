//! mud-core: combat and magic resolution for a pulse-driven MUD
//!
//! This crate holds the rules of violence and spellcasting with no I/O of
//! its own. Text output, persistence, scripting and death bookkeeping are
//! reached through the traits in [`world::hooks`], so the engine can be
//! driven by a real server or by a test harness.
//!
//! Everything hangs off [`world::CombatWorld`]: call
//! [`CombatWorld::pulse`](world::CombatWorld::pulse) once per real-time
//! pulse and issue commands such as
//! [`do_cast`](world::CombatWorld::do_cast) or
//! [`hit`](world::CombatWorld::hit) between pulses.

pub mod character;
pub mod combat;
pub mod magic;
pub mod object;
pub mod world;

mod consts;
mod rng;

pub use consts::*;
pub use rng::GameRng;

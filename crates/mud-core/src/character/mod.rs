//! Characters
//!
//! Player and NPC records, their position state machine, the affect ledger
//! and the ability tables the combat math reads.

mod abilities;
mod affect;
mod entity;
mod position;

pub use abilities::{Abilities, Class, backstab_multiplier};
pub use affect::{AccumPolicy, Affect, AffectFlags, ApplyLocation, JoinResult};
pub use entity::{
    CharId, Character, Conditions, NpcData, NpcFlags, Persona, PlayerData, PlayerFlags, PrefFlags,
    Sex,
};
pub use position::Position;

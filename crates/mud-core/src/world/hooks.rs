//! Collaborator interfaces
//!
//! Everything the engine needs from subsystems it does not own: scripting,
//! persistence, adaptive NPC statistics, rescue of linkless players, NPC
//! special routines and hand-written spells. Each trait has a no-op default
//! so a bare [`CombatWorld`] runs on its own.

use super::{CombatWorld, RoomId};
use crate::character::{CharId, Character};
use crate::magic::{SpellId, SpellOutcome};
use crate::object::ObjectId;

/// Which script layer a cast trigger belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerScope {
    World,
    Object,
    Mob,
}

/// Synchronous script triggers; returning `false` vetoes the default action
pub trait ScriptHooks {
    fn before_cast(
        &mut self,
        _scope: TriggerScope,
        _caster: CharId,
        _spell: SpellId,
        _victim: Option<CharId>,
        _obj: Option<ObjectId>,
    ) -> bool {
        true
    }

    fn before_damage(&mut self, _attacker: CharId, _victim: CharId, _dam: i32) -> bool {
        true
    }

    fn before_death(&mut self, _victim: CharId, _killer: Option<CharId>) -> bool {
        true
    }

    /// Called after every hit point change with the new percentage
    fn hit_percent_changed(&mut self, _ch: CharId, _percent: i32) {}
}

/// Character persistence
pub trait Persistence {
    fn save_character(&mut self, _ch: &Character) {}
}

/// Adaptive behavior statistics and quest bookkeeping
pub trait DeathObserver {
    /// An NPC died; `killer` is absent for environmental deaths
    fn npc_died(&mut self, _victim: &Character, _killer: Option<&Character>) {}

    /// An NPC fled combat at `hit_percent` of its hit points
    fn npc_fled(&mut self, _npc: &Character, _hit_percent: i32) {}

    /// Quest completion check for the player who landed the killing blow
    fn quest_kill(&mut self, _killer: CharId, _victim: &Character) {}
}

/// Safe destination for a player who lost their connection mid-fight
pub trait RescueHandler {
    fn rescue_room(&mut self, _ch: &Character) -> Option<RoomId> {
        None
    }
}

/// Per-pulse NPC special routine, resolved once when the NPC is spawned
pub trait Behavior {
    fn on_pulse(&self, world: &mut CombatWorld, me: CharId);
}

/// Hand-written spell effect for entries too irregular for the catalog
pub trait ManualSpell {
    fn cast(
        &self,
        world: &mut CombatWorld,
        caster: CharId,
        victim: Option<CharId>,
        obj: Option<ObjectId>,
        level: u8,
    ) -> SpellOutcome;
}

/// Collaborator that accepts every default
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ScriptHooks for NoHooks {}
impl Persistence for NoHooks {}
impl DeathObserver for NoHooks {}
impl RescueHandler for NoHooks {}

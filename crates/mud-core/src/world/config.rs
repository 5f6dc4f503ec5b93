//! Engine configuration
//!
//! Balance knobs read by combat and casting. Loaded from JSON; every field
//! has a default so a partial file is valid.

use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::{EngineError, RoomId};
use crate::consts::PULSE_VIOLENCE;
use crate::magic::SpellId;

/// Tunable engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Player killing
    /// Players may attack players freely
    pub pk_allowed: bool,

    // Experience
    /// Ceiling on experience from a single kill
    pub max_exp_gain: i64,
    /// Ceiling on experience lost to one death; also bounds player-kill rewards
    pub max_exp_loss: i64,
    /// Experience per level of the weaker participant for a helpful spell
    pub spell_exp_per_level: i64,

    // Damage
    /// Hard ceiling on one application of damage
    pub max_damage_per_hit: i32,

    // Fleeing
    /// Flee threshold, in percent of max hit points, of WIMPY NPCs
    pub wimpy_flee_percent: i32,
    /// Upper bound on any NPC flee threshold
    pub max_flee_percent: i32,
    /// Chance that a fleeing grouped NPC deserts its group first
    pub group_desert_percent: i32,

    // Corpses
    /// Hours before an NPC corpse decays
    pub npc_corpse_hours: i32,
    /// Hours before a player corpse decays
    pub pc_corpse_hours: i32,
    /// Hometown to morgue room redirects for player corpses
    pub morgues: HashMap<RoomId, RoomId>,

    // Respawn and rescue
    /// Where dead players come back when they have no hometown
    pub respawn_room: Option<RoomId>,
    /// Where linkless players are taken when no rescue handler picks a room
    pub rescue_room: Option<RoomId>,

    // Casting
    /// Upper bound on the action delay a successful cast imposes, in pulses
    pub max_cast_delay: i32,
    /// Spell whose affect weapon poison applies
    pub poison_spell: SpellId,
    /// Damage per game hour taken by poisoned characters
    pub poison_damage: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pk_allowed: false,

            max_exp_gain: 100_000,
            max_exp_loss: 500_000,
            spell_exp_per_level: 2,

            max_damage_per_hit: 100,

            wimpy_flee_percent: 20,
            max_flee_percent: 80,
            group_desert_percent: 10,

            npc_corpse_hours: 5,
            pc_corpse_hours: 10,
            morgues: HashMap::new(),

            respawn_room: None,
            rescue_room: None,

            max_cast_delay: PULSE_VIOLENCE as i32 * 3,
            poison_spell: SpellId(33),
            poison_damage: 2,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from JSON text
    pub fn parse(contents: &str) -> Result<Self, EngineError> {
        serde_json::from_str(contents).map_err(|e| EngineError::malformed("engine config", e))
    }

    /// Morgue for a player whose hometown is `hometown`
    pub fn morgue_for(&self, hometown: Option<RoomId>) -> Option<RoomId> {
        hometown.and_then(|h| self.morgues.get(&h).copied())
    }
}

//! Spell and skill catalog
//!
//! Declarative records for every spell, skill and song, loaded once from
//! JSON. The engine treats the catalog as read-only while running.

use std::collections::BTreeMap;
use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

use super::{Formula, SpellId};
use crate::character::{AccumPolicy, AffectFlags, ApplyLocation, Class, Position};
use crate::consts::MAX_PREREQUISITE_DEPTH;
use crate::object::{ObjectFlags, Vnum};
use crate::world::{EngineError, RoomFlags};

bitflags! {
    /// What a spell may be aimed at
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TargetFlags: u32 {
        /// Needs no target at all
        const IGNORE = 1 << 0;
        /// A character in the caster's room
        const CHAR_ROOM = 1 << 1;
        /// A character anywhere
        const CHAR_WORLD = 1 << 2;
        /// The caster, when fighting and no target is given
        const FIGHT_SELF = 1 << 3;
        /// The caster's opponent, when no target is given
        const FIGHT_VICT = 1 << 4;
        const SELF_ONLY = 1 << 5;
        const NOT_SELF = 1 << 6;
        const OBJ_INV = 1 << 7;
        const OBJ_ROOM = 1 << 8;
        const OBJ_WORLD = 1 << 9;
        const OBJ_EQUIP = 1 << 10;
        /// The caster's group
        const GROUP = 1 << 11;
    }
}

bitflags! {
    /// Effect families a spell dispatches to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EffectFlags: u32 {
        const DAMAGE = 1 << 0;
        const AFFECTS = 1 << 1;
        const UNAFFECTS = 1 << 2;
        const POINTS = 1 << 3;
        const ALTER_OBJS = 1 << 4;
        /// Per-target families hit every grouped member in the room
        const GROUPS = 1 << 5;
        /// Per-target families hit everyone else in the room
        const MASSES = 1 << 6;
        /// Like MASSES, across adjoining rooms too
        const AREAS = 1 << 7;
        const SUMMONS = 1 << 8;
        const CREATIONS = 1 << 9;
        const ROOMS = 1 << 10;
        const MANUAL = 1 << 11;
    }
}

impl EffectFlags {
    /// Families applied to each recipient
    pub const PER_TARGET: EffectFlags = EffectFlags::DAMAGE
        .union(EffectFlags::AFFECTS)
        .union(EffectFlags::UNAFFECTS)
        .union(EffectFlags::POINTS);

    /// Families that widen the recipient set
    pub const MULTI_TARGET: EffectFlags = EffectFlags::GROUPS
        .union(EffectFlags::MASSES)
        .union(EffectFlags::AREAS);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum SpellKind {
    #[default]
    Spell,
    Skill,
    Song,
}

/// A timed affect a spell attaches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectTemplate {
    #[serde(default)]
    pub location: ApplyLocation,
    #[serde(default = "zero")]
    pub modifier: Formula,
    /// Game hours; negative results make the affect permanent
    #[serde(default = "default_duration")]
    pub duration: Formula,
    #[serde(default)]
    pub flags: AffectFlags,
    #[serde(default)]
    pub policy: AccumPolicy,
}

fn zero() -> Formula {
    Formula::constant(0)
}

fn default_duration() -> Formula {
    Formula::constant(1)
}

fn one() -> Formula {
    Formula::constant(1)
}

fn default_true() -> bool {
    true
}

fn default_min_position() -> Position {
    Position::Fighting
}

/// Instantaneous restoration of vitals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsSpec {
    pub hit: Option<Formula>,
    pub mana: Option<Formula>,
    pub moves: Option<Formula>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonSpec {
    /// NPC prototype to instantiate
    pub vnum: Vnum,
    /// Object prototype the caster must carry; consumed by the cast
    #[serde(default)]
    pub catalyst: Option<Vnum>,
    /// Percent chance of success
    #[serde(default)]
    pub success: Option<Formula>,
    #[serde(default = "one")]
    pub count: Formula,
    /// Summoned creatures follow the caster
    #[serde(default)]
    pub charm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationSpec {
    pub vnum: Vnum,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterSpec {
    #[serde(default)]
    pub set: ObjectFlags,
    #[serde(default)]
    pub clear: ObjectFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub flags: RoomFlags,
    #[serde(default = "default_duration")]
    pub duration: Formula,
}

/// Who may learn the spell and what it costs them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAssignment {
    pub class: Class,
    pub level: u8,
    pub mana: Formula,
}

/// Narrative lines for a successful cast
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellMessages {
    pub to_self: Option<String>,
    pub to_victim: Option<String>,
    pub to_room: Option<String>,
    /// Sent when the spell's affect expires
    pub wear_off: Option<String>,
}

/// One line per audience
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSet {
    #[serde(default)]
    pub attacker: String,
    #[serde(default)]
    pub victim: String,
    #[serde(default)]
    pub room: String,
}

/// Damage narration used instead of the magnitude table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatMessages {
    #[serde(default)]
    pub hit: MessageSet,
    #[serde(default)]
    pub miss: MessageSet,
    #[serde(default)]
    pub die: MessageSet,
    /// Shown when the victim is an immortal
    #[serde(default)]
    pub god: MessageSet,
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDef {
    pub id: SpellId,
    pub name: String,
    #[serde(default)]
    pub kind: SpellKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub targets: TargetFlags,
    #[serde(default)]
    pub violent: bool,
    #[serde(default)]
    pub effects: EffectFlags,
    /// Weakest position the caster may be in
    #[serde(default = "default_min_position")]
    pub min_position: Position,

    #[serde(default)]
    pub damage: Option<Formula>,
    /// Scales proficiency into the chance of a successful cast (percent)
    #[serde(default)]
    pub effectiveness: Option<Formula>,
    /// Pulses the caster must wait after a successful cast
    #[serde(default)]
    pub delay: Option<Formula>,
    #[serde(default)]
    pub affects: Vec<AffectTemplate>,
    #[serde(default)]
    pub points: PointsSpec,
    /// Spells removed by an UNAFFECTS cast
    #[serde(default)]
    pub dispels: Vec<SpellId>,
    #[serde(default)]
    pub alter: Option<AlterSpec>,
    #[serde(default)]
    pub summon: Option<SummonSpec>,
    #[serde(default)]
    pub create: Option<CreationSpec>,
    #[serde(default)]
    pub room: Option<RoomSpec>,

    #[serde(default)]
    pub classes: Vec<ClassAssignment>,
    /// Costs are taken from this spell instead
    #[serde(default)]
    pub discoverable_from: Option<SpellId>,

    #[serde(default)]
    pub messages: SpellMessages,
    #[serde(default)]
    pub combat: Option<CombatMessages>,
}

impl SpellDef {
    /// Minimal entry; used by tests and tooling
    pub fn new(id: SpellId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind: SpellKind::Spell,
            enabled: true,
            targets: TargetFlags::empty(),
            violent: false,
            effects: EffectFlags::empty(),
            min_position: default_min_position(),
            damage: None,
            effectiveness: None,
            delay: None,
            affects: Vec::new(),
            points: PointsSpec::default(),
            dispels: Vec::new(),
            alter: None,
            summon: None,
            create: None,
            room: None,
            classes: Vec::new(),
            discoverable_from: None,
            messages: SpellMessages::default(),
            combat: None,
        }
    }

    pub fn has_effect(&self, flags: EffectFlags) -> bool {
        self.effects.intersects(flags)
    }

    pub fn targets(&self, flags: TargetFlags) -> bool {
        self.targets.intersects(flags)
    }

    /// Damaging and violent: may never be aimed at the caster
    pub fn is_violent_damage(&self) -> bool {
        self.violent && self.has_effect(EffectFlags::DAMAGE)
    }

    pub fn assignment(&self, class: Class) -> Option<&ClassAssignment> {
        self.classes.iter().find(|a| a.class == class)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<SpellDef>),
    Wrapped { spells: Vec<SpellDef> },
}

/// Every spell, skill and song known to the server
#[derive(Debug, Clone, Default)]
pub struct SpellCatalog {
    spells: BTreeMap<SpellId, SpellDef>,
}

impl SpellCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, refusing duplicate ids
    pub fn from_defs(defs: Vec<SpellDef>) -> Result<Self, EngineError> {
        let mut catalog = SpellCatalog::new();
        for def in defs {
            catalog.insert(def)?;
        }
        for problem in catalog.validate() {
            warn!(%problem, "catalog problem");
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, def: SpellDef) -> Result<(), EngineError> {
        if self.spells.contains_key(&def.id) {
            return Err(EngineError::DuplicateSpell(def.id));
        }
        self.spells.insert(def.id, def);
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let catalog = Self::parse(&contents)?;
        info!(path = %path.display(), spells = catalog.len(), "spell catalog loaded");
        Ok(catalog)
    }

    /// Parse a JSON list of entries, bare or under a `spells` key
    pub fn parse(contents: &str) -> Result<Self, EngineError> {
        let file: CatalogFile =
            serde_json::from_str(contents).map_err(|e| EngineError::malformed("spell catalog", e))?;
        let defs = match file {
            CatalogFile::List(defs) | CatalogFile::Wrapped { spells: defs } => defs,
        };
        Self::from_defs(defs)
    }

    pub fn get(&self, id: SpellId) -> Option<&SpellDef> {
        self.spells.get(&id)
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpellDef> {
        self.spells.values()
    }

    /// Look a spell up by name: exact match first, then a unique prefix
    pub fn find_by_name(&self, name: &str) -> Result<&SpellDef, EngineError> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(EngineError::UnknownSpell(name.to_string()));
        }
        if let Some(def) = self.spells.values().find(|d| d.name.to_lowercase() == wanted) {
            return Ok(def);
        }
        let mut matches = self
            .spells
            .values()
            .filter(|d| d.name.to_lowercase().starts_with(&wanted));
        match (matches.next(), matches.next()) {
            (Some(def), None) => Ok(def),
            _ => Err(EngineError::UnknownSpell(name.to_string())),
        }
    }

    /// Report dangling or cyclic prerequisite chains
    pub fn validate(&self) -> Vec<EngineError> {
        let mut problems = Vec::new();
        for def in self.spells.values() {
            let mut current = def.discoverable_from;
            let mut depth = 0u8;
            while let Some(pre) = current {
                if !self.spells.contains_key(&pre) {
                    problems.push(EngineError::UnknownSpell(format!("{pre} (prerequisite of {})", def.id)));
                    break;
                }
                depth += 1;
                if pre == def.id || depth > MAX_PREREQUISITE_DEPTH {
                    problems.push(EngineError::CyclicPrerequisite(def.id));
                    break;
                }
                current = self.spells.get(&pre).and_then(|d| d.discoverable_from);
            }
        }
        problems
    }
}

//! Character instances
//!
//! Players and NPCs share one record. Relations to other characters
//! (fighting target, master, followers) are stored as ids, never as owning
//! references, so a dangling link after extraction is just a failed lookup.

use core::fmt;

use bitflags::bitflags;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount};

use super::{Abilities, AffectFlags, Class, Position};
use crate::combat::AttackKind;
use crate::consts::{ALIGN_EVIL, ALIGN_GOOD, BASE_ARMOR, HP_DEAD, LVL_IMMORT, NUM_SAVES};
use crate::magic::SpellId;
use crate::object::{ObjectId, Vnum, WearSlot};
use crate::world::RoomId;

/// Unique identifier for a live character
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CharId(pub u32);

impl fmt::Display for CharId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "char#{}", self.0)
    }
}

bitflags! {
    /// Behavior flags for NPCs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NpcFlags: u32 {
        /// Flees when badly hurt
        const WIMPY = 1 << 3;
        /// Cannot be attacked (shopkeepers, quest givers)
        const NO_KILL = 1 << 4;
        /// Joins fights on behalf of its leader
        const HELPER = 1 << 5;
        const NO_CHARM = 1 << 6;
        const NO_SLEEP = 1 << 8;
    }
}

bitflags! {
    /// Server-assigned player status flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PlayerFlags: u32 {
        const KILLER = 1 << 0;
        const THIEF = 1 << 1;
    }
}

bitflags! {
    /// Player preferences
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PrefFlags: u32 {
        const AUTOASSIST = 1 << 0;
        /// Immortals are left alone by mortal attacks
        const NOHASSLE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum Sex {
    #[default]
    Neutral,
    Male,
    Female,
}

impl Sex {
    /// Subject pronoun ($e)
    pub const fn subject(&self) -> &'static str {
        match self {
            Sex::Neutral => "it",
            Sex::Male => "he",
            Sex::Female => "she",
        }
    }

    /// Object pronoun ($m)
    pub const fn object(&self) -> &'static str {
        match self {
            Sex::Neutral => "it",
            Sex::Male => "him",
            Sex::Female => "her",
        }
    }

    /// Possessive pronoun ($s)
    pub const fn possessive(&self) -> &'static str {
        match self {
            Sex::Neutral => "its",
            Sex::Male => "his",
            Sex::Female => "her",
        }
    }
}

/// Hunger, thirst and drunkenness counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    pub full: i32,
    pub thirst: i32,
    pub drunk: i32,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            full: 24,
            thirst: 24,
            drunk: 0,
        }
    }
}

/// NPC-only data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcData {
    /// Prototype this NPC was instantiated from
    pub vnum: Option<Vnum>,
    pub flags: NpcFlags,
    /// Innate attack verb when unarmed
    pub attack: AttackKind,
    /// Innate damage dice (count, sides)
    pub damage_dice: (i32, i32),
    /// Learned tendency to flee, in percent of max hit points
    pub flee_tendency: u8,
}

impl Default for NpcData {
    fn default() -> Self {
        Self {
            vnum: None,
            flags: NpcFlags::empty(),
            attack: AttackKind::Hit,
            damage_dice: (1, 4),
            flee_tendency: 0,
        }
    }
}

/// Player-only data
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerData {
    /// A session is attached
    pub connected: bool,
    /// Auto-flee below this many hit points (0 = off)
    pub wimp_level: i32,
    pub prefs: PrefFlags,
    pub flags: PlayerFlags,
    pub deaths: u32,
    pub hometown: Option<RoomId>,
    /// Room the player enters on next login or respawn
    pub load_room: Option<RoomId>,
    /// Dead and awaiting respawn
    pub ghost: bool,
}

/// Whether a character is controlled by the server or by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Persona {
    Npc(NpcData),
    Player(PlayerData),
}

/// A live character, player or NPC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharId,
    /// Space separated keywords used for targeting
    pub name: String,
    /// Name used in messages ("a hobgoblin", "Alys")
    pub short_descr: String,
    pub sex: Sex,
    pub class: Class,
    pub level: u8,
    pub persona: Persona,

    /// Current room; `None` once extracted from the live world
    pub room: Option<RoomId>,
    pub position: Position,
    /// Opponent, if any. Set only through the world's fighting relation.
    pub(crate) fighting: Option<CharId>,

    hit: i32,
    pub max_hit: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub moves: i32,
    pub max_moves: i32,
    pub conditions: Conditions,

    pub abilities: Abilities,
    pub hitroll: i32,
    pub damroll: i32,
    /// Armor, ×10 convention; lower is better
    pub armor: i32,
    /// Saving throw modifiers (paralysis, rod, petrification, breath, spell)
    pub saves: [i32; NUM_SAVES],

    pub exp: i64,
    /// -1000 (evil) to 1000 (good)
    pub alignment: i32,
    pub gold: i64,

    pub affects: Vec<super::Affect>,
    /// Flags held regardless of affects
    pub innate: AffectFlags,
    pub(crate) aff_flags: AffectFlags,

    /// Action cooldown in pulses; may act when <= 0
    pub wait_ticks: i32,

    pub inventory: Vec<ObjectId>,
    pub equipment: [Option<ObjectId>; WearSlot::COUNT],

    pub master: Option<CharId>,
    pub followers: Vec<CharId>,

    /// Spell and skill proficiency, 0..=100
    pub skills: HashMap<SpellId, u8>,
    /// Percent chance to shrug off specific spells
    pub spell_resists: HashMap<SpellId, u8>,
}

impl Character {
    fn base(id: CharId, name: &str, short_descr: &str, class: Class, level: u8, persona: Persona) -> Self {
        Self {
            id,
            name: name.to_string(),
            short_descr: short_descr.to_string(),
            sex: Sex::Neutral,
            class,
            level,
            persona,
            room: None,
            position: Position::Standing,
            fighting: None,
            hit: 20,
            max_hit: 20,
            mana: 100,
            max_mana: 100,
            moves: 100,
            max_moves: 100,
            conditions: Conditions::default(),
            abilities: Abilities::default(),
            hitroll: 0,
            damroll: 0,
            armor: BASE_ARMOR,
            saves: [0; NUM_SAVES],
            exp: 0,
            alignment: 0,
            gold: 0,
            affects: Vec::new(),
            innate: AffectFlags::empty(),
            aff_flags: AffectFlags::empty(),
            wait_ticks: 0,
            inventory: Vec::new(),
            equipment: [None; WearSlot::COUNT],
            master: None,
            followers: Vec::new(),
            skills: HashMap::new(),
            spell_resists: HashMap::new(),
        }
    }

    /// Create a connected player with default abilities
    pub fn player(id: CharId, name: &str, class: Class, level: u8) -> Self {
        Self::base(
            id,
            &name.to_lowercase(),
            name,
            class,
            level,
            Persona::Player(PlayerData {
                connected: true,
                ..Default::default()
            }),
        )
    }

    /// Create an NPC with default abilities
    pub fn npc(id: CharId, keywords: &str, short_descr: &str, level: u8) -> Self {
        Self::base(
            id,
            keywords,
            short_descr,
            Class::Warrior,
            level,
            Persona::Npc(NpcData::default()),
        )
    }

    /// Builder: set current and maximum hit points
    pub fn with_hit(mut self, hit: i32, max_hit: i32) -> Self {
        self.max_hit = max_hit;
        self.set_hit(hit);
        self
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.persona, Persona::Npc(_))
    }

    pub fn npc_data(&self) -> Option<&NpcData> {
        match &self.persona {
            Persona::Npc(data) => Some(data),
            Persona::Player(_) => None,
        }
    }

    pub fn npc_data_mut(&mut self) -> Option<&mut NpcData> {
        match &mut self.persona {
            Persona::Npc(data) => Some(data),
            Persona::Player(_) => None,
        }
    }

    pub fn player_data(&self) -> Option<&PlayerData> {
        match &self.persona {
            Persona::Player(data) => Some(data),
            Persona::Npc(_) => None,
        }
    }

    pub fn player_data_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.persona {
            Persona::Player(data) => Some(data),
            Persona::Npc(_) => None,
        }
    }

    pub fn npc_flagged(&self, flags: NpcFlags) -> bool {
        self.npc_data().is_some_and(|n| n.flags.intersects(flags))
    }

    pub fn prf_flagged(&self, flags: PrefFlags) -> bool {
        self.player_data().is_some_and(|p| p.prefs.intersects(flags))
    }

    pub fn plr_flagged(&self, flags: PlayerFlags) -> bool {
        self.player_data().is_some_and(|p| p.flags.intersects(flags))
    }

    /// A player without an attached session
    pub fn is_linkless(&self) -> bool {
        self.player_data().is_some_and(|p| !p.connected)
    }

    pub fn is_immortal(&self) -> bool {
        !self.is_npc() && self.level >= LVL_IMMORT
    }

    pub fn is_good(&self) -> bool {
        self.alignment >= ALIGN_GOOD
    }

    pub fn is_evil(&self) -> bool {
        self.alignment <= ALIGN_EVIL
    }

    pub fn is_affected(&self, flags: AffectFlags) -> bool {
        self.aff_flags.intersects(flags)
    }

    /// Drop every affect that holds this character in magical sleep
    pub fn break_magic_sleep(&mut self) {
        if !self.is_affected(AffectFlags::SLEEP) {
            return;
        }
        let spells: Vec<SpellId> = self
            .affects
            .iter()
            .filter(|af| af.flags.contains(AffectFlags::SLEEP))
            .map(|af| af.spell)
            .collect();
        for spell in spells {
            self.remove_affects_from(spell);
        }
    }

    pub fn aff_flags(&self) -> AffectFlags {
        self.aff_flags
    }

    pub fn awake(&self) -> bool {
        self.position.is_awake()
    }

    /// Current opponent
    pub fn fighting(&self) -> Option<CharId> {
        self.fighting
    }

    /// Proficiency in a spell or skill
    pub fn skill(&self, spell: SpellId) -> u8 {
        self.skills.get(&spell).copied().unwrap_or(0)
    }

    pub fn hit(&self) -> i32 {
        self.hit
    }

    /// Set hit points and re-derive position
    ///
    /// Hit points never drop below the dead threshold.
    pub fn set_hit(&mut self, hit: i32) {
        self.hit = hit.max(HP_DEAD);
        self.position = Position::derive(self.hit, self.position);
    }

    /// Change hit points by `delta`, capped at max, and re-derive position
    pub fn alter_hit(&mut self, delta: i32) {
        let target = self.hit.saturating_add(delta);
        let target = if delta > 0 { target.min(self.max_hit.max(self.hit)) } else { target };
        self.set_hit(target);
    }

    /// Hit points as a percentage of maximum
    pub fn hit_percent(&self) -> i32 {
        if self.max_hit > 0 {
            (i64::from(self.hit.max(0)) * 100 / i64::from(self.max_hit)) as i32
        } else {
            0
        }
    }

    /// Whether `keyword` names this character (prefix of any keyword)
    pub fn is_named(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        !keyword.is_empty() && self.name.split_whitespace().any(|k| k.starts_with(&keyword))
    }

    /// Whether this character can perceive `other`
    pub fn can_see(&self, other: &Character) -> bool {
        if self.id == other.id {
            return true;
        }
        if self.is_immortal() {
            return true;
        }
        if !self.awake() || self.is_affected(AffectFlags::BLIND) {
            return false;
        }
        if other.is_affected(AffectFlags::INVISIBLE) && !self.is_affected(AffectFlags::DETECT_INVIS) {
            return false;
        }
        true
    }

    /// Wielded weapon slot
    pub fn wielded(&self) -> Option<ObjectId> {
        self.equipment[WearSlot::Wield as usize]
    }
}

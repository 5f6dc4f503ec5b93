//! Object instances

use core::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter};

use crate::character::{ApplyLocation, CharId};
use crate::combat::AttackKind;
use crate::magic::SpellId;
use crate::world::RoomId;

/// Prototype number for NPC and object templates
pub type Vnum = u32;

/// Unique identifier for object instances
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Equipment slots
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCount,
)]
#[repr(u8)]
pub enum WearSlot {
    Light = 0,
    FingerRight = 1,
    FingerLeft = 2,
    Neck1 = 3,
    Neck2 = 4,
    Body = 5,
    Head = 6,
    Legs = 7,
    Feet = 8,
    Hands = 9,
    Arms = 10,
    Shield = 11,
    About = 12,
    Waist = 13,
    WristRight = 14,
    WristLeft = 15,
    Wield = 16,
    Hold = 17,
}

bitflags! {
    /// Extra object flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ObjectFlags: u32 {
        const GLOW = 1 << 0;
        const HUM = 1 << 1;
        const MAGIC = 1 << 2;
        const BLESS = 1 << 3;
        const INVISIBLE = 1 << 4;
        const NODROP = 1 << 5;
        const NODONATE = 1 << 6;
        const ANTI_GOOD = 1 << 7;
        const ANTI_EVIL = 1 << 8;
        const NORENT = 1 << 9;
    }
}

/// Poison coating on a weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoisonCharge {
    /// Remaining applications before the coating is gone
    pub charges: u8,
    /// Duration in game hours of the poison affect
    pub strength: i32,
}

/// Weapon statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub dice_num: i32,
    pub dice_sides: i32,
    pub attack: AttackKind,
    /// Proficiency skill trained by this weapon
    pub skill: Option<SpellId>,
    /// Bonus of special (enchanted, named) weapons
    pub special_hitroll: i32,
    pub special_damroll: i32,
    pub poison: Option<PoisonCharge>,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            dice_num: 1,
            dice_sides: 6,
            attack: AttackKind::Hit,
            skill: None,
            special_hitroll: 0,
            special_damroll: 0,
            poison: None,
        }
    }
}

/// Identity kept by a corpse so it can be resurrected later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpseInfo {
    pub of: CharId,
    pub name: String,
    pub was_npc: bool,
    pub vnum: Option<Vnum>,
    pub level: u8,
}

/// What kind of object this is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Weapon(WeaponStats),
    /// Armor piece; `special_defense` is an extra bonus for shields
    Armor { ac: i32, special_defense: i32 },
    Container,
    Corpse(CorpseInfo),
    Money(i64),
    Other,
}

/// Where an object currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectLocation {
    #[default]
    Nowhere,
    Room(RoomId),
    Carried(CharId),
    Worn(CharId, WearSlot),
    Inside(ObjectId),
}

/// Object instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    /// Prototype this object was created from
    pub vnum: Option<Vnum>,
    /// Space separated keywords
    pub name: String,
    pub short_descr: String,
    pub kind: ObjectKind,
    pub flags: ObjectFlags,
    pub level: u8,
    pub weight: i32,
    /// Hours until the object decays; `None` never decays
    pub timer: Option<i32>,
    pub location: ObjectLocation,
    pub contents: Vec<ObjectId>,
    /// Attribute deltas applied while worn
    pub applies: Vec<(ApplyLocation, i32)>,
}

impl Object {
    pub fn new(id: ObjectId, name: &str, short_descr: &str, kind: ObjectKind) -> Self {
        Self {
            id,
            vnum: None,
            name: name.to_string(),
            short_descr: short_descr.to_string(),
            kind,
            flags: ObjectFlags::empty(),
            level: 0,
            weight: 1,
            timer: None,
            location: ObjectLocation::Nowhere,
            contents: Vec::new(),
            applies: Vec::new(),
        }
    }

    pub fn weapon(&self) -> Option<&WeaponStats> {
        match &self.kind {
            ObjectKind::Weapon(w) => Some(w),
            _ => None,
        }
    }

    pub fn weapon_mut(&mut self) -> Option<&mut WeaponStats> {
        match &mut self.kind {
            ObjectKind::Weapon(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_corpse(&self) -> bool {
        matches!(self.kind, ObjectKind::Corpse(_))
    }

    /// Whether `keyword` names this object (prefix of any keyword)
    pub fn is_named(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        !keyword.is_empty() && self.name.split_whitespace().any(|k| k.starts_with(&keyword))
    }
}

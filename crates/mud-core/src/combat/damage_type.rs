//! Damage causes
//!
//! These define WHY damage is dealt, which decides the message table used
//! and which mitigation caps apply.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::AttackKind;
use crate::character::AffectFlags;
use crate::magic::SpellId;

/// Reflective aura carried by a defender
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum AuraKind {
    Fire,
    Thorn,
    Wind,
}

impl AuraKind {
    /// Auras in the order they are checked after a hit
    pub const ALL: [AuraKind; 3] = [AuraKind::Fire, AuraKind::Thorn, AuraKind::Wind];

    /// Affect flag that grants this aura
    pub const fn flag(&self) -> AffectFlags {
        match self {
            AuraKind::Fire => AffectFlags::FIRESHIELD,
            AuraKind::Thorn => AffectFlags::THORNSHIELD,
            AuraKind::Wind => AffectFlags::WINDWALL,
        }
    }

    /// Fraction of the landed blow sent back at the attacker (1/n)
    pub const fn reflect_divisor(&self) -> i32 {
        match self {
            AuraKind::Fire => 3,
            AuraKind::Thorn => 4,
            AuraKind::Wind => 5,
        }
    }

    pub const fn noun(&self) -> &'static str {
        match self {
            AuraKind::Fire => "flames",
            AuraKind::Thorn => "thorns",
            AuraKind::Wind => "winds",
        }
    }
}

/// Why a point of damage is being dealt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageCause {
    /// Ordinary melee blow
    Weapon(AttackKind),
    /// Named combat skill such as backstab
    Skill(SpellId),
    /// Offensive spell, song or scroll effect
    Spell(SpellId),
    /// Counter-damage from a reflective aura
    Reflect(AuraKind),
    /// Poison, bleeding and other damage with no attacker intent
    Suffering,
}

impl DamageCause {
    /// Melee blows use the magnitude message table
    pub const fn is_weapon(&self) -> bool {
        matches!(self, DamageCause::Weapon(_))
    }

    /// Catalog entry whose message table describes this damage, if any
    pub const fn spell_id(&self) -> Option<SpellId> {
        match self {
            DamageCause::Skill(id) | DamageCause::Spell(id) => Some(*id),
            _ => None,
        }
    }
}

impl Default for DamageCause {
    fn default() -> Self {
        DamageCause::Weapon(AttackKind::Hit)
    }
}
